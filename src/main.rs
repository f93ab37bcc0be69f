use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use log::{error, info};

use securenet::auth::database_provider::DatabaseAuthProvider;
use securenet::configuration::config::Config;
use securenet::controller::dashboard_controller::DashboardController;
use securenet::store::database_store::DatabaseStore;
use securenet::web_interface::routes::WebContext;
use securenet::web_interface::web_server::WebServer;

#[derive(Parser)]
#[command(name = "securenet")]
#[command(version = "0.1.0")]
#[command(about = "Network security telemetry dashboard")]
struct Args {
    config_file: String,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    println!(
        "
███████╗███████╗ ██████╗██╗   ██╗██████╗ ███████╗███╗   ██╗███████╗████████╗
██╔════╝██╔════╝██╔════╝██║   ██║██╔══██╗██╔════╝████╗  ██║██╔════╝╚══██╔══╝
███████╗█████╗  ██║     ██║   ██║██████╔╝█████╗  ██╔██╗ ██║█████╗     ██║
╚════██║██╔══╝  ██║     ██║   ██║██╔══██╗██╔══╝  ██║╚██╗██║██╔══╝     ██║
███████║███████╗╚██████╗╚██████╔╝██║  ██║███████╗██║ ╚████║███████╗   ██║
╚══════╝╚══════╝ ╚═════╝ ╚═════╝ ╚═╝  ╚═╝╚══════╝╚═╝  ╚═══╝╚══════╝   ╚═╝
============================================================================
                Network Security Telemetry Dashboard v0.1.0
============================================================================
"
    );

    info!("Importing configuration");

    let args = Args::parse();

    let config = match Config::from_file(Path::new(args.config_file.as_str())) {
        Ok(config) => config,
        Err(e) => {
            error!("Unable to import configuration from file: {}", e);
            std::process::exit(1);
        }
    };

    info!("Configuration imported successfully");

    let store = match DatabaseStore::open(&config.database_path).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!("Unable to open telemetry database: {}", e);
            std::process::exit(1);
        }
    };

    let provider = match DatabaseAuthProvider::from_pool(store.pool()).await {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Unable to initialize the auth provider: {}", e);
            std::process::exit(1);
        }
    };

    let mut controller = DashboardController::new(
        provider,
        store,
        config.poll_interval(),
        config.alert_window,
    );
    let ctx = WebContext {
        gate: controller.gate(),
        editor: controller.editor(),
        snapshots: controller.subscribe_snapshots(),
    };
    let shutdown = controller.shutdown_handle();

    let controller_task = tokio::spawn(async move {
        controller.run().await;
    });

    let server = WebServer::new(ctx);
    tokio::select! {
        result = server.start(config.socket_addr()) => {
            if let Err(e) = result {
                error!("Web server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown requested");
        }
    }

    let _ = shutdown.send(true);
    let _ = controller_task.await;
}
