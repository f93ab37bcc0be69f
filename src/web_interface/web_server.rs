use std::net::SocketAddr;

use log::info;
use warp::Filter;

use crate::error_handling::types::WebError;
use crate::web_interface::routes::{
    assets_route, dashboard_route, get_config_route, health_route, reset_config_route,
    save_config_route, session_state_route, sign_in_route, sign_out_route, sign_up_route,
    snapshot_route, WebContext,
};

/// Web server for the HTTP API and the embedded dashboard page.
pub struct WebServer {
    ctx: WebContext,
}

impl WebServer {
    pub fn new(ctx: WebContext) -> Self {
        Self { ctx }
    }

    /// Start serving on the given address. Runs until the process exits.
    pub async fn start(&self, addr: SocketAddr) -> Result<(), WebError> {
        let gate = self.ctx.gate.clone();

        let routes = dashboard_route()
            .or(assets_route())
            .or(health_route())
            .or(session_state_route(gate.clone()))
            .or(sign_in_route(gate.clone()))
            .or(sign_up_route(gate.clone()))
            .or(sign_out_route(gate))
            .or(snapshot_route(self.ctx.clone()))
            .or(get_config_route(self.ctx.clone()))
            .or(save_config_route(self.ctx.clone()))
            .or(reset_config_route(self.ctx.clone()));

        info!("dashboard listening on http://{}", addr);

        // Start server (warp 0.4)
        warp::serve(routes).run(addr).await;

        Ok(())
    }
}
