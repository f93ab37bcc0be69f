use std::sync::Arc;

use rust_embed::RustEmbed;
use tokio::sync::{watch, Mutex};
use warp::{http::StatusCode, reply, Filter, Rejection, Reply};

use crate::auth::session_gate::SessionGate;
use crate::config_editor::editor::ConfigEditor;
use crate::polling::types::Snapshot;
use crate::web_interface::types::{
    alerts_summary, AlertView, ApiError, ConfigForm, ConfigResponse, Credentials, FormBounds,
    SessionStateResponse, SnapshotResponse,
};

/// Everything the HTTP layer needs from the core. Cheap to clone into
/// each route closure.
#[derive(Clone)]
pub struct WebContext {
    pub gate: Arc<SessionGate>,
    pub editor: Arc<Mutex<ConfigEditor>>,
    pub snapshots: watch::Receiver<Snapshot>,
}

#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/web"]
struct Assets;

fn serve_asset(path: &str) -> Result<warp::reply::Response, Rejection> {
    match Assets::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            Ok(reply::with_header(
                content.data.into_owned(),
                "Content-Type",
                mime.to_string(),
            )
            .into_response())
        }
        None => Err(warp::reject::not_found()),
    }
}

/// GET / -> embedded dashboard page
pub fn dashboard_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path::end()
        .and(warp::get())
        .and_then(|| async move { serve_asset("index.html") })
}

/// GET /assets/... -> embedded static files
pub fn assets_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("assets")
        .and(warp::get())
        .and(warp::path::tail())
        .and_then(|tail: warp::path::Tail| async move { serve_asset(tail.as_str()) })
}

/// GET /health
pub fn health_route() -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .and_then(|| async move {
            Ok::<_, Rejection>(reply::json(&serde_json::json!({ "status": "healthy" })))
        })
}

/// GET /api/session -> current gate state
pub fn session_state_route(
    gate: Arc<SessionGate>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "session")
        .and(warp::get())
        .and_then(move || {
            let gate = gate.clone();
            async move {
                let state = gate.state();
                Ok::<_, Rejection>(reply::json(&SessionStateResponse {
                    resolved: state.resolved,
                    authenticated: state.is_authenticated(),
                    email: state.user().map(|u| u.email.clone()),
                }))
            }
        })
}

/// POST /api/auth/signin
pub fn sign_in_route(
    gate: Arc<SessionGate>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "auth" / "signin")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(move |creds: Credentials| {
            let gate = gate.clone();
            async move {
                match gate.sign_in(&creds.email, &creds.password).await {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&serde_json::json!({ "ok": true })),
                        StatusCode::OK,
                    )),
                    Err(e) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: e.to_string(),
                        }),
                        StatusCode::UNAUTHORIZED,
                    )),
                }
            }
        })
}

/// POST /api/auth/signup
pub fn sign_up_route(
    gate: Arc<SessionGate>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "auth" / "signup")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(move |creds: Credentials| {
            let gate = gate.clone();
            async move {
                match gate.sign_up(&creds.email, &creds.password).await {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&serde_json::json!({ "ok": true })),
                        StatusCode::OK,
                    )),
                    Err(e) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: e.to_string(),
                        }),
                        StatusCode::BAD_REQUEST,
                    )),
                }
            }
        })
}

/// POST /api/auth/signout
pub fn sign_out_route(
    gate: Arc<SessionGate>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "auth" / "signout")
        .and(warp::post())
        .and_then(move || {
            let gate = gate.clone();
            async move {
                match gate.sign_out().await {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&serde_json::json!({ "ok": true })),
                        StatusCode::OK,
                    )),
                    Err(e) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: e.to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )),
                }
            }
        })
}

/// GET /api/snapshot -> latest classified snapshot, session-gated
pub fn snapshot_route(
    ctx: WebContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "snapshot")
        .and(warp::get())
        .and_then(move || {
            let ctx = ctx.clone();
            async move {
                if !ctx.gate.is_authenticated() {
                    return Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Not signed in".to_string(),
                        }),
                        StatusCode::UNAUTHORIZED,
                    ));
                }
                let snap = ctx.snapshots.borrow().clone();
                let alerts: Vec<AlertView> =
                    snap.alerts.into_iter().map(AlertView::from_alert).collect();
                let body = SnapshotResponse {
                    metrics: snap.metrics,
                    alerts_summary: alerts_summary(alerts.len(), snap.loading),
                    alerts,
                    loading: snap.loading,
                    refreshed_at: snap.refreshed_at,
                };
                Ok::<_, Rejection>(reply::with_status(reply::json(&body), StatusCode::OK))
            }
        })
}

fn config_response(editor: &ConfigEditor) -> ConfigResponse {
    ConfigResponse {
        draft: editor.draft().clone(),
        dirty: editor.is_dirty(),
        notice: editor.notice().cloned(),
        bounds: FormBounds::default(),
    }
}

/// GET /api/config -> current draft, session-gated
pub fn get_config_route(
    ctx: WebContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "config")
        .and(warp::get())
        .and_then(move || {
            let ctx = ctx.clone();
            async move {
                if !ctx.gate.is_authenticated() {
                    return Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Not signed in".to_string(),
                        }),
                        StatusCode::UNAUTHORIZED,
                    ));
                }
                let editor = ctx.editor.lock().await;
                Ok::<_, Rejection>(reply::with_status(
                    reply::json(&config_response(&editor)),
                    StatusCode::OK,
                ))
            }
        })
}

/// POST /api/config -> stage the submitted form values and save
pub fn save_config_route(
    ctx: WebContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "config")
        .and(warp::post())
        .and(warp::body::json())
        .and_then(move |form: ConfigForm| {
            let ctx = ctx.clone();
            async move {
                // Session is read here, at use time, not cached earlier.
                let user = match ctx.gate.current_user() {
                    Some(user) => user,
                    None => {
                        return Ok::<_, Rejection>(reply::with_status(
                            reply::json(&ApiError {
                                message: "Not signed in".to_string(),
                            }),
                            StatusCode::UNAUTHORIZED,
                        ))
                    }
                };
                let mut editor = ctx.editor.lock().await;
                let fields = [
                    ("traffic_threshold", &form.traffic_threshold),
                    ("connection_rate", &form.connection_rate),
                    ("protocol_blacklist", &form.protocol_blacklist),
                ];
                for (name, raw) in fields {
                    if let Err(e) = editor.update_field(name, raw) {
                        return Ok::<_, Rejection>(reply::with_status(
                            reply::json(&ApiError {
                                message: e.to_string(),
                            }),
                            StatusCode::BAD_REQUEST,
                        ));
                    }
                }
                match editor.save(&user).await {
                    Ok(()) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&config_response(&editor)),
                        StatusCode::OK,
                    )),
                    Err(e) => Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: e.to_string(),
                        }),
                        StatusCode::INTERNAL_SERVER_ERROR,
                    )),
                }
            }
        })
}

/// POST /api/config/reset -> discard unsaved edits
pub fn reset_config_route(
    ctx: WebContext,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    warp::path!("api" / "config" / "reset")
        .and(warp::post())
        .and_then(move || {
            let ctx = ctx.clone();
            async move {
                if !ctx.gate.is_authenticated() {
                    return Ok::<_, Rejection>(reply::with_status(
                        reply::json(&ApiError {
                            message: "Not signed in".to_string(),
                        }),
                        StatusCode::UNAUTHORIZED,
                    ));
                }
                let mut editor = ctx.editor.lock().await;
                editor.reset();
                Ok::<_, Rejection>(reply::with_status(
                    reply::json(&config_response(&editor)),
                    StatusCode::OK,
                ))
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::AuthProvider;
    use crate::auth::types::{Session, UserIdentity};
    use crate::error_handling::types::AuthError;
    use crate::store::memory_store::MemoryStore;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use uuid::Uuid;

    struct FakeProvider {
        session_tx: watch::Sender<Option<Session>>,
    }

    impl FakeProvider {
        fn new() -> Self {
            let (session_tx, _) = watch::channel(None);
            Self { session_tx }
        }

        fn set_authenticated(&self) -> UserIdentity {
            let user = UserIdentity {
                id: Uuid::new_v4(),
                email: String::from("operator@example.com"),
            };
            let _ = self.session_tx.send(Some(Session {
                token: String::from("token"),
                user: user.clone(),
            }));
            user
        }
    }

    #[async_trait]
    impl AuthProvider for FakeProvider {
        async fn current_session(&self) -> Result<Option<Session>, AuthError> {
            Ok(self.session_tx.borrow().clone())
        }

        fn subscribe(&self) -> watch::Receiver<Option<Session>> {
            self.session_tx.subscribe()
        }

        async fn sign_in(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
            self.set_authenticated();
            Ok(())
        }

        async fn sign_up(&self, _email: &str, _password: &str) -> Result<(), AuthError> {
            self.set_authenticated();
            Ok(())
        }

        async fn sign_out(&self) -> Result<(), AuthError> {
            let _ = self.session_tx.send(None);
            Ok(())
        }
    }

    async fn test_context(provider: Arc<FakeProvider>) -> (WebContext, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let gate = Arc::new(SessionGate::new(provider));
        gate.start();
        // Let the gate resolve before any request lands.
        let mut rx = gate.subscribe();
        while !rx.borrow_and_update().resolved {
            rx.changed().await.unwrap();
        }
        let editor = Arc::new(Mutex::new(ConfigEditor::new(
            store.clone(),
            Arc::new(Notify::new()),
        )));
        let (_, snapshots) = watch::channel(Snapshot::default());
        (
            WebContext {
                gate,
                editor,
                snapshots,
            },
            store,
        )
    }

    #[tokio::test]
    async fn test_health_route() {
        let res = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&health_route())
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(String::from_utf8_lossy(res.body()).contains("healthy"));
    }

    #[tokio::test]
    async fn test_snapshot_requires_session() {
        let provider = Arc::new(FakeProvider::new());
        let (ctx, _) = test_context(provider).await;
        let res = warp::test::request()
            .method("GET")
            .path("/api/snapshot")
            .reply(&snapshot_route(ctx))
            .await;
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_snapshot_served_when_signed_in() {
        let provider = Arc::new(FakeProvider::new());
        let (ctx, _) = test_context(provider.clone()).await;

        provider.set_authenticated();
        let mut rx = ctx.gate.subscribe();
        while !rx.borrow_and_update().is_authenticated() {
            rx.changed().await.unwrap();
        }

        let res = warp::test::request()
            .method("GET")
            .path("/api/snapshot")
            .reply(&snapshot_route(ctx))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        let body = String::from_utf8_lossy(res.body()).to_string();
        assert!(body.contains("\"loading\":true"));
    }

    #[tokio::test]
    async fn test_save_config_round_trip() {
        let provider = Arc::new(FakeProvider::new());
        let (ctx, store) = test_context(provider.clone()).await;

        let user = provider.set_authenticated();
        let mut rx = ctx.gate.subscribe();
        while !rx.borrow_and_update().is_authenticated() {
            rx.changed().await.unwrap();
        }

        let res = warp::test::request()
            .method("POST")
            .path("/api/config")
            .json(&serde_json::json!({
                "traffic_threshold": "2500",
                "connection_rate": "100",
                "protocol_blacklist": "ICMP,IGMP",
            }))
            .reply(&save_config_route(ctx.clone()))
            .await;
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(store.stored_config(user.id).unwrap().traffic_threshold, 2500);

        // A bad number is rejected before anything is persisted.
        let res = warp::test::request()
            .method("POST")
            .path("/api/config")
            .json(&serde_json::json!({
                "traffic_threshold": "a lot",
                "connection_rate": "100",
                "protocol_blacklist": "ICMP",
            }))
            .reply(&save_config_route(ctx))
            .await;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(store.stored_config(user.id).unwrap().traffic_threshold, 2500);
    }
}
