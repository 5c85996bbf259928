//! HTTP surface of the ticket engine
//!
//! A thin axum router over [`TicketEngine`]. Callers are expected to have
//! passed the upstream permission gate, which forwards the caller identity
//! in the `x-actor-id` / `x-actor-override` headers.

mod actor;
mod error;
mod routes;

pub use actor::{ACTOR_ID_HEADER, ACTOR_OVERRIDE_HEADER, RequestActor};
pub use error::{ApiError, ErrorBody};
pub use routes::{
    AssignTicketRequest, CompleteTicketRequest, HistoryQuery, HistoryResponse,
    RateTicketRequest, TicketResponse, TransitionTicketRequest,
};

use crate::config::ServerConfig;
use crate::engine::TicketEngine;
use crate::error::Result;
use axum::Router;
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct ApiState {
    pub engine: Arc<TicketEngine>,
}

impl ApiState {
    #[must_use]
    pub const fn new(engine: Arc<TicketEngine>) -> Self {
        Self { engine }
    }
}

pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/assign-ticket", post(routes::assign_ticket))
        .route("/complete-ticket", post(routes::complete_ticket))
        .route("/transition-ticket", post(routes::transition_ticket))
        .route("/rate-ticket", post(routes::rate_ticket))
        .route("/ticket-status-history", get(routes::ticket_status_history))
        .route("/technician-workload", get(routes::technician_workload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn build_router(state: ApiState) -> Router {
    router(Arc::new(state))
}

/// Bind and serve until Ctrl-C
pub async fn serve(engine: Arc<TicketEngine>, config: &ServerConfig) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Service desk API listening on {}", listener.local_addr()?);

    axum::serve(listener, build_router(ApiState::new(engine)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Service desk API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::core::{Actor, CustomerId, Priority, Status, Technician, Ticket};
    use crate::notify::Notifier;
    use crate::storage::MemoryStore;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    struct Fixture {
        engine: Arc<TicketEngine>,
        router: Router,
    }

    impl Fixture {
        fn new() -> Self {
            let engine = Arc::new(TicketEngine::new(
                Arc::new(MemoryStore::new()),
                Notifier::disabled(),
                &EngineConfig::default(),
            ));
            let router = build_router(ApiState::new(engine.clone()));
            Self { engine, router }
        }

        async fn ticket(&self, subject: &str) -> Ticket {
            self.engine
                .open_ticket(CustomerId::new(), subject, Priority::High, &Actor::system())
                .await
                .unwrap()
        }

        async fn technician(&self, name: &str, capacity: u32) -> Technician {
            self.engine
                .register_technician(Technician::new(name, capacity))
                .await
                .unwrap()
        }

        async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
            let response = self.router.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            let body = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, body)
        }
    }

    fn post(uri: &str, actor: &str, admin: bool, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .header(ACTOR_ID_HEADER, actor)
            .header(ACTOR_OVERRIDE_HEADER, admin.to_string())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_assign_then_complete() {
        let fixture = Fixture::new();
        let technician = fixture.technician("Ada", 2).await;
        let ticket = fixture.ticket("Printer jam").await;
        let admin = Uuid::new_v4().to_string();

        let (status, body) = fixture
            .call(post(
                "/assign-ticket",
                &admin,
                true,
                json!({"ticketId": ticket.id, "technicianId": technician.id}),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["status"], "IN_PROGRESS");

        let (status, body) = fixture
            .call(post(
                "/complete-ticket",
                &technician.id.to_string(),
                false,
                json!({
                    "ticketId": ticket.id,
                    "status": "RESOLVED",
                    "resolutionNotes": "Cleared the feed roller",
                    "timeSpentHours": 0.5
                }),
            ))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["ticket"]["status"], "RESOLVED");

        let (status, body) = fixture
            .call(get_request(&format!(
                "/ticket-status-history?ticketId={}",
                ticket.id
            )))
            .await;
        assert_eq!(status, StatusCode::OK);
        let entries = body["entries"].as_array().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0]["new_status"], "RESOLVED");
    }

    #[tokio::test]
    async fn test_error_mapping() {
        let fixture = Fixture::new();
        let technician = fixture.technician("Solo", 1).await;
        let first = fixture.ticket("First").await;
        let second = fixture.ticket("Second").await;
        let admin = Uuid::new_v4().to_string();

        let assign = |ticket: &Ticket| {
            post(
                "/assign-ticket",
                &admin,
                true,
                json!({"ticketId": ticket.id, "technicianId": technician.id}),
            )
        };
        assert_eq!(fixture.call(assign(&first)).await.0, StatusCode::OK);

        let (status, body) = fixture.call(assign(&second)).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "CAPACITY_EXCEEDED");

        let stranger = Uuid::new_v4().to_string();
        let (status, body) = fixture
            .call(post(
                "/complete-ticket",
                &stranger,
                false,
                json!({"ticketId": first.id, "status": "RESOLVED", "resolutionNotes": "done"}),
            ))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "FORBIDDEN");

        let (status, _) = fixture
            .call(get_request(&format!(
                "/ticket-status-history?ticketId={}",
                Uuid::new_v4()
            )))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bad_requests_are_validation_errors() {
        let fixture = Fixture::new();
        let ticket = fixture.ticket("Headset").await;

        let missing_actor = Request::builder()
            .method("POST")
            .uri("/rate-ticket")
            .header("content-type", "application/json")
            .body(Body::from(json!({"ticketId": ticket.id, "rating": 5}).to_string()))
            .unwrap();
        let (status, body) = fixture.call(missing_actor).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "VALIDATION_ERROR");

        let (status, _) = fixture
            .call(post(
                "/transition-ticket",
                &Uuid::new_v4().to_string(),
                true,
                json!({"ticketId": ticket.id, "status": "SOMEWHERE"}),
            ))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, _) = fixture
            .call(get_request("/ticket-status-history?ticketId=nope"))
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_workload_endpoint() {
        let fixture = Fixture::new();
        fixture.technician("Grace", 4).await;
        let waiting = fixture.ticket("Waiting").await;

        let (status, body) = fixture.call(get_request("/technician-workload")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["technicians"][0]["name"], "Grace");
        assert_eq!(body["technicians"][0]["workloadPercentage"], 0.0);
        assert_eq!(body["unassignedQueue"][0]["id"], json!(waiting.id));
        assert_eq!(waiting.status, Status::Open);
    }
}
