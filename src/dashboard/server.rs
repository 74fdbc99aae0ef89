// src/dashboard/server.rs
use crate::dashboard::controller::DashboardController;
use crate::dashboard::state::{DashboardEvent, DashboardState, StateUpdate};
use crate::domain::errors::AppResult;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::service::{make_service_fn, service_fn};
use hyper::{Body, Method, Request, Response, Server, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct DispatchRequest {
    pub event: DashboardEvent,
    #[serde(default)]
    pub state: DashboardState,
}

#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub updates: Vec<StateUpdate>,
}

/// Serve the dashboard API until Ctrl-C
pub async fn serve(addr: SocketAddr, controller: Arc<DashboardController>) -> AppResult<()> {
    let make_svc = make_service_fn(move |_conn| {
        let controller = Arc::clone(&controller);
        async move {
            Ok::<_, Infallible>(service_fn(move |req| route(Arc::clone(&controller), req)))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_svc);
    log::info!("Dashboard API listening on http://{}", addr);

    server.with_graceful_shutdown(shutdown_signal()).await?;
    log::info!("Dashboard API stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => log::info!("Received Ctrl-C, shutting down"),
        Err(e) => log::error!("Failed to listen for Ctrl-C: {}", e),
    }
}

pub async fn route(
    controller: Arc<DashboardController>,
    req: Request<Body>,
) -> Result<Response<Body>, Infallible> {
    log::debug!("{} {}", req.method(), req.uri().path());

    let response = match (req.method(), req.uri().path()) {
        (&Method::GET, "/api/layout") => json_response(StatusCode::OK, &controller.layout()),
        (&Method::POST, "/api/dispatch") => dispatch(&controller, req).await,
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    };

    Ok(response)
}

async fn dispatch(controller: &DashboardController, req: Request<Body>) -> Response<Body> {
    let bytes = match hyper::body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    };

    let request: DispatchRequest = match serde_json::from_slice(&bytes) {
        Ok(request) => request,
        Err(e) => {
            log::warn!("Rejected dispatch body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid dispatch body: {}", e));
        }
    };

    if request.event.is_internal() {
        log::warn!("Rejected external {:?} event", request.event);
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("{:?} cannot be dispatched by clients", request.event),
        );
    }

    let updates = controller.dispatch(request.event, &request.state).await;
    json_response(StatusCode::OK, &DispatchResponse { updates })
}

fn json_response<T: Serialize>(status: StatusCode, value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(bytes) => {
            let mut response = Response::new(Body::from(bytes));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
            response
        }
        Err(e) => {
            log::error!("Failed to serialize response: {}", e);
            let mut response = Response::new(Body::empty());
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Body> {
    json_response(status, &json!({ "error": message }))
}
