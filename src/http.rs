//! HTTP control surface: `POST /deliver` injects an MT delivery into a
//! live session.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::datatypes::{DeliverSm, Tlv, tags};
use crate::message::Message;
use crate::registry::Registry;
use crate::session::{self, FINAL_DELIVERY_RECEIPT};

/// Request body for `POST /deliver`. Absent fields decode as empty and are
/// rejected by the handler with a precise message.
#[derive(Debug, Deserialize)]
pub struct SmsParams {
    #[serde(default)]
    pub session: String,
    #[serde(default)]
    pub from: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub message: String,
}

/// Every response is a `{status, message}` JSON body.
#[derive(Debug, Serialize)]
struct SmsRender {
    status: u16,
    message: String,
}

pub struct HttpServer {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl HttpServer {
    pub async fn bind(config: &Config, registry: Arc<Registry>) -> std::io::Result<Self> {
        let listener = TcpListener::bind(config.http_addr).await?;
        info!("listening HTTP on {}", listener.local_addr()?);
        Ok(Self { listener, registry })
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self) -> std::io::Result<()> {
        axum::serve(self.listener, router(self.registry)).await
    }
}

pub fn router(registry: Arc<Registry>) -> Router {
    Router::new()
        .route("/deliver", post(deliver))
        .layer(TraceLayer::new_for_http())
        .with_state(registry)
}

async fn deliver(
    State(registry): State<Arc<Registry>>,
    payload: Result<Json<SmsParams>, JsonRejection>,
) -> Response {
    info!("got a SMS to deliver");

    let params = match payload {
        Ok(Json(params)) => params,
        Err(rejection) => {
            return render(StatusCode::INTERNAL_SERVER_ERROR, rejection.body_text());
        }
    };

    if params.session.is_empty() {
        return render(StatusCode::BAD_REQUEST, "missing session name".into());
    }
    if params.from.is_empty() {
        return render(StatusCode::BAD_REQUEST, "missing from".into());
    }
    if params.to.is_empty() {
        return render(StatusCode::BAD_REQUEST, "missing to".into());
    }
    if params.message.is_empty() {
        return render(StatusCode::BAD_REQUEST, "missing message".into());
    }

    let Some(session) = registry.get(&params.session) else {
        return render(StatusCode::BAD_REQUEST, "session not found".into());
    };

    let id = session::message_id();

    let mut message = Message::new(&params.from, &params.to, &params.message);
    message.registered_delivery = FINAL_DELIVERY_RECEIPT;
    message.tlvs.push(Tlv::cstring(tags::RECEIPTED_MESSAGE_ID, &id));
    message.service_type = session.system_id().to_owned();

    let template = DeliverSm::new();

    // Detached task: a client hanging up must not cancel the send halfway
    // through a PDU write.
    let send = tokio::spawn(async move { session.send(&message, &template).await });

    match send.await {
        Ok(Ok(sequence)) => render(StatusCode::OK, format!("OK {id} ({sequence})")),
        Ok(Err(e)) => render(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        Err(e) => render(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

fn render(status: StatusCode, message: String) -> Response {
    info!("[{}] {}", status.as_u16(), message);

    let body = SmsRender {
        status: status.as_u16(),
        message,
    };
    (status, Json(body)).into_response()
}
