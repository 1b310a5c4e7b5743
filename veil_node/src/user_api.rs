//! The user process: message sending, terminal delivery and diagnostics.

use std::sync::Arc;

use anyhow::{Context, Error};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use log::info;
use reqwest::Client;

use veil_core::sender::Sender;
use veil_crypto::decode_text;
use veil_packet::NodeId;

use crate::client::{HttpDirectory, HttpTransport};
use crate::models::*;
use crate::node_config::NodeConfig;

type UserState = Arc<Sender<HttpDirectory, HttpTransport>>;

/// Run one user participant until the process is stopped.
pub async fn run(config: NodeConfig) -> Result<(), Error> {
    let client = Client::new();
    let sender = Sender::new(
        config.id,
        HttpDirectory::new(client.clone(), config.registry_url.clone()),
        HttpTransport::new(client, config.addressing.clone()),
    );

    let port = config.bind_port().context("user port out of range")?;
    let addr = format!("{}:{}", config.addressing.host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await
        .with_context(|| format!("Failed to bind user to {}", addr))?;
    info!("User {} is listening on {}", config.id, addr);
    axum::serve(listener, router(Arc::new(sender))).await?;
    Ok(())
}

/// Build one user's route table.
pub fn router(sender: UserState) -> Router {
    Router::new()
        .route("/status", get(status))
        .route("/message", post(message))
        .route("/sendMessage", post(send_message))
        .route("/getLastReceivedMessage", get(last_received))
        .route("/getLastSentMessage", get(last_sent))
        .with_state(sender)
}

async fn status() -> &'static str {
    "live"
}

/// Terminal delivery: the exit relay posts the transport-encoded plaintext
/// here.
async fn message(
    State(sender): State<UserState>,
    Json(body): Json<MessageBody>,
) -> Result<Json<SuccessBody>, (StatusCode, Json<ErrorBody>)> {
    let plain = decode_text(&body.message)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody {
            error: format!("Invalid message encoding: {}", e),
        })))?;
    let plain = String::from_utf8(plain)
        .map_err(|e| (StatusCode::BAD_REQUEST, Json(ErrorBody {
            error: format!("Message is not valid UTF-8: {}", e),
        })))?;
    sender.record_received(&plain);
    Ok(Json(SuccessBody { success: true }))
}

async fn send_message(
    State(sender): State<UserState>,
    Json(body): Json<SendMessageBody>,
) -> Result<Json<SuccessBody>, (StatusCode, Json<ErrorBody>)> {
    sender.send_message(NodeId(body.destination_user_id), &body.message).await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorBody {
            error: e.to_string(),
        })))?;
    Ok(Json(SuccessBody { success: true }))
}

async fn last_received(State(sender): State<UserState>) -> Json<ResultBody<String>> {
    Json(ResultBody { result: sender.observation().last_received_message })
}

async fn last_sent(State(sender): State<UserState>) -> Json<ResultBody<String>> {
    Json(ResultBody { result: sender.observation().last_sent_message })
}
