//! Webhook handler for GitHub push events

use axum::{
    body::Body,
    extract::Query,
    extract::State as AxumState,
    http::{HeaderMap, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::collections::HashMap;
use tokio_stream::StreamExt;
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::SharedState;
use crate::dispatch::dispatch;
use crate::error::{DispatchError, Result};
use crate::utils::{verify_github_signature, verify_github_signature_256};
use crate::webhook::{extract_payload, parse_push_event};

const SIGNATURE_HEADER: &str = "X-Hub-Signature";
const SIGNATURE_256_HEADER: &str = "X-Hub-Signature-256";
const EVENT_HEADER: &str = "X-GitHub-Event";
const DELIVERY_HEADER: &str = "X-GitHub-Delivery";
const DRY_RUN_HEADER: &str = "X-Dry-Run";

/// Handles the GitHub webhook request.
///
/// Verifies the signature, ignores anything but `push`, then runs the commands
/// configured for the pushed repository before responding.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    method: Method,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Body,
) -> Response {
    let request_id = Uuid::now_v7();
    let delivery = header_str(&headers, DELIVERY_HEADER).unwrap_or("-").to_string();
    let span = info_span!("webhook", %request_id, %delivery);

    async move {
        match process_webhook(&state, method, &params, &headers, body).await {
            Ok(status) => status.into_response(),
            Err(e) => {
                if e.status_code().is_server_error() {
                    error!("Webhook failed: {}", e);
                } else {
                    warn!("Webhook rejected: {}", e);
                }
                e.into_response()
            }
        }
    }
    .instrument(span)
    .await
}

async fn process_webhook(
    state: &SharedState,
    method: Method,
    params: &HashMap<String, String>,
    headers: &HeaderMap,
    body: Body,
) -> Result<StatusCode> {
    if method != Method::POST {
        return Err(DispatchError::InvalidMethod);
    }

    let body = read_body(headers, body, state.max_payload_size).await?;

    if state.config.signature_required() {
        verify_request(headers, &state.config.security.secret, &body)?;
    }

    // Only handle "push" events.
    let event_type = header_str(headers, EVENT_HEADER);
    if event_type != Some("push") {
        info!("Not push event; Received {:?} event", event_type);
        return Ok(StatusCode::OK);
    }

    let content_type = header_str(headers, header::CONTENT_TYPE.as_str()).unwrap_or("");
    let payload = extract_payload(content_type, &body)?;
    let event = parse_push_event(&payload)?;
    debug!("{:#?}", &event);

    let dry_run = params.get("dry_run").map(|v| v == "true").unwrap_or(false)
        || headers.contains_key(DRY_RUN_HEADER);

    info!(
        "Push event for '{}' ref {:?}{}",
        event.repository_name(),
        event.r#ref.as_deref().unwrap_or("(none)"),
        if dry_run { " [DRY_RUN]" } else { "" }
    );

    // The commands run on their own task so a client hang-up, which drops this
    // future, cannot cut the sequence short.
    let repository = event.repository_name().to_string();
    let task_state = state.clone();
    let task = tokio::spawn(
        async move {
            dispatch(&task_state.config, task_state.runner.as_ref(), &event, dry_run).await
        }
        .in_current_span(),
    );
    let count = task
        .await
        .map_err(|e| DispatchError::TaskFailed(e.to_string()))??;
    info!("Completed {} command(s) for '{}'", count, repository);
    Ok(StatusCode::OK)
}

/// Checks `X-Hub-Signature-256` when GitHub sent one, `X-Hub-Signature` otherwise.
fn verify_request(headers: &HeaderMap, secret: &str, body: &[u8]) -> Result<()> {
    let valid = if let Some(signature) = header_str(headers, SIGNATURE_256_HEADER) {
        verify_github_signature_256(signature, secret, body)
    } else if let Some(signature) = header_str(headers, SIGNATURE_HEADER) {
        verify_github_signature(signature, secret, body)
    } else {
        return Err(DispatchError::MissingSignature);
    };

    if valid {
        Ok(())
    } else {
        Err(DispatchError::InvalidSignature)
    }
}

/// Reads the whole body, refusing anything over `limit` bytes.
async fn read_body(headers: &HeaderMap, body: Body, limit: usize) -> Result<Vec<u8>> {
    let declared = header_str(headers, header::CONTENT_LENGTH.as_str())
        .and_then(|len| len.parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(DispatchError::BodyTooLarge { limit });
    }

    let mut buf = Vec::with_capacity(declared.unwrap_or(0));
    let mut stream = body.into_data_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DispatchError::ReadFailure(e.to_string()))?;
        if buf.len() + chunk.len() > limit {
            return Err(DispatchError::BodyTooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}
