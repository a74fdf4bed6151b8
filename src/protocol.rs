// Push-channel wire format: JSON envelopes `{ "type": ..., "data": ... }` on /api/ws.

use serde::Deserialize;
use thiserror::Error;

use crate::aggregator::Message;
use crate::models::{DockerContainer, MetricSnapshot};

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed push frame: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("unsupported push frame type {0:?}")]
    UnknownType(String),
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct ClientPayload {
    server_id: String,
    metrics: MetricSnapshot,
}

/// Decode one text frame into a tagged message for the aggregator.
pub fn decode_frame(text: &str) -> Result<Message, ProtocolError> {
    let envelope: RawEnvelope = serde_json::from_str(text)?;
    match envelope.kind.as_str() {
        "system" => {
            let snapshot: MetricSnapshot = serde_json::from_value(envelope.data)?;
            Ok(Message::SystemSnapshot(snapshot))
        }
        "docker" => {
            // No running containers is sent as `null`
            let containers: Option<Vec<DockerContainer>> = serde_json::from_value(envelope.data)?;
            Ok(Message::DockerSnapshot(containers.unwrap_or_default()))
        }
        "client" => {
            let payload: ClientPayload = serde_json::from_value(envelope.data)?;
            Ok(Message::ClientPatch {
                server_id: payload.server_id,
                metrics: payload.metrics,
            })
        }
        other => Err(ProtocolError::UnknownType(other.to_string())),
    }
}
