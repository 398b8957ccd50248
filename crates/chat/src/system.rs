use cutroom_store::models::SystemPayload;
use tracing::warn;

/// Parses the JSON payload embedded in a system message's content column.
///
/// The payload is authored by serverless functions we do not control, so a
/// malformed blob must never take the render down: it is logged and the
/// message is omitted.
pub fn parse_system_payload(content: &str) -> Option<SystemPayload> {
    match serde_json::from_str::<SystemPayload>(content) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(%e, "Malformed system-message payload, omitting entry");
            None
        }
    }
}
