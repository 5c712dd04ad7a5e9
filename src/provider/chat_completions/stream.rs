use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::GatewayError;
use crate::http::HttpBodyStream;
use crate::provider::or_cancelled;
use crate::sink::StreamSink;
use crate::stream::{SseEvent, StreamDecoder};

use super::response::stream_event;
use super::types::VendorStreamChunk;

/// Reads an open SSE body and delivers one event per decoded chunk to `sink`.
///
/// Returns the number of delivered events once the vendor sends `[DONE]` or the body
/// ends. Chunks that fail to decode are logged and skipped. The body is dropped on
/// every exit path, which releases the connection.
pub(crate) async fn pump_events(
    body: HttpBodyStream,
    session_id: &str,
    sink: &mut dyn StreamSink,
    cancel: &CancellationToken,
) -> Result<usize, GatewayError> {
    let mut decoder = StreamDecoder::new(body);
    let mut model = String::new();
    let mut delivered = 0;

    while let Some(item) = or_cancelled(cancel, decoder.next()).await? {
        let data = match item? {
            SseEvent::Done => break,
            SseEvent::Data(data) => data,
        };
        let chunk: VendorStreamChunk = match serde_json::from_str(&data) {
            Ok(chunk) => chunk,
            Err(err) => {
                warn!(session_id, error = %err, data = %data, "skipping undecodable stream chunk");
                continue;
            }
        };
        let event = stream_event(chunk, session_id, &mut model);
        or_cancelled(cancel, sink.deliver(event))
            .await?
            .map_err(|source| GatewayError::SinkAbort { source })?;
        delivered += 1;
    }

    Ok(delivered)
}

/// Drains an error body for diagnostics. Read failures end collection silently.
pub(crate) async fn collect_body_text(mut body: HttpBodyStream, cancel: &CancellationToken) -> String {
    let mut bytes = Vec::new();
    while let Ok(Some(Ok(chunk))) = or_cancelled(cancel, body.next()).await {
        bytes.extend_from_slice(&chunk);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}
