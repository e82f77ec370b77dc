use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::common::{DomainError, DomainResult};
use crate::domains::logger::DynLogger;
use crate::domains::movement::FeedEvent;

/// Parse one line of the push feed. Blank lines yield `Ok(None)`.
pub fn parse_feed_line(line: &str) -> DomainResult<Option<FeedEvent>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line)
        .map(Some)
        .map_err(|e| DomainError::malformed(e.to_string()))
}

/// Read newline-delimited JSON events from `reader` and forward them to `tx`.
/// Malformed lines are dropped at debug level. The task ends (closing the feed)
/// at end of input, on a read error, or when the receiver goes away.
pub fn spawn_jsonl_feed<R>(reader: R, tx: mpsc::Sender<FeedEvent>, logger: DynLogger) -> JoinHandle<usize>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut forwarded = 0;
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    logger.error(&format!("Feed read failed: {}", e));
                    break;
                }
            };
            match parse_feed_line(&line) {
                Ok(Some(event)) => {
                    if tx.send(event).await.is_err() {
                        break;
                    }
                    forwarded += 1;
                }
                Ok(None) => {}
                Err(e) => logger.debug(&format!("Dropping feed line: {}", e)),
            }
        }
        forwarded
    })
}
