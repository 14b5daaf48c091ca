//! Log tailing.
//!
//! The running process writes its log file; the streamer reads it back line
//! by line, polling for growth until the task leaves the process table.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use futures_util::Stream;
use reelflow_models::StreamMessage;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::debug;

use crate::launcher::file_label;
use crate::metrics;

/// Everything a streamer needs to follow one running task.
#[derive(Debug, Clone)]
pub struct LogSubscription {
    pub name: String,
    pub log_path: PathBuf,
    pub poll_interval: Duration,
    alive: watch::Receiver<bool>,
}

impl LogSubscription {
    pub fn new(
        name: impl Into<String>,
        log_path: PathBuf,
        poll_interval: Duration,
        alive: watch::Receiver<bool>,
    ) -> Self {
        Self {
            name: name.into(),
            log_path,
            poll_interval,
            alive,
        }
    }

    /// Whether the task is still in the process table.
    pub fn is_live(&self) -> bool {
        self.alive.has_changed().is_ok() && *self.alive.borrow()
    }
}

/// Stream the log of a running task.
///
/// `None` (task not running) yields a single `NotFound` message. Otherwise
/// the stream yields `Connected`, every existing line, every line appended
/// afterwards, and ends with `Finished` within one poll interval of the task
/// leaving the table. A trailing line without its newline is held back until
/// it is completed, or flushed as the last line when the task ends. Dropping
/// the stream closes the file.
pub fn log_stream(subscription: Option<LogSubscription>) -> impl Stream<Item = StreamMessage> + Send {
    async_stream::stream! {
        let Some(subscription) = subscription else {
            yield StreamMessage::NotFound;
            return;
        };

        let _guard = StreamGauge::open();
        yield StreamMessage::Connected;

        let file = match tokio::fs::File::open(&subscription.log_path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                yield StreamMessage::log_file_missing(file_label(&subscription.log_path));
                return;
            }
            Err(e) => {
                yield StreamMessage::error(e.to_string());
                return;
            }
        };

        let mut reader = BufReader::new(file);
        let mut pending = Vec::new();

        loop {
            match next_line(&mut reader, &mut pending).await {
                Ok(Some(line)) => {
                    yield StreamMessage::line(line);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    yield StreamMessage::error(e.to_string());
                    return;
                }
            }

            tokio::time::sleep(subscription.poll_interval).await;
            if subscription.is_live() {
                continue;
            }

            // Task is gone: drain what is left, then stop.
            loop {
                match next_line(&mut reader, &mut pending).await {
                    Ok(Some(line)) => yield StreamMessage::line(line),
                    Ok(None) => break,
                    Err(e) => {
                        yield StreamMessage::error(e.to_string());
                        return;
                    }
                }
            }
            if !pending.is_empty() {
                yield StreamMessage::line(decode_line(&pending));
            }
            break;
        }

        debug!(task = %subscription.name, "Log stream finished");
        yield StreamMessage::Finished;
    }
}

/// Read the next complete line.
///
/// Returns `Ok(None)` when no complete line is available yet; a partial line
/// stays in `pending` for the next call.
async fn next_line<R>(reader: &mut R, pending: &mut Vec<u8>) -> std::io::Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let read = reader.read_until(b'\n', pending).await?;
    if read == 0 || pending.last() != Some(&b'\n') {
        return Ok(None);
    }

    let line = decode_line(pending);
    pending.clear();
    Ok(Some(line))
}

fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}

/// Keeps the active-stream gauge accurate on every exit path.
struct StreamGauge;

impl StreamGauge {
    fn open() -> Self {
        metrics::log_stream_opened();
        StreamGauge
    }
}

impl Drop for StreamGauge {
    fn drop(&mut self) {
        metrics::log_stream_closed();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::io::Write;

    fn subscription(path: PathBuf) -> (LogSubscription, watch::Sender<bool>) {
        let (tx, rx) = watch::channel(true);
        (
            LogSubscription::new("Build", path, Duration::from_millis(10), rx),
            tx,
        )
    }

    #[tokio::test]
    async fn test_not_running_yields_single_message() {
        let messages: Vec<_> = log_stream(None).collect().await;
        assert_eq!(messages, vec![StreamMessage::NotFound]);
    }

    #[tokio::test]
    async fn test_missing_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let (sub, _tx) = subscription(dir.path().join("Build.log"));

        let messages: Vec<_> = log_stream(Some(sub)).collect().await;
        assert_eq!(
            messages,
            vec![
                StreamMessage::Connected,
                StreamMessage::log_file_missing("Build.log")
            ]
        );
    }

    #[tokio::test]
    async fn test_streams_existing_and_appended_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Build.log");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "step 1").unwrap();

        let (sub, tx) = subscription(path.clone());
        let mut stream = Box::pin(log_stream(Some(sub)));

        assert_eq!(stream.next().await, Some(StreamMessage::Connected));
        assert_eq!(stream.next().await, Some(StreamMessage::line("step 1")));

        // Partial line is held until completed
        write!(file, "step ").unwrap();
        file.flush().unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        write!(file, "2\r\nstep 3").unwrap();
        file.flush().unwrap();

        assert_eq!(stream.next().await, Some(StreamMessage::line("step 2")));

        // Task leaves the table; unterminated tail is flushed
        drop(tx);
        assert_eq!(stream.next().await, Some(StreamMessage::line("step 3")));
        assert_eq!(stream.next().await, Some(StreamMessage::Finished));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_stops_when_liveness_flag_drops() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Build.log");
        std::fs::write(&path, "").unwrap();

        let (sub, tx) = subscription(path);
        tx.send_replace(false);

        let messages: Vec<_> = log_stream(Some(sub)).collect().await;
        assert_eq!(messages, vec![StreamMessage::Connected, StreamMessage::Finished]);
    }

    #[tokio::test]
    async fn test_next_line_decodes_utf8() {
        let data: &[u8] = "caf\u{e9}\n".as_bytes();
        let mut reader = BufReader::new(data);
        let mut pending = Vec::new();

        assert_eq!(
            next_line(&mut reader, &mut pending).await.unwrap(),
            Some("caf\u{e9}".to_string())
        );
        assert_eq!(next_line(&mut reader, &mut pending).await.unwrap(), None);
    }
}
