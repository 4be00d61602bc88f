//! One download attempt: stream a body into `<target>.part`, then rename.

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::StatusCode;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::time::timeout;
use tracing::{debug, info};

use super::progress::TransferProgress;
use crate::fetch::{FetchError, HttpClient};

/// Parameters shared by every attempt for one record.
pub(crate) struct Transfer<'a> {
    pub(crate) client: &'a HttpClient,
    pub(crate) url: &'a str,
    pub(crate) headers: &'a HeaderMap,
    /// Longest wait for the response head or for any single body read.
    pub(crate) idle_timeout: Duration,
    pub(crate) target: &'a Path,
    pub(crate) show_progress: bool,
    pub(crate) label: &'a str,
}

/// Path of the in-progress file for `target`.
pub(crate) fn part_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().map(std::ffi::OsStr::to_os_string).unwrap_or_default();
    name.push(".part");
    target.with_file_name(name)
}

impl Transfer<'_> {
    /// Runs one attempt and returns the final file size.
    ///
    /// A non-empty `.part` from an earlier attempt is resumed with a range
    /// request. The server's answer decides: `206` appends, any other success
    /// starts over. A rejected range request (416, or any other error status)
    /// discards the `.part` so the next attempt fetches from zero. An empty
    /// result is deleted and reported as [`FetchError::EmptyArtifact`].
    pub(crate) async fn attempt(&self) -> Result<u64, FetchError> {
        let part = part_path(self.target);
        let existing = partial_len(&part).await;

        let response = match self
            .client
            .get_stream(
                self.url,
                self.headers.clone(),
                (existing > 0).then_some(existing),
                self.idle_timeout,
            )
            .await
        {
            Ok(response) => response,
            Err(error) => {
                if existing > 0 && matches!(error, FetchError::HttpStatus { .. }) {
                    debug!(
                        url = self.url,
                        %error,
                        "range request rejected, discarding partial file"
                    );
                    remove_quietly(&part).await;
                }
                return Err(error);
            }
        };

        let resumed = existing > 0 && response.status() == StatusCode::PARTIAL_CONTENT;
        if existing > 0 && !resumed {
            debug!(url = self.url, "range not honored, restarting from zero");
        }
        let offset = if resumed { existing } else { 0 };
        let declared_total = declared_length(response.headers()).map(|len| len + offset);

        let file = open_part(&part, resumed).await?;
        let progress =
            TransferProgress::start(self.show_progress, declared_total, offset, self.label);
        let result = stream_body(file, response, self, &part, &progress).await;
        if result.is_ok() {
            progress.finish();
        } else {
            progress.abandon();
        }
        let written = result?;

        let final_size = offset + written;
        if final_size == 0 {
            remove_quietly(&part).await;
            return Err(FetchError::empty_artifact(self.target));
        }
        if resumed && declared_total.is_some_and(|total| total != final_size) {
            remove_quietly(&part).await;
            return Err(FetchError::integrity(
                self.target,
                declared_total.unwrap_or(0),
                final_size,
            ));
        }

        tokio::fs::rename(&part, self.target)
            .await
            .map_err(|e| FetchError::io(self.target, e))?;
        info!(
            path = %self.target.display(),
            bytes = final_size,
            resumed,
            "download complete"
        );
        Ok(final_size)
    }
}

async fn partial_len(part: &Path) -> u64 {
    tokio::fs::metadata(part)
        .await
        .map(|meta| meta.len())
        .unwrap_or(0)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

async fn open_part(part: &Path, append: bool) -> Result<File, FetchError> {
    let mut options = OpenOptions::new();
    if append {
        options.append(true);
    } else {
        options.write(true).truncate(true);
    }
    options
        .create(true)
        .open(part)
        .await
        .map_err(|e| FetchError::io(part, e))
}

/// Streams the body into `file`. Each read waits at most the idle timeout,
/// so a slow transfer that keeps delivering bytes is never cut off. Bytes
/// received before a failure stay in the `.part` for the next attempt.
async fn stream_body(
    file: File,
    response: reqwest::Response,
    transfer: &Transfer<'_>,
    part: &Path,
    progress: &TransferProgress,
) -> Result<u64, FetchError> {
    let url = transfer.url;
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;
    let mut interrupted = None;

    loop {
        let chunk = match timeout(transfer.idle_timeout, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => {
                interrupted = Some(FetchError::network(url, e));
                break;
            }
            Ok(None) => break,
            Err(_) => {
                interrupted = Some(FetchError::timeout(url));
                break;
            }
        };
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(part, e))?;
        written += chunk.len() as u64;
        progress.advance(chunk.len() as u64);
    }

    writer.flush().await.map_err(|e| FetchError::io(part, e))?;
    match interrupted {
        Some(error) => Err(error),
        None => Ok(written),
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(error) = tokio::fs::remove_file(path).await {
        debug!(path = %path.display(), %error, "could not remove partial file");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use reqwest::header::HeaderValue;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    use super::*;
    use crate::config::HttpConfig;

    /// Serves one response that declares `declared` bytes and sends `body`
    /// one byte per `gap`, then holds the connection open.
    async fn serve_trickle(declared: usize, body: &'static [u8], gap: Duration) -> Option<String> {
        let Ok(listener) = TcpListener::bind("127.0.0.1:0").await else {
            eprintln!("[socket-bound-test] cannot bind localhost socket. Skipping test.");
            return None;
        };
        let addr = listener.local_addr().ok()?;
        tokio::spawn(async move {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut request = [0u8; 2048];
            let _ = socket.read(&mut request).await;
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            );
            let _ = socket.write_all(head.as_bytes()).await;
            let _ = socket.flush().await;
            for byte in body {
                tokio::time::sleep(gap).await;
                let _ = socket.write_all(&[*byte]).await;
                let _ = socket.flush().await;
            }
            tokio::time::sleep(Duration::from_secs(30)).await;
        });
        Some(format!("http://{addr}/slow.pdf"))
    }

    async fn run_attempt(
        url: &str,
        target: &Path,
        idle_timeout: Duration,
    ) -> Result<u64, FetchError> {
        let client = HttpClient::new(&HttpConfig::default()).unwrap();
        let headers = HeaderMap::new();
        let transfer = Transfer {
            client: &client,
            url,
            headers: &headers,
            idle_timeout,
            target,
            show_progress: false,
            label: "slow.pdf",
        };
        transfer.attempt().await
    }

    #[tokio::test]
    async fn test_slow_but_live_body_outlasts_idle_timeout() {
        let Some(url) = serve_trickle(4, b"%PDF", Duration::from_millis(400)).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("slow.pdf");

        let started = std::time::Instant::now();
        let size = run_attempt(&url, &target, Duration::from_secs(1)).await.unwrap();

        assert!(started.elapsed() > Duration::from_secs(1));
        assert_eq!(size, 4);
        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF");
    }

    #[tokio::test]
    async fn test_stalled_body_times_out_and_keeps_part() {
        let Some(url) = serve_trickle(4, b"%", Duration::from_millis(50)).await else {
            return;
        };
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("slow.pdf");

        let result = run_attempt(&url, &target, Duration::from_millis(500)).await;

        assert!(
            matches!(result, Err(FetchError::Timeout { .. })),
            "expected timeout, got {result:?}"
        );
        assert!(!target.exists());
        assert_eq!(std::fs::read(part_path(&target)).unwrap(), b"%");
    }

    #[test]
    fn test_part_path_appends_suffix() {
        assert_eq!(
            part_path(Path::new("/tmp/dl/spec.pdf")),
            PathBuf::from("/tmp/dl/spec.pdf.part")
        );
    }

    #[test]
    fn test_declared_length_ignores_garbage() {
        let mut headers = HeaderMap::new();
        assert_eq!(declared_length(&headers), None);
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("12"));
        assert_eq!(declared_length(&headers), Some(12));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("twelve"));
        assert_eq!(declared_length(&headers), None);
    }
}
