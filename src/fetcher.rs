use anyhow::Result;
use std::fmt;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// How a single image download failed.
///
/// Every fault on the fetch path becomes one of these values; nothing is
/// raised past [`fetch_image`]. The `Display` text is what gets recorded in
/// the download log's `error` column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request exceeded the configured timeout.
    Timeout,
    /// The server answered with a non-200 status.
    HttpStatus(u16),
    /// Transport-level fault (DNS, connection reset, TLS, ...).
    Transport(String),
    /// The body was received but could not be written to disk.
    Write(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Timeout => write!(f, "request timed out"),
            FetchError::HttpStatus(code) => write!(f, "HTTP {}", code),
            FetchError::Transport(msg) => write!(f, "{}", msg),
            FetchError::Write(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchError {}

/// One HTTP GET, body as bytes. The seam where tests inject a scripted
/// transport instead of the network.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let res = self
            .client
            .get(url)
            .send()
            .await
            .map_err(reqwest_error_to_fetch_error)?;
        let status = res.status();
        if status.as_u16() != 200 {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }
        debug!(status = status.as_u16(), "response received");
        let bytes = res.bytes().await.map_err(reqwest_error_to_fetch_error)?;
        Ok(bytes.to_vec())
    }
}

fn reqwest_error_to_fetch_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Transport(err.to_string())
    }
}

/// Fetches `url` and writes the body to `dest`, overwriting any existing
/// file. The destination is only touched on HTTP 200.
pub async fn fetch_image<T: Transport>(
    transport: &T,
    url: &str,
    dest: &Path,
) -> Result<(), FetchError> {
    let bytes = transport.get(url).await?;
    tokio::fs::write(dest, &bytes)
        .await
        .map_err(|err| FetchError::Write(err.to_string()))?;
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[tokio::test]
    async fn test_fetch_writes_file_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.png");
        let transport = MockTransport::new();
        transport.push_response(Ok(b"image bytes".to_vec()));

        let result = fetch_image(&transport, "http://example.com/img", &dest).await;

        assert!(result.is_ok());
        assert_eq!(std::fs::read(&dest).unwrap(), b"image bytes");
    }

    #[tokio::test]
    async fn test_fetch_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.png");
        std::fs::write(&dest, b"stale partial data").unwrap();
        let transport = MockTransport::new();
        transport.push_response(Ok(b"fresh".to_vec()));

        fetch_image(&transport, "http://example.com/img", &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
    }

    #[tokio::test]
    async fn test_fetch_does_not_create_file_on_http_error() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.png");
        let transport = MockTransport::new();
        transport.push_response(Err(FetchError::HttpStatus(404)));

        let result = fetch_image(&transport, "http://example.com/img", &dest).await;

        assert_eq!(result, Err(FetchError::HttpStatus(404)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_passes_transport_error_through() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("1.png");
        let transport = MockTransport::new();
        transport.push_response(Err(FetchError::Transport("connection reset".to_string())));

        let result = fetch_image(&transport, "http://example.com/img", &dest).await;

        assert_eq!(
            result,
            Err(FetchError::Transport("connection reset".to_string()))
        );
        assert!(!dest.exists());
    }

    #[test]
    fn test_error_text_matches_log_format() {
        assert_eq!(FetchError::HttpStatus(404).to_string(), "HTTP 404");
        assert_eq!(FetchError::Timeout.to_string(), "request timed out");
        assert_eq!(
            FetchError::Transport("dns failure".to_string()).to_string(),
            "dns failure"
        );
    }
}
