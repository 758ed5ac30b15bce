use std::ops::ControlFlow;
use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Body, Method, RequestBuilder, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::io::ReaderStream;

use crate::error::{Result, ShilpError};
use crate::sse::{SseDecoder, SseMessage};

/// HTTP plumbing shared by every facade call.
///
/// Owns the connection session (`reqwest::Client`), which pools connections
/// across calls and clones.
#[derive(Clone, Debug)]
pub(crate) struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpTransport {
    pub(crate) fn new(base_url: &str, timeout: Duration, http: reqwest::Client) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| ShilpError::Config(format!("invalid base url {base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ShilpError::Config(format!(
                "base url cannot carry a path: {base_url}"
            )));
        }
        Ok(Self {
            http,
            base_url,
            timeout,
        })
    }

    pub(crate) fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Join path segments onto the base url, percent-encoding each one.
    pub(crate) fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                ShilpError::Config(format!("base url cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.url(segments)?;
        let request = self.http.get(url.clone()).query(query);
        let response = self.execute(Method::GET, &url, request).await?;
        decode_json(&url, response).await
    }

    /// Send a request with an optional JSON body and decode the JSON answer.
    pub(crate) async fn send_json<B, T>(
        &self,
        method: Method,
        segments: &[&str],
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(segments)?;
        let mut request = self.http.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = self.execute(method, &url, request).await?;
        decode_json(&url, response).await
    }

    /// Multipart upload of a local file as the `file` part, with an optional
    /// JSON `options` part.
    pub(crate) async fn upload<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        file_path: &Path,
        options: Option<Value>,
    ) -> Result<T> {
        let url = self.url(segments)?;
        let file = tokio::fs::File::open(file_path).await?;
        let size = file.metadata().await?.len();
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        tracing::debug!(path = %file_path.display(), size, "uploading file");

        let body = Body::wrap_stream(ReaderStream::new(file));
        let mut form = Form::new().part(
            "file",
            Part::stream_with_length(body, size).file_name(file_name),
        );
        if let Some(options) = options {
            form = form.text("options", options.to_string());
        }

        let request = self.http.post(url.clone()).multipart(form);
        let response = self.execute(Method::POST, &url, request).await?;
        decode_json(&url, response).await
    }

    /// Open a binary download; the body is consumed by the returned stream.
    ///
    /// The timeout bounds the wait for the response head and then each read
    /// separately, so a large body may take as long as the caller needs.
    pub(crate) async fn download(&self, segments: &[&str]) -> Result<ExportStream> {
        let url = self.url(segments)?;
        let request = self.http.get(url.clone());
        let response = self.execute_streamed(Method::GET, &url, request).await?;
        Ok(ExportStream {
            response,
            read_timeout: self.timeout,
        })
    }

    /// Subscribe to an event stream, handing each event to `on_event` until the
    /// server closes the stream or the callback breaks.
    ///
    /// The timeout applies to the response head and to each read, not to the
    /// lifetime of the stream.
    pub(crate) async fn event_stream<F>(&self, segments: &[&str], mut on_event: F) -> Result<()>
    where
        F: FnMut(SseMessage) -> Result<ControlFlow<()>>,
    {
        let url = self.url(segments)?;
        let request = self
            .http
            .get(url.clone())
            .header(reqwest::header::ACCEPT, "text/event-stream");
        let mut response = self.execute_streamed(Method::GET, &url, request).await?;

        let mut decoder = SseDecoder::new();
        let mut delivered = 0usize;
        while let Some(chunk) = read_chunk(&mut response, self.timeout).await? {
            for msg in decoder.feed(&chunk) {
                delivered += 1;
                if on_event(msg)?.is_break() {
                    tracing::debug!(url = %url, delivered, "event stream stopped by caller");
                    return Ok(());
                }
            }
        }
        tracing::debug!(url = %url, delivered, "event stream closed by server");
        Ok(())
    }

    /// Send a request whose whole exchange, body included, must finish within
    /// the timeout.
    async fn execute(&self, method: Method, url: &Url, request: RequestBuilder) -> Result<Response> {
        tracing::debug!(%method, path = url.path(), "sending request");
        let response = request
            .timeout(self.timeout)
            .send()
            .await
            .map_err(ShilpError::Transport)?;
        check_status(&method, url, response).await
    }

    /// Send a request whose body is read later; only the wait for the
    /// response head is bounded here.
    async fn execute_streamed(
        &self,
        method: Method,
        url: &Url,
        request: RequestBuilder,
    ) -> Result<Response> {
        tracing::debug!(%method, path = url.path(), "opening stream");
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| ShilpError::Timeout(self.timeout))?
            .map_err(ShilpError::Transport)?;
        check_status(&method, url, response).await
    }
}

async fn check_status(method: &Method, url: &Url, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_default();
    tracing::warn!(%method, path = url.path(), status = status.as_u16(), %message, "request failed");
    Err(ShilpError::Http {
        status: status.as_u16(),
        message,
    })
}

/// Next body chunk, waiting at most `read_timeout` for it.
async fn read_chunk(response: &mut Response, read_timeout: Duration) -> Result<Option<Vec<u8>>> {
    let chunk = tokio::time::timeout(read_timeout, response.chunk())
        .await
        .map_err(|_| ShilpError::Timeout(read_timeout))?
        .map_err(ShilpError::Transport)?;
    Ok(chunk.map(|b| b.to_vec()))
}

/// Prefer the server's `message` field; fall back to the raw body.
fn error_message(body: &str) -> Option<String> {
    let body = body.trim();
    if body.is_empty() {
        return None;
    }
    let from_json = serde_json::from_str::<Value>(body).ok().and_then(|v| {
        ["message", "error"]
            .iter()
            .find_map(|key| v.get(*key).and_then(Value::as_str).map(str::to_string))
    });
    Some(from_json.unwrap_or_else(|| body.to_string()))
}

async fn decode_json<T: DeserializeOwned>(url: &Url, response: Response) -> Result<T> {
    let bytes = response.bytes().await.map_err(ShilpError::Transport)?;
    if bytes.is_empty() {
        return Err(ShilpError::Decode(format!(
            "empty response body from {}",
            url.path()
        )));
    }
    serde_json::from_slice(&bytes)
        .map_err(|e| ShilpError::Decode(format!("unexpected response from {}: {e}", url.path())))
}

/// Open binary body of a collection export.
///
/// Nothing is read until the caller asks for it; dropping the stream early
/// releases the underlying connection.
#[derive(Debug)]
pub struct ExportStream {
    response: Response,
    read_timeout: Duration,
}

impl ExportStream {
    pub fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    /// Next chunk of the body, or `None` once it is exhausted.
    ///
    /// Each call waits at most the client timeout for data; time spent
    /// between calls does not count.
    pub async fn chunk(&mut self) -> Result<Option<Vec<u8>>> {
        read_chunk(&mut self.response, self.read_timeout).await
    }

    /// Read the remaining body into memory.
    pub async fn bytes(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = read_chunk(&mut self.response, self.read_timeout).await? {
            out.extend(chunk);
        }
        Ok(out)
    }

    /// Stream the remaining body into `writer`; returns the number of bytes written.
    pub async fn copy_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = read_chunk(&mut self.response, self.read_timeout).await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    /// Stream the remaining body into a new file at `path`.
    pub async fn save_to(self, path: impl AsRef<Path>) -> Result<u64> {
        let mut file = tokio::fs::File::create(path.as_ref()).await?;
        self.copy_to(&mut file).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport(base: &str) -> HttpTransport {
        HttpTransport::new(base, Duration::from_secs(5), reqwest::Client::new()).unwrap()
    }

    #[test]
    fn url_joins_and_encodes_segments() {
        let t = transport("http://localhost:3000");
        let url = t.url(&["collections", "my docs", "records", "a/b"]).unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:3000/collections/my%20docs/records/a%2Fb"
        );
    }

    #[test]
    fn url_keeps_base_path_prefix() {
        let t = transport("http://localhost:3000/api");
        let url = t.url(&["health"]).unwrap();
        assert_eq!(url.as_str(), "http://localhost:3000/api/health");
    }

    #[test]
    fn invalid_base_url_is_config_error() {
        let err = HttpTransport::new("not a url", Duration::from_secs(1), reqwest::Client::new())
            .unwrap_err();
        assert!(matches!(err, ShilpError::Config(_)));
    }

    #[test]
    fn error_message_prefers_json_message() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"collection not found"}"#).as_deref(),
            Some("collection not found")
        );
        assert_eq!(error_message("boom").as_deref(), Some("boom"));
        assert_eq!(error_message("  "), None);
    }
}
