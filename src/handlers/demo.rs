//! Demo handler exercising plain, chunked and trailer responses.

use std::path::PathBuf;

use futures_util::future::BoxFuture;
use sha2::{Digest, Sha256};
use tokio::io::AsyncWrite;

use crate::config::DemoConfig;
use crate::http::handler::{Handler, HandlerError};
use crate::http::headers::Headers;
use crate::http::request::Request;
use crate::http::response::{ResponseWriter, StatusCode};

const RELAY_PREFIX: &str = "/httpbin";
const VIDEO_PATH: &str = "/video";
const VIDEO_FILE: &str = "vim.mp4";

const SHA256_TRAILER: &str = "X-Content-SHA256";
const LENGTH_TRAILER: &str = "X-Content-Length";

const SUCCESS_PAGE: &str = r#"<html>
  <head>
    <title>200 OK</title>
  </head>
  <body>
    <h1>Success!</h1>
    <p>Your request was an absolute banger.</p>
  </body>
</html>
"#;

/// Routes requests to the relay, the video asset or the success page.
#[derive(Debug, Clone)]
pub struct DemoHandler {
    client: reqwest::Client,
    relay_base_url: String,
    assets_dir: PathBuf,
}

impl DemoHandler {
    pub fn new(config: &DemoConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self::with_client(config, client))
    }

    /// Use a preconfigured HTTP client for the relay.
    pub fn with_client(config: &DemoConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            relay_base_url: config.relay_base_url.trim_end_matches('/').to_string(),
            assets_dir: PathBuf::from(&config.assets_dir),
        }
    }

    /// Upstream URL for a relay target, or `None` if the target is not relayed.
    fn relay_url(&self, target: &str) -> Option<String> {
        let rest = target.strip_prefix(RELAY_PREFIX)?;
        if !rest.is_empty() && !rest.starts_with('/') {
            return None;
        }
        Some(format!(
            "{}/{}",
            self.relay_base_url,
            rest.trim_start_matches('/')
        ))
    }

    async fn relay<W>(&self, writer: &mut ResponseWriter<W>, url: &str) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        tracing::debug!(url = %url, "Relaying upstream body");
        let mut upstream = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HandlerError::internal(format!("upstream request failed: {e}")))?;

        let mut headers = Headers::new();
        headers.set("Transfer-Encoding", "chunked");
        let mut trailers = Headers::new();
        trailers.set(SHA256_TRAILER, "");
        trailers.set(LENGTH_TRAILER, "");

        writer.write_status_line(StatusCode::OK).await?;
        writer
            .write_headers(Some(&headers), &["Content-Length"], Some(&trailers))
            .await?;

        let mut hasher = Sha256::new();
        let mut total = 0usize;
        while let Some(chunk) = upstream
            .chunk()
            .await
            .map_err(|e| HandlerError::internal(format!("upstream body failed: {e}")))?
        {
            hasher.update(&chunk);
            total += chunk.len();
            writer.write_chunked_body(&chunk).await?;
        }
        writer.write_chunked_body_done().await?;

        trailers.replace(SHA256_TRAILER, format!("{:x}", hasher.finalize()));
        trailers.replace(LENGTH_TRAILER, total.to_string());
        writer.write_trailers(&trailers).await?;

        tracing::debug!(url = %url, bytes = total, "Relay complete");
        Ok(())
    }

    async fn video<W>(&self, writer: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let path = self.assets_dir.join(VIDEO_FILE);
        let data = tokio::fs::read(&path).await.map_err(|e| {
            HandlerError::internal(format!("failed to read {}: {e}", path.display()))
        })?;

        let mut headers = Headers::new();
        headers.set("Content-Type", "video/mp4");
        headers.set("Content-Length", data.len().to_string());

        writer.write_status_line(StatusCode::OK).await?;
        writer.write_headers(Some(&headers), &[], None).await?;
        writer.write_body(&data).await?;
        Ok(())
    }

    async fn page<W>(&self, writer: &mut ResponseWriter<W>) -> Result<(), HandlerError>
    where
        W: AsyncWrite + Unpin + Send,
    {
        let mut headers = Headers::new();
        headers.set("Content-Type", "text/html");
        headers.set("Content-Length", SUCCESS_PAGE.len().to_string());

        writer.write_status_line(StatusCode::OK).await?;
        writer.write_headers(Some(&headers), &[], None).await?;
        writer.write_body(SUCCESS_PAGE.as_bytes()).await?;
        Ok(())
    }
}

impl Handler for DemoHandler {
    fn handle<'a, W>(
        &'a self,
        writer: &'a mut ResponseWriter<W>,
        request: &'a Request,
    ) -> BoxFuture<'a, Result<(), HandlerError>>
    where
        W: AsyncWrite + Unpin + Send + 'a,
    {
        Box::pin(async move {
            let target = request.target();
            if let Some(url) = self.relay_url(target) {
                self.relay(writer, &url).await
            } else if target == VIDEO_PATH {
                self.video(writer).await
            } else {
                self.page(writer).await
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::http::request::RequestParser;
    use crate::http::response::WriterStage;

    fn request(target: &str) -> Request {
        let raw = format!("GET {target} HTTP/1.1\r\nHost: localhost:42069\r\n\r\n");
        let mut parser = RequestParser::new();
        parser.parse(raw.as_bytes()).unwrap();
        parser.into_request().unwrap()
    }

    fn handler(config: DemoConfig) -> DemoHandler {
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        DemoHandler::with_client(&config, client)
    }

    async fn respond(
        handler: &DemoHandler,
        target: &str,
    ) -> (Result<(), HandlerError>, ResponseWriter<Vec<u8>>) {
        let mut writer = ResponseWriter::new(Vec::new());
        let result = handler.handle(&mut writer, &request(target)).await;
        (result, writer)
    }

    #[test]
    fn relay_urls() {
        let h = handler(DemoConfig {
            relay_base_url: "https://httpbin.org/".into(),
            ..DemoConfig::default()
        });
        assert_eq!(
            h.relay_url("/httpbin/stream/100").as_deref(),
            Some("https://httpbin.org/stream/100")
        );
        assert_eq!(h.relay_url("/httpbin").as_deref(), Some("https://httpbin.org/"));
        assert_eq!(h.relay_url("/httpbinary"), None);
        assert_eq!(h.relay_url("/video"), None);
    }

    #[tokio::test]
    async fn other_targets_get_html_page() {
        let (result, writer) = respond(&handler(DemoConfig::default()), "/yourproblem").await;
        result.unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        let expected_head = format!(
            "HTTP/1.1 200 OK\r\n\
             connection: close\r\n\
             content-length: {}\r\n\
             content-type: text/html\r\n\
             \r\n",
            SUCCESS_PAGE.len()
        );
        assert!(out.starts_with(&expected_head));
        assert!(out.ends_with(SUCCESS_PAGE));
    }

    #[tokio::test]
    async fn video_is_served_from_assets_dir() {
        let dir = std::env::temp_dir().join(format!("tcp-http-assets-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(VIDEO_FILE), b"\x00\x00\x00\x18ftypmp42").unwrap();

        let h = handler(DemoConfig {
            assets_dir: dir.to_string_lossy().into_owned(),
            ..DemoConfig::default()
        });
        let (result, writer) = respond(&h, "/video").await;
        result.unwrap();

        let out = writer.into_inner();
        let head = String::from_utf8_lossy(&out[..out.len() - 12]);
        assert!(head.contains("content-type: video/mp4\r\n"));
        assert!(head.contains("content-length: 12\r\n"));
        assert!(out.ends_with(b"\x00\x00\x00\x18ftypmp42"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_video_fails_before_writing() {
        let h = handler(DemoConfig {
            assets_dir: "/definitely/not/here".into(),
            ..DemoConfig::default()
        });
        let (result, writer) = respond(&h, "/video").await;

        let err = result.unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(writer.stage(), WriterStage::StatusLine);
        assert!(writer.into_inner().is_empty());
    }

    /// Serves one canned HTTP response and returns its base URL.
    async fn upstream(body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await.unwrap();
            let reply = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn relay_streams_chunks_with_trailers() {
        let h = handler(DemoConfig {
            relay_base_url: upstream("hello").await,
            ..DemoConfig::default()
        });
        let (result, writer) = respond(&h, "/httpbin/get").await;
        result.unwrap();

        let out = String::from_utf8(writer.into_inner()).unwrap();
        assert!(out.starts_with(
            "HTTP/1.1 200 OK\r\n\
             connection: close\r\n\
             content-type: text/plain\r\n\
             transfer-encoding: chunked\r\n\
             Trailer: x-content-length\r\n\
             Trailer: x-content-sha256\r\n\
             \r\n"
        ));
        assert!(!out.contains("\r\ncontent-length"));
        assert!(out.ends_with(
            "0\r\n\
             x-content-length:5\r\n\
             x-content-sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824\r\n\
             \r\n"
        ));
    }
}
