use crate::error::{Result, ScanError};
use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
pub const MAX_REDIRECTS: usize = 10;
/// Bodies are cut off after this many bytes.
pub const DEFAULT_MAX_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Media types that never carry links worth parsing. JSON variants
/// (`application/json`, `application/ld+json`, ...) are skipped too.
const NON_MARKUP_PREFIXES: [&str; 7] = [
    "image/",
    "audio/",
    "video/",
    "font/",
    "application/pdf",
    "application/octet-stream",
    "application/zip",
];

/// A successfully fetched (2xx) page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL that was requested.
    pub url: String,
    /// URL the response came from after redirects.
    pub final_url: Url,
    pub status_code: u16,
    pub content_type: Option<String>,
    pub response_time: Duration,
    pub body: String,
    truncated: bool,
}

impl FetchedPage {
    /// Whether the body should be parsed for links and text. Every `text/*`
    /// body qualifies, as does a response with no content type; only media
    /// and data formats are skipped.
    pub fn has_markup(&self) -> bool {
        let Some(ref content_type) = self.content_type else {
            return true;
        };
        let mime = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        let binary = NON_MARKUP_PREFIXES.iter().any(|p| mime.starts_with(p));
        !(binary || mime.contains("json"))
    }

    /// Whether the body was cut off at the size limit.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

pub(crate) fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(concat!("linkdepth/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .connect_timeout(timeout)
        .pool_max_idle_per_host(50)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .build()
        .map_err(ScanError::HttpError)
}

/// GET `url`, holding one connection permit for the duration of the request.
///
/// Non-2xx responses are errors; nothing is retried. At most `max_body`
/// bytes of the body are kept.
pub(crate) async fn fetch_page(
    client: &Client,
    permits: &Arc<Semaphore>,
    url: &str,
    max_body: usize,
) -> Result<FetchedPage> {
    let _permit = permits.acquire().await.map_err(|_| ScanError::Closed)?;
    debug!("Fetching {}", url);

    let start = Instant::now();
    let mut response = client.get(url).send().await?;
    let status = response.status();

    if !status.is_success() {
        return Err(ScanError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let final_url = response.url().clone();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    let mut bytes: Vec<u8> = Vec::new();
    let mut truncated = false;
    while let Some(chunk) = response.chunk().await? {
        let room = max_body - bytes.len();
        if chunk.len() > room {
            bytes.extend_from_slice(&chunk[..room]);
            truncated = true;
            break;
        }
        bytes.extend_from_slice(&chunk);
    }
    if truncated {
        warn!("Body of {} cut off at {} bytes", url, max_body);
    }
    let body = String::from_utf8_lossy(&bytes).into_owned();

    Ok(FetchedPage {
        url: url.to_string(),
        final_url,
        status_code: status.as_u16(),
        content_type,
        response_time: start.elapsed(),
        body,
        truncated,
    })
}
