//! Concurrent page acquisition.
//!
//! Every candidate URL gets its own tokio task; all tasks are awaited
//! together as one batch. A task that errors, times out, or panics yields
//! absent content for its URL only and never affects its siblings.
//!
//! Each task returns its URL alongside the outcome, so results are paired
//! with their origin rather than by completion order. Documents are
//! assembled only after the whole batch has finished.
//!
//! Non-HTML responses, bodies over `max_bytes`, and bodies that do not
//! decode cleanly all count as no content.
//!
//! # Resolution
//!
//! | Outcome | Document text | `full_fetch` |
//! |---------|---------------|--------------|
//! | no content | search snippet | `false` |
//! | extracted text shorter than `min_text_chars` | search snippet | `false` |
//! | otherwise | extracted text, capped at `max_text_chars` | `true` |

use arbitration_core::models::{Document, SearchHit};
use arbitration_core::text::{char_len, truncate_chars};
use async_trait::async_trait;
use encoding_rs::Encoding;
use futures_util::future::join_all;
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{FetchConfig, MAX_FETCH_URLS};
use crate::extract::html_to_text;

/// Media types treated as pages. A response without a `Content-Type`
/// header is accepted as well.
pub const HTML_CONTENT_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    Timeout,
    HttpStatus(u16),
    EmptyBody,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Decode,
    Network,
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind:?}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Retrieves the body of one page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// HTTP client settings taken from `[fetch]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub accept_invalid_certs: bool,
}

impl ClientOptions {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            timeout: config.timeout(),
            accept_invalid_certs: config.accept_invalid_certs,
        }
    }

    fn build_client(&self) -> Result<reqwest::Client, FetchError> {
        reqwest::Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(|e| FetchError::new(FailureKind::Network, e.to_string()))
    }
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
///
/// Sends a browser user agent and, by default, skips TLS certificate
/// validation: many court and tribunal sites serve broken chains. Only
/// HTML responses up to `max_bytes` are read; the body is streamed so an
/// oversized page is abandoned as soon as it crosses the limit.
#[derive(Debug, Clone)]
pub struct ReqwestPageFetcher {
    client: reqwest::Client,
    options: ClientOptions,
    max_bytes: u64,
}

impl ReqwestPageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let options = ClientOptions::from_config(config);
        let client = options.build_client()?;
        Ok(Self {
            client,
            options,
            max_bytes: config.max_bytes,
        })
    }

    /// The settings the underlying client was built with.
    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    fn too_large(&self, actual: u64) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual: Some(actual),
            },
            "response too large",
        )
    }
}

#[async_trait]
impl PageFetcher for ReqwestPageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| FetchError::new(FailureKind::InvalidUrl, e.to_string()))?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status.as_u16() != 200 {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(self.too_large(len));
            }
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref() {
            if !is_html_content_type(ct) {
                return Err(FetchError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: ct.to_string(),
                    },
                    "unsupported content type",
                ));
            }
        }

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let next_len = bytes.len() as u64 + chunk.len() as u64;
            if next_len > self.max_bytes {
                return Err(self.too_large(next_len));
            }
            bytes.extend_from_slice(&chunk);
        }

        if bytes.is_empty() {
            return Err(FetchError::new(FailureKind::EmptyBody, "empty response body"));
        }
        decode_body(&bytes, content_type.as_deref())
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}

fn is_html_content_type(content_type: &str) -> bool {
    let essence = content_type.split(';').next().unwrap_or(content_type).trim();
    HTML_CONTENT_TYPES
        .iter()
        .any(|allowed| allowed.eq_ignore_ascii_case(essence))
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case("charset") {
            Some(value.trim().trim_matches(&['"', '\''][..]))
        } else {
            None
        }
    })
}

/// Decode a body strictly: BOM, then the header charset, then UTF-8.
///
/// Malformed input is an error rather than replacement characters.
fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<String, FetchError> {
    let encoding = Encoding::for_bom(bytes)
        .map(|(enc, _)| enc)
        .or_else(|| {
            content_type
                .and_then(charset_label)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(FetchError::new(
            FailureKind::Decode,
            format!("body is not valid {}", encoding.name()),
        ));
    }
    Ok(text.into_owned())
}

/// Raw outcome for one URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub html: Option<String>,
}

/// Fetch up to [`MAX_FETCH_URLS`] pages concurrently, in input order.
///
/// Extra URLs beyond the cap are ignored. An empty list returns
/// immediately without network activity.
pub async fn fetch_all(
    fetcher: Arc<dyn PageFetcher>,
    urls: &[String],
    per_request_timeout: Duration,
) -> Vec<FetchedPage> {
    let urls = &urls[..urls.len().min(MAX_FETCH_URLS)];
    if urls.is_empty() {
        return Vec::new();
    }

    let handles = urls.iter().cloned().map(|url| {
        let fetcher = Arc::clone(&fetcher);
        tokio::spawn(async move {
            let html = match tokio::time::timeout(per_request_timeout, fetcher.fetch(&url)).await {
                Ok(Ok(body)) => Some(body),
                Ok(Err(e)) => {
                    debug!(url = %url, error = %e, "page fetch failed");
                    None
                }
                Err(_) => {
                    debug!(url = %url, "page fetch timed out");
                    None
                }
            };
            FetchedPage { url, html }
        })
    });

    let joined = join_all(handles).await;

    urls.iter()
        .zip(joined)
        .map(|(url, outcome)| match outcome {
            Ok(page) => page,
            Err(e) => {
                debug!(url = %url, error = %e, "page fetch task aborted");
                FetchedPage {
                    url: url.clone(),
                    html: None,
                }
            }
        })
        .collect()
}

/// Turn fetched pages into documents using each URL's search hit.
///
/// Pages whose URL has no matching hit are dropped.
pub fn build_documents(hits: &[SearchHit], pages: Vec<FetchedPage>, config: &FetchConfig) -> Vec<Document> {
    let by_url: HashMap<&str, &SearchHit> = hits.iter().map(|h| (h.url.as_str(), h)).collect();

    pages
        .into_iter()
        .filter_map(|page| {
            let hit = by_url.get(page.url.as_str())?;
            Some(resolve_document(hit, page.html.as_deref(), config))
        })
        .collect()
}

fn resolve_document(hit: &SearchHit, html: Option<&str>, config: &FetchConfig) -> Document {
    let Some(html) = html else {
        return Document::from_snippet(hit);
    };

    let text = html_to_text(html);
    if char_len(&text) < config.min_text_chars {
        debug!(url = %hit.url, chars = char_len(&text), "extracted text too short, using snippet");
        return Document::from_snippet(hit);
    }

    Document::from_page(hit, truncate_chars(&text, config.max_text_chars).to_string())
}

/// Fetch stage: acquire and resolve one document per search hit.
pub async fn fetch_documents(
    fetcher: Arc<dyn PageFetcher>,
    hits: &[SearchHit],
    config: &FetchConfig,
) -> Vec<Document> {
    let urls: Vec<String> = hits
        .iter()
        .take(config.max_urls.min(MAX_FETCH_URLS))
        .map(|h| h.url.clone())
        .collect();
    if urls.is_empty() {
        return Vec::new();
    }

    let started = Instant::now();
    let pages = fetch_all(fetcher, &urls, config.timeout()).await;
    let docs = build_documents(hits, pages, config);

    let full = docs.iter().filter(|d| d.full_fetch).count();
    info!(
        full,
        snippets = docs.len() - full,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "fetch stage done"
    );
    docs
}
