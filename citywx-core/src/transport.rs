use std::{fmt::Debug, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::{FetchError, FetchOutcome};

const USER_AGENT: &str = concat!("citywx/", env!("CARGO_PKG_VERSION"));

/// Raw result of a GET: status code and the full body.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self { status, body: body.into() }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// The body of a successful, non-empty response.
    pub fn into_checked_body(self) -> FetchOutcome<Vec<u8>> {
        if !self.is_success() {
            return Err(FetchError::Status {
                status: self.status,
                body: truncate_body(&String::from_utf8_lossy(&self.body)),
            });
        }

        if self.body.iter().all(u8::is_ascii_whitespace) {
            return Err(FetchError::EmptyBody);
        }

        Ok(self.body)
    }
}

/// Issues a single HTTP GET. Implementations report transport failures as
/// [`FetchError::Network`]; status codes are left to the caller.
#[async_trait]
pub trait HttpTransport: Send + Sync + Debug {
    async fn get(&self, url: &Url) -> FetchOutcome<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    http: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> FetchOutcome<Self> {
        let http = Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &Url) -> FetchOutcome<HttpResponse> {
        let res = self.http.get(url.clone()).send().await?;
        let status = res.status().as_u16();
        let body = res.bytes().await?;

        Ok(HttpResponse { status, body: body.to_vec() })
    }
}

/// Shorten an error body for display, never splitting a character.
pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }

    let mut end = MAX;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

/// URL with the API key masked, for logging.
pub(crate) fn redacted(url: &Url) -> String {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let v = if k == "appid" { "***".to_string() } else { v.into_owned() };
            (k.into_owned(), v)
        })
        .collect();

    if pairs.is_empty() {
        return url.to_string();
    }

    let mut masked = url.clone();
    masked.query_pairs_mut().clear().extend_pairs(pairs);
    masked.to_string()
}
