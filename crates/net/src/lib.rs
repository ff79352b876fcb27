use std::io::Read;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use core_types::Method;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

const CHUNK_SIZE: usize = 16 * 1024;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NetConfig {
    pub user_agent: String,
    pub timeout_ms: u64,
    /// Redirect hops followed before giving up (fetch uses 20).
    pub max_redirects: usize,
    pub max_body_bytes: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("pageshift/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_ms: 10_000,
            max_redirects: 20,
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    /// True when at least one redirect was followed to reach `url`.
    pub redirected: bool,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum NetError {
    #[error("request cancelled")]
    Cancelled,
    #[error("invalid url {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("transport error: {0}")]
    Transport(String),
    #[error("too many redirects (limit {0})")]
    TooManyRedirects(usize),
    #[error("response body exceeds {0} bytes")]
    BodyTooLarge(usize),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tls setup failed: {0}")]
    Tls(String),
}

fn tls_config() -> Result<Arc<rustls::ClientConfig>, NetError> {
    let mut roots = rustls::RootCertStore::empty();
    let native = rustls_native_certs::load_native_certs();
    for err in &native.errors {
        log::warn!(target: "net", "skipping native certificate source: {err}");
    }
    let (added, ignored) = roots.add_parsable_certificates(native.certs);
    log::trace!(target: "net", "loaded {added} native roots ({ignored} ignored)");

    let config = rustls::ClientConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .map_err(|e| NetError::Tls(e.to_string()))?
    .with_root_certificates(roots)
    .with_no_client_auth();
    Ok(Arc::new(config))
}

/// Builds the shared agent. Redirects are disabled here; `fetch` follows them itself so it
/// can report `redirected` and apply fetch's method-rewrite rules.
pub fn build_agent(config: &NetConfig) -> Result<ureq::Agent, NetError> {
    Ok(ureq::AgentBuilder::new()
        .redirects(0)
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(&config.user_agent)
        .tls_config(tls_config()?)
        .build())
}

fn check_cancel(cancel: &AtomicBool) -> Result<(), NetError> {
    if cancel.load(Ordering::Acquire) {
        return Err(NetError::Cancelled);
    }
    Ok(())
}

fn parse_url(url: &str) -> Result<Url, NetError> {
    Url::parse(url).map_err(|source| NetError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

fn is_redirect(status: u16) -> bool {
    matches!(status, 301 | 302 | 303 | 307 | 308)
}

/// Method and body to use for the next hop, per the fetch redirect rules.
fn redirect_method(status: u16, method: Method, body: Option<Vec<u8>>) -> (Method, Option<Vec<u8>>) {
    match status {
        303 if method != Method::Head => (Method::Get, None),
        301 | 302 if method == Method::Post => (Method::Get, None),
        _ => (method, body),
    }
}

/// Performs `request` on the calling thread, following redirects and honouring `cancel`
/// between hops and between body chunks.
pub fn fetch(
    agent: &ureq::Agent,
    config: &NetConfig,
    request: &HttpRequest,
    cancel: &AtomicBool,
) -> Result<HttpResponse, NetError> {
    let start = Instant::now();
    let mut url = parse_url(&request.url)?;
    let mut method = request.method;
    let mut body = request.body.clone();
    let mut redirects = 0usize;

    let response = loop {
        check_cancel(cancel)?;
        log::trace!(target: "net", "{method} {url}");

        let mut call = agent.request(method.as_str(), url.as_str());
        for (name, value) in &request.headers {
            // Body headers do not survive a hop that dropped the body.
            if body.is_none() && name.eq_ignore_ascii_case("content-type") {
                continue;
            }
            call = call.set(name, value);
        }
        let result = match &body {
            Some(bytes) => call.send_bytes(bytes),
            None => call.call(),
        };
        let response = match result {
            Ok(response) => response,
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => return Err(NetError::Transport(err.to_string())),
        };

        let status = response.status();
        let location = response.header("location").map(str::to_string);
        match location {
            Some(location) if is_redirect(status) => {
                if redirects >= config.max_redirects {
                    return Err(NetError::TooManyRedirects(config.max_redirects));
                }
                redirects += 1;
                let next = url.join(&location).map_err(|source| NetError::InvalidUrl {
                    url: location.clone(),
                    source,
                })?;
                log::trace!(target: "net", "{status} redirect {url} -> {next}");
                (method, body) = redirect_method(status, method, body.take());
                url = next;
            }
            _ => break response,
        }
    };

    let status = response.status();
    let content_type = response.header("content-type").map(str::to_string);
    let mut reader = response.into_reader();
    let mut buf = Vec::new();
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        check_cancel(cancel)?;
        let n = reader.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        if buf.len() + n > config.max_body_bytes {
            return Err(NetError::BodyTooLarge(config.max_body_bytes));
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    log::debug!(
        target: "net",
        "{} {} -> {status} ({} bytes, {} redirects, {} ms)",
        request.method,
        request.url,
        buf.len(),
        redirects,
        start.elapsed().as_millis()
    );

    Ok(HttpResponse {
        url: url.to_string(),
        status,
        redirected: redirects > 0,
        content_type,
        body: buf,
    })
}
