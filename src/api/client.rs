//! Purpose: Blocking HTTP client that GETs a URL and decodes the JSON body.
//! Exports: `FetchClient`, `FetchOptions`, `StatusPolicy`.
//! Role: Glue between `ureq` (transport + TLS) and the core decode boundary.
//! Invariants: Each fetch issues exactly one logical GET (redirects are followed by ureq).
//! Invariants: No retries, no caching; failures propagate to the caller unchanged.
//! Invariants: Invalid or non-http(s) URLs fail as `Transport` before any I/O.
#![allow(clippy::result_large_err)]

use crate::core::body::read_capped;
use crate::core::decode::{JsonMap, decode_object, decode_typed, decode_value};
use crate::core::error::{Error, ErrorKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use ureq::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use ureq::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use ureq::rustls::{ClientConfig, DigitallySignedStruct, Error as TlsError, SignatureScheme};
use url::Url;

type ApiResult<T> = Result<T, Error>;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_REDIRECTS: u32 = 5;
pub const DEFAULT_MAX_BODY_BYTES: u64 = 16 * 1024 * 1024;

/// What to do with a response whose status is outside `200..=299`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StatusPolicy {
    /// Fail with `ErrorKind::Status`.
    #[default]
    Fail,
    /// Decode the body as if the request had succeeded.
    Decode,
}

#[derive(Clone, Debug)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
    pub user_agent: String,
    pub headers: Vec<(String, String)>,
    pub max_redirects: u32,
    pub max_body_bytes: u64,
    pub status_policy: StatusPolicy,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            user_agent: concat!("jsonfetch/", env!("CARGO_PKG_VERSION")).to_string(),
            headers: Vec::new(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            status_policy: StatusPolicy::Fail,
        }
    }
}

impl FetchOptions {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn with_status_policy(mut self, policy: StatusPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    pub fn with_max_body_bytes(mut self, limit: u64) -> Self {
        self.max_body_bytes = limit;
        self
    }
}

#[derive(Clone)]
pub struct FetchClient {
    inner: Arc<FetchClientInner>,
}

struct FetchClientInner {
    options: FetchOptions,
    agent: ureq::Agent,
}

#[derive(Debug)]
struct NoCertificateVerification;

impl ServerCertVerifier for NoCertificateVerification {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, TlsError> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, TlsError> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        ureq::rustls::crypto::aws_lc_rs::default_provider()
            .signature_verification_algorithms
            .supported_schemes()
    }
}

impl Default for FetchClient {
    fn default() -> Self {
        Self::new()
    }
}

impl FetchClient {
    pub fn new() -> Self {
        Self::with_options(FetchOptions::default())
    }

    pub fn with_options(options: FetchOptions) -> Self {
        let agent = build_agent(&options, None);
        Self {
            inner: Arc::new(FetchClientInner { options, agent }),
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.inner.options
    }

    /// Trust only the certificates in a PEM bundle for HTTPS requests.
    pub fn with_tls_ca_file(self, path: impl AsRef<Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let cert_bytes = std::fs::read(path).map_err(|err| {
            Error::new(ErrorKind::Usage)
                .with_message(format!("failed to read TLS CA file {display}"))
                .with_source(err)
        })?;
        let mut cert_reader = Cursor::new(cert_bytes);
        let certs = rustls_pemfile::certs(&mut cert_reader)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| {
                Error::new(ErrorKind::Usage)
                    .with_message(format!("failed to parse TLS CA file {display}"))
                    .with_source(err)
            })?;
        if certs.is_empty() {
            return Err(Error::new(ErrorKind::Usage)
                .with_message(format!("TLS CA file {display} contains no certificates"))
                .with_hint("Expected PEM `-----BEGIN CERTIFICATE-----` blocks."));
        }

        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let mut root_store = ureq::rustls::RootCertStore::empty();
        let (added, _) = root_store.add_parsable_certificates(certs);
        if added == 0 {
            return Err(Error::new(ErrorKind::Usage).with_message(format!(
                "TLS CA file {display} contains no parsable certificates"
            )));
        }

        let tls_config = ClientConfig::builder()
            .with_root_certificates(root_store)
            .with_no_client_auth();
        Ok(self.with_tls_config(tls_config))
    }

    /// Accept any server certificate. Only for test servers with throwaway certs.
    pub fn with_tls_skip_verify(self) -> Self {
        let _ = ureq::rustls::crypto::aws_lc_rs::default_provider().install_default();
        let tls_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(NoCertificateVerification))
            .with_no_client_auth();
        self.with_tls_config(tls_config)
    }

    /// GET `url` and return its top-level JSON object.
    pub fn fetch_data(&self, url: &str) -> ApiResult<JsonMap> {
        let body = self.fetch_body(url)?;
        decode_object(&body).map_err(|err| err.with_url(url))
    }

    /// GET `url` and return whatever JSON value the body holds.
    pub fn fetch_value(&self, url: &str) -> ApiResult<Value> {
        let body = self.fetch_body(url)?;
        decode_value(&body).map_err(|err| err.with_url(url))
    }

    /// GET `url` and deserialize the body into `T`.
    pub fn fetch_json<T: DeserializeOwned>(&self, url: &str) -> ApiResult<T> {
        let body = self.fetch_body(url)?;
        decode_typed(&body).map_err(|err| err.with_url(url))
    }

    fn fetch_body(&self, raw_url: &str) -> ApiResult<Vec<u8>> {
        let url = parse_fetch_url(raw_url)?;
        let options = &self.inner.options;

        let mut request = self
            .inner
            .agent
            .get(url.as_str())
            .set("Accept", "application/json");
        for (name, value) in &options.headers {
            request = request.set(name, value);
        }

        debug!(url = %url, "sending request");
        let response = match request.call() {
            Ok(resp) => resp,
            Err(ureq::Error::Status(code, resp)) => match options.status_policy {
                StatusPolicy::Fail => return Err(status_error(code, &resp, &url)),
                StatusPolicy::Decode => resp,
            },
            Err(ureq::Error::Transport(err)) => {
                return Err(transport_error(err).with_url(url.as_str()));
            }
        };

        let status = response.status();
        if !(200..=299).contains(&status) && options.status_policy == StatusPolicy::Fail {
            return Err(status_error(status, &response, &url));
        }

        let body = read_capped(response.into_reader(), options.max_body_bytes)
            .map_err(|err| err.with_url(url.as_str()))?;
        debug!(status, bytes = body.len(), "received response");
        Ok(body)
    }

    fn with_tls_config(self, tls_config: ClientConfig) -> Self {
        let options = self.inner.options.clone();
        let agent = build_agent(&options, Some(Arc::new(tls_config)));
        Self {
            inner: Arc::new(FetchClientInner { options, agent }),
        }
    }
}

fn build_agent(options: &FetchOptions, tls_config: Option<Arc<ClientConfig>>) -> ureq::Agent {
    let mut builder = ureq::AgentBuilder::new()
        .timeout_connect(options.connect_timeout)
        .timeout_read(options.read_timeout)
        .redirects(options.max_redirects)
        .user_agent(&options.user_agent);
    if let Some(tls_config) = tls_config {
        builder = builder.tls_config(tls_config);
    }
    builder.build()
}

fn parse_fetch_url(raw: &str) -> ApiResult<Url> {
    if raw.trim().is_empty() {
        return Err(Error::new(ErrorKind::Transport)
            .with_message("url is empty")
            .with_hint("Pass an absolute http:// or https:// URL."));
    }
    let url = Url::parse(raw).map_err(|err| {
        Error::new(ErrorKind::Transport)
            .with_message("invalid url")
            .with_url(raw)
            .with_hint("Pass an absolute http:// or https:// URL.")
            .with_source(err)
    })?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(Error::new(ErrorKind::Transport)
            .with_message(format!("unsupported url scheme `{scheme}`"))
            .with_url(raw)
            .with_hint("Only http and https URLs can be fetched.")),
    }
}

fn transport_error(err: ureq::Transport) -> Error {
    let message = match err.kind() {
        ureq::ErrorKind::Dns => "dns lookup failed",
        ureq::ErrorKind::ConnectionFailed => "connection failed",
        ureq::ErrorKind::TooManyRedirects => "too many redirects",
        ureq::ErrorKind::InvalidUrl | ureq::ErrorKind::UnknownScheme => "invalid url",
        ureq::ErrorKind::Io => "i/o error during request",
        _ => "request failed",
    };
    Error::new(ErrorKind::Transport)
        .with_message(message)
        .with_source(err)
}

fn status_error(status: u16, response: &ureq::Response, url: &Url) -> Error {
    let mut err = Error::new(ErrorKind::Status)
        .with_message(format!(
            "server returned HTTP {status} {}",
            response.status_text()
        ))
        .with_url(url.as_str())
        .with_status(status);
    if (400..=599).contains(&status) {
        err = err.with_hint(
            "Use `StatusPolicy::Decode` (`--allow-error-status`) to decode error bodies.",
        );
    }
    err
}
