//! Purpose: Public Rust API for fetching JSON documents over HTTP.
//! Exports: `fetch_data` and friends, `FetchClient`, `FetchOptions`, error types.
//! Role: Stable boundary used by the CLI and by library callers.
//! Invariants: Free functions use `FetchOptions::default()` (bounded timeouts).
//! Invariants: Internal modules remain private and are not directly exposed.

mod client;

pub use crate::core::decode::JsonMap;
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use client::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_MAX_BODY_BYTES, DEFAULT_MAX_REDIRECTS, DEFAULT_READ_TIMEOUT,
    FetchClient, FetchOptions, StatusPolicy,
};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// GET `url` and return the top-level JSON object of the response body.
///
/// Fails with `ErrorKind::Transport` when the URL is invalid or the server
/// cannot be reached, `ErrorKind::Status` on a non-2xx response, and
/// `ErrorKind::Decode` when the body is not a JSON object.
///
/// ```no_run
/// let post = jsonfetch::api::fetch_data("https://jsonplaceholder.typicode.com/posts/1")?;
/// assert_eq!(post["id"], 1);
/// # Ok::<(), jsonfetch::api::Error>(())
/// ```
pub fn fetch_data(url: &str) -> Result<JsonMap, Error> {
    FetchClient::new().fetch_data(url)
}

/// Like [`fetch_data`], but accepts any top-level JSON value.
pub fn fetch_value(url: &str) -> Result<Value, Error> {
    FetchClient::new().fetch_value(url)
}

pub fn fetch_json<T: DeserializeOwned>(url: &str) -> Result<T, Error> {
    FetchClient::new().fetch_json(url)
}
