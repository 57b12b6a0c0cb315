//! Purpose: Library crate behind the `jsonfetch` CLI.
//! Exports: `api` (fetch operations, options, errors).
//! Role: Blocking HTTP GET followed by JSON decoding, nothing more.
//! Invariants: One call issues exactly one request; no retries, no caching.
//! Invariants: `core` stays private; `api` is the only public path.
pub mod api;
mod core;
