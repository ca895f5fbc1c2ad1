//! Trait abstractions at the crate's I/O boundary.
//!
//! - [`HttpClient`] - HTTP operations (GET, POST, DELETE, streaming POST)

pub mod http;

pub use http::{ByteStream, Headers, HttpClient, HttpError, Response};
