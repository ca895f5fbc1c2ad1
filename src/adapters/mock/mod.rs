//! Test doubles for the trait abstractions.
//!
//! - [`MockHttpClient`] - HTTP client with configurable responses and
//!   request recording

pub mod http;

pub use http::{MockHttpClient, MockResponse, RecordedRequest};
