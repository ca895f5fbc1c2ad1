//! Client for the model server's HTTP API.

mod client;
mod error;

pub use client::{OllamaClient, REQUEST_ID_HEADER};
pub use error::ClientError;
