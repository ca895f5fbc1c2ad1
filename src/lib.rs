//! Ollama Chat - incremental streaming client for a local model server
//!
//! Streaming replies are decoded frame by frame ([`stream::FrameDecoder`]),
//! interpreted per wire format ([`stream::StreamFormat`]) and delivered to a
//! [`stream::StreamHandler`] by a [`stream::StreamSession`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod models;
pub mod ollama;
pub mod settings;
pub mod stream;
pub mod traits;
