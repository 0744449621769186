//! Transport client for the Sahayak assistant backend.
//!
//! The heart of this crate is [`TextStreamDecoder`], which turns the
//! `data: {"text": ...}\n\n` record stream served by `/api/generate` into text
//! tokens, and [`TokenStream`], which exposes the same decoding as a lazy
//! [`futures_util::Stream`] over an HTTP response body.
//!
//! [`SahayakClient`] wraps the backend endpoints the browser front end talks
//! to: streaming generation, mermaid diagram generation, reading analysis and
//! the teacher dashboard's student routes. Rendering and audio capture are not
//! part of this crate.

pub mod client;
pub mod config;
pub mod decoder;
pub mod diagram;
pub mod error;
pub mod payload;
pub mod stream;
pub mod url;

pub use client::SahayakClient;
pub use config::SahayakConfig;
pub use decoder::TextStreamDecoder;
pub use error::SahayakApiError;
pub use payload::{
    Assessment, Content, GenerateRequest, Part, ReadingSample, Role, StudentProfile, StudentQuery,
};
pub use stream::TokenStream;
pub use crate::url::join_endpoint;
