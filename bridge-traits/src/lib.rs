//! # Transport Traits
//!
//! Abstractions over the socket-level HTTP transport. The connection crate
//! depends only on these traits; concrete implementations (reqwest on
//! desktop/server targets) live in sibling crates.

pub mod error;
pub mod http;

pub use error::{Result, TransportError};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartForm};
