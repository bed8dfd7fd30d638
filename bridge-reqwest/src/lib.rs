//! # Reqwest Transport Bridge
//!
//! Desktop/server implementation of the [`bridge_traits::HttpClient`]
//! transport seam, backed by reqwest with rustls.

pub mod http;

pub use http::ReqwestHttpClient;
