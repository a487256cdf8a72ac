//! HTTP client for the Addarr backend.
//!
//! The [`resolver::EndpointResolver`] picks the base URL every request is
//! sent to, and [`client::AddarrClient`] wraps the version/update endpoints
//! on top of it.

pub mod client;
pub mod error;
pub mod resolver;
pub mod store;
pub mod traits;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

pub use client::AddarrClient;
pub use error::ApiError;
pub use resolver::{EndpointResolver, ResolverOptions, BASE_URL_KEY};
pub use store::MemoryStore;
pub use traits::{PreferenceStore, Transport};
pub use transport::{ApiRequest, ApiResponse, FetchOptions, Method, ReqwestTransport};
