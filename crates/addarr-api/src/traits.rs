//! Seams between the resolver and the outside world.
//!
//! The resolver only ever talks to the network through [`Transport`] and only
//! ever persists through [`PreferenceStore`], so both can be swapped for
//! in-memory versions in tests.

use std::future::Future;

use crate::error::ApiError;
use crate::transport::{ApiRequest, ApiResponse};

/// Sends one HTTP request.
///
/// Implementations return `Ok` for every response the server produced,
/// whatever its status code. Timeouts are applied by the caller.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send;
}

/// A tiny string key-value store for client preferences.
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`. Callers treat failures as non-fatal.
    fn set(&self, key: &str, value: &str) -> std::io::Result<()>;

    /// Drop `key` entirely.
    fn remove(&self, key: &str) -> std::io::Result<()>;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn send(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, ApiError>> + Send {
        (**self).send(request)
    }
}

impl<S: PreferenceStore> PreferenceStore for std::sync::Arc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> std::io::Result<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> std::io::Result<()> {
        (**self).remove(key)
    }
}
