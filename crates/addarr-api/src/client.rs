use serde::de::DeserializeOwned;

use crate::error::ApiError;
use crate::resolver::EndpointResolver;
use crate::traits::{PreferenceStore, Transport};
use crate::transport::{ApiResponse, FetchOptions};
use crate::types::{
    AckResponse, ApplyUpdateResponse, DismissRequest, UpdateCheck,
    UpdateNotificationResponse, VersionInfo,
};

const UPDATE_NOTIFICATION_PATH: &str = "/api/version/update-notification";
const CHECK_UPDATE_PATH: &str = "/api/version/check-update";
const APPLY_UPDATE_PATH: &str = "/api/version/apply-update";
const DISMISS_PATH: &str = "/api/update/dismiss";
const VERSION_PATH: &str = "/api/version";

/// Typed calls against the Addarr backend, all routed through the resolver.
pub struct AddarrClient<T, S> {
    resolver: EndpointResolver<T, S>,
}

impl<T: Transport, S: PreferenceStore> AddarrClient<T, S> {
    pub fn new(resolver: EndpointResolver<T, S>) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &EndpointResolver<T, S> {
        &self.resolver
    }

    async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let resp = self.resolver.fetch(path, &FetchOptions::get()).await?;
        resp.error_for_status()?.json()
    }

    async fn post_json<B: serde::Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, ApiError> {
        let options = FetchOptions::post_json(body)?;
        let resp = self.resolver.fetch(path, &options).await?;
        resp.error_for_status()?.json()
    }

    /// An update applied since the last acknowledgement, if any.
    pub async fn update_notification(&self) -> Result<UpdateNotificationResponse, ApiError> {
        self.get_json(UPDATE_NOTIFICATION_PATH).await
    }

    /// Ask the server whether a newer version is available.
    pub async fn check_update(&self) -> Result<UpdateCheck, ApiError> {
        self.get_json(CHECK_UPDATE_PATH).await
    }

    /// Ask the server to install the available update.
    ///
    /// `success: false` is returned as a value; only transport, status and
    /// parse problems are errors.
    pub async fn apply_update(&self) -> Result<ApplyUpdateResponse, ApiError> {
        self.post_json(APPLY_UPDATE_PATH, &serde_json::json!({})).await
    }

    /// Record that the user dismissed a notification.
    pub async fn dismiss_update(&self, kind: &str, version: &str) -> Result<AckResponse, ApiError> {
        let body = DismissRequest {
            kind: kind.to_string(),
            version: version.to_string(),
        };
        self.post_json(DISMISS_PATH, &body).await
    }

    pub async fn version(&self) -> Result<VersionInfo, ApiError> {
        self.get_json(VERSION_PATH).await
    }

    /// Untyped passthrough for arbitrary dashboard endpoints.
    pub async fn raw(
        &self,
        path: &str,
        options: &FetchOptions,
        timeout: std::time::Duration,
    ) -> Result<ApiResponse, ApiError> {
        self.resolver.fetch_resilient(path, options, timeout).await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::mock::MockTransport;
    use crate::resolver::{ResolverOptions, BASE_URL_KEY};
    use crate::store::MemoryStore;
    use crate::transport::Method;

    const BASE: &str = "https://home.duckdns.org";

    fn client(transport: MockTransport) -> AddarrClient<MockTransport, MemoryStore> {
        let resolver = EndpointResolver::new(
            transport,
            MemoryStore::with_entry(BASE_URL_KEY, BASE),
            ResolverOptions::new("http://localhost:5000"),
        );
        AddarrClient::new(resolver)
    }

    #[tokio::test]
    async fn test_check_update() {
        let transport = MockTransport::new();
        transport.respond_json(
            "https://home.duckdns.org/api/version/check-update",
            json!({"update_available": true, "new_version": "1.0.142", "changes": ["a", "b"]}),
        );
        let check = client(transport).check_update().await.unwrap();
        assert!(check.update_available);
        assert_eq!(check.changes, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_non_2xx_is_api_error() {
        let transport = MockTransport::new();
        transport.respond(
            "https://home.duckdns.org/api/version/update-notification",
            401,
            "login required",
        );
        let err = client(transport).update_notification().await.unwrap_err();
        assert!(matches!(err, ApiError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_apply_failure_is_a_value() {
        let transport = MockTransport::new();
        transport.respond_json(
            "https://home.duckdns.org/api/version/apply-update",
            json!({"success": false, "error": "dirty worktree"}),
        );
        let c = client(transport);
        let resp = c.apply_update().await.unwrap();
        assert!(!resp.success);
        assert_eq!(resp.failure_reason(), "dirty worktree");
    }

    #[tokio::test]
    async fn test_dismiss_posts_kind_and_version() {
        let transport = std::sync::Arc::new(MockTransport::new());
        transport.respond_json(
            "https://home.duckdns.org/api/update/dismiss",
            json!({"success": true}),
        );
        let resolver = EndpointResolver::new(
            transport.clone(),
            MemoryStore::with_entry(BASE_URL_KEY, BASE),
            ResolverOptions::new("http://localhost:5000"),
        );
        let c = AddarrClient::new(resolver);

        let ack = c.dismiss_update("available", "1.0.142").await.unwrap();
        assert!(ack.success);

        let req = &transport.requests()[0];
        assert_eq!(req.method, Method::Post);
        assert_eq!(req.body.as_ref().unwrap()["kind"], "available");
        assert_eq!(req.body.as_ref().unwrap()["version"], "1.0.142");
    }
}
