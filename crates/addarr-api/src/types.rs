//! Wire types for the Addarr backend endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /api/tunnel/status`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelStatus {
    #[serde(default)]
    pub tunnel: Option<TunnelInfo>,
    #[serde(default)]
    pub duckdns_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TunnelInfo {
    #[serde(default)]
    pub public_url: Option<String>,
}

impl TunnelStatus {
    /// Public URL of the active tunnel, if one is up.
    pub fn public_url(&self) -> Option<&str> {
        self.tunnel
            .as_ref()
            .and_then(|t| t.public_url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// Published dynamic DNS address, if the server has one.
    pub fn duckdns_url(&self) -> Option<&str> {
        self.duckdns_url.as_deref().filter(|url| !url.is_empty())
    }
}

/// `GET /api/version/update-notification`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNotificationResponse {
    #[serde(default)]
    pub pending_update: Option<PendingUpdate>,
}

/// An update that was applied since the user last looked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub new_version: String,
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default, deserialize_with = "timestamp::deserialize_opt")]
    pub applied_at: Option<DateTime<Utc>>,
}

/// `GET /api/version/check-update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateCheck {
    #[serde(default)]
    pub update_available: bool,
    #[serde(default)]
    pub current_version: Option<String>,
    #[serde(default)]
    pub new_version: Option<String>,
    #[serde(default)]
    pub changes: Vec<String>,
    #[serde(default)]
    pub commit_hash: Option<String>,
    #[serde(default)]
    pub update_date: Option<String>,
    /// Set by the server when its own check failed.
    #[serde(default)]
    pub error: Option<String>,
}

/// `POST /api/version/apply-update`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApplyUpdateResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub new_version: Option<VersionInfo>,
}

impl ApplyUpdateResponse {
    /// Best human-readable reason for a failed apply.
    pub fn failure_reason(&self) -> String {
        fn non_empty(field: &Option<String>) -> Option<&str> {
            field.as_deref().filter(|s| !s.is_empty())
        }
        non_empty(&self.error)
            .or_else(|| non_empty(&self.message))
            .unwrap_or("update failed")
            .to_string()
    }
}

/// `GET /api/version`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VersionInfo {
    pub version: String,
    pub commit_hash: String,
    pub commit_date: Option<String>,
    pub commit_count: u64,
    pub build_date: Option<String>,
}

/// Body of `POST /api/update/dismiss`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DismissRequest {
    pub kind: String,
    pub version: String,
}

/// Generic `{ "success": bool }` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AckResponse {
    #[serde(default)]
    pub success: bool,
}

/// The backend emits either RFC 3339 or naive ISO-8601 timestamps
/// (`2024-05-01T10:20:30.123456`); naive ones are taken as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn deserialize_opt<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_tunnel_status_with_both_addresses() {
        let json = r#"{
            "tunnel": {"public_url": "https://abc.trycloudflare.com", "provider": "cloudflared"},
            "duckdns_url": "https://home.duckdns.org"
        }"#;
        let status: TunnelStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.public_url(), Some("https://abc.trycloudflare.com"));
        assert_eq!(status.duckdns_url(), Some("https://home.duckdns.org"));
    }

    #[test]
    fn test_empty_and_null_fields_are_absent() {
        let json = r#"{"tunnel": {"public_url": ""}, "duckdns_url": "https://home.duckdns.org"}"#;
        let status: TunnelStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.public_url(), None);
        assert_eq!(status.duckdns_url(), Some("https://home.duckdns.org"));

        let status: TunnelStatus =
            serde_json::from_str(r#"{"tunnel": null, "duckdns_url": null}"#).unwrap();
        assert_eq!(status.public_url(), None);
        assert_eq!(status.duckdns_url(), None);

        let status: TunnelStatus = serde_json::from_str("{}").unwrap();
        assert_eq!(status.public_url(), None);
        assert_eq!(status.duckdns_url(), None);
    }

    #[test]
    fn test_deserialize_pending_update_naive_timestamp() {
        let json = r#"{
            "pending_update": {
                "new_version": "1.0.142",
                "changes": ["Fix poster fallback", "Add season picker"],
                "applied_at": "2024-05-01T10:20:30.123456"
            }
        }"#;
        let resp: UpdateNotificationResponse = serde_json::from_str(json).unwrap();
        let pending = resp.pending_update.unwrap();
        assert_eq!(pending.new_version, "1.0.142");
        assert_eq!(pending.changes.len(), 2);
        let applied = pending.applied_at.unwrap();
        assert_eq!(applied.year(), 2024);
        assert_eq!(applied.hour(), 10);
    }

    #[test]
    fn test_deserialize_pending_update_rfc3339_and_garbage() {
        let json = r#"{"pending_update": {"new_version": "2.0.0", "applied_at": "2024-05-01T10:20:30+02:00"}}"#;
        let resp: UpdateNotificationResponse = serde_json::from_str(json).unwrap();
        let applied = resp.pending_update.unwrap().applied_at.unwrap();
        assert_eq!(applied.hour(), 8);

        let json = r#"{"pending_update": {"new_version": "2.0.0", "applied_at": "yesterday"}}"#;
        let resp: UpdateNotificationResponse = serde_json::from_str(json).unwrap();
        assert!(resp.pending_update.unwrap().applied_at.is_none());

        let resp: UpdateNotificationResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.pending_update.is_none());
    }

    #[test]
    fn test_deserialize_update_check() {
        let json = r#"{
            "update_available": true,
            "current_version": "1.0.140",
            "new_version": "1.0.142",
            "changes": ["Fix poster fallback"],
            "commit_hash": "a1b2c3d",
            "update_date": "2024-05-01T10:20:30"
        }"#;
        let check: UpdateCheck = serde_json::from_str(json).unwrap();
        assert!(check.update_available);
        assert_eq!(check.new_version.as_deref(), Some("1.0.142"));
        assert!(check.error.is_none());

        let check: UpdateCheck =
            serde_json::from_str(r#"{"update_available": false, "error": "git missing"}"#).unwrap();
        assert!(!check.update_available);
        assert_eq!(check.error.as_deref(), Some("git missing"));
    }

    #[test]
    fn test_apply_failure_reason() {
        let resp: ApplyUpdateResponse = serde_json::from_str(
            r#"{"success": false, "message": "Update failed", "error": "merge conflict"}"#,
        )
        .unwrap();
        assert!(!resp.success);
        assert_eq!(resp.failure_reason(), "merge conflict");

        let resp: ApplyUpdateResponse = serde_json::from_str(
            r#"{"success": false, "error": "", "message": "Update failed: conflict"}"#,
        )
        .unwrap();
        assert_eq!(resp.failure_reason(), "Update failed: conflict");

        let resp: ApplyUpdateResponse =
            serde_json::from_str(r#"{"success": false, "error": "", "message": ""}"#).unwrap();
        assert_eq!(resp.failure_reason(), "update failed");

        let resp: ApplyUpdateResponse = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert_eq!(resp.failure_reason(), "update failed");
    }

    #[test]
    fn test_apply_success_carries_version_info() {
        let json = r#"{
            "success": true,
            "message": "Update applied successfully",
            "new_version": {
                "version": "1.0.142",
                "commit_hash": "a1b2c3d",
                "commit_date": "2024-05-01 10:20:30 +0000",
                "commit_count": 142,
                "build_date": "2024-05-01T10:21:00"
            },
            "output": "Fast-forward"
        }"#;
        let resp: ApplyUpdateResponse = serde_json::from_str(json).unwrap();
        assert!(resp.success);
        assert_eq!(resp.new_version.unwrap().commit_count, 142);
    }
}
