//! Per-kind update notification state.
//!
//! Each notification kind runs the same small machine:
//!
//! ```text
//! Idle -> Checking -> NoUpdate ----> Checking (next tick)
//!                  \-> Announced -> Dismissed -> Checking (next tick)
//! ```
//!
//! A check is refused while one is already outstanding or while the user can
//! still see an announcement, so a timer firing during either never produces
//! a second notification. The machine does no I/O; the session drives it.

use std::fmt;
use std::str::FromStr;

use addarr_api::types::{PendingUpdate, UpdateCheck};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    /// A newer version can be installed.
    Available,
    /// A new version was installed since the user last looked.
    Applied,
}

/// How often a kind is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    Recurring,
    OncePerSession,
}

impl NotificationKind {
    pub const ALL: &[NotificationKind] = &[Self::Available, Self::Applied];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Applied => "applied",
        }
    }

    pub fn schedule(self) -> Schedule {
        match self {
            Self::Available => Schedule::Recurring,
            Self::Applied => Schedule::OncePerSession,
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "Update available"),
            Self::Applied => write!(f, "Update applied"),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "available" => Ok(Self::Available),
            "applied" => Ok(Self::Applied),
            other => Err(format!("unknown notification kind: {other}")),
        }
    }
}

/// What a notification shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateInfo {
    pub new_version: String,
    pub current_version: Option<String>,
    pub changes: Vec<String>,
    pub applied_at: Option<DateTime<Utc>>,
}

impl From<PendingUpdate> for UpdateInfo {
    fn from(p: PendingUpdate) -> Self {
        Self {
            new_version: p.new_version,
            current_version: None,
            changes: p.changes,
            applied_at: p.applied_at,
        }
    }
}

impl UpdateInfo {
    /// Interpret a `check-update` response.
    ///
    /// `Err` carries the server's own error message. An update whose version
    /// is not newer than the running one (when both are semver) is ignored.
    pub fn from_check(check: UpdateCheck) -> Result<Option<Self>, String> {
        if let Some(err) = check.error.filter(|e| !e.is_empty()) {
            return Err(err);
        }
        if !check.update_available {
            return Ok(None);
        }

        let new_version = check
            .new_version
            .filter(|v| !v.is_empty())
            .or(check.commit_hash)
            .unwrap_or_else(|| "latest".to_string());

        if let Some(current) = check.current_version.as_deref() {
            if !is_newer(&new_version, current) {
                tracing::debug!(new_version = %new_version, current, "Ignoring update that is not newer");
                return Ok(None);
            }
        }

        Ok(Some(Self {
            new_version,
            current_version: check.current_version,
            changes: check.changes,
            applied_at: None,
        }))
    }
}

/// `candidate > current`, treating anything that is not semver as newer.
fn is_newer(candidate: &str, current: &str) -> bool {
    let parse = |v: &str| semver::Version::parse(v.trim().trim_start_matches('v')).ok();
    match (parse(candidate), parse(current)) {
        (Some(candidate), Some(current)) => candidate > current,
        _ => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierState {
    Idle,
    Checking,
    NoUpdate,
    Announced(UpdateInfo),
    Dismissed(UpdateInfo),
}

#[derive(Debug, Clone)]
pub struct UpdateNotifier {
    kind: NotificationKind,
    state: NotifierState,
    checks_started: u32,
    dismissed_version: Option<String>,
}

impl UpdateNotifier {
    pub fn new(kind: NotificationKind) -> Self {
        Self {
            kind,
            state: NotifierState::Idle,
            checks_started: 0,
            dismissed_version: None,
        }
    }

    pub fn state(&self) -> &NotifierState {
        &self.state
    }

    /// The notification currently on screen, if any.
    pub fn announced(&self) -> Option<&UpdateInfo> {
        match &self.state {
            NotifierState::Announced(info) => Some(info),
            _ => None,
        }
    }

    /// Enter `Checking`. Returns `false` when the check must be skipped.
    pub fn begin_check(&mut self) -> bool {
        let allowed = match self.state {
            NotifierState::Checking | NotifierState::Announced(_) => false,
            _ => self.kind.schedule() == Schedule::Recurring || self.checks_started == 0,
        };
        if allowed {
            self.state = NotifierState::Checking;
            self.checks_started += 1;
        }
        allowed
    }

    /// Finish a check. Returns the info to announce, if it should be shown.
    pub fn complete_check(&mut self, found: Option<UpdateInfo>) -> Option<UpdateInfo> {
        if self.state != NotifierState::Checking {
            tracing::warn!(kind = self.kind.as_str(), "check completed while not checking");
            return None;
        }

        match found {
            Some(info) if self.dismissed_version.as_deref() != Some(info.new_version.as_str()) => {
                self.state = NotifierState::Announced(info.clone());
                Some(info)
            }
            _ => {
                self.state = NotifierState::NoUpdate;
                None
            }
        }
    }

    /// A check failed; this cycle has no update.
    pub fn fail_check(&mut self) {
        if self.state == NotifierState::Checking {
            self.state = NotifierState::NoUpdate;
        }
    }

    /// Take down the announcement. Returns what was shown, so the caller can
    /// acknowledge it; `None` when nothing was announced.
    pub fn dismiss(&mut self) -> Option<UpdateInfo> {
        let NotifierState::Announced(info) = &self.state else {
            return None;
        };
        let info = info.clone();
        self.dismissed_version = Some(info.new_version.clone());
        self.state = NotifierState::Dismissed(info.clone());
        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(version: &str) -> UpdateInfo {
        UpdateInfo {
            new_version: version.into(),
            current_version: Some("1.0.140".into()),
            changes: vec!["Fix poster fallback".into()],
            applied_at: None,
        }
    }

    #[test]
    fn test_available_cycle() {
        let mut n = UpdateNotifier::new(NotificationKind::Available);
        assert_eq!(n.state(), &NotifierState::Idle);

        assert!(n.begin_check());
        assert_eq!(n.state(), &NotifierState::Checking);
        assert_eq!(n.complete_check(None), None);
        assert_eq!(n.state(), &NotifierState::NoUpdate);

        assert!(n.begin_check());
        assert_eq!(n.complete_check(Some(info("1.0.142"))), Some(info("1.0.142")));
        assert_eq!(n.announced(), Some(&info("1.0.142")));
    }

    #[test]
    fn test_no_second_check_while_checking_or_announced() {
        let mut n = UpdateNotifier::new(NotificationKind::Available);
        assert!(n.begin_check());
        assert!(!n.begin_check());

        n.complete_check(Some(info("1.0.142")));
        for _ in 0..3 {
            assert!(!n.begin_check());
        }
        assert_eq!(n.announced(), Some(&info("1.0.142")));
    }

    #[test]
    fn test_dismissed_version_is_not_reannounced() {
        let mut n = UpdateNotifier::new(NotificationKind::Available);
        n.begin_check();
        n.complete_check(Some(info("1.0.142")));

        assert_eq!(n.dismiss(), Some(info("1.0.142")));
        assert!(matches!(n.state(), NotifierState::Dismissed(_)));
        assert_eq!(n.dismiss(), None);

        assert!(n.begin_check());
        assert_eq!(n.complete_check(Some(info("1.0.142"))), None);
        assert_eq!(n.state(), &NotifierState::NoUpdate);

        assert!(n.begin_check());
        assert_eq!(n.complete_check(Some(info("1.0.150"))), Some(info("1.0.150")));
    }

    #[test]
    fn test_failed_check_ends_cycle_quietly() {
        let mut n = UpdateNotifier::new(NotificationKind::Available);
        n.begin_check();
        n.fail_check();
        assert_eq!(n.state(), &NotifierState::NoUpdate);
        assert!(n.begin_check());
    }

    #[test]
    fn test_applied_checks_once_per_session() {
        let mut n = UpdateNotifier::new(NotificationKind::Applied);
        assert!(n.begin_check());
        n.complete_check(None);
        assert!(!n.begin_check());
        assert_eq!(n.state(), &NotifierState::NoUpdate);
    }

    #[test]
    fn test_complete_without_begin_is_ignored() {
        let mut n = UpdateNotifier::new(NotificationKind::Available);
        assert_eq!(n.complete_check(Some(info("1.0.142"))), None);
        assert_eq!(n.state(), &NotifierState::Idle);
    }

    #[test]
    fn test_from_check() {
        let check = UpdateCheck {
            update_available: true,
            current_version: Some("1.0.140".into()),
            new_version: Some("1.0.142".into()),
            changes: vec!["a".into()],
            ..Default::default()
        };
        let found = UpdateInfo::from_check(check).unwrap().unwrap();
        assert_eq!(found.new_version, "1.0.142");
        assert_eq!(found.current_version.as_deref(), Some("1.0.140"));

        let none = UpdateInfo::from_check(UpdateCheck::default()).unwrap();
        assert!(none.is_none());

        let err = UpdateInfo::from_check(UpdateCheck {
            error: Some("git not found".into()),
            ..Default::default()
        });
        assert_eq!(err, Err("git not found".to_string()));
    }

    #[test]
    fn test_from_check_ignores_older_versions() {
        let check = UpdateCheck {
            update_available: true,
            current_version: Some("v1.2.0".into()),
            new_version: Some("1.1.9".into()),
            ..Default::default()
        };
        assert_eq!(UpdateInfo::from_check(check).unwrap(), None);

        // Commit hashes are not comparable; trust the server.
        let check = UpdateCheck {
            update_available: true,
            current_version: Some("1.0.140".into()),
            new_version: None,
            commit_hash: Some("a1b2c3d".into()),
            ..Default::default()
        };
        let found = UpdateInfo::from_check(check).unwrap().unwrap();
        assert_eq!(found.new_version, "a1b2c3d");
    }

    #[test]
    fn test_kind_parse_and_display() {
        assert_eq!("Applied".parse::<NotificationKind>().unwrap(), NotificationKind::Applied);
        assert!("pending".parse::<NotificationKind>().is_err());
        assert_eq!(NotificationKind::Available.to_string(), "Update available");
        assert_eq!(NotificationKind::Available.as_str(), "available");
    }
}
