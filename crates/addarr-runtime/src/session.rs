use std::sync::Mutex;
use std::time::Duration;

use addarr_api::{AddarrClient, PreferenceStore, Transport};
use addarr_core::config::AppConfig;
use addarr_core::notifier::{NotificationKind, UpdateInfo, UpdateNotifier};
use addarr_core::toast::Toast;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::RuntimeError;

/// Where notifications end up: a terminal, a window, a test recorder.
pub trait NotificationSink: Send + Sync {
    /// Show the notification for `kind`. Called at most once until
    /// [`withdraw`](Self::withdraw) for the same kind.
    fn announce(&self, kind: NotificationKind, info: &UpdateInfo);

    fn withdraw(&self, kind: NotificationKind);

    /// Transient message for application-level failures and confirmations.
    fn toast(&self, toast: Toast);

    /// The running version changed; everything held in memory is stale.
    fn reload(&self);
}

/// User input while watching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Dismiss(NotificationKind),
    Apply,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The server installed the update; start a fresh session.
    Reload,
    /// The server refused or failed; the reason was shown as a toast.
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchExit {
    Reload,
    Quit,
}

/// Everything one "page load" owns: the client with its resolver and the
/// notification state for each kind.
pub struct Session<T, S> {
    client: AddarrClient<T, S>,
    available: Mutex<UpdateNotifier>,
    applied: Mutex<UpdateNotifier>,
    poll_interval: Duration,
    check_applied_on_start: bool,
}

impl<T: Transport, S: PreferenceStore> Session<T, S> {
    pub fn new(client: AddarrClient<T, S>, config: &AppConfig) -> Self {
        Self {
            client,
            available: Mutex::new(UpdateNotifier::new(NotificationKind::Available)),
            applied: Mutex::new(UpdateNotifier::new(NotificationKind::Applied)),
            poll_interval: config.poll_interval(),
            check_applied_on_start: config.updates.check_applied_on_start,
        }
    }

    pub fn client(&self) -> &AddarrClient<T, S> {
        &self.client
    }

    fn with_notifier<R>(
        &self,
        kind: NotificationKind,
        f: impl FnOnce(&mut UpdateNotifier) -> R,
    ) -> R {
        let lock = match kind {
            NotificationKind::Available => &self.available,
            NotificationKind::Applied => &self.applied,
        };
        let mut notifier = lock.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut notifier)
    }

    /// The notification currently shown for `kind`.
    pub fn announced(&self, kind: NotificationKind) -> Option<UpdateInfo> {
        self.with_notifier(kind, |n| n.announced().cloned())
    }

    /// Check for an update applied since the last acknowledgement.
    /// Runs at most once per session.
    pub async fn check_applied(&self, sink: &impl NotificationSink) -> Option<UpdateInfo> {
        self.check(NotificationKind::Applied, sink).await
    }

    /// Check whether a newer version can be installed.
    pub async fn poll_available(&self, sink: &impl NotificationSink) -> Option<UpdateInfo> {
        self.check(NotificationKind::Available, sink).await
    }

    async fn check(
        &self,
        kind: NotificationKind,
        sink: &impl NotificationSink,
    ) -> Option<UpdateInfo> {
        if !self.with_notifier(kind, UpdateNotifier::begin_check) {
            debug!(kind = kind.as_str(), "Skipping update check");
            return None;
        }

        let result = match kind {
            NotificationKind::Available => self
                .client
                .check_update()
                .await
                .map_err(|e| e.to_string())
                .and_then(UpdateInfo::from_check),
            NotificationKind::Applied => self
                .client
                .update_notification()
                .await
                .map(|resp| resp.pending_update.map(UpdateInfo::from))
                .map_err(|e| e.to_string()),
        };

        match result {
            Ok(found) => {
                let shown = self.with_notifier(kind, |n| n.complete_check(found));
                if let Some(info) = &shown {
                    info!(kind = kind.as_str(), version = %info.new_version, "Announcing update");
                    sink.announce(kind, info);
                }
                shown
            }
            Err(e) => {
                warn!(kind = kind.as_str(), "Update check failed: {e}");
                self.with_notifier(kind, UpdateNotifier::fail_check);
                None
            }
        }
    }

    /// Take down the notification for `kind` and tell the server, so it is
    /// not announced again after a restart. Returns `false` if nothing was
    /// shown.
    pub async fn dismiss(&self, kind: NotificationKind, sink: &impl NotificationSink) -> bool {
        let Some(info) = self.with_notifier(kind, UpdateNotifier::dismiss) else {
            return false;
        };
        sink.withdraw(kind);

        match self
            .client
            .dismiss_update(kind.as_str(), &info.new_version)
            .await
        {
            Ok(ack) if ack.success => {
                debug!(kind = kind.as_str(), version = %info.new_version, "Dismissal recorded")
            }
            Ok(_) => warn!(kind = kind.as_str(), "Server declined dismissal"),
            Err(e) => warn!(kind = kind.as_str(), "Failed to record dismissal: {e}"),
        }
        true
    }

    /// Install the available update.
    ///
    /// A refusal from the server is shown as a toast and returned as
    /// [`ApplyOutcome::Failed`]; only a failed request is an error.
    pub async fn apply_update(
        &self,
        sink: &impl NotificationSink,
    ) -> Result<ApplyOutcome, RuntimeError> {
        let resp = self.client.apply_update().await?;

        if !resp.success {
            let reason = resp.failure_reason();
            warn!("Update failed: {reason}");
            sink.toast(Toast::error(format!("Update failed: {reason}")));
            return Ok(ApplyOutcome::Failed(reason));
        }

        if self
            .with_notifier(NotificationKind::Available, UpdateNotifier::dismiss)
            .is_some()
        {
            sink.withdraw(NotificationKind::Available);
        }
        let message = resp
            .message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| "Update applied".to_string());
        info!("{message}");
        sink.toast(Toast::success(message));
        sink.reload();
        Ok(ApplyOutcome::Reload)
    }

    /// Run the session until the user quits or an update is applied.
    ///
    /// The applied check runs once up front; the available check runs on
    /// every tick of the poll interval, starting immediately.
    pub async fn watch(
        &self,
        sink: &impl NotificationSink,
        commands: &mut mpsc::Receiver<SessionCommand>,
    ) -> WatchExit {
        if self.check_applied_on_start {
            self.check_applied(sink).await;
        }

        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_available(sink).await;
                }
                command = commands.recv() => match command {
                    Some(SessionCommand::Dismiss(kind)) => {
                        if !self.dismiss(kind, sink).await {
                            debug!(kind = kind.as_str(), "Nothing to dismiss");
                        }
                    }
                    Some(SessionCommand::Apply) => match self.apply_update(sink).await {
                        Ok(ApplyOutcome::Reload) => return WatchExit::Reload,
                        Ok(ApplyOutcome::Failed(_)) => {}
                        Err(e) => {
                            warn!("Apply request failed: {e}");
                            sink.toast(Toast::error(format!("Update failed: {e}")));
                        }
                    },
                    Some(SessionCommand::Quit) | None => return WatchExit::Quit,
                },
            }
        }
    }
}
