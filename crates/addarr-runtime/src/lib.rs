mod session;

pub use session::{
    ApplyOutcome, NotificationSink, Session, SessionCommand, WatchExit,
};

use addarr_api::{AddarrClient, ApiError, EndpointResolver, ReqwestTransport};
use addarr_core::config::AppConfig;
use addarr_core::error::CoreError;
use addarr_core::preferences::PreferenceFile;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("preferences error: {0}")]
    Preferences(#[from] std::io::Error),
}

/// A session talking to the real backend, with the base URL persisted in the
/// user's data directory.
pub type LiveSession = Session<ReqwestTransport, PreferenceFile>;

/// Wire a [`LiveSession`] from configuration.
pub fn connect(config: &AppConfig) -> LiveSession {
    let prefs = PreferenceFile::open(AppConfig::preferences_path());
    tracing::debug!(path = %prefs.path().display(), "Opened preferences");
    let resolver = EndpointResolver::new(ReqwestTransport::new(), prefs, config.resolver_options());
    Session::new(AddarrClient::new(resolver), config)
}
