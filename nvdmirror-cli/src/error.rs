//! CLI-specific error types and exit code mapping

use nvdmirror_core::error::NvdMirrorError;
use nvdmirror_feed_sync::FeedSyncError;
use nvdmirror_record_store::StoreError;
use nvdmirror_vuln_matcher::MatcherError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// The scan reported vulnerable findings.
    #[error("{count} vulnerable finding(s) reported")]
    Vulnerable {
        /// Number of vulnerable verdicts
        count: usize,
    },

    /// Background synchronization ended without completing.
    #[error("synchronization failed: {0}")]
    SyncFailed(String),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from nvdmirror-core.
    #[error("{0}")]
    Core(#[from] NvdMirrorError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | General / command error                  |
    /// | 2    | Configuration error                      |
    /// | 3    | Setup or partition validation error      |
    /// | 4    | Scan reported vulnerable findings        |
    /// | 5    | Synchronization failed (retry next run)  |
    /// | 10   | IO error                                 |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(NvdMirrorError::Config(_)) => 2,
            Self::Core(core) if core.is_fatal() => 3,
            Self::Vulnerable { .. } => 4,
            Self::SyncFailed(_) | Self::Core(NvdMirrorError::RemoteFetch(_)) => 5,
            Self::Io(_) | Self::Core(NvdMirrorError::Io(_)) => 10,
            Self::JsonSerialize(_) | Self::Command(_) | Self::Core(_) => 1,
        }
    }
}

impl From<StoreError> for CliError {
    fn from(e: StoreError) -> Self {
        Self::Core(e.into())
    }
}

impl From<FeedSyncError> for CliError {
    fn from(e: FeedSyncError) -> Self {
        Self::Core(e.into())
    }
}

impl From<MatcherError> for CliError {
    fn from(e: MatcherError) -> Self {
        Self::Core(e.into())
    }
}
