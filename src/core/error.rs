use std::path::PathBuf;
use thiserror::Error;

/// Central error type for the synchronizer and the loader installers.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("Timed out waiting for {url}")]
    Timeout { url: String },

    // ── Integrity ───────────────────────────────────────
    #[error("{algorithm} mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        algorithm: &'static str,
        expected: String,
        actual: String,
    },

    // ── Resolution ──────────────────────────────────────
    #[error("Minecraft version {requested} not found. Available releases: {}", available.join(", "))]
    VersionNotFound {
        requested: String,
        available: Vec<String>,
    },

    #[error("{loader} build {build} not found. Available builds: {}", available.join(", "))]
    BuildNotFound {
        loader: String,
        build: String,
        available: Vec<String>,
    },

    #[error("{loader} does not support Minecraft {minecraft_version}")]
    LoaderUnsupported {
        loader: String,
        minecraft_version: String,
    },

    #[error("Impossible to download library {0}: no mirror or declared URL")]
    LibraryUnresolvable(String),

    // ── Maven ───────────────────────────────────────────
    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Archive ─────────────────────────────────────────
    #[error("Entry {entry} missing from archive {archive:?}")]
    ArchiveEntryMissing { archive: PathBuf, entry: String },

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Process ─────────────────────────────────────────
    #[error("Java execution failed: {0}")]
    JavaExecution(String),

    #[error("{program} exited with code {code:?}")]
    ProcessFailed { program: String, code: Option<i32> },

    #[error("Unresolved placeholder {token} in processor {processor}")]
    UnresolvedToken { token: String, processor: String },

    // ── Loader ──────────────────────────────────────────
    #[error("Loader error: {0}")]
    Loader(String),

    #[error("Loader API unreachable: {0}")]
    LoaderApi(String),

    // ── Config ──────────────────────────────────────────
    #[error("Invalid configuration: {0}")]
    Config(String),

    // ── Control ─────────────────────────────────────────
    #[error("Cancelled: {0}")]
    Cancelled(String),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by callers deciding how to surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Resolution,
    Integrity,
    Network,
    Archive,
    Process,
    Cancelled,
    Io,
    Config,
    Data,
}

impl LauncherError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            LauncherError::VersionNotFound { .. }
            | LauncherError::BuildNotFound { .. }
            | LauncherError::LoaderUnsupported { .. }
            | LauncherError::LibraryUnresolvable(_) => ErrorCategory::Resolution,
            LauncherError::ChecksumMismatch { .. } => ErrorCategory::Integrity,
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::Timeout { .. }
            | LauncherError::LoaderApi(_) => ErrorCategory::Network,
            LauncherError::ArchiveEntryMissing { .. } | LauncherError::Zip(_) => {
                ErrorCategory::Archive
            }
            LauncherError::JavaExecution(_)
            | LauncherError::ProcessFailed { .. }
            | LauncherError::UnresolvedToken { .. } => ErrorCategory::Process,
            LauncherError::Cancelled(_) => ErrorCategory::Cancelled,
            LauncherError::Io { .. } => ErrorCategory::Io,
            LauncherError::Config(_) => ErrorCategory::Config,
            LauncherError::InvalidMavenCoordinate(_)
            | LauncherError::Json(_)
            | LauncherError::Loader(_)
            | LauncherError::Other(_) => ErrorCategory::Data,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, LauncherError::Cancelled(_))
    }

    /// Attach a path to a bare IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_not_found_lists_alternatives() {
        let err = LauncherError::BuildNotFound {
            loader: "Quilt".into(),
            build: "9.9".into(),
            available: vec!["1.0".into(), "1.2".into()],
        };
        assert_eq!(
            err.to_string(),
            "Quilt build 9.9 not found. Available builds: 1.0, 1.2"
        );
        assert_eq!(err.category(), ErrorCategory::Resolution);
    }

    #[test]
    fn cancelled_is_its_own_category() {
        let err = LauncherError::Cancelled("user request".into());
        assert!(err.is_cancelled());
        assert_eq!(err.category(), ErrorCategory::Cancelled);
    }
}
