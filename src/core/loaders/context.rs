use std::path::PathBuf;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::request::LoaderRequest;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::EventEmitter;

/// Contexto completo de instalación.
/// Permite escalar sin romper la API.
pub struct InstallContext<'a> {
    pub request: &'a LoaderRequest,
    /// Installation root (processors run here).
    pub root: PathBuf,
    /// `<root>/loader/<type>`
    pub loader_root: PathBuf,
    pub mirrors: &'a [String],
    pub downloader: &'a Downloader,
    pub events: &'a EventEmitter,
    pub cancel: &'a CancellationToken,
    pub concurrency: usize,
    pub kill_grace: Duration,
    pub strict_processors: bool,
}

impl InstallContext<'_> {
    pub fn libraries_dir(&self) -> PathBuf {
        self.loader_root.join("libraries")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.loader_root.join("versions")
    }

    pub fn installers_dir(&self) -> PathBuf {
        self.loader_root.join("installers")
    }

    /// Early exit between installer states.
    pub fn ensure_not_cancelled(&self, stage: &str) -> LauncherResult<()> {
        if self.cancel.is_cancelled() {
            return Err(LauncherError::Cancelled(format!(
                "{} install stopped before {}",
                self.request.loader_type.display_name(),
                stage
            )));
        }
        Ok(())
    }
}
