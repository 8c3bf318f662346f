pub mod context;
pub mod fabric;
pub mod forge;
pub mod installer;
pub mod installer_archive;
pub mod libraries;
pub mod meta;
pub mod neoforge;
pub mod processors;
pub mod profile;
pub mod quilt;
pub mod request;

pub use context::InstallContext;
pub use installer::{Installer, LoaderInstallResult, LoaderInstaller, PreparedProfile, ResolvedBuild};
pub use processors::PatchProcessor;
pub use profile::{InstallProfile, ProcessorStep};
pub use request::{BuildSelector, LoaderRequest, LoaderType};
