pub mod library;
pub mod manifest;
pub mod rules;
pub mod version_file;

pub use library::{LibDownloadArtifact, LibraryDownloads, LibraryEntry, LibraryRecord};
pub use manifest::{VersionEntry, VersionManifest};
pub use rules::{current_os_name, rules_allow, LibraryRule, OsRule, RuleAction};
pub use version_file::{Arguments, AssetIndexInfo, DownloadArtifact, VersionJson};
