// ─── Install Profile ───
// Normalized view over the installer dialects (modern Forge/NeoForge, legacy
// Forge, meta-API profiles).

use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;
use serde_json::Value;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::maven::MavenArtifact;
use crate::core::version::{Arguments, LibraryEntry};

/// One post-install processor.
#[derive(Debug, Clone, Deserialize)]
pub struct ProcessorStep {
    pub jar: String,
    #[serde(default)]
    pub classpath: Vec<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub sides: Option<Vec<String>>,
}

impl ProcessorStep {
    /// Steps without `sides` run everywhere.
    pub fn runs_on_client(&self) -> bool {
        self.sides
            .as_ref()
            .map_or(true, |sides| sides.iter().any(|s| s == "client"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SidedData {
    #[serde(default)]
    pub client: String,
    #[serde(default)]
    pub server: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSection {
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    #[serde(default)]
    pub processors: Vec<ProcessorStep>,
    /// Maven coordinate of the loader's universal artifact.
    #[serde(default)]
    pub path: Option<String>,
    /// Archive entry holding the universal jar (legacy installers).
    #[serde(default)]
    pub file_path: Option<String>,
    /// Archive entry holding the version JSON (modern installers).
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub minecraft: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderVersion {
    pub id: String,
    #[serde(default)]
    pub libraries: Vec<LibraryEntry>,
    pub main_class: String,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub inherits_from: Option<String>,
}

#[derive(Debug, Clone)]
pub struct InstallProfile {
    pub install: InstallSection,
    pub version: LoaderVersion,
    /// Written verbatim as the loader's version JSON.
    pub version_raw: Value,
    pub data: BTreeMap<String, SidedData>,
}

impl InstallProfile {
    /// `install_profile.json` is the install section; the version JSON is a
    /// separate archive entry.
    pub fn modern(install_raw: Value, version_raw: Value) -> LauncherResult<Self> {
        let data = match install_raw.get("data") {
            Some(d) if !d.is_null() => serde_json::from_value(d.clone())?,
            _ => BTreeMap::new(),
        };
        let install: InstallSection = serde_json::from_value(install_raw)?;
        let version: LoaderVersion = serde_json::from_value(version_raw.clone())?;
        Ok(Self {
            install,
            version,
            version_raw,
            data,
        })
    }

    /// Pre-1.13 Forge: `{ install, versionInfo }` in one document.
    pub fn legacy(raw: Value) -> LauncherResult<Self> {
        let (Some(install), Some(version_raw)) = (raw.get("install"), raw.get("versionInfo"))
        else {
            return Err(LauncherError::Loader(
                "legacy install profile without install/versionInfo".into(),
            ));
        };
        let install: InstallSection = serde_json::from_value(install.clone())?;
        let version: LoaderVersion = serde_json::from_value(version_raw.clone())?;
        Ok(Self {
            install,
            version,
            version_raw: version_raw.clone(),
            data: BTreeMap::new(),
        })
    }

    /// Meta-API loaders serve a version JSON directly; nothing to patch.
    pub fn from_version_json(version_raw: Value) -> LauncherResult<Self> {
        let version: LoaderVersion = serde_json::from_value(version_raw.clone())?;
        Ok(Self {
            install: InstallSection::default(),
            version,
            version_raw,
            data: BTreeMap::new(),
        })
    }

    pub fn is_legacy_document(raw: &Value) -> bool {
        raw.get("install").is_some() && raw.get("versionInfo").is_some()
    }

    /// Version libraries then install libraries, first occurrence of each
    /// name wins and input order is kept.
    pub fn merged_libraries(&self) -> Vec<&LibraryEntry> {
        let mut seen = HashSet::new();
        self.version
            .libraries
            .iter()
            .chain(self.install.libraries.iter())
            .filter(|lib| seen.insert(lib.name.as_str()))
            .collect()
    }

    pub fn client_processors(&self) -> impl Iterator<Item = &ProcessorStep> {
        self.install.processors.iter().filter(|p| p.runs_on_client())
    }

    pub fn has_processors(&self) -> bool {
        !self.install.processors.is_empty()
    }

    pub fn data_client(&self, token: &str) -> Option<&str> {
        self.data.get(token).map(|d| d.client.as_str())
    }

    /// The loader's universal artifact: first library under `prefix`, or the
    /// coordinate in `install.path`.
    pub fn universal_artifact(&self, prefix: &str) -> Option<MavenArtifact> {
        let prefix = format!("{}:", prefix.trim_end_matches(':'));
        self.install
            .libraries
            .iter()
            .chain(self.version.libraries.iter())
            .find(|lib| lib.name.starts_with(&prefix))
            .and_then(|lib| MavenArtifact::parse(&lib.name).ok())
            .or_else(|| {
                self.install
                    .path
                    .as_deref()
                    .and_then(|p| MavenArtifact::parse(p).ok())
            })
    }
}
