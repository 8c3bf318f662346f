// ─── Configuration ───
// Everything a run needs, passed explicitly into each component.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::loaders::{BuildSelector, LoaderType};

const APP_DIR_NAME: &str = "InterfaceOficial";

pub const VERSION_MANIFEST_URL: &str =
    "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json";
pub const RESOURCES_URL: &str = "https://resources.download.minecraft.net";
pub const JAVA_RUNTIME_INDEX_URL: &str = "https://launchermeta.mojang.com/v1/products/java-runtime/2ec0cc96c44e5a76b9c8b7c39df7210883d12871/all.json";

/// Ordered mirror preference for Forge-family libraries.
pub const DEFAULT_MIRRORS: [&str; 5] = [
    "https://maven.minecraftforge.net",
    "https://maven.neoforged.net/releases",
    "https://maven.creeperhost.net",
    "https://libraries.minecraft.net",
    "https://repo1.maven.org/maven2",
];

/// Remote endpoints for the vanilla side of the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Endpoints {
    pub version_manifest: String,
    pub resources: String,
    pub java_runtime_index: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_manifest: VERSION_MANIFEST_URL.to_string(),
            resources: RESOURCES_URL.to_string(),
            java_runtime_index: JAVA_RUNTIME_INDEX_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JavaSettings {
    /// Use this binary instead of downloading a managed runtime.
    pub path: Option<PathBuf>,
    /// Force a runtime component (e.g. `java-runtime-gamma`).
    pub component: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ForgeOptions {
    pub build: BuildSelector,
    pub mirrors: Vec<String>,
    /// JSON map of Minecraft version → list of `<mc>-<forge>` builds.
    pub metadata_url: String,
    pub promotions_url: String,
    /// Per-build metadata (installer checksums); `${build}` is substituted.
    pub meta_url: String,
    /// `${build}` is substituted.
    pub installer_url: String,
}

impl Default for ForgeOptions {
    fn default() -> Self {
        Self {
            build: BuildSelector::Latest,
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            metadata_url:
                "https://files.minecraftforge.net/net/minecraftforge/forge/maven-metadata.json"
                    .into(),
            promotions_url:
                "https://files.minecraftforge.net/net/minecraftforge/forge/promotions_slim.json"
                    .into(),
            meta_url: "https://files.minecraftforge.net/net/minecraftforge/forge/${build}/meta.json"
                .into(),
            installer_url: "https://maven.minecraftforge.net/net/minecraftforge/forge/${build}/forge-${build}-installer.jar".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NeoForgeOptions {
    pub build: BuildSelector,
    pub mirrors: Vec<String>,
    /// Version list of the `net.neoforged:forge` artifact (1.20.1 era).
    pub legacy_versions_url: String,
    /// Version list of the `net.neoforged:neoforge` artifact.
    pub versions_url: String,
    pub legacy_installer_url: String,
    pub installer_url: String,
}

impl Default for NeoForgeOptions {
    fn default() -> Self {
        Self {
            build: BuildSelector::Latest,
            mirrors: DEFAULT_MIRRORS.iter().map(|m| m.to_string()).collect(),
            legacy_versions_url:
                "https://maven.neoforged.net/api/maven/versions/releases/net/neoforged/forge".into(),
            versions_url:
                "https://maven.neoforged.net/api/maven/versions/releases/net/neoforged/neoforge"
                    .into(),
            legacy_installer_url: "https://maven.neoforged.net/releases/net/neoforged/forge/${build}/forge-${build}-installer.jar".into(),
            installer_url: "https://maven.neoforged.net/releases/net/neoforged/neoforge/${build}/neoforge-${build}-installer.jar".into(),
        }
    }
}

/// Options shared by the meta-API loaders (Fabric, LegacyFabric, Quilt).
/// Unset URLs fall back to the family defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetaLoaderOptions {
    pub build: BuildSelector,
    pub mirrors: Vec<String>,
    pub versions_url: Option<String>,
    /// `${version}` and `${build}` are substituted.
    pub profile_url: Option<String>,
}

impl MetaLoaderOptions {
    pub fn versions_url_for(&self, loader: LoaderType) -> String {
        self.versions_url
            .clone()
            .unwrap_or_else(|| format!("{}/versions", meta_base(loader)))
    }

    pub fn profile_url_for(&self, loader: LoaderType) -> String {
        self.profile_url.clone().unwrap_or_else(|| {
            format!(
                "{}/versions/loader/${{version}}/${{build}}/profile/json",
                meta_base(loader)
            )
        })
    }
}

fn meta_base(loader: LoaderType) -> &'static str {
    match loader {
        LoaderType::LegacyFabric => "https://meta.legacyfabric.net/v2",
        LoaderType::Quilt => "https://meta.quiltmc.org/v3",
        _ => "https://meta.fabricmc.net/v2",
    }
}

/// One configuration variant per loader family.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum LoaderConfig {
    Forge(ForgeOptions),
    #[serde(rename = "neoforge")]
    NeoForge(NeoForgeOptions),
    Fabric(MetaLoaderOptions),
    #[serde(rename = "legacyfabric")]
    LegacyFabric(MetaLoaderOptions),
    Quilt(MetaLoaderOptions),
}

impl LoaderConfig {
    pub fn loader_type(&self) -> LoaderType {
        match self {
            LoaderConfig::Forge(_) => LoaderType::Forge,
            LoaderConfig::NeoForge(_) => LoaderType::NeoForge,
            LoaderConfig::Fabric(_) => LoaderType::Fabric,
            LoaderConfig::LegacyFabric(_) => LoaderType::LegacyFabric,
            LoaderConfig::Quilt(_) => LoaderType::Quilt,
        }
    }

    pub fn build(&self) -> &BuildSelector {
        match self {
            LoaderConfig::Forge(o) => &o.build,
            LoaderConfig::NeoForge(o) => &o.build,
            LoaderConfig::Fabric(o) | LoaderConfig::LegacyFabric(o) | LoaderConfig::Quilt(o) => {
                &o.build
            }
        }
    }

    pub fn mirrors(&self) -> &[String] {
        match self {
            LoaderConfig::Forge(o) => &o.mirrors,
            LoaderConfig::NeoForge(o) => &o.mirrors,
            LoaderConfig::Fabric(o) | LoaderConfig::LegacyFabric(o) | LoaderConfig::Quilt(o) => {
                &o.mirrors
            }
        }
    }

    fn urls(&self) -> Vec<String> {
        match self {
            LoaderConfig::Forge(o) => vec![
                o.metadata_url.clone(),
                o.promotions_url.clone(),
                o.meta_url.clone(),
                o.installer_url.clone(),
            ],
            LoaderConfig::NeoForge(o) => vec![
                o.legacy_versions_url.clone(),
                o.versions_url.clone(),
                o.legacy_installer_url.clone(),
                o.installer_url.clone(),
            ],
            LoaderConfig::Fabric(o) | LoaderConfig::LegacyFabric(o) | LoaderConfig::Quilt(o) => {
                let loader = self.loader_type();
                vec![o.versions_url_for(loader), o.profile_url_for(loader)]
            }
        }
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if let BuildSelector::Literal(build) = self.build() {
            if build.trim().is_empty() {
                return Err(LauncherError::Config(format!(
                    "{} build must not be empty",
                    self.loader_type()
                )));
            }
        }
        for url in self.urls().iter().chain(self.mirrors()) {
            validate_url(url)?;
        }
        Ok(())
    }
}

/// Full configuration of a synchronization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncConfig {
    /// Installation root; every manifest path is relative to it.
    pub root: PathBuf,
    /// Game version id, or `latest_release` / `latest_snapshot`.
    pub version: String,
    /// Optional named sub-instance under `instances/<name>/`.
    pub instance: Option<String>,
    /// Paths (relative to the instance dir or root) never overwritten or pruned.
    pub ignored: Vec<String>,
    /// Prune unreferenced files after installing.
    pub verify: bool,
    pub concurrency: usize,
    /// Stall timeout for a single request, in seconds.
    pub timeout_secs: u64,
    pub java: JavaSettings,
    pub loader: Option<LoaderConfig>,
    pub extra_files_url: Option<String>,
    pub endpoints: Endpoints,
    /// Abort the processor chain on the first non-zero exit.
    pub strict_processors: bool,
    pub kill_grace_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            version: "latest_release".to_string(),
            instance: None,
            ignored: Vec::new(),
            verify: false,
            concurrency: 5,
            timeout_secs: 10,
            java: JavaSettings::default(),
            loader: None,
            extra_files_url: None,
            endpoints: Endpoints::default(),
            strict_processors: true,
            kill_grace_ms: 5_000,
        }
    }
}

impl SyncConfig {
    pub fn new(root: impl Into<PathBuf>, version: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// Load a JSON config file and validate it.
    pub fn load(path: &Path) -> LauncherResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| LauncherError::io(path, e))?;
        let config: SyncConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if self.root.as_os_str().is_empty() {
            return Err(LauncherError::Config("root must not be empty".into()));
        }
        if self.version.trim().is_empty() {
            return Err(LauncherError::Config("version must not be empty".into()));
        }
        if let Some(instance) = &self.instance {
            if instance.is_empty() || instance.contains(['/', '\\']) || instance == ".." {
                return Err(LauncherError::Config(format!(
                    "invalid instance name {instance:?}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(LauncherError::Config("timeoutSecs must be positive".into()));
        }

        validate_url(&self.endpoints.version_manifest)?;
        validate_url(&self.endpoints.resources)?;
        validate_url(&self.endpoints.java_runtime_index)?;
        if let Some(url) = &self.extra_files_url {
            validate_url(url)?;
        }
        if let Some(loader) = &self.loader {
            loader.validate()?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    /// Directory scoped to the configured instance, or the root itself.
    pub fn instance_dir(&self) -> PathBuf {
        match &self.instance {
            Some(name) => self.root.join("instances").join(name),
            None => self.root.clone(),
        }
    }

    pub fn loader_dir(&self, loader: LoaderType) -> PathBuf {
        self.root.join("loader").join(loader.to_string())
    }
}

/// URL templates carry `${...}` placeholders; those are filled with a dummy
/// before parsing.
fn validate_url(url: &str) -> LauncherResult<()> {
    let probe = url.replace("${build}", "0").replace("${version}", "0");
    reqwest::Url::parse(&probe)
        .map(|_| ())
        .map_err(|e| LauncherError::Config(format!("invalid URL {url}: {e}")))
}

pub fn default_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}
