use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::context::InstallContext;
use super::fabric::FabricInstaller;
use super::forge::ForgeInstaller;
use super::installer_archive::{extract_client_data, extract_universal, read_install_profile};
use super::libraries::resolve_libraries;
use super::neoforge::NeoForgeInstaller;
use super::processors::PatchProcessor;
use super::profile::InstallProfile;
use super::quilt::QuiltInstaller;
use super::request::LoaderType;
use crate::core::archive::JarArchive;
use crate::core::bundle::{verify_or_remove, HashAlgorithm};
use crate::core::config::LoaderConfig;
use crate::core::error::{LauncherError, LauncherResult};

/// A concrete build picked from the loader's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedBuild {
    pub loader_type: LoaderType,
    pub minecraft_version: String,
    /// Build id as the loader's repository names it (`1.20.1-47.2.0`, `0.15.7`).
    pub build: String,
    /// Installer jar or profile JSON URL.
    pub artifact_url: String,
    pub checksum: Option<(HashAlgorithm, String)>,
    /// NeoForge builds published under the old `net.neoforged:forge` artifact.
    pub legacy_api: bool,
}

/// Profile plus whatever the installer archive left behind.
#[derive(Debug)]
pub struct PreparedProfile {
    pub profile: InstallProfile,
    pub installer_jar: Option<PathBuf>,
    /// Core artifacts already extracted; do not download them.
    pub skip_core: bool,
    pub client_data: Option<PathBuf>,
}

/// Resultado unificado de instalación.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderInstallResult {
    pub loader: LoaderType,
    pub build: String,
    pub version_id: String,
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    pub minecraft_arguments: Option<String>,
    /// Absolute jar paths in profile order.
    pub libraries: Vec<PathBuf>,
    pub version_json_path: PathBuf,
    pub patched: bool,
}

#[async_trait]
pub trait LoaderInstaller: Send + Sync {
    async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild>;

    /// Fetch and normalize the install profile for `build`.
    async fn prepare(
        &self,
        ctx: &InstallContext<'_>,
        build: &ResolvedBuild,
    ) -> LauncherResult<PreparedProfile>;

    /// Library name prefixes produced by the installer itself.
    fn core_prefixes(&self, _build: &ResolvedBuild) -> &'static [&'static str] {
        &[]
    }

    async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        run_install(self, ctx).await
    }
}

/// Shared state machine: resolve, prepare, write version, libraries, patch.
#[instrument(skip_all, fields(loader = %ctx.request.loader_type, mc = %ctx.request.minecraft_version))]
pub async fn run_install<I>(installer: &I, ctx: &InstallContext<'_>) -> LauncherResult<LoaderInstallResult>
where
    I: LoaderInstaller + ?Sized,
{
    ctx.ensure_not_cancelled("build resolution")?;
    let build = installer.resolve_build(ctx).await?;
    info!(
        "Installing {} {} for Minecraft {}",
        build.loader_type.display_name(),
        build.build,
        build.minecraft_version
    );

    ctx.ensure_not_cancelled("profile preparation")?;
    let prepared = installer.prepare(ctx, &build).await?;
    let profile = &prepared.profile;

    ctx.ensure_not_cancelled("version files")?;
    let version_json_path = write_version_files(ctx, profile).await?;

    ctx.ensure_not_cancelled("library resolution")?;
    let libraries = profile.merged_libraries();
    let plan = resolve_libraries(
        ctx,
        &libraries,
        prepared.skip_core,
        installer.core_prefixes(&build),
    )
    .await?;

    ctx.ensure_not_cancelled("library download")?;
    let report = ctx
        .downloader
        .fetch_many(plan.tasks, plan.total_size, ctx.concurrency, ctx.cancel, ctx.events)
        .await?;
    if report.failed > 0 {
        return Err(LauncherError::Loader(format!(
            "{} of {} {} libraries failed to download",
            report.failed,
            report.completed,
            build.loader_type.display_name()
        )));
    }

    let mut patched = false;
    if profile.has_processors() {
        ctx.ensure_not_cancelled("patching")?;
        if PatchProcessor::needs_patch(profile, &ctx.libraries_dir()) {
            let Some(jar) = prepared.installer_jar.as_deref() else {
                return Err(LauncherError::Loader(
                    "profile has processors but no installer archive".into(),
                ));
            };
            let mut archive = JarArchive::open(jar)?;
            let processor =
                PatchProcessor::new(ctx, profile, &mut archive, prepared.client_data.as_deref())?;
            drop(archive);
            processor.patch(profile).await?;
            patched = true;
        } else {
            debug!("Processor outputs already present; skipping patch");
        }
    }

    let version = &profile.version;
    Ok(LoaderInstallResult {
        loader: build.loader_type,
        build: build.build,
        version_id: version.id.clone(),
        main_class: version.main_class.clone(),
        jvm_args: version
            .arguments
            .as_ref()
            .map(|a| a.jvm_values())
            .unwrap_or_default(),
        game_args: version
            .arguments
            .as_ref()
            .map(|a| a.game_values())
            .unwrap_or_default(),
        minecraft_arguments: version.minecraft_arguments.clone(),
        libraries: plan.classpath,
        version_json_path,
        patched,
    })
}

/// `versions/<id>/<id>.json` verbatim, plus a copy of the base game jar.
async fn write_version_files(
    ctx: &InstallContext<'_>,
    profile: &InstallProfile,
) -> LauncherResult<PathBuf> {
    let id = &profile.version.id;
    let dir = ctx.versions_dir().join(id);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| LauncherError::io(&dir, e))?;

    let json_path = dir.join(format!("{id}.json"));
    let body = serde_json::to_vec_pretty(&profile.version_raw)?;
    tokio::fs::write(&json_path, body)
        .await
        .map_err(|e| LauncherError::io(&json_path, e))?;

    let base_jar = &ctx.request.minecraft_jar_path;
    if tokio::fs::try_exists(base_jar).await.unwrap_or(false) {
        let target = dir.join(format!("{id}.jar"));
        tokio::fs::copy(base_jar, &target)
            .await
            .map_err(|e| LauncherError::io(&target, e))?;
    } else {
        warn!("Base game jar {:?} not found; not copied", base_jar);
    }
    Ok(json_path)
}

/// Download (or reuse) a Forge-family installer jar and pull everything the
/// install needs out of it.
pub async fn prepare_from_installer(
    ctx: &InstallContext<'_>,
    build: &ResolvedBuild,
    universal_prefix: &str,
) -> LauncherResult<PreparedProfile> {
    let folder = ctx.installers_dir();
    let filename = build
        .artifact_url
        .rsplit('/')
        .next()
        .filter(|n| !n.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| format!("{}-{}-installer.jar", build.loader_type, build.build));
    let jar = folder.join(&filename);

    if !installer_is_valid(&jar, build).await {
        let bytes = ctx
            .downloader
            .fetch_one(&build.artifact_url, &folder, &filename)
            .await?;
        ctx.events.progress(bytes, bytes, Some(&filename));
        if let Some((algorithm, expected)) = &build.checksum {
            verify_or_remove(&jar, *algorithm, expected).await?;
        }
    }

    let libraries_dir = ctx.libraries_dir();
    let events = ctx.events.clone();
    let universal_prefix = universal_prefix.to_string();
    let jar_path = jar.clone();
    let (profile, skip_core, client_data) = tokio::task::spawn_blocking(move || {
        let mut archive = JarArchive::open(&jar_path)?;
        let profile = read_install_profile(&mut archive)?;
        let skip = extract_universal(&mut archive, &profile, &libraries_dir, &events)?;
        let data = extract_client_data(
            &mut archive,
            &profile,
            &libraries_dir,
            &universal_prefix,
            &events,
        )?;
        Ok::<_, LauncherError>((profile, skip, data))
    })
    .await
    .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))??;

    Ok(PreparedProfile {
        profile,
        installer_jar: Some(jar),
        skip_core,
        client_data,
    })
}

async fn installer_is_valid(jar: &Path, build: &ResolvedBuild) -> bool {
    if !tokio::fs::try_exists(jar).await.unwrap_or(false) {
        return false;
    }
    match &build.checksum {
        Some((algorithm, expected)) => verify_or_remove(jar, *algorithm, expected).await.is_ok(),
        None => {
            debug!("Reusing {:?}; no checksum published", jar);
            true
        }
    }
}

/// Dispatcher sin Box<dyn>
pub enum Installer {
    Forge(ForgeInstaller),
    NeoForge(NeoForgeInstaller),
    /// Fabric and LegacyFabric share the meta API shape.
    Fabric(FabricInstaller),
    Quilt(QuiltInstaller),
}

impl Installer {
    pub fn from_config(config: &LoaderConfig) -> Self {
        match config {
            LoaderConfig::Forge(o) => Self::Forge(ForgeInstaller::new(o.clone())),
            LoaderConfig::NeoForge(o) => Self::NeoForge(NeoForgeInstaller::new(o.clone())),
            LoaderConfig::Fabric(o) => {
                Self::Fabric(FabricInstaller::new(LoaderType::Fabric, o.clone()))
            }
            LoaderConfig::LegacyFabric(o) => {
                Self::Fabric(FabricInstaller::new(LoaderType::LegacyFabric, o.clone()))
            }
            LoaderConfig::Quilt(o) => Self::Quilt(QuiltInstaller::new(o.clone())),
        }
    }

    pub async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild> {
        match self {
            Installer::Forge(i) => i.resolve_build(ctx).await,
            Installer::NeoForge(i) => i.resolve_build(ctx).await,
            Installer::Fabric(i) => i.resolve_build(ctx).await,
            Installer::Quilt(i) => i.resolve_build(ctx).await,
        }
    }

    pub async fn install(&self, ctx: &InstallContext<'_>) -> LauncherResult<LoaderInstallResult> {
        match self {
            Installer::Forge(i) => i.install(ctx).await,
            Installer::NeoForge(i) => i.install(ctx).await,
            Installer::Fabric(i) => i.install(ctx).await,
            Installer::Quilt(i) => i.install(ctx).await,
        }
    }
}
