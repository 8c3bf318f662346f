// ─── Installation Orchestrator ───
// Sequences every stage of a synchronization run and hands back the finished
// classpath and argument set.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::classpath::assemble_classpath;
use super::natives::extract_natives;
use crate::core::assets::{fetch_extra_files, AssetIndex, AssetManager};
use crate::core::bundle::{retain_contained, BundleReconciler, ManifestEntry};
use crate::core::config::{LoaderConfig, SyncConfig};
use crate::core::downloader::{BatchReport, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::events::{EventEmitter, SyncEvent};
use crate::core::http::build_http_client;
use crate::core::java::{apply_executable_bits, resolve_runtime, runtime_platform};
use crate::core::loaders::{InstallContext, Installer, LoaderInstallResult, LoaderRequest};
use crate::core::version::{VersionJson, VersionManifest};

const STAGES: usize = 8;

/// Everything the caller needs to launch the installed game.
/// `${placeholder}` templating in the arguments is left to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallReport {
    pub version_id: String,
    pub main_class: String,
    pub java_path: PathBuf,
    pub classpath: Vec<PathBuf>,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    pub minecraft_arguments: Option<String>,
    pub natives_dir: PathBuf,
    pub asset_index_id: Option<String>,
    pub assets_root: PathBuf,
    pub loader: Option<LoaderInstallResult>,
    pub downloaded_files: usize,
    pub failed_files: usize,
    pub pruned_files: usize,
    pub finished_at: DateTime<Utc>,
}

/// Vanilla side of the run, gathered before anything is downloaded.
struct VanillaPlan {
    version: VersionJson,
    asset_index: Option<AssetIndex>,
    java_path: PathBuf,
    manifest: Vec<ManifestEntry>,
}

pub struct Orchestrator {
    config: SyncConfig,
    downloader: Downloader,
}

impl Orchestrator {
    /// Validates the configuration and builds the shared HTTP client.
    pub fn new(config: SyncConfig) -> LauncherResult<Self> {
        config.validate()?;
        let client = build_http_client(config.timeout())?;
        let downloader = Downloader::new(client, config.timeout());
        Ok(Self { config, downloader })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Run the whole pipeline. Exactly one terminal event (`Completed`,
    /// `Failed` or `Cancelled`) is emitted, always last.
    pub async fn run(
        &self,
        events: &EventEmitter,
        cancel: &CancellationToken,
    ) -> LauncherResult<InstallReport> {
        let result = self.run_stages(events, cancel).await;
        match &result {
            Ok(report) => {
                info!(
                    "Sync of {} finished: {} downloaded, {} failed",
                    report.version_id, report.downloaded_files, report.failed_files
                );
                events.emit(SyncEvent::Completed);
            }
            Err(LauncherError::Cancelled(reason)) => {
                warn!("Sync cancelled: {}", reason);
                events.emit(SyncEvent::Cancelled(reason.clone()));
            }
            Err(e) => {
                warn!("Sync failed ({:?}): {}", e.category(), e);
                events.emit(SyncEvent::Failed(e.to_string()));
            }
        }
        result
    }

    #[instrument(skip_all, fields(version = %self.config.version, root = %self.config.root.display()))]
    async fn run_stages(
        &self,
        events: &EventEmitter,
        cancel: &CancellationToken,
    ) -> LauncherResult<InstallReport> {
        let root = self.config.root.as_path();

        checkpoint(cancel, events, 0, "version metadata")?;
        let plan = self.plan_vanilla(cancel, events).await?;

        checkpoint(cancel, events, 4, "downloads")?;
        let batch = self.sync_files(&plan.manifest, cancel, events).await?;
        apply_executable_bits(root, &plan.manifest).await?;

        let pruned = if self.config.verify {
            let reconciler = BundleReconciler::from_config(&self.config);
            reconciler.prune(&plan.manifest).await.len()
        } else {
            0
        };

        checkpoint(cancel, events, 5, "natives")?;
        let natives_dir = root.join(plan.version.natives_path());
        extract_natives(root, &natives_dir, &plan.manifest, events).await?;
        if let Some(index) = &plan.asset_index {
            AssetManager::copy_legacy_assets(root, &self.config.instance_dir(), index).await?;
        }

        checkpoint(cancel, events, 6, "loader")?;
        let loader = match &self.config.loader {
            Some(loader_config) => {
                Some(self.install_loader(loader_config, &plan, cancel, events).await?)
            }
            None => None,
        };

        checkpoint(cancel, events, 7, "classpath")?;
        let VanillaPlan {
            version, java_path, ..
        } = plan;
        let report = self.build_report(version, java_path, natives_dir, loader, batch, pruned);
        events.check(STAGES, STAGES, "done");
        Ok(report)
    }

    /// Stages 1-4: version manifest, version JSON, assets, Java runtime and
    /// extra files folded into one manifest.
    async fn plan_vanilla(
        &self,
        cancel: &CancellationToken,
        events: &EventEmitter,
    ) -> LauncherResult<VanillaPlan> {
        let client = self.downloader.client();
        let endpoints = &self.config.endpoints;

        let manifest = VersionManifest::fetch(client, &endpoints.version_manifest).await?;
        let entry = manifest.resolve(&self.config.version)?;
        let (version, raw) = VersionJson::fetch(client, &entry.url).await?;
        info!("Resolved {} -> {}", self.config.version, version.id);
        let mut entries = version.manifest_entries(&raw);

        checkpoint(cancel, events, 1, "assets")?;
        let asset_index = match &version.asset_index {
            Some(info) => {
                let (index, raw_index) = AssetManager::fetch_index(client, info).await?;
                entries.extend(AssetManager::manifest_entries(
                    info,
                    &index,
                    &raw_index,
                    &endpoints.resources,
                ));
                Some(index)
            }
            None => {
                warn!("Version {} declares no asset index", version.id);
                None
            }
        };

        checkpoint(cancel, events, 2, "java runtime")?;
        let java_path = match &self.config.java.path {
            Some(path) => {
                info!("Using configured Java at {:?}", path);
                path.clone()
            }
            None => {
                let component = self
                    .config
                    .java
                    .component
                    .as_deref()
                    .unwrap_or_else(|| version.java_component());
                let runtime = resolve_runtime(
                    client,
                    &endpoints.java_runtime_index,
                    component,
                    runtime_platform(),
                    &self.config.root,
                )
                .await?;
                entries.extend(runtime.entries);
                runtime.java_path
            }
        };

        checkpoint(cancel, events, 3, "extra files")?;
        if let Some(url) = &self.config.extra_files_url {
            entries.extend(fetch_extra_files(client, url, self.config.instance.as_deref()).await?);
        }
        let rejected = retain_contained(&mut entries);
        if rejected > 0 {
            warn!("Dropped {} manifest entries pointing outside {:?}", rejected, self.config.root);
        }

        Ok(VanillaPlan {
            version,
            asset_index,
            java_path,
            manifest: entries,
        })
    }

    async fn sync_files(
        &self,
        manifest: &[ManifestEntry],
        cancel: &CancellationToken,
        events: &EventEmitter,
    ) -> LauncherResult<BatchReport> {
        let root = self.config.root.as_path();
        let reconciler = BundleReconciler::from_config(&self.config);
        let missing = reconciler.reconcile(manifest).await?;
        let total = BundleReconciler::total_size(&missing);
        let tasks = missing
            .iter()
            .filter_map(|e| e.to_download_task(root))
            .collect();

        self.downloader
            .fetch_many(tasks, total, self.config.concurrency, cancel, events)
            .await
    }

    async fn install_loader(
        &self,
        loader_config: &LoaderConfig,
        plan: &VanillaPlan,
        cancel: &CancellationToken,
        events: &EventEmitter,
    ) -> LauncherResult<LoaderInstallResult> {
        let root = &self.config.root;
        let loader_type = loader_config.loader_type();
        let request = LoaderRequest {
            loader_type,
            minecraft_version: plan.version.id.clone(),
            build: loader_config.build().clone(),
            java_path: plan.java_path.clone(),
            minecraft_jar_path: root.join(plan.version.client_jar_path()),
            minecraft_json_path: root.join(plan.version.json_path()),
        };
        let ctx = InstallContext {
            request: &request,
            root: root.clone(),
            loader_root: self.config.loader_dir(loader_type),
            mirrors: loader_config.mirrors(),
            downloader: &self.downloader,
            events,
            cancel,
            concurrency: self.config.concurrency,
            kill_grace: self.config.kill_grace(),
            strict_processors: self.config.strict_processors,
        };

        Installer::from_config(loader_config).install(&ctx).await
    }

    fn build_report(
        &self,
        version: VersionJson,
        java_path: PathBuf,
        natives_dir: PathBuf,
        loader: Option<LoaderInstallResult>,
        batch: BatchReport,
        pruned_files: usize,
    ) -> InstallReport {
        let root = self.config.root.as_path();
        let vanilla_libs_dir = root.join("libraries");
        let vanilla_libraries: Vec<PathBuf> = version
            .library_records()
            .into_iter()
            .filter(|r| !r.is_native)
            .map(|r| vanilla_libs_dir.join(r.local_path))
            .collect();

        let loader_libs_dir = loader
            .as_ref()
            .map(|l| self.config.loader_dir(l.loader).join("libraries"));
        let loader_libraries = loader.as_ref().map(|l| l.libraries.as_slice()).unwrap_or_default();
        let classpath = assemble_classpath(
            loader_libs_dir.as_deref(),
            loader_libraries,
            &vanilla_libs_dir,
            &vanilla_libraries,
            &root.join(version.client_jar_path()),
        );

        let mut jvm_args = version.simple_jvm_args();
        let mut game_args = match &version.arguments {
            Some(args) => args.game_values(),
            None => Vec::new(),
        };
        let mut minecraft_arguments = version.minecraft_arguments.clone();
        let mut main_class = version.main_class.clone();
        if let Some(result) = &loader {
            main_class = result.main_class.clone();
            jvm_args.extend(result.jvm_args.iter().cloned());
            game_args.extend(result.game_args.iter().cloned());
            // Legacy loaders ship the complete argument string.
            if result.minecraft_arguments.is_some() {
                minecraft_arguments = result.minecraft_arguments.clone();
            }
        }

        InstallReport {
            version_id: version.id,
            main_class,
            java_path,
            classpath,
            jvm_args,
            game_args,
            minecraft_arguments,
            natives_dir,
            asset_index_id: version.asset_index.map(|a| a.id),
            assets_root: root.join("assets"),
            loader,
            downloaded_files: batch.completed - batch.failed,
            failed_files: batch.failed,
            pruned_files,
            finished_at: Utc::now(),
        }
    }
}

fn checkpoint(
    cancel: &CancellationToken,
    events: &EventEmitter,
    stage: usize,
    label: &str,
) -> LauncherResult<()> {
    if cancel.is_cancelled() {
        return Err(LauncherError::Cancelled(format!("stopped before {label}")));
    }
    events.check(stage, STAGES, label);
    Ok(())
}
