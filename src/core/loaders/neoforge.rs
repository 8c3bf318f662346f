use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{prepare_from_installer, LoaderInstaller, PreparedProfile, ResolvedBuild};
use super::request::{BuildSelector, LoaderType};
use crate::core::bundle::HashAlgorithm;
use crate::core::config::NeoForgeOptions;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{fetch_json, fetch_text};

/// NeoForge installer — same installer format as Forge, two artifact lines.
pub struct NeoForgeInstaller {
    options: NeoForgeOptions,
}

/// Legacy NeoForge for MC 1.20.1 was published under net.neoforged:forge.
const LEGACY_UNIVERSAL: &str = "net.neoforged:forge";
const LEGACY_CORE: &[&str] = &["net.neoforged:forge:", "net.neoforged:minecraftforge:"];
const UNIVERSAL: &str = "net.neoforged:neoforge";
const CORE: &[&str] = &["net.neoforged:neoforge:"];

#[derive(Debug, Deserialize)]
struct MavenVersions {
    #[serde(default)]
    versions: Vec<String>,
}

impl NeoForgeInstaller {
    pub fn new(options: NeoForgeOptions) -> Self {
        Self { options }
    }

    async fn versions(&self, client: &reqwest::Client, url: &str) -> LauncherResult<Vec<String>> {
        fetch_json::<MavenVersions>(client, url)
            .await
            .map(|v| v.versions)
            .map_err(|e| LauncherError::LoaderApi(format!("NeoForge versions: {e}")))
    }

    async fn installer_sha1(&self, client: &reqwest::Client, installer_url: &str) -> Option<String> {
        match fetch_text(client, &format!("{installer_url}.sha1")).await {
            Ok(text) => text.split_whitespace().next().map(str::to_owned),
            Err(e) => {
                warn!("No checksum for {}: {}", installer_url, e);
                None
            }
        }
    }
}

/// `1.20.4` → `20.4.`, `1.21` → `21.0.`
pub fn neoforge_prefix(minecraft_version: &str) -> Option<String> {
    let mut parts = minecraft_version.split('.').skip(1);
    let minor = parts.next().filter(|m| !m.is_empty())?;
    let patch = parts.next().unwrap_or("0");
    Some(format!("{minor}.{patch}."))
}

fn pick(builds: &[String], selector: &BuildSelector, prefix: Option<&str>) -> LauncherResult<String> {
    match selector {
        BuildSelector::Latest | BuildSelector::Recommended => {
            builds.last().cloned().ok_or_else(|| LauncherError::Other("empty build list".into()))
        }
        BuildSelector::Literal(wanted) => builds
            .iter()
            .find(|b| {
                *b == wanted || prefix.is_some_and(|p| **b == format!("{p}{wanted}"))
            })
            .cloned()
            .ok_or_else(|| LauncherError::BuildNotFound {
                loader: LoaderType::NeoForge.display_name().into(),
                build: wanted.clone(),
                available: builds.to_vec(),
            }),
    }
}

#[async_trait]
impl LoaderInstaller for NeoForgeInstaller {
    async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild> {
        let client = ctx.downloader.client();
        let mc = ctx.request.minecraft_version.as_str();
        let unsupported = || LauncherError::LoaderUnsupported {
            loader: LoaderType::NeoForge.display_name().into(),
            minecraft_version: mc.to_string(),
        };

        let legacy_prefix = format!("{mc}-");
        let legacy: Vec<String> = self
            .versions(client, &self.options.legacy_versions_url)
            .await?
            .into_iter()
            .filter(|v| v.starts_with(&legacy_prefix))
            .collect();

        let (build, legacy_api) = if !legacy.is_empty() {
            (pick(&legacy, &ctx.request.build, Some(legacy_prefix.as_str()))?, true)
        } else {
            let prefix = neoforge_prefix(mc).ok_or_else(unsupported)?;
            debug!("No legacy NeoForge builds for {}; trying {}*", mc, prefix);
            let current: Vec<String> = self
                .versions(client, &self.options.versions_url)
                .await?
                .into_iter()
                .filter(|v| v.starts_with(&prefix))
                .collect();
            if current.is_empty() {
                return Err(unsupported());
            }
            (pick(&current, &ctx.request.build, None)?, false)
        };

        let template = if legacy_api {
            &self.options.legacy_installer_url
        } else {
            &self.options.installer_url
        };
        let artifact_url = template.replace("${build}", &build);
        let checksum = self
            .installer_sha1(client, &artifact_url)
            .await
            .map(|sha1| (HashAlgorithm::Sha1, sha1));
        info!("Resolved NeoForge {} (legacy artifact: {})", build, legacy_api);

        Ok(ResolvedBuild {
            loader_type: LoaderType::NeoForge,
            minecraft_version: mc.to_string(),
            build,
            artifact_url,
            checksum,
            legacy_api,
        })
    }

    async fn prepare(
        &self,
        ctx: &InstallContext<'_>,
        build: &ResolvedBuild,
    ) -> LauncherResult<PreparedProfile> {
        let universal = if build.legacy_api { LEGACY_UNIVERSAL } else { UNIVERSAL };
        prepare_from_installer(ctx, build, universal).await
    }

    fn core_prefixes(&self, build: &ResolvedBuild) -> &'static [&'static str] {
        if build.legacy_api {
            LEGACY_CORE
        } else {
            CORE
        }
    }
}
