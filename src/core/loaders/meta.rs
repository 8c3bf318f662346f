// ─── Meta API Loaders ───
// Shared resolution for loaders served by a Fabric-style meta service
// (Fabric, LegacyFabric, Quilt): a version list plus a ready-made profile.

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::context::InstallContext;
use super::installer::{PreparedProfile, ResolvedBuild};
use super::profile::InstallProfile;
use super::request::{BuildSelector, LoaderType};
use crate::core::config::MetaLoaderOptions;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::{fetch_json, fetch_text};

#[derive(Debug, Deserialize)]
struct MetaVersions {
    #[serde(default)]
    game: Vec<MetaVersion>,
    #[serde(default)]
    loader: Vec<MetaVersion>,
}

#[derive(Debug, Deserialize)]
struct MetaVersion {
    version: String,
}

/// How `recommended` maps onto the loader list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendedPolicy {
    SameAsLatest,
    FirstNonBeta,
}

pub struct MetaApi {
    loader_type: LoaderType,
    options: MetaLoaderOptions,
    policy: RecommendedPolicy,
}

impl MetaApi {
    pub fn new(loader_type: LoaderType, options: MetaLoaderOptions, policy: RecommendedPolicy) -> Self {
        Self {
            loader_type,
            options,
            policy,
        }
    }

    pub fn loader_type(&self) -> LoaderType {
        self.loader_type
    }

    fn pick(&self, loaders: &[String], selector: &BuildSelector) -> LauncherResult<String> {
        let found = match selector {
            BuildSelector::Latest => loaders.first(),
            BuildSelector::Recommended => match self.policy {
                RecommendedPolicy::SameAsLatest => loaders.first(),
                RecommendedPolicy::FirstNonBeta => loaders.iter().find(|v| !v.contains("beta")),
            },
            BuildSelector::Literal(wanted) => loaders.iter().find(|v| *v == wanted),
        };
        found.cloned().ok_or_else(|| LauncherError::BuildNotFound {
            loader: self.loader_type.display_name().into(),
            build: selector.to_string(),
            available: loaders.to_vec(),
        })
    }

    pub async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild> {
        let mc = ctx.request.minecraft_version.as_str();
        let url = self.options.versions_url_for(self.loader_type);
        let versions: MetaVersions = fetch_json(ctx.downloader.client(), &url)
            .await
            .map_err(|e| LauncherError::LoaderApi(format!("{}: {e}", self.loader_type.display_name())))?;

        if !versions.game.iter().any(|g| g.version == mc) {
            return Err(LauncherError::LoaderUnsupported {
                loader: self.loader_type.display_name().into(),
                minecraft_version: mc.to_string(),
            });
        }

        let loaders: Vec<String> = versions.loader.into_iter().map(|l| l.version).collect();
        let build = self.pick(&loaders, &ctx.request.build)?;
        let artifact_url = self
            .options
            .profile_url_for(self.loader_type)
            .replace("${version}", mc)
            .replace("${build}", &build);
        info!(
            "Resolved {} {} for Minecraft {}",
            self.loader_type.display_name(),
            build,
            mc
        );

        Ok(ResolvedBuild {
            loader_type: self.loader_type,
            minecraft_version: mc.to_string(),
            build,
            artifact_url,
            checksum: None,
            legacy_api: false,
        })
    }

    pub async fn prepare(
        &self,
        ctx: &InstallContext<'_>,
        build: &ResolvedBuild,
    ) -> LauncherResult<PreparedProfile> {
        let raw = fetch_text(ctx.downloader.client(), &build.artifact_url).await?;
        let version_raw: Value = serde_json::from_str(&raw)?;
        Ok(PreparedProfile {
            profile: InstallProfile::from_version_json(version_raw)?,
            installer_jar: None,
            skip_core: false,
            client_data: None,
        })
    }
}
