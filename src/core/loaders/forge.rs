use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::installer::{prepare_from_installer, LoaderInstaller, PreparedProfile, ResolvedBuild};
use super::request::{BuildSelector, LoaderType};
use crate::core::bundle::HashAlgorithm;
use crate::core::config::ForgeOptions;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_json;

const UNIVERSAL_PREFIX: &str = "net.minecraftforge:forge";
const CORE_PREFIXES: &[&str] = &["net.minecraftforge:forge:", "net.minecraftforge:minecraftforge:"];

/// Installs Forge from its official installer jar.
pub struct ForgeInstaller {
    options: ForgeOptions,
}

#[derive(Debug, Deserialize)]
struct Promotions {
    #[serde(default)]
    promos: HashMap<String, String>,
}

/// Per-build `meta.json`; only the installer checksum is used.
#[derive(Debug, Deserialize)]
struct BuildMeta {
    #[serde(default)]
    classifiers: HashMap<String, HashMap<String, String>>,
}

impl ForgeInstaller {
    pub fn new(options: ForgeOptions) -> Self {
        Self { options }
    }

    fn url_for(template: &str, build: &str) -> String {
        template.replace("${build}", build)
    }

    /// Pick the full `<mc>-<forge>` id out of the metadata.
    fn pick_build(
        &self,
        minecraft_version: &str,
        builds: &[String],
        promos: &HashMap<String, String>,
        selector: &BuildSelector,
    ) -> LauncherResult<String> {
        match selector {
            BuildSelector::Literal(wanted) => {
                let prefixed = format!("{minecraft_version}-{wanted}");
                builds
                    .iter()
                    .find(|b| *b == wanted || **b == prefixed)
                    .cloned()
                    .ok_or_else(|| LauncherError::BuildNotFound {
                        loader: LoaderType::Forge.display_name().into(),
                        build: wanted.clone(),
                        available: builds.to_vec(),
                    })
            }
            BuildSelector::Latest | BuildSelector::Recommended => {
                let key = if *selector == BuildSelector::Recommended {
                    format!("{minecraft_version}-recommended")
                } else {
                    format!("{minecraft_version}-latest")
                };
                let promo = promos
                    .get(&key)
                    .or_else(|| promos.get(&format!("{minecraft_version}-latest")));
                match promo {
                    Some(p) => Ok(format!("{minecraft_version}-{p}")),
                    None => {
                        debug!("No promotion for {}; using newest listed build", key);
                        builds.last().cloned().ok_or_else(|| LauncherError::LoaderUnsupported {
                            loader: LoaderType::Forge.display_name().into(),
                            minecraft_version: minecraft_version.to_string(),
                        })
                    }
                }
            }
        }
    }

    async fn installer_md5(&self, client: &reqwest::Client, build: &str) -> Option<String> {
        let url = Self::url_for(&self.options.meta_url, build);
        match fetch_json::<BuildMeta>(client, &url).await {
            Ok(meta) => meta
                .classifiers
                .get("installer")
                .and_then(|c| c.get("jar"))
                .cloned(),
            Err(e) => {
                warn!("No installer checksum for Forge {}: {}", build, e);
                None
            }
        }
    }
}

#[async_trait]
impl LoaderInstaller for ForgeInstaller {
    async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild> {
        let client = ctx.downloader.client();
        let mc = ctx.request.minecraft_version.as_str();

        let metadata: HashMap<String, Vec<String>> =
            fetch_json(client, &self.options.metadata_url)
                .await
                .map_err(|e| LauncherError::LoaderApi(format!("Forge metadata: {e}")))?;
        let Some(builds) = metadata.get(mc).filter(|b| !b.is_empty()) else {
            return Err(LauncherError::LoaderUnsupported {
                loader: LoaderType::Forge.display_name().into(),
                minecraft_version: mc.to_string(),
            });
        };

        let promos = match ctx.request.build {
            BuildSelector::Literal(_) => HashMap::new(),
            _ => fetch_json::<Promotions>(client, &self.options.promotions_url)
                .await
                .map_err(|e| LauncherError::LoaderApi(format!("Forge promotions: {e}")))?
                .promos,
        };

        let build = self.pick_build(mc, builds, &promos, &ctx.request.build)?;
        let checksum = self
            .installer_md5(client, &build)
            .await
            .map(|md5| (HashAlgorithm::Md5, md5));
        info!("Resolved Forge {} ({})", build, ctx.request.build);

        Ok(ResolvedBuild {
            loader_type: LoaderType::Forge,
            minecraft_version: mc.to_string(),
            artifact_url: Self::url_for(&self.options.installer_url, &build),
            build,
            checksum,
            legacy_api: false,
        })
    }

    async fn prepare(
        &self,
        ctx: &InstallContext<'_>,
        build: &ResolvedBuild,
    ) -> LauncherResult<PreparedProfile> {
        prepare_from_installer(ctx, build, UNIVERSAL_PREFIX).await
    }

    fn core_prefixes(&self, _build: &ResolvedBuild) -> &'static [&'static str] {
        CORE_PREFIXES
    }
}
