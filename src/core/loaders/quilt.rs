use async_trait::async_trait;

use super::context::InstallContext;
use super::installer::{LoaderInstaller, PreparedProfile, ResolvedBuild};
use super::meta::{MetaApi, RecommendedPolicy};
use super::request::LoaderType;
use crate::core::config::MetaLoaderOptions;
use crate::core::error::LauncherResult;

/// Installs Quilt loader via the Quilt Meta API (nearly identical to Fabric's API).
/// `recommended` skips beta builds.
pub struct QuiltInstaller {
    api: MetaApi,
}

impl QuiltInstaller {
    pub fn new(options: MetaLoaderOptions) -> Self {
        Self {
            api: MetaApi::new(LoaderType::Quilt, options, RecommendedPolicy::FirstNonBeta),
        }
    }
}

#[async_trait]
impl LoaderInstaller for QuiltInstaller {
    async fn resolve_build(&self, ctx: &InstallContext<'_>) -> LauncherResult<ResolvedBuild> {
        self.api.resolve_build(ctx).await
    }

    async fn prepare(
        &self,
        ctx: &InstallContext<'_>,
        build: &ResolvedBuild,
    ) -> LauncherResult<PreparedProfile> {
        self.api.prepare(ctx, build).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::LauncherError;
    use crate::core::events::EventEmitter;
    use crate::core::loaders::meta::fixtures::{meta_server, options};
    use crate::core::loaders::request::BuildSelector;
    use crate::core::test_support::LoaderFixture;

    #[tokio::test]
    async fn recommended_skips_beta_builds() {
        let server = meta_server(&["1.0", "1.1-beta", "1.2"]).await;
        let installer = QuiltInstaller::new(options(&server));
        let mut fixture = LoaderFixture::new(LoaderType::Quilt, BuildSelector::Recommended, EventEmitter::detached());

        assert_eq!(installer.resolve_build(&fixture.ctx()).await.unwrap().build, "1.0");

        let server = meta_server(&["0.24.0-beta.3", "0.23.1"]).await;
        let installer = QuiltInstaller::new(options(&server));
        assert_eq!(installer.resolve_build(&fixture.ctx()).await.unwrap().build, "0.23.1");

        fixture.request.build = BuildSelector::Latest;
        assert_eq!(
            installer.resolve_build(&fixture.ctx()).await.unwrap().build,
            "0.24.0-beta.3"
        );
    }

    #[tokio::test]
    async fn unknown_literal_lists_available_builds() {
        let server = meta_server(&["1.0", "1.2"]).await;
        let installer = QuiltInstaller::new(options(&server));
        let fixture = LoaderFixture::new(
            LoaderType::Quilt,
            BuildSelector::Literal("9.9".into()),
            EventEmitter::detached(),
        );

        let err = installer.resolve_build(&fixture.ctx()).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Quilt build 9.9 not found. Available builds: 1.0, 1.2"
        );
    }
}
