use async_trait::async_trait;

use super::context::InstallContext;
use super::installer::{LoaderInstaller, PreparedProfile, ResolvedBuild};
use super::meta::{MetaApi, RecommendedPolicy};
use super::request::LoaderType;
use crate::core::config::MetaLoaderOptions;
use crate::core::error::LauncherResult;

/// Fabric and LegacyFabric: profile JSON straight from the meta API, no
/// installer jar and no processors.
pub struct FabricInstaller {
    api: MetaApi,
}

impl FabricInstaller {
    pub fn new(loader_type: LoaderType, options: MetaLoaderOptions) -> Self {
        Self {
            api: MetaApi::new(loader_type, options, RecommendedPolicy::SameAsLatest),
        }
    }

    pub fn loader_type(&self) -> LoaderType {
        self.api.loader_type()
    }
}

#[async_trait]
impl LoaderInstaller for FabricInstaller {
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
    use crate::core::test_support::{LoaderFixture, Route};

    #[tokio::test]
    async fn recommended_is_latest_for_fabric() {
        let server = meta_server(&["0.15.7", "0.15.6"]).await;
        let installer = FabricInstaller::new(LoaderType::Fabric, options(&server));
        let fixture = LoaderFixture::new(LoaderType::Fabric, BuildSelector::Recommended, EventEmitter::detached());

        let build = installer.resolve_build(&fixture.ctx()).await.unwrap();
        assert_eq!(build.build, "0.15.7");
        assert_eq!(build.artifact_url, server.url("/profile/1.20.1/0.15.7"));
    }

    #[tokio::test]
    async fn unknown_game_version_is_unsupported() {
        let server = meta_server(&["0.15.7"]).await;
        let installer = FabricInstaller::new(LoaderType::LegacyFabric, options(&server));
        let mut fixture = LoaderFixture::new(LoaderType::LegacyFabric, BuildSelector::Latest, EventEmitter::detached());
        fixture.request.minecraft_version = "1.8.9".into();

        let err = installer.resolve_build(&fixture.ctx()).await.unwrap_err();
        assert!(matches!(err, LauncherError::LoaderUnsupported { .. }));
        assert_eq!(installer.loader_type(), LoaderType::LegacyFabric);
    }

    #[tokio::test]
    async fn installs_profile_and_libraries() {
        let server = meta_server(&["0.15.7"]).await;
        server.set(
            "/profile/1.20.1/0.15.7",
            Route::json(&serde_json::json!({
                "id": "fabric-loader-0.15.7-1.20.1",
                "inheritsFrom": "1.20.1",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "arguments": { "game": [], "jvm": ["-DFabricMcEmu= net.minecraft.client.main.Main "] },
                "libraries": [
                    { "name": "net.fabricmc:fabric-loader:0.15.7", "url": server.url("/maven/") },
                    { "name": "net.fabricmc:intermediary:1.20.1", "url": server.url("/maven/") }
                ]
            })),
        );
        server.set(
            "/maven/net/fabricmc/fabric-loader/0.15.7/fabric-loader-0.15.7.jar",
            Route::ok(b"loader".to_vec()),
        );
        server.set(
            "/maven/net/fabricmc/intermediary/1.20.1/intermediary-1.20.1.jar",
            Route::ok(b"intermediary".to_vec()),
        );
        let fixture = LoaderFixture::new(LoaderType::Fabric, BuildSelector::Literal("0.15.7".into()), EventEmitter::detached());

        let result = FabricInstaller::new(LoaderType::Fabric, options(&server))
            .install(&fixture.ctx())
            .await
            .unwrap();

        assert_eq!(result.build, "0.15.7");
        assert_eq!(result.main_class, "net.fabricmc.loader.impl.launch.knot.KnotClient");
        assert_eq!(result.jvm_args.len(), 1);
        assert_eq!(result.libraries.len(), 2);
        assert_eq!(std::fs::read(&result.libraries[1]).unwrap(), b"intermediary");
        assert!(result
            .version_json_path
            .ends_with("versions/fabric-loader-0.15.7-1.20.1/fabric-loader-0.15.7-1.20.1.json"));
        assert!(!result.patched);
    }
}
