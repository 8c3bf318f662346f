// ─── Patch Processors ───
// Runs the install profile's client-side processor chain (binary patching,
// mapping merges) as external java processes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::context::InstallContext;
use super::profile::{InstallProfile, ProcessorStep};
use crate::core::archive::JarArchive;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::install::classpath_separator;
use crate::core::maven::MavenArtifact;
use crate::core::process::{run_streaming, ProcessSpec};

const BINPATCH: &str = "BINPATCH";

pub struct PatchProcessor<'a> {
    ctx: &'a InstallContext<'a>,
    tokens: HashMap<String, String>,
    libraries_dir: PathBuf,
}

impl<'a> PatchProcessor<'a> {
    /// Build the token map. Data values pointing inside the installer
    /// (`/data/...`) are extracted next to it first.
    pub fn new(
        ctx: &'a InstallContext<'a>,
        profile: &InstallProfile,
        installer: &mut JarArchive,
        client_data: Option<&Path>,
    ) -> LauncherResult<Self> {
        let libraries_dir = ctx.libraries_dir();
        let mut tokens = HashMap::new();

        for (key, data) in &profile.data {
            let value = if key == BINPATCH {
                match client_data {
                    Some(path) => path_string(path),
                    None => data.client.clone(),
                }
            } else if let Some(entry) = data.client.strip_prefix('/') {
                let target = ctx.installers_dir().join("data").join(entry);
                let bytes = installer.read(entry)?;
                if let Some(parent) = target.parent() {
                    std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
                }
                std::fs::write(&target, bytes).map_err(|e| LauncherError::io(&target, e))?;
                path_string(&target)
            } else {
                resolve_literal(&data.client, &libraries_dir)?
            };
            tokens.insert(key.clone(), value);
        }

        let request = ctx.request;
        tokens.insert("SIDE".into(), "client".into());
        tokens.insert("ROOT".into(), path_string(&ctx.loader_root));
        tokens.insert("MINECRAFT_JAR".into(), path_string(&request.minecraft_jar_path));
        // Processors historically receive the version JSON path under this key.
        tokens.insert(
            "MINECRAFT_VERSION".into(),
            path_string(&request.minecraft_json_path),
        );
        tokens.insert("INSTALLER".into(), path_string(installer.path()));
        tokens.insert("LIBRARY_DIR".into(), path_string(&libraries_dir));

        Ok(Self {
            ctx,
            tokens,
            libraries_dir,
        })
    }

    /// True when some file a client processor references is still missing.
    /// A chain that references no files has nothing to rebuild.
    pub fn needs_patch(profile: &InstallProfile, libraries_dir: &Path) -> bool {
        let mut outputs = Vec::new();
        for step in profile.client_processors() {
            for arg in &step.args {
                let Some(key) = arg.strip_prefix('{').and_then(|a| a.strip_suffix('}')) else {
                    continue;
                };
                if key == BINPATCH {
                    continue;
                }
                if let Some(Ok(artifact)) = profile
                    .data_client(key)
                    .and_then(MavenArtifact::from_bracketed)
                {
                    outputs.push(artifact.path_in(libraries_dir));
                }
            }
        }

        outputs.iter().any(|p| !p.exists())
    }

    /// Substitute `{TOKEN}`s, `[coord]` and `'literal'` in one argument.
    pub fn resolve_arg(&self, arg: &str, processor: &str) -> LauncherResult<String> {
        if arg.starts_with('[') || arg.starts_with('\'') {
            return resolve_literal(arg, &self.libraries_dir);
        }

        let mut out = String::with_capacity(arg.len());
        let mut rest = arg;
        while let Some(start) = rest.find('{') {
            let Some(len) = rest[start..].find('}') else {
                break;
            };
            let key = &rest[start + 1..start + len];
            let value = self
                .tokens
                .get(key)
                .ok_or_else(|| LauncherError::UnresolvedToken {
                    token: key.to_string(),
                    processor: processor.to_string(),
                })?;
            out.push_str(&rest[..start]);
            out.push_str(value);
            rest = &rest[start + len + 1..];
        }
        out.push_str(rest);
        Ok(out)
    }

    /// Run every client step in order. Returns how many ran.
    pub async fn patch(&self, profile: &InstallProfile) -> LauncherResult<usize> {
        let mut ran = 0;
        for step in &profile.install.processors {
            if !step.runs_on_client() {
                debug!("Skipping server-only processor {}", step.jar);
                continue;
            }
            self.ctx.ensure_not_cancelled("patching")?;
            self.run_step(step).await?;
            ran += 1;
        }
        info!("Ran {} processors", ran);
        Ok(ran)
    }

    async fn run_step(&self, step: &ProcessorStep) -> LauncherResult<()> {
        let jar = MavenArtifact::parse(&step.jar)?.path_in(&self.libraries_dir);
        let main_class = JarArchive::open(&jar)?
            .manifest_attribute("Main-Class")?
            .ok_or_else(|| {
                LauncherError::Loader(format!("Main-Class missing in processor jar {}", jar.display()))
            })?;

        let mut classpath = vec![path_string(&jar)];
        for entry in &step.classpath {
            classpath.push(path_string(&MavenArtifact::parse(entry)?.path_in(&self.libraries_dir)));
        }
        let args = step
            .args
            .iter()
            .map(|a| self.resolve_arg(a, &step.jar))
            .collect::<LauncherResult<Vec<_>>>()?;

        let spec = ProcessSpec::new(&self.ctx.request.java_path, &self.ctx.root)
            .arg("-classpath")
            .arg(classpath.join(classpath_separator()))
            .arg(main_class)
            .args(args);

        info!("Running processor {}", step.jar);
        let events = self.ctx.events;
        let code = run_streaming(&spec, self.ctx.cancel, self.ctx.kill_grace, |_, line| {
            events.patch(line)
        })
        .await?;

        if code == Some(0) {
            return Ok(());
        }
        warn!("Processor {} exited with {:?}", step.jar, code);
        events.error(format!("processor {} exited with code {:?}", step.jar, code));
        if self.ctx.strict_processors {
            return Err(LauncherError::ProcessFailed {
                program: step.jar.clone(),
                code,
            });
        }
        Ok(())
    }
}

fn resolve_literal(value: &str, libraries_dir: &Path) -> LauncherResult<String> {
    if let Some(artifact) = MavenArtifact::from_bracketed(value) {
        return Ok(path_string(&artifact?.path_in(libraries_dir)));
    }
    if let Some(inner) = value.strip_prefix('\'').and_then(|v| v.strip_suffix('\'')) {
        return Ok(inner.to_string());
    }
    Ok(value.to_string())
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::core::archive::build_archive;
    use crate::core::downloader::Downloader;
    use crate::core::events::{EventEmitter, SyncEvent};
    use crate::core::loaders::request::{BuildSelector, LoaderRequest, LoaderType};

    fn profile(processors: serde_json::Value) -> InstallProfile {
        InstallProfile::modern(
            serde_json::json!({
                "data": {
                    "MAPPINGS": { "client": "[de.oceanlabs.mcp:mcp_config:1.20.1:mappings@txt]", "server": "" },
                    "MCP_VERSION": { "client": "'20230612.114412'", "server": "" },
                    "BINPATCH": { "client": "/data/client.lzma", "server": "" }
                },
                "processors": processors
            }),
            serde_json::json!({ "id": "1.20.1-forge-47.2.0", "mainClass": "M" }),
        )
        .unwrap()
    }

    struct Fixture {
        dir: tempfile::TempDir,
        request: LoaderRequest,
        mirrors: Vec<String>,
        downloader: Downloader,
        events: EventEmitter,
        cancel: CancellationToken,
    }

    impl Fixture {
        fn new(java: PathBuf, events: EventEmitter) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let request = LoaderRequest {
                loader_type: LoaderType::Forge,
                minecraft_version: "1.20.1".into(),
                build: BuildSelector::Latest,
                java_path: java,
                minecraft_jar_path: dir.path().join("versions/1.20.1/1.20.1.jar"),
                minecraft_json_path: dir.path().join("versions/1.20.1/1.20.1.json"),
            };
            Self {
                dir,
                request,
                mirrors: Vec::new(),
                downloader: Downloader::new(reqwest::Client::new(), Duration::from_secs(1)),
                events,
                cancel: CancellationToken::new(),
            }
        }

        fn ctx(&self, strict: bool) -> InstallContext<'_> {
            InstallContext {
                request: &self.request,
                root: self.dir.path().to_path_buf(),
                loader_root: self.dir.path().join("loader/forge"),
                mirrors: &self.mirrors,
                downloader: &self.downloader,
                events: &self.events,
                cancel: &self.cancel,
                concurrency: 1,
                kill_grace: Duration::from_millis(200),
                strict_processors: strict,
            }
        }

        fn installer(&self) -> JarArchive {
            let bytes = build_archive([("data/client.lzma", b"lzma".as_slice())]).unwrap();
            let path = self.dir.path().join("installer.jar");
            std::fs::write(&path, bytes).unwrap();
            JarArchive::open(&path).unwrap()
        }
    }

    #[test]
    fn arguments_resolve_tokens_coordinates_and_literals() {
        let fixture = Fixture::new(PathBuf::from("java"), EventEmitter::detached());
        let ctx = fixture.ctx(true);
        let profile = profile(serde_json::json!([]));
        let mut installer = fixture.installer();
        let client_data = fixture.dir.path().join("clientdata.lzma");
        let patcher = PatchProcessor::new(&ctx, &profile, &mut installer, Some(&client_data)).unwrap();

        assert_eq!(patcher.resolve_arg("{SIDE}", "p").unwrap(), "client");
        assert_eq!(patcher.resolve_arg("{ROOT}", "p").unwrap(), path_string(&ctx.loader_root));
        assert_eq!(patcher.resolve_arg("{MCP_VERSION}", "p").unwrap(), "20230612.114412");
        assert_eq!(
            patcher.resolve_arg("{BINPATCH}", "p").unwrap(),
            path_string(&client_data)
        );
        assert_eq!(
            patcher.resolve_arg("--in={MINECRAFT_JAR}", "p").unwrap(),
            format!("--in={}", path_string(&fixture.request.minecraft_jar_path))
        );
        assert!(patcher
            .resolve_arg("{MAPPINGS}", "p")
            .unwrap()
            .ends_with("mcp_config-1.20.1-mappings.txt"));
        assert!(patcher
            .resolve_arg("[net.minecraft:client:1.20.1:slim]", "p")
            .unwrap()
            .ends_with("client-1.20.1-slim.jar"));
        assert_eq!(patcher.resolve_arg("'literal'", "p").unwrap(), "literal");

        let err = patcher.resolve_arg("{NOPE}", "net.minecraftforge:installertools:1.3.0").unwrap_err();
        assert!(matches!(err, LauncherError::UnresolvedToken { ref token, .. } if token == "NOPE"));
    }

    #[test]
    fn needs_patch_follows_declared_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let profile = profile(serde_json::json!([
            { "jar": "a:b:1", "args": ["--mappings", "{MAPPINGS}", "--patch", "{BINPATCH}"] }
        ]));
        assert!(PatchProcessor::needs_patch(&profile, dir.path()));

        let output = MavenArtifact::parse("de.oceanlabs.mcp:mcp_config:1.20.1:mappings@txt")
            .unwrap()
            .path_in(dir.path());
        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(&output, "ok").unwrap();
        assert!(!PatchProcessor::needs_patch(&profile, dir.path()));
    }

    #[test]
    fn chain_referencing_no_files_needs_no_patch() {
        let dir = tempfile::tempdir().unwrap();
        let profile = profile(serde_json::json!([
            { "jar": "a:b:1", "args": ["--patch", "{BINPATCH}", "--side", "{SIDE}"] }
        ]));
        assert!(!PatchProcessor::needs_patch(&profile, dir.path()));
    }

    #[tokio::test]
    async fn server_only_steps_never_spawn() {
        let (events, mut rx) = EventEmitter::channel();
        let fixture = Fixture::new(PathBuf::from("/definitely/not/java"), events);
        let ctx = fixture.ctx(true);
        let profile = profile(serde_json::json!([
            { "sides": ["server"], "jar": "net.minecraftforge:installertools:1.3.0", "args": ["{SIDE}"] }
        ]));
        let mut installer = fixture.installer();
        let patcher = PatchProcessor::new(&ctx, &profile, &mut installer, None).unwrap();

        assert_eq!(patcher.patch(&profile).await.unwrap(), 0);
        while let Ok(event) = rx.try_recv() {
            assert!(!matches!(event, SyncEvent::Patch(_)));
        }
    }

    #[cfg(unix)]
    fn fake_java(dir: &Path, exit_code: i32) -> PathBuf {
        crate::core::test_support::fake_java(
            dir,
            &format!("java-{exit_code}"),
            &format!("echo \"$3 $4\"\nexit {exit_code}"),
        )
    }

    #[cfg(unix)]
    fn write_processor_jar(libraries: &Path) {
        let jar = MavenArtifact::parse("net.minecraftforge:binarypatcher:1.1.1")
            .unwrap()
            .path_in(libraries);
        std::fs::create_dir_all(jar.parent().unwrap()).unwrap();
        let bytes = build_archive([(
            "META-INF/MANIFEST.MF",
            b"Manifest-Version: 1.0\r\nMain-Class: net.minecraftforge.binarypatcher.ConsoleTool\r\n".as_slice(),
        )])
        .unwrap();
        std::fs::write(jar, bytes).unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn client_step_output_becomes_patch_events() {
        let scripts = tempfile::tempdir().unwrap();
        let (events, mut rx) = EventEmitter::channel();
        let fixture = Fixture::new(fake_java(scripts.path(), 0), events);
        let ctx = fixture.ctx(true);
        write_processor_jar(&ctx.libraries_dir());
        let profile = profile(serde_json::json!([
            { "jar": "net.minecraftforge:binarypatcher:1.1.1", "args": ["{SIDE}"] }
        ]));
        let mut installer = fixture.installer();
        let patcher = PatchProcessor::new(&ctx, &profile, &mut installer, None).unwrap();

        assert_eq!(patcher.patch(&profile).await.unwrap(), 1);
        let mut lines = Vec::new();
        while let Ok(event) = rx.try_recv() {
            if let SyncEvent::Patch(line) = event {
                lines.push(line);
            }
        }
        assert_eq!(
            lines,
            vec!["net.minecraftforge.binarypatcher.ConsoleTool client".to_string()]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_step_is_fatal_only_when_strict() {
        let scripts = tempfile::tempdir().unwrap();
        let java = fake_java(scripts.path(), 3);
        let profile = profile(serde_json::json!([
            { "jar": "net.minecraftforge:binarypatcher:1.1.1", "args": [] }
        ]));

        let strict = Fixture::new(java.clone(), EventEmitter::detached());
        let ctx = strict.ctx(true);
        write_processor_jar(&ctx.libraries_dir());
        let mut installer = strict.installer();
        let err = PatchProcessor::new(&ctx, &profile, &mut installer, None)
            .unwrap()
            .patch(&profile)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::ProcessFailed { code: Some(3), .. }));

        let (events, mut rx) = EventEmitter::channel();
        let lenient = Fixture::new(java, events);
        let ctx = lenient.ctx(false);
        write_processor_jar(&ctx.libraries_dir());
        let mut installer = lenient.installer();
        PatchProcessor::new(&ctx, &profile, &mut installer, None)
            .unwrap()
            .patch(&profile)
            .await
            .unwrap();
        let mut saw_error = false;
        while let Ok(event) = rx.try_recv() {
            saw_error |= matches!(event, SyncEvent::Error(_));
        }
        assert!(saw_error);
    }
}
