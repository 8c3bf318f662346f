// ─── Classpath Builder ───
// Orders loader libraries, vanilla libraries and the client jar into the
// final launch classpath.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

fn parse_numeric_version_parts(raw: &str) -> Vec<u32> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.parse::<u32>().ok())
        .collect()
}

pub(crate) fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_parts = parse_numeric_version_parts(a);
    let b_parts = parse_numeric_version_parts(b);

    let max_len = a_parts.len().max(b_parts.len());
    for idx in 0..max_len {
        let a_val = a_parts.get(idx).copied().unwrap_or(0);
        let b_val = b_parts.get(idx).copied().unwrap_or(0);
        match a_val.cmp(&b_val) {
            Ordering::Equal => continue,
            non_eq => return non_eq,
        }
    }

    // Deterministic tiebreaker for versions with identical numeric parts.
    a.cmp(b)
}

/// Platform-specific Java classpath separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// `group:artifact[:classifier]` plus version, recovered from a path laid
/// out as `<group dirs>/<artifact>/<version>/<artifact>-<version>[-<classifier>].jar`.
fn identity_from_path(libraries_dir: &Path, path: &Path) -> Option<(String, String)> {
    let relative = path.strip_prefix(libraries_dir).ok()?;
    let parts: Vec<&str> = relative
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect();
    if parts.len() < 4 {
        return None;
    }

    let file = parts[parts.len() - 1];
    let version = parts[parts.len() - 2];
    let artifact = parts[parts.len() - 3];
    let group = parts[..parts.len() - 3].join(".");

    let stem = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
    let classifier = stem
        .strip_prefix(&format!("{artifact}-{version}"))
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|c| !c.is_empty());

    let key = match classifier {
        Some(c) => format!("{group}:{artifact}:{c}"),
        None => format!("{group}:{artifact}"),
    };
    Some((key, version.to_string()))
}

/// Insertion-ordered classpath where a repeated library keeps its first
/// slot but takes the newest version seen.
#[derive(Debug, Default)]
pub struct ClasspathBuilder {
    entries: Vec<PathBuf>,
    versions: Vec<Option<String>>,
    slots: HashMap<String, usize>,
}

impl ClasspathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a library living under `libraries_dir`.
    pub fn push_library(&mut self, libraries_dir: &Path, path: PathBuf) {
        let Some((key, version)) = identity_from_path(libraries_dir, &path) else {
            self.push(path);
            return;
        };

        match self.slots.get(&key) {
            Some(&slot) => {
                let existing = self.versions[slot].as_deref().unwrap_or_default();
                if compare_versions(&version, existing) == Ordering::Greater {
                    debug!("Classpath: {} {} replaces {}", key, version, existing);
                    self.entries[slot] = path;
                    self.versions[slot] = Some(version);
                } else {
                    debug!("Classpath: dropping {} {} (keeping {})", key, version, existing);
                }
            }
            None => {
                self.slots.insert(key, self.entries.len());
                self.entries.push(path);
                self.versions.push(Some(version));
            }
        }
    }

    /// Add a path with no library identity (the client jar). Exact
    /// duplicates are ignored.
    pub fn push(&mut self, path: PathBuf) {
        if self.entries.contains(&path) {
            return;
        }
        self.entries.push(path);
        self.versions.push(None);
    }

    pub fn build(self) -> Vec<PathBuf> {
        self.entries
    }
}

/// Loader libraries first, then vanilla libraries, then the client jar.
pub fn assemble_classpath(
    loader_libraries_dir: Option<&Path>,
    loader_libraries: &[PathBuf],
    vanilla_libraries_dir: &Path,
    vanilla_libraries: &[PathBuf],
    client_jar: &Path,
) -> Vec<PathBuf> {
    let mut builder = ClasspathBuilder::new();
    if let Some(dir) = loader_libraries_dir {
        for path in loader_libraries {
            builder.push_library(dir, path.clone());
        }
    }
    for path in vanilla_libraries {
        builder.push_library(vanilla_libraries_dir, path.clone());
    }
    builder.push(client_jar.to_path_buf());

    let classpath = builder.build();
    debug!("Classpath assembled with {} entries", classpath.len());
    classpath
}

pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib(base: &Path, group: &str, artifact: &str, version: &str, classifier: Option<&str>) -> PathBuf {
        let file = match classifier {
            Some(c) => format!("{artifact}-{version}-{c}.jar"),
            None => format!("{artifact}-{version}.jar"),
        };
        base.join(group.replace('.', "/"))
            .join(artifact)
            .join(version)
            .join(file)
    }

    #[test]
    fn numeric_comparison_beats_lexicographic() {
        assert_eq!(compare_versions("9.7.1", "9.10"), Ordering::Less);
        assert_eq!(compare_versions("2.1.10_7", "2.1.9"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn identity_keeps_classifier_separate() {
        let base = Path::new("/libs");
        let (key, version) =
            identity_from_path(base, &lib(base, "org.lwjgl", "lwjgl", "3.3.1", Some("natives-linux")))
                .unwrap();
        assert_eq!(key, "org.lwjgl:lwjgl:natives-linux");
        assert_eq!(version, "3.3.1");

        let (key, _) = identity_from_path(base, &lib(base, "org.lwjgl", "lwjgl", "3.3.1", None)).unwrap();
        assert_eq!(key, "org.lwjgl:lwjgl");
        assert!(identity_from_path(base, Path::new("/elsewhere/a.jar")).is_none());
    }

    #[test]
    fn loader_first_and_newest_duplicate_wins() {
        let loader_dir = Path::new("/root/loader/forge/libraries");
        let vanilla_dir = Path::new("/root/libraries");
        let client = Path::new("/root/versions/1.20.1/1.20.1.jar");

        let loader = vec![
            lib(loader_dir, "org.ow2.asm", "asm", "9.5", None),
            lib(loader_dir, "net.minecraftforge", "fmlloader", "1.20.1-47.2.0", None),
        ];
        let vanilla = vec![
            lib(vanilla_dir, "org.ow2.asm", "asm", "9.7.1", None),
            lib(vanilla_dir, "com.mojang", "brigadier", "1.1.8", None),
            lib(vanilla_dir, "org.ow2.asm", "asm", "9.1", None),
        ];

        let cp = assemble_classpath(Some(loader_dir), &loader, vanilla_dir, &vanilla, client);
        assert_eq!(
            cp,
            vec![
                lib(vanilla_dir, "org.ow2.asm", "asm", "9.7.1", None),
                lib(loader_dir, "net.minecraftforge", "fmlloader", "1.20.1-47.2.0", None),
                lib(vanilla_dir, "com.mojang", "brigadier", "1.1.8", None),
                client.to_path_buf(),
            ]
        );
    }

    #[test]
    fn joins_with_platform_separator() {
        let joined = join_classpath(&[PathBuf::from("a.jar"), PathBuf::from("b.jar")]);
        assert_eq!(joined, format!("a.jar{}b.jar", classpath_separator()));
    }
}
