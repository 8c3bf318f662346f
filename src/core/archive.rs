// ─── Archive ───
// Jar/zip access used by the installers, the patcher and native extraction.

use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::core::error::{LauncherError, LauncherResult};

/// Read-only view over a zip/jar on disk.
pub struct JarArchive {
    path: PathBuf,
    inner: ZipArchive<File>,
}

impl JarArchive {
    pub fn open(path: &Path) -> LauncherResult<Self> {
        let file = File::open(path).map_err(|e| LauncherError::io(path, e))?;
        let inner = ZipArchive::new(file)?;
        Ok(Self {
            path: path.to_path_buf(),
            inner,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names of every entry, directories included (they end with `/`).
    pub fn entry_names(&self) -> Vec<String> {
        self.inner.file_names().map(str::to_owned).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.index_for_name(name).is_some()
    }

    /// Read one entry by exact name. A leading `/` is tolerated since install
    /// profiles reference entries that way.
    pub fn read(&mut self, name: &str) -> LauncherResult<Vec<u8>> {
        let name = name.trim_start_matches('/');
        let mut entry = match self.inner.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => {
                return Err(LauncherError::ArchiveEntryMissing {
                    archive: self.path.clone(),
                    entry: name.to_string(),
                })
            }
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::with_capacity(entry.size() as usize);
        entry.read_to_end(&mut bytes)?;
        Ok(bytes)
    }

    pub fn read_string(&mut self, name: &str) -> LauncherResult<String> {
        let bytes = self.read(name)?;
        String::from_utf8(bytes).map_err(|e| {
            LauncherError::Other(format!("{name} in {:?} is not UTF-8: {e}", self.path))
        })
    }

    /// Read every file entry whose name starts with `prefix`.
    pub fn read_prefix(&mut self, prefix: &str) -> LauncherResult<Vec<(String, Vec<u8>)>> {
        let names: Vec<String> = self
            .inner
            .file_names()
            .filter(|n| n.starts_with(prefix) && !n.ends_with('/'))
            .map(str::to_owned)
            .collect();

        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let bytes = self.read(&name)?;
            out.push((name, bytes));
        }
        Ok(out)
    }

    /// Attribute lookup in `META-INF/MANIFEST.MF`, honoring continuation lines.
    pub fn manifest_attribute(&mut self, key: &str) -> LauncherResult<Option<String>> {
        let text = self.read_string("META-INF/MANIFEST.MF")?;

        let mut value: Option<String> = None;
        let mut current_key: Option<String> = None;
        for line in text.lines() {
            let line = line.trim_end_matches('\r');
            if let Some(rest) = line.strip_prefix(' ') {
                if current_key.as_deref() == Some(key) {
                    if let Some(v) = &mut value {
                        v.push_str(rest);
                    }
                }
                continue;
            }

            if let Some((k, v)) = line.split_once(':') {
                current_key = Some(k.trim().to_string());
                if k.trim() == key {
                    value = Some(v.trim().to_string());
                }
            }
        }

        Ok(value)
    }
}

/// Compose a new archive in memory from `(name, bytes)` pairs.
pub fn build_archive<'a, I>(entries: I) -> LauncherResult<Vec<u8>>
where
    I: IntoIterator<Item = (&'a str, &'a [u8])>,
{
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, bytes) in entries {
        writer.start_file(name, options)?;
        writer.write_all(bytes)?;
    }
    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_jar(dir: &Path, entries: &[(&str, &[u8])]) -> PathBuf {
        let path = dir.join("test.jar");
        std::fs::write(&path, build_archive(entries.iter().copied()).unwrap()).unwrap();
        path
    }

    #[test]
    fn read_by_name_and_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_jar(
            dir.path(),
            &[
                ("install_profile.json", b"{}"),
                ("maven/net/a/1.0/a-1.0.jar", b"A"),
                ("maven/net/b/1.0/b-1.0.jar", b"B"),
                ("data/client.lzma", b"LZ"),
            ],
        );

        let mut archive = JarArchive::open(&jar).unwrap();
        assert!(archive.contains("data/client.lzma"));
        assert_eq!(archive.read("/install_profile.json").unwrap(), b"{}");

        let maven = archive.read_prefix("maven/").unwrap();
        assert_eq!(maven.len(), 2);
        assert!(maven.iter().any(|(n, b)| n.ends_with("b-1.0.jar") && b == b"B"));
    }

    #[test]
    fn missing_entry_is_archive_error() {
        let dir = tempfile::tempdir().unwrap();
        let jar = write_jar(dir.path(), &[("a.txt", b"a")]);
        let mut archive = JarArchive::open(&jar).unwrap();

        let err = archive.read("version.json").unwrap_err();
        assert!(matches!(err, LauncherError::ArchiveEntryMissing { .. }));
    }

    #[test]
    fn manifest_main_class_with_continuation() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = b"Manifest-Version: 1.0\r\nMain-Class: net.minecraftforge.install\r\n ertools.ConsoleTool\r\n\r\n";
        let jar = write_jar(dir.path(), &[("META-INF/MANIFEST.MF", manifest)]);
        let mut archive = JarArchive::open(&jar).unwrap();

        assert_eq!(
            archive.manifest_attribute("Main-Class").unwrap().as_deref(),
            Some("net.minecraftforge.installertools.ConsoleTool")
        );
    }
}
