//! Content packs: a zip archive of one export tree.
//!
//! A pack holds the tree exactly as exported (descriptors plus companion
//! files, relative paths preserved) and a `pack.toml` manifest. The content
//! hash covers every entry except the manifest, sorted by name, so two
//! packs of the same tree hash identically regardless of build time.

use crate::{ContentError, ContentResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Name of the manifest entry inside every pack.
pub const PACK_MANIFEST_ENTRY: &str = "pack.toml";

/// Pack metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    /// Export format generation.
    pub format_version: String,
    pub created: DateTime<Utc>,
    /// Number of content entries (manifest excluded).
    pub entries: usize,
}

/// An opened content pack.
#[derive(Debug)]
pub struct ContentPack {
    pub manifest: PackManifest,
    entries: BTreeMap<String, Vec<u8>>,
}

impl ContentPack {
    /// Zips the export tree under `dir` into pack bytes.
    pub fn build(dir: &Path) -> ContentResult<Vec<u8>> {
        let mut files = Vec::new();
        collect_files(dir, dir, &mut files)?;
        files.sort();

        let manifest = PackManifest {
            format_version: crate::node_file::V2_VERSION.to_string(),
            created: Utc::now(),
            entries: files.len(),
        };

        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        writer.start_file(PACK_MANIFEST_ENTRY, options)?;
        writer.write_all(toml::to_string_pretty(&manifest)?.as_bytes())?;

        for (entry_name, path) in &files {
            writer.start_file(entry_name.as_str(), options)?;
            writer.write_all(&fs::read(path)?)?;
        }

        let cursor = writer.finish()?;
        debug!(entries = files.len(), "built content pack");
        Ok(cursor.into_inner())
    }

    /// Opens pack bytes and parses the manifest.
    pub fn open(bytes: &[u8]) -> ContentResult<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut manifest_bytes = None;
        let mut entries = BTreeMap::new();

        for index in 0..archive.len() {
            let mut file = archive.by_index(index)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::new();
            file.read_to_end(&mut data)?;
            if name == PACK_MANIFEST_ENTRY {
                manifest_bytes = Some(data);
            } else {
                entries.insert(name, data);
            }
        }

        let manifest_bytes = manifest_bytes
            .ok_or_else(|| ContentError::Pack(format!("missing {PACK_MANIFEST_ENTRY}")))?;
        let manifest: PackManifest = toml::from_str(&String::from_utf8_lossy(&manifest_bytes))?;

        Ok(Self { manifest, entries })
    }

    /// Extracts the tree into `dir`, ready for an import run. Entry names
    /// that escape the target directory are rejected.
    pub fn unpack_to(&self, dir: &Path) -> ContentResult<()> {
        for (name, data) in &self.entries {
            let relative = sanitize_entry_name(name)?;
            let target = dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&target, data)?;
        }
        Ok(())
    }

    /// Deterministic SHA-256 over the sorted content entries.
    #[must_use]
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, data) in &self.entries {
            hasher.update(name.as_bytes());
            hasher.update((data.len() as u64).to_le_bytes());
            hasher.update(data);
        }
        hex::encode(hasher.finalize())
    }

    /// Number of content entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry names in sorted order.
    pub fn entry_names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn collect_files(
    root: &Path,
    dir: &Path,
    out: &mut Vec<(String, PathBuf)>,
) -> ContentResult<()> {
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let name = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

/// Rejects absolute entry names and parent-directory escapes.
fn sanitize_entry_name(name: &str) -> ContentResult<PathBuf> {
    let path = Path::new(name);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => {
                return Err(ContentError::Pack(format!(
                    "entry '{name}' escapes the target directory"
                )));
            }
        }
    }
    Ok(clean)
}
