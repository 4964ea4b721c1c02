use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Regular files under `dir` keyed by their `/`-separated relative path.
pub fn session_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).follow_links(false).sort_by_file_name() {
        let entry = entry.with_context(|| format!("failed walking {}", dir.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .with_context(|| format!("{} escaped {}", entry.path().display(), dir.display()))?;
        let name = rel
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<String>>()
            .join("/");
        files.push((name, entry.path().to_path_buf()));
    }
    Ok(files)
}

/// Writes every file of `session_dir` into a deflate-compressed ZIP at
/// `archive_path`. Returns the number of files packed.
pub fn package_session(session_dir: &Path, archive_path: &Path) -> Result<usize> {
    if let Some(parent) = archive_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = File::create(archive_path)
        .with_context(|| format!("failed to create {}", archive_path.display()))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let files = session_files(session_dir)?;
    for (name, path) in &files {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed reading {}", path.display()))?;
        writer
            .start_file(name.as_str(), options)
            .with_context(|| format!("failed adding {name} to archive"))?;
        writer
            .write_all(&bytes)
            .with_context(|| format!("failed writing {name} to archive"))?;
    }
    writer
        .finish()
        .with_context(|| format!("failed to finalize {}", archive_path.display()))?;
    Ok(files.len())
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveVerification {
    pub checked: usize,
    pub missing: Vec<String>,
    pub mismatched: Vec<String>,
    pub unexpected: Vec<String>,
}

impl ArchiveVerification {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty() && self.mismatched.is_empty() && self.unexpected.is_empty()
    }
}

/// Compares the archive against the directory by SHA-256 per member.
pub fn verify_archive(session_dir: &Path, archive_path: &Path) -> Result<ArchiveVerification> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("{} is not a readable ZIP", archive_path.display()))?;

    let mut packed: BTreeMap<String, String> = BTreeMap::new();
    for idx in 0..archive.len() {
        let mut member = archive
            .by_index(idx)
            .with_context(|| format!("failed reading member {idx}"))?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_string();
        let mut bytes = Vec::new();
        member
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed inflating {name}"))?;
        packed.insert(name, sha256_hex(&bytes));
    }

    let mut report = ArchiveVerification::default();
    for (name, path) in session_files(session_dir)? {
        let bytes =
            std::fs::read(&path).with_context(|| format!("failed reading {}", path.display()))?;
        report.checked += 1;
        match packed.remove(&name) {
            None => report.missing.push(name),
            Some(digest) if digest != sha256_hex(&bytes) => report.mismatched.push(name),
            Some(_) => {}
        }
    }
    report.unexpected = packed.into_keys().collect();
    Ok(report)
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
