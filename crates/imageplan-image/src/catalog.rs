use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use imageplan_core::{Manifest, PackageId};

/// A directory of published manifests laid out as `<name>/<version>.toml`.
#[derive(Debug, Clone)]
pub struct Catalog {
    root: PathBuf,
}

impl Catalog {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_path(&self, id: &PackageId) -> PathBuf {
        self.root
            .join(id.name())
            .join(format!("{}.toml", id.version()))
    }

    pub fn package_names(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("failed to read catalog: {}", self.root.display()))?
        {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    /// Every published manifest of `package`, newest first.
    pub fn package_versions(&self, package: &str) -> Result<Vec<Manifest>> {
        let package_dir = self.root.join(package);
        if !package_dir.exists() {
            return Ok(Vec::new());
        }

        let mut manifests = Vec::new();
        for entry in fs::read_dir(&package_dir)
            .with_context(|| format!("failed to read package directory: {package}"))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some("toml") {
                continue;
            }

            let manifest = read_manifest(&path)?;
            if manifest.name != package {
                anyhow::bail!(
                    "catalog manifest {} declares package '{}'",
                    path.display(),
                    manifest.name
                );
            }
            manifests.push(manifest);
        }

        manifests.sort_by(|a, b| b.version.cmp(&a.version));
        Ok(manifests)
    }

    pub fn publish(&self, manifest: &Manifest) -> Result<PathBuf> {
        let path = self.manifest_path(&manifest.id());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        fs::write(&path, manifest.to_toml_string()?)
            .with_context(|| format!("failed to write catalog manifest: {}", path.display()))?;
        Ok(path)
    }
}

pub(crate) fn read_manifest(path: &Path) -> Result<Manifest> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading manifest: {}", path.display()))?;
    Manifest::from_toml_str(&raw)
        .with_context(|| format!("failed parsing manifest: {}", path.display()))
}
