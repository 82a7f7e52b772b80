use std::fs;

use anyhow::{anyhow, Context, Result};
use imageplan_core::PackageId;
use imageplan_resolver::ManifestFetcher;
use tracing::debug;

use crate::catalog::read_manifest;
use crate::{Catalog, Image};

/// Copies manifests from a catalog into the image's manifest cache.
#[derive(Debug, Clone)]
pub struct CatalogFetcher {
    catalog: Catalog,
}

impl CatalogFetcher {
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

impl ManifestFetcher<Image> for CatalogFetcher {
    fn fetch(&self, image: &Image, id: &PackageId) -> Result<()> {
        let source = self.catalog.manifest_path(id);
        if !source.is_file() {
            return Err(anyhow!("{} is not published in the catalog", id));
        }

        let manifest = read_manifest(&source)?;
        if manifest.name != id.name() || &manifest.version != id.version() {
            return Err(anyhow!(
                "catalog manifest {} describes {}",
                source.display(),
                manifest.id()
            ));
        }

        let dest = image.layout().manifest_path(id);
        let parent = dest
            .parent()
            .ok_or_else(|| anyhow!("manifest cache path has no parent: {}", dest.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        let tmp = image
            .layout()
            .tmp_state_dir()
            .join(format!("{}-{}.toml.tmp", id.name(), id.version()));
        fs::copy(&source, &tmp).with_context(|| {
            format!(
                "failed to copy manifest {} to {}",
                source.display(),
                tmp.display()
            )
        })?;
        fs::rename(&tmp, &dest)
            .with_context(|| format!("failed to cache manifest: {}", dest.display()))?;

        debug!("cached manifest for {} at {}", id, dest.display());
        Ok(())
    }
}
