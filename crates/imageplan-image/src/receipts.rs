use anyhow::{anyhow, Context, Result};
use imageplan_core::PackageId;
use std::fs;
use std::path::PathBuf;

use crate::ImageLayout;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReceipt {
    pub name: String,
    pub version: String,
    pub dependencies: Vec<String>,
    pub install_reason: InstallReason,
    pub installed_at_unix: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallReason {
    Root,
    Dependency,
}

impl InstallReason {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Dependency => "dependency",
        }
    }

    pub(crate) fn parse(value: &str) -> Result<Self> {
        match value {
            "root" => Ok(Self::Root),
            "dependency" => Ok(Self::Dependency),
            _ => Err(anyhow!("invalid install_reason: {value}")),
        }
    }
}

impl InstallReceipt {
    pub fn package_id(&self) -> Result<PackageId> {
        PackageId::parse(&format!("{}@{}", self.name, self.version))
            .with_context(|| format!("install receipt for '{}' is invalid", self.name))
    }
}

pub fn write_install_receipt(layout: &ImageLayout, receipt: &InstallReceipt) -> Result<PathBuf> {
    let mut payload = String::new();
    payload.push_str(&format!("name={}\n", receipt.name));
    payload.push_str(&format!("version={}\n", receipt.version));
    for dependency in &receipt.dependencies {
        payload.push_str(&format!("dependency={}\n", dependency));
    }
    payload.push_str(&format!(
        "install_reason={}\n",
        receipt.install_reason.as_str()
    ));
    payload.push_str(&format!(
        "installed_at_unix={}\n",
        receipt.installed_at_unix
    ));

    let path = layout.receipt_path(&receipt.name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(&path, payload.as_bytes())
        .with_context(|| format!("failed to write install receipt: {}", path.display()))?;
    Ok(path)
}

/// Reads the receipt for `name`. Anything at the receipt path that is not a
/// regular file counts as not installed.
pub fn read_install_receipt(layout: &ImageLayout, name: &str) -> Result<Option<InstallReceipt>> {
    let path = layout.receipt_path(name);
    if !path.is_file() {
        return Ok(None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
    let receipt = parse_receipt(&raw)
        .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
    Ok(Some(receipt))
}

pub fn read_install_receipts(layout: &ImageLayout) -> Result<Vec<InstallReceipt>> {
    let dir = layout.installed_state_dir();
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut receipts = Vec::new();
    for entry in fs::read_dir(&dir)
        .with_context(|| format!("failed to read install state directory: {}", dir.display()))?
    {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|v| v.to_str()) != Some("receipt") {
            continue;
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read install receipt: {}", path.display()))?;
        let receipt = parse_receipt(&raw)
            .with_context(|| format!("failed to parse install receipt: {}", path.display()))?;
        receipts.push(receipt);
    }

    receipts.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(receipts)
}

pub fn remove_install_receipt(layout: &ImageLayout, name: &str) -> Result<bool> {
    let path = layout.receipt_path(name);
    if !path.is_file() {
        return Ok(false);
    }

    fs::remove_file(&path)
        .with_context(|| format!("failed to remove install receipt: {}", path.display()))?;
    Ok(true)
}

pub(crate) fn parse_receipt(raw: &str) -> Result<InstallReceipt> {
    let mut name = None;
    let mut version = None;
    let mut dependencies = Vec::new();
    let mut install_reason = None;
    let mut installed_at_unix = None;

    for line in raw.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let Some((k, v)) = line.split_once('=') else {
            continue;
        };
        match k {
            "name" => name = Some(v.to_string()),
            "version" => version = Some(v.to_string()),
            "dependency" => dependencies.push(v.to_string()),
            "install_reason" => install_reason = Some(InstallReason::parse(v)?),
            "installed_at_unix" => {
                installed_at_unix = Some(v.parse().context("installed_at_unix must be u64")?)
            }
            _ => {}
        }
    }

    Ok(InstallReceipt {
        name: name.context("missing name")?,
        version: version.context("missing version")?,
        dependencies,
        install_reason: install_reason.unwrap_or(InstallReason::Root),
        installed_at_unix: installed_at_unix.context("missing installed_at_unix")?,
    })
}
