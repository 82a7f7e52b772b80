use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use imageplan_core::{Manifest, PackageId};
use imageplan_resolver::{Outcome, PackagePlan, PackagePlanner};
use tracing::{debug, info};

use crate::transactions::{current_unix_timestamp, TransactionJournal};
use crate::{
    read_install_receipt, remove_install_receipt, write_install_receipt, Image, ImageLayout,
    InstallReason, InstallReceipt,
};

/// Plans package transitions as receipt updates inside one image, journaled
/// under a single transaction.
#[derive(Debug, Clone)]
pub struct FsPlanner {
    layout: ImageLayout,
    journal: TransactionJournal,
    roots: BTreeSet<String>,
}

impl FsPlanner {
    pub fn begin(image: &Image) -> Result<Self> {
        let journal = TransactionJournal::begin(image.layout())?;
        info!("began transaction {}", journal.txid());
        Ok(Self {
            layout: image.layout().clone(),
            journal,
            roots: BTreeSet::new(),
        })
    }

    /// Packages installed on request rather than as someone's dependency.
    pub fn with_root_packages<I, T>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.roots.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn journal(&self) -> &TransactionJournal {
        &self.journal
    }
}

impl PackagePlanner for FsPlanner {
    type Plan = FsPackagePlan;

    fn propose_destination(
        &self,
        id: &PackageId,
        manifest: &Manifest,
    ) -> Result<Outcome<FsPackagePlan>> {
        let origin = read_install_receipt(&self.layout, id.name())?;
        let origin_id = origin
            .as_ref()
            .map(InstallReceipt::package_id)
            .transpose()?;

        if origin_id
            .as_ref()
            .is_some_and(|installed| installed.satisfies(id))
        {
            return Ok(Outcome::AlreadySatisfied);
        }

        // An upgrade keeps the reason the package was first installed for.
        let reason = match &origin {
            Some(receipt) => receipt.install_reason,
            None if self.roots.contains(id.name()) => InstallReason::Root,
            None => InstallReason::Dependency,
        };

        Ok(Outcome::Planned(FsPackagePlan {
            layout: self.layout.clone(),
            journal: self.journal.clone(),
            origin,
            origin_id,
            destination: id.clone(),
            dependencies: manifest
                .wanted_dependencies()
                .map(|dependency| dependency.target.name().to_string())
                .collect(),
            reason,
            diff: DependencyDiff::default(),
            snapshot: None,
            executed: false,
        }))
    }
}

/// Dependency names gained and lost by moving from origin to destination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug)]
pub struct FsPackagePlan {
    layout: ImageLayout,
    journal: TransactionJournal,
    origin: Option<InstallReceipt>,
    origin_id: Option<PackageId>,
    destination: PackageId,
    dependencies: Vec<String>,
    reason: InstallReason,
    diff: DependencyDiff,
    snapshot: Option<PathBuf>,
    executed: bool,
}

impl FsPackagePlan {
    pub fn origin(&self) -> Option<&PackageId> {
        self.origin_id.as_ref()
    }

    pub fn destination(&self) -> &PackageId {
        &self.destination
    }

    pub fn diff(&self) -> &DependencyDiff {
        &self.diff
    }

    fn name(&self) -> &str {
        self.destination.name()
    }

    fn record(&self, step: &str, state: &str) -> Result<()> {
        self.journal.append(self.name(), step, state)?;
        Ok(())
    }
}

impl PackagePlan for FsPackagePlan {
    fn evaluate(&mut self) -> Result<()> {
        let previous: BTreeSet<&str> = self
            .origin
            .iter()
            .flat_map(|receipt| receipt.dependencies.iter().map(String::as_str))
            .collect();
        let next: BTreeSet<&str> = self.dependencies.iter().map(String::as_str).collect();

        self.diff = DependencyDiff {
            added: next.difference(&previous).map(|s| s.to_string()).collect(),
            removed: previous.difference(&next).map(|s| s.to_string()).collect(),
        };
        debug!(
            "{}: dependencies added {:?}, removed {:?}",
            self, self.diff.added, self.diff.removed
        );
        self.record("evaluate", "done")
    }

    fn preexecute(&mut self) -> Result<()> {
        if self.origin.is_some() {
            let source = self.layout.receipt_path(self.name());
            let snapshot = self
                .journal
                .staging_dir()
                .join(format!("{}.receipt", self.name()));
            fs::copy(&source, &snapshot).with_context(|| {
                format!(
                    "failed to snapshot install receipt {} to {}",
                    source.display(),
                    snapshot.display()
                )
            })?;
            debug!("snapshotted {} to {}", source.display(), snapshot.display());
            self.snapshot = Some(snapshot);
        }
        self.record("preexecute", "done")
    }

    fn execute(&mut self) -> Result<()> {
        self.record("execute", "started")?;
        let receipt = InstallReceipt {
            name: self.name().to_string(),
            version: self.destination.version().to_string(),
            dependencies: self.dependencies.clone(),
            install_reason: self.reason,
            installed_at_unix: current_unix_timestamp()?,
        };
        let path = write_install_receipt(&self.layout, &receipt)?;
        self.executed = true;
        debug!("wrote install receipt {}", path.display());
        self.record("execute", "done")
    }

    fn postexecute(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            fs::remove_file(&snapshot).with_context(|| {
                format!("failed to remove receipt snapshot: {}", snapshot.display())
            })?;
        }
        self.record("postexecute", "done")
    }

    fn rollback(&mut self) -> Result<()> {
        if let Some(snapshot) = self.snapshot.take() {
            let dest = self.layout.receipt_path(self.name());
            fs::copy(&snapshot, &dest).with_context(|| {
                format!(
                    "failed to restore install receipt {} from {}",
                    dest.display(),
                    snapshot.display()
                )
            })?;
            fs::remove_file(&snapshot).with_context(|| {
                format!("failed to remove receipt snapshot: {}", snapshot.display())
            })?;
        } else if self.executed {
            remove_install_receipt(&self.layout, self.name())?;
        }
        self.executed = false;
        self.record("rollback", "done")
    }
}

impl fmt::Display for FsPackagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.origin_id {
            Some(origin) => write!(f, "{origin} -> {}", self.destination),
            None => write!(f, "none -> {}", self.destination),
        }
    }
}
