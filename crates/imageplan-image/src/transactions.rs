use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::ImageLayout;

static TXID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One line of a transaction journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub seq: u64,
    pub package: String,
    pub step: String,
    pub state: String,
}

/// Append-only record of the package plan steps taken by one image plan
/// execution, plus a staging directory for snapshots.
///
/// Clones share the sequence counter, so every package plan of a
/// transaction can hold its own handle.
#[derive(Debug, Clone)]
pub struct TransactionJournal {
    layout: ImageLayout,
    txid: String,
    next_seq: Arc<AtomicU64>,
}

impl TransactionJournal {
    pub fn begin(layout: &ImageLayout) -> Result<Self> {
        let txid = format!(
            "tx-{}-{}-{}",
            current_unix_timestamp()?,
            std::process::id(),
            TXID_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let staging = layout.transaction_staging_path(&txid);
        fs::create_dir_all(&staging)
            .with_context(|| format!("failed to create {}", staging.display()))?;

        Ok(Self {
            layout: layout.clone(),
            txid,
            next_seq: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn txid(&self) -> &str {
        &self.txid
    }

    pub fn path(&self) -> PathBuf {
        self.layout.transaction_journal_path(&self.txid)
    }

    pub fn staging_dir(&self) -> PathBuf {
        self.layout.transaction_staging_path(&self.txid)
    }

    pub fn append(&self, package: &str, step: &str, state: &str) -> Result<PathBuf> {
        let entry = JournalEntry {
            seq: self.next_seq.fetch_add(1, Ordering::Relaxed),
            package: package.to_string(),
            step: step.to_string(),
            state: state.to_string(),
        };
        append_journal_entry(&self.path(), &entry)?;
        Ok(self.path())
    }
}

fn append_journal_entry(path: &Path, entry: &JournalEntry) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut line =
        serde_json::to_string(entry).context("failed to serialize transaction journal entry")?;
    line.push('\n');

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open transaction journal: {}", path.display()))?;
    file.write_all(line.as_bytes())
        .with_context(|| format!("failed to append transaction journal: {}", path.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush transaction journal: {}", path.display()))
}

pub fn read_journal_entries(layout: &ImageLayout, txid: &str) -> Result<Vec<JournalEntry>> {
    let path = layout.transaction_journal_path(txid);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read transaction journal: {}", path.display()))?;
    raw.lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| {
            serde_json::from_str(line).with_context(|| {
                format!("failed to parse transaction journal: {}", path.display())
            })
        })
        .collect()
}

pub fn current_unix_timestamp() -> Result<u64> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .context("system time is before unix epoch")?
        .as_secs())
}
