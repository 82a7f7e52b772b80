use std::collections::HashMap;
use std::fmt;

use imageplan_core::PackageId;

use crate::types::ProposeOutcome;

/// The requested target identifiers, one per package name, in the order
/// each package was first proposed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GoalSet {
    entries: Vec<PackageId>,
    by_name: HashMap<String, usize>,
}

impl GoalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `id` into the set: new packages are appended, an existing entry
    /// is replaced only by a strict successor.
    pub fn propose(&mut self, id: PackageId) -> ProposeOutcome {
        match self.by_name.get(id.name()).copied() {
            Some(index) => {
                let existing = &mut self.entries[index];
                if id.is_successor(existing) {
                    let previous = std::mem::replace(existing, id);
                    ProposeOutcome::Upgraded { previous }
                } else {
                    ProposeOutcome::Unchanged {
                        existing: existing.clone(),
                    }
                }
            }
            None => {
                self.by_name.insert(id.name().to_string(), self.entries.len());
                self.entries.push(id);
                ProposeOutcome::Inserted
            }
        }
    }

    /// True when the entry for `want`'s package is already at `want`'s
    /// version or newer.
    pub fn is_satisfied_by(&self, want: &PackageId) -> bool {
        self.get(want.name())
            .map(|entry| !want.is_successor(entry))
            .unwrap_or(false)
    }

    pub fn get(&self, name: &str) -> Option<&PackageId> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PackageId> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a GoalSet {
    type Item = &'a PackageId;
    type IntoIter = std::slice::Iter<'a, PackageId>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for GoalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            writeln!(f, "{entry}")?;
        }
        Ok(())
    }
}
