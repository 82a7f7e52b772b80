mod catalog;
mod config;
mod fetch;
mod image;
mod layout;
mod pkgplan;
mod receipts;
mod transactions;

pub use catalog::Catalog;
pub use config::{ImageConfig, DEFAULT_BUILD_RELEASE};
pub use fetch::CatalogFetcher;
pub use image::Image;
pub use layout::ImageLayout;
pub use pkgplan::{DependencyDiff, FsPackagePlan, FsPlanner};
pub use receipts::{
    read_install_receipt, read_install_receipts, remove_install_receipt, write_install_receipt,
    InstallReason, InstallReceipt,
};
pub use transactions::{
    current_unix_timestamp, read_journal_entries, JournalEntry, TransactionJournal,
};
