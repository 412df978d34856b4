//! Storage backends for the two halves of an achievement
//!
//! The ledger and the content store are separate databases and never share a
//! transaction.
pub mod content;
pub mod ledger;

pub use content::{ContentStore, SledContentStore};
pub use ledger::{ReferenceFilter, ReferenceLedger, ReferenceScope, SledReferenceLedger, StudentTally};

use crate::error::StoreError;
use crate::identity::SledIdentityDirectory;
use std::path::Path;

/// The sled-backed stores, opened from two independent database paths.
pub struct SledStores {
    pub directory: SledIdentityDirectory,
    pub ledger: SledReferenceLedger,
    pub contents: SledContentStore,
    ledger_db: sled::Db,
    content_db: sled::Db,
}

impl SledStores {
    pub fn open(ledger_path: &Path, content_path: &Path) -> Result<Self, StoreError> {
        let ledger_db = sled::open(ledger_path)?;
        let content_db = sled::open(content_path)?;

        Ok(Self {
            directory: SledIdentityDirectory::open(&ledger_db)?,
            ledger: SledReferenceLedger::open(&ledger_db)?,
            contents: SledContentStore::open(&content_db)?,
            ledger_db,
            content_db,
        })
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.ledger_db.flush()?;
        self.content_db.flush()?;
        Ok(())
    }
}
