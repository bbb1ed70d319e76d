//! In-memory mail repository using DashMap.
//!
//! Records are lost on restart. Used by the preview server's default
//! configuration and by tests.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use super::record::MailRecord;
use super::repository::{MailRepository, PendingMail, RepositoryError};

/// In-memory mail repository.
///
/// Ids are assigned from a counter starting at 1, like a serial column.
pub struct MemoryMailRepository {
    records: DashMap<i32, MailRecord>,
    next_id: AtomicI32,
    closed: AtomicBool,
}

impl Default for MemoryMailRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryMailRepository {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_id: AtomicI32::new(1),
            closed: AtomicBool::new(false),
        }
    }

    /// Get a record by id
    pub fn get(&self, mail_id: i32) -> Option<MailRecord> {
        self.records.get(&mail_id).map(|r| r.clone())
    }

    /// All records ordered by id
    pub fn list(&self) -> Vec<MailRecord> {
        let mut records: Vec<MailRecord> = self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| r.mail_id);
        records
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    /// Stop accepting records
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MailRepository for MemoryMailRepository {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn ensure_available(&self) -> Result<(), RepositoryError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable(
                "memory repository is closed".to_string(),
            ));
        }
        Ok(())
    }

    async fn save(&self, mail: PendingMail) -> Result<MailRecord, RepositoryError> {
        self.ensure_available()?;

        let mail_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = MailRecord::from_attributes(mail_id, mail.into_attributes());
        self.records.insert(mail_id, record.clone());

        tracing::trace!(mail_id = mail_id, "Mail record stored in memory");

        Ok(record)
    }
}
