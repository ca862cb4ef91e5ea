//! The database manager.

use bytes::Bytes;

use cinder_cache::{CacheStats, LruCache};
use cinder_common::config::DatabaseConfig;
use cinder_common::constants::PAGE_BODY_SIZE;
use cinder_common::types::{PageId, TxnId};
use cinder_storage::{PageType, Pager};
use cinder_wal::{PageEntry, Transaction, WriteAheadLog};

use crate::error::{DbError, DbResult};

/// A requested change to one page: the target byte range and its new
/// contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageDelta {
    /// The page to modify.
    pub page_id: PageId,
    /// Start offset within the page body.
    pub offset: u32,
    /// The bytes to write at `offset`.
    pub data: Bytes,
}

impl PageDelta {
    /// Creates a delta writing `data` at `offset` on `page_id`.
    pub fn new(page_id: PageId, offset: u32, data: Bytes) -> Self {
        Self {
            page_id,
            offset,
            data,
        }
    }
}

/// Orchestrates the pager, the write-ahead log, and the page cache.
///
/// Callers must serialize access; the manager provides no internal
/// locking. See the crate docs for the read and write data flow.
pub struct DatabaseManager {
    config: DatabaseConfig,
    wal: WriteAheadLog,
    pager: Pager,
    cache: LruCache<PageId, Vec<u8>>,
}

impl DatabaseManager {
    /// Opens the database described by `config`, creating the data file
    /// and log as needed and replaying the log.
    pub fn open(config: DatabaseConfig) -> DbResult<Self> {
        config
            .validate()
            .map_err(|message| DbError::InvalidConfig { message })?;

        let wal = WriteAheadLog::open(&config.wal_path)?;
        let pager = Pager::open(&config.data_path)?;
        let cache = LruCache::new(config.cache_capacity_pages);

        tracing::debug!(
            data = ?config.data_path,
            log = ?config.wal_path,
            pending_pages = wal.cached_page_count(),
            "database opened"
        );
        Ok(Self {
            config,
            wal,
            pager,
            cache,
        })
    }

    /// Allocates a page of the given type and returns its id.
    ///
    /// Allocation goes straight to the data file; it is not logged.
    pub fn allocate_page(&mut self, page_type: PageType) -> DbResult<PageId> {
        Ok(self.pager.allocate_page(page_type)?)
    }

    /// Returns a page to the free list and drops it from the cache.
    pub fn free_page(&mut self, page_id: PageId) -> DbResult<()> {
        self.pager.free_page(page_id)?;
        self.cache.remove(&page_id);
        Ok(())
    }

    /// Returns the current body of a page.
    ///
    /// Served from the cache when possible; otherwise read from disk with
    /// every pending log post-image overlaid, then cached.
    pub fn get_page(&mut self, page_id: PageId) -> DbResult<Vec<u8>> {
        if let Some(body) = self.cache.get(&page_id) {
            return Ok(body.clone());
        }
        let body = self.load_page_from_disc(page_id)?;
        self.cache.insert(page_id, body.clone());
        Ok(body)
    }

    /// Applies a batch of deltas as one atomic transaction and returns its
    /// id.
    ///
    /// Every delta is bounds-checked and its pre-image captured before any
    /// of them is applied; an out-of-bounds delta fails the whole call
    /// without mutating or logging anything. On success the transaction is
    /// durable in the log and visible in the cache; the data file is
    /// untouched until the next checkpoint.
    pub fn write_pages(&mut self, deltas: &[PageDelta]) -> DbResult<TxnId> {
        self.maybe_checkpoint()?;

        let mut entries = Vec::with_capacity(deltas.len());
        for delta in deltas {
            self.ensure_cached(delta.page_id)?;
            let body = self.cache.peek(&delta.page_id).ok_or(DbError::PageNotFound {
                page_id: delta.page_id,
            })?;

            let start = delta.offset as usize;
            let end = start + delta.data.len();
            if end > PAGE_BODY_SIZE {
                return Err(DbError::DeltaOutOfBounds {
                    page_id: delta.page_id,
                    offset: delta.offset,
                    length: delta.data.len(),
                });
            }

            let old_data = Bytes::copy_from_slice(&body[start..end]);
            entries.push(PageEntry::new(
                delta.page_id,
                delta.offset,
                old_data,
                delta.data.clone(),
            ));
        }

        // The transaction owns its pre-images now; evicting a faulted page
        // while applying the rest is safe.
        for delta in deltas {
            self.apply_delta(delta)?;
        }

        let mut txn = Transaction::new(entries);
        let id = self.wal.append_transaction(&mut txn)?;

        self.maybe_checkpoint()?;
        Ok(id)
    }

    /// Writes every log-pending page to the data file and rotates the log.
    ///
    /// After this returns the data file alone reflects all committed
    /// transactions and the log is empty.
    pub fn flush_checkpoint(&mut self) -> DbResult<()> {
        let pages = self.wal.cached_pages();
        if !pages.is_empty() {
            tracing::info!(
                pages = pages.len(),
                log_size = self.wal.file_size(),
                "checkpoint: flushing pending pages"
            );
        }

        for page_id in pages {
            let cached = self.cache.peek(&page_id).cloned();
            let body = match cached {
                Some(body) => body,
                None => self.load_page_from_disc(page_id)?,
            };
            self.pager.write_page_data(page_id, &body)?;
        }

        // The data file must be durable before the log is rotated away.
        self.pager.sync()?;
        self.wal.clear_from_disc()?;
        Ok(())
    }

    /// Runs a full checksum pass over the data file.
    pub fn verify(&mut self) -> DbResult<bool> {
        Ok(self.pager.verify()?)
    }

    /// Closes the log and the data file. Does not checkpoint.
    pub fn shutdown(self) -> DbResult<()> {
        self.wal.close()?;
        self.pager.close()?;
        Ok(())
    }

    /// Returns true if `page_id` is currently cached, without touching
    /// recency.
    pub fn is_cached(&self, page_id: PageId) -> bool {
        self.cache.contains(&page_id)
    }

    /// Number of pages currently cached.
    pub fn cached_page_count(&self) -> usize {
        self.cache.len()
    }

    /// Cache hit/miss/eviction counters.
    pub fn cache_stats(&self) -> &CacheStats {
        self.cache.stats()
    }

    /// Current size of the log file in bytes.
    pub fn wal_size(&self) -> u64 {
        self.wal.file_size()
    }

    /// Faults `page_id` into the cache, or promotes it if already present.
    fn ensure_cached(&mut self, page_id: PageId) -> DbResult<()> {
        if self.cache.get(&page_id).is_some() {
            return Ok(());
        }
        let body = self.load_page_from_disc(page_id)?;
        self.cache.insert(page_id, body);
        Ok(())
    }

    /// Reads a page body from the data file and overlays every pending
    /// post-image from the log, in log order. The result is the current
    /// logical state of the page even when the data file is stale.
    fn load_page_from_disc(&mut self, page_id: PageId) -> DbResult<Vec<u8>> {
        let mut body = match self.pager.read_page_data(page_id) {
            Ok(body) => body,
            Err(e) => {
                if e.is_corruption() {
                    tracing::error!(page = %page_id, "corrupt page in the data file");
                }
                return Err(e.into());
            }
        };
        if let Some(updates) = self.wal.updates_for(page_id) {
            for update in updates {
                let start = update.offset as usize;
                body[start..start + update.data.len()].copy_from_slice(&update.data);
            }
        }
        Ok(body)
    }

    /// Mutates a cached page body in place.
    fn apply_delta(&mut self, delta: &PageDelta) -> DbResult<()> {
        let body = self.cache.get_mut(&delta.page_id).ok_or(DbError::PageNotFound {
            page_id: delta.page_id,
        })?;

        let start = delta.offset as usize;
        let end = start + delta.data.len();
        if end > body.len() {
            return Err(DbError::DeltaOutOfBounds {
                page_id: delta.page_id,
                offset: delta.offset,
                length: delta.data.len(),
            });
        }
        body[start..end].copy_from_slice(&delta.data);
        Ok(())
    }

    /// Checkpoints when the log has reached the configured threshold.
    fn maybe_checkpoint(&mut self) -> DbResult<()> {
        if self.wal.file_size() >= self.config.checkpoint_threshold_bytes {
            self.flush_checkpoint()?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("data", &self.config.data_path)
            .field("log", &self.config.wal_path)
            .field("cached_pages", &self.cache.len())
            .field("wal_size", &self.wal.file_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    fn test_config(dir: &std::path::Path) -> DatabaseConfig {
        DatabaseConfig::in_dir(dir)
    }

    #[test]
    fn test_read_your_writes() {
        let dir = tempdir().unwrap();
        let mut db = DatabaseManager::open(test_config(dir.path())).unwrap();

        let page = db.allocate_page(PageType::User).unwrap();
        db.write_pages(&[PageDelta::new(page, 8, Bytes::from_static(b"cinder"))])
            .unwrap();

        let body = db.get_page(page).unwrap();
        assert_eq!(&body[8..14], b"cinder");
        assert!(body[..8].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_out_of_bounds_rejected_without_mutation() {
        let dir = tempdir().unwrap();
        let mut db = DatabaseManager::open(test_config(dir.path())).unwrap();

        let a = db.allocate_page(PageType::User).unwrap();
        let b = db.allocate_page(PageType::User).unwrap();

        let deltas = [
            PageDelta::new(a, 0, Bytes::from_static(b"ok")),
            PageDelta::new(b, (PAGE_BODY_SIZE - 1) as u32, Bytes::from_static(b"xx")),
        ];
        let err = db.write_pages(&deltas).unwrap_err();
        assert!(matches!(err, DbError::DeltaOutOfBounds { page_id, .. } if page_id == b));

        // Nothing was logged or applied, including the in-bounds delta.
        assert_eq!(db.wal_size(), 0);
        assert!(db.get_page(a).unwrap().iter().all(|&byte| byte == 0));
    }

    #[test]
    fn test_transaction_ids_increment() {
        let dir = tempdir().unwrap();
        let mut db = DatabaseManager::open(test_config(dir.path())).unwrap();

        let page = db.allocate_page(PageType::User).unwrap();
        let one = Bytes::from_static(&[1]);
        assert_eq!(
            db.write_pages(&[PageDelta::new(page, 0, one.clone())]).unwrap(),
            TxnId::new(0)
        );
        assert_eq!(
            db.write_pages(&[PageDelta::new(page, 1, one)]).unwrap(),
            TxnId::new(1)
        );
    }

    #[test]
    fn test_evicted_page_rereads_through_overlay() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path()).with_cache_capacity(1);
        let mut db = DatabaseManager::open(config).unwrap();

        let a = db.allocate_page(PageType::User).unwrap();
        let b = db.allocate_page(PageType::User).unwrap();

        db.write_pages(&[PageDelta::new(a, 0, Bytes::from_static(b"aaaa"))])
            .unwrap();
        // Touching b evicts a; a's bytes exist only in the log now.
        db.write_pages(&[PageDelta::new(b, 0, Bytes::from_static(b"bbbb"))])
            .unwrap();
        assert!(!db.is_cached(a));

        assert_eq!(&db.get_page(a).unwrap()[..4], b"aaaa");
    }

    #[test]
    fn test_free_page_invalidates_cache() {
        let dir = tempdir().unwrap();
        let mut db = DatabaseManager::open(test_config(dir.path())).unwrap();

        let page = db.allocate_page(PageType::User).unwrap();
        db.get_page(page).unwrap();
        assert!(db.is_cached(page));

        db.free_page(page).unwrap();
        assert!(!db.is_cached(page));
    }
}
