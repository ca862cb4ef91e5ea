//! The write-ahead log.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use cinder_common::constants::PAGE_BODY_SIZE;
use cinder_common::types::{PageId, TxnId};

use crate::error::{WalError, WalResult};
use crate::reader::WalReader;
use crate::record::Transaction;

/// One committed post-image held in the redo cache: where it lands in the
/// page body and the bytes that land there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageUpdate {
    /// Start offset within the page body.
    pub offset: u32,
    /// The post-image bytes.
    pub data: Bytes,
}

/// Append-only transaction log with recovery-on-open.
///
/// Steady state appends; recovery may truncate trailing garbage; a
/// checkpoint rotates the file. The in-memory cache maps each page id to
/// the post-images committed against it, in log order — the overlay applied
/// to disk reads until the next checkpoint makes the data file current.
pub struct WriteAheadLog {
    file: File,
    path: PathBuf,
    /// Per-page committed post-images, in log order.
    cache: HashMap<PageId, Vec<PageUpdate>>,
    next_transaction_id: TxnId,
    file_size: u64,
}

impl WriteAheadLog {
    /// Opens (or creates) the log at `path` and replays it.
    ///
    /// After this returns, the file holds a whole number of records:
    /// records whose checksum validated are installed in the cache; records
    /// that decoded but failed their checksum stay on disk uninstalled;
    /// trailing bytes that did not decode are truncated away.
    pub fn open(path: impl AsRef<Path>) -> WalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = open_log_file(&path)?;
        let mut wal = Self {
            file,
            path,
            cache: HashMap::new(),
            next_transaction_id: TxnId::FIRST,
            file_size: 0,
        };
        wal.recover()?;
        Ok(wal)
    }

    /// Replays the log from byte 0, rebuilding the cache and aligning the
    /// file to the last decodable record.
    fn recover(&mut self) -> WalResult<()> {
        self.cache.clear();

        let mut recovered = Vec::new();
        let mut skipped = 0usize;
        let mut next_id = TxnId::FIRST;
        let end;
        {
            let mut reader = WalReader::new(&mut self.file)?;
            loop {
                let offset = reader.bytes_read();
                match reader.read_transaction() {
                    Ok(txn) => {
                        // Structurally decoded records advance the id and
                        // keep their bytes, valid checksum or not.
                        next_id = txn.header.transaction_id.next();
                        if txn.verify_checksum() {
                            recovered.push(txn);
                        } else {
                            skipped += 1;
                            tracing::warn!(
                                transaction_id = txn.header.transaction_id.as_u64(),
                                "skipping transaction with checksum mismatch"
                            );
                        }
                    }
                    Err(e)
                        if matches!(
                            e.kind(),
                            io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
                        ) =>
                    {
                        end = offset;
                        break;
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }

        let total = self.file.metadata()?.len();
        if total > end {
            tracing::info!(
                truncated = total - end,
                "discarding torn bytes at the log tail"
            );
        }
        self.file.set_len(end)?;
        self.file_size = end;
        self.next_transaction_id = next_id;

        let installed = recovered.len();
        for txn in recovered {
            self.install(&txn);
        }

        tracing::debug!(
            path = ?self.path,
            installed,
            skipped,
            size = self.file_size,
            "log recovered"
        );
        Ok(())
    }

    /// Assigns the next transaction id to `txn`, appends it durably, and
    /// installs its post-images in the cache.
    ///
    /// When this returns the record has been fsynced: the returned id
    /// implies its bytes are on disk.
    pub fn append_transaction(&mut self, txn: &mut Transaction) -> WalResult<TxnId> {
        for entry in &txn.entries {
            if entry.old_data.len() != entry.new_data.len() {
                return Err(WalError::ImageLengthMismatch {
                    page_id: entry.page_id,
                    old_len: entry.old_data.len(),
                    new_len: entry.new_data.len(),
                });
            }
            let end = entry.offset as u64 + entry.length as u64;
            if end > PAGE_BODY_SIZE as u64 {
                return Err(WalError::EntryOutOfBounds {
                    page_id: entry.page_id,
                    offset: entry.offset,
                    length: entry.length,
                });
            }
        }

        let id = self.next_transaction_id;
        txn.header.transaction_id = id;
        txn.header.page_count = txn.entries.len() as u32;
        txn.footer.transaction_id = id;
        let bytes = txn.encode();

        self.file.seek(SeekFrom::Start(self.file_size))?;
        self.file.write_all(&bytes)?;
        self.file.sync_data()?;

        self.install(txn);
        self.file_size += bytes.len() as u64;
        self.next_transaction_id = id.next();
        Ok(id)
    }

    /// Removes the log file and starts a fresh, empty one.
    ///
    /// Called when a checkpoint has made the data file fully consistent;
    /// no record from the old generation is needed again, so transaction
    /// numbering restarts at 0.
    pub fn clear_from_disc(&mut self) -> WalResult<()> {
        std::fs::remove_file(&self.path)?;
        self.file = open_log_file(&self.path)?;
        self.cache.clear();
        self.next_transaction_id = TxnId::FIRST;
        self.file_size = 0;
        tracing::debug!(path = ?self.path, "log rotated");
        Ok(())
    }

    /// Flushes and closes the log.
    pub fn close(mut self) -> WalResult<()> {
        self.file.sync_all()?;
        Ok(())
    }

    /// Current log file size in bytes.
    #[inline]
    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    /// The id the next appended transaction will receive.
    #[inline]
    pub fn next_transaction_id(&self) -> TxnId {
        self.next_transaction_id
    }

    /// Committed post-images for `page_id`, in log order.
    pub fn updates_for(&self, page_id: PageId) -> Option<&[PageUpdate]> {
        self.cache.get(&page_id).map(Vec::as_slice)
    }

    /// Number of distinct pages with pending post-images.
    pub fn cached_page_count(&self) -> usize {
        self.cache.len()
    }

    /// Page ids with pending post-images, ascending.
    pub fn cached_pages(&self) -> Vec<PageId> {
        let mut pages: Vec<PageId> = self.cache.keys().copied().collect();
        pages.sort_unstable();
        pages
    }

    fn install(&mut self, txn: &Transaction) {
        for entry in &txn.entries {
            self.cache.entry(entry.page_id).or_default().push(PageUpdate {
                offset: entry.offset,
                data: entry.new_data.clone(),
            });
        }
    }
}

impl std::fmt::Debug for WriteAheadLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteAheadLog")
            .field("path", &self.path)
            .field("file_size", &self.file_size)
            .field("next_transaction_id", &self.next_transaction_id)
            .field("cached_pages", &self.cache.len())
            .finish()
    }
}

fn open_log_file(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .open(path)
}
