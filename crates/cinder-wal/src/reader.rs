//! Sequential record decoder.
//!
//! A [`WalReader`] is a one-shot cursor over a log file. It decodes records
//! in layout order while counting every byte it has consumed, so the log
//! can note the position of the last whole record before each decode
//! attempt — the truncation point if that attempt fails.

use std::fs::File;
use std::io::{self, BufReader, Read, Seek, SeekFrom};

use bytes::Bytes;

use cinder_common::constants::PAGE_BODY_SIZE;
use cinder_common::types::{PageId, TxnId};

use crate::record::{PageEntry, Transaction, TransactionFooter, TransactionHeader};

/// Buffered sequential reader over a log file.
pub struct WalReader<'a> {
    reader: BufReader<&'a mut File>,
    bytes_read: u64,
}

impl<'a> WalReader<'a> {
    /// Seeks `file` to the start and wraps it in a buffered reader.
    pub fn new(file: &'a mut File) -> io::Result<Self> {
        file.seek(SeekFrom::Start(0))?;
        Ok(Self {
            reader: BufReader::new(file),
            bytes_read: 0,
        })
    }

    /// Total bytes consumed by successful field reads so far. Sits on a
    /// record boundary whenever the last [`WalReader::read_transaction`]
    /// returned `Ok`.
    #[inline]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Decodes the next record.
    ///
    /// Any failure to read a field surfaces the underlying error:
    /// `UnexpectedEof` at a record boundary is the normal end of the log,
    /// mid-record it is the torn-write signal. A decoded entry length
    /// larger than the page body is reported as `InvalidData`.
    pub fn read_transaction(&mut self) -> io::Result<Transaction> {
        let transaction_id = TxnId::new(self.read_u64()?);
        let page_count = self.read_u32()?;

        let mut entries = Vec::new();
        for _ in 0..page_count {
            let page_id = PageId::new(self.read_u64()?);
            let offset = self.read_u32()?;
            let length = self.read_u32()?;
            if length as usize > PAGE_BODY_SIZE {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("entry length {length} exceeds the page body"),
                ));
            }

            let old_data = self.read_bytes(length as usize)?;
            let new_data = self.read_bytes(length as usize)?;
            entries.push(PageEntry {
                page_id,
                offset,
                length,
                old_data,
                new_data,
            });
        }

        let footer_id = TxnId::new(self.read_u64()?);
        let checksum = self.read_u32()?;

        Ok(Transaction {
            header: TransactionHeader {
                transaction_id,
                page_count,
            },
            entries,
            footer: TransactionFooter {
                transaction_id: footer_id,
                checksum,
            },
        })
    }

    fn read_u64(&mut self) -> io::Result<u64> {
        let mut buf = [0u8; 8];
        self.reader.read_exact(&mut buf)?;
        self.bytes_read += 8;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_u32(&mut self) -> io::Result<u32> {
        let mut buf = [0u8; 4];
        self.reader.read_exact(&mut buf)?;
        self.bytes_read += 4;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_bytes(&mut self, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf)?;
        self.bytes_read += len as u64;
        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::tempdir;

    use super::*;

    fn sample_transaction(id: u64) -> Transaction {
        let mut txn = Transaction::new(vec![PageEntry::new(
            PageId::new(42),
            10,
            Bytes::from_static(&[1, 2, 3, 4]),
            Bytes::from_static(&[5, 6, 7, 8]),
        )]);
        txn.header.transaction_id = TxnId::new(id);
        txn.footer.transaction_id = TxnId::new(id);
        txn
    }

    fn file_with(records: &[Transaction]) -> (tempfile::TempDir, File) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wal.log");
        let mut file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .unwrap();
        for txn in records {
            let mut txn = txn.clone();
            file.write_all(&txn.encode()).unwrap();
        }
        (dir, file)
    }

    #[test]
    fn test_round_trip() {
        let txn = sample_transaction(3);
        let (_dir, mut file) = file_with(std::slice::from_ref(&txn));

        let mut reader = WalReader::new(&mut file).unwrap();
        let decoded = reader.read_transaction().unwrap();

        assert_eq!(decoded.header.transaction_id, TxnId::new(3));
        assert_eq!(decoded.header.page_count, 1);
        assert_eq!(decoded.entries[0].page_id, PageId::new(42));
        assert_eq!(decoded.entries[0].offset, 10);
        assert_eq!(decoded.entries[0].old_data, Bytes::from_static(&[1, 2, 3, 4]));
        assert_eq!(decoded.entries[0].new_data, Bytes::from_static(&[5, 6, 7, 8]));
        assert!(decoded.verify_checksum());
    }

    #[test]
    fn test_bytes_read_tracks_record_boundaries() {
        let a = sample_transaction(0);
        let b = sample_transaction(1);
        let (_dir, mut file) = file_with(&[a.clone(), b]);

        let mut reader = WalReader::new(&mut file).unwrap();
        assert_eq!(reader.bytes_read(), 0);

        reader.read_transaction().unwrap();
        assert_eq!(reader.bytes_read(), a.encoded_len() as u64);

        reader.read_transaction().unwrap();
        assert_eq!(reader.bytes_read(), 2 * a.encoded_len() as u64);
    }

    #[test]
    fn test_eof_at_start() {
        let (_dir, mut file) = file_with(&[]);
        let mut reader = WalReader::new(&mut file).unwrap();

        let err = reader.read_transaction().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(reader.bytes_read(), 0);
    }

    #[test]
    fn test_eof_mid_record_leaves_boundary_offset() {
        let txn = sample_transaction(0);
        let (_dir, mut file) = file_with(std::slice::from_ref(&txn));

        // Trailing fragment: id + page count + one page id, nothing more.
        let mut fragment = Vec::new();
        fragment.extend_from_slice(&1u64.to_le_bytes());
        fragment.extend_from_slice(&1u32.to_le_bytes());
        fragment.extend_from_slice(&43u64.to_le_bytes());
        file.seek(SeekFrom::End(0)).unwrap();
        file.write_all(&fragment).unwrap();

        let mut reader = WalReader::new(&mut file).unwrap();
        reader.read_transaction().unwrap();
        let boundary = reader.bytes_read();

        let err = reader.read_transaction().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(boundary, txn.encoded_len() as u64);
    }

    #[test]
    fn test_oversized_length_is_invalid_data() {
        let (_dir, mut file) = file_with(&[]);
        let mut bad = Vec::new();
        bad.extend_from_slice(&0u64.to_le_bytes());
        bad.extend_from_slice(&1u32.to_le_bytes());
        bad.extend_from_slice(&7u64.to_le_bytes());
        bad.extend_from_slice(&0u32.to_le_bytes());
        bad.extend_from_slice(&(PAGE_BODY_SIZE as u32 + 1).to_le_bytes());
        file.write_all(&bad).unwrap();

        let mut reader = WalReader::new(&mut file).unwrap();
        let err = reader.read_transaction().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
