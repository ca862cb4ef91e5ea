//! Transaction record framing.
//!
//! A record is serialized little-endian in this layout:
//!
//! ```text
//! u64  transaction_id
//! u32  page_count
//! repeat page_count times:
//!   u64 page_id
//!   u32 offset
//!   u32 length
//!   length bytes old_data
//!   length bytes new_data
//! u64  transaction_id   (repeated)
//! u32  checksum         (CRC32/IEEE over all preceding bytes)
//! ```
//!
//! The repeated transaction id plus the trailing checksum form the
//! torn-write sentinel: a record either validates whole on recovery or is
//! discarded whole.

use bytes::{BufMut, Bytes, BytesMut};

use cinder_common::types::{PageId, TxnId};

/// Size of the serialized record header: transaction id + page count.
pub const RECORD_HEADER_SIZE: usize = 12;

/// Fixed portion of a serialized page entry: page id + offset + length.
pub const ENTRY_FIXED_SIZE: usize = 16;

/// Size of the serialized footer: repeated transaction id + checksum.
pub const RECORD_FOOTER_SIZE: usize = 12;

/// Record header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionHeader {
    /// Id assigned by the log at append time.
    pub transaction_id: TxnId,
    /// Number of page entries in the body.
    pub page_count: u32,
}

/// One page byte-range change: where it lands and both images.
///
/// `old_data` is the page's content at `[offset, offset + length)` as the
/// writer observed it when the transaction was built; `new_data` replaces
/// it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEntry {
    /// The page being changed.
    pub page_id: PageId,
    /// Start offset within the page body.
    pub offset: u32,
    /// Byte length of both images.
    pub length: u32,
    /// Pre-image.
    pub old_data: Bytes,
    /// Post-image.
    pub new_data: Bytes,
}

impl PageEntry {
    /// Creates an entry. The images must be the same length.
    pub fn new(page_id: PageId, offset: u32, old_data: Bytes, new_data: Bytes) -> Self {
        debug_assert_eq!(old_data.len(), new_data.len());
        Self {
            page_id,
            offset,
            length: new_data.len() as u32,
            old_data,
            new_data,
        }
    }

    /// Serialized size of this entry.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        ENTRY_FIXED_SIZE + self.old_data.len() + self.new_data.len()
    }
}

/// Record footer: the repeated transaction id and the record checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransactionFooter {
    /// Must equal the header's transaction id.
    pub transaction_id: TxnId,
    /// CRC32 over everything before it in the record.
    pub checksum: u32,
}

/// A unit of one or more page changes, applied atomically on recovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Record header.
    pub header: TransactionHeader,
    /// Page entries, in the order the writer supplied them.
    pub entries: Vec<PageEntry>,
    /// Record footer.
    pub footer: TransactionFooter,
}

impl Transaction {
    /// Creates a transaction over the given entries. The ids and checksum
    /// are filled in by the log at append time.
    pub fn new(entries: Vec<PageEntry>) -> Self {
        let page_count = entries.len() as u32;
        Self {
            header: TransactionHeader {
                transaction_id: TxnId::FIRST,
                page_count,
            },
            entries,
            footer: TransactionFooter {
                transaction_id: TxnId::FIRST,
                checksum: 0,
            },
        }
    }

    /// Total serialized size of the record, checksum included.
    pub fn encoded_len(&self) -> usize {
        RECORD_HEADER_SIZE
            + self.entries.iter().map(PageEntry::encoded_len).sum::<usize>()
            + RECORD_FOOTER_SIZE
    }

    /// Serializes everything the checksum covers: header, entries, and the
    /// repeated transaction id.
    fn serialize_preamble(&self, buf: &mut BytesMut) {
        buf.put_u64_le(self.header.transaction_id.as_u64());
        buf.put_u32_le(self.header.page_count);
        for entry in &self.entries {
            buf.put_u64_le(entry.page_id.as_u64());
            buf.put_u32_le(entry.offset);
            buf.put_u32_le(entry.length);
            buf.put_slice(&entry.old_data);
            buf.put_slice(&entry.new_data);
        }
        buf.put_u64_le(self.footer.transaction_id.as_u64());
    }

    /// Computes the record checksum from the current field values.
    pub fn compute_checksum(&self) -> u32 {
        let mut buf = BytesMut::with_capacity(self.encoded_len() - 4);
        self.serialize_preamble(&mut buf);
        crc32fast::hash(&buf)
    }

    /// Serializes the full record, storing the computed checksum in the
    /// footer as a side effect.
    pub fn encode(&mut self) -> BytesMut {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        self.serialize_preamble(&mut buf);
        let checksum = crc32fast::hash(&buf);
        self.footer.checksum = checksum;
        buf.put_u32_le(checksum);
        buf
    }

    /// Returns true if the stored footer checksum matches the record
    /// contents and the footer id repeats the header id.
    pub fn verify_checksum(&self) -> bool {
        self.footer.transaction_id == self.header.transaction_id
            && self.footer.checksum == self.compute_checksum()
    }
}
