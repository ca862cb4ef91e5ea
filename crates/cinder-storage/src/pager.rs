//! The file-backed page allocator.
//!
//! The pager owns the data file and is the only writer to it. It hands out
//! page ids, recycles freed pages through the free list, and keeps every
//! page's body checksum in its header current.

use std::path::Path;

use cinder_common::constants::{
    META_FREE_LIST_HEAD_OFFSET, META_PAGE_SIZE_OFFSET, META_TOTAL_PAGE_COUNT_OFFSET,
    PAGE_BODY_SIZE, PAGE_CHECKSUM_OFFSET, PAGE_FORMAT_VERSION, PAGE_HEADER_SIZE, PAGE_SIZE,
    PAGE_TYPE_OFFSET, PAGE_VERSION_OFFSET,
};
use cinder_common::types::PageId;

use crate::error::{StorageError, StorageResult};
use crate::file::DataFile;
use crate::page::{compute_checksum, verify_checksum, PageHeader, PageType};

/// File-backed page allocator with an intrusive free list.
///
/// Page 0 is the metadata page and is never handed out by
/// [`Pager::allocate_page`]. A `free_list_head` of 0 therefore
/// unambiguously means the free list is empty.
#[derive(Debug)]
pub struct Pager {
    file: DataFile,
    /// Checksum of an all-zero page body, computed once at open.
    empty_checksum: u32,
}

impl Pager {
    /// Opens the data file at `path`, creating and formatting it if absent
    /// or empty.
    ///
    /// A non-empty file is trusted as-is; call [`Pager::verify`] to check
    /// it.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let file = DataFile::open(path)?;
        let empty_checksum = compute_checksum(&[0u8; PAGE_BODY_SIZE]);
        let mut pager = Self {
            file,
            empty_checksum,
        };

        if pager.file.size()? == 0 {
            pager.format()?;
        }

        Ok(pager)
    }

    /// Writes the initial metadata page into a brand-new file.
    fn format(&mut self) -> StorageResult<()> {
        let mut page = vec![0u8; PAGE_SIZE];
        page[PAGE_VERSION_OFFSET] = PAGE_FORMAT_VERSION;
        page[PAGE_TYPE_OFFSET] = PageType::Metadata.as_u8();
        page[PAGE_CHECKSUM_OFFSET..PAGE_CHECKSUM_OFFSET + 4]
            .copy_from_slice(&self.empty_checksum.to_le_bytes());
        self.file.write_all_at(&page, 0)?;

        self.write_metadata(META_FREE_LIST_HEAD_OFFSET, 0)?;
        self.write_metadata(META_TOTAL_PAGE_COUNT_OFFSET, 1)?;
        self.write_metadata(META_PAGE_SIZE_OFFSET, PAGE_SIZE as u64)?;
        self.file.sync()?;

        tracing::debug!(path = ?self.file.path(), "formatted new data file");
        Ok(())
    }

    /// Allocates a page of the given type and returns its id.
    ///
    /// Pops the free list head when one exists; otherwise appends a fresh
    /// zero-bodied page at the end of the file.
    pub fn allocate_page(&mut self, page_type: PageType) -> StorageResult<PageId> {
        let head = self.read_metadata(META_FREE_LIST_HEAD_OFFSET)?;
        if head == 0 {
            // Grow the file by one page.
            let id = self.read_metadata(META_TOTAL_PAGE_COUNT_OFFSET)?;
            let mut page = vec![0u8; PAGE_SIZE];
            page[PAGE_VERSION_OFFSET] = PAGE_FORMAT_VERSION;
            page[PAGE_TYPE_OFFSET] = page_type.as_u8();
            page[PAGE_CHECKSUM_OFFSET..PAGE_CHECKSUM_OFFSET + 4]
                .copy_from_slice(&self.empty_checksum.to_le_bytes());

            self.file.write_all_at(&page, id * PAGE_SIZE as u64)?;
            self.write_metadata(META_TOTAL_PAGE_COUNT_OFFSET, id + 1)?;
            return Ok(PageId::new(id));
        }

        // Reuse the free-list head; its body still carries the checksum
        // refreshed when it was freed, so only the type byte changes.
        let popped = PageId::new(head);
        let mut next = [0u8; 8];
        self.file.read_exact_at(&mut next, Self::body_offset(popped))?;
        self.write_metadata(META_FREE_LIST_HEAD_OFFSET, u64::from_le_bytes(next))?;
        self.write_page_type(popped, page_type)?;
        Ok(popped)
    }

    /// Returns `page_id` to the free list.
    ///
    /// The caller is responsible for no longer referencing the page; the
    /// pager does not detect double frees.
    pub fn free_page(&mut self, page_id: PageId) -> StorageResult<()> {
        let old_head = self.read_metadata(META_FREE_LIST_HEAD_OFFSET)?;
        self.write_metadata(META_FREE_LIST_HEAD_OFFSET, page_id.as_u64())?;

        // Thread the previous head through the first body bytes.
        self.file
            .write_all_at(&old_head.to_le_bytes(), Self::body_offset(page_id))?;

        let body = self.read_page_body_unverified(page_id)?;
        self.write_page_checksum(page_id, compute_checksum(&body))?;
        self.write_page_type(page_id, PageType::Free)?;
        Ok(())
    }

    /// Reads a page body and verifies it against the stored checksum.
    pub fn read_page_data(&mut self, page_id: PageId) -> StorageResult<Vec<u8>> {
        let body = self.read_page_body_unverified(page_id)?;
        let header = self.read_page_header(page_id)?;
        if !verify_checksum(&body, header.checksum) {
            return Err(StorageError::checksum_mismatch(
                page_id,
                header.checksum,
                compute_checksum(&body),
            ));
        }
        Ok(body)
    }

    /// Writes a full page body and refreshes the header checksum.
    ///
    /// # Panics
    ///
    /// Panics if `body` is not exactly the page body size.
    pub fn write_page_data(&mut self, page_id: PageId, body: &[u8]) -> StorageResult<()> {
        assert_eq!(body.len(), PAGE_BODY_SIZE, "page body must be {PAGE_BODY_SIZE} bytes");
        self.file.write_all_at(body, Self::body_offset(page_id))?;
        self.write_page_checksum(page_id, compute_checksum(body))?;
        Ok(())
    }

    /// Reads the 6-byte header of a page.
    pub fn read_page_header(&mut self, page_id: PageId) -> StorageResult<PageHeader> {
        let mut buf = [0u8; PAGE_HEADER_SIZE];
        self.file.read_exact_at(&mut buf, Self::page_offset(page_id))?;
        Ok(PageHeader::from_bytes(&buf))
    }

    /// Rewrites just the type byte of a page header.
    pub fn write_page_type(&mut self, page_id: PageId, page_type: PageType) -> StorageResult<()> {
        self.file.write_all_at(
            &[page_type.as_u8()],
            Self::page_offset(page_id) + PAGE_TYPE_OFFSET as u64,
        )?;
        Ok(())
    }

    /// Rewrites just the checksum field of a page header.
    pub fn write_page_checksum(&mut self, page_id: PageId, checksum: u32) -> StorageResult<()> {
        self.file.write_all_at(
            &checksum.to_le_bytes(),
            Self::page_offset(page_id) + PAGE_CHECKSUM_OFFSET as u64,
        )?;
        Ok(())
    }

    /// Reads a u64 metadata field by its offset within the metadata page
    /// body.
    ///
    /// Bytes past end-of-file read as zero, so a freshly created offset
    /// yields 0.
    pub fn read_metadata(&mut self, body_offset: u64) -> StorageResult<u64> {
        let mut buf = [0u8; 8];
        self.file
            .read_at(&mut buf, PAGE_HEADER_SIZE as u64 + body_offset)?;
        Ok(u64::from_le_bytes(buf))
    }

    /// Writes a u64 metadata field and refreshes the metadata page
    /// checksum.
    pub fn write_metadata(&mut self, body_offset: u64, value: u64) -> StorageResult<()> {
        self.file
            .write_all_at(&value.to_le_bytes(), PAGE_HEADER_SIZE as u64 + body_offset)?;

        let body = self.read_page_body_unverified(PageId::METADATA)?;
        self.write_page_checksum(PageId::METADATA, compute_checksum(&body))?;
        Ok(())
    }

    /// Returns the current free-list head, or 0 when the list is empty.
    pub fn free_list_head(&mut self) -> StorageResult<u64> {
        self.read_metadata(META_FREE_LIST_HEAD_OFFSET)
    }

    /// Returns the number of pages in the file, including the metadata
    /// page.
    pub fn total_page_count(&mut self) -> StorageResult<u64> {
        self.read_metadata(META_TOTAL_PAGE_COUNT_OFFSET)
    }

    /// Checks every page's checksum, the recorded page size, the file
    /// length, and that every page reachable via the free list has the
    /// free type. Returns false on the first inconsistency.
    pub fn verify(&mut self) -> StorageResult<bool> {
        let page_size = self.read_metadata(META_PAGE_SIZE_OFFSET)?;
        if page_size != PAGE_SIZE as u64 {
            tracing::warn!(found = page_size, expected = PAGE_SIZE, "page size mismatch");
            return Ok(false);
        }

        let count = self.read_metadata(META_TOTAL_PAGE_COUNT_OFFSET)?;
        if count * PAGE_SIZE as u64 != self.file.size()? {
            return Ok(false);
        }

        for id in 0..count {
            let page_id = PageId::new(id);
            let header = self.read_page_header(page_id)?;
            let body = self.read_page_body_unverified(page_id)?;
            if !verify_checksum(&body, header.checksum) {
                tracing::warn!(page = %page_id, "checksum mismatch during verify");
                return Ok(false);
            }
        }

        self.verify_free_list(count)
    }

    /// Walks the free list and confirms every reachable page is in bounds
    /// and typed free. A walk longer than the page count means the list
    /// has a cycle.
    fn verify_free_list(&mut self, count: u64) -> StorageResult<bool> {
        let mut head = self.read_metadata(META_FREE_LIST_HEAD_OFFSET)?;
        let mut walked = 0u64;
        while head != 0 {
            if head >= count || walked >= count {
                tracing::warn!(page = head, "free list walks out of bounds");
                return Ok(false);
            }
            let page_id = PageId::new(head);
            let header = self.read_page_header(page_id)?;
            match header.page_type() {
                Some(page_type) if page_type.is_free() => {}
                Some(page_type) => {
                    tracing::warn!(page = %page_id, found = %page_type, "free-list page has wrong type");
                    return Ok(false);
                }
                None => {
                    tracing::warn!(page = %page_id, type_byte = header.type_byte, "free-list page has unknown type");
                    return Ok(false);
                }
            }

            let mut next = [0u8; 8];
            self.file.read_exact_at(&mut next, Self::body_offset(page_id))?;
            head = u64::from_le_bytes(next);
            walked += 1;
        }
        Ok(true)
    }

    /// Flushes the data file to stable storage.
    pub fn sync(&mut self) -> StorageResult<()> {
        self.file.sync()?;
        Ok(())
    }

    /// Flushes and closes the data file.
    pub fn close(mut self) -> StorageResult<()> {
        self.file.sync()?;
        Ok(())
    }

    /// Reads a page body without checksum verification. Used internally
    /// when the body is about to be re-checksummed.
    fn read_page_body_unverified(&mut self, page_id: PageId) -> StorageResult<Vec<u8>> {
        let mut body = vec![0u8; PAGE_BODY_SIZE];
        self.file.read_exact_at(&mut body, Self::body_offset(page_id))?;
        Ok(body)
    }

    #[inline]
    fn page_offset(page_id: PageId) -> u64 {
        page_id.as_u64() * PAGE_SIZE as u64
    }

    #[inline]
    fn body_offset(page_id: PageId) -> u64 {
        Self::page_offset(page_id) + PAGE_HEADER_SIZE as u64
    }
}
