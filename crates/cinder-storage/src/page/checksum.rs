//! Page checksum utilities.

/// Computes the CRC32/IEEE checksum of a page body.
///
/// # Example
///
/// ```rust
/// use cinder_storage::page::compute_checksum;
///
/// let body = vec![0u8; 64];
/// assert_eq!(compute_checksum(&body), compute_checksum(&body));
/// ```
#[inline]
pub fn compute_checksum(body: &[u8]) -> u32 {
    crc32fast::hash(body)
}

/// Verifies that `expected` matches the checksum of `body`.
#[inline]
pub fn verify_checksum(body: &[u8], expected: u32) -> bool {
    compute_checksum(body) == expected
}
