//! Page types.

use std::fmt;

/// The purpose of a page, stored as a single byte in the page header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PageType {
    /// Database metadata. Always and only page 0.
    Metadata = 0,
    /// User data page.
    User = 1,
    /// Page on the free list, available for reuse.
    Free = 2,
    /// Schema information.
    Schema = 3,
    /// Table row data.
    Table = 4,
    /// Overflow data spilled from another page.
    Overflow = 5,
    /// Index data.
    Index = 6,
}

impl PageType {
    /// Creates a `PageType` from its on-disk byte value.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Metadata),
            1 => Some(Self::User),
            2 => Some(Self::Free),
            3 => Some(Self::Schema),
            4 => Some(Self::Table),
            5 => Some(Self::Overflow),
            6 => Some(Self::Index),
            _ => None,
        }
    }

    /// Returns the on-disk byte value.
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Returns true if this is a free-list page.
    #[inline]
    pub const fn is_free(self) -> bool {
        matches!(self, Self::Free)
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metadata => write!(f, "Metadata"),
            Self::User => write!(f, "User"),
            Self::Free => write!(f, "Free"),
            Self::Schema => write!(f, "Schema"),
            Self::Table => write!(f, "Table"),
            Self::Overflow => write!(f, "Overflow"),
            Self::Index => write!(f, "Index"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for value in 0u8..=6 {
            let ty = PageType::from_u8(value).unwrap();
            assert_eq!(ty.as_u8(), value);
        }
        assert_eq!(PageType::from_u8(7), None);
        assert_eq!(PageType::from_u8(255), None);
    }

    #[test]
    fn test_predicates() {
        assert!(PageType::Free.is_free());
        assert!(!PageType::User.is_free());
    }
}
