//! Page identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_DOCUMENT: AtomicU64 = AtomicU64::new(1);

/// Identity of one opened document.
///
/// Every call to [`DocumentId::next`] yields a fresh id, so opening the same
/// file twice produces two distinct documents whose pages never share cache
/// entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocumentId(u64);

impl DocumentId {
    /// Allocates a new process-unique document id.
    pub fn next() -> Self {
        Self(NEXT_DOCUMENT.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value of the id.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

/// Stable handle of one page of an open document.
///
/// Equality is positional: two pages with identical content are still
/// different pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PageId {
    document: DocumentId,
    index: usize,
}

impl PageId {
    pub fn new(document: DocumentId, index: usize) -> Self {
        Self { document, index }
    }

    pub fn document(&self) -> DocumentId {
        self.document
    }

    /// 0-based ordinal of the page within its document.
    pub fn index(&self) -> usize {
        self.index
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/page {}", self.document, self.index)
    }
}

/// PDF page boundary used for measuring or rendering a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageBox {
    #[default]
    MediaBox,
    CropBox,
    ArtBox,
}
