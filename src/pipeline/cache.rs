//! Write-once per-page annotation store.

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::{Annotation, PageId};

/// Annotations keyed by page. An entry, once written, is never replaced.
#[derive(Debug, Default, Clone)]
pub struct AnnotationCache {
    entries: HashMap<PageId, Arc<[Annotation]>>,
}

impl AnnotationCache {
    pub fn get(&self, page: &PageId) -> Option<Arc<[Annotation]>> {
        self.entries.get(page).cloned()
    }

    /// Stores `annotations` for `page` unless an entry already exists.
    ///
    /// Returns the entry that is cached afterwards.
    pub fn insert_once(&mut self, page: PageId, annotations: Arc<[Annotation]>) -> Arc<[Annotation]> {
        self.entries.entry(page).or_insert(annotations).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnnotationKind, DocumentId, Rect};

    #[test]
    fn test_first_write_wins() {
        let page = PageId::new(DocumentId::next(), 0);
        let mut cache = AnnotationCache::default();
        assert!(cache.get(&page).is_none());

        let empty: Arc<[Annotation]> = Arc::from(Vec::new());
        cache.insert_once(page, empty.clone());
        let later: Arc<[Annotation]> = Arc::from(vec![Annotation::new(
            AnnotationKind::Chessboard,
            Rect::new(0.0, 0.0, 1.0, 1.0),
        )]);
        let kept = cache.insert_once(page, later);

        assert!(Arc::ptr_eq(&kept, &empty));
        assert_eq!(cache.get(&page).map(|a| a.len()), Some(0));
        assert_eq!(cache.len(), 1);
    }
}
