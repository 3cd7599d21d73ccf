//! Saved-item store.
//!
//! Owns the ordered collection of saved codes plus the gallery's filter and
//! page. Saving never resolves a conflict on its own: when the candidate
//! collides with an existing item the caller gets a [`PendingSave`] back and
//! must answer with [`SavedItemStore::resolve_replace`] or
//! [`SavedItemStore::resolve_keep_both`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::error::{IndexError, StoreError};
use crate::model::{CodeKind, KindFilter, SavedItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conflict {
    /// Same content, same kind.
    Exact,
    /// Same content stored under the other kind.
    CrossKind,
}

/// A save waiting on the user's replace/keep-both decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSave {
    pub conflict: Conflict,
    pub match_index: usize,
    pub existing_kind: CodeKind,
    pub candidate: SavedItem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { index: usize },
    NeedsDecision(PendingSave),
}

/// One page of the filtered view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryPage<'a> {
    /// `(index in the full sequence, item)` for each entry on the page.
    pub entries: Vec<(usize, &'a SavedItem)>,
    pub page: usize,
    pub total_pages: usize,
    pub filtered_count: usize,
    pub total_count: usize,
}

#[must_use]
pub fn total_pages(filtered_count: usize, page_size: usize) -> usize {
    filtered_count.div_ceil(page_size.max(1)).max(1)
}

/// Slices the filtered view of `items` into pages.
///
/// `page` is 1-based. Pages outside `1..=total_pages` come back empty.
#[must_use]
pub fn list_page(
    items: &[SavedItem],
    filter: KindFilter,
    page: usize,
    page_size: usize,
) -> GalleryPage<'_> {
    let page_size = page_size.max(1);
    let filtered: Vec<(usize, &SavedItem)> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| filter.matches(item.kind()))
        .collect();
    let filtered_count = filtered.len();

    let entries = match page.checked_sub(1) {
        Some(zero_based) => filtered
            .into_iter()
            .skip(zero_based.saturating_mul(page_size))
            .take(page_size)
            .collect(),
        None => Vec::new(),
    };

    GalleryPage {
        entries,
        page,
        total_pages: total_pages(filtered_count, page_size),
        filtered_count,
        total_count: items.len(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedItemStore {
    items: Vec<SavedItem>,
    filter: KindFilter,
    page: usize,
    page_size: usize,
}

impl SavedItemStore {
    #[must_use]
    pub fn new(page_size: usize) -> Self {
        Self {
            items: Vec::new(),
            filter: KindFilter::All,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    /// Swaps in a collection loaded from storage, resetting the view.
    pub fn replace_items(&mut self, items: Vec<SavedItem>) {
        self.items = items;
        self.page = 1;
    }

    pub fn items(&self) -> &[SavedItem] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&SavedItem> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn filter(&self) -> KindFilter {
        self.filter
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn filtered_count(&self, filter: KindFilter) -> usize {
        self.items
            .iter()
            .filter(|item| filter.matches(item.kind()))
            .count()
    }

    pub fn total_pages(&self) -> usize {
        total_pages(self.filtered_count(self.filter), self.page_size)
    }

    /// The page the gallery currently shows.
    pub fn current_page(&self) -> GalleryPage<'_> {
        list_page(&self.items, self.filter, self.page, self.page_size)
    }

    pub fn set_filter(&mut self, filter: KindFilter) {
        self.filter = filter;
        self.page = 1;
    }

    /// Moves to `page`, clamped into the valid range.
    pub fn set_page(&mut self, page: usize) {
        self.page = page.clamp(1, self.total_pages());
    }

    fn clamp_page(&mut self) {
        let last = self.total_pages();
        if self.page > last {
            self.page = last;
        }
        if self.page == 0 {
            self.page = 1;
        }
    }

    fn find_exact(&self, candidate: &SavedItem) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.content() == candidate.content() && i.kind() == candidate.kind())
    }

    // First match only; further cross-kind copies are left untouched.
    fn find_cross_kind(&self, candidate: &SavedItem) -> Option<usize> {
        self.items
            .iter()
            .position(|i| i.content() == candidate.content() && i.kind() != candidate.kind())
    }

    fn conflict_for(&self, candidate: &SavedItem) -> Option<(Conflict, usize)> {
        self.find_exact(candidate)
            .map(|i| (Conflict::Exact, i))
            .or_else(|| {
                self.find_cross_kind(candidate)
                    .map(|i| (Conflict::CrossKind, i))
            })
    }

    fn append(&mut self, item: SavedItem) -> usize {
        self.items.push(item);
        self.items.len() - 1
    }

    /// Appends `candidate`, or asks for a decision when it collides.
    #[instrument(skip(self, candidate), fields(kind = %candidate.kind()))]
    pub fn save(&mut self, candidate: SavedItem) -> SaveOutcome {
        match self.conflict_for(&candidate) {
            Some((conflict, match_index)) => {
                debug!(?conflict, match_index, "save needs a decision");
                SaveOutcome::NeedsDecision(PendingSave {
                    conflict,
                    match_index,
                    existing_kind: self.items[match_index].kind(),
                    candidate,
                })
            }
            None => {
                let index = self.append(candidate);
                info!(index, "saved item");
                SaveOutcome::Saved { index }
            }
        }
    }

    /// Overwrites the matched item in place and returns its index.
    ///
    /// If the collection changed while the user was deciding and the matched
    /// slot no longer holds the same content, the conflict is looked up
    /// again; when nothing matches any more the candidate is appended.
    #[instrument(skip(self, pending), fields(match_index = pending.match_index))]
    pub fn resolve_replace(&mut self, pending: PendingSave) -> usize {
        let PendingSave {
            match_index,
            candidate,
            ..
        } = pending;

        let still_matches = self
            .items
            .get(match_index)
            .is_some_and(|i| i.content() == candidate.content());
        let target = if still_matches {
            Some(match_index)
        } else {
            debug!("matched item moved, looking it up again");
            self.conflict_for(&candidate).map(|(_, i)| i)
        };

        match target {
            Some(index) => {
                self.items[index] = candidate;
                info!(index, "replaced item");
                index
            }
            None => self.append(candidate),
        }
    }

    #[instrument(skip(self, pending))]
    pub fn resolve_keep_both(&mut self, pending: PendingSave) -> usize {
        let index = self.append(pending.candidate);
        info!(index, "kept both items");
        index
    }

    /// Removes the item at `index` (a position in the full sequence).
    #[instrument(skip(self))]
    pub fn delete(&mut self, index: usize) -> Result<SavedItem, StoreError> {
        if index >= self.items.len() {
            return Err(IndexError {
                index,
                len: self.items.len(),
            }
            .into());
        }
        let removed = self.items.remove(index);
        self.clamp_page();
        info!(page = self.page, "deleted item");
        Ok(removed)
    }

    /// Removes every item matching `filter` and returns how many went.
    ///
    /// Returns 0 without touching the view when nothing matches.
    #[instrument(skip(self))]
    pub fn clear(&mut self, filter: KindFilter) -> usize {
        let before = self.items.len();
        match filter.kind() {
            None => self.items.clear(),
            Some(kind) => self.items.retain(|i| i.kind() != kind),
        }
        let removed = before - self.items.len();
        if removed > 0 {
            self.page = 1;
            info!(removed, "cleared items");
        }
        removed
    }
}
