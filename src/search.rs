//! Verse search across the enabled translations
//!
//! Plain substring search: no index, no ranking. Traversal order is
//! corpus (registry order) -> book -> chapter -> verse, all in source order,
//! and stops the moment the result limit is reached. Matches near the limit
//! therefore favour earlier corpora and earlier books.

use crate::corpus::Corpus;
use crate::query::SearchScope;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Maximum number of results returned by one execution.
pub const SEARCH_LIMIT: usize = 120;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub scope: SearchScope,
    /// Restricts to a single canonical book and takes precedence over `scope`.
    pub book_number: Option<u32>,
}

impl SearchFilters {
    pub fn new(scope: SearchScope, book_number: Option<u32>) -> Self {
        Self { scope, book_number }
    }

    pub fn admits(&self, book_number: u32) -> bool {
        match self.book_number {
            Some(only) => only == book_number,
            None => self.scope.admits(book_number),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchResult {
    pub book_number: u32,
    /// Title from the primary corpus, so every translation shows the same name.
    pub book_title: String,
    pub chapter: u32,
    pub verse: u32,
    pub text: String,
    pub translation_id: String,
    pub translation_label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub results: Vec<SearchResult>,
    /// The limit was reached; more matches may exist past the stop point.
    pub capped: bool,
    pub verses_scanned: usize,
}

#[derive(Debug, Clone)]
pub struct SearchEngine {
    limit: usize,
}

impl Default for SearchEngine {
    fn default() -> Self {
        Self::new(SEARCH_LIMIT)
    }
}

impl SearchEngine {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Case-sensitive substring search of `term` in every admitted verse.
    ///
    /// `corpora` is the enabled list in registry order; its first entry is
    /// the primary corpus used for book titles. An empty list or a blank
    /// term returns no results without scanning anything.
    pub fn search(
        &self,
        corpora: &[Arc<Corpus>],
        term: &str,
        filters: &SearchFilters,
    ) -> SearchResults {
        let term = term.trim();
        let mut out = SearchResults {
            query: term.to_string(),
            ..SearchResults::default()
        };

        let primary = match corpora.first() {
            Some(primary) => primary,
            None => return out,
        };
        if term.is_empty() || self.limit == 0 {
            return out;
        }

        let start = Instant::now();

        'scan: for corpus in corpora {
            for book in corpus.books() {
                if !filters.admits(book.number) {
                    continue;
                }
                let book_title = primary
                    .book_title(book.number)
                    .unwrap_or(book.title.as_str());

                for chapter in &book.chapters {
                    for verse in &chapter.verses {
                        out.verses_scanned += 1;
                        if !verse.text.contains(term) {
                            continue;
                        }
                        out.results.push(SearchResult {
                            book_number: book.number,
                            book_title: book_title.to_string(),
                            chapter: chapter.number,
                            verse: verse.number,
                            text: verse.text.clone(),
                            translation_id: corpus.id().to_string(),
                            translation_label: corpus.label().to_string(),
                        });
                        if out.results.len() >= self.limit {
                            out.capped = true;
                            break 'scan;
                        }
                    }
                }
            }
        }

        debug!(
            term = %term,
            scope = %filters.scope,
            book = ?filters.book_number,
            corpora = corpora.len(),
            results = out.results.len(),
            verses_scanned = out.verses_scanned,
            capped = out.capped,
            elapsed_us = start.elapsed().as_micros() as u64,
            "search executed"
        );

        out
    }
}
