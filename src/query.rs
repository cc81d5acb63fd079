//! Search query state: the live input, the executed term and the filters

use crate::corpus::{Division, LAST_BOOK};
use crate::error::LectioError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum SearchScope {
    #[default]
    #[serde(rename = "all")]
    All,
    #[serde(rename = "ot")]
    OldDivision,
    #[serde(rename = "nt")]
    NewDivision,
}

impl SearchScope {
    pub fn admits(&self, book_number: u32) -> bool {
        match self {
            SearchScope::All => true,
            SearchScope::OldDivision => Division::of(book_number) == Division::Old,
            SearchScope::NewDivision => Division::of(book_number) == Division::New,
        }
    }
}

impl fmt::Display for SearchScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchScope::All => "all",
            SearchScope::OldDivision => "ot",
            SearchScope::NewDivision => "nt",
        };
        f.write_str(s)
    }
}

impl FromStr for SearchScope {
    type Err = LectioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(SearchScope::All),
            "ot" | "old" => Ok(SearchScope::OldDivision),
            "nt" | "new" => Ok(SearchScope::NewDivision),
            other => Err(LectioError::InvalidQuery(format!(
                "unknown search scope '{}', expected all, old or new",
                other
            ))),
        }
    }
}

/// Parse a book restriction: a canonical number, or `none`/empty for no restriction.
pub fn parse_book_filter(s: &str) -> Result<Option<u32>, LectioError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    match s.parse::<u32>() {
        Ok(n) if (1..=LAST_BOOK).contains(&n) => Ok(Some(n)),
        _ => Err(LectioError::InvalidQuery(format!(
            "book must be 1..={} or none, got '{}'",
            LAST_BOOK, s
        ))),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryState {
    /// What is in the input box, not yet submitted.
    pub live_term: String,
    /// Term behind the currently shown results; empty if nothing ran yet.
    pub last_executed_term: String,
    pub scope: SearchScope,
    /// When set, overrides `scope`.
    pub book_filter: Option<u32>,
    pub executing: bool,
}

impl QueryState {
    pub fn new(scope: SearchScope, book_filter: Option<u32>) -> Self {
        Self {
            scope,
            book_filter,
            ..Self::default()
        }
    }

    pub fn set_term(&mut self, raw: impl Into<String>) {
        self.live_term = raw.into();
    }

    /// The trimmed live term, as it would be executed.
    pub fn submit(&self) -> String {
        self.live_term.trim().to_string()
    }

    /// Returns whether the value changed.
    pub fn set_scope(&mut self, scope: SearchScope) -> bool {
        let changed = self.scope != scope;
        self.scope = scope;
        changed
    }

    /// Returns whether the value changed.
    pub fn set_book_filter(&mut self, book_filter: Option<u32>) -> bool {
        let changed = self.book_filter != book_filter;
        self.book_filter = book_filter;
        changed
    }

    pub fn complete(&mut self, term: &str) {
        self.last_executed_term = term.to_string();
        self.executing = false;
    }

    /// Clear the term side; filters are user preferences and survive.
    pub fn reset(&mut self) {
        self.live_term.clear();
        self.last_executed_term.clear();
        self.executing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_admits() {
        assert!(SearchScope::All.admits(1));
        assert!(SearchScope::All.admits(66));
        assert!(SearchScope::OldDivision.admits(39));
        assert!(!SearchScope::OldDivision.admits(40));
        assert!(SearchScope::NewDivision.admits(40));
        assert!(!SearchScope::NewDivision.admits(39));
    }

    #[test]
    fn test_scope_parse() {
        assert_eq!("old".parse::<SearchScope>().unwrap(), SearchScope::OldDivision);
        assert_eq!("NT".parse::<SearchScope>().unwrap(), SearchScope::NewDivision);
        assert_eq!(" all ".parse::<SearchScope>().unwrap(), SearchScope::All);
        assert!("apocrypha".parse::<SearchScope>().is_err());
    }

    #[test]
    fn test_scope_serde_matches_stored_values() {
        assert_eq!(serde_json::to_string(&SearchScope::OldDivision).unwrap(), "\"ot\"");
        let scope: SearchScope = serde_json::from_str("\"nt\"").unwrap();
        assert_eq!(scope, SearchScope::NewDivision);
    }

    #[test]
    fn test_parse_book_filter() {
        assert_eq!(parse_book_filter("43").unwrap(), Some(43));
        assert_eq!(parse_book_filter("none").unwrap(), None);
        assert_eq!(parse_book_filter("").unwrap(), None);
        assert!(parse_book_filter("0").is_err());
        assert!(parse_book_filter("67").is_err());
        assert!(parse_book_filter("john").is_err());
    }

    #[test]
    fn test_submit_trims_without_touching_executed() {
        let mut query = QueryState::default();
        query.set_term("  사랑 ");
        assert_eq!(query.submit(), "사랑");
        assert_eq!(query.last_executed_term, "");
    }

    #[test]
    fn test_setters_report_change() {
        let mut query = QueryState::default();
        assert!(!query.set_scope(SearchScope::All));
        assert!(query.set_scope(SearchScope::NewDivision));
        assert!(query.set_book_filter(Some(43)));
        assert!(!query.set_book_filter(Some(43)));
    }

    #[test]
    fn test_reset_keeps_filters() {
        let mut query = QueryState::new(SearchScope::OldDivision, Some(19));
        query.set_term("a");
        query.executing = true;
        query.complete("a");
        query.reset();
        assert_eq!(query.live_term, "");
        assert_eq!(query.last_executed_term, "");
        assert_eq!(query.scope, SearchScope::OldDivision);
        assert_eq!(query.book_filter, Some(19));
    }
}
