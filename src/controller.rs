//! Search controller: runs the engine on submit and re-runs it when the
//! filters or the enabled translations change
//!
//! Every execution is deferred through the injected [`Scheduler`]. Only one
//! execution is pending at a time; a new submit, filter change or registry
//! change cancels the pending one and schedules its replacement. When the
//! task fires, the engine reads the registry and filters as they are at that
//! moment.

use crate::navigation::{self, Jump};
use crate::query::{QueryState, SearchScope};
use crate::registry::TranslationRegistry;
use crate::scheduler::{Scheduler, TaskHandle, TaskId};
use crate::search::{SearchEngine, SearchFilters, SearchResult, SearchResults};
use std::time::Duration;
use tracing::{debug, info};

/// What the results panel should say.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchStatus {
    /// No translation is enabled; there is nothing to search.
    Unavailable,
    /// Nothing has been executed since the panel was opened.
    Idle,
    Searching,
    NoMatches { term: String },
    /// `capped` means only the first `count` matches are shown.
    Matches { count: usize, capped: bool },
}

#[derive(Debug)]
struct PendingSearch {
    handle: TaskHandle,
    term: String,
}

#[derive(Debug)]
pub struct SearchController<S: Scheduler> {
    engine: SearchEngine,
    scheduler: S,
    delay: Duration,
    query: QueryState,
    panel_open: bool,
    results: SearchResults,
    pending: Option<PendingSearch>,
    enabled_fingerprint: Vec<String>,
}

impl<S: Scheduler> SearchController<S> {
    pub fn new(engine: SearchEngine, scheduler: S, delay: Duration, query: QueryState) -> Self {
        Self {
            engine,
            scheduler,
            delay,
            query,
            panel_open: false,
            results: SearchResults::default(),
            pending: None,
            enabled_fingerprint: Vec::new(),
        }
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.results.results
    }

    pub fn last_results(&self) -> &SearchResults {
        &self.results
    }

    pub fn searching(&self) -> bool {
        self.query.executing
    }

    pub fn last_executed_term(&self) -> &str {
        &self.query.last_executed_term
    }

    pub fn is_open(&self) -> bool {
        self.panel_open
    }

    pub fn is_search_ready(&self) -> bool {
        !self.enabled_fingerprint.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.engine.limit()
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    pub fn status(&self) -> SearchStatus {
        if !self.is_search_ready() {
            return SearchStatus::Unavailable;
        }
        if self.query.executing {
            return SearchStatus::Searching;
        }
        if self.query.last_executed_term.is_empty() {
            return SearchStatus::Idle;
        }
        if self.results.results.is_empty() {
            return SearchStatus::NoMatches {
                term: self.query.last_executed_term.clone(),
            };
        }
        SearchStatus::Matches {
            count: self.results.results.len(),
            capped: self.results.capped,
        }
    }

    pub fn open(&mut self, registry: &TranslationRegistry) {
        self.panel_open = true;
        self.sync_registry(registry);
    }

    /// Closing drops the term, the executed term and the results.
    pub fn close(&mut self) {
        self.cancel_pending();
        self.query.reset();
        self.results = SearchResults::default();
        self.panel_open = false;
    }

    pub fn set_term(&mut self, raw: impl Into<String>) {
        self.query.set_term(raw);
    }

    /// Submit the live term. Returns whether an execution was scheduled.
    pub fn submit(&mut self, registry: &TranslationRegistry) -> bool {
        self.sync_registry(registry);
        if !self.is_search_ready() {
            debug!("submit ignored: no enabled translations");
            return false;
        }
        let term = self.query.submit();
        self.cancel_pending();
        if term.is_empty() {
            self.results = SearchResults::default();
            self.query.complete("");
            return false;
        }
        self.schedule(term);
        true
    }

    /// Run the pending execution if `id` is the task it is waiting for.
    pub fn on_task_fired(&mut self, id: TaskId, registry: &TranslationRegistry) -> bool {
        let is_current = self
            .pending
            .as_ref()
            .is_some_and(|p| p.handle.id() == id && !p.handle.is_cancelled());
        if !is_current {
            debug!(task = id.0, "stale search task ignored");
            return false;
        }
        let Some(pending) = self.pending.take() else {
            return false;
        };

        let corpora = registry.enabled();
        if corpora.is_empty() {
            self.query.executing = false;
            self.results = SearchResults::default();
            return false;
        }
        let filters = SearchFilters::new(self.query.scope, self.query.book_filter);
        self.results = self.engine.search(&corpora, &pending.term, &filters);
        self.query.complete(&pending.term);
        true
    }

    pub fn set_scope(&mut self, scope: SearchScope, registry: &TranslationRegistry) -> bool {
        if !self.query.set_scope(scope) {
            return false;
        }
        self.rerun(registry)
    }

    pub fn set_book_filter(&mut self, book: Option<u32>, registry: &TranslationRegistry) -> bool {
        if !self.query.set_book_filter(book) {
            return false;
        }
        self.rerun(registry)
    }

    /// Call after any registry mutation. Returns whether a re-run was scheduled.
    pub fn on_registry_changed(&mut self, registry: &TranslationRegistry) -> bool {
        if !self.sync_registry(registry) || !self.is_search_ready() {
            return false;
        }
        self.rerun(registry)
    }

    /// Where the reader goes when a result is selected; `None` when the
    /// primary translation does not contain that book and chapter.
    pub fn select_result(&self, result: &SearchResult, registry: &TranslationRegistry) -> Option<Jump> {
        let primary = registry.primary()?;
        navigation::jump_to_result(&primary, result)
    }

    /// Record the current enabled set. An empty set drops the pending
    /// execution and the shown results at once. Returns whether the set changed.
    fn sync_registry(&mut self, registry: &TranslationRegistry) -> bool {
        let fingerprint = registry.enabled_fingerprint();
        if fingerprint == self.enabled_fingerprint {
            return false;
        }
        self.enabled_fingerprint = fingerprint;
        if self.enabled_fingerprint.is_empty() {
            info!("no enabled translations, clearing search results");
            self.cancel_pending();
            self.results = SearchResults::default();
        }
        true
    }

    fn rerun(&mut self, registry: &TranslationRegistry) -> bool {
        if !self.panel_open || !registry.is_search_ready() {
            return false;
        }
        // A submitted term still waiting to run wins over the shown one
        let term = match &self.pending {
            Some(pending) => pending.term.clone(),
            None => self.query.last_executed_term.clone(),
        };
        if term.is_empty() {
            return false;
        }
        self.cancel_pending();
        debug!(term = %term, "re-running search");
        self.schedule(term);
        true
    }

    fn schedule(&mut self, term: String) {
        let handle = self.scheduler.schedule(self.delay);
        self.query.executing = true;
        self.pending = Some(PendingSearch { handle, term });
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.handle.cancel();
        }
        self.query.executing = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::{book, chapter};
    use crate::corpus::Corpus;
    use crate::scheduler::ManualScheduler;

    fn registry() -> TranslationRegistry {
        let mut registry = TranslationRegistry::new();
        registry.register_corpus(Corpus::new(
            "kor",
            "개역한글",
            vec![
                book(1, "창세기", vec![chapter(1, &[(1, "빛이 있으라")])]),
                book(43, "요한복음", vec![chapter(1, &[(5, "빛이 어두움에 비취되")])]),
            ],
        ));
        registry
    }

    fn controller(registry: &TranslationRegistry) -> SearchController<ManualScheduler> {
        let mut controller = SearchController::new(
            SearchEngine::default(),
            ManualScheduler::new(),
            Duration::ZERO,
            QueryState::default(),
        );
        controller.open(registry);
        controller
    }

    fn drain(controller: &mut SearchController<ManualScheduler>, registry: &TranslationRegistry) -> usize {
        let fired = controller.scheduler_mut().advance(Duration::ZERO);
        fired
            .into_iter()
            .filter(|id| controller.on_task_fired(*id, registry))
            .count()
    }

    #[test]
    fn test_submit_is_deferred() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        assert!(c.submit(&registry));
        assert!(c.searching());
        assert_eq!(c.status(), SearchStatus::Searching);
        assert!(c.results().is_empty());

        assert_eq!(drain(&mut c, &registry), 1);
        assert!(!c.searching());
        assert_eq!(c.last_executed_term(), "빛");
        assert_eq!(c.status(), SearchStatus::Matches { count: 2, capped: false });
    }

    #[test]
    fn test_resubmit_replaces_pending() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        c.set_term("어두움");
        c.submit(&registry);
        assert_eq!(drain(&mut c, &registry), 1);
        assert_eq!(c.last_executed_term(), "어두움");
        assert_eq!(c.results().len(), 1);
    }

    #[test]
    fn test_empty_submit_clears() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        c.set_term("  ");
        assert!(!c.submit(&registry));
        assert!(c.results().is_empty());
        assert!(!c.searching());
        assert_eq!(c.status(), SearchStatus::Idle);
        assert_eq!(c.scheduler().pending(), 0);
    }

    #[test]
    fn test_submit_without_translations() {
        let registry = TranslationRegistry::new();
        let mut c = controller(&registry);
        c.set_term("빛");
        assert!(!c.submit(&registry));
        assert!(!c.searching());
        assert_eq!(c.status(), SearchStatus::Unavailable);
    }

    #[test]
    fn test_live_edit_does_not_rerun() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        c.set_term("창세기");
        assert!(c.set_scope(SearchScope::NewDivision, &registry));
        drain(&mut c, &registry);
        assert_eq!(c.last_executed_term(), "빛");
        assert_eq!(c.results().len(), 1);
        assert_eq!(c.results()[0].book_number, 43);
    }

    #[test]
    fn test_unchanged_filter_is_noop() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        assert!(!c.set_scope(SearchScope::All, &registry));
        assert!(!c.set_book_filter(None, &registry));
    }

    #[test]
    fn test_filter_change_without_executed_term() {
        let registry = registry();
        let mut c = controller(&registry);
        assert!(!c.set_book_filter(Some(43), &registry));
        assert_eq!(c.scheduler().pending(), 0);
    }

    #[test]
    fn test_filter_change_keeps_pending_term() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        c.set_term("어두움");
        c.submit(&registry);
        // Pending "어두움" is replaced by itself, not by the shown "빛"
        assert!(c.set_scope(SearchScope::OldDivision, &registry));
        assert_eq!(drain(&mut c, &registry), 1);
        assert_eq!(c.last_executed_term(), "어두움");
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_closed_panel_skips_rerun() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        c.close();
        assert!(!c.set_scope(SearchScope::OldDivision, &registry));
        assert_eq!(c.query().scope, SearchScope::OldDivision);
        assert_eq!(c.last_executed_term(), "");
        assert_eq!(c.query().live_term, "");
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_close_cancels_pending() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        c.close();
        assert!(!c.searching());
        assert_eq!(drain(&mut c, &registry), 0);
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_registry_emptied_clears_everything() {
        let mut registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);

        registry.unregister_corpus("kor").unwrap();
        assert!(!c.on_registry_changed(&registry));
        assert!(c.results().is_empty());
        assert!(!c.searching());
        assert_eq!(c.status(), SearchStatus::Unavailable);
        // Executed term survives so results come back with the data
        assert_eq!(c.last_executed_term(), "빛");
    }

    #[test]
    fn test_registry_emptied_while_pending() {
        let mut registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        registry.unregister_corpus("kor").unwrap();
        c.on_registry_changed(&registry);
        assert!(!c.searching());
        assert_eq!(drain(&mut c, &registry), 0);
    }

    #[test]
    fn test_submit_sees_emptied_registry_first() {
        let mut registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        drain(&mut c, &registry);
        assert_eq!(c.results().len(), 2);

        // Submit reaches the controller before the change notification
        registry.unregister_corpus("kor").unwrap();
        c.set_term("빛");
        assert!(!c.submit(&registry));
        assert!(c.results().is_empty());
        assert!(!c.searching());
        assert!(!c.on_registry_changed(&registry));
        assert!(c.results().is_empty());
        assert_eq!(c.status(), SearchStatus::Unavailable);
    }

    #[test]
    fn test_reopen_sees_emptied_registry() {
        let mut registry = registry();
        let mut c = controller(&registry);
        c.set_term("빛");
        c.submit(&registry);
        registry.unregister_corpus("kor").unwrap();
        c.open(&registry);
        assert!(!c.searching());
        assert_eq!(drain(&mut c, &registry), 0);
        assert!(c.results().is_empty());
    }

    #[test]
    fn test_stale_task_id_ignored() {
        let registry = registry();
        let mut c = controller(&registry);
        assert!(!c.on_task_fired(TaskId(99), &registry));
    }

    #[test]
    fn test_select_result_uses_primary() {
        let registry = registry();
        let mut c = controller(&registry);
        c.set_term("어두움");
        c.submit(&registry);
        drain(&mut c, &registry);
        let jump = c.select_result(&c.results()[0].clone(), &registry).unwrap();
        assert_eq!(jump.position.book_index, 1);
        assert_eq!(jump.position.chapter_index, 0);
        assert_eq!(jump.focus.verse, 5);
    }
}
