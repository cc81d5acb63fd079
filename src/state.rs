//! Application state management

use crate::config::LectioConfig;
use crate::controller::SearchController;
use crate::error::LectioError;
use crate::loader::{catalog_registry, CATALOG};
use crate::navigation::{self, Jump, ReadingPosition};
use crate::preferences::{PreferenceStore, Preferences};
use crate::query::{QueryState, SearchScope};
use crate::registry::{LoadEvent, TranslationRegistry};
use crate::scheduler::Scheduler;
use crate::search::SearchEngine;
use anyhow::{Context, Result};
use tracing::info;

/// Everything the reader shares between components. Passed explicitly; there
/// is no global instance.
pub struct AppState {
    pub config: LectioConfig,
    pub registry: TranslationRegistry,
    pub preferences: Preferences,
    pub store: PreferenceStore,
    pub position: ReadingPosition,
    position_restored: bool,
}

impl AppState {
    /// Initialize application state
    pub fn new(config: LectioConfig) -> Result<Self> {
        let store = PreferenceStore::open(&config.settings_db)
            .with_context(|| format!("Failed to open settings at {:?}", config.settings_db))?;
        let preferences = store.load()?;

        let mut registry = catalog_registry();
        for source in CATALOG {
            let shown = preferences.shown(source.id).unwrap_or(true);
            registry.restore_toggles(source.id, preferences.allowed(source.id), shown)?;
        }

        Ok(Self {
            config,
            registry,
            preferences,
            store,
            position: ReadingPosition::default(),
            position_restored: false,
        })
    }

    pub fn search_controller<S: Scheduler>(&self, scheduler: S) -> SearchController<S> {
        SearchController::new(
            SearchEngine::new(self.config.search_limit),
            scheduler,
            self.config.search_delay,
            QueryState::new(
                self.preferences.search_scope,
                self.preferences.search_book_number,
            ),
        )
    }

    /// Apply a loader event. The saved reading position is restored the
    /// first time a primary corpus is available.
    pub fn apply_load_event(&mut self, event: LoadEvent) -> Result<(), LectioError> {
        self.registry.apply(event)?;
        self.sync_shown();
        if !self.position_restored {
            if let Some(primary) = self.registry.primary() {
                if let Some(saved) = self.preferences.selection {
                    self.position = navigation::restore(&primary, saved, self.position);
                    info!(book = saved.book, chapter = saved.chapter, "restored reading position");
                }
                self.position_restored = true;
            }
        }
        Ok(())
    }

    pub fn set_shown(&mut self, id: &str, shown: bool) -> Result<(), LectioError> {
        self.registry.set_shown(id, shown)?;
        self.sync_shown();
        self.store.save(&self.preferences)
    }

    pub fn set_allowed(&mut self, id: &str, allowed: bool) -> Result<(), LectioError> {
        self.registry.set_allowed(id, allowed)?;
        self.preferences.set_allowed(id, allowed);
        self.sync_shown();
        self.store.save(&self.preferences)
    }

    pub fn save_search_filters(&mut self, scope: SearchScope, book: Option<u32>) -> Result<(), LectioError> {
        self.preferences.search_scope = scope;
        self.preferences.search_book_number = book;
        self.store.save(&self.preferences)
    }

    pub fn save_preferences(&self) -> Result<(), LectioError> {
        self.store.save(&self.preferences)
    }

    /// Move the reader and persist the canonical selection.
    pub fn set_position(&mut self, position: ReadingPosition) -> Result<(), LectioError> {
        self.position = position;
        let selection = self
            .registry
            .primary()
            .and_then(|primary| navigation::selection_at(&primary, position));
        if selection.is_some() {
            self.preferences.selection = selection;
            self.store.save(&self.preferences)?;
        }
        Ok(())
    }

    /// Go straight to a canonical reference in the primary translation.
    pub fn jump_to(&mut self, book: u32, chapter: u32, verse: u32) -> Result<Jump, LectioError> {
        let primary = self
            .registry
            .primary()
            .ok_or_else(|| LectioError::NotFound("no translation loaded".to_string()))?;
        let jump = navigation::jump_to(&primary, book, chapter, verse).ok_or_else(|| {
            LectioError::NotFound(format!("{} {}:{} in {}", book, chapter, verse, primary.label()))
        })?;
        self.set_position(jump.position)?;
        Ok(jump)
    }

    /// Auto-enable and consent changes live in the registry; mirror them.
    fn sync_shown(&mut self) {
        for slot in self.registry.slots() {
            self.preferences.set_shown(&slot.id, slot.shown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::{book, chapter};
    use crate::corpus::Corpus;
    use crate::navigation::Selection;
    use crate::registry::LoadState;
    use crate::scheduler::ManualScheduler;
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config(dir: &Path) -> LectioConfig {
        LectioConfig::from_lookup(|key| match key {
            "LECTIO_DATA_DIR" => Some(dir.display().to_string()),
            _ => None,
        })
        .unwrap()
    }

    fn ready(id: &str) -> LoadEvent {
        LoadEvent {
            id: id.to_string(),
            state: LoadState::Ready(Arc::new(Corpus::new(
                id,
                id,
                vec![
                    book(1, "Genesis", vec![chapter(1, &[(1, "a")])]),
                    book(19, "Psalms", vec![chapter(1, &[(1, "b")]), chapter(23, &[(1, "c")])]),
                ],
            ))),
        }
    }

    #[test]
    fn test_new_state_defaults() {
        let dir = TempDir::new().unwrap();
        let state = AppState::new(config(dir.path())).unwrap();
        assert!(!state.registry.is_search_ready());
        assert_eq!(state.registry.pending_loads(), vec!["kor", "kjv"]);
        let controller = state.search_controller(ManualScheduler::new());
        assert_eq!(controller.limit(), 120);
    }

    #[test]
    fn test_position_round_trip() {
        let dir = TempDir::new().unwrap();
        {
            let mut state = AppState::new(config(dir.path())).unwrap();
            state.apply_load_event(ready("kor")).unwrap();
            state
                .set_position(ReadingPosition {
                    book_index: 1,
                    chapter_index: 1,
                })
                .unwrap();
            assert_eq!(state.preferences.selection, Some(Selection { book: 19, chapter: 23 }));
        }
        let mut state = AppState::new(config(dir.path())).unwrap();
        state.apply_load_event(ready("kor")).unwrap();
        assert_eq!(
            state.position,
            ReadingPosition {
                book_index: 1,
                chapter_index: 1
            }
        );
    }

    #[test]
    fn test_jump_to_reference() {
        let dir = TempDir::new().unwrap();
        let mut state = AppState::new(config(dir.path())).unwrap();
        assert!(matches!(state.jump_to(19, 23, 1), Err(LectioError::NotFound(_))));

        state.apply_load_event(ready("kor")).unwrap();
        let jump = state.jump_to(19, 23, 4).unwrap();
        assert_eq!(jump.focus.verse, 4);
        assert_eq!(
            state.position,
            ReadingPosition {
                book_index: 1,
                chapter_index: 1
            }
        );
        assert_eq!(state.preferences.selection, Some(Selection { book: 19, chapter: 23 }));

        assert!(matches!(state.jump_to(19, 150, 1), Err(LectioError::NotFound(_))));
        assert_eq!(state.position.chapter_index, 1);
    }

    #[test]
    fn test_toggles_persist() {
        let dir = TempDir::new().unwrap();
        {
            let mut state = AppState::new(config(dir.path())).unwrap();
            state.set_allowed("ja", true).unwrap();
            state.set_shown("kjv", false).unwrap();
            state.save_search_filters(SearchScope::NewDivision, Some(43)).unwrap();
        }
        let state = AppState::new(config(dir.path())).unwrap();
        assert!(state.preferences.japanese_data_allowed);
        assert!(!state.preferences.show_english);
        assert!(!state.registry.slot("kjv").unwrap().shown);
        assert_eq!(state.registry.pending_loads(), vec!["kor", "kjv", "ja"]);
        let controller = state.search_controller(ManualScheduler::new());
        assert_eq!(controller.query().scope, SearchScope::NewDivision);
        assert_eq!(controller.query().book_filter, Some(43));
    }

    #[test]
    fn test_auto_enable_mirrored_into_preferences() {
        let dir = TempDir::new().unwrap();
        let mut state = AppState::new(config(dir.path())).unwrap();
        state.set_allowed("ita", true).unwrap();
        state.apply_load_event(ready("ita")).unwrap();
        assert!(state.preferences.show_italian);
    }
}
