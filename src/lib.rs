//! Lectio - offline multi-translation scripture reader
//!
//! Library providing the corpus model, translation registry, verse search
//! and the search controller that keeps results in step with filters and
//! loaded translations.

pub mod corpus;
pub mod registry;
pub mod query;
pub mod search;
pub mod scheduler;
pub mod controller;
pub mod navigation;
pub mod preferences;
pub mod loader;
pub mod config;
pub mod error;
pub mod state;

pub use config::LectioConfig;
pub use controller::{SearchController, SearchStatus};
pub use corpus::{Book, Chapter, Corpus, Division, Verse};
pub use error::LectioError;
pub use loader::{TranslationLoader, TranslationSource, CATALOG};
pub use navigation::{FocusTarget, Jump, ReadingPosition, Selection};
pub use preferences::{PreferenceStore, Preferences, Theme};
pub use query::{QueryState, SearchScope};
pub use registry::{LoadEvent, LoadState, TranslationRegistry, TranslationSlot};
pub use scheduler::{ManualScheduler, Scheduler, TaskHandle, TaskId, TokioScheduler};
pub use search::{SearchEngine, SearchFilters, SearchResult, SearchResults, SEARCH_LIMIT};
pub use state::AppState;
