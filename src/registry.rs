//! Translation registry: which corpora are loaded, shown and allowed

use crate::corpus::Corpus;
use crate::error::LectioError;
use std::sync::Arc;
use tracing::{debug, info};

/// Loader-side lifecycle of one translation.
#[derive(Debug, Clone)]
pub enum LoadState {
    Unrequested,
    Loading,
    Ready(Arc<Corpus>),
    Failed(String),
}

impl LoadState {
    pub fn corpus(&self) -> Option<&Arc<Corpus>> {
        match self {
            LoadState::Ready(corpus) => Some(corpus),
            LoadState::Unrequested | LoadState::Loading | LoadState::Failed(_) => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.corpus().is_some()
    }

    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Unrequested => "unrequested",
            LoadState::Loading => "loading",
            LoadState::Ready(_) => "ready",
            LoadState::Failed(_) => "failed",
        }
    }
}

/// State transition reported by the loader.
#[derive(Debug, Clone)]
pub struct LoadEvent {
    pub id: String,
    pub state: LoadState,
}

#[derive(Debug, Clone)]
pub struct TranslationSlot {
    pub id: String,
    pub label: String,
    /// Optional translations need explicit data consent before download.
    pub optional: bool,
    pub state: LoadState,
    pub shown: bool,
    pub allowed: bool,
    auto_enable_pending: bool,
}

impl TranslationSlot {
    pub fn new(id: impl Into<String>, label: impl Into<String>, optional: bool) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            optional,
            state: LoadState::Unrequested,
            shown: !optional,
            allowed: !optional,
            auto_enable_pending: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.allowed && self.shown && self.state.is_ready()
    }
}

/// Ordered set of translations. Enabled corpora are listed in the order they
/// became ready; the first of them is the primary corpus.
#[derive(Debug, Clone, Default)]
pub struct TranslationRegistry {
    slots: Vec<TranslationSlot>,
    ready_order: Vec<String>,
}

impl TranslationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_slot(&mut self, slot: TranslationSlot) {
        if self.slot(&slot.id).is_some() {
            return;
        }
        self.slots.push(slot);
    }

    pub fn slots(&self) -> &[TranslationSlot] {
        &self.slots
    }

    pub fn slot(&self, id: &str) -> Option<&TranslationSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    fn slot_mut(&mut self, id: &str) -> Result<&mut TranslationSlot, LectioError> {
        self.slots
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| LectioError::NotFound(format!("translation {}", id)))
    }

    pub fn state(&self, id: &str) -> Option<&LoadState> {
        self.slot(id).map(|s| &s.state)
    }

    /// Make a parsed corpus available, creating a visible slot if needed.
    pub fn register_corpus(&mut self, corpus: Corpus) {
        let idx = match self.slots.iter().position(|s| s.id == corpus.id()) {
            Some(idx) => idx,
            None => {
                self.slots
                    .push(TranslationSlot::new(corpus.id(), corpus.label(), false));
                self.slots.len() - 1
            }
        };
        self.mark_state(idx, LoadState::Ready(Arc::new(corpus)));
    }

    pub fn unregister_corpus(&mut self, id: &str) -> Result<(), LectioError> {
        self.set_state(id, LoadState::Unrequested)
    }

    pub fn apply(&mut self, event: LoadEvent) -> Result<(), LectioError> {
        self.set_state(&event.id, event.state)
    }

    pub fn set_state(&mut self, id: &str, state: LoadState) -> Result<(), LectioError> {
        let idx = self
            .slots
            .iter()
            .position(|s| s.id == id)
            .ok_or_else(|| LectioError::NotFound(format!("translation {}", id)))?;
        self.mark_state(idx, state);
        Ok(())
    }

    fn mark_state(&mut self, idx: usize, state: LoadState) {
        let slot = &mut self.slots[idx];
        let id = slot.id.clone();
        debug!(translation = %id, from = slot.state.name(), to = state.name(), "load state changed");
        let became_ready = state.is_ready();
        if let LoadState::Ready(corpus) = &state {
            slot.label = corpus.label().to_string();
        }
        slot.state = state;

        if became_ready && slot.auto_enable_pending && slot.allowed {
            slot.auto_enable_pending = false;
            if !slot.shown {
                info!(translation = %id, "auto-enabling newly downloaded translation");
                slot.shown = true;
            }
        }

        if became_ready {
            if !self.ready_order.contains(&id) {
                self.ready_order.push(id);
            }
        } else {
            self.ready_order.retain(|r| *r != id);
        }
    }

    pub fn set_shown(&mut self, id: &str, shown: bool) -> Result<(), LectioError> {
        let slot = self.slot_mut(id)?;
        // Display without consent is not possible
        slot.shown = shown && slot.allowed;
        Ok(())
    }

    pub fn set_allowed(&mut self, id: &str, allowed: bool) -> Result<(), LectioError> {
        let slot = self.slot_mut(id)?;
        if allowed && !slot.allowed {
            slot.auto_enable_pending = true;
        } else if !allowed {
            slot.auto_enable_pending = false;
            slot.shown = false;
        }
        slot.allowed = allowed;
        // Already downloaded earlier in the session
        if allowed && slot.auto_enable_pending && slot.state.is_ready() {
            slot.auto_enable_pending = false;
            slot.shown = true;
        }
        Ok(())
    }

    /// Apply toggles saved in an earlier session, without auto-enabling.
    pub fn restore_toggles(&mut self, id: &str, allowed: bool, shown: bool) -> Result<(), LectioError> {
        let slot = self.slot_mut(id)?;
        slot.allowed = allowed;
        slot.shown = shown && allowed;
        slot.auto_enable_pending = false;
        Ok(())
    }

    /// Allowed translations the loader has not been asked for yet.
    pub fn pending_loads(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|s| s.allowed && matches!(s.state, LoadState::Unrequested))
            .map(|s| s.id.clone())
            .collect()
    }

    /// Enabled corpora in registry order.
    pub fn enabled(&self) -> Vec<Arc<Corpus>> {
        self.ready_order
            .iter()
            .filter_map(|id| self.slot(id))
            .filter(|s| s.is_enabled())
            .filter_map(|s| s.state.corpus().cloned())
            .collect()
    }

    /// Ordered ids of the enabled corpora; changes whenever the enabled set does.
    pub fn enabled_fingerprint(&self) -> Vec<String> {
        self.ready_order
            .iter()
            .filter(|id| self.slot(id).is_some_and(|s| s.is_enabled()))
            .cloned()
            .collect()
    }

    pub fn primary(&self) -> Option<Arc<Corpus>> {
        self.enabled().into_iter().next()
    }

    pub fn is_search_ready(&self) -> bool {
        self.ready_order
            .iter()
            .any(|id| self.slot(id).is_some_and(|s| s.is_enabled()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::tests::{book, chapter};

    fn corpus(id: &str) -> Corpus {
        Corpus::new(id, id.to_uppercase(), vec![book(1, id, vec![chapter(1, &[(1, "x")])])])
    }

    fn catalog() -> TranslationRegistry {
        let mut registry = TranslationRegistry::new();
        registry.add_slot(TranslationSlot::new("kor", "개역한글", false));
        registry.add_slot(TranslationSlot::new("kjv", "KJV", false));
        registry.add_slot(TranslationSlot::new("ja", "口語訳", true));
        registry
    }

    fn ids(registry: &TranslationRegistry) -> Vec<String> {
        registry.enabled().iter().map(|c| c.id().to_string()).collect()
    }

    #[test]
    fn test_empty_registry_not_ready() {
        let registry = catalog();
        assert!(!registry.is_search_ready());
        assert!(registry.enabled().is_empty());
        assert!(registry.primary().is_none());
    }

    #[test]
    fn test_order_follows_readiness() {
        let mut registry = catalog();
        registry.register_corpus(corpus("kjv"));
        registry.register_corpus(corpus("kor"));
        assert_eq!(ids(&registry), vec!["kjv", "kor"]);
        assert_eq!(registry.primary().unwrap().id(), "kjv");
    }

    #[test]
    fn test_loading_and_failed_are_absent() {
        let mut registry = catalog();
        registry.set_state("kor", LoadState::Loading).unwrap();
        registry
            .set_state("kjv", LoadState::Failed("HTTP 404".to_string()))
            .unwrap();
        assert!(registry.enabled().is_empty());
        registry.register_corpus(corpus("kor"));
        assert_eq!(ids(&registry), vec!["kor"]);
    }

    #[test]
    fn test_unregister_removes() {
        let mut registry = catalog();
        registry.register_corpus(corpus("kor"));
        registry.register_corpus(corpus("kjv"));
        registry.unregister_corpus("kor").unwrap();
        assert_eq!(ids(&registry), vec!["kjv"]);
        registry.register_corpus(corpus("kor"));
        assert_eq!(ids(&registry), vec!["kjv", "kor"]);
    }

    #[test]
    fn test_hidden_translation_not_enabled() {
        let mut registry = catalog();
        registry.register_corpus(corpus("kor"));
        registry.register_corpus(corpus("kjv"));
        registry.set_shown("kjv", false).unwrap();
        assert_eq!(ids(&registry), vec!["kor"]);
        assert_eq!(registry.enabled_fingerprint(), vec!["kor".to_string()]);
    }

    #[test]
    fn test_optional_requires_consent() {
        let mut registry = catalog();
        assert_eq!(registry.pending_loads(), vec!["kor", "kjv"]);
        registry.set_shown("ja", true).unwrap();
        assert!(!registry.slot("ja").unwrap().shown);

        registry.set_allowed("ja", true).unwrap();
        assert_eq!(registry.pending_loads(), vec!["kor", "kjv", "ja"]);
        registry.set_state("ja", LoadState::Loading).unwrap();
        assert!(!registry.slot("ja").unwrap().shown);
        registry.register_corpus(corpus("ja"));
        assert!(registry.slot("ja").unwrap().shown);
        assert_eq!(ids(&registry), vec!["ja"]);
    }

    #[test]
    fn test_revoking_consent_hides() {
        let mut registry = catalog();
        registry.set_allowed("ja", true).unwrap();
        registry.register_corpus(corpus("ja"));
        registry.set_allowed("ja", false).unwrap();
        assert!(!registry.slot("ja").unwrap().shown);
        assert!(registry.enabled().is_empty());
    }

    #[test]
    fn test_auto_enable_only_once() {
        let mut registry = catalog();
        registry.set_allowed("ja", true).unwrap();
        registry.register_corpus(corpus("ja"));
        registry.set_shown("ja", false).unwrap();
        // A later reload must not re-show it
        registry.register_corpus(corpus("ja"));
        assert!(!registry.slot("ja").unwrap().shown);
    }

    #[test]
    fn test_restore_toggles_skips_auto_enable() {
        let mut registry = catalog();
        registry.restore_toggles("ja", true, false).unwrap();
        registry.register_corpus(corpus("ja"));
        assert!(!registry.slot("ja").unwrap().shown);
        registry.restore_toggles("kjv", true, false).unwrap();
        registry.register_corpus(corpus("kjv"));
        assert!(registry.enabled().is_empty());
    }

    #[test]
    fn test_register_uncatalogued_corpus() {
        let mut registry = catalog();
        registry.register_corpus(corpus("vul"));
        let slot = registry.slot("vul").unwrap();
        assert!(slot.state.is_ready());
        assert!(slot.shown && slot.allowed);
        assert_eq!(slot.label, "VUL");
        assert_eq!(ids(&registry), vec!["vul"]);
        let err = registry.set_state("lxx", LoadState::Loading).unwrap_err();
        assert!(matches!(err, LectioError::NotFound(_)));
    }

    #[test]
    fn test_unknown_translation() {
        let mut registry = catalog();
        let err = registry.set_shown("xx", true).unwrap_err();
        assert!(matches!(err, LectioError::NotFound(_)));
    }
}
