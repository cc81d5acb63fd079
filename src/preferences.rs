//! Persisted reader preferences (SQLite key/value table, JSON values)

use crate::error::LectioError;
use crate::navigation::Selection;
use crate::query::SearchScope;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

pub const BASE_FONT_SCALE: f64 = 1.1;
pub const MIN_FONT_SCALE: f64 = 0.88;
pub const MAX_FONT_SCALE: f64 = 1.54;
pub const FONT_STEP: f64 = 0.055;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
    HighContrast,
}

fn round_scale(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub theme: Theme,
    pub manual_theme: bool,
    pub font_scale: f64,
    pub show_korean: bool,
    pub show_english: bool,
    pub show_japanese: bool,
    pub show_italian: bool,
    pub show_furigana: bool,
    pub japanese_data_allowed: bool,
    pub italian_data_allowed: bool,
    pub wake_lock_enabled: bool,
    pub search_scope: SearchScope,
    pub search_book_number: Option<u32>,
    pub selection: Option<Selection>,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            manual_theme: false,
            font_scale: BASE_FONT_SCALE,
            show_korean: true,
            show_english: true,
            show_japanese: false,
            show_italian: false,
            show_furigana: true,
            japanese_data_allowed: false,
            italian_data_allowed: false,
            wake_lock_enabled: false,
            search_scope: SearchScope::All,
            search_book_number: None,
            selection: None,
        }
    }
}

impl Preferences {
    pub fn set_font_scale(&mut self, v: f64) {
        self.font_scale = round_scale(v).clamp(MIN_FONT_SCALE, MAX_FONT_SCALE);
    }

    pub fn increase_font(&mut self) {
        self.set_font_scale(self.font_scale + FONT_STEP);
    }

    pub fn decrease_font(&mut self) {
        self.set_font_scale(self.font_scale - FONT_STEP);
    }

    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Light => Theme::Dark,
            Theme::Dark | Theme::HighContrast => Theme::Light,
        };
        self.manual_theme = true;
    }

    /// Reading aids above Japanese text.
    pub fn toggle_furigana(&mut self) -> bool {
        self.show_furigana = !self.show_furigana;
        self.show_furigana
    }

    /// Keep the screen awake while reading.
    pub fn toggle_wake_lock(&mut self) -> bool {
        self.wake_lock_enabled = !self.wake_lock_enabled;
        self.wake_lock_enabled
    }

    /// Display toggle for a catalog translation id.
    pub fn shown(&self, id: &str) -> Option<bool> {
        match id {
            "kor" => Some(self.show_korean),
            "kjv" => Some(self.show_english),
            "ja" => Some(self.show_japanese),
            "ita" => Some(self.show_italian),
            _ => None,
        }
    }

    pub fn set_shown(&mut self, id: &str, shown: bool) {
        match id {
            "kor" => self.show_korean = shown,
            "kjv" => self.show_english = shown,
            "ja" => self.show_japanese = shown,
            "ita" => self.show_italian = shown,
            _ => {}
        }
    }

    /// Data consent for a catalog translation id; non-optional ones are always allowed.
    pub fn allowed(&self, id: &str) -> bool {
        match id {
            "ja" => self.japanese_data_allowed,
            "ita" => self.italian_data_allowed,
            _ => true,
        }
    }

    pub fn set_allowed(&mut self, id: &str, allowed: bool) {
        match id {
            "ja" => self.japanese_data_allowed = allowed,
            "ita" => self.italian_data_allowed = allowed,
            _ => {}
        }
        if !allowed {
            self.set_shown(id, false);
        }
    }

    /// Stored scales of exactly 1.0 predate the 1.1 base and are moved to it.
    fn normalize(&mut self) {
        if (self.font_scale - 1.0).abs() < 0.0005 {
            self.font_scale = BASE_FONT_SCALE;
        }
        let scale = self.font_scale;
        self.set_font_scale(scale);
        if !self.japanese_data_allowed {
            self.show_japanese = false;
        }
        if !self.italian_data_allowed {
            self.show_italian = false;
        }
    }
}

pub struct PreferenceStore {
    db_path: PathBuf,
}

impl PreferenceStore {
    /// Open (creating if missing) the settings database.
    pub fn open(db_path: impl Into<PathBuf>) -> Result<Self, LectioError> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    LectioError::Database(format!("cannot create {:?}: {}", parent, e))
                })?;
            }
        }
        let store = Self { db_path };
        store.connection()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS app_settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    fn connection(&self) -> Result<Connection, LectioError> {
        Ok(Connection::open(&self.db_path)?)
    }

    pub fn get_setting(&self, key: &str) -> Result<Option<String>, LectioError> {
        let conn = self.connection()?;
        let value = conn
            .query_row(
                "SELECT value FROM app_settings WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    pub fn set_setting(&self, key: &str, value: &str) -> Result<(), LectioError> {
        let conn = self.connection()?;
        conn.execute(
            "INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)",
            rusqlite::params![key, value],
        )?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, LectioError> {
        let Some(raw) = self.get_setting(key)? else {
            return Ok(default);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(key = %key, error = %e, "ignoring malformed stored preference");
                Ok(default)
            }
        }
    }

    pub fn load(&self) -> Result<Preferences, LectioError> {
        let d = Preferences::default();
        let mut prefs = Preferences {
            theme: self.read("theme", d.theme)?,
            manual_theme: self.read("manual_theme", d.manual_theme)?,
            font_scale: self.read("font_scale", d.font_scale)?,
            show_korean: self.read("show_korean", d.show_korean)?,
            show_english: self.read("show_english", d.show_english)?,
            show_japanese: self.read("show_japanese", d.show_japanese)?,
            show_italian: self.read("show_italian", d.show_italian)?,
            show_furigana: self.read("show_furigana", d.show_furigana)?,
            japanese_data_allowed: self.read("japanese_data_allowed", d.japanese_data_allowed)?,
            italian_data_allowed: self.read("italian_data_allowed", d.italian_data_allowed)?,
            wake_lock_enabled: self.read("wake_lock_enabled", d.wake_lock_enabled)?,
            search_scope: self.read("search_scope", d.search_scope)?,
            search_book_number: self.read("search_book_number", d.search_book_number)?,
            selection: self.read("selection", d.selection)?,
        };
        prefs.normalize();
        Ok(prefs)
    }

    pub fn save(&self, prefs: &Preferences) -> Result<(), LectioError> {
        let mut conn = self.connection()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT OR REPLACE INTO app_settings (key, value) VALUES (?1, ?2)")?;
            let entries: [(&str, serde_json::Value); 14] = [
                ("theme", serde_json::to_value(prefs.theme)?),
                ("manual_theme", prefs.manual_theme.into()),
                ("font_scale", prefs.font_scale.into()),
                ("show_korean", prefs.show_korean.into()),
                ("show_english", prefs.show_english.into()),
                ("show_japanese", prefs.show_japanese.into()),
                ("show_italian", prefs.show_italian.into()),
                ("show_furigana", prefs.show_furigana.into()),
                ("japanese_data_allowed", prefs.japanese_data_allowed.into()),
                ("italian_data_allowed", prefs.italian_data_allowed.into()),
                ("wake_lock_enabled", prefs.wake_lock_enabled.into()),
                ("search_scope", serde_json::to_value(prefs.search_scope)?),
                ("search_book_number", serde_json::to_value(prefs.search_book_number)?),
                ("selection", serde_json::to_value(prefs.selection)?),
            ];
            for (key, value) in entries {
                stmt.execute(rusqlite::params![key, value.to_string()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}
