//! Persistence for review state.
//!
//! Everything is stored through a small key-value contract: one JSON value
//! per key. `JsonFileStore` keeps each key in `<data_dir>/<key>.json`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::models::{AppSettings, Flashcard, FlashcardStat, ReviewQueue, UserStats};

pub const CUSTOM_FLASHCARDS_KEY: &str = "custom-flashcards";
pub const FLASHCARD_STATS_KEY: &str = "flashcard-stats";
pub const USER_STATS_KEY: &str = "user-stats";
pub const SETTINGS_KEY: &str = "settings";
pub const REVIEW_QUEUE_KEY: &str = "review-queue";

const ALL_KEYS: [&str; 5] = [
    CUSTOM_FLASHCARDS_KEY,
    FLASHCARD_STATS_KEY,
    USER_STATS_KEY,
    SETTINGS_KEY,
    REVIEW_QUEUE_KEY,
];

const BACKUP_VERSION: u32 = 1;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported backup version: {0}")]
    UnsupportedBackup(u32),
}

pub type Result<T> = std::result::Result<T, StorageError>;

/// Durable mapping of string keys to JSON values.
pub trait KeyValueStore {
    /// `Ok(None)` when the key has never been written.
    fn get(&self, key: &str) -> Result<Option<Value>>;
    fn set(&mut self, key: &str, value: &Value) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// File-backed store, one pretty-printed JSON file per key.
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Get default storage location.
    pub fn default_path() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("streakcards")
    }

    fn key_path(&self, key: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(self.key_path(key), json)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.key_path(key);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

/// In-memory store holding raw JSON text, so corrupt values can be planted.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_raw(&mut self, key: &str, raw: &str) {
        self.entries.insert(key.to_string(), raw.to_string());
    }
}

#[cfg(test)]
impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        match self.entries.get(key) {
            Some(raw) => Ok(Some(serde_json::from_str(raw)?)),
            None => Ok(None),
        }
    }

    fn set(&mut self, key: &str, value: &Value) -> Result<()> {
        self.entries.insert(key.to_string(), serde_json::to_string(value)?);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Backup format containing every stored key.
#[derive(Debug, Serialize, Deserialize)]
pub struct Backup {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Local>,
    pub entries: BTreeMap<String, Value>,
}

/// Typed access to the review state kept in a [`KeyValueStore`].
///
/// Loads never fail: an absent or unreadable value yields its default.
pub struct SessionStore<S> {
    store: S,
}

impl<S: KeyValueStore> SessionStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    fn load_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.store.get(key) {
            Ok(Some(value)) => match serde_json::from_value(value) {
                Ok(parsed) => parsed,
                Err(e) => {
                    tracing::warn!(key, error = %e, "stored value has the wrong shape, using default");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(e) => {
                tracing::warn!(key, error = %e, "stored value is unreadable, using default");
                T::default()
            }
        }
    }

    fn save<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.store.set(key, &value)
    }

    pub fn load_custom_cards(&self) -> Vec<Flashcard> {
        self.load_or_default(CUSTOM_FLASHCARDS_KEY)
    }

    /// Append a custom card. Existing cards are never edited or removed.
    pub fn append_custom_card(&mut self, card: &Flashcard) -> Result<()> {
        let mut cards = self.load_custom_cards();
        cards.push(card.clone());
        self.save(CUSTOM_FLASHCARDS_KEY, &cards)
    }

    pub fn load_stat_log(&self) -> Vec<FlashcardStat> {
        self.load_or_default(FLASHCARD_STATS_KEY)
    }

    pub fn save_stat_log(&mut self, log: &[FlashcardStat]) -> Result<()> {
        self.save(FLASHCARD_STATS_KEY, log)
    }

    pub fn load_user_stats(&self) -> UserStats {
        let mut stats: UserStats = self.load_or_default(USER_STATS_KEY);
        stats.ensure_badges();
        stats
    }

    pub fn save_user_stats(&mut self, stats: &UserStats) -> Result<()> {
        self.save(USER_STATS_KEY, stats)
    }

    pub fn load_settings(&self) -> AppSettings {
        self.load_or_default(SETTINGS_KEY)
    }

    pub fn save_settings(&mut self, settings: &AppSettings) -> Result<()> {
        self.save(SETTINGS_KEY, settings)
    }

    pub fn load_queue(&self) -> ReviewQueue {
        self.load_or_default(REVIEW_QUEUE_KEY)
    }

    pub fn save_queue(&mut self, queue: &ReviewQueue) -> Result<()> {
        self.save(REVIEW_QUEUE_KEY, queue)
    }

    /// Remove every key (fresh start).
    pub fn clear(&mut self) -> Result<()> {
        for key in ALL_KEYS {
            self.store.remove(key)?;
        }
        Ok(())
    }

    /// Export all stored keys to a backup file. Returns the number of keys written.
    pub fn export_backup(&self, path: &Path) -> Result<usize> {
        let mut entries = BTreeMap::new();
        for key in ALL_KEYS {
            match self.store.get(key) {
                Ok(Some(value)) => {
                    entries.insert(key.to_string(), value);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "skipping unreadable key in backup"),
            }
        }

        let backup = Backup {
            version: BACKUP_VERSION,
            created_at: chrono::Local::now(),
            entries,
        };

        let json = serde_json::to_string_pretty(&backup)?;
        fs::write(path, json)?;

        Ok(backup.entries.len())
    }

    /// Restore keys from a backup file, overwriting current values.
    /// Unknown keys are ignored. Returns the number of keys restored.
    pub fn import_backup(&mut self, path: &Path) -> Result<usize> {
        let json = fs::read_to_string(path)?;
        let backup: Backup = serde_json::from_str(&json)?;
        if backup.version != BACKUP_VERSION {
            return Err(StorageError::UnsupportedBackup(backup.version));
        }

        let mut restored = 0;
        for (key, value) in &backup.entries {
            if ALL_KEYS.contains(&key.as_str()) {
                self.store.set(key, value)?;
                restored += 1;
            } else {
                tracing::debug!(key = %key, "ignoring unknown backup key");
            }
        }

        Ok(restored)
    }

    /// Import `question,answer` lines from a CSV file as custom cards in
    /// `category`. A leading header line mentioning "question" is skipped.
    pub fn import_csv(&mut self, csv_path: &Path, category: &str) -> Result<Vec<Flashcard>> {
        let content = fs::read_to_string(csv_path)?;
        let cards = parse_csv_cards(&content, category);

        if !cards.is_empty() {
            let mut stored = self.load_custom_cards();
            stored.extend(cards.iter().cloned());
            self.save(CUSTOM_FLASHCARDS_KEY, &stored)?;
        }

        Ok(cards)
    }

    /// Default backup path in the user's documents folder.
    pub fn default_backup_path() -> PathBuf {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join(format!("streakcards_backup_{}.json", timestamp))
    }
}

fn parse_csv_cards(content: &str, category: &str) -> Vec<Flashcard> {
    let mut cards = Vec::new();

    for (i, line) in content.lines().enumerate() {
        if i == 0 && line.to_lowercase().contains("question") {
            continue;
        }

        let mut parts = line.splitn(2, ',');
        let (Some(question), Some(answer)) = (parts.next(), parts.next()) else {
            continue;
        };

        let question = question.trim();
        let answer = answer.trim();
        if !question.is_empty() && !answer.is_empty() {
            cards.push(Flashcard::custom(
                question.to_string(),
                answer.to_string(),
                category.to_string(),
            ));
        }
    }

    cards
}
