// Link previewer Settings Store
// Loads, updates and resets preview settings. Every key is persisted as a JSON
// value in the `storage_local` table and every effective change is broadcast
// to subscribers.

use std::path::PathBuf;

use rusqlite::params;
use serde_json::{Map, Value};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::database::Database;
use crate::platform;
use crate::types::errors::SettingsError;
use crate::types::settings::{PreviewSettings, SettingsChange};

/// Capacity of the change-notification channel.
const CHANGE_CHANNEL_CAPACITY: usize = 32;

/// Trait defining the settings store interface.
pub trait SettingsEngineTrait {
    fn load(&mut self) -> Result<PreviewSettings, SettingsError>;
    fn get_settings(&self) -> &PreviewSettings;
    fn set_value(&mut self, key: &str, value: Value) -> Result<Vec<SettingsChange>, SettingsError>;
    fn set_many(&mut self, values: &[(String, Value)]) -> Result<Vec<SettingsChange>, SettingsError>;
    fn apply_external_changes(&mut self, changes: &[SettingsChange]) -> Result<(), SettingsError>;
    fn reset(&mut self) -> Result<Vec<SettingsChange>, SettingsError>;
    fn subscribe(&self) -> broadcast::Receiver<Vec<SettingsChange>>;
}

/// Settings store backed by the SQLite storage area.
pub struct SettingsEngine {
    db: Database,
    settings: PreviewSettings,
    notifier: broadcast::Sender<Vec<SettingsChange>>,
}

impl SettingsEngine {
    /// Creates a store over an already opened database. Call [`load`](SettingsEngineTrait::load)
    /// to pick up persisted values; until then defaults are served.
    pub fn new(db: Database) -> Self {
        let (notifier, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            db,
            settings: PreviewSettings::default(),
            notifier,
        }
    }

    /// Opens the storage database at `path_override`, or at
    /// `<data dir>/storage.db` when `None`, and loads it.
    pub fn open(path_override: Option<PathBuf>) -> Result<Self, SettingsError> {
        let path = path_override.unwrap_or_else(Self::default_storage_path);
        let db = Database::open(&path)?;
        let mut engine = Self::new(db);
        engine.load()?;
        Ok(engine)
    }

    pub fn default_storage_path() -> PathBuf {
        platform::get_data_dir().join("storage.db")
    }

    /// Returns true if previews are disabled on `host`.
    pub fn is_site_disabled(&self, host: &str) -> bool {
        self.settings.is_site_disabled(host)
    }

    fn settings_map(&self) -> Result<Map<String, Value>, SettingsError> {
        match serde_json::to_value(&self.settings) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(SettingsError::SerializationError(
                "settings did not serialize to an object".to_string(),
            )),
            Err(e) => Err(SettingsError::SerializationError(e.to_string())),
        }
    }

    /// Applies `values` to the in-memory map, returning the validated settings
    /// and the list of keys that actually changed.
    fn merge(
        &self,
        values: &[(String, Value)],
    ) -> Result<(PreviewSettings, Vec<SettingsChange>), SettingsError> {
        let mut map = self.settings_map()?;
        let mut changes = Vec::new();
        for (key, value) in values {
            if !map.contains_key(key) {
                return Err(SettingsError::InvalidKey(key.clone()));
            }
            let old = map.insert(key.clone(), value.clone());
            if old.as_ref() != Some(value) {
                changes.push(SettingsChange {
                    key: key.clone(),
                    old_value: old,
                    new_value: value.clone(),
                });
            }
        }
        let settings: PreviewSettings = serde_json::from_value(Value::Object(map))
            .map_err(|e| SettingsError::InvalidValue(e.to_string()))?;
        Ok((settings, changes))
    }

    fn notify(&self, changes: &[SettingsChange]) {
        if changes.is_empty() {
            return;
        }
        let keys: Vec<&str> = changes.iter().map(|c| c.key.as_str()).collect();
        debug!(?keys, "settings changed");
        // No subscribers is fine.
        let _ = self.notifier.send(changes.to_vec());
    }
}

impl SettingsEngineTrait for SettingsEngine {
    /// Loads stored keys over the defaults.
    ///
    /// Unknown keys are ignored. A stored value of the wrong shape is a
    /// serialization error.
    fn load(&mut self) -> Result<PreviewSettings, SettingsError> {
        let stored: Vec<(String, String)> = {
            let conn = self.db.connection();
            let mut stmt = conn.prepare("SELECT key, value FROM storage_local")?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row?);
            }
            out
        };

        let mut map = match serde_json::to_value(PreviewSettings::default()) {
            Ok(Value::Object(map)) => map,
            _ => {
                return Err(SettingsError::SerializationError(
                    "defaults did not serialize to an object".to_string(),
                ))
            }
        };
        for (key, raw) in stored {
            if !PreviewSettings::KEYS.contains(&key.as_str()) {
                warn!(%key, "ignoring unknown storage key");
                continue;
            }
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                SettingsError::SerializationError(format!("Failed to parse '{}': {}", key, e))
            })?;
            map.insert(key, value);
        }

        self.settings = serde_json::from_value(Value::Object(map))
            .map_err(|e| SettingsError::SerializationError(e.to_string()))?;
        Ok(self.settings.clone())
    }

    fn get_settings(&self) -> &PreviewSettings {
        &self.settings
    }

    /// Updates a single storage key such as `"duration"` or `"userTop"`.
    fn set_value(&mut self, key: &str, value: Value) -> Result<Vec<SettingsChange>, SettingsError> {
        if key.is_empty() {
            return Err(SettingsError::InvalidKey("Key cannot be empty".to_string()));
        }
        self.set_many(&[(key.to_string(), value)])
    }

    /// Updates several keys in one transaction. Either all keys are written or none.
    fn set_many(&mut self, values: &[(String, Value)]) -> Result<Vec<SettingsChange>, SettingsError> {
        let (settings, changes) = self.merge(values)?;

        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;
        let tx = self.db.connection_mut().transaction()?;
        for (key, value) in values {
            tx.execute(
                "INSERT INTO storage_local (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value.to_string(), now],
            )?;
        }
        tx.commit()?;

        self.settings = settings;
        self.notify(&changes);
        Ok(changes)
    }

    /// Mirrors changes written by another context without writing them again.
    fn apply_external_changes(&mut self, changes: &[SettingsChange]) -> Result<(), SettingsError> {
        let values: Vec<(String, Value)> = changes
            .iter()
            .filter(|c| PreviewSettings::KEYS.contains(&c.key.as_str()))
            .map(|c| (c.key.clone(), c.new_value.clone()))
            .collect();
        let (settings, applied) = self.merge(&values)?;
        self.settings = settings;
        self.notify(&applied);
        Ok(())
    }

    /// Clears the storage area and restores defaults.
    fn reset(&mut self) -> Result<Vec<SettingsChange>, SettingsError> {
        let before = self.settings_map()?;
        self.db.connection().execute("DELETE FROM storage_local", [])?;
        self.settings = PreviewSettings::default();
        let after = self.settings_map()?;

        let changes: Vec<SettingsChange> = after
            .into_iter()
            .filter(|(key, value)| before.get(key) != Some(value))
            .map(|(key, value)| SettingsChange {
                old_value: before.get(&key).cloned(),
                key,
                new_value: value,
            })
            .collect();
        self.notify(&changes);
        Ok(changes)
    }

    fn subscribe(&self) -> broadcast::Receiver<Vec<SettingsChange>> {
        self.notifier.subscribe()
    }
}
