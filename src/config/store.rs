//! Named-property store with a change-notification feed.
//!
//! # Responsibilities
//! - Hold configuration overrides as a flat `name → value` map
//! - Persist overrides to a TOML file (defaults are never written)
//! - Dispatch `Set`/`Deleted` events to subscribers on every mutation
//! - Replay external file edits as the same events (see `watcher.rs`)

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tokio::sync::mpsc;
use toml::Value;

/// Error type for opening or reloading the property file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read property file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse property file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// A change to a single named setting.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyEvent {
    /// The setting was set to an explicit value.
    Set { name: String, value: Value },
    /// The override was removed; the compiled-in default applies again.
    Deleted { name: String },
}

/// File-backed store of configuration overrides.
///
/// Reads fall back to a caller-supplied default when no override exists,
/// so a missing file and an empty file behave identically. All mutations
/// go through [`set`](Self::set) and [`delete`](Self::delete), which
/// rewrite the backing file and notify subscribers.
pub struct PropertyStore {
    path: Option<PathBuf>,
    inner: Mutex<Inner>,
}

struct Inner {
    values: BTreeMap<String, Value>,
    subscribers: Vec<mpsc::UnboundedSender<PropertyEvent>>,
}

impl PropertyStore {
    /// Open the store backed by a TOML file. A missing file is created
    /// empty so that it can be watched for edits right away.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let values = if path.exists() {
            parse_properties(&fs::read_to_string(path)?)?
        } else {
            fs::write(path, "")?;
            BTreeMap::new()
        };
        Ok(Self {
            path: Some(path.to_path_buf()),
            inner: Mutex::new(Inner {
                values,
                subscribers: Vec::new(),
            }),
        })
    }

    /// An unpersisted store, for embedding and tests.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(Inner {
                values: BTreeMap::new(),
                subscribers: Vec::new(),
            }),
        }
    }

    /// Path of the backing file, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_bool(&self, name: &str, default: bool) -> bool {
        self.lock()
            .values
            .get(name)
            .and_then(bool_value)
            .unwrap_or(default)
    }

    pub fn get_int(&self, name: &str, default: i64) -> i64 {
        self.lock()
            .values
            .get(name)
            .and_then(int_value)
            .unwrap_or(default)
    }

    pub fn get_string(&self, name: &str) -> Option<String> {
        self.lock()
            .values
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    /// Whether an explicit override exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.lock().values.contains_key(name)
    }

    /// Set an override and notify subscribers.
    pub fn set(&self, name: &str, value: impl Into<Value>) {
        let value = value.into();
        let snapshot = {
            let mut inner = self.lock();
            inner.values.insert(name.to_string(), value.clone());
            dispatch(
                &mut inner,
                PropertyEvent::Set {
                    name: name.to_string(),
                    value,
                },
            );
            inner.values.clone()
        };
        self.persist(&snapshot);
    }

    /// Remove an override and notify subscribers. Removing an absent
    /// override is a no-op.
    pub fn delete(&self, name: &str) {
        let snapshot = {
            let mut inner = self.lock();
            if inner.values.remove(name).is_none() {
                return;
            }
            dispatch(
                &mut inner,
                PropertyEvent::Deleted {
                    name: name.to_string(),
                },
            );
            inner.values.clone()
        };
        self.persist(&snapshot);
    }

    /// Subscribe to the change feed. Only mutations after this call are
    /// delivered.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<PropertyEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.lock().subscribers.push(tx);
        rx
    }

    /// Re-read the backing file and replay the difference as events.
    ///
    /// Used when the file was edited outside this process. Mutations made
    /// through the store itself round-trip to an identical map, so they
    /// produce no duplicate events here.
    pub fn reload_from_disk(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let fresh = if path.exists() {
            parse_properties(&fs::read_to_string(path)?)?
        } else {
            BTreeMap::new()
        };

        let mut inner = self.lock();
        let stale: Vec<String> = inner
            .values
            .keys()
            .filter(|name| !fresh.contains_key(*name))
            .cloned()
            .collect();
        let changed: Vec<(String, Value)> = fresh
            .iter()
            .filter(|(name, value)| inner.values.get(*name) != Some(value))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();

        inner.values = fresh;
        for name in stale {
            dispatch(&mut inner, PropertyEvent::Deleted { name });
        }
        for (name, value) in changed {
            dispatch(&mut inner, PropertyEvent::Set { name, value });
        }
        Ok(())
    }

    fn persist(&self, values: &BTreeMap<String, Value>) {
        let Some(path) = &self.path else {
            return;
        };
        let mut table = toml::Table::new();
        for (name, value) in values {
            table.insert(name.clone(), value.clone());
        }
        match toml::to_string_pretty(&table) {
            Ok(rendered) => {
                if let Err(e) = fs::write(path, rendered) {
                    tracing::error!(path = ?path, error = %e, "Failed to persist properties");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize properties");
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn dispatch(inner: &mut Inner, event: PropertyEvent) {
    inner
        .subscribers
        .retain(|tx| tx.send(event.clone()).is_ok());
}

/// Boolean reads tolerate string-typed overrides; a string that is not
/// literally `true` reads as false, so garbage can never switch a
/// service on.
pub fn bool_value(value: &Value) -> Option<bool> {
    value
        .as_bool()
        .or_else(|| value.as_str().map(|s| s.trim().eq_ignore_ascii_case("true")))
}

/// Integer reads tolerate string-typed overrides from hand-edited files.
pub fn int_value(value: &Value) -> Option<i64> {
    value
        .as_integer()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Parse a TOML document into a flat dotted-key map, so that
/// `httpbind.port.plain = 8080` and `"httpbind.port.plain" = 8080` read
/// the same way.
fn parse_properties(content: &str) -> Result<BTreeMap<String, Value>, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;
    let mut out = BTreeMap::new();
    flatten(table, "", &mut out);
    Ok(out)
}

fn flatten(table: toml::Table, prefix: &str, out: &mut BTreeMap<String, Value>) {
    for (key, value) in table {
        let name = if prefix.is_empty() {
            key
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Value::Table(nested) => flatten(nested, &name, out),
            other => {
                out.insert(name, other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::*;

    #[test]
    fn missing_settings_fall_back_to_defaults() {
        let store = PropertyStore::in_memory();
        assert!(store.get_bool(HTTP_BIND_ENABLED, HTTP_BIND_ENABLED_DEFAULT));
        assert_eq!(
            store.get_int(HTTP_BIND_PORT, HTTP_BIND_PORT_DEFAULT),
            8080
        );
        assert_eq!(
            store.get_int(HTTP_BIND_SECURE_PORT, HTTP_BIND_SECURE_PORT_DEFAULT),
            8483
        );
        assert_eq!(store.get_string(BIND_INTERFACE), None);
    }

    #[test]
    fn mutations_notify_subscribers() {
        let store = PropertyStore::in_memory();
        let mut feed = store.subscribe();

        store.set(HTTP_BIND_PORT, 9090_i64);
        store.delete(HTTP_BIND_PORT);
        store.delete(HTTP_BIND_PORT); // absent override, no event

        assert_eq!(
            feed.try_recv().unwrap(),
            PropertyEvent::Set {
                name: HTTP_BIND_PORT.to_string(),
                value: Value::Integer(9090),
            }
        );
        assert_eq!(
            feed.try_recv().unwrap(),
            PropertyEvent::Deleted {
                name: HTTP_BIND_PORT.to_string(),
            }
        );
        assert!(feed.try_recv().is_err());
    }

    #[test]
    fn overrides_round_trip_through_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpbind.toml");

        let store = PropertyStore::open(&path).unwrap();
        store.set(HTTP_BIND_PORT, 9090_i64);
        store.set(BIND_INTERFACE, "127.0.0.1");

        let reopened = PropertyStore::open(&path).unwrap();
        assert_eq!(reopened.get_int(HTTP_BIND_PORT, 8080), 9090);
        assert_eq!(
            reopened.get_string(BIND_INTERFACE).as_deref(),
            Some("127.0.0.1")
        );
    }

    #[test]
    fn reload_replays_external_edits_as_events() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("httpbind.toml");

        let store = PropertyStore::open(&path).unwrap();
        store.set(HTTP_BIND_PORT, 9090_i64);
        let mut feed = store.subscribe();

        // External edit: the plain port override goes away and a secure
        // override appears, using an unquoted dotted key.
        std::fs::write(&path, "httpbind.port.secure = 9443\n").unwrap();
        store.reload_from_disk().unwrap();

        assert_eq!(
            feed.try_recv().unwrap(),
            PropertyEvent::Deleted {
                name: HTTP_BIND_PORT.to_string(),
            }
        );
        assert_eq!(
            feed.try_recv().unwrap(),
            PropertyEvent::Set {
                name: HTTP_BIND_SECURE_PORT.to_string(),
                value: Value::Integer(9443),
            }
        );
        assert_eq!(store.get_int(HTTP_BIND_PORT, 8080), 8080);
    }

    #[test]
    fn string_typed_ports_still_parse() {
        let store = PropertyStore::in_memory();
        store.set(HTTP_BIND_PORT, "9090");
        assert_eq!(store.get_int(HTTP_BIND_PORT, 8080), 9090);
    }

    #[test]
    fn garbage_boolean_overrides_read_as_false() {
        let store = PropertyStore::in_memory();
        store.set(HTTP_BIND_ENABLED, "TRUE");
        assert!(store.get_bool(HTTP_BIND_ENABLED, false));

        store.set(HTTP_BIND_ENABLED, "definitely");
        assert!(!store.get_bool(HTTP_BIND_ENABLED, true));
    }
}
