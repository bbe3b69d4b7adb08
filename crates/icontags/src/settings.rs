//! Persistent UI state and plugin preferences.
//!
//! [`UiState`] is the per-notebook JSON document the pane and the Tags
//! Manager read and write. [`PluginPreferences`] is the user-facing
//! configuration applied by the plugin.

use std::collections::{BTreeMap, HashSet};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use icontags_core::Signal;
use icontags_core::logging::targets;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::icons::IconRegistry;

/// Key of the tag → icon map.
pub const ICONS_FOR_TAGS_KEY: &str = "Icons for Tags";
/// Key of the "show tags next to page names" toggle.
pub const SHOW_TAGS_KEY: &str = "show tags";
/// Key of the [`OpenPagesMode`].
pub const OPEN_PAGES_KEY: &str = "Open pages";
/// Key of the tagged-only filter toggle.
pub const SHOW_TAGGED_KEY: &str = "show tagged";

/// What the pane does when the host opens a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenPagesMode {
    /// Select the page and expand its ancestors.
    #[default]
    Default,
    /// Collapse everything first, then select and expand.
    Collapse,
    /// Select only; never expand.
    Disable,
}

/// The user's tag → icon preferences.
///
/// Ordered by tag so saved files are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagIconMap(BTreeMap<String, String>);

impl TagIconMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The icon chosen for `tag`.
    pub fn get(&self, tag: &str) -> Option<&str> {
        self.0.get(tag).map(String::as_str)
    }

    /// Choose `icon` for `tag`, returning the previous choice.
    pub fn set(&mut self, tag: impl Into<String>, icon: impl Into<String>) -> Option<String> {
        self.0.insert(tag.into(), icon.into())
    }

    /// Forget the choice for `tag`.
    pub fn remove(&mut self, tag: &str) -> Option<String> {
        self.0.remove(tag)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `(tag, icon)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(tag, icon)| (tag.as_str(), icon.as_str()))
    }

    /// Drop entries whose tag no longer exists or whose icon is not in the
    /// registry. Returns how many were dropped.
    pub fn prune(&mut self, existing_tags: &HashSet<String>, registry: &IconRegistry) -> usize {
        let before = self.0.len();
        self.0
            .retain(|tag, icon| existing_tags.contains(tag) && registry.contains(icon));
        before - self.0.len()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for TagIconMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// UI state persisted as one JSON object.
///
/// Unknown keys are kept and written back on save. Every mutation fires
/// [`changed`](Self::changed) with the key, and is written to disk right away
/// when the state was loaded from (or bound to) a file.
pub struct UiState {
    values: RwLock<Map<String, Value>>,
    path: RwLock<Option<PathBuf>>,
    changed: Arc<Signal<String>>,
}

impl Default for UiState {
    fn default() -> Self {
        Self::new()
    }
}

impl UiState {
    /// Empty state, not bound to a file.
    pub fn new() -> Self {
        Self::from_values(Map::new())
    }

    fn from_values(values: Map<String, Value>) -> Self {
        Self {
            values: RwLock::new(values),
            path: RwLock::new(None),
            changed: Arc::new(Signal::new()),
        }
    }

    /// Load from `path` and bind to it. A missing file gives empty state.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let values = match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Value>(&content) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(Error::settings(path, "expected a JSON object")),
                Err(e) => return Err(Error::settings(path, e.to_string())),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: targets::SETTINGS, path = %path.display(), "no UI state yet");
                Map::new()
            }
            Err(e) => return Err(Error::io(path, e)),
        };

        let state = Self::from_values(values);
        *state.path.write() = Some(path.to_path_buf());
        Ok(state)
    }

    /// Write to `path` atomically (temp file in the same directory, then rename).
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&*self.values.read())
            .map_err(|e| Error::settings(path, e.to_string()))?;

        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| Error::io(file.path(), e))?;
        file.persist(path).map_err(|e| Error::io(path, e.error))?;
        Ok(())
    }

    /// Write to the bound file, if any.
    pub fn save(&self) -> Result<()> {
        let path = self.path.read().clone();
        match path {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    /// Bind to `path` so later mutations are saved there.
    pub fn bind(&self, path: impl Into<PathBuf>) {
        *self.path.write() = Some(path.into());
    }

    /// Fires with the key of every mutated value.
    pub fn changed(&self) -> &Arc<Signal<String>> {
        &self.changed
    }

    /// Whether `key` has a stored value.
    pub fn contains(&self, key: &str) -> bool {
        self.values.read().contains_key(key)
    }

    /// Deserialize `key`, or `default` when it is missing or malformed.
    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let value = self.values.read().get(key).cloned();
        match value {
            None => default,
            Some(value) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(target: targets::SETTINGS, key, error = %e, "ignoring malformed UI state value");
                default
            }),
        }
    }

    /// Serialize `value` under `key`.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| Error::settings(key, e.to_string()))?;
        self.values.write().insert(key.to_string(), value);
        self.changed.emit(key.to_string());
        self.autosave();
        Ok(())
    }

    pub fn icons_for_tags(&self) -> TagIconMap {
        self.get_or(ICONS_FOR_TAGS_KEY, TagIconMap::new())
    }

    pub fn set_icons_for_tags(&self, map: &TagIconMap) -> Result<()> {
        self.set(ICONS_FOR_TAGS_KEY, map)
    }

    pub fn show_tags(&self) -> bool {
        self.get_or(SHOW_TAGS_KEY, false)
    }

    pub fn set_show_tags(&self, show: bool) -> Result<()> {
        self.set(SHOW_TAGS_KEY, &show)
    }

    pub fn open_pages(&self) -> OpenPagesMode {
        self.get_or(OPEN_PAGES_KEY, OpenPagesMode::default())
    }

    pub fn set_open_pages(&self, mode: OpenPagesMode) -> Result<()> {
        self.set(OPEN_PAGES_KEY, &mode)
    }

    pub fn show_tagged(&self) -> bool {
        self.get_or(SHOW_TAGGED_KEY, false)
    }

    pub fn set_show_tagged(&self, show: bool) -> Result<()> {
        self.set(SHOW_TAGGED_KEY, &show)
    }

    /// Prune the stored tag → icon map against the current tags and
    /// registry, saving it back only if anything was dropped.
    pub fn prune_icons_for_tags(
        &self,
        existing_tags: &HashSet<String>,
        registry: &IconRegistry,
    ) -> Result<TagIconMap> {
        let mut map = self.icons_for_tags();
        let dropped = map.prune(existing_tags, registry);
        if dropped > 0 {
            tracing::info!(target: targets::SETTINGS, dropped, "pruned stale tag icons");
            self.set_icons_for_tags(&map)?;
        }
        Ok(map)
    }

    fn autosave(&self) {
        if let Err(e) = self.save() {
            tracing::error!(target: targets::SETTINGS, error = %e, "failed to save UI state");
        }
    }
}

impl std::fmt::Debug for UiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UiState")
            .field("keys", &self.values.read().len())
            .field("path", &*self.path.read())
            .finish()
    }
}

/// Where the pane sits in the main window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanePosition {
    #[default]
    Left,
    Right,
    Top,
    Bottom,
}

/// User preferences of the plugin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginPreferences {
    /// Position of the page pane.
    pub pane: PanePosition,
    /// Draw tree lines in the pane.
    pub show_lines: bool,
    /// Index icon shortcodes in page content.
    pub enable_indexing: bool,
}

impl PluginPreferences {
    /// Parse preferences from JSON; missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::settings("<preferences>", e.to_string()))
    }
}
