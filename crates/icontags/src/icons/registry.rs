//! The set of icons a page or tag can name.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use icontags_core::logging::targets;

use super::icon_image::IconImage;
use crate::error::{Error, Result};

/// Icon shown when a page names an icon that does not exist.
pub const NO_IMAGE: &str = "Error: icon has no image.";
/// Icon shown when a page (or its tags) names more than one icon.
pub const SEVERAL_ICONS: &str = "Error: not clear what icon to choose.";
/// Default icon for a page with children.
pub const FOLDER_ICON: &str = "_default_folder";
/// Default icon for a tagged page with children.
pub const FOLDER_TAGS_ICON: &str = "_default_folder_tags";
/// Default icon for a page without children.
pub const FILE_ICON: &str = "_default_file";
/// Default icon for a tagged page without children.
pub const FILE_TAGS_ICON: &str = "_default_file_tags";

/// Names that exist in every registry and cannot be picked by users.
pub const RESERVED_NAMES: [&str; 6] = [
    NO_IMAGE,
    SEVERAL_ICONS,
    FOLDER_ICON,
    FOLDER_TAGS_ICON,
    FILE_ICON,
    FILE_TAGS_ICON,
];

/// Extension of icon files in an icon directory.
pub const ICON_EXTENSION: &str = "png";

/// Stock images the host renders itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockIcon {
    MissingImage,
    DialogQuestion,
    Apply,
    Directory,
    File,
}

impl StockIcon {
    /// The host's identifier for this stock image.
    pub fn stock_id(self) -> &'static str {
        match self {
            StockIcon::MissingImage => "gtk-missing-image",
            StockIcon::DialogQuestion => "gtk-dialog-question",
            StockIcon::Apply => "gtk-apply",
            StockIcon::Directory => "gtk-directory",
            StockIcon::File => "gtk-file",
        }
    }
}

/// A renderable icon.
#[derive(Debug, Clone)]
pub enum IconHandle {
    /// A host stock image.
    Stock(StockIcon),
    /// An image loaded from the icon directory.
    Image(Arc<IconImage>),
}

impl PartialEq for IconHandle {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (IconHandle::Stock(a), IconHandle::Stock(b)) => a == b,
            (IconHandle::Image(a), IconHandle::Image(b)) => Arc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl Eq for IconHandle {}

/// Maps icon names to renderable icons.
///
/// Built once at startup and shared read-only afterwards. Names are
/// lower-case file stems from the icon directory plus a fixed set of
/// built-ins; a file whose stem matches a built-in replaces it.
#[derive(Debug, Clone)]
pub struct IconRegistry {
    icons: HashMap<String, IconHandle>,
    missing: IconHandle,
}

impl Default for IconRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl IconRegistry {
    /// A registry holding only the built-in icons.
    pub fn builtin() -> Self {
        let builtins = [
            (NO_IMAGE, StockIcon::MissingImage),
            (SEVERAL_ICONS, StockIcon::DialogQuestion),
            ("apply", StockIcon::Apply),
            (FOLDER_ICON, StockIcon::Directory),
            (FOLDER_TAGS_ICON, StockIcon::Directory),
            (FILE_ICON, StockIcon::File),
            (FILE_TAGS_ICON, StockIcon::File),
        ];

        Self {
            icons: builtins
                .into_iter()
                .map(|(name, stock)| (name.to_string(), IconHandle::Stock(stock)))
                .collect(),
            missing: IconHandle::Stock(StockIcon::MissingImage),
        }
    }

    /// Built-ins plus every icon found in `dir`.
    ///
    /// A missing or unreadable directory leaves just the built-ins; the
    /// failure is logged, never fatal.
    pub fn load(dir: Option<&Path>) -> Self {
        let mut registry = Self::builtin();
        let Some(dir) = dir else {
            tracing::debug!(target: targets::REGISTRY, "no icon directory, using built-ins");
            return registry;
        };

        match registry.load_dir(dir) {
            Ok(count) => {
                tracing::info!(target: targets::REGISTRY, dir = %dir.display(), count, "loaded icons");
            }
            Err(e) => {
                tracing::warn!(target: targets::REGISTRY, dir = %dir.display(), error = %e, "icon directory unavailable");
            }
        }
        registry
    }

    /// Built-ins plus the icons in [`default_icons_dir`](Self::default_icons_dir).
    pub fn load_default() -> Self {
        Self::load(Self::default_icons_dir().as_deref())
    }

    /// `<user data dir>/pixmaps/Tags_Icons`.
    pub fn default_icons_dir() -> Option<PathBuf> {
        ProjectDirs::from("org", "zim-wiki", "zim")
            .map(|dirs| dirs.data_dir().join("pixmaps").join("Tags_Icons"))
    }

    /// Add every `*.png` in `dir`, returning how many were loaded.
    ///
    /// Files that fail to decode are skipped with a warning.
    pub fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let entries = std::fs::read_dir(dir).map_err(|e| Error::io(dir, e))?;
        let mut loaded = 0;

        for entry in entries {
            let path = match entry {
                Ok(entry) => entry.path(),
                Err(e) => {
                    tracing::warn!(target: targets::REGISTRY, error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let Some(name) = icon_name_for(&path) else {
                continue;
            };

            match IconImage::from_path(&path) {
                Ok(image) => {
                    tracing::trace!(target: targets::REGISTRY, name = %name, "icon loaded");
                    self.icons.insert(name, IconHandle::Image(Arc::new(image)));
                    loaded += 1;
                }
                Err(e) => {
                    tracing::warn!(target: targets::REGISTRY, error = %e, "skipping icon");
                }
            }
        }
        Ok(loaded)
    }

    /// Register an icon under `name` (lower-cased).
    pub fn insert(&mut self, name: &str, handle: IconHandle) {
        self.icons.insert(name.to_lowercase(), handle);
    }

    /// Whether `name` is known.
    pub fn contains(&self, name: &str) -> bool {
        self.icons.contains_key(name)
    }

    /// The icon registered under `name`.
    pub fn get(&self, name: &str) -> Option<&IconHandle> {
        self.icons.get(name)
    }

    /// The icon registered under `name`, or the missing-image icon.
    pub fn lookup(&self, name: &str) -> &IconHandle {
        self.icons.get(name).unwrap_or(&self.missing)
    }

    /// Sorted names a user may choose for a tag or shortcode.
    pub fn pickable_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .icons
            .keys()
            .map(String::as_str)
            .filter(|name| !is_reserved(name))
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of registered names, built-ins included.
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Always false: the built-ins are never removed.
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }
}

/// Whether `name` is one of the built-in names users cannot pick.
pub fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

fn icon_name_for(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?;
    if !ext.eq_ignore_ascii_case(ICON_EXTENSION) {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    (!stem.is_empty()).then(|| stem.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(dir: &Path, file: &str) {
        image::RgbaImage::from_pixel(1, 1, image::Rgba([0, 0, 0, 255]))
            .save_with_format(dir.join(file), image::ImageFormat::Png)
            .unwrap();
    }

    #[test]
    fn test_builtins() {
        let registry = IconRegistry::builtin();
        for name in RESERVED_NAMES {
            assert!(registry.contains(name), "{name}");
        }
        assert_eq!(
            registry.get(SEVERAL_ICONS),
            Some(&IconHandle::Stock(StockIcon::DialogQuestion))
        );
        assert_eq!(registry.pickable_names(), vec!["apply"]);
    }

    #[test]
    fn test_lookup_unknown_is_missing() {
        let registry = IconRegistry::builtin();
        assert_eq!(
            registry.lookup("nonexistent"),
            &IconHandle::Stock(StockIcon::MissingImage)
        );
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn test_load_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "Calendar.png");
        write_png(dir.path(), "book.PNG");
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();
        std::fs::write(dir.path().join("broken.png"), "not an image").unwrap();

        let registry = IconRegistry::load(Some(dir.path()));
        assert!(registry.contains("calendar"));
        assert!(registry.contains("book"));
        assert!(!registry.contains("notes"));
        assert!(!registry.contains("broken"));
        assert!(matches!(registry.get("calendar"), Some(IconHandle::Image(_))));
        assert_eq!(registry.pickable_names(), vec!["apply", "book", "calendar"]);
    }

    #[test]
    fn test_file_overrides_builtin() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "_default_folder.png");
        write_png(dir.path(), "apply.png");

        let registry = IconRegistry::load(Some(dir.path()));
        assert!(matches!(registry.get(FOLDER_ICON), Some(IconHandle::Image(_))));
        assert!(matches!(registry.get("apply"), Some(IconHandle::Image(_))));
        assert!(!registry.pickable_names().contains(&FOLDER_ICON));
    }

    #[test]
    fn test_missing_dir_keeps_builtins() {
        let registry = IconRegistry::load(Some(Path::new("/nonexistent/icons")));
        assert_eq!(registry.len(), IconRegistry::builtin().len());

        let mut registry = IconRegistry::builtin();
        assert!(registry.load_dir(Path::new("/nonexistent/icons")).is_err());
    }

    #[test]
    fn test_is_reserved() {
        assert!(is_reserved(NO_IMAGE));
        assert!(is_reserved(FILE_TAGS_ICON));
        assert!(!is_reserved("apply"));
    }
}
