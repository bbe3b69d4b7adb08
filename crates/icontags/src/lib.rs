//! IconTags - per-page icons for a notebook page tree.
//!
//! Pages pick their icon with an `[ICON=name]` shortcode written in strong
//! text, or inherit one from their tags. This crate holds everything behind
//! the page pane except the widgets:
//!
//! - **Shortcodes**: extracting the icon name from a page's formatted text
//! - **Icon registry**: built-in icons plus the user's icon folder
//! - **Icon index**: the `iconlist` table in the host's index database
//! - **Indexer**: keeps that table in sync with page edits
//! - **Resolution**: choosing icon, label and tooltip for a row, with a cache
//! - **Tree models**: the page hierarchy, optionally filtered to tagged pages
//! - **Settings**: persisted UI state and the tag → icon map
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use icontags::prelude::*;
//!
//! fn attach(host: PluginHost) -> icontags::Result<IconTagsPlugin> {
//!     let registry = Arc::new(IconRegistry::load_default());
//!     let ui = Arc::new(UiState::load("state.json")?);
//!     IconTagsPlugin::new(host, registry, ui, PluginPreferences::default())
//! }
//! ```

pub mod cache;
mod error;
pub mod host;
pub mod icons;
pub mod index;
pub mod indexer;
pub mod model;
pub mod page;
pub mod plugin;
pub mod prelude;
pub mod resolve;
pub mod settings;
pub mod shortcode;
pub mod tags_manager;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use icontags_core::{EventLoop, Signal, Subscriptions};
pub use page::{PageId, PageRecord};
pub use plugin::{IconTagsPlugin, PluginHost};
