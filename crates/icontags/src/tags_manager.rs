//! Logic of the Tags Manager dialog.
//!
//! The dialog lists every tag with its icon and page count, lets the user
//! assign icons to tags, and shows the pages of a selected tag. Edits are
//! made on a copy of the preference map and only written back on
//! [`TagsManager::confirm`].

use std::sync::Arc;

use icontags_core::Subscriptions;
use icontags_core::logging::targets;
use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::host::{HostEvents, Notebook};
use crate::icons::{IconRegistry, is_reserved};
use crate::page::PageId;
use crate::settings::{TagIconMap, UiState};

/// One row of the tags list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRow {
    pub tag: String,
    /// Icon assigned to the tag in the pending edits.
    pub icon: Option<String>,
    /// Number of pages carrying the tag.
    pub pages: usize,
}

/// One row of the pages list of a tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRow {
    pub page: PageId,
    /// Number of tags on the page.
    pub tag_count: usize,
    /// The page's tags, the selected tag first.
    pub tags: String,
}

/// Which list the dialog shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManagerView {
    #[default]
    Tags,
    Pages,
}

struct ManagerState {
    original: TagIconMap,
    pending: TagIconMap,
    tag_rows: Vec<TagRow>,
    selected_tag: Option<String>,
    view: ManagerView,
}

/// Dialog state for managing tag icons.
pub struct TagsManager {
    notebook: Arc<dyn Notebook>,
    registry: Arc<IconRegistry>,
    state: Arc<Mutex<ManagerState>>,
    subscriptions: Subscriptions,
}

impl TagsManager {
    /// Open the dialog on the current preferences and follow tag creation
    /// and deletion until closed.
    pub fn open(
        notebook: Arc<dyn Notebook>,
        registry: Arc<IconRegistry>,
        ui: &UiState,
        events: &HostEvents,
    ) -> Self {
        let original = ui.icons_for_tags();
        let tag_rows = build_tag_rows(notebook.as_ref(), &original);
        let state = Arc::new(Mutex::new(ManagerState {
            pending: original.clone(),
            original,
            tag_rows,
            selected_tag: None,
            view: ManagerView::Tags,
        }));

        let mut subscriptions = Subscriptions::new();
        for signal in [&events.tag_created, &events.tag_deleted] {
            let notebook = notebook.clone();
            let state = state.clone();
            subscriptions.push(signal.connect_scoped(move |tag: &String| {
                tracing::debug!(target: targets::PLUGIN, tag = %tag, "tag list changed");
                let mut state = state.lock();
                let rows = build_tag_rows(notebook.as_ref(), &state.pending);
                state.tag_rows = rows;
            }));
        }

        Self {
            notebook,
            registry,
            state,
            subscriptions,
        }
    }

    /// Tags sorted by page count (most first), then by name.
    pub fn tag_rows(&self) -> Vec<TagRow> {
        self.state.lock().tag_rows.clone()
    }

    /// Re-read the tags from the host.
    pub fn refresh(&self) {
        let mut state = self.state.lock();
        let rows = build_tag_rows(self.notebook.as_ref(), &state.pending);
        state.tag_rows = rows;
    }

    /// Icon names offered for tags.
    pub fn pickable_icons(&self) -> Vec<String> {
        self.registry
            .pickable_names()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// The pending icon of `tag`.
    pub fn icon_for(&self, tag: &str) -> Option<String> {
        self.state.lock().pending.get(tag).map(str::to_string)
    }

    /// Assign `icon` to `tag`, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidIconName`] if the icon is unknown or reserved.
    pub fn set_icon(&self, tag: &str, icon: Option<&str>) -> Result<()> {
        if let Some(icon) = icon
            && (is_reserved(icon) || !self.registry.contains(icon))
        {
            return Err(Error::InvalidIconName(icon.to_string()));
        }

        let mut state = self.state.lock();
        match icon {
            Some(icon) => {
                state.pending.set(tag, icon);
            }
            None => {
                state.pending.remove(tag);
            }
        }
        if let Some(row) = state.tag_rows.iter_mut().find(|row| row.tag == tag) {
            row.icon = icon.map(str::to_string);
        }
        Ok(())
    }

    /// Switch to the pages list of `tag` and return its rows.
    pub fn select_tag(&self, tag: &str) -> Vec<PageRow> {
        {
            let mut state = self.state.lock();
            state.selected_tag = Some(tag.to_string());
            state.view = ManagerView::Pages;
        }
        self.page_rows(tag)
    }

    /// Back to the tags list.
    pub fn show_tags(&self) {
        self.state.lock().view = ManagerView::Tags;
    }

    pub fn view(&self) -> ManagerView {
        self.state.lock().view
    }

    pub fn selected_tag(&self) -> Option<String> {
        self.state.lock().selected_tag.clone()
    }

    /// Pages of `tag`, by page name descending.
    pub fn page_rows(&self, tag: &str) -> Vec<PageRow> {
        let mut rows: Vec<PageRow> = self
            .notebook
            .pages_for_tag(tag)
            .into_iter()
            .map(|page| {
                let mut others: Vec<String> = self
                    .notebook
                    .tags_for_page(&page)
                    .into_iter()
                    .filter(|t| t != tag)
                    .collect();
                others.sort();
                let tag_count = others.len() + 1;
                let tags = std::iter::once(tag.to_string())
                    .chain(others)
                    .collect::<Vec<_>>()
                    .join(", ");
                PageRow {
                    page,
                    tag_count,
                    tags,
                }
            })
            .collect();
        rows.sort_by(|a, b| b.page.cmp(&a.page));
        rows
    }

    /// Text to insert into a page to apply `tag`.
    pub fn tag_insertion_text(tag: &str) -> String {
        format!("@{tag}")
    }

    /// Whether the pending edits differ from the stored preferences.
    pub fn is_modified(&self) -> bool {
        let state = self.state.lock();
        state.pending != state.original
    }

    /// Close the dialog, writing the edits. Returns whether anything changed,
    /// in which case the page tree must be redrawn.
    pub fn confirm(self, ui: &UiState) -> Result<bool> {
        let pending = {
            let state = self.state.lock();
            (state.pending != state.original).then(|| state.pending.clone())
        };
        match pending {
            Some(map) => {
                ui.set_icons_for_tags(&map)?;
                tracing::info!(target: targets::PLUGIN, tags = map.len(), "tag icons updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Close the dialog, discarding the edits.
    pub fn cancel(self) {}
}

impl Drop for TagsManager {
    fn drop(&mut self) {
        self.subscriptions.release();
    }
}

impl std::fmt::Debug for TagsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("TagsManager")
            .field("tags", &state.tag_rows.len())
            .field("view", &state.view)
            .finish()
    }
}

fn build_tag_rows(notebook: &dyn Notebook, icons: &TagIconMap) -> Vec<TagRow> {
    let mut rows: Vec<TagRow> = notebook
        .all_tags()
        .into_iter()
        .map(|tag| TagRow {
            icon: icons.get(&tag).map(str::to_string),
            pages: notebook.pages_for_tag(&tag).len(),
            tag,
        })
        .collect();
    rows.sort_by(|a, b| b.pages.cmp(&a.pages).then_with(|| a.tag.cmp(&b.tag)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MemoryNotebook;

    fn setup() -> (Arc<MemoryNotebook>, TagsManager, UiState, HostEvents) {
        let notebook = Arc::new(MemoryNotebook::with_pages(&[
            ("Alpha", "work urgent"),
            ("Beta", "work"),
            ("Gamma", "home work"),
            ("Delta", "home"),
        ]));
        let ui = UiState::new();
        let mut map = TagIconMap::new();
        map.set("home", "apply");
        ui.set_icons_for_tags(&map).unwrap();
        let events = HostEvents::new();
        let manager = TagsManager::open(
            notebook.clone(),
            Arc::new(IconRegistry::builtin()),
            &ui,
            &events,
        );
        (notebook, manager, ui, events)
    }

    #[test]
    fn test_tag_rows_sorted() {
        let (_, manager, _, _) = setup();
        let rows = manager.tag_rows();
        let summary: Vec<(&str, usize)> = rows.iter().map(|r| (r.tag.as_str(), r.pages)).collect();
        assert_eq!(summary, vec![("work", 3), ("home", 2), ("urgent", 1)]);
        assert_eq!(rows[1].icon.as_deref(), Some("apply"));
        assert_eq!(rows[0].icon, None);
    }

    #[test]
    fn test_page_rows() {
        let (_, manager, _, _) = setup();
        let rows = manager.select_tag("work");
        assert_eq!(manager.view(), ManagerView::Pages);
        assert_eq!(manager.selected_tag().as_deref(), Some("work"));

        let names: Vec<&str> = rows.iter().map(|r| r.page.as_str()).collect();
        assert_eq!(names, vec!["Gamma", "Beta", "Alpha"]);
        assert_eq!(rows[0].tags, "work, home");
        assert_eq!(rows[0].tag_count, 2);
        assert_eq!(rows[2].tags, "work, urgent");

        manager.show_tags();
        assert_eq!(manager.view(), ManagerView::Tags);
    }

    #[test]
    fn test_set_icon_validates() {
        let (_, manager, _, _) = setup();
        assert!(manager.set_icon("work", Some("nonexistent")).is_err());
        assert!(manager.set_icon("work", Some(crate::icons::FOLDER_ICON)).is_err());
        assert!(!manager.is_modified());

        manager.set_icon("work", Some("apply")).unwrap();
        assert_eq!(manager.icon_for("work").as_deref(), Some("apply"));
        assert_eq!(manager.tag_rows()[0].icon.as_deref(), Some("apply"));
        assert!(manager.is_modified());
    }

    #[test]
    fn test_confirm_writes_ui_state() {
        let (_, manager, ui, _) = setup();
        manager.set_icon("work", Some("apply")).unwrap();
        manager.set_icon("home", None).unwrap();
        assert!(manager.confirm(&ui).unwrap());

        let map = ui.icons_for_tags();
        assert_eq!(map.get("work"), Some("apply"));
        assert_eq!(map.get("home"), None);
    }

    #[test]
    fn test_confirm_without_changes() {
        let (_, manager, ui, _) = setup();
        manager.set_icon("home", Some("apply")).unwrap();
        assert!(!manager.confirm(&ui).unwrap());
    }

    #[test]
    fn test_cancel_discards() {
        let (_, manager, ui, events) = setup();
        manager.set_icon("work", Some("apply")).unwrap();
        manager.cancel();
        assert_eq!(ui.icons_for_tags().get("work"), None);
        assert_eq!(events.connection_count(), 0);
    }

    #[test]
    fn test_refresh_on_tag_created() {
        let (notebook, manager, _, events) = setup();
        notebook.add_page("Epsilon", "fresh");
        events.tag_created.emit("fresh".to_string());
        assert!(manager.tag_rows().iter().any(|row| row.tag == "fresh"));
    }

    #[test]
    fn test_insertion_text_and_icons() {
        let (_, manager, _, _) = setup();
        assert_eq!(TagsManager::tag_insertion_text("work"), "@work");
        assert_eq!(manager.pickable_icons(), vec!["apply".to_string()]);
    }
}
