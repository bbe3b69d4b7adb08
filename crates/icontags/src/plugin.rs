//! Plugin lifecycle: wires the registry, index, tree and dialogs to a host.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use icontags_core::logging::targets;
use icontags_core::{EventLoop, Subscriptions};

use crate::error::{Error, Result};
use crate::host::{HostEvents, Notebook};
use crate::icons::{IconRegistry, is_reserved};
use crate::index::{DB_FORMAT, HostDatabase, IconIndexStore};
use crate::indexer::Indexer;
use crate::model::{PageTree, PageTreeModel, PaneView, RowDisplay, TaggedFilter, TreePath};
use crate::page::PageId;
use crate::settings::{
    ICONS_FOR_TAGS_KEY, OPEN_PAGES_KEY, OpenPagesMode, PluginPreferences, SHOW_TAGGED_KEY,
    SHOW_TAGS_KEY, UiState,
};
use crate::shortcode;
use crate::tags_manager::TagsManager;

/// Shown when the icon table cannot be created.
pub const INDEX_FAILURE_NOTICE: &str = "The icon index could not be created, so icon shortcodes \
     are not indexed. Rebuild the notebook index, then enable indexing again.";

/// Everything the host provides.
#[derive(Clone)]
pub struct PluginHost {
    pub notebook: Arc<dyn Notebook>,
    pub events: HostEvents,
    pub database: HostDatabase,
    pub event_loop: EventLoop,
}

/// The IconTags plugin attached to one notebook window.
pub struct IconTagsPlugin {
    host: PluginHost,
    registry: Arc<IconRegistry>,
    store: Arc<IconIndexStore>,
    indexer: Indexer,
    ui: Arc<UiState>,
    preferences: PluginPreferences,
    model: Arc<PageTreeModel>,
    filter: Option<Arc<TaggedFilter>>,
    view: PaneView,
    tags_manager: Option<TagsManager>,
    subscriptions: Subscriptions,
    notice: Option<String>,
}

impl IconTagsPlugin {
    /// Attach to a notebook.
    ///
    /// Stale tag icons are pruned from `ui`. With indexing enabled the schema
    /// marker is checked first: a mismatch drops the old table and asks the
    /// host for a full reindex.
    pub fn new(
        host: PluginHost,
        registry: Arc<IconRegistry>,
        ui: Arc<UiState>,
        mut preferences: PluginPreferences,
    ) -> Result<Self> {
        let store = Arc::new(IconIndexStore::new(host.database.clone())?);
        let mut indexer = Indexer::new(store.clone());

        let existing: HashSet<String> = host.notebook.all_tags().into_iter().collect();
        if let Err(e) = ui.prune_icons_for_tags(&existing, &registry) {
            tracing::warn!(target: targets::PLUGIN, error = %e, "could not save pruned tag icons");
        }

        let mut notice = None;
        if preferences.enable_indexing {
            start_indexing(&store, &mut indexer, &host, &mut preferences, &mut notice);
        }

        let model = build_model(&host, &registry, &ui, &store, &indexer);
        let mut plugin = Self {
            view: PaneView::new(ui.open_pages()),
            host,
            registry,
            store,
            indexer,
            ui,
            preferences,
            model,
            filter: None,
            tags_manager: None,
            subscriptions: Subscriptions::new(),
            notice,
        };
        plugin.follow_model();
        tracing::info!(
            target: targets::PLUGIN,
            indexing = plugin.indexer.is_active(),
            icons = plugin.registry.len(),
            "plugin attached"
        );
        Ok(plugin)
    }

    /// Replace the model (and filter) so they match the current indexing
    /// state and UI state.
    fn rebuild_model(&mut self) {
        self.model.disconnect();
        self.model = build_model(&self.host, &self.registry, &self.ui, &self.store, &self.indexer);
        self.follow_model();
    }

    /// Connect the current model to the host, recreate the filter and
    /// re-follow UI state changes.
    fn follow_model(&mut self) {
        self.model.connect(&self.host.events);
        self.filter = self
            .ui
            .show_tagged()
            .then(|| TaggedFilter::new(self.model.clone()));

        self.subscriptions.release();
        let model = Arc::downgrade(&self.model);
        let ui = Arc::downgrade(&self.ui);
        self.subscriptions
            .push(self.ui.changed().connect_scoped(move |key: &String| {
                apply_ui_change(&model, &ui, key);
            }));
    }

    /// The user changed the preferences.
    pub fn apply_preferences(&mut self, preferences: PluginPreferences) -> Result<()> {
        let was_indexing = self.preferences.enable_indexing;
        self.preferences = preferences;

        match (was_indexing, preferences.enable_indexing) {
            (false, true) => {
                start_indexing(
                    &self.store,
                    &mut self.indexer,
                    &self.host,
                    &mut self.preferences,
                    &mut self.notice,
                );
                self.rebuild_model();
            }
            (true, false) => {
                let result = self.indexer.disable();
                self.rebuild_model();
                result?;
            }
            _ => {}
        }
        Ok(())
    }

    pub fn preferences(&self) -> PluginPreferences {
        self.preferences
    }

    /// A message the host should show to the user, once.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    pub fn indexer(&self) -> &Indexer {
        &self.indexer
    }

    pub fn store(&self) -> &Arc<IconIndexStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<IconRegistry> {
        &self.registry
    }

    pub fn ui(&self) -> &Arc<UiState> {
        &self.ui
    }

    pub fn model(&self) -> &Arc<PageTreeModel> {
        &self.model
    }

    /// The tree the pane shows: filtered when "show tagged" is on.
    pub fn tree(&self) -> &dyn PageTree {
        match &self.filter {
            Some(filter) => filter.as_ref(),
            None => self.model.as_ref(),
        }
    }

    pub fn view(&self) -> &PaneView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut PaneView {
        &mut self.view
    }

    /// Label, tooltip and icon of `page`.
    pub fn row_display(&self, page: &PageId) -> Option<RowDisplay> {
        self.tree().row_display(page)
    }

    /// The host opened `page`; returns the path the pane should select.
    pub fn open_page(&mut self, page: &PageId) -> Option<TreePath> {
        self.view.set_mode(self.ui.open_pages());
        let tree: &dyn PageTree = match &self.filter {
            Some(filter) => filter.as_ref(),
            None => self.model.as_ref(),
        };
        self.view.open_page(tree, page)
    }

    /// Flip "show tags" and return the new value.
    pub fn toggle_show_tags(&mut self) -> Result<bool> {
        let show = !self.ui.show_tags();
        self.ui.set_show_tags(show)?;
        Ok(show)
    }

    /// Flip the tagged-only filter and return the new value.
    pub fn toggle_show_tagged(&mut self) -> Result<bool> {
        let show = !self.ui.show_tagged();
        self.ui.set_show_tagged(show)?;
        self.filter = show.then(|| TaggedFilter::new(self.model.clone()));
        Ok(show)
    }

    pub fn set_open_pages_mode(&mut self, mode: OpenPagesMode) -> Result<()> {
        self.ui.set_open_pages(mode)?;
        self.view.set_mode(mode);
        Ok(())
    }

    /// Icon names for the "Insert Icon" list.
    pub fn icon_choices(&self) -> Vec<&str> {
        self.registry.pickable_names()
    }

    /// Markup to insert into a page for `name`.
    pub fn insert_icon_markup(&self, name: &str) -> Result<String> {
        let name = name.to_lowercase();
        if is_reserved(&name) || !self.registry.contains(&name) {
            return Err(Error::InvalidIconName(name));
        }
        shortcode::icon_markup(&name)
    }

    /// Open the Tags Manager, or return the one already open.
    pub fn show_tags_manager(&mut self) -> &TagsManager {
        let Self {
            tags_manager,
            host,
            registry,
            ui,
            ..
        } = self;
        tags_manager.get_or_insert_with(|| {
            TagsManager::open(host.notebook.clone(), registry.clone(), ui, &host.events)
        })
    }

    pub fn tags_manager(&self) -> Option<&TagsManager> {
        self.tags_manager.as_ref()
    }

    /// Close the Tags Manager keeping its edits. Returns whether anything
    /// changed; the tree has then already been redrawn.
    pub fn confirm_tags_manager(&mut self) -> Result<bool> {
        match self.tags_manager.take() {
            Some(manager) => manager.confirm(&self.ui),
            None => Ok(false),
        }
    }

    /// Close the Tags Manager discarding its edits.
    pub fn cancel_tags_manager(&mut self) {
        if let Some(manager) = self.tags_manager.take() {
            manager.cancel();
        }
    }

    /// Detach from the host. Every subscription is released; the icon table
    /// is kept for the next session.
    pub fn teardown(&mut self) {
        self.cancel_tags_manager();
        self.filter = None;
        self.model.disconnect();
        self.indexer.detach();
        self.subscriptions.release();
        tracing::info!(target: targets::PLUGIN, "plugin detached");
    }
}

/// Check the schema marker, then enable the indexer. A marker mismatch drops
/// the old table and asks for a full reindex. On failure indexing is switched
/// off in `preferences` and `notice` is set.
fn start_indexing(
    store: &IconIndexStore,
    indexer: &mut Indexer,
    host: &PluginHost,
    preferences: &mut PluginPreferences,
    notice: &mut Option<String>,
) {
    let reindex = match store.schema_version() {
        Ok(Some(version)) if version == DB_FORMAT && store.is_initialized() => false,
        Ok(version) => {
            tracing::info!(
                target: targets::PLUGIN,
                found = version.as_deref().unwrap_or("none"),
                expected = DB_FORMAT,
                "icon index format changed, rebuilding"
            );
            if let Err(e) = store.teardown() {
                tracing::warn!(target: targets::PLUGIN, error = %e, "could not drop old icon index");
            }
            true
        }
        Err(e) => {
            tracing::warn!(target: targets::PLUGIN, error = %e, "could not read icon index format");
            true
        }
    };

    if let Err(e) = indexer.enable(&host.events, host.notebook.as_ref(), reindex) {
        tracing::error!(target: targets::PLUGIN, error = %e, "indexing turned off");
        preferences.enable_indexing = false;
        *notice = Some(INDEX_FAILURE_NOTICE.to_string());
    }
}

/// A fresh model reading the store only while the indexer is active.
fn build_model(
    host: &PluginHost,
    registry: &Arc<IconRegistry>,
    ui: &UiState,
    store: &Arc<IconIndexStore>,
    indexer: &Indexer,
) -> Arc<PageTreeModel> {
    PageTreeModel::new(
        host.notebook.clone(),
        registry.clone(),
        indexer.is_active().then(|| store.clone()),
        ui.icons_for_tags(),
        ui.show_tags(),
        host.event_loop.clone(),
    )
}

fn apply_ui_change(model: &Weak<PageTreeModel>, ui: &Weak<UiState>, key: &str) {
    let (Some(model), Some(ui)) = (model.upgrade(), ui.upgrade()) else {
        return;
    };
    match key {
        ICONS_FOR_TAGS_KEY => model.set_prefs(ui.icons_for_tags()),
        SHOW_TAGS_KEY => model.set_show_tags(ui.show_tags()),
        OPEN_PAGES_KEY | SHOW_TAGGED_KEY => {}
        other => {
            tracing::trace!(target: targets::PLUGIN, key = other, "ignoring UI state change");
        }
    }
}

impl Drop for IconTagsPlugin {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl std::fmt::Debug for IconTagsPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IconTagsPlugin")
            .field("preferences", &self.preferences)
            .field("indexer", &self.indexer.state())
            .field("filtered", &self.filter.is_some())
            .finish()
    }
}
