//! End-to-end tests: a fake host drives the plugin through edits, tag
//! changes, reindexing and teardown.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use icontags::icons::{FILE_ICON, FILE_TAGS_ICON, FOLDER_ICON, SEVERAL_ICONS};
use icontags::index::{DB_FORMAT, PLUGIN_NAME};
use icontags::indexer::Reconciled;
use icontags::prelude::*;
use icontags::shortcode::{Extracted, extract, parse_inline};
use parking_lot::Mutex;

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct WikiPage {
    content: String,
    tags: Vec<String>,
}

/// Pages named `A:B`, with raw wiki text and tags.
#[derive(Default)]
struct Wiki {
    pages: Mutex<BTreeMap<String, WikiPage>>,
    reindex_requests: AtomicUsize,
}

impl Wiki {
    fn with_pages(pages: &[(&str, &str, &str)]) -> Arc<Self> {
        let wiki = Self::default();
        {
            let mut map = wiki.pages.lock();
            for (name, content, tags) in pages {
                map.insert(
                    name.to_string(),
                    WikiPage {
                        content: content.to_string(),
                        tags: tags.split_whitespace().map(str::to_string).collect(),
                    },
                );
            }
        }
        Arc::new(wiki)
    }

    /// Save new content, as the editor would.
    fn edit(&self, events: &HostEvents, name: &str, content: &str) {
        {
            let mut pages = self.pages.lock();
            let page = pages.entry(name.to_string()).or_insert_with(|| WikiPage {
                content: String::new(),
                tags: Vec::new(),
            });
            page.content = content.to_string();
        }
        events
            .page_changed
            .emit(PageChange::new(name, parse_inline(content)));
    }

    fn add_tag(&self, events: &HostEvents, name: &str, tag: &str) {
        let created = !self.all_tags().iter().any(|t| t == tag);
        if let Some(page) = self.pages.lock().get_mut(name) {
            page.tags.push(tag.to_string());
        }
        if created {
            events.tag_created.emit(tag.to_string());
        }
        events.tag_added.emit(TagEvent::new(tag, name));
    }

    fn delete(&self, events: &HostEvents, name: &str) {
        self.pages.lock().remove(name);
        events.page_deleted.emit(PageId::from(name));
    }

    /// What the host does after `request_reindex`.
    fn run_reindex(&self, events: &HostEvents) {
        events.reindex_started.emit(());
        let pages: Vec<(String, String)> = self
            .pages
            .lock()
            .iter()
            .map(|(name, page)| (name.clone(), page.content.clone()))
            .collect();
        for (name, content) in pages {
            events
                .page_changed
                .emit(PageChange::new(name.as_str(), parse_inline(&content)));
        }
        events.reindex_finished.emit(());
    }

    fn record(pages: &BTreeMap<String, WikiPage>, name: &str) -> PageRecord {
        let prefix = format!("{name}:");
        let has_children = pages.keys().any(|other| other.starts_with(&prefix));
        let (parent, basename) = match name.rsplit_once(':') {
            Some((parent, basename)) => (Some(PageId::from(parent)), basename),
            None => (None, name),
        };
        PageRecord::new(name, basename, has_children, parent)
    }
}

impl Notebook for Wiki {
    fn page(&self, page: &PageId) -> Option<PageRecord> {
        let pages = self.pages.lock();
        pages
            .contains_key(page.as_str())
            .then(|| Self::record(&pages, page.as_str()))
    }

    fn children(&self, parent: Option<&PageId>) -> Vec<PageRecord> {
        let pages = self.pages.lock();
        pages
            .keys()
            .filter(|name| name.rsplit_once(':').map(|(p, _)| p) == parent.map(PageId::as_str))
            .map(|name| Self::record(&pages, name))
            .collect()
    }

    fn tags_for_page(&self, page: &PageId) -> Vec<String> {
        self.pages
            .lock()
            .get(page.as_str())
            .map(|page| page.tags.clone())
            .unwrap_or_default()
    }

    fn all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .pages
            .lock()
            .values()
            .flat_map(|page| page.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    fn pages_for_tag(&self, tag: &str) -> Vec<PageId> {
        self.pages
            .lock()
            .iter()
            .filter(|(_, page)| page.tags.iter().any(|t| t == tag))
            .map(|(name, _)| PageId::from(name.as_str()))
            .collect()
    }

    fn request_reindex(&self) {
        self.reindex_requests.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    wiki: Arc<Wiki>,
    events: HostEvents,
    database: HostDatabase,
    registry: Arc<IconRegistry>,
    ui: Arc<UiState>,
}

impl Fixture {
    fn new(pages: &[(&str, &str, &str)]) -> Self {
        init_logging();
        let mut registry = IconRegistry::builtin();
        registry.insert("calendar", IconHandle::Stock(StockIcon::Directory));
        registry.insert("star", IconHandle::Stock(StockIcon::DialogQuestion));
        Self {
            wiki: Wiki::with_pages(pages),
            events: HostEvents::new(),
            database: HostDatabase::open_in_memory().unwrap(),
            registry: Arc::new(registry),
            ui: Arc::new(UiState::new()),
        }
    }

    fn tag_icons(&self, pairs: &[(&str, &str)]) {
        let map: TagIconMap = pairs.iter().copied().collect();
        self.ui.set_icons_for_tags(&map).unwrap();
    }

    fn attach(&self, enable_indexing: bool) -> IconTagsPlugin {
        let host = PluginHost {
            notebook: self.wiki.clone(),
            events: self.events.clone(),
            database: self.database.clone(),
            event_loop: EventLoop::new(),
        };
        let preferences = PluginPreferences {
            enable_indexing,
            ..PluginPreferences::default()
        };
        IconTagsPlugin::new(host, self.registry.clone(), self.ui.clone(), preferences).unwrap()
    }
}

fn icon_of(plugin: &IconTagsPlugin, page: &str) -> String {
    plugin.row_display(&PageId::from(page)).unwrap().icon_name
}

#[test]
fn test_extraction_outcomes() {
    let plain = parse_inline("Just text with [ICON=apply] outside bold.");
    assert_eq!(extract(&plain), Extracted::NoIcon);

    let one = parse_inline("Title **[ICON=Calendar]** here");
    assert_eq!(extract(&one), Extracted::Icon("calendar".to_string()));

    let same_span = parse_inline("**[ICON=apply] [ICON=star]**");
    assert_eq!(extract(&same_span), Extracted::Ambiguous);

    let two_spans = parse_inline("**[ICON=apply]** and **[ICON=apply]**");
    assert_eq!(extract(&two_spans), Extracted::Ambiguous);
}

#[test]
fn test_edit_to_icon_end_to_end() {
    let fx = Fixture::new(&[("A", "", ""), ("B", "", "")]);
    let plugin = fx.attach(true);
    let a = PageId::from("A");

    assert_eq!(icon_of(&plugin, "A"), FILE_ICON);
    assert!(plugin.model().cache().get(&a).is_some());

    fx.wiki.edit(&fx.events, "A", "**[ICON=apply]**");

    assert_eq!(plugin.store().get(&a).unwrap().as_deref(), Some("apply"));
    assert!(plugin.model().cache().get(&a).is_none());
    let row = plugin.row_display(&a).unwrap();
    assert_eq!(row.icon_name, "apply");
    assert_eq!(row.icon, IconHandle::Stock(StockIcon::Apply));
}

#[test]
fn test_shortcode_removal_clears_row() {
    let fx = Fixture::new(&[("A", "", "")]);
    let plugin = fx.attach(true);
    let a = PageId::from("A");

    fx.wiki.edit(&fx.events, "A", "**[ICON=calendar]**");
    assert_eq!(icon_of(&plugin, "A"), "calendar");

    fx.wiki.edit(&fx.events, "A", "[ICON=calendar] is no longer bold");
    assert_eq!(plugin.store().get(&a).unwrap(), None);
    assert_eq!(icon_of(&plugin, "A"), FILE_ICON);
}

#[test]
fn test_ambiguous_page_renders_several_icons() {
    let fx = Fixture::new(&[("A", "", "")]);
    let plugin = fx.attach(true);

    fx.wiki
        .edit(&fx.events, "A", "**[ICON=apply]** then **[ICON=star]**");
    assert_eq!(
        plugin.store().get(&PageId::from("A")).unwrap().as_deref(),
        Some(SEVERAL_ICONS)
    );
    assert_eq!(icon_of(&plugin, "A"), SEVERAL_ICONS);
}

#[test]
fn test_unknown_icon_degrades_to_missing() {
    let fx = Fixture::new(&[("A", "", "")]);
    let plugin = fx.attach(true);

    fx.wiki.edit(&fx.events, "A", "**[ICON=nonexistent]**");
    let row = plugin.row_display(&PageId::from("A")).unwrap();
    assert_eq!(row.icon, IconHandle::Stock(StockIcon::MissingImage));
}

#[test]
fn test_reconcile_is_idempotent() {
    let fx = Fixture::new(&[("A", "", "")]);
    let plugin = fx.attach(true);
    let notifications = Arc::new(AtomicUsize::new(0));
    let counter = notifications.clone();
    let _guard = plugin.store().changed().connect_scoped(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    let a = PageId::from("A");
    let tokens = parse_inline("**[ICON=apply]**");
    assert_eq!(
        plugin.indexer().reconcile(&a, &tokens),
        Reconciled::Stored("apply".to_string())
    );
    assert_eq!(plugin.indexer().reconcile(&a, &tokens), Reconciled::Unchanged);
    assert_eq!(notifications.load(Ordering::SeqCst), 1);
}

#[test]
fn test_interrupted_reindex_converges() {
    let pages = [
        ("A", "**[ICON=x]**", ""),
        ("B", "**[ICON=a]** **[ICON=b]**", ""),
        ("C", "no icon", ""),
        ("D", "**[ICON=Y]**", ""),
    ];
    let interrupted = Fixture::new(&pages);
    let clean = Fixture::new(&pages);
    let first = interrupted.attach(true);
    let second = clean.attach(true);

    // The host stops after two pages, then starts over.
    interrupted.events.reindex_started.emit(());
    for (name, content, _) in &pages[..2] {
        interrupted
            .events
            .page_changed
            .emit(PageChange::new(*name, parse_inline(content)));
    }
    interrupted.wiki.run_reindex(&interrupted.events);
    clean.wiki.run_reindex(&clean.events);

    let rows = |plugin: &IconTagsPlugin| -> Vec<Option<String>> {
        pages
            .iter()
            .map(|(name, _, _)| plugin.store().get(&PageId::from(*name)).unwrap())
            .collect()
    };
    assert_eq!(rows(&first), rows(&second));
    assert_eq!(
        rows(&first),
        vec![
            Some("x".to_string()),
            Some(SEVERAL_ICONS.to_string()),
            None,
            Some("y".to_string()),
        ]
    );
}

#[test]
fn test_tag_added_invalidates_cached_row() {
    let fx = Fixture::new(&[("A", "", ""), ("B", "", "")]);
    fx.tag_icons(&[("work", "calendar")]);
    fx.wiki.add_tag(&fx.events, "A", "work");
    let plugin = fx.attach(false);
    let b = PageId::from("B");

    assert_eq!(icon_of(&plugin, "B"), FILE_ICON);
    fx.wiki.add_tag(&fx.events, "B", "work");
    assert!(plugin.model().cache().get(&b).is_none());
    assert_eq!(icon_of(&plugin, "B"), "calendar");
}

#[test]
fn test_stored_icon_beats_tag_preference() {
    let fx = Fixture::new(&[("A", "", "work")]);
    fx.tag_icons(&[("work", "calendar")]);
    let plugin = fx.attach(true);
    assert_eq!(icon_of(&plugin, "A"), "calendar");

    fx.wiki.edit(&fx.events, "A", "**[ICON=star]**");
    assert_eq!(icon_of(&plugin, "A"), "star");
}

#[test]
fn test_tag_preference_tie() {
    let fx = Fixture::new(&[
        ("Clash", "", "work home"),
        ("Agree", "", "work office"),
        ("Plain", "", "misc"),
    ]);
    fx.tag_icons(&[("work", "calendar"), ("home", "star"), ("office", "calendar")]);
    let plugin = fx.attach(false);

    assert_eq!(icon_of(&plugin, "Clash"), SEVERAL_ICONS);
    assert_eq!(icon_of(&plugin, "Agree"), "calendar");
    assert_eq!(icon_of(&plugin, "Plain"), FILE_TAGS_ICON);
}

#[test]
fn test_disabling_indexing_falls_back() {
    let fx = Fixture::new(&[("A", "", "work"), ("A:Child", "", "")]);
    fx.tag_icons(&[("work", "calendar")]);
    let mut plugin = fx.attach(true);
    let a = PageId::from("A");

    fx.wiki.edit(&fx.events, "A", "**[ICON=star]**");
    assert_eq!(icon_of(&plugin, "A"), "star");

    plugin
        .apply_preferences(PluginPreferences {
            enable_indexing: false,
            ..plugin.preferences()
        })
        .unwrap();
    assert_eq!(plugin.store().get(&a).unwrap(), None);
    assert_eq!(icon_of(&plugin, "A"), "calendar");
    assert_eq!(icon_of(&plugin, "A:Child"), FILE_ICON);

    // Edits are no longer indexed.
    fx.wiki.edit(&fx.events, "A:Child", "**[ICON=apply]**");
    assert_eq!(icon_of(&plugin, "A:Child"), FILE_ICON);
}

#[test]
fn test_format_change_triggers_full_reindex() {
    let fx = Fixture::new(&[
        ("Home", "**[ICON=apply]**", ""),
        ("Projects", "", ""),
        ("Projects:Alpha", "Intro **[ICON=calendar]**", ""),
    ]);
    fx.database.set_property(PLUGIN_NAME, Some("0.6")).unwrap();

    let plugin = fx.attach(true);
    assert_eq!(fx.wiki.reindex_requests.load(Ordering::SeqCst), 1);
    assert_eq!(
        plugin.store().schema_version().unwrap().as_deref(),
        Some(DB_FORMAT)
    );
    assert_eq!(icon_of(&plugin, "Home"), FILE_ICON);

    fx.wiki.run_reindex(&fx.events);
    assert_eq!(icon_of(&plugin, "Home"), "apply");
    assert_eq!(icon_of(&plugin, "Projects"), FOLDER_ICON);
    assert_eq!(icon_of(&plugin, "Projects:Alpha"), "calendar");
    assert_eq!(plugin.store().len().unwrap(), 2);
}

#[test]
fn test_index_survives_reattach() {
    let fx = Fixture::new(&[("A", "", "")]);
    {
        let plugin = fx.attach(true);
        fx.wiki.edit(&fx.events, "A", "**[ICON=calendar]**");
        assert_eq!(icon_of(&plugin, "A"), "calendar");
    }
    let plugin = fx.attach(true);
    assert_eq!(fx.wiki.reindex_requests.load(Ordering::SeqCst), 1);
    assert_eq!(icon_of(&plugin, "A"), "calendar");
}

#[test]
fn test_structural_changes_rebuild_tree() {
    let fx = Fixture::new(&[("A", "", ""), ("B", "", "")]);
    let plugin = fx.attach(true);

    fx.wiki.edit(&fx.events, "A:New", "**[ICON=star]**");
    assert_eq!(plugin.tree().tree_path(&PageId::from("A:New")), Some(vec![0, 0]));
    assert_eq!(icon_of(&plugin, "A:New"), "star");
    assert_eq!(icon_of(&plugin, "A"), FOLDER_ICON);

    fx.wiki.delete(&fx.events, "A:New");
    assert_eq!(plugin.tree().tree_path(&PageId::from("A:New")), None);
    assert_eq!(plugin.store().get(&PageId::from("A:New")).unwrap(), None);
    assert_eq!(icon_of(&plugin, "A"), FILE_ICON);
}

#[test]
fn test_teardown_leaves_no_callbacks() {
    let fx = Fixture::new(&[("A", "", "work")]);
    let mut plugin = fx.attach(true);
    plugin.show_tags_manager();
    assert!(fx.events.connection_count() > 0);

    drop(plugin);
    assert_eq!(fx.events.connection_count(), 0);
    assert_eq!(fx.ui.changed().connection_count(), 0);

    // Host events after teardown reach nobody.
    fx.wiki.edit(&fx.events, "A", "**[ICON=apply]**");
}

#[test]
fn test_ui_state_persists_across_sessions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let fx = Fixture::new(&[("A", "", "work")]);

    {
        let ui = Arc::new(UiState::load(&path).unwrap());
        let host = PluginHost {
            notebook: fx.wiki.clone(),
            events: fx.events.clone(),
            database: fx.database.clone(),
            event_loop: EventLoop::new(),
        };
        let mut plugin =
            IconTagsPlugin::new(host, fx.registry.clone(), ui, PluginPreferences::default())
                .unwrap();
        plugin.toggle_show_tags().unwrap();
        plugin.show_tags_manager().set_icon("work", Some("star")).unwrap();
        assert!(plugin.confirm_tags_manager().unwrap());
        assert_eq!(plugin.row_display(&PageId::from("A")).unwrap().name, "A (work)");
    }

    let reloaded = UiState::load(&path).unwrap();
    assert!(reloaded.show_tags());
    assert_eq!(reloaded.icons_for_tags().get("work"), Some("star"));
}
