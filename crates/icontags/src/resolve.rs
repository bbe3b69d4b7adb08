//! Choosing the icon, label and tooltip of a page row.
//!
//! Precedence, first match wins:
//!
//! 1. The page's own shortcode, as stored in the icon index.
//! 2. The icons the user assigned to the page's tags.
//! 3. The tagged default (folder or file).
//! 4. The plain default (folder or file).

use crate::icons::{
    FILE_ICON, FILE_TAGS_ICON, FOLDER_ICON, FOLDER_TAGS_ICON, IconHandle, IconRegistry, NO_IMAGE,
    SEVERAL_ICONS,
};
use crate::settings::TagIconMap;

/// The inputs of a resolution for one page.
#[derive(Debug, Clone, Copy)]
pub struct PageFacts<'a> {
    pub basename: &'a str,
    pub has_children: bool,
    pub tags: &'a [String],
    /// The stored shortcode icon. Always `None` when indexing is off.
    pub stored_icon: Option<&'a str>,
}

/// Resolved presentation of a row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Label shown in the tree.
    pub name: String,
    /// Tooltip, markup-escaped.
    pub tooltip: String,
    /// Registry name of the icon.
    pub icon: String,
}

/// Pick the registry name of the icon for a page.
///
/// The result is always a name the registry knows.
pub fn resolve_icon(facts: &PageFacts<'_>, prefs: &TagIconMap, registry: &IconRegistry) -> String {
    if let Some(stored) = facts.stored_icon.filter(|s| !s.is_empty()) {
        return known_or_missing(stored, registry);
    }

    let mut chosen: Option<&str> = None;
    for icon in facts.tags.iter().filter_map(|tag| prefs.get(tag)) {
        match chosen {
            None => chosen = Some(icon),
            Some(previous) if previous != icon => return SEVERAL_ICONS.to_string(),
            Some(_) => {}
        }
    }
    if let Some(icon) = chosen {
        return known_or_missing(icon, registry);
    }

    let default = match (facts.tags.is_empty(), facts.has_children) {
        (false, true) => FOLDER_TAGS_ICON,
        (false, false) => FILE_TAGS_ICON,
        (true, true) => FOLDER_ICON,
        (true, false) => FILE_ICON,
    };
    default.to_string()
}

fn known_or_missing(name: &str, registry: &IconRegistry) -> String {
    if registry.contains(name) {
        name.to_string()
    } else {
        NO_IMAGE.to_string()
    }
}

/// Row label: the basename, followed by the sorted tags in parentheses
/// when `show_tags` is on and the page has any.
pub fn display_name(basename: &str, tags: &[String], show_tags: bool) -> String {
    if !show_tags || tags.is_empty() {
        return basename.to_string();
    }
    let mut sorted: Vec<&str> = tags.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    format!("{basename} ({})", sorted.join(", "))
}

/// Escape `&`, `<` and `>` for the host's tooltip markup.
pub fn escape_markup(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Resolve label, tooltip and icon for one row.
pub fn resolve(
    facts: &PageFacts<'_>,
    prefs: &TagIconMap,
    registry: &IconRegistry,
    show_tags: bool,
) -> Resolution {
    let name = display_name(facts.basename, facts.tags, show_tags);
    Resolution {
        tooltip: escape_markup(&name),
        name,
        icon: resolve_icon(facts, prefs, registry),
    }
}

impl Resolution {
    /// The renderable icon for this row.
    pub fn handle<'r>(&self, registry: &'r IconRegistry) -> &'r IconHandle {
        registry.lookup(&self.icon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn facts<'a>(tags: &'a [String], has_children: bool, stored: Option<&'a str>) -> PageFacts<'a> {
        PageFacts {
            basename: "Page",
            has_children,
            tags,
            stored_icon: stored,
        }
    }

    fn prefs() -> TagIconMap {
        [("work", "apply"), ("urgent", "apply"), ("home", "_default_folder")]
            .into_iter()
            .collect()
    }

    #[test]
    fn test_defaults() {
        let registry = IconRegistry::builtin();
        let empty = TagIconMap::new();
        let none = tags(&[]);
        let some = tags(&["misc"]);

        assert_eq!(resolve_icon(&facts(&none, true, None), &empty, &registry), FOLDER_ICON);
        assert_eq!(resolve_icon(&facts(&none, false, None), &empty, &registry), FILE_ICON);
        assert_eq!(resolve_icon(&facts(&some, true, None), &empty, &registry), FOLDER_TAGS_ICON);
        assert_eq!(resolve_icon(&facts(&some, false, None), &empty, &registry), FILE_TAGS_ICON);
    }

    #[test]
    fn test_stored_icon_wins() {
        let registry = IconRegistry::builtin();
        let t = tags(&["work"]);
        assert_eq!(resolve_icon(&facts(&t, false, Some("apply")), &prefs(), &registry), "apply");
        assert_eq!(
            resolve_icon(&facts(&t, false, Some(SEVERAL_ICONS)), &prefs(), &registry),
            SEVERAL_ICONS
        );
    }

    #[test]
    fn test_unknown_stored_icon_is_missing() {
        let registry = IconRegistry::builtin();
        let t = tags(&[]);
        assert_eq!(
            resolve_icon(&facts(&t, false, Some("nonexistent")), &prefs(), &registry),
            NO_IMAGE
        );
    }

    #[test]
    fn test_tag_preferences() {
        let registry = IconRegistry::builtin();
        let p = prefs();

        let agreeing = tags(&["work", "urgent", "misc"]);
        assert_eq!(resolve_icon(&facts(&agreeing, false, None), &p, &registry), "apply");

        let disagreeing = tags(&["work", "home"]);
        assert_eq!(resolve_icon(&facts(&disagreeing, false, None), &p, &registry), SEVERAL_ICONS);
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Page", &tags(&["b", "a"]), true), "Page (a, b)");
        assert_eq!(display_name("Page", &tags(&["b", "a"]), false), "Page");
        assert_eq!(display_name("Page", &tags(&[]), true), "Page");
    }

    #[test]
    fn test_resolve_escapes_tooltip() {
        let registry = IconRegistry::builtin();
        let t = tags(&["x"]);
        let facts = PageFacts {
            basename: "A & <B>",
            has_children: false,
            tags: &t,
            stored_icon: None,
        };
        let resolution = resolve(&facts, &TagIconMap::new(), &registry, true);
        assert_eq!(resolution.name, "A & <B> (x)");
        assert_eq!(resolution.tooltip, "A &amp; &lt;B&gt; (x)");
        assert_eq!(resolution.icon, FILE_TAGS_ICON);
        assert_eq!(resolution.handle(&registry), registry.lookup(FILE_TAGS_ICON));
    }
}
