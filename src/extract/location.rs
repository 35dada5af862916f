use std::collections::BTreeSet;

use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::extract::detail::is_stripped;
use crate::rules::CompiledRules;
use crate::text::split_comma_fragments;

const ICON_TAGS: [&str; 4] = ["svg", "img", "i", "path"];

type LocationStrategy = fn(&Html, &str, &CompiledRules) -> Option<BTreeSet<String>>;

/// Tried in order; the first non-empty set wins.
const STRATEGIES: [LocationStrategy; 2] = [from_location_elements, from_description_aliases];

/// Locations for a job-detail page, sorted.
pub fn resolve(document: &Html, description: &str, rules: &CompiledRules) -> Vec<String> {
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(document, description, rules))
        .map(|set| set.into_iter().collect())
        .unwrap_or_default()
}

fn has_class_containing(element: &ElementRef<'_>, needle: &str) -> bool {
    element
        .value()
        .attr("class")
        .is_some_and(|class| class.to_lowercase().contains(needle))
}

fn is_icon(element: &ElementRef<'_>) -> bool {
    ICON_TAGS.contains(&element.value().name()) || has_class_containing(element, "icon")
}

/// Text of `element` without anything inside icon or vector markup.
fn text_without_icons(element: &ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let in_icon = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .take_while(|el| el.id() != element.id())
            .any(|el| is_icon(&el));
        if !in_icon {
            parts.push(text);
        }
    }
    parts.join(" ")
}

/// Whether `element` sits in a footer or other stripped container.
fn in_stripped_section(element: &ElementRef<'_>) -> bool {
    is_stripped(element)
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| is_stripped(&el))
}

/// Elements with a `location`-like class carry the posting's own location.
/// Site-wide footer widgets listing every office are ignored.
fn from_location_elements(
    document: &Html,
    _description: &str,
    rules: &CompiledRules,
) -> Option<BTreeSet<String>> {
    let raw: Vec<String> = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| has_class_containing(el, "location"))
        .filter(|el| !in_stripped_section(el))
        .map(|el| text_without_icons(&el))
        .collect();

    let fragments: BTreeSet<String> = split_comma_fragments(&raw).into_iter().collect();
    // fragments can still hold commas after the first pass when the text
    // joined separate text nodes; flatten once more
    let fragments: Vec<String> = fragments.into_iter().collect();
    let locations: BTreeSet<String> = split_comma_fragments(&fragments)
        .into_iter()
        .map(|fragment| {
            let fragment = fragment.split_whitespace().collect::<Vec<_>>().join(" ");
            match rules.canonical_location(&fragment) {
                Some(canonical) => canonical.to_string(),
                None => fragment,
            }
        })
        .filter(|fragment| !fragment.is_empty())
        .collect();

    (!locations.is_empty()).then_some(locations)
}

/// Canonical names whose aliases appear as whole words in the description.
fn from_description_aliases(
    _document: &Html,
    description: &str,
    rules: &CompiledRules,
) -> Option<BTreeSet<String>> {
    let description = description.to_lowercase();
    let locations: BTreeSet<String> = rules
        .known_locations
        .iter()
        .filter(|loc| loc.aliases.iter().any(|alias| alias.is_match(&description)))
        .map(|loc| loc.canonical.clone())
        .collect();

    (!locations.is_empty()).then_some(locations)
}
