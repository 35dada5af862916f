use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::models::job::JobCandidate;
use crate::text::collapse_whitespace;

const CTA_PHRASES: [&str; 3] = ["apply", "apply now", "view job"];
const MIN_ANCHOR_TITLE_LEN: usize = 6;
const MAX_ANCESTOR_LEVELS: usize = 4;

static ANCHORS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("anchor selector is valid"));
static TITLE_NODES: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6, p, span").expect("title selector is valid")
});

/// Text node considered as a job title, reduced to what the scoring needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleNode {
    pub tag: String,
    pub text: String,
}

/// Title score for one node, `None` when it can never be a title.
pub fn score_title_node(node: &TitleNode) -> Option<i32> {
    let text = node.text.trim();
    if text.is_empty() || text.to_lowercase().contains("apply") {
        return None;
    }

    let mut score = 0;
    if is_heading(&node.tag) {
        score += 100;
    }
    score += text.chars().count().min(60) as i32;
    if text.split_whitespace().count() <= 2 {
        score -= 20;
    }
    let has_letters = text.chars().any(char::is_alphabetic);
    if has_letters && !text.chars().any(char::is_lowercase) {
        score -= 10;
    }
    Some(score)
}

/// Highest-scoring node; the earliest one wins a tie.
pub fn pick_title(nodes: &[TitleNode]) -> Option<&TitleNode> {
    let mut best: Option<(&TitleNode, i32)> = None;
    for node in nodes {
        let Some(score) = score_title_node(node) else {
            continue;
        };
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((node, score));
        }
    }
    best.map(|(node, _)| node)
}

fn is_heading(tag: &str) -> bool {
    matches!(tag, "h1" | "h2" | "h3" | "h4" | "h5" | "h6")
}

type TitleStrategy = fn(&ElementRef<'_>) -> Option<String>;

/// Tried in order; the first strategy returning a title wins.
const TITLE_STRATEGIES: [TitleStrategy; 2] = [anchor_text_title, ancestor_title];

fn anchor_text_title(anchor: &ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&anchor.text().collect::<String>());
    let lowered = text.to_lowercase();
    if CTA_PHRASES.contains(&lowered.as_str()) || text.chars().count() < MIN_ANCHOR_TITLE_LEN {
        return None;
    }
    Some(text)
}

fn ancestor_title(anchor: &ElementRef<'_>) -> Option<String> {
    anchor
        .ancestors()
        .filter_map(ElementRef::wrap)
        .take(MAX_ANCESTOR_LEVELS)
        .find_map(|ancestor| {
            let nodes: Vec<TitleNode> = ancestor
                .select(&TITLE_NODES)
                .map(|el| TitleNode {
                    tag: el.value().name().to_string(),
                    text: collapse_whitespace(&el.text().collect::<String>()),
                })
                .collect();
            pick_title(&nodes).map(|node| node.text.clone())
        })
}

fn resolve_title(anchor: &ElementRef<'_>) -> Option<String> {
    TITLE_STRATEGIES.iter().find_map(|strategy| strategy(anchor))
}

fn resolve_url(base: Option<&Url>, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() {
        return None;
    }
    let resolved = match base {
        Some(base) => base.join(href),
        None => Url::parse(href),
    };
    resolved.ok().map(String::from)
}

/// Every anchor on the listing page that has both a link and a usable
/// title. No deduplication happens here.
pub fn extract_job_links(listing_html: &str, base_url: &str) -> Vec<JobCandidate> {
    let document = Html::parse_document(listing_html);
    let base = Url::parse(base_url).ok();
    if base.is_none() {
        tracing::warn!("Career URL '{base_url}' is not absolute; relative links will be skipped");
    }

    let mut jobs = Vec::new();
    for anchor in document.select(&ANCHORS) {
        let Some(url) = anchor
            .value()
            .attr("href")
            .and_then(|href| resolve_url(base.as_ref(), href))
        else {
            continue;
        };
        let Some(title) = resolve_title(&anchor) else {
            continue;
        };
        jobs.push(JobCandidate { title, url });
    }

    tracing::debug!("Extracted {} candidate links from {base_url}", jobs.len());
    jobs
}
