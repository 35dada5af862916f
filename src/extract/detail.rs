use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::extract::location;
use crate::fetch::{PageFetcher, PageKind};
use crate::models::job::JobDetail;
use crate::rules::CompiledRules;

const HIDDEN_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "head", "footer"];

/// Footers and non-rendered elements; their text is never part of a posting.
pub(crate) fn is_stripped(element: &ElementRef<'_>) -> bool {
    let value = element.value();
    if HIDDEN_TAGS.contains(&value.name()) {
        return true;
    }
    value
        .attr("class")
        .is_some_and(|class| class.to_lowercase().contains("footer"))
}

/// Visible text of the page without footers, joined by single spaces.
pub fn visible_text(document: &Html) -> String {
    let mut words: Vec<&str> = Vec::new();
    for node in document.root_element().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|el| is_stripped(&el));
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }
    words.join(" ")
}

/// Description and locations of an already fetched detail page.
pub fn parse_detail(html: &str, rules: &CompiledRules) -> JobDetail {
    let document = Html::parse_document(html);
    let description = visible_text(&document);
    let extracted_locations = location::resolve(&document, &description, rules);
    JobDetail {
        description,
        extracted_locations,
        fetch_error: None,
    }
}

/// Fetch and parse one job-detail page. A failed fetch comes back as an
/// empty detail carrying the error message.
pub async fn fetch_detail(
    fetcher: &dyn PageFetcher,
    url: &str,
    rules: &CompiledRules,
) -> JobDetail {
    match fetcher.fetch(url, PageKind::Detail).await {
        Ok(html) => parse_detail(&html, rules),
        Err(e) => {
            tracing::debug!("Detail fetch failed for {url}: {e}");
            JobDetail {
                fetch_error: Some(e.to_string()),
                ..JobDetail::default()
            }
        }
    }
}
