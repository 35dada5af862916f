use std::time::{Duration, Instant};

/// Text that marks a "reveal more listings" control.
pub const LOAD_MORE_VOCABULARY: [&str; 3] = ["show more", "load more", "more jobs"];

/// Elements with more descendants than this are page sections, not buttons.
pub const MAX_DESCENDANTS: usize = 10;

/// A clickable-looking element as seen by the expander.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickCandidate {
    /// Handle the page uses to click this element again.
    pub id: usize,
    pub tag: String,
    pub text: String,
    pub descendant_count: usize,
    pub visible: bool,
    pub clickable: bool,
}

/// A live page the expander can inspect and click.
pub trait ExpandablePage {
    fn clickable_candidates(&self) -> anyhow::Result<Vec<ClickCandidate>>;
    fn click(&self, id: usize) -> anyhow::Result<()>;
    fn anchor_count(&self) -> anyhow::Result<usize>;
}

#[derive(Debug, Clone)]
pub struct ExpandOptions {
    pub max_iterations: usize,
    /// How long to wait for new anchors after a click.
    pub growth_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for ExpandOptions {
    fn default() -> Self {
        Self {
            max_iterations: 25,
            growth_timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(250),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    NoButton,
    ClickFailed,
    NoGrowth,
    IterationCap,
    PageError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpandSummary {
    pub clicks: usize,
    pub stop: StopReason,
}

fn matches_vocabulary(text: &str) -> bool {
    let text = text.to_lowercase();
    LOAD_MORE_VOCABULARY.iter().any(|phrase| text.contains(phrase))
}

/// The most specific visible, clickable load-more control: the one with the
/// fewest descendants, earliest on ties.
pub fn pick_load_more(candidates: &[ClickCandidate]) -> Option<&ClickCandidate> {
    candidates
        .iter()
        .filter(|c| c.visible && c.clickable)
        .filter(|c| c.descendant_count <= MAX_DESCENDANTS)
        .filter(|c| matches_vocabulary(&c.text))
        .min_by_key(|c| c.descendant_count)
}

/// Click load-more controls until the listing stops growing. Never fails;
/// the summary says why it stopped.
pub fn expand_listing(page: &dyn ExpandablePage, options: &ExpandOptions) -> ExpandSummary {
    let mut clicks = 0;

    let stop = loop {
        if clicks >= options.max_iterations {
            break StopReason::IterationCap;
        }

        let candidates = match page.clickable_candidates() {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::debug!("Could not inspect page for load-more controls: {e}");
                break StopReason::PageError;
            }
        };
        let Some(button) = pick_load_more(&candidates) else {
            break StopReason::NoButton;
        };

        let before = match page.anchor_count() {
            Ok(count) => count,
            Err(e) => {
                tracing::debug!("Could not count anchors: {e}");
                break StopReason::PageError;
            }
        };

        if let Err(e) = page.click(button.id) {
            tracing::debug!("Clicking '{}' failed: {e}", button.text);
            break StopReason::ClickFailed;
        }
        clicks += 1;
        tracing::debug!("Clicked '{}' ({clicks}), waiting for more links", button.text);

        if !wait_for_growth(page, before, options) {
            break StopReason::NoGrowth;
        }
    };

    tracing::debug!("Listing expansion stopped after {clicks} clicks: {stop:?}");
    ExpandSummary { clicks, stop }
}

fn wait_for_growth(page: &dyn ExpandablePage, before: usize, options: &ExpandOptions) -> bool {
    let deadline = Instant::now() + options.growth_timeout;
    loop {
        match page.anchor_count() {
            Ok(count) if count > before => return true,
            Ok(_) => {}
            Err(_) => return false,
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(options.poll_interval);
    }
}
