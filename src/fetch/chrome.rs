use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;

use crate::error::HunterError;
use crate::fetch::expander::{
    ClickCandidate, ExpandOptions, ExpandablePage, LOAD_MORE_VOCABULARY, expand_listing,
};
use crate::fetch::{FetchError, PageFetcher, PageKind};

/// Job-card selectors seen on common career sites and ATS boards. The first
/// one that shows up ends the wait.
const JOB_SELECTORS: [&str; 4] = [
    "a.apply-card",
    "[data-testid='job']",
    "a[href*='job']",
    "a[href*='careers']",
];

const CANDIDATE_ATTR: &str = "data-jh-candidate";

#[derive(Debug, Clone)]
pub struct ChromeOptions {
    pub navigation_timeout: Duration,
    pub selector_timeout: Duration,
    /// Pause after the selector wait so late scripts can render.
    pub settle_delay: Duration,
    pub expand: ExpandOptions,
}

impl Default for ChromeOptions {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(60),
            selector_timeout: Duration::from_secs(8),
            settle_delay: Duration::from_secs(2),
            expand: ExpandOptions::default(),
        }
    }
}

/// Headless Chrome fetcher. One browser per run, one tab per fetch; the
/// blocking CDP calls run on tokio's blocking pool.
pub struct ChromeFetcher {
    browser: Arc<Browser>,
    options: ChromeOptions,
}

impl ChromeFetcher {
    pub fn launch(headless: bool, options: ChromeOptions) -> Result<Self, HunterError> {
        let launch = LaunchOptions {
            headless,
            ignore_certificate_errors: true,
            idle_browser_timeout: Duration::from_secs(600),
            args: vec![OsStr::new("--disable-blink-features=AutomationControlled")],
            ..Default::default()
        };
        let browser = Browser::new(launch)
            .map_err(|e| HunterError::Browser(format!("Failed to launch Chrome: {e}")))?;
        tracing::info!("Chrome launched (headless: {headless})");
        Ok(Self {
            browser: Arc::new(browser),
            options,
        })
    }
}

#[async_trait]
impl PageFetcher for ChromeFetcher {
    fn name(&self) -> &str {
        "chrome"
    }

    async fn fetch(&self, url: &str, kind: PageKind) -> Result<String, FetchError> {
        let browser = Arc::clone(&self.browser);
        let options = self.options.clone();
        let target = url.to_string();

        let joined =
            tokio::task::spawn_blocking(move || fetch_blocking(&browser, &target, kind, &options))
                .await;

        match joined {
            Ok(Ok(html)) => Ok(html),
            Ok(Err(e)) => {
                let error = FetchError::new(e);
                tracing::warn!("Chrome failed for {url}: {error}");
                Err(error)
            }
            Err(e) => Err(FetchError::new(format!("Fetch task failed: {e}"))),
        }
    }
}

fn fetch_blocking(
    browser: &Browser,
    url: &str,
    kind: PageKind,
    options: &ChromeOptions,
) -> anyhow::Result<String> {
    let tab = browser.new_tab()?;
    let result = load_page(&tab, url, kind, options);
    if let Err(e) = tab.close(false) {
        tracing::debug!("Closing tab for {url} failed: {e}");
    }
    result
}

fn load_page(
    tab: &Arc<Tab>,
    url: &str,
    kind: PageKind,
    options: &ChromeOptions,
) -> anyhow::Result<String> {
    tab.set_default_timeout(options.navigation_timeout);
    tab.navigate_to(url)?;
    tab.wait_until_navigated()?;

    for selector in JOB_SELECTORS {
        if tab
            .wait_for_element_with_custom_timeout(selector, options.selector_timeout)
            .is_ok()
        {
            break;
        }
    }
    std::thread::sleep(options.settle_delay);

    if kind == PageKind::Listing {
        let page = ChromePage { tab };
        let summary = expand_listing(&page, &options.expand);
        if summary.clicks > 0 {
            tracing::info!("Expanded listing {url} with {} clicks", summary.clicks);
        }
    }

    tab.get_content()
}

#[derive(Debug, Deserialize)]
struct RawCandidate {
    id: usize,
    tag: String,
    text: String,
    descendant_count: usize,
    visible: bool,
    clickable: bool,
}

struct ChromePage<'a> {
    tab: &'a Arc<Tab>,
}

impl ChromePage<'_> {
    fn evaluate(&self, script: &str) -> anyhow::Result<serde_json::Value> {
        let object = self.tab.evaluate(script, false)?;
        object
            .value
            .ok_or_else(|| anyhow::anyhow!("script returned no value"))
    }
}

fn candidates_script() -> String {
    let vocabulary = serde_json::to_string(&LOAD_MORE_VOCABULARY).unwrap_or_else(|_| "[]".into());
    format!(
        r#"(() => {{
  const vocab = {vocabulary};
  document.querySelectorAll('[{CANDIDATE_ATTR}]').forEach(el => el.removeAttribute('{CANDIDATE_ATTR}'));
  const out = [];
  let id = 0;
  for (const el of document.querySelectorAll('body *')) {{
    const text = (el.innerText || '').trim().toLowerCase();
    if (!text || text.length > 200 || !vocab.some(v => text.includes(v))) continue;
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    const visible = style.visibility !== 'hidden' && style.display !== 'none'
      && rect.width > 0 && rect.height > 0;
    const tag = el.tagName.toLowerCase();
    const clickable = tag === 'button' || tag === 'a'
      || el.getAttribute('role') === 'button'
      || typeof el.onclick === 'function' || style.cursor === 'pointer';
    el.setAttribute('{CANDIDATE_ATTR}', String(id));
    out.push({{ id, tag, text, descendant_count: el.getElementsByTagName('*').length, visible, clickable }});
    id += 1;
  }}
  return JSON.stringify(out);
}})()"#
    )
}

impl ExpandablePage for ChromePage<'_> {
    fn clickable_candidates(&self) -> anyhow::Result<Vec<ClickCandidate>> {
        let value = self.evaluate(&candidates_script())?;
        let json = value
            .as_str()
            .ok_or_else(|| anyhow::anyhow!("candidate scan did not return a string"))?;
        let raw: Vec<RawCandidate> = serde_json::from_str(json)?;
        Ok(raw
            .into_iter()
            .map(|c| ClickCandidate {
                id: c.id,
                tag: c.tag,
                text: c.text,
                descendant_count: c.descendant_count,
                visible: c.visible,
                clickable: c.clickable,
            })
            .collect())
    }

    fn click(&self, id: usize) -> anyhow::Result<()> {
        let script = format!(
            r#"(() => {{
  const el = document.querySelector('[{CANDIDATE_ATTR}="{id}"]');
  if (!el) return false;
  el.scrollIntoView({{ block: 'center' }});
  el.click();
  return true;
}})()"#
        );
        match self.evaluate(&script)?.as_bool() {
            Some(true) => Ok(()),
            _ => anyhow::bail!("load-more element {id} is gone"),
        }
    }

    fn anchor_count(&self) -> anyhow::Result<usize> {
        let value = self.evaluate("document.querySelectorAll('a').length")?;
        value
            .as_u64()
            .or_else(|| value.as_f64().map(|n| n as u64))
            .map(|n| n as usize)
            .ok_or_else(|| anyhow::anyhow!("anchor count is not a number"))
    }
}
