use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::Deserialize;

use crate::error::HunterError;
use crate::text::{WordPattern, compile_all};

/// Keyword, title and location rules for one run. Fields missing from a
/// rules file keep the built-in defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub include_keywords: Vec<String>,
    pub exclude_keywords: Vec<String>,
    /// Each group matches when every one of its words is in the title.
    pub include_title_groups: Vec<Vec<String>>,
    pub exclude_titles: Vec<String>,
    pub allowed_locations: Vec<String>,
    pub blocked_locations: Vec<String>,
    pub other_locations: Vec<String>,
    pub blocked_companies: Vec<String>,
    /// Canonical location name -> textual aliases.
    pub location_aliases: BTreeMap<String, Vec<String>>,
    /// Reject descriptions containing any `exclude_keywords` entry.
    pub filter_exclude_keywords: bool,
}

impl MatchConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, HunterError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path)?;
        let config: MatchConfig = toml::from_str(&raw)?;
        tracing::info!("Loaded match rules from {}", path.display());
        Ok(config)
    }
}

/// Location name known to the rules, with the aliases that mark it in free text.
#[derive(Debug, Clone)]
pub struct KnownLocation {
    pub canonical: String,
    pub aliases: Vec<WordPattern>,
}

/// `MatchConfig` with every term lower-cased and compiled once.
#[derive(Debug, Clone)]
pub struct CompiledRules {
    pub include_keywords: Vec<WordPattern>,
    pub exclude_keywords: Vec<WordPattern>,
    pub include_title_groups: Vec<Vec<WordPattern>>,
    pub exclude_titles: Vec<WordPattern>,
    pub allowed_locations: BTreeSet<String>,
    pub blocked_locations: BTreeSet<String>,
    pub known_locations: Vec<KnownLocation>,
    pub blocked_companies: BTreeSet<String>,
    pub filter_exclude_keywords: bool,
}

impl CompiledRules {
    pub fn new(config: &MatchConfig) -> Result<Self, HunterError> {
        let include_title_groups = config
            .include_title_groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| compile_all(group))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            include_keywords: compile_all(&config.include_keywords)?,
            exclude_keywords: compile_all(&config.exclude_keywords)?,
            include_title_groups,
            exclude_titles: compile_all(&config.exclude_titles)?,
            allowed_locations: lowered(&config.allowed_locations),
            blocked_locations: lowered(&config.blocked_locations),
            known_locations: known_locations(config)?,
            blocked_companies: lowered(&config.blocked_companies),
            filter_exclude_keywords: config.filter_exclude_keywords,
        })
    }

    pub fn is_blocked_company(&self, company: &str) -> bool {
        self.blocked_companies.contains(&company.trim().to_lowercase())
    }

    /// Canonical name for a location fragment that is one of the known aliases.
    pub fn canonical_location(&self, fragment: &str) -> Option<&str> {
        self.known_locations
            .iter()
            .find(|loc| loc.aliases.iter().any(|alias| alias.word() == fragment))
            .map(|loc| loc.canonical.as_str())
    }
}

fn lowered(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .collect()
}

fn known_locations(config: &MatchConfig) -> Result<Vec<KnownLocation>, HunterError> {
    let aliases: BTreeMap<String, BTreeSet<String>> = config
        .location_aliases
        .iter()
        .map(|(canonical, aliases)| {
            let mut set = lowered(aliases);
            set.insert(canonical.trim().to_lowercase());
            (canonical.trim().to_lowercase(), set)
        })
        .collect();

    let mut canonicals = lowered(&config.allowed_locations);
    canonicals.extend(lowered(&config.blocked_locations));
    canonicals.extend(lowered(&config.other_locations));
    canonicals.extend(aliases.keys().cloned());

    canonicals
        .into_iter()
        .map(|canonical| -> Result<KnownLocation, HunterError> {
            let words: Vec<String> = match aliases.get(&canonical) {
                Some(set) => set.iter().cloned().collect(),
                None => vec![canonical.clone()],
            };
            Ok(KnownLocation {
                aliases: compile_all(&words)?,
                canonical,
            })
        })
        .collect()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_string()).collect()
}

const DEFAULT_TITLE_GROUPS: &[&[&str]] = &[
    &["senior", "software", "engineer"],
    &["senior", "software", "developer"],
    &["senior", "fullstack", "engineer"],
    &["senior", "full", "stack", "engineer"],
    &["senior", "full-stack", "engineer"],
    &["senior", "fullstack", "developer"],
    &["senior", "full", "stack", "developer"],
    &["senior", "full-stack", "developer"],
    &["senior", "backend", "engineer"],
    &["senior", "backend", "developer"],
    &["senior", "software", "development", "engineer"],
    &["software", "development", "engineer", "iii"],
    &["software", "development", "engineer", "3"],
    &["software", "development", "engineer", "iv"],
    &["software", "development", "engineer", "4"],
    &["sde3"],
    &["sde4"],
    // SMTS
    &["senior", "member", "technical"],
];

const DEFAULT_LOCATION_ALIASES: &[(&str, &[&str])] = &[
    ("bangalore", &["bangalore", "bengaluru", "blr"]),
    ("remote", &["remote", "work from home", "wfh", "anywhere"]),
    ("india", &["india"]),
    ("gurgaon", &["gurgaon", "gurugram"]),
    ("mumbai", &["mumbai", "bombay"]),
];

impl Default for MatchConfig {
    fn default() -> Self {
        let include_title_groups = DEFAULT_TITLE_GROUPS
            .iter()
            .map(|group| strings(group))
            .collect();

        let location_aliases = DEFAULT_LOCATION_ALIASES
            .iter()
            .map(|(canonical, aliases)| ((*canonical).to_string(), strings(aliases)))
            .collect();

        Self {
            include_keywords: strings(&[
                "javascript",
                "typescript",
                "go",
                "golang",
                "python",
                "node.js",
                "nestjs",
                "nest.js",
                "next.js",
                "react",
                "react.js",
                "graphql",
                "aws",
                "kafka",
                "sql",
                "postgresql",
                "nosql",
                "mongodb",
                "oops",
                "object oriented programming",
                "object-oriented programming",
                "docker",
                "vue.js",
                "redis",
                "jest",
                "grpc",
            ]),
            exclude_keywords: strings(&["java", "spring boot", "c++", "c", "c#", "react native"]),
            include_title_groups,
            exclude_titles: strings(&[
                "test",
                "qa",
                "manager",
                "principal",
                "staff",
                "lead",
                "frontend",
                "devops",
                "cloud",
                "junior",
                "machine learning",
                "distinguished",
                "head",
                "compliance",
                "security",
                "graduate",
                "ai",
                "support",
                "designer",
                "intern",
                "contract",
                "contractor",
                "android",
                "ios",
                "analyst",
            ]),
            allowed_locations: strings(&["bangalore", "remote", "india"]),
            blocked_locations: strings(&[
                // North America
                "canada",
                "united states",
                "usa",
                "u.s.",
                "north america",
                // Europe
                "europe",
                "eu",
                "emea",
                "poland",
                "germany",
                "france",
                "uk",
                "united kingdom",
                "england",
                "scotland",
                "ireland",
                "netherlands",
                "belgium",
                "sweden",
                "norway",
                "finland",
                "denmark",
                "switzerland",
                "austria",
                "spain",
                "portugal",
                "italy",
                "czech",
                "czech republic",
                "slovakia",
                "hungary",
                "romania",
                "bulgaria",
                "croatia",
                "slovenia",
                "latvia",
                "lithuania",
                "estonia",
                // APAC outside India
                "australia",
                "new zealand",
                "singapore",
                "japan",
                "south korea",
                "korea",
                "china",
                "hong kong",
                "taiwan",
                // Middle East
                "uae",
                "united arab emirates",
                "dubai",
                "qatar",
                "saudi arabia",
                // Latin America
                "mexico",
                "brazil",
                "argentina",
                "chile",
                "colombia",
                // Africa
                "south africa",
                "nigeria",
                "kenya",
                "turkey",
            ]),
            other_locations: strings(&[
                "hyderabad",
                "chennai",
                "pune",
                "mumbai",
                "delhi",
                "noida",
                "gurgaon",
                "kolkata",
            ]),
            blocked_companies: Vec::new(),
            location_aliases,
            filter_exclude_keywords: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_file_overrides_only_given_fields() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            r#"
include_keywords = ["rust", "tokio"]
include_title_groups = [["rust", "engineer"]]
blocked_companies = ["Acme"]
"#,
        )
        .unwrap();

        let config = MatchConfig::load(Some(&path)).unwrap();
        assert_eq!(config.include_keywords, vec!["rust", "tokio"]);
        assert_eq!(config.include_title_groups, vec![vec!["rust", "engineer"]]);
        assert_eq!(config.allowed_locations, vec!["bangalore", "remote", "india"]);

        let rules = CompiledRules::new(&config).unwrap();
        assert!(rules.is_blocked_company(" acme "));
        assert!(!rules.is_blocked_company("Acme Labs"));
    }

    #[test]
    fn malformed_rules_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(&path, "include_keywords = \"not a list\"").unwrap();
        assert!(matches!(
            MatchConfig::load(Some(&path)),
            Err(HunterError::Rules(_))
        ));
    }

    #[test]
    fn known_locations_cover_config_and_alias_table() {
        let rules = CompiledRules::new(&MatchConfig::default()).unwrap();
        let names: Vec<&str> = rules
            .known_locations
            .iter()
            .map(|loc| loc.canonical.as_str())
            .collect();
        assert!(names.contains(&"bangalore"));
        assert!(names.contains(&"germany"));
        assert!(names.contains(&"hyderabad"));
        assert_eq!(rules.canonical_location("bengaluru"), Some("bangalore"));
        assert_eq!(rules.canonical_location("gurugram"), Some("gurgaon"));
        assert_eq!(rules.canonical_location("karnataka"), None);
    }
}
