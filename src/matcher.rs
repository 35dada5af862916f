use std::fmt;

use crate::models::job::{JobCandidate, JobDetail, MatchResult};
use crate::rules::CompiledRules;
use crate::scoring;
use crate::text::matched_words;

const BAD_URL_SEGMENTS: [&str; 8] = [
    "/collections/",
    "/software/",
    "/products/",
    "/solutions/",
    "/platform/",
    "/jira/",
    "/confluence/",
    "/bitbucket/",
];

const GOOD_URL_SEGMENTS: [&str; 14] = [
    "/careers",
    "/jobs/",
    "/job/",
    "/position/",
    "/positions/",
    "/open-position/",
    "/open-positions/",
    "/openings/",
    "/opening/",
    "/role/",
    "/roles/",
    "/careers/details/",
    "/careers/job-description",
    "/job-description",
];

/// Filter stages in evaluation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    UrlShape,
    Dedup,
    Title,
    Description,
    Location,
    Score,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::UrlShape => "url-shape",
            Stage::Dedup => "dedup",
            Stage::Title => "title",
            Stage::Description => "description",
            Stage::Location => "location",
            Stage::Score => "score",
        };
        f.write_str(name)
    }
}

/// Stages that only need the listing data, run before the detail fetch.
pub const PRE_FETCH_STAGES: [Stage; 3] = [Stage::UrlShape, Stage::Dedup, Stage::Title];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub stage: Stage,
    pub reason: String,
}

impl Rejection {
    pub fn new(stage: Stage, reason: impl Into<String>) -> Self {
        Self {
            stage,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.stage, self.reason)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlVerdict {
    /// Contains a known job-detail path segment.
    JobPath,
    /// Nothing matched either list.
    Default,
}

pub struct Matcher<'a> {
    rules: &'a CompiledRules,
}

impl<'a> Matcher<'a> {
    pub fn new(rules: &'a CompiledRules) -> Self {
        Self { rules }
    }

    /// Run the pre-fetch stages. `already_known` tells whether the URL is
    /// already stored.
    pub fn screen(&self, candidate: &JobCandidate, already_known: bool) -> Result<(), Rejection> {
        for stage in PRE_FETCH_STAGES {
            match stage {
                Stage::UrlShape => {
                    self.check_url(&candidate.url)?;
                }
                Stage::Dedup => check_dedup(already_known)?,
                Stage::Title => self.check_title(&candidate.title)?,
                _ => unreachable!("only pre-fetch stages are listed"),
            }
        }
        Ok(())
    }

    /// Run the post-fetch stages and score the job.
    pub fn evaluate(&self, detail: &JobDetail) -> Result<MatchResult, Rejection> {
        let matched_keywords = self.check_description(detail)?;
        let matched_locations = self.check_location(&detail.extracted_locations)?;

        let yoe = scoring::extract_yoe(&detail.description);
        let score = scoring::score(
            yoe.is_some(),
            matched_keywords.len(),
            self.rules.include_keywords.len(),
        );
        check_score(score)?;

        Ok(MatchResult {
            matched: true,
            matched_keywords,
            matched_locations,
            yoe,
            score,
        })
    }

    pub fn check_url(&self, url: &str) -> Result<UrlVerdict, Rejection> {
        let url = url.trim().to_lowercase();
        if !(url.starts_with("https://") || url.starts_with("www.")) {
            return Err(Rejection::new(Stage::UrlShape, "not an https or www URL"));
        }
        if let Some(segment) = BAD_URL_SEGMENTS.iter().find(|s| url.contains(*s)) {
            return Err(Rejection::new(
                Stage::UrlShape,
                format!("non-job path segment '{segment}'"),
            ));
        }
        if GOOD_URL_SEGMENTS.iter().any(|s| url.contains(s)) {
            return Ok(UrlVerdict::JobPath);
        }
        Ok(UrlVerdict::Default)
    }

    pub fn check_title(&self, title: &str) -> Result<(), Rejection> {
        let title = title.to_lowercase();

        if let Some(excluded) = self.rules.exclude_titles.iter().find(|p| p.is_match(&title)) {
            return Err(Rejection::new(
                Stage::Title,
                format!("excluded title word '{}'", excluded.word()),
            ));
        }

        let included = self
            .rules
            .include_title_groups
            .iter()
            .any(|group| group.iter().all(|word| word.is_match(&title)));
        if !included {
            return Err(Rejection::new(Stage::Title, "no include group matched"));
        }
        Ok(())
    }

    pub fn check_description(&self, detail: &JobDetail) -> Result<Vec<String>, Rejection> {
        if detail.description.trim().is_empty() {
            let reason = match &detail.fetch_error {
                Some(error) => format!("detail fetch failed: {error}"),
                None => "empty description".to_string(),
            };
            return Err(Rejection::new(Stage::Description, reason));
        }

        let description = detail.description.to_lowercase();

        if self.rules.filter_exclude_keywords
            && let Some(excluded) = self
                .rules
                .exclude_keywords
                .iter()
                .find(|p| p.is_match(&description))
        {
            return Err(Rejection::new(
                Stage::Description,
                format!("excluded keyword '{}'", excluded.word()),
            ));
        }

        let matched = matched_words(&self.rules.include_keywords, &description);
        if matched.is_empty() {
            return Err(Rejection::new(Stage::Description, "no include keyword found"));
        }
        Ok(matched)
    }

    pub fn check_location(&self, locations: &[String]) -> Result<Vec<String>, Rejection> {
        if let Some(blocked) = locations
            .iter()
            .find(|loc| self.rules.blocked_locations.contains(loc.as_str()))
        {
            return Err(Rejection::new(
                Stage::Location,
                format!("blocked location '{blocked}'"),
            ));
        }

        let matched: Vec<String> = locations
            .iter()
            .filter(|loc| self.rules.allowed_locations.contains(loc.as_str()))
            .cloned()
            .collect();
        if matched.is_empty() {
            return Err(Rejection::new(
                Stage::Location,
                format!("no allowed location in {locations:?}"),
            ));
        }
        Ok(matched)
    }
}

fn check_dedup(already_known: bool) -> Result<(), Rejection> {
    if already_known {
        return Err(Rejection::new(Stage::Dedup, "job link already stored"));
    }
    Ok(())
}

/// A score that rounds to zero (a single hit in a very long keyword list, no
/// YOE) is not a match.
fn check_score(score: f64) -> Result<(), Rejection> {
    if score <= 0.0 {
        return Err(Rejection::new(Stage::Score, "score is zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::MatchConfig;

    fn rules() -> CompiledRules {
        CompiledRules::new(&MatchConfig::default()).unwrap()
    }

    fn candidate(title: &str, url: &str) -> JobCandidate {
        JobCandidate {
            title: title.into(),
            url: url.into(),
        }
    }

    fn detail(description: &str, locations: &[&str]) -> JobDetail {
        JobDetail {
            description: description.into(),
            extracted_locations: locations.iter().map(|l| l.to_string()).collect(),
            fetch_error: None,
        }
    }

    #[test]
    fn url_shape_accepts_job_paths_and_rejects_product_pages() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        assert_eq!(
            matcher.check_url("https://co.com/careers/jobs/123"),
            Ok(UrlVerdict::JobPath)
        );
        let rejected = matcher.check_url("https://co.com/products/catalog").unwrap_err();
        assert_eq!(rejected.stage, Stage::UrlShape);
        assert_eq!(
            matcher.check_url("https://co.com/team/backend-42"),
            Ok(UrlVerdict::Default)
        );
        assert!(matcher.check_url("http://co.com/jobs/1").is_err());
        assert!(matcher.check_url("www.co.com/open-positions/7").is_ok());
    }

    #[test]
    fn bad_segment_wins_over_good_segment() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        assert!(matcher.check_url("https://co.com/jobs/platform/engineer").is_err());
    }

    #[test]
    fn title_needs_every_word_of_a_group() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        assert!(matcher.check_title("Senior Software Engineer").is_ok());
        assert!(matcher.check_title("Engineer, Software (Senior)").is_ok());
        assert!(matcher.check_title("Software Engineer").is_err());
    }

    #[test]
    fn excluded_title_word_rejects_even_with_group_match() {
        let config = MatchConfig {
            include_title_groups: vec![vec!["software".into(), "engineer".into()]],
            exclude_titles: vec!["intern".into()],
            ..MatchConfig::default()
        };
        let rules = CompiledRules::new(&config).unwrap();
        let matcher = Matcher::new(&rules);
        let rejected = matcher.check_title("Software Engineer Intern").unwrap_err();
        assert_eq!(rejected.stage, Stage::Title);
        assert!(rejected.reason.contains("intern"));
        assert!(matcher.check_title("Software Engineer").is_ok());
    }

    #[test]
    fn excluded_title_matches_whole_words() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        // "ai" must not fire inside "maintain"
        assert!(matcher.check_title("Senior Software Engineer - Maintainers").is_ok());
        assert!(matcher.check_title("Senior Software Engineer, AI").is_err());
    }

    #[test]
    fn screen_stops_at_first_failing_stage() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        let job = candidate("Senior Software Engineer", "https://co.com/jobs/1");
        assert!(matcher.screen(&job, false).is_ok());
        assert_eq!(matcher.screen(&job, true).unwrap_err().stage, Stage::Dedup);

        let bad = candidate("Software Intern", "https://co.com/products/x");
        assert_eq!(matcher.screen(&bad, false).unwrap_err().stage, Stage::UrlShape);
    }

    #[test]
    fn description_records_every_keyword() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        let keywords = matcher
            .check_description(&detail("Go, Kafka and Redis on AWS", &[]))
            .unwrap();
        assert_eq!(keywords, vec!["go", "aws", "kafka", "redis"]);

        let failed = JobDetail {
            fetch_error: Some("timeout".into()),
            ..JobDetail::default()
        };
        let rejected = matcher.check_description(&failed).unwrap_err();
        assert_eq!(rejected.stage, Stage::Description);
        assert!(rejected.reason.contains("timeout"));
    }

    #[test]
    fn exclude_keywords_only_apply_when_enabled() {
        let description = detail("Java and Python services", &[]);

        let rules = rules();
        assert!(Matcher::new(&rules).check_description(&description).is_ok());

        let config = MatchConfig {
            filter_exclude_keywords: true,
            ..MatchConfig::default()
        };
        let strict = CompiledRules::new(&config).unwrap();
        let rejected = Matcher::new(&strict).check_description(&description).unwrap_err();
        assert!(rejected.reason.contains("java"));
    }

    #[test]
    fn location_needs_allowed_and_no_blocked() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        let locs = |l: &[&str]| l.iter().map(|s| s.to_string()).collect::<Vec<_>>();

        assert_eq!(
            matcher.check_location(&locs(&["bangalore", "india"])).unwrap(),
            vec!["bangalore", "india"]
        );
        assert!(matcher.check_location(&locs(&["remote", "germany"])).is_err());
        assert!(matcher.check_location(&locs(&["hyderabad"])).is_err());
        assert!(matcher.check_location(&[]).is_err());
    }

    #[test]
    fn zero_score_is_rejected_at_score_stage() {
        // 70 / 20000 keywords rounds to 0.00
        assert_eq!(scoring::score(false, 1, 20_000), 0.0);
        let rejected = check_score(scoring::score(false, 1, 20_000)).unwrap_err();
        assert_eq!(rejected.stage, Stage::Score);
        assert!(check_score(0.01).is_ok());
        assert!(check_score(scoring::score(true, 0, 26)).is_ok());
    }

    #[test]
    fn evaluate_scores_surviving_jobs() {
        let rules = rules();
        let matcher = Matcher::new(&rules);
        let result = matcher
            .evaluate(&detail("We want 4+ years of Go and Kafka.", &["bangalore"]))
            .unwrap();
        assert!(result.matched);
        assert_eq!(result.yoe, Some(4));
        assert_eq!(result.matched_keywords, vec!["go", "kafka"]);
        assert_eq!(result.matched_locations, vec!["bangalore"]);
        // 30 + 70 * 2/26
        assert_eq!(result.score, 35.38);
        assert!(result.score > 0.0 && result.score <= 100.0);
    }
}
