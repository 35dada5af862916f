use serde::{Deserialize, Serialize};

use crate::text::clean_csv_value;

/// A link found on a listing page, before any filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobCandidate {
    pub title: String,
    pub url: String,
}

/// What a job-detail page yielded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobDetail {
    pub description: String,
    pub extracted_locations: Vec<String>,
    /// Set when the detail fetch failed; `description` is empty then.
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub matched: bool,
    pub matched_keywords: Vec<String>,
    pub matched_locations: Vec<String>,
    pub yoe: Option<u32>,
    pub score: f64,
}

/// Column order of the output file.
pub const JOB_RECORD_HEADERS: [&str; 9] = [
    "s_no",
    "company",
    "job_title",
    "job_link",
    "yoe",
    "match_percentage",
    "extracted_keywords_count",
    "extracted_keywords",
    "extracted_locations",
];

/// One row of the output file. Field order must follow `JOB_RECORD_HEADERS`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub s_no: u32,
    pub company: String,
    pub job_title: String,
    pub job_link: String,
    pub yoe: Option<u32>,
    pub match_percentage: f64,
    pub extracted_keywords_count: usize,
    pub extracted_keywords: String,
    pub extracted_locations: String,
}

impl JobRecord {
    /// Build a row for `candidate`; the serial is assigned by the sink at write time.
    pub fn new(company: &str, candidate: &JobCandidate, result: &MatchResult) -> Self {
        Self {
            s_no: 0,
            company: clean_csv_value(company),
            job_title: clean_csv_value(&candidate.title),
            job_link: clean_csv_value(&candidate.url),
            yoe: result.yoe,
            match_percentage: result.score,
            extracted_keywords_count: result.matched_keywords.len(),
            extracted_keywords: clean_csv_value(&result.matched_keywords.join(", ")),
            extracted_locations: clean_csv_value(&result.matched_locations.join(", ")),
        }
    }
}

/// Company-level crawl failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Error")]
    pub error: String,
    #[serde(rename = "Career URL")]
    pub career_url: String,
}

pub const ERROR_RECORD_HEADERS: [&str; 3] = ["Company", "Error", "Career URL"];

/// Company that ended the run with nothing in the output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZeroLinkRecord {
    pub s_no: u32,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Career URL")]
    pub career_url: String,
}

pub const ZERO_LINK_HEADERS: [&str; 3] = ["s_no", "Company", "Career URL"];
