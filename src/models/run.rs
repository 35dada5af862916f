use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::matcher::Stage;

/// How one company's crawl ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompanyStatus {
    Processed,
    Blocked,
    ListingFailed(String),
}

#[derive(Debug, Clone)]
pub struct CompanyReport {
    pub company: String,
    pub career_url: String,
    pub status: CompanyStatus,
    pub candidates: usize,
    pub persisted: usize,
    pub write_failures: usize,
    pub rejected: BTreeMap<Stage, usize>,
    /// Company had no row in the output file after processing.
    pub zero_links: bool,
}

impl CompanyReport {
    pub fn new(company: &str, career_url: &str, status: CompanyStatus) -> Self {
        Self {
            company: company.to_string(),
            career_url: career_url.to_string(),
            status,
            candidates: 0,
            persisted: 0,
            write_failures: 0,
            rejected: BTreeMap::new(),
            zero_links: false,
        }
    }

    pub fn record_rejection(&mut self, stage: Stage) {
        *self.rejected.entry(stage).or_insert(0) += 1;
    }
}

/// Everything a run produced, returned by the orchestrator.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub companies: Vec<CompanyReport>,
}

impl RunReport {
    pub fn start() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            companies: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn persisted(&self) -> usize {
        self.companies.iter().map(|c| c.persisted).sum()
    }

    pub fn failed(&self) -> impl Iterator<Item = (&CompanyReport, &str)> {
        self.companies.iter().filter_map(|c| match &c.status {
            CompanyStatus::ListingFailed(error) => Some((c, error.as_str())),
            _ => None,
        })
    }

    pub fn zero_link_companies(&self) -> usize {
        self.companies.iter().filter(|c| c.zero_links).count()
    }

    pub fn elapsed_secs(&self) -> i64 {
        let end = self.finished_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_seconds()
    }
}
