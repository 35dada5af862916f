use std::collections::HashSet;

use futures::StreamExt;
use futures::stream;

use crate::error::HunterError;
use crate::extract::detail::fetch_detail;
use crate::extract::links::extract_job_links;
use crate::fetch::{PageFetcher, PageKind};
use crate::matcher::{Matcher, Rejection, Stage};
use crate::models::company::CareerSource;
use crate::models::job::{ErrorRecord, JobCandidate, JobRecord};
use crate::models::run::{CompanyReport, CompanyStatus, RunReport};
use crate::pipeline::sink::{AppendOutcome, SinkHandle};
use crate::rules::CompiledRules;

enum CandidateOutcome {
    Persisted,
    Rejected(Rejection),
}

/// Walks the companies one at a time and fans each company's job links
/// out over at most `concurrency` in-flight pipelines.
pub struct Pipeline {
    fetcher: Box<dyn PageFetcher>,
    rules: CompiledRules,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(fetcher: Box<dyn PageFetcher>, rules: CompiledRules, concurrency: usize) -> Self {
        Self {
            fetcher,
            rules,
            concurrency: concurrency.max(1),
        }
    }

    pub async fn run(&self, sources: &[CareerSource], sink: &SinkHandle) -> RunReport {
        let mut report = RunReport::start();
        tracing::info!(
            "Crawling {} companies with the {} fetcher",
            sources.len(),
            self.fetcher.name()
        );

        for (index, source) in sources.iter().enumerate() {
            tracing::info!(
                "[{}/{}] {} ({})",
                index + 1,
                sources.len(),
                source.company,
                source.career_url
            );
            let company = self.process_company(source, sink).await;
            tracing::info!(
                "{}: {} candidates, {} stored",
                company.company,
                company.candidates,
                company.persisted
            );
            if !company.rejected.is_empty() {
                tracing::debug!("{}: rejected by stage {:?}", company.company, company.rejected);
            }
            report.companies.push(company);
        }

        report.finish();
        report
    }

    async fn process_company(&self, source: &CareerSource, sink: &SinkHandle) -> CompanyReport {
        if self.rules.is_blocked_company(&source.company) {
            tracing::info!("Skipping blocked company '{}'", source.company);
            return CompanyReport::new(&source.company, &source.career_url, CompanyStatus::Blocked);
        }

        let company = &source.company;
        let html = match self.fetcher.fetch(&source.career_url, PageKind::Listing).await {
            Ok(html) => html,
            Err(e) => {
                let error = e.to_string();
                tracing::warn!("Failed to crawl {company}: {error}");
                let mut report = CompanyReport::new(
                    company,
                    &source.career_url,
                    CompanyStatus::ListingFailed(error.clone()),
                );
                let record = ErrorRecord {
                    company: company.clone(),
                    error,
                    career_url: source.career_url.clone(),
                };
                if let Err(e) = sink.record_error(record).await {
                    tracing::error!("Failed to record crawl error for {company}: {e}");
                }
                report.zero_links = self.record_zero_links(source, sink).await;
                return report;
            }
        };

        let candidates = unique_by_url(extract_job_links(&html, &source.career_url));
        let mut report =
            CompanyReport::new(company, &source.career_url, CompanyStatus::Processed);
        report.candidates = candidates.len();

        let matcher = Matcher::new(&self.rules);
        let outcomes: Vec<Result<CandidateOutcome, HunterError>> = stream::iter(candidates)
            .map(|candidate| self.process_candidate(&matcher, company, candidate, sink))
            .buffer_unordered(self.concurrency)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                Ok(CandidateOutcome::Persisted) => report.persisted += 1,
                Ok(CandidateOutcome::Rejected(rejection)) => {
                    report.record_rejection(rejection.stage)
                }
                Err(e) => {
                    tracing::error!("Failed to store a job for {company}: {e}");
                    report.write_failures += 1;
                }
            }
        }

        match sink.company_has_rows(company).await {
            Ok(true) => {}
            Ok(false) => report.zero_links = self.record_zero_links(source, sink).await,
            Err(e) => tracing::error!("Could not check stored rows for {company}: {e}"),
        }
        report
    }

    async fn record_zero_links(&self, source: &CareerSource, sink: &SinkHandle) -> bool {
        match sink
            .record_zero_links(&source.company, &source.career_url)
            .await
        {
            Ok(_) => true,
            Err(e) => {
                tracing::error!("Failed to record zero links for {}: {e}", source.company);
                false
            }
        }
    }

    async fn process_candidate(
        &self,
        matcher: &Matcher<'_>,
        company: &str,
        candidate: JobCandidate,
        sink: &SinkHandle,
    ) -> Result<CandidateOutcome, HunterError> {
        // dedup needs a sink round-trip, so only ask for URLs that pass the shape check
        let known = match matcher.check_url(&candidate.url) {
            Ok(_) => sink.is_known(&candidate.url).await?,
            Err(rejection) => return Ok(rejected(&candidate, rejection)),
        };
        if let Err(rejection) = matcher.screen(&candidate, known) {
            return Ok(rejected(&candidate, rejection));
        }

        let detail = fetch_detail(self.fetcher.as_ref(), &candidate.url, &self.rules).await;
        let result = match matcher.evaluate(&detail) {
            Ok(result) => result,
            Err(rejection) => return Ok(rejected(&candidate, rejection)),
        };

        let record = JobRecord::new(company, &candidate, &result);
        match sink.append(record).await? {
            AppendOutcome::Written { serial } => {
                tracing::info!(
                    "#{serial} {} ({}%) {}",
                    candidate.title,
                    result.score,
                    candidate.url
                );
                Ok(CandidateOutcome::Persisted)
            }
            AppendOutcome::Duplicate => Ok(rejected(
                &candidate,
                Rejection::new(Stage::Dedup, "stored by a concurrent job"),
            )),
        }
    }
}

fn rejected(candidate: &JobCandidate, rejection: Rejection) -> CandidateOutcome {
    tracing::debug!("Rejected '{}' {}: {rejection}", candidate.title, candidate.url);
    CandidateOutcome::Rejected(rejection)
}

/// First occurrence of every URL, in listing order.
fn unique_by_url(candidates: Vec<JobCandidate>) -> Vec<JobCandidate> {
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.url.clone()))
        .collect()
}
