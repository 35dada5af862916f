pub mod runner;
pub mod sink;
pub mod sorter;

use crate::config::{FetcherKind, RunArgs};
use crate::error::HunterError;
use crate::fetch::PageFetcher;
use crate::fetch::chrome::{ChromeFetcher, ChromeOptions};
use crate::fetch::http::HttpFetcher;
use crate::models::company::CareerSource;
use crate::models::run::RunReport;
use crate::rules::{CompiledRules, MatchConfig};
use runner::Pipeline;
use sink::{ResultSink, SinkPaths, SinkSummary};

/// One full crawl: open the sink, walk every company, close the sink and
/// sort the output file.
pub async fn run_pipeline(
    sources: &[CareerSource],
    fetcher: Box<dyn PageFetcher>,
    rules: CompiledRules,
    paths: &SinkPaths,
    concurrency: usize,
) -> Result<(RunReport, SinkSummary), HunterError> {
    let (handle, task) = ResultSink::open(paths)?.spawn();
    let pipeline = Pipeline::new(fetcher, rules, concurrency);

    let report = pipeline.run(sources, &handle).await;

    // the sink task exits once the last handle is gone
    drop(handle);
    let summary = task.await.map_err(|_| HunterError::SinkClosed)??;

    sorter::sort_output(&paths.output)?;
    Ok((report, summary))
}

fn build_fetcher(args: &RunArgs) -> Result<Box<dyn PageFetcher>, HunterError> {
    Ok(match args.fetcher {
        FetcherKind::Chrome => Box::new(ChromeFetcher::launch(
            !args.headful,
            ChromeOptions::default(),
        )?),
        FetcherKind::Http => Box::new(HttpFetcher::new()?),
    })
}

/// Entry point of the `run` command.
pub async fn execute(args: &RunArgs) -> anyhow::Result<()> {
    let Some(input) = args.input.as_deref() else {
        anyhow::bail!("No input file given (use --input or JOB_HUNTER_INPUT)");
    };

    let sources = CareerSource::load_all(input)?;

    let config = MatchConfig::load(args.rules.as_deref())?;
    let rules = CompiledRules::new(&config)?;
    let fetcher = build_fetcher(args)?;

    let paths = SinkPaths {
        output: args.output.clone(),
        errors: args.errors.clone(),
        zero_links: args.zero_links.clone(),
    };

    let (report, summary) = tokio::select! {
        biased;
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!(
                "Interrupted; rows written so far are kept in {}",
                paths.output.display()
            );
            return Ok(());
        }
        result = run_pipeline(&sources, fetcher, rules, &paths, args.concurrency) => result?,
    };

    log_summary(&report, &summary, &paths);
    Ok(())
}

fn log_summary(report: &RunReport, summary: &SinkSummary, paths: &SinkPaths) {
    tracing::info!(
        "Done in {}s: {} new jobs ({} total) in {}",
        report.elapsed_secs(),
        report.persisted(),
        summary.known_links,
        paths.output.display()
    );

    let write_failures: usize = report.companies.iter().map(|c| c.write_failures).sum();
    if write_failures > 0 {
        tracing::error!("{write_failures} matched jobs could not be written");
    }

    let failed = failure_lines(report);
    if failed.is_empty() {
        tracing::info!("No company-level crawl errors");
    } else {
        tracing::warn!(
            "{} companies failed to crawl (see {}):",
            failed.len(),
            paths.errors.display()
        );
        for line in &failed {
            tracing::warn!("  {line}");
        }
    }

    tracing::info!(
        "{} companies without stored jobs (see {})",
        report.zero_link_companies(),
        paths.zero_links.display()
    );
    tracing::debug!(
        "Sink: {} rows, {} seeded links, {} duplicates, {} error rows, {} zero-link rows",
        summary.rows_written,
        summary.seeded_links,
        summary.duplicates_skipped,
        summary.errors_written,
        summary.zero_links_written
    );
}

/// Numbered `company (career url): error` lines for every failed listing.
fn failure_lines(report: &RunReport) -> Vec<String> {
    report
        .failed()
        .enumerate()
        .map(|(index, (company, error))| {
            format!(
                "{}. {} ({}): {error}",
                index + 1,
                company.company,
                company.career_url
            )
        })
        .collect()
}
