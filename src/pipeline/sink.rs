use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::error::HunterError;
use crate::models::job::{
    ERROR_RECORD_HEADERS, ErrorRecord, JOB_RECORD_HEADERS, JobRecord, ZERO_LINK_HEADERS,
    ZeroLinkRecord,
};
use crate::text::clean_csv_value;

const COMMAND_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct SinkPaths {
    pub output: PathBuf,
    pub errors: PathBuf,
    pub zero_links: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Written { serial: u32 },
    /// The link was already in the file; nothing was written.
    Duplicate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkSummary {
    pub seeded_links: usize,
    pub known_links: usize,
    pub rows_written: usize,
    pub duplicates_skipped: usize,
    pub errors_written: usize,
    pub zero_links_written: usize,
}

enum SinkCommand {
    IsKnown {
        url: String,
        reply: oneshot::Sender<bool>,
    },
    Append {
        record: JobRecord,
        reply: oneshot::Sender<Result<AppendOutcome, HunterError>>,
    },
    RecordError {
        record: ErrorRecord,
        reply: oneshot::Sender<Result<(), HunterError>>,
    },
    RecordZeroLinks {
        company: String,
        career_url: String,
        reply: oneshot::Sender<Result<u32, HunterError>>,
    },
    CompanyHasRows {
        company: String,
        reply: oneshot::Sender<Result<bool, HunterError>>,
    },
}

/// Sole owner of the three result files, the set of stored job links and
/// the serial counter. Runs as one task; everything else talks to it
/// through a `SinkHandle`, so writes never interleave.
pub struct ResultSink {
    output_path: PathBuf,
    output: csv::Writer<File>,
    errors: csv::Writer<File>,
    zero_links: csv::Writer<File>,
    seen: HashSet<String>,
    next_serial: u32,
    next_zero_link_serial: u32,
    summary: SinkSummary,
}

impl ResultSink {
    /// Open all files. The output is appended to and its existing links
    /// seed the dedup set; the error and zero-link files start fresh.
    pub fn open(paths: &SinkPaths) -> Result<Self, HunterError> {
        let existing = read_existing_output(&paths.output)?;
        let is_new = existing.is_none();
        let (seen, last_serial) = existing.unwrap_or_default();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&paths.output)?;
        let mut output = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        if is_new {
            output.write_record(JOB_RECORD_HEADERS)?;
            output.flush()?;
        }

        let errors = fresh_writer(&paths.errors, &ERROR_RECORD_HEADERS)?;
        let zero_links = fresh_writer(&paths.zero_links, &ZERO_LINK_HEADERS)?;

        tracing::info!(
            "Appending to {} ({} existing job links)",
            paths.output.display(),
            seen.len()
        );

        Ok(Self {
            output_path: paths.output.clone(),
            output,
            errors,
            zero_links,
            summary: SinkSummary {
                seeded_links: seen.len(),
                known_links: seen.len(),
                ..SinkSummary::default()
            },
            seen,
            next_serial: last_serial.saturating_add(1),
            next_zero_link_serial: 1,
        })
    }

    /// Start the writer task. It ends once every handle is dropped and
    /// returns what it wrote.
    pub fn spawn(
        self,
    ) -> (SinkHandle, JoinHandle<Result<SinkSummary, HunterError>>) {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let task = tokio::spawn(self.run(rx));
        (SinkHandle { tx }, task)
    }

    async fn run(
        mut self,
        mut rx: mpsc::Receiver<SinkCommand>,
    ) -> Result<SinkSummary, HunterError> {
        while let Some(command) = rx.recv().await {
            self.handle(command);
        }
        self.output.flush()?;
        self.errors.flush()?;
        self.zero_links.flush()?;
        self.summary.known_links = self.seen.len();
        Ok(self.summary)
    }

    fn handle(&mut self, command: SinkCommand) {
        // a dropped reply receiver only means the caller stopped waiting
        match command {
            SinkCommand::IsKnown { url, reply } => {
                let _ = reply.send(self.is_known(&url));
            }
            SinkCommand::Append { record, reply } => {
                let _ = reply.send(self.append(record));
            }
            SinkCommand::RecordError { record, reply } => {
                let _ = reply.send(self.record_error(&record));
            }
            SinkCommand::RecordZeroLinks {
                company,
                career_url,
                reply,
            } => {
                let _ = reply.send(self.record_zero_links(&company, &career_url));
            }
            SinkCommand::CompanyHasRows { company, reply } => {
                let _ = reply.send(self.company_has_rows(&company));
            }
        }
    }

    pub fn is_known(&self, url: &str) -> bool {
        self.seen.contains(url.trim())
    }

    /// Write one job row. The link is marked as seen and the serial advances
    /// only once the row is flushed to disk.
    pub fn append(&mut self, mut record: JobRecord) -> Result<AppendOutcome, HunterError> {
        let link = record.job_link.trim().to_string();
        if self.seen.contains(&link) {
            self.summary.duplicates_skipped += 1;
            return Ok(AppendOutcome::Duplicate);
        }

        let serial = self.next_serial;
        record.s_no = serial;
        self.output.serialize(&record)?;
        self.output.flush()?;

        self.seen.insert(link);
        self.next_serial = self.next_serial.saturating_add(1);
        self.summary.rows_written += 1;
        Ok(AppendOutcome::Written { serial })
    }

    pub fn record_error(&mut self, record: &ErrorRecord) -> Result<(), HunterError> {
        self.errors.serialize(record)?;
        self.errors.flush()?;
        self.summary.errors_written += 1;
        Ok(())
    }

    pub fn record_zero_links(
        &mut self,
        company: &str,
        career_url: &str,
    ) -> Result<u32, HunterError> {
        let serial = self.next_zero_link_serial;
        self.zero_links.serialize(ZeroLinkRecord {
            s_no: serial,
            company: clean_csv_value(company),
            career_url: clean_csv_value(career_url),
        })?;
        self.zero_links.flush()?;
        self.next_zero_link_serial += 1;
        self.summary.zero_links_written += 1;
        Ok(serial)
    }

    /// Whether the output file on disk holds at least one row for `company`.
    pub fn company_has_rows(&mut self, company: &str) -> Result<bool, HunterError> {
        self.output.flush()?;
        let company = clean_csv_value(company);

        let mut reader = csv::Reader::from_path(&self.output_path)?;
        let Some(column) = column_index(reader.headers()?, "company") else {
            return Ok(false);
        };
        for row in reader.records() {
            let row = row?;
            if row.get(column).is_some_and(|value| value.trim() == company) {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

/// Cloneable sender side of the sink.
#[derive(Clone)]
pub struct SinkHandle {
    tx: mpsc::Sender<SinkCommand>,
}

impl SinkHandle {
    async fn request<T>(
        &self,
        command: impl FnOnce(oneshot::Sender<T>) -> SinkCommand,
    ) -> Result<T, HunterError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(command(reply))
            .await
            .map_err(|_| HunterError::SinkClosed)?;
        response.await.map_err(|_| HunterError::SinkClosed)
    }

    pub async fn is_known(&self, url: &str) -> Result<bool, HunterError> {
        let url = url.to_string();
        self.request(|reply| SinkCommand::IsKnown { url, reply }).await
    }

    pub async fn append(&self, record: JobRecord) -> Result<AppendOutcome, HunterError> {
        self.request(|reply| SinkCommand::Append { record, reply })
            .await?
    }

    pub async fn record_error(&self, record: ErrorRecord) -> Result<(), HunterError> {
        self.request(|reply| SinkCommand::RecordError { record, reply })
            .await?
    }

    pub async fn record_zero_links(
        &self,
        company: &str,
        career_url: &str,
    ) -> Result<u32, HunterError> {
        let company = company.to_string();
        let career_url = career_url.to_string();
        self.request(|reply| SinkCommand::RecordZeroLinks {
            company,
            career_url,
            reply,
        })
        .await?
    }

    pub async fn company_has_rows(&self, company: &str) -> Result<bool, HunterError> {
        let company = company.to_string();
        self.request(|reply| SinkCommand::CompanyHasRows { company, reply })
            .await?
    }
}

fn fresh_writer(path: &Path, headers: &[&str]) -> Result<csv::Writer<File>, HunterError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(File::create(path)?);
    writer.write_record(headers)?;
    writer.flush()?;
    Ok(writer)
}

fn column_index(headers: &csv::StringRecord, name: &str) -> Option<usize> {
    headers.iter().position(|h| h.trim() == name)
}

/// Links and highest serial of an existing output file, `None` when the
/// file is missing or empty.
fn read_existing_output(path: &Path) -> Result<Option<(HashSet<String>, u32)>, HunterError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => {}
        Ok(_) => return Ok(None),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();
    let link_column = column_index(&headers, "job_link")
        .ok_or_else(|| HunterError::MissingColumn("job_link".to_string()))?;
    let serial_column = column_index(&headers, "s_no");

    let mut links = HashSet::new();
    let mut last_serial = 0;
    for row in reader.records() {
        let row = row?;
        if let Some(link) = row.get(link_column).map(str::trim)
            && !link.is_empty()
        {
            links.insert(link.to_string());
        }
        if let Some(serial) = serial_column
            .and_then(|c| row.get(c))
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            last_serial = last_serial.max(serial);
        }
    }
    Ok(Some((links, last_serial)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(dir: &Path) -> SinkPaths {
        SinkPaths {
            output: dir.join("jobs.csv"),
            errors: dir.join("errors.csv"),
            zero_links: dir.join("zero_links.csv"),
        }
    }

    fn record(company: &str, link: &str, score: f64) -> JobRecord {
        JobRecord {
            s_no: 0,
            company: company.into(),
            job_title: "Senior Software Engineer".into(),
            job_link: link.into(),
            yoe: None,
            match_percentage: score,
            extracted_keywords_count: 1,
            extracted_keywords: "go".into(),
            extracted_locations: "remote".into(),
        }
    }

    fn read_rows(path: &Path) -> Vec<JobRecord> {
        csv::Reader::from_path(path)
            .unwrap()
            .deserialize()
            .collect::<Result<Vec<JobRecord>, _>>()
            .unwrap()
    }

    #[test]
    fn new_file_gets_header_and_dense_serials() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        let mut sink = ResultSink::open(&paths).unwrap();

        assert_eq!(
            sink.append(record("Acme", "https://acme.com/jobs/1", 10.0)).unwrap(),
            AppendOutcome::Written { serial: 1 }
        );
        assert_eq!(
            sink.append(record("Acme", "https://acme.com/jobs/1", 10.0)).unwrap(),
            AppendOutcome::Duplicate
        );
        assert_eq!(
            sink.append(record("Acme", "https://acme.com/jobs/2", 20.0)).unwrap(),
            AppendOutcome::Written { serial: 2 }
        );

        let contents = std::fs::read_to_string(&paths.output).unwrap();
        assert!(contents.starts_with(&JOB_RECORD_HEADERS.join(",")));
        assert_eq!(read_rows(&paths.output).len(), 2);
    }

    #[test]
    fn reopening_seeds_links_and_continues_serials() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        {
            let mut sink = ResultSink::open(&paths).unwrap();
            sink.append(record("Acme", "https://acme.com/jobs/1", 10.0)).unwrap();
            sink.append(record("Acme", "https://acme.com/jobs/2", 10.0)).unwrap();
        }

        let mut sink = ResultSink::open(&paths).unwrap();
        assert!(sink.is_known("https://acme.com/jobs/1"));
        assert_eq!(
            sink.append(record("Acme", "https://acme.com/jobs/2", 10.0)).unwrap(),
            AppendOutcome::Duplicate
        );
        assert_eq!(
            sink.append(record("Globex", "https://globex.io/jobs/9", 10.0)).unwrap(),
            AppendOutcome::Written { serial: 3 }
        );

        let contents = std::fs::read_to_string(&paths.output).unwrap();
        assert_eq!(contents.matches("s_no,company").count(), 1);
        let links: Vec<String> = read_rows(&paths.output).into_iter().map(|r| r.job_link).collect();
        assert_eq!(links.len(), 3);
    }

    #[test]
    fn diagnostics_files_start_fresh_each_run() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        std::fs::write(&paths.errors, "Company,Error,Career URL\nOld,boom,https://old\n").unwrap();

        let mut sink = ResultSink::open(&paths).unwrap();
        sink.record_error(&ErrorRecord {
            company: "Acme".into(),
            error: "Timeout 60000ms exceeded.".into(),
            career_url: "https://acme.com/careers".into(),
        })
        .unwrap();
        assert_eq!(sink.record_zero_links("Acme", "https://acme.com/careers").unwrap(), 1);
        assert_eq!(sink.record_zero_links("Globex", "https://globex.io").unwrap(), 2);

        let errors = std::fs::read_to_string(&paths.errors).unwrap();
        assert!(!errors.contains("Old"));
        assert!(errors.contains("Acme,Timeout 60000ms exceeded.,https://acme.com/careers"));
        let zero = std::fs::read_to_string(&paths.zero_links).unwrap();
        assert_eq!(zero.lines().count(), 3);
    }

    #[test]
    fn company_rows_are_read_back_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut sink = ResultSink::open(&paths(dir.path())).unwrap();
        assert!(!sink.company_has_rows("Acme").unwrap());
        sink.append(record("Acme", "https://acme.com/jobs/1", 10.0)).unwrap();
        assert!(sink.company_has_rows("Acme").unwrap());
        assert!(!sink.company_has_rows("Globex").unwrap());
    }

    #[test]
    fn max_existing_serial_does_not_overflow() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        std::fs::write(
            &paths.output,
            format!(
                "{}\n4294967295,Acme,Engineer,https://acme.com/jobs/1,,10.0,1,go,bangalore\n",
                JOB_RECORD_HEADERS.join(",")
            ),
        )
        .unwrap();

        let mut sink = ResultSink::open(&paths).unwrap();
        assert!(sink.is_known("https://acme.com/jobs/1"));
        assert_eq!(
            sink.append(record("Acme", "https://acme.com/jobs/2", 10.0)).unwrap(),
            AppendOutcome::Written { serial: u32::MAX }
        );
    }

    #[test]
    fn existing_file_without_link_column_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        std::fs::write(&paths.output, "foo,bar\n1,2\n").unwrap();
        assert!(matches!(
            ResultSink::open(&paths),
            Err(HunterError::MissingColumn(_))
        ));
    }

    #[tokio::test]
    async fn handles_serialize_concurrent_appends() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = paths(dir.path());
        let (handle, task) = ResultSink::open(&paths).unwrap().spawn();

        let mut joins = Vec::new();
        for i in 0..40 {
            let handle = handle.clone();
            // every link appears twice
            let link = format!("https://acme.com/jobs/{}", i % 20);
            joins.push(tokio::spawn(async move {
                handle.append(record("Acme", &link, 5.0)).await.unwrap()
            }));
        }
        let mut written = 0;
        for join in joins {
            if matches!(join.await.unwrap(), AppendOutcome::Written { .. }) {
                written += 1;
            }
        }
        assert_eq!(written, 20);
        assert!(handle.is_known("https://acme.com/jobs/3").await.unwrap());
        drop(handle);

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.rows_written, 20);
        assert_eq!(summary.duplicates_skipped, 20);
        assert_eq!(summary.known_links, 20);

        let mut serials: Vec<u32> = read_rows(&paths.output).into_iter().map(|r| r.s_no).collect();
        serials.sort_unstable();
        assert_eq!(serials, (1..=20).collect::<Vec<_>>());
    }
}
