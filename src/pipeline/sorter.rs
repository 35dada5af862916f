use std::cmp::Ordering;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::HunterError;
use crate::models::job::{JOB_RECORD_HEADERS, JobRecord};

fn compare(a: &JobRecord, b: &JobRecord) -> Ordering {
    a.company
        .to_lowercase()
        .cmp(&b.company.to_lowercase())
        .then_with(|| b.match_percentage.total_cmp(&a.match_percentage))
}

/// Order rows by company (case-insensitive) then score, highest first.
/// Equal rows keep their relative order. Serials are renumbered 1..N.
pub fn sort_records(records: &mut [JobRecord]) {
    records.sort_by(compare);
    for (index, record) in records.iter_mut().enumerate() {
        record.s_no = index as u32 + 1;
    }
}

/// Rewrite the output file sorted and renumbered. The new content goes to a
/// temp file next to it which then replaces the old file in one rename.
/// Returns the number of rows; a missing file is left alone.
pub fn sort_output(path: &Path) -> Result<usize, HunterError> {
    if !path.exists() {
        tracing::debug!("Nothing to sort, {} does not exist", path.display());
        return Ok(0);
    }

    let mut records = csv::Reader::from_path(path)?
        .deserialize()
        .collect::<Result<Vec<JobRecord>, _>>()?;
    sort_records(&mut records);

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(&mut temp);
        writer.write_record(JOB_RECORD_HEADERS)?;
        for record in &records {
            writer.serialize(record)?;
        }
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| HunterError::Io(e.error))?;

    tracing::info!("Sorted {} rows in {}", records.len(), path.display());
    Ok(records.len())
}
