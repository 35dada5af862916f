use std::path::Path;

use serde::Deserialize;

use crate::error::HunterError;

const REQUIRED_COLUMNS: [&str; 2] = ["company", "career_url"];

/// One row of the input file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CareerSource {
    pub company: String,
    pub career_url: String,
}

impl CareerSource {
    /// Read every company from the input CSV. Any malformed row aborts the
    /// whole load; nothing is crawled from a partially readable file.
    pub fn load_all(path: &Path) -> Result<Vec<CareerSource>, HunterError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let headers = reader.headers()?.clone();
        for column in REQUIRED_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(HunterError::MissingColumn(column.to_string()));
            }
        }

        let mut sources = Vec::new();
        for (index, row) in reader.deserialize::<CareerSource>().enumerate() {
            let source = row?;
            // header is line 1
            let line = index + 2;
            if source.company.is_empty() {
                return Err(HunterError::MalformedInput(format!(
                    "line {line}: empty company name"
                )));
            }
            if source.career_url.is_empty() {
                return Err(HunterError::MalformedInput(format!(
                    "line {line}: empty career_url for '{}'",
                    source.company
                )));
            }
            sources.push(source);
        }

        tracing::info!("Loaded {} companies from {}", sources.len(), path.display());
        Ok(sources)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_input(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("companies.csv");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn loads_trimmed_rows() {
        let (_dir, path) = write_input(
            "company, career_url\n Acme , https://acme.com/careers \n\
             Globex,https://globex.io/jobs\n",
        );
        let sources = CareerSource::load_all(&path).unwrap();
        assert_eq!(
            sources,
            vec![
                CareerSource {
                    company: "Acme".into(),
                    career_url: "https://acme.com/careers".into(),
                },
                CareerSource {
                    company: "Globex".into(),
                    career_url: "https://globex.io/jobs".into(),
                },
            ]
        );
    }

    #[test]
    fn missing_column_is_fatal() {
        let (_dir, path) = write_input("company,url\nAcme,https://acme.com\n");
        let err = CareerSource::load_all(&path).unwrap_err();
        assert!(matches!(err, HunterError::MissingColumn(col) if col == "career_url"));
    }

    #[test]
    fn blank_url_is_fatal() {
        let (_dir, path) = write_input("company,career_url\nAcme,\n");
        assert!(matches!(
            CareerSource::load_all(&path),
            Err(HunterError::MalformedInput(_))
        ));
    }

    #[test]
    fn missing_file_is_fatal() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(CareerSource::load_all(&dir.path().join("nope.csv")).is_err());
    }
}
