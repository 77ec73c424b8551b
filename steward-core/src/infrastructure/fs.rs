// steward-core/src/infrastructure/fs.rs

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::domain::batch::Record;
use crate::infrastructure::error::InfrastructureError;

/// Write content to a file atomically: the data goes to a temporary file in
/// the target directory which is then renamed over the target.
pub fn atomic_write<P: AsRef<Path>, C: AsRef<[u8]>>(
    path: P,
    content: C,
) -> Result<(), InfrastructureError> {
    let path = path.as_ref();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let mut temp_file = tempfile::NamedTempFile::new_in(parent)?;
    temp_file.write_all(content.as_ref())?;
    temp_file
        .persist(path)
        .map_err(|e| InfrastructureError::Io(e.error))?;

    Ok(())
}

/// Reads one JSON object per non-blank line.
pub fn read_ndjson(path: &Path) -> Result<Vec<Record>, InfrastructureError> {
    let content = fs::read_to_string(path)?;
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| serde_json::from_str::<Record>(line).map_err(InfrastructureError::from))
        .collect()
}

pub fn write_ndjson(path: &Path, records: &[Record]) -> Result<(), InfrastructureError> {
    let mut out = String::new();
    for record in records {
        out.push_str(&serde_json::to_string(record)?);
        out.push('\n');
    }
    atomic_write(path, out)
}

/// `<domain>.json` files directly under `dir`, keyed by domain name.
pub fn discover_domain_files(dir: &Path) -> Result<BTreeMap<String, PathBuf>, InfrastructureError> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| InfrastructureError::Io(e.into()))?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().and_then(|e| e.to_str()) != Some("json")
        {
            continue;
        }
        if let Some(domain) = path.file_stem().and_then(|s| s.to_str()) {
            files.insert(domain.to_string(), path.to_path_buf());
        }
    }
    Ok(files)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_overwrites_existing() -> Result<()> {
        let dir = tempdir()?;
        let file_path = dir.path().join("person.txt");

        atomic_write(&file_path, "Initial")?;
        atomic_write(&file_path, "Updated")?;

        assert_eq!(fs::read_to_string(file_path)?, "Updated");
        Ok(())
    }

    #[test]
    fn test_ndjson_skips_blank_lines() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("person.json");
        fs::write(&path, "{\"person_id\": 1}\n\n{\"person_id\": 2}\n")?;

        let records = read_ndjson(&path)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["person_id"], json!(2));

        let out = dir.path().join("person.txt");
        write_ndjson(&out, &records)?;
        assert_eq!(fs::read_to_string(out)?, "{\"person_id\":1}\n{\"person_id\":2}\n");
        Ok(())
    }

    #[test]
    fn test_malformed_line_is_a_json_error() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("death.json");
        fs::write(&path, "{\"person_id\": 1\n")?;

        assert!(matches!(
            read_ndjson(&path),
            Err(InfrastructureError::JsonError(_))
        ));
        Ok(())
    }

    #[test]
    fn test_discover_domain_files() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("person.json"), "")?;
        fs::write(dir.path().join("measurement.json"), "")?;
        fs::write(dir.path().join("notes.md"), "")?;
        fs::create_dir(dir.path().join("nested"))?;
        fs::write(dir.path().join("nested").join("death.json"), "")?;

        let files = discover_domain_files(dir.path())?;
        assert_eq!(
            files.keys().collect::<Vec<_>>(),
            vec!["measurement", "person"]
        );
        Ok(())
    }
}
