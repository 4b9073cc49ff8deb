//! Writing log views, downloaded logs and profile exports to disk

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;

use vllmscope_api::LogDownload;
use vllmscope_types::{LogRecord, ProfileExport};

const DEFAULT_DOWNLOAD_NAME: &str = "vllm_logs.log";

fn timestamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Write the records currently shown in the log viewer, one line each
pub fn export_log_view(dir: &Path, records: &[LogRecord]) -> Result<(PathBuf, usize)> {
    let path = dir.join(format!("vllm_logs_{}.log", timestamp()));
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        writeln!(writer, "{}", record.export_line())?;
    }
    writer.flush()?;

    Ok((path, records.len()))
}

/// Save a server log download under the name the backend suggested
///
/// Only the final path component of that name is used.
pub fn save_log_download(dir: &Path, download: &LogDownload) -> Result<PathBuf> {
    let name = Path::new(&download.filename)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_DOWNLOAD_NAME);
    let path = dir.join(name);

    fs::write(&path, &download.content)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// Save exported profiles as JSON
pub fn save_profiles(dir: &Path, export: &ProfileExport) -> Result<PathBuf> {
    let path = dir.join(format!("vllm_profiles_{}.json", timestamp()));
    fs::write(&path, export.profiles_json.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vllmscope_types::Severity;

    #[test]
    fn test_export_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![
            LogRecord::new("2024-05-01 10:00:00", Severity::Info, "ready"),
            LogRecord {
                timestamp: "2024-05-01 10:00:01".to_string(),
                level: Severity::Error,
                message: "boom".to_string(),
                raw_line: "ERROR 05-01 10:00:01 boom".to_string(),
            },
        ];

        let (path, count) = export_log_view(dir.path(), &records).unwrap();
        assert_eq!(count, 2);
        let content = fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines, vec!["2024-05-01 10:00:00 INFO ready", "ERROR 05-01 10:00:01 boom"]);
    }

    #[test]
    fn test_download_name_cannot_escape_directory() {
        let dir = tempfile::tempdir().unwrap();
        let download = LogDownload {
            filename: "../../etc/vllm.log".to_string(),
            content: b"line\n".to_vec(),
        };

        let path = save_log_download(dir.path(), &download).unwrap();
        assert_eq!(path, dir.path().join("vllm.log"));
        assert_eq!(fs::read(path).unwrap(), b"line\n");
    }

    #[test]
    fn test_download_falls_back_to_default_name() {
        let dir = tempfile::tempdir().unwrap();
        let download = LogDownload {
            filename: "..".to_string(),
            content: Vec::new(),
        };
        let path = save_log_download(dir.path(), &download).unwrap();
        assert_eq!(path.file_name().unwrap(), DEFAULT_DOWNLOAD_NAME);
    }

    #[test]
    fn test_save_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let export = ProfileExport {
            profiles_json: "[]".to_string(),
            count: 0,
        };
        let path = save_profiles(dir.path(), &export).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "[]");
    }
}
