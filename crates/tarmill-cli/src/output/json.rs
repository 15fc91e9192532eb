//! JSON output formatter for machine-readable results.

use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;
use tarmill_core::CreationReport;
use tarmill_core::EntryHeader;
use tarmill_core::ExtractionReport;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct ListedEntry {
    path: String,
    kind: &'static str,
    size: u64,
    mode: String,
    mtime: u64,
    uid: u64,
    gid: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    link_target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

impl From<&EntryHeader> for ListedEntry {
    fn from(header: &EntryHeader) -> Self {
        Self {
            path: header.path.display().to_string(),
            kind: header.kind.label(),
            size: header.size,
            mode: format!("{:o}", header.mode),
            mtime: header.mtime,
            uid: header.uid,
            gid: header.gid,
            link_target: header
                .link_target
                .as_ref()
                .map(|target| target.display().to_string()),
            warnings: header.warnings.clone(),
        }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        #[derive(Serialize)]
        struct ExtractionOutput {
            compression: Option<&'static str>,
            files_extracted: usize,
            directories_created: usize,
            symlinks_created: usize,
            hardlinks_created: usize,
            entries_skipped: usize,
            bytes_written: u64,
            archive_size: u64,
            stopped_early: bool,
            duration_ms: u128,
            warnings: Vec<String>,
        }

        let data = ExtractionOutput {
            compression: report.compression.map(|c| c.name()),
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            symlinks_created: report.symlinks_created,
            hardlinks_created: report.hardlinks_created,
            entries_skipped: report.entries_skipped,
            bytes_written: report.bytes_written,
            archive_size: report.archive_size,
            stopped_early: report.stopped_early,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        };

        let output = JsonOutput::success("extract", data);
        Self::output(&output)
    }

    fn format_creation_result(&self, output_path: &Path, report: &CreationReport) -> Result<()> {
        #[derive(Serialize)]
        struct CreationOutput {
            output_path: String,
            compression: Option<&'static str>,
            files_added: usize,
            directories_added: usize,
            symlinks_added: usize,
            special_files_added: usize,
            bytes_written: u64,
            bytes_compressed: u64,
            compression_ratio: f64,
            entries_skipped: usize,
            duration_ms: u128,
            warnings: Vec<String>,
        }

        let data = CreationOutput {
            output_path: output_path.display().to_string(),
            compression: report.compression.map(|c| c.name()),
            files_added: report.files_added,
            directories_added: report.directories_added,
            symlinks_added: report.symlinks_added,
            special_files_added: report.special_files_added,
            bytes_written: report.bytes_written,
            bytes_compressed: report.bytes_compressed,
            compression_ratio: report.compression_ratio(),
            entries_skipped: report.entries_skipped,
            duration_ms: report.duration.as_millis(),
            warnings: report.warnings.clone(),
        };

        let output = JsonOutput::success("create", data);
        Self::output(&output)
    }

    fn format_listing(&self, entries: &[EntryHeader]) -> Result<()> {
        #[derive(Serialize)]
        struct ListOutput {
            total_entries: usize,
            total_size: u64,
            entries: Vec<ListedEntry>,
        }

        let data = ListOutput {
            total_entries: entries.len(),
            total_size: entries.iter().map(|e| e.size).sum(),
            entries: entries.iter().map(ListedEntry::from).collect(),
        };

        let output = JsonOutput::success("list", data);
        Self::output(&output)
    }

    fn format_error(&self, error: &anyhow::Error) {
        let output = JsonOutput::error("unknown", format!("{error:?}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::warning(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
