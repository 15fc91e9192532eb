//! Human-readable output formatter with colors and styling.

use super::formatter::OutputFormatter;
use anyhow::Result;
use console::Term;
use console::style;
use std::path::Path;
use tarmill_core::CreationReport;
use tarmill_core::EntryHeader;
use tarmill_core::EntryKind;
use tarmill_core::ExtractionReport;

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
    err_term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
            err_term: Term::stderr(),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn format_size(bytes: u64) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;

        if bytes >= GB {
            format!("{:.1} GB", bytes as f64 / GB as f64)
        } else if bytes >= MB {
            format!("{:.1} MB", bytes as f64 / MB as f64)
        } else if bytes >= KB {
            format!("{:.1} KB", bytes as f64 / KB as f64)
        } else {
            format!("{bytes} B")
        }
    }

    fn format_number(n: usize) -> String {
        let s = n.to_string();
        let mut result = String::new();
        let mut count = 0;

        for c in s.chars().rev() {
            if count == 3 {
                result.push(',');
                count = 0;
            }
            result.push(c);
            count += 1;
        }

        result.chars().rev().collect()
    }

    const fn type_char(kind: EntryKind) -> char {
        match kind {
            EntryKind::File => '-',
            EntryKind::Directory => 'd',
            EntryKind::Symlink => 'l',
            EntryKind::Hardlink => 'h',
            EntryKind::Fifo => 'p',
            EntryKind::CharDevice => 'c',
            EntryKind::BlockDevice => 'b',
            EntryKind::Socket => 's',
        }
    }

    fn write_heading(&self, text: &str) {
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {text}", style("✓").green().bold()));
        } else {
            let _ = self.term.write_line(text);
        }
    }

    fn write_warnings(&self, warnings: &[String]) {
        if warnings.is_empty() {
            return;
        }
        let _ = self.term.write_line("");
        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{}", style("Warnings:").yellow().bold()));
        } else {
            let _ = self.term.write_line("Warnings:");
        }
        for warning in warnings {
            let _ = self.term.write_line(&format!("  - {warning}"));
        }
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_heading("Extraction complete");

        let _ = self
            .term
            .write_line(&format!("  Files extracted: {}", Self::format_number(report.files_extracted)));
        let _ = self.term.write_line(&format!(
            "  Directories:     {}",
            Self::format_number(report.directories_created)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:      {}",
            Self::format_size(report.bytes_written)
        ));

        if report.entries_skipped > 0 {
            let _ = self
                .term
                .write_line(&format!("  Entries skipped: {}", report.entries_skipped));
        }

        if self.verbose {
            if let Some(compression) = report.compression {
                let _ = self
                    .term
                    .write_line(&format!("  Compression:     {compression}"));
            }
            let _ = self
                .term
                .write_line(&format!("  Symlinks:        {}", report.symlinks_created));
            let _ = self
                .term
                .write_line(&format!("  Hard links:      {}", report.hardlinks_created));
            let _ = self.term.write_line(&format!(
                "  Archive size:    {}",
                Self::format_size(report.archive_size)
            ));
            let _ = self
                .term
                .write_line(&format!("  Duration:        {:?}", report.duration));
        }

        self.write_warnings(&report.warnings);

        Ok(())
    }

    fn format_creation_result(&self, output_path: &Path, report: &CreationReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.write_heading(&format!("Archive created: {}", output_path.display()));

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "  Files added:      {}",
            Self::format_number(report.files_added)
        ));
        let _ = self.term.write_line(&format!(
            "  Directories:      {}",
            Self::format_number(report.directories_added)
        ));
        let _ = self.term.write_line(&format!(
            "  Total size:       {}",
            Self::format_size(report.bytes_written)
        ));

        if report.bytes_compressed > 0 {
            let _ = self.term.write_line(&format!(
                "  Compressed size:  {}",
                Self::format_size(report.bytes_compressed)
            ));
            let _ = self.term.write_line(&format!(
                "  Ratio:            {:.2}x",
                report.compression_ratio()
            ));
        }

        if report.entries_skipped > 0 {
            let _ = self
                .term
                .write_line(&format!("  Entries skipped:  {}", report.entries_skipped));
        }

        if self.verbose {
            let _ = self
                .term
                .write_line(&format!("  Symlinks:         {}", report.symlinks_added));
            let _ = self.term.write_line(&format!(
                "  Special files:    {}",
                report.special_files_added
            ));
            let _ = self
                .term
                .write_line(&format!("  Duration:         {:?}", report.duration));
        }

        self.write_warnings(&report.warnings);

        Ok(())
    }

    fn format_listing(&self, entries: &[EntryHeader]) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        if !self.verbose {
            for entry in entries {
                let _ = self.term.write_line(&format!("{}", entry.path.display()));
            }
            return Ok(());
        }

        for entry in entries {
            let link = entry
                .link_target
                .as_ref()
                .map_or_else(String::new, |target| format!(" -> {}", target.display()));
            let _ = self.term.write_line(&format!(
                "{}{:<6o} {:>5}/{:<5} {:>10}  {}{}",
                Self::type_char(entry.kind),
                entry.mode,
                entry.uid,
                entry.gid,
                entry.size,
                entry.path.display(),
                link
            ));
        }

        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "Total: {} entries, {}",
            Self::format_number(entries.len()),
            Self::format_size(entries.iter().map(|e| e.size).sum())
        ));

        Ok(())
    }

    fn format_error(&self, error: &anyhow::Error) {
        // Always show errors, even in quiet mode
        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {error:?}", style("ERROR:").red().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("ERROR: {error:?}"));
        }
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .err_term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.err_term.write_line(&format!("WARNING: {message}"));
        }
    }
}
