//! Extract command implementation.

use crate::cli::ExtractArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Result;
use std::path::Path;
use tarmill_core::decompress;

pub fn execute(args: &ExtractArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let dest = args.dest.as_deref().unwrap_or_else(|| Path::new("."));
    let options = args.options();
    log::debug!("extracting {} with {options:?}", args.archive.display());

    let report = add_archive_context(decompress(&args.archive, dest, options), &args.archive)?;

    if report.stopped_early {
        formatter.format_warning("extraction stopped early; remaining entries were not read");
    }
    formatter.format_extraction_result(&report)?;

    Ok(())
}
