//! Create command implementation.

use crate::cli::CreateArgs;
use crate::error::add_archive_context;
use crate::output::OutputFormatter;
use anyhow::Context;
use anyhow::Result;
use anyhow::bail;
use std::path::Path;
use tarmill_core::ArchiveBuilder;
use tarmill_core::ArchiveOptions;
use tarmill_core::UNBOUNDED_DEPTH;

pub fn execute(args: &CreateArgs, formatter: &dyn OutputFormatter) -> Result<()> {
    let mut options = ArchiveOptions::default()
        .with_compression(args.compression)
        .with_dereference_symlinks(args.dereference)
        .with_preserve_file_permissions(args.preserve_file_permissions)
        .with_preserve_directory_permissions(args.preserve_directory_permissions);
    if let Some(level) = args.compression_level {
        options = options.with_compression_level(level);
    }

    let mut builder = add_archive_context(ArchiveBuilder::new(&args.output, options), &args.output)?;
    let max_depth = args.max_depth.unwrap_or(UNBOUNDED_DEPTH);

    for source in &args.sources {
        let name = entry_name(args.prefix.as_deref(), source)?;
        log::debug!("adding {} as '{name}'", source.display());
        let added = add_archive_context(
            builder.add_directory_with_depth(source, &name, max_depth),
            &args.output,
        )?;
        if !added {
            add_archive_context(builder.add_file_as(source, &name), &args.output)?;
        }
    }

    let report = add_archive_context(builder.close(), &args.output)?;
    formatter.format_creation_result(&args.output, &report)?;

    Ok(())
}

/// Archive name for a source: its final component, under `prefix` if
/// given. A source with no final component (`.`, `/`) is resolved first.
fn entry_name(prefix: Option<&str>, source: &Path) -> Result<String> {
    let resolved;
    let base = match source.file_name() {
        Some(name) => name,
        None => {
            resolved = source
                .canonicalize()
                .with_context(|| format!("cannot resolve source '{}'", source.display()))?;
            resolved.file_name().unwrap_or_default()
        }
    };
    let Some(base) = base.to_str() else {
        bail!("source name is not valid UTF-8: {}", source.display());
    };

    Ok(match prefix.map(|p| p.trim_end_matches('/')) {
        Some(prefix) if !prefix.is_empty() && !base.is_empty() => format!("{prefix}/{base}"),
        Some(prefix) if !prefix.is_empty() => prefix.to_string(),
        _ => base.to_string(),
    })
}
