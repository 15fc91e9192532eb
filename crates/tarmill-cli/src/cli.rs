//! CLI argument parsing using clap.

use clap::Parser;
use clap::Subcommand;
use std::path::PathBuf;
use tarmill_core::CompressionType;
use tarmill_core::ExtractOptions;

#[derive(Parser)]
#[command(name = "tarmill")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Output results in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a compressed tar archive
    Create(CreateArgs),
    /// Extract archive contents
    Extract(ExtractArgs),
    /// List archive contents without extraction
    List(ListArgs),
}

#[derive(clap::Args)]
pub struct CreateArgs {
    /// Output archive file path
    #[arg(value_name = "OUTPUT")]
    pub output: PathBuf,

    /// Source files or directories to archive
    #[arg(value_name = "SOURCE", required = true)]
    pub sources: Vec<PathBuf>,

    /// Compression filter (gzip, bzip2, lz4, lzma, lzip, xz, uu, zstd)
    #[arg(short, long, default_value = "gzip")]
    pub compression: CompressionType,

    /// Compression level (1-9)
    #[arg(short = 'l', long = "level", value_parser = clap::value_parser!(u8).range(1..=9))]
    pub compression_level: Option<u8>,

    /// Descend at most this many directory levels below each source
    #[arg(long, value_name = "N")]
    pub max_depth: Option<usize>,

    /// Archive what symbolic links point to instead of the links
    #[arg(long)]
    pub dereference: bool,

    /// Store file modes as found on disk instead of 0666/0777
    #[arg(long)]
    pub preserve_file_permissions: bool,

    /// Store directory modes as found on disk instead of 0755
    #[arg(long)]
    pub preserve_directory_permissions: bool,

    /// Archive directory to place every source under
    #[arg(long, value_name = "ARCHIVE_DIR")]
    pub prefix: Option<String>,
}

#[derive(clap::Args)]
pub struct ExtractArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,

    /// Output directory, created if missing (default: current directory)
    #[arg(value_name = "DEST")]
    pub dest: Option<PathBuf>,

    /// Restore owner and group from the archive
    #[arg(long)]
    pub owner: bool,

    /// Keep existing files instead of replacing them
    #[arg(long)]
    pub no_overwrite: bool,

    /// Remove existing files before writing
    #[arg(long)]
    pub unlink: bool,

    /// Do not restore modification times
    #[arg(long)]
    pub no_time: bool,

    /// Do not restore permission bits
    #[arg(long)]
    pub no_permissions: bool,

    /// Leave holes for all-zero blocks
    #[arg(long)]
    pub sparse: bool,

    /// Refuse to write through symbolic links
    #[arg(long)]
    pub secure_symlinks: bool,

    /// Refuse entries whose path contains `..`
    #[arg(long)]
    pub secure_nodotdot: bool,

    /// Refuse entries with absolute paths
    #[arg(long)]
    pub no_absolute_paths: bool,

    /// Do not create missing parent directories
    #[arg(long)]
    pub no_autodir: bool,

    /// Write files to a temporary name and rename into place
    #[arg(long)]
    pub safe_writes: bool,
}

impl ExtractArgs {
    /// Builds the extraction flag set, starting from the library defaults.
    pub fn options(&self) -> ExtractOptions {
        let mut options = ExtractOptions::default();
        if self.no_time {
            options = options.without(ExtractOptions::TIME);
        }
        if self.no_permissions {
            options = options.without(ExtractOptions::PERM);
        }
        let flags = [
            (self.owner, ExtractOptions::OWNER),
            (self.no_overwrite, ExtractOptions::NO_OVERWRITE),
            (self.unlink, ExtractOptions::UNLINK),
            (self.sparse, ExtractOptions::SPARSE),
            (self.secure_symlinks, ExtractOptions::SECURE_SYMLINKS),
            (self.secure_nodotdot, ExtractOptions::SECURE_NODOTDOT),
            (self.no_absolute_paths, ExtractOptions::SECURE_NOABSOLUTEPATHS),
            (self.no_autodir, ExtractOptions::NO_AUTODIR),
            (self.safe_writes, ExtractOptions::SAFE_WRITES),
        ];
        for (set, flag) in flags {
            if set {
                options |= flag;
            }
        }
        options
    }
}

#[derive(clap::Args)]
pub struct ListArgs {
    /// Path to the archive file
    #[arg(value_name = "ARCHIVE")]
    pub archive: PathBuf,
}
