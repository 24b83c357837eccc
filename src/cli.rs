use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::config::{Aggregation, AuditConfig, LookupSource, default_report_file, now};
use crate::error::AuditError;

#[derive(Parser, Debug)]
#[command(name = "rosetta-checker")]
#[command(version)]
#[command(about = "Checks staged content against a Rosetta preservation repository", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// More log output (-vv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short = 'q', long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

impl Cli {
    /// Default `tracing` filter for the requested verbosity.
    pub fn log_filter(&self) -> &'static str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (false, 0) => "info",
            (false, 1) => "debug",
            (false, _) => "trace",
        }
    }
}

/// Registered subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Report on files that are/are not ingested
    #[command(name = "file2ingest")]
    File2Ingest(File2IngestArgs),
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::File2Ingest(_) => "file2ingest",
        }
    }
}

#[derive(Args, Debug)]
#[command(after_help = "Arguments:\n  \
  DIR            audit every file in DIR (with -R, also its subdirectories)\n  \
  FILE           audit FILE; .zip members and .bz2 content are audited individually\n  \
  @LIST          audit every path listed in LIST, one per line")]
pub struct File2IngestArgs {
    /// Directories, files, or @list-files to audit
    #[arg(value_name = "PATH", required_unless_present = "directory")]
    pub paths: Vec<String>,

    /// Directory to audit (may be repeated)
    #[arg(short = 'd', long, value_name = "DIRECTORY", value_parser = readable_directory)]
    pub directory: Vec<PathBuf>,

    /// Extra directory to look in for relative paths (may be repeated)
    #[arg(short = 'I', long = "search-dir", value_name = "DIR")]
    pub search_dirs: Vec<PathBuf>,

    /// Parse through subdirectories
    #[arg(short = 'R', long, overrides_with = "no_recursive")]
    pub recursive: bool,

    #[arg(long, overrides_with = "recursive", hide = true)]
    pub no_recursive: bool,

    /// Create a report file [default]
    #[arg(short = 'r', long, overrides_with = "no_report")]
    pub report: bool,

    /// Do not create a report file; results are only logged
    #[arg(long, overrides_with = "report")]
    pub no_report: bool,

    /// File name for the report ('-' for stdout) [default: file2ingest-YYYYMMDD-HHMMSS.csv]
    #[arg(short = 'f', long, value_name = "FILE")]
    pub report_file: Option<PathBuf>,

    /// Delete files that are ingested (not supported; never deletes)
    #[arg(short = 'D', long, overrides_with = "no_delete")]
    pub delete: bool,

    #[arg(long, overrides_with = "delete", hide = true)]
    pub no_delete: bool,

    /// How to report content found more than once in the repository
    #[arg(long, value_enum, default_value_t = Aggregation::PerRow)]
    pub aggregate: Aggregation,

    /// Repository database URL
    #[arg(long, env = "ROSETTA_DB_URL", value_name = "URL", conflicts_with = "index")]
    pub database_url: Option<String>,

    /// CSV export of the repository index, instead of a database
    #[arg(long, value_name = "FILE")]
    pub index: Option<PathBuf>,
}

impl File2IngestArgs {
    pub fn config(&self) -> AuditConfig {
        let report_path = self
            .report_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_report_file("file2ingest", now())));
        AuditConfig {
            recursive: self.recursive,
            report_enabled: !self.no_report,
            report_path,
            search_dirs: self.search_dirs.clone(),
            aggregation: self.aggregate,
            delete: self.delete,
        }
    }

    /// Arguments in audit order: `-d` directories first, then positionals.
    pub fn arguments(&self) -> Vec<String> {
        self.directory
            .iter()
            .map(|d| d.display().to_string())
            .chain(self.paths.iter().cloned())
            .collect()
    }

    pub fn lookup_source(&self) -> Result<LookupSource, AuditError> {
        match (&self.database_url, &self.index) {
            (_, Some(index)) => Ok(LookupSource::Index(index.clone())),
            (Some(url), None) => Ok(LookupSource::Database(url.clone())),
            (None, None) => Err(AuditError::Config(
                "no repository index: pass --database-url (or set ROSETTA_DB_URL) or --index".to_string(),
            )),
        }
    }
}

fn readable_directory(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if !path.is_dir() {
        return Err(format!("Directory '{value}' does not exist"));
    }
    if std::fs::read_dir(&path).is_err() {
        return Err(format!("Directory '{value}' cannot be read"));
    }
    Ok(path)
}
