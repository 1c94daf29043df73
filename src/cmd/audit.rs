use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use gatekeep::server::audit::clock::SystemClock;
use gatekeep::server::audit::query::{self, ExportFormat, SearchQuery, Stream};
use gatekeep::server::audit::writer::AuditSink;
use gatekeep::table::Table;
use gatekeep::time::parse_time;

use super::ConfigArgs;

/// Query and maintain the audit trail on disk.
#[derive(Args)]
pub struct AuditArgs {
    #[command(subcommand)]
    pub command: AuditCommand,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[derive(Subcommand)]
pub enum AuditCommand {
    Search(SearchArgs),
    Export(ExportArgs),
    /// Archive both active streams now and purge expired archives. Run it
    /// while the server is stopped.
    Rotate,
}

/// Search records by substring, case-insensitive.
#[derive(Args)]
pub struct SearchArgs {
    /// Text to look for, empty matches everything.
    #[arg(default_value = "")]
    pub query: String,

    #[command(flatten)]
    pub filter: FilterArgs,

    /// Show at most this many of the newest matches.
    #[arg(short, long, default_value = "50")]
    pub limit: usize,

    /// Print records as JSON lines instead of a table.
    #[arg(long)]
    pub json: bool,
}

/// Export records as NDJSON or CSV.
#[derive(Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    #[arg(short, long, value_enum, default_value = "ndjson")]
    pub format: ExportFormat,

    /// Output file, default is stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct FilterArgs {
    #[arg(short, long, value_enum, default_value = "general")]
    pub stream: Stream,

    /// Only records at or after this time (unix seconds, YYYY-MM-DD or
    /// "YYYY-MM-DD HH:MM:SS").
    #[arg(long)]
    pub since: Option<String>,

    /// Only records at or before this time.
    #[arg(long)]
    pub until: Option<String>,
}

impl FilterArgs {
    fn build_query(&self, text: Option<String>, limit: Option<usize>) -> Result<SearchQuery> {
        let since = match self.since {
            Some(ref s) => Some(parse_time(s).context("parse --since")?),
            None => None,
        };
        let until = match self.until {
            Some(ref s) => Some(parse_time(s).context("parse --until")?),
            None => None,
        };
        Ok(SearchQuery {
            text,
            since,
            until,
            limit,
        })
    }
}

impl AuditArgs {
    pub fn run(self) -> Result<()> {
        let cfg = self.config.load_server()?;
        let dir = cfg.audit.dir_path;

        match self.command {
            AuditCommand::Search(args) => {
                let text = Some(args.query.clone()).filter(|s| !s.is_empty());
                let query = args.filter.build_query(text, Some(args.limit))?;
                let records = query::search(&dir, args.filter.stream, &query)?;

                if args.json {
                    for record in records {
                        println!("{}", record.to_json());
                    }
                    return Ok(());
                }

                if records.is_empty() {
                    println!("<empty list>");
                    return Ok(());
                }
                let mut table = Table::with_capacity(records.len() + 1);
                table.add(
                    gatekeep::server::audit::AuditRecord::table_titles()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                );
                for record in records.iter() {
                    table.add(record.table_row());
                }
                table.show();
                Ok(())
            }
            AuditCommand::Export(args) => {
                let query = args.filter.build_query(None, None)?;
                let count = match args.output {
                    Some(ref path) => {
                        let file = File::create(path)
                            .with_context(|| format!("create output file: {}", path.display()))?;
                        query::export(
                            &dir,
                            args.filter.stream,
                            &query,
                            args.format,
                            BufWriter::new(file),
                        )?
                    }
                    None => query::export(
                        &dir,
                        args.filter.stream,
                        &query,
                        args.format,
                        io::stdout().lock(),
                    )?,
                };
                eprintln!("Exported {count} record(s)");
                Ok(())
            }
            AuditCommand::Rotate => {
                let mut sink = AuditSink::open(&dir, Arc::new(SystemClock), cfg.audit.retention_days)?;
                let archived = sink.force_rotate()?;
                if archived.is_empty() {
                    println!("Nothing to rotate");
                }
                for path in archived {
                    println!("Archived {}", path.display());
                }
                Ok(())
            }
        }
    }
}
