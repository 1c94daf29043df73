use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use clap::ValueEnum;
use log::debug;
use serde::{Deserialize, Serialize};

use super::record::AuditRecord;
use super::stream::{list_archives, ARCHIVE_DIR, JSON_EXT};
use super::writer::{GENERAL_STREAM, SECURITY_STREAM};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    /// Every request
    #[default]
    #[serde(alias = "audit")]
    #[value(alias = "audit")]
    General,
    /// Requests flagged with a security violation
    Security,
}

impl Stream {
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::General => GENERAL_STREAM,
            Self::Security => SECURITY_STREAM,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One JSON record per line
    #[default]
    Ndjson,
    /// Flattened records with a header row
    Csv,
}

#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    /// Case-insensitive substring matched against the raw line.
    pub text: Option<String>,
    pub since: Option<DateTime<Local>>,
    pub until: Option<DateTime<Local>>,
    /// Keep only the newest `limit` matches.
    pub limit: Option<usize>,
}

impl SearchQuery {
    fn matches_line(&self, lower_line: &str, needle: Option<&str>) -> bool {
        match needle {
            Some(needle) => lower_line.contains(needle),
            None => true,
        }
    }

    fn matches_time(&self, record: &AuditRecord) -> bool {
        if self.since.is_none() && self.until.is_none() {
            return true;
        }
        let time = match record.parse_timestamp() {
            Some(time) => time,
            None => return false,
        };
        if matches!(self.since, Some(since) if time < since) {
            return false;
        }
        if matches!(self.until, Some(until) if time > until) {
            return false;
        }
        true
    }
}

/// Files of a stream in write order: archives oldest first, then the active
/// file.
pub fn stream_files(dir: &Path, stream: Stream) -> Result<Vec<PathBuf>> {
    let name = stream.file_name();
    let mut files = list_archives(&dir.join(ARCHIVE_DIR), name, JSON_EXT)?;
    let active = dir.join(format!("{name}.{JSON_EXT}"));
    if active.exists() {
        files.push(active);
    }
    Ok(files)
}

/// Matching records in chronological order. Never writes to the log
/// directory.
pub fn search(dir: &Path, stream: Stream, query: &SearchQuery) -> Result<Vec<AuditRecord>> {
    let needle = query.text.as_ref().map(|s| s.to_lowercase());
    let mut records = Vec::new();

    for path in stream_files(dir, stream)? {
        let file = match File::open(&path) {
            Ok(file) => file,
            // Rotated away between listing and opening
            Err(err) if err.kind() == io::ErrorKind::NotFound => continue,
            Err(err) => return Err(err).context(format!("open log: {}", path.display())),
        };

        for line in BufReader::new(file).lines() {
            let line = line.with_context(|| format!("read log: {}", path.display()))?;
            if line.trim().is_empty() {
                continue;
            }
            if !query.matches_line(&line.to_lowercase(), needle.as_deref()) {
                continue;
            }
            let record: AuditRecord = match serde_json::from_str(&line) {
                Ok(record) => record,
                Err(e) => {
                    debug!("Skip malformed audit line in {}: {e}", path.display());
                    continue;
                }
            };
            if !query.matches_time(&record) {
                continue;
            }
            records.push(record);
        }
    }

    if let Some(limit) = query.limit {
        if records.len() > limit {
            records.drain(..records.len() - limit);
        }
    }
    Ok(records)
}

/// Flat shape of a record for CSV.
#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    timestamp: &'a str,
    request_id: &'a str,
    fingerprint: &'a str,
    ip: &'a str,
    method: &'a str,
    url: &'a str,
    status_code: u16,
    response_time_ms: u64,
    browser: &'a str,
    os: &'a str,
    device: &'a str,
    auth_status: &'static str,
    role: &'static str,
    user_id: &'a str,
    authorization_status: &'static str,
    code: &'a str,
    reason: &'a str,
    security: &'a str,
    error: &'a str,
}

impl<'a> From<&'a AuditRecord> for CsvRow<'a> {
    fn from(r: &'a AuditRecord) -> Self {
        use super::outcome::AuthStatus;

        Self {
            timestamp: &r.timestamp,
            request_id: &r.request_id,
            fingerprint: &r.fingerprint,
            ip: &r.ip,
            method: &r.method,
            url: &r.url,
            status_code: r.status_code,
            response_time_ms: r.response_time_ms,
            browser: &r.client.browser,
            os: &r.client.os,
            device: &r.client.device,
            auth_status: match r.auth.status {
                AuthStatus::Authenticated => "AUTHENTICATED",
                AuthStatus::Unauthenticated => "UNAUTHENTICATED",
            },
            role: r.auth.role.map(|role| role.as_str()).unwrap_or_default(),
            user_id: r.auth.user_id.as_deref().unwrap_or_default(),
            authorization_status: r.authorization.status.as_str(),
            code: &r.authorization.code,
            reason: r.authorization.reason.as_deref().unwrap_or_default(),
            security: r.security.as_deref().unwrap_or_default(),
            error: r.error.as_deref().unwrap_or_default(),
        }
    }
}

/// Writes the matching records to `out`, returns how many were written.
pub fn export<W: Write>(
    dir: &Path,
    stream: Stream,
    query: &SearchQuery,
    format: ExportFormat,
    mut out: W,
) -> Result<usize> {
    let records = search(dir, stream, query)?;
    match format {
        ExportFormat::Ndjson => {
            for record in records.iter() {
                writeln!(out, "{}", record.to_json()).context("write ndjson")?;
            }
            out.flush().context("flush ndjson")?;
        }
        ExportFormat::Csv => {
            let mut wtr = csv::Writer::from_writer(out);
            for record in records.iter() {
                wtr.serialize(CsvRow::from(record))
                    .context("write csv row")?;
            }
            wtr.flush().context("flush csv")?;
        }
    }
    Ok(records.len())
}

impl AuditRecord {
    pub fn table_titles() -> Vec<&'static str> {
        vec!["TIME", "IP", "METHOD", "URL", "STATUS", "CODE", "USER", "SECURITY"]
    }

    pub fn table_row(&self) -> Vec<String> {
        let time = match self.parse_timestamp() {
            Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
            None => self.timestamp.clone(),
        };
        vec![
            time,
            self.ip.clone(),
            self.method.clone(),
            self.url.clone(),
            self.status_code.to_string(),
            self.authorization.code.clone(),
            self.auth.user_id.clone().unwrap_or_default(),
            self.security.clone().unwrap_or_default(),
        ]
    }
}
