use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Days, Local, NaiveDate};
use log::{debug, info};

use crate::dirs::{ensure_dir_exists, ensure_private_dir};

pub const ARCHIVE_DIR: &str = "archive";

/// Extension of the JSON record files.
pub const JSON_EXT: &str = "log";
/// Extension of the human-readable companion files.
pub const TEXT_EXT: &str = "txt";

/// An append-only log file `<dir>/<name>.<ext>` that is moved into
/// `<dir>/archive/<name>-<YYYY-MM-DD>.<ext>` once its day is over.
pub struct LogStream {
    name: &'static str,
    ext: &'static str,
    path: PathBuf,
    archive_dir: PathBuf,
    file: Option<File>,

    /// Calendar day of the content of the active file, `None` while the file
    /// is empty.
    day: Option<NaiveDate>,
}

impl LogStream {
    pub fn open(dir: &Path, name: &'static str, ext: &'static str) -> Result<Self> {
        ensure_dir_exists(dir)
            .with_context(|| format!("ensure audit directory: {}", dir.display()))?;
        let archive_dir = dir.join(ARCHIVE_DIR);
        ensure_private_dir(&archive_dir)
            .with_context(|| format!("ensure archive directory: {}", archive_dir.display()))?;

        let path = dir.join(format!("{name}.{ext}"));
        let mut stream = Self {
            name,
            ext,
            path,
            archive_dir,
            file: None,
            day: None,
        };
        stream.reopen()?;

        // An existing file belongs to the day it was last written
        let meta = fs::metadata(&stream.path)
            .with_context(|| format!("stat log file: {}", stream.path.display()))?;
        if meta.len() > 0 {
            let modified: DateTime<Local> = meta.modified().context("read log mtime")?.into();
            stream.day = Some(modified.date_naive());
        }

        Ok(stream)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn day(&self) -> Option<NaiveDate> {
        self.day
    }

    /// Whether the active file holds content of a day before `today`.
    pub fn is_due(&self, today: NaiveDate) -> bool {
        matches!(self.day, Some(day) if day < today)
    }

    /// Writes one line. The first line of an empty file stamps it with `today`.
    pub fn append(&mut self, line: &str, today: NaiveDate) -> Result<()> {
        if self.file.is_none() {
            self.reopen()?;
        }
        let Some(file) = self.file.as_mut() else {
            bail!("log file {} is not open", self.path.display());
        };
        writeln!(file, "{line}")
            .and_then(|_| file.flush())
            .with_context(|| format!("write log file: {}", self.path.display()))?;

        if self.day.is_none() {
            self.day = Some(today);
        }
        Ok(())
    }

    /// Moves the active file into the archive directory and starts a new one.
    /// Empty files are left alone. Returns the archive path.
    pub fn rotate(&mut self, today: NaiveDate) -> Result<Option<PathBuf>> {
        let day = match self.day {
            Some(day) => day,
            None => return Ok(None),
        };
        // A file rotated early (forced) still belongs to its own day
        let day = day.min(today);

        let target = self.archive_target(day);
        self.file = None;
        fs::rename(&self.path, &target).with_context(|| {
            format!(
                "rename {} to {}",
                self.path.display(),
                target.display()
            )
        })?;
        self.day = None;
        self.reopen()?;

        info!("Rotated {} to {}", self.path.display(), target.display());
        Ok(Some(target))
    }

    fn archive_target(&self, day: NaiveDate) -> PathBuf {
        let base = format!("{}-{}", self.name, day.format("%Y-%m-%d"));
        let ext = self.ext;
        let mut target = self.archive_dir.join(format!("{base}.{ext}"));
        let mut seq = 1;
        while target.exists() {
            target = self.archive_dir.join(format!("{base}-{seq}.{ext}"));
            seq += 1;
        }
        target
    }

    fn reopen(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open log file: {}", self.path.display()))?;
        self.file = Some(file);
        Ok(())
    }
}

/// Parsed archive file name `<stream>-<YYYY-MM-DD>[-<seq>].<ext>`, where
/// `ext` is `log` or `txt`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ArchiveName {
    pub date: NaiveDate,
    pub seq: u32,
    pub stream: String,
    pub ext: String,
}

impl ArchiveName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, ext) = file_name.rsplit_once('.')?;
        if ext != JSON_EXT && ext != TEXT_EXT {
            return None;
        }
        let (stream, rest) = stem.split_once('-')?;
        if stream.is_empty() || rest.len() < 10 || !rest.is_char_boundary(10) {
            return None;
        }
        let (date, tail) = rest.split_at(10);
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        let seq = if tail.is_empty() {
            0
        } else {
            tail.strip_prefix('-')?.parse().ok()?
        };
        Some(Self {
            date,
            seq,
            stream: stream.to_string(),
            ext: ext.to_string(),
        })
    }
}

/// Archives of one stream with extension `ext`, oldest first.
pub fn list_archives(archive_dir: &Path, stream: &str, ext: &str) -> Result<Vec<PathBuf>> {
    let mut archives = scan_archives(archive_dir)?
        .into_iter()
        .filter(|(name, _)| name.stream == stream && name.ext == ext)
        .collect::<Vec<_>>();
    archives.sort();
    Ok(archives.into_iter().map(|(_, path)| path).collect())
}

/// Deletes archives dated more than `retention_days` before `today`. Files that
/// do not look like archives are never touched.
pub fn purge_archives(archive_dir: &Path, retention_days: u64, today: NaiveDate) -> Result<usize> {
    let cutoff = match today.checked_sub_days(Days::new(retention_days)) {
        Some(cutoff) => cutoff,
        None => return Ok(0),
    };

    let mut count = 0;
    for (name, path) in scan_archives(archive_dir)? {
        if name.date >= cutoff {
            continue;
        }
        fs::remove_file(&path)
            .with_context(|| format!("remove archive: {}", path.display()))?;
        debug!("Removed expired archive {}", path.display());
        count += 1;
    }
    Ok(count)
}

fn scan_archives(archive_dir: &Path) -> Result<Vec<(ArchiveName, PathBuf)>> {
    let entries = match fs::read_dir(archive_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err).context(format!("read archive dir: {}", archive_dir.display()))
        }
    };

    let mut archives = Vec::new();
    for entry in entries {
        let entry = entry.context("read archive dir entry")?;
        let file_name = entry.file_name();
        let name = match file_name.to_str().and_then(ArchiveName::parse) {
            Some(name) => name,
            None => continue,
        };
        archives.push((name, entry.path()));
    }
    Ok(archives)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_archive_name() {
        let name = ArchiveName::parse("audit-2024-03-20.log").unwrap();
        assert_eq!(name.stream, "audit");
        assert_eq!(name.date, date("2024-03-20"));
        assert_eq!(name.seq, 0);
        assert_eq!(name.ext, "log");

        let name = ArchiveName::parse("security-2024-03-20-2.log").unwrap();
        assert_eq!(name.stream, "security");
        assert_eq!(name.seq, 2);

        let name = ArchiveName::parse("audit-2024-03-20.txt").unwrap();
        assert_eq!(name.stream, "audit");
        assert_eq!(name.ext, "txt");

        for bad in [
            "audit.log",
            "audit-2024-03.log",
            "audit-2024-03-20.json",
            "audit-2024-03-20",
            "audit-2024-03-20-x.log",
            "-2024-03-20.log",
        ] {
            assert!(ArchiveName::parse(bad).is_none(), "{bad}");
        }
    }

    #[test]
    fn test_rotate_on_day_change() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = LogStream::open(dir.path(), "audit", JSON_EXT).unwrap();
        assert!(stream.day().is_none());
        assert!(!stream.is_due(date("2024-03-21")));

        stream.append("first", date("2024-03-20")).unwrap();
        assert_eq!(stream.day(), Some(date("2024-03-20")));
        assert!(!stream.is_due(date("2024-03-20")));
        assert!(stream.is_due(date("2024-03-21")));

        let archived = stream.rotate(date("2024-03-21")).unwrap().unwrap();
        assert_eq!(
            archived,
            dir.path().join("archive").join("audit-2024-03-20.log")
        );
        assert_eq!(fs::read_to_string(&archived).unwrap(), "first\n");
        assert_eq!(fs::read_to_string(stream.path()).unwrap(), "");
        assert!(stream.day().is_none());

        stream.append("second", date("2024-03-21")).unwrap();
        assert_eq!(fs::read_to_string(stream.path()).unwrap(), "second\n");
    }

    #[test]
    fn test_rotate_empty_and_collision() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = LogStream::open(dir.path(), "security", JSON_EXT).unwrap();
        assert!(stream.rotate(date("2024-03-20")).unwrap().is_none());

        stream.append("a", date("2024-03-20")).unwrap();
        stream.rotate(date("2024-03-20")).unwrap();
        stream.append("b", date("2024-03-20")).unwrap();
        let second = stream.rotate(date("2024-03-20")).unwrap().unwrap();
        assert_eq!(
            second,
            dir.path().join("archive").join("security-2024-03-20-1.log")
        );

        let archive = dir.path().join("archive");
        let archives = list_archives(&archive, "security", JSON_EXT).unwrap();
        assert_eq!(archives.len(), 2);
        assert_eq!(fs::read_to_string(&archives[0]).unwrap(), "a\n");
        assert_eq!(fs::read_to_string(&archives[1]).unwrap(), "b\n");
        assert!(list_archives(&archive, "audit", JSON_EXT).unwrap().is_empty());
        assert!(list_archives(&archive, "security", TEXT_EXT).unwrap().is_empty());
    }

    #[test]
    fn test_text_companion() {
        let dir = tempfile::tempdir().unwrap();
        let mut stream = LogStream::open(dir.path(), "audit", TEXT_EXT).unwrap();
        assert_eq!(stream.path(), dir.path().join("audit.txt"));

        stream.append("GET /healthz 200", date("2024-03-20")).unwrap();
        let archived = stream.rotate(date("2024-03-21")).unwrap().unwrap();
        assert_eq!(
            archived,
            dir.path().join("archive").join("audit-2024-03-20.txt")
        );
        assert_eq!(
            list_archives(&dir.path().join("archive"), "audit", TEXT_EXT).unwrap(),
            vec![archived]
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_archive_dir_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        LogStream::open(dir.path(), "audit", JSON_EXT).unwrap();
        let mode = fs::metadata(dir.path().join("archive"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn test_purge_archives() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("archive");
        fs::create_dir_all(&archive).unwrap();
        for name in [
            "audit-2024-01-01.log",
            "audit-2024-02-19.log",
            "audit-2024-02-20.log",
            "security-2024-01-15-1.log",
            "security-2024-01-15.txt",
            "notes.txt",
        ] {
            fs::write(archive.join(name), "x\n").unwrap();
        }

        let removed = purge_archives(&archive, 30, date("2024-03-21")).unwrap();
        assert_eq!(removed, 4);

        let mut left = fs::read_dir(&archive)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect::<Vec<_>>();
        left.sort();
        assert_eq!(left, vec!["audit-2024-02-20.log", "notes.txt"]);

        assert_eq!(
            purge_archives(&dir.path().join("missing"), 30, date("2024-03-21")).unwrap(),
            0
        );
    }
}
