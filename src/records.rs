//! Loading of the per-project TSV logs (`issues.tsv`, `comments.tsv`,
//! `commits.tsv`) into typed records.
//!
//! Missing values follow the conventions of the exported logs: an empty
//! field or one of `nan`, `None`, `null`, `NA` is treated as absent.
//! Columns not listed on the record types are ignored, so a leading
//! unnamed index column is fine.

use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use walkdir::WalkDir;

use crate::error::{Error, Result};

pub const ISSUES_FILE: &str = "issues.tsv";
pub const COMMENTS_FILE: &str = "comments.tsv";
pub const COMMITS_FILE: &str = "commits.tsv";

/// Kind of a ticket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketKind {
    Issue,
    #[serde(alias = "pr")]
    PullRequest,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Issue => "issue",
            TicketKind::PullRequest => "pull_request",
        }
    }
}

impl std::fmt::Display for TicketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An issue or pull request (one row of `issues.tsv`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Ticket {
    #[serde(deserialize_with = "de_id")]
    pub ticket_id: String,
    #[serde(rename = "type")]
    pub kind: TicketKind,
    #[serde(default, deserialize_with = "de_id")]
    pub author_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub author_name: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub closed_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_text")]
    pub title: String,
    #[serde(default, deserialize_with = "de_text")]
    pub body: String,
}

/// A comment posted on a ticket (one row of `comments.tsv`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Comment {
    #[serde(deserialize_with = "de_id")]
    pub ticket_id: String,
    #[serde(default, deserialize_with = "de_id")]
    pub author_id: String,
    #[serde(default, deserialize_with = "de_text")]
    pub author_name: String,
    #[serde(deserialize_with = "de_timestamp")]
    pub created_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_text")]
    pub body: String,
}

/// A commit (one row of `commits.tsv`).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Commit {
    #[serde(default, deserialize_with = "de_text")]
    pub sha: String,
    #[serde(default, deserialize_with = "de_text")]
    pub author_name: String,
    #[serde(default, deserialize_with = "de_id")]
    pub author_id: String,
    #[serde(default, deserialize_with = "de_opt_timestamp")]
    pub date: Option<DateTime<Utc>>,
}

/// All logs of one project folder.
#[derive(Debug, Clone)]
pub struct ProjectLogs {
    pub name: String,
    pub dir: PathBuf,
    pub tickets: Vec<Ticket>,
    pub comments: Vec<Comment>,
    pub commits: Vec<Commit>,
}

impl ProjectLogs {
    /// Load a project folder. `issues.tsv` is required, the comment and
    /// commit logs are optional.
    pub fn load(dir: &Path) -> Result<Self> {
        let name = project_name(dir);
        let tickets = load_tickets(&dir.join(ISSUES_FILE))?;
        let comments = load_optional(&dir.join(COMMENTS_FILE), load_comments)?;
        let commits = load_optional(&dir.join(COMMITS_FILE), load_commits)?;
        info!(
            "Loaded {}: {} tickets, {} comments, {} commits",
            name,
            tickets.len(),
            comments.len(),
            commits.len()
        );
        Ok(ProjectLogs {
            name,
            dir: dir.to_path_buf(),
            tickets,
            comments,
            commits,
        })
    }
}

/// Project name: the folder name, kept whole.
pub fn project_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| dir.to_string_lossy().into_owned())
}

pub fn load_tickets(path: &Path) -> Result<Vec<Ticket>> {
    load_tsv(path)
}

pub fn load_comments(path: &Path) -> Result<Vec<Comment>> {
    load_tsv(path)
}

pub fn load_commits(path: &Path) -> Result<Vec<Commit>> {
    load_tsv(path)
}

fn load_optional<T>(path: &Path, load: fn(&Path) -> Result<Vec<T>>) -> Result<Vec<T>> {
    if path.is_file() {
        load(path)
    } else {
        debug!("{} not present, using empty log", path.display());
        Ok(Vec::new())
    }
}

/// Reader configured for the exported logs: tab separated, header row,
/// rows may have a ragged number of fields.
pub fn tsv_reader_builder() -> csv::ReaderBuilder {
    let mut builder = csv::ReaderBuilder::new();
    builder.delimiter(b'\t').has_headers(true).flexible(true);
    builder
}

fn load_tsv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let mut rdr = tsv_reader_builder().from_path(path)?;
    let mut rows = Vec::new();
    for row in rdr.deserialize() {
        let row: T = row.map_err(|e| Error::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        rows.push(row);
    }
    Ok(rows)
}

/// Find project folders (directories holding an `issues.tsv`) below `root`.
///
/// `root` itself is returned when it is a project folder.
pub fn discover_projects(root: &Path) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        return Err(Error::FileNotFound(root.to_path_buf()));
    }
    if root.join(ISSUES_FILE).is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut dirs: Vec<PathBuf> = WalkDir::new(root)
        .min_depth(1)
        .max_depth(2)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir() && e.path().join(ISSUES_FILE).is_file())
        .map(|e| e.path().to_path_buf())
        .collect();
    dirs.sort();
    Ok(dirs)
}

/// Whether a raw field denotes a missing value.
pub fn is_missing(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty()
        || ["nan", "none", "null", "na", "nat"]
            .iter()
            .any(|m| s.eq_ignore_ascii_case(m))
}

/// Parse the timestamp formats found in the exported logs. All are UTC.
///
/// # Example
/// ```
/// use community_stats::records::parse_timestamp;
/// let t = parse_timestamp("2019-03-01T10:00:00Z").unwrap();
/// assert_eq!(t, parse_timestamp("2019-03-01 10:00:00").unwrap());
/// assert!(parse_timestamp("yesterday").is_none());
/// ```
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%:z", "%Y-%m-%d %H:%M:%S %z"] {
        if let Ok(t) = DateTime::parse_from_str(s, fmt) {
            return Some(t.with_timezone(&Utc));
        }
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

// ---- serde field helpers ----

fn de_text<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(match raw {
        Some(s) if !is_missing(&s) => s,
        _ => String::new(),
    })
}

/// Identifiers sometimes went through a float column (`1234.0`).
fn de_id<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    let s = de_text(d)?;
    let trimmed = s.trim();
    match trimmed.strip_suffix(".0") {
        Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit()) => {
            Ok(int.to_string())
        }
        _ => Ok(trimmed.to_string()),
    }
}

fn de_opt_timestamp<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<DateTime<Utc>>, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    match raw {
        Some(s) if !is_missing(&s) => parse_timestamp(&s)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp {s:?}"))),
        _ => Ok(None),
    }
}

fn de_timestamp<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<DateTime<Utc>, D::Error> {
    de_opt_timestamp(d)?.ok_or_else(|| serde::de::Error::custom("missing timestamp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, TimeZone};
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let p = dir.join(name);
        fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn missing_markers() {
        assert!(is_missing(""));
        assert!(is_missing("  "));
        assert!(is_missing("NaN"));
        assert!(is_missing("None"));
        assert!(!is_missing("0"));
        assert!(!is_missing("nancy"));
    }

    #[test]
    fn timestamps_in_all_formats() {
        let expected = Utc.with_ymd_and_hms(2020, 5, 17, 8, 30, 0).unwrap();
        assert_eq!(parse_timestamp("2020-05-17T08:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2020-05-17 08:30:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-05-17 08:30:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2020-05-17 10:30:00 +0200"), Some(expected));
        assert_eq!(
            parse_timestamp("2020-05-17").map(|t| t.day()),
            Some(17)
        );
        assert_eq!(parse_timestamp("17/05/2020"), None);
    }

    #[test]
    fn loads_tickets_with_index_column_and_missing_values() {
        let td = tempfile::tempdir().unwrap();
        let p = write(
            td.path(),
            ISSUES_FILE,
            "\tticket_id\ttype\tauthor_id\tauthor_name\tcreated_at\tupdated_at\tclosed_at\tbody\n\
             0\t12.0\tpull_request\t7\talice\t2019-01-01T00:00:00Z\t2019-01-02T00:00:00Z\t\tFix it\n\
             1\t13\tissue\t8\tNaN\t2019-01-03T00:00:00Z\tNaN\t2019-01-05T00:00:00Z\t\n",
        );
        let tickets = load_tickets(&p).unwrap();
        assert_eq!(tickets.len(), 2);
        assert_eq!(tickets[0].ticket_id, "12");
        assert_eq!(tickets[0].kind, TicketKind::PullRequest);
        assert!(tickets[0].closed_at.is_none());
        assert_eq!(tickets[1].author_name, "");
        assert!(tickets[1].updated_at.is_none());
        assert!(tickets[1].closed_at.is_some());
        assert_eq!(tickets[1].title, "");
    }

    #[test]
    fn bad_timestamp_names_file() {
        let td = tempfile::tempdir().unwrap();
        let p = write(
            td.path(),
            COMMENTS_FILE,
            "ticket_id\tauthor_id\tauthor_name\tcreated_at\tbody\n1\t2\tbob\tnot-a-date\thi\n",
        );
        let err = load_comments(&p).unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
        assert!(err.to_string().contains(COMMENTS_FILE));
    }

    #[test]
    fn project_without_optional_logs() {
        let td = tempfile::tempdir().unwrap();
        let dir = td.path().join("numpy");
        fs::create_dir(&dir).unwrap();
        write(
            &dir,
            ISSUES_FILE,
            "ticket_id\ttype\tauthor_id\tauthor_name\tcreated_at\n1\tissue\t1\ta\t2019-01-01\n",
        );
        let logs = ProjectLogs::load(&dir).unwrap();
        assert_eq!(logs.name, "numpy");
        assert_eq!(logs.tickets.len(), 1);
        assert!(logs.comments.is_empty());
        assert!(logs.commits.is_empty());
    }

    #[test]
    fn discovers_project_folders_sorted() {
        let td = tempfile::tempdir().unwrap();
        for name in ["scipy", "numpy", "not_a_project"] {
            fs::create_dir(td.path().join(name)).unwrap();
        }
        write(&td.path().join("scipy"), ISSUES_FILE, "ticket_id\n");
        write(&td.path().join("numpy"), ISSUES_FILE, "ticket_id\n");
        let found = discover_projects(td.path()).unwrap();
        let names: Vec<String> = found.iter().map(|p| project_name(p)).collect();
        assert_eq!(names, vec!["numpy", "scipy"]);

        let single = discover_projects(&td.path().join("numpy")).unwrap();
        assert_eq!(single.len(), 1);

        assert!(discover_projects(&td.path().join("missing")).is_err());
    }

    #[test]
    fn project_name_is_whole_folder_name() {
        assert_eq!(project_name(Path::new("data/scikit_learn")), "scikit_learn");
        assert_eq!(project_name(Path::new("data/scikit-learn")), "scikit-learn");
        assert_ne!(
            project_name(Path::new("data/numpy_2020")),
            project_name(Path::new("data/numpy_2021"))
        );
    }
}
