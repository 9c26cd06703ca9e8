//! Project level statistics: bus factor, commit rates, survival of
//! contributors, ticket open times, activity timelines and the project
//! summary table.

use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::annotate::AnnotatedTicket;
use crate::records::{Commit, ProjectLogs, Ticket, TicketKind};
use crate::{count_words, sort_map_to_vec};

pub const DEFAULT_BUS_FACTOR_COMMITTERS: usize = 5;
pub const DEFAULT_COMMIT_RATE_TOP: usize = 15;
pub const DEFAULT_OPEN_TIME_CAP_DAYS: u32 = 200;
/// Fewer monthly buckets than this switch a timeline to weekly buckets.
pub const MIN_TIMELINE_BUCKETS: usize = 12;

/// Commit counts per author name, highest first. Missing names share the
/// `""` bucket.
fn commit_counts(commits: &[Commit]) -> Vec<u32> {
    let names: Vec<String> = commits.iter().map(|c| c.author_name.clone()).collect();
    sort_map_to_vec(count_words(&names))
        .into_iter()
        .map(|(_, n)| n)
        .collect()
}

/// Mean of `1 - count / max_count` over the `n_committers` most active
/// authors. Lower means commits are concentrated on fewer people.
///
/// Returns `None` when there are no commits or `n_committers` is 0.
///
/// # Example
/// ```
/// use community_stats::features::compute_bus_factor;
/// use community_stats::records::Commit;
///
/// let commit = |name: &str| Commit {
///     sha: String::new(), author_name: name.into(), author_id: String::new(), date: None,
/// };
/// let commits = vec![commit("a"), commit("a"), commit("a"), commit("a"), commit("b")];
/// let bf = compute_bus_factor(&commits, 5).unwrap();
/// assert!((bf - 0.375).abs() < 1e-12);
/// ```
pub fn compute_bus_factor(commits: &[Commit], n_committers: usize) -> Option<f64> {
    let counts = commit_counts(commits);
    let max = *counts.first()? as f64;
    let top: Vec<f64> = counts
        .iter()
        .take(n_committers)
        .map(|&c| 1.0 - c as f64 / max)
        .collect();
    if top.is_empty() {
        return None;
    }
    Some(top.iter().sum::<f64>() / top.len() as f64)
}

/// Per-author commit counts as a percent of the most active author, for
/// the `top` most active authors.
pub fn normalized_commit_rates(commits: &[Commit], top: usize) -> Vec<f64> {
    let counts = commit_counts(commits);
    let Some(&max) = counts.first() else {
        return Vec::new();
    };
    counts
        .iter()
        .take(top)
        .map(|&c| c as f64 / max as f64 * 100.0)
        .collect()
}

/// Number of pull requests opened by each author id, most active first.
/// Tickets without an author id are skipped.
pub fn pull_requests_per_author(tickets: &[Ticket]) -> Vec<(String, u32)> {
    let authors: Vec<String> = tickets
        .iter()
        .filter(|t| t.kind == TicketKind::PullRequest && !t.author_id.is_empty())
        .map(|t| t.author_id.clone())
        .collect();
    sort_map_to_vec(count_words(&authors))
}

/// Share of authors whose count is greater than `i`, for `i` in
/// `0..=max(counts)`.
///
/// # Example
/// ```
/// use community_stats::features::survival_curve;
/// assert_eq!(survival_curve(&[1, 1, 2, 4]), vec![1.0, 0.5, 0.25, 0.25, 0.0]);
/// ```
pub fn survival_curve(counts: &[u32]) -> Vec<f64> {
    let Some(&max) = counts.iter().max() else {
        return Vec::new();
    };
    let total = counts.len() as f64;
    (0..=max)
        .map(|i| counts.iter().filter(|&&c| c > i).count() as f64 / total)
        .collect()
}

/// Percent of authors with at least `n` contributions.
pub fn survival_proportion(counts: &[u32], n: u32) -> Option<f64> {
    if counts.is_empty() {
        return None;
    }
    let kept = counts.iter().filter(|&&c| c >= n).count();
    Some(kept as f64 / counts.len() as f64 * 100.0)
}

/// Histogram of days open for tickets of one kind, capped at `cap_days`.
///
/// Index `d` of the result holds the number of tickets open `d` days.
/// Tickets without an estimate (1970 placeholder) or with a negative
/// duration are skipped.
pub fn open_time_histogram(tickets: &[AnnotatedTicket], kind: TicketKind, cap_days: u32) -> Vec<usize> {
    let days: Vec<i64> = tickets
        .iter()
        .filter(|t| t.ticket.kind == kind)
        .filter_map(|t| t.open_days())
        .filter(|d| *d >= 0)
        .map(|d| d.min(i64::from(cap_days)))
        .collect();
    let Some(&max) = days.iter().max() else {
        return Vec::new();
    };
    let mut histogram = vec![0; max as usize + 1];
    for d in days {
        histogram[d as usize] += 1;
    }
    histogram
}

/// Bucket width of an activity timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Months(u32),
    Weeks,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineBucket {
    pub start: NaiveDate,
    pub total: usize,
    pub bots: usize,
}

impl TimelineBucket {
    pub fn humans(&self) -> usize {
        self.total - self.bots
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub period: Period,
    pub buckets: Vec<TimelineBucket>,
}

fn month_index(d: NaiveDate) -> i64 {
    d.year() as i64 * 12 + d.month0() as i64
}

fn month_start(index: i64) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(index.div_euclid(12) as i32, index.rem_euclid(12) as u32 + 1, 1)
}

fn fill_buckets(
    events: &[(DateTime<Utc>, bool)],
    n_buckets: usize,
    bucket_of: impl Fn(NaiveDate) -> usize,
    start_of: impl Fn(usize) -> Option<NaiveDate>,
) -> Vec<TimelineBucket> {
    let mut buckets: Vec<TimelineBucket> = (0..n_buckets)
        .filter_map(|k| {
            start_of(k).map(|start| TimelineBucket {
                start,
                total: 0,
                bots: 0,
            })
        })
        .collect();
    for (at, is_bot) in events {
        if let Some(bucket) = buckets.get_mut(bucket_of(at.date_naive())) {
            bucket.total += 1;
            if *is_bot {
                bucket.bots += 1;
            }
        }
    }
    buckets
}

/// Count events (timestamp, authored by a bot) per calendar period of
/// `months` months, starting at the month of the first event. When that
/// gives fewer than [`MIN_TIMELINE_BUCKETS`] buckets, weekly buckets
/// starting on Monday are used instead. Empty buckets are kept.
pub fn activity_timeline(events: &[(DateTime<Utc>, bool)], months: u32) -> Timeline {
    let months = months.max(1);
    let dates = events.iter().map(|(at, _)| at.date_naive());
    let (Some(first), Some(last)) = (dates.clone().min(), dates.max()) else {
        return Timeline {
            period: Period::Months(months),
            buckets: Vec::new(),
        };
    };

    let first_month = month_index(first);
    let n_monthly = ((month_index(last) - first_month) / months as i64) as usize + 1;
    if n_monthly >= MIN_TIMELINE_BUCKETS {
        let buckets = fill_buckets(
            events,
            n_monthly,
            |d| ((month_index(d) - first_month) / months as i64) as usize,
            |k| month_start(first_month + k as i64 * months as i64),
        );
        return Timeline {
            period: Period::Months(months),
            buckets,
        };
    }

    let week_start = first - Duration::days(first.weekday().num_days_from_monday() as i64);
    let n_weekly = ((last - week_start).num_days() / 7) as usize + 1;
    let buckets = fill_buckets(
        events,
        n_weekly,
        |d| ((d - week_start).num_days() / 7) as usize,
        |k| week_start.checked_add_signed(Duration::weeks(k as i64)),
    );
    Timeline {
        period: Period::Weeks,
        buckets,
    }
}

/// One row of the project summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub project: String,
    pub issues: usize,
    pub pull_requests: usize,
    pub comments: usize,
    pub authors: usize,
}

fn project_authors(logs: &ProjectLogs) -> BTreeSet<&str> {
    logs.tickets
        .iter()
        .map(|t| t.author_name.as_str())
        .chain(logs.comments.iter().map(|c| c.author_name.as_str()))
        .filter(|name| !name.is_empty())
        .collect()
}

/// Per-project counts of issues, pull requests, comments and distinct
/// authors, largest community first, followed by an `all` row.
pub fn project_summary(projects: &[ProjectLogs]) -> Vec<SummaryRow> {
    let mut everyone: BTreeSet<&str> = BTreeSet::new();
    let mut rows: Vec<SummaryRow> = projects
        .iter()
        .map(|logs| {
            let authors = project_authors(logs);
            let row = SummaryRow {
                project: logs.name.clone(),
                issues: logs
                    .tickets
                    .iter()
                    .filter(|t| t.kind == TicketKind::Issue)
                    .count(),
                pull_requests: logs
                    .tickets
                    .iter()
                    .filter(|t| t.kind == TicketKind::PullRequest)
                    .count(),
                comments: logs.comments.len(),
                authors: authors.len(),
            };
            everyone.extend(authors);
            row
        })
        .collect();
    rows.sort_by(|a, b| b.authors.cmp(&a.authors).then_with(|| a.project.cmp(&b.project)));

    let all = SummaryRow {
        project: "all".to_string(),
        issues: rows.iter().map(|r| r.issues).sum(),
        pull_requests: rows.iter().map(|r| r.pull_requests).sum(),
        comments: rows.iter().map(|r| r.comments).sum(),
        authors: everyone.len(),
    };
    rows.push(all);
    rows
}
