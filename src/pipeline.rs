//! One function per subcommand: load the logs, derive the statistic and
//! write its tables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use clap::ValueEnum;
use log::{info, warn};
use rayon::prelude::*;

use crate::annotate::{AnnotatedComment, AnnotatedTicket, annotate_comments_tickets, annotate_logs};
use crate::error::Result;
use crate::export::{Cell, ExportFormat, Table, run_timestamp, save_table, save_text};
use crate::features::{
    DEFAULT_BUS_FACTOR_COMMITTERS, DEFAULT_COMMIT_RATE_TOP, Period, activity_timeline,
    compute_bus_factor, normalized_commit_rates, open_time_histogram, project_summary,
    pull_requests_per_author, survival_curve, survival_proportion,
};
use crate::latex::pvalue_table;
use crate::network::{
    check_unique_posts, cocontribution_matrix, compute_contributions_per_project,
    contributions_from_logs, contributor_spread, create_graph, normalized_cocontribution,
    projects_per_contributor,
};
use crate::records::{ProjectLogs, TicketKind, discover_projects};
use crate::sentiment::{PolarityScores, SentimentAnalyzer, SentimentLexicon, add_sentiment};
use crate::text::{BotList, CleanedBody, GratitudeFeatures, GratitudeVocabulary, add_gratitude, body_cleanup};

/// Output settings and resource lists shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Options {
    pub output: PathBuf,
    pub export_format: ExportFormat,
    pub bots: BotList,
    pub gratitude: GratitudeVocabulary,
    pub analyzer: SentimentAnalyzer,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            output: PathBuf::from("."),
            export_format: ExportFormat::Csv,
            bots: BotList::default(),
            gratitude: GratitudeVocabulary::default(),
            analyzer: SentimentAnalyzer::default(),
        }
    }
}

impl Options {
    /// Load resource lists from files, falling back to the built-in lists.
    pub fn load(
        output: PathBuf,
        export_format: ExportFormat,
        bots: Option<&Path>,
        gratitude: Option<&Path>,
        lexicon: Option<&Path>,
    ) -> Result<Self> {
        let bots = match bots {
            Some(p) => BotList::from_file(p)?,
            None => BotList::default(),
        };
        let gratitude = match gratitude {
            Some(p) => GratitudeVocabulary::from_file(p)?,
            None => GratitudeVocabulary::default(),
        };
        let analyzer = match lexicon {
            Some(p) => SentimentAnalyzer::new(SentimentLexicon::from_vader_file(p)?),
            None => SentimentAnalyzer::default(),
        };
        Ok(Options {
            output,
            export_format,
            bots,
            gratitude,
            analyzer,
        })
    }
}

/// Which log an activity timeline counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ActivityLog {
    Commits,
    Issues,
    Comments,
}

/// Summary of a run plus the projects that could not be processed.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub result: String,
    pub failed_files: Vec<(String, String)>,
}

/// Print per-project failures on stderr under a `Warnings` header.
pub fn print_failed_files(failed_files: &[(String, String)]) {
    eprintln!("\nWarnings:");
    for (path, err) in failed_files {
        eprintln!("  {path}: {err}");
    }
}

fn fmt_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// File name stem of an input path, used as prefix of every output file.
fn stem_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty() && s != ".")
        .unwrap_or_else(|| "community".to_string())
}

fn written(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| format!("  {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

fn save_all(tables: &[Table], stem: &str, timestamp: &str, opts: &Options) -> Result<Vec<PathBuf>> {
    tables
        .iter()
        .map(|t| save_table(t, &opts.output, stem, timestamp, opts.export_format))
        .collect()
}

/// Load every project below `root` in parallel. Projects that fail to
/// load are returned as failures instead of aborting the run.
pub fn load_projects(root: &Path) -> Result<(Vec<ProjectLogs>, Vec<(String, String)>)> {
    let dirs = discover_projects(root)?;
    info!("Found {} project(s) under {}", dirs.len(), root.display());
    let loaded: Vec<(PathBuf, Result<ProjectLogs>)> = dirs
        .into_par_iter()
        .map(|dir| {
            let logs = ProjectLogs::load(&dir);
            (dir, logs)
        })
        .collect();

    let mut projects = Vec::new();
    let mut failed = Vec::new();
    for (dir, logs) in loaded {
        match logs {
            Ok(logs) => projects.push(logs),
            Err(e) => {
                warn!("Skipping {}: {}", dir.display(), e);
                failed.push((dir.display().to_string(), e.to_string()));
            }
        }
    }
    Ok((projects, failed))
}

struct TextFeatures {
    cleaned: CleanedBody,
    gratitude: GratitudeFeatures,
    sentiment: PolarityScores,
}

fn text_features(author_name: &str, body: &str, opts: &Options) -> TextFeatures {
    let cleaned = body_cleanup(author_name, body, &opts.bots);
    let gratitude = add_gratitude(&cleaned.text, &opts.gratitude);
    let sentiment = add_sentiment(&opts.analyzer, &cleaned.text);
    TextFeatures {
        cleaned,
        gratitude,
        sentiment,
    }
}

const TEXT_HEADERS: [&str; 12] = [
    "is_bot",
    "language",
    "num_code_blocks",
    "num_mentions",
    "mentions",
    "num_words",
    "gratitude_count",
    "gratitude_words",
    "neg",
    "neu",
    "pos",
    "compound",
];

fn text_cells(f: &TextFeatures) -> Vec<Cell> {
    vec![
        f.cleaned.is_bot.into(),
        f.cleaned.language.into(),
        f.cleaned.num_code_blocks.into(),
        f.cleaned.mentions.len().into(),
        f.cleaned.mentions.join(" ").into(),
        f.gratitude.num_words.into(),
        f.gratitude.gratitude_count.into(),
        f.gratitude.gratitude_words.join(" ").into(),
        f.sentiment.neg.into(),
        f.sentiment.neu.into(),
        f.sentiment.pos.into(),
        f.sentiment.compound.into(),
    ]
}

fn with_text_headers(headers: &[&str]) -> Vec<String> {
    headers
        .iter()
        .chain(TEXT_HEADERS.iter())
        .map(|h| h.to_string())
        .collect()
}

fn comments_table(comments: &[AnnotatedComment], features: &[TextFeatures]) -> Table {
    let mut table = Table::new(
        "comments",
        with_text_headers(&[
            "ticket_id",
            "author_id",
            "author_name",
            "created_at",
            "was_updated",
            "comment_order",
            "num_pr_created",
            "num_issue_created",
            "num_comments_posted",
        ]),
    );
    for (c, f) in comments.iter().zip(features) {
        let mut row: Vec<Cell> = vec![
            c.comment.ticket_id.as_str().into(),
            c.comment.author_id.as_str().into(),
            c.comment.author_name.as_str().into(),
            fmt_time(&c.comment.created_at).into(),
            c.was_updated.into(),
            c.comment_order.into(),
            c.num_pr_created.into(),
            c.num_issue_created.into(),
            c.num_comments_posted.into(),
        ];
        row.extend(text_cells(f));
        table.push(row);
    }
    table
}

fn issues_table(tickets: &[AnnotatedTicket], features: &[TextFeatures]) -> Table {
    let mut table = Table::new(
        "issues",
        with_text_headers(&[
            "ticket_id",
            "type",
            "author_id",
            "author_name",
            "created_at",
            "closed_at",
            "was_updated",
            "is_closed",
            "open_days",
            "num_tickets_opened",
        ]),
    );
    for (t, f) in tickets.iter().zip(features) {
        let mut row: Vec<Cell> = vec![
            t.ticket.ticket_id.as_str().into(),
            t.ticket.kind.as_str().into(),
            t.ticket.author_id.as_str().into(),
            t.ticket.author_name.as_str().into(),
            fmt_time(&t.ticket.created_at).into(),
            t.ticket.closed_at.as_ref().map(fmt_time).into(),
            t.was_updated.into(),
            t.is_closed.into(),
            t.open_days().into(),
            t.num_tickets_opened.into(),
        ];
        row.extend(text_cells(f));
        table.push(row);
    }
    table
}

/// Annotate one project folder and write per-comment, per-ticket and
/// per-commit features plus comments joined with their ticket.
pub fn extract_features(project: &Path, opts: &Options) -> Result<RunReport> {
    let logs = ProjectLogs::load(project)?;
    let name = logs.name.clone();
    let bus_factor = compute_bus_factor(&logs.commits, DEFAULT_BUS_FACTOR_COMMITTERS);
    let commits = logs.commits;
    let (comments, tickets) = annotate_logs(logs.comments, logs.tickets, Utc::now());

    let comment_features: Vec<TextFeatures> = comments
        .par_iter()
        .map(|c| text_features(&c.comment.author_name, &c.comment.body, opts))
        .collect();
    let ticket_features: Vec<TextFeatures> = tickets
        .par_iter()
        .map(|t| text_features(&t.ticket.author_name, &t.ticket.body, opts))
        .collect();

    let mut commits_table = Table::new("commits", vec!["sha", "author_name", "author_id", "date", "is_bot"]);
    for c in &commits {
        commits_table.push(vec![
            c.sha.as_str().into(),
            c.author_name.as_str().into(),
            c.author_id.as_str().into(),
            c.date.as_ref().map(fmt_time).into(),
            opts.bots.contains(&c.author_name).into(),
        ]);
    }

    let by_ticket: HashMap<&str, (&AnnotatedTicket, &TextFeatures)> = tickets
        .iter()
        .zip(&ticket_features)
        .map(|(t, f)| (t.ticket.ticket_id.as_str(), (t, f)))
        .collect();
    let mut joined = Table::new(
        "joined",
        vec![
            "project",
            "ticket_id",
            "type",
            "ticket_author",
            "comment_author",
            "comment_order",
            "is_bot",
            "is_closed",
            "open_days",
            "gratitude_count",
            "compound",
            "ticket_compound",
            "bus_factor",
        ],
    );
    let mut orphans = 0usize;
    for (c, f) in comments.iter().zip(&comment_features) {
        let Some(&(t, tf)) = by_ticket.get(c.comment.ticket_id.as_str()) else {
            orphans += 1;
            continue;
        };
        joined.push(vec![
            name.as_str().into(),
            c.comment.ticket_id.as_str().into(),
            t.ticket.kind.as_str().into(),
            t.ticket.author_name.as_str().into(),
            c.comment.author_name.as_str().into(),
            c.comment_order.into(),
            f.cleaned.is_bot.into(),
            t.is_closed.into(),
            t.open_days().into(),
            f.gratitude.gratitude_count.into(),
            f.sentiment.compound.into(),
            tf.sentiment.compound.into(),
            bus_factor.into(),
        ]);
    }
    if orphans > 0 {
        warn!("{name}: {orphans} comment(s) reference unknown tickets");
    }

    let tables = [
        comments_table(&comments, &comment_features),
        issues_table(&tickets, &ticket_features),
        commits_table,
        joined,
    ];
    let paths = save_all(&tables, &name, &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!(
            "Features of {}: {} comments, {} tickets, {} commits\n{}",
            name,
            comments.len(),
            tickets.len(),
            commits.len(),
            written(&paths)
        ),
        failed_files: Vec::new(),
    })
}

/// Bus factor and normalized commit rates of every project under `root`.
pub fn bus_factor(root: &Path, opts: &Options) -> Result<RunReport> {
    let (projects, failed_files) = load_projects(root)?;
    let mut factors = Table::new("bus_factor", vec!["project", "commits", "committers", "bus_factor"]);
    let mut rates = Table::new("commit_rates", vec!["project", "rank", "rate"]);
    let mut lines = Vec::new();
    for p in &projects {
        let bf = compute_bus_factor(&p.commits, DEFAULT_BUS_FACTOR_COMMITTERS);
        let committers = normalized_commit_rates(&p.commits, usize::MAX).len();
        factors.push(vec![
            p.name.as_str().into(),
            p.commits.len().into(),
            committers.into(),
            bf.into(),
        ]);
        for (rank, rate) in normalized_commit_rates(&p.commits, DEFAULT_COMMIT_RATE_TOP)
            .into_iter()
            .enumerate()
        {
            rates.push(vec![p.name.as_str().into(), (rank + 1).into(), rate.into()]);
        }
        lines.push(match bf {
            Some(bf) => format!("{}: bus factor {:.3}", p.name, bf),
            None => format!("{}: no commits", p.name),
        });
    }
    let paths = save_all(&[factors, rates], &stem_of(root), &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!("{}\n{}", lines.join("\n"), written(&paths)),
        failed_files,
    })
}

/// Survival of pull request authors: share of authors still active after
/// `n` pull requests, per project.
pub fn survival(root: &Path, at: u32, opts: &Options) -> Result<RunReport> {
    let (projects, failed_files) = load_projects(root)?;
    let mut curve = Table::new("survival", vec!["project", "pull_requests", "share"]);
    let mut at_n = Table::new("survival_at_n", vec!["project", "authors", "at", "percent"]);
    let mut per_author = Table::new("pr_per_author", vec!["project", "author_id", "pull_requests"]);
    let mut lines = Vec::new();
    for p in &projects {
        let prs = pull_requests_per_author(&p.tickets);
        let counts: Vec<u32> = prs.iter().map(|(_, n)| *n).collect();
        for (i, share) in survival_curve(&counts).into_iter().enumerate() {
            curve.push(vec![p.name.as_str().into(), (i + 1).into(), share.into()]);
        }
        let percent = survival_proportion(&counts, at);
        at_n.push(vec![
            p.name.as_str().into(),
            counts.len().into(),
            at.into(),
            percent.into(),
        ]);
        for (author, n) in &prs {
            per_author.push(vec![p.name.as_str().into(), author.as_str().into(), (*n).into()]);
        }
        lines.push(match percent {
            Some(pc) => format!("{}: {:.1}% of {} authors opened >= {} PRs", p.name, pc, counts.len(), at),
            None => format!("{}: no pull requests", p.name),
        });
    }
    let paths = save_all(&[curve, at_n, per_author], &stem_of(root), &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!("{}\n{}", lines.join("\n"), written(&paths)),
        failed_files,
    })
}

/// Histogram of days open for the tickets of one kind.
pub fn open_time(project: &Path, kind: TicketKind, cap_days: u32, opts: &Options) -> Result<RunReport> {
    let logs = ProjectLogs::load(project)?;
    let (_, tickets) = annotate_comments_tickets(logs.comments, logs.tickets, Utc::now());
    let histogram = open_time_histogram(&tickets, kind, cap_days);
    let mut table = Table::new("open_time", vec!["days", "tickets"]);
    for (days, n) in histogram.iter().enumerate() {
        table.push(vec![days.into(), (*n).into()]);
    }
    let total: usize = histogram.iter().sum();
    let paths = save_all(&[table], &logs.name, &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!(
            "{}: {} {} ticket(s) with an open time\n{}",
            logs.name,
            total,
            kind,
            written(&paths)
        ),
        failed_files: Vec::new(),
    })
}

/// Activity of humans and bots over time for one log of a project.
pub fn activity(project: &Path, log: ActivityLog, months: u32, opts: &Options) -> Result<RunReport> {
    let logs = ProjectLogs::load(project)?;
    let events: Vec<(DateTime<Utc>, bool)> = match log {
        ActivityLog::Commits => logs
            .commits
            .iter()
            .filter_map(|c| c.date.map(|d| (d, opts.bots.contains(&c.author_name))))
            .collect(),
        ActivityLog::Issues => logs
            .tickets
            .iter()
            .map(|t| (t.created_at, opts.bots.contains(&t.author_name)))
            .collect(),
        ActivityLog::Comments => logs
            .comments
            .iter()
            .map(|c| (c.created_at, opts.bots.contains(&c.author_name)))
            .collect(),
    };
    let timeline = activity_timeline(&events, months);
    let period = match timeline.period {
        Period::Months(n) => format!("{n}M"),
        Period::Weeks => "W".to_string(),
    };
    let mut table = Table::new("activity", vec!["start", "period", "total", "humans", "bots"]);
    for b in &timeline.buckets {
        table.push(vec![
            b.start.format("%Y-%m-%d").to_string().into(),
            period.as_str().into(),
            b.total.into(),
            b.humans().into(),
            b.bots.into(),
        ]);
    }
    let paths = save_all(&[table], &logs.name, &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!(
            "{}: {} events in {} bucket(s) of {}\n{}",
            logs.name,
            events.len(),
            timeline.buckets.len(),
            period,
            written(&paths)
        ),
        failed_files: Vec::new(),
    })
}

/// Issues, pull requests, comments and authors of every project.
pub fn summary(root: &Path, opts: &Options) -> Result<RunReport> {
    let (projects, failed_files) = load_projects(root)?;
    let rows = project_summary(&projects);
    let mut table = Table::new(
        "summary",
        vec!["project", "issues", "pull_requests", "comments", "authors"],
    );
    for r in &rows {
        table.push(vec![
            r.project.as_str().into(),
            r.issues.into(),
            r.pull_requests.into(),
            r.comments.into(),
            r.authors.into(),
        ]);
    }
    let paths = save_all(&[table], &stem_of(root), &run_timestamp(), opts)?;
    Ok(RunReport {
        result: format!("Summary of {} project(s)\n{}", projects.len(), written(&paths)),
        failed_files,
    })
}

/// Contribution matrices, contributor spread and the author graph across
/// every project under `root`.
pub fn network(root: &Path, opts: &Options) -> Result<RunReport> {
    let (projects, failed_files) = load_projects(root)?;
    let contributions: Vec<_> = projects.iter().flat_map(contributions_from_logs).collect();
    check_unique_posts(&contributions)?;
    let matrix = compute_contributions_per_project(&contributions);

    let mut per_project = Table::new("contributions", vec!["project", "author", "contributions"]);
    for (p, project) in matrix.projects.iter().enumerate() {
        for (a, author) in matrix.authors.iter().enumerate() {
            let n = matrix.counts[p][a];
            if n > 0 {
                per_project.push(vec![project.as_str().into(), author.as_str().into(), n.into()]);
            }
        }
    }

    let project_headers = |first: &str| -> Vec<String> {
        std::iter::once(first.to_string())
            .chain(matrix.projects.iter().cloned())
            .collect()
    };
    let mut shared = Table::new("cocontributions", project_headers("project"));
    for (project, row) in matrix
        .projects
        .iter()
        .zip(normalized_cocontribution(&cocontribution_matrix(&matrix)))
    {
        let mut cells: Vec<Cell> = vec![project.as_str().into()];
        cells.extend(row.into_iter().map(Cell::from));
        shared.push(cells);
    }

    let mut histogram = Table::new("projects_per_contributor", vec!["projects", "contributors"]);
    for (n, k) in projects_per_contributor(&matrix) {
        histogram.push(vec![n.into(), k.into()]);
    }

    let spread_headers: Vec<String> = std::iter::once("project".to_string())
        .chain((1..=matrix.projects.len()).map(|n| n.to_string()))
        .collect();
    let mut spread = Table::new("spread", spread_headers);
    for (project, row) in matrix.projects.iter().zip(contributor_spread(&matrix)) {
        let mut cells: Vec<Cell> = vec![project.as_str().into()];
        cells.extend(row.into_iter().map(Cell::from));
        spread.push(cells);
    }

    let stem = stem_of(root);
    let timestamp = run_timestamp();
    let mut paths = save_all(&[per_project, shared, histogram, spread], &stem, &timestamp, opts)?;
    let graph = create_graph(&contributions, &matrix);
    paths.push(save_text(
        &graph.to_gml(),
        &opts.output,
        &stem,
        &timestamp,
        "graph",
        "gml",
    )?);
    Ok(RunReport {
        result: format!(
            "{} project(s), {} contributor(s), graph with {} node(s) and {} edge(s)\n{}",
            matrix.projects.len(),
            matrix.authors.len(),
            graph.node_count(),
            graph.edge_count(),
            written(&paths)
        ),
        failed_files,
    })
}

/// Render a model result file as a LaTeX significance table.
pub fn pvalues(path: &Path, labels: Option<&Path>, opts: &Options) -> Result<RunReport> {
    let table = pvalue_table(path, labels)?;
    let out = save_table(&table, &opts.output, &stem_of(path), &run_timestamp(), ExportFormat::Latex)?;
    Ok(RunReport {
        result: format!("{} row(s)\n  {}", table.len(), out.display()),
        failed_files: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const ISSUES: &str = "ticket_id\ttype\tauthor_id\tauthor_name\tcreated_at\tupdated_at\tclosed_at\ttitle\tbody\n\
        1\tissue\t10\talice\t2021-01-01T00:00:00Z\t2021-01-02T00:00:00Z\t2021-01-03T00:00:00Z\tCrash\tIt crashes, thanks for looking\n\
        2\tpull_request\t20\tbob\t2021-01-05T00:00:00Z\t\t\tFix\tThis is great\n";
    const COMMENTS: &str = "ticket_id\tauthor_id\tauthor_name\tcreated_at\tupdated_at\tbody\n\
        1\t20\tbob\t2021-01-06T00:00:00Z\t2021-01-06T00:00:00Z\tThanks @alice!\n\
        2\t10\talice\t2021-01-07T00:00:00Z\t\tLooks good\n\
        9\t10\talice\t2021-01-08T00:00:00Z\t\tlost\n";
    const COMMITS: &str = "sha\tauthor_name\tauthor_id\tdate\n\
        a1\talice\t10\t2021-01-01T00:00:00Z\n\
        a2\talice\t10\t2021-02-01T00:00:00Z\n\
        a3\tbob\t20\t2021-03-01T00:00:00Z\n";

    fn project(root: &Path, name: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("issues.tsv"), ISSUES).unwrap();
        fs::write(dir.join("comments.tsv"), COMMENTS).unwrap();
        fs::write(dir.join("commits.tsv"), COMMITS).unwrap();
        dir
    }

    fn options(out: &Path) -> Options {
        Options {
            output: out.to_path_buf(),
            export_format: ExportFormat::Json,
            ..Options::default()
        }
    }

    fn outputs(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn read_json(dir: &Path, suffix: &str) -> serde_json::Value {
        let name = outputs(dir)
            .into_iter()
            .find(|n| n.ends_with(suffix))
            .unwrap();
        serde_json::from_str(&fs::read_to_string(dir.join(name)).unwrap()).unwrap()
    }

    #[test]
    fn features_writes_four_tables() {
        let td = tempfile::tempdir().unwrap();
        let dir = project(td.path(), "numpy");
        let out = td.path().join("out");
        let report = extract_features(&dir, &options(&out)).unwrap();
        assert!(report.result.contains("3 comments, 2 tickets, 3 commits"));
        let names = outputs(&out);
        assert_eq!(names.len(), 4);
        for table in ["comments", "issues", "commits", "joined"] {
            assert!(names.iter().any(|n| n.ends_with(&format!("_{table}.json"))));
        }

        let comments = read_json(&out, "_comments.json");
        assert_eq!(comments[0]["mentions"], "alice");
        assert_eq!(comments[0]["gratitude_count"], 1);
        assert_eq!(comments[0]["num_pr_created"], 1);
        assert_eq!(comments[0]["num_issue_created"], 0);
        assert_eq!(comments[1]["num_issue_created"], 1);

        let issues = read_json(&out, "_issues.json");
        assert_eq!(issues[0]["is_closed"], true);
        assert_eq!(issues[0]["open_days"], 2);
        assert_eq!(issues[1]["type"], "pull_request");

        // the comment on ticket 9 has no ticket to join
        let joined = read_json(&out, "_joined.json");
        assert_eq!(joined.as_array().unwrap().len(), 2);
        assert_eq!(joined[0]["ticket_author"], "alice");
        assert_eq!(joined[0]["comment_author"], "bob");
    }

    #[test]
    fn bus_factor_reports_broken_projects() {
        let td = tempfile::tempdir().unwrap();
        let root = td.path().join("data");
        project(&root, "numpy");
        let broken = root.join("scipy");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join("issues.tsv"), "ticket_id\ttype\n1\tnonsense\n").unwrap();
        let out = td.path().join("out");

        let report = bus_factor(&root, &options(&out)).unwrap();
        assert_eq!(report.failed_files.len(), 1);
        assert!(report.failed_files[0].0.ends_with("scipy"));
        assert!(report.result.contains("numpy: bus factor 0.250"));

        let rates = read_json(&out, "_commit_rates.json");
        assert_eq!(rates[0]["rate"], 100.0);
        assert_eq!(rates[1]["rate"], 50.0);
    }

    #[test]
    fn survival_counts_pull_request_authors() {
        let td = tempfile::tempdir().unwrap();
        let root = td.path().join("data");
        project(&root, "numpy");
        let out = td.path().join("out");
        survival(&root, 1, &options(&out)).unwrap();
        let at = read_json(&out, "_survival_at_n.json");
        assert_eq!(at[0]["authors"], 1);
        assert_eq!(at[0]["percent"], 100.0);
        let per_author = read_json(&out, "_pr_per_author.json");
        assert_eq!(per_author[0]["author_id"], "20");
    }

    #[test]
    fn activity_falls_back_to_weeks() {
        let td = tempfile::tempdir().unwrap();
        let dir = project(td.path(), "numpy");
        let out = td.path().join("out");
        activity(&dir, ActivityLog::Comments, 1, &options(&out)).unwrap();
        let rows = read_json(&out, "_activity.json");
        assert_eq!(rows[0]["period"], "W");
        assert_eq!(rows[0]["start"], "2021-01-04");
        assert_eq!(rows[0]["total"], 3);
    }

    #[test]
    fn network_writes_graph() {
        let td = tempfile::tempdir().unwrap();
        let root = td.path().join("data");
        project(&root, "numpy");
        project(&root, "scipy");
        let out = td.path().join("out");
        let report = network(&root, &options(&out)).unwrap();
        assert!(report.result.contains("2 project(s), 2 contributor(s)"));
        assert!(outputs(&out).iter().any(|n| n.ends_with("_graph.gml")));
        let shared = read_json(&out, "_cocontributions.json");
        assert_eq!(shared[0]["scipy"], 100.0);
    }
}
