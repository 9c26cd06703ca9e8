#![forbid(unsafe_code)]
//! # community_stats CLI
//!
//! Command-line interface for the `community_stats` crate. Each
//! subcommand reads the TSV logs of one project folder (or of every
//! project below a data root) and writes its tables to `--output`.
//!
//! ## Example
//! ```bash
//! cargo run --release -- bus-factor data/ --export-format json
//! cargo run --release -- activity data/numpy --log comments --months 3
//! ```
//!
//! See `--help` for all available options.

use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use community_stats::features::DEFAULT_OPEN_TIME_CAP_DAYS;
use community_stats::pipeline::{self, ActivityLog};
use community_stats::records::TicketKind;
use community_stats::{ExportFormat, Options, print_failed_files};
use log::error;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: Common,
}

#[derive(Args)]
struct Common {
    /// Directory the tables are written to
    #[arg(long, global = true, default_value = ".")]
    output: PathBuf,

    /// Output format for export (csv, tsv, json, latex)
    #[arg(long, global = true, default_value = "csv")]
    export_format: ExportFormat,

    /// Bot list (.csv with a `bot_name` column)
    #[arg(long, global = true)]
    bots: Option<PathBuf>,

    /// Gratitude vocabulary (.csv with an `expressions_of_gratitude` column)
    #[arg(long, global = true)]
    gratitude: Option<PathBuf>,

    /// Sentiment lexicon in VADER format (token<TAB>mean<TAB>...)
    #[arg(long, global = true)]
    lexicon: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Annotated comments, tickets and commits of one project, with text features
    Features { project: PathBuf },
    /// Bus factor and commit rates of every project under a data root
    BusFactor { root: PathBuf },
    /// Survival of pull request authors
    Survival {
        root: PathBuf,
        /// Pull requests an author must have opened to count as retained
        #[arg(long, default_value_t = 2)]
        at: u32,
    },
    /// Histogram of days tickets stayed open
    OpenTime {
        project: PathBuf,
        /// Ticket kind
        #[arg(long = "type", value_enum, default_value = "pr")]
        kind: Kind,
        /// Longer open times are counted at this many days
        #[arg(long, default_value_t = DEFAULT_OPEN_TIME_CAP_DAYS)]
        cap: u32,
    },
    /// Activity of humans and bots over time
    Activity {
        project: PathBuf,
        #[arg(long, value_enum)]
        log: ActivityLog,
        /// Months per bucket
        #[arg(long, default_value_t = 2)]
        months: u32,
    },
    /// Issues, pull requests, comments and authors per project
    Summary { root: PathBuf },
    /// Contribution matrices and the author graph
    Network { root: PathBuf },
    /// LaTeX table of model p-values
    Pvalues {
        file: PathBuf,
        /// Three-level row labels (.csv without header)
        #[arg(long)]
        labels: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum Kind {
    Issue,
    Pr,
}

impl From<Kind> for TicketKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Issue => TicketKind::Issue,
            Kind::Pr => TicketKind::PullRequest,
        }
    }
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let opts = match Options::load(
        cli.common.output,
        cli.common.export_format,
        cli.common.bots.as_deref(),
        cli.common.gratitude.as_deref(),
        cli.common.lexicon.as_deref(),
    ) {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    };

    let report = match &cli.command {
        Command::Features { project } => pipeline::extract_features(project, &opts),
        Command::BusFactor { root } => pipeline::bus_factor(root, &opts),
        Command::Survival { root, at } => pipeline::survival(root, *at, &opts),
        Command::OpenTime { project, kind, cap } => {
            pipeline::open_time(project, (*kind).into(), *cap, &opts)
        }
        Command::Activity {
            project,
            log,
            months,
        } => pipeline::activity(project, *log, *months, &opts),
        Command::Summary { root } => pipeline::summary(root, &opts),
        Command::Network { root } => pipeline::network(root, &opts),
        Command::Pvalues { file, labels } => pipeline::pvalues(file, labels.as_deref(), &opts),
    };

    match report {
        Ok(report) => {
            println!("{}", report.result);
            if !report.failed_files.is_empty() {
                print_failed_files(&report.failed_files);
                process::exit(1);
            }
        }
        Err(e) => {
            error!("Error: {}", e);
            process::exit(1);
        }
    }
}
