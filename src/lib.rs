#![forbid(unsafe_code)]
//! # community_stats
//!
//! Exploratory statistics over the logs of open-source communities: one
//! folder per project holding `issues.tsv`, `comments.tsv` and
//! `commits.tsv`.
//!
//! ## Features
//! - Typed loading of the logs with tolerant missing-value handling.
//! - Per-comment and per-ticket annotations (running counts, comment
//!   order, open duration).
//! - Body cleanup, mentions, language guess, sentiment and gratitude.
//! - Bus factor, contributor survival, open times, activity timelines.
//! - Contribution and co-contribution matrices and the author graph.
//! - Export as CSV, TSV, JSON or LaTeX.

use std::collections::HashMap;

pub mod annotate;
pub mod error;
pub mod export;
pub mod features;
pub mod latex;
pub mod network;
pub mod pipeline;
pub mod records;
pub mod sentiment;
pub mod text;

pub use error::{Error, Result};
pub use export::{Cell, ExportFormat, Table, csv_safe_cell};
pub use pipeline::{Options, RunReport, print_failed_files};

///Splits a text into lowercase words.
///Hyphens separate words, `'s` is dropped and punctuation is removed. Change the relevant line to remove or add chars.
/// # Example
/// ```
/// use community_stats::trim_to_words;
/// let trimmed = trim_to_words("(_Test] {well-known!=");
/// assert_eq!(trimmed, vec!["test", "well", "known"]);
/// ```
pub fn trim_to_words(content: &str) -> Vec<String> {
    content
        .to_lowercase()
        .replace('-', " ")
        .replace("'s", "")
        .replace(
            &[
                '(', ')', ',', '\"', '.', ';', ':', '=', '[', ']', '{', '}', '_', '/', '\'', '’',
                '?', '!', '“', '”', '‘', '*', '`', '~', '<', '>', '&', '#',
            ][..],
            "",
        )
        .split_whitespace()
        .map(String::from)
        .collect()
}

///Counts the quantity of each word. Returns HashMap<String, u32>, with String being the word and u32 the quantity.
/// # Example
/// ```
/// use community_stats::count_words;
/// let words = vec!["two".to_string(), "one".to_string(), "two".to_string()];
/// let counted = count_words(&words);
/// assert_eq!(counted["two"], 2);
/// assert_eq!(counted["one"], 1);
/// ```
pub fn count_words(words: &[String]) -> HashMap<String, u32> {
    let mut frequency: HashMap<String, u32> = HashMap::new();
    for word in words {
        *frequency.entry(word.to_owned()).or_insert(0) += 1;
    }
    frequency
}

///Sort words in HashMap<Word, Frequency> by frequency, then alphabetically, into Vec<(String, u32)>.
/// # Example
/// ```
/// use community_stats::sort_map_to_vec;
/// use std::collections::HashMap;
/// let mut words_map = HashMap::new();
/// words_map.insert("one".to_string(), 1_u32);
/// words_map.insert("two".to_string(), 2_u32);
/// words_map.insert("three".to_string(), 2_u32);
/// let vec_sorted = sort_map_to_vec(words_map);
/// let expected = vec![
///     ("three".to_string(), 2_u32),
///     ("two".to_string(), 2_u32),
///     ("one".to_string(), 1_u32),
/// ];
/// assert_eq!(vec_sorted, expected);
/// ```
pub fn sort_map_to_vec(frequency: HashMap<String, u32>) -> Vec<(String, u32)> {
    let mut vec_sorted: Vec<(String, u32)> = frequency.into_iter().collect();
    vec_sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    vec_sorted
}
