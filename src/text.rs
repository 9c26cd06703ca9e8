//! Cleanup and token features of comment and ticket bodies.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::{count_words, sort_map_to_vec, trim_to_words};

static CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"```.*?```").expect("valid code fence regex"));

// GitHub logins: alphanumerics and single inner hyphens, at most 39 chars.
static MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^A-Za-z0-9_`.])@([A-Za-z0-9](?:[A-Za-z0-9]|-[A-Za-z0-9]){0,38})")
        .expect("valid mention regex")
});

const DEFAULT_BOTS: &[&str] = &[
    "dependabot[bot]",
    "dependabot-preview[bot]",
    "github-actions[bot]",
    "codecov[bot]",
    "codecov-io",
    "codecov-commenter",
    "coveralls",
    "travis-ci",
    "meeseeksmachine",
    "meeseeksdev[bot]",
    "pep8speaks",
    "lgtm-com[bot]",
    "stale[bot]",
    "welcome[bot]",
    "review-notebook-app[bot]",
    "pre-commit-ci[bot]",
    "sourcery-ai[bot]",
    "azure-pipelines[bot]",
    "circleci-artifacts-redirector[bot]",
    "scikit-learn-bot",
];

const DEFAULT_GRATITUDE: &[&str] = &[
    "thank",
    "thanks",
    "thankyou",
    "thanx",
    "thx",
    "ty",
    "tyvm",
    "appreciate",
    "appreciated",
    "appreciates",
    "appreciation",
    "grateful",
    "gratitude",
    "kudos",
    "cheers",
];

/// Loads a one-column word list with a header (e.g. `bot_name`).
///
/// When the named column is missing the first column is used.
pub fn load_word_list(path: &Path, column: &str) -> Result<Vec<String>> {
    if !path.is_file() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;
    let idx = rdr
        .headers()?
        .iter()
        .position(|h| h.trim() == column)
        .unwrap_or(0);
    let mut words = Vec::new();
    for record in rdr.records() {
        let record = record?;
        if let Some(value) = record.get(idx).map(str::trim).filter(|v| !v.is_empty()) {
            words.push(value.to_string());
        }
    }
    Ok(words)
}

/// Known automation accounts. Matching is exact.
#[derive(Debug, Clone)]
pub struct BotList(HashSet<String>);

impl BotList {
    pub fn new<I: IntoIterator<Item = String>>(names: I) -> Self {
        BotList(names.into_iter().collect())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_word_list(path, "bot_name")?))
    }

    pub fn contains(&self, author_name: &str) -> bool {
        self.0.contains(author_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for BotList {
    fn default() -> Self {
        Self::new(DEFAULT_BOTS.iter().map(|s| s.to_string()))
    }
}

/// Tokens counted as expressions of gratitude, stored lowercase.
#[derive(Debug, Clone)]
pub struct GratitudeVocabulary(HashSet<String>);

impl GratitudeVocabulary {
    pub fn new<I: IntoIterator<Item = String>>(words: I) -> Self {
        GratitudeVocabulary(words.into_iter().map(|w| w.to_lowercase()).collect())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(load_word_list(path, "expressions_of_gratitude")?))
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }
}

impl Default for GratitudeVocabulary {
    fn default() -> Self {
        Self::new(DEFAULT_GRATITUDE.iter().map(|s| s.to_string()))
    }
}

/// Body text after quote, newline and code block removal.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedBody {
    pub text: String,
    pub num_code_blocks: usize,
    pub mentions: Vec<String>,
    pub is_bot: bool,
    /// ISO 639-3 code, only when detection is reliable.
    pub language: Option<&'static str>,
}

/// Clean up a comment or ticket body.
///
/// # Example
/// ```
/// use community_stats::text::{body_cleanup, BotList};
/// let body = "> you wrote\nThanks @alice!\n```\nlet x = 1;\n```";
/// let cleaned = body_cleanup("bob", body, &BotList::default());
/// assert_eq!(cleaned.text, "Thanks @alice!");
/// assert_eq!(cleaned.num_code_blocks, 1);
/// assert_eq!(cleaned.mentions, vec!["alice".to_string()]);
/// assert!(!cleaned.is_bot);
/// ```
pub fn body_cleanup(author_name: &str, body: &str, bots: &BotList) -> CleanedBody {
    let unquoted: Vec<&str> = body
        .lines()
        .filter(|line| !line.trim_start().starts_with('>'))
        .collect();
    // `lines` already splits on \n and \r\n; stray \r are collapsed too
    let collapsed = unquoted.join(" ").replace('\r', " ");

    let num_code_blocks = CODE_FENCE.find_iter(&collapsed).count();
    let without_code = CODE_FENCE.replace_all(&collapsed, " ");
    let text = without_code.split_whitespace().collect::<Vec<_>>().join(" ");

    let mentions = MENTION
        .captures_iter(&text)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect();

    let language = whatlang::detect(&text)
        .filter(|info| info.is_reliable())
        .map(|info| info.lang().code());

    CleanedBody {
        text,
        num_code_blocks,
        mentions,
        is_bot: bots.contains(author_name),
        language,
    }
}

/// Word counts and gratitude tokens of a text.
#[derive(Debug, Clone, PartialEq)]
pub struct GratitudeFeatures {
    pub word_counts: HashMap<String, u32>,
    pub num_words: u32,
    pub gratitude_count: u32,
    /// Distinct matched tokens, most frequent first.
    pub gratitude_words: Vec<String>,
}

pub fn add_gratitude(text: &str, vocabulary: &GratitudeVocabulary) -> GratitudeFeatures {
    let word_counts = count_words(&trim_to_words(text));
    let num_words = word_counts.values().sum();
    let matched: HashMap<String, u32> = word_counts
        .iter()
        .filter(|(w, _)| vocabulary.contains(w))
        .map(|(w, c)| (w.clone(), *c))
        .collect();
    let gratitude_count = matched.values().sum();
    let gratitude_words = sort_map_to_vec(matched)
        .into_iter()
        .map(|(w, _)| w)
        .collect();
    GratitudeFeatures {
        word_counts,
        num_words,
        gratitude_count,
        gratitude_words,
    }
}
