//! Lexicon and rule based polarity scoring.
//!
//! By default texts are scored by the VADER analyzer with its full
//! lexicon. A user supplied lexicon runs through the same scheme here:
//! token valences adjusted by boosters, negations, capitalization, a
//! contrastive "but" and trailing punctuation, then summarized as
//! negative / neutral / positive proportions plus a normalized compound
//! score.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

const BOOST_INCR: f64 = 0.293;
const BOOST_DECR: f64 = -0.293;
const CAPS_INCR: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "nobody", "nothing", "neither", "nor", "nowhere", "cannot",
    "without", "rarely", "seldom", "despite", "dont", "doesnt", "didnt", "isnt", "arent",
    "wasnt", "werent", "cant", "couldnt", "shouldnt", "wouldnt", "wont", "aint", "havent",
    "hasnt", "hadnt", "mustnt", "neednt",
];

const BOOSTERS_INCR: &[&str] = &[
    "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly", "deeply",
    "enormously", "entirely", "especially", "exceptionally", "extremely", "fabulously", "fully",
    "greatly", "highly", "hugely", "incredibly", "intensely", "majorly", "more", "most",
    "particularly", "purely", "quite", "really", "remarkably", "so", "substantially",
    "thoroughly", "totally", "tremendously", "truly", "unbelievably", "unusually", "utterly",
    "very",
];

const BOOSTERS_DECR: &[&str] = &[
    "almost", "barely", "hardly", "kinda", "less", "little", "marginally", "occasionally",
    "partly", "scarcely", "slightly", "somewhat", "sorta",
];

/// Four-component polarity score of a text.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

/// Token valences used by [`SentimentAnalyzer`].
#[derive(Debug, Clone)]
pub struct SentimentLexicon(HashMap<String, f64>);

impl SentimentLexicon {
    pub fn new<I: IntoIterator<Item = (String, f64)>>(entries: I) -> Self {
        SentimentLexicon(
            entries
                .into_iter()
                .map(|(w, v)| (w.to_lowercase(), v))
                .collect(),
        )
    }

    /// Read a lexicon in the VADER text format: `token<TAB>mean<TAB>...`.
    pub fn from_vader_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let mut entries = Vec::new();
        for (lineno, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let mut fields = line.split('\t');
            let (Some(token), Some(mean)) = (fields.next(), fields.next()) else {
                return Err(Error::Parse {
                    path: path.to_path_buf(),
                    message: format!("line {}: expected token and mean valence", lineno + 1),
                });
            };
            let mean: f64 = mean.trim().parse().map_err(|_| Error::Parse {
                path: path.to_path_buf(),
                message: format!("line {}: invalid valence {:?}", lineno + 1, mean),
            })?;
            entries.push((token.trim().to_string(), mean));
        }
        Ok(Self::new(entries))
    }

    pub fn get(&self, token: &str) -> Option<f64> {
        self.0.get(token).copied()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains_key(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub enum SentimentAnalyzer {
    /// The stock VADER lexicon and rules.
    #[default]
    Vader,
    Lexicon(SentimentLexicon),
}

impl SentimentAnalyzer {
    pub fn new(lexicon: SentimentLexicon) -> Self {
        SentimentAnalyzer::Lexicon(lexicon)
    }

    /// Score a text.
    ///
    /// # Example
    /// ```
    /// use community_stats::sentiment::SentimentAnalyzer;
    /// let analyzer = SentimentAnalyzer::default();
    /// let s = analyzer.polarity_scores("This is great");
    /// assert!(s.compound > 0.5);
    /// assert_eq!(s.neg, 0.0);
    /// ```
    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        if text.trim().is_empty() {
            return PolarityScores::default();
        }
        match self {
            SentimentAnalyzer::Vader => vader_scores(text),
            SentimentAnalyzer::Lexicon(lexicon) => lexicon_scores(lexicon, text),
        }
    }
}

fn vader_scores(text: &str) -> PolarityScores {
    let analyzer = vader_sentiment::SentimentIntensityAnalyzer::new();
    let scores = analyzer.polarity_scores(text);
    let get = |key: &str| scores.get(key).copied().unwrap_or(0.0);
    PolarityScores {
        neg: get("neg"),
        neu: get("neu"),
        pos: get("pos"),
        compound: get("compound"),
    }
}

fn lexicon_scores(lexicon: &SentimentLexicon, text: &str) -> PolarityScores {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return PolarityScores::default();
    }
    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();
    let caps_differ = caps_differential(&tokens);

    let mut sentiments: Vec<f64> = Vec::with_capacity(tokens.len());
    for i in 0..tokens.len() {
        let word = lowered[i].as_str();
        let kind_of = word == "kind" && lowered.get(i + 1).is_some_and(|n| n == "of");
        if is_booster(word) || kind_of {
            sentiments.push(0.0);
            continue;
        }
        sentiments.push(token_valence(lexicon, &tokens, &lowered, i, caps_differ));
    }

    but_check(&lowered, &mut sentiments);

    let punct = punctuation_emphasis(text);
    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += punct;
    } else if sum < 0.0 {
        sum -= punct;
    }
    let compound = normalize(sum);

    let (mut pos_sum, mut neg_sum, mut neu_count) = (0.0_f64, 0.0_f64, 0.0_f64);
    for s in &sentiments {
        if *s > 0.0 {
            pos_sum += s + 1.0;
        } else if *s < 0.0 {
            neg_sum += s - 1.0;
        } else {
            neu_count += 1.0;
        }
    }
    if pos_sum > neg_sum.abs() {
        pos_sum += punct;
    } else if pos_sum < neg_sum.abs() {
        neg_sum -= punct;
    }
    let total = pos_sum + neg_sum.abs() + neu_count;
    PolarityScores {
        neg: round_to(neg_sum.abs() / total, 3),
        neu: round_to(neu_count / total, 3),
        pos: round_to(pos_sum / total, 3),
        compound: round_to(compound, 4),
    }
}

fn token_valence(
    lexicon: &SentimentLexicon,
    tokens: &[&str],
    lowered: &[String],
    i: usize,
    caps_differ: bool,
) -> f64 {
    let Some(mut valence) = lexicon.get(&lowered[i]) else {
        return 0.0;
    };
    if caps_differ && is_all_caps(tokens[i]) {
        valence += CAPS_INCR * valence.signum();
    }
    for back in 0..3 {
        if i <= back {
            break;
        }
        let prev = i - (back + 1);
        if !lexicon.contains(&lowered[prev]) {
            let mut scalar = booster_scalar(tokens[prev], &lowered[prev], valence, caps_differ);
            if back == 1 {
                scalar *= 0.95;
            } else if back == 2 {
                scalar *= 0.9;
            }
            valence += scalar;
        }
        if is_negation(&lowered[prev]) {
            valence *= NEGATION_SCALAR;
        }
    }
    valence
}

/// Polarity scores of a single text.
pub fn add_sentiment(analyzer: &SentimentAnalyzer, text: &str) -> PolarityScores {
    analyzer.polarity_scores(text)
}

/// Whitespace tokens with surrounding punctuation stripped; emoticons
/// are kept whole and single characters dropped.
fn tokenize(text: &str) -> Vec<&str> {
    text.split_whitespace()
        .map(|raw| {
            if is_emoticon(raw) {
                raw
            } else {
                raw.trim_matches(|c: char| c.is_ascii_punctuation())
            }
        })
        .filter(|t| t.chars().count() > 1)
        .collect()
}

/// Short faces such as `:)`, `:-(`, `;D` or `<3`.
fn is_emoticon(raw: &str) -> bool {
    (2..=4).contains(&raw.chars().count())
        && raw.starts_with([':', ';', '=', '<'])
        && raw.chars().skip(1).any(|c| c != ':' && c != ';')
}

fn is_all_caps(token: &str) -> bool {
    token.chars().any(|c| c.is_alphabetic()) && !token.chars().any(|c| c.is_lowercase())
}

fn caps_differential(tokens: &[&str]) -> bool {
    let caps = tokens.iter().filter(|t| is_all_caps(t)).count();
    caps > 0 && caps < tokens.len()
}

fn is_booster(word: &str) -> bool {
    BOOSTERS_INCR.contains(&word) || BOOSTERS_DECR.contains(&word)
}

fn is_negation(word: &str) -> bool {
    NEGATIONS.contains(&word) || word.contains("n't")
}

fn booster_scalar(token: &str, word: &str, valence: f64, caps_differ: bool) -> f64 {
    let mut scalar = if BOOSTERS_INCR.contains(&word) {
        BOOST_INCR
    } else if BOOSTERS_DECR.contains(&word) {
        BOOST_DECR
    } else {
        return 0.0;
    };
    if valence < 0.0 {
        scalar = -scalar;
    }
    if caps_differ && is_all_caps(token) {
        scalar += CAPS_INCR * valence.signum();
    }
    scalar
}

fn but_check(lowered: &[String], sentiments: &mut [f64]) {
    let Some(but) = lowered.iter().position(|w| w == "but") else {
        return;
    };
    for (i, s) in sentiments.iter_mut().enumerate() {
        if i < but {
            *s *= 0.5;
        } else if i > but {
            *s *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclamations = text.matches('!').count().min(4) as f64;
    let questions = text.matches('?').count();
    let question_amp = match questions {
        0 | 1 => 0.0,
        2 | 3 => questions as f64 * 0.18,
        _ => 0.96,
    };
    exclamations * 0.292 + question_amp
}

fn normalize(score: f64) -> f64 {
    let norm = score / (score * score + NORMALIZE_ALPHA).sqrt();
    norm.clamp(-1.0, 1.0)
}

fn round_to(x: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (x * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn test_lexicon() -> SentimentLexicon {
        SentimentLexicon::new(
            [
                ("great", 3.1),
                ("good", 1.9),
                ("love", 3.2),
                ("terrible", -2.1),
                ("confusing", -1.3),
                ("broken", -1.6),
                ("failing", -2.3),
                (":)", 2.0),
                (":(", -1.9),
            ]
            .into_iter()
            .map(|(w, v)| (w.to_string(), v)),
        )
    }

    fn score(text: &str) -> PolarityScores {
        SentimentAnalyzer::new(test_lexicon()).polarity_scores(text)
    }

    fn vader(text: &str) -> PolarityScores {
        SentimentAnalyzer::default().polarity_scores(text)
    }

    #[test]
    fn empty_text_scores_zero() {
        assert_eq!(score(""), PolarityScores::default());
        assert_eq!(score("   \n "), PolarityScores::default());
    }

    #[test]
    fn neutral_text_is_all_neutral() {
        let s = score("The function returns a list of arrays");
        assert_eq!(s.neu, 1.0);
        assert_eq!(s.compound, 0.0);
    }

    #[test]
    fn positive_sentence() {
        let s = score("This is great");
        assert!((s.compound - 0.6249).abs() < 1e-4, "{s:?}");
        assert_eq!(s.pos, 0.672);
        assert_eq!(s.neu, 0.328);
        assert_eq!(s.neg, 0.0);
    }

    #[test]
    fn proportions_sum_to_one() {
        let s = score("I love the new API but the docs are confusing and the build is broken");
        let total = s.neg + s.neu + s.pos;
        assert!((total - 1.0).abs() < 0.01, "{s:?}");
    }

    #[test]
    fn negation_flips_polarity() {
        assert!(score("This is not great").compound < 0.0);
        assert!(score("This isn't good").compound < 0.0);
    }

    #[test]
    fn boosters_and_dampeners() {
        let plain = score("This is good").compound;
        assert!(score("This is very good").compound > plain);
        assert!(score("This is slightly good").compound < plain);
    }

    #[test]
    fn caps_and_exclamations_amplify() {
        let plain = score("This is great").compound;
        assert!(score("This is GREAT").compound > plain);
        assert!(score("This is great!!!").compound > plain);
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        let s = score("The docs are great but the build is terrible");
        assert!(s.compound < 0.0, "{s:?}");
    }

    #[test]
    fn emoticons_are_scored() {
        assert!(score("merged :)").compound > 0.0);
        assert!(score("still failing :(").compound < 0.0);
    }

    #[test]
    fn default_analyzer_uses_full_vader_lexicon() {
        assert_eq!(vader(""), PolarityScores::default());

        let s = vader("This is a disaster");
        assert!(s.compound < -0.5, "{s:?}");
        assert!(s.neg > 0.0 && s.pos == 0.0, "{s:?}");

        assert!(vader("I am thrilled with this fix").compound > 0.0);
        assert!(vader("This regression is unacceptable").compound < 0.0);

        let s = vader("This is great");
        assert!((s.compound - 0.6249).abs() < 1e-3, "{s:?}");
    }

    #[test]
    fn vader_file_replaces_lexicon() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "splendid\t2.8\t0.6\t[3, 3, 2]").unwrap();
        writeln!(f, "meh\t-0.6\t0.5\t[-1, 0]").unwrap();
        let lexicon = SentimentLexicon::from_vader_file(f.path()).unwrap();
        assert_eq!(lexicon.len(), 2);
        let analyzer = SentimentAnalyzer::new(lexicon);
        assert!(analyzer.polarity_scores("splendid work").compound > 0.0);
        assert_eq!(analyzer.polarity_scores("great work").compound, 0.0);
    }

    #[test]
    fn malformed_vader_file_is_rejected() {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        writeln!(f, "splendid\tnot-a-number").unwrap();
        assert!(SentimentLexicon::from_vader_file(f.path()).is_err());
    }
}
