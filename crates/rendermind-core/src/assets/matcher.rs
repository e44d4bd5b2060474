//! Query scoring against the on-disk model library.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use walkdir::WalkDir;

use super::error::AssetError;
use super::format::AssetFormat;

/// A scored reference to a model file. Produced per search, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub path: PathBuf,
    pub filename: String,
    /// Directory relative to the asset root, `root` for top-level files.
    pub category: String,
    /// Lowercase extension without the dot.
    pub format: String,
    pub score: u32,
}

impl AssetRecord {
    pub fn asset_format(&self) -> Result<AssetFormat, AssetError> {
        AssetFormat::from_extension(&self.format).ok_or_else(|| AssetError::UnsupportedFormat {
            format: self.format.clone(),
            path: self.path.clone(),
        })
    }

    pub fn stem(&self) -> &str {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.filename)
    }
}

/// Score for each rung of the precedence ladder. First matching rung wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreLadder {
    /// Query equals the stem or clean stem, or a meaningful word equals the clean stem.
    pub exact: u32,
    /// A meaningful word is a substring of the clean stem.
    pub word_in_clean: u32,
    /// Whole query is a substring of the clean stem.
    pub query_in_clean: u32,
    /// Whole query is a substring of the raw stem.
    pub query_in_stem: u32,
    /// Multi-word query whose every word is in the raw stem.
    pub all_words: u32,
    /// Single long word in the raw stem.
    pub single_word: u32,
}

impl Default for ScoreLadder {
    fn default() -> Self {
        Self {
            exact: 100,
            word_in_clean: 90,
            query_in_clean: 85,
            query_in_stem: 80,
            all_words: 70,
            single_word: 60,
        }
    }
}

pub const DEFAULT_STOPWORDS: &[&str] = &[
    "add", "the", "create", "make", "place", "import", "put", "a", "an", "some", "nice", "please",
    "new",
];

pub const DEFAULT_NOISE: &[&str] = &["food_", "_01", "_02", "_4k", "_8k"];

/// Tunable matching constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchConfig {
    pub ladder: ScoreLadder,
    pub stopwords: Vec<String>,
    /// Substrings removed from a stem to form the clean stem, in order.
    pub noise: Vec<String>,
    /// Minimum length for a meaningful word.
    pub min_word_len: usize,
    /// Words of at most this length are ignored by the all-words rung.
    pub all_words_skip_len: usize,
    /// Minimum query length for the single-word rung.
    pub single_word_min_len: usize,
    /// Top score at or above which a match replaces generation.
    pub shortcut_threshold: u32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            ladder: ScoreLadder::default(),
            stopwords: DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect(),
            noise: DEFAULT_NOISE.iter().map(|s| s.to_string()).collect(),
            min_word_len: 3,
            all_words_skip_len: 2,
            single_word_min_len: 4,
            shortcut_threshold: 60,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.shortcut_threshold = threshold;
        self
    }

    /// Stem with every noise substring removed.
    pub fn clean_stem(&self, stem: &str) -> String {
        self.noise
            .iter()
            .fold(stem.to_string(), |acc, noise| acc.replace(noise.as_str(), ""))
    }
}

/// Lowercased query words minus stopwords and short tokens.
pub fn meaningful_words(query: &str, config: &MatchConfig) -> Vec<String> {
    query_words(query)
        .into_iter()
        .filter(|w| w.chars().count() >= config.min_word_len)
        .filter(|w| !config.stopwords.iter().any(|s| s == w))
        .collect()
}

fn normalize(query: &str) -> String {
    query.trim().to_lowercase()
}

fn query_words(query: &str) -> Vec<String> {
    normalize(query)
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric() && c != '_'))
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read-only model library rooted at one directory.
#[derive(Debug, Clone)]
pub struct AssetLibrary {
    root: PathBuf,
    config: MatchConfig,
}

impl AssetLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            config: MatchConfig::default(),
        }
    }

    pub fn with_config(mut self, config: MatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    /// Score a query against a single file stem. Zero means no match.
    pub fn score_stem(&self, query: &str, stem: &str) -> u32 {
        let ladder = &self.config.ladder;
        let query = normalize(query);
        if query.is_empty() {
            return 0;
        }
        let stem = stem.to_lowercase();
        let clean = self.config.clean_stem(&stem);
        let words = query_words(&query);
        let meaningful = meaningful_words(&query, &self.config);

        if query == stem || query == clean || meaningful.iter().any(|w| *w == clean) {
            ladder.exact
        } else if meaningful.iter().any(|w| clean.contains(w.as_str())) {
            ladder.word_in_clean
        } else if clean.contains(query.as_str()) {
            ladder.query_in_clean
        } else if stem.contains(query.as_str()) {
            ladder.query_in_stem
        } else if words.len() >= 2 && self.all_words_in(&words, &stem) {
            ladder.all_words
        } else if words.len() == 1
            && query.chars().count() >= self.config.single_word_min_len
            && stem.contains(query.as_str())
        {
            ladder.single_word
        } else {
            0
        }
    }

    fn all_words_in(&self, words: &[String], stem: &str) -> bool {
        let mut qualifying = words
            .iter()
            .filter(|w| w.chars().count() > self.config.all_words_skip_len)
            .peekable();
        // Vacuous matches (nothing long enough to check) do not count.
        qualifying.peek().is_some() && qualifying.all(|w| stem.contains(w.as_str()))
    }

    /// Search the library, reporting a missing root or walk failure.
    pub fn try_search(&self, query: &str) -> Result<Vec<AssetRecord>, AssetError> {
        if !self.root.is_dir() {
            return Err(AssetError::RootMissing(self.root.clone()));
        }
        if normalize(query).is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        let mut scanned = 0usize;
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            scanned += 1;
            let path = entry.path();
            let Some(format) = AssetFormat::from_path(path) else {
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let score = self.score_stem(query, stem);
            if score == 0 {
                continue;
            }
            matches.push(AssetRecord {
                path: path.to_path_buf(),
                filename: entry.file_name().to_string_lossy().into_owned(),
                category: self.category_of(path),
                format: format.extension().to_string(),
                score,
            });
        }

        // Stable: discovery order breaks ties.
        matches.sort_by(|a, b| b.score.cmp(&a.score));
        debug!(query, scanned, matched = matches.len(), "asset search");
        Ok(matches)
    }

    /// Search the library. A missing root yields no results.
    pub fn search(&self, query: &str) -> Vec<AssetRecord> {
        match self.try_search(query) {
            Ok(found) => found,
            Err(err) => {
                warn!(error = %err, "asset search unavailable");
                Vec::new()
            }
        }
    }

    /// Top result when it clears the shortcut threshold.
    pub fn best_match(&self, query: &str) -> Option<AssetRecord> {
        self.search(query)
            .into_iter()
            .next()
            .filter(|r| r.score >= self.config.shortcut_threshold)
    }

    fn category_of(&self, path: &Path) -> String {
        path.parent()
            .and_then(|p| p.strip_prefix(&self.root).ok())
            .map(|rel| {
                rel.components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| "root".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lib() -> AssetLibrary {
        AssetLibrary::new("unused")
    }

    #[test]
    fn test_clean_stem_strips_noise() {
        let cfg = MatchConfig::default();
        assert_eq!(cfg.clean_stem("food_apple_01_4k"), "apple");
        assert_eq!(cfg.clean_stem("vase_01"), "vase");
    }

    #[test]
    fn test_ladder_rungs() {
        let lib = lib();
        assert_eq!(lib.score_stem("vase", "vase_01"), 100);
        assert_eq!(lib.score_stem("a nice red chair", "chair_4k"), 100);
        assert_eq!(lib.score_stem("add a table", "wooden_table"), 90);
        assert_eq!(lib.score_stem("ta", "table_ta"), 85);
        assert_eq!(lib.score_stem("e_0", "vase_01"), 80);
        assert_eq!(lib.score_stem("of it", "it_of_x"), 0);
        assert_eq!(lib.score_stem("rock", "big_rock_02"), 90);
        assert_eq!(lib.score_stem("zzz", "chair"), 0);
    }

    #[test]
    fn test_all_words_rung() {
        let cfg = MatchConfig {
            stopwords: vec!["big".into(), "red".into()],
            ..MatchConfig::default()
        };
        let lib = lib().with_config(cfg);
        // Stopwords only affect the meaningful-word rungs.
        assert_eq!(lib.score_stem("big red", "red_big"), 70);
        assert_eq!(lib.score_stem("big red", "red_chair"), 0);
        // Nothing long enough to check is not a match.
        assert_eq!(lib.score_stem("of it", "it_of_x"), 0);
    }

    #[test]
    fn test_meaningful_words_filters_stopwords_and_short_tokens() {
        let words = meaningful_words("Add a NICE red chair!", &MatchConfig::default());
        assert_eq!(words, ["red", "chair"]);
    }

    #[test]
    fn test_empty_query_scores_zero() {
        assert_eq!(lib().score_stem("   ", "chair"), 0);
    }
}
