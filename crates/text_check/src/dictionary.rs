//! Offline dictionary backend
//!
//! Flags words missing from a built-in list plus any user words, and ranks
//! suggestions by Levenshtein distance. Tokens that look like URLs, email
//! addresses or paths are skipped whole.

use crate::words::{ENGLISH_WORDS, REGIONAL_SPELLINGS};
use crate::{CheckError, CheckMatch, Result, TextChecker};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Dictionaries shipped with the checker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Language {
    #[default]
    EnUs,
    EnGb,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::EnUs => "en-US",
            Language::EnGb => "en-GB",
        }
    }

    /// Spellings specific to this variety of English
    fn regional_words(self) -> impl Iterator<Item = &'static str> {
        REGIONAL_SPELLINGS.iter().map(move |&(us, gb)| match self {
            Language::EnUs => us,
            Language::EnGb => gb,
        })
    }

    /// Parse a language code such as `en-US`, `en_gb` or `en`
    pub fn from_code(code: &str) -> Option<Self> {
        match code.to_lowercase().as_str() {
            "en-us" | "en_us" | "en" => Some(Language::EnUs),
            "en-gb" | "en_gb" => Some(Language::EnGb),
            _ => None,
        }
    }
}

/// What the checker skips
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreRules {
    /// Acronyms such as `USCIS`
    pub ignore_all_caps: bool,
    /// Receipt numbers such as `WAC2190001234`
    pub ignore_words_with_numbers: bool,
    pub ignore_urls: bool,
    pub ignore_emails: bool,
    pub ignore_file_paths: bool,
    pub min_word_length: usize,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self {
            ignore_all_caps: true,
            ignore_words_with_numbers: true,
            ignore_urls: true,
            ignore_emails: true,
            ignore_file_paths: true,
            min_word_length: 2,
        }
    }
}

impl IgnoreRules {
    /// Rules applied to a whole whitespace-delimited token
    fn skips_token(&self, token: &str) -> bool {
        let token = token.trim_end_matches(|c: char| matches!(c, '.' | ',' | ';' | ':' | ')' | '!' | '?'));
        (self.ignore_urls && is_url(token))
            || (self.ignore_emails && is_email(token))
            || (self.ignore_file_paths && is_file_path(token))
    }

    /// Rules applied to a single word
    pub fn should_ignore(&self, word: &str) -> bool {
        word.chars().count() < self.min_word_length
            || (self.ignore_all_caps && is_all_caps(word))
            || (self.ignore_words_with_numbers && word.chars().any(|c| c.is_ascii_digit()))
            || self.skips_token(word)
    }
}

fn is_all_caps(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() >= 2 && letters.iter().all(|c| c.is_uppercase())
}

fn is_url(token: &str) -> bool {
    let lower = token.to_lowercase();
    ["http://", "https://", "ftp://", "www."]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn is_email(token: &str) -> bool {
    match token.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.') && !domain.ends_with('.'),
        None => false,
    }
}

fn is_file_path(token: &str) -> bool {
    token.contains('/') || token.contains('\\') || token.starts_with('~')
}

/// A word and its char range in the checked text
#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    start: usize,
    end: usize,
}

/// Split text into candidate words. A word is a run of alphanumerics with
/// interior apostrophes or hyphens; whole tokens the rules skip yield nothing.
fn extract_words(text: &str, rules: &IgnoreRules) -> Vec<Word> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }
        let token_start = index;
        while index < chars.len() && !chars[index].is_whitespace() {
            index += 1;
        }
        let token: String = chars[token_start..index].iter().collect();
        if rules.skips_token(&token) {
            continue;
        }
        push_token_words(&chars[token_start..index], token_start, &mut words);
    }
    words
}

fn push_token_words(token: &[char], offset: usize, words: &mut Vec<Word>) {
    let is_joiner = |c: char| c == '\'' || c == '-' || c == '\u{2019}';
    let mut i = 0;
    while i < token.len() {
        if !token[i].is_alphanumeric() {
            i += 1;
            continue;
        }
        let start = i;
        let mut end = i;
        while i < token.len() && (token[i].is_alphanumeric() || is_joiner(token[i])) {
            if token[i].is_alphanumeric() {
                end = i + 1;
            }
            i += 1;
        }
        words.push(Word {
            text: token[start..end].iter().collect(),
            start: offset + start,
            end: offset + end,
        });
    }
}

/// Edit distance between two strings, counted in chars
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut curr_row = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        curr_row[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr_row[j] = (prev_row[j] + 1)
                .min(curr_row[j - 1] + 1)
                .min(prev_row[j - 1] + cost);
        }
        std::mem::swap(&mut prev_row, &mut curr_row);
    }
    prev_row[b.len()]
}

/// Restore the capitalisation pattern of `original` on a lowercase candidate
fn match_case(original: &str, candidate: &str) -> String {
    let letters: Vec<char> = original.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.len() > 1 && letters.iter().all(|c| c.is_uppercase()) {
        return candidate.to_uppercase();
    }
    match original.chars().next() {
        Some(first) if first.is_uppercase() => {
            let mut chars = candidate.chars();
            chars
                .next()
                .map(|c| c.to_uppercase().chain(chars).collect())
                .unwrap_or_default()
        }
        _ => candidate.to_string(),
    }
}

/// Dictionary-based checker
#[derive(Debug, Clone)]
pub struct DictionaryChecker {
    language: Language,
    words: HashSet<String>,
    /// User words, e.g. client and place names
    custom_words: HashSet<String>,
    rules: IgnoreRules,
    max_suggestions: usize,
}

impl Default for DictionaryChecker {
    fn default() -> Self {
        Self::new(Language::default())
    }
}

impl DictionaryChecker {
    /// Create a checker with the built-in word list for `language`
    pub fn new(language: Language) -> Self {
        Self {
            language,
            words: ENGLISH_WORDS
                .iter()
                .copied()
                .chain(language.regional_words())
                .map(str::to_string)
                .collect(),
            custom_words: HashSet::new(),
            rules: IgnoreRules::default(),
            max_suggestions: 5,
        }
    }

    /// Create a checker from a language code such as `en-US`
    pub fn for_language_code(code: &str) -> Result<Self> {
        Language::from_code(code)
            .map(Self::new)
            .ok_or_else(|| CheckError::UnsupportedLanguage(code.to_string()))
    }

    pub fn with_rules(mut self, rules: IgnoreRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_max_suggestions(mut self, max: usize) -> Self {
        self.max_suggestions = max;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn add_word(&mut self, word: &str) {
        self.custom_words.insert(word.to_lowercase());
    }

    pub fn remove_word(&mut self, word: &str) {
        self.custom_words.remove(&word.to_lowercase());
    }

    /// User words in sorted order
    pub fn custom_words(&self) -> Vec<String> {
        let mut words: Vec<String> = self.custom_words.iter().cloned().collect();
        words.sort();
        words
    }

    /// Add the words of a plain word list (one per line, `#` comments) to
    /// the user words. Returns how many were added.
    pub async fn load_word_list(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await?;
        let before = self.custom_words.len();
        for line in content.lines().map(str::trim) {
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.chars().any(char::is_whitespace) {
                return Err(CheckError::InvalidWordList(format!(
                    "{}: '{}' is not a single word",
                    path.display(),
                    line
                )));
            }
            self.add_word(line);
        }
        let added = self.custom_words.len() - before;
        tracing::debug!("Loaded {} words from {}", added, path.display());
        Ok(added)
    }

    pub fn is_known(&self, word: &str) -> bool {
        let lower = word.to_lowercase();
        let lower = lower.replace('\u{2019}', "'");
        self.words.contains(&lower) || self.custom_words.contains(&lower)
    }

    /// Up to `max_suggestions` known words within edit distance 2
    pub fn suggest(&self, word: &str) -> Vec<String> {
        let lower = word.to_lowercase();
        let len = lower.chars().count();

        let mut candidates: Vec<(usize, &str)> = self
            .words
            .iter()
            .chain(self.custom_words.iter())
            .filter(|candidate| candidate.chars().count().abs_diff(len) <= 2)
            .filter_map(|candidate| {
                let distance = edit_distance(&lower, candidate);
                (distance <= 2).then_some((distance, candidate.as_str()))
            })
            .collect();
        candidates.sort();
        candidates.dedup_by(|a, b| a.1 == b.1);

        candidates
            .into_iter()
            .take(self.max_suggestions)
            .map(|(_, candidate)| match_case(word, candidate))
            .collect()
    }

    /// Check synchronously
    pub fn check_text(&self, text: &str) -> Vec<CheckMatch> {
        extract_words(text, &self.rules)
            .into_iter()
            .filter(|word| !self.rules.should_ignore(&word.text) && !self.is_known(&word.text))
            .map(|word| CheckMatch::with_suggestions(word.start, word.end - word.start, self.suggest(&word.text)))
            .collect()
    }
}

impl TextChecker for DictionaryChecker {
    async fn check(&self, text: &str) -> Result<Vec<CheckMatch>> {
        Ok(self.check_text(text))
    }
}
