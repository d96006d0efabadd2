//! Query-side natural language processing: noun extraction, stemming and
//! generic-noun filtering.
//!
//! [`NlpEngine`] is built once at startup and shared by reference; it holds
//! no per-request state.

pub mod generic;
pub mod stem;
pub mod tagger;

use serde::Serialize;
use std::collections::HashSet;

use generic::DEFAULT_GENERIC_NOUNS;
use stem::WordStemmer;
use tagger::{LexiconTagger, PosTag};

/// Minimum length for a word (or stem) to be worth stemming/searching.
pub const MIN_STEM_CHARS: usize = 3;

/// Outcome of [`NlpEngine::stem_query_for_suggestion`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StemmedQuery {
    pub original: String,
    pub stemmed: String,
    pub should_use_stemmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_nouns: Option<Vec<String>>,
}

pub struct NlpEngine {
    tagger: LexiconTagger,
    stemmer: WordStemmer,
    generic_stems: HashSet<String>,
}

impl Default for NlpEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NlpEngine {
    pub fn new() -> Self {
        Self::with_generic_nouns(DEFAULT_GENERIC_NOUNS)
    }

    /// Build an engine with a custom generic-noun stoplist (surface forms).
    pub fn with_generic_nouns(words: &[&str]) -> Self {
        let stemmer = WordStemmer::new();
        let generic_stems = words.iter().map(|w| stemmer.stem(w)).collect();
        Self {
            tagger: LexiconTagger::new(),
            stemmer,
            generic_stems,
        }
    }

    /// Nouns and proper nouns in reading order, lowercased and de-duplicated.
    /// Tokens inside a recognized entity (dates, numbers, contact details)
    /// are never returned.
    pub fn extract_nouns(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.tagger
            .tag(text)
            .into_iter()
            .filter(|t| matches!(t.tag, PosTag::Noun | PosTag::ProperNoun))
            .map(|t| t.text.to_lowercase())
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    pub fn stem_word(&self, word: &str) -> String {
        self.stemmer.stem(word)
    }

    pub fn is_generic_noun(&self, stemmed_word: &str) -> bool {
        self.generic_stems.contains(stemmed_word)
    }

    /// Drop every term on the stoplist; everything else passes through in order.
    pub fn filter_generic_nouns(&self, stemmed_words: &[String]) -> Vec<String> {
        stemmed_words
            .iter()
            .filter(|w| !self.is_generic_noun(w))
            .cloned()
            .collect()
    }

    /// True when every whitespace-separated term of `text` is generic, either
    /// as written or once stemmed. Empty text counts as all-generic.
    pub fn is_all_generic(&self, text: &str) -> bool {
        text.split_whitespace().all(|term| {
            let lower = term.to_lowercase();
            self.is_generic_noun(&lower) || self.is_generic_noun(&self.stem_word(&lower))
        })
    }

    /// Stem a query for lexical matching.
    ///
    /// Queries of more than two words are reduced to their nouns first, then
    /// stemmed and stripped of generic nouns. If nothing non-generic
    /// survives, the stemmed form is empty and must not be used. Shorter
    /// queries are stemmed word by word, leaving words under
    /// [`MIN_STEM_CHARS`] characters as typed.
    pub fn stem_query_for_suggestion(&self, query: &str) -> StemmedQuery {
        let original = query.trim().to_string();
        let lowered = original.to_lowercase();

        if word_count(&original) > 2 {
            let nouns = self.extract_nouns(&original);
            let stems: Vec<String> = nouns.iter().map(|n| self.stem_word(n)).collect();
            let stemmed = self.filter_generic_nouns(&stems).join(" ");
            let should_use_stemmed = !stemmed.is_empty() && stemmed != lowered;
            return StemmedQuery {
                original,
                stemmed,
                should_use_stemmed,
                extracted_nouns: Some(nouns),
            };
        }

        let stemmed = original
            .split_whitespace()
            .map(|w| {
                if w.chars().count() >= MIN_STEM_CHARS {
                    self.stem_word(w)
                } else {
                    w.to_lowercase()
                }
            })
            .filter(|w| !w.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        let should_use_stemmed = !stemmed.is_empty() && stemmed != lowered;
        StemmedQuery {
            original,
            stemmed,
            should_use_stemmed,
            extracted_nouns: None,
        }
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Queries of two words or fewer carry too little context for intent
/// classification or noun extraction.
pub fn is_short_query(text: &str) -> bool {
    word_count(text) <= 2
}
