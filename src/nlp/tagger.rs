//! Lexicon-driven part-of-speech tagging tuned for short help-seeking queries
//! ("I need help paying my rent", "food pantry open saturday").
//!
//! Closed word classes come from fixed lists; open-class words default to
//! NOUN unless a verb or adjective lexicon claims them. Tokens that look like
//! entities (numbers, dates, contact details) are tagged separately so noun
//! extraction can skip them.

use regex::Regex;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosTag {
    Noun,
    ProperNoun,
    Verb,
    Auxiliary,
    Adjective,
    Adverb,
    Pronoun,
    Determiner,
    Adposition,
    Conjunction,
    Particle,
    Number,
    /// Part of a recognized entity (date, time, email, url, phone, ...).
    Entity,
    Punctuation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedToken {
    pub text: String,
    pub tag: PosTag,
}

const DETERMINERS: &[&str] = &[
    "a", "an", "the", "this", "that", "these", "those", "my", "your", "our", "their", "his",
    "her", "its", "some", "any", "each", "every", "no", "all", "both", "another", "other",
    "which", "whose",
];

const PRONOUNS: &[&str] = &[
    "i", "me", "we", "us", "you", "he", "him", "she", "it", "they", "them", "myself",
    "ourselves", "yourself", "themselves", "someone", "somebody", "anyone", "anybody",
    "something", "anything", "everyone", "what", "who", "whom", "where", "when", "how", "why",
    "mine", "yours", "ours", "theirs",
];

const OBJECT_PRONOUNS: &[&str] = &["me", "us", "him", "her", "them", "it", "myself"];

const ADPOSITIONS: &[&str] = &[
    "with", "for", "to", "in", "on", "at", "by", "from", "of", "about", "near", "into",
    "around", "without", "during", "after", "before", "under", "over", "through", "between",
    "within", "across", "against", "towards", "toward", "like", "via", "per",
];

const CONJUNCTIONS: &[&str] = &["and", "or", "but", "nor", "so", "yet", "if", "because", "while"];

const AUXILIARIES: &[&str] = &[
    "am", "is", "are", "was", "were", "be", "been", "being", "do", "does", "did", "have",
    "has", "had", "can", "could", "will", "would", "shall", "should", "may", "might", "must",
    "i'm", "im", "i've", "can't", "cant", "don't", "dont",
];

const PARTICLES: &[&str] = &["not", "n't", "please"];

const ADVERBS: &[&str] = &[
    "very", "really", "just", "now", "today", "tonight", "tomorrow", "here", "there",
    "nearby", "asap", "urgently", "immediately", "also", "too", "again", "soon", "currently",
];

/// Words that are verbs in query position. Ambiguous words such as "help",
/// "care" or "support" are deliberately left out; in these queries they are
/// almost always the thing being asked for.
const VERBS: &[&str] = &[
    "need", "needs", "needed", "want", "wants", "find", "finding", "get", "getting", "got",
    "looking", "look", "search", "searching", "pay", "paying", "apply", "applying", "afford",
    "go", "going", "live", "living", "lost", "lose", "losing", "make", "making", "take",
    "taking", "give", "giving", "keep", "fix", "fixing", "buy", "feed", "feeding", "sign",
    "talk", "speak", "call", "quit", "stop", "stay", "staying", "move", "moving", "evicted",
    "kicked", "locate", "locating", "receive", "know", "tell", "show", "struggling", "trying",
    "try", "became", "become", "cover", "covering",
];

const ADJECTIVES: &[&str] = &[
    "free", "cheap", "affordable", "low", "low-cost", "local", "new", "old", "good", "best",
    "small", "big", "young", "elderly", "homeless", "hungry", "sick", "pregnant", "disabled",
    "unemployed", "open", "close", "closest", "nearest", "available", "public", "legal",
    "mental", "medical", "dental", "financial", "emergency", "immediate", "safe", "single",
    "low-income", "overdue", "past-due", "unpaid", "late", "many", "much", "more", "most",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "june", "july", "august", "september", "october",
    "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep", "sept",
    "oct", "nov", "dec",
];

const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday", "weekend",
    "weekends", "weekday", "weekdays",
];

pub struct LexiconTagger {
    determiners: HashSet<&'static str>,
    pronouns: HashSet<&'static str>,
    object_pronouns: HashSet<&'static str>,
    adpositions: HashSet<&'static str>,
    conjunctions: HashSet<&'static str>,
    auxiliaries: HashSet<&'static str>,
    particles: HashSet<&'static str>,
    adverbs: HashSet<&'static str>,
    verbs: HashSet<&'static str>,
    adjectives: HashSet<&'static str>,
    dates: HashSet<&'static str>,
    token_re: Regex,
    entity_res: Vec<Regex>,
}

impl Default for LexiconTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconTagger {
    pub fn new() -> Self {
        let set = |words: &[&'static str]| words.iter().copied().collect::<HashSet<_>>();
        let entity_patterns = [
            // email
            r"^[\w.+-]+@[\w-]+(\.[\w-]+)+$",
            // url
            r"^(https?://|www\.)\S+$",
            // phone
            r"^\(?\d{3}\)?[-.]?\d{3}[-.]?\d{4}$",
            // time
            r"^\d{1,2}(:\d{2})?(am|pm)$",
            // numeric date
            r"^\d{1,4}[/-]\d{1,2}([/-]\d{1,4})?$",
            // ordinal
            r"^\d+(st|nd|rd|th)$",
            // money
            r"^\$\d[\d,]*(\.\d+)?$",
        ];
        Self {
            determiners: set(DETERMINERS),
            pronouns: set(PRONOUNS),
            object_pronouns: set(OBJECT_PRONOUNS),
            adpositions: set(ADPOSITIONS),
            conjunctions: set(CONJUNCTIONS),
            auxiliaries: set(AUXILIARIES),
            particles: set(PARTICLES),
            adverbs: set(ADVERBS),
            verbs: set(VERBS),
            adjectives: set(ADJECTIVES),
            dates: MONTHS.iter().chain(WEEKDAYS.iter()).copied().collect(),
            token_re: Regex::new(r"[\w$][\w'@.:/$,+-]*|[^\w\s]")
                .expect("token pattern is valid"),
            entity_res: entity_patterns
                .iter()
                .map(|p| Regex::new(p).expect("entity pattern is valid"))
                .collect(),
        }
    }

    /// Split `text` into tokens, trimming sentence punctuation that the token
    /// pattern keeps attached (a trailing comma or period).
    fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.token_re
            .find_iter(text)
            .map(|m| m.as_str())
            .map(|t| {
                if t.len() > 1 {
                    t.trim_end_matches(|c: char| matches!(c, '.' | ',' | ':' | '/' | '\''))
                } else {
                    t
                }
            })
            .filter(|t| !t.is_empty())
            .collect()
    }

    fn is_entity(&self, token: &str, lower: &str) -> bool {
        if self.dates.contains(lower) {
            return true;
        }
        self.entity_res.iter().any(|re| re.is_match(token) || re.is_match(lower))
    }

    pub fn tag(&self, text: &str) -> Vec<TaggedToken> {
        let tokens = self.tokenize(text);
        let mut tagged: Vec<TaggedToken> = Vec::with_capacity(tokens.len());

        for (i, token) in tokens.iter().enumerate() {
            let lower = token.to_lowercase();
            let prev = i.checked_sub(1).map(|p| tagged[p].tag);
            let next = tokens.get(i + 1).map(|t| t.to_lowercase());

            let tag = if !token.chars().any(|c| c.is_alphanumeric()) {
                PosTag::Punctuation
            } else if self.is_entity(token, &lower) {
                PosTag::Entity
            } else if lower.chars().all(|c| c.is_ascii_digit() || c == ',' || c == '.') {
                PosTag::Number
            } else if self.determiners.contains(lower.as_str()) {
                PosTag::Determiner
            } else if self.pronouns.contains(lower.as_str()) {
                PosTag::Pronoun
            } else if lower == "to" && next.as_deref().is_some_and(|n| self.verbs.contains(n)) {
                PosTag::Particle
            } else if self.adpositions.contains(lower.as_str()) {
                PosTag::Adposition
            } else if self.conjunctions.contains(lower.as_str()) {
                PosTag::Conjunction
            } else if self.auxiliaries.contains(lower.as_str()) {
                PosTag::Auxiliary
            } else if self.particles.contains(lower.as_str()) {
                PosTag::Particle
            } else if self.adverbs.contains(lower.as_str()) {
                PosTag::Adverb
            } else if self.verbs.contains(lower.as_str()) {
                PosTag::Verb
            } else if self.adjectives.contains(lower.as_str()) {
                PosTag::Adjective
            } else if next
                .as_deref()
                .is_some_and(|n| self.object_pronouns.contains(n))
                && !matches!(prev, Some(PosTag::Determiner | PosTag::Adjective))
            {
                // "help me", "feed them": an open-class word directly before
                // an object pronoun is acting as a verb.
                PosTag::Verb
            } else if i > 0 && token.chars().next().is_some_and(|c| c.is_uppercase()) {
                PosTag::ProperNoun
            } else {
                PosTag::Noun
            };

            tagged.push(TaggedToken {
                text: token.to_string(),
                tag,
            });
        }

        tagged
    }
}
