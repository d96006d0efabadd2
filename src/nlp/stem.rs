use tantivy::tokenizer::{Language, LowerCaser, SimpleTokenizer, Stemmer, TextAnalyzer};

/// English Snowball stemmer, run through the same analyzer chain the index
/// uses for lexical fields so query stems line up with indexed stems.
#[derive(Clone)]
pub struct WordStemmer {
    analyzer: TextAnalyzer,
}

impl Default for WordStemmer {
    fn default() -> Self {
        Self::new()
    }
}

impl WordStemmer {
    pub fn new() -> Self {
        let analyzer = TextAnalyzer::builder(SimpleTokenizer::default())
            .filter(LowerCaser)
            .filter(Stemmer::new(Language::English))
            .build();
        Self { analyzer }
    }

    /// Stem one word. Snowball turns a final `y` into `i` ("laundry" →
    /// "laundri") while the corpus also holds the `-ies`/`-ied` forms that
    /// stem to the bare root, so a trailing `i` is dropped from stems longer
    /// than three characters.
    ///
    /// A word the tokenizer splits ("self-help", "don't") comes back as its
    /// stemmed pieces separated by spaces.
    pub fn stem(&self, word: &str) -> String {
        let mut analyzer = self.analyzer.clone();
        let mut stream = analyzer.token_stream(word);
        let mut parts: Vec<String> = Vec::new();
        stream.process(&mut |token| parts.push(strip_trailing_i(token.text.clone())));

        parts.join(" ")
    }
}

fn strip_trailing_i(mut stem: String) -> String {
    if stem.chars().count() > 3 && stem.ends_with('i') {
        stem.pop();
    }
    stem
}
