use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};

lazy_static! {
    // space, CR, LF, tab and . , ; : ' " ( ) ? !
    static ref DELIMITERS: Regex = Regex::new(r#"[ \r\n\t.,;:'"()?!]+"#).expect("valid regex");
}

/// Splits raw text into normalised tokens: delimiter split, trim, lowercase
/// and, when enabled, Snowball English stemming. Empty tokens are dropped.
pub struct Analyzer {
    stemmer: Option<Stemmer>,
}

impl Analyzer {
    pub fn new(stemming: bool) -> Self {
        let stemmer = stemming.then(|| Stemmer::create(Algorithm::English));
        Self { stemmer }
    }

    pub fn stemming(&self) -> bool {
        self.stemmer.is_some()
    }

    pub fn tokens<'a>(&'a self, text: &'a str) -> impl Iterator<Item = String> + 'a {
        DELIMITERS.split(text).filter_map(move |piece| self.normalize(piece))
    }

    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.tokens(text).collect()
    }

    /// Number of tokens `tokenize` would return.
    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokens(text).count()
    }

    fn normalize(&self, piece: &str) -> Option<String> {
        let token = piece.trim().to_lowercase();
        if token.is_empty() {
            return None;
        }
        let token = match &self.stemmer {
            Some(stemmer) => stemmer.stem(&token).into_owned(),
            None => token,
        };
        (!token.is_empty()).then_some(token)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(false)
    }
}
