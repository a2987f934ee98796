use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    // Words may contain digits after the first letter and be joined by
    // single hyphens or apostrophes ("state-of-the-art", "isn't").
    static ref RE: Regex =
        Regex::new(r"(?u)\p{L}[\p{L}\p{N}]*(?:['-][\p{L}\p{N}]+)*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Normalize text into the term sequence the index is built from: NFKC,
/// lowercase, word extraction, English stemming. The same pipeline is
/// applied to query input so lookups meet the vocabulary on equal terms.
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .map(|mat| STEMMER.stem(mat.as_str()).to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stems_and_lowercases() {
        let terms = tokenize("Running, runner's RUN!");
        assert!(terms.iter().any(|t| t == "run"));
        assert!(terms.iter().all(|t| t.chars().all(|c| !c.is_uppercase())));
    }

    #[test]
    fn keeps_hyphenated_words_whole() {
        let terms = tokenize("a state-of-the-art indexer");
        assert!(terms.iter().any(|t| t == "state-of-the-art"));
    }
}
