use spindex_core::tokenizer::tokenize;

#[test]
fn it_normalizes_and_stems() {
    let terms = tokenize("Indexing indexes INDEXED!");
    assert_eq!(terms.len(), 3);
    assert!(terms.iter().all(|t| t == "index"));
}

#[test]
fn it_folds_unicode_compatibility_forms() {
    // Fullwidth letters fold to ASCII under NFKC before lowercasing.
    let terms = tokenize("ＣＡＴＳ");
    assert_eq!(terms, vec!["cat"]);
}

#[test]
fn it_strips_possessive_suffixes() {
    let terms = tokenize("the market's rally");
    assert!(terms.contains(&"market".to_string()));
}

#[test]
fn it_ignores_bare_numbers_and_punctuation() {
    let terms = tokenize("1987 -- ; 42");
    assert!(terms.is_empty());
}
