use spindex_core::{
    build_naive, build_spimi, BuildError, NaiveConfig, SpimiConfig, TokenizedDoc,
};
use tempfile::TempDir;

fn docs(specs: &[(u32, &str)]) -> Vec<TokenizedDoc> {
    specs
        .iter()
        .map(|&(doc_id, text)| TokenizedDoc {
            doc_id,
            terms: text.split_whitespace().map(str::to_string).collect(),
        })
        .collect()
}

fn fixed_corpus() -> Vec<TokenizedDoc> {
    docs(&[(1, "cat dog"), (2, "dog bird"), (3, "cat bird")])
}

fn spimi_cfg(dir: &TempDir, block_budget: u64) -> SpimiConfig {
    SpimiConfig {
        block_budget,
        block_dir: dir.path().to_path_buf(),
        expected_docs: None,
    }
}

#[test]
fn single_block_spimi_reproduces_naive_index() {
    let dir = TempDir::new().unwrap();
    // Budget far above corpus size: one flush, equivalent to a sorted
    // naive build.
    let (spimi, stats) = build_spimi(fixed_corpus(), &spimi_cfg(&dir, 1 << 20)).unwrap();
    let (naive, _) = build_naive(fixed_corpus(), &NaiveConfig::default()).unwrap();
    assert_eq!(stats.block_count, 1);
    assert_eq!(spimi, naive);
}

#[test]
fn one_document_per_block_merges_to_the_same_index() {
    let dir = TempDir::new().unwrap();
    // A one-byte budget spills after every document: three blocks.
    let (spimi, stats) = build_spimi(fixed_corpus(), &spimi_cfg(&dir, 1)).unwrap();
    let (naive, _) = build_naive(fixed_corpus(), &NaiveConfig::default()).unwrap();
    assert_eq!(stats.block_count, 3);
    assert_eq!(spimi, naive);
}

#[test]
fn term_in_every_block_merges_without_duplicates() {
    let dir = TempDir::new().unwrap();
    let corpus = docs(&[(1, "cat fish"), (2, "cat mouse"), (3, "cat bird")]);
    let (index, stats) = build_spimi(corpus, &spimi_cfg(&dir, 1)).unwrap();
    assert_eq!(stats.block_count, 3);

    let postings = index.lookup("cat");
    let ids: Vec<u32> = postings.iter().map(|p| p.doc_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[test]
fn document_frequency_matches_postings_length() {
    let (index, _) = build_naive(fixed_corpus(), &NaiveConfig::default()).unwrap();
    for term in ["cat", "dog", "bird"] {
        assert_eq!(index.document_frequency(term) as usize, index.lookup(term).len());
        assert_eq!(index.document_frequency(term), 2);
    }
    assert_eq!(index.document_frequency("unicorn"), 0);
    assert!(index.lookup("unicorn").is_empty());
}

#[test]
fn empty_corpus_builds_an_empty_index() {
    let dir = TempDir::new().unwrap();
    let (naive, _) = build_naive(Vec::new(), &NaiveConfig::default()).unwrap();
    let (spimi, stats) = build_spimi(Vec::new(), &spimi_cfg(&dir, 1 << 20)).unwrap();
    assert_eq!(naive.corpus_size(), 0);
    assert_eq!(naive.num_terms(), 0);
    assert_eq!(stats.block_count, 0);
    assert_eq!(naive, spimi);
}

#[test]
fn repeated_terms_sum_into_one_posting() {
    let dir = TempDir::new().unwrap();
    let corpus = docs(&[(1, "cat cat dog cat")]);
    let (naive, _) = build_naive(corpus.clone(), &NaiveConfig::default()).unwrap();
    let (spimi, _) = build_spimi(corpus, &spimi_cfg(&dir, 1 << 20)).unwrap();

    assert_eq!(naive.lookup("cat").len(), 1);
    assert_eq!(naive.lookup("cat")[0].tf, 3);
    assert_eq!(naive, spimi);
}

#[test]
fn vocabulary_iterates_in_sorted_order() {
    let (index, _) = build_naive(fixed_corpus(), &NaiveConfig::default()).unwrap();
    let terms: Vec<&str> = index.terms().collect();
    assert_eq!(terms, vec!["bird", "cat", "dog"]);
}

#[test]
fn naive_build_over_budget_is_out_of_memory() {
    let cfg = NaiveConfig { memory_budget: Some(8), expected_docs: None };
    let err = build_naive(fixed_corpus(), &cfg).unwrap_err();
    assert!(matches!(err, BuildError::OutOfMemory { budget: 8, .. }));
}

#[test]
fn short_stream_is_corpus_exhausted_early() {
    let dir = TempDir::new().unwrap();
    let naive_cfg = NaiveConfig { memory_budget: None, expected_docs: Some(5) };
    let err = build_naive(fixed_corpus(), &naive_cfg).unwrap_err();
    assert!(matches!(err, BuildError::CorpusExhaustedEarly { expected: 5, actual: 3 }));

    let cfg = SpimiConfig { expected_docs: Some(5), ..spimi_cfg(&dir, 1 << 20) };
    let err = build_spimi(fixed_corpus(), &cfg).unwrap_err();
    assert!(matches!(err, BuildError::CorpusExhaustedEarly { expected: 5, actual: 3 }));
}

#[test]
fn out_of_order_stream_is_rejected() {
    let dir = TempDir::new().unwrap();
    let corpus = docs(&[(2, "cat"), (1, "dog")]);
    let err = build_naive(corpus.clone(), &NaiveConfig::default()).unwrap_err();
    assert!(matches!(err, BuildError::CorpusOutOfOrder { doc_id: 1 }));
    let err = build_spimi(corpus, &spimi_cfg(&dir, 1 << 20)).unwrap_err();
    assert!(matches!(err, BuildError::CorpusOutOfOrder { doc_id: 1 }));
}

#[test]
fn block_files_are_discarded_after_the_merge() {
    let dir = TempDir::new().unwrap();
    let (_, stats) = build_spimi(fixed_corpus(), &spimi_cfg(&dir, 1)).unwrap();
    assert_eq!(stats.block_count, 3);
    let leftover = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(leftover, 0);
}

#[test]
fn spimi_peak_memory_stays_near_the_block_budget() {
    let dir = TempDir::new().unwrap();
    let corpus: Vec<TokenizedDoc> = (0..200)
        .map(|doc_id| TokenizedDoc {
            doc_id,
            terms: (0..20).map(|i| format!("term{:03}", (doc_id + i) % 50)).collect(),
        })
        .collect();

    let budget = 2 * 1024;
    let (spimi, stats) = build_spimi(corpus.clone(), &spimi_cfg(&dir, budget)).unwrap();
    let (naive, naive_stats) = build_naive(corpus, &NaiveConfig::default()).unwrap();

    assert_eq!(spimi, naive);
    assert!(stats.block_count > 1);
    // One document's worth of overshoot is allowed; whole blocks are not.
    assert!(stats.peak_memory_bytes < 2 * budget);
    assert!(naive_stats.peak_memory_bytes > stats.peak_memory_bytes);
}
