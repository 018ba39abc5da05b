use textret_core::tokenizer::Analyzer;

#[test]
fn it_lowercases_and_splits_on_delimiters() {
    let words = Analyzer::new(false).tokenize("Re: The \"Quick\" (brown) fox; isn't it?!");
    assert_eq!(words, vec!["re", "the", "quick", "brown", "fox", "isn", "t", "it"]);
}

#[test]
fn it_keeps_other_punctuation_inside_tokens() {
    let words = Analyzer::new(false).tokenize("e-mail user@host.com 3/4");
    assert_eq!(words, vec!["e-mail", "user@host", "com", "3/4"]);
}

#[test]
fn it_stems_only_when_asked() {
    let plain = Analyzer::new(false).tokenize("Running Runners");
    assert_eq!(plain, vec!["running", "runners"]);
    let stemmed = Analyzer::new(true).tokenize("Running Runners");
    assert!(stemmed.contains(&"run".to_string()));
    assert!(Analyzer::new(true).stemming());
}

#[test]
fn it_drops_empty_tokens() {
    let a = Analyzer::new(false);
    assert!(a.tokenize("  ...  ,,, \r\n ").is_empty());
    assert_eq!(a.count_tokens(""), 0);
}
