use once_cell::sync::Lazy;
use regex::Regex;

static SENTENCE_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]\s+").unwrap());

/// Splits raw text into sentences on `.`, `!` or `?` followed by whitespace.
///
/// Abbreviations, decimals and quotations are not special-cased. Fragments
/// are trimmed and empty ones dropped.
pub fn segment(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for mat in SENTENCE_END.find_iter(text) {
        // The punctuation mark is a single ASCII byte and stays with its sentence.
        let end = mat.start() + 1;
        push_trimmed(&mut sentences, &text[start..end]);
        start = mat.end();
    }
    push_trimmed(&mut sentences, &text[start..]);
    sentences
}

/// Words of a sentence, in speaking order.
pub fn words(sentence: &str) -> Vec<&str> {
    sentence.split_whitespace().collect()
}

fn push_trimmed(sentences: &mut Vec<String>, fragment: &str) {
    let fragment = fragment.trim();
    if !fragment.is_empty() {
        sentences.push(fragment.to_string());
    }
}
