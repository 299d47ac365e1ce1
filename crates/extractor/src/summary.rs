use std::collections::HashMap;

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "is", "are", "was", "were", "be", "been", "of", "to",
    "in", "on", "for", "with", "as", "by", "at", "from", "this", "that", "it", "its", "you",
    "your", "we", "our", "not", "have", "has", "had", "will", "can", "all",
];

const MAX_KEY_POINTS: usize = 3;
const MAX_KEYWORD_LEN: usize = 16;

/// Extractive summarizer: split `article_text` into sentences, score
/// each by token overlap with the title plus global word frequency, and
/// keep the top `MAX_KEY_POINTS` in original order.
pub fn key_points(title: &str, article_text: &str) -> Vec<String> {
    let sentences: Vec<&str> = article_text
        .split(['.', '!', '?'])
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();

    if sentences.is_empty() {
        return Vec::new();
    }

    let title_tokens: Vec<String> = tokenize(title);
    let freq = word_frequency(article_text);

    let mut scored: Vec<(usize, &str, f64)> = sentences
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let tokens = tokenize(s);
            let title_overlap = tokens.iter().filter(|t| title_tokens.contains(t)).count() as f64;
            let freq_score: f64 = tokens.iter().filter_map(|t| freq.get(t)).map(|&c| c as f64).sum();
            (i, *s, title_overlap * 2.0 + freq_score)
        })
        .collect();

    scored.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap_or(std::cmp::Ordering::Equal));
    let mut top: Vec<(usize, &str)> = scored.into_iter().take(MAX_KEY_POINTS).map(|(i, s, _)| (i, s)).collect();
    top.sort_by_key(|(i, _)| *i);

    top.into_iter().map(|(_, s)| s.to_string()).collect()
}

/// Heuristic keyword extraction: capitalized multi-word runs plus the
/// most frequent non-stopword tokens, filtered to length ≤ 16 and
/// deduplicated.
pub fn keywords(text: &str) -> Vec<String> {
    let mut keywords = Vec::new();

    for run in capitalized_runs(text) {
        if run.len() <= MAX_KEYWORD_LEN && !keywords.contains(&run) {
            keywords.push(run);
        }
    }

    let freq = word_frequency(text);
    let mut by_freq: Vec<(&String, &usize)> = freq.iter().collect();
    by_freq.sort_by(|a, b| b.1.cmp(a.1));
    for (word, count) in by_freq {
        if *count < 2 || word.len() > MAX_KEYWORD_LEN {
            continue;
        }
        if !keywords.iter().any(|k| k.eq_ignore_ascii_case(word)) {
            keywords.push(word.clone());
        }
    }

    keywords
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

fn word_frequency(text: &str) -> HashMap<String, usize> {
    let mut freq = HashMap::new();
    for word in tokenize(text) {
        if word.len() < 3 || STOPWORDS.contains(&word.as_str()) {
            continue;
        }
        *freq.entry(word).or_insert(0) += 1;
    }
    freq
}

/// Runs of consecutive capitalized words, e.g. "New York Times".
fn capitalized_runs(text: &str) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for word in text.split_whitespace() {
        let trimmed = word.trim_matches(|c: char| !c.is_alphanumeric());
        let starts_upper = trimmed.chars().next().map(|c| c.is_uppercase()).unwrap_or(false);
        if starts_upper && trimmed.len() > 1 {
            current.push(trimmed);
        } else {
            if current.len() >= 2 {
                runs.push(current.join(" "));
            }
            current.clear();
        }
    }
    if current.len() >= 2 {
        runs.push(current.join(" "));
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_top_sentences_in_original_order() {
        let title = "Rust programming";
        let text = "Rust is a systems language. Cats are fluffy animals. Rust programming gives memory safety. The sky is blue today.";
        let points = key_points(title, text);
        assert!(!points.is_empty());
        assert!(points.len() <= MAX_KEY_POINTS);
    }

    #[test]
    fn keywords_are_capped_at_sixteen_chars() {
        let kws = keywords("Supercalifragilisticexpialidocious word word word");
        assert!(kws.iter().all(|k| k.len() <= MAX_KEYWORD_LEN));
    }
}
