//! SEO data extraction
//!
//! Pulls plain text out of a block tree and derives a meta description,
//! word count, reading time and a bag-of-words keyword list from it.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::{decode_document, Block};

/// Maximum length of the generated description, in characters
pub const DESCRIPTION_LENGTH: usize = 160;
/// Reading speed used for `reading_time`
pub const WORDS_PER_MINUTE: usize = 200;
/// Number of keywords returned
pub const MAX_KEYWORDS: usize = 10;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag regex"));
/// Anything but ASCII word characters and whitespace. Non-ASCII letters are
/// stripped too, so "café" counts as "caf".
static PUNCTUATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^0-9A-Za-z_\s]").expect("valid punctuation regex"));

const STOPWORDS: &[&str] = &[
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
    "is", "are", "was", "were", "be", "been", "being", "have", "has", "had", "do", "does", "did",
    "will", "would", "could", "should", "may", "might", "can", "this", "that", "these", "those",
];

/// SEO summary of a document
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoData {
    pub description: String,
    pub word_count: usize,
    /// Minutes, rounded up
    pub reading_time: usize,
    pub keywords: Vec<String>,
}

/// Extract SEO data from a stored document.
pub fn extract_seo(content: &str) -> SeoData {
    extract_seo_from_blocks(&decode_document(content))
}

pub(crate) fn extract_seo_from_blocks(blocks: &[Block]) -> SeoData {
    let text = blocks
        .iter()
        .map(block_text)
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim();

    let word_count = text.split_whitespace().count();

    SeoData {
        description: describe(text),
        word_count,
        reading_time: word_count.div_ceil(WORDS_PER_MINUTE),
        keywords: extract_keywords(text),
    }
}

/// Tag-stripped text of a block followed by that of its inner blocks.
fn block_text(block: &Block) -> String {
    let mut text = String::new();
    if !block.inner_html.is_empty() {
        text.push_str(TAG_RE.replace_all(&block.inner_html, " ").trim());
        text.push(' ');
    }
    for inner in &block.inner_blocks {
        text.push_str(&block_text(inner));
    }
    text
}

/// First 160 characters; a full-length cut is shortened to the last space and marked with `...`.
fn describe(text: &str) -> String {
    let description: String = text.chars().take(DESCRIPTION_LENGTH).collect();
    if description.chars().count() < DESCRIPTION_LENGTH {
        return description;
    }

    // Without a space the final character is dropped instead.
    let cut = description
        .rfind(' ')
        .unwrap_or_else(|| description.char_indices().last().map(|(i, _)| i).unwrap_or(0));
    format!("{}...", &description[..cut])
}

/// Most frequent words longer than three characters, stopwords excluded.
/// Ties keep the order in which words first appear.
fn extract_keywords(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let cleaned = PUNCTUATION_RE.replace_all(&lowered, "");

    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for word in cleaned.split_whitespace() {
        if word.chars().count() <= 3 || STOPWORDS.contains(&word) {
            continue;
        }
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    // Stable sort keeps first-appearance order among equal counts.
    order.sort_by(|a, b| counts[b].cmp(&counts[a]));
    order
        .into_iter()
        .take(MAX_KEYWORDS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn paragraph(text: &str) -> String {
        format!("<!-- wp:paragraph --><p>{}</p><!-- /wp:paragraph -->", text)
    }

    #[test]
    fn test_empty_document() {
        let seo = extract_seo("");
        assert_eq!(seo, SeoData::default());
    }

    #[test]
    fn test_short_text() {
        let seo = extract_seo(&paragraph("Hello <strong>brave</strong> new world"));

        assert_eq!(seo.description, "Hello  brave  new world");
        assert_eq!(seo.word_count, 4);
        assert_eq!(seo.reading_time, 1);
        assert_eq!(seo.keywords, vec!["hello", "brave", "world"]);
    }

    #[test]
    fn test_text_from_nested_blocks_depth_first() {
        let doc = concat!(
            "<!-- wp:group --><div>",
            "<!-- wp:paragraph --><p>inner words</p><!-- /wp:paragraph -->",
            "</div><!-- /wp:group -->",
            "<!-- wp:paragraph --><p>after</p><!-- /wp:paragraph -->"
        );
        let seo = extract_seo(doc);
        assert_eq!(seo.word_count, 3);
        assert_eq!(seo.keywords, vec!["inner", "words", "after"]);
    }

    #[test]
    fn test_long_description_cut_at_word_boundary() {
        let text = "word ".repeat(50);
        let seo = extract_seo(&paragraph(&text));

        assert!(seo.description.ends_with("..."));
        assert!(seo.description.chars().count() <= DESCRIPTION_LENGTH + 3);
        assert_eq!(seo.description, format!("{}...", "word ".repeat(32).trim_end()));
    }

    #[test]
    fn test_long_description_without_spaces() {
        let text = "x".repeat(200);
        let seo = extract_seo(&paragraph(&text));
        assert_eq!(seo.description, format!("{}...", "x".repeat(159)));
    }

    #[test]
    fn test_reading_time_rounds_up() {
        let seo = extract_seo(&paragraph(&"lorem ".repeat(201)));
        assert_eq!(seo.word_count, 201);
        assert_eq!(seo.reading_time, 2);
    }

    #[test]
    fn test_keywords_frequency_and_filters() {
        let text = "Rust rust RUST! memory, memory safety. The borrow checker: checker would help this code";
        let seo = extract_seo(&paragraph(text));

        assert_eq!(seo.keywords, vec!["rust", "memory", "checker", "safety", "borrow", "help", "code"]);
    }

    #[test]
    fn test_keywords_use_ascii_word_characters() {
        let seo = extract_seo(&paragraph("café café café naïve jalapeño"));
        assert_eq!(seo.keywords, vec!["nave", "jalapeo"]);
        assert_eq!(seo.word_count, 5);
    }

    #[test]
    fn test_keywords_limited_to_ten() {
        let text = (0..15).map(|i| format!("keyword{:02}", i)).collect::<Vec<_>>().join(" ");
        let seo = extract_seo(&paragraph(&text));
        assert_eq!(seo.keywords.len(), MAX_KEYWORDS);
        assert_eq!(seo.keywords[0], "keyword00");
    }

    #[test]
    fn test_freeform_text_counts() {
        let seo = extract_seo("plain text outside blocks");
        assert_eq!(seo.word_count, 4);
        assert_eq!(seo.keywords, vec!["plain", "text", "outside", "blocks"]);
    }

    #[test]
    fn test_serializes_camel_case() {
        let json = serde_json::to_value(extract_seo(&paragraph("one two"))).unwrap();
        assert_eq!(json["wordCount"], 2);
        assert_eq!(json["readingTime"], 1);
        assert!(json["keywords"].is_array());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_seo_invariants(words in proptest::collection::vec("[a-zA-Z]{1,12}", 0..400)) {
            let seo = extract_seo(&paragraph(&words.join(" ")));

            prop_assert_eq!(seo.word_count, words.len());
            prop_assert_eq!(seo.reading_time, (words.len() + 199) / 200);
            prop_assert!(seo.keywords.len() <= MAX_KEYWORDS);
            prop_assert!(seo.description.chars().count() <= DESCRIPTION_LENGTH + 3);
            for keyword in &seo.keywords {
                prop_assert!(keyword.chars().count() > 3);
                prop_assert!(!STOPWORDS.contains(&keyword.as_str()));
            }
        }
    }
}
