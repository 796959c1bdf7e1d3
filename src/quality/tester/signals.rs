//! Content and format heuristics over generated output.
//!
//! One predicate per signal so each can be tested, and swapped, on its own.

use std::sync::OnceLock;

use regex::Regex;

use crate::utils::word_count;

/// Verbs that mark a concrete, actionable suggestion.
pub const ACTION_VERBS: [&str; 8] = [
    "improve",
    "optimize",
    "add",
    "remove",
    "change",
    "implement",
    "test",
    "consider",
];

/// Words that make output read as unprofessional.
pub const UNPROFESSIONAL_WORDS: [&str; 8] = [
    "stupid", "dumb", "crap", "sucks", "lol", "wtf", "damn", "whatever",
];

fn regex(cell: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).expect("signal patterns are valid regexes"))
}

fn example_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r"(?i)\b(for example|for instance|e\.g\.|such as|example|specifically|specific)",
    )
}

fn recommendation_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"(?i)\b(recommend|improv|suggest)")
}

fn priority_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(&CELL, r"\b(HIGH|MEDIUM|LOW)\b")
}

fn scoring_regex() -> &'static Regex {
    static CELL: OnceLock<Regex> = OnceLock::new();
    regex(
        &CELL,
        r"(?i)(\b\d+(\.\d+)?\s*/\s*\d+\b|\b\d+(\.\d+)?\s*%|\b(score|rating|grade)\s*[:=]\s*\d+)",
    )
}

fn verb_regexes() -> &'static [(&'static str, Regex)] {
    static CELL: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    CELL.get_or_init(|| {
        let inflections = [
            ("improve", r"improv(e|es|ed|ing|ement|ements)"),
            ("optimize", r"optimi[sz](e|es|ed|ing|ation|ations)"),
            ("add", r"add(s|ed|ing)?"),
            ("remove", r"remov(e|es|ed|ing|al)"),
            ("change", r"chang(e|es|ed|ing)"),
            ("implement", r"implement(s|ed|ing|ation)?"),
            ("test", r"test(s|ed|ing)?"),
            ("consider", r"consider(s|ed|ing)?"),
        ];
        inflections
            .iter()
            .map(|(verb, forms)| {
                let pattern = format!(r"(?i)\b{}\b", forms);
                (
                    *verb,
                    Regex::new(&pattern).expect("verb patterns are valid regexes"),
                )
            })
            .collect()
    })
}

/// Heading lines (`#` prefixed), markers stripped.
pub fn section_headers(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if !trimmed.starts_with('#') {
                return None;
            }
            let title = trimmed.trim_start_matches('#').trim();
            (!title.is_empty()).then(|| title.to_string())
        })
        .collect()
}

/// Declared sections that appear among the generated headers.
pub fn matched_sections(declared: &[String], headers: &[String]) -> usize {
    let headers: Vec<String> = headers.iter().map(|h| h.to_uppercase()).collect();
    declared
        .iter()
        .filter(|section| {
            let wanted = section.to_uppercase();
            headers.iter().any(|header| header.contains(&wanted))
        })
        .count()
}

pub fn has_examples(text: &str) -> bool {
    example_regex().is_match(text)
}

pub fn has_recommendations(text: &str) -> bool {
    recommendation_regex().is_match(text)
}

pub fn has_metrics(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit()) || text.contains('%')
}

pub fn has_priority_markers(text: &str) -> bool {
    priority_regex().is_match(text)
}

/// No unprofessional word, and long enough to be a real answer.
pub fn is_professional(text: &str, min_chars: usize) -> bool {
    let lowered = text.to_lowercase();
    let clean = lowered
        .split(|c: char| !c.is_alphanumeric())
        .all(|word| !UNPROFESSIONAL_WORDS.contains(&word));
    clean && text.chars().count() >= min_chars
}

pub fn meets_word_count(text: &str, min_words: usize) -> bool {
    word_count(text) >= min_words
}

/// A heading marker and at least one line break.
pub fn has_markdown_structure(text: &str) -> bool {
    text.contains('\n') && text.lines().any(|line| line.trim_start().starts_with('#'))
}

/// At least one declared section name appears verbatim.
pub fn includes_declared_section(text: &str, declared: &[String]) -> bool {
    declared.iter().any(|section| text.contains(section.as_str()))
}

/// Headings used at least twice.
pub fn has_consistent_formatting(text: &str) -> bool {
    text.lines()
        .filter(|line| line.trim_start().starts_with('#'))
        .count()
        >= 2
}

/// Something that reads as a score: `7/10`, `85%`, `score: 4`.
pub fn has_scoring_pattern(text: &str) -> bool {
    scoring_regex().is_match(text)
}

/// Distinct action verbs present, in `ACTION_VERBS` order.
pub fn action_verbs(text: &str) -> Vec<&'static str> {
    verb_regexes()
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(verb, _)| *verb)
        .collect()
}

/// How concrete the output is, 0-100.
pub fn specificity_score(text: &str) -> u8 {
    let lowered = text.to_lowercase();
    let mut score: u32 = 50;
    if lowered.contains("specific") {
        score += 10;
    }
    if lowered.contains("example") {
        score += 10;
    }
    if text.chars().any(|c| c.is_ascii_digit()) {
        score += 15;
    }
    if text.contains('%') {
        score += 10;
    }
    if text.chars().count() > 500 {
        score += 15;
    }
    score.min(100) as u8
}

/// How actionable the output is, 0-100.
pub fn actionability_score(text: &str) -> u8 {
    let mut score: u32 = 40;
    score += 8 * action_verbs(text).len() as u32;
    if has_priority_markers(text) || text.to_lowercase().contains("priority") {
        score += 15;
    }
    if text.to_lowercase().contains("recommend") {
        score += 10;
    }
    score.min(100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_strip_markers() {
        let text = "# SUMMARY\nbody\n  ## Key Ideas  \n#\nplain";
        assert_eq!(section_headers(text), vec!["SUMMARY", "Key Ideas"]);
    }

    #[test]
    fn sections_match_by_substring() {
        let declared = vec!["SUMMARY".to_string(), "IDEAS".to_string(), "QUOTES".to_string()];
        let headers = vec!["One Sentence Summary".to_string(), "TOP IDEAS".to_string()];
        assert_eq!(matched_sections(&declared, &headers), 2);
    }

    #[test]
    fn example_language() {
        assert!(has_examples("For example, the loop allocates."));
        assert!(has_examples("use tools such as grep"));
        assert!(!has_examples("nothing concrete here"));
    }

    #[test]
    fn recommendation_language() {
        assert!(has_recommendations("We recommend caching"));
        assert!(has_recommendations("This would improve latency"));
        assert!(!has_recommendations("It is fine."));
    }

    #[test]
    fn metrics_need_digits_or_percent() {
        assert!(has_metrics("3 issues"));
        assert!(has_metrics("about half%"));
        assert!(!has_metrics("no numbers"));
    }

    #[test]
    fn priority_markers_are_uppercase_words() {
        assert!(has_priority_markers("- HIGH: fix the leak"));
        assert!(!has_priority_markers("a high bar"));
        assert!(!has_priority_markers("HIGHLIGHT"));
    }

    #[test]
    fn professional_requires_length_and_clean_words() {
        let long = "a".repeat(120);
        assert!(is_professional(&long, 100));
        assert!(!is_professional("short", 100));
        let rude = format!("{} this sucks", long);
        assert!(!is_professional(&rude, 100));
        // substrings of longer words are fine
        let fine = format!("{} the lollipop", long);
        assert!(is_professional(&fine, 100));
    }

    #[test]
    fn format_predicates() {
        let text = "# SUMMARY\nText\n## IDEAS\n- one";
        assert!(has_markdown_structure(text));
        assert!(has_consistent_formatting(text));
        assert!(!has_consistent_formatting("# only one\ntext"));
        assert!(!has_markdown_structure("# heading without newline"));
        assert!(includes_declared_section(text, &["IDEAS".to_string()]));
        assert!(!includes_declared_section(text, &["QUOTES".to_string()]));
    }

    #[test]
    fn scoring_patterns() {
        assert!(has_scoring_pattern("Overall: 7/10"));
        assert!(has_scoring_pattern("coverage 85 %"));
        assert!(has_scoring_pattern("Score: 4"));
        assert!(!has_scoring_pattern("no score given"));
    }

    #[test]
    fn action_verbs_use_word_boundaries() {
        assert_eq!(action_verbs("Add tests and consider removing dead code"), vec![
            "add", "remove", "test", "consider"
        ]);
        assert!(action_verbs("the latest address").is_empty());
        assert_eq!(action_verbs("Optimise the query; optimizing twice"), vec!["optimize"]);
    }

    #[test]
    fn specificity_scoring() {
        assert_eq!(specificity_score("plain"), 50);
        assert_eq!(specificity_score("a specific example with 3 items at 50%"), 95);
        let long = format!("specific example 1% {}", "x".repeat(600));
        assert_eq!(specificity_score(&long), 100);
    }

    #[test]
    fn actionability_scoring() {
        assert_eq!(actionability_score("nothing to do"), 40);
        // add + test = 16, HIGH = 15, recommend = 10
        assert_eq!(actionability_score("HIGH: add a test. We recommend it."), 81);
        let all = "improve optimize add remove change implement test consider HIGH recommend";
        assert_eq!(actionability_score(all), 100);
    }
}
