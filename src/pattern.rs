//! Markdown parsing for pattern files.
//!
//! Patterns are plain markdown: top-level `#` headings split the document into
//! blocks (`IDENTITY and PURPOSE`, `STEPS`, `OUTPUT SECTIONS`, `OUTPUT
//! INSTRUCTIONS`, `INPUT`, ...). Everything below a top-level heading, including
//! `##` sub-headings, belongs to that block.

/// A top-level block of a pattern document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
}

impl Section {
    /// Case-insensitive check for a marker in the heading.
    pub fn title_contains(&self, marker: &str) -> bool {
        self.title
            .to_uppercase()
            .contains(&marker.trim().to_uppercase())
    }

    /// List items (`-`, `*`, `+` or `1.` prefixed lines) in the body.
    pub fn list_items(&self) -> Vec<String> {
        list_items(&self.body)
    }

    /// Section names declared in this block.
    ///
    /// Sub-headings win; otherwise each list item names a section by the text
    /// before its first colon.
    pub fn declared_sections(&self) -> Vec<String> {
        let headings = self.sub_headings();
        if !headings.is_empty() {
            return headings;
        }

        self.list_items()
            .iter()
            .filter_map(|item| {
                let name = item.split(':').next().unwrap_or_default();
                let name = name.replace("**", "").replace('`', "");
                let name = name.trim();
                (!name.is_empty()).then(|| name.to_string())
            })
            .collect()
    }

    /// Sub-headings (`##` and deeper) in the body.
    pub fn sub_headings(&self) -> Vec<String> {
        self.body
            .lines()
            .filter_map(|line| {
                let trimmed = line.trim_start();
                if trimmed.starts_with("##") {
                    let title = trimmed.trim_start_matches('#').trim();
                    (!title.is_empty()).then(|| title.to_string())
                } else {
                    None
                }
            })
            .collect()
    }
}

/// A parsed pattern document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternDocument {
    /// Text before the first top-level heading.
    pub preamble: String,
    pub sections: Vec<Section>,
}

impl PatternDocument {
    pub fn parse(markdown: &str) -> Self {
        let mut document = PatternDocument::default();
        let mut current: Option<Section> = None;

        for line in markdown.lines() {
            if let Some(title) = top_level_heading(line) {
                if let Some(section) = current.take() {
                    document.sections.push(finish(section));
                }
                current = Some(Section {
                    title: title.to_string(),
                    body: String::new(),
                });
                continue;
            }

            let target = match current.as_mut() {
                Some(section) => &mut section.body,
                None => &mut document.preamble,
            };
            target.push_str(line);
            target.push('\n');
        }

        if let Some(section) = current.take() {
            document.sections.push(finish(section));
        }
        document.preamble = document.preamble.trim().to_string();
        document
    }

    pub fn has_headings(&self) -> bool {
        !self.sections.is_empty()
    }

    /// First block whose heading contains `marker`.
    pub fn section_with(&self, marker: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title_contains(marker))
    }

    /// Position of the first block whose heading contains `marker`.
    pub fn position_of(&self, marker: &str) -> Option<usize> {
        self.sections.iter().position(|s| s.title_contains(marker))
    }

    /// The block declaring output sections (an `OUTPUT` heading that is not
    /// the output-instructions block).
    pub fn output_block(&self) -> Option<&Section> {
        self.output_block_with("OUTPUT", "INSTRUCTIONS")
    }

    pub fn output_block_with(&self, output: &str, instructions: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.title_contains(output) && !s.title_contains(instructions))
    }

    pub fn output_instructions_with(&self, output: &str, instructions: &str) -> Option<&Section> {
        self.sections
            .iter()
            .find(|s| s.title_contains(output) && s.title_contains(instructions))
            .or_else(|| self.section_with(instructions))
    }

    /// Section names the pattern asks the model to produce.
    pub fn declared_output_sections(&self) -> Vec<String> {
        self.output_block()
            .map(Section::declared_sections)
            .unwrap_or_default()
    }

    /// Whether the pattern leaves a slot for the user's input.
    pub fn has_input_placeholder(&self) -> bool {
        self.section_with("INPUT").is_some()
            || self.preamble.contains("{{input}}")
            || self
                .sections
                .iter()
                .any(|s| s.body.contains("{{input}}") || s.body.contains("INPUT:"))
    }

    pub fn has_list_formatting(&self) -> bool {
        self.sections.iter().any(|s| !s.list_items().is_empty())
    }
}

fn finish(mut section: Section) -> Section {
    section.body = section.body.trim().to_string();
    section
}

/// Returns the title if `line` is a `# Title` heading (exactly one `#`).
fn top_level_heading(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('#')?;
    if rest.starts_with('#') {
        return None;
    }
    let title = rest.trim();
    (!title.is_empty()).then_some(title)
}

/// Extract list items from a block of markdown.
pub fn list_items(text: &str) -> Vec<String> {
    text.lines().filter_map(list_item).collect()
}

fn list_item(line: &str) -> Option<String> {
    let trimmed = line.trim_start();
    for bullet in ["- ", "* ", "+ "] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            let rest = rest.trim();
            return (!rest.is_empty()).then(|| rest.to_string());
        }
    }

    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits == 0 {
        return None;
    }
    let rest = &trimmed[digits..];
    let rest = rest
        .strip_prefix(". ")
        .or_else(|| rest.strip_prefix(") "))?
        .trim();
    (!rest.is_empty()).then(|| rest.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATTERN: &str = "\
# IDENTITY and PURPOSE

You are an expert reviewer of technical essays.

# STEPS

- Read the whole input carefully
- Identify the central claims
1. Score each claim on evidence

# OUTPUT SECTIONS

- SUMMARY: one paragraph
- **KEY CLAIMS**: bullet list
- RATING

# OUTPUT INSTRUCTIONS

- Only output markdown

# INPUT

INPUT:
";

    #[test]
    fn splits_top_level_sections() {
        let doc = PatternDocument::parse(PATTERN);
        let titles: Vec<_> = doc.sections.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(
            titles,
            vec![
                "IDENTITY and PURPOSE",
                "STEPS",
                "OUTPUT SECTIONS",
                "OUTPUT INSTRUCTIONS",
                "INPUT"
            ]
        );
    }

    #[test]
    fn sub_headings_stay_in_body() {
        let doc = PatternDocument::parse("# OUTPUT\n\n## SUMMARY\n\n## IDEAS\n");
        assert_eq!(doc.sections.len(), 1);
        assert_eq!(doc.declared_output_sections(), vec!["SUMMARY", "IDEAS"]);
    }

    #[test]
    fn reads_steps_in_both_list_styles() {
        let steps = PatternDocument::parse(PATTERN)
            .section_with("STEPS")
            .map(Section::list_items)
            .unwrap_or_default();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[2], "Score each claim on evidence");
    }

    #[test]
    fn declared_sections_strip_markup() {
        let doc = PatternDocument::parse(PATTERN);
        assert_eq!(
            doc.declared_output_sections(),
            vec!["SUMMARY", "KEY CLAIMS", "RATING"]
        );
    }

    #[test]
    fn output_block_excludes_instructions() {
        let doc = PatternDocument::parse(PATTERN);
        assert_eq!(doc.output_block().unwrap().title, "OUTPUT SECTIONS");
        assert_eq!(
            doc.output_instructions_with("OUTPUT", "INSTRUCTIONS")
                .unwrap()
                .title,
            "OUTPUT INSTRUCTIONS"
        );
    }

    #[test]
    fn detects_input_placeholder() {
        let doc = PatternDocument::parse(PATTERN);
        assert!(doc.has_input_placeholder());
        assert!(!PatternDocument::parse("# STEPS\n- a\n").has_input_placeholder());
    }

    #[test]
    fn preamble_without_headings() {
        let doc = PatternDocument::parse("just some text\nwithout headings\n");
        assert!(!doc.has_headings());
        assert_eq!(doc.preamble, "just some text\nwithout headings");
    }

    #[test]
    fn numbered_item_requires_separator() {
        assert_eq!(list_items("2024 was a year\n3. real item"), vec!["real item"]);
    }
}
