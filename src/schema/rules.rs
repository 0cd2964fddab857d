/// Reference examples of hand-written titles, grouped by style label.
///
/// Parsed from a markdown file of `### 风格N：<label>` headings followed by
/// `| original | generated |` table rows. Kept for introspection; the
/// generator never reads it.
use std::fs;
use std::io;
use std::path::Path;

use super::warning::{LoadWarning, Loaded};

const STYLE_HEADING: &str = "### 风格";
const LABEL_SEPARATOR: char = '：';
const HEADER_CELL_PREFIX: &str = "原标题";

/// An original title and its rewritten counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleExample {
    pub original: String,
    pub generated: String,
}

/// Style label → examples, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleExamples {
    styles: Vec<(String, Vec<RuleExample>)>,
}

impl RuleExamples {
    pub fn load(path: &Path) -> Loaded<RuleExamples> {
        match fs::read_to_string(path) {
            Ok(contents) => Loaded::clean(Self::parse(&contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Loaded::with_warning(
                RuleExamples::default(),
                LoadWarning::RulesMissing(path.to_path_buf()),
            ),
            Err(source) => Loaded::with_warning(
                RuleExamples::default(),
                LoadWarning::RulesUnreadable {
                    path: path.to_path_buf(),
                    source,
                },
            ),
        }
    }

    pub fn parse(input: &str) -> RuleExamples {
        let mut examples = RuleExamples::default();
        let mut open = false;

        for raw in input.lines() {
            let line = raw.trim();
            if line.starts_with(STYLE_HEADING) {
                // Headings without a label close the current section.
                // The label is the segment between the first and second '：'.
                open = match line.split(LABEL_SEPARATOR).nth(1) {
                    Some(label) if !label.trim().is_empty() => {
                        examples.styles.push((label.trim().to_string(), Vec::new()));
                        true
                    }
                    _ => false,
                };
            } else if open && line.starts_with("| ") {
                if let Some(example) = parse_row(line) {
                    if let Some((_, rows)) = examples.styles.last_mut() {
                        rows.push(example);
                    }
                }
            }
        }
        examples
    }

    /// Style labels with their examples, in order.
    pub fn styles(&self) -> impl Iterator<Item = (&str, &[RuleExample])> {
        self.styles
            .iter()
            .map(|(label, rows)| (label.as_str(), rows.as_slice()))
    }

    pub fn examples(&self, label: &str) -> &[RuleExample] {
        self.styles
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.styles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.styles.is_empty()
    }
}

fn parse_row(line: &str) -> Option<RuleExample> {
    let cells: Vec<&str> = line.split('|').map(str::trim).collect();
    if cells.len() < 3 {
        return None;
    }
    let (original, generated) = (cells[1], cells[2]);
    if original.is_empty() || generated.is_empty() || original.starts_with(HEADER_CELL_PREFIX) {
        return None;
    }
    if is_rule(original) || is_rule(generated) {
        return None;
    }
    Some(RuleExample {
        original: original.to_string(),
        generated: generated.to_string(),
    })
}

/// Markdown table separator cell, e.g. `---` or `:---:`.
fn is_rule(cell: &str) -> bool {
    cell.chars().all(|c| c == '-' || c == ':')
}
