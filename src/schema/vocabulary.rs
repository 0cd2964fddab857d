/// Vocabulary taxonomy — category → ordered term list, parsed from a
/// markdown-like word list.
///
/// File shape:
///
/// ```text
/// ## 动作与感觉 Actions & Feelings
/// - 原地起飞
/// - 反复横跳 (usually in comments)
/// ```
use rand::seq::SliceRandom;
use rand::Rng;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use super::warning::{LoadWarning, Loaded};

/// Returned by [`Vocabulary::pick`] when neither the category nor the
/// fallback list has anything to offer.
pub const UNKNOWN_TERM: &str = "未知词汇";

const HEADING_MARKER: &str = "## ";
const ITEM_MARKER: &str = "- ";
const ANNOTATION_MARKER: &str = " (";

static CJK_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^##\s*([\x{4e00}-\x{9fa5}]+)").expect("CJK heading pattern is valid")
});

/// Category → ordered terms. Categories iterate in the order they were
/// (last) opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Vocabulary {
    order: Vec<String>,
    terms: FxHashMap<String, Vec<String>>,
}

impl Vocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a vocabulary file. Never fails: a missing or unreadable file
    /// yields an empty vocabulary and a warning.
    pub fn load(path: &Path) -> Loaded<Vocabulary> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Loaded::with_warning(
                    Vocabulary::new(),
                    LoadWarning::VocabularyMissing(path.to_path_buf()),
                );
            }
            Err(source) => {
                return Loaded::with_warning(
                    Vocabulary::new(),
                    LoadWarning::VocabularyUnreadable {
                        path: path.to_path_buf(),
                        source,
                    },
                );
            }
        };

        match Self::parse_reader(BufReader::new(file)) {
            Ok(vocabulary) => {
                tracing::debug!(
                    path = %path.display(),
                    categories = vocabulary.len(),
                    terms = vocabulary.term_count(),
                    "loaded vocabulary"
                );
                Loaded::clean(vocabulary)
            }
            Err(source) => Loaded::with_warning(
                Vocabulary::new(),
                LoadWarning::VocabularyUnreadable {
                    path: path.to_path_buf(),
                    source,
                },
            ),
        }
    }

    /// Parse vocabulary text held in memory.
    pub fn parse(input: &str) -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        let mut current = None;
        for line in input.lines() {
            vocabulary.accept_line(line, &mut current);
        }
        vocabulary
    }

    /// Parse line by line from a reader. Fails on I/O or UTF-8 errors.
    pub fn parse_reader<R: BufRead>(reader: R) -> io::Result<Vocabulary> {
        let mut vocabulary = Vocabulary::new();
        let mut current = None;
        for line in reader.lines() {
            vocabulary.accept_line(&line?, &mut current);
        }
        Ok(vocabulary)
    }

    fn accept_line(&mut self, raw: &str, current: &mut Option<String>) {
        let line = raw.trim();
        if line.starts_with(HEADING_MARKER) {
            let label = heading_label(line);
            if label.is_empty() {
                *current = None;
            } else {
                self.open_category(&label);
                *current = Some(label);
            }
        } else if let Some(rest) = line.strip_prefix(ITEM_MARKER) {
            if let Some(category) = current.as_deref() {
                let term = rest.split(ANNOTATION_MARKER).next().unwrap_or_default();
                self.push_term(category, term);
            }
        }
    }

    /// Open `name` as a fresh, empty category. An existing category of the
    /// same name loses its terms and moves to the end of the order.
    pub fn open_category(&mut self, name: &str) {
        if self.terms.contains_key(name) {
            self.order.retain(|existing| existing != name);
        }
        self.order.push(name.to_string());
        self.terms.insert(name.to_string(), Vec::new());
    }

    /// Append a term to an open category. Blank terms and unknown
    /// categories are ignored; returns whether the term was added.
    pub fn push_term(&mut self, category: &str, term: &str) -> bool {
        let term = term.trim();
        if term.is_empty() {
            return false;
        }
        match self.terms.get_mut(category) {
            Some(list) => {
                list.push(term.to_string());
                true
            }
            None => false,
        }
    }

    /// Terms of a category, empty if the category is unknown.
    pub fn terms(&self, category: &str) -> &[String] {
        self.terms.get(category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.terms.contains_key(category)
    }

    /// Categories with their terms, in order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.order
            .iter()
            .map(move |name| (name.as_str(), self.terms(name)))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn term_count(&self) -> usize {
        self.terms.values().map(Vec::len).sum()
    }

    /// Random term from `category`, else from `fallback`, else
    /// [`UNKNOWN_TERM`]. Never returns an empty string.
    pub fn pick<'a, R: Rng + ?Sized>(
        &'a self,
        category: &str,
        fallback: &'a [String],
        rng: &mut R,
    ) -> &'a str {
        self.pick_union(&[category], fallback, rng)
    }

    /// Like [`Vocabulary::pick`], drawing uniformly from the concatenation
    /// of several categories.
    pub fn pick_union<'a, S, R>(
        &'a self,
        categories: &[S],
        fallback: &'a [String],
        rng: &mut R,
    ) -> &'a str
    where
        S: AsRef<str>,
        R: Rng + ?Sized,
    {
        let lists: Vec<&[String]> = categories.iter().map(|c| self.terms(c.as_ref())).collect();
        let total: usize = lists.iter().map(|list| list.len()).sum();
        if total > 0 {
            let mut index = rng.gen_range(0..total);
            for list in lists {
                if index < list.len() {
                    return &list[index];
                }
                index -= list.len();
            }
        }

        let usable: Vec<&String> = fallback.iter().filter(|t| !t.trim().is_empty()).collect();
        usable
            .choose(rng)
            .copied()
            .map(String::as_str)
            .unwrap_or(UNKNOWN_TERM)
    }
}

/// Extract the category label from a heading line (already trimmed).
fn heading_label(line: &str) -> String {
    if let Some(caps) = CJK_LABEL.captures(line) {
        return caps[1].to_string();
    }

    // No CJK run: take the first word of the part before '&'.
    let rest = &line[HEADING_MARKER.len()..];
    let before_amp = rest.split('&').next().unwrap_or_default();
    let first_word = before_amp.split(' ').next().unwrap_or_default().trim();
    if first_word.is_empty() {
        before_amp.trim().to_string()
    } else {
        first_word.to_string()
    }
}
