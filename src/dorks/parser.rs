//! The [`DorkSet`] type and the text-format parser behind it.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, instrument};

use super::DorkError;

/// Implicit category for templates that appear before any `[Category]` header.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Matches a `[Category]` section header on its own line.
fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    #[allow(clippy::unwrap_used)] // pattern is a compile-time constant
    HEADER.get_or_init(|| Regex::new(r"^\[(.+?)\]$").unwrap())
}

/// One named category and its query templates, in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Category name as written in the header.
    pub name: String,
    /// Query templates listed under the header, in file order.
    pub templates: Vec<String>,
}

/// An ordered collection of categorized query templates.
///
/// Category order and template order are preserved from the source file.
/// A category that appears more than once accumulates templates into its
/// first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DorkSet {
    categories: Vec<Category>,
}

impl DorkSet {
    /// Parses dork-file text into a set.
    ///
    /// Blank lines and `#`-prefixed lines are ignored. Lines matching
    /// `[Name]` open a category; every other non-blank line is a template
    /// for the currently open category (or [`UNCATEGORIZED`] if none has
    /// been opened yet).
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut set = Self::default();
        let mut current: Option<usize> = None;

        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(caps) = header_regex().captures(line) {
                current = Some(set.category_index(&caps[1]));
                continue;
            }
            let idx = match current {
                Some(idx) => idx,
                None => {
                    let idx = set.category_index(UNCATEGORIZED);
                    current = Some(idx);
                    idx
                }
            };
            set.categories[idx].templates.push(line.to_string());
        }

        set
    }

    /// Loads and parses a dork file from disk.
    ///
    /// # Errors
    ///
    /// Returns [`DorkError::Io`] if the file cannot be read and
    /// [`DorkError::Empty`] if it parses to zero templates. Both are
    /// fatal configuration failures.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self, DorkError> {
        let text = std::fs::read_to_string(path).map_err(|e| DorkError::io(path, e))?;
        let set = Self::parse(&text);
        if set.is_empty() {
            return Err(DorkError::empty(path));
        }
        debug!(
            categories = set.categories.len(),
            templates = set.len(),
            "loaded dork file"
        );
        Ok(set)
    }

    /// Returns the index of the named category, creating it if absent.
    fn category_index(&mut self, name: &str) -> usize {
        if let Some(idx) = self.categories.iter().position(|c| c.name == name) {
            return idx;
        }
        self.categories.push(Category {
            name: name.to_string(),
            templates: Vec::new(),
        });
        self.categories.len() - 1
    }

    /// Returns the total number of templates across all categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.categories.iter().map(|c| c.templates.len()).sum()
    }

    /// Returns true if the set contains no templates.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the categories in file order.
    #[must_use]
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Iterates over `(category, template)` pairs in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.categories.iter().flat_map(|c| {
            c.templates
                .iter()
                .map(move |t| (c.name.as_str(), t.as_str()))
        })
    }
}
