/*!
 * Glossary resolution and enforcement.
 *
 * A glossary pins the translation of specific terms. Before a backend call
 * the terms present in a chunk are resolved into hints that travel with the
 * request; after the call any source-form occurrence that survived is
 * force-replaced with the pinned target.
 */

use anyhow::{Context, Result};
use log::{debug, warn};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::ops::Range;
use std::path::Path;

use crate::file_utils::FileManager;

/// One pinned term
#[derive(Debug, Clone)]
pub struct GlossaryEntry {
    pub source: String,
    pub target: String,
    matcher: Regex,
}

/// Term pair carried by a translation request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct GlossaryTerm {
    pub source: String,
    pub target: String,
}

/// Terms found in a chunk, longest first
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct GlossaryHints {
    pub terms: Vec<GlossaryTerm>,
}

impl GlossaryHints {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }
}

/// Outcome of enforcing pins on a translated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enforcement {
    pub text: String,
    /// Source terms whose pinned target is present in the final text
    pub applied: Vec<String>,
    /// Number of source-form occurrences that had to be replaced
    pub replaced: usize,
}

/// Read-only term table, sorted longest source first
#[derive(Debug, Clone, Default)]
pub struct GlossaryTable {
    entries: Vec<GlossaryEntry>,
}

impl GlossaryTable {
    /// Empty glossary
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from term pairs. Duplicates (ignoring case) keep the first pair.
    pub fn from_pairs<I, S, T>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (source, target) in pairs {
            let source: String = source.into();
            let target: String = target.into();
            let source = source.trim().to_string();
            let target = target.trim().to_string();
            if source.is_empty() || target.is_empty() {
                warn!("Skipping glossary entry with an empty side: {:?} -> {:?}", source, target);
                continue;
            }
            if !seen.insert(source.to_lowercase()) {
                warn!("Duplicate glossary term {:?}, keeping the first definition", source);
                continue;
            }
            match Self::matcher_for(&source) {
                Ok(matcher) => entries.push(GlossaryEntry { source, target, matcher }),
                Err(e) => warn!("Skipping glossary term {:?}: {}", source, e),
            }
        }

        entries.sort_by_key(|entry| std::cmp::Reverse(entry.source.chars().count()));
        Self { entries }
    }

    /// Load a glossary file. YAML is chosen by extension, anything else is read as JSON.
    ///
    /// Accepted shapes are a `terms` table of source to target, a `terms` list of
    /// `{source, target}` objects, or a flat mapping.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = FileManager::read_to_string(path)
            .with_context(|| format!("Failed to read glossary file: {:?}", path))?;
        let extension = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let value: Value = if extension == "yaml" || extension == "yml" {
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse YAML glossary: {:?}", path))?
        } else {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON glossary: {:?}", path))?
        };

        let table = Self::from_value(&value);
        debug!("Loaded {} glossary terms from {:?}", table.len(), path);
        Ok(table)
    }

    /// Build a table from an already parsed document
    pub fn from_value(value: &Value) -> Self {
        let terms = value.get("terms").unwrap_or(value);
        let mut pairs = Vec::new();

        match terms {
            Value::Object(map) => {
                for (source, target) in map {
                    match target.as_str() {
                        Some(target) => pairs.push((source.clone(), target.to_string())),
                        None => warn!("Skipping malformed glossary entry for {:?}: {}", source, target),
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    let source = item.get("source").and_then(Value::as_str);
                    let target = item.get("target").and_then(Value::as_str);
                    match (source, target) {
                        (Some(source), Some(target)) => pairs.push((source.to_string(), target.to_string())),
                        _ => warn!("Skipping malformed glossary entry: {}", item),
                    }
                }
            }
            Value::Null => {}
            other => warn!("Glossary has no term table, ignoring: {}", other),
        }

        Self::from_pairs(pairs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[GlossaryEntry] {
        &self.entries
    }

    /// Terms occurring in `text`. Longer terms claim their occurrences first,
    /// so "Machine Learning" wins over "Learning".
    pub fn resolve(&self, text: &str) -> GlossaryHints {
        let mut claimed: Vec<Range<usize>> = Vec::new();
        let mut terms = Vec::new();

        for entry in &self.entries {
            let mut found = false;
            for m in entry.matcher.find_iter(text) {
                let range = m.range();
                if claimed.iter().any(|c| overlaps(c, &range)) {
                    continue;
                }
                claimed.push(range);
                found = true;
            }
            if found {
                terms.push(GlossaryTerm {
                    source: entry.source.clone(),
                    target: entry.target.clone(),
                });
            }
        }

        GlossaryHints { terms }
    }

    /// Force pinned targets into a translated text.
    ///
    /// Source-form occurrences (any casing) that overlap an occurrence of a
    /// pinned target are left alone, so terms translated to themselves are stable.
    pub fn enforce(&self, translated: &str, hints: &GlossaryHints) -> Enforcement {
        let mut text = translated.to_string();
        let mut replaced = 0;

        for term in &hints.terms {
            let Some(entry) = self.entry(&term.source) else {
                continue;
            };
            let targets = target_ranges(&text, hints);
            let mut result = String::with_capacity(text.len());
            let mut last = 0;
            for m in entry.matcher.find_iter(&text) {
                if targets.iter().any(|t| overlaps(t, &m.range())) {
                    continue;
                }
                result.push_str(&text[last..m.start()]);
                result.push_str(&term.target);
                last = m.end();
                replaced += 1;
            }
            result.push_str(&text[last..]);
            text = result;
        }

        let mut applied = Vec::new();
        for term in &hints.terms {
            if text.contains(&term.target) {
                applied.push(term.source.clone());
            } else {
                debug!(
                    "Glossary term {:?} appears in neither form in the translation",
                    term.source
                );
            }
        }

        Enforcement {
            text,
            applied,
            replaced,
        }
    }

    fn entry(&self, source: &str) -> Option<&GlossaryEntry> {
        self.entries
            .iter()
            .find(|entry| entry.source.eq_ignore_ascii_case(source) || entry.source == source)
    }

    // Word boundaries only apply on sides where the term starts or ends with a word character
    fn matcher_for(source: &str) -> Result<Regex, regex::Error> {
        let is_word = |c: char| c.is_alphanumeric() || c == '_';
        let start = if source.chars().next().is_some_and(is_word) { r"\b" } else { "" };
        let end = if source.chars().last().is_some_and(is_word) { r"\b" } else { "" };
        Regex::new(&format!("(?i){}{}{}", start, regex::escape(source), end))
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

fn target_ranges(text: &str, hints: &GlossaryHints) -> Vec<Range<usize>> {
    hints
        .terms
        .iter()
        .flat_map(|term| {
            text.match_indices(term.target.as_str())
                .map(|(start, matched)| start..start + matched.len())
        })
        .collect()
}
