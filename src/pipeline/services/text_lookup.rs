use crate::error::AppError;
use crate::pipeline::domain::{FrameInput, Observation, RecognizedText, TextMatch, normalize_label};
use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, warn};
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Database collaborator mapping a recognized text span to known entries.
#[async_trait]
pub trait IngredientLookup: Send + Sync {
    /// Entry name to optional annotation, in the order the entries were found.
    async fn find_matches(&self, text: &str) -> Result<IndexMap<String, Option<String>>, AppError>;
}

#[derive(Debug, Clone, Deserialize)]
pub struct IngredientEntry {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
}

/// Whole-word matcher over a fixed entry list, ignoring case and accents.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIngredientLookup {
    entries: Vec<(Vec<String>, IngredientEntry)>,
}

impl InMemoryIngredientLookup {
    pub fn new(entries: Vec<IngredientEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| (words(&normalize_label(&entry.name)), entry))
                .filter(|(needle, _)| !needle.is_empty())
                .collect(),
        }
    }

    /// Loads a JSON array of `{ "name": ..., "annotation": ... }`.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        let entries: Vec<IngredientEntry> = serde_json::from_str(&raw)?;
        Ok(Self::new(entries))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn words(text: &str) -> Vec<String> {
    fold_accents(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// Strips combining marks after canonical decomposition. Stroked letters have
/// no decomposition and are mapped by hand.
fn fold_accents(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'đ' | 'ð' => 'd',
            'Đ' | 'Ð' => 'D',
            'ł' => 'l',
            'Ł' => 'L',
            'ø' => 'o',
            'Ø' => 'O',
            other => other,
        })
        .collect()
}

/// Word index where `needle` starts inside `haystack`.
fn phrase_position(haystack: &[String], needle: &[String]) -> Option<usize> {
    if needle.is_empty() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[async_trait]
impl IngredientLookup for InMemoryIngredientLookup {
    async fn find_matches(&self, text: &str) -> Result<IndexMap<String, Option<String>>, AppError> {
        let haystack = words(text);
        let mut found: Vec<(usize, &IngredientEntry)> = self
            .entries
            .iter()
            .filter_map(|(needle, entry)| {
                phrase_position(&haystack, needle).map(|position| (position, entry))
            })
            .collect();
        // Report in reading order of the label text
        found.sort_by_key(|(position, _)| *position);

        Ok(found
            .into_iter()
            .map(|(_, entry)| (entry.name.clone(), entry.annotation.clone()))
            .collect())
    }
}

/// Turns an observation into engine input, running text spans through the lookup.
///
/// A failed lookup for one span is logged and treated as no matches for that span.
/// Without a lookup the spans pass through as lines to be read aloud.
pub async fn resolve_observation(
    observation: Observation,
    lookup: Option<&dyn IngredientLookup>,
) -> FrameInput {
    match observation {
        Observation::Detections(detections) => FrameInput::Detections(detections),
        Observation::Text(spans) => match lookup {
            Some(lookup) => FrameInput::Matches(match_spans(&spans, lookup).await),
            None => {
                debug!("No lookup configured, passing {} text spans through", spans.len());
                FrameInput::Lines(spans)
            }
        },
    }
}

async fn match_spans(spans: &[RecognizedText], lookup: &dyn IngredientLookup) -> Vec<TextMatch> {
    let mut matches = Vec::new();
    for span in spans {
        match lookup.find_matches(&span.text).await {
            Ok(found) => matches.extend(found.into_iter().map(|(name, annotation)| TextMatch {
                name,
                annotation,
                region: span.region,
            })),
            Err(e) => warn!("Lookup failed for text span: {}", e),
        }
    }
    matches
}
