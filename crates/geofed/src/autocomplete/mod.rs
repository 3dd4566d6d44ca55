//! Autocomplete aggregation: many per-source feature lists in, one short,
//! fairly-shared suggestion list out.
//!
//! Each feature becomes one entry: its property values in ranked field order,
//! joined with `", "`. Commas inside values are escaped so an entry can always be
//! split back into its values. The flattened list is sorted in natural order and
//! then capped so that no single dataset floods the dropdown.

use std::cmp::Ordering;

use ahash::AHashMap as HashMap;
use geofed_sources::FeatureCollectionResult;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::rank::WordMatchers;

pub const DEFAULT_MAX_SLOTS: usize = 7;

const ENTRY_SEPARATOR: &str = ", ";
const ESCAPE: char = '\\';

/// One suggestion derived from a single feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutocompleteEntry {
    /// Id of the source the feature came from
    pub dataset: String,
    /// Escaped, comma-joined property values
    pub autocomplete_entry: String,
    pub origin: String,
}

impl AutocompleteEntry {
    /// Human-readable text with escapes removed.
    pub fn display(&self) -> String {
        decode_commas(&self.autocomplete_entry)
    }

    /// The individual property values the entry was built from.
    pub fn parts(&self) -> Vec<String> {
        split_entry(&self.autocomplete_entry)
    }
}

/// Escape commas (and the escape character itself) so a value can be embedded in a
/// comma-joined entry.
pub fn encode_commas(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == ESCAPE || c == ',' {
            out.push(ESCAPE);
        }
        out.push(c);
    }
    out
}

/// Inverse of [`encode_commas`]: `decode_commas(&encode_commas(s)) == s` for every `s`.
pub fn decode_commas(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c == ESCAPE {
            // A dangling escape is kept as-is.
            out.push(chars.next().unwrap_or(ESCAPE));
        } else {
            out.push(c);
        }
    }
    out
}

/// Split an encoded entry on its unescaped separators, decoding each part.
pub fn split_entry(entry: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = entry.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            ESCAPE => current.push(chars.next().unwrap_or(ESCAPE)),
            ',' => {
                parts.push(std::mem::take(&mut current));
                if chars.peek() == Some(&' ') {
                    chars.next();
                }
            }
            _ => current.push(c),
        }
    }
    parts.push(current);
    parts
}

/// Case-insensitive, numeric-aware ordering ("Address 9" < "Address 10").
///
/// Strings that compare equal under those rules fall back to plain byte order so
/// the result is total and deterministic.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x, y) {
                    (Chunk::Digits(x), Chunk::Digits(y)) => cmp_digits(x, y),
                    (Chunk::Text(x), Chunk::Text(y)) => cmp_text(x, y),
                    (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
                    (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn cmp_digits(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

fn cmp_text(x: &str, y: &str) -> Ordering {
    x.chars()
        .flat_map(char::to_lowercase)
        .cmp(y.chars().flat_map(char::to_lowercase))
}

enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        let is_digit = first.is_ascii_digit();
        let end = self
            .rest
            .find(|c: char| c.is_ascii_digit() != is_digit)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(if is_digit {
            Chunk::Digits(chunk)
        } else {
            Chunk::Text(chunk)
        })
    }
}

/// Build the capped suggestion list for `phrase`.
///
/// `collections` are expected to be non-empty already. Each feature's ranked
/// field order is stored on the feature as a side effect.
pub fn build_autocomplete_list(
    collections: &mut [FeatureCollectionResult],
    phrase: &str,
    max_slots: usize,
) -> Vec<AutocompleteEntry> {
    let max_slots = max_slots.max(1);
    if collections.len() > max_slots {
        debug!(
            sources = collections.len(),
            max_slots, "Dropping excess sources from autocomplete"
        );
    }
    let kept = collections.len().min(max_slots);
    let matchers = WordMatchers::from_phrase(phrase);

    let mut sources_with_results = 0;
    let mut entries: Vec<(String, AutocompleteEntry)> = Vec::new();
    for collection in &mut collections[..kept] {
        let before = entries.len();
        let dataset = collection.source.id.clone();
        let origin = collection.origin.to_string();
        for feature in &mut collection.features {
            let order = matchers.rank(&collection.source.search_fields, feature);
            let entry = order
                .iter()
                .filter_map(|field| feature.property_text(field))
                .map(|text| encode_commas(&text))
                .join(ENTRY_SEPARATOR);
            feature.search_field_order = Some(order);

            if entry.is_empty() {
                continue;
            }
            entries.push((
                decode_commas(&entry),
                AutocompleteEntry {
                    dataset: dataset.clone(),
                    autocomplete_entry: entry,
                    origin: origin.clone(),
                },
            ));
        }
        if entries.len() > before {
            sources_with_results += 1;
        }
    }

    entries.sort_by(|(a, _), (b, _)| natural_cmp(a, b));
    let entries: Vec<AutocompleteEntry> = entries.into_iter().map(|(_, e)| e).collect();

    let total = entries.len();
    if total <= max_slots {
        return entries;
    }
    let spaces_per_source = (total / sources_with_results)
        .min(max_slots / sources_with_results)
        .max(1);
    debug!(total, sources_with_results, spaces_per_source, "Capping autocomplete list");
    cap_per_dataset(entries, spaces_per_source)
}

/// Keep at most `per_dataset` entries of each dataset, datasets in first-seen order.
fn cap_per_dataset(entries: Vec<AutocompleteEntry>, per_dataset: usize) -> Vec<AutocompleteEntry> {
    let mut groups: Vec<Vec<AutocompleteEntry>> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        let slot = *index.entry(entry.dataset.clone()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        if groups[slot].len() < per_dataset {
            groups[slot].push(entry);
        }
    }
    groups.into_iter().flatten().collect()
}

#[cfg(test)]
mod tests {
    use geofed_sources::{Feature, Origin, Source};
    use serde_json::json;

    use super::*;

    fn collection(id: &str, names: &[&str]) -> FeatureCollectionResult {
        let source = Source::new(id, id.to_uppercase())
            .with_search_fields(["name"])
            .with_display_fields(["name"]);
        let features = names
            .iter()
            .map(|n| Feature::from_json(json!({ "name": n })))
            .collect();
        FeatureCollectionResult::new(source, Origin::Wfs, features)
    }

    fn numbered(id: &str, count: usize) -> FeatureCollectionResult {
        let names: Vec<String> = (0..count).map(|i| format!("{id} item {i}")).collect();
        let refs: Vec<&str> = names.iter().map(String::as_str).collect();
        collection(id, &refs)
    }

    #[test]
    fn test_comma_round_trip() {
        for s in ["", "plain", "a,b", ",,", "back\\slash", "\\,", "trailing\\", "é, ü"] {
            assert_eq!(decode_commas(&encode_commas(s)), s, "round trip failed for {s:?}");
        }
    }

    #[test]
    fn test_split_entry_respects_escapes() {
        let entry = [encode_commas("ME, North"), encode_commas("Maple")].join(ENTRY_SEPARATOR);
        assert_eq!(split_entry(&entry), vec!["ME, North", "Maple"]);
    }

    #[test]
    fn test_natural_cmp() {
        let mut items = vec!["Address 10", "address 9", "Address 1", "Abbey", "Address 09"];
        items.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(items, vec!["Abbey", "Address 1", "Address 09", "address 9", "Address 10"]);
        assert_eq!(natural_cmp("same", "same"), Ordering::Equal);
    }

    #[test]
    fn test_small_result_sorted_and_uncapped() {
        let mut collections = vec![
            collection("a", &["Main Street 10", "Main Street 9"]),
            collection("b", &["Maple"]),
        ];
        let list = build_autocomplete_list(&mut collections, "ma", DEFAULT_MAX_SLOTS);

        let shown: Vec<String> = list.iter().map(AutocompleteEntry::display).collect();
        assert_eq!(shown, vec!["Main Street 9", "Main Street 10", "Maple"]);
        assert_eq!(list[2].dataset, "b");
        assert_eq!(list[2].origin, "WFS");
    }

    #[test]
    fn test_three_sources_of_five() {
        let mut collections = vec![numbered("a", 5), numbered("b", 5), numbered("c", 5)];
        let list = build_autocomplete_list(&mut collections, "item", DEFAULT_MAX_SLOTS);

        assert_eq!(list.len(), 6);
        for dataset in ["a", "b", "c"] {
            assert_eq!(list.iter().filter(|e| e.dataset == dataset).count(), 2);
        }
    }

    #[test]
    fn test_never_exceeds_max_slots() {
        for sources in 1..=10 {
            for per_source in [1, 2, 3, 8] {
                let mut collections: Vec<_> = (0..sources)
                    .map(|i| numbered(&format!("s{i}"), per_source))
                    .collect();
                let list = build_autocomplete_list(&mut collections, "item", DEFAULT_MAX_SLOTS);
                assert!(list.len() <= DEFAULT_MAX_SLOTS, "{sources}x{per_source} gave {}", list.len());
                assert!(!list.is_empty());
            }
        }
    }

    #[test]
    fn test_excess_sources_dropped_first() {
        let mut collections: Vec<_> = (0..9).map(|i| numbered(&format!("s{i}"), 1)).collect();
        let list = build_autocomplete_list(&mut collections, "item", DEFAULT_MAX_SLOTS);

        assert_eq!(list.len(), 7);
        assert!(list.iter().all(|e| e.dataset != "s7" && e.dataset != "s8"));
    }

    #[test]
    fn test_one_dataset_cannot_flood() {
        let mut collections = vec![numbered("big", 20), numbered("small", 2)];
        let list = build_autocomplete_list(&mut collections, "item", DEFAULT_MAX_SLOTS);

        // spaces = min(22 / 2, 7 / 2) = 3
        assert_eq!(list.iter().filter(|e| e.dataset == "big").count(), 3);
        assert_eq!(list.iter().filter(|e| e.dataset == "small").count(), 2);
    }

    #[test]
    fn test_entry_uses_ranked_field_order_and_escapes() {
        let source = Source::new("schools", "Schools")
            .with_search_fields(["name", "aliases"])
            .with_display_fields(["name"]);
        let feature = Feature::from_json(json!({
            "name": "Maple Elementary",
            "aliases": ["ME, North"],
        }));
        let mut collections = vec![FeatureCollectionResult::new(source, Origin::Wfs, vec![feature])];

        let list = build_autocomplete_list(&mut collections, "me", DEFAULT_MAX_SLOTS);
        assert_eq!(list[0].parts(), vec!["ME, North", "Maple Elementary"]);
        assert_eq!(
            collections[0].features[0].search_field_order.as_deref(),
            Some(&["aliases".to_string(), "name".to_string()][..])
        );
    }

    #[test]
    fn test_features_without_values_are_skipped() {
        let mut collections = vec![collection("a", &["kept"])];
        collections[0]
            .features
            .push(Feature::from_json(json!({"other": "x"})));
        let list = build_autocomplete_list(&mut collections, "kept", DEFAULT_MAX_SLOTS);
        assert_eq!(list.len(), 1);
    }
}
