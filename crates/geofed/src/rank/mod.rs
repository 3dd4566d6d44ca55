//! Relevance ranking and label building for returned features.
//!
//! Everything here is pure and synchronous. The ranker reorders a source's
//! search fields so the fields that matched the typed words come first, and builds
//! the human-readable titles shown in result lists and on highlighted features.

use geofed_sources::{Feature, FeatureCollectionResult, FeatureLabels, Source};
use itertools::Itertools;
use regex::{Regex, RegexBuilder};
use tracing::warn;

/// Label used when none of the display fields yield a value. Never empty.
pub const FALLBACK_LABEL: &str = "no display fields configured";

const LABEL_SEPARATOR: &str = " | ";

/// Split a phrase into words on commas and whitespace.
pub fn split_phrase_words(phrase: &str) -> Vec<String> {
    phrase
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .map(ToString::to_string)
        .collect()
}

/// Compiled "value starts with word" tests, one per phrase word.
#[derive(Debug, Clone, Default)]
pub struct WordMatchers {
    matchers: Vec<Regex>,
}

impl WordMatchers {
    pub fn new<S: AsRef<str>>(words: &[S]) -> Self {
        let matchers = words
            .iter()
            .filter_map(|word| {
                let pattern = format!(r"^{}\W*", regex::escape(word.as_ref()));
                RegexBuilder::new(&pattern)
                    .case_insensitive(true)
                    .build()
                    .inspect_err(|e| warn!(word = word.as_ref(), error = %e, "Skipping unmatchable word"))
                    .ok()
            })
            .collect();
        Self { matchers }
    }

    pub fn from_phrase(phrase: &str) -> Self {
        Self::new(&split_phrase_words(phrase))
    }

    /// Reorder `search_fields` by match strength for `feature`.
    ///
    /// Fields matched by a word come first, in the order the words produced the
    /// matches. The remaining fields follow in their configured order; fields
    /// without a value on the feature are dropped.
    pub fn rank(&self, search_fields: &[String], feature: &Feature) -> Vec<String> {
        let mut remaining: Vec<&String> = search_fields.iter().collect();
        let mut ranked = Vec::with_capacity(search_fields.len());

        for matcher in &self.matchers {
            remaining.retain(|field| {
                let hit = feature
                    .property_text(field)
                    .is_some_and(|text| matcher.is_match(&text));
                if hit {
                    ranked.push((*field).clone());
                }
                !hit
            });
        }

        ranked.extend(
            remaining
                .into_iter()
                .filter(|field| feature.has_value(field))
                .cloned(),
        );
        ranked
    }
}

/// See [`WordMatchers::rank`].
pub fn rank_search_fields<S: AsRef<str>>(
    search_fields: &[String],
    feature: &Feature,
    words_in_phrase: &[S],
) -> Vec<String> {
    WordMatchers::new(words_in_phrase).rank(search_fields, feature)
}

/// Compose a label from `display_fields`.
///
/// A field name wrapped in double quotes is printed verbatim (without the quotes);
/// anything else is read from the feature's properties.
pub fn build_label(display_fields: &[String], feature: &Feature) -> String {
    let label = display_fields
        .iter()
        .filter_map(|field| match literal(field) {
            Some(text) => Some(text.to_string()),
            None => feature.property_text(field),
        })
        .filter(|segment| !segment.is_empty())
        .join(LABEL_SEPARATOR);

    if label.is_empty() {
        FALLBACK_LABEL.to_string()
    } else {
        label
    }
}

fn literal(field: &str) -> Option<&str> {
    field
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
}

/// Compute title, short title and secondary label for `feature`.
pub fn feature_labels(source: &Source, feature: &Feature) -> FeatureLabels {
    let optional_label = |fields: Option<&Vec<String>>| {
        fields.map_or_else(String::new, |fields| build_label(fields, feature))
    };
    FeatureLabels {
        feature_title: build_label(&source.display_fields, feature),
        short_feature_title: optional_label(source.short_display_fields.as_ref()),
        secondary_label_fields: optional_label(source.secondary_label_fields.as_ref()),
    }
}

/// Attach labels to `feature` unless it already carries them.
pub fn decorate_feature(source: &Source, feature: &mut Feature) {
    if feature.labels.is_none() {
        feature.labels = Some(feature_labels(source, feature));
    }
}

/// Decorate every feature of every collection with its source's labels.
pub fn decorate_collections(collections: &mut [FeatureCollectionResult]) {
    for collection in collections {
        let source = &collection.source;
        for feature in &mut collection.features {
            decorate_feature(source, feature);
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_split_phrase_words() {
        assert_eq!(
            split_phrase_words(" Main  Street,9 ,, Springfield"),
            vec!["Main", "Street", "9", "Springfield"]
        );
        assert!(split_phrase_words(" , ").is_empty());
    }

    #[test]
    fn test_single_field_scenario() {
        let source = Source::new("s1", "S1")
            .with_search_fields(["name"])
            .with_display_fields(["name"]);
        let mut feature = Feature::from_json(json!({"name": "Central Park"}));

        let order = rank_search_fields(&source.search_fields, &feature, &["park"]);
        assert_eq!(order, vec!["name"]);

        decorate_feature(&source, &mut feature);
        assert_eq!(feature.labels.unwrap().feature_title, "Central Park");
    }

    #[test]
    fn test_matched_fields_move_to_front_in_word_order() {
        let feature = Feature::from_json(json!({
            "street": "Main Street",
            "number": 9,
            "city": "Springfield",
            "zip": null,
        }));
        let search_fields = fields(&["street", "number", "zip", "city"]);

        let order = rank_search_fields(&search_fields, &feature, &["spring", "9"]);
        assert_eq!(order, vec!["city", "number", "street"]);
    }

    #[test]
    fn test_match_is_case_insensitive_prefix() {
        let feature = Feature::from_json(json!({"a": "Oak Lane", "b": "LANE's end"}));
        let order = rank_search_fields(&fields(&["a", "b"]), &feature, &["lane"]);
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_regex_metacharacters_in_words() {
        let feature = Feature::from_json(json!({"a": "x", "b": "(c) Corp"}));
        let order = rank_search_fields(&fields(&["a", "b"]), &feature, &["(c)"]);
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn test_build_label_literals_arrays_and_empties() {
        let feature = Feature::from_json(json!({
            "name": "Maple Elementary",
            "aliases": ["Maple", "ME"],
            "blank": "",
        }));
        let label = build_label(&fields(&["\"School\"", "name", "blank", "missing", "aliases"]), &feature);
        assert_eq!(label, "School | Maple Elementary | Maple, ME");
    }

    #[test]
    fn test_build_label_fallback_never_empty() {
        let feature = Feature::from_json(json!({"name": ""}));
        assert_eq!(build_label(&fields(&["name", "other"]), &feature), FALLBACK_LABEL);
        assert_eq!(build_label(&[], &feature), FALLBACK_LABEL);
    }

    #[test]
    fn test_build_label_is_idempotent() {
        let feature = Feature::from_json(json!({"a": "one", "b": 2}));
        let display = fields(&["a", "b"]);
        assert_eq!(build_label(&display, &feature), build_label(&display, &feature));
    }

    #[test]
    fn test_optional_labels_empty_when_unconfigured() {
        let source = Source::new("s", "S")
            .with_search_fields(["name"])
            .with_display_fields(["name"])
            .with_secondary_label_fields(["district"]);
        let labels = feature_labels(&source, &Feature::from_json(json!({"name": "x"})));

        assert_eq!(labels.short_feature_title, "");
        assert_eq!(labels.secondary_label_fields, FALLBACK_LABEL);
    }

    #[test]
    fn test_decorate_keeps_cached_labels() {
        let source = Source::new("s", "S").with_display_fields(["name"]);
        let mut feature = Feature::from_json(json!({"name": "first"}));
        decorate_feature(&source, &mut feature);

        feature.properties.insert("name".into(), json!("second"));
        decorate_feature(&source, &mut feature);
        assert_eq!(feature.labels.unwrap().feature_title, "first");
    }
}
