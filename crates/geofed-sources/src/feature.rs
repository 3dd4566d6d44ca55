use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Geometry, Source};

/// Labels derived from a feature's properties by the ranker.
///
/// Computed once per feature per fetch, never serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureLabels {
    pub feature_title: String,
    /// Empty when the source has no short display fields.
    pub short_feature_title: String,
    /// Empty when the source has no secondary label fields.
    pub secondary_label_fields: String,
}

/// A feature returned by a source or an adapter.
///
/// Properties and geometry are supplied externally; `labels` and
/// `search_field_order` are decorations added by the coordinator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
    #[serde(skip)]
    pub labels: Option<FeatureLabels>,
    #[serde(skip)]
    pub search_field_order: Option<Vec<String>>,
}

impl Feature {
    pub fn new(properties: Map<String, Value>) -> Self {
        Self {
            properties,
            ..Self::default()
        }
    }

    /// Build a feature from a `json!({...})` object. Non-object values yield no properties.
    pub fn from_json(properties: Value) -> Self {
        match properties {
            Value::Object(map) => Self::new(map),
            _ => Self::default(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// The raw property, treating JSON `null` as absent.
    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties.get(name).filter(|v| !v.is_null())
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.property(name).is_some()
    }

    /// The property rendered as text. Arrays are joined with `", "`.
    pub fn property_text(&self, name: &str) -> Option<String> {
        self.property(name).map(value_text)
    }

    pub fn has_geometry(&self) -> bool {
        self.geometry.is_some()
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter(|v| !v.is_null())
            .map(value_text)
            .filter(|s| !s.is_empty())
            .join(", "),
        other => other.to_string(),
    }
}

/// Where a feature collection came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Origin {
    Wfs,
    UserSelect,
    Plugin(String),
}

impl Origin {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Wfs => "WFS",
            Self::UserSelect => "USERSELECT",
            Self::Plugin(name) => name,
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Origin> for String {
    fn from(origin: Origin) -> Self {
        origin.as_str().to_string()
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        match s.as_str() {
            "WFS" => Self::Wfs,
            "USERSELECT" => Self::UserSelect,
            _ => Self::Plugin(s),
        }
    }
}

/// One source's contribution to a fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollectionResult {
    pub source: Source,
    pub origin: Origin,
    pub features: Vec<Feature>,
}

impl FeatureCollectionResult {
    pub fn new(source: Source, origin: Origin, features: Vec<Feature>) -> Self {
        Self {
            source,
            origin,
            features,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }
}

/// A contributor that could not be fetched from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub source_id: String,
    pub caption: String,
    pub message: String,
}

impl FetchFailure {
    pub fn new(
        source_id: impl Into<String>,
        caption: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            caption: caption.into(),
            message: message.into(),
        }
    }

    pub fn for_source(source: &Source, message: impl Into<String>) -> Self {
        Self::new(&source.id, &source.caption, message)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_property_text_variants() {
        let feature = Feature::from_json(json!({
            "name": "Central Park",
            "number": 12,
            "tags": ["park", null, "green"],
            "missing": null,
        }));

        assert_eq!(feature.property_text("name").as_deref(), Some("Central Park"));
        assert_eq!(feature.property_text("number").as_deref(), Some("12"));
        assert_eq!(feature.property_text("tags").as_deref(), Some("park, green"));
        assert_eq!(feature.property_text("missing"), None);
        assert!(!feature.has_value("missing"));
        assert!(!feature.has_value("absent"));
    }

    #[test]
    fn test_origin_string_round_trip() {
        for origin in [Origin::Wfs, Origin::UserSelect, Origin::Plugin("gazetteer".into())] {
            let s: String = origin.clone().into();
            assert_eq!(Origin::from(s), origin);
        }
        assert_eq!(Origin::Wfs.to_string(), "WFS");
    }

    #[test]
    fn test_decorations_are_not_serialized() {
        let mut feature = Feature::from_json(json!({"name": "x"}));
        feature.labels = Some(FeatureLabels::default());
        feature.search_field_order = Some(vec!["name".into()]);

        let value = serde_json::to_value(&feature).unwrap();
        assert!(value.get("labels").is_none());
        assert!(value.get("search_field_order").is_none());
    }
}
