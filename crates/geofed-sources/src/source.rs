use serde::{Deserialize, Serialize};

/// A configured, queryable feature dataset (typically one WFS layer).
///
/// The order of `search_fields` and `display_fields` is significant: it drives
/// relevance ranking and label composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    pub id: String,
    pub caption: String,
    pub search_fields: Vec<String>,
    pub display_fields: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_display_fields: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_label_fields: Option<Vec<String>>,
    #[serde(default = "default_geometry_field")]
    pub geometry_field: String,
}

fn default_geometry_field() -> String {
    "geom".to_string()
}

impl Source {
    pub fn new(id: impl Into<String>, caption: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            caption: caption.into(),
            search_fields: Vec::new(),
            display_fields: Vec::new(),
            short_display_fields: None,
            secondary_label_fields: None,
            geometry_field: default_geometry_field(),
        }
    }

    pub fn with_search_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.search_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_display_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.display_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_short_display_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.short_display_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_secondary_label_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.secondary_label_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_geometry_field(mut self, field: impl Into<String>) -> Self {
        self.geometry_field = field.into();
        self
    }
}
