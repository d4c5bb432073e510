//! Shallow structural validation of records before they are persisted.
//!
//! A [`Schema`] names required top-level fields and the primitive kind each
//! must have. Extra fields are allowed and nested values are not inspected.

use once_cell::sync::Lazy;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    String,
    Number,
    Boolean,
    /// A JSON object or array.
    Object,
}

impl Kind {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Kind::String => value.is_string(),
            Kind::Number => value.is_number(),
            Kind::Boolean => value.is_boolean(),
            Kind::Object => value.is_object() || value.is_array(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    fields: Vec<(String, Kind)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, kind: Kind) -> Self {
        self.fields.push((name.into(), kind));
        self
    }

    pub fn fields(&self) -> &[(String, Kind)] {
        &self.fields
    }
}

/// Returns false when `value` is not an object, or when a field required by
/// `schema` is missing or of the wrong kind. With no schema, any object passes.
pub fn validate(value: &Value, schema: Option<&Schema>) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let Some(schema) = schema else {
        return true;
    };
    schema
        .fields
        .iter()
        .all(|(name, kind)| map.get(name).is_some_and(|v| kind.matches(v)))
}

static ROADMAP: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("lastUpdated", Kind::String)
        .field("quarters", Kind::Object)
});

static CONTENT: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("technicalWhitepaper", Kind::Object)
        .field("architectureOverview", Kind::Object)
        .field("xandeumIntegration", Kind::Object)
        .field("financialFeatures", Kind::Object)
});

static BLOB: Lazy<Schema> = Lazy::new(|| {
    Schema::new()
        .field("mediaType", Kind::String)
        .field("data", Kind::String)
});

pub fn roadmap_schema() -> &'static Schema {
    &ROADMAP
}

pub fn content_schema() -> &'static Schema {
    &CONTENT
}

pub fn blob_schema() -> &'static Schema {
    &BLOB
}
