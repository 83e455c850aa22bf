//! Builders for queries on individual fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{RestPoseError, Result};
use crate::query::expression::{FieldOp, MetaKind, Query, QueryNode};
use crate::query::target::SharedTarget;

/// Operators for free-text queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextOp {
    Or,
    And,
    Phrase,
    Near,
}

impl TextOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextOp::Or => "or",
            TextOp::And => "and",
            TextOp::Phrase => "phrase",
            TextOp::Near => "near",
        }
    }
}

/// Default operators for parsed queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParseOp {
    Or,
    And,
}

impl ParseOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseOp::Or => "or",
            ParseOp::And => "and",
        }
    }
}

/// A geographic point, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LonLat {
    pub lon: f64,
    pub lat: f64,
}

impl LonLat {
    /// Create a point, validating the coordinate ranges.
    pub fn new(lon: f64, lat: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(RestPoseError::invalid_argument(format!(
                "Longitude must be between -180 and 180, got {lon}"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(RestPoseError::invalid_argument(format!(
                "Latitude must be between -90 and 90, got {lat}"
            )));
        }
        Ok(LonLat { lon, lat })
    }
}

/// Produces queries on a named field, or on all fields.
///
/// Sources obtained from a target (see
/// [`TargetExt::field`](crate::query::target::TargetExt::field)) bind every
/// query they build to that target.
#[derive(Debug, Clone)]
pub struct FieldQuerySource {
    fieldname: Option<String>,
    target: Option<SharedTarget>,
}

/// Queries on the field `name`.
pub fn field(name: impl Into<String>) -> FieldQuerySource {
    FieldQuerySource::new(Some(name.into()), None)
}

/// Queries across every field.
pub fn any_field() -> FieldQuerySource {
    FieldQuerySource::new(None, None)
}

impl FieldQuerySource {
    pub fn new(fieldname: Option<String>, target: Option<SharedTarget>) -> Self {
        FieldQuerySource { fieldname, target }
    }

    /// The field queried, or `None` for all fields.
    pub fn fieldname(&self) -> Option<&str> {
        self.fieldname.as_deref()
    }

    fn field_query(&self, op: FieldOp, value: Value) -> Query {
        Query::new(QueryNode::Field {
            field: self.fieldname.clone(),
            op,
            value,
        })
        .with_optional_target(self.target.clone())
    }

    fn meta_query(&self, kind: MetaKind) -> Query {
        Query::new(QueryNode::Meta {
            kind,
            field: self.fieldname.clone(),
        })
        .with_optional_target(self.target.clone())
    }

    /// Match documents whose field has exactly `value`.
    pub fn equals(&self, value: impl Into<Value>) -> Query {
        self.field_query(FieldOp::Is, Value::Array(vec![value.into()]))
    }

    /// Match documents whose field has `value`, or any of the values if a
    /// list is given.
    pub fn is_in(&self, values: impl Into<Value>) -> Query {
        self.field_query(FieldOp::Is, values.into())
    }

    /// Match documents with a category strictly below `categories`.
    pub fn is_descendant(&self, categories: impl Into<Value>) -> Query {
        self.field_query(FieldOp::IsDescendant, categories.into())
    }

    /// Match documents with a category equal to or below `categories`.
    pub fn is_or_is_descendant(&self, categories: impl Into<Value>) -> Query {
        self.field_query(FieldOp::IsOrIsDescendant, categories.into())
    }

    /// Match documents whose value lies in `[begin, end]`.
    pub fn range(&self, begin: impl Into<Value>, end: impl Into<Value>) -> Query {
        self.field_query(FieldOp::Range, json!([begin.into(), end.into()]))
    }

    /// Weight documents by distance from `center`, optionally ignoring
    /// those further than `max_range` metres.
    pub fn distance_score(&self, center: LonLat, max_range: Option<f64>) -> Query {
        let mut value = Map::new();
        value.insert("center".to_string(), json!([center.lon, center.lat]));
        if let Some(max_range) = max_range {
            value.insert("max_range".to_string(), json!(max_range));
        }
        self.field_query(FieldOp::DistScore, Value::Object(value))
    }

    /// Match documents containing `text` as a phrase.
    pub fn text(&self, text: impl Into<String>) -> Query {
        self.text_with(text, Some(TextOp::Phrase), None)
    }

    /// Match documents containing `text`.
    ///
    /// `window` only has an effect for the phrase and near operators.
    pub fn text_with(
        &self,
        text: impl Into<String>,
        op: Option<TextOp>,
        window: Option<u32>,
    ) -> Query {
        let mut value = Map::new();
        value.insert("text".to_string(), Value::String(text.into()));
        if let Some(op) = op {
            value.insert("op".to_string(), json!(op.as_str()));
        }
        if let Some(window) = window {
            value.insert("window".to_string(), json!(window));
        }
        self.field_query(FieldOp::Text, Value::Object(value))
    }

    /// Match documents using a query string in the server's parser syntax,
    /// with "and" as the default operator.
    pub fn parse(&self, text: impl Into<String>) -> Query {
        self.parse_with(text, Some(ParseOp::And))
    }

    /// As [`parse`](Self::parse), with an explicit default operator.
    pub fn parse_with(&self, text: impl Into<String>, op: Option<ParseOp>) -> Query {
        let mut value = Map::new();
        value.insert("text".to_string(), Value::String(text.into()));
        if let Some(op) = op {
            value.insert("op".to_string(), json!(op.as_str()));
        }
        self.field_query(FieldOp::Parse, Value::Object(value))
    }

    /// Match documents in which the field exists.
    pub fn exists(&self) -> Query {
        self.meta_query(MetaKind::Exists)
    }

    /// Match documents in which the field exists but is empty.
    pub fn empty(&self) -> Query {
        self.meta_query(MetaKind::Empty)
    }

    /// Match documents in which the field exists with a non-empty value.
    pub fn nonempty(&self) -> Query {
        self.meta_query(MetaKind::NonEmpty)
    }

    /// Match documents that had an error while indexing the field.
    pub fn has_error(&self) -> Query {
        self.meta_query(MetaKind::Error)
    }
}
