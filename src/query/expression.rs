//! Query expression trees and their combination.
//!
//! A [`Query`] is an immutable expression tree plus an optional binding to
//! the [`QueryTarget`](crate::query::target::QueryTarget) it will run against.
//! Expressions are combined with named methods ([`Query::and`],
//! [`Query::or`], ...) or with the equivalent operators:
//!
//! | operator | method |
//! |---|---|
//! | `a & b` | [`Query::and`] |
//! | `a \| b` | [`Query::or`] |
//! | `a ^ b` | [`Query::xor`] |
//! | `a - b` | [`Query::and_not`] |
//! | `a * f` | [`Query::scale`] |
//! | `a / f` | [`Query::divide`] |
//!
//! Every combination can fail (inconsistent targets, invalid factors), so the
//! operators yield `Result<Query>`.
//!
//! # Examples
//!
//! ```
//! use restpose::query::field;
//!
//! # fn main() -> restpose::error::Result<()> {
//! let query = (field("tag").equals("foo") & field("tag").equals("bar"))?;
//! let boosted = (query * 2.5)?;
//! assert_eq!(
//!     boosted.to_wire()["scale"]["factor"],
//!     serde_json::json!(2.5)
//! );
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::ops::{BitAnd, BitOr, BitXor, Div, Mul, Sub};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value, json};

use crate::error::{RestPoseError, Result};
use crate::query::request::{OccurOptions, OrderBy, OrderKey};
use crate::query::results::{Realiser, SearchResults};
use crate::query::searchable::{Searchable, Slice};
use crate::query::target::{SharedTarget, same_target};

/// Operators combining a sequence of subqueries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CombineOp {
    /// Documents matched by all subqueries; weights are summed.
    And,
    /// Documents matched by any subquery; weights are summed.
    Or,
    /// Documents matched by an odd number of subqueries.
    Xor,
    /// Documents matched by the first subquery but none of the others.
    AndNot,
    /// Documents matched by all subqueries, weighted by the first only.
    Filter,
    /// Documents matched by the first subquery, with extra weight from the others.
    AndMaybe,
}

impl CombineOp {
    /// The operator name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            CombineOp::And => "and",
            CombineOp::Or => "or",
            CombineOp::Xor => "xor",
            CombineOp::AndNot => "and_not",
            CombineOp::Filter => "filter",
            CombineOp::AndMaybe => "and_maybe",
        }
    }
}

/// Operations on a single field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOp {
    Is,
    IsDescendant,
    IsOrIsDescendant,
    Range,
    DistScore,
    Text,
    Parse,
}

impl FieldOp {
    /// The operation name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldOp::Is => "is",
            FieldOp::IsDescendant => "is_descendant",
            FieldOp::IsOrIsDescendant => "is_or_is_descendant",
            FieldOp::Range => "range",
            FieldOp::DistScore => "distscore",
            FieldOp::Text => "text",
            FieldOp::Parse => "parse",
        }
    }
}

/// Predicates on field presence and indexing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetaKind {
    Exists,
    Empty,
    NonEmpty,
    Error,
}

impl MetaKind {
    /// The predicate name used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            MetaKind::Exists => "exists",
            MetaKind::Empty => "empty",
            MetaKind::NonEmpty => "nonempty",
            MetaKind::Error => "error",
        }
    }
}

/// A node in a query expression tree.
///
/// Combinators own their children, so a tree built from other queries is a
/// snapshot of them at combination time.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryNode {
    /// `{"field": [name, op, value]}`; a `None` name searches every field.
    Field {
        field: Option<String>,
        op: FieldOp,
        value: Value,
    },
    /// `{"meta": [kind, [name]]}`
    Meta {
        kind: MetaKind,
        field: Option<String>,
    },
    /// `{"matchall": true}`
    MatchAll,
    /// `{"matchnothing": true}`
    MatchNothing,
    /// `{"scale": {"query": q, "factor": f}}`
    Scale { query: Box<QueryNode>, factor: f64 },
    /// `{op: [child, ...]}`
    Combine {
        op: CombineOp,
        children: Vec<QueryNode>,
    },
    /// A query already in wire form.
    Raw(Map<String, Value>),
}

impl QueryNode {
    /// Build the JSON structure sent to the server for this node.
    pub fn to_wire(&self) -> Value {
        match self {
            QueryNode::Field { field, op, value } => {
                json!({ "field": [field, op.as_str(), value] })
            }
            QueryNode::Meta { kind, field } => json!({ "meta": [kind.as_str(), [field]] }),
            QueryNode::MatchAll => json!({ "matchall": true }),
            QueryNode::MatchNothing => json!({ "matchnothing": true }),
            QueryNode::Scale { query, factor } => json!({
                "scale": { "query": query.to_wire(), "factor": factor }
            }),
            QueryNode::Combine { op, children } => {
                let children: Vec<Value> = children.iter().map(QueryNode::to_wire).collect();
                let mut map = Map::new();
                map.insert(op.as_str().to_string(), Value::Array(children));
                Value::Object(map)
            }
            QueryNode::Raw(map) => Value::Object(map.clone()),
        }
    }
}

impl Serialize for QueryNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_wire().serialize(serializer)
    }
}

/// Either a typed query or a raw wire-form mapping.
#[derive(Debug, Clone)]
pub enum QueryOperand {
    Query(Query),
    Raw(Map<String, Value>),
}

impl QueryOperand {
    fn target(&self) -> Option<&SharedTarget> {
        match self {
            QueryOperand::Query(query) => query.target.as_ref(),
            QueryOperand::Raw(_) => None,
        }
    }

    fn into_node(self) -> QueryNode {
        match self {
            QueryOperand::Query(query) => query.node,
            QueryOperand::Raw(map) => QueryNode::Raw(map),
        }
    }
}

impl From<Query> for QueryOperand {
    fn from(query: Query) -> Self {
        QueryOperand::Query(query)
    }
}

impl From<&Query> for QueryOperand {
    fn from(query: &Query) -> Self {
        QueryOperand::Query(query.clone())
    }
}

impl From<Map<String, Value>> for QueryOperand {
    fn from(map: Map<String, Value>) -> Self {
        QueryOperand::Raw(map)
    }
}

/// Find the single target shared by some operands.
///
/// Operands without a target are ignored; two different targets are an error.
fn target_from_operands(operands: &[QueryOperand]) -> Result<Option<SharedTarget>> {
    let mut target: Option<&SharedTarget> = None;
    for operand in operands {
        if let Some(candidate) = operand.target() {
            match target {
                Some(existing) if !same_target(existing, candidate) => {
                    return Err(RestPoseError::InconsistentTarget);
                }
                _ => target = Some(candidate),
            }
        }
    }
    Ok(target.cloned())
}

/// An immutable query expression, optionally bound to a target.
#[derive(Debug, Clone)]
pub struct Query {
    node: QueryNode,
    target: Option<SharedTarget>,
}

impl Query {
    /// Create an unbound query from a node.
    pub fn new(node: QueryNode) -> Self {
        Query { node, target: None }
    }

    /// A query matching every document.
    pub fn all() -> Self {
        Query::new(QueryNode::MatchAll)
    }

    /// A query matching no documents.
    pub fn none() -> Self {
        Query::new(QueryNode::MatchNothing)
    }

    /// A query given directly in wire form.
    pub fn raw(map: Map<String, Value>) -> Self {
        Query::new(QueryNode::Raw(map))
    }

    /// Combine operands with `op`, checking that their targets agree.
    ///
    /// At least two operands are required.
    pub fn combine<I>(op: CombineOp, operands: I) -> Result<Query>
    where
        I: IntoIterator,
        I::Item: Into<QueryOperand>,
    {
        let operands: Vec<QueryOperand> = operands.into_iter().map(Into::into).collect();
        if operands.len() < 2 {
            return Err(RestPoseError::invalid_argument(format!(
                "{} needs at least two subqueries, got {}",
                op.as_str(),
                operands.len()
            )));
        }
        let target = target_from_operands(&operands)?;
        let children = operands.into_iter().map(QueryOperand::into_node).collect();
        Ok(Query {
            node: QueryNode::Combine { op, children },
            target,
        })
    }

    /// Return a copy of this query bound to `target`.
    pub fn with_target(&self, target: SharedTarget) -> Query {
        Query {
            node: self.node.clone(),
            target: Some(target),
        }
    }

    pub(crate) fn with_optional_target(mut self, target: Option<SharedTarget>) -> Query {
        self.target = target;
        self
    }

    /// The target this query is bound to, if any.
    pub fn target(&self) -> Option<&SharedTarget> {
        self.target.as_ref()
    }

    /// The expression tree.
    pub fn node(&self) -> &QueryNode {
        &self.node
    }

    /// The JSON structure sent to the server for this query.
    pub fn to_wire(&self) -> Value {
        self.node.to_wire()
    }

    fn combine_pair(&self, op: CombineOp, other: QueryOperand) -> Result<Query> {
        Query::combine(op, [QueryOperand::Query(self.clone()), other])
    }

    /// Match documents matched by both queries.
    pub fn and(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::And, other.into())
    }

    /// Match documents matched by either query.
    pub fn or(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::Or, other.into())
    }

    /// Match documents matched by exactly one of the queries.
    pub fn xor(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::Xor, other.into())
    }

    /// Match documents matched by this query but not by `other`.
    pub fn and_not(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::AndNot, other.into())
    }

    /// Restrict this query to documents also matching `other`, keeping only
    /// this query's weights.
    pub fn filter(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::Filter, other.into())
    }

    /// Match documents matched by this query, adding weight from `other`.
    pub fn and_maybe(&self, other: impl Into<QueryOperand>) -> Result<Query> {
        self.combine_pair(CombineOp::AndMaybe, other.into())
    }

    /// Multiply the weights of this query by `factor`.
    ///
    /// The factor must be finite and strictly positive.
    pub fn scale(&self, factor: f64) -> Result<Query> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(RestPoseError::invalid_argument(format!(
                "scale factor must be positive, got {factor}"
            )));
        }
        Ok(Query {
            node: QueryNode::Scale {
                query: Box::new(self.node.clone()),
                factor,
            },
            target: self.target.clone(),
        })
    }

    /// Divide the weights of this query by `divisor`.
    pub fn divide(&self, divisor: f64) -> Result<Query> {
        self.scale(1.0 / divisor)
    }

    /// A cursor over the results of this query.
    pub fn searchable(&self) -> Searchable {
        Searchable::from(self)
    }

    /// Restrict the range of results; see [`Searchable::slice`].
    pub fn slice(&self, slice: impl Into<Slice>) -> Result<Searchable> {
        self.searchable().slice(slice)
    }

    /// See [`Searchable::check_at_least`].
    pub fn check_at_least(&self, check_at_least: i64) -> Result<Searchable> {
        self.searchable().check_at_least(check_at_least)
    }

    /// See [`Searchable::order_by`].
    pub fn order_by(&self, by: impl Into<OrderBy>, ascending: Option<bool>) -> Searchable {
        self.searchable().order_by(by, ascending)
    }

    /// See [`Searchable::order_by_multiple`].
    pub fn order_by_multiple(&self, keys: impl IntoIterator<Item = OrderKey>) -> Searchable {
        self.searchable().order_by_multiple(keys)
    }

    /// See [`Searchable::fromdoc`].
    pub fn fromdoc(
        &self,
        doc_type: impl Into<String>,
        doc_id: impl Into<String>,
        offset: i64,
        size: u64,
        pagesize: Option<u64>,
    ) -> Result<Searchable> {
        self.searchable()
            .fromdoc(doc_type, doc_id, offset, size, pagesize)
    }

    /// See [`Searchable::calc_facet_count`].
    pub fn calc_facet_count(
        &self,
        field: impl Into<String>,
        doc_limit: Option<u64>,
        result_limit: Option<u64>,
    ) -> Searchable {
        self.searchable()
            .calc_facet_count(field, doc_limit, result_limit)
    }

    /// See [`Searchable::calc_occur`].
    pub fn calc_occur(
        &self,
        group: impl Into<String>,
        prefix: impl Into<String>,
        options: OccurOptions,
    ) -> Searchable {
        self.searchable().calc_occur(group, prefix, options)
    }

    /// See [`Searchable::calc_cooccur`].
    pub fn calc_cooccur(
        &self,
        group: impl Into<String>,
        prefix: impl Into<String>,
        options: OccurOptions,
    ) -> Searchable {
        self.searchable().calc_cooccur(group, prefix, options)
    }

    /// Attach a realiser for the objects associated with results.
    pub fn with_realiser(&self, realiser: Realiser) -> Searchable {
        self.searchable().with_realiser(realiser)
    }

    /// Run the query against its target, ignoring any cache.
    pub fn search(&self) -> Result<Arc<SearchResults>> {
        self.searchable().search()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_wire())
    }
}

impl<T: Into<QueryOperand>> BitAnd<T> for Query {
    type Output = Result<Query>;

    fn bitand(self, rhs: T) -> Self::Output {
        self.and(rhs)
    }
}

impl<T: Into<QueryOperand>> BitAnd<T> for &Query {
    type Output = Result<Query>;

    fn bitand(self, rhs: T) -> Self::Output {
        self.and(rhs)
    }
}

impl<T: Into<QueryOperand>> BitOr<T> for Query {
    type Output = Result<Query>;

    fn bitor(self, rhs: T) -> Self::Output {
        self.or(rhs)
    }
}

impl<T: Into<QueryOperand>> BitOr<T> for &Query {
    type Output = Result<Query>;

    fn bitor(self, rhs: T) -> Self::Output {
        self.or(rhs)
    }
}

impl<T: Into<QueryOperand>> BitXor<T> for Query {
    type Output = Result<Query>;

    fn bitxor(self, rhs: T) -> Self::Output {
        self.xor(rhs)
    }
}

impl<T: Into<QueryOperand>> BitXor<T> for &Query {
    type Output = Result<Query>;

    fn bitxor(self, rhs: T) -> Self::Output {
        self.xor(rhs)
    }
}

impl<T: Into<QueryOperand>> Sub<T> for Query {
    type Output = Result<Query>;

    fn sub(self, rhs: T) -> Self::Output {
        self.and_not(rhs)
    }
}

impl<T: Into<QueryOperand>> Sub<T> for &Query {
    type Output = Result<Query>;

    fn sub(self, rhs: T) -> Self::Output {
        self.and_not(rhs)
    }
}

impl Mul<f64> for Query {
    type Output = Result<Query>;

    fn mul(self, factor: f64) -> Self::Output {
        self.scale(factor)
    }
}

impl Mul<f64> for &Query {
    type Output = Result<Query>;

    fn mul(self, factor: f64) -> Self::Output {
        self.scale(factor)
    }
}

impl Mul<Query> for f64 {
    type Output = Result<Query>;

    fn mul(self, query: Query) -> Self::Output {
        query.scale(self)
    }
}

impl Mul<&Query> for f64 {
    type Output = Result<Query>;

    fn mul(self, query: &Query) -> Self::Output {
        query.scale(self)
    }
}

impl Div<f64> for Query {
    type Output = Result<Query>;

    fn div(self, divisor: f64) -> Self::Output {
        self.divide(divisor)
    }
}

impl Div<f64> for &Query {
    type Output = Result<Query>;

    fn div(self, divisor: f64) -> Self::Output {
        self.divide(divisor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::field::field;

    fn tag(value: &str) -> Query {
        field("fieldname").is_in(value)
    }

    #[test]
    fn test_field_wire_form() {
        assert_eq!(
            tag("10").to_wire(),
            json!({"field": ["fieldname", "is", "10"]})
        );
        assert_eq!(Query::all().to_wire(), json!({"matchall": true}));
        assert_eq!(Query::none().to_wire(), json!({"matchnothing": true}));
    }

    #[test]
    fn test_scale_and_divide() {
        let scaled = (tag("10") * 2.5).unwrap();
        assert_eq!(
            scaled.to_wire(),
            json!({"scale": {"factor": 2.5, "query": {"field": ["fieldname", "is", "10"]}}})
        );

        let left = (2.0 * tag("10")).unwrap();
        assert_eq!(left.to_wire()["scale"]["factor"], json!(2.0));

        let halved = (tag("10") / 2.0).unwrap();
        assert_eq!(halved.to_wire()["scale"]["factor"], json!(0.5));
    }

    #[test]
    fn test_scale_rejects_non_positive_factors() {
        for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let err = tag("10").scale(factor).unwrap_err();
            assert!(matches!(err, RestPoseError::InvalidArgument(_)));
        }
        assert!(tag("10").divide(0.0).is_err());
    }

    #[test]
    fn test_operators_build_combinators() {
        let scaled = (tag("10") * 2.5).unwrap();
        let cases = [
            ((&scaled & tag("11")).unwrap(), "and"),
            ((&scaled | tag("11")).unwrap(), "or"),
            ((&scaled ^ tag("11")).unwrap(), "xor"),
            ((&scaled - tag("11")).unwrap(), "and_not"),
            (scaled.filter(tag("11")).unwrap(), "filter"),
            (scaled.and_maybe(tag("11")).unwrap(), "and_maybe"),
        ];
        for (query, op) in cases {
            let mut expected = Map::new();
            expected.insert(
                op.to_string(),
                json!([
                    {"scale": {"factor": 2.5, "query": {"field": ["fieldname", "is", "10"]}}},
                    {"field": ["fieldname", "is", "11"]}
                ]),
            );
            assert_eq!(query.to_wire(), Value::Object(expected));
        }
    }

    #[test]
    fn test_nary_combine_preserves_order() {
        let query =
            Query::combine(CombineOp::Or, [tag("10"), tag("11"), tag("12")]).unwrap();
        assert_eq!(
            query.to_wire(),
            json!({"or": [
                {"field": ["fieldname", "is", "10"]},
                {"field": ["fieldname", "is", "11"]},
                {"field": ["fieldname", "is", "12"]}
            ]})
        );
    }

    #[test]
    fn test_combine_needs_two_operands() {
        assert!(matches!(
            Query::combine(CombineOp::And, Vec::<Query>::new()),
            Err(RestPoseError::InvalidArgument(_))
        ));
        assert!(matches!(
            Query::combine(CombineOp::Filter, [tag("10")]),
            Err(RestPoseError::InvalidArgument(_))
        ));
        assert!(Query::combine(CombineOp::AndMaybe, [tag("10"), tag("11")]).is_ok());
    }

    #[test]
    fn test_raw_operand() {
        let mut raw = Map::new();
        raw.insert("matchall".to_string(), json!(true));
        let query = tag("10").and(raw).unwrap();
        assert_eq!(
            query.to_wire(),
            json!({"and": [{"field": ["fieldname", "is", "10"]}, {"matchall": true}]})
        );
    }

    #[test]
    fn test_combining_leaves_operands_unchanged() {
        let base = tag("10");
        let _combined = base.and(tag("11")).unwrap();
        let _scaled = base.scale(2.0).unwrap();
        assert_eq!(base.to_wire(), json!({"field": ["fieldname", "is", "10"]}));
    }
}
