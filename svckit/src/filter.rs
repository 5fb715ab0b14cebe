// svckit/src/filter.rs
//
// Filter expressions for list queries: an AND of field predicates, serialized
// as {"$and": [{field: {"$op": value}}, ...]} with relation paths nested.

use chrono::NaiveDate;
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Includes,
    Gte,
    Lte,
}

impl Op {
    pub fn as_str(&self) -> &'static str {
        match self {
            Op::Eq => "$eq",
            Op::Includes => "$includes",
            Op::Gte => "$gte",
            Op::Lte => "$lte",
        }
    }
}

/// One field path with its operator conditions. A date range puts `$gte` and
/// `$lte` on the same predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    path: Vec<String>,
    conditions: Vec<(Op, Value)>,
}

impl Predicate {
    pub fn path<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: segments.into_iter().map(Into::into).collect(),
            conditions: Vec::new(),
        }
    }

    pub fn field(name: &str) -> Self {
        Self::path([name])
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::field(field).with(Op::Eq, value)
    }

    pub fn includes(field: &str, value: impl Into<Value>) -> Self {
        Self::field(field).with(Op::Includes, value)
    }

    pub fn with(mut self, op: Op, value: impl Into<Value>) -> Self {
        self.conditions.push((op, value.into()));
        self
    }

    pub fn segments(&self) -> &[String] {
        &self.path
    }

    pub fn conditions(&self) -> &[(Op, Value)] {
        &self.conditions
    }

    pub fn to_json(&self) -> Value {
        let mut ops = Map::new();
        for (op, value) in &self.conditions {
            ops.insert(op.as_str().to_string(), value.clone());
        }

        self.path
            .iter()
            .rev()
            .fold(Value::Object(ops), |inner, segment| {
                let mut wrapper = Map::new();
                wrapper.insert(segment.clone(), inner);
                Value::Object(wrapper)
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterExpr {
    clauses: Vec<Predicate>,
}

impl FilterExpr {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a clause. A clause on a path already present replaces the earlier
    /// one at its original position.
    pub fn and(mut self, predicate: Predicate) -> Self {
        match self.clauses.iter_mut().find(|c| c.path == predicate.path) {
            Some(existing) => *existing = predicate,
            None => self.clauses.push(predicate),
        }
        self
    }

    pub fn and_all(self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        predicates.into_iter().fold(self, FilterExpr::and)
    }

    pub fn and_opt(self, predicate: Option<Predicate>) -> Self {
        match predicate {
            Some(p) => self.and(p),
            None => self,
        }
    }

    pub fn clauses(&self) -> &[Predicate] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn to_json(&self) -> Value {
        json!({ "$and": self.clauses.iter().map(Predicate::to_json).collect::<Vec<_>>() })
    }

    /// Compact JSON text; URL encoding happens when the query string is built.
    pub fn encode(&self) -> String {
        self.to_json().to_string()
    }
}

/// Organizational narrowing of a list query. A unit always wins over its
/// division; the two never combine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Scope {
    #[default]
    Unscoped,
    Division(String),
    Unit(String),
}

impl Scope {
    pub fn from_ids(division_id: Option<&str>, unit_id: Option<&str>) -> Self {
        match (unit_id.filter(|u| !u.is_empty()), division_id.filter(|d| !d.is_empty())) {
            (Some(unit), _) => Scope::Unit(unit.to_string()),
            (None, Some(division)) => Scope::Division(division.to_string()),
            (None, None) => Scope::Unscoped,
        }
    }

    /// Predicate under the relation path that leads to the record's unit,
    /// e.g. `["unit"]` for machines or `["location", "unit"]` for tickets.
    pub fn predicate(&self, unit_path: &[&str]) -> Option<Predicate> {
        let mut path: Vec<String> = unit_path.iter().map(|s| s.to_string()).collect();
        match self {
            Scope::Unscoped => None,
            Scope::Unit(id) => {
                path.push("unit_id".to_string());
                Some(Predicate::path(path).with(Op::Eq, id.as_str()))
            }
            Scope::Division(id) => {
                path.push("division".to_string());
                path.push("division_id".to_string());
                Some(Predicate::path(path).with(Op::Eq, id.as_str()))
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    pub fn parse(start: Option<&str>, end: Option<&str>) -> Result<Self, chrono::ParseError> {
        let parse = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d");
        Ok(Self {
            start: start.filter(|s| !s.is_empty()).map(parse).transpose()?,
            end: end.filter(|s| !s.is_empty()).map(parse).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn predicate(&self, field: &str) -> Option<Predicate> {
        if self.is_empty() {
            return None;
        }
        let mut predicate = Predicate::field(field);
        if let Some(start) = self.start {
            predicate = predicate.with(Op::Gte, start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = self.end {
            predicate = predicate.with(Op::Lte, end.format("%Y-%m-%d").to_string());
        }
        Some(predicate)
    }

    /// Inclusive on both ends.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date <= e)
    }
}
