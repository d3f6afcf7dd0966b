//! Document filters.
//!
//! Both the guest search and the raw passthrough endpoints end up here: a
//! Mongo-style JSON filter document is parsed into a [`DocumentFilter`] and
//! evaluated against the JSON form of each stored record.

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::cmp::Ordering;

use crate::error::{Result, ServiceError};

#[derive(Debug, Clone)]
pub enum DocumentFilter {
    /// Matches every document
    All,
    And(Vec<DocumentFilter>),
    Or(Vec<DocumentFilter>),
    Nor(Vec<DocumentFilter>),
    Field { path: String, condition: Condition },
}

#[derive(Debug, Clone)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Regex(Regex),
}

impl DocumentFilter {
    pub fn field(path: impl Into<String>, condition: Condition) -> Self {
        DocumentFilter::Field {
            path: path.into(),
            condition,
        }
    }

    /// Parses a caller-supplied filter document without restricting its shape.
    /// `null` and `{}` match everything.
    pub fn parse(value: &Value) -> Result<Self> {
        match value {
            Value::Null => Ok(DocumentFilter::All),
            Value::Object(map) => parse_document(map),
            other => Err(invalid(format!(
                "filter must be a JSON object, got {}",
                kind(other)
            ))),
        }
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            DocumentFilter::All => true,
            DocumentFilter::And(filters) => filters.iter().all(|f| f.matches(document)),
            DocumentFilter::Or(filters) => filters.iter().any(|f| f.matches(document)),
            DocumentFilter::Nor(filters) => !filters.iter().any(|f| f.matches(document)),
            DocumentFilter::Field { path, condition } => {
                condition.matches(lookup(document, path))
            }
        }
    }

    /// Keeps the records whose JSON form matches
    pub fn select<T: Serialize>(&self, records: Vec<T>) -> Result<Vec<T>> {
        let mut selected = Vec::new();
        for record in records {
            if self.matches(&serde_json::to_value(&record)?) {
                selected.push(record);
            }
        }
        Ok(selected)
    }
}

impl Condition {
    fn matches(&self, actual: Option<&Value>) -> bool {
        match self {
            Condition::Eq(expected) => equals(actual, expected),
            Condition::Ne(expected) => !equals(actual, expected),
            Condition::Gt(bound) => compare(actual, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare(actual, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => matches!(
                compare(actual, bound),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Condition::In(candidates) => candidates.iter().any(|c| equals(actual, c)),
            Condition::Nin(candidates) => !candidates.iter().any(|c| equals(actual, c)),
            Condition::Exists(expected) => actual.is_some() == *expected,
            Condition::Regex(pattern) => actual
                .and_then(Value::as_str)
                .map(|text| pattern.is_match(text))
                .unwrap_or(false),
        }
    }
}

fn parse_document(map: &Map<String, Value>) -> Result<DocumentFilter> {
    let mut clauses = Vec::new();

    for (key, value) in map {
        match key.as_str() {
            "$and" => clauses.push(DocumentFilter::And(parse_list(key, value)?)),
            "$or" => clauses.push(DocumentFilter::Or(parse_list(key, value)?)),
            "$nor" => clauses.push(DocumentFilter::Nor(parse_list(key, value)?)),
            op if op.starts_with('$') => {
                return Err(invalid(format!("unknown top-level operator {}", op)))
            }
            path => clauses.extend(parse_field(path, value)?),
        }
    }

    Ok(match clauses.len() {
        0 => DocumentFilter::All,
        1 => clauses.remove(0),
        _ => DocumentFilter::And(clauses),
    })
}

fn parse_list(op: &str, value: &Value) -> Result<Vec<DocumentFilter>> {
    let items = value
        .as_array()
        .filter(|items| !items.is_empty())
        .ok_or_else(|| invalid(format!("{} expects a non-empty array", op)))?;

    items
        .iter()
        .map(|item| match item {
            Value::Object(map) => parse_document(map),
            other => Err(invalid(format!(
                "{} entries must be objects, got {}",
                op,
                kind(other)
            ))),
        })
        .collect()
}

fn parse_field(path: &str, value: &Value) -> Result<Vec<DocumentFilter>> {
    let path = stored_path(path);
    let path = path.as_str();

    let operators = match value {
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => map,
        // Plain values, including object literals, are equality matches
        other => {
            return Ok(vec![DocumentFilter::field(
                path,
                Condition::Eq(other.clone()),
            )])
        }
    };

    if operators.keys().any(|k| !k.starts_with('$')) {
        return Err(invalid(format!(
            "cannot mix operators and fields in the condition for {}",
            path
        )));
    }

    let mut conditions = Vec::new();
    for (op, operand) in operators {
        let condition = match op.as_str() {
            "$eq" => Condition::Eq(operand.clone()),
            "$ne" => Condition::Ne(operand.clone()),
            "$gt" => Condition::Gt(operand.clone()),
            "$gte" => Condition::Gte(operand.clone()),
            "$lt" => Condition::Lt(operand.clone()),
            "$lte" => Condition::Lte(operand.clone()),
            "$in" => Condition::In(array_operand(op, operand)?),
            "$nin" => Condition::Nin(array_operand(op, operand)?),
            "$exists" => Condition::Exists(truthy(operand)),
            "$regex" => Condition::Regex(regex_operand(operand, operators.get("$options"))?),
            "$options" if operators.contains_key("$regex") => continue,
            "$options" => return Err(invalid("$options requires $regex".into())),
            other => return Err(invalid(format!("unknown operator {}", other))),
        };
        conditions.push(DocumentFilter::field(path, condition));
    }

    Ok(conditions)
}

// Older clients filter on the attribute names used before the rename
fn stored_path(path: &str) -> String {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    let head = match head {
        "_id" => "id",
        "serialNo" => "serialNumber",
        "holud" => "holudAmount",
        "wedding" => "weddingAmount",
        "reception" => "receptionAmount",
        other => other,
    };

    match rest {
        Some(rest) => format!("{}.{}", head, rest),
        None => head.to_string(),
    }
}

fn array_operand(op: &str, operand: &Value) -> Result<Vec<Value>> {
    operand
        .as_array()
        .cloned()
        .ok_or_else(|| invalid(format!("{} expects an array", op)))
}

fn regex_operand(pattern: &Value, options: Option<&Value>) -> Result<Regex> {
    let pattern = pattern
        .as_str()
        .ok_or_else(|| invalid("$regex expects a string".into()))?;

    let options = match options {
        None => "",
        Some(Value::String(options)) => options.as_str(),
        Some(_) => return Err(invalid("$options expects a string".into())),
    };

    let mut builder = RegexBuilder::new(pattern);
    for flag in options.chars() {
        match flag {
            'i' => builder.case_insensitive(true),
            'm' => builder.multi_line(true),
            's' => builder.dot_matches_new_line(true),
            'x' => builder.ignore_whitespace(true),
            other => return Err(invalid(format!("unsupported regex option '{}'", other))),
        };
    }

    builder
        .build()
        .map_err(|e| invalid(format!("invalid regex: {}", e)))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        _ => true,
    }
}

fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .try_fold(document, |current, segment| current.get(segment))
}

// A missing field equals null, and numbers compare by value (1 == 1.0)
fn equals(actual: Option<&Value>, expected: &Value) -> bool {
    match (actual, expected) {
        (None, Value::Null) => true,
        (None, _) => false,
        (Some(Value::Number(a)), Value::Number(b)) => a.as_f64() == b.as_f64(),
        (Some(a), b) => a == b,
    }
}

fn compare(actual: Option<&Value>, bound: &Value) -> Option<Ordering> {
    match (actual?, bound) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn invalid(message: String) -> ServiceError {
    ServiceError::ValidationError(format!("Malformed filter: {}", message))
}

/// `filterStatus` on the card search
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StatusFilter {
    #[default]
    All,
    Invited,
    NotInvited,
}

/// Per-sub-event flag filter on the card search
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FlagFilter {
    #[default]
    All,
    Yes,
    No,
}

impl FlagFilter {
    fn condition(self, path: &str) -> Option<DocumentFilter> {
        match self {
            FlagFilter::All => None,
            FlagFilter::Yes => Some(DocumentFilter::field(path, Condition::Eq(Value::Bool(true)))),
            FlagFilter::No => Some(DocumentFilter::field(path, Condition::Eq(Value::Bool(false)))),
        }
    }
}

/// Fields the free-text term is matched against
pub const SEARCH_FIELDS: [&str; 3] = ["name", "reference", "location"];

/// Free-text search plus invitation filters over guests
#[derive(Debug, Clone, Default)]
pub struct GuestSearch {
    pub term: Option<String>,
    pub status: StatusFilter,
    pub holud: FlagFilter,
    pub wedding: FlagFilter,
    pub reception: FlagFilter,
}

impl GuestSearch {
    /// Compiles the search into a filter. The term is a literal,
    /// case-insensitive substring; an empty term adds no constraint.
    pub fn to_filter(&self) -> Result<DocumentFilter> {
        let mut clauses = Vec::new();

        if let Some(term) = self.term.as_deref().filter(|t| !t.is_empty()) {
            let pattern = RegexBuilder::new(&regex::escape(term))
                .case_insensitive(true)
                .build()
                .map_err(|e| ServiceError::ValidationError(format!("Invalid search term: {}", e)))?;

            clauses.push(DocumentFilter::Or(
                SEARCH_FIELDS
                    .iter()
                    .map(|field| DocumentFilter::field(*field, Condition::Regex(pattern.clone())))
                    .collect(),
            ));
        }

        match self.status {
            StatusFilter::All => {}
            StatusFilter::Invited => clauses.push(DocumentFilter::field(
                "invited",
                Condition::Eq(Value::Bool(true)),
            )),
            StatusFilter::NotInvited => clauses.push(DocumentFilter::field(
                "invited",
                Condition::Eq(Value::Bool(false)),
            )),
        }

        clauses.extend(self.holud.condition("invitedHolud"));
        clauses.extend(self.wedding.condition("invitedWedding"));
        clauses.extend(self.reception.condition("invitedReception"));

        Ok(match clauses.len() {
            0 => DocumentFilter::All,
            1 => clauses.remove(0),
            _ => DocumentFilter::And(clauses),
        })
    }
}
