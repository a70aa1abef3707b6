//! Result decoration for the bootcamp listing: field filters, sorting,
//! projection and pagination parsed from the query string.
//!
//! Parsing is independent of the storage backend. The Postgres repository
//! translates a [`ListOptions`] into SQL; [`project`] and [`paginate`] are
//! applied by the handler after the rows come back.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::{AppError, AppResult};
use crate::models::{PageLink, Pagination};

pub const DEFAULT_LIMIT: i64 = 25;
pub const MAX_LIMIT: i64 = 100;
/// Largest page whose offset still fits in an `i64` at the maximum limit.
pub const MAX_PAGE: i64 = i64::MAX / MAX_LIMIT;

/// Query keys that control decoration rather than filter records.
const RESERVED: [&str; 4] = ["select", "sort", "page", "limit"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Number,
    Bool,
    Text,
    TextArray,
}

/// A filterable or sortable bootcamp field: its JSON name, its column, and how
/// query-string values for it are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const FILTERABLE: [Field; 11] = [
    Field { name: "averageCost", column: "average_cost", kind: FieldKind::Number },
    Field { name: "averageRating", column: "average_rating", kind: FieldKind::Number },
    Field { name: "housing", column: "housing", kind: FieldKind::Bool },
    Field { name: "jobAssistance", column: "job_assistance", kind: FieldKind::Bool },
    Field { name: "jobGuarantee", column: "job_guarantee", kind: FieldKind::Bool },
    Field { name: "acceptGi", column: "accept_gi", kind: FieldKind::Bool },
    Field { name: "careers", column: "careers", kind: FieldKind::TextArray },
    Field { name: "name", column: "name", kind: FieldKind::Text },
    Field { name: "location.city", column: "city", kind: FieldKind::Text },
    Field { name: "location.state", column: "state", kind: FieldKind::Text },
    Field { name: "location.zipcode", column: "zipcode", kind: FieldKind::Text },
];

const SORTABLE: [Field; 4] = [
    Field { name: "name", column: "name", kind: FieldKind::Text },
    Field { name: "averageCost", column: "average_cost", kind: FieldKind::Number },
    Field { name: "averageRating", column: "average_rating", kind: FieldKind::Number },
    Field { name: "createdAt", column: "created_at", kind: FieldKind::Text },
];

fn filterable(name: &str) -> Option<Field> {
    FILTERABLE
        .iter()
        .find(|f| f.name == name)
        .copied()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

impl Operator {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "gt" => Some(Operator::Gt),
            "gte" => Some(Operator::Gte),
            "lt" => Some(Operator::Lt),
            "lte" => Some(Operator::Lte),
            "in" => Some(Operator::In),
            _ => None,
        }
    }

    /// SQL comparison for scalar operators.
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq | Operator::In => "=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Bool(bool),
    Text(String),
    TextList(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: Field,
    pub op: Operator,
    pub value: FilterValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortKey {
    pub field: Field,
    pub direction: Direction,
}

/// ListOptions
///
/// Everything the list route needs from its query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ListOptions {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortKey>,
    pub select: Option<Vec<String>>,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            filters: vec![],
            sort: default_sort(),
            select: None,
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn default_sort() -> Vec<SortKey> {
    vec![SortKey {
        field: SORTABLE[3],
        direction: Direction::Desc,
    }]
}

impl ListOptions {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }

    /// Parses raw query parameters. Keys are either decoration keys
    /// (`select`, `sort`, `page`, `limit`), `field=value`, or `field[op]=value`.
    pub fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut options = ListOptions::default();

        if let Some(page) = params.get("page") {
            options.page = parse_positive(page, "page")?;
            if options.page > MAX_PAGE {
                return Err(AppError::BadRequest(format!(
                    "'page' can not be more than {}",
                    MAX_PAGE
                )));
            }
        }
        if let Some(limit) = params.get("limit") {
            options.limit = parse_positive(limit, "limit")?.min(MAX_LIMIT);
        }
        if let Some(sort) = params.get("sort") {
            options.sort = parse_sort(sort)?;
        }
        if let Some(select) = params.get("select") {
            let fields: Vec<String> = split_list(select);
            if !fields.is_empty() {
                options.select = Some(fields);
            }
        }

        let mut keys: Vec<&String> = params
            .keys()
            .filter(|k| !RESERVED.contains(&k.as_str()))
            .collect();
        // HashMap order is arbitrary; keep generated SQL stable.
        keys.sort();

        for key in keys {
            options.filters.push(parse_filter(key, &params[key])?);
        }

        Ok(options)
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(raw: &str, name: &str) -> AppResult<i64> {
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(AppError::BadRequest(format!(
            "'{}' must be a positive integer",
            name
        ))),
    }
}

fn parse_sort(raw: &str) -> AppResult<Vec<SortKey>> {
    let mut keys = Vec::new();
    for part in split_list(raw) {
        let (name, direction) = match part.strip_prefix('-') {
            Some(name) => (name, Direction::Desc),
            None => (part.as_str(), Direction::Asc),
        };
        let field = SORTABLE
            .iter()
            .find(|f| f.name == name)
            .copied()
            .ok_or_else(|| AppError::BadRequest(format!("Cannot sort by '{}'", name)))?;
        keys.push(SortKey { field, direction });
    }
    if keys.is_empty() {
        return Ok(default_sort());
    }
    Ok(keys)
}

fn parse_filter(key: &str, raw: &str) -> AppResult<Filter> {
    let (name, op) = match key.split_once('[') {
        Some((name, rest)) => {
            let op = rest
                .strip_suffix(']')
                .and_then(Operator::parse)
                .ok_or_else(|| AppError::BadRequest(format!("Unsupported filter '{}'", key)))?;
            (name, op)
        }
        None => (key, Operator::Eq),
    };

    let field = filterable(name)
        .ok_or_else(|| AppError::BadRequest(format!("Cannot filter by '{}'", name)))?;

    let invalid = || AppError::BadRequest(format!("Invalid value '{}' for '{}'", raw, key));

    let value = match (field.kind, op) {
        (FieldKind::Number, Operator::In) => return Err(invalid()),
        (FieldKind::Number, _) => FilterValue::Number(raw.parse::<f64>().map_err(|_| invalid())?),
        (FieldKind::Bool, Operator::Eq) => FilterValue::Bool(raw.parse::<bool>().map_err(|_| invalid())?),
        (FieldKind::Text | FieldKind::TextArray, Operator::Eq) => FilterValue::Text(raw.to_string()),
        (FieldKind::TextArray, Operator::In) => {
            let values = split_list(raw);
            if values.is_empty() {
                return Err(invalid());
            }
            FilterValue::TextList(values)
        }
        _ => {
            return Err(AppError::BadRequest(format!(
                "Unsupported filter '{}'",
                key
            )));
        }
    };

    Ok(Filter { field, op, value })
}

/// paginate
///
/// Computes neighbour links for `page`/`limit` given the total number of
/// matching records.
pub fn paginate(page: i64, limit: i64, total: i64) -> Pagination {
    let start = (page - 1).saturating_mul(limit);
    let end = page.saturating_mul(limit);

    Pagination {
        next: (end < total).then(|| PageLink { page: page + 1, limit }),
        prev: (start > 0).then(|| PageLink { page: page - 1, limit }),
    }
}

/// project
///
/// Keeps only the selected top-level fields of a serialized record. `id` is
/// always retained so clients can address the result.
pub fn project(record: Value, select: Option<&[String]>) -> Value {
    let Some(fields) = select else {
        return record;
    };
    match record {
        Value::Object(map) => {
            let kept: Map<String, Value> = map
                .into_iter()
                .filter(|(k, _)| k == "id" || fields.iter().any(|f| f == k))
                .collect();
            Value::Object(kept)
        }
        other => other,
    }
}
