//! Filter predicate trees shared by collection and file listings.
//!
//! Filters are modeled as an explicit tagged tree ([`Predicate`]) with two
//! evaluators that must never diverge: the in-memory evaluator here
//! ([`Predicate::matches`]) and the SQL translation in the SQLite store
//! backend. Every listing — native-queried collections and in-memory
//! filtered files — goes through the same tree.
//!
//! # Date comparator semantics
//!
//! Given a reference date `D` and a candidate timestamp `C` (epoch millis),
//! with `[start, end]` the UTC day window of `D`:
//!
//! | Comparator | Meaning |
//! |------------|---------|
//! | `EQ`   | `start <= C <= end` (AND of two range bounds) |
//! | `DIFF` | `C < start || C > end` (OR of two open bounds) |
//! | `GT`   | `C > end` |
//! | `GTE`  | `C >= start` |
//! | `LT`   | `C < start` |
//! | `LTE`  | `C <= end` |
//! | `NONE` | no date filter |

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::error::Error;

/// A field value a predicate can compare against.
///
/// Comparisons are only defined between values of the same variant; a
/// cross-variant comparison never matches.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Str(String),
    Int(i64),
    Bool(bool),
}

impl FieldValue {
    pub fn str(value: impl Into<String>) -> Self {
        Self::Str(value.into())
    }

    pub(crate) fn compare(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Str(a), FieldValue::Str(b)) => Some(a.cmp(b)),
            (FieldValue::Int(a), FieldValue::Int(b)) => Some(a.cmp(b)),
            (FieldValue::Bool(a), FieldValue::Bool(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Range bound operator for [`Predicate::Range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
}

impl RangeOp {
    fn allows(&self, ordering: Ordering) -> bool {
        match self {
            RangeOp::Gt => ordering == Ordering::Greater,
            RangeOp::Gte => ordering != Ordering::Less,
            RangeOp::Lt => ordering == Ordering::Less,
            RangeOp::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Composite boolean predicate over document fields.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Equals { field: String, value: FieldValue },
    Range { field: String, op: RangeOp, value: FieldValue },
    /// Case-insensitive substring match. Only usable where the target
    /// supports it (in-memory evaluation, SQL `LIKE`).
    Contains { field: String, needle: String },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

/// Anything a predicate can be evaluated against in memory.
///
/// An absent field never matches `Equals`/`Range`/`Contains`.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<FieldValue>;
}

impl Predicate {
    pub fn equals(field: impl Into<String>, value: FieldValue) -> Self {
        Self::Equals {
            field: field.into(),
            value,
        }
    }

    pub fn range(field: impl Into<String>, op: RangeOp, value: FieldValue) -> Self {
        Self::Range {
            field: field.into(),
            op,
            value,
        }
    }

    pub fn contains(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::Contains {
            field: field.into(),
            needle: needle.into(),
        }
    }

    /// In-memory evaluation, semantically identical to the SQL translation.
    pub fn matches(&self, source: &dyn FieldSource) -> bool {
        match self {
            Predicate::Equals { field, value } => {
                source.field(field).as_ref() == Some(value)
            }
            Predicate::Range { field, op, value } => source
                .field(field)
                .and_then(|candidate| candidate.compare(value))
                .map(|ordering| op.allows(ordering))
                .unwrap_or(false),
            Predicate::Contains { field, needle } => match source.field(field) {
                Some(FieldValue::Str(haystack)) => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => false,
            },
            Predicate::And(parts) => parts.iter().all(|p| p.matches(source)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(source)),
        }
    }
}

/// Combine active sub-filters with logical AND.
///
/// A single filter is used directly rather than wrapped in a one-element
/// composite; no filters collapse to "match all".
pub fn and_all(mut filters: Vec<Predicate>) -> Option<Predicate> {
    match filters.len() {
        0 => None,
        1 => Some(filters.remove(0)),
        _ => Some(Predicate::And(filters)),
    }
}

// ============ Date filters ============

/// Comparator applied to a reference date when filtering by timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateComparator {
    Eq,
    Diff,
    Gt,
    Gte,
    Lt,
    Lte,
    #[default]
    None,
}

impl FromStr for DateComparator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "eq" => Ok(Self::Eq),
            "diff" => Ok(Self::Diff),
            "gt" => Ok(Self::Gt),
            "gte" => Ok(Self::Gte),
            "lt" => Ok(Self::Lt),
            "lte" => Ok(Self::Lte),
            "none" | "" => Ok(Self::None),
            other => Err(Error::validation(
                "dateCmp",
                format!("unknown date comparator « {other} »"),
            )),
        }
    }
}

/// Parse an ISO `YYYY-MM-DD` date from a boundary parameter.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate, Error> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::validation("date", format!("invalid ISO date « {s} »")))
}

/// UTC day window of `date` as `[start, end]` epoch millis, end inclusive.
pub fn day_bounds(date: NaiveDate) -> (i64, i64) {
    let start = date.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis();
    (start, start + 86_400_000 - 1)
}

/// Date sub-filter over an epoch-millis `field`, per the comparator table
/// in the module docs. `NONE` produces no filter.
pub fn date_predicate(field: &str, date: NaiveDate, cmp: DateComparator) -> Option<Predicate> {
    let (start, end) = day_bounds(date);
    match cmp {
        DateComparator::Eq => Some(Predicate::And(vec![
            Predicate::range(field, RangeOp::Gte, FieldValue::Int(start)),
            Predicate::range(field, RangeOp::Lte, FieldValue::Int(end)),
        ])),
        DateComparator::Diff => Some(Predicate::Or(vec![
            Predicate::range(field, RangeOp::Lt, FieldValue::Int(start)),
            Predicate::range(field, RangeOp::Gt, FieldValue::Int(end)),
        ])),
        DateComparator::Gt => Some(Predicate::range(field, RangeOp::Gt, FieldValue::Int(end))),
        DateComparator::Gte => Some(Predicate::range(field, RangeOp::Gte, FieldValue::Int(start))),
        DateComparator::Lt => Some(Predicate::range(field, RangeOp::Lt, FieldValue::Int(start))),
        DateComparator::Lte => Some(Predicate::range(field, RangeOp::Lte, FieldValue::Int(end))),
        DateComparator::None => None,
    }
}

// ============ Boundary enums ============

/// Visibility scope for collection listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectionState {
    #[default]
    All,
    Public,
    Private,
}

impl FromStr for CollectionState {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "public" => Ok(Self::Public),
            "private" => Ok(Self::Private),
            other => Err(Error::validation(
                "state",
                format!("unknown collection state « {other} »"),
            )),
        }
    }
}

/// Sort direction for paged listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortDirection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" | "" => Ok(Self::Desc),
            other => Err(Error::validation(
                "direction",
                format!("unknown sort direction « {other} »"),
            )),
        }
    }
}

/// Processing state carried in blob-level metadata.
///
/// `All` is a filter-only pseudo-state; stored metadata that is unset or
/// unparsable reads as [`FileStatus::Pending`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileStatus {
    #[default]
    All,
    Pending,
    Processing,
    Indexed,
    Failed,
}

impl FileStatus {
    /// Parse the `status` metadata entry of a stored blob.
    pub fn from_metadata(value: Option<&str>) -> Self {
        match value.map(|v| v.to_ascii_lowercase()).as_deref() {
            Some("pending") => Self::Pending,
            Some("processing") => Self::Processing,
            Some("indexed") => Self::Indexed,
            Some("failed") => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Indexed => "indexed",
            Self::Failed => "failed",
        }
    }
}

impl FromStr for FileStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "indexed" => Ok(Self::Indexed),
            "failed" => Ok(Self::Failed),
            other => Err(Error::validation(
                "status",
                format!("unknown file status « {other} »"),
            )),
        }
    }
}

/// Sort key for the file listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSortKey {
    Name,
    Size,
    UpdateTime,
    CreateTime,
}

impl FromStr for FileSortKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "name" => Ok(Self::Name),
            "size" => Ok(Self::Size),
            "updatetime" | "update_time" => Ok(Self::UpdateTime),
            "createtime" | "create_time" => Ok(Self::CreateTime),
            other => Err(Error::validation(
                "sortBy",
                format!("unknown sort field « {other} »"),
            )),
        }
    }
}
