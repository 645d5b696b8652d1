//! Bean property values
//!
//! A [`BeanValue`] is anything a bean property can hold: a scalar the literal
//! codec understands, a bare URI, a reference to another bean, or a
//! collection of these.

use super::bean::SharedBean;
use crate::schema::CollectionFlavor;
use chrono::{DateTime, Utc};
use oxrdf::NamedNode;
use std::cmp::Ordering;
use std::fmt;

/// Property value supporting the mapped data types
#[derive(Debug, Clone, PartialEq)]
pub enum BeanValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(DateTime<Utc>),
    /// Bare URI reference (kept as-is, not resolved to a bean)
    Uri(NamedNode),
    /// Reference to another bean; shared references and cycles in an object
    /// graph are expressed through the same `SharedBean` handle
    Ref(SharedBean),
    Collection(Vec<BeanValue>),
}

impl BeanValue {
    /// Get the string if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            BeanValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the integer if this is an integer value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            BeanValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the float if this is a float value
    pub fn as_float(&self) -> Option<f64> {
        match self {
            BeanValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the boolean if this is a boolean value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            BeanValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the timestamp if this is a date-time value
    pub fn as_datetime(&self) -> Option<DateTime<Utc>> {
        match self {
            BeanValue::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Get the URI if this is a bare URI reference
    pub fn as_uri(&self) -> Option<&NamedNode> {
        match self {
            BeanValue::Uri(u) => Some(u),
            _ => None,
        }
    }

    /// Get the referenced bean if this is a bean reference
    pub fn as_bean(&self) -> Option<&SharedBean> {
        match self {
            BeanValue::Ref(b) => Some(b),
            _ => None,
        }
    }

    /// Get the elements if this is a collection
    pub fn as_collection(&self) -> Option<&[BeanValue]> {
        match self {
            BeanValue::Collection(items) => Some(items),
            _ => None,
        }
    }

    /// Get the value kind as a string
    pub fn kind_name(&self) -> &'static str {
        match self {
            BeanValue::String(_) => "String",
            BeanValue::Int(_) => "Int",
            BeanValue::Float(_) => "Float",
            BeanValue::Bool(_) => "Bool",
            BeanValue::DateTime(_) => "DateTime",
            BeanValue::Uri(_) => "Uri",
            BeanValue::Ref(_) => "Ref",
            BeanValue::Collection(_) => "Collection",
        }
    }

    /// Identity-aware element equality used when normalizing set flavors:
    /// bean references compare by handle identity, everything else
    /// structurally. Keeps dedup terminating on cyclic graphs.
    pub(crate) fn same_element(&self, other: &BeanValue) -> bool {
        match (self, other) {
            (BeanValue::Ref(a), BeanValue::Ref(b)) => a.ptr_eq(b),
            (BeanValue::Collection(a), BeanValue::Collection(b)) => {
                a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.same_element(y))
            }
            _ => self == other,
        }
    }

    /// Canonical total order for the sorted-set flavor: values group by kind,
    /// then order naturally within a kind. Bean references order by handle
    /// address (stable within one process).
    pub(crate) fn canonical_cmp(&self, other: &BeanValue) -> Ordering {
        fn rank(v: &BeanValue) -> u8 {
            match v {
                BeanValue::Bool(_) => 0,
                BeanValue::Int(_) => 1,
                BeanValue::Float(_) => 2,
                BeanValue::DateTime(_) => 3,
                BeanValue::String(_) => 4,
                BeanValue::Uri(_) => 5,
                BeanValue::Ref(_) => 6,
                BeanValue::Collection(_) => 7,
            }
        }
        match (self, other) {
            (BeanValue::Bool(a), BeanValue::Bool(b)) => a.cmp(b),
            (BeanValue::Int(a), BeanValue::Int(b)) => a.cmp(b),
            (BeanValue::Float(a), BeanValue::Float(b)) => a.total_cmp(b),
            (BeanValue::DateTime(a), BeanValue::DateTime(b)) => a.cmp(b),
            (BeanValue::String(a), BeanValue::String(b)) => a.cmp(b),
            (BeanValue::Uri(a), BeanValue::Uri(b)) => a.as_str().cmp(b.as_str()),
            (BeanValue::Ref(a), BeanValue::Ref(b)) => a.addr().cmp(&b.addr()),
            (BeanValue::Collection(a), BeanValue::Collection(b)) => {
                for (x, y) in a.iter().zip(b.iter()) {
                    match x.canonical_cmp(y) {
                        Ordering::Equal => continue,
                        ord => return ord,
                    }
                }
                a.len().cmp(&b.len())
            }
            _ => rank(self).cmp(&rank(other)),
        }
    }
}

impl fmt::Display for BeanValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BeanValue::String(s) => write!(f, "\"{}\"", s),
            BeanValue::Int(i) => write!(f, "{}", i),
            BeanValue::Float(fl) => write!(f, "{}", fl),
            BeanValue::Bool(b) => write!(f, "{}", b),
            BeanValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            BeanValue::Uri(u) => write!(f, "<{}>", u.as_str()),
            BeanValue::Ref(b) => write!(f, "ref({})", b.type_name()),
            BeanValue::Collection(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

// Convenience conversions
impl From<String> for BeanValue {
    fn from(s: String) -> Self {
        BeanValue::String(s)
    }
}

impl From<&str> for BeanValue {
    fn from(s: &str) -> Self {
        BeanValue::String(s.to_string())
    }
}

impl From<i64> for BeanValue {
    fn from(i: i64) -> Self {
        BeanValue::Int(i)
    }
}

impl From<i32> for BeanValue {
    fn from(i: i32) -> Self {
        BeanValue::Int(i as i64)
    }
}

impl From<f64> for BeanValue {
    fn from(f: f64) -> Self {
        BeanValue::Float(f)
    }
}

impl From<bool> for BeanValue {
    fn from(b: bool) -> Self {
        BeanValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for BeanValue {
    fn from(dt: DateTime<Utc>) -> Self {
        BeanValue::DateTime(dt)
    }
}

impl From<NamedNode> for BeanValue {
    fn from(node: NamedNode) -> Self {
        BeanValue::Uri(node)
    }
}

impl From<SharedBean> for BeanValue {
    fn from(bean: SharedBean) -> Self {
        BeanValue::Ref(bean)
    }
}

impl From<Vec<BeanValue>> for BeanValue {
    fn from(items: Vec<BeanValue>) -> Self {
        BeanValue::Collection(items)
    }
}

/// Shape a gathered element list to the declared collection flavor:
/// a plain list keeps order and duplicates, a set dedups preserving first
/// encounter order, a sorted set dedups and sorts canonically.
pub(crate) fn normalize_collection(
    items: Vec<BeanValue>,
    flavor: CollectionFlavor,
) -> Vec<BeanValue> {
    match flavor {
        CollectionFlavor::List => items,
        CollectionFlavor::Set => dedup_in_order(items),
        CollectionFlavor::SortedSet => {
            let mut unique = dedup_in_order(items);
            unique.sort_by(|a, b| a.canonical_cmp(b));
            unique
        }
    }
}

fn dedup_in_order(items: Vec<BeanValue>) -> Vec<BeanValue> {
    let mut unique: Vec<BeanValue> = Vec::with_capacity(items.len());
    for item in items {
        if !unique.iter().any(|seen| seen.same_element(&item)) {
            unique.push(item);
        }
    }
    unique
}
