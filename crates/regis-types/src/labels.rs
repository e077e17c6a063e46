//! Label selectors.
//!
//! The registry only needs the [`LabelSelector`] capability. [`Selector`] is
//! the stock implementation: a conjunction of [`Expression`]s.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::meta::Labels;

/// A predicate over a label mapping.
pub trait LabelSelector {
    fn matches(&self, labels: &Labels) -> bool;
}

impl<T: LabelSelector + ?Sized> LabelSelector for &T {
    fn matches(&self, labels: &Labels) -> bool {
        (**self).matches(labels)
    }
}

impl<T: LabelSelector + ?Sized> LabelSelector for Box<T> {
    fn matches(&self, labels: &Labels) -> bool {
        (**self).matches(labels)
    }
}

/// Selector that matches every label set.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Everything;

impl LabelSelector for Everything {
    fn matches(&self, _labels: &Labels) -> bool {
        true
    }
}

/// A single requirement on a label set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub enum Expression {
    In(String, BTreeSet<String>),
    NotIn(String, BTreeSet<String>),
    Equal(String, String),
    NotEqual(String, String),
    Exists(String),
    DoesNotExist(String),
}

impl Expression {
    pub fn equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equal(key.into(), value.into())
    }

    pub fn not_equal(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::NotEqual(key.into(), value.into())
    }

    pub fn is_in<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::In(key.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn not_in<I, V>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        Self::NotIn(key.into(), values.into_iter().map(Into::into).collect())
    }

    pub fn exists(key: impl Into<String>) -> Self {
        Self::Exists(key.into())
    }

    pub fn does_not_exist(key: impl Into<String>) -> Self {
        Self::DoesNotExist(key.into())
    }

    fn matches(&self, labels: &Labels) -> bool {
        match self {
            Self::In(key, values) => labels.get(key).is_some_and(|v| values.contains(v)),
            Self::NotIn(key, values) => labels.get(key).map_or(true, |v| !values.contains(v)),
            Self::Equal(key, value) => labels.get(key) == Some(value),
            Self::NotEqual(key, value) => labels.get(key) != Some(value),
            Self::Exists(key) => labels.contains_key(key),
            Self::DoesNotExist(key) => !labels.contains_key(key),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |values: &BTreeSet<String>| {
            values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
        };
        match self {
            Self::In(key, values) => write!(f, "{key} in ({})", join(values)),
            Self::NotIn(key, values) => write!(f, "{key} notin ({})", join(values)),
            Self::Equal(key, value) => write!(f, "{key}={value}"),
            Self::NotEqual(key, value) => write!(f, "{key}!={value}"),
            Self::Exists(key) => write!(f, "{key}"),
            Self::DoesNotExist(key) => write!(f, "!{key}"),
        }
    }
}

/// Conjunction of label expressions. The empty selector matches everything.
#[derive(Clone, Debug, Eq, PartialEq, Default, Deserialize, Serialize)]
pub struct Selector(Vec<Expression>);

impl Selector {
    /// A selector with no requirements.
    pub fn everything() -> Self {
        Self::default()
    }

    /// Add a requirement.
    pub fn and(mut self, expr: Expression) -> Self {
        self.0.push(expr);
        self
    }

    /// Returns `true` if the selector places no requirements.
    pub fn selects_all(&self) -> bool {
        self.0.is_empty()
    }

    pub fn expressions(&self) -> &[Expression] {
        &self.0
    }
}

impl LabelSelector for Selector {
    fn matches(&self, labels: &Labels) -> bool {
        self.0.iter().all(|expr| expr.matches(labels))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let exprs: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", exprs.join(","))
    }
}

impl FromIterator<(String, String)> for Selector {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| Expression::Equal(k, v)).collect())
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for Selector {
    fn from_iter<T: IntoIterator<Item = (&'a str, &'a str)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| Expression::equal(k, v)).collect())
    }
}

impl FromIterator<Expression> for Selector {
    fn from_iter<T: IntoIterator<Item = Expression>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Expression> for Selector {
    fn from(value: Expression) -> Self {
        Self(vec![value])
    }
}
