// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Gauges: predicates selecting components of a set.
//!
//! A gauge is a tree of AND/OR nodes over comparisons between a property
//! of the component and a literal. The literal is parsed into the data
//! type of the property it is compared with, so `DTSTART < 20250101T000000Z`
//! compares date-times and `SEQUENCE >= 2` compares integers.
//!
//! Components are matched in canonical form: a VCALENDAR is compared
//! through its first VEVENT, VTODO or VJOURNAL. A path such as
//! `VALARM.TRIGGER` looks into the first child of that kind.

use std::fmt;
use std::str::FromStr;

use almanac_ical::{
    CalTime, CompareType, Component, ComponentKind, Comparison, Environment, Parameter,
    ParameterKind, Property, Value,
};
use jiff::Timestamp;
use regex::Regex;

use crate::StoreError;

/// A property addressed by a gauge, optionally inside a child component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyPath {
    component: Option<ComponentKind>,
    property: String,
}

impl PropertyPath {
    /// A property of the matched component itself.
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            component: None,
            property: property.into(),
        }
    }

    /// A property of the first child of `component`.
    pub fn inside(component: ComponentKind, property: impl Into<String>) -> Self {
        Self {
            component: Some(component),
            property: property.into(),
        }
    }

    /// The kind of child component qualifying the path.
    #[must_use]
    pub const fn component(&self) -> Option<ComponentKind> {
        self.component
    }

    /// The property name.
    #[must_use]
    pub fn property(&self) -> &str {
        &self.property
    }
}

impl FromStr for PropertyPath {
    type Err = StoreError;

    /// Parses `NAME` or `COMPONENT.NAME`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StoreError::BadArgument(format!("invalid property path {s:?}"));
        match s.split_once('.') {
            None if !s.is_empty() => Ok(Self::new(s)),
            Some((component, property)) if !component.is_empty() && !property.is_empty() => {
                let kind = component.parse().map_err(|()| invalid())?;
                Ok(Self::inside(kind, property))
            }
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(component) = self.component {
            write!(f, "{component}.")?;
        }
        f.write_str(&self.property)
    }
}

/// One comparison of a gauge.
#[derive(Debug, Clone)]
pub struct Condition {
    path: PropertyPath,
    compare: CompareType,
    literal: String,
    pattern: Option<Regex>,
}

impl Condition {
    /// A comparison of the property at `path` against `literal`, written
    /// as in a content line.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadArgument`] if `compare` is
    /// [`CompareType::Regex`] and `literal` is not a valid expression.
    pub fn new(
        path: PropertyPath,
        compare: CompareType,
        literal: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let literal = literal.into();
        let pattern = match compare {
            CompareType::Regex => Some(Regex::new(&literal).map_err(|e| {
                StoreError::BadArgument(format!("invalid pattern for {path}: {e}"))
            })?),
            _ => None,
        };
        Ok(Self {
            path,
            compare,
            literal,
            pattern,
        })
    }

    /// The addressed property.
    #[must_use]
    pub const fn path(&self) -> &PropertyPath {
        &self.path
    }

    /// The comparison operator.
    #[must_use]
    pub const fn compare(&self) -> CompareType {
        self.compare
    }

    fn matches(&self, inner: &Component, env: &Environment) -> bool {
        let target = match self.path.component {
            Some(kind) => inner.first_component(kind),
            None => Some(inner),
        };
        let property = target.and_then(|c| c.property_by_name(&self.path.property));

        let Some(property) = property else {
            return self.compare == CompareType::IsNull;
        };
        let Some(value) = property.value() else {
            return self.compare == CompareType::IsNull;
        };

        match self.compare {
            CompareType::IsNull => false,
            CompareType::IsNotNull => true,
            CompareType::Regex => {
                let text = match value.as_str() {
                    Some(text) => text.to_string(),
                    None => value.to_string(),
                };
                self.pattern.as_ref().is_some_and(|re| re.is_match(&text))
            }
            compare => match Value::parse(property.value_kind(), &self.literal) {
                Ok(literal) => holds(compare, relate(property, value, &literal, env)),
                Err(err) => {
                    tracing::debug!(path = %self.path, literal = self.literal, %err, "gauge literal does not parse");
                    false
                }
            },
        }
    }
}

/// Orders a property value against a literal. A UTC literal against a zoned
/// or floating time is compared by instant, with the property's `TZID`.
fn relate(property: &Property, value: &Value, literal: &Value, env: &Environment) -> Comparison {
    match value.compare(literal) {
        Comparison::Unordered => {
            match (CalTime::from_property(property), CalTime::from_value(literal, None)) {
                (Some(a), Some(b)) => a.compare(&b, env).into(),
                _ => Comparison::Unordered,
            }
        }
        rel => rel,
    }
}

fn holds(compare: CompareType, rel: Comparison) -> bool {
    match compare {
        CompareType::Equal => rel == Comparison::Equal,
        CompareType::NotEqual => rel != Comparison::Equal,
        CompareType::Less => rel == Comparison::Less,
        CompareType::Greater => rel == Comparison::Greater,
        CompareType::LessEqual => matches!(rel, Comparison::Less | Comparison::Equal),
        CompareType::GreaterEqual => matches!(rel, Comparison::Greater | Comparison::Equal),
        CompareType::Regex | CompareType::IsNull | CompareType::IsNotNull => false,
    }
}

/// The predicate tree of a gauge.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Every branch holds; an empty list always holds
    And(Vec<Expr>),
    /// Some branch holds; an empty list never holds
    Or(Vec<Expr>),
    /// A single comparison
    Compare(Condition),
    /// The matched component is one of these kinds
    Kind(Vec<ComponentKind>),
}

impl Expr {
    fn eval(&self, inner: &Component, env: &Environment) -> bool {
        match self {
            Expr::And(branches) => branches.iter().all(|e| e.eval(inner, env)),
            Expr::Or(branches) => branches.iter().any(|e| e.eval(inner, env)),
            Expr::Compare(condition) => condition.matches(inner, env),
            Expr::Kind(kinds) => kinds.contains(&inner.kind()),
        }
    }
}

impl From<Condition> for Expr {
    fn from(condition: Condition) -> Self {
        Expr::Compare(condition)
    }
}

/// A compiled filter over components.
#[derive(Debug, Clone)]
pub struct Gauge {
    from: Vec<ComponentKind>,
    expr: Option<Expr>,
    expand: bool,
    range: Option<(Timestamp, Timestamp)>,
}

impl Gauge {
    /// A gauge testing `expr`.
    pub fn new(expr: impl Into<Expr>) -> Self {
        Self {
            expr: Some(expr.into()),
            ..Self::all()
        }
    }

    /// A gauge every component passes.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            from: Vec::new(),
            expr: None,
            expand: false,
            range: None,
        }
    }

    /// Restricts matches to inner components of the given kinds.
    #[must_use]
    pub fn with_from(mut self, kinds: impl IntoIterator<Item = ComponentKind>) -> Self {
        self.from = kinds.into_iter().collect();
        self
    }

    /// Asks iteration to return one instance per occurrence of recurring
    /// components instead of the stored component.
    #[must_use]
    pub const fn with_expand(mut self, expand: bool) -> Self {
        self.expand = expand;
        self
    }

    /// Bounds recurrence expansion to occurrences overlapping
    /// `[start, end)`.
    #[must_use]
    pub const fn with_range(mut self, start: Timestamp, end: Timestamp) -> Self {
        self.range = Some((start, end));
        self
    }

    /// Builds a gauge from a query component.
    ///
    /// Each property of `query` becomes a comparison, with the operator
    /// taken from its `X-LIC-COMPARETYPE` parameter (EQUAL if absent).
    /// Properties of child components are compared with the same child of
    /// the target, as in `VALARM.TRIGGER`. All comparisons must hold. An
    /// XROOT holding several queries matches if any of them does. A query
    /// that is a VEVENT, VTODO or VJOURNAL only matches that kind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadArgument`] for an invalid `REGEX` pattern.
    pub fn from_component(query: &Component) -> Result<Self, StoreError> {
        if query.kind() == ComponentKind::XRoot {
            let branches = query
                .components()
                .iter()
                .map(|q| Self::from_component(q).map(Self::into_filter_expr))
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(Self::new(Expr::Or(branches)));
        }

        let mut conditions = Vec::new();
        for prop in query.properties() {
            conditions.push(condition_from_property(None, prop)?.into());
        }
        for child in query.components() {
            for prop in child.properties() {
                conditions.push(condition_from_property(Some(child.kind()), prop)?.into());
            }
        }

        let gauge = Self::new(Expr::And(conditions));
        Ok(match query.kind() {
            kind @ (ComponentKind::VEvent | ComponentKind::VTodo | ComponentKind::VJournal) => {
                gauge.with_from([kind])
            }
            _ => gauge,
        })
    }

    /// Whether expansion of recurring components was requested.
    #[must_use]
    pub const fn expand(&self) -> bool {
        self.expand
    }

    /// The expansion window, if any.
    #[must_use]
    pub const fn range(&self) -> Option<(Timestamp, Timestamp)> {
        self.range
    }

    /// The component kinds a match is restricted to; empty means any.
    #[must_use]
    pub fn from(&self) -> &[ComponentKind] {
        &self.from
    }

    /// Whether `component` passes the gauge, with zones resolved through
    /// the default environment.
    ///
    /// A property missing from the component fails every comparison except
    /// `ISNULL`.
    #[must_use]
    pub fn compare(&self, component: &Component) -> bool {
        self.compare_in(component, &Environment::default())
    }

    /// Like [`Gauge::compare`], resolving zones through `env`.
    #[must_use]
    pub fn compare_in(&self, component: &Component, env: &Environment) -> bool {
        let Some(inner) = component.get_inner() else {
            return false;
        };
        if !self.from.is_empty() && !self.from.contains(&inner.kind()) {
            return false;
        }
        self.expr.as_ref().is_none_or(|e| e.eval(inner, env))
    }

    /// Folds the FROM list into the predicate so several gauges can be
    /// combined in one tree.
    fn into_filter_expr(self) -> Expr {
        let mut all = Vec::new();
        if !self.from.is_empty() {
            all.push(Expr::Kind(self.from));
        }
        all.extend(self.expr);
        Expr::And(all)
    }
}

fn condition_from_property(
    component: Option<ComponentKind>,
    prop: &Property,
) -> Result<Condition, StoreError> {
    let compare = match prop.first_parameter(ParameterKind::XLicCompareType) {
        Some(Parameter::XLicCompareType(compare)) => *compare,
        _ => CompareType::Equal,
    };
    let literal = match compare {
        CompareType::Regex => prop.text().map(str::to_string),
        _ => None,
    }
    .or_else(|| prop.value_as_string())
    .unwrap_or_default();

    let path = match component {
        Some(kind) => PropertyPath::inside(kind, prop.name()),
        None => PropertyPath::new(prop.name()),
    };
    Condition::new(path, compare, literal)
}
