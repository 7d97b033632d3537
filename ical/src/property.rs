// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Properties: a kind, an optional group, one value and an ordered list of
//! parameters.
//!
//! Parameters keep insertion order and may repeat. Besides borrowing
//! iteration with [`Property::parameters_of`], a property carries a cursor
//! so callers can walk its parameters with
//! [`Property::get_first_parameter`] and [`Property::get_next_parameter`].

mod kind;

pub use kind::PropertyKind;

use crate::error::Error;
use crate::keyword::KW_VALUE;
use crate::parameter::{Parameter, ParameterKind};
use crate::value::{Value, ValueKind};

/// An iCalendar property.
#[derive(Debug)]
pub struct Property {
    kind: PropertyKind,
    x_name: Option<String>,
    group: Option<String>,
    value: Option<Value>,
    parameters: Vec<Parameter>,
    cursor: Option<usize>,
}

impl Clone for Property {
    /// Deep copy; the parameter cursor of the copy is reset.
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            x_name: self.x_name.clone(),
            group: self.group.clone(),
            value: self.value.clone(),
            parameters: self.parameters.clone(),
            cursor: None,
        }
    }
}

impl PartialEq for Property {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name() == other.name()
            && self.group == other.group
            && self.value == other.value
            && self.parameters == other.parameters
    }
}

impl Property {
    /// Creates a property of a standard kind without a value.
    #[must_use]
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            kind,
            x_name: None,
            group: None,
            value: None,
            parameters: Vec::new(),
            cursor: None,
        }
    }

    /// Creates a property of a standard kind holding `value`.
    #[must_use]
    pub fn with_value(kind: PropertyKind, value: impl Into<Value>) -> Self {
        let mut prop = Self::new(kind);
        prop.set_value(value.into());
        prop
    }

    /// Creates an experimental property, e.g. `X-WR-CALNAME`, with a raw value.
    #[must_use]
    pub fn new_x(name: impl Into<String>, value: impl Into<String>) -> Self {
        let mut prop = Self::from_name(&name.into());
        prop.set_value(Value::X(value.into()));
        prop
    }

    /// Creates an empty property from a name as written in a content line.
    ///
    /// Standard names resolve to their kind; anything else becomes
    /// [`PropertyKind::X`] keeping the name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.parse::<PropertyKind>() {
            Ok(kind) => Self::new(kind),
            Err(()) => Self {
                x_name: Some(name.to_string()),
                ..Self::new(PropertyKind::X)
            },
        }
    }

    /// The kind of this property.
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// The property name, e.g. `DTSTART` or `X-WR-CALNAME`.
    #[must_use]
    pub fn name(&self) -> &str {
        self.x_name.as_deref().unwrap_or(self.kind.name())
    }

    /// The group prefix (`item1` in `item1.URL`), if any.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }

    /// Sets or clears the group prefix.
    pub fn set_group(&mut self, group: Option<String>) {
        self.group = group;
    }

    /// The value, if one has been set.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// Replaces the value.
    ///
    /// The `VALUE` parameter follows the value: it is set when the data type
    /// differs from the default of this property and removed otherwise.
    pub fn set_value(&mut self, value: Value) {
        self.sync_value_parameter(value.kind());
        self.value = Some(value);
    }

    /// Removes and returns the value.
    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    /// The data type of the value: the one of the stored value, else the one
    /// named by a `VALUE` parameter, else the default of the kind.
    #[must_use]
    pub fn value_kind(&self) -> ValueKind {
        if let Some(value) = &self.value {
            return value.kind();
        }
        self.declared_value_kind()
    }

    /// Parses `text` according to the declared data type and stores it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedData`] when `text` does not conform to the
    /// data type; the property is left unchanged.
    pub fn set_value_from_str(&mut self, text: &str) -> Result<(), Error> {
        let kind = self.declared_value_kind();
        let value = if self.kind == PropertyKind::Uid && kind == ValueKind::Text {
            // UIDs are opaque: neither escaped nor unescaped
            Value::Text(text.to_string())
        } else {
            Value::parse(kind, text)?
        };
        self.set_value(value);
        Ok(())
    }

    /// The value as it appears in a content line, escaped where the data
    /// type requires it.
    #[must_use]
    pub fn value_as_string(&self) -> Option<String> {
        match (&self.value, self.kind) {
            (Some(Value::Text(uid)), PropertyKind::Uid) => Some(uid.clone()),
            (Some(value), _) => Some(value.to_string()),
            (None, _) => None,
        }
    }

    /// The unescaped text of a text-like value.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.value.as_ref()?.as_str()
    }

    /// All parameters in order.
    #[must_use]
    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Appends a parameter, keeping any existing one of the same kind.
    pub fn add_parameter(&mut self, param: Parameter) {
        self.parameters.push(param);
    }

    /// Replaces every parameter with the same name by `param`, in place of
    /// the first of them.
    pub fn set_parameter(&mut self, param: Parameter) {
        let name = param.name().to_string();
        match self.parameters.iter().position(|p| p.has_name(&name)) {
            Some(index) => {
                #[expect(clippy::indexing_slicing)]
                let slot = &mut self.parameters[index];
                *slot = param;
                let mut i = 0;
                self.parameters.retain(|p| {
                    let keep = i == index || !p.has_name(&name);
                    i += 1;
                    keep
                });
            }
            None => self.parameters.push(param),
        }
        self.cursor = None;
    }

    /// Removes every parameter of `kind` and returns how many were removed.
    pub fn remove_parameters(&mut self, kind: ParameterKind) -> usize {
        let before = self.parameters.len();
        self.parameters.retain(|p| !p.kind().matches(kind));
        self.cursor = None;
        before - self.parameters.len()
    }

    /// Removes every parameter named `name`, ignoring case.
    pub fn remove_parameters_by_name(&mut self, name: &str) -> usize {
        let before = self.parameters.len();
        self.parameters.retain(|p| !p.has_name(name));
        self.cursor = None;
        before - self.parameters.len()
    }

    /// Number of parameters of `kind`; [`ParameterKind::Any`] counts all.
    #[must_use]
    pub fn count_parameters(&self, kind: ParameterKind) -> usize {
        self.parameters_of(kind).count()
    }

    /// Iterates the parameters of `kind` without touching the cursor.
    pub fn parameters_of(&self, kind: ParameterKind) -> impl Iterator<Item = &Parameter> {
        self.parameters.iter().filter(move |p| p.kind().matches(kind))
    }

    /// First parameter of `kind` without touching the cursor.
    #[must_use]
    pub fn first_parameter(&self, kind: ParameterKind) -> Option<&Parameter> {
        self.parameters_of(kind).next()
    }

    /// First parameter named `name`, ignoring case.
    #[must_use]
    pub fn parameter_by_name(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.has_name(name))
    }

    /// Moves the cursor to the first parameter of `kind` and returns it.
    pub fn get_first_parameter(&mut self, kind: ParameterKind) -> Option<&Parameter> {
        self.cursor = self.parameters.iter().position(|p| p.kind().matches(kind));
        self.cursor.and_then(|i| self.parameters.get(i))
    }

    /// Advances the cursor to the next parameter of `kind` and returns it.
    ///
    /// Returns `None` once the list is exhausted or when the cursor was
    /// never positioned.
    pub fn get_next_parameter(&mut self, kind: ParameterKind) -> Option<&Parameter> {
        let start = self.cursor? + 1;
        let found = self
            .parameters
            .get(start..)
            .and_then(|rest| rest.iter().position(|p| p.kind().matches(kind)));
        self.cursor = match found {
            Some(offset) => Some(start + offset),
            None => Some(self.parameters.len()),
        };
        found.and_then(|_| self.cursor.and_then(|i| self.parameters.get(i)))
    }

    /// The `TZID` parameter, if any.
    #[must_use]
    pub fn tzid(&self) -> Option<&str> {
        self.parameters.iter().find_map(|p| match p {
            Parameter::Tzid(tzid) => Some(tzid.as_str()),
            _ => None,
        })
    }

    /// Serializes this property as a folded content line ending in CRLF.
    #[must_use]
    pub fn as_text(&self) -> String {
        crate::formatter::format_property(self).unwrap_or_default()
    }

    fn declared_value_kind(&self) -> ValueKind {
        for param in &self.parameters {
            match param {
                Parameter::Value(kind) => return *kind,
                Parameter::X { name, .. } if name.eq_ignore_ascii_case(KW_VALUE) => {
                    return ValueKind::X;
                }
                _ => {}
            }
        }
        self.kind.default_value_kind()
    }

    fn sync_value_parameter(&mut self, kind: ValueKind) {
        if kind == ValueKind::X {
            // an unknown VALUE= name is kept verbatim next to raw data
            self.parameters
                .retain(|p| !matches!(p, Parameter::Value(_)));
        } else if kind == self.kind.default_value_kind() {
            self.remove_parameters_by_name(KW_VALUE);
        } else {
            self.set_parameter(Parameter::Value(kind));
        }
        self.cursor = None;
    }
}
