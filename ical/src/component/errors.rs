// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! `X-LIC-ERROR` bookkeeping: malformed input recorded in place.

use crate::component::Component;
use crate::keyword::{
    KW_ERROR_COMPONENT_PARSE, KW_ERROR_PARAMETER_NAME_PARSE, KW_ERROR_PARAMETER_VALUE_PARSE,
    KW_ERROR_PROPERTY_PARSE, KW_ERROR_VALUE_PARSE,
};
use crate::parameter::{Parameter, ParameterKind};
use crate::property::{Property, PropertyKind};
use crate::value::Value;

impl Component {
    /// Records malformed input as an `X-LIC-ERROR` property tagged with
    /// an `X-LIC-ERRORTYPE` such as `VALUE-PARSE-ERROR`.
    pub fn add_error(&mut self, error_type: &str, message: impl Into<String>) {
        let mut prop = Property::with_value(PropertyKind::XLicError, Value::Text(message.into()));
        prop.add_parameter(Parameter::XLicErrorType(error_type.to_string()));
        self.add_property(prop);
    }

    /// Number of `X-LIC-ERROR` properties in the whole subtree.
    #[must_use]
    pub fn count_errors(&self) -> usize {
        self.count_properties(PropertyKind::XLicError)
            + self
                .components()
                .iter()
                .map(Component::count_errors)
                .sum::<usize>()
    }

    /// Removes every `X-LIC-ERROR` property in the subtree.
    pub fn strip_errors(&mut self) {
        self.remove_properties(PropertyKind::XLicError);
        for child in self.components_mut() {
            child.strip_errors();
        }
    }

    /// Replaces `X-LIC-ERROR` properties of a known error type by
    /// `REQUEST-STATUS` properties, as a reply to the sender would carry
    /// them. Errors of other types are left in place.
    pub fn convert_errors(&mut self) {
        let mut index = 0;
        while let Some(prop) = self.properties().get(index) {
            let status = (prop.kind() == PropertyKind::XLicError)
                .then(|| request_status(prop))
                .flatten();
            match status {
                Some(status) => {
                    self.remove_property_at(index);
                    self.add_property(status);
                }
                None => index += 1,
            }
        }

        for child in self.components_mut() {
            child.convert_errors();
        }
    }
}

fn request_status(prop: &Property) -> Option<Property> {
    let error_type = match prop.first_parameter(ParameterKind::XLicErrorType)? {
        Parameter::XLicErrorType(t) => t.as_str(),
        _ => return None,
    };
    let (code, description) = [
        (KW_ERROR_PARAMETER_NAME_PARSE, "3.2", "Invalid property parameter."),
        (KW_ERROR_PARAMETER_VALUE_PARSE, "3.3", "Invalid property parameter value."),
        (KW_ERROR_PROPERTY_PARSE, "3.0", "Invalid property name."),
        (KW_ERROR_VALUE_PARSE, "3.1", "Invalid property value."),
        (KW_ERROR_COMPONENT_PARSE, "3.4", "Invalid calendar component sequence."),
    ]
    .into_iter()
    .find(|(kw, _, _)| error_type.eq_ignore_ascii_case(kw))
    .map(|(_, code, description)| (code, description))?;

    let debug = prop.text().unwrap_or_default();
    Some(Property::with_value(
        PropertyKind::RequestStatus,
        Value::X(format!("{code};{description};{debug}")),
    ))
}
