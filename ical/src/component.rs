// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Components: the tree of `BEGIN`/`END` blocks of an iCalendar stream.
//!
//! A component exclusively owns its properties and child components.
//! Two iteration styles are offered for both lists:
//!
//! - the stateful form (`get_first_*` / `get_next_*`), which keeps one
//!   cursor per list inside the component, and
//! - the external form (`begin_*`), returning a cursor value that borrows
//!   the component and carries its own position, so several traversals can
//!   run side by side.

mod accessors;
mod errors;

use crate::keyword::{
    KW_ANY, KW_DAYLIGHT, KW_STANDARD, KW_VAGENDA, KW_VALARM, KW_VCALENDAR, KW_VEVENT,
    KW_VFREEBUSY, KW_VJOURNAL, KW_VQUERY, KW_VTIMEZONE, KW_VTODO, KW_X, KW_XROOT,
};
use crate::property::{Property, PropertyKind};

impl_kind_mapping! {
    /// Kinds of iCalendar components
    enum ComponentKind {
        /// VCALENDAR
        VCalendar => KW_VCALENDAR,
        /// VEVENT
        VEvent => KW_VEVENT,
        /// VTODO
        VTodo => KW_VTODO,
        /// VJOURNAL
        VJournal => KW_VJOURNAL,
        /// VALARM
        VAlarm => KW_VALARM,
        /// VTIMEZONE
        VTimezone => KW_VTIMEZONE,
        /// VFREEBUSY
        VFreeBusy => KW_VFREEBUSY,
        /// STANDARD, a VTIMEZONE observance
        Standard => KW_STANDARD,
        /// DAYLIGHT, a VTIMEZONE observance
        Daylight => KW_DAYLIGHT,
        /// VAGENDA, a calendar container keyed by RELCALID
        VAgenda => KW_VAGENDA,
        /// VQUERY, a stored gauge
        VQuery => KW_VQUERY,
        /// Synthetic root holding several top-level components
        XRoot => KW_XROOT,
        /// Experimental or unrecognized component
        X => KW_X,
        /// Wildcard used when searching; never carried by a component
        Any => KW_ANY,
    }
}

impl ComponentKind {
    /// Whether a component of this kind matches a search for `wanted`.
    #[must_use]
    pub fn matches(self, wanted: ComponentKind) -> bool {
        wanted == ComponentKind::Any || self == wanted
    }

    /// Kinds the convenience accessors look for inside a VCALENDAR.
    #[must_use]
    pub const fn is_real(self) -> bool {
        matches!(
            self,
            ComponentKind::VEvent
                | ComponentKind::VTodo
                | ComponentKind::VJournal
                | ComponentKind::VFreeBusy
                | ComponentKind::VQuery
                | ComponentKind::VAgenda
        )
    }

    /// Containers the convenience accessors look through.
    #[must_use]
    pub const fn is_container(self) -> bool {
        matches!(self, ComponentKind::VCalendar | ComponentKind::XRoot)
    }
}

/// An iCalendar component.
#[derive(Debug)]
pub struct Component {
    kind: ComponentKind,
    x_name: Option<String>,
    properties: Vec<Property>,
    components: Vec<Component>,
    property_cursor: Cursor,
    component_cursor: Cursor,
}

impl Clone for Component {
    /// Deep copy of the whole subtree. Cursors of the copy are reset.
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            x_name: self.x_name.clone(),
            properties: self.properties.clone(),
            components: self.components.clone(),
            property_cursor: Cursor::Unset,
            component_cursor: Cursor::Unset,
        }
    }
}

impl PartialEq for Component {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
            && self.name() == other.name()
            && self.properties == other.properties
            && self.components == other.components
    }
}

impl Component {
    /// Creates an empty component.
    #[must_use]
    pub fn new(kind: ComponentKind) -> Self {
        Self {
            kind,
            x_name: None,
            properties: Vec::new(),
            components: Vec::new(),
            property_cursor: Cursor::Unset,
            component_cursor: Cursor::Unset,
        }
    }

    /// Creates an empty component from a `BEGIN:` name. Unknown names give
    /// [`ComponentKind::X`] keeping the name.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.parse::<ComponentKind>() {
            Ok(kind) if kind != ComponentKind::X && kind != ComponentKind::Any => Self::new(kind),
            _ => Self {
                x_name: Some(name.to_string()),
                ..Self::new(ComponentKind::X)
            },
        }
    }

    /// The kind of this component.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// The name used in `BEGIN:`/`END:` lines.
    #[must_use]
    pub fn name(&self) -> &str {
        self.x_name.as_deref().unwrap_or(self.kind.name())
    }

    /// Serializes the subtree. XROOT contributes no `BEGIN`/`END` lines.
    #[must_use]
    pub fn as_text(&self) -> String {
        crate::formatter::format(self).unwrap_or_default()
    }

    // properties

    /// All properties in order.
    #[must_use]
    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    /// Mutable access to all properties in order.
    pub fn properties_mut(&mut self) -> impl Iterator<Item = &mut Property> {
        self.properties.iter_mut()
    }

    /// Appends a property.
    pub fn add_property(&mut self, property: Property) {
        self.properties.push(property);
    }

    /// Removes the first property equal to `property` and returns it.
    pub fn remove_property(&mut self, property: &Property) -> Option<Property> {
        let index = self.properties.iter().position(|p| p == property)?;
        self.remove_property_at(index)
    }

    /// Removes the property at `index`, keeping the stateful cursor on the
    /// same successor.
    pub fn remove_property_at(&mut self, index: usize) -> Option<Property> {
        if index >= self.properties.len() {
            return None;
        }
        self.property_cursor = self.property_cursor.after_removal(index);
        Some(self.properties.remove(index))
    }

    /// Removes every property of `kind` and returns how many were removed.
    pub fn remove_properties(&mut self, kind: PropertyKind) -> usize {
        let before = self.properties.len();
        self.properties.retain(|p| !p.kind().matches(kind));
        self.property_cursor = Cursor::Unset;
        before - self.properties.len()
    }

    /// Number of properties of `kind`; [`PropertyKind::Any`] counts all.
    #[must_use]
    pub fn count_properties(&self, kind: PropertyKind) -> usize {
        self.properties_of(kind).count()
    }

    /// Iterates properties of `kind` without touching the cursor.
    pub fn properties_of(&self, kind: PropertyKind) -> impl Iterator<Item = &Property> {
        self.properties.iter().filter(move |p| p.kind().matches(kind))
    }

    /// First property of `kind` without touching the cursor.
    #[must_use]
    pub fn first_property(&self, kind: PropertyKind) -> Option<&Property> {
        self.properties_of(kind).next()
    }

    /// Mutable first property of `kind`.
    pub fn first_property_mut(&mut self, kind: PropertyKind) -> Option<&mut Property> {
        self.properties.iter_mut().find(|p| p.kind().matches(kind))
    }

    /// First property with the given name, ignoring case. Useful for `X-`
    /// properties, which all share [`PropertyKind::X`].
    #[must_use]
    pub fn property_by_name(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }

    /// Moves the property cursor to the first property of `kind`.
    pub fn get_first_property(&mut self, kind: PropertyKind) -> Option<&Property> {
        let found = next_match(&self.properties, 0, |p| p.kind().matches(kind));
        self.property_cursor = Cursor::seek(found, self.properties.len());
        self.current_property()
    }

    /// Advances the property cursor to the next property of `kind`.
    pub fn get_next_property(&mut self, kind: PropertyKind) -> Option<&Property> {
        let start = self.property_cursor.next_start()?;
        let found = next_match(&self.properties, start, |p| p.kind().matches(kind));
        self.property_cursor = Cursor::seek(found, self.properties.len());
        self.current_property()
    }

    /// The property under the stateful cursor.
    #[must_use]
    pub fn current_property(&self) -> Option<&Property> {
        self.property_cursor.current().and_then(|i| self.properties.get(i))
    }

    /// Starts an independent traversal of the properties of `kind`.
    #[must_use]
    pub fn begin_property(&self, kind: PropertyKind) -> PropertyCursor<'_> {
        PropertyCursor::new(&self.properties, kind)
    }

    // components

    /// All child components in order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Mutable access to the child components in order.
    pub fn components_mut(&mut self) -> impl Iterator<Item = &mut Component> {
        self.components.iter_mut()
    }

    /// Appends a child component.
    pub fn add_component(&mut self, component: Component) {
        self.components.push(component);
    }

    /// Removes the first child equal to `component` and returns it.
    pub fn remove_component(&mut self, component: &Component) -> Option<Component> {
        let index = self.components.iter().position(|c| c == component)?;
        self.remove_component_at(index)
    }

    /// Removes the child at `index`, keeping the stateful cursor on the same
    /// successor.
    pub fn remove_component_at(&mut self, index: usize) -> Option<Component> {
        if index >= self.components.len() {
            return None;
        }
        self.component_cursor = self.component_cursor.after_removal(index);
        Some(self.components.remove(index))
    }

    /// Removes and returns all children.
    pub fn take_components(&mut self) -> Vec<Component> {
        self.component_cursor = Cursor::Unset;
        std::mem::take(&mut self.components)
    }

    /// Number of children of `kind`; [`ComponentKind::Any`] counts all.
    #[must_use]
    pub fn count_components(&self, kind: ComponentKind) -> usize {
        self.components_of(kind).count()
    }

    /// Iterates children of `kind` without touching the cursor.
    pub fn components_of(&self, kind: ComponentKind) -> impl Iterator<Item = &Component> {
        self.components.iter().filter(move |c| c.kind().matches(kind))
    }

    /// First child of `kind` without touching the cursor.
    #[must_use]
    pub fn first_component(&self, kind: ComponentKind) -> Option<&Component> {
        self.components_of(kind).next()
    }

    /// Mutable first child of `kind`.
    pub fn first_component_mut(&mut self, kind: ComponentKind) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.kind().matches(kind))
    }

    /// Moves the component cursor to the first child of `kind`.
    pub fn get_first_component(&mut self, kind: ComponentKind) -> Option<&Component> {
        let found = next_match(&self.components, 0, |c| c.kind().matches(kind));
        self.component_cursor = Cursor::seek(found, self.components.len());
        self.current_component()
    }

    /// Advances the component cursor to the next child of `kind`.
    pub fn get_next_component(&mut self, kind: ComponentKind) -> Option<&Component> {
        let start = self.component_cursor.next_start()?;
        let found = next_match(&self.components, start, |c| c.kind().matches(kind));
        self.component_cursor = Cursor::seek(found, self.components.len());
        self.current_component()
    }

    /// The child under the stateful cursor.
    #[must_use]
    pub fn current_component(&self) -> Option<&Component> {
        self.component_cursor.current().and_then(|i| self.components.get(i))
    }

    /// Starts an independent traversal of the children of `kind`.
    #[must_use]
    pub fn begin_component(&self, kind: ComponentKind) -> ComponentCursor<'_> {
        ComponentCursor::new(&self.components, kind)
    }

    /// First VEVENT, VTODO, VJOURNAL, VFREEBUSY, VQUERY or VAGENDA child.
    #[must_use]
    pub fn first_real_component(&self) -> Option<&Component> {
        self.components.iter().find(|c| c.kind().is_real())
    }

    /// Mutable form of [`Component::first_real_component`].
    pub fn first_real_component_mut(&mut self) -> Option<&mut Component> {
        self.components.iter_mut().find(|c| c.kind().is_real())
    }

    /// The component the convenience accessors act on: the first real child
    /// of a VCALENDAR (or XROOT), otherwise `self`.
    #[must_use]
    pub fn get_inner(&self) -> Option<&Component> {
        if self.kind.is_container() {
            self.first_real_component()
        } else {
            Some(self)
        }
    }

    /// Mutable form of [`Component::get_inner`].
    pub fn get_inner_mut(&mut self) -> Option<&mut Component> {
        if self.kind.is_container() {
            self.first_real_component_mut()
        } else {
            Some(self)
        }
    }
}

/// Position of a stateful traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// No traversal started
    Unset,
    /// On the item at this index
    At(usize),
    /// The current item was removed; the next search starts here
    Before(usize),
}

impl Cursor {
    /// Cursor on `found`, or past the end of a list of `len` items.
    fn seek(found: Option<usize>, len: usize) -> Self {
        Cursor::At(found.unwrap_or(len))
    }

    fn current(self) -> Option<usize> {
        match self {
            Cursor::At(i) => Some(i),
            Cursor::Unset | Cursor::Before(_) => None,
        }
    }

    fn next_start(self) -> Option<usize> {
        match self {
            Cursor::Unset => None,
            Cursor::At(i) => Some(i.saturating_add(1)),
            Cursor::Before(i) => Some(i),
        }
    }

    fn after_removal(self, removed: usize) -> Self {
        match self {
            Cursor::At(i) if removed < i => Cursor::At(i - 1),
            Cursor::At(i) if removed == i => Cursor::Before(i),
            Cursor::Before(i) if removed < i => Cursor::Before(i - 1),
            other => other,
        }
    }
}

fn next_match<T>(items: &[T], start: usize, pred: impl Fn(&T) -> bool) -> Option<usize> {
    items
        .get(start..)?
        .iter()
        .position(pred)
        .map(|offset| start + offset)
}

/// Independent cursor over the properties of one kind.
///
/// The cursor starts on the first match; [`PropertyCursor::get`] reads the
/// current property and [`PropertyCursor::advance`] moves on. It is also an
/// [`Iterator`] yielding the current property and everything after it.
#[derive(Debug, Clone)]
pub struct PropertyCursor<'a> {
    items: &'a [Property],
    kind: PropertyKind,
    index: Option<usize>,
}

impl<'a> PropertyCursor<'a> {
    fn new(items: &'a [Property], kind: PropertyKind) -> Self {
        let index = next_match(items, 0, |p| p.kind().matches(kind));
        Self { items, kind, index }
    }

    /// The current property, or `None` past the end.
    #[must_use]
    pub fn get(&self) -> Option<&'a Property> {
        self.index.and_then(|i| self.items.get(i))
    }

    /// Moves to the next matching property.
    pub fn advance(&mut self) {
        let kind = self.kind;
        self.index = self
            .index
            .and_then(|i| next_match(self.items, i + 1, |p| p.kind().matches(kind)));
    }
}

impl<'a> Iterator for PropertyCursor<'a> {
    type Item = &'a Property;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.get()?;
        self.advance();
        Some(current)
    }
}

/// Independent cursor over the child components of one kind, the
/// counterpart of [`PropertyCursor`].
#[derive(Debug, Clone)]
pub struct ComponentCursor<'a> {
    items: &'a [Component],
    kind: ComponentKind,
    index: Option<usize>,
}

impl<'a> ComponentCursor<'a> {
    fn new(items: &'a [Component], kind: ComponentKind) -> Self {
        let index = next_match(items, 0, |c| c.kind().matches(kind));
        Self { items, kind, index }
    }

    /// The current component, or `None` past the end.
    #[must_use]
    pub fn get(&self) -> Option<&'a Component> {
        self.index.and_then(|i| self.items.get(i))
    }

    /// Moves to the next matching component.
    pub fn advance(&mut self) {
        let kind = self.kind;
        self.index = self
            .index
            .and_then(|i| next_match(self.items, i + 1, |c| c.kind().matches(kind)));
    }
}

impl<'a> Iterator for ComponentCursor<'a> {
    type Item = &'a Component;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.get()?;
        self.advance();
        Some(current)
    }
}
