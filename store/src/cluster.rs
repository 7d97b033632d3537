// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! The in-memory unit of a set: one XROOT holding the components of a
//! storage bucket, plus a flag telling whether it differs from storage.

use almanac_ical::{Component, ComponentKind};

/// Components loaded from one storage bucket.
#[derive(Debug, Clone)]
pub struct Cluster {
    key: String,
    data: Component,
    changed: bool,
}

impl Cluster {
    /// An empty, unchanged cluster.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            data: Component::new(ComponentKind::XRoot),
            changed: false,
        }
    }

    /// A cluster holding `components`. An XROOT is unwrapped so its
    /// children become the top-level components.
    #[must_use]
    pub fn with_components(key: impl Into<String>, components: Vec<Component>) -> Self {
        let mut cluster = Self::new(key);
        for component in components {
            if component.kind() == ComponentKind::XRoot {
                let mut root = component;
                for child in root.take_components() {
                    cluster.data.add_component(child);
                }
            } else {
                cluster.data.add_component(component);
            }
        }
        cluster
    }

    /// The storage key, such as `202501` for a monthly bucket.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether the cluster differs from storage.
    #[must_use]
    pub const fn is_changed(&self) -> bool {
        self.changed
    }

    /// Flags the cluster as differing from storage.
    pub fn mark(&mut self) {
        self.changed = true;
    }

    /// Clears the changed flag once storage has caught up.
    pub fn commit(&mut self) {
        self.changed = false;
    }

    /// The XROOT holding the components.
    #[must_use]
    pub const fn component(&self) -> &Component {
        &self.data
    }

    /// The top-level components in order.
    #[must_use]
    pub fn components(&self) -> &[Component] {
        self.data.components()
    }

    /// Appends a component and marks the cluster.
    pub fn add_component(&mut self, component: Component) {
        self.data.add_component(component);
        self.mark();
    }

    /// Removes the component at `index` and marks the cluster.
    pub fn remove_component_at(&mut self, index: usize) -> Option<Component> {
        let removed = self.data.remove_component_at(index)?;
        self.mark();
        Some(removed)
    }

    /// Index of the first component equal to `component`.
    #[must_use]
    pub fn position(&self, component: &Component) -> Option<usize> {
        self.components().iter().position(|c| c == component)
    }

    /// The cluster as iCalendar text.
    ///
    /// # Errors
    ///
    /// Fails only if formatting into memory fails.
    pub fn to_text(&self) -> std::io::Result<String> {
        almanac_ical::formatter::format(&self.data)
    }
}
