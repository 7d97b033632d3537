// SPDX-FileCopyrightText: 2025-2026 Zexin Yuan <aim@yzx9.xyz>
//
// SPDX-License-Identifier: Apache-2.0

//! Persistent sets of components.
//!
//! A [`Set`] keeps its components in clusters, one per storage bucket, and
//! loads at most one of them at a time. The storage mapping lives behind
//! [`SetBackend`]: a single file, a directory of monthly files, or a SQLite
//! database.

mod directory;
mod file;
#[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
mod transactional;

use std::collections::VecDeque;
use std::fmt;
use std::path::Path;

use almanac_ical::{
    CalTime, Component, ComponentKind, Environment, PropertyKind, ValueDuration,
    foreach_occurrence_in_range,
};
use jiff::{SignedDuration, Timestamp};

pub use crate::set::directory::DirectoryBackend;
pub use crate::set::file::FileBackend;
#[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
pub use crate::set::transactional::TransactionalBackend;
use crate::{Cluster, Gauge, SetKind, StoreConfig, StoreError};

/// Years of occurrences an expanding cursor produces for a gauge without a
/// range.
const DEFAULT_EXPANSION_YEARS: i64 = 5;

/// Storage mapping of a set.
///
/// A backend splits the components of a set into clusters named by a key,
/// and moves whole clusters between memory and storage.
pub trait SetBackend: fmt::Debug {
    /// The strategy implemented.
    fn kind(&self) -> SetKind;

    /// The file, directory or database backing the set.
    fn location(&self) -> &Path;

    /// Keys of the clusters in storage, sorted.
    ///
    /// # Errors
    ///
    /// Fails if storage cannot be listed.
    fn cluster_keys(&mut self) -> Result<Vec<String>, StoreError>;

    /// Key of the cluster `component` belongs in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadArgument`] if the component lacks what the
    /// key is derived from.
    fn cluster_key(&self, component: &Component) -> Result<String, StoreError>;

    /// Completes a component before it is added.
    fn prepare(&mut self, component: &mut Component) {
        let _ = component;
    }

    /// Reads the components of a cluster. A cluster missing from storage is
    /// empty.
    ///
    /// # Errors
    ///
    /// Fails on I/O or database errors, or on malformed data under a fatal
    /// error policy.
    fn load(&mut self, key: &str, env: &Environment) -> Result<Vec<Component>, StoreError>;

    /// Replaces a cluster in storage with the children of `root`.
    ///
    /// # Errors
    ///
    /// Fails on I/O or database errors.
    fn store(&mut self, key: &str, root: &Component) -> Result<(), StoreError>;

    /// Releases locks and connections. Calling it twice is harmless.
    ///
    /// # Errors
    ///
    /// Fails if releasing storage fails.
    fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Position {
    key: usize,
    index: usize,
}

impl Position {
    const START: Position = Position { key: 0, index: 0 };

    const fn after(self) -> Position {
        Position {
            key: self.key,
            index: self.index + 1,
        }
    }
}

#[derive(Debug)]
struct Clusters<'env> {
    backend: Box<dyn SetBackend>,
    env: &'env Environment,
    keys: Vec<String>,
    current: Option<Cluster>,
    read_only: bool,
}

impl Clusters<'_> {
    /// Makes the cluster under `key` current, committing the outgoing one.
    fn select(&mut self, key: &str) -> Result<&mut Cluster, StoreError> {
        let loaded = self.current.as_ref().is_some_and(|c| c.key() == key);
        if !loaded {
            self.commit()?;
            tracing::debug!(key, "switching cluster");
            let components = self.backend.load(key, self.env)?;
            self.current = Some(Cluster::with_components(key, components));
        }
        self.current
            .as_mut()
            .ok_or_else(|| StoreError::BadArgument(format!("no cluster {key}")))
    }

    fn select_at(&mut self, key: usize) -> Result<&mut Cluster, StoreError> {
        let key = self
            .keys
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::BadArgument(format!("no cluster at {key}")))?;
        self.select(&key)
    }

    fn is_dirty(&self) -> bool {
        self.current.as_ref().is_some_and(Cluster::is_changed)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        let Some(cluster) = self.current.as_mut() else {
            return Ok(());
        };
        if !cluster.is_changed() {
            return Ok(());
        }
        if self.read_only {
            return Err(StoreError::ReadOnly(self.backend.location().to_owned()));
        }

        tracing::info!(
            location = %self.backend.location().display(),
            key = cluster.key(),
            components = cluster.components().len(),
            "committing cluster"
        );
        self.backend.store(cluster.key(), cluster.component())?;
        cluster.commit();
        Ok(())
    }

    /// First position at or after `from` whose component satisfies `pred`.
    fn seek(
        &mut self,
        from: Position,
        pred: impl Fn(&Component) -> bool,
    ) -> Result<Option<Position>, StoreError> {
        let mut pos = from;
        while pos.key < self.keys.len() {
            let cluster = self.select_at(pos.key)?;
            let found = cluster
                .components()
                .iter()
                .skip(pos.index)
                .position(&pred);
            if let Some(offset) = found {
                return Ok(Some(Position {
                    key: pos.key,
                    index: pos.index + offset,
                }));
            }
            pos = Position {
                key: pos.key + 1,
                index: 0,
            };
        }
        Ok(None)
    }

    fn get(&mut self, pos: Position) -> Result<Option<&Component>, StoreError> {
        let cluster = self.select_at(pos.key)?;
        Ok(cluster.components().get(pos.index))
    }
}

/// Cursor of [`Set::begin_component`], independent of the set's own
/// iteration state.
#[derive(Debug, Clone)]
pub struct SetCursor {
    kind: ComponentKind,
    gauge: Option<Gauge>,
    next: Option<Position>,
    pending: VecDeque<Component>,
}

/// A persistent collection of components.
///
/// Changes stay in memory until [`Set::commit`]. Closing or dropping the
/// set commits pending changes.
#[derive(Debug)]
pub struct Set<'env> {
    clusters: Clusters<'env>,
    gauge: Option<Gauge>,
    current: Option<Position>,
    next: Option<Position>,
}

impl<'env> Set<'env> {
    /// Opens the set described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unimplemented`] for a transactional set in a
    /// build without SQLite, [`StoreError::Locked`] if another handle holds
    /// the storage, and otherwise fails like the first cluster load.
    pub fn from_config(config: &StoreConfig, env: &'env Environment) -> Result<Self, StoreError> {
        let backend: Box<dyn SetBackend> = match config.kind {
            SetKind::File => Box::new(FileBackend::open(config)?),
            SetKind::Directory => Box::new(DirectoryBackend::open(config)?),
            SetKind::Transactional => transactional_backend(config)?,
        };
        Self::with_backend(backend, config.read_only, env)
    }

    /// Opens a single-file set with default options.
    ///
    /// # Errors
    ///
    /// Fails like [`Set::from_config`].
    pub fn open_file(path: impl AsRef<Path>, env: &'env Environment) -> Result<Self, StoreError> {
        let config = StoreConfig::new(SetKind::File, path.as_ref());
        Self::from_config(&config, env)
    }

    /// Opens a directory set with default options.
    ///
    /// # Errors
    ///
    /// Fails like [`Set::from_config`].
    pub fn open_directory(
        path: impl AsRef<Path>,
        env: &'env Environment,
    ) -> Result<Self, StoreError> {
        let config = StoreConfig::new(SetKind::Directory, path.as_ref());
        Self::from_config(&config, env)
    }

    /// Opens a set on a custom backend and loads its first cluster.
    ///
    /// # Errors
    ///
    /// Fails if the backend cannot list or load its clusters.
    pub fn with_backend(
        mut backend: Box<dyn SetBackend>,
        read_only: bool,
        env: &'env Environment,
    ) -> Result<Self, StoreError> {
        let keys = backend.cluster_keys()?;
        let mut clusters = Clusters {
            backend,
            env,
            keys,
            current: None,
            read_only,
        };
        if !clusters.keys.is_empty() {
            clusters.select_at(0)?;
        }
        Ok(Self {
            clusters,
            gauge: None,
            current: None,
            next: None,
        })
    }

    /// The storage strategy.
    #[must_use]
    pub fn kind(&self) -> SetKind {
        self.clusters.backend.kind()
    }

    /// The file, directory or database backing the set.
    #[must_use]
    pub fn location(&self) -> &Path {
        self.clusters.backend.location()
    }

    /// Alias of [`Set::location`].
    #[must_use]
    pub fn path(&self) -> &Path {
        self.location()
    }

    /// Whether the set refuses to commit.
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.clusters.read_only
    }

    /// Whether the loaded cluster has uncommitted changes.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.clusters.is_dirty()
    }

    /// Flags the loaded cluster as changed, so the next commit writes it
    /// even if no component was added or removed. Use it after editing a
    /// component in place.
    pub fn mark(&mut self) {
        if let Some(cluster) = self.clusters.current.as_mut() {
            cluster.mark();
        }
    }

    /// Writes pending changes to storage. Does nothing if there are none.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::ReadOnly`] if the set was opened read-only, or
    /// the backend's storage error.
    pub fn commit(&mut self) -> Result<(), StoreError> {
        self.clusters.commit()
    }

    /// Commits pending changes and releases the storage.
    ///
    /// # Errors
    ///
    /// Fails like [`Set::commit`]; the storage is still released when the
    /// set is dropped.
    pub fn close(mut self) -> Result<(), StoreError> {
        tracing::info!(location = %self.location().display(), "closing set");
        self.clusters.commit()?;
        self.clusters.backend.close()
    }

    /// Adds a component to the cluster it belongs in.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadArgument`] if the backend cannot derive a
    /// cluster key from the component, or fails like a cluster switch.
    pub fn add_component(&mut self, mut component: Component) -> Result<(), StoreError> {
        self.clusters.backend.prepare(&mut component);
        let key = self.clusters.backend.cluster_key(&component)?;

        if let Err(at) = self.clusters.keys.binary_search(&key) {
            self.clusters.keys.insert(at, key.clone());
            for pos in [&mut self.current, &mut self.next].into_iter().flatten() {
                if pos.key >= at {
                    pos.key += 1;
                }
            }
        }

        self.clusters.select(&key)?.add_component(component);
        Ok(())
    }

    /// Removes the first stored component equal to `component`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::BadArgument`] if the set holds no such
    /// component.
    pub fn remove_component(&mut self, component: &Component) -> Result<Component, StoreError> {
        let hint = self.clusters.backend.cluster_key(component).ok();
        let mut order: Vec<usize> = (0..self.clusters.keys.len()).collect();
        if let Some(at) = hint.and_then(|k| self.clusters.keys.binary_search(&k).ok()) {
            order.retain(|&i| i != at);
            order.insert(0, at);
        }

        for key in order {
            let cluster = self.clusters.select_at(key)?;
            let Some(index) = cluster.position(component) else {
                continue;
            };
            let removed = cluster.remove_component_at(index).ok_or_else(|| {
                StoreError::BadArgument(format!("no component at {index}"))
            })?;

            if self.current == Some(Position { key, index }) {
                self.current = None;
            }
            for pos in [&mut self.current, &mut self.next].into_iter().flatten() {
                if pos.key == key && pos.index > index {
                    pos.index -= 1;
                }
            }
            return Ok(removed);
        }

        Err(StoreError::BadArgument(format!(
            "{} not found in set",
            component.name()
        )))
    }

    /// Replaces `old` with `new`.
    ///
    /// # Errors
    ///
    /// Fails like [`Set::remove_component`] and [`Set::add_component`].
    pub fn modify(&mut self, old: &Component, new: Component) -> Result<(), StoreError> {
        self.remove_component(old)?;
        self.add_component(new)
    }

    /// Number of stored components of `kind`, counting a VCALENDAR under
    /// the kind of its inner component too.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn count_components(&mut self, kind: ComponentKind) -> Result<usize, StoreError> {
        let mut count = 0;
        for key in 0..self.clusters.keys.len() {
            let cluster = self.clusters.select_at(key)?;
            count += cluster
                .components()
                .iter()
                .filter(|c| kind_matches(c, kind))
                .count();
        }
        Ok(count)
    }

    /// Restricts iteration to components passing `gauge`.
    pub fn select(&mut self, gauge: Gauge) {
        self.gauge = Some(gauge);
    }

    /// Lifts the restriction of [`Set::select`].
    pub fn clear_gauge(&mut self) {
        self.gauge = None;
    }

    /// Moves the set's cursor to the first component passing the gauge.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn get_first_component(&mut self) -> Result<Option<&Component>, StoreError> {
        self.advance(Position::START)
    }

    /// Moves the set's cursor to the next component passing the gauge.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn get_next_component(&mut self) -> Result<Option<&Component>, StoreError> {
        match self.next {
            Some(next) => self.advance(next),
            None => Ok(None),
        }
    }

    /// The component under the set's cursor.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn get_current_component(&mut self) -> Result<Option<&Component>, StoreError> {
        match self.current {
            Some(pos) => self.clusters.get(pos),
            None => Ok(None),
        }
    }

    fn advance(&mut self, from: Position) -> Result<Option<&Component>, StoreError> {
        let gauge = self.gauge.as_ref();
        let env = self.clusters.env;
        let found = self
            .clusters
            .seek(from, |c| gauge.is_none_or(|g| g.compare_in(c, env)))?;
        self.current = found;
        self.next = found.map(Position::after);
        self.get_current_component()
    }

    /// Starts an iteration over components of `kind` passing `gauge`.
    ///
    /// If the gauge asks for expansion, a recurring component is replaced by
    /// one instance per occurrence inside the gauge's range, each with a
    /// `RECURRENCE-ID`, and the gauge is applied to the instances.
    #[must_use]
    pub fn begin_component(&self, kind: ComponentKind, gauge: Option<Gauge>) -> SetCursor {
        SetCursor {
            kind,
            gauge,
            next: Some(Position::START),
            pending: VecDeque::new(),
        }
    }

    /// The next component of an iteration started by
    /// [`Set::begin_component`].
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch or a recurrence expansion.
    pub fn next_component(
        &mut self,
        cursor: &mut SetCursor,
    ) -> Result<Option<Component>, StoreError> {
        let env = self.clusters.env;
        loop {
            if let Some(instance) = cursor.pending.pop_front() {
                return Ok(Some(instance));
            }
            let Some(from) = cursor.next else {
                return Ok(None);
            };

            let kind = cursor.kind;
            let gauge = cursor.gauge.as_ref();
            let expand = gauge.is_some_and(Gauge::expand);
            let found = self.clusters.seek(from, |c| {
                kind_matches(c, kind)
                    && ((expand && is_recurring(c)) || gauge.is_none_or(|g| g.compare_in(c, env)))
            })?;
            let Some(pos) = found else {
                cursor.next = None;
                return Ok(None);
            };
            cursor.next = Some(pos.after());

            let Some(component) = self.clusters.get(pos)?.cloned() else {
                continue;
            };
            match gauge {
                Some(gauge) if expand && is_recurring(&component) => {
                    let range = match gauge.range() {
                        Some(range) => range,
                        None => default_range(&component, env)?,
                    };
                    let instances = expand_instances(&component, range, env)?;
                    cursor
                        .pending
                        .extend(instances.into_iter().filter(|i| gauge.compare_in(i, env)));
                }
                _ => return Ok(Some(component)),
            }
        }
    }

    /// The stored component of `kind` with the given UID. For
    /// [`ComponentKind::VAgenda`] the id is matched against `RELCALID`.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn fetch(
        &mut self,
        kind: ComponentKind,
        uid: &str,
    ) -> Result<Option<&Component>, StoreError> {
        let found = self.clusters.seek(Position::START, |c| {
            let id = match kind {
                ComponentKind::VAgenda => c.relcalid(),
                _ => c.uid(),
            };
            kind_matches(c, kind) && id == Some(uid)
        })?;
        match found {
            Some(pos) => self.clusters.get(pos),
            None => Ok(None),
        }
    }

    /// Whether some stored component has this UID.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn has_uid(&mut self, uid: &str) -> Result<bool, StoreError> {
        Ok(self.fetch(ComponentKind::Any, uid)?.is_some())
    }

    /// The stored component with the UID and `RECURRENCE-ID` of
    /// `candidate`. A candidate without `RECURRENCE-ID` matches any stored
    /// instance of its UID. `SEQUENCE` is not compared.
    ///
    /// # Errors
    ///
    /// Fails like a cluster switch.
    pub fn fetch_match(&mut self, candidate: &Component) -> Result<Option<&Component>, StoreError> {
        let Some(uid) = candidate.uid() else {
            return Ok(None);
        };
        let recurrence_id = candidate.recurrence_id();
        let found = self.clusters.seek(Position::START, |c| {
            c.uid() == Some(uid)
                && recurrence_id
                    .as_ref()
                    .is_none_or(|id| c.recurrence_id().as_ref() == Some(id))
        })?;
        match found {
            Some(pos) => self.clusters.get(pos),
            None => Ok(None),
        }
    }
}

impl Drop for Set<'_> {
    fn drop(&mut self) {
        if self.clusters.read_only {
            if self.clusters.is_dirty() {
                tracing::warn!(
                    location = %self.location().display(),
                    "discarding changes to a read-only set"
                );
            }
        } else if let Err(err) = self.clusters.commit() {
            tracing::error!(location = %self.location().display(), %err, "failed to commit set");
        }
        if let Err(err) = self.clusters.backend.close() {
            tracing::error!(location = %self.location().display(), %err, "failed to close set");
        }
    }
}

#[cfg(any(feature = "sqlite", feature = "sqlite-unbundled"))]
fn transactional_backend(config: &StoreConfig) -> Result<Box<dyn SetBackend>, StoreError> {
    Ok(Box::new(TransactionalBackend::open(config)?))
}

#[cfg(not(any(feature = "sqlite", feature = "sqlite-unbundled")))]
fn transactional_backend(_config: &StoreConfig) -> Result<Box<dyn SetBackend>, StoreError> {
    Err(StoreError::Unimplemented("transactional sets"))
}

/// Whether `component`, or the inner component of a VCALENDAR, is of
/// `kind`.
fn kind_matches(component: &Component, kind: ComponentKind) -> bool {
    component.kind().matches(kind)
        || component
            .get_inner()
            .is_some_and(|inner| inner.kind().matches(kind))
}

fn is_recurring(component: &Component) -> bool {
    component
        .get_inner()
        .is_some_and(|inner| inner.first_property(PropertyKind::RRule).is_some())
}

fn default_range(
    component: &Component,
    env: &Environment,
) -> Result<(Timestamp, Timestamp), StoreError> {
    let start = component
        .dtstart()
        .map_or(Timestamp::UNIX_EPOCH, |t| t.instant(env));
    let window = SignedDuration::from_hours(24 * 366 * DEFAULT_EXPANSION_YEARS);
    let end = start
        .checked_add(window)
        .map_err(|e| StoreError::BadArgument(format!("expansion window out of range: {e}")))?;
    Ok((start, end))
}

/// One copy of `master` per occurrence in `range`, with the recurrence
/// properties removed and the start, end and `RECURRENCE-ID` set to the
/// occurrence.
fn expand_instances(
    master: &Component,
    range: (Timestamp, Timestamp),
    env: &Environment,
) -> Result<Vec<Component>, StoreError> {
    let Some(inner) = master.get_inner() else {
        return Ok(Vec::new());
    };
    let ends_with = if inner.first_property(PropertyKind::Due).is_some() {
        Some(PropertyKind::Due)
    } else if inner.first_property(PropertyKind::DtEnd).is_some() {
        Some(PropertyKind::DtEnd)
    } else {
        None
    };
    let length = ends_with.and_then(|_| master.duration(env));

    let mut instances = Vec::new();
    let mut failure = None;
    foreach_occurrence_in_range(master, range.0, range.1, env, |_, occurrence| {
        if failure.is_some() {
            return;
        }
        match instance(master, &occurrence.recurrence_id, ends_with, length, env) {
            Ok(instance) => instances.push(instance),
            Err(err) => failure = Some(err),
        }
    })?;

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(instances),
    }
}

fn instance(
    master: &Component,
    start: &CalTime,
    ends_with: Option<PropertyKind>,
    length: Option<ValueDuration>,
    env: &Environment,
) -> Result<Component, almanac_ical::Error> {
    let mut instance = master.clone();
    if let Some(inner) = instance.get_inner_mut() {
        for kind in [
            PropertyKind::RRule,
            PropertyKind::RDate,
            PropertyKind::ExDate,
            PropertyKind::ExRule,
        ] {
            inner.remove_properties(kind);
        }
    }

    instance.set_dtstart(start);
    instance.set_recurrence_id(start);
    if let (Some(kind), Some(length)) = (ends_with, length) {
        let end = start.add_duration(length, env)?;
        match kind {
            PropertyKind::Due => instance.set_due(&end, env)?,
            _ => instance.set_dtend(&end)?,
        }
    }
    Ok(instance)
}
