//! Debug introspection registry: hierarchical names to signal cells.
//!
//! [`collect`] walks the module tree once, letting every module add entries
//! for the signals it owns directly. Each [`DebugEntry`] records a locator
//! (the chain of child names plus the leaf name) rather than a pointer, and
//! [`resolve`] / [`resolve_mut`] follow it against the live tree on every
//! access, so entries stay valid across a wholesale reset.

use std::collections::{HashMap, HashSet};

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SimError;
use crate::module::Module;
use crate::signal::{SignalMut, SignalRef};

/// Separator between hierarchy levels in a debug path.
pub const PATH_SEPARATOR: char = ' ';

bitflags! {
    /// Direction and driver classification of a debug item.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DebugFlags: u32 {
        /// Port driven from outside the module.
        const INPUT       = 1 << 0;
        /// Port observed from outside the module.
        const OUTPUT      = 1 << 1;
        /// Bidirectional port.
        const INOUT       = Self::INPUT.bits() | Self::OUTPUT.bits();
        /// Driven by state updated on commit.
        const DRIVEN_SYNC = 1 << 2;
        /// Driven by combinational logic recomputed on eval.
        const DRIVEN_COMB = 1 << 3;
        /// Not driven by anything inside the design.
        const UNDRIVEN    = 1 << 4;
    }
}

/// Port direction reported to host tooling.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Driven from outside.
    Input,
    /// Observed from outside.
    Output,
    /// Both.
    Inout,
}

/// Which storage cell backs a debug item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Input or combinational net.
    Value,
    /// Register.
    Wire,
    /// Memory.
    Memory,
}

/// Metadata for one signal, as reported by [`Module::debug_info`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DebugItem {
    /// Backing storage cell kind.
    pub kind: StorageKind,
    /// Bit width (word width for memories).
    pub width: u32,
    /// Number of words; 1 for scalars.
    pub depth: usize,
    /// Direction and driver flags.
    pub flags: DebugFlags,
}

impl DebugItem {
    /// Describes `signal` with the given flags.
    pub fn new(signal: SignalRef<'_>, flags: DebugFlags) -> Self {
        let kind = match signal {
            SignalRef::Value(_) => StorageKind::Value,
            SignalRef::Wire(_) => StorageKind::Wire,
            SignalRef::Memory(_) => StorageKind::Memory,
        };
        Self {
            kind,
            width: signal.width(),
            depth: signal.depth(),
            flags,
        }
    }

    /// Returns whether the item is a register or memory.
    pub fn is_state(&self) -> bool {
        self.kind != StorageKind::Value
    }

    /// Returns whether anything inside the design drives the item.
    pub fn is_driven(&self) -> bool {
        !self.flags.contains(DebugFlags::UNDRIVEN)
    }

    /// Returns the port direction, or `None` for internal signals.
    pub fn direction(&self) -> Option<Direction> {
        let input = self.flags.contains(DebugFlags::INPUT);
        let output = self.flags.contains(DebugFlags::OUTPUT);
        match (input, output) {
            (true, true) => Some(Direction::Inout),
            (true, false) => Some(Direction::Input),
            (false, true) => Some(Direction::Output),
            (false, false) => None,
        }
    }

    /// Returns whether an external write may force this item.
    ///
    /// Combinationally driven non-inputs are recomputed by every `eval` and
    /// are never writable.
    pub fn is_writable(&self, allow_state_writes: bool) -> bool {
        if self.is_state() {
            return allow_state_writes;
        }
        self.flags.contains(DebugFlags::INPUT) || !self.flags.contains(DebugFlags::DRIVEN_COMB)
    }
}

/// The position of a module in the hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scope {
    segments: Vec<String>,
    /// Inputs the parent drives; `None` when it drives all of them.
    bound: Option<Vec<String>>,
}

impl Scope {
    /// The scope of the root module.
    pub fn root() -> Self {
        Self::default()
    }

    /// The scope of the child `name` of this scope, every input bound.
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self {
            segments,
            bound: None,
        }
    }

    /// The scope of the child `name` whose parent drives only `bound`.
    pub fn child_bound<'a>(
        &self,
        name: &str,
        bound: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            bound: Some(bound.into_iter().map(str::to_string).collect()),
            ..self.child(name)
        }
    }

    /// Returns whether this is the root scope.
    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Child names from the root down to this scope.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Joins this scope and `leaf` into a path; no trailing separator.
    pub fn path(&self, leaf: &str) -> String {
        let mut path = String::new();
        for segment in &self.segments {
            path.push_str(segment);
            path.push(PATH_SEPARATOR);
        }
        path.push_str(leaf);
        path
    }

    /// Flags for the input `name` of the module in this scope.
    ///
    /// Root inputs are driven by the host and so undriven within the design.
    /// A child input is driven when its parent binds it.
    pub fn input_flags(&self, name: &str) -> DebugFlags {
        let bound = !self.is_root()
            && self
                .bound
                .as_ref()
                .map_or(true, |ports| ports.iter().any(|p| p == name));
        if bound {
            DebugFlags::INPUT | DebugFlags::DRIVEN_COMB
        } else {
            DebugFlags::INPUT | DebugFlags::UNDRIVEN
        }
    }
}

/// A registered signal: its path, locator and metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DebugEntry {
    path: String,
    scope: Vec<String>,
    name: String,
    item: DebugItem,
}

impl DebugEntry {
    /// The full hierarchical path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The leaf signal name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The item metadata.
    pub fn item(&self) -> &DebugItem {
        &self.item
    }

    /// Summarizes the entry for host tooling.
    pub fn info(&self, allow_state_writes: bool) -> DebugInfo {
        DebugInfo {
            path: self.path.clone(),
            width: self.item.width,
            depth: self.item.depth,
            direction: self.item.direction(),
            driven: self.item.is_driven(),
            is_state: self.item.is_state(),
            writable: self.item.is_writable(allow_state_writes),
        }
    }
}

/// The host-facing description of one debug item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugInfo {
    /// Hierarchical path.
    pub path: String,
    /// Bit width (word width for memories).
    pub width: u32,
    /// Number of words; 1 for scalars.
    pub depth: usize,
    /// Port direction, `None` for internal signals.
    pub direction: Option<Direction>,
    /// Whether anything inside the design drives the signal.
    pub driven: bool,
    /// Whether the signal is a register or memory.
    pub is_state: bool,
    /// Whether external writes are accepted.
    pub writable: bool,
}

/// An ordered, path-unique collection of debug entries.
#[derive(Clone, Debug, Default)]
pub struct DebugItems {
    entries: Vec<DebugEntry>,
    index: HashMap<String, usize>,
}

impl DebugItems {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers signal `name` of the module at `scope`.
    ///
    /// Fails with [`SimError::DuplicateName`] rather than overwriting an
    /// existing entry.
    pub fn add(&mut self, scope: &Scope, name: &str, item: DebugItem) -> Result<(), SimError> {
        let path = scope.path(name);
        if self.index.contains_key(&path) {
            return Err(SimError::DuplicateName { path });
        }
        self.index.insert(path.clone(), self.entries.len());
        self.entries.push(DebugEntry {
            path,
            scope: scope.segments().to_vec(),
            name: name.to_string(),
            item,
        });
        Ok(())
    }

    /// Returns the entry for `path`, if registered.
    pub fn get(&self, path: &str) -> Option<&DebugEntry> {
        self.index.get(path).map(|&i| &self.entries[i])
    }

    /// Returns the entry for `path` or [`SimError::UnknownSignal`].
    pub fn lookup(&self, path: &str) -> Result<&DebugEntry, SimError> {
        self.get(path).ok_or_else(|| SimError::UnknownSignal {
            path: path.to_string(),
        })
    }

    /// Iterates entries in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DebugEntry> {
        self.entries.iter()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Summarizes every entry in registration order.
    pub fn infos(&self, allow_state_writes: bool) -> Vec<DebugInfo> {
        self.entries
            .iter()
            .map(|e| e.info(allow_state_writes))
            .collect()
    }
}

/// Walks the tree under `root` once, collecting every module's entries.
///
/// Parents register before their children; children are visited in
/// declaration order.
pub fn collect<M: Module + ?Sized>(root: &M) -> Result<DebugItems, SimError> {
    let mut items = DebugItems::new();
    walk(root, &Scope::root(), &mut items)?;
    debug!(items = items.len(), "debug registry built");
    Ok(items)
}

fn walk<M: Module + ?Sized>(
    module: &M,
    scope: &Scope,
    items: &mut DebugItems,
) -> Result<(), SimError> {
    module.debug_info(items, scope)?;
    let mut seen = HashSet::new();
    for (name, child) in module.children() {
        if !seen.insert(name) {
            return Err(SimError::DuplicateName {
                path: scope.path(name),
            });
        }
        let child_scope = match module.bound_inputs(name) {
            Some(ports) => scope.child_bound(name, ports),
            None => scope.child(name),
        };
        walk(child, &child_scope, items)?;
    }
    Ok(())
}

/// Follows `entry`'s locator from `root` to the signal it names.
pub fn resolve<'a, M: Module + ?Sized>(root: &'a M, entry: &DebugEntry) -> Option<SignalRef<'a>> {
    let Some((first, rest)) = entry.scope.split_first() else {
        return root.signal(&entry.name);
    };
    let children = root.children();
    let mut module = children.into_iter().find(|(n, _)| *n == first.as_str())?.1;
    for segment in rest {
        module = module
            .children()
            .into_iter()
            .find(|(n, _)| *n == segment.as_str())?
            .1;
    }
    module.signal(&entry.name)
}

/// Follows `entry`'s locator from `root` to the signal it names, mutably.
pub fn resolve_mut<'a, M: Module + ?Sized>(
    root: &'a mut M,
    entry: &DebugEntry,
) -> Option<SignalMut<'a>> {
    let Some((first, rest)) = entry.scope.split_first() else {
        return root.signal_mut(&entry.name);
    };
    let mut module = root.child_mut(first)?;
    for segment in rest {
        module = module.child_mut(segment)?;
    }
    module.signal_mut(&entry.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{Memory, Wire};
    use kestrel_common::Value;

    #[test]
    fn scope_paths() {
        let root = Scope::root();
        assert!(root.is_root());
        assert_eq!(root.path("clk"), "clk");
        let inner = root.child("cpu").child("alu");
        assert!(!inner.is_root());
        assert_eq!(inner.path("y"), "cpu alu y");
        assert_eq!(inner.segments(), ["cpu", "alu"]);
    }

    #[test]
    fn input_flags_depend_on_scope() {
        let root = Scope::root();
        let undriven = DebugFlags::INPUT | DebugFlags::UNDRIVEN;
        let driven = DebugFlags::INPUT | DebugFlags::DRIVEN_COMB;
        assert_eq!(root.input_flags("a"), undriven);
        assert_eq!(root.child("sub").input_flags("a"), driven);

        let partial = root.child_bound("sub", ["a"]);
        assert_eq!(partial.input_flags("a"), driven);
        assert_eq!(partial.input_flags("b"), undriven);
        assert_eq!(partial.path("b"), "sub b");
    }

    #[test]
    fn item_metadata() {
        let w = Wire::new(4);
        let item = DebugItem::new(
            SignalRef::from(&w),
            DebugFlags::OUTPUT | DebugFlags::DRIVEN_SYNC,
        );
        assert_eq!(item.kind, StorageKind::Wire);
        assert!(item.is_state());
        assert!(item.is_driven());
        assert_eq!(item.direction(), Some(Direction::Output));
        assert!(item.is_writable(true));
        assert!(!item.is_writable(false));

        let m = Memory::new(8, 16);
        let item = DebugItem::new(SignalRef::from(&m), DebugFlags::UNDRIVEN);
        assert_eq!(item.depth, 16);
        assert_eq!(item.direction(), None);
    }

    #[test]
    fn writability_of_values() {
        let v = Value::new(1);
        let item = |flags| DebugItem::new(SignalRef::from(&v), flags);
        let comb_out = item(DebugFlags::OUTPUT | DebugFlags::DRIVEN_COMB);
        assert!(!comb_out.is_writable(true));
        let internal = item(DebugFlags::DRIVEN_COMB);
        assert!(!internal.is_writable(true));
        let child_input = item(DebugFlags::INPUT | DebugFlags::DRIVEN_COMB);
        assert!(child_input.is_writable(false));
        let inout = item(DebugFlags::INOUT | DebugFlags::UNDRIVEN);
        assert_eq!(inout.direction(), Some(Direction::Inout));
        assert!(inout.is_writable(false));
    }

    #[test]
    fn add_rejects_duplicate_paths() {
        let v = Value::new(1);
        let item = DebugItem::new(SignalRef::from(&v), DebugFlags::INPUT);
        let mut items = DebugItems::new();
        let scope = Scope::root().child("sub");
        items.add(&scope, "a", item).unwrap();
        let err = items.add(&scope, "a", item).unwrap_err();
        assert!(matches!(err, SimError::DuplicateName { path } if path == "sub a"));
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn lookup_unknown_path() {
        let items = DebugItems::new();
        assert!(items.is_empty());
        let err = items.lookup("nope").unwrap_err();
        assert!(matches!(err, SimError::UnknownSignal { path } if path == "nope"));
    }

    #[test]
    fn info_serializes_lowercase_direction() {
        let v = Value::new(1);
        let flags = Scope::root().input_flags("rst");
        let mut items = DebugItems::new();
        items
            .add(&Scope::root(), "rst", DebugItem::new(SignalRef::from(&v), flags))
            .unwrap();
        let infos = items.infos(true);
        let json = serde_json::to_value(&infos[0]).unwrap();
        assert_eq!(json["direction"], "input");
        assert_eq!(json["driven"], false);
        assert_eq!(json["path"], "rst");
    }
}
