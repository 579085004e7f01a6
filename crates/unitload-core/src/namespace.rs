//! Namespace table and legacy namespace merging.
//!
//! A legacy module exports its value at a dotted path. When a parent
//! namespace loads after one of its children, assigning the parent's exports
//! would wipe the child. The merger instead copies the parent's own
//! properties into the object already at the path.
//!
//! Example:
//!   - `os.ns` loads and sets `os.ns = <exports>`, creating `os = {ns: ..}`.
//!   - `os` loads with plain exports `{b: 2}`; the result is `os = {ns: .., b: 2}`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Exports produced by evaluating a module body.
#[derive(Debug, Clone, PartialEq)]
pub enum Exports {
    /// The default exports object, possibly with properties added.
    Plain(Map<String, Value>),
    /// A value the module constructed itself (class, function, custom object).
    Custom(Value),
}

impl Exports {
    pub fn empty() -> Self {
        Self::Plain(Map::new())
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Plain(map) => Value::Object(map),
            Self::Custom(value) => value,
        }
    }
}

/// Shared registry mapping dotted namespace paths to exported values.
///
/// Owned by the execution environment and outlives any single session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamespaceTable {
    root: Map<String, Value>,
}

impl NamespaceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Walk own properties along `path`.
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.root.get(parts.next()?)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut Value> {
        let mut parts = path.split('.');
        let mut current = self.root.get_mut(parts.next()?)?;
        for part in parts {
            current = current.as_object_mut()?.get_mut(part)?;
        }
        Some(current)
    }

    /// Set `value` at `path`, creating missing intermediate objects.
    ///
    /// Returns false, leaving the table untouched, when an intermediate
    /// segment holds a non-object value.
    pub fn export_path(&mut self, path: &str, value: Value) -> bool {
        let parts: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = parts.split_last() else {
            return false;
        };

        let mut current = &mut self.root;
        for part in parents {
            let slot = current
                .entry(part.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            match slot {
                Value::Object(map) => current = map,
                _ => {
                    warn!(path = %path, segment = %part, "namespace segment is not an object");
                    return false;
                }
            }
        }
        current.insert(last.to_string(), value);
        true
    }
}

/// Kind of module registered in [`LoadedModules`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModuleKind {
    Legacy,
    Native,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedModule {
    pub exports: Value,
    pub kind: ModuleKind,
}

/// Registry of module id → exports.
#[derive(Debug, Clone, Default)]
pub struct LoadedModules {
    modules: HashMap<String, LoadedModule>,
}

impl LoadedModules {
    pub fn register(&mut self, id: impl Into<String>, module: LoadedModule) {
        self.modules.insert(id.into(), module);
    }

    pub fn get(&self, id: &str) -> Option<&LoadedModule> {
        self.modules.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.modules.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

/// How a module's final exports were decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Own properties were copied into the existing namespace object.
    Merged,
    /// Nothing lived at the path; the module's exports stand.
    Fresh,
    /// Something lived at the path but could not be merged; last writer wins.
    Replaced,
}

/// Resolves final exports for legacy namespaces. Never deep-merges.
pub struct NamespaceMerger;

impl NamespaceMerger {
    /// Decide the final exports for a module declaring the legacy namespace
    /// `path`, merging into the table in place where possible.
    pub fn resolve(table: &mut NamespaceTable, path: &str, exports: Exports) -> (Value, MergeOutcome) {
        match (table.get_mut(path), exports) {
            (Some(Value::Object(existing)), Exports::Plain(own)) => {
                debug!(namespace = %path, properties = own.len(), "merging into existing namespace");
                for (key, value) in own {
                    existing.insert(key, value);
                }
                (Value::Object(existing.clone()), MergeOutcome::Merged)
            }
            (Some(_), exports) => {
                debug!(namespace = %path, "existing namespace not mergeable, replacing");
                (exports.into_value(), MergeOutcome::Replaced)
            }
            (None, exports) => (exports.into_value(), MergeOutcome::Fresh),
        }
    }

    /// Resolve exports and publish them at `path`.
    pub fn export(table: &mut NamespaceTable, path: &str, exports: Exports) -> (Value, MergeOutcome) {
        let (value, outcome) = Self::resolve(table, path, exports);
        table.export_path(path, value.clone());
        (value, outcome)
    }
}
