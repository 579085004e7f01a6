//! An environment that records insertions instead of executing them.
//!
//! Used for dry runs and in tests. Legacy modules evaluate to their
//! configured exports (plain and empty by default); native imports settle
//! after yielding once to the runtime.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::environment::{AppendCompletion, ExecutionEnvironment, ModuleEvaluation};
use crate::error::{LoaderError, LoaderResult};
use crate::namespace::{Exports, LoadedModules, ModuleKind, NamespaceTable};
use crate::transform::{LegacyModuleSource, Script};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum InsertionEvent {
    Script { identifier: String },
    LegacyModule {
        identifier: String,
        name: String,
        /// The wrapped `goog.loadModule(...)` form handed to the host.
        script: String,
    },
    NativeImportStarted { identifier: String },
    NativeImportSettled { identifier: String },
    Appended { identifier: String },
}

impl InsertionEvent {
    /// Identifier of a unit whose insertion completed with this event.
    pub fn completed_identifier(&self) -> Option<&str> {
        match self {
            Self::Script { identifier }
            | Self::LegacyModule { identifier, .. }
            | Self::NativeImportSettled { identifier }
            | Self::Appended { identifier } => Some(identifier),
            Self::NativeImportStarted { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingEnvironment {
    events: Vec<InsertionEvent>,
    namespaces: NamespaceTable,
    modules: LoadedModules,
    loader_state: Option<ModuleKind>,
    legacy_exports: HashMap<String, Exports>,
    native_exports: HashMap<String, Value>,
    failing: HashSet<String>,
}

impl RecordingEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already populated namespace table.
    pub fn with_namespaces(mut self, namespaces: NamespaceTable) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Exports the legacy module `name` evaluates to.
    pub fn with_legacy_exports(mut self, name: impl Into<String>, exports: Exports) -> Self {
        self.legacy_exports.insert(name.into(), exports);
        self
    }

    /// Namespace object the native module `identifier` resolves to.
    pub fn with_native_exports(mut self, identifier: impl Into<String>, exports: Value) -> Self {
        self.native_exports.insert(identifier.into(), exports);
        self
    }

    /// Make insertion of `identifier` fail.
    pub fn fail_on(mut self, identifier: impl Into<String>) -> Self {
        self.failing.insert(identifier.into());
        self
    }

    pub fn events(&self) -> &[InsertionEvent] {
        &self.events
    }

    /// Identifiers in completed-insertion order.
    pub fn inserted(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(InsertionEvent::completed_identifier)
            .map(String::from)
            .collect()
    }

    pub fn loader_state(&self) -> Option<ModuleKind> {
        self.loader_state
    }

    pub fn namespace_table(&self) -> &NamespaceTable {
        &self.namespaces
    }

    pub fn modules(&self) -> &LoadedModules {
        &self.modules
    }

    fn check(&self, identifier: &str) -> LoaderResult<()> {
        if self.failing.contains(identifier) {
            return Err(LoaderError::insertion(identifier, "execution failed"));
        }
        Ok(())
    }
}

#[async_trait]
impl ExecutionEnvironment for RecordingEnvironment {
    fn insert_script(&mut self, script: &Script) -> LoaderResult<()> {
        self.check(&script.identifier)?;
        self.events.push(InsertionEvent::Script {
            identifier: script.identifier.clone(),
        });
        Ok(())
    }

    fn evaluate_legacy_module(
        &mut self,
        module: &LegacyModuleSource,
    ) -> LoaderResult<ModuleEvaluation> {
        self.check(&module.identifier)?;
        self.events.push(InsertionEvent::LegacyModule {
            identifier: module.identifier.clone(),
            name: module.name.clone(),
            script: module.script(),
        });
        let exports = self
            .legacy_exports
            .get(&module.name)
            .cloned()
            .unwrap_or_else(Exports::empty);
        Ok(ModuleEvaluation {
            exports,
            declares_legacy_namespace: module.declares_legacy_namespace,
        })
    }

    fn swap_loader_state(&mut self, state: Option<ModuleKind>) -> Option<ModuleKind> {
        std::mem::replace(&mut self.loader_state, state)
    }

    async fn import_native_module(&mut self, identifier: &str) -> LoaderResult<Value> {
        self.events.push(InsertionEvent::NativeImportStarted {
            identifier: identifier.to_string(),
        });
        tokio::task::yield_now().await;
        self.check(identifier)?;
        self.events.push(InsertionEvent::NativeImportSettled {
            identifier: identifier.to_string(),
        });
        Ok(self
            .native_exports
            .get(identifier)
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new())))
    }

    fn append_source(&mut self, identifier: &str) -> AppendCompletion {
        let result = self.check(identifier);
        if result.is_ok() {
            self.events.push(InsertionEvent::Appended {
                identifier: identifier.to_string(),
            });
        }
        futures::future::ready(result).boxed()
    }

    fn namespaces(&mut self) -> &mut NamespaceTable {
        &mut self.namespaces
    }

    fn loaded_modules(&mut self) -> &mut LoadedModules {
        &mut self.modules
    }
}
