//! The execution environment units are inserted into.
//!
//! The environment runs one unit at a time. Inert scripts execute
//! synchronously on insertion; native module imports and source appends
//! settle later and are awaited by the sequencer.

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::LoaderResult;
use crate::namespace::{Exports, LoadedModules, ModuleKind, NamespaceTable};
use crate::transform::{LegacyModuleSource, Script};

/// Resolves once the environment has executed an appended unit.
pub type AppendCompletion = BoxFuture<'static, LoaderResult<()>>;

/// Result of evaluating a legacy module body in an isolated scope.
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleEvaluation {
    pub exports: Exports,
    /// Whether the body asked for its exports at the global dotted path.
    pub declares_legacy_namespace: bool,
}

#[async_trait]
pub trait ExecutionEnvironment: Send {
    /// Execute inert script text. Returns after the script ran.
    fn insert_script(&mut self, script: &Script) -> LoaderResult<()>;

    /// Evaluate a legacy module body and hand back its local exports.
    fn evaluate_legacy_module(&mut self, module: &LegacyModuleSource)
        -> LoaderResult<ModuleEvaluation>;

    /// Replace the module loader state, returning the previous one.
    fn swap_loader_state(&mut self, state: Option<ModuleKind>) -> Option<ModuleKind>;

    /// Import a native module through the host's own module machinery.
    /// Resolves with the module namespace once the import has settled.
    async fn import_native_module(&mut self, identifier: &str) -> LoaderResult<Value>;

    /// Ask the environment to fetch and execute `identifier` itself.
    ///
    /// Appends execute in request order; the returned future resolves after
    /// this unit executed.
    fn append_source(&mut self, identifier: &str) -> AppendCompletion;

    fn namespaces(&mut self) -> &mut NamespaceTable;

    fn loaded_modules(&mut self) -> &mut LoadedModules;
}
