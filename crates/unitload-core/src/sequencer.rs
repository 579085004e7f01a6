//! Ordered insertion.
//!
//! Units enter the environment strictly by ascending index. A unit offered
//! ahead of its predecessors is held until they are inserted; a native
//! module blocks its successors until its import settles.

use std::collections::BTreeMap;

use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use tracing::{debug, trace};

use crate::classify::{Classifier, Variant};
use crate::environment::ExecutionEnvironment;
use crate::error::{LoaderError, LoaderResult};
use crate::gate::{ConcurrencyGate, GateStep};
use crate::namespace::{LoadedModule, ModuleKind, NamespaceMerger};
use crate::transform::{LegacyModuleSource, NativeModuleState, TransformedUnit};

#[derive(Debug)]
pub struct InsertionSequencer {
    total: usize,
    next_to_insert: usize,
    held: BTreeMap<usize, TransformedUnit>,
    order: Vec<String>,
}

impl InsertionSequencer {
    pub fn new(total: usize) -> Self {
        Self {
            total,
            next_to_insert: 0,
            held: BTreeMap::new(),
            order: Vec::with_capacity(total),
        }
    }

    /// Hand over unit `index`.
    ///
    /// Inserts it, plus every held successor, if all lower indices are
    /// already inserted; holds it otherwise. Returns the indices inserted by
    /// this call, ascending.
    pub async fn offer<E>(
        &mut self,
        index: usize,
        unit: TransformedUnit,
        env: &mut E,
    ) -> LoaderResult<Vec<usize>>
    where
        E: ExecutionEnvironment + ?Sized,
    {
        if index >= self.total || index < self.next_to_insert || self.held.contains_key(&index) {
            return Err(LoaderError::insertion(
                unit.identifier(),
                format!("unit {} offered out of range or twice", index),
            ));
        }
        self.held.insert(index, unit);

        let mut inserted = Vec::new();
        while let Some(unit) = self.held.remove(&self.next_to_insert) {
            let identifier = unit.identifier().to_string();
            trace!(index = self.next_to_insert, identifier = %identifier, "inserting unit");
            insert_unit(env, unit).await?;
            self.order.push(identifier);
            inserted.push(self.next_to_insert);
            self.next_to_insert += 1;
        }
        Ok(inserted)
    }

    pub fn next_to_insert(&self) -> usize {
        self.next_to_insert
    }

    /// Units waiting for a predecessor.
    pub fn held(&self) -> usize {
        self.held.len()
    }

    pub fn is_complete(&self) -> bool {
        self.next_to_insert == self.total
    }

    /// Identifiers in the order they were inserted.
    pub fn into_order(self) -> Vec<String> {
        self.order
    }
}

async fn insert_unit<E>(env: &mut E, unit: TransformedUnit) -> LoaderResult<()>
where
    E: ExecutionEnvironment + ?Sized,
{
    match unit {
        TransformedUnit::Script(script) => env.insert_script(&script),
        TransformedUnit::LegacyModule(module) => insert_legacy_module(env, &module),
        TransformedUnit::NativeModule(mut import) => {
            import.settle(env).await?;
            if import.state() != NativeModuleState::Settled {
                return Err(LoaderError::insertion(
                    import.identifier,
                    "native module import did not settle",
                ));
            }
            Ok(())
        }
    }
}

/// Evaluate a legacy module and publish its exports.
fn insert_legacy_module<E>(env: &mut E, module: &LegacyModuleSource) -> LoaderResult<()>
where
    E: ExecutionEnvironment + ?Sized,
{
    let previous = env.swap_loader_state(Some(ModuleKind::Legacy));
    let evaluation = env.evaluate_legacy_module(module);
    env.swap_loader_state(previous);
    let evaluation = evaluation?;

    let exports = if evaluation.declares_legacy_namespace {
        let (value, outcome) =
            NamespaceMerger::export(env.namespaces(), &module.name, evaluation.exports);
        debug!(module = %module.name, outcome = ?outcome, "legacy namespace exported");
        value
    } else {
        evaluation.exports.into_value()
    };

    env.loaded_modules().register(
        module.name.clone(),
        LoadedModule {
            exports,
            kind: ModuleKind::Legacy,
        },
    );
    Ok(())
}

/// Reorder identifiers for the test harness: sources, then mocks, then
/// tests. Relative order within each group is kept.
pub fn partition_for_harness(identifiers: Vec<String>, classifier: &Classifier) -> Vec<String> {
    let mut sources = Vec::with_capacity(identifiers.len());
    let mut mocks = Vec::new();
    let mut tests = Vec::new();

    for identifier in identifiers {
        match classifier.classify_identifier(&identifier) {
            Variant::Mock => mocks.push(identifier),
            Variant::Test => tests.push(identifier),
            _ => sources.push(identifier),
        }
    }

    sources.extend(mocks);
    sources.extend(tests);
    sources
}

/// Append `identifiers` through the environment's own loading, at most
/// `limit` outstanding. Returns the peak number of outstanding appends.
pub async fn append_in_order<E>(
    env: &mut E,
    identifiers: &[String],
    limit: usize,
) -> LoaderResult<usize>
where
    E: ExecutionEnvironment + ?Sized,
{
    let mut gate = ConcurrencyGate::new(identifiers.len(), limit)?;
    let mut pending = FuturesUnordered::new();

    for index in gate.start() {
        pending.push(request_append(env, identifiers, index));
    }

    while let Some((index, result)) = pending.next().await {
        result?;
        trace!(index, identifier = %identifiers[index], "append completed");

        match gate.on_completed() {
            GateStep::Issue(next) => pending.push(request_append(env, identifiers, next)),
            GateStep::Waiting => {}
            GateStep::Drained => break,
        }
    }
    Ok(gate.peak())
}

fn request_append<E>(
    env: &mut E,
    identifiers: &[String],
    index: usize,
) -> impl std::future::Future<Output = (usize, LoaderResult<()>)>
where
    E: ExecutionEnvironment + ?Sized,
{
    env.append_source(&identifiers[index])
        .map(move |result| (index, result))
}
