//! Load session: one pass from manifest to completion signal.
//!
//! Results are collected in fetch-completion order internally but reach the
//! environment in manifest order only.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, trace, warn};

use crate::classify::{Classifier, Variant, VariantKind};
use crate::config::{LoadMode, LoaderConfig};
use crate::environment::ExecutionEnvironment;
use crate::error::{LoaderError, LoaderResult};
use crate::fetch::UnitFetcher;
use crate::gate::{ConcurrencyGate, GateStep};
use crate::manifest::{Manifest, ManifestSource};
use crate::notify::{CompletionNotifier, LoadReport};
use crate::sequencer::{append_in_order, partition_for_harness, InsertionSequencer};
use crate::transform::{transform, TransformedUnit};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitState {
    Pending,
    Fetching,
    Fetched,
    Failed,
    Transformed,
    Inserted,
}

/// One manifest position.
#[derive(Debug, Clone)]
pub struct UnitRecord {
    pub index: usize,
    pub identifier: String,
    pub raw_content: Option<String>,
    pub variant: Option<Variant>,
    pub transformed: Option<TransformedUnit>,
    pub state: UnitState,
}

impl UnitRecord {
    fn new(index: usize, identifier: String) -> Self {
        Self {
            index,
            identifier,
            raw_content: None,
            variant: None,
            transformed: None,
            state: UnitState::Pending,
        }
    }
}

type FetchTasks = JoinSet<(usize, LoaderResult<String>)>;

pub struct LoadSession {
    manifest_location: String,
    records: Vec<UnitRecord>,
    fetcher: Arc<dyn UnitFetcher>,
    classifier: Classifier,
    mode: LoadMode,
    limit: usize,
}

impl std::fmt::Debug for LoadSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadSession")
            .field("manifest_location", &self.manifest_location)
            .field("units", &self.records.len())
            .field("mode", &self.mode)
            .field("limit", &self.limit)
            .finish()
    }
}

impl LoadSession {
    /// Take the manifest location out of `config`, load the manifest and
    /// build a session. A config can open at most one session.
    pub async fn open(
        config: &mut LoaderConfig,
        fetcher: Arc<dyn UnitFetcher>,
    ) -> LoaderResult<Self> {
        config.validate()?;
        let location = config.take_manifest_location()?;
        let manifest = ManifestSource::from_config(config)
            .load(fetcher.as_ref(), &location)
            .await?;
        Ok(Self::new(
            manifest,
            fetcher,
            config.mode,
            config.concurrency_limit,
        ))
    }

    pub fn new(
        manifest: Manifest,
        fetcher: Arc<dyn UnitFetcher>,
        mode: LoadMode,
        limit: usize,
    ) -> Self {
        let manifest_location = manifest.location().to_string();
        let records = manifest
            .into_identifiers()
            .into_iter()
            .enumerate()
            .map(|(index, identifier)| UnitRecord::new(index, identifier))
            .collect();
        Self {
            manifest_location,
            records,
            fetcher,
            classifier: Classifier::default(),
            mode,
            limit,
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn records(&self) -> &[UnitRecord] {
        &self.records
    }

    pub fn mode(&self) -> LoadMode {
        self.mode
    }

    /// Load every unit into `env` and fire `notifier`.
    ///
    /// The first failure aborts the session; outstanding fetches are
    /// cancelled and the notifier never fires.
    pub async fn run<E>(
        mut self,
        env: &mut E,
        notifier: CompletionNotifier,
    ) -> LoaderResult<LoadReport>
    where
        E: ExecutionEnvironment + ?Sized,
    {
        let started = Instant::now();
        info!(
            manifest = %self.manifest_location,
            units = self.records.len(),
            mode = %self.mode,
            limit = self.limit,
            harness = notifier.has_harness(),
            "starting load session"
        );

        let (insertion_order, peak_in_flight) = if self.mode.fetches_content() {
            let streaming = self.mode == LoadMode::Streaming;
            self.run_fetching(env, streaming).await?
        } else {
            let resequence = self.mode == LoadMode::TestHarness;
            self.run_appending(env, resequence).await?
        };

        let report = LoadReport {
            manifest: self.manifest_location.clone(),
            mode: self.mode,
            units: self.records.len(),
            variants: self.variant_counts(),
            insertion_order,
            peak_in_flight,
            elapsed_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        };

        self.records.clear();
        notifier.fire(&report);
        Ok(report)
    }

    async fn run_fetching<E>(
        &mut self,
        env: &mut E,
        streaming: bool,
    ) -> LoaderResult<(Vec<String>, usize)>
    where
        E: ExecutionEnvironment + ?Sized,
    {
        let total = self.records.len();
        let mut gate = ConcurrencyGate::new(total, self.limit)?;
        let mut sequencer = InsertionSequencer::new(total);
        let mut tasks = FetchTasks::new();

        for index in gate.start() {
            self.spawn_fetch(&mut tasks, index);
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, result) = joined.map_err(|e| LoaderError::Fetch {
                identifier: "unknown".into(),
                status: None,
                cause: format!("fetch task failed: {}", e),
            })?;

            let content = match result {
                Ok(content) => content,
                Err(err) => {
                    self.records[index].state = UnitState::Failed;
                    warn!(
                        identifier = %self.records[index].identifier,
                        error = %err,
                        "unit fetch failed, aborting session"
                    );
                    tasks.abort_all();
                    return Err(err);
                }
            };
            self.complete_fetch(index, content);

            match gate.on_completed() {
                GateStep::Issue(next) => self.spawn_fetch(&mut tasks, next),
                GateStep::Waiting => {}
                GateStep::Drained => debug!(units = total, "all fetches done"),
            }

            if streaming {
                let unit = self.take_transformed(index)?;
                let inserted = sequencer.offer(index, unit, env).await?;
                trace!(index, inserted = inserted.len(), held = sequencer.held(), "unit offered");
                self.mark_inserted(&inserted);
            }
        }

        if !streaming {
            debug!(units = total, "all units transformed, inserting");
            for index in 0..total {
                let unit = self.take_transformed(index)?;
                let inserted = sequencer.offer(index, unit, env).await?;
                self.mark_inserted(&inserted);
            }
        }

        if !sequencer.is_complete() {
            return Err(LoaderError::insertion(
                self.manifest_location.clone(),
                format!(
                    "{} of {} units inserted",
                    sequencer.next_to_insert(),
                    total
                ),
            ));
        }
        Ok((sequencer.into_order(), gate.peak()))
    }

    async fn run_appending<E>(
        &mut self,
        env: &mut E,
        resequence: bool,
    ) -> LoaderResult<(Vec<String>, usize)>
    where
        E: ExecutionEnvironment + ?Sized,
    {
        for record in self.records.iter_mut() {
            record.variant = Some(self.classifier.classify_identifier(&record.identifier));
        }

        let identifiers: Vec<String> = self
            .records
            .iter()
            .map(|record| record.identifier.clone())
            .collect();
        let order = if resequence {
            partition_for_harness(identifiers, &self.classifier)
        } else {
            identifiers
        };

        let peak = append_in_order(env, &order, self.limit).await?;
        for record in self.records.iter_mut() {
            record.state = UnitState::Inserted;
        }
        Ok((order, peak))
    }

    fn spawn_fetch(&mut self, tasks: &mut FetchTasks, index: usize) {
        let record = &mut self.records[index];
        record.state = UnitState::Fetching;
        trace!(index, identifier = %record.identifier, "fetch issued");

        let fetcher = Arc::clone(&self.fetcher);
        let identifier = record.identifier.clone();
        tasks.spawn(async move {
            let result = fetcher.fetch(&identifier).await;
            (index, result)
        });
    }

    fn complete_fetch(&mut self, index: usize, content: String) {
        let record = &mut self.records[index];
        record.state = UnitState::Fetched;

        let variant = self.classifier.classify(&record.identifier, &content);
        let unit = transform(&record.identifier, &content, &variant);
        trace!(
            index,
            identifier = %record.identifier,
            variant = %variant.kind(),
            inert = unit.is_inert(),
            "unit transformed"
        );

        record.transformed = Some(unit);
        record.variant = Some(variant);
        record.raw_content = Some(content);
        record.state = UnitState::Transformed;
    }

    fn take_transformed(&mut self, index: usize) -> LoaderResult<TransformedUnit> {
        let record = &mut self.records[index];
        record
            .transformed
            .take()
            .ok_or_else(|| LoaderError::insertion(record.identifier.clone(), "unit was never transformed"))
    }

    /// Inserted units no longer need their buffers.
    fn mark_inserted(&mut self, indices: &[usize]) {
        for &index in indices {
            let record = &mut self.records[index];
            record.raw_content = None;
            record.transformed = None;
            record.state = UnitState::Inserted;
        }
    }

    fn variant_counts(&self) -> BTreeMap<VariantKind, usize> {
        let mut counts = BTreeMap::new();
        for variant in self.records.iter().filter_map(|r| r.variant.as_ref()) {
            *counts.entry(variant.kind()).or_insert(0) += 1;
        }
        counts
    }
}

/// Open a session from `config` and run it to completion.
pub async fn load<E>(
    config: &mut LoaderConfig,
    fetcher: Arc<dyn UnitFetcher>,
    env: &mut E,
    notifier: CompletionNotifier,
) -> LoaderResult<LoadReport>
where
    E: ExecutionEnvironment + ?Sized,
{
    LoadSession::open(config, fetcher)
        .await?
        .run(env, notifier)
        .await
}
