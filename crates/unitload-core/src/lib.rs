//! Ordered, bounded-concurrency loader for manifest-driven script units.
//!
//! This crate bootstraps an execution environment from a manifest of units,
//! providing:
//!
//! - Manifest loading (JSON array or newline-delimited text)
//! - Bounded-concurrency fetching with fail-fast error handling
//! - Content classification (legacy modules, native modules, mocks, tests)
//! - Strict manifest-order insertion, including asynchronous native imports
//! - Legacy namespace merging so parents never wipe their children
//! - A single completion signal for the host harness
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use unitload_core::{load, CompletionNotifier, HttpFetcher, LoaderConfig, RecordingEnvironment};
//!
//! # async fn example() -> Result<(), unitload_core::LoaderError> {
//! let mut config = LoaderConfig::default()
//!     .with_base_url("http://localhost:8080/")
//!     .with_manifest(".build/gcc-manifest.json");
//! let fetcher = Arc::new(HttpFetcher::new(&config)?);
//! let mut env = RecordingEnvironment::new();
//!
//! let report = load(&mut config, fetcher, &mut env, CompletionNotifier::detached()).await?;
//! println!("inserted {} units", report.units);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `UNITLOAD_MANIFEST_PATH` | Manifest location (consumed once) |
//! | `UNITLOAD_BASE_URL` | Base URL (default: `http://localhost:8080/`) |
//! | `UNITLOAD_CONCURRENCY` | Maximum outstanding loads (default: 500) |
//! | `UNITLOAD_TIMEOUT` | Request timeout in seconds (default: 30) |
//! | `UNITLOAD_MODE` | `buffered`, `streaming`, `append` or `harness` |

pub mod classify;
pub mod config;
pub mod environment;
pub mod error;
pub mod fetch;
pub mod gate;
pub mod manifest;
pub mod namespace;
pub mod notify;
pub mod recording;
pub mod sequencer;
pub mod session;
pub mod transform;

// Re-export main types
pub use classify::{Classifier, ClassifierRules, Variant, VariantKind};
pub use config::{HandoffGlobals, LoadMode, LoaderConfig, DEFAULT_CONCURRENCY_LIMIT};
pub use environment::{AppendCompletion, ExecutionEnvironment, ModuleEvaluation};
pub use error::{LoaderError, LoaderResult};
pub use fetch::{FileFetcher, HttpFetcher, UnitFetcher, LOADER_USER_AGENT};
pub use gate::{ConcurrencyGate, GateStep};
pub use manifest::{Manifest, ManifestFormat, ManifestSource, PathRewrite};
pub use namespace::{
    Exports, LoadedModule, LoadedModules, MergeOutcome, ModuleKind, NamespaceMerger,
    NamespaceTable,
};
pub use notify::{CompletionNotifier, HostHarness, LoadReport};
pub use recording::{InsertionEvent, RecordingEnvironment};
pub use sequencer::{append_in_order, partition_for_harness, InsertionSequencer};
pub use session::{load, LoadSession, UnitRecord, UnitState};
pub use transform::{
    transform, with_source_marker, LegacyModuleSource, NativeModuleImport, NativeModuleState,
    Script, TransformedUnit,
};
