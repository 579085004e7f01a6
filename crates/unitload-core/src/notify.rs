//! Completion signalling.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::info;

use crate::classify::VariantKind;
use crate::config::LoadMode;

/// Summary handed to the host once every unit is inserted and settled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadReport {
    pub manifest: String,
    pub mode: LoadMode,
    pub units: usize,
    pub variants: BTreeMap<VariantKind, usize>,
    /// Identifiers in the order the environment received them.
    pub insertion_order: Vec<String>,
    pub peak_in_flight: usize,
    pub elapsed_ms: u64,
}

/// The host harness that consumes the completion signal.
pub trait HostHarness: Send {
    /// Neutralize the harness's own auto-start hook.
    fn suspend_autostart(&mut self) {}

    /// Start the harness. Called exactly once, after loading finished.
    fn start(&mut self, report: &LoadReport);
}

/// Fires the completion signal.
///
/// [`fire`](Self::fire) takes the notifier by value, so it cannot fire twice.
pub struct CompletionNotifier {
    harness: Option<Box<dyn HostHarness>>,
}

impl std::fmt::Debug for CompletionNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionNotifier")
            .field("harness", &self.harness.is_some())
            .finish()
    }
}

impl CompletionNotifier {
    /// No harness attached; completion is only logged.
    pub fn detached() -> Self {
        Self { harness: None }
    }

    /// Attach a harness, suspending its auto-start right away so it cannot
    /// start before loading finishes.
    pub fn with_harness(mut harness: Box<dyn HostHarness>) -> Self {
        harness.suspend_autostart();
        Self {
            harness: Some(harness),
        }
    }

    pub fn has_harness(&self) -> bool {
        self.harness.is_some()
    }

    pub(crate) fn fire(self, report: &LoadReport) {
        info!(
            manifest = %report.manifest,
            units = report.units,
            mode = %report.mode,
            elapsed_ms = report.elapsed_ms,
            "all units loaded"
        );
        if let Some(mut harness) = self.harness {
            harness.start(report);
        }
    }
}
