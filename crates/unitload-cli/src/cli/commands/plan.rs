//! `unitload plan`: run a full load session against a recording environment.

use serde::Serialize;
use tracing::info;
use unitload_core::{
    load, CompletionNotifier, HostHarness, InsertionEvent, LoadMode, LoadReport, LoaderResult,
    RecordingEnvironment,
};

use super::super::args::PlanArgs;
use crate::exit_codes::SUCCESS;

#[derive(Serialize)]
struct PlanOutput<'a> {
    report: &'a LoadReport,
    events: &'a [InsertionEvent],
}

/// Stands in for a test harness: logs instead of running specs.
struct LogHarness;

impl HostHarness for LogHarness {
    fn suspend_autostart(&mut self) {
        info!("harness autostart suspended");
    }

    fn start(&mut self, report: &LoadReport) {
        info!(units = report.units, "harness started");
    }
}

pub async fn run(args: PlanArgs) -> anyhow::Result<i32> {
    let mut env = RecordingEnvironment::new();
    let report = match plan(&args, &mut env).await {
        Ok(report) => report,
        Err(err) => return Ok(super::report_failure(&err)),
    };

    if args.json {
        let output = PlanOutput {
            report: &report,
            events: env.events(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        for (index, identifier) in report.insertion_order.iter().enumerate() {
            println!("{index:>5}  {identifier}");
        }
        eprintln!(
            "{} units, mode {}, peak {} in flight, {} ms",
            report.units, report.mode, report.peak_in_flight, report.elapsed_ms
        );
    }
    Ok(SUCCESS)
}

async fn plan(args: &PlanArgs, env: &mut RecordingEnvironment) -> LoaderResult<LoadReport> {
    let mut config = super::build_config(&args.source)?;
    if let Some(mode) = args.mode {
        config.mode = mode.into();
    }
    if let Some(limit) = args.concurrency {
        config.concurrency_limit = limit;
    }
    let fetcher = super::build_fetcher(&args.source, &config)?;

    let notifier = if config.mode == LoadMode::TestHarness {
        CompletionNotifier::with_harness(Box::new(LogHarness))
    } else {
        CompletionNotifier::detached()
    };
    load(&mut config, fetcher, env, notifier).await
}
