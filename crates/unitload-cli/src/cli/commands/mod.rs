use std::sync::Arc;

use tracing::error;
use unitload_core::{
    FileFetcher, HttpFetcher, LoaderConfig, LoaderError, LoaderResult, PathRewrite, UnitFetcher,
};

use super::args::*;
use crate::exit_codes::SUCCESS;

pub mod manifest;
pub mod plan;

pub async fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    match cli.cmd {
        Command::Plan(args) => plan::run(args).await,
        Command::Manifest(args) => manifest::run(args).await,
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

/// `UNITLOAD_*` environment values, overridden by whatever flags were given.
pub(crate) fn build_config(source: &SourceArgs) -> LoaderResult<LoaderConfig> {
    let mut config = LoaderConfig::from_env()?;
    if let Some(manifest) = &source.manifest {
        config.manifest_location = Some(manifest.clone());
    }
    if let Some(base_url) = &source.base_url {
        config.base_url = base_url.clone();
    }
    if let Some(timeout) = source.timeout {
        config.timeout_secs = timeout;
    }
    config.manifest_format = source.format.into();
    config.path_rewrite = PathRewrite {
        strip_prefix: source.strip_prefix.clone(),
        prepend: source.prepend.clone(),
    };
    Ok(config)
}

pub(crate) fn build_fetcher(
    source: &SourceArgs,
    config: &LoaderConfig,
) -> LoaderResult<Arc<dyn UnitFetcher>> {
    match &source.root {
        Some(root) => Ok(Arc::new(FileFetcher::new(root.clone()))),
        None => Ok(Arc::new(HttpFetcher::new(config)?)),
    }
}

/// Log a loader failure and return its exit code.
pub(crate) fn report_failure(err: &LoaderError) -> i32 {
    error!(error = %err, status = ?err.status(), "load failed");
    eprintln!("error: {err}");
    err.exit_code()
}
