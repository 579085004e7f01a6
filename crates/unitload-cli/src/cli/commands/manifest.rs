//! `unitload manifest`: resolve a manifest without loading anything.

use unitload_core::{LoaderResult, Manifest, ManifestSource};

use super::super::args::ManifestArgs;
use crate::exit_codes::SUCCESS;

pub async fn run(args: ManifestArgs) -> anyhow::Result<i32> {
    let manifest = match resolve(&args).await {
        Ok(manifest) => manifest,
        Err(err) => return Ok(super::report_failure(&err)),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(manifest.identifiers())?);
    } else {
        for identifier in manifest.iter() {
            println!("{identifier}");
        }
    }
    Ok(SUCCESS)
}

async fn resolve(args: &ManifestArgs) -> LoaderResult<Manifest> {
    let mut config = super::build_config(&args.source)?;
    let fetcher = super::build_fetcher(&args.source, &config)?;
    let location = config.take_manifest_location()?;
    ManifestSource::from_config(&config)
        .load(fetcher.as_ref(), &location)
        .await
}
