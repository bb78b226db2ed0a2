use std::sync::Arc;

use harvester::collect::{DetailsCollector, DetailsConfig};
use harvester::store::{IdentityKey, RecordStore};

use crate::DetailsArgs;
use crate::commands::shared::{github_client, save_interrupted};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::{Outcome, until_interrupted};

pub(crate) async fn handle_details(
    args: DetailsArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let input = args.input.unwrap_or_else(|| config.paths.by_code.clone());
    let output = args.output.unwrap_or_else(|| config.paths.details.clone());

    let source = RecordStore::new(IdentityKey::repository_column()).open(&input)?;
    if source.is_empty() {
        tracing::warn!(path = %input.display(), "No repositories to fetch details for");
        return Ok(());
    }
    let mut store = RecordStore::new(IdentityKey::repository_column()).open(&output)?;

    let details = DetailsConfig {
        resume: args.resume,
        ..DetailsConfig::default()
    };
    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let collector = DetailsCollector::new(&client, &details).with_progress(Some(&callback));

    let outcome = until_interrupted(collector.run(&source, &mut store)).await;
    match outcome {
        Outcome::Finished(result) => {
            reporter.finish();
            let summary = result?;
            reporter.note(&format!(
                "{} fetched, {} skipped, {} failed; saved to {}",
                summary.fetched,
                summary.skipped,
                summary.failed,
                output.display()
            ));
        }
        Outcome::Interrupted => save_interrupted(&mut store, &reporter)?,
    }
    Ok(())
}
