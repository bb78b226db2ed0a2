use std::sync::Arc;

use harvester::collect::{ControllerConfig, RunSummary, StarCollector};
use harvester::query::BracketPlan;
use harvester::store::RecordStore;

use crate::StarsArgs;
use crate::commands::shared::{github_client, save_interrupted};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::{Outcome, until_interrupted};

/// Merge CLI flags over the `[collect]` configuration.
fn plan_and_config(args: &StarsArgs, config: &Config) -> (BracketPlan, ControllerConfig) {
    let defaults = config.bracket_plan();
    let plan = BracketPlan {
        start: args.start.unwrap_or(defaults.start),
        stop: args.stop.unwrap_or(defaults.stop),
        step: args.step.unwrap_or(defaults.step),
        max_stars: args.max_stars.or(defaults.max_stars),
    };
    let controller = ControllerConfig {
        initial_page_size: config.collect.initial_page_size,
        initial_increment: config.collect.initial_increment,
        recent_days: args.recent_days.unwrap_or(config.collect.recent_days),
        ..ControllerConfig::default()
    };
    (plan, controller)
}

pub(crate) async fn handle_stars(
    args: StarsArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let (plan, controller) = plan_and_config(&args, config);
    let output = args.output.unwrap_or_else(|| config.paths.projects.clone());

    let mut store = RecordStore::repositories().open(&output)?;
    tracing::info!(
        path = %output.display(),
        existing = store.len(),
        brackets = ?plan.thresholds(),
        "Collecting starred repositories"
    );

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let collector = StarCollector::new(&client, &controller).with_progress(Some(&callback));

    let outcome = until_interrupted(collector.run(&plan, &mut store)).await;
    match outcome {
        Outcome::Finished(result) => {
            reporter.finish();
            let summary = result?;
            report(&summary, &reporter);
        }
        Outcome::Interrupted => save_interrupted(&mut store, &reporter)?,
    }
    Ok(())
}

fn report(summary: &RunSummary, reporter: &ProgressReporter) {
    let collected: usize = summary.completed.iter().map(|b| b.collected).sum();
    reporter.note(&format!(
        "{} brackets done, {} failed; {collected} repositories seen, {} stored",
        summary.completed.len(),
        summary.failed.len(),
        summary.stored
    ));
    for (min_stars, error) in &summary.failed {
        reporter.note(&format!("  bracket at {min_stars} stars: {error}"));
    }
}
