use std::sync::Arc;

use harvester::collect::{CodeSearchCollector, CodeSearchConfig};
use harvester::store::{IdentityKey, RecordStore};

use crate::CodeArgs;
use crate::commands::shared::{github_client, save_interrupted};
use crate::config::Config;
use crate::progress::ProgressReporter;
use crate::shutdown::{Outcome, until_interrupted};

fn search_config(args: &CodeArgs, config: &Config) -> CodeSearchConfig {
    let search_strings = if args.search_strings.is_empty() {
        config.code_search.search_strings.clone()
    } else {
        args.search_strings.clone()
    };
    CodeSearchConfig {
        search_strings,
        max_pages: args.max_pages.unwrap_or(config.code_search.max_pages),
        ..CodeSearchConfig::default()
    }
}

pub(crate) async fn handle_code(
    args: CodeArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let search = search_config(&args, config);
    let output = args.output.unwrap_or_else(|| config.paths.by_code.clone());

    let mut store = RecordStore::new(IdentityKey::repository_column()).open(&output)?;
    tracing::info!(
        path = %output.display(),
        strings = search.search_strings.len(),
        max_pages = search.max_pages,
        "Searching code for RPA fingerprints"
    );

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let collector = CodeSearchCollector::new(&client, &search).with_progress(Some(&callback));

    let outcome = until_interrupted(collector.run(&mut store)).await;
    match outcome {
        Outcome::Finished(result) => {
            reporter.finish();
            let summary = result?;
            reporter.note(&format!(
                "{} pages, {} hits, {} repositories in {}",
                summary.pages,
                summary.hits,
                summary.repositories,
                output.display()
            ));
        }
        Outcome::Interrupted => save_interrupted(&mut store, &reporter)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_replace_configured_strings() {
        let args = CodeArgs {
            search_strings: vec!["extension:robot".to_string()],
            max_pages: Some(2),
            output: None,
        };

        let search = search_config(&args, &Config::default());

        assert_eq!(search.search_strings, vec!["extension:robot"]);
        assert_eq!(search.max_pages, 2);
    }

    #[test]
    fn configured_strings_are_the_default() {
        let args = CodeArgs {
            search_strings: Vec::new(),
            max_pages: None,
            output: None,
        };

        let search = search_config(&args, &Config::default());

        assert_eq!(search.search_strings.len(), 35);
        assert_eq!(search.max_pages, 100);
    }
}
