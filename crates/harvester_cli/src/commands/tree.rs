use console::{Term, style};
use harvester::github::list_config_files;

use crate::commands::shared::github_client;
use crate::config::Config;

/// Print the configuration-looking files of each repository.
pub(crate) async fn handle_config_files(
    repositories: Vec<String>,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = github_client(config)?;
    let is_tty = Term::stdout().is_term();

    for repository in repositories {
        let files = list_config_files(&client, &repository).await;
        if is_tty {
            println!("{} ({} files)", style(&repository).bold(), files.len());
            for file in &files {
                println!("  {file}");
            }
        } else {
            tracing::info!(repository = %repository, files = files.len(), "Config files");
            for file in files {
                println!("{repository}\t{file}");
            }
        }
    }
    Ok(())
}
