use harvester::intersect_files;

use crate::IntersectArgs;
use crate::config::Config;
use crate::progress::ProgressReporter;

pub(crate) fn handle_intersect(
    args: IntersectArgs,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let projects = args.projects.unwrap_or_else(|| config.paths.projects.clone());
    let by_code = args.by_code.unwrap_or_else(|| config.paths.by_code.clone());
    let output = args.output.unwrap_or_else(|| config.paths.intersect.clone());

    let summary = intersect_files(&projects, &by_code, &output)?;

    ProgressReporter::new().note(&format!(
        "{} of {} starred repositories found by code search ({} rows); saved to {}",
        summary.intersection,
        summary.starred,
        summary.by_code,
        output.display()
    ));
    Ok(())
}
