use std::future::Future;

use console::Term;

/// How a long-running command ended.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Outcome<T> {
    Finished(T),
    /// Ctrl+C arrived first; the work was dropped at its last await point.
    Interrupted,
}

/// Drive `work` until it completes or Ctrl+C is pressed.
///
/// Callers flush their stores after an interruption. A second Ctrl+C while
/// that happens quits immediately.
pub(crate) async fn until_interrupted<F: Future>(work: F) -> Outcome<F::Output> {
    tokio::select! {
        output = work => Outcome::Finished(output),
        Ok(()) = tokio::signal::ctrl_c() => {
            let is_tty = Term::stdout().is_term();
            if is_tty {
                eprintln!("\n\nShutdown requested, saving what was collected...");
                eprintln!("Press Ctrl+C again to force quit.");
            } else {
                tracing::warn!("Shutdown requested, saving what was collected");
            }

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    if is_tty {
                        eprintln!("Force quit!");
                    }
                    std::process::exit(130);
                }
            });
            Outcome::Interrupted
        }
    }
}
