use console::Term;
use tokio_util::sync::CancellationToken;

/// Exit code for a forced quit.
const FORCE_QUIT_EXIT_CODE: i32 = 130;

/// Set up the Ctrl+C handler for graceful shutdown.
///
/// The first Ctrl+C cancels the returned token so the running sync stops
/// before its next page; the second exits immediately.
pub(crate) fn setup_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let cancel = token.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to install Ctrl+C handler");
            return;
        }

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current page...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current page");
        }

        cancel.cancel();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(FORCE_QUIT_EXIT_CODE);
        }
    });

    token
}
