use std::sync::atomic::{AtomicBool, Ordering};

use console::Term;

/// Global shutdown flag, checked by sync cycles between repositories.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// The flag itself, for [`repowatch::sync::sync_all_until`].
pub(crate) fn flag() -> &'static AtomicBool {
    &SHUTDOWN_REQUESTED
}

#[inline]
pub(crate) fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Acquire)
}

#[inline]
fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Release);
}

/// Resolve on Ctrl+C or, on Unix, SIGTERM.
async fn termination_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

/// Set up the signal handler for graceful shutdown.
///
/// The first signal sets the flag; a second Ctrl+C force-quits.
pub(crate) fn setup_shutdown_handler() {
    tokio::spawn(async {
        termination_signal().await;

        let is_tty = Term::stdout().is_term();
        if is_tty {
            eprintln!("\n\nShutdown requested, finishing current operations...");
            eprintln!("Press Ctrl+C again to force quit.");
        } else {
            tracing::warn!("Shutdown requested, finishing current operations");
        }

        request_shutdown();

        if tokio::signal::ctrl_c().await.is_ok() {
            if is_tty {
                eprintln!("Force quit!");
            }
            std::process::exit(130);
        }
    });
}

/// Resolve once shutdown has been requested. Handed to
/// `axum::serve(..).with_graceful_shutdown`.
pub(crate) async fn wait_for_shutdown() {
    let mut tick = tokio::time::interval(std::time::Duration::from_millis(200));
    while !is_shutdown_requested() {
        tick.tick().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn wait_for_shutdown_resolves_after_the_flag_is_set() {
        let waiter = tokio::spawn(wait_for_shutdown());
        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        assert!(!waiter.is_finished());

        request_shutdown();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish")
            .expect("waiter task");
        assert!(flag().load(Ordering::Acquire));
    }
}
