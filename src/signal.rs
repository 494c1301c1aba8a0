//! Interrupt handling.
//!
//! The launcher's only suspension point is waiting for the operator to stop
//! it. The listener below turns Ctrl+C (and SIGTERM on Unix) into a
//! cancelled [`CancellationToken`] that the supervisor races against its
//! startup pauses and its final wait. A second interrupt while the services
//! are being stopped gives up on the orderly shutdown.

use tokio_util::sync::CancellationToken;

/// Exit status for a second interrupt (128 + SIGINT).
pub const FORCED_EXIT_CODE: i32 = 130;

/// Spawn a task that cancels the returned token on the first interrupt and
/// exits the process on the second.
pub fn install_interrupt_listener() -> CancellationToken {
    install_with(|| {
        tracing::warn!("second interrupt received, exiting without cleanup");
        std::process::exit(FORCED_EXIT_CODE)
    })
}

/// Like [`install_interrupt_listener`], but runs `on_second` instead of
/// exiting when a second interrupt arrives.
pub fn install_with<F>(on_second: F) -> CancellationToken
where
    F: FnOnce() + Send + 'static,
{
    let token = CancellationToken::new();
    let trigger = token.clone();
    // Register before spawning so a signal sent right after we return is
    // already routed to us.
    let mut interrupts = Interrupts::register();
    tokio::spawn(async move {
        let name = interrupts.next().await;
        tracing::info!("{} received, shutting down", name);
        trigger.cancel();

        let name = interrupts.next().await;
        tracing::info!("{} received again", name);
        on_second();
    });
    token
}

struct Interrupts {
    #[cfg(unix)]
    sigterm: Option<tokio::signal::unix::Signal>,
}

impl Interrupts {
    #[cfg(unix)]
    fn register() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = match signal(SignalKind::terminate()) {
            Ok(sigterm) => Some(sigterm),
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                None
            }
        };
        Self { sigterm }
    }

    #[cfg(not(unix))]
    fn register() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn next(&mut self) -> &'static str {
        match self.sigterm.as_mut() {
            Some(sigterm) => {
                tokio::select! {
                    name = ctrl_c() => name,
                    _ = sigterm.recv() => "SIGTERM",
                }
            }
            None => ctrl_c().await,
        }
    }

    #[cfg(not(unix))]
    async fn next(&mut self) -> &'static str {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    if let Err(e) = tokio::signal::ctrl_c().await {
        // Without a handler we can never be interrupted; wait forever rather
        // than tearing the stack down immediately.
        tracing::error!("Ctrl+C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}
