use futures::{Future, FutureExt};
use ::tracing::error;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Directives applied when `RUST_LOG` is not set. HTTP plumbing is silenced so
/// request logs come from our own spans.
pub const DEFAULT_FILTER: &str = "info,hyper_util=off,hyper=off,reqwest=off,h2=off";

pub fn setup_tracing() {
    let filter_layer =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = fmt::layer()
        .json()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stdout);

    // A second call (tests, embedded use) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .try_init();
}

/// Sets up tracing, then drives `future` to completion. Errors and panics are
/// logged before being handed back to the caller.
pub async fn run_with_tracing<F, Fut>(future: F) -> anyhow::Result<()>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    setup_tracing();

    match std::panic::AssertUnwindSafe(future()).catch_unwind().await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            error!(error = %e, error_chain = ?e, "Task failed");
            Err(e)
        }
        Err(panic) => {
            let message = capture_panic_details(panic);
            Err(anyhow::anyhow!("panic: {}", message))
        }
    }
}

fn capture_panic_details(e: Box<dyn std::any::Any + Send>) -> String {
    let backtrace = backtrace::Backtrace::new();
    if let Some(s) = e.downcast_ref::<&str>() {
        error!(panic_message = *s, backtrace = ?backtrace, "Panic occurred with message");
        s.to_string()
    } else if let Some(s) = e.downcast_ref::<String>() {
        error!(panic_message = s, backtrace = ?backtrace, "Panic occurred with message");
        s.clone()
    } else {
        error!(backtrace = ?backtrace, "Panic occurred but the payload is not a string");
        "non-string panic payload".to_string()
    }
}
