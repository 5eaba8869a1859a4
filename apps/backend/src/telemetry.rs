use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default log directives when RUST_LOG is unset. The auth surface is
/// chatty at info; its HTTP clients are only interesting when they fail.
const DEFAULT_DIRECTIVES: &str = "info,actix_web=info,reqwest=warn";

/// Install the global JSON subscriber for the server binary.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .json(),
        )
        .init();
}
