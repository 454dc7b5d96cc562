use anyhow::Result;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Initialize tracing and enable logging messages according to these
/// options. Intended for binaries and test setups; the library itself
/// only emits events.
pub fn init(level_filter: LevelFilter) -> Result<()> {
    let terminal_layer = fmt::layer().with_writer(std::io::stdout);

    tracing_subscriber::registry()
        .with(terminal_layer.with_filter(env_filter(level_filter)?))
        .try_init()?;

    Ok(())
}

/// Controls which crates' logs actually get logged and from which level.
fn env_filter(level_filter: LevelFilter) -> Result<EnvFilter> {
    Ok(EnvFilter::from_default_env()
        .add_directive(format!("closet={level_filter}").parse()?)
        .add_directive(format!("closet_feed={level_filter}").parse()?)
        .add_directive(format!("docstore={level_filter}").parse()?))
}
