use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber, logging to stderr so stdout stays clean
/// for command output. `RUST_LOG` overrides everything else.
pub fn init(configured: LevelFilter, verbose: u8) {
    let level = effective_level(configured, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Each `-v` raises the configured level by one step, up to `trace`.
fn effective_level(configured: LevelFilter, verbose: u8) -> LevelFilter {
    match verbose {
        0 => configured,
        1 => configured.max(LevelFilter::DEBUG),
        _ => LevelFilter::TRACE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(LevelFilter::INFO, 0, LevelFilter::INFO)]
    #[case(LevelFilter::INFO, 1, LevelFilter::DEBUG)]
    #[case(LevelFilter::TRACE, 1, LevelFilter::TRACE)]
    #[case(LevelFilter::WARN, 2, LevelFilter::TRACE)]
    #[case(LevelFilter::OFF, 0, LevelFilter::OFF)]
    fn test_effective_level(#[case] configured: LevelFilter, #[case] verbose: u8, #[case] expected: LevelFilter) {
        assert_eq!(effective_level(configured, verbose), expected);
    }
}
