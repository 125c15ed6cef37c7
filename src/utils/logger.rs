use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Directives used when `RUST_LOG` is unset. Verbose runs show the crate's
/// debug output, quiet ones keep other crates to warnings.
fn default_directives(verbose: bool) -> &'static str {
    if verbose {
        "i2p_sam=debug,info"
    } else {
        "i2p_sam=info,warn"
    }
}

fn env_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)))
}

/// Compact human readable lines on stderr; targets only when verbose.
pub fn init_cli_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .with_thread_ids(false)
                .compact(),
        )
        .init();
}

/// JSON lines on stdout, for running `serve` under a log collector.
/// Verbose runs also record the source location of each event.
pub fn init_json_logger(verbose: bool) {
    tracing_subscriber::registry()
        .with(env_filter(verbose))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_file(verbose)
                .with_line_number(verbose)
                .json(),
        )
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives_parse() {
        for verbose in [true, false] {
            let directives = default_directives(verbose);
            assert!(directives.parse::<EnvFilter>().is_ok(), "{}", directives);
        }
        assert!(default_directives(true).contains("i2p_sam=debug"));
        assert!(default_directives(false).contains("i2p_sam=info"));
    }
}
