//! Logging configuration and initialization.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Lifecycle events only.
    #[default]
    Production,
    /// More operational detail.
    Verbose,
    /// Detailed info for troubleshooting.
    Debug,
    /// Everything, including per-chunk classifier traces.
    Trace,
    /// Warnings and errors only.
    Quiet,
}

impl LogPreset {
    /// Determine the preset from CLI flags; the noisiest requested wins,
    /// except quiet, which always wins.
    pub fn from_cli(verbose: bool, debug: bool, trace: bool, quiet: bool) -> Self {
        if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        }
    }

    /// Build an EnvFilter, honoring RUST_LOG when set.
    pub fn build_filter(self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }
        let directives = match self {
            LogPreset::Production => "rgview::session=info,rgview::process=info,rgview::cache=info,rgview::edit=info",
            LogPreset::Verbose => "rgview=info",
            LogPreset::Debug => "rgview=debug",
            LogPreset::Trace => "rgview=trace",
            LogPreset::Quiet => "rgview=warn",
        };
        EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize the tracing subscriber.
pub fn init(preset: LogPreset) {
    tracing_subscriber::registry()
        .with(preset.build_filter())
        .with(
            fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr),
        )
        .init();
}
