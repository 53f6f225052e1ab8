use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` sets one.
///
/// wgpu's internals are chatty at info level.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Crates whose level follows the `-v` count.
const WORKSPACE_CRATES: [&str; 2] = ["tandem_engine", "tandem_demos"];

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// `env_logger` filter directives; overrides `RUST_LOG` when set.
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    /// Millisecond timestamps on each line.
    pub timestamps: bool,
}

impl LoggingConfig {
    /// 0 keeps the default chain, 1 raises the workspace crates to debug,
    /// 2 or more to trace. wgpu stays at warn either way.
    pub fn from_verbosity(verbose: u8) -> Self {
        let level = match verbose {
            0 => return Self::default(),
            1 => "debug",
            _ => "trace",
        };
        let raised: Vec<String> = WORKSPACE_CRATES.iter().map(|c| format!("{c}={level}")).collect();
        Self {
            filter: Some(format!("{DEFAULT_FILTER},{}", raised.join(","))),
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
            timestamps: false,
        }
    }
}

/// Explicit filter, then `RUST_LOG`, then [`DEFAULT_FILTER`].
fn resolve_filter(explicit: Option<&str>, env: Option<&str>) -> String {
    explicit.or(env).unwrap_or(DEFAULT_FILTER).to_string()
}

static INIT: Once = Once::new();

/// Installs the global `env_logger`. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let env = std::env::var("RUST_LOG").ok();
        let filter = resolve_filter(config.filter.as_deref(), env.as_deref());

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter).write_style(config.write_style);
        if config.timestamps {
            builder.format_timestamp_millis();
        } else {
            builder.format_timestamp(None);
        }
        builder.init();

        log::debug!("logging initialized with `{filter}`");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_raises_workspace_levels() {
        assert_eq!(LoggingConfig::from_verbosity(0).filter, None);

        let debug = LoggingConfig::from_verbosity(1).filter.unwrap_or_default();
        assert!(debug.starts_with(DEFAULT_FILTER));
        assert!(debug.contains("tandem_engine=debug"));

        let trace = LoggingConfig::from_verbosity(3).filter.unwrap_or_default();
        assert!(trace.ends_with("tandem_engine=trace,tandem_demos=trace"));
    }

    #[test]
    fn filter_precedence() {
        assert_eq!(resolve_filter(Some("warn"), Some("trace")), "warn");
        assert_eq!(resolve_filter(None, Some("trace")), "trace");
        assert_eq!(resolve_filter(None, None), DEFAULT_FILTER);
    }
}
