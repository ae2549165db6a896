use log::LevelFilter;
use std::env;
use std::sync::Once;

/// `filter` uses the `env_logger` directive syntax, e.g. `"debug"` or
/// `"gl_triangles=debug,winit=warn"`. When it is `None`, `RUST_LOG` is used,
/// and without that everything at `info` and above is shown.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

static INIT: Once = Once::new();

/// Installs the global logger. Only the first call in a process has any
/// effect.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        match config.filter.or_else(|| env::var("RUST_LOG").ok()) {
            Some(filter) => {
                builder.parse_filters(&filter);
            }
            None => {
                builder.filter_level(LevelFilter::Info);
            }
        }
        builder.write_style(config.write_style);

        // another logger may already be installed, e.g. by a test harness
        if builder.try_init().is_ok() {
            log::debug!("logging initialized");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_initialization_is_ignored() {
        init_logging(LoggingConfig {
            filter: Some(String::from("debug")),
            ..LoggingConfig::default()
        });
        init_logging(LoggingConfig::default());
        log::info!("still logging");
    }
}
