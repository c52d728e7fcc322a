use std::io::IsTerminal;

use crate::logger::{format::LoggerFormat, level::LoggerLevel};

/// Crates whose output `verbose` turns up to `trace`.
const VERBOSE_TARGETS: &[&str] = &["sia_core", "sia_config", "sia_client", "sia_db", "sia_agentd"];

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub format: LoggerFormat,
    pub level: LoggerLevel,
    pub with_targets: bool,
    pub use_color: bool,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        let use_color = cfg!(test) || std::io::stdout().is_terminal();
        Self {
            format: LoggerFormat::Text,
            level: LoggerLevel::default(),
            with_targets: true,
            use_color,
        }
    }
}

impl LoggerConfig {
    /// Map the service's `debug` / `verbose` switches onto a filter.
    ///
    /// `debug` lowers the global level to `debug`; `verbose` additionally traces this workspace's crates.
    pub fn from_flags(debug: bool, verbose: bool) -> Self {
        let base = if debug { "debug" } else { "info" };
        let directive = if verbose {
            let targets: Vec<String> = VERBOSE_TARGETS.iter().map(|t| format!("{t}=trace")).collect();
            format!("{base},{}", targets.join(","))
        } else {
            base.to_string()
        };
        Self {
            level: LoggerLevel(directive),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LoggerFormat) -> Self {
        self.format = format;
        self
    }
}
