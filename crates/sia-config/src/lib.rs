//! Option registry, config file and command line handling for sia processes.
mod cli;
pub use cli::command;

mod common;
pub use common::{CONFIG_OPT, CommonOptions, DEFAULT_CONFIG_PATH, DEFAULT_SQL_CONNECTION, common_opts};

mod def;
pub use def::{OptDef, OptKind};

mod error;
pub use error::ConfigError;

mod options;
pub use options::{Options, get_options};

mod registry;
pub use registry::Registry;
