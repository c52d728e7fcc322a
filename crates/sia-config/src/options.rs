use std::{ffi::OsString, fs, path::Path, sync::OnceLock};

use serde::de::DeserializeOwned;
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::{cli, common::CONFIG_OPT, def::OptDef, error::ConfigError, registry::Registry};

static GLOBAL: OnceLock<Options> = OnceLock::new();

/// Current values of every registered option.
#[derive(Debug, Clone)]
pub struct Options {
    registry: Registry,
    values: Table,
}

impl Options {
    /// Options holding the registry's defaults.
    pub fn new(registry: Registry) -> Self {
        let values = registry
            .iter()
            .map(|def| (def.name.clone(), def.default.clone()))
            .collect();
        Self { registry, values }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Set a known option, checking the value against its definition.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), ConfigError> {
        let def = self
            .registry
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
        let value = def.coerce(value)?;
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Apply `name = value` pairs from a TOML file.
    pub fn parse_config_file(&mut self, path: &Path) -> Result<(), ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let table: Table = toml::from_str(&source).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for (name, value) in table {
            if !self.registry.contains(&name) {
                warn!(option = %name, file = %path.display(), "ignoring undefined option");
                continue;
            }
            self.set(&name, value)?;
        }
        debug!(file = %path.display(), "loaded config file");
        Ok(())
    }

    /// Apply command line values (program name first).
    ///
    /// A `--config` value is loaded before the remaining flags, so flags win over the file.
    pub fn parse_command_line<I, T>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let values = cli::read(&self.registry, args)?;
        self.apply_command_line(values)
    }

    fn apply_command_line(&mut self, values: Vec<(String, Value)>) -> Result<(), ConfigError> {
        let (config, rest): (Vec<_>, Vec<_>) = values.into_iter().partition(|(name, _)| name == CONFIG_OPT);

        for (name, value) in config {
            self.set(&name, value)?;
            let path = self.get::<String>(CONFIG_OPT)?;
            self.parse_config_file(Path::new(&path))?;
        }
        for (name, value) in rest {
            self.set(&name, value)?;
        }
        Ok(())
    }

    /// Load the config file and command line the way every sia process does.
    ///
    /// Without `--config` the default config path is read if it exists.
    pub fn load<I, T>(&mut self, args: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let values = cli::read(&self.registry, args)?;

        if !values.iter().any(|(name, _)| name == CONFIG_OPT) {
            if let Ok(path) = self.get::<String>(CONFIG_OPT) {
                match self.parse_config_file(Path::new(&path)) {
                    Err(e) if e.is_not_found() => debug!(file = %path, "no config file, using defaults"),
                    other => other?,
                }
            }
        }
        self.apply_command_line(values)
    }

    /// Typed value of one option.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ConfigError> {
        let value = self
            .values
            .get(name)
            .ok_or_else(|| ConfigError::UnknownOption(name.to_string()))?;
        value.clone().try_into().map_err(|source| ConfigError::Convert {
            name: name.to_string(),
            source,
        })
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn as_map(&self) -> &Table {
        &self.values
    }

    /// Deserialize all values into a struct, e.g. [`CommonOptions`](crate::CommonOptions).
    pub fn typed<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        Value::Table(self.values.clone())
            .try_into()
            .map_err(|source| ConfigError::Convert {
                name: "*".to_string(),
                source,
            })
    }

    /// Make these options the process-wide instance. Succeeds once.
    pub fn install(self) -> Result<&'static Options, ConfigError> {
        GLOBAL.set(self).map_err(|_| ConfigError::AlreadyInstalled)?;
        GLOBAL.get().ok_or(ConfigError::AlreadyInstalled)
    }

    pub fn global() -> Option<&'static Options> {
        GLOBAL.get()
    }
}

/// Register the common options plus `extra`, then load config file and command line.
///
/// `extra` definitions replace common ones of the same name. The old option loader registered
/// common options last, so there a common definition won; callers relying on that must not
/// redefine common names.
pub fn get_options<I, T>(extra: &[OptDef], args: I) -> Result<Options, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let mut registry = Registry::with_common();
    registry.register_opts(extra.iter().cloned());

    let mut options = Options::new(registry);
    options.load(args)?;
    Ok(options)
}
