use std::ffi::OsString;

use clap::{Arg, ArgAction, Command};
use toml::Value;

use crate::{
    def::{OptDef, OptKind},
    error::ConfigError,
    registry::Registry,
};

/// Command line accepting `--name=value` for every registered option.
///
/// Bool options may also be given bare (`--debug`). Dashes are accepted in place of underscores.
pub fn command(registry: &Registry) -> Command {
    registry
        .iter()
        .fold(Command::new("sia"), |cmd, def| cmd.arg(arg_for(def)))
}

fn arg_for(def: &OptDef) -> Arg {
    let mut arg = Arg::new(def.name.clone())
        .long(def.name.clone())
        .help(def.help.clone())
        .value_name(def.kind.value_name())
        .action(ArgAction::Set);

    if def.kind == OptKind::Bool {
        arg = arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true");
    }
    let dashed = def.name.replace('_', "-");
    if dashed != def.name {
        arg = arg.alias(dashed);
    }
    arg
}

/// Parse `args` (program name first) into typed values, in option name order.
pub(crate) fn read<I, T>(registry: &Registry, args: I) -> Result<Vec<(String, Value)>, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command(registry).try_get_matches_from(args)?;

    let mut values = Vec::new();
    for def in registry.iter() {
        if let Some(raw) = matches.get_one::<String>(&def.name) {
            values.push((def.name.clone(), def.parse_raw(raw)?));
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.register_opts([
            OptDef::bool("debug", false, "if logged debug info"),
            OptDef::int("api_port", 8901, "listen port of api"),
            OptDef::str("lock_path", "/var/lock", "lock dir"),
            OptDef::list("notify", &[], "notify targets"),
        ]);
        registry
    }

    #[test]
    fn only_given_options_are_returned() {
        let values = read(&registry(), ["sia", "--api_port=9000", "--debug"]).unwrap();
        assert_eq!(
            values,
            vec![
                ("api_port".to_string(), Value::Integer(9000)),
                ("debug".to_string(), Value::Boolean(true)),
            ]
        );
    }

    #[test]
    fn bool_accepts_explicit_value_and_dashed_alias() {
        let values = read(&registry(), ["sia", "--debug=false", "--lock-path=/tmp/locks"]).unwrap();
        assert_eq!(
            values,
            vec![
                ("debug".to_string(), Value::Boolean(false)),
                ("lock_path".to_string(), Value::String("/tmp/locks".into())),
            ]
        );
    }

    #[test]
    fn list_is_split_on_commas() {
        let values = read(&registry(), ["sia", "--notify=a,b"]).unwrap();
        assert_eq!(
            values[0].1,
            Value::Array(vec![Value::String("a".into()), Value::String("b".into())])
        );
    }

    #[test]
    fn unknown_flag_and_bad_int_fail() {
        assert!(matches!(read(&registry(), ["sia", "--nope=1"]), Err(ConfigError::Cli(_))));
        assert!(matches!(
            read(&registry(), ["sia", "--api_port=http"]),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn help_lists_option_help() {
        let help = command(&registry()).render_help().to_string();
        assert!(help.contains("--api_port"));
        assert!(help.contains("listen port of api"));
    }
}
