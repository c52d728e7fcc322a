use std::fmt;

use toml::Value;

use crate::error::ConfigError;

/// Value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptKind {
    Bool,
    Int,
    Str,
    List,
}

impl OptKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptKind::Bool => "bool",
            OptKind::Int => "int",
            OptKind::Str => "str",
            OptKind::List => "list",
        }
    }

    pub(crate) fn value_name(&self) -> &'static str {
        match self {
            OptKind::Bool => "BOOL",
            OptKind::Int => "INT",
            OptKind::Str => "STR",
            OptKind::List => "A,B,...",
        }
    }
}

impl fmt::Display for OptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Definition of a single option.
#[derive(Debug, Clone, PartialEq)]
pub struct OptDef {
    pub name: String,
    pub default: Value,
    pub help: String,
    pub kind: OptKind,
}

impl OptDef {
    pub fn new(name: impl Into<String>, kind: OptKind, default: Value, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default,
            help: help.into(),
            kind,
        }
    }

    pub fn bool(name: impl Into<String>, default: bool, help: impl Into<String>) -> Self {
        Self::new(name, OptKind::Bool, Value::Boolean(default), help)
    }

    pub fn int(name: impl Into<String>, default: i64, help: impl Into<String>) -> Self {
        Self::new(name, OptKind::Int, Value::Integer(default), help)
    }

    pub fn str(name: impl Into<String>, default: &str, help: impl Into<String>) -> Self {
        Self::new(name, OptKind::Str, Value::String(default.to_string()), help)
    }

    pub fn list(name: impl Into<String>, default: &[&str], help: impl Into<String>) -> Self {
        let items = default.iter().map(|s| Value::String(s.to_string())).collect();
        Self::new(name, OptKind::List, Value::Array(items), help)
    }

    /// Check a value read from a config file against the option's kind.
    ///
    /// Integers are accepted where strings are expected and numeric strings
    /// where integers are expected; a comma separated string is accepted for lists.
    pub fn coerce(&self, value: Value) -> Result<Value, ConfigError> {
        match (self.kind, value) {
            (OptKind::Bool, v @ Value::Boolean(_)) => Ok(v),
            (OptKind::Int, v @ Value::Integer(_)) => Ok(v),
            (OptKind::Int, Value::String(s)) => s
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.invalid(&s)),
            (OptKind::Str, v @ Value::String(_)) => Ok(v),
            (OptKind::Str, Value::Integer(n)) => Ok(Value::String(n.to_string())),
            (OptKind::List, Value::String(s)) => Ok(split_list(&s)),
            (OptKind::List, Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    v @ Value::String(_) => Ok(v),
                    Value::Integer(n) => Ok(Value::String(n.to_string())),
                    other => Err(self.mismatch(other.type_str())),
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            (_, other) => Err(self.mismatch(other.type_str())),
        }
    }

    /// Parse a raw command line value.
    pub fn parse_raw(&self, raw: &str) -> Result<Value, ConfigError> {
        match self.kind {
            OptKind::Bool => parse_bool(raw).map(Value::Boolean).ok_or_else(|| self.invalid(raw)),
            OptKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| self.invalid(raw)),
            OptKind::Str => Ok(Value::String(raw.to_string())),
            OptKind::List => Ok(split_list(raw)),
        }
    }

    fn mismatch(&self, found: &str) -> ConfigError {
        ConfigError::TypeMismatch {
            name: self.name.clone(),
            expected: self.kind,
            found: found.to_string(),
        }
    }

    fn invalid(&self, raw: &str) -> ConfigError {
        ConfigError::InvalidValue {
            name: self.name.clone(),
            value: raw.to_string(),
        }
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        _ => None,
    }
}

fn split_list(raw: &str) -> Value {
    Value::Array(
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
    )
}
