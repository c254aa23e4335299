//! `--set key=value` attribute overrides.
use std::str::FromStr;

use crate::error::ConfigError;

/// A single attribute override.
///
/// Keys may be dotted to reach into nested tables
/// (`imfile.PollingInterval=10`). Values are parsed as TOML scalars and fall
/// back to plain strings, so `use_relp=true` is a boolean while
/// `protocol=udp` is a string.
///
/// # Examples
///
/// ```
/// use rsyslog_cookbook::config::Override;
///
/// let o = Override::parse("use_relp=true").unwrap();
/// assert_eq!(o.key, "use_relp");
/// assert_eq!(o.value, "true");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    /// Attribute key, possibly dotted.
    pub key: String,
    /// Raw value text.
    pub value: String,
}

impl Override {
    /// Parse `key=value`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOverride`] if there is no `=` or the key
    /// is empty.
    pub fn parse(spec: &str) -> Result<Self, ConfigError> {
        let (key, value) = spec
            .split_once('=')
            .ok_or_else(|| ConfigError::InvalidOverride(spec.to_string()))?;
        let key = key.trim();
        if key.is_empty() || key.split('.').any(str::is_empty) {
            return Err(ConfigError::InvalidOverride(spec.to_string()));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.trim().to_string(),
        })
    }

    /// The override value as a TOML value.
    #[must_use]
    pub fn toml_value(&self) -> toml::Value {
        format!("v = {}", self.value)
            .parse::<toml::Table>()
            .ok()
            .and_then(|mut t| t.remove("v"))
            .unwrap_or_else(|| toml::Value::String(self.value.clone()))
    }

    /// Write this override into `table`, creating intermediate tables.
    ///
    /// # Errors
    ///
    /// Returns an error if an intermediate key already holds a non-table value.
    pub fn apply(&self, table: &mut toml::Table) -> Result<(), ConfigError> {
        let mut segments: Vec<&str> = self.key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            return Err(ConfigError::InvalidOverride(self.key.clone()));
        };

        let mut current = table;
        for segment in segments {
            let entry = current
                .entry(segment.to_string())
                .or_insert_with(|| toml::Value::Table(toml::Table::new()));
            current = match entry {
                toml::Value::Table(t) => t,
                _ => {
                    return Err(ConfigError::InvalidSyntax {
                        file: "<overrides>".to_string(),
                        message: format!("'{segment}' in '{}' is not a table", self.key),
                    });
                }
            };
        }
        current.insert(leaf.to_string(), self.toml_value());
        Ok(())
    }
}

impl FromStr for Override {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parse_rejects_missing_equals() {
        assert!(Override::parse("use_relp").is_err());
    }

    #[test]
    fn parse_rejects_empty_key_segments() {
        assert!(Override::parse("=true").is_err());
        assert!(Override::parse("imfile..x=1").is_err());
    }

    #[test]
    fn value_types() {
        let v = |s: &str| Override::parse(s).unwrap().toml_value();
        assert_eq!(v("use_relp=true"), toml::Value::Boolean(true));
        assert_eq!(v("rate_limit_burst=200"), toml::Value::Integer(200));
        assert_eq!(v("protocol=udp"), toml::Value::String("udp".to_string()));
        assert_eq!(
            v("tls_ca_file=/etc/ssl/ca.crt"),
            toml::Value::String("/etc/ssl/ca.crt".to_string())
        );
        assert_eq!(
            v("protocol=\"tcp\""),
            toml::Value::String("tcp".to_string())
        );
    }

    #[test]
    fn apply_creates_nested_tables() {
        let mut table = toml::Table::new();
        Override::parse("imfile.PollingInterval=10")
            .unwrap()
            .apply(&mut table)
            .unwrap();
        let imfile = table.get("imfile").and_then(toml::Value::as_table).unwrap();
        assert_eq!(imfile.get("PollingInterval"), Some(&toml::Value::Integer(10)));
    }

    #[test]
    fn apply_refuses_to_descend_into_scalar() {
        let mut table = toml::Table::new();
        table.insert("protocol".to_string(), toml::Value::String("tcp".into()));
        let err = Override::parse("protocol.x=1")
            .unwrap()
            .apply(&mut table)
            .unwrap_err();
        assert!(err.to_string().contains("is not a table"));
    }

    #[test]
    fn from_str_matches_parse() {
        let o: Override = "user=root".parse().unwrap();
        assert_eq!(o, Override::parse("user=root").unwrap());
    }
}
