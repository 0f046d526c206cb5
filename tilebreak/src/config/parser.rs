//! INI parsing: `Ini` → [`RunConfig`].
//!
//! The only place where INI key names are mapped to struct fields.

use std::path::PathBuf;

use ini::{Ini, Properties};

use super::file::ConfigFileError;
use super::settings::*;
use crate::dates::parse_date;

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// Non-empty trimmed value of `key`.
fn value<'a>(section: &'a Properties, key: &str) -> Option<&'a str> {
    section.get(key).map(str::trim).filter(|v| !v.is_empty())
}

/// Parse an `Ini` into a [`RunConfig`], starting from the defaults.
pub(super) fn parse_ini(ini: &Ini) -> Result<RunConfig, ConfigFileError> {
    let mut config = RunConfig::default();

    if let Some(section) = ini.section(Some("input")) {
        if let Some(v) = value(section, "folder") {
            config.input.folder = Some(expand_tilde(v));
        }
        if let Some(v) = value(section, "tiles") {
            config.input.tiles =
                parse_tiles(v).map_err(|reason| invalid("input", "tiles", v, &reason))?;
        }
    }

    if let Some(section) = ini.section(Some("output")) {
        if let Some(v) = value(section, "directory") {
            config.output.directory = expand_tilde(v);
        }
        if let Some(v) = value(section, "name") {
            config.output.name = Some(v.to_string());
        }
    }

    if let Some(section) = ini.section(Some("periods")) {
        let date = |key: &str| -> Result<_, ConfigFileError> {
            match value(section, key) {
                Some(v) => parse_date(v)
                    .map(Some)
                    .ok_or_else(|| invalid("periods", key, v, "expected a YYYY-MM-DD date")),
                None => Ok(None),
            }
        };
        config.periods.history = date("history")?;
        config.periods.monitoring_start = date("monitoring_start")?;
        config.periods.monitoring_end = date("monitoring_end")?;
    }

    if let Some(section) = ini.section(Some("model")) {
        let model = &mut config.model;
        if let Some(v) = value(section, "harmonic_order") {
            model.harmonic_order = v
                .parse()
                .ok()
                .filter(|k| HARMONIC_ORDER_RANGE.contains(k))
                .ok_or_else(|| {
                    invalid("model", "harmonic_order", v, "must be an integer from 3 to 10")
                })?;
        }
        if let Some(v) = value(section, "frequency") {
            model.frequency = v
                .parse()
                .ok()
                .filter(|f| FREQUENCY_RANGE.contains(f))
                .ok_or_else(|| {
                    invalid("model", "frequency", v, "must be an integer from 1 to 365")
                })?;
        }
        if let Some(v) = value(section, "trend") {
            model.trend = parse_bool(v)
                .ok_or_else(|| invalid("model", "trend", v, "must be true or false"))?;
        }
        if let Some(v) = value(section, "hfrac") {
            model.hfrac = v
                .parse::<f64>()
                .ok()
                .filter(|h| HFRAC_CHOICES.contains(h))
                .ok_or_else(|| invalid("model", "hfrac", v, "must be one of 0.25, 0.5, 1.0"))?;
        }
        if let Some(v) = value(section, "level") {
            model.level = v
                .parse::<f64>()
                .ok()
                .filter(|l| LEVEL_RANGE.contains(l))
                .ok_or_else(|| invalid("model", "level", v, "must be between 0.95 and 1.0"))?;
        }
        if let Some(v) = value(section, "backend") {
            model.backend = v
                .parse()
                .map_err(|reason: String| invalid("model", "backend", v, &reason))?;
        }
    }

    if let Some(section) = ini.section(Some("execution")) {
        if let Some(v) = value(section, "workers") {
            config.execution.workers = v.parse().map_err(|_| {
                invalid("execution", "workers", v, "must be a non-negative integer (0 = all cores)")
            })?;
        }
    }

    Ok(config)
}

/// Split a comma-separated tile list. Tile ids are non-negative integers,
/// returned in canonical form (`"007"` becomes `"7"`).
pub fn parse_tiles(value: &str) -> Result<Vec<String>, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| match t.parse::<u64>() {
            Ok(n) => Ok(n.to_string()),
            Err(_) => Err(format!("'{}' is not a tile number", t)),
        })
        .collect()
}

/// Parse `true/false`, `yes/no`, `on/off`, `1/0`.
pub(super) fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Backend;
    use chrono::NaiveDate;

    fn parse(content: &str) -> Result<RunConfig, ConfigFileError> {
        parse_ini(&Ini::load_from_str(content).unwrap())
    }

    #[test]
    fn test_full_config() {
        let config = parse(
            "[input]\nfolder = /data/ts\ntiles = 0, 3,12\n\
             [output]\ndirectory = /results\nname = amazon\n\
             [periods]\nhistory = 2010-01-01\nmonitoring_start = 2015-01-01\n\
             monitoring_end = 2018-12-31\n\
             [model]\nharmonic_order = 5\nfrequency = 23\ntrend = yes\nhfrac = 0.5\n\
             level = 0.99\nbackend = python-mp\n\
             [execution]\nworkers = 6\n",
        )
        .unwrap();

        assert_eq!(config.input.folder, Some(PathBuf::from("/data/ts")));
        assert_eq!(config.input.tiles, vec!["0", "3", "12"]);
        assert_eq!(config.output.directory, PathBuf::from("/results"));
        assert_eq!(config.output.name.as_deref(), Some("amazon"));
        assert_eq!(config.periods.history, NaiveDate::from_ymd_opt(2010, 1, 1));
        assert_eq!(config.model.harmonic_order, 5);
        assert_eq!(config.model.frequency, 23);
        assert!(config.model.trend);
        assert_eq!(config.model.hfrac, 0.5);
        assert_eq!(config.model.level, 0.99);
        assert_eq!(config.model.backend, Backend::PythonMp);
        assert_eq!(config.execution.workers, 6);
    }

    #[test]
    fn test_empty_values_keep_defaults() {
        let config = parse("[input]\nfolder =\ntiles =\n[periods]\nhistory =\n").unwrap();
        assert_eq!(config, RunConfig::default());
    }

    #[test]
    fn test_invalid_values() {
        let cases = [
            ("[model]\nharmonic_order = 2\n", "harmonic_order"),
            ("[model]\nfrequency = 400\n", "frequency"),
            ("[model]\nhfrac = 0.3\n", "hfrac"),
            ("[model]\nlevel = 0.9\n", "level"),
            ("[model]\ntrend = maybe\n", "trend"),
            ("[model]\nbackend = cuda\n", "backend"),
            ("[periods]\nhistory = 01/01/2010\n", "history"),
            ("[input]\ntiles = 1,a\n", "tiles"),
            ("[execution]\nworkers = -1\n", "workers"),
        ];
        for (content, expected_key) in cases {
            match parse(content) {
                Err(ConfigFileError::InvalidValue { key, .. }) => assert_eq!(key, expected_key),
                other => panic!("{}: expected invalid value, got {:?}", expected_key, other),
            }
        }
    }

    #[test]
    fn test_tile_ids_are_canonical() {
        assert_eq!(parse_tiles("007, 10,0").unwrap(), vec!["7", "10", "0"]);
        assert!(parse_tiles("-1").is_err());

        let config = parse("[input]\ntiles = 007\n").unwrap();
        assert_eq!(config.input.tiles, vec!["7"]);
    }

    #[test]
    fn test_parse_bool() {
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("2"), None);
    }
}
