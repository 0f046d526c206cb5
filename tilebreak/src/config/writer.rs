//! INI serialization: [`RunConfig`] → commented INI text.

use std::path::Path;

use chrono::NaiveDate;

use super::settings::RunConfig;
use crate::dates::DATE_FORMAT;
use crate::params::format_fraction;

pub(super) fn to_config_string(config: &RunConfig) -> String {
    let folder = config
        .input
        .folder
        .as_deref()
        .map(path_to_string)
        .unwrap_or_default();
    let date = |d: Option<NaiveDate>| {
        d.map(|d| d.format(DATE_FORMAT).to_string())
            .unwrap_or_default()
    };

    format!(
        r#"[input]
; Time series folder: one numbered sub-folder per tile, each holding
; dates.csv and stack.vrt
folder = {}
; Comma-separated tile numbers (empty = every tile of the folder)
tiles = {}

[output]
; Root of the result folders
directory = {}
; Name of this run's result folder (empty = input folder name)
name = {}

[periods]
; Dates as YYYY-MM-DD, with history < monitoring_start < monitoring_end
history = {}
monitoring_start = {}
monitoring_end = {}

[model]
; Number of harmonic terms (3 to 10)
harmonic_order = {}
; Observations per seasonal cycle (1 to 365)
frequency = {}
; Fit a linear trend term
trend = {}
; Monitor bandwidth as a fraction of the history length (0.25, 0.5 or 1.0)
hfrac = {}
; Confidence level of the monitor (0.95 to 1.0)
level = {}
; Computation backend: opencl, python or python-mp
backend = {}

[execution]
; Window workers per tile (0 = one per CPU core)
workers = {}
"#,
        folder,
        config.input.tiles.join(", "),
        path_to_string(&config.output.directory),
        config.output.name.as_deref().unwrap_or(""),
        date(config.periods.history),
        date(config.periods.monitoring_start),
        date(config.periods.monitoring_end),
        config.model.harmonic_order,
        config.model.frequency,
        config.model.trend,
        format_fraction(config.model.hfrac),
        format_fraction(config.model.level),
        config.model.backend,
        config.execution.workers,
    )
}

fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::parse_ini;
    use ini::Ini;
    use std::path::PathBuf;

    #[test]
    fn test_written_config_parses_back() {
        let mut config = RunConfig::default();
        config.input.folder = Some(PathBuf::from("/data/ts"));
        config.input.tiles = vec!["1".to_string(), "4".to_string()];
        config.output.name = Some("amazon".to_string());
        config.periods.history = NaiveDate::from_ymd_opt(2010, 1, 1);
        config.periods.monitoring_start = NaiveDate::from_ymd_opt(2015, 1, 1);
        config.periods.monitoring_end = NaiveDate::from_ymd_opt(2018, 12, 31);
        config.model.hfrac = 1.0;
        config.model.trend = true;
        config.execution.workers = 3;

        let text = to_config_string(&config);
        assert!(text.contains("hfrac = 1.0\n"));

        let parsed = parse_ini(&Ini::load_from_str(&text).unwrap()).unwrap();
        assert_eq!(parsed, config);
    }
}
