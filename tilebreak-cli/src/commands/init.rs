//! Init command - write a run configuration file.

use std::path::PathBuf;

use tilebreak::config::{default_config_path, RunConfig};

use crate::error::CliError;

/// Arguments for the init command.
#[derive(Debug, Default)]
pub struct InitArgs {
    pub output: Option<PathBuf>,
    pub folder: Option<PathBuf>,
    pub force: bool,
}

/// Run the init command.
pub fn run(args: InitArgs) -> Result<(), CliError> {
    let path = args.output.unwrap_or_else(default_config_path);
    if path.exists() && !args.force {
        return Err(CliError::FileExists(path.display().to_string()));
    }

    let mut config = RunConfig::default();
    config.input.folder = args.folder;
    config.save_to(&path)?;

    println!("Run configuration: {}", path.display());
    println!();
    println!("Set the input folder and the three period dates, then check it with:");
    println!("  tilebreak plan --config {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.ini");

        run(InitArgs {
            output: Some(path.clone()),
            folder: Some(PathBuf::from("/data/ts")),
            force: false,
        })
        .unwrap();
        let config = RunConfig::load_from(&path).unwrap();
        assert_eq!(config.input.folder, Some(PathBuf::from("/data/ts")));

        let again = run(InitArgs {
            output: Some(path.clone()),
            folder: None,
            force: false,
        });
        assert!(matches!(again, Err(CliError::FileExists(_))));

        run(InitArgs {
            output: Some(path.clone()),
            folder: None,
            force: true,
        })
        .unwrap();
        assert_eq!(RunConfig::load_from(&path).unwrap().input.folder, None);
    }
}
