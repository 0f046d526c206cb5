//! Plan command - validate a run and show what it would do.

use console::style;
use tilebreak::resume::{FileResumeLog, ResumeLog};

use super::common::ConfigArgs;
use crate::error::CliError;

/// Run the plan command.
pub fn run(args: ConfigArgs) -> Result<(), CliError> {
    let config = args.load()?;
    let folder = config.open_folder()?;
    let job = config.to_job(&folder)?;
    let save_dir = job.save_dir();
    let resume = FileResumeLog::new();

    println!("{}", style("Run").bold().underlined());
    println!("  Input folder:   {}", folder.root().display());
    println!("  Run name:       {}", job.run_name);
    println!("  Parameters:     {}", job.params.directory_name());
    println!("  Save directory: {}", save_dir.display());
    println!("  Mosaic:         {}", job.mosaic_path().display());
    println!("  Backend:        {}", job.params.backend);
    println!();

    let dates = folder.reference_dates()?;
    println!(
        "  {} dates from {} to {}, {} in the history period",
        dates.len(),
        dates.first(),
        dates.last(),
        job.params.history_len(&dates)
    );
    if let Some(warning) = job.params.history_warning(&dates) {
        println!("  {} {}", style("warning:").yellow().bold(), warning);
    }
    println!();

    println!("{}", style("Tiles").bold().underlined());
    let mut pending = 0;
    for tile in &job.tiles {
        if resume.exists(&save_dir, tile) {
            println!("  {:>6}  {}", tile, style("done").green());
        } else {
            pending += 1;
            println!("  {:>6}  {}", tile, style("pending").yellow());
        }
    }
    println!();
    println!("{} of {} tiles to compute.", pending, job.tiles.len());
    Ok(())
}
