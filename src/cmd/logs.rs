use super::SessionArgs;
use crate::reports;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::error::MdResult;
use microdrop::experiment_log::{self, build_rows, list_log_ids, LogSummary};
use std::fs::File;
use std::path::PathBuf;

#[derive(Args, Debug, Clone)]
pub struct LogsArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Experiment to show. Defaults to the most recent one.
    #[arg(long)]
    pub id: Option<u32>,

    /// Export the step table to CSV.
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: &LogsArgs, ctx: &AppContext) -> MdResult<()> {
    let dir = ctx.config.log_directory(&args.session.device);
    let ids = list_log_ids(&dir);
    println!("\n📚 Experiment logs in {}: {:?}", dir.display(), ids);

    let Some(id) = args.id.or_else(|| ids.last().copied()) else {
        return Ok(());
    };

    let (log, protocol) = experiment_log::load_experiment(&dir, id)?;
    let summary = LogSummary::from_log(&log);
    let rows = build_rows(&log, &protocol);

    reports::print_log_summary(id, &summary);
    reports::print_log_rows(&rows);

    if let Some(path) = &args.csv {
        experiment_log::export_rows_csv(&rows, File::create(path)?)?;
        println!("📝 Exported {} rows to {}", rows.len(), path.display());
    }
    Ok(())
}
