use super::SessionArgs;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::controller;
use microdrop::error::{MdResult, MicrodropError};

#[derive(Args, Debug, Clone)]
pub struct ChannelsArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[arg(short, long)]
    pub electrode: usize,

    /// Comma separated channel list; empty clears the assignment.
    /// Omit to print the current list.
    #[arg(long)]
    pub set: Option<String>,
}

pub fn run(args: &ChannelsArgs, ctx: &mut AppContext) -> MdResult<()> {
    let current = controller::electrode_channels_text(ctx, args.electrode)
        .ok_or_else(|| MicrodropError::NotFound(format!("electrode {}", args.electrode)))?;

    let Some(text) = &args.set else {
        println!("Electrode {} channels: [{}]", args.electrode, current);
        return Ok(());
    };

    let channels = controller::edit_electrode_channels(ctx, args.electrode, text)?;
    println!(
        "✅ Electrode {} channels: [{}] -> {:?}",
        args.electrode, current, channels
    );
    super::save_context(ctx)
}
