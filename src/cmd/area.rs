use super::SessionArgs;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::controller;
use microdrop::error::MdResult;

#[derive(Args, Debug, Clone)]
pub struct AreaArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    #[arg(short, long)]
    pub electrode: usize,

    /// Measured electrode area in mm². Omit to print the calibrated area.
    #[arg(short, long)]
    pub area: Option<String>,
}

pub fn run(args: &AreaArgs, ctx: &mut AppContext) -> MdResult<()> {
    let Some(text) = &args.area else {
        let current = controller::electrode_area_text(ctx, args.electrode);
        if current.is_empty() {
            println!("Device is not calibrated.");
        } else {
            println!("Electrode {} area: {} mm²", args.electrode, current);
        }
        return Ok(());
    };

    if let Some(scale) = controller::edit_electrode_area(ctx, args.electrode, text)? {
        println!("📏 Device scale: {:.4} mm² per unit²", scale);
    }
    super::save_context(ctx)
}
