use super::SessionArgs;
use crate::reports;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::controller;
use microdrop::view::reconcile;

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

pub fn run(ctx: &mut AppContext) {
    let states = controller::get_step_options(ctx).state_of_channels.clone();
    let plan = reconcile(&ctx.device, &states);

    println!(
        "\n🔬 Device: {} | step {} of {} | {} electrodes",
        ctx.device.name.as_deref().unwrap_or("<unnamed>"),
        ctx.protocol.current_step_number() + 1,
        ctx.protocol.len(),
        ctx.device.geometry.len()
    );
    reports::print_electrode_table(&ctx.device, &plan);
    reports::print_render_summary(&plan);
}
