use super::SessionArgs;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::canvas::PixelBuffer;
use microdrop::controller::{self, ClickOutcome, PointerEvent};
use microdrop::error::MdResult;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ClickArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Pointer x in widget pixels.
    #[arg(short, long)]
    pub x: f32,

    /// Pointer y in widget pixels.
    #[arg(short, long)]
    pub y: f32,

    /// 1 = primary, 3 = secondary.
    #[arg(short, long, default_value_t = 1)]
    pub button: u8,
}

pub fn run(args: &ClickArgs, ctx: &mut AppContext) -> MdResult<()> {
    let outcome = controller::on_button_press(ctx, PointerEvent::new(args.x, args.y, args.button));

    let (w, h) = ctx.config.widget_size();
    let mut canvas = PixelBuffer::new(w, h);
    let events = ctx.process_events(&mut canvas);
    for e in &events {
        info!("event: {:?}", e);
    }

    match &outcome {
        ClickOutcome::Miss => println!("No electrode at ({}, {}).", args.x, args.y),
        ClickOutcome::Toggled { electrode, channels } => {
            println!("⚡ Electrode {}:", electrode);
            for (c, level) in channels {
                println!("   channel {} -> {}", c, if *level > 0 { "on" } else { "off" });
            }
            super::save_context(ctx)?;
        }
        ClickOutcome::NoChannels { electrode } => {
            println!("⚠️  Electrode {} has no channel assigned.", electrode)
        }
        ClickOutcome::MenuRequested { electrode } => {
            println!("📋 Context menu requested for electrode {}.", electrode)
        }
        ClickOutcome::Ignored { electrode } => {
            println!("Button {} ignored on electrode {}.", args.button, electrode)
        }
    }
    Ok(())
}
