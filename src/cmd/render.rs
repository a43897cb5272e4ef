use super::SessionArgs;
use crate::reports;
use clap::Args;
use microdrop::app::AppContext;
use microdrop::canvas::PixelBuffer;
use microdrop::error::MdResult;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output image (binary PPM).
    #[arg(short, long, default_value = "device.ppm")]
    pub out: PathBuf,
}

pub fn run(args: &RenderArgs, ctx: &mut AppContext) -> MdResult<()> {
    let (w, h) = ctx.config.widget_size();
    let mut canvas = PixelBuffer::new(w, h);
    let plan = ctx.redraw(&mut canvas);

    for event in ctx.bus.drain() {
        info!("event: {:?}", event);
    }

    canvas.write_ppm(BufWriter::new(File::create(&args.out)?))?;
    reports::print_render_summary(&plan);
    println!("🖼️  Wrote {}x{} image to {}", w, h, args.out.display());
    Ok(())
}
