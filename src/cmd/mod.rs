pub mod area;
pub mod channels;
pub mod click;
pub mod inspect;
pub mod logs;
pub mod render;

use clap::{ArgMatches, Args};
use microdrop::app::AppContext;
use microdrop::config::AppConfig;
use microdrop::controller::{self, SaveMode};
use microdrop::device::{DmfDevice, DEVICE_FILE};
use microdrop::error::{MdResult, MicrodropError};
use microdrop::geometry::DeviceGeometry;
use microdrop::protocol::{Protocol, PROTOCOL_FILE};
use tracing::{info, warn};

/// Arguments every device command shares.
#[derive(Args, Debug, Clone)]
pub struct SessionArgs {
    #[command(flatten)]
    pub config: AppConfig,

    /// Device name (directory under --device-directory).
    #[arg(short, long)]
    pub device: String,

    /// Start from the built-in 35 electrode chip if the device does not exist yet.
    #[arg(long, default_value_t = false)]
    pub prototype: bool,

    /// Protocol step to work on.
    #[arg(long)]
    pub step: Option<usize>,
}

/// Resolves the effective config: file values, then explicit CLI values.
pub fn resolve_config(
    args: &SessionArgs,
    config_file: Option<&str>,
    sub_matches: &ArgMatches,
) -> MdResult<AppConfig> {
    let config = match config_file {
        Some(path) => {
            info!("⚙️  Loading config from: {}", path);
            let mut file_config = AppConfig::load_from_file(path)?;
            file_config.merge_from_cli(&args.config, sub_matches);
            file_config
        }
        None => args.config.clone(),
    };
    config.validate()?;
    Ok(config)
}

pub fn open_context(args: &SessionArgs, config: AppConfig) -> MdResult<AppContext> {
    let dir = config.device_path(&args.device);
    let device_file = dir.join(DEVICE_FILE);

    let device = if device_file.is_file() {
        DmfDevice::load(&device_file)?
    } else if args.prototype {
        warn!("⚠️  No device at {}, using the prototype chip.", device_file.display());
        DmfDevice::new(DeviceGeometry::prototype()).named(args.device.clone())
    } else {
        return Err(MicrodropError::NotFound(format!(
            "device '{}' ({})",
            args.device,
            device_file.display()
        )));
    };

    let protocol_file = dir.join(PROTOCOL_FILE);
    let protocol = if protocol_file.is_file() {
        Protocol::load(&protocol_file)?
    } else {
        Protocol::new()
    };

    let mut ctx = AppContext::new(config, device, protocol);
    if let Some(step) = args.step {
        ctx.protocol.goto_step(step)?;
        controller::get_step_options(&mut ctx);
    }
    Ok(ctx)
}

/// Writes the device and its working protocol back to the device directory.
pub fn save_context(ctx: &mut AppContext) -> MdResult<()> {
    if let Some(dir) = controller::save_device(ctx, SaveMode::Save)? {
        ctx.protocol.save(dir.join(PROTOCOL_FILE))?;
    }
    Ok(())
}
