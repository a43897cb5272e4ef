use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use std::process;
use tracing::{error, info, Level};

mod cmd;
mod reports;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON config file; explicit command line options override it.
    #[arg(global = true, long)]
    config: Option<String>,

    #[arg(global = true, long, default_value_t = false)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Electrode table with channel assignments and states.
    Inspect(cmd::inspect::InspectArgs),
    /// Simulate a pointer press on the device canvas.
    Click(cmd::click::ClickArgs),
    /// Show or edit the channels driving an electrode.
    Channels(cmd::channels::ChannelsArgs),
    /// Calibrate the device scale from an electrode's measured area.
    Area(cmd::area::AreaArgs),
    /// Draw the device to an image.
    Render(cmd::render::RenderArgs),
    /// Browse experiment logs.
    Logs(cmd::logs::LogsArgs),
}

impl Commands {
    fn session(&self) -> (&cmd::SessionArgs, &'static str) {
        match self {
            Commands::Inspect(a) => (&a.session, "inspect"),
            Commands::Click(a) => (&a.session, "click"),
            Commands::Channels(a) => (&a.session, "channels"),
            Commands::Area(a) => (&a.session, "area"),
            Commands::Render(a) => (&a.session, "render"),
            Commands::Logs(a) => (&a.session, "logs"),
        }
    }
}

fn main() {
    let matches = Cli::command().get_matches();
    let cli = Cli::from_arg_matches(&matches).unwrap_or_else(|e| e.exit());

    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();

    let (session, sub_name) = cli.command.session();
    let Some(sub_matches) = matches.subcommand_matches(sub_name) else {
        error!("❌ Missing arguments for '{}'", sub_name);
        process::exit(2);
    };

    let config = cmd::resolve_config(session, cli.config.as_deref(), sub_matches)
        .unwrap_or_else(|e| {
            error!("❌ {}", e);
            process::exit(1);
        });

    info!("📂 Opening device: {}", session.device);
    let mut ctx = cmd::open_context(session, config).unwrap_or_else(|e| {
        error!("❌ {}", e);
        process::exit(1);
    });

    let result = match &cli.command {
        Commands::Inspect(_) => {
            cmd::inspect::run(&mut ctx);
            Ok(())
        }
        Commands::Click(args) => cmd::click::run(args, &mut ctx),
        Commands::Channels(args) => cmd::channels::run(args, &mut ctx),
        Commands::Area(args) => cmd::area::run(args, &mut ctx),
        Commands::Render(args) => cmd::render::run(args, &mut ctx),
        Commands::Logs(args) => cmd::logs::run(args, &ctx),
    };

    if let Err(e) = result {
        if e.is_validation() {
            error!("⚠️  {}", e);
        } else {
            error!("❌ {}", e);
        }
        process::exit(1);
    }
}
