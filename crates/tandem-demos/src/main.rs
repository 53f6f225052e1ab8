use anyhow::Result;
use clap::Parser;
use tandem_engine::device::GpuInit;
use tandem_engine::logging::{init_logging, LoggingConfig};
use tandem_engine::pipeline::FrameOrchestrator;
use tandem_engine::window::{Runtime, RuntimeConfig};

mod cli;
mod headless;
mod variants;

use cli::Cli;
use variants::DemoConfig;

fn main() {
    let cli = Cli::parse();
    init_logging(LoggingConfig::from_verbosity(cli.verbose));

    if let Err(e) = run(&cli) {
        log::error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cfg = DemoConfig::from_cli(cli);
    log::info!("variant `{}`, seed {}", cli.variant.name(), cfg.seed);
    let spec = variants::build(cli.variant, &cfg)?;

    if cli.headless {
        let report = headless::run(spec, cli.frames.unwrap_or(headless::DEFAULT_FRAMES))?;
        print!("{report}");
        return Ok(());
    }

    let config = RuntimeConfig {
        title: format!("tandem · {}", cli.variant.name()),
        width: cfg.size.0,
        height: cfg.size.1,
        resizable: false,
        max_frames: cli.frames,
    };
    Runtime::run(config, GpuInit::linear_output(), FrameOrchestrator::new(spec))
}
