//! `projfs-reflector`: project a layer directory into a virtualization root.
//!
//! Usage:
//!   projfs-reflector --sourceroot <dir> --virtroot <dir> [-n] [-t] [-d]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use projfs_reflector::{FsLayer, ProviderOptions, ReflectorProvider, VirtualizationInstance};

#[derive(Parser, Debug)]
#[command(name = "projfs-reflector", version, about = "Reflect a layer directory through ProjFS")]
struct Args {
    /// Directory whose contents are projected
    #[arg(long = "sourceroot", value_name = "PATH")]
    source_root: PathBuf,

    /// Virtualization root; created and marked if absent
    #[arg(long = "virtroot", value_name = "PATH")]
    virt_root: PathBuf,

    /// Subscribe to file system operation notifications
    #[arg(short = 'n', long = "notifications")]
    notifications: bool,

    /// Signal named events for an external test harness
    #[arg(short = 't', long = "testmode", hide = true)]
    test_mode: bool,

    /// Veto deletes of projected items
    #[arg(short = 'd', long = "denyDeletes", hide = true)]
    deny_deletes: bool,
}

impl Args {
    fn options(&self) -> ProviderOptions {
        ProviderOptions::new(&self.source_root, &self.virt_root)
            .with_notifications(self.notifications)
            .with_test_mode(self.test_mode)
            .with_deny_deletes(self.deny_deletes)
    }
}

fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn run(args: &Args) -> projfs_reflector::Result<()> {
    let options: ProviderOptions = args.options();
    let layer = Arc::new(FsLayer::new(&options.source_root)?);
    let provider = Arc::new(ReflectorProvider::new(layer, &options));

    let instance = VirtualizationInstance::new(options, provider)?;
    instance.start()?;

    println!("Virtualizing {:?} at {:?}", args.source_root, args.virt_root);
    println!("Press Enter to stop the provider...");
    let mut line = String::new();
    std::io::stdin()
        .read_line(&mut line)
        .map_err(|e| projfs_reflector::ProviderError::io_error("<stdin>", e))?;

    instance.stop()
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::from(2)
        }
    }
}
