mod cmd;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cmd::{HashArgs, ResolveArgs, SetupArgs};
use output::OutputFormat;

/// setup-sdl - Build, install and cache SDL and its satellite libraries in CI
#[derive(Parser)]
#[command(name = "setup-sdl")]
#[command(author, version, about, long_about = None)]
struct Cli {
  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Resolve, build (or restore from cache) and install the requested projects
  Setup(SetupArgs),

  /// Resolve a version request to a git reference without building
  Resolve(ResolveArgs),

  /// Print the order in which projects would be built
  Order {
    /// Project names (e.g. SDL SDL_ttf sdl2-compat)
    #[arg(required = true)]
    projects: Vec<String>,

    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },

  /// Print the state fingerprint of a build
  Hash(HashArgs),

  /// Display detected platform and package manager
  Info {
    /// Output format
    #[arg(short = 'o', long, value_enum, default_value = "text")]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  let cli = Cli::parse();

  match cli.command {
    Commands::Setup(args) => cmd::cmd_setup(args),
    Commands::Resolve(args) => cmd::cmd_resolve(args),
    Commands::Order { projects, output } => cmd::cmd_order(&projects, output),
    Commands::Hash(args) => cmd::cmd_hash(args),
    Commands::Info { output } => cmd::cmd_info(output),
  }
}
