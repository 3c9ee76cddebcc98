use beamlet::cli::{Cli, init_logging, run};
use clap::Parser;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;
    run(&cli)
}
