use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use team_update_report::cli::{normalize, Cli};
use team_update_report::{pipeline, util};

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  // stdout carries documents and JSON summaries; logs go to stderr
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_target(false)
    .init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  init_tracing();

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: run the selected action
  pipeline::execute(&cfg)
}
