use log::debug;
use std::env;
use std::process;

use crate::shell::Shell;
use crate::utils::config::Config;
use crate::utils::log::init_logger;

mod shell;
mod utils;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::new()?;
    init_logger(&config)?;
    debug!("config loaded from {}", config.config_dir.display());

    let mut shell = Shell::new(&config);
    let args: Vec<String> = env::args().skip(1).collect();
    let status = if args.is_empty() {
        shell.run()?
    } else {
        shell.run_once(&args.join(" "))
    };

    process::exit(status & 0xff)
}
