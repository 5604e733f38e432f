pub mod cli;
pub mod commands;
pub mod logging;

use clap::Parser;
use cli::Hotstring;
use commands::handle_command;
use std::process;

/// Run the hotstring CLI application
pub fn run_main() {
    let args = Hotstring::parse();
    logging::init_logging(args.verbose);

    if let Err(e) = handle_command(args.commands) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
