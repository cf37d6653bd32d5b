//! `tera-render` - render a Tera template from a template directory.
//!
//! See [`tera_renderer::cli`] for usage.

use clap::Parser;
use tera_renderer::cli::{self, Cli};

fn main() {
    let cli = Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    if let Err(error) = cli.execute() {
        cli::user_friendly_error(error).display();
        std::process::exit(1);
    }
}
