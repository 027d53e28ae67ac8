//! # Chime
//!
//! A command-line player for the chime mixing engine.

use log::error;

mod args;
mod logging;
mod runner;

fn main() {
    logging::init();
    let matches = args::build_cli().get_matches();

    let code = match runner::run(&matches) {
        Ok(code) => code,
        Err(err) => {
            error!("{}", err);
            -1
        }
    };

    std::process::exit(code)
}
