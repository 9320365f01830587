use std::process;

use clap::Parser;

use dotspace::cli::Args;

fn main() {
    let args = Args::parse();
    dotspace::init_logging(args.debug);
    match dotspace::run(args) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            process::exit(3);
        }
    }
}
