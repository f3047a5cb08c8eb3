use candlechart::cli::{init_tracing, run, Cli};
use clap::Parser;

fn main() -> std::process::ExitCode {
    init_tracing();
    run(Cli::parse())
}
