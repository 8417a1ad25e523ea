/// Refrain CLI
///
/// Runs the bundled demo programs and prints the effective configuration.
/// Useful for watching the engine step through yields, delegation and host
/// requests without an embedding language.
use refrain_core::cli;

fn main() {
    if let Err(e) = cli::run_cli() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
