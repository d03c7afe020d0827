// Mender - run a Python script, repair it with a local model when it fails
// Main entry point

use clap::Parser;

use mender::cli::{run, Cli, EXIT_INTERRUPTED};
use mender::executor::RunRegistry;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Ctrl-C outside the interactive prompt (e.g. while waiting on the model).
    // Children run in their own process group and never see the SIGINT, and
    // exit() skips destructors, so stop them and remove their scratch first.
    if let Err(e) = ctrlc::set_handler(|| {
        RunRegistry::global().interrupt_all();
        eprintln!("\n⚠ Interrupted by user");
        std::process::exit(EXIT_INTERRUPTED);
    }) {
        eprintln!("Warning: could not install Ctrl-C handler: {}", e);
    }

    std::process::exit(run(cli).await);
}
