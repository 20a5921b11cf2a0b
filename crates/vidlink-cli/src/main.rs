mod cli;
mod logging;

use crate::cli::Cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(err) = Cli::run_from_args().await {
        eprintln!("vidlink error: {:#}", err);
        std::process::exit(1);
    }
}
