/// Simple Steps CLI
///
/// Lists the operation catalogue and runs pipeline files against the
/// standard library without any host application.

use simple_steps_core::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
