use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_kernel::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "shelf", version, about = "Library lending ledger")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API until ctrl-c
    Serve,
    /// Print the resolved settings as JSON
    Settings,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load().context("failed to load shelf settings")?;

    match cli.command {
        Command::Serve => shelf_app::run(settings).await,
        Command::Settings => {
            let rendered =
                serde_json::to_string_pretty(&settings).context("failed to render settings")?;
            println!("{rendered}");
            Ok(())
        }
    }
}
