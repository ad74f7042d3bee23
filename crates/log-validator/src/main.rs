use clap::Parser;
use log_validator::cli::{Cli, Mode};
use log_validator::runtime::{boot, serve};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.mode()? {
        Mode::CheckFile(path) => {
            boot::init_logging_basic_global();
            boot::check_file(&path)
        }
        Mode::Service(config_path) => {
            let (config, metrics) = boot::boot(&config_path)?;
            serve::serve(config, metrics).await
        }
    }
}
