use clap::{ArgGroup, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "log-validator")]
#[command(version)]
#[command(about = "Validate checksummed log lines, continuously or one file at a time", long_about = None)]
#[command(group(ArgGroup::new("mode").required(true).multiple(true).args(["config", "check_file"])))]
pub struct Cli {
    /// Path to the service configuration file (JSON or TOML)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Validate a single file, report invalid lines to stderr and exit.
    /// Takes precedence over --config, which is then not read.
    #[arg(long = "check-file", value_name = "FILE")]
    pub check_file: Option<PathBuf>,
}

/// What the process was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    CheckFile(PathBuf),
    Service(PathBuf),
}

impl Cli {
    pub fn mode(&self) -> anyhow::Result<Mode> {
        match (&self.check_file, &self.config) {
            (Some(path), _) => Ok(Mode::CheckFile(path.clone())),
            (None, Some(path)) => Ok(Mode::Service(path.clone())),
            // the arg group makes this unreachable through `parse`
            (None, None) => anyhow::bail!("one of --config or --check-file is required"),
        }
    }
}
