//! Command-line interface for the scenario runner

use clap::Parser;
use std::path::PathBuf;

/// Party bot decision engine, driven against an in-memory sandbox
#[derive(Parser, Debug)]
#[command(name = "partybot")]
#[command(about = "Run party bot scenarios headlessly")]
#[command(version)]
pub struct Args {
    /// Run the scenario described by this JSON config file
    #[arg(long, value_name = "CONFIG_FILE")]
    pub headless: Option<PathBuf>,

    /// Output path for the JSON result
    #[arg(long, value_name = "OUTPUT_PATH")]
    pub output: Option<PathBuf>,

    /// Maximum scenario duration in seconds (overrides the config)
    #[arg(long)]
    pub max_duration: Option<f32>,

    /// Random seed for a deterministic run (overrides the config)
    #[arg(long)]
    pub seed: Option<u64>,
}

pub fn parse_args() -> Args {
    Args::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_parse() {
        let args = Args::parse_from([
            "partybot",
            "--headless",
            "scenarios/wolves.json",
            "--seed",
            "42",
            "--max-duration",
            "30",
        ]);
        assert_eq!(args.headless, Some(PathBuf::from("scenarios/wolves.json")));
        assert_eq!(args.seed, Some(42));
        assert_eq!(args.max_duration, Some(30.0));
        assert!(args.output.is_none());
    }
}
