//! partybot - scenario runner for the party bot decision engine
//!
//! Loads a JSON scenario, runs a bot party through it in the sandbox and
//! prints (or saves) the result.

use partybot::cli;
use partybot::headless::{run_headless_scenario, ScenarioConfig};

fn main() {
    let args = cli::parse_args();

    let Some(config_path) = args.headless else {
        eprintln!("Nothing to do: pass --headless <CONFIG_FILE> to run a scenario");
        std::process::exit(2);
    };

    let mut config = match ScenarioConfig::load_from_file(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {}", e);
            std::process::exit(1);
        }
    };

    // Command-line flags win over the file
    if let Some(output) = args.output {
        config.output_path = Some(output.to_string_lossy().to_string());
    }
    if let Some(max_duration) = args.max_duration {
        config.max_duration_secs = max_duration;
    }
    if let Some(seed) = args.seed {
        config.random_seed = Some(seed);
    }

    if let Err(e) = run_headless_scenario(config) {
        eprintln!("Error running scenario: {}", e);
        std::process::exit(1);
    }
}
