//! Headless mode for scripted scenarios
//!
//! Runs a bot party against hostiles in the in-memory sandbox, with no
//! graphical output, for automated testing and quick behavior checks.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- --headless scenarios/warrior_priest_vs_wolves.json
//! ```
//!
//! ## JSON Configuration
//!
//! ```json
//! {
//!   "name": "Wolves",
//!   "leader": { "class": "Warrior", "position": [0, 0, 0], "abilities": [78] },
//!   "party": [{ "class": "Priest", "role": "Healer", "position": [-6, 0, 0], "abilities": [2050] }],
//!   "hostiles": [{ "name": "Wolf", "health": 900, "position": [25, 0, 0] }],
//!   "random_seed": 7,
//!   "max_duration_secs": 120
//! }
//! ```

pub mod config;
pub mod runner;

pub use config::ScenarioConfig;
pub use runner::{run_headless_scenario, run_scenario, Outcome, ScenarioResult};
