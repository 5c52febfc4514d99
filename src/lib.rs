//! partybot - combat decision engine for autonomous party companions
//!
//! Each bot runs a once-per-second decision cycle against a read-only view
//! of the world and issues commands back to its host. The `sandbox` module
//! is a small in-memory host used by the headless runner and the tests.

pub mod bot;
pub mod cli;
pub mod headless;
pub mod sandbox;

// Re-export commonly used types
pub use bot::agent::PartyBot;
pub use bot::role::Role;
pub use headless::{ScenarioConfig, ScenarioResult};
pub use sandbox::SandboxWorld;
