//! In-memory sandbox host
//!
//! A small stand-in for the simulation the decision engine normally runs
//! inside. It answers every world and ability query, applies the commands
//! agents record, and advances time with deliberately simple rules.
//!
//! ## Usage
//!
//! ```ignore
//! let mut world = SandboxWorld::new(load_ability_catalog()?);
//! let mut buffer = CommandBuffer::new();
//! bot.update(100, &world, &world, &mut buffer);
//! world.apply(&mut buffer);
//! world.tick(100);
//! ```

pub mod rules;
pub mod world;

pub use world::{CastRecord, Motion, SandboxUnit, SandboxWorld, UnitStats};
