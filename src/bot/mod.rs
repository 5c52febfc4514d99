//! Party Bot Decision Engine
//!
//! Per-agent combat decisions for bot-controlled party members. Each agent
//! is a `PartyBot` that the host ticks; every tick it picks at most one
//! cast or movement command from its role, its loadout and what it can see
//! of the world.
//!
//! ## Layout
//! - `world`, `commands`: the narrow interfaces to the host simulation
//! - `abilities`, `ability_config`: immutable ability reference data
//! - `slot_table`, `loadout`, `choice`: known abilities sorted into slots
//! - `role`: role assignment from class and known abilities
//! - `eligibility`: can this ability be cast on that target right now
//! - `targeting`: heal, dispel, buff, attack and crowd-control selection
//! - `movement`: flee, follow, chase and spacing destinations
//! - `coordination`: others on target and threat standing
//! - `agent`, `class_ai`: the decision loop and per-class cascades
//! - `mechanics`, `consumables`: encounter rules and item use
//! - `session`: login, tick and protocol message hooks

pub mod abilities;
pub mod ability_config;
pub mod agent;
pub mod character;
pub mod choice;
pub mod class_ai;
pub mod commands;
pub mod consumables;
pub mod context;
pub mod coordination;
pub mod eligibility;
pub mod loadout;
pub mod mechanics;
pub mod movement;
pub mod rng;
pub mod role;
pub mod session;
pub mod slot_table;
pub mod targeting;
pub mod timers;
pub mod world;

pub use agent::{BotState, PartyBot};
pub use character::{CharacterClass, Race};
pub use role::Role;
