//! Loadout
//!
//! The per-agent map from functional slot to concrete ability, built once
//! from the agent's known-ability roster and rebuilt only when the roster
//! changes.
//!
//! ## Population rules
//! - disabled, removed, hidden and uncatalogued entries are skipped
//! - passive entries only contribute talent markers
//! - each slot keeps the ability with the highest `(precedence, rank)`
//! - effect tags fill the heal, taunt and resurrection lists

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use super::abilities::{AbilityEffect, AbilityId};
use super::slot_table::{Slot, SlotTable, Talent};
use super::world::{AbilityBook, KnownAbility};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Loadout {
    slots: HashMap<Slot, AbilityId>,
    /// Strength of the current occupant of each slot.
    strength: HashMap<Slot, (u8, u8)>,
    /// Direct heals, strongest first.
    pub direct_heals: Vec<AbilityId>,
    /// Heal-over-time abilities, strongest first.
    pub periodic_heals: Vec<AbilityId>,
    pub taunts: Vec<AbilityId>,
    pub resurrection: Option<AbilityId>,
    pub talents: HashSet<Talent>,
}

impl Loadout {
    /// Build a loadout from a roster. Class-specific random choices are made
    /// afterwards by the class behavior.
    pub fn populate(roster: &[KnownAbility], book: &dyn AbilityBook, table: &SlotTable) -> Self {
        let mut loadout = Loadout::default();
        let mut resurrection_rank = 0u8;

        for entry in roster {
            if entry.disabled || entry.removed {
                continue;
            }
            let Some(info) = book.ability(entry.id) else {
                continue;
            };

            if info.passive {
                if let Some(talent) = table.talent(info) {
                    loadout.talents.insert(talent);
                }
                continue;
            }
            if info.hidden {
                continue;
            }

            if let Some(binding) = table.lookup(info) {
                loadout.offer(binding.slot, info.id, binding.precedence, info.rank);
            }

            if info.has_effect(AbilityEffect::Heal) {
                loadout.direct_heals.push(info.id);
            }
            if info.has_effect(AbilityEffect::PeriodicHeal) {
                loadout.periodic_heals.push(info.id);
            }
            if info.has_effect(AbilityEffect::Taunt) && !info.has_effect(AbilityEffect::AreaTaunt) {
                loadout.taunts.push(info.id);
            }
            if info.has_effect(AbilityEffect::Resurrect) && info.rank >= resurrection_rank {
                resurrection_rank = info.rank;
                loadout.resurrection = Some(info.id);
            }
        }

        let heal_amount = |id: &AbilityId| book.ability(*id).map(|a| a.heal_amount).unwrap_or(0);
        loadout
            .direct_heals
            .sort_by(|a, b| heal_amount(b).cmp(&heal_amount(a)).then(a.cmp(b)));
        loadout
            .periodic_heals
            .sort_by(|a, b| heal_amount(b).cmp(&heal_amount(a)).then(a.cmp(b)));

        debug!(
            "Populated loadout: {} slots, {} direct heals, {} periodic heals, {} taunts",
            loadout.slots.len(),
            loadout.direct_heals.len(),
            loadout.periodic_heals.len(),
            loadout.taunts.len()
        );

        loadout
    }

    /// Place `ability` in `slot` if it beats the current occupant.
    pub fn offer(&mut self, slot: Slot, ability: AbilityId, precedence: u8, rank: u8) {
        let candidate = (precedence, rank);
        match self.strength.get(&slot) {
            Some(current) if *current >= candidate => {}
            _ => {
                self.strength.insert(slot, candidate);
                self.slots.insert(slot, ability);
            }
        }
    }

    pub fn get(&self, slot: Slot) -> Option<AbilityId> {
        self.slots.get(&slot).copied()
    }

    pub fn has(&self, slot: Slot) -> bool {
        self.slots.contains_key(&slot)
    }

    /// Overwrite a slot; `None` empties it.
    pub fn set(&mut self, slot: Slot, ability: Option<AbilityId>) {
        match ability {
            Some(id) => {
                self.slots.insert(slot, id);
            }
            None => {
                self.slots.remove(&slot);
                self.strength.remove(&slot);
            }
        }
    }

    pub fn has_talent(&self, talent: Talent) -> bool {
        self.talents.contains(&talent)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty() && self.direct_heals.is_empty() && self.periodic_heals.is_empty()
    }

    /// Abilities in the given slots that are filled, in argument order.
    pub fn present(&self, slots: &[Slot]) -> Vec<AbilityId> {
        slots.iter().filter_map(|s| self.get(*s)).collect()
    }

    /// Whether any slot currently holds `ability`.
    pub fn contains(&self, ability: AbilityId) -> bool {
        self.slots.values().any(|a| *a == ability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offer_keeps_stronger_occupant() {
        let mut loadout = Loadout::default();
        loadout.offer(Slot::BlessingOfMight, AbilityId(25291), 1, 1);
        loadout.offer(Slot::BlessingOfMight, AbilityId(19838), 0, 7);
        assert_eq!(loadout.get(Slot::BlessingOfMight), Some(AbilityId(25291)));

        loadout.offer(Slot::Fireball, AbilityId(133), 0, 1);
        loadout.offer(Slot::Fireball, AbilityId(143), 0, 2);
        assert_eq!(loadout.get(Slot::Fireball), Some(AbilityId(143)));
    }

    #[test]
    fn test_set_none_clears_slot() {
        let mut loadout = Loadout::default();
        loadout.set(Slot::ChosenSeal, Some(AbilityId(20154)));
        assert!(loadout.has(Slot::ChosenSeal));
        loadout.set(Slot::ChosenSeal, None);
        assert!(!loadout.has(Slot::ChosenSeal));
        assert!(loadout.is_empty());
    }
}
