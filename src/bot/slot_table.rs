//! Slot Table
//!
//! Maps first-rank ability ids to the functional slot they fill in an
//! agent's loadout. Loaded from `assets/config/slot_table.ron`.
//!
//! Lookup goes by the ability's own id first, then by its first-rank id, so
//! one entry covers every rank of a chain. Names are never matched.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::abilities::{AbilityId, AbilityInfo};

/// Default location of the slot table.
pub const SLOT_TABLE_PATH: &str = "assets/config/slot_table.ron";

/// Slot table schema versions this build understands.
pub const SUPPORTED_SLOT_TABLE_VERSION: u32 = 1;

/// A functional role an ability can fill in a loadout.
///
/// Most slots hold one concrete ability. A few are candidates for a
/// random-once choice (seals, blessings, totems, poisons, curses); the class
/// behavior fills the matching `Chosen*` slot from them at population time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Slot {
    // Paladin
    SealOfRighteousness,
    SealOfCommand,
    SealOfFury,
    SealOfWisdom,
    SealOfTheCrusader,
    ChosenSeal,
    Judgement,
    HammerOfJustice,
    BlessingOfMight,
    BlessingOfWisdom,
    BlessingOfKings,
    BlessingOfLight,
    BlessingOfSanctuary,
    BlessingMelee,
    BlessingRanged,
    BlessingOfProtection,
    BlessingOfSacrifice,
    BlessingOfFreedom,
    DevotionAura,
    RetributionAura,
    ConcentrationAura,
    SanctityAura,
    PaladinAura,
    Exorcism,
    Consecration,
    HammerOfWrath,
    Cleanse,
    DivineShield,
    LayOnHands,
    RighteousFury,
    HolyShock,
    DivineFavor,
    HolyWrath,
    TurnUndead,
    HolyShield,
    Repentance,

    // Shaman
    LightningBolt,
    ChainLightning,
    EarthShock,
    FlameShock,
    FrostShock,
    Purge,
    Stormstrike,
    ElementalMastery,
    LightningShield,
    GhostWolf,
    ManaTideTotem,
    CureDisease,
    ShamanCurePoison,
    GraceOfAirTotem,
    NatureResistanceTotem,
    WindfuryTotem,
    WindwallTotem,
    TranquilAirTotem,
    EarthbindTotem,
    StoneclawTotem,
    StoneskinTotem,
    StrengthOfEarthTotem,
    TremorTotem,
    FireNovaTotem,
    MagmaTotem,
    SearingTotem,
    FlametongueTotem,
    FrostResistanceTotem,
    FireResistanceTotem,
    DiseaseCleansingTotem,
    HealingStreamTotem,
    ManaSpringTotem,
    PoisonCleansingTotem,
    AirTotem,
    EarthTotem,
    FireTotem,
    WaterTotem,
    WindfuryWeapon,
    RockbiterWeapon,
    FrostbrandWeapon,
    WeaponBuff,

    // Hunter
    AspectOfTheCheetah,
    AspectOfTheHawk,
    AspectOfTheMonkey,
    SerpentSting,
    ViperSting,
    ArcaneShot,
    AimedShot,
    MultiShot,
    ConcussiveShot,
    WingClip,
    HuntersMark,
    MongooseBite,
    RaptorStrike,
    Disengage,
    FeignDeath,
    ScareBeast,
    Volley,
    FrostTrap,
    FreezingTrap,
    ImmolationTrap,
    ExplosiveTrap,
    Deterrence,
    Counterattack,
    Intimidation,
    BestialWrath,
    TranquilizingShot,
    RapidFire,
    TrueshotAura,

    // Mage
    IceArmor,
    FrostArmor,
    IceBarrier,
    ManaShield,
    ArcaneIntellect,
    ArcaneBrilliance,
    Frostbolt,
    FireBlast,
    Fireball,
    ArcaneExplosion,
    FrostNova,
    ConeOfCold,
    Blink,
    PolymorphSheep,
    PolymorphPig,
    PolymorphTurtle,
    PolymorphCow,
    Polymorph,
    Counterspell,
    PresenceOfMind,
    ArcanePower,
    RemoveLesserCurse,
    Scorch,
    Pyroblast,
    Evocation,
    IceBlock,
    Blizzard,
    BlastWave,
    Combustion,
    Flamestrike,
    ArcaneMissiles,

    // Priest
    PowerWordFortitude,
    PrayerOfFortitude,
    DivineSpirit,
    PrayerOfSpirit,
    ShadowProtection,
    InnerFire,
    PowerWordShield,
    PrayerOfHealing,
    HolyNova,
    Smite,
    MindBlast,
    MindFlay,
    ShadowWordPain,
    InnerFocus,
    AbolishDisease,
    DispelMagic,
    ManaBurn,
    DevouringPlague,
    PsychicScream,
    Shadowform,
    VampiricEmbrace,
    Silence,
    Fade,
    ShackleUndead,
    TouchOfWeakness,

    // Warlock
    DemonArmor,
    DemonSkin,
    DeathCoil,
    DetectInvisibility,
    ShadowBolt,
    Corruption,
    Conflagrate,
    Shadowburn,
    SearingPain,
    Immolate,
    RainOfFire,
    DemonicSacrifice,
    DrainLife,
    SiphonLife,
    Banish,
    Fear,
    HowlOfTerror,
    CurseOfAgony,
    CurseOfTongues,
    CurseOfTheElements,
    CurseOfShadow,
    CurseOfRecklessness,
    RaidCurse,
    LifeTap,
    DarkPact,
    SummonImp,
    SummonVoidwalker,
    SummonFelhunter,
    SummonSuccubus,
    Demon,

    // Warrior
    BattleStance,
    BerserkerStance,
    DefensiveStance,
    Charge,
    Intercept,
    Overpower,
    HeroicStrike,
    Cleave,
    Execute,
    MortalStrike,
    Bloodthirst,
    Bloodrage,
    BerserkerRage,
    Recklessness,
    Retaliation,
    DeathWish,
    IntimidatingShout,
    Pummel,
    Rend,
    Disarm,
    Whirlwind,
    BattleShout,
    DemoralizingShout,
    Hamstring,
    ThunderClap,
    SweepingStrikes,
    LastStand,
    ShieldBlock,
    ShieldWall,
    ShieldBash,
    ShieldSlam,
    SunderArmor,
    ConcussionBlow,
    PiercingHowl,
    ChallengingShout,
    Revenge,
    Slam,

    // Rogue
    SliceAndDice,
    SinisterStrike,
    AdrenalineRush,
    Eviscerate,
    Stealth,
    Garrote,
    Ambush,
    CheapShot,
    Premeditation,
    Backstab,
    Hemorrhage,
    GhostlyStrike,
    Gouge,
    Rupture,
    ExposeArmor,
    KidneyShot,
    ColdBlood,
    BladeFlurry,
    Vanish,
    Blind,
    Preparation,
    Sap,
    Evasion,
    Riposte,
    Kick,
    Sprint,
    InstantPoison,
    DeadlyPoison,
    CripplingPoison,
    WoundPoison,
    MindNumbingPoison,
    MainHandPoison,
    OffHandPoison,

    // Druid
    BearForm,
    CatForm,
    TravelForm,
    AquaticForm,
    MoonkinForm,
    Wrath,
    Moonfire,
    Starfire,
    Hurricane,
    InsectSwarm,
    Barkskin,
    NaturesGrasp,
    MarkOfTheWild,
    GiftOfTheWild,
    Thorns,
    DruidCurePoison,
    AbolishPoison,
    Rebirth,
    Innervate,
    NaturesSwiftness,
    EntanglingRoots,
    Hibernate,
    Pounce,
    Ravage,
    Claw,
    Shred,
    Rake,
    Rip,
    FerociousBite,
    TigersFury,
    Dash,
    Cower,
    FaerieFireFeral,
    FaerieFire,
    DemoralizingRoar,
    Enrage,
    FrenziedRegeneration,
    Swipe,
    Maul,
    Bash,
    FeralCharge,
    Prowl,
    Swiftmend,
    OmenOfClarity,
    Tranquility,
    RemoveCurse,
}

/// Passive talents that change what a cascade prefers.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Talent {
    Furor,
    ImprovedArcaneExplosion,
    ImprovedFlamestrike,
    ImprovedFireball,
    ImprovedScorch,
    ImprovedArcaneMissiles,
}

/// The slot an ability fills and how strongly it claims it.
///
/// Higher precedence beats any rank of a lower-precedence ability in the
/// same slot (a Greater Blessing beats every rank of the normal one).
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct SlotBinding {
    pub slot: Slot,
    #[serde(default)]
    pub precedence: u8,
}

/// Root structure for the slot_table.ron file
#[derive(Debug, Serialize, Deserialize)]
pub struct SlotTableConfig {
    pub version: u32,
    pub bindings: HashMap<AbilityId, SlotBinding>,
    #[serde(default)]
    pub talents: HashMap<AbilityId, Talent>,
}

/// Shared, read-only id to slot mapping.
#[derive(Debug, Clone)]
pub struct SlotTable {
    version: u32,
    bindings: HashMap<AbilityId, SlotBinding>,
    talents: HashMap<AbilityId, Talent>,
}

impl SlotTable {
    /// Create from a loaded config
    pub fn new(config: SlotTableConfig) -> Self {
        Self {
            version: config.version,
            bindings: config.bindings,
            talents: config.talents,
        }
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Slot binding for an ability: own id first, then its first rank.
    pub fn lookup(&self, ability: &AbilityInfo) -> Option<SlotBinding> {
        self.bindings
            .get(&ability.id)
            .or_else(|| ability.first_rank.and_then(|head| self.bindings.get(&head)))
            .copied()
    }

    /// Talent marker for a passive ability.
    pub fn talent(&self, ability: &AbilityInfo) -> Option<Talent> {
        self.talents
            .get(&ability.id)
            .or_else(|| ability.first_rank.and_then(|head| self.talents.get(&head)))
            .copied()
    }

    /// Check the version and that no two ids claim the same slot with the
    /// same precedence. Ranks of one chain share a single entry, so such a
    /// clash means the table would make the winner depend on scan order.
    pub fn validate(&self) -> Result<(), String> {
        if self.version != SUPPORTED_SLOT_TABLE_VERSION {
            return Err(format!(
                "Unsupported slot table version {} (expected {})",
                self.version, SUPPORTED_SLOT_TABLE_VERSION
            ));
        }

        let mut seen: HashMap<(Slot, u8), AbilityId> = HashMap::new();
        let mut ids: Vec<&AbilityId> = self.bindings.keys().collect();
        ids.sort();
        for id in ids {
            let binding = self.bindings[id];
            if let Some(previous) = seen.insert((binding.slot, binding.precedence), *id) {
                return Err(format!(
                    "Slot {:?} bound twice at precedence {}: {:?} and {:?}",
                    binding.slot, binding.precedence, previous, id
                ));
            }
        }
        Ok(())
    }

    /// Parse and validate a table from RON text. `source` names the input in
    /// error messages.
    pub fn from_ron_str(contents: &str, source: &str) -> Result<Self, String> {
        let config: SlotTableConfig = ron::from_str(contents)
            .map_err(|e| format!("Failed to parse {}: {}", source, e))?;
        let table = SlotTable::new(config);
        table.validate()?;
        Ok(table)
    }

    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read {}: {}", path, e))?;
        let table = Self::from_ron_str(&contents, path)?;
        info!("Loaded {} slot bindings from {}", table.len(), path);
        Ok(table)
    }
}

/// Load the slot table from assets/config/slot_table.ron
pub fn load_slot_table() -> Result<SlotTable, String> {
    SlotTable::load_from_file(SLOT_TABLE_PATH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bot::abilities::{AbilityInfo, SpellSchool};

    fn ability(id: u32, first_rank: Option<u32>) -> AbilityInfo {
        let mut info: AbilityInfo = ron::from_str(&format!(
            "(id: {}, name: \"Test\", school: Holy)",
            id
        ))
        .expect("minimal ability parses");
        info.first_rank = first_rank.map(AbilityId);
        assert_eq!(info.school, SpellSchool::Holy);
        info
    }

    #[test]
    fn test_lookup_falls_back_to_first_rank() {
        let table = SlotTable::from_ron_str(
            "(version: 1, bindings: { 2050: (slot: PowerWordShield) })",
            "inline",
        )
        .expect("table parses");

        assert_eq!(
            table.lookup(&ability(2050, None)).map(|b| b.slot),
            Some(Slot::PowerWordShield)
        );
        assert_eq!(
            table.lookup(&ability(10901, Some(2050))).map(|b| b.slot),
            Some(Slot::PowerWordShield)
        );
        assert_eq!(table.lookup(&ability(9999, None)), None);
    }

    #[test]
    fn test_rejects_unknown_version() {
        let result = SlotTable::from_ron_str("(version: 99, bindings: {})", "inline");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("version 99"));
    }

    #[test]
    fn test_rejects_ambiguous_binding() {
        let result = SlotTable::from_ron_str(
            "(version: 1, bindings: { 1: (slot: Smite), 2: (slot: Smite) })",
            "inline",
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_talents_parse() {
        let table = SlotTable::from_ron_str(
            "(version: 1, bindings: {}, talents: { 17056: Furor })",
            "inline",
        )
        .expect("table parses");
        assert_eq!(table.talent(&ability(17056, None)), Some(Talent::Furor));
    }
}
