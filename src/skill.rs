//! The skill model: the 28 ranked skills plus the overall aggregate.
//!
//! Table identifiers are part of the hiscores URL contract and must never
//! change: `overall` is 0, the skills are 1..=28 in release order.

use crate::lang::Language;

/// Xp required for level 99 in a standard skill.
pub const XP_99: u64 = 13_034_431;
/// Xp required for level 120 in a standard skill.
pub const XP_120: u64 = 104_273_167;
/// Xp required for level 99 in an elite skill.
pub const XP_99_ELITE: u64 = 36_073_511;
/// Xp required for level 120 in an elite skill.
pub const XP_120_ELITE: u64 = 80_618_654;
/// The per-skill xp cap.
pub const XP_MAX: u64 = 200_000_000;

/// Which threshold a count is taken against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountKind {
    Lvl99,
    Lvl120,
    XpMax,
}

impl CountKind {
    /// Whether the overall aggregate participates in this count.
    ///
    /// Overall has no meaningful 99 or 120, but it does have an xp cap
    /// (28 skills at 200m each).
    pub fn includes_overall(self) -> bool {
        matches!(self, CountKind::XpMax)
    }
}

/// A ranked hiscores category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u32)]
pub enum Skill {
    Overall = 0,
    Attack = 1,
    Defence = 2,
    Strength = 3,
    Constitution = 4,
    Ranged = 5,
    Prayer = 6,
    Magic = 7,
    Cooking = 8,
    Woodcutting = 9,
    Fletching = 10,
    Fishing = 11,
    Firemaking = 12,
    Crafting = 13,
    Smithing = 14,
    Mining = 15,
    Herblore = 16,
    Agility = 17,
    Thieving = 18,
    Slayer = 19,
    Farming = 20,
    Runecrafting = 21,
    Hunter = 22,
    Construction = 23,
    Summoning = 24,
    Dungeoneering = 25,
    Divination = 26,
    Invention = 27,
    Archaeology = 28,
}

impl Skill {
    /// Every skill in table-id order, overall first.
    pub const ALL: [Skill; 29] = [
        Skill::Overall,
        Skill::Attack,
        Skill::Defence,
        Skill::Strength,
        Skill::Constitution,
        Skill::Ranged,
        Skill::Prayer,
        Skill::Magic,
        Skill::Cooking,
        Skill::Woodcutting,
        Skill::Fletching,
        Skill::Fishing,
        Skill::Firemaking,
        Skill::Crafting,
        Skill::Smithing,
        Skill::Mining,
        Skill::Herblore,
        Skill::Agility,
        Skill::Thieving,
        Skill::Slayer,
        Skill::Farming,
        Skill::Runecrafting,
        Skill::Hunter,
        Skill::Construction,
        Skill::Summoning,
        Skill::Dungeoneering,
        Skill::Divination,
        Skill::Invention,
        Skill::Archaeology,
    ];

    /// The `table` query parameter value for this skill.
    pub fn table_id(self) -> u32 {
        self as u32
    }

    /// Lowercase English identifier, as used in the English module.
    pub fn en_name(self) -> &'static str {
        match self {
            Skill::Overall => "overall",
            Skill::Attack => "attack",
            Skill::Defence => "defence",
            Skill::Strength => "strength",
            Skill::Constitution => "constitution",
            Skill::Ranged => "ranged",
            Skill::Prayer => "prayer",
            Skill::Magic => "magic",
            Skill::Cooking => "cooking",
            Skill::Woodcutting => "woodcutting",
            Skill::Fletching => "fletching",
            Skill::Fishing => "fishing",
            Skill::Firemaking => "firemaking",
            Skill::Crafting => "crafting",
            Skill::Smithing => "smithing",
            Skill::Mining => "mining",
            Skill::Herblore => "herblore",
            Skill::Agility => "agility",
            Skill::Thieving => "thieving",
            Skill::Slayer => "slayer",
            Skill::Farming => "farming",
            Skill::Runecrafting => "runecrafting",
            Skill::Hunter => "hunter",
            Skill::Construction => "construction",
            Skill::Summoning => "summoning",
            Skill::Dungeoneering => "dungeoneering",
            Skill::Divination => "divination",
            Skill::Invention => "invention",
            Skill::Archaeology => "archaeology",
        }
    }

    /// Lowercase Brazilian Portuguese identifier, as used in the pt-br module.
    pub fn pt_br_name(self) -> &'static str {
        match self {
            Skill::Overall => "total",
            Skill::Attack => "ataque",
            Skill::Defence => "defesa",
            Skill::Strength => "força",
            Skill::Constitution => "condição física",
            Skill::Ranged => "combate à distância",
            Skill::Prayer => "oração",
            Skill::Magic => "magia",
            Skill::Cooking => "culinária",
            Skill::Woodcutting => "corte de lenha",
            Skill::Fletching => "fabricação de flechas",
            Skill::Fishing => "pesca",
            Skill::Firemaking => "arte do fogo",
            Skill::Crafting => "artesanato",
            Skill::Smithing => "metalurgia",
            Skill::Mining => "mineração",
            Skill::Herblore => "herbologia",
            Skill::Agility => "agilidade",
            Skill::Thieving => "roubo",
            Skill::Slayer => "extermínio",
            Skill::Farming => "agricultura",
            Skill::Runecrafting => "criação de runas",
            Skill::Hunter => "caça",
            Skill::Construction => "construção",
            Skill::Summoning => "invocação",
            Skill::Dungeoneering => "dungeon",
            Skill::Divination => "adivinhação",
            Skill::Invention => "invenção",
            Skill::Archaeology => "arqueologia",
        }
    }

    /// Localized identifier for the given language.
    pub fn name(self, lang: Language) -> &'static str {
        match lang {
            Language::En => self.en_name(),
            Language::PtBr => self.pt_br_name(),
        }
    }

    /// Look up a skill by its lowercase English identifier.
    pub fn from_name(name: &str) -> Option<Skill> {
        Skill::ALL.into_iter().find(|s| s.en_name() == name)
    }

    /// Elite skills use their own 99/120 thresholds.
    pub fn is_elite(self) -> bool {
        matches!(self, Skill::Invention)
    }

    /// Xp at level 99 for this skill.
    pub fn xp_99(self) -> u64 {
        if self.is_elite() { XP_99_ELITE } else { XP_99 }
    }

    /// Xp at level 120 for this skill.
    pub fn xp_120(self) -> u64 {
        if self.is_elite() { XP_120_ELITE } else { XP_120 }
    }

    /// The xp cap: 200m per skill, 28 skills' worth for overall.
    pub fn xp_max(self) -> u64 {
        match self {
            Skill::Overall => XP_MAX * 28,
            _ => XP_MAX,
        }
    }

    /// The threshold value searched for when counting `kind`.
    pub fn threshold(self, kind: CountKind) -> u64 {
        match kind {
            CountKind::Lvl99 => self.xp_99(),
            CountKind::Lvl120 => self.xp_120(),
            CountKind::XpMax => self.xp_max(),
        }
    }
}
