//! Languages the counts are published in, and the seven count tables.
//!
//! Everything locale-dependent lives here: module titles, the localized
//! key words inside the module source, date rendering and digit grouping.
//! Formatting is stateless per call, so nothing process-global needs to be
//! set or restored around a patch pass.

use chrono::{DateTime, Locale, Utc};

/// A wiki language the counts module is published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    PtBr,
}

impl Language {
    pub const ALL: [Language; 2] = [Language::En, Language::PtBr];

    /// BCP 47-ish code, matching the config section name shape.
    pub fn code(self) -> &'static str {
        match self {
            Language::En => "en",
            Language::PtBr => "pt-br",
        }
    }

    /// Title of the counts module on this language's wiki.
    pub fn module_title(self) -> &'static str {
        match self {
            Language::En => "Module:Hiscore counts",
            Language::PtBr => "Módulo:Contagem de Recordes",
        }
    }

    /// The localized key of the per-table timestamp slot.
    pub fn updated_key(self) -> &'static str {
        match self {
            Language::En => "updated",
            Language::PtBr => "data",
        }
    }

    /// The localized suffix for the lowest-ranks rank slot.
    pub fn rank_word(self) -> &'static str {
        match self {
            Language::En => "rank",
            Language::PtBr => "rank",
        }
    }

    /// Edit summary used when saving the module.
    pub fn edit_summary(self) -> &'static str {
        match self {
            Language::En => "Updating hiscore counts",
            Language::PtBr => "Atualizando a contagem de recordes",
        }
    }

    /// strftime pattern for the `updated` slot.
    pub fn date_pattern(self) -> &'static str {
        match self {
            Language::En => "%d %B %Y",
            Language::PtBr => "%d de %B de %Y",
        }
    }

    fn locale(self) -> Locale {
        match self {
            Language::En => Locale::en_US,
            Language::PtBr => Locale::pt_BR,
        }
    }

    /// Render a timestamp the way this language's module expects it.
    pub fn format_date(self, when: &DateTime<Utc>) -> String {
        when.format_localized(self.date_pattern(), self.locale()).to_string()
    }

    fn thousands_separator(self) -> char {
        match self {
            Language::En => ',',
            Language::PtBr => '.',
        }
    }

    /// Render an integer with this language's digit grouping.
    pub fn format_int(self, value: u64) -> String {
        let digits = value.to_string();
        let sep = self.thousands_separator();
        let mut out = String::with_capacity(digits.len() + digits.len() / 3);

        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                out.push(sep);
            }
            out.push(ch);
        }

        out
    }
}

/// One of the seven count tables inside the module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Table {
    Count99s,
    Count99sIronman,
    Count120s,
    Count120sIronman,
    Count200mXp,
    Count200mXpIronman,
    LowestRanks,
}

impl Table {
    pub const ALL: [Table; 7] = [
        Table::Count99s,
        Table::Count99sIronman,
        Table::Count120s,
        Table::Count120sIronman,
        Table::Count200mXp,
        Table::Count200mXpIronman,
        Table::LowestRanks,
    ];

    /// English storage key; also the snapshot JSON key.
    pub fn en_key(self) -> &'static str {
        match self {
            Table::Count99s => "count_99s",
            Table::Count99sIronman => "count_99s_ironman",
            Table::Count120s => "count_120s",
            Table::Count120sIronman => "count_120s_ironman",
            Table::Count200mXp => "count_200mxp",
            Table::Count200mXpIronman => "count_200mxp_ironman",
            Table::LowestRanks => "lowest_ranks",
        }
    }

    /// Brazilian Portuguese storage key.
    pub fn pt_br_key(self) -> &'static str {
        match self {
            Table::Count99s => "contagem_99s",
            Table::Count99sIronman => "contagem_99s_independente",
            Table::Count120s => "contagem_120s",
            Table::Count120sIronman => "contagem_120s_independente",
            Table::Count200mXp => "contagem_200mxp",
            Table::Count200mXpIronman => "contagem_200mxp_independente",
            Table::LowestRanks => "nivel_minimo",
        }
    }

    /// Localized storage key for the given language.
    pub fn key(self, lang: Language) -> &'static str {
        match lang {
            Language::En => self.en_key(),
            Language::PtBr => self.pt_br_key(),
        }
    }

    /// Look up a table by its English storage key.
    pub fn from_en_key(key: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.en_key() == key)
    }
}
