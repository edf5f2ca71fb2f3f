//! Reading and patching the counts module source text.
//!
//! The module is a flat list of lines shaped like
//! `count_99s["attack"] = "1,234,567"`. Patching is purely textual: each
//! recognized slot's value is rewritten in place and every other byte of
//! the module (comments, whitespace, unrelated tables) survives untouched,
//! so a round trip with unchanged values is byte-identical.

use regex::{NoExpand, Regex};

use crate::error::PatcherError;
use crate::finder::LowestRank;
use crate::lang::{Language, Table};
use crate::skill::Skill;
use crate::snapshot::{CountValue, CountsSnapshot};

/// Replace the first match of one slot, leaving everything else alone.
fn replace_slot(
    text: &str,
    table: &str,
    name: &str,
    value: &str,
    value_pattern: &str,
) -> Result<String, PatcherError> {
    let pattern = format!(
        r#"{table}\[['"]{name}['"]\]\s*=\s*['"]{value_pattern}['"]"#,
        table = regex::escape(table),
        name = regex::escape(name),
    );
    let re = Regex::new(&pattern).expect("slot pattern must compile");

    if !re.is_match(text) {
        return Err(PatcherError::MissingSlot {
            table: table.to_string(),
            name: name.to_string(),
        });
    }

    let replacement = format!("{table}[\"{name}\"] = \"{value}\"");
    Ok(re.replace(text, NoExpand(&replacement)).into_owned())
}

/// Patch a numeric slot (comma- or dot-grouped integer values).
pub fn replace_count(
    text: &str,
    table: &str,
    name: &str,
    value: &str,
) -> Result<String, PatcherError> {
    replace_slot(text, table, name, value, r"([\d.,]+?)")
}

/// Patch a date slot (values contain letters and spaces).
pub fn replace_updated(
    text: &str,
    table: &str,
    name: &str,
    value: &str,
) -> Result<String, PatcherError> {
    replace_slot(text, table, name, value, r"([\w ]+?)")
}

/// Patch every slot of `snapshot` into `text`, localized for `lang`.
///
/// For the English module a missing slot aborts the patch: the module is
/// the source of truth and a shape change there needs human eyes. For
/// translated modules a missing slot is only warned about, since the
/// translations routinely lag behind.
pub fn patch_module(
    text: &str,
    snapshot: &CountsSnapshot,
    lang: Language,
) -> Result<String, PatcherError> {
    let strict = lang == Language::En;
    let mut text = text.to_string();

    let mut apply = |text: &mut String, result: Result<String, PatcherError>| match result {
        Ok(patched) => {
            *text = patched;
            Ok(())
        }
        Err(err) if strict => Err(err),
        Err(err) => {
            tracing::warn!(language = lang.code(), error = %err, "slot missing, skipping");
            Ok(())
        }
    };

    for (table, counts) in &snapshot.tables {
        let table_key = table.key(lang);

        for (skill, value) in &counts.counts {
            let name = skill.name(lang);

            match value {
                CountValue::Rank(rank) => {
                    let result = replace_count(&text, table_key, name, &lang.format_int(*rank));
                    apply(&mut text, result)?;
                }
                CountValue::Lowest(LowestRank { rank, level }) => {
                    let result =
                        replace_count(&text, table_key, name, &lang.format_int(u64::from(*level)));
                    apply(&mut text, result)?;

                    let rank_name = format!("{name}.{}", lang.rank_word());
                    let result =
                        replace_count(&text, table_key, &rank_name, &lang.format_int(*rank));
                    apply(&mut text, result)?;
                }
            }
        }

        // The timestamp is patched last so it only advances once the
        // table's values are in.
        if let Some(updated) = &counts.updated {
            let result = replace_updated(
                &text,
                table_key,
                lang.updated_key(),
                &lang.format_date(updated),
            );
            apply(&mut text, result)?;
        }
    }

    Ok(text)
}

/// Extract the previous counts from the English module text.
///
/// Used to seed the rank searches. Lines that do not look like count slots
/// are skipped; recognized tables with unrecognized skills are warned
/// about, since that usually means a new skill landed.
pub fn parse_counts(text: &str) -> CountsSnapshot {
    let line_re = Regex::new(r#"^(\w+)\[['"](.+?)['"]\]\s*=\s*['"]([\d,]+?)['"]"#)
        .expect("count line pattern must compile");

    let mut snapshot = CountsSnapshot::default();

    for line in text.lines() {
        let Some(caps) = line_re.captures(line) else {
            continue;
        };
        let Some(table) = Table::from_en_key(&caps[1]) else {
            continue;
        };
        let Ok(value) = caps[3].replace(',', "").parse::<u64>() else {
            continue;
        };

        if table == Table::LowestRanks {
            // `skill.rank` lines carry the rank; bare `skill` lines the level.
            let key = &caps[2];
            let (name, is_rank) = match key.split_once('.') {
                Some((name, _suffix)) => (name, true),
                None => (key, false),
            };

            let Some(skill) = Skill::from_name(name) else {
                tracing::warn!(key = name, "unrecognized skill in lowest_ranks, ignoring");
                continue;
            };

            let entry = snapshot
                .table_mut(table)
                .counts
                .entry(skill)
                .or_insert(CountValue::Lowest(LowestRank { rank: 0, level: 0 }));

            if let CountValue::Lowest(lowest) = entry {
                if is_rank {
                    lowest.rank = value;
                } else if let Ok(level) = u32::try_from(value) {
                    lowest.level = level;
                }
            }
        } else {
            let Some(skill) = Skill::from_name(&caps[2]) else {
                tracing::warn!(key = &caps[2], "unrecognized skill, ignoring");
                continue;
            };
            snapshot.set(table, skill, CountValue::Rank(value));
        }
    }

    snapshot
}
