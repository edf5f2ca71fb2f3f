//! The counts run: seed, scrape, snapshot, publish.
//!
//! One run reads the English module for starting hints, walks every
//! (table, skill) cell through the rank finder, writes the gathered counts
//! to a JSON snapshot under `log_dir`, then patches and saves the module
//! for every configured language. A cell that fails keeps its previous
//! value; a language that fails does not stop the others.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::config::{Config, WikiConfig};
use crate::error::CountsError;
use crate::finder::{Column, find_lowest_rank, find_rank};
use crate::hiscores::{Direction, Hiscores, PageSource};
use crate::lang::{Language, Table};
use crate::mediawiki::Api;
use crate::patcher::{parse_counts, patch_module};
use crate::proxy::ProxyRotator;
use crate::skill::{CountKind, Skill};
use crate::snapshot::{CountValue, CountsSnapshot};

/// The six threshold-count cells collected per skill.
const THRESHOLD_CELLS: [(Table, Direction, CountKind); 6] = [
    (Table::Count99s, Direction::Main, CountKind::Lvl99),
    (Table::Count99sIronman, Direction::Ironman, CountKind::Lvl99),
    (Table::Count120s, Direction::Main, CountKind::Lvl120),
    (Table::Count120sIronman, Direction::Ironman, CountKind::Lvl120),
    (Table::Count200mXp, Direction::Main, CountKind::XpMax),
    (Table::Count200mXpIronman, Direction::Ironman, CountKind::XpMax),
];

/// Run the whole counts task with the given configuration.
pub fn run(config: &Config) -> Result<(), CountsError> {
    let started = Instant::now();
    let started_at = Utc::now();

    let rotator = ProxyRotator::new(
        config.proxies.clone(),
        Duration::from_secs(config.proxy_delay),
        Duration::from_secs(config.request_pacing),
    );
    let mut hiscores = Hiscores::new(rotator);

    let result = run_inner(config, &mut hiscores, &started_at);

    tracing::info!(
        requests = hiscores.total_requests(),
        rate_limit_events = hiscores.error_requests(),
        end_delay_secs = hiscores.delay().as_secs(),
        elapsed_secs = started.elapsed().as_secs_f64(),
        "run statistics"
    );

    result
}

fn run_inner(
    config: &Config,
    hiscores: &mut Hiscores,
    started_at: &DateTime<Utc>,
) -> Result<(), CountsError> {
    let prior = fetch_current_counts(&config.wiki.en)?;
    tracing::info!(tables = prior.tables.len(), "seeded from current module");

    let snapshot = collect_counts(hiscores, &prior);

    let snapshot_path = config.log_dir.join(format!(
        "hiscorecounts-{}.json",
        started_at.format("%Y-%m-%d_%H-%M-%S")
    ));
    snapshot.write(&snapshot_path)?;

    let mut failed = Vec::new();

    for lang in Language::ALL {
        let wiki = match lang {
            Language::En => &config.wiki.en,
            Language::PtBr => match &config.wiki.pt_br {
                Some(wiki) => wiki,
                None => continue,
            },
        };

        match publish_counts(wiki, lang, &snapshot) {
            Ok(()) => tracing::info!(language = lang.code(), "module updated"),
            Err(err @ CountsError::Patcher(_)) if lang == Language::En => {
                // The canonical module no longer matches the expected shape.
                return Err(err);
            }
            Err(err) => {
                tracing::error!(language = lang.code(), error = %err, "publish failed");
                failed.push(lang);
            }
        }
    }

    if failed.is_empty() {
        Ok(())
    } else {
        Err(CountsError::PublishFailed {
            languages: failed
                .iter()
                .map(|lang| lang.code())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }
}

/// Read the English module and extract the previous counts as seeds.
fn fetch_current_counts(wiki: &WikiConfig) -> Result<CountsSnapshot, CountsError> {
    let mut api = Api::new(wiki);
    api.login()?;
    let text = api.get_page_content(Language::En.module_title());
    api.logout();

    Ok(parse_counts(&text?))
}

/// Walk every cell, keeping prior values for cells that fail.
pub fn collect_counts<S: PageSource>(source: &mut S, prior: &CountsSnapshot) -> CountsSnapshot {
    let mut next = CountsSnapshot::default();

    for skill in Skill::ALL {
        for (table, direction, kind) in THRESHOLD_CELLS {
            if skill == Skill::Overall && !kind.includes_overall() {
                continue;
            }

            let seed = prior.rank(table, skill).unwrap_or(1);
            let threshold = skill.threshold(kind);

            match find_rank(source, direction, skill, Column::Xp, threshold, seed) {
                Ok(rank) => {
                    tracing::info!(
                        table = table.en_key(),
                        skill = skill.en_name(),
                        rank,
                        "count updated"
                    );
                    next.set(table, skill, CountValue::Rank(rank));
                }
                Err(err) => {
                    tracing::error!(
                        table = table.en_key(),
                        skill = skill.en_name(),
                        direction = %direction,
                        error = %err,
                        "cell failed, keeping previous value"
                    );
                    if let Some(previous) = prior.rank(table, skill) {
                        next.set(table, skill, CountValue::Rank(previous));
                    }
                }
            }
        }

        match find_lowest_rank(source, skill) {
            Ok(lowest) => {
                tracing::info!(
                    skill = skill.en_name(),
                    rank = lowest.rank,
                    level = lowest.level,
                    "lowest rank updated"
                );
                next.set(Table::LowestRanks, skill, CountValue::Lowest(lowest));
            }
            Err(err) => {
                tracing::error!(
                    skill = skill.en_name(),
                    error = %err,
                    "lowest rank failed, keeping previous value"
                );
                if let Some(previous) = prior.get(Table::LowestRanks, skill) {
                    next.set(Table::LowestRanks, skill, previous);
                }
            }
        }
    }

    let now = Utc::now();
    for table in Table::ALL {
        next.table_mut(table).updated = Some(now);
    }

    next
}

/// Patch and save one language's module.
fn publish_counts(
    wiki: &WikiConfig,
    lang: Language,
    snapshot: &CountsSnapshot,
) -> Result<(), CountsError> {
    let mut api = Api::new(wiki);
    api.login()?;

    let result: Result<(), CountsError> = (|| {
        let text = api.get_page_content(lang.module_title())?;
        let patched = patch_module(&text, snapshot, lang)?;

        tracing::info!(
            language = lang.code(),
            module = lang.module_title(),
            "saving counts"
        );
        api.edit_page(lang.module_title(), &patched, lang.edit_summary(), true)?;
        Ok(())
    })();

    api.logout();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use crate::hiscores::{HiscoresPage, RankedRow};

    /// Scripted ladders: main xp is `6e9 / rank`, ironman `3e9 / rank`,
    /// 500 entries each, level constant. Requests past the end clamp to
    /// the final page like the live site.
    struct ScriptedSource {
        fail_ironman_for: Option<Skill>,
    }

    const TOTAL: u64 = 500;
    const PAGES: u64 = 20;

    impl PageSource for ScriptedSource {
        fn fetch_page(
            &mut self,
            direction: Direction,
            skill: Skill,
            page: u32,
        ) -> Result<HiscoresPage, FetchError> {
            if direction == Direction::Ironman && Some(skill) == self.fail_ironman_for {
                return Err(FetchError::Exhausted { attempts: 10 });
            }

            let numerator: u64 = match direction {
                Direction::Main => 6_000_000_000,
                Direction::Ironman => 3_000_000_000,
            };

            let page = u64::from(page).min(PAGES);
            let start = (page - 1) * 25;
            let end = (start + 25).min(TOTAL);

            let rows = (start..end)
                .map(|i| RankedRow {
                    rank: i + 1,
                    player: format!("player{}", i + 1),
                    level: 99,
                    xp: numerator / (i + 1),
                })
                .collect();

            Ok(HiscoresPage {
                rows,
                last_page: Some(PAGES as u32),
            })
        }
    }

    #[test]
    fn collects_every_table_with_the_expected_counts() {
        let mut source = ScriptedSource {
            fail_ironman_for: None,
        };
        let snapshot = collect_counts(&mut source, &CountsSnapshot::default());

        // 6e9 / rank against each threshold.
        assert_eq!(snapshot.rank(Table::Count99s, Skill::Attack), Some(460));
        assert_eq!(snapshot.rank(Table::Count120s, Skill::Attack), Some(57));
        assert_eq!(snapshot.rank(Table::Count200mXp, Skill::Attack), Some(30));

        // Elite thresholds differ.
        assert_eq!(snapshot.rank(Table::Count99s, Skill::Invention), Some(166));
        assert_eq!(snapshot.rank(Table::Count120s, Skill::Invention), Some(74));

        // 3e9 / rank on the ironman ladder.
        assert_eq!(snapshot.rank(Table::Count99sIronman, Skill::Attack), Some(230));
        assert_eq!(snapshot.rank(Table::Count120sIronman, Skill::Attack), Some(28));
        assert_eq!(snapshot.rank(Table::Count200mXpIronman, Skill::Attack), Some(15));

        // Overall: only xp-max and lowest ranks.
        assert_eq!(snapshot.rank(Table::Count99s, Skill::Overall), None);
        assert_eq!(snapshot.rank(Table::Count120s, Skill::Overall), None);
        assert_eq!(snapshot.rank(Table::Count200mXp, Skill::Overall), Some(1));
        assert_eq!(snapshot.rank(Table::Count200mXpIronman, Skill::Overall), Some(0));

        // Lowest ranks cover every skill, overall included.
        for skill in Skill::ALL {
            assert_eq!(
                snapshot.get(Table::LowestRanks, skill),
                Some(CountValue::Lowest(crate::finder::LowestRank {
                    rank: 500,
                    level: 99,
                }))
            );
        }

        // Every table is freshly stamped.
        for table in Table::ALL {
            assert!(snapshot.tables[&table].updated.is_some());
        }
    }

    #[test]
    fn failed_cells_keep_their_prior_values() {
        let mut prior = CountsSnapshot::default();
        prior.set(Table::Count120sIronman, Skill::Magic, CountValue::Rank(1_111));
        prior.set(Table::Count99s, Skill::Magic, CountValue::Rank(460));

        let mut source = ScriptedSource {
            fail_ironman_for: Some(Skill::Magic),
        };
        let snapshot = collect_counts(&mut source, &prior);

        // The failing ironman cells fall back to whatever was known.
        assert_eq!(snapshot.rank(Table::Count120sIronman, Skill::Magic), Some(1_111));
        // No prior for this failing cell, so it stays absent.
        assert_eq!(snapshot.rank(Table::Count99sIronman, Skill::Magic), None);

        // Main-ladder cells for the same skill still update.
        assert_eq!(snapshot.rank(Table::Count99s, Skill::Magic), Some(460));
        assert_eq!(snapshot.rank(Table::Count120s, Skill::Magic), Some(57));

        // Unrelated skills are untouched by the failure.
        assert_eq!(snapshot.rank(Table::Count120sIronman, Skill::Attack), Some(28));
    }

    #[test]
    fn seeds_far_from_the_truth_still_converge() {
        let mut prior = CountsSnapshot::default();
        prior.set(Table::Count99s, Skill::Attack, CountValue::Rank(12));
        prior.set(Table::Count120s, Skill::Attack, CountValue::Rank(100));

        let mut source = ScriptedSource {
            fail_ironman_for: None,
        };
        let snapshot = collect_counts(&mut source, &prior);

        assert_eq!(snapshot.rank(Table::Count99s, Skill::Attack), Some(460));
        assert_eq!(snapshot.rank(Table::Count120s, Skill::Attack), Some(57));
    }
}
