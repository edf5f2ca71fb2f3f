//! Locating ranks on the paginated ladders.
//!
//! [`find_rank`] answers "what is the rank of the last player with at least
//! this much xp (or level)?" while fetching as few pages as possible. It
//! brackets the target by exponentially growing jumps from the seeded start
//! page, then shrinks the jumps once the target has been overshot, and
//! finally scans within the page that straddles the threshold.

use std::collections::HashSet;

use crate::error::RankFinderError;
use crate::hiscores::{Direction, HiscoresPage, PageSource, RankedRow};
use crate::skill::Skill;

/// Rows per ranking page.
pub const PAGE_SIZE: u64 = 25;

/// The table column a threshold is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Level,
    Xp,
}

impl Column {
    fn value(self, row: &RankedRow) -> u64 {
        match self {
            Column::Level => u64::from(row.level),
            Column::Xp => row.xp,
        }
    }
}

/// The lowest-ranked entry of a ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LowestRank {
    pub rank: u64,
    pub level: u32,
}

/// Which way the search moved first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bias {
    Up,
    Down,
}

/// Per-call search state.
struct Search {
    page: u32,
    step: u32,
    checked: HashSet<u32>,
    bias: Option<Bias>,
    overshot: bool,
    fetches: u32,
}

impl Search {
    fn new(seed_rank: u64) -> Self {
        let start_page = seed_rank.div_ceil(PAGE_SIZE).max(1);
        Self {
            page: start_page as u32,
            step: 1,
            checked: HashSet::new(),
            bias: None,
            overshot: false,
            fetches: 0,
        }
    }

    /// Grow the step while still chasing in the first direction; shrink it
    /// once the target is bracketed. The step never drops below 1.
    fn adjust_step(&mut self, moving: Bias) {
        match self.bias {
            None => self.bias = Some(moving),
            Some(bias) => {
                if bias != moving && !self.overshot {
                    self.overshot = true;
                }
                if bias == moving && !self.overshot {
                    self.step *= 2;
                } else {
                    self.step = (self.step / 2).max(1);
                }
            }
        }
    }
}

/// Find the rank of the last player whose `column` value is at least
/// `threshold`, or 0 when no player qualifies.
///
/// `seed_rank` is only a starting hint (typically the previous run's
/// count); the result is correct however far off it is, at the price of
/// extra page fetches proportional to the log of the error.
pub fn find_rank<S: PageSource>(
    source: &mut S,
    direction: Direction,
    skill: Skill,
    column: Column,
    threshold: u64,
    seed_rank: u64,
) -> Result<u64, RankFinderError> {
    let mut search = Search::new(seed_rank);

    tracing::debug!(
        skill = skill.en_name(),
        direction = %direction,
        threshold,
        seed_rank,
        start_page = search.page,
        "searching for rank"
    );

    loop {
        let page = source.fetch_page(direction, skill, search.page)?;
        search.fetches += 1;

        let first = page.rows.first().ok_or(RankFinderError::Empty)?;
        let last = page.rows.last().ok_or(RankFinderError::Empty)?;

        tracing::debug!(
            page = search.page,
            step = search.step,
            fetches = search.fetches,
            first = column.value(first),
            last = column.value(last),
            "inspecting page"
        );

        if column.value(last) >= threshold {
            // The boundary is on this page or further down the ladder.
            search.adjust_step(Bias::Up);

            if search.checked.contains(&(search.page + 1)) {
                tracing::debug!(fetches = search.fetches, "converged on forward boundary");
                return Ok(last.rank);
            }

            search.checked.insert(search.page);
            search.page += search.step;
            continue;
        }

        if column.value(first) < threshold {
            // Every row here is below the threshold: the boundary is on an
            // earlier page, unless there is none at all.
            if search.page == 1 {
                tracing::debug!(fetches = search.fetches, "no qualifying players");
                return Ok(0);
            }

            search.adjust_step(Bias::Down);

            if search.checked.contains(&(search.page - 1)) {
                tracing::debug!(fetches = search.fetches, "converged on backward boundary");
                return Ok(first.rank);
            }

            search.checked.insert(search.page);

            if search.step >= search.page {
                return Err(RankFinderError::UnderflowPage {
                    page: search.page,
                    step: search.step,
                });
            }
            search.page -= search.step;
            continue;
        }

        // The threshold falls inside this page: scan rows in order and take
        // the last one still at or above it.
        let mut rank = None;
        for row in &page.rows {
            if column.value(row) >= threshold {
                rank = Some(row.rank);
            } else {
                break;
            }
        }

        tracing::debug!(fetches = search.fetches, "converged in-page");
        return rank.ok_or(RankFinderError::Invariant { page: search.page });
    }
}

/// Find the `{rank, level}` of the last entry on a skill's main ladder.
///
/// Page 1 advertises the last page in its pagination links; when the links
/// are absent, page 1 itself is the last page.
pub fn find_lowest_rank<S: PageSource>(
    source: &mut S,
    skill: Skill,
) -> Result<LowestRank, RankFinderError> {
    let first: HiscoresPage = source.fetch_page(Direction::Main, skill, 1)?;
    let last_page = first.last_page.unwrap_or(1);

    let page = if last_page > 1 {
        source.fetch_page(Direction::Main, skill, last_page)?
    } else {
        first
    };

    let row = page.rows.last().ok_or(RankFinderError::Empty)?;

    tracing::debug!(
        skill = skill.en_name(),
        rank = row.rank,
        level = row.level,
        "found lowest rank"
    );

    Ok(LowestRank {
        rank: row.rank,
        level: row.level,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;

    /// A scripted ladder: `values[rank - 1]` is the column value of that
    /// rank, non-increasing. Pages past the end clamp to the final page,
    /// which may be shorter than 25 rows, mirroring the live site.
    struct Ladder {
        values: Vec<u64>,
        fetches: u32,
    }

    impl Ladder {
        fn new(values: Vec<u64>) -> Self {
            assert!(values.windows(2).all(|w| w[0] >= w[1]), "ladder must be sorted");
            Self { values, fetches: 0 }
        }

        /// `qualifying` ranks at `threshold + margin` descending, then the
        /// rest strictly below the threshold.
        fn with_boundary(qualifying: u64, total: u64, threshold: u64) -> Self {
            let values = (1..=total)
                .map(|rank| {
                    if rank <= qualifying {
                        threshold + (qualifying - rank)
                    } else {
                        threshold - (rank - qualifying)
                    }
                })
                .collect();
            Self::new(values)
        }

        fn page_count(&self) -> u32 {
            ((self.values.len() as u64).div_ceil(PAGE_SIZE)).max(1) as u32
        }
    }

    impl PageSource for Ladder {
        fn fetch_page(
            &mut self,
            _direction: Direction,
            _skill: Skill,
            page: u32,
        ) -> Result<HiscoresPage, FetchError> {
            self.fetches += 1;
            let page = page.min(self.page_count());
            let start = (u64::from(page) - 1) * PAGE_SIZE;
            let end = (start + PAGE_SIZE).min(self.values.len() as u64);

            let rows = (start..end)
                .map(|i| RankedRow {
                    rank: i + 1,
                    player: format!("player{}", i + 1),
                    level: 99,
                    xp: self.values[i as usize],
                })
                .collect();

            Ok(HiscoresPage {
                rows,
                last_page: Some(self.page_count()),
            })
        }
    }

    const V: u64 = 13_034_431;

    #[test]
    fn target_inside_the_starting_page() {
        // Seed 125 starts on page 5 (ranks 101..=125); the boundary is at
        // rank 123, inside that page.
        let mut ladder = Ladder::with_boundary(123, 200, V);
        let rank = find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 125)
            .unwrap();
        assert_eq!(rank, 123);
        assert_eq!(ladder.fetches, 1);
    }

    #[test]
    fn low_seed_grows_then_converges() {
        // True answer on page 18; seeding at rank 25 forces the forward
        // exponential chase and the shrinking walk back.
        let mut ladder = Ladder::with_boundary(447, 1000, V);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 25).unwrap();
        assert_eq!(rank, 447);
        // 2 * ceil(log2(18 pages of error)) with slack.
        assert!(ladder.fetches <= 10, "took {} fetches", ladder.fetches);
    }

    #[test]
    fn high_seed_shrinks_after_overshoot() {
        // Seeded 20 pages past the true boundary on page 60.
        let mut ladder = Ladder::with_boundary(1495, 2500, V);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 2000).unwrap();
        assert_eq!(rank, 1495);
        assert!(ladder.fetches <= 12, "took {} fetches", ladder.fetches);
    }

    #[test]
    fn no_qualifying_rows_returns_zero() {
        let mut ladder = Ladder::with_boundary(0, 100, V);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 0).unwrap();
        assert_eq!(rank, 0);
    }

    #[test]
    fn boundary_on_page_edge_from_above() {
        // Rank 450 is the last row of page 18. Approaching from page 19
        // must terminate through the revisit guard with the exact rank.
        let mut ladder = Ladder::with_boundary(450, 1000, V);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 460).unwrap();
        assert_eq!(rank, 450);
        assert_eq!(ladder.fetches, 2);
    }

    #[test]
    fn ties_at_the_threshold_all_count() {
        // Ranks 1..=15 sit exactly on the threshold.
        let mut values = vec![V; 15];
        values.extend((1..=10).map(|i| V - i));
        let mut ladder = Ladder::new(values);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 10).unwrap();
        assert_eq!(rank, 15);
    }

    #[test]
    fn truncated_final_page_is_tolerated() {
        // 90 entries: the last page holds 15 rows, and the boundary is on it.
        let mut ladder = Ladder::with_boundary(83, 90, V);
        let rank =
            find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 85).unwrap();
        assert_eq!(rank, 83);
    }

    #[test]
    fn column_selects_the_right_cell() {
        let row = RankedRow {
            rank: 1,
            player: "A".into(),
            level: 99,
            xp: 200_000_000,
        };
        assert_eq!(Column::Level.value(&row), 99);
        assert_eq!(Column::Xp.value(&row), 200_000_000);
    }

    #[test]
    fn runaway_descent_underflows() {
        // The seed is so far past a tiny answer that the doubling descent
        // jumps below page 1 before ever seeing a qualifying row.
        let mut ladder = Ladder::with_boundary(10, 2500, V);
        let err = find_rank(&mut ladder, Direction::Main, Skill::Attack, Column::Xp, V, 2400)
            .unwrap_err();
        assert!(matches!(err, RankFinderError::UnderflowPage { .. }));
    }

    #[test]
    fn lowest_rank_reads_the_advertised_last_page() {
        // 1042 pages; the final row is rank 26_049 at level 99 in this
        // fixture (level is constant).
        let mut ladder = Ladder::with_boundary(0, 26_049, V);
        let lowest = find_lowest_rank(&mut ladder, Skill::Divination).unwrap();
        assert_eq!(lowest.rank, 26_049);
        assert_eq!(lowest.level, 99);
        assert_eq!(ladder.fetches, 2);
    }

    #[test]
    fn lowest_rank_single_page_ladder() {
        let mut ladder = Ladder::with_boundary(3, 8, V);
        let lowest = find_lowest_rank(&mut ladder, Skill::Archaeology).unwrap();
        assert_eq!(lowest.rank, 8);
        assert_eq!(ladder.fetches, 1);
    }
}
