//! # hiscore-counts
//!
//! Keeps the wiki's hiscore counts modules in sync with the RuneScape
//! hiscores: per skill, the number of players at the 99 and 120 xp
//! thresholds, at the 200m xp cap, and the lowest-ranked player's rank and
//! level, for the main and ironman ladders.
//!
//! ## Architecture
//!
//! - **Rank finding** (`finder`): adaptive bracketing search over the
//!   paginated ladders, seeded by the previous run's counts
//! - **Polite fetching** (`hiscores`, `proxy`): serialized requests,
//!   round-robin proxies, rate-limit backoff
//! - **Module patching** (`patcher`): in-place textual edits that preserve
//!   every byte outside the value slots
//! - **Publishing** (`counts`, `mediawiki`): one snapshot per run, saved to
//!   each configured language's wiki

pub mod config;
pub mod counts;
pub mod error;
pub mod finder;
pub mod hiscores;
pub mod lang;
pub mod mediawiki;
pub mod patcher;
pub mod proxy;
pub mod skill;
pub mod snapshot;
