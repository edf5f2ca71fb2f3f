//! Diagnostic error types for the hiscore counts updater.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives, providing error codes and help text. The top-level [`CountsError`]
//! wraps them transparently so the full diagnostic chain survives to `main`.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for a counts run.
#[derive(Debug, Error, Diagnostic)]
pub enum CountsError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    RankFinder(#[from] RankFinderError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Patcher(#[from] PatcherError),

    #[error("failed to write counts snapshot: {path}")]
    #[diagnostic(
        code(counts::snapshot_write),
        help("Check that log_dir exists and is writable.")
    )]
    SnapshotWrite {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("publishing failed for: {languages}")]
    #[diagnostic(
        code(counts::publish_failed),
        help("See the run log for the per-language failures.")
    )]
    PublishFailed { languages: String },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config file: {path}")]
    #[diagnostic(
        code(counts::config::read),
        help("Check that the path exists and is readable.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file: {path}")]
    #[diagnostic(
        code(counts::config::parse),
        help(
            "The file must be valid TOML with a `log_dir` key and a `[wiki.en]` \
             table carrying `api_path`, `username` and `password`."
        )
    )]
    Parse { path: String, message: String },

    #[error("log directory does not exist: {path}")]
    #[diagnostic(
        code(counts::config::log_dir),
        help("Create the directory or point `log_dir` at an existing one.")
    )]
    LogDir { path: String },
}

// ---------------------------------------------------------------------------
// MediaWiki session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SessionError {
    #[error("API request failed: {message}")]
    #[diagnostic(
        code(counts::session::http),
        help("Check the configured api_path and network connectivity.")
    )]
    Http { message: String },

    #[error("unable to decode API response: {message}")]
    #[diagnostic(
        code(counts::session::decode),
        help("The API did not return JSON. Is api_path pointing at api.php?")
    )]
    Decode { message: String },

    #[error("API returned an error: {detail}")]
    #[diagnostic(code(counts::session::api))]
    Api { detail: String },

    #[error("login failed for {username}: {result}")]
    #[diagnostic(
        code(counts::session::login),
        help(
            "Verify the bot credentials. Newer wikis require a password created \
             through Special:BotPasswords."
        )
    )]
    Login { username: String, result: String },

    #[error("edit of \"{title}\" failed: {detail}")]
    #[diagnostic(code(counts::session::edit))]
    Edit { title: String, detail: String },

    #[error("no content returned for page \"{title}\"")]
    #[diagnostic(
        code(counts::session::missing_content),
        help("Check that the module page exists on the target wiki.")
    )]
    MissingContent { title: String },
}

// ---------------------------------------------------------------------------
// Hiscores fetch errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error("transport failure: {message}")]
    #[diagnostic(code(counts::fetch::transport))]
    Transport { message: String },

    #[error("rate limit signalled by the hiscores")]
    #[diagnostic(
        code(counts::fetch::rate_limited),
        help("The rotator delay is bumped automatically; nothing to do here.")
    )]
    RateLimited,

    #[error("ranking table missing from response")]
    #[diagnostic(code(counts::fetch::missing_table))]
    MissingTable,

    #[error("malformed ranking row: {message}")]
    #[diagnostic(
        code(counts::fetch::malformed),
        help("The hiscores page layout may have changed; the row parser needs updating.")
    )]
    Malformed { message: String },

    #[error("retry budget exhausted after {attempts} attempts")]
    #[diagnostic(
        code(counts::fetch::exhausted),
        help(
            "Every attempt hit a transport error or a rate limit. Add more \
             proxies or increase the per-proxy delay."
        )
    )]
    Exhausted { attempts: u32 },
}

// ---------------------------------------------------------------------------
// Rank finder errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum RankFinderError {
    #[error("page number dropped below 1 (page {page}, step {step})")]
    #[diagnostic(code(counts::finder::underflow))]
    UnderflowPage { page: u32, step: u32 },

    #[error("no qualifying row on page {page} despite bracketing")]
    #[diagnostic(code(counts::finder::invariant))]
    Invariant { page: u32 },

    #[error("ranking page contained no rows")]
    #[diagnostic(code(counts::finder::empty))]
    Empty,

    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

// ---------------------------------------------------------------------------
// Module text patcher errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum PatcherError {
    #[error("no slot for {table}[\"{name}\"] in the module text")]
    #[diagnostic(
        code(counts::patcher::missing_slot),
        help(
            "The module no longer carries this key, or its line shape changed. \
             Update the module or the skill/table naming."
        )
    )]
    MissingSlot { table: String, name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_error_converts_to_counts_error() {
        let err = FetchError::Exhausted { attempts: 10 };
        let counts: CountsError = err.into();
        assert!(matches!(
            counts,
            CountsError::Fetch(FetchError::Exhausted { attempts: 10 })
        ));
    }

    #[test]
    fn finder_error_wraps_fetch_error() {
        let fetch = FetchError::RateLimited;
        let finder: RankFinderError = fetch.into();
        assert!(matches!(finder, RankFinderError::Fetch(FetchError::RateLimited)));
    }

    #[test]
    fn error_messages_carry_context() {
        let err = PatcherError::MissingSlot {
            table: "count_99s".into(),
            name: "attack".into(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("count_99s"));
        assert!(msg.contains("attack"));
    }
}
