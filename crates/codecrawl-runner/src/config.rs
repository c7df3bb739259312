//! Runner configuration loaded from the environment.

use std::path::PathBuf;

use codecrawl_types::UserId;

use crate::error::RunnerError;

/// Default path of the game configuration file.
const DEFAULT_CONFIG_PATH: &str = "codecrawl-config.yaml";

/// Default number of turns to play before saving.
const DEFAULT_TURN_BUDGET: u32 = 200;

/// Complete runner configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Game configuration file. A missing file means built-in defaults.
    pub config_path: PathBuf,
    /// Identity to save under. Runs are not persisted without one.
    pub user: Option<UserId>,
    /// Use `PostgreSQL` instead of the in-memory store.
    pub use_database: bool,
    /// Turns to play before stopping.
    pub turn_budget: u32,
    /// Seed for the run's random source. Random when unset.
    pub seed: Option<u64>,
}

impl RunnerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `CODECRAWL_CONFIG` -- game config path (default `codecrawl-config.yaml`)
    /// - `CODECRAWL_USER` -- identity to save under
    /// - `CODECRAWL_TURNS` -- turn budget (default 200)
    /// - `CODECRAWL_SEED` -- fixed RNG seed
    /// - `DATABASE_URL` -- when set, runs are saved to `PostgreSQL`
    pub fn from_env() -> Result<Self, RunnerError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RunnerError> {
        let config_path = lookup("CODECRAWL_CONFIG")
            .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
        let user = lookup("CODECRAWL_USER")
            .filter(|user| !user.trim().is_empty())
            .map(UserId::new);
        let turn_budget = parse_var(&lookup, "CODECRAWL_TURNS")?.unwrap_or(DEFAULT_TURN_BUDGET);
        let seed = parse_var(&lookup, "CODECRAWL_SEED")?;

        Ok(Self {
            config_path,
            user,
            use_database: lookup("DATABASE_URL").is_some(),
            turn_budget,
            seed,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, RunnerError> {
    lookup(name)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_invalid| RunnerError::Env { name, value })
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<RunnerConfig, RunnerError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        RunnerConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = load(&[]).unwrap();
        assert_eq!(config.config_path, PathBuf::from("codecrawl-config.yaml"));
        assert!(config.user.is_none());
        assert!(!config.use_database);
        assert_eq!(config.turn_budget, 200);
        assert!(config.seed.is_none());
    }

    #[test]
    fn environment_overrides() {
        let config = load(&[
            ("CODECRAWL_USER", "player-7"),
            ("CODECRAWL_TURNS", "15"),
            ("CODECRAWL_SEED", "42"),
            ("DATABASE_URL", "postgresql://localhost/codecrawl"),
        ])
        .unwrap();
        assert_eq!(config.user, Some(UserId::new("player-7")));
        assert_eq!(config.turn_budget, 15);
        assert_eq!(config.seed, Some(42));
        assert!(config.use_database);
    }

    #[test]
    fn blank_user_is_anonymous_and_bad_numbers_fail() {
        assert!(load(&[("CODECRAWL_USER", "  ")]).unwrap().user.is_none());
        assert!(matches!(
            load(&[("CODECRAWL_TURNS", "lots")]),
            Err(RunnerError::Env { name: "CODECRAWL_TURNS", .. })
        ));
    }
}
