// config.rs - Maze parameters with environment overrides

use serde::{Deserialize, Serialize};
use std::str::FromStr;

pub const DEFAULT_WIDTH: usize = 31;
pub const DEFAULT_HEIGHT: usize = 31;
pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    pub width: usize,
    pub height: usize,
    pub seed: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            seed: DEFAULT_SEED,
        }
    }
}

impl ExplorerConfig {
    /// Read `MAZE_WIDTH`, `MAZE_HEIGHT` and `MAZE_SEED`; missing or
    /// unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            width: parse_or(&lookup, "MAZE_WIDTH", defaults.width),
            height: parse_or(&lookup, "MAZE_HEIGHT", defaults.height),
            seed: parse_or(&lookup, "MAZE_SEED", defaults.seed),
        }
    }
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> T
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparsable {}={:?}", key, raw);
            default
        }),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_match_reference_maze() {
        let config = ExplorerConfig::from_lookup(|_| None);
        assert_eq!(config, ExplorerConfig::default());
        assert_eq!((config.width, config.height, config.seed), (31, 31, 42));
    }

    #[test]
    fn test_overrides_and_fallbacks() {
        let config = ExplorerConfig::from_lookup(lookup_from(&[
            ("MAZE_WIDTH", "51"),
            ("MAZE_HEIGHT", "wide"),
            ("MAZE_SEED", " 7 "),
        ]));
        assert_eq!(config.width, 51);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.seed, 7);
    }
}
