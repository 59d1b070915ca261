//! Game registry: per-game validation limits and reward tables.
//!
//! Adding a game means adding a [`GameType`] variant and a `default_for`
//! arm, so new entries are compile-time checked. Game-type strings that do
//! not parse take the fallback path: no plausibility limits (validator
//! warns) and a flat reward rate.

use dashrun_types::GameType;
use std::collections::HashMap;

/// Physics and spawn-density limits a legitimate run can never exceed.
///
/// Derived from the game's own deterministic parameters: top speed including
/// any timed boost (plus a buffer for acceleration transients) and maximum
/// items spawned per 100 distance units under optimal play.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameLimits {
    pub min_game_time_ms: u64,
    pub max_game_time_ms: u64,
    /// Hard speed wall in distance-units per second.
    pub max_speed_ms: u64,
    /// Whether score is defined as distance for this game.
    pub score_is_distance: bool,
    /// Allowed |score - distance| slack when `score_is_distance`.
    pub score_distance_tolerance: u64,
    pub max_coins_per_100: u64,
    pub max_potions_per_100: u64,
    pub max_fevers_per_100: u64,
    pub max_perfects_per_100: u64,
}

/// Reward table for one game. Rates are in basis points (10_000 = 1.0)
/// except `fever_bonus_pct`, which is the percent of base per fever
/// activation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RewardConfig {
    pub club_per_unit_bps: u64,
    pub fever_bonus_pct: u64,
    pub perfect_dodge_bonus_bps: u64,
    pub coin_bonus_bps: u64,
    pub max_reward_per_game: u64,
}

/// Flat rate applied to game types the registry does not know.
pub fn fallback_reward() -> RewardConfig {
    RewardConfig {
        club_per_unit_bps: 10,
        fever_bonus_pct: 0,
        perfect_dodge_bonus_bps: 0,
        coin_bonus_bps: 0,
        max_reward_per_game: 100,
    }
}

/// Display metadata for UI listings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameInfo {
    pub name: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameSpec {
    pub info: GameInfo,
    pub limits: GameLimits,
    pub reward: RewardConfig,
}

impl GameSpec {
    /// Default specification for a known game type.
    pub fn default_for(game_type: GameType) -> Self {
        match game_type {
            GameType::DashTrials => Self {
                info: GameInfo {
                    name: "Dash Trials",
                    description: "Endless 3D runner; score is distance covered.",
                },
                limits: GameLimits {
                    min_game_time_ms: 5_000,
                    max_game_time_ms: 1_800_000,
                    // Top speed 24 u/s with boost, buffered for transients.
                    max_speed_ms: 30,
                    score_is_distance: true,
                    score_distance_tolerance: 10,
                    max_coins_per_100: 30,
                    max_potions_per_100: 3,
                    max_fevers_per_100: 2,
                    max_perfects_per_100: 25,
                },
                reward: RewardConfig {
                    club_per_unit_bps: 100,
                    fever_bonus_pct: 10,
                    perfect_dodge_bonus_bps: 1_000,
                    coin_bonus_bps: 500,
                    max_reward_per_game: 500,
                },
            },
            GameType::CoinRush => Self {
                info: GameInfo {
                    name: "Coin Rush",
                    description: "Timed collection mode; score is coin value, not distance.",
                },
                limits: GameLimits {
                    min_game_time_ms: 5_000,
                    max_game_time_ms: 600_000,
                    max_speed_ms: 25,
                    score_is_distance: false,
                    score_distance_tolerance: 0,
                    max_coins_per_100: 60,
                    max_potions_per_100: 3,
                    max_fevers_per_100: 2,
                    max_perfects_per_100: 25,
                },
                reward: RewardConfig {
                    club_per_unit_bps: 50,
                    fever_bonus_pct: 10,
                    perfect_dodge_bonus_bps: 1_000,
                    coin_bonus_bps: 250,
                    max_reward_per_game: 300,
                },
            },
        }
    }
}

/// Registry of every known game, with defaults for each [`GameType`].
#[derive(Clone, Debug)]
pub struct GameRegistry {
    specs: HashMap<GameType, GameSpec>,
}

impl Default for GameRegistry {
    fn default() -> Self {
        let mut specs = HashMap::new();
        for game_type in GameType::ALL {
            specs.insert(game_type, GameSpec::default_for(game_type));
        }
        Self { specs }
    }
}

impl GameRegistry {
    /// Look up a spec by the raw client-provided string. `None` is the
    /// fallback path, not an error.
    pub fn get(&self, raw_game_type: &str) -> Option<&GameSpec> {
        let game_type = GameType::parse(raw_game_type)?;
        self.specs.get(&game_type)
    }

    /// Override a game's spec (operator tuning).
    pub fn set(&mut self, game_type: GameType, spec: GameSpec) {
        self.specs.insert(game_type, spec);
    }
}
