use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Reconciliation policy, loadable from a `.recon.toml` file. Every section
/// has working defaults so a config file (or any given table in it) is
/// optional; CLI flags override file values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconConfig {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: InputsConfig,
    #[serde(default)]
    pub policy: MergePolicy,
    #[serde(default)]
    pub weights: MatchWeights,
    #[serde(default)]
    pub thresholds: Thresholds,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Ordered candidate locations for the authoritative dataset plus the
/// reference dataset path. First existing `old` candidate wins.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InputsConfig {
    #[serde(default)]
    pub old: Vec<String>,
    #[serde(default)]
    pub new: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub merged: Option<String>,
    #[serde(default)]
    pub report: Option<String>,
}

// ---------------------------------------------------------------------------
// Merge policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueStrategy {
    KeepOld,
    Max,
    Min,
    Newest,
}

impl Default for ValueStrategy {
    fn default() -> Self {
        Self::KeepOld
    }
}

impl std::fmt::Display for ValueStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::KeepOld => write!(f, "keep_old"),
            Self::Max => write!(f, "max"),
            Self::Min => write!(f, "min"),
            Self::Newest => write!(f, "newest"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MergePolicy {
    /// Allow a blank field in the precedence-winning record to be filled
    /// from the other record. Off by default: preserve-old is pure unless
    /// explicitly requested.
    #[serde(default)]
    pub fill_blanks: bool,
    /// Strategy for `value` / `purchase_price` collisions.
    #[serde(default)]
    pub merge_values: ValueStrategy,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            fill_blanks: false,
            merge_values: ValueStrategy::KeepOld,
        }
    }
}

// ---------------------------------------------------------------------------
// Scoring policy
// ---------------------------------------------------------------------------

/// Additive weights per matching field. Identity fields dominate by
/// calibration; empirically chosen, tunable, not physical constants.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MatchWeights {
    pub player: f64,
    pub set: f64,
    pub card_number: f64,
    pub year: f64,
    pub team: f64,
    pub league: f64,
}

impl Default for MatchWeights {
    fn default() -> Self {
        Self {
            player: 4.0,
            set: 3.0,
            card_number: 3.0,
            year: 1.5,
            team: 0.75,
            league: 0.5,
        }
    }
}

/// A match is accepted only when the top score meets `floor` and clears the
/// runner-up by `gap`; otherwise the row is ambiguous, never silently merged.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub floor: f64,
    pub gap: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self { floor: 8.0, gap: 1.0 }
    }
}

// ---------------------------------------------------------------------------
// Parse + validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.thresholds.floor < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "floor must be non-negative, got {}",
                self.thresholds.floor
            )));
        }
        if self.thresholds.gap < 0.0 {
            return Err(ReconError::ConfigValidation(format!(
                "gap must be non-negative, got {}",
                self.thresholds.gap
            )));
        }

        let w = &self.weights;
        for (name, weight) in [
            ("player", w.player),
            ("set", w.set),
            ("card_number", w.card_number),
            ("year", w.year),
            ("team", w.team),
            ("league", w.league),
        ] {
            if weight < 0.0 {
                return Err(ReconError::ConfigValidation(format!(
                    "weight '{name}' must be non-negative, got {weight}"
                )));
            }
        }

        Ok(())
    }
}

/// First existing path from an explicit ordered candidate list.
pub fn choose_input<'a, F>(candidates: &'a [String], exists: F) -> Option<&'a str>
where
    F: Fn(&str) -> bool,
{
    candidates.iter().map(String::as_str).find(|p| exists(p))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
