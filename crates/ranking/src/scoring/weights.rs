//! Scoring weights and named modes

use scholarrank_common::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Weight triple for the linear scoring combination.
///
/// Weights need not sum to 1. They must be finite, non-negative and not all
/// zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub similarity: f64,
    pub citation: f64,
    pub recency: f64,
}

impl ScoringWeights {
    /// Validated constructor
    pub fn new(similarity: f64, citation: f64, recency: f64) -> Result<Self> {
        let weights = Self {
            similarity,
            citation,
            recency,
        };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("similarity", self.similarity),
            ("citation", self.citation),
            ("recency", self.recency),
        ] {
            if !value.is_finite() {
                return Err(AppError::InvalidWeights {
                    message: format!("{} weight must be a finite number", name),
                });
            }
            if value < 0.0 {
                return Err(AppError::InvalidWeights {
                    message: format!("{} weight must not be negative, got {}", name, value),
                });
            }
        }

        if self.similarity + self.citation + self.recency == 0.0 {
            return Err(AppError::InvalidWeights {
                message: "at least one weight must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Mode::Balanced.weights()
    }
}

/// Named weight presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Balanced,
    Recent,
    Famous,
    Influential,
    Hot,
}

impl Mode {
    pub const ALL: [Mode; 5] = [
        Mode::Balanced,
        Mode::Recent,
        Mode::Famous,
        Mode::Influential,
        Mode::Hot,
    ];

    pub fn weights(&self) -> ScoringWeights {
        let (similarity, citation, recency) = match self {
            Mode::Balanced => (0.5, 0.3, 0.2),
            Mode::Recent => (0.3, 0.2, 0.5),
            Mode::Famous => (0.2, 0.7, 0.1),
            Mode::Influential => (0.4, 0.4, 0.2),
            Mode::Hot => (0.3, 0.4, 0.3),
        };
        ScoringWeights {
            similarity,
            citation,
            recency,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Balanced => "balanced",
            Mode::Recent => "recent",
            Mode::Famous => "famous",
            Mode::Influential => "influential",
            Mode::Hot => "hot",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        Mode::ALL
            .into_iter()
            .find(|m| m.as_str() == name)
            .ok_or(AppError::UnknownMode { name })
    }
}

/// Either a named mode or caller-supplied weights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Weighting {
    Mode(Mode),
    Custom(ScoringWeights),
}

impl Weighting {
    /// Resolve to validated weights
    pub fn resolve(&self) -> Result<ScoringWeights> {
        match self {
            Weighting::Mode(mode) => Ok(mode.weights()),
            Weighting::Custom(weights) => {
                weights.validate()?;
                Ok(*weights)
            }
        }
    }

    /// Label for logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Weighting::Mode(mode) => mode.as_str(),
            Weighting::Custom(_) => "custom",
        }
    }
}

impl Default for Weighting {
    fn default() -> Self {
        Weighting::Mode(Mode::Balanced)
    }
}

impl From<Mode> for Weighting {
    fn from(mode: Mode) -> Self {
        Weighting::Mode(mode)
    }
}

impl From<ScoringWeights> for Weighting {
    fn from(weights: ScoringWeights) -> Self {
        Weighting::Custom(weights)
    }
}
