//! Tokyo Stock Exchange market classification codes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Market segment an issuer is listed on, as reported by `/listed/info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketCode {
    /// First Section (pre-2022 reorganisation)
    First,

    /// Second Section (pre-2022 reorganisation)
    Second,

    /// Mothers (pre-2022 reorganisation)
    Mothers,

    /// TOKYO PRO Market
    TokyoProMarket,

    /// JASDAQ Standard (pre-2022 reorganisation)
    JasdaqStandard,

    /// JASDAQ Growth (pre-2022 reorganisation)
    JasdaqGrowth,

    /// Other: ETFs, REITs, infrastructure funds and similar products
    Other,

    /// Prime Market
    Prime,

    /// Standard Market
    Standard,

    /// Growth Market
    Growth,
}

impl MarketCode {
    /// Market excluded from assessment and per-issuer fetch loops by default.
    pub const EXCLUDED_DEFAULT: Self = Self::Other;

    /// Returns all market codes.
    pub fn all() -> Vec<Self> {
        vec![
            Self::First,
            Self::Second,
            Self::Mothers,
            Self::TokyoProMarket,
            Self::JasdaqStandard,
            Self::JasdaqGrowth,
            Self::Other,
            Self::Prime,
            Self::Standard,
            Self::Growth,
        ]
    }

    /// Returns the four-digit upstream code.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::First => "0101",
            Self::Second => "0102",
            Self::Mothers => "0104",
            Self::TokyoProMarket => "0105",
            Self::JasdaqStandard => "0106",
            Self::JasdaqGrowth => "0107",
            Self::Other => "0109",
            Self::Prime => "0111",
            Self::Standard => "0112",
            Self::Growth => "0113",
        }
    }

    /// Returns the English market name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::First => "First Section",
            Self::Second => "Second Section",
            Self::Mothers => "Mothers",
            Self::TokyoProMarket => "TOKYO PRO Market",
            Self::JasdaqStandard => "JASDAQ Standard",
            Self::JasdaqGrowth => "JASDAQ Growth",
            Self::Other => "Other",
            Self::Prime => "Prime",
            Self::Standard => "Standard",
            Self::Growth => "Growth",
        }
    }

    /// Parse a market from its upstream code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.code() == code.trim())
    }

    /// Whether the market still exists after the April 2022 reorganisation.
    pub const fn is_current(&self) -> bool {
        matches!(
            self,
            Self::TokyoProMarket | Self::Other | Self::Prime | Self::Standard | Self::Growth
        )
    }
}

impl fmt::Display for MarketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
