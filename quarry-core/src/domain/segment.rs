//! Segment catalog
//!
//! The fixed set of wallet segments a run can target, with the query template
//! each one submits and the options a caller may tune.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Segment category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    PowerSwappers,
    LendingWhales,
    CrossProtocol,
    EarlyAdopter,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::PowerSwappers,
        Category::LendingWhales,
        Category::CrossProtocol,
        Category::EarlyAdopter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::PowerSwappers => "power_swappers",
            Category::LendingWhales => "lending_whales",
            Category::CrossProtocol => "cross_protocol",
            Category::EarlyAdopter => "early_adopter",
        }
    }

    /// Catalog entry for this category
    pub fn segment(self) -> &'static Segment {
        match self {
            Category::PowerSwappers => &SEGMENTS[0],
            Category::LendingWhales => &SEGMENTS[1],
            Category::CrossProtocol => &SEGMENTS[2],
            Category::EarlyAdopter => &SEGMENTS[3],
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown segment category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A parameter value that the segment does not accept
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid value '{value}' for option '{key}' (expected one of: {})", .allowed.join(", "))]
pub struct InvalidParameter {
    pub key: String,
    pub value: String,
    pub allowed: Vec<String>,
}

/// A tunable option of a segment query
#[derive(Debug)]
pub struct SegmentOption {
    pub key: &'static str,
    pub label: &'static str,
    pub choices: &'static [&'static str],
    pub default: &'static str,
}

/// Static definition of a segment
#[derive(Debug)]
pub struct Segment {
    pub category: Category,
    pub label: &'static str,
    pub tagline: &'static str,
    pub options: &'static [SegmentOption],
    template: &'static str,
}

impl Segment {
    /// Renders the query for the given caller parameters.
    ///
    /// Missing options fall back to their defaults. Keys that are not options
    /// of this segment are ignored.
    pub fn render(
        &self,
        parameters: &HashMap<String, serde_json::Value>,
    ) -> Result<String, InvalidParameter> {
        let mut query = self.template.to_string();

        for option in self.options {
            let value = match parameters.get(option.key) {
                None | Some(serde_json::Value::Null) => option.default.to_string(),
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            };

            if !option.choices.contains(&value.as_str()) {
                return Err(InvalidParameter {
                    key: option.key.to_string(),
                    value,
                    allowed: option.choices.iter().map(|c| c.to_string()).collect(),
                });
            }

            query = query.replace(&format!("{{{}}}", option.key), &value);
        }

        Ok(query)
    }
}

/// All segments, in display order
pub fn catalog() -> &'static [Segment] {
    &SEGMENTS
}

const BASE_DEXS: &[&str] = &["Aerodrome", "Uniswap", "BaseSwap"];
const BASE_LENDING: &[&str] = &["Morpho", "Aave", "Moonwell"];
const ALL_PROTOCOLS: &[&str] = &[
    "Aerodrome",
    "Uniswap",
    "BaseSwap",
    "Morpho",
    "Aave",
    "Moonwell",
    "Compound",
];

static SEGMENTS: [Segment; 4] = [
    Segment {
        category: Category::PowerSwappers,
        label: "High-Velocity Traders",
        tagline: "Volume-dominant addresses on Base DEXs",
        options: &[SegmentOption {
            key: "dex",
            label: "Target DEX",
            choices: BASE_DEXS,
            default: "Aerodrome",
        }],
        template: "SELECT
    transaction_from_address AS wallet_address,
    COUNT(*) AS total_swaps,
    SUM(usd_amount) AS total_volume_usd
FROM base.dex.trades
WHERE block_timestamp > CURRENT_DATE - INTERVAL '7 days'
  AND project ILIKE '{dex}%'
  AND usd_amount > 0
GROUP BY 1
HAVING total_swaps > 3 AND total_volume_usd > 1000
ORDER BY total_volume_usd DESC
LIMIT 10",
    },
    Segment {
        category: Category::LendingWhales,
        label: "Deep Capital Allocators",
        tagline: "High-TVL liquidity providers",
        options: &[SegmentOption {
            key: "protocol",
            label: "Lending Protocol",
            choices: BASE_LENDING,
            default: "Morpho",
        }],
        template: "SELECT
    depositor_address AS wallet_address,
    COUNT(*) AS deposit_count,
    SUM(usd_amount) AS total_deposited_usd
FROM base.lending.deposits
WHERE block_timestamp > CURRENT_DATE - INTERVAL '7 days'
  AND project ILIKE '{protocol}%'
  AND usd_amount > 0
GROUP BY 1
HAVING total_deposited_usd > 1000
ORDER BY total_deposited_usd DESC
LIMIT 10",
    },
    Segment {
        category: Category::CrossProtocol,
        label: "Ecosystem Nomads",
        tagline: "Multi-protocol interoperability tracking",
        options: &[
            SegmentOption {
                key: "seed_protocol",
                label: "Source Protocol (your users)",
                choices: ALL_PROTOCOLS,
                default: "Aerodrome",
            },
            SegmentOption {
                key: "target_protocol",
                label: "Target Protocol (where else they go)",
                choices: ALL_PROTOCOLS,
                default: "Uniswap",
            },
        ],
        template: "WITH seed_users AS (
    SELECT DISTINCT transaction_from_address AS wallet
    FROM base.dex.trades
    WHERE project ILIKE '{seed_protocol}%'
      AND block_timestamp > CURRENT_DATE - INTERVAL '7 days'
      AND usd_amount > 0
    LIMIT 5000
)
SELECT
    t.transaction_from_address AS wallet_address,
    COUNT(*) AS activity_count,
    SUM(t.usd_amount) AS volume_usd
FROM base.dex.trades t
JOIN seed_users s ON t.transaction_from_address = s.wallet
WHERE t.project ILIKE '{target_protocol}%'
  AND t.block_timestamp > CURRENT_DATE - INTERVAL '7 days'
  AND t.usd_amount > 0
GROUP BY 1
ORDER BY volume_usd DESC
LIMIT 10",
    },
    Segment {
        category: Category::EarlyAdopter,
        label: "Base OGs",
        tagline: "First-cohort network participants",
        options: &[],
        template: "SELECT
    sender_address AS wallet_address,
    MIN(block_timestamp) AS first_bridge_time,
    SUM(usd_amount) AS total_bridged_usd
FROM base.bridges.transfers
WHERE direction = 'inbound'
  AND block_timestamp < '2023-08-15'
  AND usd_amount > 0
GROUP BY 1
ORDER BY total_bridged_usd DESC
LIMIT 10",
    },
];
