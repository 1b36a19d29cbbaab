//! Token package policy
//!
//! Maps the provider's membership tier names onto the two token packages
//! the product sells. Tier names are free-form marketing strings
//! ("Paket Silver Bulanan", "Gold Annual", ...), so selection is a
//! case-insensitive substring match with gold as the fallback.

use serde::{Deserialize, Serialize};

/// Token grant per package
const SILVER_GRANT: i32 = 5;
const GOLD_GRANT: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenPackage {
    Silver,
    Gold,
}

impl TokenPackage {
    /// Tokens credited when a payment for this package lands.
    pub fn grant_amount(&self) -> i32 {
        match self {
            TokenPackage::Silver => SILVER_GRANT,
            TokenPackage::Gold => GOLD_GRANT,
        }
    }

    /// Derive the package from a membership tier name. "silver" anywhere
    /// in the string (any case) selects silver; everything else is gold.
    /// Gold is the default fallback, not an exclusive match.
    pub fn from_tier_name(tier: &str) -> Self {
        if tier.to_lowercase().contains("silver") {
            TokenPackage::Silver
        } else {
            TokenPackage::Gold
        }
    }
}

impl std::fmt::Display for TokenPackage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenPackage::Silver => write!(f, "silver"),
            TokenPackage::Gold => write!(f, "gold"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_amounts() {
        assert_eq!(TokenPackage::Silver.grant_amount(), 5);
        assert_eq!(TokenPackage::Gold.grant_amount(), 100);
    }

    #[test]
    fn test_silver_substring_any_case() {
        assert_eq!(
            TokenPackage::from_tier_name("Paket Silver Bulanan"),
            TokenPackage::Silver
        );
        assert_eq!(TokenPackage::from_tier_name("SILVER"), TokenPackage::Silver);
        assert_eq!(
            TokenPackage::from_tier_name("premium-silver-x"),
            TokenPackage::Silver
        );
    }

    #[test]
    fn test_gold_is_the_fallback() {
        assert_eq!(TokenPackage::from_tier_name("Gold"), TokenPackage::Gold);
        assert_eq!(TokenPackage::from_tier_name("platinum"), TokenPackage::Gold);
        assert_eq!(TokenPackage::from_tier_name(""), TokenPackage::Gold);
    }

    #[test]
    fn test_display() {
        assert_eq!(TokenPackage::Silver.to_string(), "silver");
        assert_eq!(TokenPackage::Gold.to_string(), "gold");
    }
}
