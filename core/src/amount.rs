/// Amount handling: tez denomination conversion and display helpers.
///
/// Tez uses 6 decimal places (mutez). 1 tez = 1_000_000 mutez.
use std::fmt;

use serde::{Deserialize, Serialize};

pub const MUTEZ_PER_TEZ: u64 = 1_000_000;
const TEZ_DECIMALS: usize = 6;

/// An amount in the chain's minimal unit.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Mutez(pub u64);

impl Mutez {
    pub const ZERO: Mutez = Mutez(0);

    pub const fn new(mutez: u64) -> Self {
        Self(mutez)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Mutez) -> Mutez {
        Mutez(self.0.saturating_sub(rhs.0))
    }

    #[must_use]
    pub const fn saturating_add(self, rhs: Mutez) -> Mutez {
        Mutez(self.0.saturating_add(rhs.0))
    }

    pub fn checked_add(self, rhs: Mutez) -> Option<Mutez> {
        self.0.checked_add(rhs.0).map(Mutez)
    }
}

/// Trimmed tez representation, e.g. `9.742899` or `10`.
impl fmt::Display for Mutez {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / MUTEZ_PER_TEZ;
        let frac = self.0 % MUTEZ_PER_TEZ;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let frac = format!("{frac:06}");
        write!(f, "{whole}.{}", frac.trim_end_matches('0'))
    }
}

/// Convert mutez to a fixed-precision tez string.
/// Examples: 1_500_000 -> "1.500000", 0 -> "0.000000"
#[must_use]
pub fn mutez_to_tez(mutez: Mutez) -> String {
    let whole = mutez.0 / MUTEZ_PER_TEZ;
    let frac = mutez.0 % MUTEZ_PER_TEZ;
    format!("{whole}.{frac:06}")
}

/// Format a balance for display.
#[must_use]
pub fn format_balance(mutez: Mutez) -> String {
    format!("{mutez} XTZ")
}

/// Parse a human-readable tez amount into mutez.
/// Accepts: "1.5" -> 1_500_000, "1" -> 1_000_000, "0.000001" -> 1
#[must_use = "parsing result should be checked"]
pub fn parse_tez_amount(input: &str) -> Result<Mutez, String> {
    let input = input.trim();

    if input.is_empty() {
        return Err("Amount cannot be empty".to_string());
    }

    if input.starts_with('-') {
        return Err("Amount must be positive".to_string());
    }

    // Bare integers are whole tez.
    if let Ok(whole) = input.parse::<u64>() {
        return whole
            .checked_mul(MUTEZ_PER_TEZ)
            .map(Mutez)
            .ok_or_else(|| "Amount too large".to_string());
    }

    let parts: Vec<&str> = input.split('.').collect();
    if parts.len() > 2 {
        return Err("Invalid amount format. Use tez units like '1.5' or '0.0001'.".to_string());
    }

    // ".5" is accepted as "0.5"
    let whole: u64 = if parts[0].is_empty() {
        0
    } else {
        parts[0]
            .parse()
            .map_err(|_| format!("Invalid whole part: '{}'", parts[0]))?
    };

    let frac_mutez = if parts.len() == 2 {
        let frac_str = parts[1];
        if frac_str.is_empty() {
            0
        } else if frac_str.len() > TEZ_DECIMALS {
            return Err(format!(
                "Too many decimal places. Tez supports up to {TEZ_DECIMALS}."
            ));
        } else if !frac_str.chars().all(|c| c.is_ascii_digit()) {
            return Err(format!("Invalid fractional part: '{frac_str}'"));
        } else {
            let padded = format!("{frac_str:0<6}");
            padded
                .parse::<u64>()
                .map_err(|_| format!("Invalid fractional part: '{frac_str}'"))?
        }
    } else {
        0
    };

    whole
        .checked_mul(MUTEZ_PER_TEZ)
        .and_then(|w| w.checked_add(frac_mutez))
        .map(Mutez)
        .ok_or_else(|| "Amount too large".to_string())
}

/// Format a balance as JSON.
#[must_use]
pub fn format_balance_json(address: &str, mutez: Mutez) -> String {
    serde_json::json!({
        "address": address,
        "balance_mutez": mutez.0,
        "balance_tez": mutez.to_string(),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutez_to_tez_zero() {
        assert_eq!(mutez_to_tez(Mutez(0)), "0.000000");
    }

    #[test]
    fn mutez_to_tez_fractional() {
        assert_eq!(mutez_to_tez(Mutez(1_500_000)), "1.500000");
    }

    #[test]
    fn display_trims_trailing_zeros() {
        assert_eq!(Mutez(10_000_000).to_string(), "10");
        assert_eq!(Mutez(600).to_string(), "0.0006");
        assert_eq!(Mutez(9_742_899).to_string(), "9.742899");
        assert_eq!(Mutez(1).to_string(), "0.000001");
    }

    #[test]
    fn format_balance_display() {
        assert_eq!(format_balance(Mutez(2_000_000)), "2 XTZ");
    }

    #[test]
    fn parse_whole_number() {
        assert_eq!(parse_tez_amount("1").unwrap(), Mutez(1_000_000));
    }

    #[test]
    fn parse_decimal() {
        assert_eq!(parse_tez_amount("1.5").unwrap(), Mutez(1_500_000));
    }

    #[test]
    fn parse_penny() {
        assert_eq!(parse_tez_amount("0.000001").unwrap(), Mutez(1));
        assert_eq!(parse_tez_amount("0.0001").unwrap(), Mutez(100));
    }

    #[test]
    fn parse_leading_dot() {
        assert_eq!(parse_tez_amount(".25").unwrap(), Mutez(250_000));
    }

    #[test]
    fn parse_trailing_dot() {
        assert_eq!(parse_tez_amount("3.").unwrap(), Mutez(3_000_000));
    }

    #[test]
    fn parse_too_many_decimals() {
        assert!(parse_tez_amount("1.0000001").is_err());
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_tez_amount("").is_err());
        assert!(parse_tez_amount("abc").is_err());
        assert!(parse_tez_amount("1.2.3").is_err());
        assert!(parse_tez_amount("1.-5").is_err());
    }

    #[test]
    fn parse_negative_fails() {
        assert!(parse_tez_amount("-1").is_err());
        assert!(parse_tez_amount("-0.5").is_err());
    }

    #[test]
    fn saturating_sub_floors_at_zero() {
        assert_eq!(Mutez(5).saturating_sub(Mutez(9)), Mutez::ZERO);
    }

    #[test]
    fn balance_json_output() {
        let json = format_balance_json("tz1abc", Mutez(1_500_000));
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["balance_mutez"], 1_500_000u64);
        assert_eq!(v["balance_tez"], "1.5");
    }
}
