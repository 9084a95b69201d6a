//! GST split arithmetic for Australian 10% value-added tax
//!
//! Every ingestion path that splits a gross cash movement into a
//! GST-exclusive amount plus a GST control-account posting goes through
//! [`gross_to_exclusive`]. The split is rounded to whole cents and always
//! reconstructs the gross exactly: `exclusive + gst == gross`.

use bigdecimal::rounding::RoundingMode;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};

use crate::types::cent_tolerance;

/// The standard GST rate (10%)
pub fn default_gst_rate() -> BigDecimal {
    BigDecimal::from(1) / BigDecimal::from(10)
}

/// Result of splitting a gross amount into its GST-exclusive and GST parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GstSplit {
    /// GST-exclusive amount (the category leg of the posting pair)
    pub exclusive: BigDecimal,
    /// GST amount (the control-account leg)
    pub gst: BigDecimal,
}

/// Split a gross amount into GST-exclusive and GST parts
///
/// For a tax-inclusive gross, `gst = gross * rate / (1 + rate)` rounded
/// half-up to cents, and `exclusive = gross - gst` so the two legs always
/// sum back to the gross.
pub fn gross_to_exclusive(gross: &BigDecimal, rate: &BigDecimal) -> GstSplit {
    let divisor = BigDecimal::from(1) + rate;
    let gst = (gross * rate / divisor).with_scale_round(2, RoundingMode::HalfUp);
    let exclusive = gross - &gst;
    GstSplit { exclusive, gst }
}

/// Split a gross amount at the standard 10% rate
pub fn gross_to_exclusive_default(gross: &BigDecimal) -> GstSplit {
    gross_to_exclusive(gross, &default_gst_rate())
}

/// Whether a stored GST amount agrees with the gross at the given rate,
/// within one cent
pub fn gst_within_tolerance(gross: &BigDecimal, rate: &BigDecimal, gst_amount: &BigDecimal) -> bool {
    let expected = gross_to_exclusive(gross, rate).gst;
    (gst_amount - expected).abs() <= cent_tolerance()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_even_split() {
        let split = gross_to_exclusive_default(&dec("110.00"));
        assert_eq!(split.exclusive, dec("100.00"));
        assert_eq!(split.gst, dec("10.00"));
    }

    #[test]
    fn test_rounded_split_reconstructs_gross() {
        let gross = dec("125.50");
        let split = gross_to_exclusive_default(&gross);
        assert_eq!(split.gst, dec("11.41"));
        assert_eq!(split.exclusive, dec("114.09"));
        assert_eq!(&split.exclusive + &split.gst, gross);
    }

    #[test]
    fn test_tiny_gross_rounds_gst_to_zero() {
        let gross = dec("0.05");
        let split = gross_to_exclusive_default(&gross);
        assert_eq!(split.gst, dec("0.00"));
        assert_eq!(&split.exclusive + &split.gst, gross);
    }

    #[test]
    fn test_tolerance_accepts_cent_drift() {
        let gross = dec("125.50");
        assert!(gst_within_tolerance(&gross, &default_gst_rate(), &dec("11.41")));
        assert!(gst_within_tolerance(&gross, &default_gst_rate(), &dec("11.40")));
        assert!(!gst_within_tolerance(&gross, &default_gst_rate(), &dec("11.30")));
    }

    #[test]
    fn test_custom_rate() {
        let split = gross_to_exclusive(&dec("115.00"), &dec("0.15"));
        assert_eq!(split.exclusive, dec("100.00"));
        assert_eq!(split.gst, dec("15.00"));
    }
}
