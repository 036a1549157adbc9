use serde::{Deserialize, Serialize};

// ============================================================================
// Phone Number Value Object
// ============================================================================
//
// Customer phone numbers arrive in whatever shape checkout accepted
// ("0772 123456", "256772123456", "+256-772-123-456"). Ugandan mobile numbers
// are normalised to E.164 so they compare and display consistently.
//
// ============================================================================

const COUNTRY_CODE: &str = "256";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneNumber(String);

/// Mobile money network a number belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MobileNetwork {
    Mtn,
    Airtel,
}

impl PhoneNumber {
    /// Normalise a Ugandan mobile number, `None` if it is not one
    pub fn parse_ugandan(raw: &str) -> Option<Self> {
        let digits: String = raw
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '(' | ')' | '.'))
            .collect();
        let digits = digits.strip_prefix('+').unwrap_or(&digits);

        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }

        let national = if let Some(rest) = digits.strip_prefix(COUNTRY_CODE) {
            rest
        } else if let Some(rest) = digits.strip_prefix('0') {
            rest
        } else {
            digits
        };

        if national.len() != 9 || !national.starts_with('7') {
            return None;
        }

        Some(Self(format!("+{COUNTRY_CODE}{national}")))
    }

    /// Normalised form when recognised, the trimmed input otherwise
    pub fn normalize(raw: &str) -> String {
        Self::parse_ugandan(raw)
            .map(|phone| phone.0)
            .unwrap_or_else(|| raw.trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn network(&self) -> Option<MobileNetwork> {
        let prefix = self.0.get(4..6)?;
        match prefix {
            "76" | "77" | "78" => Some(MobileNetwork::Mtn),
            "70" | "74" | "75" => Some(MobileNetwork::Airtel),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_national_format() {
        let phone = PhoneNumber::parse_ugandan("0772 123 456").unwrap();
        assert_eq!(phone.as_str(), "+256772123456");
        assert_eq!(phone.network(), Some(MobileNetwork::Mtn));
    }

    #[test]
    fn test_international_formats() {
        for raw in ["+256-752-123-456", "256752123456", "752123456"] {
            let phone = PhoneNumber::parse_ugandan(raw).unwrap();
            assert_eq!(phone.as_str(), "+256752123456");
            assert_eq!(phone.network(), Some(MobileNetwork::Airtel));
        }
    }

    #[test]
    fn test_rejects_non_ugandan_numbers() {
        assert!(PhoneNumber::parse_ugandan("+254712345678").is_none());
        assert!(PhoneNumber::parse_ugandan("0414 123456").is_none());
        assert!(PhoneNumber::parse_ugandan("call me").is_none());
        assert_eq!(PhoneNumber::normalize(" +254712345678 "), "+254712345678");
    }
}
