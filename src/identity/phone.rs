//! Côte d'Ivoire phone numbers: `+225` followed by ten national digits.

#[cfg(test)]
#[path = "phone_test.rs"]
mod tests;

use std::fmt;

pub const COUNTRY_CODE: &str = "225";
const NATIONAL_DIGITS: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid phone number: {0:?} (expected +225 followed by 10 digits)")]
pub struct InvalidPhoneNumber(pub String);

/// Strip non-digits, ensure the `225` prefix, and prepend `+`.
#[must_use]
pub fn format_phone_number(raw: &str) -> String {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.starts_with(COUNTRY_CODE) {
        format!("+{digits}")
    } else {
        format!("+{COUNTRY_CODE}{digits}")
    }
}

/// True iff the canonical form is `+225` followed by exactly ten digits.
#[must_use]
pub fn validate_phone_number(raw: &str) -> bool {
    let formatted = format_phone_number(raw);
    formatted
        .strip_prefix('+')
        .and_then(|d| d.strip_prefix(COUNTRY_CODE))
        .is_some_and(|national| national.len() == NATIONAL_DIGITS)
}

/// A phone number already in canonical `+225XXXXXXXXXX` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// # Errors
    ///
    /// Returns `InvalidPhoneNumber` when the canonical form is not
    /// `+225` followed by ten digits.
    pub fn parse(raw: &str) -> Result<Self, InvalidPhoneNumber> {
        if validate_phone_number(raw) {
            Ok(Self(format_phone_number(raw)))
        } else {
            Err(InvalidPhoneNumber(raw.to_owned()))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Ten national digits without the country code.
    #[must_use]
    pub fn national(&self) -> &str {
        &self.0[1 + COUNTRY_CODE.len()..]
    }

    /// Grouped for display: `+225 07 58 33 72 79`.
    #[must_use]
    pub fn grouped(&self) -> String {
        let pairs: Vec<&str> = self
            .national()
            .as_bytes()
            .chunks(2)
            .filter_map(|pair| std::str::from_utf8(pair).ok())
            .collect();
        format!("+{COUNTRY_CODE} {}", pairs.join(" "))
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
