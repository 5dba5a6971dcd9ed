//! Turns raw phone entries into oracle candidates.

/// Index, within the national part, of the mobile "9" prefix digit that
/// follows the two-digit area code.
const MOBILE_PREFIX_INDEX: usize = 2;
/// Length of a national mobile number carrying the extra prefix digit.
const NATIONAL_MOBILE_LEN: usize = 11;

/// A country-code-prefixed, digits-only number ready for the oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    digits: String,
    country_code_len: usize,
    had_country_code: bool,
}

impl Candidate {
    /// Full digit string, country code included.
    pub fn digits(&self) -> &str {
        &self.digits
    }

    /// Digits after the country code.
    pub fn national(&self) -> &str {
        &self.digits[self.country_code_len..]
    }

    /// Whether the raw entry already started with the country code.
    pub fn had_country_code(&self) -> bool {
        self.had_country_code
    }

    /// Whether the national part has the 11-digit mobile shape.
    pub fn is_national_mobile(&self) -> bool {
        self.national().len() == NATIONAL_MOBILE_LEN
    }

    /// `+<digits>`, the form the oracle's input expects.
    pub fn plus_notation(&self) -> String {
        format!("+{}", self.digits)
    }

    /// The 10-digit variant with the mobile prefix digit removed, or `None`
    /// when this candidate is not an 11-digit national mobile.
    pub fn without_mobile_prefix(&self) -> Option<Candidate> {
        if !self.is_national_mobile() {
            return None;
        }
        let national = self.national();
        let shortened = format!(
            "{}{}",
            &national[..MOBILE_PREFIX_INDEX],
            &national[MOBILE_PREFIX_INDEX + 1..]
        );
        Some(Candidate {
            digits: format!("{}{}", &self.digits[..self.country_code_len], shortened),
            country_code_len: self.country_code_len,
            had_country_code: self.had_country_code,
        })
    }
}

impl std::fmt::Display for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.plus_notation())
    }
}

/// Keeps ASCII digits only. Marker glyphs, spaces and punctuation are dropped.
pub fn digits_only(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Normalizes one raw entry into a candidate.
///
/// The country code is prepended unless the digit string already starts with
/// it. Returns `None` when the entry holds no digits at all; such entries are
/// passed through untouched by the caller.
pub fn normalize(raw: &str, country_code: &str) -> Option<Candidate> {
    let digits = digits_only(raw);
    if digits.is_empty() {
        return None;
    }

    let had_country_code = digits.starts_with(country_code);
    let digits = if had_country_code {
        digits
    } else {
        format!("{}{}", country_code, digits)
    };

    Some(Candidate {
        digits,
        country_code_len: country_code.len(),
        had_country_code,
    })
}
