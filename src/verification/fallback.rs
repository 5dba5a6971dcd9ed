//! Ninth-digit fallback for Brazilian mobile numbers.
//!
//! Older registrations may exist under the 10-digit national form. When the
//! 11-digit form is rejected, the variant without the mobile prefix digit is
//! tried once before the rejection is accepted.

use super::Oracle;
use crate::core::models::Verdict;
use crate::utils::phone::Candidate;

/// Final verdict for a candidate, plus the alternative that produced it when
/// the fallback ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackOutcome {
    pub verdict: Verdict,
    pub alternative: Option<Candidate>,
}

/// Checks `candidate`, retrying its 10-digit variant once on `NotFound`.
///
/// Candidates whose national part is not 11 digits bypass the fallback. The
/// alternative's verdict replaces the original one, whatever it is.
pub async fn check_with_fallback(oracle: &mut dyn Oracle, candidate: &Candidate) -> FallbackOutcome {
    let verdict = oracle.check(candidate).await;
    if verdict != Verdict::NotFound {
        return FallbackOutcome {
            verdict,
            alternative: None,
        };
    }

    let Some(alternative) = candidate.without_mobile_prefix() else {
        return FallbackOutcome {
            verdict,
            alternative: None,
        };
    };

    tracing::info!(target: "oracle",
        "{} came back NOT_FOUND. Trying {} without the mobile prefix digit.",
        candidate, alternative
    );
    let verdict = oracle.check(&alternative).await;
    FallbackOutcome {
        verdict,
        alternative: Some(alternative),
    }
}
