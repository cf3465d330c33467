//! Reserved rule names (`spec.md` §4.2 step 1, §3 "Rule Set"). The full
//! rule-resolution algorithm belongs to the Selector (`nse-runtime`); this
//! module only owns the fixed reserved-name list and the early reject,
//! since it is a piece of static configuration rather than index-driven
//! behavior.

use orion_error::prelude::*;

use crate::error::{ConfigReason, ConfigResult};

/// Pseudo-categories the scanner manages itself and that a user may never
/// supply explicitly (`spec.md` §3: "Certain names are reserved ... e.g.,
/// `version`").
pub const RESERVED_RULES: &[&str] = &["version"];

/// The reserved pseudo-category meaning "every loaded category except the
/// reserved ones" (`spec.md` §4.2 step 5).
pub const ALL_RULE: &str = "all";

pub fn is_reserved(token: &str) -> bool {
    RESERVED_RULES
        .iter()
        .any(|r| r.eq_ignore_ascii_case(token))
}

/// Reject a user-supplied rule list containing a reserved token.
/// `spec.md` §9's resolved open question on casing: the error reports the
/// token exactly as the user typed it, not the canonicalized form.
///
/// The message text matches `spec.md` §8 scenario 6 verbatim
/// (`explicitly specifying rule 'version' is prohibited`) so callers can
/// match on it; only the reserved token itself varies by case.
pub fn reject_reserved(user_rules: &[String]) -> ConfigResult<()> {
    for token in user_rules {
        if is_reserved(token) {
            return StructError::from(ConfigReason::ReservedRule)
                .with_detail(format!(
                    "explicitly specifying rule '{token}' is prohibited"
                ))
                .err();
        }
    }
    Ok(())
}
