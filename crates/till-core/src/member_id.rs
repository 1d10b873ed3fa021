//! # Member Identifiers
//!
//! Loyalty members are addressed by `M` followed by a sequence number padded
//! to at least three digits: `M001`, `M042`, `M1000`.
//!
//! The next identifier is derived from the identifiers already in use:
//! ```text
//! existing: M001, M007, M003
//!     │
//!     ▼  first run of digits in each → 1, 7, 3
//!     ▼  maximum → 7, plus one → 8
//!     ▼
//! next: M008
//! ```
//!
//! This is only the computation. Nothing here stops two callers computing the
//! same value at once; the database primary key on `members.member_id` does
//! that, and the member repository retries on conflict.

/// Prefix of every member identifier.
pub const MEMBER_ID_PREFIX: char = 'M';

/// Minimum number of digits after the prefix.
pub const MEMBER_ID_MIN_DIGITS: usize = 3;

/// Extracts the numeric sequence of an identifier.
///
/// Takes the first run of ASCII digits anywhere in the string. Identifiers
/// without digits, or whose digits do not fit in a `u64`, count as 0.
///
/// ## Example
/// ```rust
/// use till_core::member_id::sequence_of;
///
/// assert_eq!(sequence_of("M042"), 42);
/// assert_eq!(sequence_of("LEGACY-17-B9"), 17);
/// assert_eq!(sequence_of("guest"), 0);
/// ```
pub fn sequence_of(id: &str) -> u64 {
    let digits: String = id
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// Formats a sequence number as a member identifier.
///
/// Width grows past three digits rather than truncating.
pub fn format_member_id(sequence: u64) -> String {
    format!(
        "{}{:0width$}",
        MEMBER_ID_PREFIX,
        sequence,
        width = MEMBER_ID_MIN_DIGITS
    )
}

/// Computes the identifier following the highest one in `existing`.
///
/// ## Example
/// ```rust
/// use till_core::member_id::next_member_id;
///
/// assert_eq!(next_member_id(Vec::<String>::new()), "M001");
/// assert_eq!(next_member_id(["M999"]), "M1000");
/// ```
pub fn next_member_id<I, S>(existing: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let max = existing
        .into_iter()
        .map(|id| sequence_of(id.as_ref()))
        .max()
        .unwrap_or(0);

    format_member_id(max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_after_unordered_ids() {
        assert_eq!(next_member_id(["M001", "M007", "M003"]), "M008");
    }

    #[test]
    fn test_first_id_when_empty() {
        let none: [&str; 0] = [];
        assert_eq!(next_member_id(none), "M001");
    }

    #[test]
    fn test_width_grows_past_three_digits() {
        assert_eq!(next_member_id(["M999"]), "M1000");
        assert_eq!(next_member_id(["M041"]), "M042");
        assert_eq!(next_member_id(["M1000", "M0999"]), "M1001");
    }

    #[test]
    fn test_unparseable_ids_count_as_zero() {
        assert_eq!(next_member_id(["guest", "M"]), "M001");
        assert_eq!(next_member_id(["M99999999999999999999999", "M004"]), "M005");
    }

    #[test]
    fn test_first_digit_run_only() {
        assert_eq!(sequence_of("M12X34"), 12);
        assert_eq!(sequence_of("X-0005"), 5);
    }
}
