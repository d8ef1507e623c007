//! Vote position normalization

use hemicycle_common::model::VotePosition;

/// Map an arbitrary vote-position label to the canonical position
///
/// The wire carries free-text labels in assorted casings ("Pour", "POUR",
/// "pour l'adoption", "Non-votant", short codes, empty strings). Matching is
/// a lower-cased substring check in fixed priority order; anything that
/// matches nothing, including empty input, resolves to `Absent`. Total over
/// all string inputs, never panics.
pub fn normalize_position(raw: &str) -> VotePosition {
    let needle = raw.trim().to_lowercase();

    if needle.contains("pour") {
        VotePosition::For
    } else if needle.contains("contre") {
        VotePosition::Against
    } else if needle.contains("abstention") {
        VotePosition::Abstain
    } else {
        // "non-votant", "absent", unknown labels and empty input all land here
        VotePosition::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_labels() {
        assert_eq!(normalize_position("pour"), VotePosition::For);
        assert_eq!(normalize_position("contre"), VotePosition::Against);
        assert_eq!(normalize_position("abstention"), VotePosition::Abstain);
        assert_eq!(normalize_position("non-votant"), VotePosition::Absent);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(normalize_position("POUR"), VotePosition::For);
        assert_eq!(normalize_position("Contre"), VotePosition::Against);
        assert_eq!(normalize_position("ABSTENTION"), VotePosition::Abstain);
        assert_eq!(normalize_position("Non-votant"), VotePosition::Absent);
    }

    #[test]
    fn test_longer_labels_match_by_substring() {
        assert_eq!(normalize_position("pour l'adoption"), VotePosition::For);
        assert_eq!(normalize_position("vote contre"), VotePosition::Against);
        assert_eq!(normalize_position("abstentions"), VotePosition::Abstain);
    }

    #[test]
    fn test_whitespace_trimmed() {
        assert_eq!(normalize_position("  pour  "), VotePosition::For);
    }

    #[test]
    fn test_unknown_and_empty_resolve_to_absent() {
        assert_eq!(normalize_position(""), VotePosition::Absent);
        assert_eq!(normalize_position("???"), VotePosition::Absent);
        assert_eq!(normalize_position("présent"), VotePosition::Absent);
    }
}
