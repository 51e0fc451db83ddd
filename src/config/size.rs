/*!
 * Size Parsers
 * Burst buffer quantities in string form, two deliberately distinct scales
 *
 * `parse_size` normalises to gibibytes and rounds to allocation
 * granularity; `parse_count` is a plain base-1024 multiplier used for
 * resource-class counts. The two disagree on the meaning of `M` and must
 * not be merged.
 */

/// Split a leading signed decimal off `text`, returning it with the rest.
fn split_leading_int(text: &str) -> (i64, &str) {
    let text = text.trim();
    let mut end = 0;
    let bytes = text.as_bytes();
    if !bytes.is_empty() && (bytes[0] == b'-' || bytes[0] == b'+') {
        end = 1;
    }
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let value = text[..end].parse::<i64>().unwrap_or(0);
    (value, &text[end..])
}

/// Translate a size specification such as `"4GB"` into gibibyte units.
///
/// The numeric prefix is read as gibibytes unless a suffix rescales it:
/// `M` rounds up from mebibytes, `G` is the identity, `T` multiplies by
/// 1024 and `P` by 1024 squared. Unknown suffixes are ignored. A
/// non-positive prefix yields 0. When `granularity > 1` the result is
/// rounded up to the next multiple.
#[must_use]
pub fn parse_size(text: &str, granularity: u32) -> u32 {
    let (value, suffix) = split_leading_int(text);
    if value <= 0 {
        return 0;
    }
    let mut size = value as u32;
    if size == 0 {
        return 0;
    }
    match suffix.chars().next() {
        Some('m') | Some('M') => size = (size - 1) / 1024 + 1,
        Some('g') | Some('G') => {}
        Some('t') | Some('T') => size = size.saturating_mul(1024),
        Some('p') | Some('P') => size = size.saturating_mul(1024 * 1024),
        _ => {}
    }

    if granularity > 1 {
        size = ((size - 1) / granularity + 1).saturating_mul(granularity);
    }

    size
}

/// Translate a count specification such as `"100k"` with base-1024
/// multipliers for `k`, `m` and `g`. No granularity rounding.
#[must_use]
pub fn parse_count(text: &str) -> u32 {
    let (value, suffix) = split_leading_int(text);
    if value <= 0 {
        return 0;
    }
    let count = value as u32;
    match suffix.chars().next() {
        Some('k') | Some('K') => count.saturating_mul(1024),
        Some('m') | Some('M') => count.saturating_mul(1024 * 1024),
        Some('g') | Some('G') => count.saturating_mul(1024 * 1024 * 1024),
        _ => count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_gigabyte_identity() {
        assert_eq!(parse_size("4GB", 1), 4);
        assert_eq!(parse_size("4G", 1), 4);
        assert_eq!(parse_size("4", 1), 4);
    }

    #[test]
    fn test_megabytes_round_up() {
        assert_eq!(parse_size("4096MB", 1), 4);
        assert_eq!(parse_size("1MB", 1), 1);
        assert_eq!(parse_size("1025MB", 1), 2);
    }

    #[test]
    fn test_large_suffixes() {
        assert_eq!(parse_size("1TB", 1), 1024);
        assert_eq!(parse_size("1PB", 1), 1_048_576);
    }

    #[test]
    fn test_non_positive() {
        assert_eq!(parse_size("0", 1), 0);
        assert_eq!(parse_size("-5GB", 1), 0);
        assert_eq!(parse_size("junk", 1), 0);
        assert_eq!(parse_size("", 1), 0);
    }

    #[test]
    fn test_granularity_rounding() {
        assert_eq!(parse_size("3GB", 4), 4);
        assert_eq!(parse_size("4GB", 4), 4);
        assert_eq!(parse_size("5GB", 4), 8);
    }

    #[test]
    fn test_count_multipliers() {
        assert_eq!(parse_count("100k"), 102_400);
        assert_eq!(parse_count("2M"), 2 * 1024 * 1024);
        assert_eq!(parse_count("1g"), 1024 * 1024 * 1024);
        assert_eq!(parse_count("7"), 7);
        assert_eq!(parse_count("0"), 0);
    }

    #[test]
    fn test_variants_disagree_on_m() {
        // 100M is ~0.1 GiB for sizes but over a hundred million as a count
        assert_eq!(parse_size("100M", 1), 1);
        assert_eq!(parse_count("100M"), 100 * 1024 * 1024);
    }

    proptest! {
        #[test]
        fn prop_granularity_multiple(size in 1u32..100_000, granularity in 2u32..128) {
            let parsed = parse_size(&format!("{size}GB"), granularity);
            prop_assert_eq!(parsed % granularity, 0);
            prop_assert!(parsed >= size);
            prop_assert!(parsed - size < granularity);
        }

        #[test]
        fn prop_never_panics(text in ".{0,12}", granularity in 0u32..64) {
            let _ = parse_size(&text, granularity);
            let _ = parse_count(&text);
        }
    }
}
