//! Lenient dotted-version comparison.

use std::cmp::Ordering;

/// Compares two dotted version strings segment by segment.
///
/// The order is deliberately lenient rather than strictly numeric, and its
/// quirks are load-bearing for channel pinning:
///
/// - each segment is compared as an integer after stripping the maximal
///   trailing run of non-digit characters, so `"1esr"` counts as 1;
/// - a segment whose remainder still fails to parse counts as 0, so `"0b2"`
///   (last character already a digit, nothing strips) counts as 0;
/// - when `b` runs out of segments first, `a` is greater regardless of the
///   values of the extra segments; when `a` runs out first with every
///   compared segment equal, the versions compare equal. The exhaustion rule
///   is one-sided on purpose.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let b_segments: Vec<&str> = b.split('.').collect();
    for (index, a_segment) in a.split('.').enumerate() {
        let Some(b_segment) = b_segments.get(index) else {
            return Ordering::Greater;
        };
        match segment_value(a_segment).cmp(&segment_value(b_segment)) {
            Ordering::Equal => {}
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

fn segment_value(segment: &str) -> i64 {
    segment
        .trim_end_matches(|c: char| !c.is_numeric())
        .parse()
        .unwrap_or(0)
}
