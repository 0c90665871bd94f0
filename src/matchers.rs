//! Label-set containment used by every query against received batches.
//!
//! Both sides must already be sorted by label name. The matcher never sorts
//! received label sets; sortedness is checked separately in `assertions`.

use std::cmp::Ordering;

use crate::storage::Label;

/// Check whether every label of `inner` is present in `outer` with the same value.
///
/// Extra labels in `outer` are ignored. Runs as a single merge over both slices.
///
/// # Parameters
///
/// - `outer` - Candidate label set, sorted by name, without duplicate names
/// - `inner` - Required labels, sorted by name, without duplicate names
///
/// # Returns
///
/// Returns `true` if `inner` is a subset of `outer`.
pub fn contains(outer: &[Label], inner: &[Label]) -> bool {
    contains_by(outer, inner, |a, b| a.cmp(b))
}

fn contains_by<F>(outer: &[Label], inner: &[Label], mut cmp: F) -> bool
where
    F: FnMut(&str, &str) -> Ordering,
{
    let mut i = 0;
    for want in inner {
        loop {
            let Some(have) = outer.get(i) else {
                return false;
            };
            match cmp(&have.name, &want.name) {
                Ordering::Less => i += 1,
                Ordering::Equal => {
                    if have.value != want.value {
                        return false;
                    }
                    i += 1;
                    break;
                }
                // `want` would have been seen already if present.
                Ordering::Greater => return false,
            }
        }
    }
    true
}

/// Build a constraint label set from `(name, value)` pairs, sorted by name.
///
/// # Parameters
///
/// - `pairs` - Label pairs in any order
///
/// # Returns
///
/// Returns the labels sorted by name, ready to pass as `inner` to [`contains`].
pub fn constraint(pairs: &[(&str, &str)]) -> Vec<Label> {
    let mut labels: Vec<Label> =
        pairs.iter().map(|(name, value)| Label::new(*name, *value)).collect();
    labels.sort_by(|a, b| a.name.cmp(&b.name));
    labels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Vec<Label> {
        pairs.iter().map(|(n, v)| Label::new(*n, *v)).collect()
    }

    /// Test the basic containment properties.
    #[test]
    fn test_contains_basic() {
        let outer = labels(&[("__name__", "test"), ("a", "1"), ("instance", "x"), ("job", "test")]);

        assert!(contains(&outer, &[]));
        assert!(contains(&[], &[]));
        assert!(contains(&outer, &outer));
        assert!(contains(&outer, &labels(&[("__name__", "test"), ("job", "test")])));
        assert!(contains(&outer, &labels(&[("instance", "x")])));

        // Missing name
        assert!(!contains(&outer, &labels(&[("b", "1")])));
        assert!(!contains(&outer, &labels(&[("zzz", "1")])));
        assert!(!contains(&[], &labels(&[("a", "1")])));
        // Differing value
        assert!(!contains(&outer, &labels(&[("a", "2")])));
        // Superset is not contained
        let mut bigger = outer.clone();
        bigger.push(Label::new("zone", "eu"));
        assert!(!contains(&outer, &bigger));
    }

    /// Test that an empty value is compared like any other value.
    #[test]
    fn test_contains_empty_value() {
        let outer = labels(&[("a", ""), ("b", "2")]);
        assert!(contains(&outer, &labels(&[("a", "")])));
        assert!(!contains(&outer, &labels(&[("a", "1")])));
    }

    /// Test that the constraint helper sorts its input.
    #[test]
    fn test_constraint_sorted() {
        let c = constraint(&[("job", "test"), ("__name__", "up"), ("b", "2"), ("a", "1")]);
        let names: Vec<&str> = c.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["__name__", "a", "b", "job"]);
    }

    /// Test linear comparison count on large inputs with interleaved extra labels.
    #[test]
    fn test_contains_linear_on_large_input() {
        let n = 10_000;
        let outer: Vec<Label> =
            (0..n).map(|i| Label::new(format!("l{i:06}"), i.to_string())).collect();
        // Every third label is required, the rest are extras on the outer side.
        let inner: Vec<Label> = outer.iter().step_by(3).cloned().collect();

        let mut comparisons = 0usize;
        let found = contains_by(&outer, &inner, |a, b| {
            comparisons += 1;
            a.cmp(b)
        });
        assert!(found);
        assert!(comparisons <= outer.len() + inner.len());

        // A missing label fails early and still within the linear bound.
        let mut missing = inner.clone();
        missing.push(Label::new("l999999", "x"));
        let mut comparisons = 0usize;
        let found = contains_by(&outer, &missing, |a, b| {
            comparisons += 1;
            a.cmp(b)
        });
        assert!(!found);
        assert!(comparisons <= outer.len() + missing.len());
    }
}
