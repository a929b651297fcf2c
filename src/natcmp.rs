//! Natural string ordering.
//!
//! Compares embedded digit runs by magnitude instead of lexically, so
//! `img2` sorts before `img10`. This ordering decides the position every
//! entry gets in an output archive and, in rename mode, the sequential
//! number it is assigned — it must be deterministic and total.
//!
//! Rules, in the order they apply each round:
//!
//! 1. Leading zeros are collapsed once, at the very start of the inputs,
//!    as long as another digit follows.
//! 2. Runs of spaces are skipped.
//! 3. When both sides sit on a digit: if either run starts with `0` the
//!    runs compare character-by-character (a side running out of digits
//!    first is smaller); otherwise the runs compare by magnitude, with
//!    the first differing digit breaking ties between equal-length runs.
//! 4. Otherwise ordinary character comparison, optionally ASCII
//!    case-folded.
//!
//! An exhausted side always sorts before a non-empty remainder.

use std::cmp::Ordering;

/// Case-sensitive natural comparison.
pub fn natural_cmp(lhs: &str, rhs: &str) -> Ordering {
    compare(lhs.as_bytes(), rhs.as_bytes(), false)
}

/// Natural comparison with ASCII case folding.
pub fn natural_casecmp(lhs: &str, rhs: &str) -> Ordering {
    compare(lhs.as_bytes(), rhs.as_bytes(), true)
}

fn compare(l: &[u8], r: &[u8], fold_case: bool) -> Ordering {
    let (mut li, mut ri) = (0usize, 0usize);
    let mut leading = true;
    loop {
        match (li >= l.len(), ri >= r.len()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        // Collapse leading zeros, but only at the start of the inputs.
        while leading && l[li] == b'0' && li + 1 < l.len() && l[li + 1].is_ascii_digit() {
            li += 1;
        }
        while leading && r[ri] == b'0' && ri + 1 < r.len() && r[ri + 1].is_ascii_digit() {
            ri += 1;
        }
        leading = false;

        while li < l.len() && l[li] == b' ' {
            li += 1;
        }
        while ri < r.len() && r[ri] == b' ' {
            ri += 1;
        }

        match (li >= l.len(), ri >= r.len()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if l[li].is_ascii_digit() && r[ri].is_ascii_digit() {
            if l[li] == b'0' || r[ri] == b'0' {
                // A zero-led run: compare digits left-aligned, the side
                // whose run ends first is smaller.
                loop {
                    let ld = li < l.len() && l[li].is_ascii_digit();
                    let rd = ri < r.len() && r[ri].is_ascii_digit();
                    match (ld, rd) {
                        (false, false) => break,
                        (false, true) => return Ordering::Less,
                        (true, false) => return Ordering::Greater,
                        (true, true) => {}
                    }
                    match l[li].cmp(&r[ri]) {
                        Ordering::Equal => {}
                        diff => return diff,
                    }
                    li += 1;
                    ri += 1;
                }
            } else {
                // Magnitude comparison: the first differing digit decides
                // only once both runs are known to have equal length.
                let mut bias = Ordering::Equal;
                loop {
                    let ld = li < l.len() && l[li].is_ascii_digit();
                    let rd = ri < r.len() && r[ri].is_ascii_digit();
                    match (ld, rd) {
                        (false, false) => break,
                        (false, true) => return Ordering::Less,
                        (true, false) => return Ordering::Greater,
                        (true, true) => {}
                    }
                    let diff = l[li].cmp(&r[ri]);
                    if diff != Ordering::Equal && bias == Ordering::Equal {
                        bias = diff;
                    }
                    li += 1;
                    ri += 1;
                }
                if bias != Ordering::Equal {
                    return bias;
                }
            }

            match (li >= l.len(), ri >= r.len()) {
                (true, true) => return Ordering::Equal,
                (true, false) => return Ordering::Less,
                (false, true) => return Ordering::Greater,
                (false, false) => {}
            }
        }

        let (lc, rc) = if fold_case {
            (l[li].to_ascii_uppercase(), r[ri].to_ascii_uppercase())
        } else {
            (l[li], r[ri])
        };
        match lc.cmp(&rc) {
            Ordering::Equal => {}
            diff => return diff,
        }
        li += 1;
        ri += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digit_runs_compare_by_magnitude() {
        assert_eq!(natural_cmp("img2", "img10"), Ordering::Less);
        assert_eq!(natural_cmp("img10", "img2"), Ordering::Greater);
        assert_eq!(natural_cmp("img10", "img10"), Ordering::Equal);
    }

    #[test]
    fn shorter_prefix_sorts_first() {
        assert_eq!(natural_cmp("a", "a1"), Ordering::Less);
        assert_eq!(natural_cmp("a1", "a"), Ordering::Greater);
        assert_eq!(natural_cmp("", "a"), Ordering::Less);
    }

    #[test]
    fn zero_led_runs_compare_by_characters() {
        // Mid-string zero-led runs fall into the character-wise branch.
        assert_eq!(natural_cmp("a007", "a07"), Ordering::Less);
        assert_eq!(natural_cmp("a07", "a007"), Ordering::Greater);
        assert_eq!(natural_cmp("a01", "a1"), Ordering::Less);
    }

    #[test]
    fn case_folding() {
        assert_eq!(natural_casecmp("ABC2", "abc10"), Ordering::Less);
        assert_eq!(natural_casecmp("Readme", "README"), Ordering::Equal);
        assert_ne!(natural_cmp("Readme", "README"), Ordering::Equal);
    }

    #[test]
    fn ordering_is_consistent_over_a_sorted_set() {
        let mut names = vec![
            "z.txt", "img10.jpg", "img2.jpg", "img1.jpg", "a.txt", "a1.txt", "B.txt",
        ];
        names.sort_by(|a, b| natural_casecmp(a, b));
        assert_eq!(
            names,
            vec!["a.txt", "a1.txt", "B.txt", "img1.jpg", "img2.jpg", "img10.jpg", "z.txt"]
        );

        // Antisymmetry over every pair of the set.
        for a in &names {
            for b in &names {
                assert_eq!(natural_casecmp(a, b), natural_casecmp(b, a).reverse());
            }
        }
    }
}
