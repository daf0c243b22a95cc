//! Search for the teleporter's register value
//!
//! The confirmation routine evaluates a two-argument recursive function
//! which reads `r7` as a hidden third argument:
//! ```text
//! def f(r0, r1):
//!     if r0 == 0:
//!         return r1 + 1
//!     elif r1 == 0:
//!         return f(r0 - 1, r7)
//!     else:
//!         r1 = f(r0, r1 - 1)
//!         return f(r0 - 1, r1)
//! ```
//! and the teleporter only works if `f(4, 1) == 6`.  Inside the VM this takes
//! effectively forever; here it is memoized per candidate `r7`.
use crate::word::MASK;
use log::{debug, trace};
use rayon::prelude::*;
use std::ops::RangeInclusive;

/// Value that `f(4, 1)` must produce
pub const TARGET: u16 = 6;

const UNSET: u16 = u16::MAX;

/// Memoized evaluator of the recursive function for a single `r7`
pub struct Checksum {
    r7: u16,
    seen: Vec<u16>,
}

impl Checksum {
    pub fn new(r7: u16) -> Self {
        // 3 bits for r0, 15 for r1
        Self {
            r7,
            seen: vec![UNSET; 1 << 18],
        }
    }

    fn key(r0: u16, r1: u16) -> usize {
        (r0 as usize) | (r1 as usize) << 3
    }

    fn cached(&self, r0: u16, r1: u16) -> Option<u16> {
        let v = self.seen[Self::key(r0, r1)];
        (v != UNSET).then_some(v)
    }

    /// Evaluates `f(r0, r1)`
    ///
    /// The recursion is unrolled onto a heap-allocated work stack, because
    /// call depth grows with `r1` and would overflow a thread's stack.
    ///
    /// # Panics
    /// If `r0 > 7` or `r1 > 32767`
    pub fn eval(&mut self, r0: u16, r1: u16) -> u16 {
        assert!(r0 < 8 && r1 <= MASK);
        let mut todo = vec![(r0, r1)];
        while let Some(&(x, y)) = todo.last() {
            if self.cached(x, y).is_some() {
                todo.pop();
                continue;
            }
            let v = if x == 0 {
                Some(y.wrapping_add(1) & MASK)
            } else if y == 0 {
                self.cached(x - 1, self.r7).or_else(|| {
                    todo.push((x - 1, self.r7));
                    None
                })
            } else if let Some(inner) = self.cached(x, y - 1) {
                self.cached(x - 1, inner).or_else(|| {
                    todo.push((x - 1, inner));
                    None
                })
            } else {
                todo.push((x, y - 1));
                None
            };
            if let Some(v) = v {
                self.seen[Self::key(x, y)] = v;
                todo.pop();
            }
        }
        self.seen[Self::key(r0, r1)]
    }
}

/// Computes `f(4, 1)` for the given `r7`
pub fn check(r7: u16) -> u16 {
    Checksum::new(r7).eval(4, 1)
}

/// Finds the largest `r7` in the range such that `f(4, 1) == 6`
///
/// Candidates are evaluated in parallel, but the result is the same as a
/// descending sequential scan that stops at the first hit.
pub fn find_in(range: RangeInclusive<u16>) -> Option<u16> {
    let out = range.into_par_iter().rev().find_first(|&r7| {
        let v = check(r7);
        trace!("r7 = {r7}: f(4, 1) = {v}");
        v == TARGET
    });
    debug!("register search found {out:?}");
    out
}

/// Searches every candidate from 32767 down to 1
pub fn find() -> Option<u16> {
    find_in(1..=MASK)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ANSWER: u16 = 25734;

    #[test]
    fn base_case() {
        let mut c = Checksum::new(1);
        for y in [0, 1, 2, 100, 32766, 32767] {
            assert_eq!(c.eval(0, y), (y + 1) & MASK);
        }
    }

    #[test]
    fn small_cases() {
        // f(1, y) = y + r7 + 1
        let mut c = Checksum::new(3);
        assert_eq!(c.eval(1, 0), 4);
        assert_eq!(c.eval(1, 5), 9);
        // f(2, 0) = f(1, r7) = 2 * r7 + 1
        assert_eq!(c.eval(2, 0), 7);
    }

    #[test]
    fn wraps_modulo() {
        let mut c = Checksum::new(MASK);
        assert_eq!(c.eval(1, 0), 0);
    }

    #[test]
    fn known_answer() {
        assert_eq!(check(ANSWER), TARGET);
        assert_ne!(check(ANSWER - 1), TARGET);
    }

    #[test]
    fn bounded_search() {
        assert_eq!(find_in(ANSWER - 4..=ANSWER + 4), Some(ANSWER));
        assert_eq!(find_in(ANSWER + 1..=ANSWER + 8), None);
    }

    #[test]
    #[ignore = "evaluates thousands of candidates"]
    fn full_search() {
        assert_eq!(find(), Some(ANSWER));
    }
}
