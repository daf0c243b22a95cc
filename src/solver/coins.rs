//! Ordering the coins for the monument
//!
//! The monument reads `_ + _ * _^2 + _^3 - _ = 399`, and each coin's value
//! is given by the number of sides on its picture.

/// Value the equation must reach
pub const TARGET: i64 = 399;

/// Coins found in the ruins, with their values
pub const COINS: [(&str, i64); 5] = [
    ("red coin", 2),
    ("corroded coin", 3),
    ("shiny coin", 5),
    ("concave coin", 7),
    ("blue coin", 9),
];

fn equation(v: [i64; 5]) -> i64 {
    v[0] + v[1] * v[2].pow(2) + v[3].pow(3) - v[4]
}

/// Calls `f` on every permutation of `items[..k]` (Heap's algorithm),
/// stopping early if it returns true
fn permute<T: Copy>(
    k: usize,
    items: &mut [T; 5],
    f: &mut impl FnMut(&[T; 5]) -> bool,
) -> bool {
    if k <= 1 {
        return f(items);
    }
    for i in 0..k - 1 {
        if permute(k - 1, items, f) {
            return true;
        }
        if k % 2 == 0 {
            items.swap(i, k - 1);
        } else {
            items.swap(0, k - 1);
        }
    }
    permute(k - 1, items, f)
}

/// Finds an ordering of `coins` which satisfies the monument's equation
pub fn solve<T: Copy>(coins: [(T, i64); 5]) -> Option<[(T, i64); 5]> {
    let mut items = coins;
    let mut out = None;
    permute(5, &mut items, &mut |p| {
        if equation((*p).map(|(_, v)| v)) == TARGET {
            out = Some(*p);
            true
        } else {
            false
        }
    });
    out
}

/// Solves for the coins in the ruins, returning their names in order
pub fn solve_named() -> Option<[&'static str; 5]> {
    solve(COINS).map(|c| c.map(|(name, _)| name))
}
