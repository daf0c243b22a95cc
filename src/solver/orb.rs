//! Solve for a path through the orb's weighted grid
//!
//! The map is shown below, with `x` increasing northward and `y` increasing
//! eastward:
//! ```text
//!     3 | *  8  -  1V
//!     2 | 4  * 11  *
//!     1 | +  4  - 18       N
//!     0 |22  -  9  *     W   E
//!     ----------------     S
//!       | 0  1  2  3
//! ```
//!
//! The orb starts at weight 22 in the lower-left corner and must weigh
//! exactly 30 when it reaches the vault door in the upper-right corner.
//! Walking onto an operator remembers it; walking onto a number applies the
//! remembered operator to the orb's weight and that number.
use crate::word::MASK;
use std::collections::{HashSet, VecDeque};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Operator {
    Add,
    Sub,
    Mul,
}

impl Operator {
    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Operator::Add => a + b,
            Operator::Sub => a - b,
            Operator::Mul => a * b,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Cell {
    Num(i64),
    Op(Operator),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    North,
    South,
    East,
    West,
}

impl Direction {
    /// Search order for neighbouring cells
    const ALL: [Direction; 4] = [
        Direction::South,
        Direction::North,
        Direction::West,
        Direction::East,
    ];

    fn delta(self) -> (i32, i32) {
        match self {
            Direction::North => (1, 0),
            Direction::South => (-1, 0),
            Direction::East => (0, 1),
            Direction::West => (0, -1),
        }
    }

    pub fn letter(self) -> char {
        match self {
            Direction::North => 'n',
            Direction::South => 's',
            Direction::East => 'e',
            Direction::West => 'w',
        }
    }

    /// The in-game command for moving in this direction
    pub fn command(self) -> &'static str {
        match self {
            Direction::North => "north",
            Direction::South => "south",
            Direction::East => "east",
            Direction::West => "west",
        }
    }
}

/// Renders a path as a compact string of direction letters
pub fn letters(path: &[Direction]) -> String {
    path.iter().map(|d| d.letter()).collect()
}

/// A square grid of numbers and operators, indexed as `cells[x][y]`
#[derive(Clone, Debug)]
pub struct Maze {
    pub cells: [[Cell; 4]; 4],
    pub start: (i32, i32),
    pub goal: (i32, i32),
    pub target: i64,
}

#[derive(Clone, Debug)]
struct OrbState {
    x: i32,
    y: i32,
    weight: i64,
    pending: Option<Operator>,
    path: Vec<Direction>,
}

impl Maze {
    /// The grid in front of the vault
    pub fn vault() -> Self {
        use Cell::{Num, Op};
        use Operator::{Add, Mul, Sub};
        Self {
            cells: [
                [Num(22), Op(Sub), Num(9), Op(Mul)],
                [Op(Add), Num(4), Op(Sub), Num(18)],
                [Num(4), Op(Mul), Num(11), Op(Mul)],
                [Op(Mul), Num(8), Op(Sub), Num(1)],
            ],
            start: (0, 0),
            goal: (3, 3),
            target: 30,
        }
    }

    fn cell(&self, x: i32, y: i32) -> Option<Cell> {
        let row = self.cells.get(usize::try_from(x).ok()?)?;
        row.get(usize::try_from(y).ok()?).copied()
    }

    fn start_weight(&self) -> i64 {
        match self.cell(self.start.0, self.start.1) {
            Some(Cell::Num(n)) => n,
            _ => 0,
        }
    }

    /// Moves the orb one step, returning `None` if the move is not allowed
    ///
    /// Moves off the grid, back onto the start cell, or which leave the orb
    /// with a weight outside `1..=32767` are rejected.
    fn advance(&self, s: &OrbState, d: Direction) -> Option<OrbState> {
        let (dx, dy) = d.delta();
        let (x, y) = (s.x + dx, s.y + dy);
        if (x, y) == self.start {
            return None;
        }
        let (weight, pending) = match self.cell(x, y)? {
            Cell::Num(n) => (s.pending?.apply(s.weight, n), None),
            Cell::Op(op) => (s.weight, Some(op)),
        };
        if weight <= 0 || weight > MASK as i64 {
            return None;
        }
        let mut path = s.path.clone();
        path.push(d);
        Some(OrbState {
            x,
            y,
            weight,
            pending,
            path,
        })
    }

    /// Breadth-first search for the shortest path that reaches the goal at
    /// exactly the target weight
    ///
    /// Arriving at the goal with the wrong weight ends that branch, since
    /// the orb cannot leave the vault door once it's there.  States are
    /// deduplicated on position, weight and pending operator, which bounds
    /// the search when no path exists.
    pub fn solve(&self) -> Option<Vec<Direction>> {
        let mut seen = HashSet::new();
        let mut todo = VecDeque::new();
        todo.push_back(OrbState {
            x: self.start.0,
            y: self.start.1,
            weight: self.start_weight(),
            pending: None,
            path: vec![],
        });
        while let Some(s) = todo.pop_front() {
            if (s.x, s.y) == self.goal {
                if s.weight == self.target {
                    return Some(s.path);
                }
                continue;
            }
            for d in Direction::ALL {
                let Some(next) = self.advance(&s, d) else {
                    continue;
                };
                if seen.insert((next.x, next.y, next.weight, next.pending)) {
                    todo.push_back(next);
                }
            }
        }
        None
    }

    /// Walks a path from the start, returning the final position and weight
    ///
    /// Returns `None` if any step would be rejected by the search.
    pub fn replay(&self, path: &[Direction]) -> Option<((i32, i32), i64)> {
        let mut s = OrbState {
            x: self.start.0,
            y: self.start.1,
            weight: self.start_weight(),
            pending: None,
            path: vec![],
        };
        for &d in path {
            s = self.advance(&s, d)?;
        }
        Some(((s.x, s.y), s.weight))
    }
}

/// Solves the vault grid
pub fn solve() -> Option<Vec<Direction>> {
    Maze::vault().solve()
}
