//! The spatial execution graph: grid memory, nodes, heads, clock, and the
//! dictionary words that wire them together.

pub mod clock;
pub mod head;
pub mod memory;
pub mod node;
pub mod words;

use std::fmt;

use crate::events::{OscClient, UiSender};
use self::clock::Clock;
use self::memory::Memory2D;

/// A grid cell position. Displays as the `"x,y"` id form shared by nodes
/// and heads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coord {
    pub x: i64,
    pub y: i64,
}

impl Coord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

/// Everything a dictionary word can reach: the grid, the clock handle and
/// the outbound emitters. Owned by the world service thread.
pub struct World {
    pub memory: Memory2D,
    pub clock: Clock,
    pub osc: OscClient,
    pub ui: UiSender,
}
