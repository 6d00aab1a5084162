//! The 2D grid of nodes plus the ordered head list.

use super::head::Hed;
use super::node::Nod;
use super::Coord;

pub struct Memory2D {
    rows: usize,
    cols: usize,
    /// Row-major cells, at most one node each.
    cells: Vec<Option<Nod>>,
    /// Heads in insertion order; ticks fire them in this order.
    heds: Vec<Hed>,
    /// Bumped by `clear` so an in-flight tick knows not to restore heads
    /// taken out before the wipe.
    epoch: u64,
}

impl Memory2D {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![None; rows * cols],
            heds: Vec::new(),
            epoch: 0,
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn check_bounds(&self, at: Coord) -> Result<(), String> {
        if at.x < 0 || at.x as usize >= self.cols || at.y < 0 || at.y as usize >= self.rows {
            return Err(format!("coordinates ({},{}) out of bounds", at.x, at.y));
        }
        Ok(())
    }

    fn index(&self, at: Coord) -> usize {
        at.y as usize * self.cols + at.x as usize
    }

    pub fn add_nod(&mut self, at: Coord, nod: Nod) -> Result<(), String> {
        self.check_bounds(at)
            .map_err(|e| format!("invalid coordinates: {e}"))?;
        let index = self.index(at);
        self.cells[index] = Some(nod);
        Ok(())
    }

    pub fn get_nod(&self, at: Coord) -> Result<&Nod, String> {
        self.check_bounds(at)
            .map_err(|e| format!("invalid coordinates: {e}"))?;
        self.cells[self.index(at)]
            .as_ref()
            .ok_or_else(|| format!("no node at coordinates ({},{})", at.x, at.y))
    }

    pub fn get_nod_mut(&mut self, at: Coord) -> Result<&mut Nod, String> {
        self.check_bounds(at)
            .map_err(|e| format!("invalid coordinates: {e}"))?;
        let index = self.index(at);
        self.cells[index]
            .as_mut()
            .ok_or_else(|| format!("no node at coordinates ({},{})", at.x, at.y))
    }

    /// Register a head. A head with the same id is replaced in place, so its
    /// firing position in the tick order is preserved.
    pub fn add_hed(&mut self, at: Coord, hed: Hed) -> Result<(), String> {
        self.check_bounds(at)
            .map_err(|e| format!("invalid coordinates: {e}"))?;
        match self.heds.iter_mut().find(|h| h.id() == hed.id()) {
            Some(slot) => *slot = hed,
            None => self.heds.push(hed),
        }
        Ok(())
    }

    pub fn get_hed_mut(&mut self, at: Coord) -> Result<&mut Hed, String> {
        self.check_bounds(at)
            .map_err(|e| format!("invalid coordinates: {e}"))?;
        let id = at.to_string();
        self.heds
            .iter_mut()
            .find(|h| h.id() == id)
            .ok_or_else(|| format!("no head at coordinates ({},{})", at.x, at.y))
    }

    pub fn heds(&self) -> &[Hed] {
        &self.heds
    }

    pub fn hed_ids(&self) -> Vec<String> {
        self.heds.iter().map(|h| h.id().to_string()).collect()
    }

    /// Detach a head for a tick-time bang, remembering its position.
    pub fn take_hed(&mut self, id: &str) -> Option<(usize, Hed)> {
        let index = self.heds.iter().position(|h| h.id() == id)?;
        Some((index, self.heds.remove(index)))
    }

    /// Re-attach a head taken with [`take_hed`]. Dropped instead when the
    /// grid was cleared in between, or when the bang re-created a head with
    /// the same id (the newer head wins).
    pub fn restore_hed(&mut self, index: usize, hed: Hed, epoch: u64) {
        if self.epoch != epoch {
            return;
        }
        if self.heds.iter().any(|h| h.id() == hed.id()) {
            return;
        }
        let index = index.min(self.heds.len());
        self.heds.insert(index, hed);
    }

    /// Occupied cells with their coordinates, row by row.
    pub fn nods(&self) -> impl Iterator<Item = (Coord, &Nod)> {
        self.cells.iter().enumerate().filter_map(|(i, cell)| {
            cell.as_ref().map(|nod| {
                let at = Coord::new((i % self.cols) as i64, (i / self.cols) as i64);
                (at, nod)
            })
        })
    }

    /// Wipe every cell and drop all heads; dimensions are kept.
    pub fn clear(&mut self) {
        self.cells = vec![None; self.rows * self.cols];
        self.heds.clear();
        self.epoch += 1;
    }
}
