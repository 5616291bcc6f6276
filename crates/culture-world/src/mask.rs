//! Boolean occupancy masks and the morphology used by the rules.

use culture_core::{Direction, Position};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Row-major index of `pos` on a `width` x `height` grid, `None` off the grid.
pub(crate) fn grid_index(width: usize, height: usize, pos: Position) -> Option<usize> {
    let inside = pos.x >= 0
        && pos.y >= 0
        && (pos.x as usize) < width
        && (pos.y as usize) < height;
    inside.then(|| pos.y as usize * width + pos.x as usize)
}

/// A boolean grid, row-major, congruent to the culture's grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mask {
    pub width: usize,
    pub height: usize,
    cells: Vec<bool>,
}

impl Mask {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width * height],
        }
    }

    pub fn from_positions(
        width: usize,
        height: usize,
        positions: impl IntoIterator<Item = Position>,
    ) -> Self {
        let mut mask = Self::new(width, height);
        for pos in positions {
            mask.set(pos);
        }
        mask
    }

    /// Every cell except the outermost ring.
    pub fn interior(width: usize, height: usize) -> Self {
        let mut mask = Self::new(width, height);
        for pos in mask.all_positions().collect::<Vec<_>>() {
            if mask.is_interior(pos) {
                mask.set(pos);
            }
        }
        mask
    }

    /// Cells whose centre lies within `radius` of `center`.
    pub fn disc(width: usize, height: usize, center: (f64, f64), radius: f64) -> Self {
        let mut mask = Self::new(width, height);
        for pos in mask.all_positions().collect::<Vec<_>>() {
            if pos.distance(center.0, center.1) <= radius {
                mask.set(pos);
            }
        }
        mask
    }

    pub fn contains(&self, pos: Position) -> bool {
        grid_index(self.width, self.height, pos).is_some()
    }

    /// True for cells not on the outermost ring of the grid.
    pub fn is_interior(&self, pos: Position) -> bool {
        pos.x >= 1
            && pos.y >= 1
            && (pos.x as usize) + 2 <= self.width
            && (pos.y as usize) + 2 <= self.height
    }

    fn index(&self, pos: Position) -> Option<usize> {
        grid_index(self.width, self.height, pos)
    }

    fn position(&self, index: usize) -> Position {
        Position::new((index % self.width) as i32, (index / self.width) as i32)
    }

    /// Out-of-grid reads are unoccupied.
    pub fn get(&self, pos: Position) -> bool {
        self.index(pos).map_or(false, |i| self.cells[i])
    }

    pub fn set(&mut self, pos: Position) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = true;
        }
    }

    pub fn clear(&mut self, pos: Position) {
        if let Some(i) = self.index(pos) {
            self.cells[i] = false;
        }
    }

    pub fn count(&self) -> usize {
        self.cells.iter().filter(|&&c| c).count()
    }

    pub fn is_empty(&self) -> bool {
        !self.cells.iter().any(|&c| c)
    }

    /// Set cells in raster order (row by row, left to right).
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c)
            .map(move |(i, _)| self.position(i))
    }

    fn all_positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.cells.len()).map(move |i| self.position(i))
    }

    fn zip_with(&mut self, other: &Mask, f: impl Fn(bool, bool) -> bool) {
        debug_assert_eq!((self.width, self.height), (other.width, other.height));
        for (a, &b) in self.cells.iter_mut().zip(&other.cells) {
            *a = f(*a, b);
        }
    }

    pub fn union_with(&mut self, other: &Mask) {
        self.zip_with(other, |a, b| a || b);
    }

    pub fn intersect_with(&mut self, other: &Mask) {
        self.zip_with(other, |a, b| a && b);
    }

    pub fn subtract(&mut self, other: &Mask) {
        self.zip_with(other, |a, b| a && !b);
    }

    pub fn and(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        out.intersect_with(other);
        out
    }

    pub fn and_not(&self, other: &Mask) -> Mask {
        let mut out = self.clone();
        out.subtract(other);
        out
    }

    pub fn complement(&self) -> Mask {
        Mask {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(|&c| !c).collect(),
        }
    }

    pub fn is_subset_of(&self, other: &Mask) -> bool {
        self.cells.iter().zip(&other.cells).all(|(&a, &b)| !a || b)
    }

    pub fn overlaps(&self, other: &Mask) -> bool {
        self.cells.iter().zip(&other.cells).any(|(&a, &b)| a && b)
    }

    /// Erosion with a cross-shaped structuring element. A cell survives only
    /// if it and all four neighbours are set; the area outside the grid is unset.
    pub fn erode(&self) -> Mask {
        let mut out = Mask::new(self.width, self.height);
        for pos in self.positions() {
            if Direction::ALL.iter().all(|d| self.get(pos.step(*d))) {
                out.set(pos);
            }
        }
        out
    }

    /// Dilation with a cross-shaped structuring element.
    pub fn dilate(&self) -> Mask {
        let mut out = self.clone();
        for pos in self.positions() {
            for d in Direction::ALL {
                out.set(pos.step(d));
            }
        }
        out
    }

    /// Outer shell: `self AND NOT erode(self)`.
    pub fn boundary(&self) -> Mask {
        self.and_not(&self.erode())
    }

    /// Cells immediately outside the region: `dilate(self) AND NOT self`.
    pub fn ring(&self) -> Mask {
        self.dilate().and_not(self)
    }

    /// Center of mass as (x, y), `None` for an empty mask.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        let mut n = 0usize;
        let (mut sx, mut sy) = (0.0, 0.0);
        for pos in self.positions() {
            n += 1;
            sx += pos.x as f64;
            sy += pos.y as f64;
        }
        (n > 0).then(|| (sx / n as f64, sy / n as f64))
    }

    /// Pick one of the four neighbours of `pos` that is unset in `self`,
    /// uniformly at random. Neighbours on the outermost ring of the grid are
    /// never candidates. No random draw is made when nothing qualifies.
    pub fn free_neighbour<R: Rng + ?Sized>(&self, pos: Position, rng: &mut R) -> Option<Position> {
        let candidates: Vec<Position> = Direction::ALL
            .iter()
            .map(|d| pos.step(*d))
            .filter(|n| self.is_interior(*n) && !self.get(*n))
            .collect();

        candidates.choose(rng).copied()
    }
}
