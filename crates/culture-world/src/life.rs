//! Per-cell life (energy) field used by the decay pass.

use crate::mask::{grid_index, Mask};
use culture_core::Position;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeField {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl LifeField {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            values: vec![0.0; width * height],
        }
    }

    fn index(&self, pos: Position) -> Option<usize> {
        grid_index(self.width, self.height, pos)
    }

    pub fn get(&self, pos: Position) -> f64 {
        self.index(pos).map_or(0.0, |i| self.values[i])
    }

    pub fn set(&mut self, pos: Position, value: f64) {
        if let Some(i) = self.index(pos) {
            self.values[i] = value;
        }
    }

    /// Subtract `amount` from every cell set in `cells` and return the cells
    /// whose life dropped to zero or below. Those cells are reset to zero.
    pub fn drain(&mut self, cells: &Mask, amount: f64) -> Vec<Position> {
        let mut expired = Vec::new();
        for pos in cells.positions() {
            if let Some(i) = self.index(pos) {
                self.values[i] -= amount;
                if self.values[i] <= 0.0 {
                    self.values[i] = 0.0;
                    expired.push(pos);
                }
            }
        }
        expired
    }
}
