//! Organism state and management.

use crate::life::LifeField;
use crate::mask::Mask;
use culture_core::{Color, OrganismId, Position};
use serde::{Deserialize, Serialize};

/// One independently growing and fighting region of the grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organism {
    pub id: OrganismId,
    pub grow_chance: f64,
    pub attack_chance: f64,
    pub color: Color,
    cells: Mask,
    boundary: Mask,
    life: Option<LifeField>,
}

impl Organism {
    pub fn new(
        id: OrganismId,
        width: usize,
        height: usize,
        seed: Position,
        grow_chance: f64,
        attack_chance: f64,
        color: Color,
    ) -> Self {
        let cells = Mask::from_positions(width, height, [seed]);
        let boundary = cells.boundary();

        Self {
            id,
            grow_chance,
            attack_chance,
            color,
            cells,
            boundary,
            life: None,
        }
    }

    /// Attach a life field, giving the seed cell(s) `initial` life.
    pub fn with_life(mut self, initial: f64) -> Self {
        let mut life = LifeField::new(self.cells.width, self.cells.height);
        for pos in self.cells.positions() {
            life.set(pos, initial);
        }
        self.life = Some(life);
        self
    }

    pub fn cells(&self) -> &Mask {
        &self.cells
    }

    pub fn boundary(&self) -> &Mask {
        &self.boundary
    }

    pub fn life(&self) -> Option<&LifeField> {
        self.life.as_ref()
    }

    pub fn owns(&self, pos: Position) -> bool {
        self.cells.get(pos)
    }

    pub fn size(&self) -> usize {
        self.cells.count()
    }

    pub fn is_extinct(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.cells.centroid()
    }

    /// Take ownership of a cell. `life` is ignored when life is not tracked.
    /// The boundary is stale until `refresh_boundary` is called.
    pub fn claim(&mut self, pos: Position, life: f64) {
        self.cells.set(pos);
        if let Some(field) = self.life.as_mut() {
            field.set(pos, life);
        }
    }

    /// Give up a cell. Returns whether it was owned.
    pub fn release(&mut self, pos: Position) -> bool {
        let owned = self.cells.get(pos);
        if owned {
            self.cells.clear(pos);
            if let Some(field) = self.life.as_mut() {
                field.set(pos, 0.0);
            }
        }
        owned
    }

    /// Drain `amount` of life from every owned cell, releasing expired cells.
    pub fn decay(&mut self, amount: f64) -> Vec<Position> {
        let expired = match self.life.as_mut() {
            Some(field) => field.drain(&self.cells, amount),
            None => return Vec::new(),
        };
        for pos in &expired {
            self.cells.clear(*pos);
        }
        expired
    }

    pub fn refresh_boundary(&mut self) {
        self.boundary = self.cells.boundary();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn organism(seed: Position) -> Organism {
        Organism::new(OrganismId(0), 10, 10, seed, 0.5, 0.5, Color::new(200, 30, 30))
    }

    #[test]
    fn test_organism_creation() {
        let seed = Position::new(5, 5);
        let organism = organism(seed);

        assert_eq!(organism.size(), 1);
        assert!(organism.owns(seed));
        assert!(organism.boundary().get(seed));
        assert!(!organism.is_extinct());
        assert!(organism.life().is_none());
    }

    #[test]
    fn test_claim_release_and_boundary() {
        let mut organism = organism(Position::new(5, 5));
        for pos in [
            Position::new(4, 5),
            Position::new(6, 5),
            Position::new(5, 4),
            Position::new(5, 6),
        ] {
            organism.claim(pos, 1.0);
        }

        // Boundary is only recomputed on request
        assert_eq!(organism.boundary().count(), 1);
        organism.refresh_boundary();
        assert_eq!(organism.boundary().count(), 4);
        assert!(!organism.boundary().get(Position::new(5, 5)));

        assert!(organism.release(Position::new(5, 5)));
        assert!(!organism.release(Position::new(5, 5)));
        assert_eq!(organism.size(), 4);
    }

    #[test]
    fn test_decay_releases_expired_cells() {
        let seed = Position::new(3, 3);
        let mut organism = organism(seed).with_life(1.5);
        organism.claim(Position::new(3, 4), 0.5);

        let expired = organism.decay(1.0);
        assert_eq!(expired, vec![Position::new(3, 4)]);
        assert_eq!(organism.size(), 1);

        let expired = organism.decay(1.0);
        assert_eq!(expired, vec![seed]);
        assert!(organism.is_extinct());
    }

    #[test]
    fn test_decay_without_life_is_noop() {
        let mut organism = organism(Position::new(2, 2));
        assert!(organism.decay(100.0).is_empty());
        assert_eq!(organism.size(), 1);
    }
}
