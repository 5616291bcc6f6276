//! The culture: every organism on one shared grid and the per-tick rules.

use crate::mask::Mask;
use crate::organism::Organism;
use culture_core::error::check_chance;
use culture_core::{
    Color, Error, Expansion, OrganismId, Position, Result, RuleConfig, SpawnConfig, WorldConfig,
};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;
use tracing::{debug, info};

/// What happened during one tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickReport {
    pub generation: u64,
    pub grown: usize,
    pub captured: usize,
    pub decayed: usize,
    pub extinct: Vec<OrganismId>,
}

/// All organisms sharing one grid.
///
/// Organisms are kept in insertion order, which is also the order every rule
/// pass visits them in. `all_cells` is the union of every organism's cells and
/// no cell is owned by two organisms between passes.
#[derive(Debug, Clone)]
pub struct Culture {
    width: usize,
    height: usize,
    rules: RuleConfig,
    habitat: Option<Mask>,
    /// Interior cells inside the habitat: where growth may land
    growable: Mask,
    /// Radius used when seeding the life of grown cells
    life_radius: f64,
    organisms: Vec<Organism>,
    all_cells: Mask,
    next_id: u32,
    generation: u64,
}

impl Culture {
    pub fn new(width: usize, height: usize, habitat: Option<Mask>) -> Result<Self> {
        Self::with_rules(width, height, habitat, RuleConfig::default())
    }

    pub fn with_rules(
        width: usize,
        height: usize,
        habitat: Option<Mask>,
        rules: RuleConfig,
    ) -> Result<Self> {
        if width < 3 || height < 3 {
            return Err(Error::InvalidParameter(format!(
                "grid must be at least 3x3, got {}x{}",
                width, height
            )));
        }

        let mut growable = Mask::interior(width, height);
        let life_radius = match &habitat {
            Some(mask) => {
                if (mask.width, mask.height) != (width, height) {
                    return Err(Error::InvalidParameter(format!(
                        "habitat is {}x{}, grid is {}x{}",
                        mask.width, mask.height, width, height
                    )));
                }
                growable.intersect_with(mask);
                // Radius of a disc with the same area
                (mask.count() as f64 / PI).sqrt()
            }
            None => width.min(height) as f64 / 2.0,
        };

        Ok(Self {
            width,
            height,
            rules,
            habitat,
            growable,
            life_radius,
            organisms: Vec::new(),
            all_cells: Mask::new(width, height),
            next_id: 0,
            generation: 0,
        })
    }

    /// Build an empty culture from configuration, with a circular habitat
    /// centred on the grid when one is configured.
    pub fn from_config(world: &WorldConfig, rules: &RuleConfig) -> Result<Self> {
        let habitat = world.habitat.map(|h| {
            let center = (
                (world.width as f64 - 1.0) / 2.0,
                (world.height as f64 - 1.0) / 2.0,
            );
            Mask::disc(world.width, world.height, center, h.radius)
        });
        Self::with_rules(world.width, world.height, habitat, rules.clone())
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rules(&self) -> &RuleConfig {
        &self.rules
    }

    pub fn habitat(&self) -> Option<&Mask> {
        self.habitat.as_ref()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn organisms(&self) -> &[Organism] {
        &self.organisms
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }

    pub fn all_cells(&self) -> &Mask {
        &self.all_cells
    }

    pub fn organism(&self, id: OrganismId) -> Option<&Organism> {
        self.organisms.iter().find(|o| o.id == id)
    }

    pub fn cells(&self, id: OrganismId) -> Result<&Mask> {
        self.organism(id).map(Organism::cells).ok_or(Error::NotFound(id))
    }

    pub fn boundary_cells(&self, id: OrganismId) -> Result<&Mask> {
        self.organism(id).map(Organism::boundary).ok_or(Error::NotFound(id))
    }

    pub fn owner_at(&self, pos: Position) -> Option<OrganismId> {
        self.organisms.iter().find(|o| o.owns(pos)).map(|o| o.id)
    }

    /// True once at most one organism is left.
    pub fn is_extinct(&self) -> bool {
        self.organisms.len() <= 1
    }

    /// Seed a new organism on a single cell. Seeds must lie off the outer
    /// ring of the grid, inside the habitat and on an unoccupied cell.
    pub fn add_organism(
        &mut self,
        seed: Position,
        grow_chance: f64,
        attack_chance: f64,
        color: Color,
    ) -> Result<OrganismId> {
        let life = self.rules.seed_life_max;
        self.insert_organism(seed, grow_chance, attack_chance, color, life)
    }

    /// Seed an organism at a random free cell with random parameters drawn
    /// from the spawn ranges.
    pub fn spawn_random<R: Rng + ?Sized>(
        &mut self,
        spawn: &SpawnConfig,
        rng: &mut R,
    ) -> Result<OrganismId> {
        let free: Vec<Position> = self.growable.and_not(&self.all_cells).positions().collect();
        let Some(&seed) = free.choose(rng) else {
            return Err(Error::InvalidParameter(
                "no free seed cell left in the habitat".to_string(),
            ));
        };

        let grow_chance = draw_between(rng, spawn.grow_chance_min, spawn.grow_chance_max);
        let attack_chance = draw_between(rng, spawn.attack_chance_min, spawn.attack_chance_max);
        let color = Color::random(rng);
        let life = if self.rules.track_life {
            rng.gen::<f64>() * self.rules.seed_life_max
        } else {
            0.0
        };

        self.insert_organism(seed, grow_chance, attack_chance, color, life)
    }

    fn insert_organism(
        &mut self,
        seed: Position,
        grow_chance: f64,
        attack_chance: f64,
        color: Color,
        life: f64,
    ) -> Result<OrganismId> {
        check_chance("grow_chance", grow_chance)?;
        check_chance("attack_chance", attack_chance)?;

        if !self.all_cells.is_interior(seed)
            || self.habitat.as_ref().map_or(false, |h| !h.get(seed))
            || self.all_cells.get(seed)
        {
            return Err(Error::InvalidSeed { x: seed.x, y: seed.y });
        }

        let id = OrganismId(self.next_id);
        self.next_id += 1;

        let mut organism = Organism::new(
            id,
            self.width,
            self.height,
            seed,
            grow_chance,
            attack_chance,
            color,
        );
        if self.rules.track_life {
            organism = organism.with_life(life);
        }

        self.all_cells.set(seed);
        self.organisms.push(organism);

        debug!(
            organism_id = %id,
            seed = %seed,
            grow_chance,
            attack_chance,
            "Organism seeded"
        );

        Ok(id)
    }

    /// Run one tick: growth, combat, decay, then extinction pruning.
    pub fn step<R: Rng + ?Sized>(&mut self, elapsed: Duration, rng: &mut R) -> TickReport {
        if self.organisms.is_empty() {
            return TickReport {
                generation: self.generation,
                ..Default::default()
            };
        }

        let grown = self.grow(rng);
        let captured = self.fight(rng);
        let decayed = self.decay(elapsed);
        let extinct = self.prune_extinct();
        self.generation += 1;

        let report = TickReport {
            generation: self.generation,
            grown,
            captured,
            decayed,
            extinct,
        };

        debug!(
            generation = report.generation,
            grown = report.grown,
            captured = report.captured,
            decayed = report.decayed,
            extinct = report.extinct.len(),
            organisms = self.organisms.len(),
            occupied = self.all_cells.count(),
            "Tick complete"
        );

        report
    }

    /// Growth pass. Organisms are visited in order and `all_cells` is updated
    /// after each one, so earlier organisms win contested free cells.
    pub fn grow<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let mut grown = 0;
        for i in 0..self.organisms.len() {
            grown += match self.rules.expansion {
                Expansion::Ring => self.grow_ring(i, rng),
                Expansion::Frontier => self.grow_frontier(i, rng),
            };
            self.organisms[i].refresh_boundary();
        }
        grown
    }

    fn grow_ring<R: Rng + ?Sized>(&mut self, i: usize, rng: &mut R) -> usize {
        let organism = &self.organisms[i];
        let mut candidates = organism.cells().ring();
        candidates.intersect_with(&self.growable);
        candidates.subtract(&self.all_cells);

        let chance = organism.grow_chance;
        let claimed: Vec<Position> = candidates
            .positions()
            .filter(|_| rng.gen::<f64>() < chance)
            .collect();

        let centroid = organism.centroid();
        for pos in &claimed {
            let life = self.grown_cell_life(*pos, centroid, rng);
            self.organisms[i].claim(*pos, life);
            self.all_cells.set(*pos);
        }
        claimed.len()
    }

    fn grow_frontier<R: Rng + ?Sized>(&mut self, i: usize, rng: &mut R) -> usize {
        let frontier = self.organisms[i].boundary().clone();
        let centroid = self.organisms[i].centroid();
        let chance = self.organisms[i].grow_chance;

        // Anything not growable blocks the neighbour lookup
        let mut blocked = self.growable.complement();
        blocked.union_with(&self.all_cells);

        let mut grown = 0;
        for pos in frontier.positions() {
            let Some(target) = blocked.free_neighbour(pos, rng) else {
                continue;
            };
            if rng.gen::<f64>() < chance {
                let life = self.grown_cell_life(target, centroid, rng);
                self.organisms[i].claim(target, life);
                self.all_cells.set(target);
                blocked.set(target);
                grown += 1;
            }
        }
        grown
    }

    /// `radius / distance_to_centroid + uniform(0, jitter) + floor`; no draw
    /// is made when life is not tracked.
    fn grown_cell_life<R: Rng + ?Sized>(
        &self,
        pos: Position,
        centroid: Option<(f64, f64)>,
        rng: &mut R,
    ) -> f64 {
        if !self.rules.track_life {
            return 0.0;
        }
        let distance = centroid
            .map(|(cx, cy)| pos.distance(cx, cy))
            .unwrap_or(1.0)
            .max(1.0);
        self.life_radius / distance + rng.gen::<f64>() * self.rules.life_jitter
            + self.rules.life_floor
    }

    /// Combat pass. Every organism attacks against the occupancy snapshot
    /// taken when the pass starts; captures made earlier in the pass do not
    /// change which cells later organisms target.
    pub fn fight<R: Rng + ?Sized>(&mut self, rng: &mut R) -> usize {
        let snapshot: Vec<Mask> = self.organisms.iter().map(|o| o.cells().clone()).collect();
        let occupied = self.all_cells.clone();
        let mut touched = vec![false; self.organisms.len()];

        let mut captured = 0;
        for i in 0..self.organisms.len() {
            let own = &snapshot[i];
            let enemies = occupied.and_not(own);
            let chance = self.organisms[i].attack_chance;

            let targets: Vec<Position> = match self.rules.expansion {
                Expansion::Ring => own
                    .ring()
                    .and(&enemies)
                    .positions()
                    .filter(|_| rng.gen::<f64>() < chance)
                    .collect(),
                Expansion::Frontier => {
                    let not_enemy = enemies.complement();
                    let mut targets = Vec::new();
                    for pos in own.boundary().positions() {
                        if let Some(target) = not_enemy.free_neighbour(pos, rng) {
                            if rng.gen::<f64>() < chance {
                                targets.push(target);
                            }
                        }
                    }
                    targets
                }
            };

            for pos in targets {
                if self.capture(i, pos, &mut touched) {
                    captured += 1;
                }
            }
        }

        for (organism, touched) in self.organisms.iter_mut().zip(touched) {
            if touched {
                organism.refresh_boundary();
            }
        }
        captured
    }

    /// Clear `pos` from every organism and hand it to organism `winner`,
    /// carrying over the loser's remaining life.
    fn capture(&mut self, winner: usize, pos: Position, touched: &mut [bool]) -> bool {
        if self.organisms[winner].owns(pos) {
            return false;
        }

        let mut life = 0.0;
        for (j, organism) in self.organisms.iter_mut().enumerate() {
            if let Some(field) = organism.life() {
                if organism.owns(pos) {
                    life = field.get(pos);
                }
            }
            if organism.release(pos) {
                touched[j] = true;
            }
        }

        self.organisms[winner].claim(pos, life);
        self.all_cells.set(pos);
        touched[winner] = true;
        true
    }

    /// Decay pass: drain `elapsed` seconds of life from every owned cell.
    /// A no-op unless life is tracked.
    pub fn decay(&mut self, elapsed: Duration) -> usize {
        if !self.rules.track_life {
            return 0;
        }

        let amount = elapsed.as_secs_f64();
        let mut decayed = 0;
        for organism in &mut self.organisms {
            let expired = organism.decay(amount);
            if !expired.is_empty() {
                decayed += expired.len();
                organism.refresh_boundary();
            }
        }

        self.rebuild_all_cells();
        decayed
    }

    /// Remove organisms that own no cells. Returns their ids.
    pub fn prune_extinct(&mut self) -> Vec<OrganismId> {
        let extinct: Vec<OrganismId> = self
            .organisms
            .iter()
            .filter(|o| o.is_extinct())
            .map(|o| o.id)
            .collect();

        if !extinct.is_empty() {
            self.organisms.retain(|o| !o.is_extinct());
            for id in &extinct {
                info!(
                    event = "organism_extinct",
                    organism_id = %id,
                    generation = self.generation,
                    survivors = self.organisms.len(),
                    "Organism went extinct"
                );
            }
        }
        extinct
    }

    fn rebuild_all_cells(&mut self) {
        let mut all = Mask::new(self.width, self.height);
        for organism in &self.organisms {
            all.union_with(organism.cells());
        }
        self.all_cells = all;
    }

    /// Verify the union, mutual-exclusion and boundary invariants.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let mut union = Mask::new(self.width, self.height);
        for organism in &self.organisms {
            if union.overlaps(organism.cells()) {
                return Err(format!("organism {} shares a cell with another organism", organism.id));
            }
            union.union_with(organism.cells());

            if !organism.boundary().is_subset_of(organism.cells()) {
                return Err(format!("organism {} boundary escapes its cells", organism.id));
            }
            if organism.boundary() != &organism.cells().boundary() {
                return Err(format!("organism {} boundary is stale", organism.id));
            }
        }

        if union != self.all_cells {
            return Err(format!(
                "all_cells holds {} cells but the organisms own {}",
                self.all_cells.count(),
                union.count()
            ));
        }
        Ok(())
    }
}

fn draw_between<R: Rng + ?Sized>(rng: &mut R, min: f64, max: f64) -> f64 {
    min + rng.gen::<f64>() * (max - min)
}
