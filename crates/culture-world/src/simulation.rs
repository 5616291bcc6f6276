//! Simulation driver: one culture, one random stream, one clock.

use crate::culture::{Culture, TickReport};
use crate::mask::Mask;
use culture_core::{Color, OrganismId, Result, SimulationConfig};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument};

/// Receives the boundary of every surviving organism once per tick
pub trait RenderSink {
    fn begin_frame(&mut self, _generation: u64) -> Result<()> {
        Ok(())
    }

    fn draw_boundary(&mut self, id: OrganismId, color: Color, boundary: &Mask) -> Result<()>;

    fn end_frame(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Sink that draws nothing
#[derive(Debug, Default)]
pub struct NullSink;

impl RenderSink for NullSink {
    fn draw_boundary(&mut self, _id: OrganismId, _color: Color, _boundary: &Mask) -> Result<()> {
        Ok(())
    }
}

/// Monotonic time source for the decay pass
pub trait Clock {
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock advanced by hand; each reading moves it forward by `step`.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Duration>,
    step: Duration,
}

impl ManualClock {
    pub fn new(step: Duration) -> Self {
        Self {
            now: Cell::new(Duration::ZERO),
            step,
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        let now = self.now.get();
        self.now.set(now + self.step);
        now
    }
}

/// Frame pacing owned by the caller. Returning `false` stops the run.
pub trait Pacer {
    fn wait(&mut self, generation: u64) -> bool;
}

/// Pacer that never waits
#[derive(Debug, Default)]
pub struct Unpaced;

impl Pacer for Unpaced {
    fn wait(&mut self, _generation: u64) -> bool {
        true
    }
}

/// Sleeps a fixed interval between frames
#[derive(Debug)]
pub struct FixedInterval(pub Duration);

impl Pacer for FixedInterval {
    fn wait(&mut self, _generation: u64) -> bool {
        std::thread::sleep(self.0);
        true
    }
}

pub struct Simulation<C: Clock = SystemClock> {
    culture: Culture,
    config: SimulationConfig,
    rng: ChaCha8Rng,
    clock: C,
    last_update: Duration,
}

impl<C: Clock> Simulation<C> {
    pub fn new(config: SimulationConfig, clock: C) -> Result<Self> {
        config.validate()?;

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let mut culture = Culture::from_config(&config.world, &config.rules)?;
        for _ in 0..config.spawn.organisms {
            culture.spawn_random(&config.spawn, &mut rng)?;
        }

        info!(
            width = config.world.width,
            height = config.world.height,
            organisms = culture.len(),
            seed = config.seed,
            "Culture seeded"
        );

        let last_update = clock.now();
        Ok(Self {
            culture,
            config,
            rng,
            clock,
            last_update,
        })
    }

    pub fn culture(&self) -> &Culture {
        &self.culture
    }

    pub fn culture_mut(&mut self) -> &mut Culture {
        &mut self.culture
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Advance one tick and hand the result to `sink`.
    pub fn tick(&mut self, sink: &mut dyn RenderSink) -> Result<TickReport> {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_update);
        self.last_update = now;

        let report = self.culture.step(elapsed, &mut self.rng);
        self.render(sink)?;
        Ok(report)
    }

    /// Draw the current state without advancing.
    pub fn render(&self, sink: &mut dyn RenderSink) -> Result<()> {
        sink.begin_frame(self.culture.generation())?;
        for organism in self.culture.organisms() {
            sink.draw_boundary(organism.id, organism.color, organism.boundary())?;
        }
        sink.end_frame()
    }

    /// Run until the tick budget is spent, one organism is left, or the
    /// pacer asks to stop.
    #[instrument(skip_all, fields(num_ticks = ?self.config.num_ticks))]
    pub fn run(
        &mut self,
        sink: &mut dyn RenderSink,
        pacer: &mut dyn Pacer,
    ) -> Result<SimulationResult> {
        info!("Starting simulation");
        self.render(sink)?;

        let mut ticks = 0u64;
        let mut stopped = false;
        while self.config.num_ticks.map_or(true, |limit| ticks < limit) {
            if self.culture.is_extinct() {
                break;
            }
            if !pacer.wait(self.culture.generation()) {
                stopped = true;
                break;
            }

            let report = self.tick(sink)?;
            ticks += 1;

            if ticks % 100 == 0 {
                debug!(
                    tick = ticks,
                    organisms = self.culture.len(),
                    occupied = self.culture.all_cells().count(),
                    captured = report.captured,
                    "Population snapshot"
                );
            }
        }

        let result = self.collect_results(ticks, stopped);
        info!(
            event = "run_complete",
            ticks = result.ticks,
            survivors = result.survivors.len(),
            stopped = result.stopped,
            "Simulation finished"
        );
        Ok(result)
    }

    fn collect_results(&self, ticks: u64, stopped: bool) -> SimulationResult {
        let survivors = self
            .culture
            .organisms()
            .iter()
            .map(|o| SurvivorSummary {
                id: o.id,
                cells: o.size(),
                grow_chance: o.grow_chance,
                attack_chance: o.attack_chance,
            })
            .collect();

        SimulationResult {
            ticks,
            generation: self.culture.generation(),
            stopped,
            survivors,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurvivorSummary {
    pub id: OrganismId,
    pub cells: usize,
    pub grow_chance: f64,
    pub attack_chance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationResult {
    pub ticks: u64,
    pub generation: u64,
    /// The pacer ended the run early
    pub stopped: bool,
    pub survivors: Vec<SurvivorSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use culture_core::{Position, SpawnConfig, WorldConfig};
    use std::collections::HashMap;

    #[derive(Default)]
    struct RecordingSink {
        frames: Vec<u64>,
        drawn: HashMap<OrganismId, usize>,
        open: bool,
    }

    impl RenderSink for RecordingSink {
        fn begin_frame(&mut self, generation: u64) -> Result<()> {
            assert!(!self.open);
            self.open = true;
            self.frames.push(generation);
            self.drawn.clear();
            Ok(())
        }

        fn draw_boundary(&mut self, id: OrganismId, _color: Color, boundary: &Mask) -> Result<()> {
            assert!(self.open);
            self.drawn.insert(id, boundary.count());
            Ok(())
        }

        fn end_frame(&mut self) -> Result<()> {
            self.open = false;
            Ok(())
        }
    }

    struct StopAfter(u64);

    impl Pacer for StopAfter {
        fn wait(&mut self, generation: u64) -> bool {
            generation < self.0
        }
    }

    fn small_config(num_ticks: Option<u64>) -> SimulationConfig {
        SimulationConfig {
            seed: 42,
            num_ticks,
            world: WorldConfig {
                width: 30,
                height: 20,
                habitat: None,
            },
            spawn: SpawnConfig {
                organisms: 4,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_simulation_creation() {
        let sim = Simulation::new(small_config(Some(10)), ManualClock::default());
        assert!(sim.is_ok());
        assert_eq!(sim.unwrap().culture().len(), 4);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = small_config(None);
        config.world.width = 1;
        assert!(Simulation::new(config, ManualClock::default()).is_err());
    }

    #[test]
    fn test_run_respects_tick_budget() {
        let mut sim = Simulation::new(small_config(Some(25)), ManualClock::default()).unwrap();
        let mut sink = RecordingSink::default();

        let result = sim.run(&mut sink, &mut Unpaced).unwrap();

        assert!(result.ticks <= 25);
        assert!(!result.stopped);
        // One initial frame plus one per tick
        assert_eq!(sink.frames.len() as u64, result.ticks + 1);
        assert_eq!(sink.drawn.len(), sim.culture().len());
        assert!(sim.culture().check_invariants().is_ok());
    }

    #[test]
    fn test_pacer_stops_run() {
        // Nobody grows or attacks, so only the pacer can end the run
        let mut config = small_config(None);
        config.spawn.grow_chance_min = 0.0;
        config.spawn.grow_chance_max = 0.0;
        config.spawn.attack_chance_min = 0.0;
        config.spawn.attack_chance_max = 0.0;

        let mut sim = Simulation::new(config, ManualClock::default()).unwrap();
        let result = sim.run(&mut NullSink, &mut StopAfter(5)).unwrap();

        assert!(result.stopped);
        assert_eq!(result.ticks, 5);
        assert_eq!(result.generation, 5);
        assert_eq!(result.survivors.len(), 4);
    }

    #[test]
    fn test_run_ends_at_extinction() {
        let mut config = small_config(Some(10_000));
        config.spawn.organisms = 0;

        let mut sim = Simulation::new(config, ManualClock::default()).unwrap();
        let culture = sim.culture_mut();
        let attacker = culture
            .add_organism(Position::new(4, 5), 0.0, 1.0, Color::new(200, 20, 20))
            .unwrap();
        culture
            .add_organism(Position::new(5, 5), 0.0, 0.0, Color::new(20, 20, 200))
            .unwrap();

        let result = sim.run(&mut NullSink, &mut Unpaced).unwrap();

        // The attacker takes its neighbour's only cell on the first tick
        assert_eq!(result.ticks, 1);
        assert!(!result.stopped);
        assert!(sim.culture().is_extinct());
        assert_eq!(result.survivors.len(), 1);
        assert_eq!(result.survivors[0].id, attacker);
        assert_eq!(result.survivors[0].cells, 2);
    }

    #[test]
    fn test_single_organism_does_not_run() {
        let mut config = small_config(Some(100));
        config.spawn.organisms = 1;

        let mut sim = Simulation::new(config, ManualClock::default()).unwrap();
        let result = sim.run(&mut NullSink, &mut Unpaced).unwrap();

        assert_eq!(result.ticks, 0);
        assert_eq!(result.survivors.len(), 1);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let mut a = Simulation::new(small_config(Some(50)), ManualClock::default()).unwrap();
        let mut b = Simulation::new(small_config(Some(50)), ManualClock::default()).unwrap();
        a.run(&mut NullSink, &mut Unpaced).unwrap();
        b.run(&mut NullSink, &mut Unpaced).unwrap();

        assert_eq!(a.culture().all_cells(), b.culture().all_cells());
    }

    #[test]
    fn test_decay_uses_clock_time() {
        let mut config = small_config(Some(3));
        config.spawn.organisms = 1;
        config.spawn.grow_chance_min = 0.0;
        config.spawn.grow_chance_max = 0.0;
        config.rules.track_life = true;
        config.rules.seed_life_max = 1.0;

        // Each clock reading jumps two seconds: the seed expires on the first tick
        let clock = ManualClock::new(Duration::from_secs(2));
        let mut sim = Simulation::new(config, clock).unwrap();
        let report = sim.tick(&mut NullSink).unwrap();

        assert_eq!(report.decayed, 1);
        assert!(sim.culture().is_empty());
    }

    #[test]
    fn test_manual_clock_advance() {
        let clock = ManualClock::default();
        clock.advance(Duration::from_millis(300));
        assert_eq!(clock.now(), Duration::from_millis(300));
    }

    #[test]
    fn test_result_serialization() {
        let mut sim = Simulation::new(small_config(Some(5)), ManualClock::default()).unwrap();
        let result = sim.run(&mut NullSink, &mut Unpaced).unwrap();

        let json = serde_json::to_string(&result).unwrap();
        let back: SimulationResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back.ticks, result.ticks);
        assert_eq!(back.survivors.len(), result.survivors.len());
    }
}
