//! Cellular-automaton engine.
//!
//! Organisms grow into free space, fight over shared borders and, optionally,
//! decay over time on one shared occupancy grid.

pub mod mask;
pub mod life;
pub mod organism;
pub mod culture;
pub mod simulation;

pub use mask::Mask;
pub use life::LifeField;
pub use organism::Organism;
pub use culture::{Culture, TickReport};
pub use simulation::{
    Clock, FixedInterval, ManualClock, NullSink, Pacer, RenderSink, Simulation, SimulationResult,
    SystemClock, Unpaced,
};
