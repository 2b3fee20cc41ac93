//! Game module - the owning context that wires every service together

mod context;

pub use context::GameContext;
