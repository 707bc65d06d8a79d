pub mod agent;
pub mod delivery;
pub mod host;
pub mod queue;
