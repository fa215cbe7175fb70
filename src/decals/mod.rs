//! Player-placed map decals: placement, editing, persistence, and visibility.
pub mod controller;
pub mod errors;
pub mod events;
pub mod host;
pub mod jobs;
pub mod menu;
pub mod mode;
pub mod placement;
pub mod plugin;
pub mod registry;
pub mod systems;
pub mod telemetry;
pub mod types;
pub mod visibility;

#[cfg(test)]
pub(crate) mod testing;

pub use plugin::DecalsPlugin;
