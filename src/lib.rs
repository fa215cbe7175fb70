pub mod config;
pub mod decals;
pub mod store;
