//! Simulation core. Nothing here spawns tasks or sleeps; the runtime in
//! `arena` drives these functions under the shared-state lock.

pub mod collision;
pub mod entity;
pub mod images;
pub mod input;
pub mod list;
pub mod physics;
pub mod session;
pub mod spawn;
pub mod world;
