pub mod arena;
pub mod config;
pub mod controller;
pub mod error;
pub mod game;
pub mod sprite;
