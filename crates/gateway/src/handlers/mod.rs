//! API handlers module

pub mod curriculum;
pub mod geocode;
pub mod health;
pub mod stories;
