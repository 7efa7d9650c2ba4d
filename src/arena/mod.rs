//! Arena spatial state: grid, entities, locking, and event operations

pub mod block;
pub mod cache;
pub mod cell;
pub mod grid;
pub mod locking;
pub mod map;
pub mod nest;
pub mod ops;
