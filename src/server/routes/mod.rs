//! Route handlers module.

pub mod health;
pub mod rooms;
pub mod tally;
pub mod votes;
