//! Falling-block puzzle engine.
//!
//! [`game`] holds the whole game-state core: the shape catalog, pieces and
//! their rotation, the occupancy grid, and the gravity state machine. The
//! terminal front end in `main.rs` only reads snapshots and sends commands.

pub mod game;
