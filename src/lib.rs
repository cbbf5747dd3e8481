//! soundscape — crossfading ambient player.
//!
//! A fixed catalog of looping clips; a scheduler keeps a couple of them
//! audible and periodically swaps the oldest for a random new one with
//! overlapping fades. The CLI drives this crate.

pub mod catalog;
pub mod config;
pub mod error;
pub mod fade;
pub mod player;
pub mod runtime;
pub mod scheduler;
pub mod simulate;
pub mod sound;
pub mod timer;
pub mod track;

pub use error::{Error, Result};
