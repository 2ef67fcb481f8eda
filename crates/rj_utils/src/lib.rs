//! Small shared utilities for the `refjson` workspace.
//!
//! At present this is the hash container layer: every map and set in the
//! workspace is a [`hashbrown`] container with a fixed-seed [`foldhash`]
//! state, so iteration order and hashing never depend on process-wide
//! random state.

// -----------------------------------------------------------------------------
// No STD Support

#![no_std]

// -----------------------------------------------------------------------------
// Modules

pub mod hash;
