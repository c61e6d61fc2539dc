//! Machine-aware shadow-memory model for the `trace816` decoder.
//!
//! Implements the decoder's `BusModel` trait with tri-state shadow storage
//! and per-machine overlay mapping: BBC-family sideways ROM and Master
//! ACCCON overlays, the Electron and Atom variants, the MEK6800D2's sparse
//! map, the Blitter's 24-bit space with boot-mode remapping, and the PET's
//! I/O windows with optional ROM preloading.

pub mod machine;
pub mod shadow;

pub use crate::{
    machine::{Machine, MachineError, MachineKind},
    shadow::{MemConfig, ShadowMem},
};
