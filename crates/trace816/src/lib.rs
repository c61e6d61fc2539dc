//! Bus-trace decoder for the WDC 65C816.
//!
//! Reconstructs the executing instruction stream from logic-analyzer samples
//! of the CPU's external bus, tracks every programmer-visible register and
//! flag symbolically (unknown state is a value, not an error), and checks
//! each observation against the model. The memory side of the model lives
//! behind the [`BusModel`] trait so machine-specific overlays can be plugged
//! in (see the `trace816-mem` crate).

pub mod addressing;
pub mod analyzer;
pub mod config;
pub mod cycles;
pub mod instruction;
pub mod interrupt;
pub mod opcodes;
mod ops;
pub mod registers;
pub mod sample;

pub use crate::{
    analyzer::Analyzer,
    config::{ConfigError, InitialState},
    cycles::CycleCount,
    instruction::Instruction,
    registers::Registers,
    sample::{Sample, SampleType},
};

/// What a memory access was for; the memory model gates modelling and
/// logging on this.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AccessKind {
    /// Opcode fetch.
    Fetch,
    /// Operand-byte fetch.
    Instr,
    /// Indirect-pointer read.
    Pointer,
    /// Data read or write at the effective address.
    Data,
    /// Stack push or pull.
    Stack,
}

impl AccessKind {
    #[inline]
    pub fn bit(self) -> u8 {
        1 << self as u8
    }
}

/// A set of [`AccessKind`]s, used for the modelling and logging knobs.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct KindMask(pub u8);

impl KindMask {
    pub const NONE: KindMask = KindMask(0);
    pub const ALL: KindMask = KindMask(0x1F);

    #[inline]
    pub fn contains(self, kind: AccessKind) -> bool {
        self.0 & kind.bit() != 0
    }

    #[must_use]
    pub fn with(self, kind: AccessKind) -> Self {
        KindMask(self.0 | kind.bit())
    }

    #[must_use]
    pub fn without(self, kind: AccessKind) -> Self {
        KindMask(self.0 & !kind.bit())
    }
}

/// Trait for the memory model attached to the decoder.
///
/// The decoder never originates data; it reports the bytes it saw on the bus
/// together with the effective address it derived for them, and the model
/// checks them against its shadow state.
pub trait BusModel {
    /// A byte was read at `ea`.
    fn read(&mut self, data: u8, ea: u32, kind: AccessKind);
    /// A byte was written at `ea`.
    fn write(&mut self, data: u8, ea: u32, kind: AccessKind);
    /// Current shadow contents at `ea`, if known.
    fn peek(&self, ea: u32) -> Option<u8>;
    /// Returns and clears the model's inconsistency flag.
    fn take_failure(&mut self) -> bool;
}

/// A bus model that models nothing; decoder-only operation.
#[derive(Default)]
pub struct NullBus;

impl BusModel for NullBus {
    fn read(&mut self, _data: u8, _ea: u32, _kind: AccessKind) {}
    fn write(&mut self, _data: u8, _ea: u32, _kind: AccessKind) {}
    fn peek(&self, _ea: u32) -> Option<u8> {
        None
    }
    fn take_failure(&mut self) -> bool {
        false
    }
}
