use std::fmt;

use crate::addressing::AddressingMode::{self, *};
use Mnemonic::*;
use OpKind::*;

// -------------------------------------------------------------------------------------------------

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Mnemonic {
    /// Add with carry
    ADC,
    /// AND Accumulator
    AND,
    /// Left-shift Accumulator or memory
    ASL,
    /// Branch if carry clear
    BCC,
    /// Branch if carry set
    BCS,
    /// Branch if equal
    BEQ,
    /// Bit test
    BIT,
    /// Branch if minus
    BMI,
    /// Branch if not equal
    BNE,
    /// Branch if plus
    BPL,
    /// Branch always
    BRA,
    /// Break to interrupt
    BRK,
    /// Branch relative long
    BRL,
    /// Branch if overflow clear
    BVC,
    /// Branch if overflow set
    BVS,
    /// Clear carry flag
    CLC,
    /// Clear decimal flag
    CLD,
    /// Clear interrupt flag
    CLI,
    /// Clear overflow flag
    CLV,
    /// Compare Accumulator with memory
    CMP,
    /// Coprocessor empowerment
    COP,
    /// Compare X with memory
    CPX,
    /// Compare Y with memory
    CPY,
    /// Decrement Accumulator or memory
    DEC,
    /// Decrement X
    DEX,
    /// Decrement Y
    DEY,
    /// Exclusive-OR Accumulator
    EOR,
    /// Increment Accumulator or memory
    INC,
    /// Increment X
    INX,
    /// Increment Y
    INY,
    /// Jump long
    JML,
    /// Jump to location
    JMP,
    /// Jump subroutine long
    JSL,
    /// Jump subroutine
    JSR,
    /// Load Accumulator with memory
    LDA,
    /// Load X with memory
    LDX,
    /// Load Y with memory
    LDY,
    /// Right-shift Accumulator or memory
    LSR,
    /// Block move negative
    MVN,
    /// Block move positive
    MVP,
    /// No operation
    NOP,
    /// OR Accumulator with memory
    ORA,
    /// Push effective address
    PEA,
    /// Push effective indirect address
    PEI,
    /// Push program counter relative
    PER,
    /// Push Accumulator
    PHA,
    /// Push Data Bank Register
    PHB,
    /// Push Direct Page Register
    PHD,
    /// Push Program Bank
    PHK,
    /// Push Processor Status
    PHP,
    /// Push X
    PHX,
    /// Push Y
    PHY,
    /// Pull Accumulator
    PLA,
    /// Pull Data Bank Register
    PLB,
    /// Pull Direct Page Register
    PLD,
    /// Pull flags
    PLP,
    /// Pull X
    PLX,
    /// Pull Y
    PLY,
    /// Reset flag bits
    REP,
    /// Rotate bit left
    ROL,
    /// Rotate bit right
    ROR,
    /// Return from interrupt
    RTI,
    /// Return from subroutine long
    RTL,
    /// Return from subroutine
    RTS,
    /// Subtract with carry
    SBC,
    /// Set carry flag
    SEC,
    /// Set decimal flag
    SED,
    /// Set interrupt flag
    SEI,
    /// Set flag bits
    SEP,
    /// Store Accumulator to memory
    STA,
    /// Stop the clock
    STP,
    /// Store X to memory
    STX,
    /// Store Y to memory
    STY,
    /// Store zero to memory
    STZ,
    /// Transfer Accumulator to X
    TAX,
    /// Transfer Accumulator to Y
    TAY,
    /// Transfer Accumulator to Direct Page
    TCD,
    /// Transfer Accumulator to Stack
    TCS,
    /// Transfer Direct Page to Accumulator
    TDC,
    /// Test and reset bit
    TRB,
    /// Test and set bit
    TSB,
    /// Transfer Stack to Accumulator
    TSC,
    /// Transfer Stack to X
    TSX,
    /// Transfer X to Accumulator
    TXA,
    /// Transfer X to Stack
    TXS,
    /// Transfer X to Y
    TXY,
    /// Transfer Y to Accumulator
    TYA,
    /// Transfer Y to X
    TYX,
    /// Wait for interrupt
    WAI,
    /// (Reserved for future expansion)
    WDM,
    /// Exchange B with A (bytes in Accumulator)
    XBA,
    /// Exchange Carry with Emulation
    XCE,
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// What the instruction does with its effective address; drives operand
/// extraction and write-back verification.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OpKind {
    Read,
    Write,
    Rmw,
    Branch,
    Other,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Opcode {
    pub mnemonic: Mnemonic,
    pub mode:     AddressingMode,
    /// Bus cycles at 8-bit width, E=1, page-aligned DP, no page crossing.
    pub base_cycles: u8,
    /// 65C816-era opcode: stack and direct-page accesses do not follow the
    /// 6502 page-wrap rules.
    pub newop: bool,
    pub kind:  OpKind,
}

impl Opcode {
    pub const fn new(mnemonic: Mnemonic, mode: AddressingMode, base_cycles: u8, newop: bool, kind: OpKind) -> Self {
        Self { mnemonic, mode, base_cycles, newop, kind }
    }

    /// Extra cycles when the accumulator is 16-bit.
    pub fn m_extra(&self) -> u8 {
        match self.mnemonic {
            ADC | AND | BIT | CMP | EOR | LDA | ORA | PHA | PLA | SBC | STA | STZ => 1,
            ASL | DEC | INC | LSR | ROL | ROR | TSB | TRB => {
                if self.mode == Accumulator {
                    0
                } else {
                    2
                }
            }
            _ => 0,
        }
    }

    /// Extra cycles when the index registers are 16-bit.
    pub fn x_extra(&self) -> u8 {
        match self.mnemonic {
            CPX | CPY | LDX | LDY | PHX | PHY | PLX | PLY | STX | STY => 1,
            _ => 0,
        }
    }

    /// Does the index width (rather than the accumulator width) decide how
    /// many bytes this operation moves?
    pub fn index_sized(&self) -> bool {
        self.x_extra() != 0
    }

    #[inline]
    pub fn instruction_size(&self) -> usize {
        1 + self.mode.operands_size_8bit()
    }
}

/// Conditional-branch opcodes (pattern `xxx1_0000`) plus BRA, the set the
/// taken/not-taken cycle rules apply to. BRL is not included: it is always
/// 4 cycles.
pub fn has_branch_timing(opcode: u8) -> bool {
    opcode & 0x1F == 0x10 || opcode == 0x80
}

// -------------------------------------------------------------------------------------------------

/// Ordered by hex value of the opcode.
pub static OPCODES: [Opcode; 0x100] = [
    /* 00 */ Opcode::new(BRK, Constant8, 7, false, Other),
    /* 01 */ Opcode::new(ORA, DirectPageXIndexIndirect, 6, false, Read),
    /* 02 */ Opcode::new(COP, Constant8, 7, true, Other),
    /* 03 */ Opcode::new(ORA, DirectPageSIndex, 4, true, Read),
    /* 04 */ Opcode::new(TSB, DirectPage, 5, true, Rmw),
    /* 05 */ Opcode::new(ORA, DirectPage, 3, false, Read),
    /* 06 */ Opcode::new(ASL, DirectPage, 5, false, Rmw),
    /* 07 */ Opcode::new(ORA, DirectPageLongIndirect, 6, true, Read),
    /* 08 */ Opcode::new(PHP, Implied, 3, false, Other),
    /* 09 */ Opcode::new(ORA, ImmediateMFlagDependent, 2, false, Read),
    /* 0A */ Opcode::new(ASL, Accumulator, 2, false, Other),
    /* 0B */ Opcode::new(PHD, Implied, 4, true, Other),
    /* 0C */ Opcode::new(TSB, Address, 6, true, Rmw),
    /* 0D */ Opcode::new(ORA, Address, 4, false, Read),
    /* 0E */ Opcode::new(ASL, Address, 6, false, Rmw),
    /* 0F */ Opcode::new(ORA, Long, 5, true, Read),
    /* 10 */ Opcode::new(BPL, Relative8, 2, false, Branch),
    /* 11 */ Opcode::new(ORA, DirectPageIndirectYIndex, 5, false, Read),
    /* 12 */ Opcode::new(ORA, DirectPageIndirect, 5, true, Read),
    /* 13 */ Opcode::new(ORA, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* 14 */ Opcode::new(TRB, DirectPage, 5, true, Rmw),
    /* 15 */ Opcode::new(ORA, DirectPageXIndex, 4, false, Read),
    /* 16 */ Opcode::new(ASL, DirectPageXIndex, 6, false, Rmw),
    /* 17 */ Opcode::new(ORA, DirectPageLongIndirectYIndex, 6, true, Read),
    /* 18 */ Opcode::new(CLC, Implied, 2, false, Other),
    /* 19 */ Opcode::new(ORA, AddressYIndex, 4, false, Read),
    /* 1A */ Opcode::new(INC, Accumulator, 2, true, Other),
    /* 1B */ Opcode::new(TCS, Implied, 2, true, Other),
    /* 1C */ Opcode::new(TRB, Address, 6, true, Rmw),
    /* 1D */ Opcode::new(ORA, AddressXIndex, 4, false, Read),
    /* 1E */ Opcode::new(ASL, AddressXIndex, 7, false, Rmw),
    /* 1F */ Opcode::new(ORA, LongXIndex, 5, true, Read),
    /* 20 */ Opcode::new(JSR, Address, 6, false, Other),
    /* 21 */ Opcode::new(AND, DirectPageXIndexIndirect, 6, false, Read),
    /* 22 */ Opcode::new(JSL, Long, 8, true, Other),
    /* 23 */ Opcode::new(AND, DirectPageSIndex, 4, true, Read),
    /* 24 */ Opcode::new(BIT, DirectPage, 3, false, Read),
    /* 25 */ Opcode::new(AND, DirectPage, 3, false, Read),
    /* 26 */ Opcode::new(ROL, DirectPage, 5, false, Rmw),
    /* 27 */ Opcode::new(AND, DirectPageLongIndirect, 6, true, Read),
    /* 28 */ Opcode::new(PLP, Implied, 4, false, Other),
    /* 29 */ Opcode::new(AND, ImmediateMFlagDependent, 2, false, Read),
    /* 2A */ Opcode::new(ROL, Accumulator, 2, false, Other),
    /* 2B */ Opcode::new(PLD, Implied, 5, true, Other),
    /* 2C */ Opcode::new(BIT, Address, 4, false, Read),
    /* 2D */ Opcode::new(AND, Address, 4, false, Read),
    /* 2E */ Opcode::new(ROL, Address, 6, false, Rmw),
    /* 2F */ Opcode::new(AND, Long, 5, true, Read),
    /* 30 */ Opcode::new(BMI, Relative8, 2, false, Branch),
    /* 31 */ Opcode::new(AND, DirectPageIndirectYIndex, 5, false, Read),
    /* 32 */ Opcode::new(AND, DirectPageIndirect, 5, true, Read),
    /* 33 */ Opcode::new(AND, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* 34 */ Opcode::new(BIT, DirectPageXIndex, 4, true, Read),
    /* 35 */ Opcode::new(AND, DirectPageXIndex, 4, false, Read),
    /* 36 */ Opcode::new(ROL, DirectPageXIndex, 6, false, Rmw),
    /* 37 */ Opcode::new(AND, DirectPageLongIndirectYIndex, 6, true, Read),
    /* 38 */ Opcode::new(SEC, Implied, 2, false, Other),
    /* 39 */ Opcode::new(AND, AddressYIndex, 4, false, Read),
    /* 3A */ Opcode::new(DEC, Accumulator, 2, true, Other),
    /* 3B */ Opcode::new(TSC, Implied, 2, true, Other),
    /* 3C */ Opcode::new(BIT, AddressXIndex, 4, true, Read),
    /* 3D */ Opcode::new(AND, AddressXIndex, 4, false, Read),
    /* 3E */ Opcode::new(ROL, AddressXIndex, 7, false, Rmw),
    /* 3F */ Opcode::new(AND, LongXIndex, 5, true, Read),
    /* 40 */ Opcode::new(RTI, Implied, 6, false, Other),
    /* 41 */ Opcode::new(EOR, DirectPageXIndexIndirect, 6, false, Read),
    /* 42 */ Opcode::new(WDM, Constant8, 2, true, Other),
    /* 43 */ Opcode::new(EOR, DirectPageSIndex, 4, true, Read),
    /* 44 */ Opcode::new(MVP, BlockMove, 7, true, Other),
    /* 45 */ Opcode::new(EOR, DirectPage, 3, false, Read),
    /* 46 */ Opcode::new(LSR, DirectPage, 5, false, Rmw),
    /* 47 */ Opcode::new(EOR, DirectPageLongIndirect, 6, true, Read),
    /* 48 */ Opcode::new(PHA, Implied, 3, false, Other),
    /* 49 */ Opcode::new(EOR, ImmediateMFlagDependent, 2, false, Read),
    /* 4A */ Opcode::new(LSR, Accumulator, 2, false, Other),
    /* 4B */ Opcode::new(PHK, Implied, 3, true, Other),
    /* 4C */ Opcode::new(JMP, Address, 3, false, Other),
    /* 4D */ Opcode::new(EOR, Address, 4, false, Read),
    /* 4E */ Opcode::new(LSR, Address, 6, false, Rmw),
    /* 4F */ Opcode::new(EOR, Long, 5, true, Read),
    /* 50 */ Opcode::new(BVC, Relative8, 2, false, Branch),
    /* 51 */ Opcode::new(EOR, DirectPageIndirectYIndex, 5, false, Read),
    /* 52 */ Opcode::new(EOR, DirectPageIndirect, 5, true, Read),
    /* 53 */ Opcode::new(EOR, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* 54 */ Opcode::new(MVN, BlockMove, 7, true, Other),
    /* 55 */ Opcode::new(EOR, DirectPageXIndex, 4, false, Read),
    /* 56 */ Opcode::new(LSR, DirectPageXIndex, 6, false, Rmw),
    /* 57 */ Opcode::new(EOR, DirectPageLongIndirectYIndex, 6, true, Read),
    /* 58 */ Opcode::new(CLI, Implied, 2, false, Other),
    /* 59 */ Opcode::new(EOR, AddressYIndex, 4, false, Read),
    /* 5A */ Opcode::new(PHY, Implied, 3, true, Other),
    /* 5B */ Opcode::new(TCD, Implied, 2, true, Other),
    /* 5C */ Opcode::new(JML, Long, 4, true, Other),
    /* 5D */ Opcode::new(EOR, AddressXIndex, 4, false, Read),
    /* 5E */ Opcode::new(LSR, AddressXIndex, 7, false, Rmw),
    /* 5F */ Opcode::new(EOR, LongXIndex, 5, true, Read),
    /* 60 */ Opcode::new(RTS, Implied, 6, false, Other),
    /* 61 */ Opcode::new(ADC, DirectPageXIndexIndirect, 6, false, Read),
    /* 62 */ Opcode::new(PER, Relative16, 6, true, Other),
    /* 63 */ Opcode::new(ADC, DirectPageSIndex, 4, true, Read),
    /* 64 */ Opcode::new(STZ, DirectPage, 3, true, Write),
    /* 65 */ Opcode::new(ADC, DirectPage, 3, false, Read),
    /* 66 */ Opcode::new(ROR, DirectPage, 5, false, Rmw),
    /* 67 */ Opcode::new(ADC, DirectPageLongIndirect, 6, true, Read),
    /* 68 */ Opcode::new(PLA, Implied, 4, false, Other),
    /* 69 */ Opcode::new(ADC, ImmediateMFlagDependent, 2, false, Read),
    /* 6A */ Opcode::new(ROR, Accumulator, 2, false, Other),
    /* 6B */ Opcode::new(RTL, Implied, 6, true, Other),
    /* 6C */ Opcode::new(JMP, AddressIndirect, 5, false, Other),
    /* 6D */ Opcode::new(ADC, Address, 4, false, Read),
    /* 6E */ Opcode::new(ROR, Address, 6, false, Rmw),
    /* 6F */ Opcode::new(ADC, Long, 5, true, Read),
    /* 70 */ Opcode::new(BVS, Relative8, 2, false, Branch),
    /* 71 */ Opcode::new(ADC, DirectPageIndirectYIndex, 5, false, Read),
    /* 72 */ Opcode::new(ADC, DirectPageIndirect, 5, true, Read),
    /* 73 */ Opcode::new(ADC, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* 74 */ Opcode::new(STZ, DirectPageXIndex, 4, true, Write),
    /* 75 */ Opcode::new(ADC, DirectPageXIndex, 4, false, Read),
    /* 76 */ Opcode::new(ROR, DirectPageXIndex, 6, false, Rmw),
    /* 77 */ Opcode::new(ADC, DirectPageLongIndirectYIndex, 6, true, Read),
    /* 78 */ Opcode::new(SEI, Implied, 2, false, Other),
    /* 79 */ Opcode::new(ADC, AddressYIndex, 4, false, Read),
    /* 7A */ Opcode::new(PLY, Implied, 4, true, Other),
    /* 7B */ Opcode::new(TDC, Implied, 2, true, Other),
    /* 7C */ Opcode::new(JMP, AddressXIndexIndirect, 6, true, Other),
    /* 7D */ Opcode::new(ADC, AddressXIndex, 4, false, Read),
    /* 7E */ Opcode::new(ROR, AddressXIndex, 7, false, Rmw),
    /* 7F */ Opcode::new(ADC, LongXIndex, 5, true, Read),
    /* 80 */ Opcode::new(BRA, Relative8, 2, true, Branch),
    /* 81 */ Opcode::new(STA, DirectPageXIndexIndirect, 6, false, Write),
    /* 82 */ Opcode::new(BRL, Relative16, 4, true, Branch),
    /* 83 */ Opcode::new(STA, DirectPageSIndex, 4, true, Write),
    /* 84 */ Opcode::new(STY, DirectPage, 3, false, Write),
    /* 85 */ Opcode::new(STA, DirectPage, 3, false, Write),
    /* 86 */ Opcode::new(STX, DirectPage, 3, false, Write),
    /* 87 */ Opcode::new(STA, DirectPageLongIndirect, 6, true, Write),
    /* 88 */ Opcode::new(DEY, Implied, 2, false, Other),
    /* 89 */ Opcode::new(BIT, ImmediateMFlagDependent, 2, true, Read),
    /* 8A */ Opcode::new(TXA, Implied, 2, false, Other),
    /* 8B */ Opcode::new(PHB, Implied, 3, true, Other),
    /* 8C */ Opcode::new(STY, Address, 4, false, Write),
    /* 8D */ Opcode::new(STA, Address, 4, false, Write),
    /* 8E */ Opcode::new(STX, Address, 4, false, Write),
    /* 8F */ Opcode::new(STA, Long, 5, true, Write),
    /* 90 */ Opcode::new(BCC, Relative8, 2, false, Branch),
    /* 91 */ Opcode::new(STA, DirectPageIndirectYIndex, 6, false, Write),
    /* 92 */ Opcode::new(STA, DirectPageIndirect, 5, true, Write),
    /* 93 */ Opcode::new(STA, DirectPageSIndexIndirectYIndex, 7, true, Write),
    /* 94 */ Opcode::new(STY, DirectPageXIndex, 4, false, Write),
    /* 95 */ Opcode::new(STA, DirectPageXIndex, 4, false, Write),
    /* 96 */ Opcode::new(STX, DirectPageYIndex, 4, false, Write),
    /* 97 */ Opcode::new(STA, DirectPageLongIndirectYIndex, 6, true, Write),
    /* 98 */ Opcode::new(TYA, Implied, 2, false, Other),
    /* 99 */ Opcode::new(STA, AddressYIndex, 5, false, Write),
    /* 9A */ Opcode::new(TXS, Implied, 2, false, Other),
    /* 9B */ Opcode::new(TXY, Implied, 2, true, Other),
    /* 9C */ Opcode::new(STZ, Address, 4, true, Write),
    /* 9D */ Opcode::new(STA, AddressXIndex, 5, false, Write),
    /* 9E */ Opcode::new(STZ, AddressXIndex, 5, true, Write),
    /* 9F */ Opcode::new(STA, LongXIndex, 5, true, Write),
    /* A0 */ Opcode::new(LDY, ImmediateXFlagDependent, 2, false, Read),
    /* A1 */ Opcode::new(LDA, DirectPageXIndexIndirect, 6, false, Read),
    /* A2 */ Opcode::new(LDX, ImmediateXFlagDependent, 2, false, Read),
    /* A3 */ Opcode::new(LDA, DirectPageSIndex, 4, true, Read),
    /* A4 */ Opcode::new(LDY, DirectPage, 3, false, Read),
    /* A5 */ Opcode::new(LDA, DirectPage, 3, false, Read),
    /* A6 */ Opcode::new(LDX, DirectPage, 3, false, Read),
    /* A7 */ Opcode::new(LDA, DirectPageLongIndirect, 6, true, Read),
    /* A8 */ Opcode::new(TAY, Implied, 2, false, Other),
    /* A9 */ Opcode::new(LDA, ImmediateMFlagDependent, 2, false, Read),
    /* AA */ Opcode::new(TAX, Implied, 2, false, Other),
    /* AB */ Opcode::new(PLB, Implied, 4, true, Other),
    /* AC */ Opcode::new(LDY, Address, 4, false, Read),
    /* AD */ Opcode::new(LDA, Address, 4, false, Read),
    /* AE */ Opcode::new(LDX, Address, 4, false, Read),
    /* AF */ Opcode::new(LDA, Long, 5, true, Read),
    /* B0 */ Opcode::new(BCS, Relative8, 2, false, Branch),
    /* B1 */ Opcode::new(LDA, DirectPageIndirectYIndex, 5, false, Read),
    /* B2 */ Opcode::new(LDA, DirectPageIndirect, 5, true, Read),
    /* B3 */ Opcode::new(LDA, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* B4 */ Opcode::new(LDY, DirectPageXIndex, 4, false, Read),
    /* B5 */ Opcode::new(LDA, DirectPageXIndex, 4, false, Read),
    /* B6 */ Opcode::new(LDX, DirectPageYIndex, 4, false, Read),
    /* B7 */ Opcode::new(LDA, DirectPageLongIndirectYIndex, 6, true, Read),
    /* B8 */ Opcode::new(CLV, Implied, 2, false, Other),
    /* B9 */ Opcode::new(LDA, AddressYIndex, 4, false, Read),
    /* BA */ Opcode::new(TSX, Implied, 2, false, Other),
    /* BB */ Opcode::new(TYX, Implied, 2, true, Other),
    /* BC */ Opcode::new(LDY, AddressXIndex, 4, false, Read),
    /* BD */ Opcode::new(LDA, AddressXIndex, 4, false, Read),
    /* BE */ Opcode::new(LDX, AddressYIndex, 4, false, Read),
    /* BF */ Opcode::new(LDA, LongXIndex, 5, true, Read),
    /* C0 */ Opcode::new(CPY, ImmediateXFlagDependent, 2, false, Read),
    /* C1 */ Opcode::new(CMP, DirectPageXIndexIndirect, 6, false, Read),
    /* C2 */ Opcode::new(REP, Constant8, 3, true, Other),
    /* C3 */ Opcode::new(CMP, DirectPageSIndex, 4, true, Read),
    /* C4 */ Opcode::new(CPY, DirectPage, 3, false, Read),
    /* C5 */ Opcode::new(CMP, DirectPage, 3, false, Read),
    /* C6 */ Opcode::new(DEC, DirectPage, 5, false, Rmw),
    /* C7 */ Opcode::new(CMP, DirectPageLongIndirect, 6, true, Read),
    /* C8 */ Opcode::new(INY, Implied, 2, false, Other),
    /* C9 */ Opcode::new(CMP, ImmediateMFlagDependent, 2, false, Read),
    /* CA */ Opcode::new(DEX, Implied, 2, false, Other),
    /* CB */ Opcode::new(WAI, Implied, 3, true, Other),
    /* CC */ Opcode::new(CPY, Address, 4, false, Read),
    /* CD */ Opcode::new(CMP, Address, 4, false, Read),
    /* CE */ Opcode::new(DEC, Address, 6, false, Rmw),
    /* CF */ Opcode::new(CMP, Long, 5, true, Read),
    /* D0 */ Opcode::new(BNE, Relative8, 2, false, Branch),
    /* D1 */ Opcode::new(CMP, DirectPageIndirectYIndex, 5, false, Read),
    /* D2 */ Opcode::new(CMP, DirectPageIndirect, 5, true, Read),
    /* D3 */ Opcode::new(CMP, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* D4 */ Opcode::new(PEI, DirectPageIndirect, 6, true, Other),
    /* D5 */ Opcode::new(CMP, DirectPageXIndex, 4, false, Read),
    /* D6 */ Opcode::new(DEC, DirectPageXIndex, 6, false, Rmw),
    /* D7 */ Opcode::new(CMP, DirectPageLongIndirectYIndex, 6, true, Read),
    /* D8 */ Opcode::new(CLD, Implied, 2, false, Other),
    /* D9 */ Opcode::new(CMP, AddressYIndex, 4, false, Read),
    /* DA */ Opcode::new(PHX, Implied, 3, true, Other),
    /* DB */ Opcode::new(STP, Implied, 3, true, Other),
    /* DC */ Opcode::new(JML, AddressLongIndirect, 6, true, Other),
    /* DD */ Opcode::new(CMP, AddressXIndex, 4, false, Read),
    /* DE */ Opcode::new(DEC, AddressXIndex, 7, false, Rmw),
    /* DF */ Opcode::new(CMP, LongXIndex, 5, true, Read),
    /* E0 */ Opcode::new(CPX, ImmediateXFlagDependent, 2, false, Read),
    /* E1 */ Opcode::new(SBC, DirectPageXIndexIndirect, 6, false, Read),
    /* E2 */ Opcode::new(SEP, Constant8, 3, true, Other),
    /* E3 */ Opcode::new(SBC, DirectPageSIndex, 4, true, Read),
    /* E4 */ Opcode::new(CPX, DirectPage, 3, false, Read),
    /* E5 */ Opcode::new(SBC, DirectPage, 3, false, Read),
    /* E6 */ Opcode::new(INC, DirectPage, 5, false, Rmw),
    /* E7 */ Opcode::new(SBC, DirectPageLongIndirect, 6, true, Read),
    /* E8 */ Opcode::new(INX, Implied, 2, false, Other),
    /* E9 */ Opcode::new(SBC, ImmediateMFlagDependent, 2, false, Read),
    /* EA */ Opcode::new(NOP, Implied, 2, false, Other),
    /* EB */ Opcode::new(XBA, Implied, 3, true, Other),
    /* EC */ Opcode::new(CPX, Address, 4, false, Read),
    /* ED */ Opcode::new(SBC, Address, 4, false, Read),
    /* EE */ Opcode::new(INC, Address, 6, false, Rmw),
    /* EF */ Opcode::new(SBC, Long, 5, true, Read),
    /* F0 */ Opcode::new(BEQ, Relative8, 2, false, Branch),
    /* F1 */ Opcode::new(SBC, DirectPageIndirectYIndex, 5, false, Read),
    /* F2 */ Opcode::new(SBC, DirectPageIndirect, 5, true, Read),
    /* F3 */ Opcode::new(SBC, DirectPageSIndexIndirectYIndex, 7, true, Read),
    /* F4 */ Opcode::new(PEA, Address, 5, true, Other),
    /* F5 */ Opcode::new(SBC, DirectPageXIndex, 4, false, Read),
    /* F6 */ Opcode::new(INC, DirectPageXIndex, 6, false, Rmw),
    /* F7 */ Opcode::new(SBC, DirectPageLongIndirectYIndex, 6, true, Read),
    /* F8 */ Opcode::new(SED, Implied, 2, false, Other),
    /* F9 */ Opcode::new(SBC, AddressYIndex, 4, false, Read),
    /* FA */ Opcode::new(PLX, Implied, 4, true, Other),
    /* FB */ Opcode::new(XCE, Implied, 2, true, Other),
    /* FC */ Opcode::new(JSR, AddressXIndexIndirect, 8, true, Other),
    /* FD */ Opcode::new(SBC, AddressXIndex, 4, false, Read),
    /* FE */ Opcode::new(INC, AddressXIndex, 7, false, Rmw),
    /* FF */ Opcode::new(SBC, LongXIndex, 5, true, Read),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn width_extra_cycle_sets() {
        // LDA: +1 at 16-bit accumulator width.
        assert_eq!(OPCODES[0xA9].m_extra(), 1);
        // Memory shifts: +2, but not the accumulator variant.
        assert_eq!(OPCODES[0x0E].m_extra(), 2);
        assert_eq!(OPCODES[0x0A].m_extra(), 0);
        // LDX: +1 at 16-bit index width.
        assert_eq!(OPCODES[0xA2].x_extra(), 1);
        // Transfers never pay a width penalty.
        assert_eq!(OPCODES[0xAA].m_extra(), 0);
        assert_eq!(OPCODES[0xAA].x_extra(), 0);
    }

    #[test]
    fn branch_timing_set_is_conditionals_plus_bra() {
        let expected: Vec<u8> = (0u16..256)
            .map(|op| op as u8)
            .filter(|&op| has_branch_timing(op))
            .collect();
        assert_eq!(expected, vec![0x10, 0x30, 0x50, 0x70, 0x80, 0x90, 0xB0, 0xD0, 0xF0]);
        assert!(!has_branch_timing(0x82)); // BRL has fixed timing
    }

    #[test]
    fn rmw_entries_are_memory_modes_only() {
        for (i, op) in OPCODES.iter().enumerate() {
            if op.kind == OpKind::Rmw {
                assert_ne!(op.mode, Accumulator, "opcode {i:02X}");
                assert_ne!(op.mode, Implied, "opcode {i:02X}");
            }
        }
    }

    #[test]
    fn every_branch_is_relative() {
        for op in OPCODES.iter() {
            if op.kind == OpKind::Branch {
                assert!(matches!(op.mode, Relative8 | Relative16));
            }
        }
    }
}
