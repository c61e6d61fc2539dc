//! Per-opcode semantic hooks.
//!
//! Each hook updates the symbolic register file from the operand the
//! executor extracted, and returns the byte(s) the instruction should have
//! written back (for Write/Rmw verification). Anything that depends on an
//! unknown input degrades to unknown instead of guessing.

use crate::{
    analyzer::{Analyzer, ExecCtx, Index},
    opcodes::Mnemonic,
    sample::Sample,
    AccessKind, BusModel,
};

/// Expected write-back bytes (low, high).
pub(crate) type Expected = (Option<u8>, Option<u8>);

fn tail(samples: &[Sample], back: usize) -> Option<u8> {
    samples.len().checked_sub(back).and_then(|i| samples.get(i)).map(|s| s.data)
}

impl ExecCtx<'_> {
    fn word(&self) -> Option<u16> {
        Some(u16::from_le_bytes([self.lo?, self.hi?]))
    }
}

// -------------------------------------------------------------------------------------------------
// Byte algebra with absorbing elements: `x & 0` and `x | $FF` are known even
// when `x` is not.

fn and_byte(a: Option<u8>, b: Option<u8>) -> Option<u8> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a & b),
        (Some(0), _) | (_, Some(0)) => Some(0),
        _ => None,
    }
}

fn or_byte(a: Option<u8>, b: Option<u8>) -> Option<u8> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a | b),
        (Some(0xFF), _) | (_, Some(0xFF)) => Some(0xFF),
        _ => None,
    }
}

fn eor_byte(a: Option<u8>, b: Option<u8>) -> Option<u8> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a ^ b),
        _ => None,
    }
}

// -------------------------------------------------------------------------------------------------
// ADC/SBC cores, decimal mode nibble by nibble (65C02 semantics).

fn adc8(a: u8, m: u8, c: bool, d: bool) -> (u8, bool, bool) {
    let c = c as u16;
    let (a16, m16) = (a as u16, m as u16);
    let mut res = if d {
        let mut low = (a16 & 0x0F) + (m16 & 0x0F) + c;
        if low > 9 {
            low += 6;
        }
        (a16 & 0xF0) + (m16 & 0xF0) + (low & 0x0F) + if low > 0x0F { 0x10 } else { 0 }
    } else {
        a16 + m16 + c
    };
    let overflow = (a ^ m) & 0x80 == 0 && (a ^ res as u8) & 0x80 == 0x80;
    if d && res > 0x9F {
        res += 0x60;
    }
    (res as u8, res > 0xFF, overflow)
}

fn adc16(a: u16, m: u16, c: bool, d: bool) -> (u16, bool, bool) {
    let c = c as u32;
    let (a32, m32) = (a as u32, m as u32);
    let mut res = if d {
        let mut r0 = (a32 & 0x000F) + (m32 & 0x000F) + c;
        if r0 > 0x0009 {
            r0 += 0x0006;
        }
        let mut r1 = (a32 & 0x00F0) + (m32 & 0x00F0) + (r0 & 0x000F) + if r0 > 0x000F { 0x0010 } else { 0 };
        if r1 > 0x009F {
            r1 += 0x0060;
        }
        let mut r2 = (a32 & 0x0F00) + (m32 & 0x0F00) + (r1 & 0x00FF) + if r1 > 0x00FF { 0x0100 } else { 0 };
        if r2 > 0x09FF {
            r2 += 0x0600;
        }
        (a32 & 0xF000) + (m32 & 0xF000) + (r2 & 0x0FFF) + if r2 > 0x0FFF { 0x1000 } else { 0 }
    } else {
        a32 + m32 + c
    };
    let overflow = (a ^ m) & 0x8000 == 0 && (a ^ res as u16) & 0x8000 == 0x8000;
    if d && res > 0x9FFF {
        res += 0x6000;
    }
    (res as u16, res > 0xFFFF, overflow)
}

fn sbc8(a: u8, m: u8, c: bool, d: bool) -> (u8, bool, bool) {
    let c = c as i16;
    let a16 = a as i16;
    let v = m as i16 ^ 0xFF;
    let mut res = if d {
        let mut low = (a16 & 0x0F) + (v & 0x0F) + c;
        if low < 0x10 {
            low -= 6;
        }
        (a16 & 0xF0) + (v & 0xF0) + (low & 0x0F) + if low > 0x0F { 0x10 } else { 0 }
    } else {
        a16 + v + c
    };
    let overflow = (a16 & 0x80) == (v & 0x80) && (a16 & 0x80) != (res & 0x80);
    if d && res < 0x100 {
        res -= 0x60;
    }
    (res as u8, res > 0xFF, overflow)
}

fn sbc16(a: u16, m: u16, c: bool, d: bool) -> (u16, bool, bool) {
    let c = c as i32;
    let a32 = a as i32;
    let v = m as i32 ^ 0xFFFF;
    let mut res = if d {
        let mut r0 = (a32 & 0x000F) + (v & 0x000F) + c;
        if r0 < 0x0010 {
            r0 -= 0x0006;
        }
        let mut r1 = (a32 & 0x00F0) + (v & 0x00F0) + (r0 & 0x000F) + if r0 > 0x000F { 0x0010 } else { 0 };
        if r1 < 0x0100 {
            r1 -= 0x0060;
        }
        let mut r2 = (a32 & 0x0F00) + (v & 0x0F00) + (r1 & 0x00FF) + if r1 > 0x00FF { 0x0100 } else { 0 };
        if r2 < 0x1000 {
            r2 -= 0x0600;
        }
        (a32 & 0xF000) + (v & 0xF000) + (r2 & 0x0FFF) + if r2 > 0x0FFF { 0x1000 } else { 0 }
    } else {
        a32 + v + c
    };
    let overflow = (a32 ^ res) & 0x8000 != 0 && (a32 ^ v) & 0x8000 == 0;
    if d && res < 0x10000 {
        res -= 0x6000;
    }
    (res as u16, res > 0xFFFF, overflow)
}

/// One shift/rotate step at the given width; returns (result, carry out).
fn shift_value(mnemonic: Mnemonic, val: u16, c: bool, w8: bool) -> (u16, bool) {
    let (mask, top) = if w8 { (0x00FF, 0x0080) } else { (0xFFFF, 0x8000) };
    match mnemonic {
        Mnemonic::ASL => ((val << 1) & mask, val & top != 0),
        Mnemonic::ROL => (((val << 1) | c as u16) & mask, val & top != 0),
        Mnemonic::LSR => (val >> 1, val & 1 != 0),
        Mnemonic::ROR => ((val >> 1) | if c { top } else { 0 }, val & 1 != 0),
        _ => unreachable!(),
    }
}

// -------------------------------------------------------------------------------------------------

impl<M: BusModel> Analyzer<M> {
    pub(crate) fn execute_op(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        use Mnemonic::*;
        match ctx.entry.mnemonic {
            ADC => self.op_adc(ctx),
            SBC => self.op_sbc(ctx),
            AND => self.op_bitwise(ctx, and_byte),
            ORA => self.op_bitwise(ctx, or_byte),
            EOR => self.op_bitwise(ctx, eor_byte),
            LDA => self.op_lda(ctx),
            LDX => self.op_ld_index(ctx, Index::X),
            LDY => self.op_ld_index(ctx, Index::Y),
            STA => self.op_sta(ctx),
            STX => self.op_st_index(ctx, Index::X),
            STY => self.op_st_index(ctx, Index::Y),
            STZ => (Some(0), Some(0)),
            CMP => self.op_cmp(ctx),
            CPX => self.op_cp_index(ctx, Index::X),
            CPY => self.op_cp_index(ctx, Index::Y),
            BIT => self.op_bit(ctx),
            ASL | ROL | LSR | ROR => self.op_shift(ctx),
            INC | DEC => self.op_inc_dec(ctx),
            TSB | TRB => self.op_tsb_trb(ctx),
            INX => self.op_step_index(Index::X, 1),
            INY => self.op_step_index(Index::Y, 1),
            DEX => self.op_step_index(Index::X, -1),
            DEY => self.op_step_index(Index::Y, -1),
            TAX => self.op_transfer_to_index(Index::X),
            TAY => self.op_transfer_to_index(Index::Y),
            TXA => self.op_transfer_to_acc(Index::X),
            TYA => self.op_transfer_to_acc(Index::Y),
            TXY => self.op_transfer_index(Index::X),
            TYX => self.op_transfer_index(Index::Y),
            TSX => self.op_tsx(),
            TXS => self.op_txs(),
            TCS => self.op_tcs(),
            TSC => self.op_tsc(),
            TCD => self.op_tcd(),
            TDC => self.op_tdc(),
            XBA => self.op_xba(),
            XCE => self.op_xce(),
            REP => {
                self.regs.apply_rep(ctx.instr.op1());
                (None, None)
            }
            SEP => {
                self.regs.apply_sep(ctx.instr.op1());
                (None, None)
            }
            CLC => self.set_flag_op(|r| r.c = Some(false)),
            SEC => self.set_flag_op(|r| r.c = Some(true)),
            CLI => self.set_flag_op(|r| r.i = Some(false)),
            SEI => self.set_flag_op(|r| r.i = Some(true)),
            CLD => self.set_flag_op(|r| r.d = Some(false)),
            SED => self.set_flag_op(|r| r.d = Some(true)),
            CLV => self.set_flag_op(|r| r.v = Some(false)),
            PHA => self.op_pha(ctx),
            PHX => self.op_ph_index(ctx, Index::X),
            PHY => self.op_ph_index(ctx, Index::Y),
            PHP => self.op_php(ctx),
            PHB => self.op_phb(ctx),
            PHK => self.op_phk(ctx),
            PHD => self.op_phd(ctx),
            PLA => self.op_pla(ctx),
            PLX => self.op_pl_index(ctx, Index::X),
            PLY => self.op_pl_index(ctx, Index::Y),
            PLP => self.op_plp(ctx),
            PLB => self.op_plb(ctx),
            PLD => self.op_pld(ctx),
            PEA => self.op_pea(ctx),
            PEI => self.op_pei(ctx),
            PER => self.op_per(ctx),
            JSR => self.op_jsr(ctx),
            JSL => self.op_jsl(ctx),
            RTS => self.op_rts(ctx),
            RTL => self.op_rtl(ctx),
            RTI => self.op_rti(ctx),
            BRK | COP => {
                self.interrupt_sequence(ctx.samples, 2, ctx.entry.newop);
                (None, None)
            }
            MVN => self.op_block_move(ctx, 1),
            MVP => self.op_block_move(ctx, -1),
            BCC | BCS | BEQ | BMI | BNE | BPL | BVC | BVS | BRA | BRL => self.op_branch(ctx),
            JMP | JML | NOP | WDM | WAI | STP => (None, None),
        }
    }

    fn set_flag_op(&mut self, f: impl FnOnce(&mut crate::registers::Registers)) -> Expected {
        f(&mut self.regs);
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Arithmetic and logic

    fn op_adc(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => match (self.regs.a, ctx.lo, self.regs.c, self.regs.d) {
                (Some(a), Some(m), Some(c), Some(d)) => {
                    let (r, carry, overflow) = adc8(a, m, c, d);
                    self.regs.a = Some(r);
                    self.regs.set_nz8(Some(r));
                    self.regs.c = Some(carry);
                    self.regs.v = Some(overflow);
                }
                _ => self.wipe_acc_arith(),
            },
            Some(false) => match (self.regs.c16(), ctx.word(), self.regs.c, self.regs.d) {
                (Some(a), Some(m), Some(c), Some(d)) => {
                    let (r, carry, overflow) = adc16(a, m, c, d);
                    self.regs.set_c16(Some(r));
                    self.regs.set_nz16(Some(r as u8), Some((r >> 8) as u8));
                    self.regs.c = Some(carry);
                    self.regs.v = Some(overflow);
                }
                _ => self.wipe_acc_arith(),
            },
            None => {
                // The low-byte result is width-independent; carry and
                // overflow are not.
                let lo = match (self.regs.a, ctx.lo, self.regs.c, self.regs.d) {
                    (Some(a), Some(m), Some(c), Some(d)) => Some(adc8(a, m, c, d).0),
                    _ => None,
                };
                self.regs.a = lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(lo, None);
                self.regs.c = None;
                self.regs.v = None;
            }
        }
        (None, None)
    }

    fn op_sbc(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => match (self.regs.a, ctx.lo, self.regs.c, self.regs.d) {
                (Some(a), Some(m), Some(c), Some(d)) => {
                    let (r, carry, overflow) = sbc8(a, m, c, d);
                    self.regs.a = Some(r);
                    self.regs.set_nz8(Some(r));
                    self.regs.c = Some(carry);
                    self.regs.v = Some(overflow);
                }
                _ => self.wipe_acc_arith(),
            },
            Some(false) => match (self.regs.c16(), ctx.word(), self.regs.c, self.regs.d) {
                (Some(a), Some(m), Some(c), Some(d)) => {
                    let (r, carry, overflow) = sbc16(a, m, c, d);
                    self.regs.set_c16(Some(r));
                    self.regs.set_nz16(Some(r as u8), Some((r >> 8) as u8));
                    self.regs.c = Some(carry);
                    self.regs.v = Some(overflow);
                }
                _ => self.wipe_acc_arith(),
            },
            None => {
                let lo = match (self.regs.a, ctx.lo, self.regs.c, self.regs.d) {
                    (Some(a), Some(m), Some(c), Some(d)) => Some(sbc8(a, m, c, d).0),
                    _ => None,
                };
                self.regs.a = lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(lo, None);
                self.regs.c = None;
                self.regs.v = None;
            }
        }
        (None, None)
    }

    fn wipe_acc_arith(&mut self) {
        match self.regs.ms {
            Some(true) => self.regs.a = None,
            _ => {
                self.regs.a = None;
                self.regs.b = None;
            }
        }
        self.regs.n = None;
        self.regs.v = None;
        self.regs.z = None;
        self.regs.c = None;
    }

    fn op_bitwise(&mut self, ctx: &ExecCtx<'_>, combine: fn(Option<u8>, Option<u8>) -> Option<u8>) -> Expected {
        let lo = combine(self.regs.a, ctx.lo);
        match self.regs.ms {
            Some(true) => {
                self.regs.a = lo;
                self.regs.set_nz8(lo);
            }
            Some(false) => {
                let hi = combine(self.regs.b, ctx.hi);
                self.regs.a = lo;
                self.regs.b = hi;
                self.regs.set_nz16(lo, hi);
            }
            None => {
                self.regs.a = lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(lo, None);
            }
        }
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Loads and stores

    fn op_lda(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => {
                self.regs.a = ctx.lo;
                self.regs.set_nz8(ctx.lo);
            }
            Some(false) => {
                self.regs.a = ctx.lo;
                self.regs.b = ctx.hi;
                self.regs.set_nz16(ctx.lo, ctx.hi);
            }
            None => {
                self.regs.a = ctx.lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(ctx.lo, None);
            }
        }
        (None, None)
    }

    fn op_ld_index(&mut self, ctx: &ExecCtx<'_>, which: Index) -> Expected {
        let value = match self.regs.xs {
            Some(true) => ctx.lo.map(|v| v as u16),
            Some(false) => ctx.word(),
            None => None,
        };
        *self.index_mut(which) = value;
        match self.regs.xs {
            Some(true) => self.regs.set_nz8(ctx.lo),
            Some(false) => self.regs.set_nz16(ctx.lo, ctx.hi),
            None => self.regs.set_nz_unknown_width(ctx.lo, None),
        }
        (None, None)
    }

    fn op_sta(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => {
                let expected = self.regs.a;
                if self.regs.a.is_none() {
                    self.regs.a = ctx.wlo;
                }
                (expected, None)
            }
            Some(false) => {
                let expected = (self.regs.a, self.regs.b);
                if self.regs.a.is_none() {
                    self.regs.a = ctx.wlo;
                }
                if self.regs.b.is_none() {
                    self.regs.b = ctx.whi;
                }
                expected
            }
            None => (None, None),
        }
    }

    fn op_st_index(&mut self, ctx: &ExecCtx<'_>, which: Index) -> Expected {
        let reg = *self.index_mut(which);
        match self.regs.xs {
            Some(true) => {
                let expected = reg.map(|v| v as u8);
                if reg.is_none() {
                    *self.index_mut(which) = ctx.wlo.map(|v| v as u16);
                }
                (expected, None)
            }
            Some(false) => {
                let expected = (reg.map(|v| v as u8), reg.map(|v| (v >> 8) as u8));
                if reg.is_none() {
                    if let (Some(lo), Some(hi)) = (ctx.wlo, ctx.whi) {
                        *self.index_mut(which) = Some(u16::from_le_bytes([lo, hi]));
                    }
                }
                expected
            }
            None => (None, None),
        }
    }

    fn index_mut(&mut self, which: Index) -> &mut Option<u16> {
        match which {
            Index::X => &mut self.regs.x,
            Index::Y => &mut self.regs.y,
        }
    }

    // ---------------------------------------------------------------------
    // Comparisons and bit tests

    fn compare_width(&mut self, lo_pair: (Option<u8>, Option<u8>), hi_pair: (Option<u8>, Option<u8>), w8: Option<bool>) {
        match w8 {
            Some(true) => match lo_pair {
                (Some(a), Some(m)) => {
                    self.regs.z = Some(a == m);
                    self.regs.c = Some(a >= m);
                    self.regs.n = Some(a.wrapping_sub(m) & 0x80 != 0);
                }
                _ => {
                    self.regs.n = None;
                    self.regs.z = None;
                    self.regs.c = None;
                }
            },
            Some(false) => match (lo_pair, hi_pair) {
                ((Some(al), Some(ml)), (Some(ah), Some(mh))) => {
                    let a = u16::from_le_bytes([al, ah]);
                    let m = u16::from_le_bytes([ml, mh]);
                    self.regs.z = Some(a == m);
                    self.regs.c = Some(a >= m);
                    self.regs.n = Some(a.wrapping_sub(m) & 0x8000 != 0);
                }
                ((Some(al), Some(ml)), _) if al != ml => {
                    self.regs.z = Some(false);
                    self.regs.n = None;
                    self.regs.c = None;
                }
                _ => {
                    self.regs.n = None;
                    self.regs.z = None;
                    self.regs.c = None;
                }
            },
            None => {
                // Differing low bytes mean "not equal" at either width.
                self.regs.z = match lo_pair {
                    (Some(a), Some(m)) if a != m => Some(false),
                    _ => None,
                };
                self.regs.n = None;
                self.regs.c = None;
            }
        }
    }

    fn op_cmp(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        self.compare_width((self.regs.a, ctx.lo), (self.regs.b, ctx.hi), self.regs.ms);
        (None, None)
    }

    fn op_cp_index(&mut self, ctx: &ExecCtx<'_>, which: Index) -> Expected {
        let reg = match which {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        };
        self.compare_width(
            (reg.map(|v| v as u8), ctx.lo),
            (reg.map(|v| (v >> 8) as u8), ctx.hi),
            self.regs.xs,
        );
        (None, None)
    }

    fn op_bit(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let immediate = matches!(
            ctx.entry.mode,
            crate::addressing::AddressingMode::ImmediateMFlagDependent
        );
        match self.regs.ms {
            Some(true) => {
                self.regs.z = match and_byte(self.regs.a, ctx.lo) {
                    Some(v) => Some(v == 0),
                    None => None,
                };
                if !immediate {
                    self.regs.n = ctx.lo.map(|v| v & 0x80 != 0);
                    self.regs.v = ctx.lo.map(|v| v & 0x40 != 0);
                }
            }
            Some(false) => {
                let lo = and_byte(self.regs.a, ctx.lo);
                let hi = and_byte(self.regs.b, ctx.hi);
                self.regs.z = match (lo, hi) {
                    (Some(l), Some(h)) => Some(l == 0 && h == 0),
                    (Some(l), _) if l != 0 => Some(false),
                    (_, Some(h)) if h != 0 => Some(false),
                    _ => None,
                };
                if !immediate {
                    self.regs.n = ctx.hi.map(|v| v & 0x80 != 0);
                    self.regs.v = ctx.hi.map(|v| v & 0x40 != 0);
                }
            }
            None => {
                self.regs.z = match and_byte(self.regs.a, ctx.lo) {
                    Some(v) if v != 0 => Some(false),
                    _ => None,
                };
                if !immediate {
                    self.regs.n = None;
                    self.regs.v = None;
                }
            }
        }
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Read-modify-write

    fn op_shift(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let mnemonic = ctx.entry.mnemonic;
        if ctx.entry.mode == crate::addressing::AddressingMode::Accumulator {
            self.shift_accumulator(mnemonic);
            return (None, None);
        }
        let cin = match mnemonic {
            Mnemonic::ROL | Mnemonic::ROR => self.regs.c,
            _ => Some(false),
        };
        match self.regs.ms {
            Some(true) => match (ctx.lo, cin) {
                (Some(v), Some(c)) => {
                    let (r, cout) = shift_value(mnemonic, v as u16, c, true);
                    self.regs.c = Some(cout);
                    self.regs.set_nz8(Some(r as u8));
                    (Some(r as u8), None)
                }
                _ => {
                    self.wipe_nzc();
                    (None, None)
                }
            },
            Some(false) => match (ctx.word(), cin) {
                (Some(v), Some(c)) => {
                    let (r, cout) = shift_value(mnemonic, v, c, false);
                    self.regs.c = Some(cout);
                    self.regs.set_nz16(Some(r as u8), Some((r >> 8) as u8));
                    (Some(r as u8), Some((r >> 8) as u8))
                }
                _ => {
                    self.wipe_nzc();
                    (None, None)
                }
            },
            None => {
                self.wipe_nzc();
                (None, None)
            }
        }
    }

    fn shift_accumulator(&mut self, mnemonic: Mnemonic) {
        let cin = match mnemonic {
            Mnemonic::ROL | Mnemonic::ROR => self.regs.c,
            _ => Some(false),
        };
        match self.regs.ms {
            Some(true) => match (self.regs.a, cin) {
                (Some(a), Some(c)) => {
                    let (r, cout) = shift_value(mnemonic, a as u16, c, true);
                    self.regs.a = Some(r as u8);
                    self.regs.c = Some(cout);
                    self.regs.set_nz8(Some(r as u8));
                }
                _ => {
                    self.regs.a = None;
                    self.wipe_nzc();
                }
            },
            Some(false) => match (self.regs.c16(), cin) {
                (Some(v), Some(c)) => {
                    let (r, cout) = shift_value(mnemonic, v, c, false);
                    self.regs.set_c16(Some(r));
                    self.regs.c = Some(cout);
                    self.regs.set_nz16(Some(r as u8), Some((r >> 8) as u8));
                }
                _ => {
                    self.regs.a = None;
                    self.regs.b = None;
                    self.wipe_nzc();
                }
            },
            None => {
                // Left shifts fill the low byte identically at either width;
                // right shifts pull an unknown bit in from above.
                let lo = match (mnemonic, self.regs.a, cin) {
                    (Mnemonic::ASL, Some(a), _) => Some(a << 1),
                    (Mnemonic::ROL, Some(a), Some(c)) => Some((a << 1) | c as u8),
                    _ => None,
                };
                self.regs.a = lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(lo, None);
                self.regs.c = None;
            }
        }
    }

    fn wipe_nzc(&mut self) {
        self.regs.n = None;
        self.regs.z = None;
        self.regs.c = None;
    }

    fn op_inc_dec(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let step: i16 = if ctx.entry.mnemonic == Mnemonic::INC { 1 } else { -1 };
        if ctx.entry.mode == crate::addressing::AddressingMode::Accumulator {
            match self.regs.ms {
                Some(true) => {
                    let r = self.regs.a.map(|a| a.wrapping_add_signed(step as i8));
                    self.regs.a = r;
                    self.regs.set_nz8(r);
                }
                Some(false) => {
                    let r = self.regs.c16().map(|v| v.wrapping_add_signed(step));
                    self.regs.set_c16(r);
                    self.regs.set_nz16(r.map(|v| v as u8), r.map(|v| (v >> 8) as u8));
                }
                None => {
                    // The low byte steps the same way at either width.
                    let lo = self.regs.a.map(|a| a.wrapping_add_signed(step as i8));
                    self.regs.a = lo;
                    self.regs.b = None;
                    self.regs.set_nz_unknown_width(lo, None);
                }
            }
            return (None, None);
        }
        match self.regs.ms {
            Some(true) => match ctx.lo {
                Some(v) => {
                    let r = v.wrapping_add_signed(step as i8);
                    self.regs.set_nz8(Some(r));
                    (Some(r), None)
                }
                None => {
                    self.regs.n = None;
                    self.regs.z = None;
                    (None, None)
                }
            },
            Some(false) => match ctx.word() {
                Some(v) => {
                    let r = v.wrapping_add_signed(step);
                    self.regs.set_nz16(Some(r as u8), Some((r >> 8) as u8));
                    (Some(r as u8), Some((r >> 8) as u8))
                }
                None => {
                    self.regs.n = None;
                    self.regs.z = None;
                    (None, None)
                }
            },
            None => {
                self.regs.n = None;
                self.regs.z = None;
                (None, None)
            }
        }
    }

    fn op_tsb_trb(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let set = ctx.entry.mnemonic == Mnemonic::TSB;
        match self.regs.ms {
            Some(true) => {
                self.regs.z = and_byte(self.regs.a, ctx.lo).map(|v| v == 0);
                match (self.regs.a, ctx.lo) {
                    (Some(a), Some(v)) => {
                        let r = if set { v | a } else { v & !a };
                        (Some(r), None)
                    }
                    _ => (None, None),
                }
            }
            Some(false) => {
                let masked_lo = and_byte(self.regs.a, ctx.lo);
                let masked_hi = and_byte(self.regs.b, ctx.hi);
                self.regs.z = match (masked_lo, masked_hi) {
                    (Some(l), Some(h)) => Some(l == 0 && h == 0),
                    (Some(l), _) if l != 0 => Some(false),
                    (_, Some(h)) if h != 0 => Some(false),
                    _ => None,
                };
                match (self.regs.a, self.regs.b, ctx.lo, ctx.hi) {
                    (Some(a), Some(b), Some(vl), Some(vh)) => {
                        let (rl, rh) = if set {
                            (vl | a, vh | b)
                        } else {
                            (vl & !a, vh & !b)
                        };
                        (Some(rl), Some(rh))
                    }
                    _ => (None, None),
                }
            }
            None => {
                self.regs.z = None;
                (None, None)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Index stepping and transfers

    fn op_step_index(&mut self, which: Index, step: i16) -> Expected {
        let value = match (self.regs.xs, *self.index_mut(which)) {
            (Some(true), Some(v)) => Some(((v as u8).wrapping_add_signed(step as i8)) as u16),
            (Some(false), Some(v)) => Some(v.wrapping_add_signed(step)),
            _ => None,
        };
        *self.index_mut(which) = value;
        self.regs.set_nz_index(value);
        (None, None)
    }

    fn op_transfer_to_index(&mut self, which: Index) -> Expected {
        let value = match self.regs.xs {
            Some(true) => self.regs.a.map(|a| a as u16),
            Some(false) => self.regs.c16(),
            None => None,
        };
        *self.index_mut(which) = value;
        match self.regs.xs {
            Some(true) => self.regs.set_nz8(self.regs.a),
            Some(false) => self.regs.set_nz16(self.regs.a, self.regs.b),
            None => {
                let (a, b) = (self.regs.a, self.regs.b);
                self.regs.set_nz_unknown_width(a, b);
            }
        }
        (None, None)
    }

    fn op_transfer_to_acc(&mut self, which: Index) -> Expected {
        let src = match which {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        };
        let lo = src.map(|v| v as u8);
        let hi = src.map(|v| (v >> 8) as u8);
        match self.regs.ms {
            Some(true) => {
                self.regs.a = lo;
                self.regs.set_nz8(lo);
            }
            Some(false) => {
                self.regs.a = lo;
                self.regs.b = hi;
                self.regs.set_nz16(lo, hi);
            }
            None => {
                self.regs.a = lo;
                self.regs.b = None;
                self.regs.set_nz_unknown_width(lo, None);
            }
        }
        (None, None)
    }

    /// TXY / TYX.
    fn op_transfer_index(&mut self, from: Index) -> Expected {
        let src = match from {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        };
        let dst = match from {
            Index::X => Index::Y,
            Index::Y => Index::X,
        };
        let value = match self.regs.xs {
            Some(true) => src.map(|v| v & 0x00FF),
            Some(false) => src,
            None => None,
        };
        *self.index_mut(dst) = value;
        self.regs.set_nz_index(value);
        (None, None)
    }

    fn op_tsx(&mut self) -> Expected {
        let (sl, sh) = (self.regs.sl, self.regs.sh);
        self.regs.x = match self.regs.xs {
            Some(true) => sl.map(|v| v as u16),
            Some(false) => self.regs.sp(),
            None => None,
        };
        match self.regs.xs {
            Some(true) => self.regs.set_nz8(sl),
            Some(false) => self.regs.set_nz16(sl, sh),
            None => self.regs.set_nz_unknown_width(sl, sh),
        }
        (None, None)
    }

    fn op_txs(&mut self) -> Expected {
        let x = self.regs.x;
        self.regs.sl = x.map(|v| v as u8);
        self.regs.sh = match self.regs.e {
            Some(true) => Some(0x01),
            Some(false) => x.map(|v| (v >> 8) as u8),
            None => None,
        };
        (None, None)
    }

    fn op_tcs(&mut self) -> Expected {
        self.regs.sl = self.regs.a;
        self.regs.sh = match self.regs.e {
            Some(true) => Some(0x01),
            Some(false) => self.regs.b,
            // With E unknown we cannot tell whether B made it into SH.
            None => None,
        };
        (None, None)
    }

    fn op_tsc(&mut self) -> Expected {
        let (sl, sh) = (self.regs.sl, self.regs.sh);
        self.regs.a = sl;
        self.regs.b = sh;
        self.regs.set_nz16(sl, sh);
        (None, None)
    }

    fn op_tcd(&mut self) -> Expected {
        let (a, b) = (self.regs.a, self.regs.b);
        self.regs.dp = self.regs.c16();
        self.regs.set_nz16(a, b);
        (None, None)
    }

    fn op_tdc(&mut self) -> Expected {
        let dp = self.regs.dp;
        self.regs.set_c16(dp);
        self.regs.set_nz16(dp.map(|v| v as u8), dp.map(|v| (v >> 8) as u8));
        (None, None)
    }

    fn op_xba(&mut self) -> Expected {
        let (a, b) = (self.regs.a, self.regs.b);
        self.regs.a = b;
        self.regs.b = a;
        self.regs.set_nz8(b);
        (None, None)
    }

    fn op_xce(&mut self) -> Expected {
        let old_c = self.regs.c;
        let old_e = self.regs.e;
        self.regs.c = old_e;
        match old_c {
            Some(true) => self.regs.enter_emulation(),
            Some(false) => self.regs.leave_emulation(),
            None => self.regs.poison_mode(),
        }
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Stack traffic

    fn push_event(&mut self, observed: u8, newop: bool) {
        if let Some(addr) = self.regs.push_addr(newop) {
            self.bus.write(observed, addr, AccessKind::Stack);
        }
    }

    fn pull_event(&mut self, observed: u8, newop: bool) {
        if let Some(addr) = self.regs.pull_addr(newop) {
            self.bus.read(observed, addr, AccessKind::Stack);
        }
    }

    fn check_pushed(&mut self, what: &str, expected: Option<u8>, observed: u8) {
        if let Some(exp) = expected {
            if exp != observed {
                self.flag_mismatch(&format!(
                    "{what} pushed {observed:02X} but the model expected {exp:02X}"
                ));
            }
        }
    }

    fn op_pha(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => {
                if let Some(obs) = tail(ctx.samples, 1) {
                    self.check_pushed("PHA", self.regs.a, obs);
                    if self.regs.a.is_none() {
                        self.regs.a = Some(obs);
                    }
                    self.push_event(obs, false);
                }
            }
            Some(false) => {
                if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
                    self.check_pushed("PHA", self.regs.b, hi);
                    self.check_pushed("PHA", self.regs.a, lo);
                    if self.regs.b.is_none() {
                        self.regs.b = Some(hi);
                    }
                    if self.regs.a.is_none() {
                        self.regs.a = Some(lo);
                    }
                    self.push_event(hi, false);
                    self.push_event(lo, false);
                }
            }
            None => {}
        }
        (None, None)
    }

    fn op_ph_index(&mut self, ctx: &ExecCtx<'_>, which: Index) -> Expected {
        let newop = ctx.entry.newop;
        let reg = *self.index_mut(which);
        match self.regs.xs {
            Some(true) => {
                if let Some(obs) = tail(ctx.samples, 1) {
                    self.check_pushed("push", reg.map(|v| v as u8), obs);
                    if reg.is_none() {
                        *self.index_mut(which) = Some(obs as u16);
                    }
                    self.push_event(obs, newop);
                }
            }
            Some(false) => {
                if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
                    self.check_pushed("push", reg.map(|v| (v >> 8) as u8), hi);
                    self.check_pushed("push", reg.map(|v| v as u8), lo);
                    if reg.is_none() {
                        *self.index_mut(which) = Some(u16::from_le_bytes([lo, hi]));
                    }
                    self.push_event(hi, newop);
                    self.push_event(lo, newop);
                }
            }
            None => {}
        }
        (None, None)
    }

    fn op_php(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(obs) = tail(ctx.samples, 1) {
            // The pushed byte both validates and reveals the flags.
            self.regs.observe_p(obs);
            self.push_event(obs, false);
        }
        (None, None)
    }

    fn op_phb(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(obs) = tail(ctx.samples, 1) {
            self.check_pushed("PHB", self.regs.db, obs);
            self.regs.db = Some(obs);
            self.push_event(obs, true);
        }
        (None, None)
    }

    fn op_phk(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(obs) = tail(ctx.samples, 1) {
            self.check_pushed("PHK", self.regs.pb, obs);
            self.regs.pb = Some(obs);
            self.push_event(obs, true);
        }
        (None, None)
    }

    fn op_phd(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            let dp = self.regs.dp;
            self.check_pushed("PHD", dp.map(|v| (v >> 8) as u8), hi);
            self.check_pushed("PHD", dp.map(|v| v as u8), lo);
            self.regs.dp = Some(u16::from_le_bytes([lo, hi]));
            self.push_event(hi, true);
            self.push_event(lo, true);
        }
        (None, None)
    }

    fn op_pla(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        match self.regs.ms {
            Some(true) => {
                if let Some(obs) = tail(ctx.samples, 1) {
                    self.pull_event(obs, false);
                    self.regs.a = Some(obs);
                    self.regs.set_nz8(Some(obs));
                }
            }
            Some(false) => {
                if let (Some(lo), Some(hi)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
                    self.pull_event(lo, false);
                    self.pull_event(hi, false);
                    self.regs.a = Some(lo);
                    self.regs.b = Some(hi);
                    self.regs.set_nz16(Some(lo), Some(hi));
                }
            }
            None => {
                self.regs.a = None;
                self.regs.b = None;
                self.regs.n = None;
                self.regs.z = None;
            }
        }
        (None, None)
    }

    fn op_pl_index(&mut self, ctx: &ExecCtx<'_>, which: Index) -> Expected {
        let newop = ctx.entry.newop;
        match self.regs.xs {
            Some(true) => {
                if let Some(obs) = tail(ctx.samples, 1) {
                    self.pull_event(obs, newop);
                    *self.index_mut(which) = Some(obs as u16);
                    self.regs.set_nz8(Some(obs));
                }
            }
            Some(false) => {
                if let (Some(lo), Some(hi)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
                    self.pull_event(lo, newop);
                    self.pull_event(hi, newop);
                    *self.index_mut(which) = Some(u16::from_le_bytes([lo, hi]));
                    self.regs.set_nz16(Some(lo), Some(hi));
                }
            }
            None => {
                *self.index_mut(which) = None;
                self.regs.n = None;
                self.regs.z = None;
            }
        }
        (None, None)
    }

    fn op_plp(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(obs) = tail(ctx.samples, 1) {
            self.pull_event(obs, false);
            self.regs.observe_p(obs);
        }
        (None, None)
    }

    fn op_plb(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(obs) = tail(ctx.samples, 1) {
            self.pull_event(obs, true);
            self.regs.db = Some(obs);
            self.regs.set_nz8(Some(obs));
        }
        (None, None)
    }

    fn op_pld(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let (Some(lo), Some(hi)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            self.pull_event(lo, true);
            self.pull_event(hi, true);
            self.regs.dp = Some(u16::from_le_bytes([lo, hi]));
            self.regs.set_nz16(Some(lo), Some(hi));
        }
        (None, None)
    }

    fn op_pea(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            self.check_pushed("PEA", Some(ctx.instr.op2()), hi);
            self.check_pushed("PEA", Some(ctx.instr.op1()), lo);
            self.push_event(hi, true);
            self.push_event(lo, true);
        }
        (None, None)
    }

    fn op_pei(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        // The pushed word is the pointer read earlier in the instruction.
        let dpa = self.regs.dp.map(|dp| (dp & 0x00FF != 0) as usize);
        if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            if let Some(dpa) = dpa {
                let ptr_lo = ctx.samples.get(2 + dpa).map(|s| s.data);
                let ptr_hi = ctx.samples.get(3 + dpa).map(|s| s.data);
                self.check_pushed("PEI", ptr_hi, hi);
                self.check_pushed("PEI", ptr_lo, lo);
            }
            self.push_event(hi, true);
            self.push_event(lo, true);
        }
        (None, None)
    }

    fn op_per(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            let expected = self
                .regs
                .pc
                .map(|pc| pc.wrapping_add(3).wrapping_add(ctx.instr.op16()));
            self.check_pushed("PER", expected.map(|v| (v >> 8) as u8), hi);
            self.check_pushed("PER", expected.map(|v| v as u8), lo);
            self.push_event(hi, true);
            self.push_event(lo, true);
        }
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Calls and returns

    fn op_jsr(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let newop = ctx.entry.newop;
        let n = ctx.samples.len();
        if n < 4 {
            return (None, None);
        }
        // JSR (a,x) pushes early, JSR a at the end; either way the pushed
        // value is the address of the instruction's last byte.
        let (hi_at, lo_at) = if newop { (2, 3) } else { (n - 2, n - 1) };
        let expected = self.regs.pc.map(|pc| pc.wrapping_add(2));
        if let (Some(hi), Some(lo)) = (
            ctx.samples.get(hi_at).map(|s| s.data),
            ctx.samples.get(lo_at).map(|s| s.data),
        ) {
            self.check_pushed("JSR", expected.map(|v| (v >> 8) as u8), hi);
            self.check_pushed("JSR", expected.map(|v| v as u8), lo);
            self.push_event(hi, newop);
            self.push_event(lo, newop);
        }
        (None, None)
    }

    fn op_jsl(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        if let Some(pb) = ctx.samples.get(3).map(|s| s.data) {
            self.check_pushed("JSL", self.regs.pb, pb);
            self.push_event(pb, true);
        }
        let expected = self.regs.pc.map(|pc| pc.wrapping_add(3));
        if let (Some(hi), Some(lo)) = (tail(ctx.samples, 2), tail(ctx.samples, 1)) {
            self.check_pushed("JSL", expected.map(|v| (v >> 8) as u8), hi);
            self.check_pushed("JSL", expected.map(|v| v as u8), lo);
            self.push_event(hi, true);
            self.push_event(lo, true);
        }
        (None, None)
    }

    fn op_rts(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let lo = ctx.samples.get(3).map(|s| s.data);
        let hi = ctx.samples.get(4).map(|s| s.data);
        if let Some(lo) = lo {
            self.pull_event(lo, false);
        }
        if let Some(hi) = hi {
            self.pull_event(hi, false);
        }
        self.regs.pc = match (lo, hi) {
            (Some(lo), Some(hi)) => Some(u16::from_le_bytes([lo, hi]).wrapping_add(1)),
            _ => None,
        };
        (None, None)
    }

    fn op_rtl(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let lo = ctx.samples.get(3).map(|s| s.data);
        let hi = ctx.samples.get(4).map(|s| s.data);
        let pb = ctx.samples.get(5).map(|s| s.data);
        for byte in [lo, hi, pb].into_iter().flatten() {
            self.pull_event(byte, true);
        }
        self.regs.pc = match (lo, hi) {
            (Some(lo), Some(hi)) => Some(u16::from_le_bytes([lo, hi]).wrapping_add(1)),
            _ => None,
        };
        if pb.is_some() {
            self.regs.pb = pb;
        }
        (None, None)
    }

    fn op_rti(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let n = ctx.samples.len();
        // The pull count reveals the mode when E is unknown.
        let native = match self.regs.e {
            Some(e) => !e,
            None => n >= 7,
        };
        if self.regs.e.is_none() {
            self.regs.observe_e(!native);
        }
        if let Some(p) = ctx.samples.get(3).map(|s| s.data) {
            self.pull_event(p, false);
            self.regs.observe_p(p);
        }
        let lo = ctx.samples.get(4).map(|s| s.data);
        let hi = ctx.samples.get(5).map(|s| s.data);
        for byte in [lo, hi].into_iter().flatten() {
            self.pull_event(byte, false);
        }
        self.regs.pc = match (lo, hi) {
            (Some(lo), Some(hi)) => Some(u16::from_le_bytes([lo, hi])),
            _ => None,
        };
        if native {
            if let Some(pb) = ctx.samples.get(6).map(|s| s.data) {
                self.pull_event(pb, false);
                self.regs.pb = Some(pb);
            }
        }
        (None, None)
    }

    // ---------------------------------------------------------------------
    // Block moves and branches

    fn op_block_move(&mut self, ctx: &ExecCtx<'_>, step: i16) -> Expected {
        let dst_bank = ctx.instr.op1() as u32;
        let src_bank = ctx.instr.op2() as u32;
        let moved = ctx.samples.get(3).map(|s| s.data);

        if let (Some(m), Some(x)) = (moved, self.index_value(Index::X)) {
            self.bus.read(m, (src_bank << 16) | x as u32, AccessKind::Data);
        }
        if let (Some(m), Some(y)) = (moved, self.index_value(Index::Y)) {
            self.bus.write(m, (dst_bank << 16) | y as u32, AccessKind::Data);
        }

        let count = self.regs.c16().map(|v| v.wrapping_sub(1));
        self.regs.set_c16(count);

        match self.regs.xs {
            Some(true) => {
                self.regs.x = self.regs.x.map(|v| (v as u8).wrapping_add_signed(step as i8) as u16);
                self.regs.y = self.regs.y.map(|v| (v as u8).wrapping_add_signed(step as i8) as u16);
            }
            Some(false) => {
                self.regs.x = self.regs.x.map(|v| v.wrapping_add_signed(step));
                self.regs.y = self.regs.y.map(|v| v.wrapping_add_signed(step));
            }
            None => {
                self.regs.x = None;
                self.regs.y = None;
            }
        }
        self.regs.db = Some(dst_bank as u8);

        // The instruction repeats itself until the counter underflows.
        match count {
            Some(0xFFFF) => self.regs.pc = self.regs.pc.map(|pc| pc.wrapping_add(3)),
            Some(_) => {}
            None => self.regs.pc = None,
        }
        (None, None)
    }

    fn op_branch(&mut self, ctx: &ExecCtx<'_>) -> Expected {
        let Some(taken) = ctx.taken else {
            return (None, None);
        };
        // The observed decision reveals the deciding flag.
        enum F {
            N,
            V,
            C,
            Z,
        }
        let (which, value) = match ctx.instr.opcode {
            0x10 => (F::N, !taken),
            0x30 => (F::N, taken),
            0x50 => (F::V, !taken),
            0x70 => (F::V, taken),
            0x90 => (F::C, !taken),
            0xB0 => (F::C, taken),
            0xD0 => (F::Z, !taken),
            0xF0 => (F::Z, taken),
            _ => return (None, None),
        };
        let slot = match which {
            F::N => &mut self.regs.n,
            F::V => &mut self.regs.v,
            F::C => &mut self.regs.c,
            F::Z => &mut self.regs.z,
        };
        let prior = *slot;
        *slot = Some(value);
        if prior == Some(!value) {
            self.regs.set_fail();
            log::warn!(
                "branch {:02X} decision contradicts the tracked flag",
                ctx.instr.opcode
            );
        }
        (None, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adc8_binary_overflow_and_carry() {
        // 0x80 + 0x80: wraps to 0, sets C and V.
        assert_eq!(adc8(0x80, 0x80, false, false), (0x00, true, true));
        assert_eq!(adc8(0x22, 0x11, false, false), (0x33, false, false));
        assert_eq!(adc8(0x7F, 0x01, false, false), (0x80, false, true));
        assert_eq!(adc8(0xFF, 0x01, false, false), (0x00, true, false));
    }

    #[test]
    fn adc8_decimal_adjusts_nibbles() {
        // 0x19 + 0x01 = 0x20 in BCD.
        assert_eq!(adc8(0x19, 0x01, false, true).0, 0x20);
        // 0x99 + 0x01 wraps with carry.
        let (r, c, _) = adc8(0x99, 0x01, false, true);
        assert_eq!((r, c), (0x00, true));
    }

    #[test]
    fn adc16_decimal_carries_across_all_nibbles() {
        let (r, c, _) = adc16(0x9999, 0x0001, false, true);
        assert_eq!((r, c), (0x0000, true));
        assert_eq!(adc16(0x1234, 0x1111, false, true).0, 0x2345);
    }

    #[test]
    fn sbc8_matches_65c02_semantics() {
        // 5 - 3 with carry set (no borrow).
        assert_eq!(sbc8(0x05, 0x03, true, false), (0x02, true, false));
        // 3 - 5 borrows.
        let (r, c, _) = sbc8(0x03, 0x05, true, false);
        assert_eq!((r, c), (0xFE, false));
        // BCD: 0x20 - 0x01 = 0x19.
        assert_eq!(sbc8(0x20, 0x01, true, true).0, 0x19);
    }

    #[test]
    fn sbc16_decimal() {
        assert_eq!(sbc16(0x2000, 0x0001, true, true).0, 0x1999);
        assert_eq!(sbc16(0x4321, 0x1111, true, false).0, 0x3210);
    }

    #[test]
    fn shift_value_carries_at_the_right_width() {
        assert_eq!(shift_value(Mnemonic::ASL, 0x80, false, true), (0x00, true));
        assert_eq!(shift_value(Mnemonic::ASL, 0x80, false, false), (0x100, false));
        assert_eq!(shift_value(Mnemonic::ROR, 0x01, true, true), (0x80, true));
        assert_eq!(shift_value(Mnemonic::ROR, 0x01, true, false), (0x8000, true));
        assert_eq!(shift_value(Mnemonic::ROL, 0x40, true, true), (0x81, false));
    }

    #[test]
    fn absorbing_byte_algebra() {
        assert_eq!(and_byte(None, Some(0)), Some(0));
        assert_eq!(and_byte(Some(0), None), Some(0));
        assert_eq!(and_byte(None, Some(1)), None);
        assert_eq!(or_byte(None, Some(0xFF)), Some(0xFF));
        assert_eq!(or_byte(None, Some(0xFE)), None);
        assert_eq!(eor_byte(None, Some(0)), None);
    }
}
