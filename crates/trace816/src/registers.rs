//! Symbolic model of the programmer-visible register file.
//!
//! Every register and flag is tri-state: `Some(value)` when the trace has
//! revealed it, `None` while it is still unknown. Updates go through the
//! width-aware helpers below so that the narrow-inference rules (a non-zero
//! low byte clears Z at any width, agreeing sign bits fix N, and so on) live
//! in one place.

use std::fmt;

use crate::config::InitialState;

const N_FLAG: u8 = 0x80;
const V_FLAG: u8 = 0x40;
/// 1 = accumulator is 8-bit (native mode); unused/1 in emulation mode.
const MS_FLAG: u8 = 0x20;
/// 1 = index registers are 8-bit (native mode); B in emulation mode.
const XS_FLAG: u8 = 0x10;
const D_FLAG: u8 = 0x08;
const I_FLAG: u8 = 0x04;
const Z_FLAG: u8 = 0x02;
const C_FLAG: u8 = 0x01;

#[derive(Clone, Debug)]
pub struct Registers {
    /// Low accumulator.
    pub a: Option<u8>,
    /// High accumulator; forms the 16-bit C accumulator with `a`.
    pub b: Option<u8>,
    pub x: Option<u16>,
    pub y: Option<u16>,
    /// Stack pointer, tracked as separate bytes: `sh` stays pinned to 0x01
    /// in emulation mode while `sl` moves.
    pub sl: Option<u8>,
    pub sh: Option<u8>,
    pub pc: Option<u16>,
    pub pb: Option<u8>,
    pub db: Option<u8>,
    pub dp: Option<u16>,

    pub n: Option<bool>,
    pub v: Option<bool>,
    pub d: Option<bool>,
    pub i: Option<bool>,
    pub z: Option<bool>,
    pub c: Option<bool>,
    /// Accumulator width; `true` = 8-bit.
    pub ms: Option<bool>,
    /// Index width; `true` = 8-bit.
    pub xs: Option<bool>,
    /// Emulation mode.
    pub e: Option<bool>,

    fail: bool,
}

impl Registers {
    pub fn new(init: &InitialState) -> Self {
        let mut regs = Registers {
            a: None,
            b: None,
            x: None,
            y: None,
            sl: init.sp.map(|sp| sp as u8),
            sh: init.sp.map(|sp| (sp >> 8) as u8),
            pc: None,
            pb: init.pb,
            db: init.db,
            dp: init.dp,
            n: None,
            v: None,
            d: None,
            i: None,
            z: None,
            c: None,
            ms: init.ms,
            xs: init.xs,
            e: None,
            fail: false,
        };
        match init.e {
            Some(true) => {
                regs.enter_emulation();
                // A capture asserted to start in emulation mode comes from a
                // 6502-era machine whose banks never left zero.
                regs.pb = regs.pb.or(Some(0));
                regs.db = regs.db.or(Some(0));
            }
            Some(false) => regs.e = Some(false),
            None => {}
        }
        regs
    }

    /// Returns and clears the inconsistency flag.
    pub fn take_fail(&mut self) -> bool {
        std::mem::take(&mut self.fail)
    }

    pub fn set_fail(&mut self) {
        self.fail = true;
    }

    // ---------------------------------------------------------------------
    // Composite accessors

    /// The 16-bit C accumulator, when both halves are known.
    pub fn c16(&self) -> Option<u16> {
        Some(u16::from_le_bytes([self.a?, self.b?]))
    }

    pub fn set_c16(&mut self, value: Option<u16>) {
        self.a = value.map(|v| v as u8);
        self.b = value.map(|v| (v >> 8) as u8);
    }

    pub fn sp(&self) -> Option<u16> {
        Some(u16::from_le_bytes([self.sl?, self.sh?]))
    }

    /// Stack pointer as a bank-0 effective address.
    pub fn sp_ea(&self) -> Option<u32> {
        self.sp().map(u32::from)
    }

    /// Low byte of X at the current width (the value on the bus for 8-bit
    /// index operations).
    pub fn x_low(&self) -> Option<u8> {
        self.x.map(|x| x as u8)
    }

    pub fn y_low(&self) -> Option<u8> {
        self.y.map(|y| y as u8)
    }

    // ---------------------------------------------------------------------
    // Mode transitions

    /// Forces the E=1 invariants: 8-bit widths, stack pinned to page 1,
    /// index high bytes cleared.
    pub fn enter_emulation(&mut self) {
        self.e = Some(true);
        self.ms = Some(true);
        self.xs = Some(true);
        self.sh = Some(0x01);
        self.narrow_index();
    }

    /// Leaving emulation mode reveals nothing: MS/XS keep their forced
    /// 8-bit values until a REP changes them.
    pub fn leave_emulation(&mut self) {
        self.e = Some(false);
    }

    /// An XCE with unknown carry: we no longer know which mode we are in.
    pub fn poison_mode(&mut self) {
        self.e = None;
        self.ms = None;
        self.xs = None;
        self.sh = None;
    }

    fn narrow_index(&mut self) {
        self.x = self.x.map(|x| x & 0x00FF);
        self.y = self.y.map(|y| y & 0x00FF);
    }

    /// Reconciles the tracker with an observed E pin sample.
    pub fn observe_e(&mut self, pin: bool) {
        if let Some(cur) = self.e {
            if cur != pin {
                log::warn!("E pin reads {} but tracked E is {}", pin as u8, cur as u8);
                self.fail = true;
            }
        }
        if pin {
            self.enter_emulation();
        } else {
            self.e = Some(false);
        }
    }

    /// Records an accumulator width revealed by the cycle count.
    pub fn observe_ms(&mut self, eight_bit: bool) {
        if let Some(cur) = self.ms {
            if cur != eight_bit {
                log::warn!("cycle count reveals MS={} but tracked MS={}", eight_bit as u8, cur as u8);
                self.fail = true;
            }
        }
        self.ms = Some(eight_bit);
        if !eight_bit {
            self.native_implied();
        }
    }

    /// Records an index width revealed by the cycle count.
    pub fn observe_xs(&mut self, eight_bit: bool) {
        if let Some(cur) = self.xs {
            if cur != eight_bit {
                log::warn!("cycle count reveals XS={} but tracked XS={}", eight_bit as u8, cur as u8);
                self.fail = true;
            }
        }
        self.xs = Some(eight_bit);
        if eight_bit {
            self.narrow_index();
        } else {
            self.native_implied();
        }
    }

    /// A 16-bit width implies native mode.
    fn native_implied(&mut self) {
        match self.e {
            Some(true) => {
                log::warn!("16-bit width observed while tracked E=1");
                self.fail = true;
                self.e = Some(false);
            }
            Some(false) => {}
            None => self.e = Some(false),
        }
    }

    // ---------------------------------------------------------------------
    // P byte

    fn adopt_flag(slot: &mut Option<bool>, observed: bool, name: &str, fail: &mut bool) {
        if let Some(cur) = *slot {
            if cur != observed {
                log::warn!("{} flag disagrees with observed P byte", name);
                *fail = true;
            }
        }
        *slot = Some(observed);
    }

    /// Checks an observed P byte (push or pull) against every known flag,
    /// then adopts it. In emulation mode bits 5:4 are unused/B and say
    /// nothing about MS/XS; with E unknown they are left alone.
    pub fn observe_p(&mut self, p: u8) {
        Self::adopt_flag(&mut self.n, p & N_FLAG != 0, "N", &mut self.fail);
        Self::adopt_flag(&mut self.v, p & V_FLAG != 0, "V", &mut self.fail);
        Self::adopt_flag(&mut self.d, p & D_FLAG != 0, "D", &mut self.fail);
        Self::adopt_flag(&mut self.i, p & I_FLAG != 0, "I", &mut self.fail);
        Self::adopt_flag(&mut self.z, p & Z_FLAG != 0, "Z", &mut self.fail);
        Self::adopt_flag(&mut self.c, p & C_FLAG != 0, "C", &mut self.fail);
        if self.e == Some(false) {
            Self::adopt_flag(&mut self.ms, p & MS_FLAG != 0, "M", &mut self.fail);
            Self::adopt_flag(&mut self.xs, p & XS_FLAG != 0, "X", &mut self.fail);
            if self.xs == Some(true) {
                self.narrow_index();
            }
        }
    }

    /// Assembles the P byte a PHP would push, when every flag is known.
    pub fn p_byte(&self) -> Option<u8> {
        let mut p = 0u8;
        p |= if self.n? { N_FLAG } else { 0 };
        p |= if self.v? { V_FLAG } else { 0 };
        p |= if self.d? { D_FLAG } else { 0 };
        p |= if self.i? { I_FLAG } else { 0 };
        p |= if self.z? { Z_FLAG } else { 0 };
        p |= if self.c? { C_FLAG } else { 0 };
        if self.e? {
            // Unused and B read back as 1 when pushed by an instruction.
            p |= MS_FLAG | XS_FLAG;
        } else {
            p |= if self.ms? { MS_FLAG } else { 0 };
            p |= if self.xs? { XS_FLAG } else { 0 };
        }
        Some(p)
    }

    /// Do the tracked flags agree with `p`? `None` when not decidable.
    /// Only flags currently known participate; in emulation mode (or with E
    /// unknown) bits 5:4 are not compared.
    pub fn p_agrees(&self, p: u8) -> bool {
        let pairs = [
            (self.n, N_FLAG),
            (self.v, V_FLAG),
            (self.d, D_FLAG),
            (self.i, I_FLAG),
            (self.z, Z_FLAG),
            (self.c, C_FLAG),
        ];
        for (flag, mask) in pairs {
            if let Some(f) = flag {
                if f != (p & mask != 0) {
                    return false;
                }
            }
        }
        if self.e == Some(false) {
            for (flag, mask) in [(self.ms, MS_FLAG), (self.xs, XS_FLAG)] {
                if let Some(f) = flag {
                    if f != (p & mask != 0) {
                        return false;
                    }
                }
            }
        }
        true
    }

    /// SEP: sets the P bits selected by `mask`.
    pub fn apply_sep(&mut self, mask: u8) {
        self.apply_rep_sep(mask, true);
    }

    /// REP: clears the P bits selected by `mask`.
    pub fn apply_rep(&mut self, mask: u8) {
        self.apply_rep_sep(mask, false);
    }

    fn apply_rep_sep(&mut self, mask: u8, value: bool) {
        let v = Some(value);
        if mask & N_FLAG != 0 {
            self.n = v;
        }
        if mask & V_FLAG != 0 {
            self.v = v;
        }
        if mask & D_FLAG != 0 {
            self.d = v;
        }
        if mask & I_FLAG != 0 {
            self.i = v;
        }
        if mask & Z_FLAG != 0 {
            self.z = v;
        }
        if mask & C_FLAG != 0 {
            self.c = v;
        }
        // The width bits are ignored in emulation mode; with E unknown we
        // cannot tell whether they stuck.
        match self.e {
            Some(true) => {}
            Some(false) => {
                if mask & MS_FLAG != 0 {
                    self.ms = v;
                }
                if mask & XS_FLAG != 0 {
                    self.xs = v;
                    if value {
                        self.narrow_index();
                    }
                }
            }
            None => {
                if mask & MS_FLAG != 0 {
                    self.ms = None;
                }
                if mask & XS_FLAG != 0 {
                    self.xs = None;
                    self.x = None;
                    self.y = None;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // N/Z combinators

    /// 8-bit result.
    pub fn set_nz8(&mut self, value: Option<u8>) {
        self.z = value.map(|v| v == 0);
        self.n = value.map(|v| v & 0x80 != 0);
    }

    /// 16-bit result given as separately-known halves.
    pub fn set_nz16(&mut self, lo: Option<u8>, hi: Option<u8>) {
        self.n = hi.map(|h| h & 0x80 != 0);
        self.z = match (lo, hi) {
            (Some(l), _) if l != 0 => Some(false),
            (_, Some(h)) if h != 0 => Some(false),
            (Some(0), Some(0)) => Some(true),
            _ => None,
        };
    }

    /// Result of unknown width: keep whatever both widths agree on.
    pub fn set_nz_unknown_width(&mut self, lo: Option<u8>, hi: Option<u8>) {
        self.n = match (lo, hi) {
            (Some(l), Some(h)) if (l & 0x80 != 0) == (h & 0x80 != 0) => Some(l & 0x80 != 0),
            _ => None,
        };
        self.z = match (lo, hi) {
            (Some(l), _) if l != 0 => Some(false),
            (Some(0), Some(0)) => Some(true),
            _ => None,
        };
    }

    /// N/Z at the accumulator width.
    pub fn set_nz_acc(&mut self, lo: Option<u8>, hi: Option<u8>) {
        match self.ms {
            Some(true) => self.set_nz8(lo),
            Some(false) => self.set_nz16(lo, hi),
            None => self.set_nz_unknown_width(lo, hi),
        }
    }

    /// N/Z at the index width.
    pub fn set_nz_index(&mut self, value: Option<u16>) {
        let lo = value.map(|v| v as u8);
        let hi = value.map(|v| (v >> 8) as u8);
        match self.xs {
            Some(true) => self.set_nz8(lo),
            Some(false) => self.set_nz16(lo, hi),
            None => self.set_nz_unknown_width(lo, hi),
        }
    }

    // ---------------------------------------------------------------------
    // Stack arithmetic

    /// Address a push lands at; decrements SP afterwards. 6502-era opcodes
    /// wrap inside page 1 in emulation mode, 65C816-era ones borrow into SH.
    pub fn push_addr(&mut self, newop: bool) -> Option<u32> {
        let addr = self.sp_ea();
        self.stack_dec(newop);
        addr
    }

    /// Address a pull comes from: increments SP first.
    pub fn pull_addr(&mut self, newop: bool) -> Option<u32> {
        self.stack_inc(newop);
        self.sp_ea()
    }

    fn stack_pinned(&self, newop: bool) -> Option<bool> {
        if newop {
            return Some(false);
        }
        self.e
    }

    fn stack_dec(&mut self, newop: bool) {
        let pinned = self.stack_pinned(newop);
        match self.sl {
            Some(0x00) => {
                self.sl = Some(0xFF);
                match pinned {
                    Some(true) => {}
                    Some(false) => self.sh = self.sh.map(|h| h.wrapping_sub(1)),
                    None => self.sh = None,
                }
            }
            Some(v) => self.sl = Some(v - 1),
            None => {
                // A borrow may or may not have happened.
                if pinned != Some(true) {
                    self.sh = None;
                }
            }
        }
    }

    fn stack_inc(&mut self, newop: bool) {
        let pinned = self.stack_pinned(newop);
        match self.sl {
            Some(0xFF) => {
                self.sl = Some(0x00);
                match pinned {
                    Some(true) => {}
                    Some(false) => self.sh = self.sh.map(|h| h.wrapping_add(1)),
                    None => self.sh = None,
                }
            }
            Some(v) => self.sl = Some(v + 1),
            None => {
                if pinned != Some(true) {
                    self.sh = None;
                }
            }
        }
    }
}

fn hex2(v: Option<u8>) -> String {
    match v {
        Some(v) => format!("{v:02X}"),
        None => "??".into(),
    }
}

fn hex4(v: Option<u16>) -> String {
    match v {
        Some(v) => format!("{v:04X}"),
        None => "????".into(),
    }
}

fn flag(v: Option<bool>) -> char {
    match v {
        Some(true) => '1',
        Some(false) => '0',
        None => '?',
    }
}

impl fmt::Display for Registers {
    /// The fixed-width state dump. 16-bit composites print high byte first,
    /// so `A=` shows B then A, matching `SP=` showing SH then SL.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "A={}{} X={} Y={} SP={}{} N={} V={} M={} X={} D={} I={} Z={} C={} E={} PB={} DB={} DP={}",
            hex2(self.b),
            hex2(self.a),
            hex4(self.x),
            hex4(self.y),
            hex2(self.sh),
            hex2(self.sl),
            flag(self.n),
            flag(self.v),
            flag(self.ms),
            flag(self.xs),
            flag(self.d),
            flag(self.i),
            flag(self.z),
            flag(self.c),
            flag(self.e),
            hex2(self.pb),
            hex2(self.db),
            hex4(self.dp),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unknown() -> Registers {
        Registers::new(&InitialState::new())
    }

    #[test]
    fn emulation_mode_forces_widths_and_stack_page() {
        let mut regs = unknown();
        regs.x = Some(0x1234);
        regs.observe_e(true);
        assert_eq!(regs.ms, Some(true));
        assert_eq!(regs.xs, Some(true));
        assert_eq!(regs.sh, Some(0x01));
        assert_eq!(regs.x, Some(0x0034));
        assert!(!regs.take_fail());
    }

    #[test]
    fn e_pin_disagreement_fails_and_corrects() {
        let mut regs = unknown();
        regs.observe_e(false);
        regs.observe_e(true);
        assert!(regs.take_fail());
        assert_eq!(regs.e, Some(true));
    }

    #[test]
    fn sixteen_bit_width_implies_native_mode() {
        let mut regs = unknown();
        regs.observe_ms(false);
        assert_eq!(regs.e, Some(false));
    }

    #[test]
    fn nz_narrow_inference_with_unknown_width() {
        let mut regs = unknown();
        // Non-zero low byte clears Z at either width.
        regs.set_nz_unknown_width(Some(0x42), None);
        assert_eq!(regs.z, Some(false));
        assert_eq!(regs.n, None);
        // All-zero value is zero at either width.
        regs.set_nz_unknown_width(Some(0), Some(0));
        assert_eq!(regs.z, Some(true));
        assert_eq!(regs.n, Some(false));
        // Zero low byte alone decides nothing.
        regs.set_nz_unknown_width(Some(0), Some(0x80));
        assert_eq!(regs.z, None);
        assert_eq!(regs.n, None);
    }

    #[test]
    fn p_byte_round_trip_in_emulation_mode() {
        let mut regs = unknown();
        regs.observe_e(true);
        regs.observe_p(0x34);
        assert_eq!(regs.i, Some(true));
        assert_eq!(regs.c, Some(false));
        // Widths stay 8-bit no matter what bits 5:4 said.
        regs.observe_p(0x04);
        assert_eq!(regs.ms, Some(true));
        assert_eq!(regs.xs, Some(true));
        assert_eq!(regs.p_byte(), Some(0x36));
    }

    #[test]
    fn p_byte_mismatch_sets_failure() {
        let mut regs = unknown();
        regs.c = Some(true);
        regs.observe_p(0x00);
        assert!(regs.take_fail());
        assert_eq!(regs.c, Some(false));
    }

    #[test]
    fn rep_sep_width_bits_ignored_in_emulation() {
        let mut regs = unknown();
        regs.observe_e(true);
        regs.apply_rep(0x30);
        assert_eq!(regs.ms, Some(true));
        assert_eq!(regs.xs, Some(true));

        let mut regs = unknown();
        regs.observe_e(false);
        regs.ms = Some(true);
        regs.xs = Some(true);
        regs.apply_rep(0x30);
        assert_eq!(regs.ms, Some(false));
        assert_eq!(regs.xs, Some(false));
    }

    #[test]
    fn legacy_stack_push_wraps_inside_page_1() {
        let mut regs = unknown();
        regs.observe_e(true);
        regs.sl = Some(0x00);
        let addr = regs.push_addr(false);
        assert_eq!(addr, Some(0x0100));
        assert_eq!(regs.sl, Some(0xFF));
        assert_eq!(regs.sh, Some(0x01));
    }

    #[test]
    fn newop_stack_push_borrows_out_of_page_1() {
        let mut regs = unknown();
        regs.observe_e(true);
        regs.sl = Some(0x00);
        regs.push_addr(true);
        assert_eq!(regs.sl, Some(0xFF));
        assert_eq!(regs.sh, Some(0x00));
    }

    #[test]
    fn state_string_renders_unknowns() {
        let regs = unknown();
        assert_eq!(
            regs.to_string(),
            "A=???? X=???? Y=???? SP=???? N=? V=? M=? X=? D=? I=? Z=? C=? E=? PB=?? DB=?? DP=????"
        );
    }

    #[test]
    fn state_string_prints_high_bytes_first() {
        let mut regs = Registers::new(&InitialState::new().e(true).sp(0x01FD));
        regs.a = Some(0x34);
        regs.b = Some(0x12);
        assert!(regs.to_string().starts_with("A=1234"));
        assert!(regs.to_string().contains("SP=01FD"));
    }
}
