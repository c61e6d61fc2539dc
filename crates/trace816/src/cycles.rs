//! Predicts how many bus cycles an opcode will take, given the tracked
//! register state and the operand bytes already visible in the sample queue.
//!
//! The prediction is only as good as the tracker: anything that hinges on an
//! unknown flag or register comes back as [`CycleCount::Unknown`] rather
//! than a guess.

use crate::{
    addressing::AddressingMode,
    opcodes::{has_branch_timing, Mnemonic, OpKind, OPCODES},
    registers::Registers,
    sample::{Sample, SampleType},
};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CycleCount {
    Known(u32),
    Unknown,
}

use CycleCount::*;

/// Accumulator width with the E=1 forcing folded in; `None` when neither E
/// nor MS pins it down.
fn acc_is_8bit(regs: &Registers) -> Option<bool> {
    match (regs.e, regs.ms) {
        (Some(true), _) => Some(true),
        (_, Some(w)) => Some(w),
        _ => None,
    }
}

fn index_is_8bit(regs: &Registers) -> Option<bool> {
    match (regs.e, regs.xs) {
        (Some(true), _) => Some(true),
        (_, Some(w)) => Some(w),
        _ => None,
    }
}

/// Will this branch be taken? Decidable from one flag, or always for BRA.
pub fn branch_taken(opcode: u8, regs: &Registers) -> Option<bool> {
    match opcode {
        0x80 => Some(true),
        0x10 => regs.n.map(|n| !n),
        0x30 => regs.n,
        0x50 => regs.v.map(|v| !v),
        0x70 => regs.v,
        0x90 => regs.c.map(|c| !c),
        0xB0 => regs.c,
        0xD0 => regs.z.map(|z| !z),
        0xF0 => regs.z,
        _ => None,
    }
}

fn branch_crosses_page(regs: &Registers, samples: &[Sample]) -> Option<bool> {
    let pc = regs.pc?;
    let disp = samples.get(1)?.data as i8 as i16;
    let next = pc.wrapping_add(2);
    let target = next.wrapping_add(disp as u16);
    Some(next & 0xFF00 != target & 0xFF00)
}

fn predict_branch(opcode: u8, regs: &Registers, samples: &[Sample]) -> CycleCount {
    match branch_taken(opcode, regs) {
        None => Unknown,
        Some(false) => Known(2),
        Some(true) => match (regs.e, branch_crosses_page(regs, samples)) {
            // The taken-and-crossed penalty only exists in emulation mode.
            (Some(false), _) => Known(3),
            (_, Some(false)) => Known(3),
            (Some(true), Some(true)) => Known(4),
            _ => Unknown,
        },
    }
}

/// Page-cross test for `base + index`; works for both index widths.
fn crosses(base: u16, index: u16) -> bool {
    (base as u32 + index as u32) >> 8 != (base as u32) >> 8
}

/// +1 for an `a,x` / `a,y` read crossing a page; always +1 with a 16-bit
/// index.
fn abs_indexed_penalty(regs: &Registers, samples: &[Sample], use_x: bool) -> Option<u32> {
    match index_is_8bit(regs) {
        Some(false) => Some(1),
        Some(true) => {
            let index = if use_x { regs.x } else { regs.y }?;
            let lo = samples.get(1)?.data;
            let hi = samples.get(2)?.data;
            let base = u16::from_le_bytes([lo, hi]);
            Some(crosses(base, index & 0x00FF) as u32)
        }
        None => None,
    }
}

/// +1 for a `(d),y` read whose `base + Y` step crosses a page. The base is
/// the pointer already visible on the bus.
fn dp_indirect_y_penalty(regs: &Registers, samples: &[Sample], dpa: usize) -> Option<u32> {
    let y = regs.y?;
    let lo = samples.get(2 + dpa)?.data;
    let hi = samples.get(3 + dpa)?.data;
    let base = u16::from_le_bytes([lo, hi]);
    let y = match index_is_8bit(regs)? {
        true => y & 0x00FF,
        false => y,
    };
    Some(crosses(base, y) as u32)
}

/// Predicts the cycle count of the instruction starting at `samples[0]`.
pub fn predict(regs: &Registers, samples: &[Sample]) -> CycleCount {
    let opcode = match samples.first() {
        Some(s) => s.data,
        None => return Unknown,
    };
    let entry = &OPCODES[opcode as usize];

    if has_branch_timing(opcode) {
        return predict_branch(opcode, regs, samples);
    }

    let mut cycles = entry.base_cycles as u32;

    let m_extra = entry.m_extra() as u32;
    if m_extra != 0 {
        match acc_is_8bit(regs) {
            Some(true) => {}
            Some(false) => cycles += m_extra,
            None => return Unknown,
        }
    }

    let x_extra = entry.x_extra() as u32;
    if x_extra != 0 {
        match index_is_8bit(regs) {
            Some(true) => {}
            Some(false) => cycles += x_extra,
            None => return Unknown,
        }
    }

    // The stack layout of the entry/return sequences grows by one in native
    // mode.
    if matches!(entry.mnemonic, Mnemonic::RTI | Mnemonic::BRK | Mnemonic::COP) {
        match regs.e {
            Some(false) => cycles += 1,
            Some(true) => {}
            None => return Unknown,
        }
    }

    let mut dpa = 0usize;
    if entry.mode.uses_direct_page() {
        match regs.dp {
            Some(dp) if dp & 0x00FF != 0 => {
                cycles += 1;
                dpa = 1;
            }
            Some(_) => {}
            None => return Unknown,
        }
    }

    if entry.kind == OpKind::Read {
        let penalty = match entry.mode {
            AddressingMode::AddressXIndex => abs_indexed_penalty(regs, samples, true),
            AddressingMode::AddressYIndex => abs_indexed_penalty(regs, samples, false),
            AddressingMode::DirectPageIndirectYIndex => dp_indirect_y_penalty(regs, samples, dpa),
            _ => Some(0),
        };
        match penalty {
            Some(p) => cycles += p,
            None => return Unknown,
        }
    }

    Known(cycles)
}

/// How many samples does the instruction at `samples[0]` consume?
///
/// With a sync hint in the queue the hint is ground truth and a disagreeing
/// prediction is logged. Without one the prediction is used directly, or a
/// single cycle when nothing can be predicted.
pub fn count_cycles(regs: &Registers, samples: &[Sample], intr_seen: bool) -> usize {
    let predicted = if intr_seen {
        match regs.e {
            Some(false) => Known(8),
            Some(true) => Known(7),
            None => Unknown,
        }
    } else {
        predict(regs, samples)
    };

    let boundary = samples.iter().enumerate().skip(1).find_map(|(i, s)| match s.stype {
        SampleType::Opcode => Some(i),
        SampleType::Last => Some(i + 1),
        _ => None,
    });
    if let Some(n) = boundary {
        if let Known(p) = predicted {
            if p as usize != n {
                log::warn!(
                    "predicted {} cycles for opcode {:02X} but sync hint says {}",
                    p,
                    samples[0].data,
                    n
                );
            }
        }
        return n;
    }

    match predicted {
        Known(p) => p as usize,
        Unknown if intr_seen => 7,
        Unknown => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialState;

    fn stream(bytes: &[u8]) -> Vec<Sample> {
        bytes.iter().map(|&b| Sample::data(b)).collect()
    }

    fn emulation() -> Registers {
        Registers::new(&InitialState::new().e(true).dp(0))
    }

    #[test]
    fn taken_bra_is_three_cycles() {
        let mut regs = emulation();
        regs.pc = Some(0x2000);
        // BRA $FE: the infinite loop; target page equals the fall-through page.
        assert_eq!(predict(&regs, &stream(&[0x80, 0xFE])), Known(3));
    }

    #[test]
    fn taken_bra_crossing_a_page_in_emulation_is_four() {
        let mut regs = emulation();
        regs.pc = Some(0x20FD);
        // Fall-through is $20FF; +$10 lands in the next page.
        assert_eq!(predict(&regs, &stream(&[0x80, 0x10])), Known(4));
        regs.leave_emulation();
        assert_eq!(predict(&regs, &stream(&[0x80, 0x10])), Known(3));
    }

    #[test]
    fn branch_on_unknown_flag_is_unknown() {
        let regs = emulation();
        assert_eq!(predict(&regs, &stream(&[0xD0, 0x02])), Unknown);
        let mut regs = emulation();
        regs.z = Some(true);
        // BNE not taken.
        assert_eq!(predict(&regs, &stream(&[0xD0, 0x02])), Known(2));
    }

    #[test]
    fn dp_indirect_y_counts_the_page_cross() {
        let mut regs = emulation();
        regs.y = Some(0x20);
        // LDA ($10),Y; pointer bytes on the bus say $10F0.
        let samples = stream(&[0xB1, 0x10, 0xF0, 0x10, 0x00]);
        assert_eq!(predict(&regs, &samples), Known(6));
        // Pointer $1000: no cross.
        let samples = stream(&[0xB1, 0x10, 0x00, 0x10, 0x00]);
        assert_eq!(predict(&regs, &samples), Known(5));
        regs.y = None;
        assert_eq!(predict(&regs, &samples), Unknown);
    }

    #[test]
    fn sixteen_bit_index_always_pays_the_abs_indexed_penalty() {
        let mut regs = Registers::new(&InitialState::new().e(false).xs(false).ms(true));
        regs.x = Some(0x0001);
        assert_eq!(predict(&regs, &stream(&[0xBD, 0x00, 0x10])), Known(5));
    }

    #[test]
    fn immediate_width_follows_ms() {
        let regs = Registers::new(&InitialState::new());
        assert_eq!(predict(&regs, &stream(&[0xA9, 0x42])), Unknown);
        let regs = emulation();
        assert_eq!(predict(&regs, &stream(&[0xA9, 0x42])), Known(2));
        let regs = Registers::new(&InitialState::new().e(false).ms(false));
        assert_eq!(predict(&regs, &stream(&[0xA9, 0x34, 0x12])), Known(3));
    }

    #[test]
    fn misaligned_dp_costs_a_cycle() {
        let regs = Registers::new(&InitialState::new().e(true).dp(0x0001));
        assert_eq!(predict(&regs, &stream(&[0xA5, 0x10])), Known(4));
        let regs = Registers::new(&InitialState::new().e(true));
        assert_eq!(predict(&regs, &stream(&[0xA5, 0x10])), Unknown);
    }

    #[test]
    fn rti_takes_an_extra_cycle_in_native_mode() {
        let regs = emulation();
        assert_eq!(predict(&regs, &stream(&[0x40])), Known(6));
        let regs = Registers::new(&InitialState::new().e(false));
        assert_eq!(predict(&regs, &stream(&[0x40])), Known(7));
    }

    #[test]
    fn rmw_and_write_indexed_modes_never_pay_the_cross_penalty() {
        let mut regs = emulation();
        regs.x = Some(0xFF);
        // ASL $10F0,X crosses but is a fixed 7.
        assert_eq!(predict(&regs, &stream(&[0x1E, 0xF0, 0x10])), Known(7));
        // STA $10F0,X crosses but is a fixed 5.
        assert_eq!(predict(&regs, &stream(&[0x9D, 0xF0, 0x10])), Known(5));
    }

    #[test]
    fn sync_hint_wins_over_the_prediction() {
        use crate::sample::SampleType;
        let regs = Registers::new(&InitialState::new());
        let mut samples = stream(&[0xA9, 0x42, 0xEA]);
        samples[2].stype = SampleType::Opcode;
        assert_eq!(count_cycles(&regs, &samples, false), 2);
        // A trailing LAST marker closes the instruction inclusively.
        let mut samples = stream(&[0xA9, 0x42]);
        samples[1].stype = SampleType::Last;
        assert_eq!(count_cycles(&regs, &samples, false), 2);
    }

    #[test]
    fn unknown_prediction_without_hint_consumes_one_sample() {
        let regs = Registers::new(&InitialState::new());
        assert_eq!(count_cycles(&regs, &stream(&[0xA9, 0x42]), false), 1);
    }
}
