//! Interrupt recognition and the interrupt/reset entry sequences.

use crate::{
    analyzer::Analyzer,
    instruction::Instruction,
    registers::Registers,
    sample::Sample,
    AccessKind, BusModel,
};

/// Does this sample window look like a hardware-interrupt entry sequence?
///
/// With the R/W line captured, an interrupt is the only thing that produces
/// three consecutive writes in cycles 2..4 (the PC/P pushes), unless the
/// opcode is BRK or COP, which push the same shape as real instructions.
/// Without R/W, fall back to matching the data: cycles 2 and 3 must echo the
/// tracked PC, and cycle 4 must look like a P byte with the unused bit set,
/// B clear, and no disagreement with the tracked flags.
pub fn match_interrupt(regs: &Registers, samples: &[Sample]) -> bool {
    if samples.len() < 7 {
        return false;
    }
    let opcode = samples[0].data;
    if opcode == 0x00 || opcode == 0x02 {
        return false;
    }

    if samples[2..=4].iter().all(|s| s.rnw.is_some()) {
        return samples[2..=4].iter().all(|s| s.rnw == Some(false));
    }

    let Some(pc) = regs.pc else {
        return false;
    };
    let p = samples[4].data;
    samples[2].data == (pc >> 8) as u8
        && samples[3].data == pc as u8
        && p & 0x30 == 0x20
        && regs.p_agrees(p)
}

impl<M: BusModel> Analyzer<M> {
    /// Decodes a recognized hardware-interrupt entry.
    pub fn interrupt(&mut self, samples: &[Sample]) -> Instruction {
        let opcode = samples.first().map(|s| s.data).unwrap_or(0);
        let instr = Instruction::new(opcode, &[], self.regs.pc, self.regs.pb);
        self.interrupt_sequence(samples, 0, false);
        instr
    }

    /// The common entry sequence, shared with BRK/COP. `pc_offset` is how
    /// far past the opcode the pushed return address points (2 for BRK/COP,
    /// 0 for a hardware interrupt).
    pub(crate) fn interrupt_sequence(&mut self, samples: &[Sample], pc_offset: u16, newop: bool) {
        let n = samples.len();

        // Native mode pushes one byte more; the sequence length reveals the
        // mode when the tracker does not know it.
        let native = match self.regs.e {
            Some(e) => !e,
            None => n >= 8,
        };
        if self.regs.e.is_none() {
            self.regs.observe_e(!native);
        }

        let (pb_at, pch_at, pcl_at, p_at) = if native { (Some(2), 3, 4, 5) } else { (None, 2, 3, 4) };

        if let Some(pb_at) = pb_at {
            if let (Some(pb), Some(s)) = (self.regs.pb, samples.get(pb_at)) {
                if pb != s.data {
                    self.flag_mismatch(&format!(
                        "interrupt pushed PB {:02X} but the model tracks {:02X}",
                        s.data, pb
                    ));
                }
            }
        }
        if let (Some(pc), Some(h), Some(l)) = (self.regs.pc, samples.get(pch_at), samples.get(pcl_at)) {
            let pushed = u16::from_le_bytes([l.data, h.data]);
            if pc.wrapping_add(pc_offset) != pushed {
                self.flag_mismatch(&format!(
                    "interrupt pushed PC {:04X} but the model tracks {:04X}",
                    pushed,
                    pc.wrapping_add(pc_offset)
                ));
            }
        }

        let pushes = pb_at.into_iter().chain([pch_at, pcl_at, p_at]);
        for at in pushes {
            if let Some(s) = samples.get(at) {
                if let Some(addr) = self.regs.push_addr(newop) {
                    self.bus.write(s.data, addr, AccessKind::Stack);
                }
            }
        }

        if let Some(p) = samples.get(p_at) {
            self.regs.observe_p(p.data);
        }

        self.regs.i = Some(true);
        self.regs.d = Some(false);
        self.regs.pb = Some(0);

        // The handler address read from the vector in the final two cycles.
        // Which vector it was is not observable on a data-only capture, so no
        // memory event is issued for it.
        self.regs.pc = match (samples.get(n.wrapping_sub(2)), samples.get(n.wrapping_sub(1))) {
            (Some(l), Some(h)) => Some(u16::from_le_bytes([l.data, h.data])),
            _ => None,
        };
    }

    /// A reset wipes almost everything and drops the CPU into emulation
    /// mode; the new PC is read from the vector in the last two cycles.
    pub fn reset(&mut self, samples: &[Sample]) -> Instruction {
        let opcode = samples.first().map(|s| s.data).unwrap_or(0);
        let instr = Instruction::new(opcode, &[], self.regs.pc, self.regs.pb);

        let regs = &mut self.regs;
        regs.a = None;
        regs.b = None;
        regs.x = None;
        regs.y = None;
        regs.sl = None;
        regs.sh = None;
        regs.n = None;
        regs.v = None;
        regs.c = None;
        regs.z = None;
        regs.i = Some(true);
        regs.d = Some(false);
        regs.dp = Some(0);
        regs.pb = Some(0);
        regs.db = Some(0);
        regs.enter_emulation();

        let n = samples.len();
        regs.pc = match (samples.get(n.wrapping_sub(2)), samples.get(n.wrapping_sub(1))) {
            (Some(l), Some(h)) => Some(u16::from_le_bytes([l.data, h.data])),
            _ => None,
        };
        instr
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InitialState;

    fn regs_with_pc(pc: u16) -> Registers {
        let mut regs = Registers::new(&InitialState::new().e(true));
        regs.pc = Some(pc);
        regs
    }

    fn data(bytes: &[u8]) -> Vec<Sample> {
        bytes.iter().map(|&b| Sample::data(b)).collect()
    }

    #[test]
    fn recognizes_by_rnw_writes() {
        let mut samples = data(&[0xA9, 0x00, 0x12, 0x34, 0x30, 0x00, 0x00]);
        for (i, s) in samples.iter_mut().enumerate() {
            s.rnw = Some(!(2..=4).contains(&i));
        }
        let regs = Registers::new(&InitialState::new());
        assert!(match_interrupt(&regs, &samples));
        // BRK pushes the same shape but is a real instruction.
        samples[0].data = 0x00;
        assert!(!match_interrupt(&regs, &samples));
    }

    #[test]
    fn recognizes_by_data_when_rnw_is_missing() {
        let regs = regs_with_pc(0x1234);
        // Cycle 4 is a plausible P byte: unused=1, B=0.
        let samples = data(&[0xA9, 0x00, 0x12, 0x34, 0x24, 0x00, 0x80]);
        assert!(match_interrupt(&regs, &samples));
        // B set means a BRK-style push, not a hardware interrupt.
        let samples = data(&[0xA9, 0x00, 0x12, 0x34, 0x34, 0x00, 0x80]);
        assert!(!match_interrupt(&regs, &samples));
        // PC mismatch.
        let samples = data(&[0xA9, 0x00, 0x12, 0x35, 0x24, 0x00, 0x80]);
        assert!(!match_interrupt(&regs, &samples));
    }

    #[test]
    fn data_match_requires_flag_agreement() {
        let mut regs = regs_with_pc(0x1234);
        regs.c = Some(true);
        // P byte with C clear contradicts the tracker.
        let samples = data(&[0xA9, 0x00, 0x12, 0x34, 0x24, 0x00, 0x80]);
        assert!(!match_interrupt(&regs, &samples));
        let samples = data(&[0xA9, 0x00, 0x12, 0x34, 0x25, 0x00, 0x80]);
        assert!(match_interrupt(&regs, &samples));
    }
}
