//! The symbolic executor: consumes one instruction's worth of samples,
//! derives operands and effective addresses from the tracked state, feeds
//! every memory access to the bus model, and hands the operation to its
//! per-opcode hook.

use smallvec::SmallVec;

use crate::{
    addressing::AddressingMode::*,
    config::{ConfigError, InitialState},
    cycles::{self, branch_taken, CycleCount},
    instruction::Instruction,
    interrupt,
    opcodes::{has_branch_timing, Mnemonic, OpKind, Opcode, OPCODES},
    registers::Registers,
    sample::Sample,
    AccessKind, BusModel,
};

pub struct Analyzer<M: BusModel> {
    pub regs: Registers,
    pub bus: M,
    pub(crate) fail: bool,
}

/// Everything a per-opcode hook gets to see about the current instruction.
pub(crate) struct ExecCtx<'a> {
    pub samples: &'a [Sample],
    pub entry: &'static Opcode,
    pub instr: &'a Instruction,
    /// The value the operation consumes, when its bus position is known.
    pub lo: Option<u8>,
    pub hi: Option<u8>,
    /// Branch decision derived from the consumed cycle count.
    pub taken: Option<bool>,
    pub ea: Option<u32>,
    /// Observed write-back bytes for Write/Rmw operations.
    pub wlo: Option<u8>,
    pub whi: Option<u8>,
}

/// Indirect-pointer bytes observed on the bus.
#[derive(Default)]
pub(crate) struct PointerBytes {
    pub lo: Option<u8>,
    pub hi: Option<u8>,
    pub bank: Option<u8>,
}

impl PointerBytes {
    fn word(&self) -> Option<u16> {
        Some(u16::from_le_bytes([self.lo?, self.hi?]))
    }

    fn long(&self) -> Option<u32> {
        Some(u32::from_le_bytes([self.lo?, self.hi?, self.bank?, 0]))
    }
}

#[derive(Copy, Clone)]
pub(crate) enum Index {
    X,
    Y,
}

impl<M: BusModel> Analyzer<M> {
    pub fn new(init: InitialState, bus: M) -> Result<Self, ConfigError> {
        init.validate()?;
        Ok(Analyzer { regs: Registers::new(&init), bus, fail: false })
    }

    // ---------------------------------------------------------------------
    // Dispatch contract

    pub fn pc(&self) -> Option<u16> {
        self.regs.pc
    }

    pub fn pb(&self) -> Option<u8> {
        self.regs.pb
    }

    pub fn read_memory(&self, addr: u32) -> Option<u8> {
        self.bus.peek(addr)
    }

    pub fn state_string(&self) -> String {
        self.regs.to_string()
    }

    pub fn disassemble(&self, instr: &Instruction) -> String {
        instr.disassemble()
    }

    /// Returns and clears the combined failure flag.
    pub fn get_and_clear_fail(&mut self) -> bool {
        let own = std::mem::take(&mut self.fail);
        let regs = self.regs.take_fail();
        let bus = self.bus.take_failure();
        own | regs | bus
    }

    pub fn count_cycles(&self, samples: &[Sample], intr_seen: bool) -> usize {
        cycles::count_cycles(&self.regs, samples, intr_seen)
    }

    pub fn match_interrupt(&self, samples: &[Sample]) -> bool {
        interrupt::match_interrupt(&self.regs, samples)
    }

    pub(crate) fn flag_mismatch(&mut self, what: &str) {
        log::warn!("{what}");
        self.fail = true;
    }

    // ---------------------------------------------------------------------
    // The executor

    pub fn emulate(&mut self, samples: &[Sample]) -> Instruction {
        let Some(first) = samples.first() else {
            return Instruction::new(0xEA, &[], self.regs.pc, self.regs.pb);
        };
        let opcode = first.data;
        let entry = &OPCODES[opcode as usize];

        if let Some(pin) = first.e {
            self.regs.observe_e(pin);
        }

        self.infer_widths(entry, samples);

        let instr = self.collect_operands(opcode, entry, samples);
        self.issue_fetch_events(&instr);

        let ptr = self.pointer_reads(entry, &instr, samples);
        let ea = self.effective_address(entry, &instr, &ptr);

        let taken = if entry.kind == OpKind::Branch {
            self.branch_decision(opcode, samples.len())
        } else {
            None
        };

        let width8 = self.data_width8(entry);
        let (lo, hi) = self.extract_operand(entry, &instr, samples, width8);
        let (wlo, whi) = self.extract_writeback(entry, samples, width8);

        self.issue_data_reads(entry, samples, ea, width8);

        let ctx = ExecCtx { samples, entry, instr: &instr, lo, hi, taken, ea, wlo, whi };
        let expected = self.execute_op(&ctx);
        self.verify_writeback(&ctx, expected, width8);
        self.update_pc(&ctx);

        instr
    }

    /// When the width is unknown and the instruction pays an MS/XS cycle
    /// penalty, the consumed cycle count reveals the width: more cycles than
    /// the 8-bit prediction means the 16-bit path was taken.
    fn infer_widths(&mut self, entry: &'static Opcode, samples: &[Sample]) {
        let n = samples.len() as u32;
        if n < 2 {
            // A fallback single-cycle consumption reveals nothing.
            return;
        }
        if entry.m_extra() > 0 && self.regs.ms.is_none() {
            let mut probe = self.regs.clone();
            probe.ms = Some(true);
            if let CycleCount::Known(c8) = cycles::predict(&probe, samples) {
                self.regs.observe_ms(n <= c8);
            }
        }
        if entry.x_extra() > 0 && self.regs.xs.is_none() {
            let mut probe = self.regs.clone();
            probe.xs = Some(true);
            if let CycleCount::Known(c8) = cycles::predict(&probe, samples) {
                self.regs.observe_xs(n <= c8);
            }
        }
    }

    fn collect_operands(&self, opcode: u8, entry: &'static Opcode, samples: &[Sample]) -> Instruction {
        let mut operands: SmallVec<[u8; 3]> = SmallVec::new();
        // Two opcodes interleave operand fetches with stack pushes.
        let positions: SmallVec<[usize; 3]> = match opcode {
            0xFC => SmallVec::from_slice(&[1, 4]),          // JSR (a,x)
            0x22 => SmallVec::from_slice(&[1, 2, 5]),       // JSL
            _ => (1..=entry.mode.operands_size(self.regs.ms, self.regs.xs)).collect(),
        };
        for pos in positions {
            if let Some(s) = samples.get(pos) {
                operands.push(s.data);
            }
        }
        Instruction { opcode, operands, pc: self.regs.pc, pb: self.regs.pb }
    }

    fn issue_fetch_events(&mut self, instr: &Instruction) {
        let (Some(pb), Some(pc)) = (self.regs.pb, self.regs.pc) else {
            return;
        };
        let bank = (pb as u32) << 16;
        self.bus.read(instr.opcode, bank | pc as u32, AccessKind::Fetch);
        for (i, &byte) in instr.operands.iter().enumerate() {
            let addr = bank | pc.wrapping_add(1 + i as u16) as u32;
            self.bus.read(byte, addr, AccessKind::Instr);
        }
    }

    /// Extra cycle from a misaligned direct page, which also shifts the
    /// pointer-read positions. `None` while DP is unknown.
    fn dp_extra(&self) -> Option<usize> {
        self.regs.dp.map(|dp| (dp & 0x00FF != 0) as usize)
    }

    /// Index register value as it takes part in address arithmetic (masked
    /// to its low byte at 8-bit width).
    pub(crate) fn index_value(&self, which: Index) -> Option<u16> {
        let raw = match which {
            Index::X => self.regs.x,
            Index::Y => self.regs.y,
        }?;
        match self.index_is_8bit()? {
            true => Some(raw & 0x00FF),
            false => Some(raw),
        }
    }

    fn index_is_8bit(&self) -> Option<bool> {
        match (self.regs.e, self.regs.xs) {
            (Some(true), _) => Some(true),
            (_, Some(w)) => Some(w),
            _ => None,
        }
    }

    // ---------------------------------------------------------------------
    // Pointer indirection

    /// Re-surfaces the bus cycles that carried an indirect pointer as
    /// `Pointer` reads of the pointer structure, and returns the observed
    /// bytes for effective-address computation.
    fn pointer_reads(
        &mut self,
        entry: &'static Opcode,
        instr: &Instruction,
        samples: &[Sample],
    ) -> PointerBytes {
        let n = samples.len();
        let mut ptr = PointerBytes::default();
        if !entry.mode.indirect() {
            return ptr;
        }

        let (first, count): (Option<usize>, usize) = match entry.mode {
            DirectPageIndirect | DirectPageIndirectYIndex => (self.dp_extra().map(|d| 2 + d), 2),
            DirectPageLongIndirect | DirectPageLongIndirectYIndex => (self.dp_extra().map(|d| 2 + d), 3),
            DirectPageXIndexIndirect => (self.dp_extra().map(|d| 3 + d), 2),
            DirectPageSIndexIndirectYIndex => (Some(3), 2),
            AddressIndirect => (Some(3), 2),
            AddressLongIndirect => (Some(3), 3),
            AddressXIndexIndirect => (n.checked_sub(2), 2),
            _ => (None, 0),
        };
        let Some(first) = first else {
            return ptr;
        };

        ptr.lo = samples.get(first).map(|s| s.data);
        ptr.hi = samples.get(first + 1).map(|s| s.data);
        if count == 3 {
            ptr.bank = samples.get(first + 2).map(|s| s.data);
        }

        if let Some(addrs) = self.pointer_addresses(entry, instr, count) {
            for (k, addr) in addrs.into_iter().enumerate() {
                if let Some(s) = samples.get(first + k) {
                    self.bus.read(s.data, addr, AccessKind::Pointer);
                }
            }
        }
        ptr
    }

    /// The bank-0 (or program-bank) addresses the pointer bytes were read
    /// from, honoring the emulation-mode page-wrap rules.
    fn pointer_addresses(
        &self,
        entry: &'static Opcode,
        instr: &Instruction,
        count: usize,
    ) -> Option<SmallVec<[u32; 3]>> {
        let op1 = instr.op1() as u16;
        let (base, page_wrap): (u32, bool) = match entry.mode {
            DirectPageIndirect
            | DirectPageIndirectYIndex
            | DirectPageLongIndirect
            | DirectPageLongIndirectYIndex => {
                let dp = self.regs.dp?;
                let wrap = self.regs.e? && dp & 0x00FF == 0 && !entry.newop;
                (dp.wrapping_add(op1) as u32, wrap)
            }
            DirectPageXIndexIndirect => {
                let dp = self.regs.dp?;
                let x = self.index_value(Index::X)?;
                if self.regs.e? {
                    if dp & 0x00FF == 0 && !entry.newop {
                        // Classic zero-page wrap of the whole pointer fetch.
                        let lo = dp | (op1.wrapping_add(x) & 0xFF);
                        (lo as u32, true)
                    } else {
                        // Quirk: the low byte is fetched without wrapping,
                        // the +1 stays inside that byte's page.
                        let lo = dp.wrapping_add(op1).wrapping_add(x);
                        (lo as u32, true)
                    }
                } else {
                    (dp.wrapping_add(op1).wrapping_add(x) as u32, false)
                }
            }
            DirectPageSIndexIndirectYIndex => {
                let sp = self.regs.sp()?;
                (sp.wrapping_add(op1) as u32, false)
            }
            AddressIndirect | AddressLongIndirect => (instr.op16() as u32, false),
            AddressXIndexIndirect => {
                let pb = self.regs.pb? as u32;
                let x = self.index_value(Index::X)?;
                ((pb << 16) | instr.op16().wrapping_add(x) as u32, false)
            }
            _ => return None,
        };

        let mut addrs = SmallVec::new();
        for k in 0..count as u32 {
            let addr = if page_wrap {
                (base & 0x00FF00) | (base.wrapping_add(k) & 0xFF)
            } else {
                (base & 0xFF0000) | ((base as u16).wrapping_add(k as u16) as u32)
            };
            addrs.push(addr);
        }
        Some(addrs)
    }

    // ---------------------------------------------------------------------
    // Effective address

    /// Direct-page data address in bank 0, with the legacy page wrap when it
    /// applies.
    fn dp_ea(&self, entry: &'static Opcode, offset: u8, index: Option<u16>) -> Option<u32> {
        let dp = self.regs.dp?;
        let index = index?;
        let offset = offset as u16;
        let flat = dp.wrapping_add(offset).wrapping_add(index);
        if dp & 0x00FF != 0 || entry.newop {
            return Some(flat as u32);
        }
        let wrapped = dp | (offset.wrapping_add(index) & 0xFF);
        match self.regs.e {
            Some(true) => Some(wrapped as u32),
            Some(false) => Some(flat as u32),
            None if wrapped == flat => Some(flat as u32),
            None => None,
        }
    }

    fn effective_address(
        &self,
        entry: &'static Opcode,
        instr: &Instruction,
        ptr: &PointerBytes,
    ) -> Option<u32> {
        let db = |regs: &Registers| regs.db.map(|db| (db as u32) << 16);
        match entry.mode {
            DirectPage => self.dp_ea(entry, instr.op1(), Some(0)),
            DirectPageXIndex => self.dp_ea(entry, instr.op1(), self.index_value(Index::X)),
            DirectPageYIndex => self.dp_ea(entry, instr.op1(), self.index_value(Index::Y)),
            DirectPageSIndex => {
                let sp = self.regs.sp()?;
                Some(sp.wrapping_add(instr.op1() as u16) as u32)
            }
            Address => Some(db(&self.regs)? | instr.op16() as u32),
            AddressXIndex => {
                let base = db(&self.regs)? | instr.op16() as u32;
                Some(base.wrapping_add(self.index_value(Index::X)? as u32) & 0xFF_FFFF)
            }
            AddressYIndex => {
                let base = db(&self.regs)? | instr.op16() as u32;
                Some(base.wrapping_add(self.index_value(Index::Y)? as u32) & 0xFF_FFFF)
            }
            Long => Some(instr.op24()),
            LongXIndex => {
                Some(instr.op24().wrapping_add(self.index_value(Index::X)? as u32) & 0xFF_FFFF)
            }
            DirectPageIndirect | DirectPageXIndexIndirect => Some(db(&self.regs)? | ptr.word()? as u32),
            DirectPageIndirectYIndex | DirectPageSIndexIndirectYIndex => {
                let base = db(&self.regs)? | ptr.word()? as u32;
                Some(base.wrapping_add(self.index_value(Index::Y)? as u32) & 0xFF_FFFF)
            }
            DirectPageLongIndirect => ptr.long(),
            DirectPageLongIndirectYIndex => {
                Some(ptr.long()?.wrapping_add(self.index_value(Index::Y)? as u32) & 0xFF_FFFF)
            }
            AddressIndirect | AddressXIndexIndirect => {
                Some(((self.regs.pb? as u32) << 16) | ptr.word()? as u32)
            }
            AddressLongIndirect => ptr.long(),
            Relative8 | Relative16 => {
                Some(((self.regs.pb? as u32) << 16) | instr.branch_target()? as u32)
            }
            // Block moves write at the destination bank indexed by Y.
            BlockMove => {
                let y = self.index_value(Index::Y)?;
                Some(((instr.op1() as u32) << 16) | y as u32)
            }
            Accumulator | Implied | Constant8 | ImmediateMFlagDependent | ImmediateXFlagDependent => None,
        }
    }

    // ---------------------------------------------------------------------
    // Operand and write-back extraction

    /// Width of the bytes this operation moves: index-sized operations
    /// follow XS, everything else MS.
    fn data_width8(&self, entry: &'static Opcode) -> Option<bool> {
        if entry.index_sized() {
            self.regs.xs
        } else {
            self.regs.ms
        }
    }

    fn tail(samples: &[Sample], back: usize) -> Option<u8> {
        samples.len().checked_sub(back).and_then(|i| samples.get(i)).map(|s| s.data)
    }

    fn extract_operand(
        &self,
        entry: &'static Opcode,
        instr: &Instruction,
        samples: &[Sample],
        width8: Option<bool>,
    ) -> (Option<u8>, Option<u8>) {
        match entry.kind {
            OpKind::Read => match entry.mode {
                Constant8 | ImmediateMFlagDependent | ImmediateXFlagDependent => {
                    let hi = (instr.operands.len() == 2).then(|| instr.op2());
                    (Some(instr.op1()), hi)
                }
                _ => match width8 {
                    Some(true) => (Self::tail(samples, 1), None),
                    Some(false) => (Self::tail(samples, 2), Self::tail(samples, 1)),
                    None => (None, None),
                },
            },
            OpKind::Rmw => match width8 {
                Some(true) => (Self::tail(samples, 3), None),
                Some(false) => (Self::tail(samples, 5), Self::tail(samples, 4)),
                None => (None, None),
            },
            _ => (None, None),
        }
    }

    fn extract_writeback(
        &self,
        entry: &'static Opcode,
        samples: &[Sample],
        width8: Option<bool>,
    ) -> (Option<u8>, Option<u8>) {
        match entry.kind {
            OpKind::Write => match width8 {
                Some(true) => (Self::tail(samples, 1), None),
                // Stores write low byte first.
                Some(false) => (Self::tail(samples, 2), Self::tail(samples, 1)),
                None => (None, None),
            },
            OpKind::Rmw => match width8 {
                Some(true) => (Self::tail(samples, 1), None),
                // Read-modify-write puts the high byte back first.
                Some(false) => (Self::tail(samples, 1), Self::tail(samples, 2)),
                None => (None, None),
            },
            _ => (None, None),
        }
    }

    /// Successor address for the second byte of a 16-bit access.
    fn next_ea(entry: &'static Opcode, ea: u32) -> u32 {
        if entry.mode.bank0_data() {
            (ea as u16).wrapping_add(1) as u32
        } else {
            ea.wrapping_add(1) & 0xFF_FFFF
        }
    }

    fn issue_data_reads(
        &mut self,
        entry: &'static Opcode,
        samples: &[Sample],
        ea: Option<u32>,
        width8: Option<bool>,
    ) {
        if !matches!(entry.kind, OpKind::Read | OpKind::Rmw) {
            return;
        }
        if matches!(entry.mode, Constant8 | ImmediateMFlagDependent | ImmediateXFlagDependent) {
            return;
        }
        let Some(ea) = ea else { return };
        let read = match entry.kind {
            OpKind::Read => (Self::tail(samples, 1), Self::tail(samples, 2)),
            _ => (Self::tail(samples, 3), Self::tail(samples, 5)),
        };
        match width8 {
            Some(true) => {
                if let Some(data) = read.0 {
                    self.bus.read(data, ea, AccessKind::Data);
                }
            }
            Some(false) => {
                // Low byte comes first on the bus.
                if let Some(data) = read.1 {
                    self.bus.read(data, ea, AccessKind::Data);
                }
                if let Some(data) = match entry.kind {
                    OpKind::Read => Self::tail(samples, 1),
                    _ => Self::tail(samples, 4),
                } {
                    self.bus.read(data, Self::next_ea(entry, ea), AccessKind::Data);
                }
            }
            None => {}
        }
    }

    fn verify_writeback(
        &mut self,
        ctx: &ExecCtx<'_>,
        expected: (Option<u8>, Option<u8>),
        width8: Option<bool>,
    ) {
        if !matches!(ctx.entry.kind, OpKind::Write | OpKind::Rmw) {
            return;
        }
        let Some(w8) = width8 else { return };
        if let (Some(exp), Some(obs)) = (expected.0, ctx.wlo) {
            if exp != obs {
                self.flag_mismatch(&format!(
                    "{} wrote {obs:02X} but the model expected {exp:02X}",
                    ctx.entry.mnemonic
                ));
            }
        }
        if !w8 {
            if let (Some(exp), Some(obs)) = (expected.1, ctx.whi) {
                if exp != obs {
                    self.flag_mismatch(&format!(
                        "{} wrote high byte {obs:02X} but the model expected {exp:02X}",
                        ctx.entry.mnemonic
                    ));
                }
            }
        }
        if let Some(ea) = ctx.ea {
            if let Some(lo) = ctx.wlo {
                self.bus.write(lo, ea, AccessKind::Data);
            }
            if !w8 {
                if let Some(hi) = ctx.whi {
                    self.bus.write(hi, Self::next_ea(ctx.entry, ea), AccessKind::Data);
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Control flow

    /// Branch decision: the consumed cycle count is ground truth, the
    /// deciding flag the fallback.
    fn branch_decision(&self, opcode: u8, n: usize) -> Option<bool> {
        if !has_branch_timing(opcode) {
            // BRL: always taken, fixed length.
            return Some(true);
        }
        match n {
            2 => Some(false),
            3 | 4 => Some(true),
            _ => branch_taken(opcode, &self.regs),
        }
    }

    fn update_pc(&mut self, ctx: &ExecCtx<'_>) {
        use Mnemonic::*;
        let len = ctx.instr.length() as u16;
        match ctx.entry.mnemonic {
            JMP | JSR => match ctx.entry.mode {
                Address => self.regs.pc = Some(ctx.instr.op16()),
                // The pointer read off the bus is the new PC.
                AddressIndirect | AddressXIndexIndirect => {
                    self.regs.pc = ctx.ea.map(|ea| ea as u16);
                }
                _ => {}
            },
            JML => match ctx.entry.mode {
                Long => {
                    self.regs.pc = Some(ctx.instr.op16());
                    self.regs.pb = Some(ctx.instr.op3());
                }
                AddressLongIndirect => {
                    self.regs.pc = ctx.ea.map(|ea| ea as u16);
                    self.regs.pb = ctx.ea.map(|ea| (ea >> 16) as u8);
                }
                _ => {}
            },
            JSL => {
                self.regs.pc = Some(ctx.instr.op16());
                self.regs.pb = Some(ctx.instr.op3());
            }
            // These set PC themselves from stack or counter state.
            RTS | RTL | RTI | BRK | COP | MVN | MVP => {}
            _ if ctx.entry.kind == OpKind::Branch => match ctx.taken {
                Some(true) => self.regs.pc = ctx.instr.branch_target(),
                Some(false) => self.regs.pc = self.regs.pc.map(|pc| pc.wrapping_add(len)),
                None => self.regs.pc = None,
            },
            _ => self.regs.pc = self.regs.pc.map(|pc| pc.wrapping_add(len)),
        }
    }
}
