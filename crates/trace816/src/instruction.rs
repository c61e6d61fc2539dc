use smallvec::SmallVec;

use crate::{
    addressing::AddressingMode::*,
    opcodes::{Opcode, OPCODES},
};

// -------------------------------------------------------------------------------------------------

/// One decoded instruction: the opcode byte, the operand bytes that followed
/// it, and where it was fetched from (when the program counter was known).
#[derive(Clone, Debug)]
pub struct Instruction {
    pub opcode: u8,
    pub operands: SmallVec<[u8; 3]>,
    pub pc: Option<u16>,
    pub pb: Option<u8>,
}

// -------------------------------------------------------------------------------------------------

impl Instruction {
    pub fn new(opcode: u8, operands: &[u8], pc: Option<u16>, pb: Option<u8>) -> Self {
        Instruction { opcode, operands: SmallVec::from_slice(operands), pc, pb }
    }

    pub fn entry(&self) -> &'static Opcode {
        &OPCODES[self.opcode as usize]
    }

    pub fn length(&self) -> usize {
        1 + self.operands.len()
    }

    pub fn op1(&self) -> u8 {
        self.operands.first().copied().unwrap_or(0)
    }

    pub fn op2(&self) -> u8 {
        self.operands.get(1).copied().unwrap_or(0)
    }

    pub fn op3(&self) -> u8 {
        self.operands.get(2).copied().unwrap_or(0)
    }

    /// First two operand bytes as a little-endian word.
    pub fn op16(&self) -> u16 {
        u16::from_le_bytes([self.op1(), self.op2()])
    }

    /// All three operand bytes as a little-endian 24-bit value.
    pub fn op24(&self) -> u32 {
        u32::from_le_bytes([self.op1(), self.op2(), self.op3(), 0])
    }

    /// Branch displacement as a signed offset.
    fn displacement(&self) -> i16 {
        if self.entry().mode == Relative16 {
            self.op16() as i16
        } else {
            self.op1() as i8 as i16
        }
    }

    /// Branch target within the program bank, when PC is known.
    pub fn branch_target(&self) -> Option<u16> {
        let pc = self.pc?;
        Some(pc.wrapping_add(self.length() as u16).wrapping_add(self.displacement() as u16))
    }

    pub fn disassemble(&self) -> String {
        let mnemonic = self.entry().mnemonic;
        format!("{}{}", mnemonic, match self.entry().mode {
            Implied => String::new(),
            Accumulator => String::from(" A"),
            Constant8 => {
                format!(" #${:02X}", self.op1())
            }
            ImmediateMFlagDependent | ImmediateXFlagDependent => {
                if self.operands.len() == 2 {
                    format!(" #${:04X}", self.op16())
                } else {
                    format!(" #${:02X}", self.op1())
                }
            }
            DirectPage => {
                format!(" ${:02X}", self.op1())
            }
            DirectPageXIndex => {
                format!(" ${:02X}, X", self.op1())
            }
            DirectPageYIndex => {
                format!(" ${:02X}, Y", self.op1())
            }
            DirectPageSIndex => {
                format!(" ${:02X}, S", self.op1())
            }
            DirectPageIndirect => {
                format!(" (${:02X})", self.op1())
            }
            DirectPageXIndexIndirect => {
                format!(" (${:02X}, X)", self.op1())
            }
            DirectPageIndirectYIndex => {
                format!(" (${:02X}), Y", self.op1())
            }
            DirectPageSIndexIndirectYIndex => {
                format!(" (${:02X}, S), Y", self.op1())
            }
            DirectPageLongIndirect => {
                format!(" [${:02X}]", self.op1())
            }
            DirectPageLongIndirectYIndex => {
                format!(" [${:02X}], Y", self.op1())
            }
            Address => {
                format!(" ${:04X}", self.op16())
            }
            AddressXIndex => {
                format!(" ${:04X}, X", self.op16())
            }
            AddressYIndex => {
                format!(" ${:04X}, Y", self.op16())
            }
            AddressIndirect => {
                format!(" (${:04X})", self.op16())
            }
            AddressXIndexIndirect => {
                format!(" (${:04X}, X)", self.op16())
            }
            AddressLongIndirect => {
                format!(" [${:04X}]", self.op16())
            }
            Long => {
                format!(" ${:06X}", self.op24())
            }
            LongXIndex => {
                format!(" ${:06X}, X", self.op24())
            }
            BlockMove => {
                // Assembler order is source, destination; the encoding is the
                // other way around.
                format!(" ${:02X}, ${:02X}", self.op2(), self.op1())
            }
            Relative8 | Relative16 => match self.branch_target() {
                Some(target) => format!(" ${:04X}", target),
                None => format!(" pc{:+}", self.displacement() + self.length() as i16),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(bytes: &[u8]) -> Instruction {
        Instruction::new(bytes[0], &bytes[1..], None, None)
    }

    #[test]
    fn disassembles_common_shapes() {
        assert_eq!(instr(&[0xA9, 0x42]).disassemble(), "LDA #$42");
        assert_eq!(instr(&[0xA9, 0x34, 0x12]).disassemble(), "LDA #$1234");
        assert_eq!(instr(&[0x8D, 0x00, 0x20]).disassemble(), "STA $2000");
        assert_eq!(instr(&[0xBF, 0x10, 0x32, 0x7E]).disassemble(), "LDA $7E3210, X");
        assert_eq!(instr(&[0x73, 0x03]).disassemble(), "ADC ($03, S), Y");
        assert_eq!(instr(&[0xFB]).disassemble(), "XCE");
        assert_eq!(instr(&[0x0A]).disassemble(), "ASL A");
        assert_eq!(instr(&[0x54, 0x7F, 0x01]).disassemble(), "MVN $01, $7F");
    }

    #[test]
    fn branches_render_target_or_displacement() {
        let mut bra = instr(&[0x80, 0xFE]);
        assert_eq!(bra.disassemble(), "BRA pc+0");
        bra.pc = Some(0x8000);
        assert_eq!(bra.disassemble(), "BRA $8000");

        let mut beq = instr(&[0xF0, 0x10]);
        beq.pc = Some(0x1000);
        assert_eq!(beq.disassemble(), "BEQ $1012");
        beq.pc = None;
        assert_eq!(beq.disassemble(), "BEQ pc+18");
    }

    #[test]
    fn every_opcode_disassembles_at_its_table_length() {
        for op in 0u16..256 {
            let entry = &OPCODES[op as usize];
            let bytes = [op as u8, 0x11, 0x22, 0x33];
            let instr = instr(&bytes[..entry.instruction_size()]);
            assert_eq!(instr.length(), entry.instruction_size(), "opcode {op:02X}");
            let text = instr.disassemble();
            assert!(
                text.starts_with(&entry.mnemonic.to_string()),
                "opcode {op:02X} -> {text}"
            );
        }
    }
}
