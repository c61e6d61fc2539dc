//! Tri-state shadow of observed memory contents.
//!
//! Every cell starts unknown; the first observed byte imprints it, and any
//! later read that disagrees with the imprint is a modelling failure. Writes
//! always win. The machine overlay decides which backing store (main RAM,
//! sideways bank, Master overlay) an address lands in, and which addresses
//! are side-effectful I/O that must never be checked.

use std::path::PathBuf;

use trace816::{AccessKind, BusModel, KindMask};

use crate::machine::{Machine, MachineError, MachineKind, Region, SWROM_BANKS, SWROM_SIZE};

#[derive(Clone, Debug)]
pub struct MemConfig {
    pub machine: MachineKind,
    /// PET only: directory of ROM images, each loaded at the hex address in
    /// its file stem.
    pub roms_dir: Option<PathBuf>,
    /// Which access kinds are modelled at all.
    pub model_mask: KindMask,
    /// Which access kinds have their reads logged.
    pub rd_log_mask: KindMask,
    /// Which access kinds have their writes logged.
    pub wr_log_mask: KindMask,
}

impl Default for MemConfig {
    fn default() -> Self {
        MemConfig {
            machine: MachineKind::Flat,
            roms_dir: None,
            model_mask: KindMask::ALL,
            rd_log_mask: KindMask::NONE,
            wr_log_mask: KindMask::NONE,
        }
    }
}

impl MemConfig {
    pub fn new(machine: MachineKind) -> Self {
        MemConfig { machine, ..Self::default() }
    }
}

pub struct ShadowMem {
    machine: Machine,
    main: Vec<Option<u8>>,
    swrom: Vec<Vec<Option<u8>>>,
    andy: Vec<Option<u8>>,
    hazel: Vec<Option<u8>>,
    lynne: Vec<Option<u8>>,
    model_mask: KindMask,
    rd_log_mask: KindMask,
    wr_log_mask: KindMask,
    /// Two-character label per 4 KiB page of the 16-bit map, shown in front
    /// of logged addresses and kept in step with the latches.
    bank_id: [[u8; 2]; 16],
    failed: bool,
}

impl ShadowMem {
    pub fn new(config: MemConfig) -> Result<Self, MachineError> {
        let machine = Machine::new(config.machine);
        let swrom = if machine.has_swrom() {
            vec![vec![None; SWROM_SIZE as usize]; SWROM_BANKS]
        } else {
            Vec::new()
        };
        let (andy, hazel, lynne) = if machine.is_master() {
            (vec![None; 0x1000], vec![None; 0x2000], vec![None; 0x5000])
        } else {
            (Vec::new(), Vec::new(), Vec::new())
        };
        let mut mem = ShadowMem {
            main: vec![None; machine.main_size()],
            machine,
            swrom,
            andy,
            hazel,
            lynne,
            model_mask: config.model_mask,
            rd_log_mask: config.rd_log_mask,
            wr_log_mask: config.wr_log_mask,
            bank_id: [[b' '; 2]; 16],
            failed: false,
        };
        mem.refresh_bank_labels();
        if config.machine == MachineKind::Pet {
            if let Some(dir) = &config.roms_dir {
                mem.preload_roms(dir)?;
            }
        }
        Ok(mem)
    }

    pub fn machine(&self) -> &Machine {
        &self.machine
    }

    /// Loads every file in `dir` whose stem parses as a hex address into the
    /// shadow as known contents.
    fn preload_roms(&mut self, dir: &PathBuf) -> Result<(), MachineError> {
        let entries = std::fs::read_dir(dir).map_err(|source| MachineError::RomsDir {
            path: dir.display().to_string(),
            source,
        })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let Ok(base) = u32::from_str_radix(stem, 16) else {
                log::warn!("skipping rom image {}: name is not a load address", path.display());
                continue;
            };
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(err) => {
                    log::warn!("skipping rom image {}: {err}", path.display());
                    continue;
                }
            };
            log::info!("loading rom image {} at {:04X}", path.display(), base);
            for (i, byte) in bytes.iter().enumerate() {
                let addr = base as usize + i;
                if let Some(cell) = self.main.get_mut(addr) {
                    *cell = Some(*byte);
                }
            }
        }
        Ok(())
    }

    fn cell_mut(&mut self, region: Region) -> Option<&mut Option<u8>> {
        match region {
            Region::Main(a) => self.main.get_mut(a as usize),
            Region::Swrom { bank, offset } => {
                self.swrom.get_mut(bank as usize)?.get_mut(offset as usize)
            }
            Region::Andy(o) => self.andy.get_mut(o as usize),
            Region::Hazel(o) => self.hazel.get_mut(o as usize),
            Region::Lynne(o) => self.lynne.get_mut(o as usize),
            Region::Io | Region::Unmapped => None,
        }
    }

    fn cell(&self, region: Region) -> Option<u8> {
        match region {
            Region::Main(a) => self.main.get(a as usize).copied().flatten(),
            Region::Swrom { bank, offset } => {
                self.swrom.get(bank as usize)?.get(offset as usize).copied().flatten()
            }
            Region::Andy(o) => self.andy.get(o as usize).copied().flatten(),
            Region::Hazel(o) => self.hazel.get(o as usize).copied().flatten(),
            Region::Lynne(o) => self.lynne.get(o as usize).copied().flatten(),
            Region::Io | Region::Unmapped => None,
        }
    }

    /// Bank-id label plus hex address, as it appears in the log.
    fn format_addr(&self, ea: u32) -> String {
        let label = if ea < 0x10000 {
            let page = &self.bank_id[(ea >> 12) as usize];
            String::from_utf8_lossy(page).into_owned()
        } else {
            "  ".into()
        };
        format!("{label}{ea:0width$X}", width = self.machine.addr_digits())
    }

    fn refresh_bank_labels(&mut self) {
        const TO_HEX: &[u8; 16] = b"0123456789ABCDEF";
        match &self.machine {
            Machine::Beeb { rom_latch } | Machine::Elk { rom_latch } => {
                let c = TO_HEX[(rom_latch & 0x0F) as usize];
                for page in 8..=0xB {
                    self.bank_id[page] = [c, b':'];
                }
            }
            Machine::Master { rom_latch, acccon, .. } => {
                let c = TO_HEX[(rom_latch & 0x0F) as usize];
                self.bank_id[8] = if rom_latch & 0x80 != 0 { [b'R', b':'] } else { [c, b':'] };
                for page in 9..=0xB {
                    self.bank_id[page] = [c, b':'];
                }
                for page in 3..=7 {
                    self.bank_id[page] = if acccon & 0x04 != 0 { [b'S', b':'] } else { [b' '; 2] };
                }
                for page in 0xC..=0xD {
                    self.bank_id[page] = if acccon & 0x08 != 0 { [b'H', b':'] } else { [b' '; 2] };
                }
            }
            _ => {}
        }
    }
}

impl BusModel for ShadowMem {
    fn read(&mut self, data: u8, ea: u32, kind: AccessKind) {
        if kind == AccessKind::Fetch {
            self.machine.note_fetch(ea);
        }
        let ea = self.machine.remap(ea);
        if self.rd_log_mask.contains(kind) {
            log::info!("Rd: {} = {data:02X}", self.format_addr(ea));
        }
        if !self.model_mask.contains(kind) {
            return;
        }
        let region = self.machine.region(ea);
        let addr_str = self.format_addr(ea);
        if let Some(cell) = self.cell_mut(region) {
            match *cell {
                Some(prev) if prev != data => {
                    log::warn!("memory modelling failed at {addr_str}: expected {prev:02X} actual {data:02X}");
                    self.failed = true;
                }
                _ => *cell = Some(data),
            }
        }
    }

    fn write(&mut self, data: u8, ea: u32, kind: AccessKind) {
        if self.machine.note_write(ea, data) {
            self.refresh_bank_labels();
        }
        let ea = self.machine.remap(ea);
        let region = self.machine.region(ea);
        let ignored = self.machine.write_ignored(&region);
        if self.wr_log_mask.contains(kind) {
            let suffix = if ignored { " (ignored)" } else { "" };
            log::info!("Wr: {} = {data:02X}{suffix}", self.format_addr(ea));
        }
        if !self.model_mask.contains(kind) || ignored {
            return;
        }
        if let Some(cell) = self.cell_mut(region) {
            *cell = Some(data);
        }
    }

    fn peek(&self, ea: u32) -> Option<u8> {
        let ea = self.machine.remap(ea);
        self.cell(self.machine.region(ea))
    }

    fn take_failure(&mut self) -> bool {
        std::mem::take(&mut self.failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat() -> ShadowMem {
        ShadowMem::new(MemConfig::default()).unwrap()
    }

    #[test]
    fn first_read_imprints_later_conflict_fails_once_each() {
        let mut mem = flat();
        mem.read(0x42, 0x2000, AccessKind::Data);
        assert!(!mem.take_failure());
        mem.read(0x42, 0x2000, AccessKind::Data);
        assert!(!mem.take_failure());
        mem.read(0x43, 0x2000, AccessKind::Data);
        assert!(mem.take_failure());
        // The earlier value stays in the shadow.
        assert_eq!(mem.peek(0x2000), Some(0x42));
        mem.read(0x43, 0x2000, AccessKind::Data);
        assert!(mem.take_failure());
    }

    #[test]
    fn writes_always_win() {
        let mut mem = flat();
        mem.read(0x42, 0x2000, AccessKind::Data);
        mem.write(0x99, 0x2000, AccessKind::Data);
        assert!(!mem.take_failure());
        assert_eq!(mem.peek(0x2000), Some(0x99));
        mem.read(0x99, 0x2000, AccessKind::Data);
        assert!(!mem.take_failure());
    }

    #[test]
    fn io_window_is_never_checked() {
        let mut mem = ShadowMem::new(MemConfig::new(MachineKind::Beeb)).unwrap();
        mem.read(0x11, 0xFE00, AccessKind::Data);
        mem.read(0x22, 0xFE00, AccessKind::Data);
        assert!(!mem.take_failure());
        assert_eq!(mem.peek(0xFE00), None);
    }

    #[test]
    fn sideways_banks_are_distinct_and_write_protected() {
        let mut mem = ShadowMem::new(MemConfig::new(MachineKind::Beeb)).unwrap();
        mem.read(0xAA, 0x8000, AccessKind::Data);
        // Page in bank 5; same address, different backing cell.
        mem.write(0x05, 0xFE30, AccessKind::Data);
        mem.read(0xBB, 0x8000, AccessKind::Data);
        assert!(!mem.take_failure());
        // Back to bank 0: the imprint is still there.
        mem.write(0x00, 0xFE30, AccessKind::Data);
        mem.read(0xAA, 0x8000, AccessKind::Data);
        assert!(!mem.take_failure());
        // ROM write is ignored.
        mem.write(0xFF, 0x8000, AccessKind::Data);
        assert_eq!(mem.peek(0x8000), Some(0xAA));
    }

    #[test]
    fn modelling_mask_gates_the_check() {
        let mut mem = ShadowMem::new(MemConfig {
            model_mask: KindMask::NONE,
            ..MemConfig::default()
        })
        .unwrap();
        mem.read(0x11, 0x1000, AccessKind::Data);
        mem.read(0x22, 0x1000, AccessKind::Data);
        assert!(!mem.take_failure());
        assert_eq!(mem.peek(0x1000), None);
    }

    #[test]
    fn master_shadow_and_overlay_cells_are_separate() {
        let mut mem = ShadowMem::new(MemConfig::new(MachineKind::Master)).unwrap();
        mem.read(0x01, 0x3000, AccessKind::Data);
        mem.write(0x04, 0xFE34, AccessKind::Data); // map Lynne
        mem.read(0x02, 0x3000, AccessKind::Data);
        assert!(!mem.take_failure());
        mem.write(0x00, 0xFE34, AccessKind::Data);
        assert_eq!(mem.peek(0x3000), Some(0x01));
    }

    #[test]
    fn blitter_boot_mode_aliases_bank_0_onto_bank_ff() {
        let mut mem = ShadowMem::new(MemConfig::new(MachineKind::Blitter)).unwrap();
        mem.write(0x20, 0xFFFE31, AccessKind::Data); // boot on
        mem.read(0x7E, 0x00C123, AccessKind::Data);
        assert_eq!(mem.peek(0xFFC123), Some(0x7E));
        mem.write(0x00, 0xFFFE31, AccessKind::Data); // boot off
        assert_eq!(mem.peek(0x00C123), None);
    }

    #[test]
    fn bank_labels_follow_the_latches() {
        let mut mem = ShadowMem::new(MemConfig::new(MachineKind::Master)).unwrap();
        mem.write(0x8C, 0xFE30, AccessKind::Data);
        assert_eq!(mem.format_addr(0x8123), "R:8123");
        assert_eq!(mem.format_addr(0x9123), "C:9123");
        mem.write(0x04, 0xFE34, AccessKind::Data);
        assert_eq!(mem.format_addr(0x3000), "S:3000");
        assert_eq!(mem.format_addr(0x0000), "  0000");
    }
}
