//! Initial register state supplied by the caller.
//!
//! Everything defaults to unknown; the capture front end passes along
//! whatever the user asserted about the machine on the other end of the
//! probes.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("16-bit register width contradicts emulation mode")]
    WidthInEmulation,
    #[error("stack pointer {0:#06X} is outside page 1 in emulation mode")]
    StackInEmulation(u16),
}

/// Optional assertions about the CPU state at the first sample.
#[derive(Clone, Copy, Debug, Default)]
pub struct InitialState {
    pub e: Option<bool>,
    pub sp: Option<u16>,
    pub pb: Option<u8>,
    pub db: Option<u8>,
    pub dp: Option<u16>,
    pub ms: Option<bool>,
    pub xs: Option<bool>,
}

impl InitialState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn e(mut self, e: bool) -> Self {
        self.e = Some(e);
        self
    }

    pub fn sp(mut self, sp: u16) -> Self {
        self.sp = Some(sp);
        self
    }

    pub fn pb(mut self, pb: u8) -> Self {
        self.pb = Some(pb);
        self
    }

    pub fn db(mut self, db: u8) -> Self {
        self.db = Some(db);
        self
    }

    pub fn dp(mut self, dp: u16) -> Self {
        self.dp = Some(dp);
        self
    }

    pub fn ms(mut self, ms: bool) -> Self {
        self.ms = Some(ms);
        self
    }

    pub fn xs(mut self, xs: bool) -> Self {
        self.xs = Some(xs);
        self
    }

    /// Rejects combinations the hardware cannot reach.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.e == Some(true) {
            if self.ms == Some(false) || self.xs == Some(false) {
                return Err(ConfigError::WidthInEmulation);
            }
            if let Some(sp) = self.sp {
                if sp & 0xFF00 != 0x0100 {
                    return Err(ConfigError::StackInEmulation(sp));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emulation_mode_rejects_16_bit_widths() {
        assert!(InitialState::new().e(true).ms(false).validate().is_err());
        assert!(InitialState::new().e(true).xs(false).validate().is_err());
        assert!(InitialState::new().e(false).ms(false).validate().is_ok());
    }

    #[test]
    fn emulation_mode_pins_stack_to_page_1() {
        assert!(InitialState::new().e(true).sp(0x01FD).validate().is_ok());
        assert!(InitialState::new().e(true).sp(0x02FD).validate().is_err());
        assert!(InitialState::new().sp(0x02FD).validate().is_ok());
    }
}
