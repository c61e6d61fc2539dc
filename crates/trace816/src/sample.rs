//! Bus-cycle observations handed to the decoder by the capture front end.

/// Sync hint attached to a sample by the capture hardware, if any.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SampleType {
    /// No hint.
    Unknown,
    /// This sample is an opcode fetch.
    Opcode,
    /// This sample is the final cycle of the capture.
    Last,
    /// This sample is an operand fetch.
    Instr,
}

/// One observation of the external bus: a data byte plus whatever control
/// lines the analyzer probes happened to capture.
#[derive(Copy, Clone, Debug)]
pub struct Sample {
    pub data: u8,
    pub stype: SampleType,
    /// R/W line; `true` = read. `None` when the line was not captured.
    pub rnw: Option<bool>,
    /// External E pin. `None` when the pin was not captured.
    pub e: Option<bool>,
}

impl Sample {
    /// A data-only sample, as produced by a two-channel capture.
    pub fn data(data: u8) -> Self {
        Sample { data, stype: SampleType::Unknown, rnw: None, e: None }
    }

    pub fn with_type(mut self, stype: SampleType) -> Self {
        self.stype = stype;
        self
    }

    pub fn with_rnw(mut self, rnw: bool) -> Self {
        self.rnw = Some(rnw);
        self
    }

    pub fn with_e(mut self, e: bool) -> Self {
        self.e = Some(e);
        self
    }

    /// Does this sample begin a new instruction (or end the capture)?
    pub fn is_boundary(&self) -> bool {
        matches!(self.stype, SampleType::Opcode | SampleType::Last)
    }
}
