//! Reassembly of panel commands split across frames.
//!
//! A command that starts with a known token opens a new buffer; anything
//! else is appended to the open buffer. Content that happens to begin
//! with a token is always taken as a new command. A buffer that would
//! grow past [`MAX_ASSEMBLED_CHARS`] is dropped and the fragment is
//! delivered on its own.

use tracing::warn;

use super::queries::COMMAND_SIZE;

/// Upper bound on a reassembled command: eight advertised command sizes.
pub const MAX_ASSEMBLED_CHARS: usize = COMMAND_SIZE as usize * 8;

/// Tokens that start a panel command.
pub const COMMAND_PREFIXES: &[&str] = &[
    "@AFP-", "@APG-", "@CPG-", "@DPG-", "@PDR-", "@PHE-", "@PHP-", "@PHT-", "@PPA-", "@PPF-",
    "@PPG-", "@PPK-", "@PPM-", "@PPN-", "@PPT-", "@PPX", "@PSE-", "@PSP-", "@PST-", "@WLD-",
    "PAGE-", "PPOF-", "PPOG-", "PPON-", "^ANI-", "^APF-", "^BAT-", "^BAU-", "^BCB-", "^BCF-",
    "^BCT-", "^BDO-", "^BFB-", "^BIM-", "^BLN-", "^BMC-", "^BMF-", "^BMI-", "^BML-", "^BMP-",
    "^BNC-", "^BNN-", "^BNT-", "^BOP-", "^BOR-", "^BOS-", "^BPP-", "^BRD-", "^BSF-", "^BSP-",
    "^BSM-", "^BSO-", "^BVL-", "^BVN-", "^BVP-", "^BVT-", "^BWW-", "^CPF-", "^DLD-", "^DPF-",
    "^ENA-", "^FON-", "^GDI-", "^GIV-", "^GLH-", "^GLL-", "^GRD-", "^GRU-", "^GSC-", "^GSN-",
    "^ICO-", "^IRM-", "^JSB-", "^JSI-", "^JST-", "^MBT-", "^MDC-", "^SHO-", "^TEC-", "^TEF-",
    "^TOP-", "^TXT-", "^UNI-", "^UTF-", "^VTP-", "^LVC-", "^LVD-", "^LVE-", "^LVF-", "^LVL-",
    "^LVM-", "^LVN-", "^LVR-", "^LVS-", "^MSP-", "^RAF-", "^RFR-", "^RMF-", "^RSR-", "^SOU-",
    "^STP-", "^TKP-", "^PGE-", "^ABP-", "^ADB", "ABEEP", "ADBEEP", "BEEP", "BRIT-",
    "DBEEP", "SETUP", "SHUTDOWN", "SLEEP", "TPAGEON", "TPAGEOFF", "TPCCMD", "TPCACC", "WAKE",
    "?FWVERSION", "?MAC", "?MIC", "ON", "OFF", "INPUT-", "LEVON", "LEVOFF", "RXON", "RXOFF",
];

/// `true` when `content` starts with a known command token.
pub fn starts_command(content: &str) -> bool {
    let head: String = content.chars().take(12).collect::<String>().to_ascii_uppercase();
    COMMAND_PREFIXES.iter().any(|p| head.starts_with(p))
}

/// One reassembled command ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembled {
    pub content: String,
    /// More than one frame went into `content`.
    pub continued: bool,
}

/// Holds the command being reassembled, if any.
#[derive(Debug, Default)]
pub struct CommandAssembler {
    pending: Option<String>,
}

impl CommandAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one command frame's content.
    pub fn accept(&mut self, content: &str) -> Assembled {
        if starts_command(content) {
            self.pending = Some(content.to_string());
            return Assembled {
                content: content.to_string(),
                continued: false,
            };
        }
        let overflow = self.pending.as_ref().is_some_and(|buffer| {
            buffer.chars().count() + content.chars().count() > MAX_ASSEMBLED_CHARS
        });
        if overflow {
            warn!(limit = MAX_ASSEMBLED_CHARS, "command reassembly overflow, dropping buffer");
            self.pending = None;
            return Assembled {
                content: content.to_string(),
                continued: false,
            };
        }
        match self.pending.as_mut() {
            Some(buffer) => {
                buffer.push_str(content);
                Assembled {
                    content: buffer.clone(),
                    continued: true,
                }
            }
            None => Assembled {
                content: content.to_string(),
                continued: false,
            },
        }
    }

    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn reset(&mut self) {
        self.pending = None;
    }
}
