//! Chip registry for the supported 27-series EPROM families.
//!
//! A closed table: each part maps to its capacity and the single ASCII
//! select byte the firmware understands. Selection is a mode switch with no
//! reply from the device.

use serde::{Deserialize, Serialize};

/// Supported 27-series EPROM parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Chip {
    C16,
    C32,
    C64,
    C128,
    C256,
    C512,
    C1001,
    C2001,
    C4001,
    C801,
}

/// Size and select-command pairing for one chip family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipProfile {
    /// Single-byte select command ('a'..='j').
    pub select_command: u8,
    /// Addressable capacity in bytes.
    pub size: u32,
}

impl Chip {
    /// Every supported part, in select-command order.
    pub const ALL: [Chip; 10] = [
        Chip::C16,
        Chip::C32,
        Chip::C64,
        Chip::C128,
        Chip::C256,
        Chip::C512,
        Chip::C1001,
        Chip::C2001,
        Chip::C4001,
        Chip::C801,
    ];

    /// Fixed profile for this part.
    pub fn profile(self) -> ChipProfile {
        let (select_command, size) = match self {
            Chip::C16 => (b'a', 0x0800),
            Chip::C32 => (b'b', 0x1000),
            Chip::C64 => (b'c', 0x2000),
            Chip::C128 => (b'd', 0x4000),
            Chip::C256 => (b'e', 0x8000),
            Chip::C512 => (b'f', 0x10000),
            Chip::C1001 => (b'g', 0x20000),
            Chip::C2001 => (b'h', 0x40000),
            Chip::C4001 => (b'i', 0x80000),
            Chip::C801 => (b'j', 0x100000),
        };
        ChipProfile {
            select_command,
            size,
        }
    }

    /// Capacity in bytes.
    pub fn size(self) -> u32 {
        self.profile().size
    }

    /// ASCII select command byte.
    pub fn select_command(self) -> u8 {
        self.profile().select_command
    }

    /// Part name as printed on the chip.
    pub fn name(self) -> &'static str {
        match self {
            Chip::C16 => "27C16",
            Chip::C32 => "27C32",
            Chip::C64 => "27C64",
            Chip::C128 => "27C128",
            Chip::C256 => "27C256",
            Chip::C512 => "27C512",
            Chip::C1001 => "27C1001",
            Chip::C2001 => "27C2001",
            Chip::C4001 => "27C4001",
            Chip::C801 => "27C801",
        }
    }
}
