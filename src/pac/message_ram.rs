use crate::pac::common::{Reg, RegisterBlock};
use crate::pac::registers::{Can, MB_RAM_OFFSET};
use bitfield_struct::bitfield;

macro_rules! enum_bit {
    ($name:ident, $zero_name:ident, $one_name:ident) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        #[cfg_attr(feature = "defmt", derive(defmt::Format))]
        pub enum $name {
            $zero_name,
            $one_name,
        }

        impl $name {
            const fn into_bits(self) -> u8 {
                match self {
                    $name::$zero_name => 0,
                    $name::$one_name => 1,
                }
            }

            const fn from_bits(value: u8) -> Self {
                match value {
                    0 => $name::$zero_name,
                    _ => $name::$one_name,
                }
            }
        }
    };
}

/// Mailbox codes, upper nibble of the control and status word.
pub mod code {
    pub const RX_INACTIVE: u8 = 0b0000;
    pub const RX_FULL: u8 = 0b0010;
    pub const RX_EMPTY: u8 = 0b0100;
    pub const RX_OVERRUN: u8 = 0b0110;
    /// Answers a matching remote request with the stored frame, needs CTRL2.RRS cleared.
    pub const RX_RANSWER: u8 = 0b1010;
    /// Set by hardware while the mailbox is being updated, OR-ed onto an RX code.
    pub const RX_BUSY_BIT: u8 = 0b0001;

    pub const TX_INACTIVE: u8 = 0b1000;
    pub const TX_ABORT: u8 = 0b1001;
    /// Data or remote frame, depending on the RTR bit.
    pub const TX_DATA: u8 = 0b1100;
    pub const TX_TANSWER: u8 = 0b1110;
}

/// Mailbox control and status word, first word of every mailbox.
#[bitfield(u32, order = Msb, default = false, defmt = cfg(feature = "defmt"))]
pub struct MbCs {
    /// Extended Data Length, the frame is a CAN FD frame
    #[bits(1)]
    pub edl: FrameFormat,
    /// Bit Rate Switch
    pub brs: bool,
    /// Error State Indicator
    pub esi: bool,
    #[bits(1)]
    _reserved0: u8,
    /// Mailbox code, see [`code`]
    #[bits(4)]
    pub code: u8,
    #[bits(1)]
    _reserved1: u8,
    /// Substitute Remote Request, must be set for extended frames
    pub srr: bool,
    /// ID Extended
    #[bits(1)]
    pub ide: IdKind,
    /// Remote Transmission Request
    pub rtr: bool,
    /// Data Length Code
    ///
    /// 0-8 = payload of 0-8 bytes
    ///
    /// 9-15 = CAN FD payload of 12/16/20/24/32/48/64 bytes
    #[bits(4)]
    pub dlc: u8,
    /// Free-running timer value captured at the start of frame
    pub time_stamp: u16,
}

enum_bit!(FrameFormat, Classic, Fd);
enum_bit!(IdKind, Standard, Extended);

/// Mailbox identifier word.
#[bitfield(u32, order = Msb, defmt = cfg(feature = "defmt"))]
pub struct MbId {
    /// Local priority, only used with MCR.LPRIOEN
    #[bits(3)]
    pub prio: u8,
    /// Extended identifier, or a standard identifier in bits 28:18.
    #[bits(29)]
    pub id: u32,
}

impl MbId {
    pub const STD_SHIFT: u32 = 18;

    pub const fn std_id(&self) -> u16 {
        ((self.id() >> Self::STD_SHIFT) & 0x7FF) as u16
    }

    pub const fn with_std_id(self, id: u16) -> Self {
        self.with_id(((id as u32) & 0x7FF) << Self::STD_SHIFT)
    }
}

/// RX FIFO ID filter table element, format A: one full identifier.
#[bitfield(u32, order = Msb, defmt = cfg(feature = "defmt"))]
pub struct IdFilterA {
    pub rtr: bool,
    pub ide: bool,
    /// Extended ID in bits 29:1, standard ID in bits 29:19 of the word.
    #[bits(29)]
    pub rxida: u32,
    #[bits(1)]
    _reserved0: u8,
}

impl IdFilterA {
    pub const fn for_std(id: u16, remote: bool) -> Self {
        Self::new()
            .with_rtr(remote)
            .with_ide(false)
            .with_rxida(((id as u32) & 0x7FF) << 18)
    }

    pub const fn for_ext(id: u32, remote: bool) -> Self {
        Self::new()
            .with_rtr(remote)
            .with_ide(true)
            .with_rxida(id & 0x1FFF_FFFF)
    }

    pub const fn std_id(&self) -> u16 {
        ((self.rxida() >> 18) & 0x7FF) as u16
    }
}

/// RX FIFO ID filter table element, format B: two partial identifiers.
#[bitfield(u32, order = Msb, defmt = cfg(feature = "defmt"))]
pub struct IdFilterB {
    pub rtr0: bool,
    pub ide0: bool,
    /// Full standard ID in bits 13:3, or the 14 most significant bits of an extended ID.
    #[bits(14)]
    pub rxidb0: u16,
    pub rtr1: bool,
    pub ide1: bool,
    #[bits(14)]
    pub rxidb1: u16,
}

impl IdFilterB {
    pub const fn partial_id(id: u32, extended: bool) -> u16 {
        if extended {
            ((id >> 15) & 0x3FFF) as u16
        } else {
            ((id & 0x7FF) << 3) as u16
        }
    }
}

/// RX FIFO ID filter table element, format C: four 8-bit partial identifiers.
#[bitfield(u32, order = Msb, defmt = cfg(feature = "defmt"))]
pub struct IdFilterC {
    pub rxidc0: u8,
    pub rxidc1: u8,
    pub rxidc2: u8,
    pub rxidc3: u8,
}

impl IdFilterC {
    /// Most significant 8 bits of the identifier.
    pub const fn partial_id(id: u32, extended: bool) -> u8 {
        if extended {
            ((id >> 21) & 0xFF) as u8
        } else {
            ((id >> 3) & 0xFF) as u8
        }
    }
}

/// One mailbox inside the mailbox RAM.
pub struct MailboxElement<'a, B> {
    can: &'a Can<B>,
    /// From the start of the mailbox RAM.
    offset: usize,
    payload: usize,
}

impl<'a, B: RegisterBlock> MailboxElement<'a, B> {
    pub(crate) fn new(can: &'a Can<B>, offset: usize, payload: usize) -> Self {
        Self {
            can,
            offset,
            payload,
        }
    }

    pub fn cs(&self) -> Reg<'a, B, MbCs> {
        Reg::new(self.can.block(), MB_RAM_OFFSET + self.offset)
    }

    pub fn id(&self) -> Reg<'a, B, MbId> {
        Reg::new(self.can.block(), MB_RAM_OFFSET + self.offset + 4)
    }

    /// Payload word `n`, holding payload bytes `4n..4n+4` most significant first.
    pub fn data_word(&self, n: usize) -> Reg<'a, B, u32> {
        debug_assert!(n * 4 < self.payload);
        Reg::new(self.can.block(), self.data_offset() + n * 4)
    }

    pub fn read_data_byte(&self, i: usize) -> u8 {
        self.can.block().read_byte(self.data_offset() + swap_byte_index(i))
    }

    pub fn write_data_byte(&self, i: usize, value: u8) {
        self.can
            .block()
            .write_byte(self.data_offset() + swap_byte_index(i), value)
    }

    pub fn payload_len(&self) -> usize {
        self.payload
    }

    #[inline(always)]
    fn data_offset(&self) -> usize {
        MB_RAM_OFFSET + self.offset + 8
    }
}

/// Payload bytes are stored big-endian within each little-endian word.
#[inline(always)]
pub const fn swap_byte_index(i: usize) -> usize {
    (i & !3) + (3 - (i & 3))
}
