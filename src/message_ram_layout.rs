use crate::Error;
use crate::pac::registers::MB_RAM_BLOCK_LEN;

/// Size of the mailbox header: control/status word and ID word.
pub const MAILBOX_HEADER_LEN: usize = 8;

/// Maximum payload of the mailboxes of one region. Each region is one of the two 512 byte blocks
/// of mailbox RAM, carved into slots of payload + 8 bytes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PayloadSize {
    _8Bytes = 8,
    _16Bytes = 16,
    _32Bytes = 32,
    _64Bytes = 64,
}

impl PayloadSize {
    pub const fn bytes(&self) -> usize {
        *self as usize
    }

    /// Mailbox count of one 512 byte block.
    pub const fn mailboxes_per_region(&self) -> usize {
        MB_RAM_BLOCK_LEN / (self.bytes() + MAILBOX_HEADER_LEN)
    }

    pub(crate) const fn config_register(&self) -> u8 {
        match self {
            PayloadSize::_8Bytes => 0b00,
            PayloadSize::_16Bytes => 0b01,
            PayloadSize::_32Bytes => 0b10,
            PayloadSize::_64Bytes => 0b11,
        }
    }

    pub(crate) const fn from_config_register(value: u8) -> Self {
        match value & 0b11 {
            0b00 => PayloadSize::_8Bytes,
            0b01 => PayloadSize::_16Bytes,
            0b10 => PayloadSize::_32Bytes,
            _ => PayloadSize::_64Bytes,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Region {
    Zero,
    One,
}

/// Mailbox RAM geometry, derived from MCR.FDEN and FDCTRL.MBDSRn.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageRamLayout {
    pub fd_enabled: bool,
    pub region0: PayloadSize,
    pub region1: PayloadSize,
}

/// Where a mailbox lives.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MailboxSlot {
    pub region: Region,
    /// Byte offset from the start of mailbox RAM.
    pub offset: usize,
    /// Payload capacity in bytes.
    pub payload: usize,
}

impl MailboxSlot {
    pub const fn len(&self) -> usize {
        self.payload + MAILBOX_HEADER_LEN
    }
}

impl MessageRamLayout {
    pub const fn classic() -> Self {
        Self {
            fd_enabled: false,
            region0: PayloadSize::_8Bytes,
            region1: PayloadSize::_8Bytes,
        }
    }

    /// Classic CAN frames only ever use 8 byte slots, whatever the region setting says.
    pub const fn payload_size(&self, region: Region) -> PayloadSize {
        if !self.fd_enabled {
            return PayloadSize::_8Bytes;
        }
        match region {
            Region::Zero => self.region0,
            Region::One => self.region1,
        }
    }

    pub const fn region_capacity(&self, region: Region) -> usize {
        self.payload_size(region).mailboxes_per_region()
    }

    /// Highest number of mailboxes the two regions hold together.
    pub const fn max_mailbox_limit(&self) -> usize {
        self.region_capacity(Region::Zero) + self.region_capacity(Region::One)
    }

    pub fn resolve(&self, idx: u8) -> Result<MailboxSlot, Error> {
        let idx = idx as usize;
        let capacity0 = self.region_capacity(Region::Zero);
        let (region, idx_in_region, base) = if idx < capacity0 {
            (Region::Zero, idx, 0)
        } else {
            (Region::One, idx - capacity0, MB_RAM_BLOCK_LEN)
        };
        if idx_in_region >= self.region_capacity(region) {
            return Err(Error::InvalidMailbox);
        }
        let payload = self.payload_size(region).bytes();
        Ok(MailboxSlot {
            region,
            offset: base + idx_in_region * (payload + MAILBOX_HEADER_LEN),
            payload,
        })
    }
}

const FD_DLC_LEN: [u8; 7] = [12, 16, 20, 24, 32, 48, 64];

/// Payload length carried by a DLC value.
pub const fn dlc_to_len(dlc: u8) -> usize {
    match dlc {
        0..=8 => dlc as usize,
        9..=15 => FD_DLC_LEN[(dlc - 9) as usize] as usize,
        _ => 64,
    }
}

/// Smallest DLC whose payload holds `len` bytes.
pub const fn len_to_dlc(len: usize) -> u8 {
    if len <= 8 {
        return len as u8;
    }
    let mut i = 0;
    while i < FD_DLC_LEN.len() {
        if len <= FD_DLC_LEN[i] as usize {
            return 9 + i as u8;
        }
        i += 1;
    }
    15
}

/// Index of the last mailbox covered by the RX FIFO and its filter table, given CTRL2.RFFN.
pub const fn rx_fifo_last_occupied_mailbox(rffn: u8) -> u8 {
    5 + ((rffn as u16 + 1) * 8 / 4) as u8
}

/// Number of filter table elements an individual mask register exists for, given CTRL2.RFFN.
pub const fn rx_fifo_individual_mask_count(rffn: u8) -> u8 {
    8 + rffn * 2
}
