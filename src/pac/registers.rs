//! FlexCAN register map.

pub mod regs;

use crate::pac::common::{Reg, RegisterBlock};
use paste::paste;

/// Register block of one controller instance.
pub struct Can<B> {
    block: B,
}

impl<B: RegisterBlock> Can<B> {
    #[inline(always)]
    pub const fn new(block: B) -> Self {
        Self { block }
    }

    #[inline(always)]
    pub fn block(&self) -> &B {
        &self.block
    }
}

macro_rules! registers {
    ($($name:ident: $ty:ty = $offset:literal,)*) => {
        paste! {
            /// Byte offsets of the fixed registers.
            pub mod offsets {
                $(pub const [<$name:upper>]: usize = $offset;)*
            }

            impl<B: RegisterBlock> Can<B> {
                $(
                    #[inline(always)]
                    pub fn $name(&self) -> Reg<'_, B, $ty> {
                        Reg::new(&self.block, offsets::[<$name:upper>])
                    }
                )*
            }
        }
    };
}

registers! {
    mcr: regs::Mcr = 0x000,
    ctrl1: regs::Ctrl1 = 0x004,
    timer: u32 = 0x008,
    rxmgmask: u32 = 0x010,
    rx14mask: u32 = 0x014,
    rx15mask: u32 = 0x018,
    ecr: regs::Ecr = 0x01C,
    esr1: regs::Esr1 = 0x020,
    imask2: u32 = 0x024,
    imask1: u32 = 0x028,
    iflag2: u32 = 0x02C,
    iflag1: u32 = 0x030,
    ctrl2: regs::Ctrl2 = 0x034,
    esr2: u32 = 0x038,
    crcr: u32 = 0x044,
    rxfgmask: u32 = 0x048,
    rxfir: regs::Rxfir = 0x04C,
    cbt: regs::Cbt = 0x050,
    mecr: regs::Mecr = 0xAE0,
    errsr: regs::Errsr = 0xAFC,
    ctrl1_pn: regs::Ctrl1Pn = 0xB00,
    ctrl2_pn: regs::Ctrl2Pn = 0xB04,
    wu_mtc: regs::WuMtc = 0xB08,
    flt_id1: regs::FltId1 = 0xB0C,
    flt_dlc: regs::FltDlc = 0xB10,
    pl1_lo: u32 = 0xB14,
    pl1_hi: u32 = 0xB18,
    flt_id2_idmask: regs::FltId2Idmask = 0xB1C,
    pl2_plmask_lo: u32 = 0xB20,
    pl2_plmask_hi: u32 = 0xB24,
    fdctrl: regs::Fdctrl = 0xC00,
    fdcbt: regs::Fdcbt = 0xC04,
    fdcrc: u32 = 0xC08,
}

/// Start of mailbox RAM, two blocks of [`MB_RAM_BLOCK_LEN`] bytes.
pub const MB_RAM_OFFSET: usize = 0x080;
pub const MB_RAM_BLOCK_LEN: usize = 512;
/// Individual receive masks, one word per mailbox.
pub const RXIMR_OFFSET: usize = 0x880;
pub const RXIMR_COUNT: usize = 64;
/// Wakeup message buffers, 16 bytes each.
pub const WMB_OFFSET: usize = 0xB40;
pub const WMB_COUNT: usize = 4;
/// FD-only RAM past the wakeup buffers that takes part in ECC as well.
pub const FD_SCRATCH_OFFSET: usize = 0xF28;
pub const FD_SCRATCH_END: usize = 0x1000;
/// Total size of the register window.
pub const BLOCK_LEN: usize = 0x1000;

impl<B: RegisterBlock> Can<B> {
    #[inline(always)]
    pub fn rximr(&self, n: usize) -> Reg<'_, B, u32> {
        debug_assert!(n < RXIMR_COUNT);
        Reg::new(&self.block, RXIMR_OFFSET + n * 4)
    }

    #[inline(always)]
    pub fn wmb_cs(&self, n: usize) -> Reg<'_, B, regs::WmbCs> {
        debug_assert!(n < WMB_COUNT);
        Reg::new(&self.block, WMB_OFFSET + n * 16)
    }

    #[inline(always)]
    pub fn wmb_id(&self, n: usize) -> Reg<'_, B, regs::WmbId> {
        debug_assert!(n < WMB_COUNT);
        Reg::new(&self.block, WMB_OFFSET + n * 16 + 4)
    }

    /// Payload bytes 0..4, byte 0 in the most significant position.
    #[inline(always)]
    pub fn wmb_d03(&self, n: usize) -> Reg<'_, B, u32> {
        debug_assert!(n < WMB_COUNT);
        Reg::new(&self.block, WMB_OFFSET + n * 16 + 8)
    }

    #[inline(always)]
    pub fn wmb_d47(&self, n: usize) -> Reg<'_, B, u32> {
        debug_assert!(n < WMB_COUNT);
        Reg::new(&self.block, WMB_OFFSET + n * 16 + 12)
    }

    /// Raw word inside the mailbox RAM, `offset` counted from [`MB_RAM_OFFSET`].
    #[inline(always)]
    pub fn mb_word(&self, offset: usize) -> Reg<'_, B, u32> {
        Reg::new(&self.block, MB_RAM_OFFSET + offset)
    }
}
