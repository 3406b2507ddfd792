use crate::flexcan::FlexCan;
use crate::message_ram_layout::rx_fifo_individual_mask_count;
use crate::pac::common::RegisterBlock;
use crate::pac::message_ram::{IdFilterA, IdFilterB, IdFilterC};
use crate::Error;

/// The filter table starts right after the six slots used by the FIFO engine itself.
const FILTER_TABLE_OFFSET: usize = 0x60;

/// Mailbox flag raised while a frame waits at the FIFO output.
pub(crate) const RX_FIFO_FRAME_AVAILABLE: u8 = 5;
pub(crate) const RX_FIFO_WARNING: u8 = 6;
pub(crate) const RX_FIFO_OVERFLOW: u8 = 7;

/// Layout of the RX FIFO ID filter table, MCR.IDAM.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdFilterFormat {
    /// One full identifier per table element, with RTR and IDE.
    A,
    /// Two 14-bit partial identifiers per element, with RTR and IDE.
    B,
    /// Four 8-bit partial identifiers per element.
    C,
    /// All frames rejected.
    D,
}

impl IdFilterFormat {
    pub(crate) const fn idam(&self) -> u8 {
        match self {
            IdFilterFormat::A => 0b00,
            IdFilterFormat::B => 0b01,
            IdFilterFormat::C => 0b10,
            IdFilterFormat::D => 0b11,
        }
    }

    /// Filters packed into one table word.
    pub const fn filters_per_element(&self) -> usize {
        match self {
            IdFilterFormat::A => 1,
            IdFilterFormat::B => 2,
            IdFilterFormat::C => 4,
            IdFilterFormat::D => 0,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFifoIdFilter {
    /// 11 or 29 bit identifier, formats B and C only compare its most significant bits.
    pub id: u32,
    pub extended: bool,
    /// Ignored by format C.
    pub remote: bool,
}

impl RxFifoIdFilter {
    pub const fn standard(id: u16) -> Self {
        Self {
            id: id as u32,
            extended: false,
            remote: false,
        }
    }

    pub const fn extended(id: u32) -> Self {
        Self {
            id,
            extended: true,
            remote: false,
        }
    }
}

impl<B: RegisterBlock> FlexCan<B> {
    /// Number of filters the table holds for the configured CTRL2.RFFN, in every format.
    pub fn rx_fifo_filter_elements(&self) -> usize {
        (self.can.ctrl2().read().rffn() as usize + 1) * 8
    }

    /// Programs the RX FIFO filter table. `filters` must hold exactly `rx_fifo_filter_elements()`
    /// entries for formats A, B and C. B packs them two per table word and C four per word, so
    /// the table shrinks accordingly. Format D ignores `filters`.
    pub fn configure_rx_fifo(
        &mut self,
        format: IdFilterFormat,
        filters: &[RxFifoIdFilter],
    ) -> Result<(), Error> {
        if format != IdFilterFormat::D && filters.len() != self.rx_fifo_filter_elements() {
            return Err(Error::InvalidParameter);
        }
        self.with_freeze(|can| {
            can.clear_mailbox_flag(RX_FIFO_FRAME_AVAILABLE)?;
            can.can.mcr().modify(|w| w.set_idam(format.idam()));

            let regs = &can.can;
            match format {
                IdFilterFormat::A => {
                    for (n, f) in filters.iter().enumerate() {
                        let element = if f.extended {
                            IdFilterA::for_ext(f.id, f.remote)
                        } else {
                            IdFilterA::for_std(f.id as u16, f.remote)
                        };
                        regs.mb_word(FILTER_TABLE_OFFSET + n * 4).write_value(element.into_bits());
                    }
                }
                IdFilterFormat::B => {
                    for (n, pair) in filters.chunks_exact(2).enumerate() {
                        let element = IdFilterB::new()
                            .with_rtr0(pair[0].remote)
                            .with_ide0(pair[0].extended)
                            .with_rxidb0(IdFilterB::partial_id(pair[0].id, pair[0].extended))
                            .with_rtr1(pair[1].remote)
                            .with_ide1(pair[1].extended)
                            .with_rxidb1(IdFilterB::partial_id(pair[1].id, pair[1].extended));
                        regs.mb_word(FILTER_TABLE_OFFSET + n * 4).write_value(element.into_bits());
                    }
                }
                IdFilterFormat::C => {
                    for (n, quad) in filters.chunks_exact(4).enumerate() {
                        let element = IdFilterC::new()
                            .with_rxidc0(IdFilterC::partial_id(quad[0].id, quad[0].extended))
                            .with_rxidc1(IdFilterC::partial_id(quad[1].id, quad[1].extended))
                            .with_rxidc2(IdFilterC::partial_id(quad[2].id, quad[2].extended))
                            .with_rxidc3(IdFilterC::partial_id(quad[3].id, quad[3].extended));
                        regs.mb_word(FILTER_TABLE_OFFSET + n * 4).write_value(element.into_bits());
                    }
                }
                IdFilterFormat::D => {}
            }
            Ok(())
        })
    }

    /// Reads back element `n` of a format A filter table.
    pub fn rx_fifo_filter(&self, n: usize) -> Result<RxFifoIdFilter, Error> {
        if n >= self.rx_fifo_filter_elements() {
            return Err(Error::InvalidParameter);
        }
        let element = IdFilterA::from_bits(self.can.mb_word(FILTER_TABLE_OFFSET + n * 4).read());
        let id = if element.ide() {
            element.rxida()
        } else {
            element.std_id() as u32
        };
        Ok(RxFifoIdFilter {
            id,
            extended: element.ide(),
            remote: element.rtr(),
        })
    }

    /// Table element that accepted the frame at the FIFO output.
    pub fn rx_fifo_filter_hit(&self) -> u16 {
        self.can.rxfir().read().idhit()
    }

    pub fn set_rx_fifo_global_mask(&mut self, mask: u32) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.rxfgmask().write_value(mask);
            Ok(())
        })
    }

    /// Acceptance mask of filter table element `filter`, used with individual masking. Only the
    /// first `8 + 2 * RFFN` elements have one; index `8 + 2 * RFFN` itself is accepted as well.
    pub fn set_rx_fifo_individual_mask(&mut self, filter: u8, mask: u32) -> Result<(), Error> {
        let count = rx_fifo_individual_mask_count(self.can.ctrl2().read().rffn());
        if filter > count {
            return Err(Error::InvalidParameter);
        }
        self.with_freeze(|can| {
            can.can.rximr(filter as usize).write_value(mask);
            Ok(())
        })
    }
}
