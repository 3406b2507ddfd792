use crate::flexcan::FlexCan;
use crate::message_ram_layout::{dlc_to_len, len_to_dlc};
use crate::pac::common::RegisterBlock;
use crate::pac::message_ram::{FrameFormat, IdKind, MailboxElement, MbCs, MbId, code};
use crate::pac::registers::Can;
use crate::util::{checked_wait, mailbox_bit};
use crate::Error;
use embedded_can::{ExtendedId, Id, StandardId};

const STD_ID_MAX: u32 = 0x7FF;
const EXT_ID_MAX: u32 = 0x1FFF_FFFF;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IdType {
    Standard,
    Extended,
}

/// Frame format of a transmitted frame or of a receive mailbox.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MessageInfo {
    /// Payload length, 0 to 8 for classic frames and up to 64 for CAN FD frames.
    pub data_len: u8,
    pub id_type: IdType,
    pub remote: bool,
    pub fd: bool,
    /// Transmit the data phase at the data bit rate, only with `fd`.
    pub bitrate_switch: bool,
    /// Fills the bytes between `data_len` and the next valid CAN FD payload size.
    pub fd_padding: u8,
}

impl MessageInfo {
    pub const fn classic(data_len: u8, id_type: IdType) -> Self {
        Self {
            data_len,
            id_type,
            remote: false,
            fd: false,
            bitrate_switch: false,
            fd_padding: 0,
        }
    }

    pub const fn fd(data_len: u8, id_type: IdType, bitrate_switch: bool) -> Self {
        Self {
            data_len,
            id_type,
            remote: false,
            fd: true,
            bitrate_switch,
            fd_padding: 0,
        }
    }

    /// Classic data frame info and the raw identifier for an `embedded-can` id.
    pub fn for_id(id: Id, data_len: u8) -> (Self, u32) {
        match id {
            Id::Standard(id) => (
                Self::classic(data_len, IdType::Standard),
                id.as_raw() as u32,
            ),
            Id::Extended(id) => (Self::classic(data_len, IdType::Extended), id.as_raw()),
        }
    }
}

/// Acceptance mask for `mask` laid out like the mailbox ID word, for the mask setters.
pub const fn id_mask(id_type: IdType, mask: u32) -> u32 {
    match id_type {
        IdType::Standard => (mask & STD_ID_MAX) << MbId::STD_SHIFT,
        IdType::Extended => mask & EXT_ID_MAX,
    }
}

/// A frame copied out of a mailbox.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ReceivedMessage {
    /// Payload length, the DLC length capped at the mailbox payload size.
    pub data_len: u8,
    /// Control and status word as read when the mailbox was locked.
    pub cs: MbCs,
    pub id: u32,
    pub data: [u8; 64],
}

impl ReceivedMessage {
    pub fn data(&self) -> &[u8] {
        &self.data[..self.data_len as usize]
    }

    pub fn id_type(&self) -> IdType {
        match self.cs.ide() {
            IdKind::Standard => IdType::Standard,
            IdKind::Extended => IdType::Extended,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.cs.rtr()
    }

    pub fn is_fd(&self) -> bool {
        self.cs.edl() == FrameFormat::Fd
    }

    /// Mailbox code at read time, see [`code`].
    pub fn code(&self) -> u8 {
        self.cs.code()
    }

    pub fn time_stamp(&self) -> u16 {
        self.cs.time_stamp()
    }

    pub fn can_id(&self) -> Option<Id> {
        match self.id_type() {
            IdType::Standard => StandardId::new(self.id as u16).map(Id::Standard),
            IdType::Extended => ExtendedId::new(self.id).map(Id::Extended),
        }
    }
}

/// Reading the control and status word locks a receive mailbox against updates by the matching
/// engine, reading the free-running timer releases it again. The lock is released when this guard
/// is dropped.
pub(crate) struct MailboxLock<'a, B: RegisterBlock> {
    can: &'a Can<B>,
    element: MailboxElement<'a, B>,
    cs: MbCs,
}

impl<'a, B: RegisterBlock> MailboxLock<'a, B> {
    pub(crate) fn acquire(can: &'a Can<B>, element: MailboxElement<'a, B>) -> Self {
        let cs = element.cs().read();
        Self { can, element, cs }
    }
}

impl<B: RegisterBlock> Drop for MailboxLock<'_, B> {
    fn drop(&mut self) {
        let _ = self.can.timer().read();
    }
}

fn decode<B: RegisterBlock>(element: &MailboxElement<'_, B>, cs: MbCs) -> ReceivedMessage {
    let len = dlc_to_len(cs.dlc()).min(element.payload_len());
    let id = element.id().read();
    let id = match cs.ide() {
        IdKind::Standard => id.std_id() as u32,
        IdKind::Extended => id.id(),
    };

    let mut data = [0u8; 64];
    let aligned = len & !3;
    for (n, chunk) in data[..aligned].chunks_exact_mut(4).enumerate() {
        chunk.copy_from_slice(&element.data_word(n).read().to_be_bytes());
    }
    for (i, byte) in data.iter_mut().enumerate().take(len).skip(aligned) {
        *byte = element.read_data_byte(i);
    }

    ReceivedMessage {
        data_len: len as u8,
        cs,
        id,
        data,
    }
}

fn id_word(id_type: IdType, id: u32) -> Result<MbId, Error> {
    match id_type {
        IdType::Standard if id <= STD_ID_MAX => Ok(MbId::new().with_std_id(id as u16)),
        IdType::Extended if id <= EXT_ID_MAX => Ok(MbId::new().with_id(id)),
        _ => Err(Error::InvalidParameter),
    }
}

impl<B: RegisterBlock> FlexCan<B> {
    pub(crate) fn mailbox(&self, idx: u8) -> Result<MailboxElement<'_, B>, Error> {
        let slot = self.layout().resolve(idx)?;
        Ok(MailboxElement::new(&self.can, slot.offset, slot.payload))
    }

    /// Current code of a mailbox. Reading it locks a receive mailbox, see
    /// [`FlexCan::read_mailbox`].
    pub fn mailbox_code(&self, idx: u8) -> Result<u8, Error> {
        self.check_mailbox(idx)?;
        Ok(self.mailbox(idx)?.cs().read().code())
    }

    /// Writes a complete transmit descriptor. The code goes in last, together with the rest of
    /// the control word, as the mailbox joins arbitration as soon as its code is active.
    fn configure_tx(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
        data: &[u8],
        code: u8,
        local_priority: u8,
    ) -> Result<(), Error> {
        let slot = self.layout().resolve(idx)?;
        let len = info.data_len as usize;
        if len > 64 || len > slot.payload || (!info.fd && len > 8) {
            return Err(Error::PayloadTooLarge);
        }
        if data.len() < len {
            return Err(Error::InvalidParameter);
        }
        self.check_mailbox(idx)?;
        let id = id_word(info.id_type, id)?.with_prio(local_priority & 0x7);

        let mb = MailboxElement::new(&self.can, slot.offset, slot.payload);
        let dlc = len_to_dlc(len);
        let aligned = len & !3;
        for (n, chunk) in data[..aligned].chunks_exact(4).enumerate() {
            mb.data_word(n)
                .write_value(u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
        }
        for (i, &byte) in data.iter().enumerate().take(len).skip(aligned) {
            mb.write_data_byte(i, byte);
        }
        for i in len..dlc_to_len(dlc) {
            mb.write_data_byte(i, info.fd_padding);
        }
        mb.id().write_value(id);

        let extended = info.id_type == IdType::Extended;
        let cs = MbCs::from_bits(0)
            .with_edl(if info.fd {
                FrameFormat::Fd
            } else {
                FrameFormat::Classic
            })
            .with_brs(info.fd && info.bitrate_switch)
            .with_ide(if extended {
                IdKind::Extended
            } else {
                IdKind::Standard
            })
            .with_srr(extended)
            .with_rtr(info.remote)
            .with_dlc(dlc)
            .with_code(code);
        self.can.block().barrier();
        mb.cs().write_value(cs);
        Ok(())
    }

    /// Writes the ID and the format bits of a receive mailbox, and the code if one is given.
    fn configure_rx(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
        code: Option<u8>,
    ) -> Result<(), Error> {
        self.check_mailbox(idx)?;
        let id = id_word(info.id_type, id)?;
        let mb = self.mailbox(idx)?;
        mb.id().write_value(id);
        let extended = info.id_type == IdType::Extended;
        mb.cs().modify(|w| {
            w.set_ide(if extended {
                IdKind::Extended
            } else {
                IdKind::Standard
            });
            w.set_srr(extended);
            w.set_rtr(info.remote);
            if let Some(code) = code {
                w.set_code(code);
            }
        });
        Ok(())
    }

    /// Arms a mailbox for reception of frames matching `id` under the mailbox's acceptance mask.
    pub fn configure_rx_mailbox(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
    ) -> Result<(), Error> {
        self.check_mailbox(idx)?;
        self.clear_mailbox_flag(idx)?;
        // Inactive first, then empty: the matching engine must never see the new ID with the old
        // code or the other way around.
        self.configure_rx(idx, info, id, None)?;
        self.configure_rx(idx, info, id, Some(code::RX_INACTIVE))?;
        self.configure_rx(idx, info, id, Some(code::RX_EMPTY))?;
        self.clear_mailbox_flag(idx)
    }

    /// Fails with [`Error::Busy`] unless the mailbox is inactive or aborted.
    fn check_idle(&self, idx: u8) -> Result<(), Error> {
        self.check_mailbox(idx)?;
        match self.mailbox(idx)?.cs().read().code() {
            code::RX_INACTIVE | code::TX_INACTIVE | code::TX_ABORT => Ok(()),
            _ => Err(Error::Busy),
        }
    }

    /// Queues a frame for transmission from mailbox `idx`. `id` is the raw 11 or 29 bit
    /// identifier, `data` must hold at least `info.data_len` bytes.
    pub fn send(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        self.send_with_local_priority(idx, info, id, data, 0)
    }

    /// Same as [`FlexCan::send`], with the 3-bit local priority that precedes the ID in
    /// arbitration between this node's mailboxes when local priority is enabled.
    pub fn send_with_local_priority(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
        data: &[u8],
        local_priority: u8,
    ) -> Result<(), Error> {
        self.check_idle(idx)?;
        self.clear_mailbox_flag(idx)?;
        self.configure_tx(idx, info, id, data, code::TX_DATA, local_priority)
    }

    /// Arms an idle mailbox for reception, see [`FlexCan::configure_rx_mailbox`].
    pub fn receive(&mut self, idx: u8, info: &MessageInfo, id: u32) -> Result<(), Error> {
        self.check_idle(idx)?;
        self.configure_rx_mailbox(idx, info, id)
    }

    /// Arms a mailbox that answers remote requests for `id` with `data`. Remote request storing
    /// (CTRL2.RRS) must be off, which it is after [`FlexCan::init`].
    pub fn configure_remote_response(
        &mut self,
        idx: u8,
        info: &MessageInfo,
        id: u32,
        data: &[u8],
    ) -> Result<(), Error> {
        self.check_idle(idx)?;
        if self.can.ctrl2().read().rrs() {
            return Err(Error::InvalidParameter);
        }
        self.clear_mailbox_flag(idx)?;
        let info = MessageInfo {
            remote: false,
            ..*info
        };
        self.configure_tx(idx, &info, id, data, code::RX_RANSWER, 0)
    }

    /// Copies a frame out of a mailbox. The mailbox is locked for the duration of the copy, so a
    /// frame arriving meanwhile is not mixed into the one being read.
    pub fn read_mailbox(&mut self, idx: u8) -> Result<ReceivedMessage, Error> {
        self.check_mailbox(idx)?;
        let lock = MailboxLock::acquire(&self.can, self.mailbox(idx)?);
        Ok(decode(&lock.element, lock.cs))
    }

    /// Copies the frame at the RX FIFO output. Clearing the frame available flag (mailbox flag 5)
    /// moves the next frame to the output; the interrupt handler does so after the
    /// [`crate::Interrupt::RxFifoFrameAvailable`] callback returns.
    pub fn read_rx_fifo(&mut self) -> Result<ReceivedMessage, Error> {
        if !self.can.mcr().read().rfen() {
            return Err(Error::InvalidParameter);
        }
        let element = MailboxElement::new(&self.can, 0, 8);
        let cs = element.cs().read();
        Ok(decode(&element, cs))
    }

    /// Returns a mailbox to its inactive state. A receive mailbox that is being updated is waited
    /// for, a pending transmission is aborted when abort is enabled and otherwise dropped.
    ///
    /// The mailbox interrupt stays disabled afterwards.
    pub fn deactivate(&mut self, idx: u8) -> Result<(), Error> {
        self.check_mailbox(idx)?;
        self.disable_mailbox_interrupt(idx)?;
        let mb = self.mailbox(idx)?;
        let iterations = self.timeouts.mailbox_iterations;

        match mb.cs().read().code() & !code::RX_BUSY_BIT {
            code::RX_INACTIVE | code::TX_INACTIVE => {}
            code::RX_FULL | code::RX_EMPTY | code::RX_OVERRUN | code::RX_RANSWER => {
                if checked_wait(|| mb.cs().read().code() & code::RX_BUSY_BIT != 0, iterations)
                    .is_err()
                {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("{}: mailbox {} stays busy", self.instance, idx);
                    return Err(Error::Timeout);
                }
                mb.cs().modify(|w| w.set_code(code::RX_INACTIVE));
            }
            code::TX_DATA | code::TX_TANSWER => {
                if self.can.mcr().read().aen() {
                    mb.cs().modify(|w| w.set_code(code::TX_ABORT));
                    let (reg, mask) = mailbox_bit(idx);
                    if checked_wait(|| self.iflag(reg).read() & mask == 0, iterations).is_err() {
                        #[cfg(feature = "defmt")]
                        defmt::warn!("{}: abort of mailbox {} timed out", self.instance, idx);
                        return Err(Error::Timeout);
                    }
                }
                mb.cs().modify(|w| w.set_code(code::TX_INACTIVE));
            }
            _ => {}
        }
        self.clear_mailbox_flag(idx)
    }

    pub fn mailbox_flag(&self, idx: u8) -> Result<bool, Error> {
        if idx > 63 {
            return Err(Error::InvalidMailbox);
        }
        let (reg, mask) = mailbox_bit(idx);
        Ok(self.iflag(reg).read() & mask != 0)
    }

    /// Flags are write-1-to-clear, only this mailbox's flag is touched.
    pub fn clear_mailbox_flag(&mut self, idx: u8) -> Result<(), Error> {
        if idx > 63 {
            return Err(Error::InvalidMailbox);
        }
        let (reg, mask) = mailbox_bit(idx);
        self.iflag(reg).write_value(mask);
        Ok(())
    }

    pub fn enable_mailbox_interrupt(&mut self, idx: u8) -> Result<(), Error> {
        if idx > 63 {
            return Err(Error::InvalidMailbox);
        }
        let (reg, mask) = mailbox_bit(idx);
        self.imask(reg).modify(|w| *w |= mask);
        Ok(())
    }

    pub fn disable_mailbox_interrupt(&mut self, idx: u8) -> Result<(), Error> {
        if idx > 63 {
            return Err(Error::InvalidMailbox);
        }
        self.mask_mailbox_interrupt(idx);
        Ok(())
    }

    /// `idx` must be below 64.
    pub(crate) fn mask_mailbox_interrupt(&mut self, idx: u8) {
        let (reg, mask) = mailbox_bit(idx);
        self.imask(reg).modify(|w| *w &= !mask);
    }
}
