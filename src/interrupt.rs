//! Interrupt sources and the dispatch routine.
//!
//! Besides the 64 mailbox flags, the controller reports through three status registers: ESR1
//! (bus and protocol errors, wakeup), ERRSR (memory errors) and WU_MTC (pretended networking).
//! Every enabled source has a callback slot. A source that fires without a callback is disabled
//! by the handler so it cannot keep the interrupt line asserted.

use crate::flexcan::FlexCan;
use crate::pac::common::{Reg, RegisterBlock};
use crate::pac::registers::offsets;
use crate::rx_fifo::{RX_FIFO_FRAME_AVAILABLE, RX_FIFO_OVERFLOW, RX_FIFO_WARNING};

pub type Callback<B> = fn(&mut FlexCan<B>);
/// Shared by all mailboxes, called with the index of the mailbox that raised its flag.
pub type MailboxCallback<B> = fn(&mut FlexCan<B>, u8);

/// Non-mailbox interrupt sources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Interrupt {
    BusOff,
    Error,
    TxWarning,
    RxWarning,
    /// Bus off recovery completed.
    BusOffDone,
    /// Error in the data phase of a CAN FD frame with bit rate switching.
    ErrorFast,
    SelfWakeup,
    /// Mailbox flag 5 with the RX FIFO on. The handler clears it after the callback, which moves
    /// the next frame to the FIFO output, so the callback reads the frame and leaves the flag alone.
    RxFifoFrameAvailable,
    /// Mailbox flag 6 with the RX FIFO on, the FIFO is almost full.
    RxFifoWarning,
    /// Mailbox flag 7 with the RX FIFO on, a frame was lost.
    RxFifoOverflow,
    /// Non-correctable memory error on a host access.
    HostMemoryError,
    /// Non-correctable memory error on an access by the controller itself.
    CanMemoryError,
    CorrectableMemoryError,
    /// Pretended networking wakeup by matching frame.
    PnMatch,
    /// Pretended networking wakeup by timeout.
    PnTimeout,
}

pub const INTERRUPT_COUNT: usize = 15;

const ALL: [Interrupt; INTERRUPT_COUNT] = [
    Interrupt::BusOff,
    Interrupt::Error,
    Interrupt::TxWarning,
    Interrupt::RxWarning,
    Interrupt::BusOffDone,
    Interrupt::ErrorFast,
    Interrupt::SelfWakeup,
    Interrupt::RxFifoFrameAvailable,
    Interrupt::RxFifoWarning,
    Interrupt::RxFifoOverflow,
    Interrupt::HostMemoryError,
    Interrupt::CanMemoryError,
    Interrupt::CorrectableMemoryError,
    Interrupt::PnMatch,
    Interrupt::PnTimeout,
];

#[derive(Copy, Clone, PartialEq, Eq)]
enum StatusReg {
    Esr1,
    Iflag1,
    Errsr,
    WuMtc,
}

#[derive(Copy, Clone, PartialEq, Eq)]
enum EnableReg {
    Mcr,
    Ctrl1,
    Ctrl2,
    Imask1,
    Mecr,
    Ctrl1Pn,
}

impl EnableReg {
    const fn offset(&self) -> usize {
        match self {
            EnableReg::Mcr => offsets::MCR,
            EnableReg::Ctrl1 => offsets::CTRL1,
            EnableReg::Ctrl2 => offsets::CTRL2,
            EnableReg::Imask1 => offsets::IMASK1,
            EnableReg::Mecr => offsets::MECR,
            EnableReg::Ctrl1Pn => offsets::CTRL1_PN,
        }
    }
}

struct Source {
    status: StatusReg,
    status_bit: u8,
    enable: EnableReg,
    enable_bit: u8,
}

const fn source(status: StatusReg, status_bit: u8, enable: EnableReg, enable_bit: u8) -> Source {
    Source {
        status,
        status_bit,
        enable,
        enable_bit,
    }
}

/// Indexed by `Interrupt as usize`.
static SOURCES: [Source; INTERRUPT_COUNT] = [
    source(StatusReg::Esr1, 2, EnableReg::Ctrl1, 15),
    source(StatusReg::Esr1, 1, EnableReg::Ctrl1, 14),
    source(StatusReg::Esr1, 17, EnableReg::Ctrl1, 11),
    source(StatusReg::Esr1, 16, EnableReg::Ctrl1, 10),
    source(StatusReg::Esr1, 19, EnableReg::Ctrl2, 30),
    source(StatusReg::Esr1, 20, EnableReg::Ctrl2, 31),
    source(StatusReg::Esr1, 0, EnableReg::Mcr, 26),
    source(StatusReg::Iflag1, RX_FIFO_FRAME_AVAILABLE, EnableReg::Imask1, RX_FIFO_FRAME_AVAILABLE),
    source(StatusReg::Iflag1, RX_FIFO_WARNING, EnableReg::Imask1, RX_FIFO_WARNING),
    source(StatusReg::Iflag1, RX_FIFO_OVERFLOW, EnableReg::Imask1, RX_FIFO_OVERFLOW),
    source(StatusReg::Errsr, 19, EnableReg::Mecr, 19),
    source(StatusReg::Errsr, 18, EnableReg::Mecr, 18),
    source(StatusReg::Errsr, 16, EnableReg::Mecr, 16),
    source(StatusReg::WuMtc, 16, EnableReg::Ctrl1Pn, 16),
    source(StatusReg::WuMtc, 17, EnableReg::Ctrl1Pn, 17),
];

impl Interrupt {
    fn source(&self) -> &'static Source {
        &SOURCES[*self as usize]
    }
}

/// Per-instance interrupt state: callbacks, and shadows of the enabled status bits for the
/// status registers that also hold bits the handler must not acknowledge.
pub struct State<B> {
    callbacks: [Option<Callback<B>>; INTERRUPT_COUNT],
    mailbox_callback: Option<MailboxCallback<B>>,
    esr1_mask: u32,
    errsr_mask: u32,
    wu_mtc_mask: u32,
    last_esr1: u32,
}

impl<B> State<B> {
    pub(crate) const fn new() -> Self {
        Self {
            callbacks: [None; INTERRUPT_COUNT],
            mailbox_callback: None,
            esr1_mask: 0,
            errsr_mask: 0,
            wu_mtc_mask: 0,
            last_esr1: 0,
        }
    }

    pub(crate) fn clear_masks(&mut self) {
        self.esr1_mask = 0;
        self.errsr_mask = 0;
        self.wu_mtc_mask = 0;
    }

    fn shadow(&mut self, status: StatusReg) -> Option<&mut u32> {
        match status {
            StatusReg::Esr1 => Some(&mut self.esr1_mask),
            StatusReg::Errsr => Some(&mut self.errsr_mask),
            StatusReg::WuMtc => Some(&mut self.wu_mtc_mask),
            StatusReg::Iflag1 => None,
        }
    }
}

impl<B: RegisterBlock> FlexCan<B> {
    /// Installs or removes the callback of one source. Does not change whether the source is
    /// enabled.
    pub fn set_callback(&mut self, interrupt: Interrupt, callback: Option<Callback<B>>) {
        self.state.callbacks[interrupt as usize] = callback;
    }

    pub fn set_mailbox_callback(&mut self, callback: Option<MailboxCallback<B>>) {
        self.state.mailbox_callback = callback;
    }

    pub fn enable_interrupt(&mut self, interrupt: Interrupt) {
        self.set_interrupt_enabled(interrupt, true);
    }

    pub fn disable_interrupt(&mut self, interrupt: Interrupt) {
        self.set_interrupt_enabled(interrupt, false);
    }

    pub fn is_interrupt_enabled(&self, interrupt: Interrupt) -> bool {
        let source = interrupt.source();
        let reg: Reg<'_, B, u32> = Reg::new(self.can.block(), source.enable.offset());
        reg.read() & (1 << source.enable_bit) != 0
    }

    /// ESR1 as read by the most recent [`FlexCan::on_interrupt`], before masking. Reading ESR1
    /// clears some of its error bits, so this is the only place they can be seen afterwards.
    pub fn last_error_status(&self) -> u32 {
        self.state.last_esr1
    }

    fn set_interrupt_enabled(&mut self, interrupt: Interrupt, enabled: bool) {
        let source = interrupt.source();
        let enable_mask = 1u32 << source.enable_bit;
        let reg: Reg<'_, B, u32> = Reg::new(self.can.block(), source.enable.offset());

        if source.enable == EnableReg::Mecr {
            self.can.ctrl2().modify(|w| w.set_ecrwre(true));
            self.can.mecr().modify(|w| w.set_ecrwrdis(false));
        }
        reg.modify(|w| {
            if enabled {
                *w |= enable_mask
            } else {
                *w &= !enable_mask
            }
        });
        if source.enable == EnableReg::Mecr {
            self.can.mecr().modify(|w| w.set_ecrwrdis(true));
            self.can.ctrl2().modify(|w| w.set_ecrwre(false));
        }

        if let Some(shadow) = self.state.shadow(source.status) {
            let status_mask = 1u32 << source.status_bit;
            if enabled {
                *shadow |= status_mask;
            } else {
                *shadow &= !status_mask;
            }
        }
    }

    fn dispatch(&mut self, interrupt: Interrupt) {
        let callback = self.state.callbacks[interrupt as usize];
        match callback {
            Some(callback) => callback(self),
            None => {
                #[cfg(feature = "defmt")]
                defmt::trace!("{}: no callback for {}, masking", self.instance, interrupt);
                self.disable_interrupt(interrupt);
            }
        }
    }

    fn dispatch_mailbox(&mut self, mb: u8) {
        let callback = self.state.mailbox_callback;
        match callback {
            Some(callback) => callback(self, mb),
            None => {
                #[cfg(feature = "defmt")]
                defmt::trace!("{}: no mailbox callback, masking mailbox {}", self.instance, mb);
                self.mask_mailbox_interrupt(mb);
            }
        }
    }

    /// Interrupt handler, call from the controller's interrupt vector(s).
    ///
    /// Status is captured once on entry. Mailbox flags are dispatched first, in index order, each
    /// one cleared right after its callback. Bits set while the handler runs are left for the
    /// next invocation.
    pub fn on_interrupt(&mut self) {
        let esr1 = u32::from(self.can.esr1().read());
        self.state.last_esr1 = esr1;
        let esr1 = esr1 & self.state.esr1_mask;
        if esr1 != 0 {
            self.can.esr1().write_value(esr1.into());
        }
        let errsr = u32::from(self.can.errsr().read()) & self.state.errsr_mask;
        if errsr != 0 {
            self.can.errsr().write_value(errsr.into());
        }
        let wu_mtc = u32::from(self.can.wu_mtc().read()) & self.state.wu_mtc_mask;
        if wu_mtc != 0 {
            self.can.wu_mtc().write_value(wu_mtc.into());
        }

        let flags = [
            self.can.iflag1().read() & self.can.imask1().read(),
            self.can.iflag2().read() & self.can.imask2().read(),
        ];
        let rx_fifo = self.can.mcr().read().rfen();

        for (reg, mut pending) in flags.into_iter().enumerate() {
            while pending != 0 {
                let bit = pending.trailing_zeros();
                pending &= pending - 1;
                let mb = (reg as u32 * 32 + bit) as u8;
                match mb {
                    RX_FIFO_FRAME_AVAILABLE if rx_fifo => {
                        self.dispatch(Interrupt::RxFifoFrameAvailable)
                    }
                    RX_FIFO_WARNING if rx_fifo => self.dispatch(Interrupt::RxFifoWarning),
                    RX_FIFO_OVERFLOW if rx_fifo => self.dispatch(Interrupt::RxFifoOverflow),
                    _ => self.dispatch_mailbox(mb),
                }
                self.iflag(reg).write_value(1 << bit);
            }
        }

        for interrupt in ALL {
            let source = interrupt.source();
            let status = match source.status {
                StatusReg::Esr1 => esr1,
                StatusReg::Errsr => errsr,
                StatusReg::WuMtc => wu_mtc,
                StatusReg::Iflag1 => continue,
            };
            if status & (1 << source.status_bit) != 0 {
                self.dispatch(interrupt);
            }
        }
    }
}
