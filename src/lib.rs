#![cfg_attr(not(test), no_std)]
//! Driver for the FlexCAN CAN / CAN FD controller.
//!
//! All configuration goes through freeze mode: every setter that touches a freeze-protected
//! register enters freeze if needed and leaves it again, unless the caller already froze the
//! controller with [`FlexCan::enter_freeze`], in which case it stays frozen until
//! [`FlexCan::exit_freeze`]. Waits on the hardware are bounded busy polls, see [`Timeouts`].
//!
//! The register window is accessed through [`RegisterBlock`], [`Mmio`] being the memory-mapped
//! implementation handed out by [`FlexCan::take`].

pub mod config;
pub mod flexcan;
pub mod interrupt;
pub mod low_power;
pub mod mailbox;
pub mod message_ram_layout;
pub mod pac;
pub mod rx_fifo;
mod util;

#[cfg(test)]
pub(crate) mod mocks;
#[cfg(test)]
mod tests;

pub use config::{
    BitTiming, ClockSource, FdConfig, FlexCanConfig, RxFifoConfig, RxMaskType, Timeouts,
};
pub use flexcan::{FlexCan, Instance, OperationMode};
pub use interrupt::Interrupt;
pub use mailbox::{IdType, MessageInfo, ReceivedMessage};
pub use message_ram_layout::{MessageRamLayout, PayloadSize, Region};
pub use pac::common::{Mmio, RegisterBlock};
pub use rx_fifo::{IdFilterFormat, RxFifoIdFilter};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// [`FlexCan::take`] called twice for the same instance.
    PeripheralTaken,
    /// A bounded hardware poll ran out of iterations.
    Timeout,
    /// Mailbox index beyond MCR.MAXMB or beyond the mailbox RAM.
    InvalidMailbox,
    /// Mailbox index inside the range used by the RX FIFO and its filter table.
    MailboxOverlapsRxFifo,
    /// Payload longer than the mailbox region or the frame format allows.
    PayloadTooLarge,
    /// More mailboxes requested than the configured payload sizes leave room for.
    TooManyMailboxes,
    /// A bit timing segment is zero or above its register limit.
    InvalidBitTiming,
    InvalidParameter,
    /// The mailbox is in use by a pending transfer.
    Busy,
}
