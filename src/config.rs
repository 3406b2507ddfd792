use crate::flexcan::{FlexCan, OperationMode};
use crate::low_power::BusOffRecovery;
use crate::message_ram_layout::{MessageRamLayout, PayloadSize};
use crate::pac::common::RegisterBlock;
use crate::pac::registers::regs::{Cbt, Fdcbt};
use crate::rx_fifo::IdFilterFormat;
use crate::Error;

/// Bit timing of one phase, every field in time quanta (prescaler in clock cycles), 1-based.
///
/// Bit time = (1 + propagation_segment + phase_segment1 + phase_segment2) quanta, one quantum
/// being `prescaler` cycles of the protocol engine clock. The sample point lies between the two
/// phase segments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BitTiming {
    pub propagation_segment: u8,
    pub phase_segment1: u8,
    pub phase_segment2: u8,
    pub prescaler: u16,
    pub resync_jump_width: u8,
}

/// Inclusive upper bounds of the register fields, in the same 1-based units.
struct BitTimingLimits {
    propagation_segment: u8,
    phase_segment1: u8,
    phase_segment2: u8,
    prescaler: u16,
    resync_jump_width: u8,
}

const NOMINAL_LIMITS: BitTimingLimits = BitTimingLimits {
    propagation_segment: 64,
    phase_segment1: 32,
    phase_segment2: 32,
    prescaler: 1024,
    resync_jump_width: 32,
};

const DATA_LIMITS: BitTimingLimits = BitTimingLimits {
    propagation_segment: 32,
    phase_segment1: 8,
    phase_segment2: 8,
    prescaler: 1024,
    resync_jump_width: 8,
};

impl BitTiming {
    /// 40 MHz engine clock, 500 kbit/s, sample point at 80%.
    pub const fn nominal_default() -> Self {
        Self {
            propagation_segment: 47,
            phase_segment1: 16,
            phase_segment2: 16,
            prescaler: 1,
            resync_jump_width: 16,
        }
    }

    /// 40 MHz engine clock, 2 Mbit/s, sample point at 70%.
    pub const fn data_default() -> Self {
        Self {
            propagation_segment: 7,
            phase_segment1: 6,
            phase_segment2: 6,
            prescaler: 1,
            resync_jump_width: 6,
        }
    }

    pub(crate) fn validate_nominal(&self) -> Result<(), Error> {
        self.validate(&NOMINAL_LIMITS)
    }

    pub(crate) fn validate_data(&self) -> Result<(), Error> {
        self.validate(&DATA_LIMITS)
    }

    fn validate(&self, limits: &BitTimingLimits) -> Result<(), Error> {
        let in_range = (1..=limits.propagation_segment).contains(&self.propagation_segment)
            && (1..=limits.phase_segment1).contains(&self.phase_segment1)
            && (1..=limits.phase_segment2).contains(&self.phase_segment2)
            && (1..=limits.prescaler).contains(&self.prescaler)
            && (1..=limits.resync_jump_width).contains(&self.resync_jump_width);
        if in_range {
            Ok(())
        } else {
            Err(Error::InvalidBitTiming)
        }
    }
}

/// Protocol engine clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ClockSource {
    Oscillator,
    Peripheral,
}

impl ClockSource {
    pub(crate) const fn clksrc(&self) -> bool {
        matches!(self, ClockSource::Peripheral)
    }
}

/// Receive mailboxes match against the shared RXMGMASK/RX14MASK/RX15MASK registers or against one
/// RXIMR register each. Individual masking also enables the receive queue behaviour where a
/// frame matching several mailboxes goes to the first free one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxMaskType {
    Global,
    Individual,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FdConfig {
    pub data_bit_timing: BitTiming,
    /// Transmit the data phase of frames flagged with BRS at the data bit rate.
    pub bitrate_switch: bool,
    pub region0: PayloadSize,
    pub region1: PayloadSize,
    /// ISO 11898-1:2015 CAN FD, as opposed to the original Bosch protocol.
    pub iso: bool,
    /// Transceiver delay compensation offset in engine clock cycles (0..=31), `None` disables it.
    pub transceiver_delay_compensation: Option<u8>,
}

impl Default for FdConfig {
    fn default() -> Self {
        Self {
            data_bit_timing: BitTiming::data_default(),
            bitrate_switch: true,
            region0: PayloadSize::_64Bytes,
            region1: PayloadSize::_64Bytes,
            iso: true,
            transceiver_delay_compensation: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RxFifoConfig {
    pub format: IdFilterFormat,
    /// CTRL2.RFFN, the filter table holds `(filter_groups + 1) * 8` elements. Valid values are 0
    /// to 15.
    pub filter_groups: u8,
}

/// Iteration ceilings of the bounded hardware polls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timeouts {
    /// Freeze entry, which has to wait for the bus to go idle.
    pub freeze_iterations: u32,
    /// Freeze exit, module enable/disable and soft reset.
    pub config_iterations: u32,
    /// Mailbox deactivation, waiting for a busy mailbox or an abort to complete.
    pub mailbox_iterations: u32,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            freeze_iterations: 100_000,
            config_iterations: 1_000_000,
            mailbox_iterations: 10_000_000,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FlexCanConfig {
    /// Number of mailboxes taking part in matching and arbitration, 1 to 64.
    pub(crate) max_mailboxes: u8,
    pub(crate) clock_source: ClockSource,
    pub(crate) nominal_bit_timing: BitTiming,
    pub(crate) fd: Option<FdConfig>,
    pub(crate) rx_fifo: Option<RxFifoConfig>,
    pub(crate) mode: OperationMode,
    pub(crate) rx_mask_type: RxMaskType,
    pub(crate) abort_enable: bool,
    pub(crate) local_priority: bool,
    pub(crate) self_reception: bool,
    pub(crate) warnings: bool,
    pub(crate) bus_off_recovery: BusOffRecovery,
    /// Disable and re-enable the module before the soft reset, needed to change the clock source.
    pub(crate) reset_module: bool,
    pub(crate) timeouts: Timeouts,
}

impl FlexCanConfig {
    /// Sets the number of mailboxes, see [`MessageRamLayout::max_mailbox_limit`] for the upper
    /// bound of a given FD layout.
    #[inline]
    pub const fn set_max_mailboxes(mut self, max_mailboxes: u8) -> Self {
        self.max_mailboxes = max_mailboxes;
        self
    }

    /// Only applied when [`FlexCanConfig::set_reset_module`] is on, CTRL1.CLKSRC is writable
    /// only while the module is disabled.
    #[inline]
    pub const fn set_clock_source(mut self, clock_source: ClockSource) -> Self {
        self.clock_source = clock_source;
        self
    }

    #[inline]
    pub const fn set_nominal_bit_timing(mut self, timing: BitTiming) -> Self {
        self.nominal_bit_timing = timing;
        self
    }

    /// Enables CAN FD. The RX FIFO is unavailable with CAN FD.
    #[inline]
    pub const fn set_fd(mut self, fd: Option<FdConfig>) -> Self {
        self.fd = fd;
        self
    }

    /// Enables the legacy RX FIFO, which takes over mailbox 0 and the slots after it.
    #[inline]
    pub const fn set_rx_fifo(mut self, rx_fifo: Option<RxFifoConfig>) -> Self {
        self.rx_fifo = rx_fifo;
        self
    }

    /// Mode entered at the end of [`FlexCan::init`].
    #[inline]
    pub const fn set_mode(mut self, mode: OperationMode) -> Self {
        self.mode = mode;
        self
    }

    #[inline]
    pub const fn set_rx_mask_type(mut self, rx_mask_type: RxMaskType) -> Self {
        self.rx_mask_type = rx_mask_type;
        self
    }

    /// Pending transmissions can be aborted by [`FlexCan::deactivate`]. Without it, deactivating
    /// a transmit mailbox just overwrites its code.
    #[inline]
    pub const fn set_abort_enable(mut self, enabled: bool) -> Self {
        self.abort_enable = enabled;
        self
    }

    /// Transmit arbitration takes the PRIO field of the mailbox into account, see
    /// [`FlexCan::send_with_local_priority`].
    #[inline]
    pub const fn set_local_priority(mut self, enabled: bool) -> Self {
        self.local_priority = enabled;
        self
    }

    /// Frames sent by this node are received by its own mailboxes when they match.
    #[inline]
    pub const fn set_self_reception(mut self, enabled: bool) -> Self {
        self.self_reception = enabled;
        self
    }

    /// TX/RX warning interrupts, raised when an error counter crosses 96.
    #[inline]
    pub const fn set_warnings(mut self, enabled: bool) -> Self {
        self.warnings = enabled;
        self
    }

    #[inline]
    pub const fn set_bus_off_recovery(mut self, recovery: BusOffRecovery) -> Self {
        self.bus_off_recovery = recovery;
        self
    }

    #[inline]
    pub const fn set_reset_module(mut self, enabled: bool) -> Self {
        self.reset_module = enabled;
        self
    }

    #[inline]
    pub const fn set_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Geometry the mailbox RAM will have once this configuration is applied.
    pub const fn layout(&self) -> MessageRamLayout {
        match self.fd {
            Some(fd) => MessageRamLayout {
                fd_enabled: true,
                region0: fd.region0,
                region1: fd.region1,
            },
            None => MessageRamLayout::classic(),
        }
    }

    /// Checks everything that can be checked before touching the hardware.
    pub(crate) fn validate(&self) -> Result<(), Error> {
        self.nominal_bit_timing.validate_nominal()?;
        if let Some(fd) = self.fd {
            fd.data_bit_timing.validate_data()?;
            if fd.transceiver_delay_compensation.is_some_and(|offset| offset > 31) {
                return Err(Error::InvalidParameter);
            }
            if self.rx_fifo.is_some() {
                return Err(Error::InvalidParameter);
            }
        }
        if let Some(fifo) = self.rx_fifo {
            if fifo.filter_groups > 15 {
                return Err(Error::InvalidParameter);
            }
        }
        if self.max_mailboxes == 0 || self.max_mailboxes > 64 {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }
}

impl Default for FlexCanConfig {
    #[inline]
    fn default() -> Self {
        Self {
            max_mailboxes: 16,
            clock_source: ClockSource::Oscillator,
            nominal_bit_timing: BitTiming::nominal_default(),
            fd: None,
            rx_fifo: None,
            mode: OperationMode::Normal,
            rx_mask_type: RxMaskType::Global,
            abort_enable: false,
            local_priority: false,
            self_reception: true,
            warnings: false,
            bus_off_recovery: BusOffRecovery::Automatic,
            reset_module: true,
            timeouts: Timeouts::default(),
        }
    }
}

impl<B: RegisterBlock> FlexCan<B> {
    /// Configures the arbitration phase bit timing, the timing of classic CAN frames.
    ///
    /// You can use <http://www.bittiming.can-wiki.info/> to calculate the segments. Enter the
    /// protocol engine clock as *Clock Rate*, not the CPU clock.
    pub fn set_nominal_bit_timing(&mut self, timing: BitTiming) -> Result<(), Error> {
        timing.validate_nominal()?;
        self.with_freeze(|can| {
            can.write_nominal_bit_timing(timing);
            Ok(())
        })
    }

    /// Configures the data phase bit timing of CAN FD frames with bit rate switching.
    pub fn set_data_bit_timing(&mut self, timing: BitTiming) -> Result<(), Error> {
        timing.validate_data()?;
        self.with_freeze(|can| {
            can.write_data_bit_timing(timing);
            Ok(())
        })
    }

    pub fn nominal_bit_timing(&self) -> BitTiming {
        let cbt = self.can.cbt().read();
        BitTiming {
            propagation_segment: cbt.epropseg() + 1,
            phase_segment1: cbt.epseg1() + 1,
            phase_segment2: cbt.epseg2() + 1,
            prescaler: cbt.epresdiv() + 1,
            resync_jump_width: cbt.erjw() + 1,
        }
    }

    pub fn data_bit_timing(&self) -> BitTiming {
        let fdcbt = self.can.fdcbt().read();
        BitTiming {
            propagation_segment: fdcbt.fpropseg() + 1,
            phase_segment1: fdcbt.fpseg1() + 1,
            phase_segment2: fdcbt.fpseg2() + 1,
            prescaler: fdcbt.fpresdiv() + 1,
            resync_jump_width: fdcbt.frjw() + 1,
        }
    }

    /// Writes CBT with the extended field widths. Needs freeze and a validated timing.
    pub(crate) fn write_nominal_bit_timing(&mut self, timing: BitTiming) {
        self.can.cbt().write_value(
            Cbt::new()
                .with_btf(true)
                .with_epresdiv(timing.prescaler - 1)
                .with_epropseg(timing.propagation_segment - 1)
                .with_epseg1(timing.phase_segment1 - 1)
                .with_epseg2(timing.phase_segment2 - 1)
                .with_erjw(timing.resync_jump_width - 1),
        );
    }

    pub(crate) fn write_data_bit_timing(&mut self, timing: BitTiming) {
        self.can.fdcbt().write_value(
            Fdcbt::new()
                .with_fpresdiv(timing.prescaler - 1)
                .with_fpropseg(timing.propagation_segment - 1)
                .with_fpseg1(timing.phase_segment1 - 1)
                .with_fpseg2(timing.phase_segment2 - 1)
                .with_frjw(timing.resync_jump_width - 1),
        );
    }

    pub fn set_rx_mask_type(&mut self, mask_type: RxMaskType) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can
                .mcr()
                .modify(|w| w.set_irmq(mask_type == RxMaskType::Individual));
            Ok(())
        })
    }

    /// Global acceptance mask of mailboxes other than 14 and 15, in the layout of the mailbox ID
    /// word (see [`crate::mailbox::id_mask`]). A set bit must match, a cleared bit is ignored.
    pub fn set_rx_mailbox_global_mask(&mut self, mask: u32) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.rxmgmask().write_value(mask);
            Ok(())
        })
    }

    pub fn set_rx_14_mask(&mut self, mask: u32) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.rx14mask().write_value(mask);
            Ok(())
        })
    }

    pub fn set_rx_15_mask(&mut self, mask: u32) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.rx15mask().write_value(mask);
            Ok(())
        })
    }

    /// Acceptance mask of one receive mailbox, used with [`RxMaskType::Individual`].
    pub fn set_rx_individual_mask(&mut self, mb: u8, mask: u32) -> Result<(), Error> {
        if mb > self.can.mcr().read().maxmb() {
            return Err(Error::InvalidMailbox);
        }
        self.with_freeze(|can| {
            can.can.rximr(mb as usize).write_value(mask);
            Ok(())
        })
    }
}
