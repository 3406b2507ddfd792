use crate::config::{FlexCanConfig, Timeouts};
use crate::interrupt::State;
use crate::low_power::BusOffRecovery;
use crate::message_ram_layout::{
    MessageRamLayout, PayloadSize, rx_fifo_last_occupied_mailbox,
};
use crate::pac::common::{Mmio, Reg, RegisterBlock};
use crate::pac::registers::{
    Can, FD_SCRATCH_END, FD_SCRATCH_OFFSET, MB_RAM_BLOCK_LEN, RXIMR_COUNT,
};
use crate::pac::{CAN0_REGISTER_BLOCK_ADDR, CAN1_REGISTER_BLOCK_ADDR};
use crate::util::checked_wait;
use crate::{Error, RxMaskType};
use static_cell::StaticCell;

/// FlexCAN instance number as an enum
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Instance {
    Can0,
    Can1,
}

impl Instance {
    pub(crate) const fn register_block_addr(&self) -> *mut () {
        match self {
            Instance::Can0 => CAN0_REGISTER_BLOCK_ADDR,
            Instance::Can1 => CAN1_REGISTER_BLOCK_ADDR,
        }
    }
}

/// Protocol operation modes, plus the two configuration states.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OperationMode {
    Normal,
    /// Transmitted frames are received back internally, nothing is driven on the bus. Self
    /// reception is forced on.
    Loopback,
    /// Receives and acknowledges nothing, never drives the bus.
    ListenOnly,
    /// Protocol halted, configuration registers writable.
    Freeze,
    /// Module clocks stopped.
    Disabled,
}

static CAN0_TAKEN: StaticCell<()> = StaticCell::new();
static CAN1_TAKEN: StaticCell<()> = StaticCell::new();

/// One FlexCAN controller: its registers, interrupt callbacks and cached status.
pub struct FlexCan<B> {
    pub(crate) can: Can<B>,
    pub(crate) instance: Instance,
    pub(crate) state: State<B>,
    pub(crate) timeouts: Timeouts,
}

impl FlexCan<Mmio> {
    /// Hands out the memory-mapped instance. This method can be called only once per instance,
    /// otherwise Error::PeripheralTaken is returned.
    pub fn take(instance: Instance) -> Result<Self, Error> {
        let cell = match instance {
            Instance::Can0 => &CAN0_TAKEN,
            Instance::Can1 => &CAN1_TAKEN,
        };
        cell.try_init(()).ok_or(Error::PeripheralTaken)?;
        let block = unsafe { Mmio::from_ptr(instance.register_block_addr()) };
        Ok(Self::new(instance, block))
    }
}

impl<B: RegisterBlock> FlexCan<B> {
    /// Driver over an arbitrary register backend. Nothing is written until [`FlexCan::init`].
    pub fn new(instance: Instance, block: B) -> Self {
        Self {
            can: Can::new(block),
            instance,
            state: State::new(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn instance(&self) -> Instance {
        self.instance
    }

    pub fn registers(&self) -> &Can<B> {
        &self.can
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn set_timeouts(&mut self, timeouts: Timeouts) {
        self.timeouts = timeouts;
    }

    /// Mailbox RAM geometry as currently configured in hardware.
    pub fn layout(&self) -> MessageRamLayout {
        let fdctrl = self.can.fdctrl().read();
        MessageRamLayout {
            fd_enabled: self.can.mcr().read().fden(),
            region0: PayloadSize::from_config_register(fdctrl.mbdsr0()),
            region1: PayloadSize::from_config_register(fdctrl.mbdsr1()),
        }
    }

    /// Rejects indices past MCR.MAXMB and, with the RX FIFO on, indices whose slot is covered by
    /// the FIFO engine or its filter table.
    pub(crate) fn check_mailbox(&self, idx: u8) -> Result<(), Error> {
        let mcr = self.can.mcr().read();
        if idx > mcr.maxmb() {
            return Err(Error::InvalidMailbox);
        }
        if mcr.rfen() && idx <= rx_fifo_last_occupied_mailbox(self.can.ctrl2().read().rffn()) {
            return Err(Error::MailboxOverlapsRxFifo);
        }
        Ok(())
    }

    /// IFLAG1 for register 0, IFLAG2 for register 1.
    pub(crate) fn iflag(&self, reg: usize) -> Reg<'_, B, u32> {
        if reg == 0 {
            self.can.iflag1()
        } else {
            self.can.iflag2()
        }
    }

    pub(crate) fn imask(&self, reg: usize) -> Reg<'_, B, u32> {
        if reg == 0 {
            self.can.imask1()
        } else {
            self.can.imask2()
        }
    }

    pub fn is_frozen(&self) -> bool {
        self.can.mcr().read().frzack()
    }

    /// Requests freeze mode and waits for the controller to stop. The controller finishes the
    /// frame in progress first, so this can take up to one frame time.
    ///
    /// Register state is unspecified after a timeout.
    pub fn enter_freeze(&mut self) -> Result<(), Error> {
        self.can.mcr().modify(|w| {
            w.set_frz(true);
            w.set_halt(true);
        });
        checked_wait(
            || !self.can.mcr().read().notrdy(),
            self.timeouts.freeze_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())?;
        checked_wait(
            || !self.can.mcr().read().frzack(),
            self.timeouts.freeze_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())?;
        Ok(())
    }

    pub fn exit_freeze(&mut self) -> Result<(), Error> {
        self.can.mcr().modify(|w| {
            w.set_halt(false);
            w.set_frz(false);
        });
        checked_wait(
            || self.can.mcr().read().frzack(),
            self.timeouts.config_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())?;
        Ok(())
    }

    /// Runs `f` with the controller frozen. Freeze is only left again if this call entered it, so
    /// a caller can freeze once and batch several configuration calls.
    ///
    /// The first error wins: a failed entry skips `f`, an error from `f` is returned even if
    /// leaving freeze fails afterwards.
    pub fn with_freeze<R>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let entered = if self.is_frozen() {
            false
        } else {
            self.enter_freeze()?;
            true
        };
        let result = f(self);
        if entered {
            let exited = self.exit_freeze();
            return result.and_then(|r| exited.map(|_| r));
        }
        result
    }

    pub fn enable_module(&mut self) -> Result<(), Error> {
        if !self.can.mcr().read().mdis() {
            return Ok(());
        }
        self.can.mcr().modify(|w| w.set_mdis(false));
        checked_wait(
            || self.can.mcr().read().lpmack(),
            self.timeouts.config_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())
    }

    pub fn disable_module(&mut self) -> Result<(), Error> {
        self.can.mcr().modify(|w| w.set_mdis(true));
        checked_wait(
            || !self.can.mcr().read().lpmack(),
            self.timeouts.config_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())
    }

    /// Resets every register except the clock source and the memory error control, mailbox RAM
    /// is left as is.
    pub fn soft_reset(&mut self) -> Result<(), Error> {
        self.can.mcr().modify(|w| w.set_softrst(true));
        checked_wait(
            || self.can.mcr().read().softrst(),
            self.timeouts.config_iterations,
        )
        .inspect_err(|_| self.log_mode_timeout())
    }

    /// Writes every RAM-backed location once. Needs freeze.
    fn clear_ram(&mut self) {
        // The RAM is ECC protected and powers up with random content. Reading a location that was
        // never written reports a non-correctable error, so all of it gets a valid pattern here.
        self.can.ctrl2().modify(|w| w.set_wrmfrz(true));

        for offset in (0..2 * MB_RAM_BLOCK_LEN).step_by(4) {
            self.can.mb_word(offset).write_value(0);
        }
        for n in 0..RXIMR_COUNT {
            self.can.rximr(n).write_value(0xFFFF_FFFF);
        }
        self.can.rxmgmask().write_value(0xFFFF_FFFF);
        self.can.rx14mask().write_value(0xFFFF_FFFF);
        self.can.rx15mask().write_value(0xFFFF_FFFF);
        self.can.rxfgmask().write_value(0xFFFF_FFFF);
        for offset in (FD_SCRATCH_OFFSET..FD_SCRATCH_END).step_by(4) {
            self.can.block().write_word(offset, 0);
        }

        self.can.ctrl2().modify(|w| w.set_wrmfrz(false));
    }

    /// Full initialization from any state. Steps that already ran are not undone when a later one
    /// fails, call `init` again to start over.
    pub fn init(&mut self, config: &FlexCanConfig) -> Result<(), Error> {
        config.validate()?;
        self.timeouts = config.timeouts;

        #[cfg(feature = "defmt")]
        defmt::debug!("{}: init", self.instance);

        if config.reset_module {
            self.disable_module()?;
            self.can
                .ctrl1()
                .modify(|w| w.set_clksrc(config.clock_source.clksrc()));
        }
        self.enable_module()?;
        self.enter_freeze()?;
        self.soft_reset()?;
        self.enter_freeze()?;
        self.clear_ram();

        match config.fd {
            Some(fd) => {
                self.can.mcr().modify(|w| w.set_fden(true));
                self.can.fdctrl().modify(|w| {
                    w.set_fdrate(fd.bitrate_switch);
                    w.set_mbdsr0(fd.region0.config_register());
                    w.set_mbdsr1(fd.region1.config_register());
                    w.set_tdcen(fd.transceiver_delay_compensation.is_some());
                    w.set_tdcoff(fd.transceiver_delay_compensation.unwrap_or(0) & 0x1F);
                });
                self.can.ctrl2().modify(|w| w.set_isocanfden(fd.iso));
            }
            None => {
                self.can.mcr().modify(|w| w.set_fden(false));
                self.can.fdctrl().modify(|w| w.set_fdrate(false));
            }
        }

        self.write_nominal_bit_timing(config.nominal_bit_timing);
        if let Some(fd) = config.fd {
            self.write_data_bit_timing(fd.data_bit_timing);
        }

        let limit = self.layout().max_mailbox_limit();
        if config.max_mailboxes as usize > limit {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "{} mailboxes requested, the layout holds {}",
                config.max_mailboxes,
                limit
            );
            return Err(Error::TooManyMailboxes);
        }
        self.can.mcr().modify(|w| {
            w.set_maxmb(config.max_mailboxes - 1);
            w.set_irmq(config.rx_mask_type == RxMaskType::Individual);
            w.set_srxdis(!config.self_reception);
            w.set_aen(config.abort_enable);
            w.set_lprioen(config.local_priority);
            w.set_wrnen(config.warnings);
        });
        self.can.ctrl1().modify(|w| {
            w.set_boffrec(config.bus_off_recovery == BusOffRecovery::Manual);
        });

        match config.rx_fifo {
            Some(fifo) => {
                self.can.ctrl2().modify(|w| w.set_rffn(fifo.filter_groups));
                self.can.mcr().modify(|w| {
                    w.set_rfen(true);
                    w.set_idam(fifo.format.idam());
                });
            }
            None => self.can.mcr().modify(|w| w.set_rfen(false)),
        }

        // Soft reset cleared every interrupt enable bit.
        self.state.clear_masks();
        match config.mode {
            OperationMode::Freeze => Ok(()),
            OperationMode::Disabled => self.disable_module(),
            mode => {
                self.write_running_mode(mode);
                self.exit_freeze()
            }
        }
    }

    pub fn set_operation_mode(&mut self, mode: OperationMode) -> Result<(), Error> {
        #[cfg(feature = "defmt")]
        defmt::debug!("{}: mode {}", self.instance, mode);

        match mode {
            OperationMode::Disabled => self.disable_module(),
            OperationMode::Freeze => {
                self.enable_module()?;
                self.enter_freeze()
            }
            mode => {
                self.enable_module()?;
                self.with_freeze(|can| {
                    can.write_running_mode(mode);
                    Ok(())
                })
            }
        }
    }

    /// CTRL1.LPB and CTRL1.LOM, writable in freeze only. Loopback needs self reception.
    fn write_running_mode(&mut self, mode: OperationMode) {
        let lpb = mode == OperationMode::Loopback;
        self.can.ctrl1().modify(|w| {
            w.set_lpb(lpb);
            w.set_lom(mode == OperationMode::ListenOnly);
        });
        if lpb {
            self.can.mcr().modify(|w| w.set_srxdis(false));
        }
    }

    pub fn operation_mode(&self) -> OperationMode {
        let mcr = self.can.mcr().read();
        if mcr.mdis() {
            return OperationMode::Disabled;
        }
        if mcr.frzack() {
            return OperationMode::Freeze;
        }
        let ctrl1 = self.can.ctrl1().read();
        if ctrl1.lpb() {
            OperationMode::Loopback
        } else if ctrl1.lom() {
            OperationMode::ListenOnly
        } else {
            OperationMode::Normal
        }
    }

    #[inline]
    fn log_mode_timeout(&self) {
        #[cfg(feature = "defmt")]
        defmt::warn!(
            "{}: mode change timed out, MCR = {:#010x}",
            self.instance,
            u32::from(self.can.mcr().read())
        );
    }
}
