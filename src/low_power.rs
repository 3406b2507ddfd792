use crate::flexcan::FlexCan;
use crate::interrupt::Interrupt;
use crate::mailbox::ReceivedMessage;
use crate::message_ram_layout::dlc_to_len;
use crate::pac::common::RegisterBlock;
use crate::pac::message_ram::{IdKind, MbCs, MbId};
use crate::pac::registers::WMB_COUNT;
use crate::pac::registers::regs::{Ctrl1Pn, Ctrl2Pn, FltDlc, FltId1, FltId2Idmask};
use crate::Error;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusOffRecovery {
    /// The controller rejoins the bus after 128 occurrences of 11 recessive bits.
    Automatic,
    /// The controller stays bus off until [`FlexCan::recover_from_bus_off`].
    Manual,
}

/// CAN fault confinement state, ESR1.FLTCONF.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultConfinement {
    ErrorActive,
    ErrorPassive,
    BusOff,
}

/// Transmit and receive error counters, ECR.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorCounters {
    pub tx: u8,
    pub rx: u8,
    /// Errors in the data phase of CAN FD frames with bit rate switching.
    pub tx_fast: u8,
    pub rx_fast: u8,
}

/// Which criteria a frame must meet to count as a wakeup match.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PnFilterCombination {
    Id = 0b00,
    IdAndPayload = 0b01,
    /// ID matched `match_count` times.
    IdRepeated = 0b10,
    /// ID and payload matched `match_count` times.
    IdAndPayloadRepeated = 0b11,
}

/// How ID filter 1 and ID filter 2 / mask are combined, and likewise for the payload filters.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum PnFilterMode {
    /// Filter 1 compared under the mask in filter 2.
    Exact = 0b00,
    GreaterOrEqual = 0b01,
    SmallerOrEqual = 0b10,
    /// Between filter 1 and filter 2, inclusive.
    Range = 0b11,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PnIdFilter {
    pub id: u32,
    pub extended: bool,
    pub remote: bool,
}

impl PnIdFilter {
    /// Identifier field value, a standard ID sits in bits 28:18 like in a mailbox.
    const fn id_field(&self) -> u32 {
        if self.extended {
            self.id & 0x1FFF_FFFF
        } else {
            (self.id & 0x7FF) << MbId::STD_SHIFT
        }
    }
}

/// Pretended networking filter set. While the chip sleeps the controller only checks incoming
/// frames against it and wakes the system on a match or on timeout.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PretendedNetworkingConfig {
    pub combination: PnFilterCombination,
    pub id_filter_mode: PnFilterMode,
    pub payload_filter_mode: PnFilterMode,
    /// Number of matches needed for the repeated combinations, 1 to 255.
    pub match_count: u8,
    /// Wakeup timeout in units of 64 bit times, 0 disables it.
    pub match_timeout: u16,
    pub wakeup_on_match: bool,
    pub wakeup_on_timeout: bool,
    pub id_filter1: PnIdFilter,
    /// Upper bound with [`PnFilterMode::Range`], acceptance mask with [`PnFilterMode::Exact`].
    pub id_filter2: PnIdFilter,
    /// Accepted DLC range, inclusive.
    pub dlc_low: u8,
    pub dlc_high: u8,
    pub payload_filter1: [u8; 8],
    /// Upper bound with [`PnFilterMode::Range`], acceptance mask with [`PnFilterMode::Exact`].
    pub payload_filter2: [u8; 8],
}

impl Default for PretendedNetworkingConfig {
    fn default() -> Self {
        Self {
            combination: PnFilterCombination::Id,
            id_filter_mode: PnFilterMode::Exact,
            payload_filter_mode: PnFilterMode::Exact,
            match_count: 1,
            match_timeout: 0,
            wakeup_on_match: true,
            wakeup_on_timeout: false,
            id_filter1: PnIdFilter {
                id: 0,
                extended: false,
                remote: false,
            },
            id_filter2: PnIdFilter {
                id: 0x7FF,
                extended: true,
                remote: true,
            },
            dlc_low: 0,
            dlc_high: 8,
            payload_filter1: [0; 8],
            payload_filter2: [0xFF; 8],
        }
    }
}

fn payload_words(payload: &[u8; 8]) -> (u32, u32) {
    (
        u32::from_be_bytes([payload[0], payload[1], payload[2], payload[3]]),
        u32::from_be_bytes([payload[4], payload[5], payload[6], payload[7]]),
    )
}

impl<B: RegisterBlock> FlexCan<B> {
    /// Programs the pretended networking filters and switches the feature on or off. With
    /// `enable` cleared, `config` is not looked at. The wakeup interrupts follow
    /// `wakeup_on_match` and `wakeup_on_timeout`.
    pub fn configure_pretended_networking(
        &mut self,
        enable: bool,
        config: &PretendedNetworkingConfig,
    ) -> Result<(), Error> {
        if enable
            && (config.match_count == 0
                || config.dlc_low > config.dlc_high
                || config.dlc_high > 15)
        {
            return Err(Error::InvalidParameter);
        }
        self.with_freeze(|can| {
            can.can.mcr().modify(|w| w.set_pnet_en(enable));
            if !enable {
                can.disable_interrupt(Interrupt::PnMatch);
                can.disable_interrupt(Interrupt::PnTimeout);
                return Ok(());
            }

            can.can.ctrl1_pn().write_value(
                Ctrl1Pn::new()
                    .with_fcs(config.combination as u8)
                    .with_idfs(config.id_filter_mode as u8)
                    .with_plfs(config.payload_filter_mode as u8)
                    .with_nmatch(config.match_count),
            );
            can.can
                .ctrl2_pn()
                .write_value(Ctrl2Pn::new().with_matchto(config.match_timeout));
            can.can.flt_id1().write_value(
                FltId1::new()
                    .with_flt_id1(config.id_filter1.id_field())
                    .with_flt_ide(config.id_filter1.extended)
                    .with_flt_rtr(config.id_filter1.remote),
            );
            can.can.flt_id2_idmask().write_value(
                FltId2Idmask::new()
                    .with_flt_id2_idmask(config.id_filter2.id_field())
                    .with_ide_msk(config.id_filter2.extended)
                    .with_rtr_msk(config.id_filter2.remote),
            );
            can.can.flt_dlc().write_value(
                FltDlc::new()
                    .with_flt_dlc_lo(config.dlc_low)
                    .with_flt_dlc_hi(config.dlc_high),
            );
            let (lo, hi) = payload_words(&config.payload_filter1);
            can.can.pl1_lo().write_value(lo);
            can.can.pl1_hi().write_value(hi);
            let (lo, hi) = payload_words(&config.payload_filter2);
            can.can.pl2_plmask_lo().write_value(lo);
            can.can.pl2_plmask_hi().write_value(hi);

            for (interrupt, enabled) in [
                (Interrupt::PnMatch, config.wakeup_on_match),
                (Interrupt::PnTimeout, config.wakeup_on_timeout),
            ] {
                if enabled {
                    can.enable_interrupt(interrupt);
                } else {
                    can.disable_interrupt(interrupt);
                }
            }
            Ok(())
        })
    }

    /// One of the four frames that matched the pretended networking filters, oldest first.
    pub fn wakeup_message(&self, n: usize) -> Result<ReceivedMessage, Error> {
        if n >= WMB_COUNT {
            return Err(Error::InvalidParameter);
        }
        let cs = self.can.wmb_cs(n).read();
        let id = self.can.wmb_id(n).read().id();
        let ide = if cs.ide() {
            IdKind::Extended
        } else {
            IdKind::Standard
        };
        let id = match ide {
            IdKind::Standard => MbId::new().with_id(id).std_id() as u32,
            IdKind::Extended => id,
        };
        let len = dlc_to_len(cs.dlc()).min(8);

        let mut data = [0u8; 64];
        data[..4].copy_from_slice(&self.can.wmb_d03(n).read().to_be_bytes());
        data[4..8].copy_from_slice(&self.can.wmb_d47(n).read().to_be_bytes());
        data[len..8].fill(0);

        Ok(ReceivedMessage {
            data_len: len as u8,
            cs: MbCs::from_bits(0)
                .with_dlc(cs.dlc())
                .with_ide(ide)
                .with_rtr(cs.rtr())
                .with_srr(cs.srr()),
            id,
            data,
        })
    }

    /// Frames that matched the pretended networking filters so far.
    pub fn pn_match_count(&self) -> u8 {
        self.can.wu_mtc().read().mcounter()
    }

    /// CTRL1.BOFFREC is not freeze protected.
    pub fn set_bus_off_recovery(&mut self, recovery: BusOffRecovery) {
        self.can
            .ctrl1()
            .modify(|w| w.set_boffrec(recovery == BusOffRecovery::Manual));
    }

    /// Starts recovery of a bus off controller in manual recovery mode. This leaves the recovery
    /// mode automatic, select [`BusOffRecovery::Manual`] again once
    /// [`Interrupt::BusOffDone`] fired.
    pub fn recover_from_bus_off(&mut self) {
        self.can.ctrl1().modify(|w| w.set_boffrec(false));
    }

    pub fn fault_confinement(&self) -> FaultConfinement {
        match self.can.esr1().read().fltconf() {
            0b00 => FaultConfinement::ErrorActive,
            0b01 => FaultConfinement::ErrorPassive,
            _ => FaultConfinement::BusOff,
        }
    }

    pub fn error_counters(&self) -> ErrorCounters {
        let ecr = self.can.ecr().read();
        ErrorCounters {
            tx: ecr.txerrcnt(),
            rx: ecr.rxerrcnt(),
            tx_fast: ecr.txerrcnt_fast(),
            rx_fast: ecr.rxerrcnt_fast(),
        }
    }

    /// Lets bus activity wake the controller from stop mode. With `low_pass_filter` set, short
    /// glitches on the RX line are not taken for bus activity.
    pub fn configure_self_wakeup(
        &mut self,
        enable: bool,
        low_pass_filter: bool,
    ) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.mcr().modify(|w| {
                w.set_slfwak(enable);
                w.set_waksrc(low_pass_filter);
            });
            Ok(())
        })
    }

    /// Lets the controller enter low power mode along with the core's doze mode.
    pub fn set_doze_mode(&mut self, enable: bool) -> Result<(), Error> {
        self.with_freeze(|can| {
            can.can.mcr().modify(|w| w.set_doze(enable));
            Ok(())
        })
    }
}
