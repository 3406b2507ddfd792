use super::{classic_can, sim};
use crate::low_power::{
    BusOffRecovery, ErrorCounters, FaultConfinement, PnFilterCombination, PnFilterMode,
    PnIdFilter, PretendedNetworkingConfig,
};
use crate::pac::registers::{WMB_OFFSET, offsets};
use crate::{Error, IdType, Interrupt};

#[test]
fn test_pretended_networking_config() {
    let mut can = classic_can();
    let config = PretendedNetworkingConfig {
        combination: PnFilterCombination::IdAndPayloadRepeated,
        id_filter_mode: PnFilterMode::Range,
        payload_filter_mode: PnFilterMode::Exact,
        match_count: 3,
        match_timeout: 0x1234,
        wakeup_on_timeout: true,
        id_filter1: PnIdFilter {
            id: 0x123,
            extended: false,
            remote: false,
        },
        id_filter2: PnIdFilter {
            id: 0x1ABC_DEF0,
            extended: true,
            remote: true,
        },
        dlc_low: 2,
        dlc_high: 8,
        payload_filter1: [1, 2, 3, 4, 5, 6, 7, 8],
        ..PretendedNetworkingConfig::default()
    };
    can.configure_pretended_networking(true, &config).unwrap();

    let sim = sim(&can);
    assert!(can.registers().mcr().read().pnet_en());
    assert!(!can.is_frozen());
    assert_eq!(0b11 | 0b11 << 2 | 3 << 8 | 1 << 16 | 1 << 17, sim.peek(offsets::CTRL1_PN));
    assert_eq!(0x1234, sim.peek(offsets::CTRL2_PN));
    assert_eq!(0x123 << 18, sim.peek(offsets::FLT_ID1));
    assert_eq!(0x1ABC_DEF0 | 1 << 29 | 1 << 30, sim.peek(offsets::FLT_ID2_IDMASK));
    assert_eq!(8 | 2 << 16, sim.peek(offsets::FLT_DLC));
    assert_eq!(0x0102_0304, sim.peek(offsets::PL1_LO));
    assert_eq!(0x0506_0708, sim.peek(offsets::PL1_HI));
    assert_eq!(0xFFFF_FFFF, sim.peek(offsets::PL2_PLMASK_LO));
    assert!(can.is_interrupt_enabled(Interrupt::PnMatch));
    assert!(can.is_interrupt_enabled(Interrupt::PnTimeout));

    can.configure_pretended_networking(false, &config).unwrap();
    assert!(!can.registers().mcr().read().pnet_en());
    assert!(!can.is_interrupt_enabled(Interrupt::PnMatch));
    assert!(!can.is_interrupt_enabled(Interrupt::PnTimeout));
}

#[test]
fn test_pretended_networking_rejects_bad_config() {
    let mut can = classic_can();
    let config = PretendedNetworkingConfig {
        match_count: 0,
        ..PretendedNetworkingConfig::default()
    };
    assert_eq!(
        Err(Error::InvalidParameter),
        can.configure_pretended_networking(true, &config)
    );
    let config = PretendedNetworkingConfig {
        dlc_low: 5,
        dlc_high: 4,
        ..PretendedNetworkingConfig::default()
    };
    assert_eq!(
        Err(Error::InvalidParameter),
        can.configure_pretended_networking(true, &config)
    );
    assert!(sim(&can).writes().is_empty());
}

#[test]
fn test_wakeup_messages() {
    let can = classic_can();
    let sim = sim(&can);
    sim.poke(WMB_OFFSET, 3 << 16 | 1 << 21 | 1 << 22);
    sim.poke(WMB_OFFSET + 4, 0x0123_4567);
    sim.poke(WMB_OFFSET + 8, 0xAABB_CCDD);
    sim.poke(WMB_OFFSET + 16, 8 << 16 | 1 << 20);
    sim.poke(WMB_OFFSET + 16 + 4, 0x7FF << 18);
    sim.poke(WMB_OFFSET + 16 + 8, 0x0102_0304);
    sim.poke(WMB_OFFSET + 16 + 12, 0x0506_0708);

    let msg = can.wakeup_message(0).unwrap();
    assert_eq!(IdType::Extended, msg.id_type());
    assert_eq!(0x0123_4567, msg.id);
    assert_eq!(&[0xAA, 0xBB, 0xCC], msg.data());

    let msg = can.wakeup_message(1).unwrap();
    assert_eq!(IdType::Standard, msg.id_type());
    assert_eq!(0x7FF, msg.id);
    assert!(msg.is_remote());
    assert_eq!(&[1, 2, 3, 4, 5, 6, 7, 8], msg.data());

    assert_eq!(Err(Error::InvalidParameter), can.wakeup_message(4).map(|_| ()));
}

#[test]
fn test_bus_off_recovery() {
    let mut can = classic_can();
    can.set_bus_off_recovery(BusOffRecovery::Manual);
    assert!(can.registers().ctrl1().read().boffrec());
    assert!(sim(&can).writes().iter().all(|(offset, _)| *offset != offsets::MCR));

    can.recover_from_bus_off();
    assert!(!can.registers().ctrl1().read().boffrec());
}

#[test]
fn test_error_state() {
    let can = classic_can();
    assert_eq!(FaultConfinement::ErrorActive, can.fault_confinement());
    sim(&can).poke(offsets::ESR1, 0b01 << 4);
    assert_eq!(FaultConfinement::ErrorPassive, can.fault_confinement());
    sim(&can).poke(offsets::ESR1, 0b11 << 4);
    assert_eq!(FaultConfinement::BusOff, can.fault_confinement());

    sim(&can).poke(offsets::ECR, 0x0403_0201);
    assert_eq!(
        ErrorCounters {
            tx: 1,
            rx: 2,
            tx_fast: 3,
            rx_fast: 4,
        },
        can.error_counters()
    );
}

#[test]
fn test_wakeup_and_doze() {
    let mut can = classic_can();
    can.configure_self_wakeup(true, true).unwrap();
    let mcr = can.registers().mcr().read();
    assert!(mcr.slfwak());
    assert!(mcr.waksrc());
    assert!(!can.is_frozen());

    can.set_doze_mode(true).unwrap();
    assert!(can.registers().mcr().read().doze());
    can.set_doze_mode(false).unwrap();
    assert!(!can.registers().mcr().read().doze());
}
