use super::{FAST_TIMEOUTS, classic_can, fd_can, init_can, sim};
use crate::mocks::{Access, SimulatedCan};
use crate::pac::registers::{MB_RAM_OFFSET, RXIMR_OFFSET, offsets};
use crate::{
    BitTiming, Error, FdConfig, FlexCan, FlexCanConfig, Instance, OperationMode, PayloadSize,
};

#[test]
fn test_init_enters_normal_mode() {
    let can = classic_can();
    assert_eq!(OperationMode::Normal, can.operation_mode());
    assert!(!can.is_frozen());
    let mcr = can.registers().mcr().read();
    assert_eq!(15, mcr.maxmb());
    assert!(!mcr.srxdis());
    assert!(!mcr.fden());
    assert!(!mcr.rfen());
}

#[test]
fn test_init_modes() {
    let can = init_can(
        FlexCanConfig::default()
            .set_mode(OperationMode::Loopback)
            .set_self_reception(false),
    );
    assert_eq!(OperationMode::Loopback, can.operation_mode());
    assert!(!can.registers().mcr().read().srxdis());

    let can = init_can(FlexCanConfig::default().set_mode(OperationMode::ListenOnly));
    assert_eq!(OperationMode::ListenOnly, can.operation_mode());

    let can = init_can(FlexCanConfig::default().set_mode(OperationMode::Freeze));
    assert_eq!(OperationMode::Freeze, can.operation_mode());

    let can = init_can(FlexCanConfig::default().set_mode(OperationMode::Disabled));
    assert_eq!(OperationMode::Disabled, can.operation_mode());
}

#[test]
fn test_mode_changes_after_init() {
    let mut can = classic_can();
    can.set_operation_mode(OperationMode::Disabled).unwrap();
    assert_eq!(OperationMode::Disabled, can.operation_mode());

    can.set_operation_mode(OperationMode::Loopback).unwrap();
    assert_eq!(OperationMode::Loopback, can.operation_mode());

    can.set_operation_mode(OperationMode::Normal).unwrap();
    assert_eq!(OperationMode::Normal, can.operation_mode());
    assert!(!can.registers().ctrl1().read().lpb());
}

#[test]
fn test_mode_change_keeps_caller_freeze() {
    let mut can = classic_can();
    can.enter_freeze().unwrap();
    can.set_operation_mode(OperationMode::Loopback).unwrap();
    assert!(can.is_frozen());
    assert!(can.registers().ctrl1().read().lpb());

    can.set_operation_mode(OperationMode::ListenOnly).unwrap();
    assert!(can.is_frozen());
    can.exit_freeze().unwrap();
    assert_eq!(OperationMode::ListenOnly, can.operation_mode());
}

#[test]
fn test_freeze_enter_exit() {
    let mut can = classic_can();
    can.enter_freeze().unwrap();
    assert!(can.is_frozen());
    assert!(can.registers().mcr().read().notrdy());
    can.exit_freeze().unwrap();
    assert!(!can.is_frozen());
    assert!(!can.registers().mcr().read().halt());
}

#[test]
fn test_freeze_timeout() {
    let mut can = classic_can();
    sim(&can).set_stuck_freeze(true);
    assert_eq!(Err(Error::Timeout), can.enter_freeze());
}

#[test]
fn test_with_freeze_keeps_caller_freeze() {
    let mut can = classic_can();
    can.enter_freeze().unwrap();
    can.set_rx_14_mask(0x1234).unwrap();
    can.set_rx_15_mask(0x5678).unwrap();
    assert!(can.is_frozen());
    can.exit_freeze().unwrap();

    assert_eq!(0x1234, can.registers().rx14mask().read());
    assert_eq!(0x5678, can.registers().rx15mask().read());
}

#[test]
fn test_with_freeze_restores_running_mode() {
    let mut can = classic_can();
    can.set_rx_mailbox_global_mask(0x1FFF_FFFF).unwrap();
    assert!(!can.is_frozen());
    assert_eq!(0x1FFF_FFFF, can.registers().rxmgmask().read());
}

#[test]
fn test_with_freeze_skips_body_when_entry_fails() {
    let mut can = classic_can();
    sim(&can).set_stuck_freeze(true);
    assert_eq!(Err(Error::Timeout), can.set_rx_14_mask(0));
    assert_eq!(0xFFFF_FFFF, sim(&can).peek(offsets::RX14MASK));
}

#[test]
fn test_with_freeze_leaves_freeze_after_body_error() {
    let mut can = classic_can();
    let result: Result<(), Error> = can.with_freeze(|can| {
        assert!(can.is_frozen());
        Err(Error::Busy)
    });
    assert_eq!(Err(Error::Busy), result);
    assert!(!can.is_frozen());
}

#[test]
fn test_invalid_bit_timing_leaves_registers_alone() {
    let mut can = fd_can();
    let cbt = sim(&can).peek(offsets::CBT);
    let fdcbt = sim(&can).peek(offsets::FDCBT);

    let nominal = BitTiming {
        phase_segment2: 0,
        ..BitTiming::nominal_default()
    };
    assert_eq!(Err(Error::InvalidBitTiming), can.set_nominal_bit_timing(nominal));
    let data = BitTiming {
        phase_segment1: 9,
        ..BitTiming::data_default()
    };
    assert_eq!(Err(Error::InvalidBitTiming), can.set_data_bit_timing(data));

    assert!(sim(&can).writes().is_empty());
    assert_eq!(cbt, sim(&can).peek(offsets::CBT));
    assert_eq!(fdcbt, sim(&can).peek(offsets::FDCBT));
}

#[test]
fn test_bit_timing_readback() {
    let mut can = fd_can();
    assert_eq!(BitTiming::nominal_default(), can.nominal_bit_timing());
    assert_eq!(BitTiming::data_default(), can.data_bit_timing());
    assert_eq!(
        (1 << 31) | (15 << 16) | (46 << 10) | (15 << 5) | 15,
        sim(&can).peek(offsets::CBT)
    );

    let timing = BitTiming {
        propagation_segment: 10,
        phase_segment1: 4,
        phase_segment2: 3,
        prescaler: 5,
        resync_jump_width: 2,
    };
    can.set_data_bit_timing(timing).unwrap();
    assert_eq!(timing, can.data_bit_timing());
    assert!(!can.is_frozen());
}

#[test]
fn test_init_clears_message_ram() {
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    let sim = can.registers().block();
    sim.poke(MB_RAM_OFFSET, 0xDEAD_BEEF);
    sim.poke(MB_RAM_OFFSET + 1020, 0xDEAD_BEEF);
    sim.poke(RXIMR_OFFSET + 4 * 63, 0);

    can.init(&FlexCanConfig::default().set_timeouts(FAST_TIMEOUTS))
        .unwrap();
    let sim = can.registers().block();
    assert_eq!(0, sim.peek(MB_RAM_OFFSET));
    assert_eq!(0, sim.peek(MB_RAM_OFFSET + 1020));
    assert_eq!(0xFFFF_FFFF, sim.peek(RXIMR_OFFSET + 4 * 63));
    for offset in [
        offsets::RXMGMASK,
        offsets::RX14MASK,
        offsets::RX15MASK,
        offsets::RXFGMASK,
    ] {
        assert_eq!(0xFFFF_FFFF, sim.peek(offset));
    }
    assert!(!can.registers().ctrl2().read().wrmfrz());
}

#[test]
fn test_init_soft_resets() {
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    can.registers().block().poke(offsets::IMASK1, 0xFFFF_FFFF);
    can.init(&FlexCanConfig::default().set_timeouts(FAST_TIMEOUTS))
        .unwrap();
    assert_eq!(0, can.registers().imask1().read());
    let log = can.registers().block().take_log();
    assert!(
        log.iter()
            .any(|a| matches!(*a, Access::Write(offsets::MCR, v) if v & (1 << 25) != 0))
    );
}

#[test]
fn test_init_rejects_too_many_mailboxes() {
    let fd = FdConfig {
        region0: PayloadSize::_64Bytes,
        region1: PayloadSize::_64Bytes,
        ..FdConfig::default()
    };
    let config = FlexCanConfig::default()
        .set_fd(Some(fd))
        .set_max_mailboxes(15)
        .set_timeouts(FAST_TIMEOUTS);
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    assert_eq!(Err(Error::TooManyMailboxes), can.init(&config));

    assert_eq!(Ok(()), can.init(&config.set_max_mailboxes(14)));
    assert_eq!(13, can.registers().mcr().read().maxmb());
}

#[test]
fn test_init_rejects_invalid_config() {
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    let config = FlexCanConfig::default().set_max_mailboxes(0);
    assert_eq!(Err(Error::InvalidParameter), can.init(&config));
    assert!(can.registers().block().writes().is_empty());

    let config = FlexCanConfig::default()
        .set_fd(Some(FdConfig::default()))
        .set_rx_fifo(Some(crate::RxFifoConfig {
            format: crate::IdFilterFormat::A,
            filter_groups: 0,
        }));
    assert_eq!(Err(Error::InvalidParameter), can.init(&config));
}

#[test]
fn test_init_without_module_reset() {
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    let config = FlexCanConfig::default()
        .set_reset_module(false)
        .set_timeouts(FAST_TIMEOUTS);
    can.init(&config).unwrap();
    assert_eq!(OperationMode::Normal, can.operation_mode());
}

#[test]
fn test_take_twice() {
    let can = FlexCan::take(Instance::Can1);
    assert!(can.is_ok());
    assert_eq!(Err(Error::PeripheralTaken), FlexCan::take(Instance::Can1).map(|_| ()));
}
