mod low_power;
mod mode;
mod rx_fifo;

use crate::mocks::SimulatedCan;
use crate::{FdConfig, FlexCan, FlexCanConfig, Instance, Timeouts};

pub(crate) const FAST_TIMEOUTS: Timeouts = Timeouts {
    freeze_iterations: 10,
    config_iterations: 10,
    mailbox_iterations: 10,
};

pub(crate) fn init_can(config: FlexCanConfig) -> FlexCan<SimulatedCan> {
    let mut can = FlexCan::new(Instance::Can0, SimulatedCan::new());
    can.init(&config.set_timeouts(FAST_TIMEOUTS)).unwrap();
    can.registers().block().take_log();
    can
}

pub(crate) fn classic_can() -> FlexCan<SimulatedCan> {
    init_can(FlexCanConfig::default())
}

/// 64 byte payloads in both regions, 14 mailboxes.
pub(crate) fn fd_can() -> FlexCan<SimulatedCan> {
    init_can(
        FlexCanConfig::default()
            .set_fd(Some(FdConfig::default()))
            .set_max_mailboxes(14),
    )
}

pub(crate) fn sim(can: &FlexCan<SimulatedCan>) -> &SimulatedCan {
    can.registers().block()
}
