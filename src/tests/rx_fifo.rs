use super::{init_can, sim};
use crate::mocks::SimulatedCan;
use crate::pac::registers::{MB_RAM_OFFSET, RXIMR_OFFSET, offsets};
use crate::{
    Error, FlexCan, FlexCanConfig, IdFilterFormat, IdType, MessageInfo, RxFifoConfig,
    RxFifoIdFilter,
};

const TABLE: usize = MB_RAM_OFFSET + 0x60;

fn fifo_can(filter_groups: u8) -> FlexCan<SimulatedCan> {
    init_can(FlexCanConfig::default().set_rx_fifo(Some(RxFifoConfig {
        format: IdFilterFormat::A,
        filter_groups,
    })))
}

#[test]
fn test_format_a_round_trip() {
    let mut can = fifo_can(0);
    assert_eq!(8, can.rx_fifo_filter_elements());

    let filters: [RxFifoIdFilter; 8] = core::array::from_fn(|n| match n % 3 {
        0 => RxFifoIdFilter::standard(0x100 + n as u16),
        1 => RxFifoIdFilter::extended(0x1234_5600 + n as u32),
        _ => RxFifoIdFilter {
            id: 0x7F0 + n as u32,
            extended: false,
            remote: true,
        },
    });
    can.configure_rx_fifo(IdFilterFormat::A, &filters).unwrap();

    assert_eq!(0, can.registers().mcr().read().idam());
    assert!(!can.is_frozen());
    for (n, filter) in filters.iter().enumerate() {
        assert_eq!(Ok(*filter), can.rx_fifo_filter(n));
    }
    assert_eq!(Err(Error::InvalidParameter), can.rx_fifo_filter(8));
    // Standard ID in bits 29:19 of the element.
    assert_eq!(0x100 << 19, sim(&can).peek(TABLE));
}

#[test]
fn test_format_b_packs_two_filters() {
    let mut can = fifo_can(0);
    let mut filters = [RxFifoIdFilter::standard(0); 8];
    filters[0] = RxFifoIdFilter::standard(0x123);
    filters[1] = RxFifoIdFilter {
        id: 0x456,
        extended: false,
        remote: true,
    };
    filters[2] = RxFifoIdFilter::extended(0x1FFF_8000);
    can.configure_rx_fifo(IdFilterFormat::B, &filters).unwrap();

    assert_eq!(1, can.registers().mcr().read().idam());
    assert_eq!(
        (0x123 << 3) << 16 | 1 << 15 | 0x456 << 3,
        sim(&can).peek(TABLE)
    );
    assert_eq!(1 << 30 | 0x3FFF << 16, sim(&can).peek(TABLE + 4));
    assert_eq!(4, table_writes(&can));
}

fn table_writes(can: &FlexCan<SimulatedCan>) -> usize {
    sim(can)
        .writes()
        .iter()
        .filter(|(offset, _)| (TABLE..TABLE + 32).contains(offset))
        .count()
}

#[test]
fn test_format_c_packs_four_filters() {
    let mut can = fifo_can(0);
    let mut filters = [RxFifoIdFilter::standard(0); 8];
    filters[0] = RxFifoIdFilter::standard(0x7F8);
    filters[1] = RxFifoIdFilter::standard(0x010);
    filters[2] = RxFifoIdFilter::extended(0x1FE0_0000);
    filters[3] = RxFifoIdFilter::extended(0x0020_0000);
    can.configure_rx_fifo(IdFilterFormat::C, &filters).unwrap();

    assert_eq!(2, can.registers().mcr().read().idam());
    assert_eq!(0xFF02_FF01, sim(&can).peek(TABLE));
    assert_eq!(2, table_writes(&can));
}

#[test]
fn test_format_d_writes_no_table() {
    let mut can = fifo_can(0);
    can.configure_rx_fifo(IdFilterFormat::D, &[]).unwrap();
    assert_eq!(3, can.registers().mcr().read().idam());
    assert!(
        sim(&can)
            .writes()
            .iter()
            .all(|(offset, _)| !(TABLE..TABLE + 32).contains(offset))
    );
}

#[test]
fn test_filter_count_must_match_table() {
    let mut can = fifo_can(1);
    assert_eq!(16, can.rx_fifo_filter_elements());
    for format in [IdFilterFormat::A, IdFilterFormat::B, IdFilterFormat::C] {
        for len in [8, 15, 17, 32] {
            let filters = [RxFifoIdFilter::standard(1); 32];
            assert_eq!(
                Err(Error::InvalidParameter),
                can.configure_rx_fifo(format, &filters[..len])
            );
        }
    }
    assert!(sim(&can).writes().is_empty());

    let filters = [RxFifoIdFilter::standard(1); 16];
    can.configure_rx_fifo(IdFilterFormat::B, &filters).unwrap();
    assert_eq!(8, table_writes(&can));
}

#[test]
fn test_mailboxes_behind_fifo() {
    let mut can = fifo_can(0);
    let info = MessageInfo::classic(0, IdType::Standard);
    assert_eq!(
        Err(Error::MailboxOverlapsRxFifo),
        can.send(7, &info, 0x1, &[])
    );
    assert_eq!(
        Err(Error::MailboxOverlapsRxFifo),
        can.configure_rx_mailbox(0, &info, 0x1)
    );
    assert_eq!(Ok(()), can.send(8, &info, 0x1, &[]));

    let mut can = fifo_can(1);
    assert_eq!(
        Err(Error::MailboxOverlapsRxFifo),
        can.send(9, &info, 0x1, &[])
    );
    assert_eq!(Ok(()), can.send(10, &info, 0x1, &[]));
}

#[test]
fn test_individual_mask_bound() {
    let mut can = fifo_can(0);
    assert_eq!(Ok(()), can.set_rx_fifo_individual_mask(8, 0x1FFF_FFFF));
    assert_eq!(0x1FFF_FFFF, sim(&can).peek(RXIMR_OFFSET + 8 * 4));
    assert_eq!(
        Err(Error::InvalidParameter),
        can.set_rx_fifo_individual_mask(9, 0)
    );
}

#[test]
fn test_global_mask() {
    let mut can = fifo_can(0);
    can.set_rx_fifo_global_mask(0x3FFF_FFFE).unwrap();
    assert_eq!(0x3FFF_FFFE, sim(&can).peek(offsets::RXFGMASK));
    assert!(!can.is_frozen());
}

#[test]
fn test_read_fifo_output() {
    let mut can = fifo_can(0);
    let sim = sim(&can);
    sim.poke(MB_RAM_OFFSET, 1 << 21 | 1 << 22 | 6 << 16 | 0xBEEF);
    sim.poke(MB_RAM_OFFSET + 4, 0x0ABC_DEF1);
    sim.poke(MB_RAM_OFFSET + 8, 0x1122_3344);
    sim.poke(MB_RAM_OFFSET + 12, 0x5566_7788);
    sim.poke(offsets::RXFIR, 3);

    let msg = can.read_rx_fifo().unwrap();
    assert_eq!(IdType::Extended, msg.id_type());
    assert_eq!(0x0ABC_DEF1, msg.id);
    assert_eq!(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66], msg.data());
    assert_eq!(0xBEEF, msg.time_stamp());
    assert_eq!(3, can.rx_fifo_filter_hit());
}
