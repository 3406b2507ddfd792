use crate::pac::common::RegisterBlock;
use crate::pac::registers::{BLOCK_LEN, MB_RAM_OFFSET, offsets};
use crate::util::mailbox_bit;
use core::cell::{Cell, RefCell};
use mockall::mock;

mock! {
    pub Block {}

    impl RegisterBlock for Block {
        fn read_word(&self, offset: usize) -> u32;
        fn write_word(&self, offset: usize, value: u32);
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Access {
    Read(usize),
    Write(usize, u32),
}

const MCR_MDIS: u32 = 1 << 31;
const MCR_FRZ: u32 = 1 << 30;
const MCR_HALT: u32 = 1 << 28;
const MCR_NOTRDY: u32 = 1 << 27;
const MCR_SOFTRST: u32 = 1 << 25;
const MCR_FRZACK: u32 = 1 << 24;
const MCR_LPMACK: u32 = 1 << 20;
const MCR_STATUS: u32 = MCR_NOTRDY | MCR_SOFTRST | MCR_FRZACK | MCR_LPMACK;
/// MDIS, FRZ, HALT, SUPV and MAXMB = 15, the acknowledge bits follow from those.
const MCR_RESET: u32 = 0xD080_000F;

/// Write-1-to-clear interrupt flags of ESR1, the rest of the register is read-only status.
const ESR1_W1C: u32 = 0x003B_0007;
const WU_MTC_W1C: u32 = 0x0003_0000;
const CODE_ABORT: u32 = 0b1001;

/// Register-level model of one FlexCAN instance: freeze, disable and soft reset handshakes,
/// write-1-to-clear flags and abort completion. Everything else behaves like plain memory.
pub struct SimulatedCan {
    words: RefCell<Vec<u32>>,
    log: RefCell<Vec<Access>>,
    stuck_freeze: Cell<bool>,
    /// (CS offset, mailbox) pairs whose abort completes as soon as it is requested.
    abort_hooks: RefCell<Vec<(usize, u8)>>,
}

impl SimulatedCan {
    pub fn new() -> Self {
        let sim = Self {
            words: RefCell::new(vec![0; BLOCK_LEN / 4]),
            log: RefCell::new(Vec::new()),
            stuck_freeze: Cell::new(false),
            abort_hooks: RefCell::new(Vec::new()),
        };
        sim.store_mcr(MCR_RESET);
        sim
    }

    /// Raw read without side effects or logging.
    pub fn peek(&self, offset: usize) -> u32 {
        self.words.borrow()[offset / 4]
    }

    /// Raw write without side effects or logging.
    pub fn poke(&self, offset: usize, value: u32) {
        self.words.borrow_mut()[offset / 4] = value;
    }

    /// Sets bits the way the hardware would, e.g. a status flag.
    pub fn raise(&self, offset: usize, bits: u32) {
        self.words.borrow_mut()[offset / 4] |= bits;
    }

    pub fn raise_mailbox_flag(&self, mb: u8) {
        let (reg, mask) = mailbox_bit(mb);
        self.raise(if reg == 0 { offsets::IFLAG1 } else { offsets::IFLAG2 }, mask);
    }

    /// From the next MCR write on, freeze requests are never acknowledged.
    pub fn set_stuck_freeze(&self, stuck: bool) {
        self.stuck_freeze.set(stuck);
    }

    /// Makes an abort of classic mailbox `mb` complete immediately.
    pub fn complete_abort(&self, mb: u8) {
        self.abort_hooks
            .borrow_mut()
            .push((MB_RAM_OFFSET + mb as usize * 16, mb));
    }

    pub fn take_log(&self) -> Vec<Access> {
        self.log.take()
    }

    pub fn writes(&self) -> Vec<(usize, u32)> {
        self.log
            .borrow()
            .iter()
            .filter_map(|a| match *a {
                Access::Write(offset, value) => Some((offset, value)),
                Access::Read(_) => None,
            })
            .collect()
    }

    fn store_mcr(&self, value: u32) {
        let mdis = value & MCR_MDIS != 0;
        let frozen = !mdis
            && value & MCR_FRZ != 0
            && value & MCR_HALT != 0
            && !self.stuck_freeze.get();
        let mut mcr = value & !MCR_STATUS;
        if mdis {
            mcr |= MCR_LPMACK | MCR_NOTRDY;
        }
        if frozen {
            mcr |= MCR_FRZACK | MCR_NOTRDY;
        }
        self.poke(offsets::MCR, mcr);
    }

    fn soft_reset(&self, mcr: u32) {
        for offset in [
            offsets::CTRL1,
            offsets::ECR,
            offsets::ESR1,
            offsets::IMASK1,
            offsets::IMASK2,
            offsets::IFLAG1,
            offsets::IFLAG2,
            offsets::CTRL2,
            offsets::CBT,
            offsets::FDCTRL,
            offsets::FDCBT,
            offsets::TIMER,
        ] {
            self.poke(offset, 0);
        }
        self.store_mcr((MCR_RESET & !MCR_MDIS) | (mcr & MCR_MDIS));
    }
}

impl RegisterBlock for SimulatedCan {
    fn read_word(&self, offset: usize) -> u32 {
        self.log.borrow_mut().push(Access::Read(offset));
        self.peek(offset)
    }

    fn write_word(&self, offset: usize, value: u32) {
        self.log.borrow_mut().push(Access::Write(offset, value));
        match offset {
            offsets::MCR if value & MCR_SOFTRST != 0 => self.soft_reset(value),
            offsets::MCR => self.store_mcr(value),
            offsets::ESR1 => self.poke(offset, self.peek(offset) & !(value & ESR1_W1C)),
            offsets::IFLAG1 | offsets::IFLAG2 | offsets::ERRSR => {
                self.poke(offset, self.peek(offset) & !value)
            }
            offsets::WU_MTC => self.poke(offset, self.peek(offset) & !(value & WU_MTC_W1C)),
            _ => {
                self.poke(offset, value);
                if (value >> 24) & 0xF == CODE_ABORT {
                    let hooks = self.abort_hooks.borrow();
                    if let Some(&(_, mb)) = hooks.iter().find(|(o, _)| *o == offset) {
                        self.raise_mailbox_flag(mb);
                    }
                }
            }
        }
    }
}
