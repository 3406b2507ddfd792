pub mod common;
pub mod message_ram;
pub mod registers;

pub(crate) mod mapping {
    pub(crate) const CAN0_REGISTER_BLOCK_ADDR: *mut () = 0x4002_4000 as *mut ();
    pub(crate) const CAN1_REGISTER_BLOCK_ADDR: *mut () = 0x4002_5000 as *mut ();
}

pub(crate) use mapping::*;
