use bitfield_struct::bitfield;

/// Module Configuration Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Mcr {
    /// Number of the last message buffer
    #[bits(7)]
    pub maxmb: u8,
    #[bits(1)]
    _reserved0: u8,
    /// ID Acceptance Mode of the RX FIFO filter table
    #[bits(2)]
    pub idam: u8,
    #[bits(1)]
    _reserved1: u8,
    /// CAN FD operation enable
    pub fden: bool,
    /// Abort enable
    pub aen: bool,
    /// Local priority enable
    pub lprioen: bool,
    /// Pretended networking enable
    pub pnet_en: bool,
    pub dma: bool,
    /// Individual RX masking and queue enable
    pub irmq: bool,
    /// Self reception disable
    pub srxdis: bool,
    pub doze: bool,
    /// Wakeup source, low pass filtered when set
    pub waksrc: bool,
    /// Low-power mode acknowledge
    pub lpmack: bool,
    /// Warning interrupt enable
    pub wrnen: bool,
    /// Self wakeup
    pub slfwak: bool,
    pub supv: bool,
    /// Freeze mode acknowledge
    pub frzack: bool,
    /// Soft reset, cleared by hardware when done
    pub softrst: bool,
    /// Wakeup interrupt mask
    pub wakmsk: bool,
    /// Not ready, set while disabled, in freeze or in stop
    pub notrdy: bool,
    pub halt: bool,
    /// RX FIFO enable
    pub rfen: bool,
    /// Freeze enable
    pub frz: bool,
    /// Module disable
    pub mdis: bool,
}

/// Control 1 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Ctrl1 {
    #[bits(3)]
    pub propseg: u8,
    /// Listen-only mode
    pub lom: bool,
    /// Lowest buffer transmitted first
    pub lbuf: bool,
    pub tsyn: bool,
    /// Automatic bus-off recovery disabled when set
    pub boffrec: bool,
    pub smp: bool,
    #[bits(2)]
    _reserved0: u8,
    /// RX warning interrupt mask
    pub rwrnmsk: bool,
    /// TX warning interrupt mask
    pub twrnmsk: bool,
    /// Loop back mode
    pub lpb: bool,
    /// Clock source, peripheral clock when set
    pub clksrc: bool,
    /// Error interrupt mask
    pub errmsk: bool,
    /// Bus off interrupt mask
    pub boffmsk: bool,
    #[bits(3)]
    pub pseg2: u8,
    #[bits(3)]
    pub pseg1: u8,
    #[bits(2)]
    pub rjw: u8,
    pub presdiv: u8,
}

/// Control 2 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Ctrl2 {
    #[bits(11)]
    _reserved0: u16,
    /// Edge filter disable
    pub edfltdis: bool,
    /// ISO CAN FD enable
    pub isocanfden: bool,
    #[bits(1)]
    _reserved1: u8,
    /// Protocol exception enable
    pub prexcen: bool,
    pub timer_src: bool,
    /// Entire frame arbitration field comparison enable for RX mailboxes
    pub eacen: bool,
    /// Remote request storing, remote frames are stored like data frames when set
    pub rrs: bool,
    /// Mailboxes reception priority, mailboxes are matched before the RX FIFO when set
    pub mrp: bool,
    /// TX arbitration start delay
    #[bits(5)]
    pub tasd: u8,
    /// Number of RX FIFO filters
    #[bits(4)]
    pub rffn: u8,
    /// Write access to memory in freeze mode
    pub wrmfrz: bool,
    /// Error-correction configuration register write enable
    pub ecrwre: bool,
    /// Bus off done interrupt mask
    pub boffdonemsk: bool,
    /// Error interrupt mask for errors detected in the data phase of fast CAN FD frames
    pub errmsk_fast: bool,
}

/// CAN Bit Timing Register, extended nominal timing
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Cbt {
    #[bits(5)]
    pub epseg2: u8,
    #[bits(5)]
    pub epseg1: u8,
    #[bits(6)]
    pub epropseg: u8,
    #[bits(5)]
    pub erjw: u8,
    #[bits(10)]
    pub epresdiv: u16,
    /// Bit timing format, CBT is used instead of CTRL1 fields when set
    pub btf: bool,
}

/// CAN FD Bit Timing Register, data phase
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Fdcbt {
    #[bits(3)]
    pub fpseg2: u8,
    #[bits(2)]
    _reserved0: u8,
    #[bits(3)]
    pub fpseg1: u8,
    #[bits(2)]
    _reserved1: u8,
    #[bits(5)]
    pub fpropseg: u8,
    #[bits(1)]
    _reserved2: u8,
    #[bits(3)]
    pub frjw: u8,
    #[bits(1)]
    _reserved3: u8,
    #[bits(10)]
    pub fpresdiv: u16,
    #[bits(2)]
    _reserved4: u8,
}

/// CAN FD Control Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Fdctrl {
    /// Transceiver delay compensation value, read only
    #[bits(6)]
    pub tdcval: u8,
    #[bits(2)]
    _reserved0: u8,
    /// Transceiver delay compensation offset
    #[bits(5)]
    pub tdcoff: u8,
    #[bits(1)]
    _reserved1: u8,
    pub tdcfail: bool,
    /// Transceiver delay compensation enable
    pub tdcen: bool,
    /// Payload size of mailbox region 0
    #[bits(2)]
    pub mbdsr0: u8,
    #[bits(1)]
    _reserved2: u8,
    /// Payload size of mailbox region 1
    #[bits(2)]
    pub mbdsr1: u8,
    #[bits(10)]
    _reserved3: u16,
    /// Bit rate switch enable
    pub fdrate: bool,
}

/// Error and Status 1 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Esr1 {
    pub wakint: bool,
    pub errint: bool,
    pub boffint: bool,
    pub rx: bool,
    /// Fault confinement state
    #[bits(2)]
    pub fltconf: u8,
    pub tx: bool,
    pub idle: bool,
    pub rxwrn: bool,
    pub txwrn: bool,
    pub stferr: bool,
    pub frmerr: bool,
    pub crcerr: bool,
    pub ackerr: bool,
    pub bit0err: bool,
    pub bit1err: bool,
    pub rwrnint: bool,
    pub twrnint: bool,
    pub synch: bool,
    pub boffdoneint: bool,
    pub errint_fast: bool,
    pub errovr: bool,
    #[bits(4)]
    _reserved0: u8,
    pub stferr_fast: bool,
    pub frmerr_fast: bool,
    pub crcerr_fast: bool,
    #[bits(1)]
    _reserved1: u8,
    pub bit0err_fast: bool,
    pub bit1err_fast: bool,
}

/// Error Counter
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Ecr {
    pub txerrcnt: u8,
    pub rxerrcnt: u8,
    pub txerrcnt_fast: u8,
    pub rxerrcnt_fast: u8,
}

/// Memory Error Control Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Mecr {
    #[bits(7)]
    _reserved0: u8,
    /// Non-correctable errors in FlexCAN access put the device in freeze mode
    pub ncefafrz: bool,
    /// Error correction disable
    pub eccdis: bool,
    /// Error report disable
    pub rerrdis: bool,
    #[bits(3)]
    _reserved1: u8,
    pub exterrie: bool,
    pub faerrie: bool,
    pub haerrie: bool,
    /// Correctable error interrupt mask
    pub cei_msk: bool,
    #[bits(1)]
    _reserved2: u8,
    /// FlexCAN access with non-correctable errors interrupt mask
    pub fancei_msk: bool,
    /// Host access with non-correctable errors interrupt mask
    pub hancei_msk: bool,
    #[bits(11)]
    _reserved3: u16,
    /// Error configuration register write disable
    pub ecrwrdis: bool,
}

/// Error Status Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Errsr {
    pub ceiof: bool,
    #[bits(1)]
    _reserved0: u8,
    pub fanceiof: bool,
    pub hanceiof: bool,
    #[bits(12)]
    _reserved1: u16,
    /// Correctable error interrupt flag
    pub ceif: bool,
    #[bits(1)]
    _reserved2: u8,
    /// FlexCAN access with non-correctable error interrupt flag
    pub fanceif: bool,
    /// Host access with non-correctable error interrupt flag
    pub hanceif: bool,
    #[bits(12)]
    _reserved3: u16,
}

/// RX FIFO Information Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Rxfir {
    /// Index of the filter table element that accepted the frame at the FIFO output
    #[bits(9)]
    pub idhit: u16,
    #[bits(23)]
    _reserved0: u32,
}

/// Pretended Networking Control 1 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Ctrl1Pn {
    /// Filtering combination selection
    #[bits(2)]
    pub fcs: u8,
    /// ID filtering selection
    #[bits(2)]
    pub idfs: u8,
    /// Payload filtering selection
    #[bits(2)]
    pub plfs: u8,
    #[bits(2)]
    _reserved0: u8,
    /// Number of messages matching the same filtering criteria
    pub nmatch: u8,
    /// Wakeup by match interrupt mask
    pub wumf_msk: bool,
    /// Wakeup by timeout interrupt mask
    pub wtof_msk: bool,
    #[bits(14)]
    _reserved1: u16,
}

/// Pretended Networking Control 2 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct Ctrl2Pn {
    /// Timeout for no message matching the filtering criteria
    pub matchto: u16,
    _reserved0: u16,
}

/// Pretended Networking Wake Up Match Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct WuMtc {
    _reserved0: u8,
    /// Number of matches while in pretended networking
    pub mcounter: u8,
    /// Wakeup by match flag
    pub wumf: bool,
    /// Wakeup by timeout flag
    pub wtof: bool,
    #[bits(14)]
    _reserved1: u16,
}

/// Pretended Networking ID Filter 1 Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct FltId1 {
    #[bits(29)]
    pub flt_id1: u32,
    pub flt_ide: bool,
    pub flt_rtr: bool,
    #[bits(1)]
    _reserved0: u8,
}

/// Pretended Networking ID Filter 2 / ID Mask Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct FltId2Idmask {
    #[bits(29)]
    pub flt_id2_idmask: u32,
    pub ide_msk: bool,
    pub rtr_msk: bool,
    #[bits(1)]
    _reserved0: u8,
}

/// Pretended Networking DLC Filter Register
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct FltDlc {
    #[bits(4)]
    pub flt_dlc_hi: u8,
    #[bits(12)]
    _reserved0: u16,
    #[bits(4)]
    pub flt_dlc_lo: u8,
    #[bits(12)]
    _reserved1: u16,
}

/// Wake Up Message Buffer control and status
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct WmbCs {
    _reserved0: u16,
    #[bits(4)]
    pub dlc: u8,
    pub rtr: bool,
    pub ide: bool,
    pub srr: bool,
    #[bits(9)]
    _reserved1: u16,
}

/// Wake Up Message Buffer identifier
#[bitfield(u32, defmt = cfg(feature = "defmt"))]
pub struct WmbId {
    #[bits(29)]
    pub id: u32,
    #[bits(3)]
    _reserved0: u8,
}
