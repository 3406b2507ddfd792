use core::marker::PhantomData;

/// Word and byte access to one controller's register window, addressed by byte offset from its base.
///
/// [`Mmio`] is the memory-mapped implementation used on target. Any other implementation can stand
/// in for the hardware, the driver only ever talks to the controller through this trait.
pub trait RegisterBlock {
    fn read_word(&self, offset: usize) -> u32;

    fn write_word(&self, offset: usize, value: u32);

    /// Mailbox RAM is little-endian, byte `offset & 3` of the containing word.
    fn read_byte(&self, offset: usize) -> u8 {
        let shift = (offset & 3) * 8;
        (self.read_word(offset & !3) >> shift) as u8
    }

    fn write_byte(&self, offset: usize, value: u8) {
        let shift = (offset & 3) * 8;
        let word = self.read_word(offset & !3) & !(0xFF << shift);
        self.write_word(offset & !3, word | ((value as u32) << shift));
    }

    /// Orders all preceding writes before any following one. Used before a mailbox code write.
    fn barrier(&self) {}
}

/// Memory-mapped register window.
pub struct Mmio {
    base: *mut u8,
}

// Safety: the window is a fixed peripheral address, ownership is tracked by the instance registry.
unsafe impl Send for Mmio {}

impl Mmio {
    /// # Safety
    ///
    /// `base` must point to a FlexCAN register block that nothing else accesses for the lifetime of
    /// the returned value.
    #[inline(always)]
    pub const unsafe fn from_ptr(base: *mut ()) -> Self {
        Self {
            base: base as *mut u8,
        }
    }

    #[inline(always)]
    pub const fn as_ptr(&self) -> *mut () {
        self.base as *mut ()
    }
}

impl RegisterBlock for Mmio {
    #[inline(always)]
    fn read_word(&self, offset: usize) -> u32 {
        unsafe { core::ptr::read_volatile(self.base.add(offset) as *const u32) }
    }

    #[inline(always)]
    fn write_word(&self, offset: usize, value: u32) {
        unsafe { core::ptr::write_volatile(self.base.add(offset) as *mut u32, value) }
    }

    #[inline(always)]
    fn read_byte(&self, offset: usize) -> u8 {
        unsafe { core::ptr::read_volatile(self.base.add(offset)) }
    }

    #[inline(always)]
    fn write_byte(&self, offset: usize, value: u8) {
        unsafe { core::ptr::write_volatile(self.base.add(offset), value) }
    }

    #[inline(always)]
    fn barrier(&self) {
        #[cfg(target_arch = "arm")]
        cortex_m::asm::dsb();
        #[cfg(not(target_arch = "arm"))]
        core::sync::atomic::fence(core::sync::atomic::Ordering::SeqCst);
    }
}

/// Typed view of one 32-bit register.
pub struct Reg<'a, B: ?Sized, T> {
    block: &'a B,
    offset: usize,
    _marker: PhantomData<T>,
}

impl<'a, B: RegisterBlock + ?Sized, T: Copy + From<u32> + Into<u32>> Reg<'a, B, T> {
    #[inline(always)]
    pub(crate) const fn new(block: &'a B, offset: usize) -> Self {
        Self {
            block,
            offset,
            _marker: PhantomData,
        }
    }

    #[inline(always)]
    pub fn offset(&self) -> usize {
        self.offset
    }

    #[inline(always)]
    pub fn read(&self) -> T {
        T::from(self.block.read_word(self.offset))
    }

    #[inline(always)]
    pub fn write_value(&self, value: T) {
        self.block.write_word(self.offset, value.into())
    }

    /// Writes a value built from the all-zeroes reset pattern.
    #[inline(always)]
    pub fn write<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = T::from(0);
        let r = f(&mut value);
        self.write_value(value);
        r
    }

    #[inline(always)]
    pub fn modify<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut value = self.read();
        let r = f(&mut value);
        self.write_value(value);
        r
    }
}
