use crate::Error;

#[inline]
pub(crate) fn checked_wait<F: Fn() -> bool>(f: F, timeout_iterations: u32) -> Result<(), Error> {
    let mut elapsed = 0;
    while f() {
        elapsed += 1;
        if elapsed >= timeout_iterations {
            return Err(Error::Timeout);
        }
    }
    Ok(())
}

/// Flag bit of mailbox `mb` as (register index, mask), register 0 being IFLAG1/IMASK1.
#[inline]
pub(crate) const fn mailbox_bit(mb: u8) -> (usize, u32) {
    ((mb / 32) as usize, 1 << (mb % 32))
}
