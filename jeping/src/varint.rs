//! The protocol's variable-length integer.
//! [VarInt and VarLong](https://wiki.vg/Protocol#VarInt_and_VarLong)

use std::io::{Read, Write};

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::ProtocolError;

/// An `i32` encoded with variable length.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct VarInt(pub i32);

impl VarInt {
    /// The maximum number of bytes a `VarInt` may occupy on the wire.
    pub const MAX_SIZE: usize = 5;

    /// The number of bytes this `VarInt` occupies when written.
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub const fn written_size(self) -> usize {
        let val = self.0 as u32;
        if val & 0xf000_0000 != 0 {
            5
        } else if val & 0xffe0_0000 != 0 {
            4
        } else if val & 0xffff_c000 != 0 {
            3
        } else if val & 0xffff_ff80 != 0 {
            2
        } else {
            1
        }
    }

    /// Writes the value, low 7 bits first.
    ///
    /// Zero is written as a single `0x00` byte. Negative numbers use their
    /// two's-complement bit pattern and always take [`Self::MAX_SIZE`] bytes.
    ///
    /// # Errors
    /// If the writer fails.
    #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    pub fn encode<W: Write + ?Sized>(self, w: &mut W) -> std::io::Result<()> {
        let mut val = self.0 as u32;
        loop {
            if val & !0x7f == 0 {
                return w.write_u8(val as u8);
            }
            w.write_u8(val as u8 & 0x7f | 0x80)?;
            val >>= 7;
        }
    }

    /// Reads a value one byte at a time until a byte without the continuation
    /// bit is seen.
    ///
    /// # Errors
    /// [`ProtocolError::VarIntTooLong`] if no terminating byte is found within
    /// [`Self::MAX_SIZE`] bytes, [`ProtocolError::Io`] if the reader runs dry
    /// first.
    #[allow(clippy::cast_possible_wrap)]
    pub fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, ProtocolError> {
        let mut val = 0u32;
        for i in 0..Self::MAX_SIZE {
            let byte = r.read_u8()?;
            val |= u32::from(byte & 0x7f) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(Self(val as i32));
            }
        }
        Err(ProtocolError::VarIntTooLong)
    }
}

impl From<VarInt> for i32 {
    fn from(i: VarInt) -> Self {
        i.0
    }
}

impl From<i32> for VarInt {
    fn from(i: i32) -> Self {
        Self(i)
    }
}

/// Writes `value` as a [`VarInt`].
///
/// # Errors
/// If the writer fails.
pub fn write_var_int<W: Write + ?Sized>(w: &mut W, value: i32) -> std::io::Result<()> {
    VarInt(value).encode(w)
}

/// Reads a [`VarInt`] and returns its value.
///
/// # Errors
/// See [`VarInt::decode`].
pub fn read_var_int<R: Read + ?Sized>(r: &mut R) -> Result<i32, ProtocolError> {
    VarInt::decode(r).map(i32::from)
}
