use thiserror::Error;

/// Read the value from the buffer.
///
/// If [DecodeError::Short] is returned, the record was truncated.
pub trait Decode: Sized {
	/// Decode the value from the given buffer.
	fn decode<B: bytes::Buf>(buf: &mut B) -> Result<Self, DecodeError>;
}

/// A decode error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
	#[error("short buffer")]
	Short,

	#[error("invalid value")]
	InvalidValue,

	#[error("invalid flags: {0:#04x}")]
	InvalidFlags(u8),

	#[error("payload too large: {0} bytes")]
	PayloadTooLarge(usize),
}

impl Decode for bool {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match u8::decode(r)? {
			0 => Ok(false),
			1 => Ok(true),
			_ => Err(DecodeError::InvalidValue),
		}
	}
}

impl Decode for u8 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.has_remaining() {
			true => Ok(r.get_u8()),
			false => Err(DecodeError::Short),
		}
	}
}

impl Decode for u32 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.remaining() >= 4 {
			true => Ok(r.get_u32()),
			false => Err(DecodeError::Short),
		}
	}
}

impl Decode for u64 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.remaining() >= 8 {
			true => Ok(r.get_u64()),
			false => Err(DecodeError::Short),
		}
	}
}

impl Decode for i64 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.remaining() >= 8 {
			true => Ok(r.get_i64()),
			false => Err(DecodeError::Short),
		}
	}
}

impl Decode for f32 {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match r.remaining() >= 4 {
			true => Ok(r.get_f32()),
			false => Err(DecodeError::Short),
		}
	}
}

impl<T: Decode + Default + Copy, const N: usize> Decode for [T; N] {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		let mut out = [T::default(); N];
		for item in out.iter_mut() {
			*item = T::decode(r)?;
		}
		Ok(out)
	}
}

impl<T: Decode> Decode for Option<T> {
	fn decode<R: bytes::Buf>(r: &mut R) -> Result<Self, DecodeError> {
		match bool::decode(r)? {
			true => Ok(Some(T::decode(r)?)),
			false => Ok(None),
		}
	}
}
