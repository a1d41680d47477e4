use bytes::{Bytes, BytesMut};

/// Write the value to the buffer.
pub trait Encode: Sized {
	/// Encode the value to the given writer.
	///
	/// This will panic if the [bytes::BufMut] does not have enough capacity.
	fn encode<W: bytes::BufMut>(&self, w: &mut W);

	/// Encode the value into a [Bytes] buffer.
	///
	/// NOTE: This will allocate.
	fn encode_bytes(&self) -> Bytes {
		let mut buf = BytesMut::new();
		self.encode(&mut buf);
		buf.freeze()
	}
}

impl Encode for bool {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_u8(*self as u8);
	}
}

impl Encode for u8 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_u8(*self);
	}
}

impl Encode for u32 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_u32(*self);
	}
}

impl Encode for u64 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_u64(*self);
	}
}

impl Encode for i64 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_i64(*self);
	}
}

impl Encode for f32 {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		w.put_f32(*self);
	}
}

impl<T: Encode, const N: usize> Encode for [T; N] {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		// Fixed size, so no length prefix.
		for item in self.iter() {
			item.encode(w);
		}
	}
}

impl<T: Encode> Encode for Option<T> {
	fn encode<W: bytes::BufMut>(&self, w: &mut W) {
		match self {
			Some(value) => {
				true.encode(w);
				value.encode(w);
			}
			None => false.encode(w),
		}
	}
}
