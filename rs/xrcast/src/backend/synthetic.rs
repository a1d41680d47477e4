use anyhow::Context;
use bytes::{BufMut, Bytes, BytesMut};

use super::{Backend, CommandHandle, DEFAULT_SLOTS, EncodeRequest, ImageHandle, Slices};
use crate::{Codec, EncoderSettings};

// Keyframes are this many times larger than delta frames.
const KEYFRAME_SCALE: usize = 4;

const MIN_FRAME: usize = 32;

/// A backend producing a deterministic pseudo bitstream sized from the target bitrate.
///
/// Each output starts with an Annex-B start code, a NAL-like header byte (keyframe or not), and the
/// frame index, followed by filler. Useful to exercise the pipeline without a GPU.
pub struct Synthetic {
	codec: Codec,
	frame_size: usize,
	slices: usize,
	presented: Vec<Option<ImageHandle>>,
}

impl Synthetic {
	pub fn new(settings: &EncoderSettings) -> anyhow::Result<Self> {
		anyhow::ensure!(settings.width > 0 && settings.height > 0, "invalid picture size");
		anyhow::ensure!(settings.fps > 0.0, "invalid frame rate: {}", settings.fps);

		let frame_size = (settings.bitrate as f64 / settings.fps as f64 / 8.0) as usize;

		Ok(Self {
			codec: settings.codec,
			frame_size: frame_size.max(MIN_FRAME),
			slices: 1,
			presented: vec![None; DEFAULT_SLOTS],
		})
	}

	/// Split every frame into this many slices.
	pub fn with_slices(mut self, slices: usize) -> Self {
		self.slices = slices.max(1);
		self
	}

	fn header(&self, idr: bool) -> u8 {
		match (self.codec, idr) {
			(Codec::H264, true) => 0x65,
			(Codec::H264, false) => 0x41,
			(Codec::H265, true) => 0x26,
			(Codec::H265, false) => 0x02,
			(Codec::Av1, true) => 0x12,
			(Codec::Av1, false) => 0x32,
		}
	}

	fn slice(&self, request: &EncodeRequest, index: usize, size: usize) -> Bytes {
		let mut buf = BytesMut::with_capacity(size);
		buf.put_slice(&[0, 0, 0, 1]);
		buf.put_u8(self.header(request.idr));
		buf.put_u64(request.frame_idx);
		buf.put_u8(index as u8);

		let mut seed = request.frame_idx as u8 ^ index as u8;
		while buf.len() < size {
			// Avoid emulating a start code.
			seed = seed.wrapping_mul(13).wrapping_add(7) | 0x80;
			buf.put_u8(seed);
		}
		buf.freeze()
	}
}

impl Backend for Synthetic {
	fn present(&mut self, image: ImageHandle, _commands: CommandHandle, slot: usize) -> anyhow::Result<()> {
		let entry = self.presented.get_mut(slot).context("slot out of range")?;
		*entry = Some(image);
		Ok(())
	}

	fn encode(&mut self, request: EncodeRequest, slices: &mut Slices<'_>) -> anyhow::Result<Option<Bytes>> {
		let entry = self.presented.get_mut(request.slot).context("slot out of range")?;
		entry
			.take()
			.with_context(|| format!("nothing presented in slot {}", request.slot))?;

		let total = match request.idr {
			true => self.frame_size * KEYFRAME_SCALE,
			false => self.frame_size,
		};
		let size = (total / self.slices).max(MIN_FRAME);

		for index in 0..self.slices - 1 {
			slices.push(self.slice(&request, index, size));
		}

		Ok(Some(self.slice(&request, self.slices - 1, size)))
	}

	fn slots(&self) -> usize {
		self.presented.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn settings() -> EncoderSettings {
		EncoderSettings {
			fps: 100.0,
			bitrate: 800_000,
			..Default::default()
		}
	}

	fn request(slot: usize, idr: bool) -> EncodeRequest {
		EncodeRequest {
			idr,
			target_time: 0,
			slot,
			frame_idx: 12,
		}
	}

	#[test]
	fn test_frame_size() {
		let mut backend = Synthetic::new(&settings()).unwrap();
		backend.present(ImageHandle(1), CommandHandle(1), 0).unwrap();
		backend.present(ImageHandle(2), CommandHandle(2), 1).unwrap();

		let mut slices = Slices::collect();
		let delta = backend.encode(request(0, false), &mut slices).unwrap().unwrap();
		assert_eq!(delta.len(), 1000);
		assert_eq!(&delta[..5], &[0, 0, 0, 1, 0x41]);

		let key = backend.encode(request(1, true), &mut slices).unwrap().unwrap();
		assert_eq!(key.len(), 4000);
		assert_eq!(key[4], 0x65);
		assert_eq!(slices.count(), 0);
	}

	#[test]
	fn test_slices() {
		let mut backend = Synthetic::new(&settings()).unwrap().with_slices(4);
		backend.present(ImageHandle(1), CommandHandle(1), 0).unwrap();

		let mut slices = Slices::collect();
		let last = backend.encode(request(0, false), &mut slices).unwrap().unwrap();
		let slices = slices.into_collected();

		assert_eq!(slices.len(), 3);
		assert!(slices.iter().all(|s| s.len() == 250));
		assert_eq!(last.len(), 250);
	}

	#[test]
	fn test_encode_without_present() {
		let mut backend = Synthetic::new(&settings()).unwrap();
		let mut slices = Slices::collect();
		assert!(backend.encode(request(0, false), &mut slices).is_err());
		assert!(backend.present(ImageHandle(1), CommandHandle(1), 7).is_err());
	}

	#[test]
	fn test_invalid_settings() {
		let settings = EncoderSettings {
			fps: 0.0,
			..Default::default()
		};
		assert!(Synthetic::new(&settings).is_err());
	}
}
