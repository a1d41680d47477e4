use std::ops::{BitOr, BitOrAssign};

use crate::{BackendKind, Codec, EncoderSettings, Error};

/// Image usage flags the shared GPU images must be created with.
///
/// Values match `VkImageUsageFlagBits`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ImageUsage(u32);

impl ImageUsage {
	pub const NONE: Self = Self(0);
	pub const VIDEO_ENCODE_SRC: Self = Self(0x0000_4000);

	pub const fn bits(self) -> u32 {
		self.0
	}

	pub const fn contains(self, other: Self) -> bool {
		self.0 & other.0 == other.0
	}
}

impl BitOr for ImageUsage {
	type Output = Self;

	fn bitor(self, rhs: Self) -> Self {
		Self(self.0 | rhs.0)
	}
}

impl BitOrAssign for ImageUsage {
	fn bitor_assign(&mut self, rhs: Self) {
		self.0 |= rhs.0;
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChromaSubsampling {
	Yuv420,
}

/// A GPU video coding profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VideoProfile {
	pub codec: Codec,
	pub chroma: ChromaSubsampling,
	pub bit_depth: u8,
}

impl VideoProfile {
	pub const fn encode(codec: Codec) -> Self {
		Self {
			codec,
			chroma: ChromaSubsampling::Yuv420,
			bit_depth: 8,
		}
	}
}

/// What the GPU images shared by all streams must support.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VideoCapabilities {
	pub profiles: Vec<VideoProfile>,
	pub usage: ImageUsage,
}

/// Compute the video profiles and image usage implied by the given stream settings.
///
/// This doesn't construct any backend, so it can size shared GPU resources before any stream exists.
pub fn video_capabilities(settings: &[EncoderSettings]) -> Result<VideoCapabilities, Error> {
	let mut caps = VideoCapabilities::default();

	// Only GPU video encode reads the shared images directly.
	for item in settings.iter().filter(|item| item.backend == BackendKind::Vulkan) {
		if !item.backend.is_enabled() {
			return Err(Error::UnsupportedBackend(item.backend));
		}

		if !item.backend.supports(item.codec) {
			return Err(Error::UnsupportedCodec {
				backend: item.backend,
				codec: item.codec,
			});
		}

		caps.usage |= ImageUsage::VIDEO_ENCODE_SRC;

		let profile = VideoProfile::encode(item.codec);
		if !caps.profiles.contains(&profile) {
			caps.profiles.push(profile);
		}
	}

	Ok(caps)
}
