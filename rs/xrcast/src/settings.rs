use std::fmt;
use std::str::FromStr;

/// The encode paths a stream can be bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BackendKind {
	/// Vulkan video encode.
	Vulkan,
	Nvenc,
	Vaapi,
	/// Software H.264.
	X264,
	/// Deterministic pseudo bitstream, always available.
	Synthetic,
}

impl BackendKind {
	pub const ALL: [Self; 5] = [Self::Vulkan, Self::Nvenc, Self::Vaapi, Self::X264, Self::Synthetic];

	/// Whether this path was compiled into the build.
	pub const fn is_enabled(self) -> bool {
		match self {
			Self::Vulkan => cfg!(feature = "vulkan"),
			Self::Nvenc => cfg!(feature = "nvenc"),
			Self::Vaapi => cfg!(feature = "vaapi"),
			Self::X264 => cfg!(feature = "x264"),
			Self::Synthetic => true,
		}
	}

	pub const fn supports(self, codec: Codec) -> bool {
		match self {
			Self::Vulkan | Self::X264 => matches!(codec, Codec::H264),
			Self::Nvenc | Self::Vaapi | Self::Synthetic => true,
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Vulkan => "vulkan",
			Self::Nvenc => "nvenc",
			Self::Vaapi => "vaapi",
			Self::X264 => "x264",
			Self::Synthetic => "synthetic",
		}
	}
}

impl fmt::Display for BackendKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct ParseError {
	kind: &'static str,
	value: String,
}

impl FromStr for BackendKind {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|kind| kind.as_str().eq_ignore_ascii_case(s))
			.ok_or_else(|| ParseError {
				kind: "backend",
				value: s.to_string(),
			})
	}
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Codec {
	H264,
	H265,
	Av1,
}

impl Codec {
	pub const ALL: [Self; 3] = [Self::H264, Self::H265, Self::Av1];

	/// The file extension of a raw elementary stream.
	pub const fn extension(self) -> &'static str {
		match self {
			Self::H264 => "h264",
			Self::H265 => "h265",
			Self::Av1 => "av1",
		}
	}
}

impl fmt::Display for Codec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.extension())
	}
}

impl FromStr for Codec {
	type Err = ParseError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"h264" | "avc" => Ok(Self::H264),
			"h265" | "hevc" => Ok(Self::H265),
			"av1" => Ok(Self::Av1),
			_ => Err(ParseError {
				kind: "codec",
				value: s.to_string(),
			}),
		}
	}
}

/// Negotiated settings for one stream, validated before they reach the [crate::Registry].
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncoderSettings {
	pub backend: BackendKind,
	pub codec: Codec,
	pub width: u32,
	pub height: u32,

	/// Target frame rate.
	pub fps: f32,

	/// Target bitrate in bits per second.
	pub bitrate: u64,
}

impl Default for EncoderSettings {
	fn default() -> Self {
		Self {
			backend: BackendKind::Synthetic,
			codec: Codec::H264,
			width: 1920,
			height: 1080,
			fps: 90.0,
			bitrate: 50_000_000,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_parse_backend() {
		assert_eq!("nvenc".parse::<BackendKind>().unwrap(), BackendKind::Nvenc);
		assert_eq!("X264".parse::<BackendKind>().unwrap(), BackendKind::X264);
		assert!("quicksync".parse::<BackendKind>().is_err());
	}

	#[test]
	fn test_parse_codec() {
		assert_eq!("hevc".parse::<Codec>().unwrap(), Codec::H265);
		assert_eq!(Codec::Av1.to_string(), "av1");
		assert!("vp9".parse::<Codec>().is_err());
	}

	#[test]
	fn test_support_table() {
		assert!(BackendKind::Vulkan.supports(Codec::H264));
		assert!(!BackendKind::Vulkan.supports(Codec::Av1));
		assert!(!BackendKind::X264.supports(Codec::H265));
		assert!(BackendKind::Synthetic.supports(Codec::Av1));
		assert!(BackendKind::Synthetic.is_enabled());
	}
}
