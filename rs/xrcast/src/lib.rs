//! # xrcast: frame pacing and transmission for XR streaming
//!
//! `xrcast` sits between a renderer producing one image per frame and a network session delivering
//! the encoded result to a headset. It doesn't encode anything itself: encode paths implement
//! [Backend], and the session implements [Transport].
//!
//! ## API
//!
//! - [Registry]: the encode paths available to this process, and the factory of [Encoder]s.
//! - [Encoder]: one stream, made of:
//!   - [Slots]: pacing between presentation and encode, with backpressure on the renderer.
//!   - [IdrThrottle]: keyframe requests, coalesced and spaced at least [IDR_THROTTLE] frames apart.
//!   - [Fragmenter]: splits encoded output into [xrcast_wire::Shard]s that fit a datagram.
//! - [AsyncSender]: a worker shared by all streams, so one stream's network I/O overlaps with
//!   another's encode. [SharedSender] hands it out.
//!
//! A typical frame:
//! - [Encoder::present] once the image was rendered, from the render thread.
//! - [Encoder::encode] with the view of that frame, possibly from another thread.
//! - [Encoder::request_keyframe] whenever the receiver lost data.
//!
//! [video_capabilities] tells which GPU video profiles the shared images need before any stream exists.

mod encoder;
mod error;
mod fragment;
mod idr;
mod sender;
mod settings;
mod slots;
mod stats;
mod transport;

#[cfg(test)]
mod test_util;

pub mod backend;
pub mod clock;

pub use backend::*;
pub use clock::ClockOffset;
pub use encoder::*;
pub use error::*;
pub use fragment::*;
pub use idr::*;
pub use sender::*;
pub use settings::*;
pub use slots::*;
pub use stats::*;
pub use transport::*;

// Re-export the wire model, since it appears in the API.
pub use xrcast_wire as wire;
