//! # framepipe: decode on one thread, present on another
//!
//! `framepipe` decouples a bursty, variable-latency decoder from a renderer that has to run at
//! the cadence encoded in the stream. The two sides exchange frames through a small, fixed pool
//! of reusable buffers, and the presenting side sleeps until each frame's presentation time.
//!
//! ## API
//!
//! The core is built around Producer/Consumer pairs, like the rest of the media stack:
//! - [SlotArena]: a fixed set of owned values (usually [VideoFrame]s), allocated once.
//! - [Ring]: hands arena slots from one [RingProducer] to one [RingConsumer], in order.
//! - [Pacer]: turns a frame's pts into "how long until this should be on screen".
//! - [Shutdown]: a signal that unblocks every wait in the pipeline.
//!
//! A decoder thread would typically:
//! - [RingProducer::acquire_write_slot] to block until a buffer is free.
//! - Fill the buffer via [Decoder::decode_next_frame].
//! - [WriteSlot::commit] to hand it over.
//!
//! And the presenting thread:
//! - [RingConsumer::acquire_read_slot] to block until the next frame is ready.
//! - [Pacer::wait] until its presentation time.
//! - [Renderer::present], then [ReadSlot::release] to give the buffer back.
//!
//! [Player] does all of the above for you, running the decoder on a dedicated thread.

mod arena;
mod config;
mod error;
mod model;
mod pace;
mod player;
mod ring;
mod shutdown;

pub mod decode;
pub mod log;
pub mod render;

pub use arena::*;
pub use config::*;
pub use decode::{Decoded, DecodeError, Decoder, StreamInfo};
pub use error::*;
pub use log::Log;
pub use model::*;
pub use pace::*;
pub use player::*;
pub use render::{RenderError, Renderer};
pub use ring::*;
pub use shutdown::*;
