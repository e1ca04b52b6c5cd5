//! Playback module: boomerang traversal and the producer threads driving it.

mod boomerang;
mod producer;

pub use boomerang::{BoomerangCursor, Direction};
pub use producer::{FrameProducer, ProducerControl, ProducerHandle};
