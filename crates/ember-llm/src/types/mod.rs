//! Canonical chat types
//!
//! Every adapter converts from these shapes into its own wire format and
//! back; processors only ever see these.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;

pub use message::{Content, ContentPart, Message, Role};
pub use request::{ChatRequest, SamplingParams, StopSequences};
pub use response::{ChatResponse, Choice, ChoiceMessage};
pub use stream::{ChatChunk, ChunkChoice, ChunkDelta};
