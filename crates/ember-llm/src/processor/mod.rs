//! Request transformers applied before a model dispatches upstream
//!
//! Processors are pure functions over [`ChatRequest`]; the only outside
//! state they touch is the thread RNG used by [`Processor::Random`].

mod messages;
mod rewrite;
mod roles;
mod samplers;
mod whitespace;

use std::sync::Arc;

use ember_config::OverrideSamplersConfig;

pub use self::messages::{InsertMessage, Squash};
pub use self::rewrite::RegexRewrite;
pub use self::whitespace::clean_whitespace;
use crate::types::{ChatRequest, Role};
use crate::weighted::Weighted;

/// A composable canonical-request transformer
#[derive(Debug)]
pub enum Processor {
    /// Leave the request untouched
    Identity,
    /// Demote system/developer messages once the conversation has started
    NoDanglingSys,
    /// Demote every system/developer message to `user`
    NoSys,
    /// Force or remove sampling parameters
    OverrideSamplers(OverrideSamplersConfig),
    /// Regex replacement over every piece of message text
    Regex(RegexRewrite),
    /// Rewrite roles from the first assistant message onward
    Noass(Role),
    /// Merge runs of same-role messages
    Squash(Squash),
    /// Insert a fixed message
    InsertMessage(InsertMessage),
    /// Apply nested processors in order
    Chain(Vec<Arc<Processor>>),
    /// Apply one nested processor drawn per request
    Random(Weighted<Arc<Processor>>),
    /// Trim and collapse whitespace in message text
    Whitespace,
}

impl Processor {
    /// Transform a request
    pub fn process(&self, mut request: ChatRequest) -> ChatRequest {
        match self {
            Self::Identity => request,
            Self::NoDanglingSys => {
                roles::no_dangling_sys(&mut request.messages);
                request
            }
            Self::NoSys => {
                roles::no_sys(&mut request.messages);
                request
            }
            Self::OverrideSamplers(overrides) => {
                samplers::apply(overrides, &mut request.sampling);
                request
            }
            Self::Regex(rewrite) => {
                rewrite.apply(&mut request.messages);
                request
            }
            Self::Noass(role) => {
                roles::noass(&mut request.messages, *role);
                request
            }
            Self::Squash(squash) => {
                request.messages = squash.apply(std::mem::take(&mut request.messages));
                request
            }
            Self::InsertMessage(insert) => {
                insert.apply(&mut request.messages);
                request
            }
            Self::Chain(processors) => processors.iter().fold(request, |request, p| p.process(request)),
            Self::Random(choices) => choices.select().process(request),
            Self::Whitespace => {
                for message in &mut request.messages {
                    message.content.map_text(clean_whitespace);
                }
                request
            }
        }
    }
}
