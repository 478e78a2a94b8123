//! Model-agnostic chat types and the generation seam.
//!
//! The session loop drives any [`ChatModel`]: it hands over the
//! conversation so far plus a response handler, and the model streams
//! tokens through the handler and finishes it with `complete` or `error`.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::stream::ResponseHandler;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A chat message with owned data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Generation backend driven by the session loop.
///
/// Implementations stream tokens through `handler` and must finish it with
/// exactly one terminal call: `complete().await` on success (returning its
/// accumulated text), or `error().await` followed by an `Err` on failure.
#[allow(async_fn_in_trait)]
pub trait ChatModel {
    async fn generate(
        &self,
        history: &[ChatMessage],
        handler: &mut ResponseHandler,
    ) -> Result<String>;
}

/// Offline model that streams the last user message back word by word.
///
/// Stands in wherever a real provider isn't wired up, and gives loop tests
/// a deterministic generation path.
#[derive(Debug, Clone, Default)]
pub struct EchoModel;

impl ChatModel for EchoModel {
    async fn generate(
        &self,
        history: &[ChatMessage],
        handler: &mut ResponseHandler,
    ) -> Result<String> {
        let last_user = history
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("", |m| m.content.as_str());

        handler.write("You said: ");
        for (i, word) in last_user.split_whitespace().enumerate() {
            if i > 0 {
                handler.write(" ");
            }
            handler.write(word);
        }
        handler.complete().await
    }
}
