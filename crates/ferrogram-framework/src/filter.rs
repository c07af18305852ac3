//! Update predicates used to select routes.
//!
//! Every predicate is a pure function of the [`Update`]; none of them touch
//! per-user state (that is the job of [`StateFilter`](ferrogram_core::StateFilter)).
//!
//! ```rust,ignore
//! use ferrogram_framework::filter;
//!
//! let private_text = filter::text().and(filter::private_chat());
//! let media = filter::or_any([filter::photo(), filter::video(), filter::document()]);
//! ```

use std::sync::Arc;

use ferrogram_core::{CallbackDefinition, ChatType, Message, Update};

/// A cloneable, shareable predicate over an update.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(&Update) -> bool + Send + Sync>);

impl Filter {
    /// Wraps a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Evaluates the predicate.
    pub fn check(&self, update: &Update) -> bool {
        (self.0)(update)
    }

    /// Both predicates must pass. `other` is not evaluated when `self` fails.
    pub fn and(self, other: Filter) -> Filter {
        and_all([self, other])
    }

    /// Either predicate must pass. `other` is not evaluated when `self` passes.
    pub fn or(self, other: Filter) -> Filter {
        or_any([self, other])
    }

    /// Inverts the predicate.
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Filter {
        not(self)
    }
}

impl std::fmt::Debug for Filter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Filter(..)")
    }
}

// ============================================================================
// Combinators
// ============================================================================

/// Passes when every filter passes, evaluated left to right with
/// short-circuit. An empty list passes.
pub fn and_all(filters: impl IntoIterator<Item = Filter>) -> Filter {
    let filters: Vec<Filter> = filters.into_iter().collect();
    Filter::new(move |u| filters.iter().all(|f| f.check(u)))
}

/// Passes when any filter passes, evaluated left to right with
/// short-circuit. An empty list fails.
pub fn or_any(filters: impl IntoIterator<Item = Filter>) -> Filter {
    let filters: Vec<Filter> = filters.into_iter().collect();
    Filter::new(move |u| filters.iter().any(|f| f.check(u)))
}

pub fn not(filter: Filter) -> Filter {
    Filter::new(move |u| !filter.check(u))
}

/// Always passes.
pub fn any() -> Filter {
    Filter::new(|_| true)
}

// ============================================================================
// Update kinds
// ============================================================================

pub fn message() -> Filter {
    Filter::new(|u| u.message.is_some())
}

pub fn edited_message() -> Filter {
    Filter::new(|u| u.edited_message.is_some())
}

pub fn channel_post() -> Filter {
    Filter::new(|u| u.channel_post.is_some())
}

pub fn edited_channel_post() -> Filter {
    Filter::new(|u| u.edited_channel_post.is_some())
}

pub fn callback_query() -> Filter {
    Filter::new(|u| u.callback_query.is_some())
}

pub fn inline_query() -> Filter {
    Filter::new(|u| u.inline_query.is_some())
}

pub fn chosen_inline_result() -> Filter {
    Filter::new(|u| u.chosen_inline_result.is_some())
}

// ============================================================================
// Message text
// ============================================================================

fn non_empty_text(u: &Update) -> Option<&str> {
    u.text().filter(|t| !t.is_empty())
}

/// Matches `/name`, `/name <args>` and `/name@botname...`.
///
/// `name` is given without the leading slash.
pub fn command(name: impl Into<String>) -> Filter {
    let command = format!("/{}", name.into());
    Filter::new(move |u| {
        let Some(text) = non_empty_text(u) else {
            return false;
        };
        match text.strip_prefix(command.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with(' ') || rest.starts_with('@'),
            None => false,
        }
    })
}

/// Non-empty message text that is not a command.
pub fn text() -> Filter {
    Filter::new(|u| non_empty_text(u).is_some_and(|t| !t.starts_with('/')))
}

/// Message text equal to `expected`.
pub fn text_equals(expected: impl Into<String>) -> Filter {
    let expected = expected.into();
    Filter::new(move |u| u.text() == Some(expected.as_str()))
}

/// Message text containing `needle`, ignoring case.
pub fn text_contains(needle: impl Into<String>) -> Filter {
    let needle = needle.into().to_lowercase();
    Filter::new(move |u| non_empty_text(u).is_some_and(|t| t.to_lowercase().contains(&needle)))
}

// ============================================================================
// Media
// ============================================================================

fn message_has(pick: fn(&Message) -> bool) -> Filter {
    Filter::new(move |u| u.message.as_ref().is_some_and(pick))
}

pub fn photo() -> Filter {
    message_has(|m| m.photo.as_ref().is_some_and(|p| !p.is_empty()))
}

pub fn document() -> Filter {
    message_has(|m| m.document.is_some())
}

pub fn video() -> Filter {
    message_has(|m| m.video.is_some())
}

pub fn audio() -> Filter {
    message_has(|m| m.audio.is_some())
}

pub fn voice() -> Filter {
    message_has(|m| m.voice.is_some())
}

pub fn sticker() -> Filter {
    message_has(|m| m.sticker.is_some())
}

pub fn location() -> Filter {
    message_has(|m| m.location.is_some())
}

pub fn contact() -> Filter {
    message_has(|m| m.contact.is_some())
}

// ============================================================================
// Chats
// ============================================================================

/// Matches the chat of any message-bearing variant, including the message a
/// callback button belongs to.
pub fn chat_type(kind: ChatType) -> Filter {
    Filter::new(move |u| u.chat().is_some_and(|c| c.kind == kind))
}

pub fn private_chat() -> Filter {
    chat_type(ChatType::Private)
}

pub fn group_chat() -> Filter {
    chat_type(ChatType::Group)
}

pub fn supergroup_chat() -> Filter {
    chat_type(ChatType::Supergroup)
}

pub fn channel_chat() -> Filter {
    chat_type(ChatType::Channel)
}

// ============================================================================
// Callback queries
// ============================================================================

/// Callback query whose data equals `data`.
pub fn callback_data(data: impl Into<String>) -> Filter {
    let data = data.into();
    Filter::new(move |u| {
        u.callback_query
            .as_ref()
            .is_some_and(|q| q.data.as_deref().unwrap_or_default() == data)
    })
}

/// Callback query whose data starts with `prefix`.
pub fn callback_data_prefix(prefix: impl Into<String>) -> Filter {
    let prefix = prefix.into();
    Filter::new(move |u| {
        u.callback_query
            .as_ref()
            .is_some_and(|q| q.data.as_deref().unwrap_or_default().starts_with(&prefix))
    })
}

/// Route selection by callback definition.
pub trait DefinitionFilterExt {
    /// Callback query whose data parses under this definition.
    fn filter(&self) -> Filter;
}

impl DefinitionFilterExt for CallbackDefinition {
    fn filter(&self) -> Filter {
        let definition = self.clone();
        Filter::new(move |u| {
            u.callback_query.as_ref().is_some_and(|q| {
                definition
                    .parse(q.data.as_deref().unwrap_or_default())
                    .is_some()
            })
        })
    }
}
