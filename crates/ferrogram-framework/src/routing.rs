//! Shorthand constructors for common routes.
//!
//! Each function returns a [`RouteBuilder`] preloaded with a filter:
//!
//! ```rust,ignore
//! dispatcher
//!     .add(on_command("start").handler(start))
//!     .add(on_callback(OrderCallback { action: "view".into(), ..Default::default() })
//!         .handler(view_order));
//! ```

use tracing::warn;

use ferrogram_core::{CallbackDefinition, CallbackPayload};

use crate::extractor::Callback;
use crate::filter::{self, Filter};
use crate::middleware::middleware_fn;
use crate::route::RouteBuilder;

/// Any update matched by `filter`.
pub fn on(filter: Filter) -> RouteBuilder {
    RouteBuilder::new(filter)
}

/// `/name`, `/name <args>` or `/name@bot`.
pub fn on_command(name: impl Into<String>) -> RouteBuilder {
    RouteBuilder::new(filter::command(name))
}

pub fn on_message() -> RouteBuilder {
    RouteBuilder::new(filter::message())
}

/// Non-command message text.
pub fn on_text() -> RouteBuilder {
    RouteBuilder::new(filter::text())
}

pub fn on_edited_message() -> RouteBuilder {
    RouteBuilder::new(filter::edited_message())
}

pub fn on_channel_post() -> RouteBuilder {
    RouteBuilder::new(filter::channel_post())
}

pub fn on_inline_query() -> RouteBuilder {
    RouteBuilder::new(filter::inline_query())
}

pub fn on_callback_query() -> RouteBuilder {
    RouteBuilder::new(filter::callback_query())
}

pub fn on_callback_data(data: impl Into<String>) -> RouteBuilder {
    RouteBuilder::new(filter::callback_data(data))
}

pub fn on_callback_prefix(prefix: impl Into<String>) -> RouteBuilder {
    RouteBuilder::new(filter::callback_data_prefix(prefix))
}

pub fn on_photo() -> RouteBuilder {
    RouteBuilder::new(filter::photo())
}

pub fn on_document() -> RouteBuilder {
    RouteBuilder::new(filter::document())
}

pub fn on_video() -> RouteBuilder {
    RouteBuilder::new(filter::video())
}

pub fn on_audio() -> RouteBuilder {
    RouteBuilder::new(filter::audio())
}

pub fn on_voice() -> RouteBuilder {
    RouteBuilder::new(filter::voice())
}

pub fn on_sticker() -> RouteBuilder {
    RouteBuilder::new(filter::sticker())
}

pub fn on_location() -> RouteBuilder {
    RouteBuilder::new(filter::location())
}

pub fn on_contact() -> RouteBuilder {
    RouteBuilder::new(filter::contact())
}

/// Callback queries whose data decodes as `T` and matches `pattern`.
///
/// Fields of `pattern` left at their default value act as wildcards. The
/// decoded payload is published into the dispatch context, so handlers can
/// take a [`Callback<T>`] parameter.
///
/// The route name defaults to the record's type name. A type without the
/// callback marker yields a route that never matches.
pub fn on_callback<T>(pattern: T) -> RouteBuilder
where
    T: CallbackPayload + Clone,
{
    let definition = match CallbackDefinition::of::<T>() {
        Ok(definition) => Some(definition),
        Err(err) => {
            warn!(
                record = T::SHAPE.type_name,
                error = %err,
                "Callback route registered for a record that cannot be decoded"
            );
            None
        }
    };

    let matcher = definition.clone();
    let filter = Filter::new(move |u| {
        let (Some(definition), Some(query)) = (&matcher, &u.callback_query) else {
            return false;
        };
        definition
            .parse_record::<T>(query.data.as_deref().unwrap_or_default())
            .is_some_and(|payload| payload.matches_pattern(&pattern))
    });

    // The payload is decoded a second time here; the filter only sees `&Update`.
    let publish = middleware_fn(move |ctx, next| {
        let payload = definition.as_ref().and_then(|definition| {
            let data = ctx
                .update()
                .callback_query
                .as_ref()
                .and_then(|q| q.data.as_deref())
                .unwrap_or_default();
            definition.parse_record::<T>(data)
        });
        async move {
            if let Some(payload) = payload {
                ctx.insert(Callback(payload));
            }
            next.run().await;
        }
    });

    RouteBuilder::new(filter)
        .name(T::SHAPE.type_name)
        .middleware(publish)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DispatchContext;
    use crate::context::tests::{callback_update, null_bot, text_update};
    use ferrogram_core::{RecordShape, StateManager, Update, pack_callback};
    use ferrogram_macros::CallbackData;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Debug, Clone, Default, PartialEq, CallbackData)]
    #[callback(prefix = "order")]
    struct OrderCallback {
        pub action: String,
        pub id: u32,
    }

    fn ctx(update: Update) -> Arc<DispatchContext> {
        Arc::new(DispatchContext::new(
            Arc::new(update),
            null_bot(),
            StateManager::default(),
        ))
    }

    #[test]
    fn test_sugar_filters() {
        let msg = text_update(1, "/start go");
        assert!(on_command("start").handler(|| async { Ok(()) }).matches(&msg));
        assert!(on_message().handler(|| async { Ok(()) }).matches(&msg));
        assert!(!on_text().handler(|| async { Ok(()) }).matches(&msg));
        assert!(
            on_callback_prefix("ord")
                .handler(|| async { Ok(()) })
                .matches(&callback_update(1, "order:view:1"))
        );
    }

    #[test]
    fn test_on_callback_pattern() {
        let view = on_callback(OrderCallback {
            action: "view".into(),
            ..Default::default()
        })
        .handler(|| async { Ok(()) });
        assert_eq!(view.name(), Some("OrderCallback"));

        let data = pack_callback(&OrderCallback {
            action: "view".into(),
            id: 42,
        })
        .unwrap();
        assert_eq!(data, "order:view:42");
        assert!(view.matches(&callback_update(1, &data)));
        assert!(!view.matches(&callback_update(1, "order:edit:42")));
        assert!(!view.matches(&callback_update(1, "order:view")));
        assert!(!view.matches(&text_update(1, "order:view:42")));

        let wildcard = on_callback(OrderCallback::default()).handler(|| async { Ok(()) });
        assert!(wildcard.matches(&callback_update(1, "order:edit:7")));
    }

    #[tokio::test]
    async fn test_on_callback_publishes_payload() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let route = on_callback(OrderCallback::default()).handler(
            move |Callback(order): Callback<OrderCallback>| {
                let sink = Arc::clone(&sink);
                async move {
                    *sink.lock() = Some(order);
                    Ok(())
                }
            },
        );

        route
            .execute(ctx(callback_update(3, "order:pay:9")))
            .await
            .unwrap();
        assert_eq!(
            *seen.lock(),
            Some(OrderCallback {
                action: "pay".into(),
                id: 9,
            })
        );
    }

    #[derive(Debug, Clone, Default)]
    struct Unmarked;

    impl CallbackPayload for Unmarked {
        const SHAPE: RecordShape = RecordShape {
            type_name: "Unmarked",
            marker: None,
            fields: &[],
        };

        fn field_text(&self, _name: &str) -> Option<String> {
            None
        }

        fn set_field_text(&mut self, _name: &str, _raw: &str) -> bool {
            false
        }

        fn matches_pattern(&self, _pattern: &Self) -> bool {
            true
        }
    }

    #[test]
    fn test_on_callback_without_marker_never_matches() {
        let route = on_callback(Unmarked).handler(|| async { Ok(()) });
        assert!(!route.matches(&callback_update(1, "unmarked")));
        assert!(!route.matches(&callback_update(1, "")));
    }
}
