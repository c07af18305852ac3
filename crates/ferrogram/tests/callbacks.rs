//! Inline-keyboard callbacks, groups and the error pipeline end to end.

mod common;

use std::sync::Arc;

use common::{RecordingBot, callback, text};
use ferrogram::core::{ApiError, CallbackDataError};
use ferrogram::framework::filter::private_chat;
use ferrogram::prelude::*;
use parking_lot::Mutex;

#[derive(Debug, Clone, Default, PartialEq, CallbackData)]
#[callback(prefix = "item")]
pub struct ItemCallback {
    pub action: String,
    pub id: u32,
}

#[derive(Debug, Clone, Default, PartialEq, CallbackData)]
#[callback(prefix = "page", separator = "|")]
pub struct PageCallback {
    pub number: u16,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, CallbackData)]
#[callback(prefix = "vote", crate = "ferrogram::core")]
pub struct VoteCallback {
    pub choice: String,
}

fn item(action: &str, id: u32) -> ItemCallback {
    ItemCallback {
        action: action.to_string(),
        id,
    }
}

#[test]
fn test_packing_and_buttons() {
    assert_eq!(pack_callback(&item("buy", 7)).unwrap(), "item:buy:7");
    assert_eq!(parse_callback::<ItemCallback>("item:buy:7"), Some(item("buy", 7)));
    assert_eq!(parse_callback::<ItemCallback>("item:buy"), None);
    assert_eq!(parse_callback::<ItemCallback>("page:1|"), None);

    let page = PageCallback {
        number: 3,
        note: None,
    };
    assert_eq!(pack_callback(&page).unwrap(), "page|3|");

    let button = callback_button("Next", &page).unwrap();
    assert_eq!(button.callback_data.as_deref(), Some("page|3|"));

    assert!(matches!(
        pack_callback(&item("a:b", 1)),
        Err(CallbackDataError::ValueContainsSeparator { .. })
    ));
}

#[test]
fn test_derive_through_umbrella_path() {
    let vote = VoteCallback {
        choice: "yes".to_string(),
    };
    assert_eq!(pack_callback(&vote).unwrap(), "vote:yes");
    assert_eq!(parse_callback::<VoteCallback>("vote:yes"), Some(vote));
}

#[tokio::test]
async fn test_callback_routes_discriminate_by_pattern() {
    let seen = Arc::new(Mutex::new(Vec::new()));

    let buy_seen = Arc::clone(&seen);
    let buy = move |Callback(cb): Callback<ItemCallback>| {
        let seen = Arc::clone(&buy_seen);
        async move {
            seen.lock().push(format!("buy {}", cb.id));
            HandlerResult::Ok(())
        }
    };
    let any_seen = Arc::clone(&seen);
    let any = move |Callback(cb): Callback<ItemCallback>, bot: BoxedBot, update: UpdateRef| {
        let seen = Arc::clone(&any_seen);
        async move {
            seen.lock().push(format!("{} {}", cb.action, cb.id));
            let query = update.callback_query.as_ref().ok_or("no query")?;
            bot.answer_callback_query(&query.id, None).await?;
            HandlerResult::Ok(())
        }
    };

    let bot = RecordingBot::new();
    let dispatcher = Dispatcher::new()
        .with(on_callback(item("buy", 0)).handler(buy))
        .with(on_callback(ItemCallback::default()).handler(any));

    assert!(dispatcher.dispatch(callback(1, "item:buy:7"), bot.boxed()).await);
    assert!(dispatcher.dispatch(callback(1, "item:sell:8"), bot.boxed()).await);
    assert!(!dispatcher.dispatch(callback(1, "other:x"), bot.boxed()).await);

    assert_eq!(*seen.lock(), ["buy 7", "sell 8"]);
    assert_eq!(bot.calls(), ["answerCallbackQuery"]);
}

#[tokio::test]
async fn test_group_and_error_pipeline() {
    let handled = Arc::new(Mutex::new(Vec::new()));

    let mut admin = HandlerGroup::new("admin").with_filter(private_chat());
    admin.add(on_command("ban").handler(|| async {
        HandlerResult::Err(Box::new(ApiError::remote(
            403,
            "Forbidden: bot was blocked by the user",
        )))
    }));
    admin.add(on_command("crash").handler(|| async { HandlerResult::Err("boom".into()) }));

    let mut dispatcher = Dispatcher::new();
    dispatcher.register_group(admin);

    let blocked = Arc::clone(&handled);
    dispatcher.on_bot_blocked(move |_ctx, _err| {
        let blocked = Arc::clone(&blocked);
        async move {
            blocked.lock().push("blocked".to_string());
            Ok(())
        }
    });
    let fallback = Arc::clone(&handled);
    dispatcher.set_fallback_error_handler(move |_ctx, err| {
        let fallback = Arc::clone(&fallback);
        async move {
            fallback.lock().push(format!("fallback: {err}"));
            Ok(())
        }
    });

    let bot = RecordingBot::new();
    assert!(dispatcher.dispatch(text(1, "/ban"), bot.boxed()).await);
    assert!(dispatcher.dispatch(text(1, "/crash"), bot.boxed()).await);

    assert_eq!(*handled.lock(), ["blocked", "fallback: boom"]);
}

#[tokio::test]
async fn test_middleware_can_short_circuit() {
    let allowed = 1_i64;
    let gate = middleware_fn(move |ctx: Arc<DispatchContext>, next: Next| async move {
        if ctx.update().sender().map(|u| u.id) == Some(allowed) {
            next.run().await;
        }
    });

    let bot = RecordingBot::new();
    let dispatcher = Dispatcher::new().with(
        on_command("secret")
            .middleware(gate)
            .handler(|bot: BoxedBot, update: UpdateRef| async move {
                let chat = update.chat().ok_or("no chat")?;
                bot.send_message(chat.id, "42").await?;
                HandlerResult::Ok(())
            }),
    );

    dispatcher.dispatch(text(1, "/secret"), bot.boxed()).await;
    dispatcher.dispatch(text(2, "/secret"), bot.boxed()).await;

    assert_eq!(bot.sent_to(1), ["42"]);
    assert!(bot.sent_to(2).is_empty());
}
