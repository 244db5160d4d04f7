use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    teloxide::{
        ApiError, RequestError,
        payloads::SendMessageSetters,
        prelude::*,
        types::{ChatAction, ChatId, LinkPreviewOptions, ParseMode},
    },
    tracing::{debug, warn},
};

use streamwatch_monitor::{DeliveryError, Notifier, RecipientId, TextFormat};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, labels, telegram as tg_metrics};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Outbound message sender for Telegram.
#[derive(Clone)]
pub struct TelegramOutbound {
    bot: Bot,
}

impl TelegramOutbound {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }

    /// Send `text` rendered in `format`, with link previews disabled.
    pub async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), RequestError> {
        let result = run_telegram_request_with_retry(chat_id, "send message", || {
            let mut req = self
                .bot
                .send_message(chat_id, text)
                .link_preview_options(link_previews_disabled());
            if let Some(mode) = parse_mode(format) {
                req = req.parse_mode(mode);
            }
            async move { req.await }
        })
        .await;

        #[cfg(feature = "metrics")]
        {
            let outcome = if result.is_ok() { "ok" } else { "error" };
            counter!(tg_metrics::MESSAGES_SENT_TOTAL, labels::OUTCOME => outcome).increment(1);
        }

        result.map(|_| ())
    }

    /// Best effort; a failed chat action never blocks the reply.
    pub async fn send_typing(&self, chat_id: ChatId) {
        if let Err(e) = self.bot.send_chat_action(chat_id, ChatAction::Typing).await {
            debug!(chat_id = chat_id.0, error = %e, "failed to send typing action");
        }
    }
}

#[async_trait]
impl Notifier for TelegramOutbound {
    fn text_format(&self, _to: RecipientId) -> TextFormat {
        TextFormat::Html
    }

    async fn send(
        &self,
        to: RecipientId,
        text: &str,
        format: TextFormat,
    ) -> Result<(), DeliveryError> {
        self.send_text(ChatId(to.0), text, format)
            .await
            .map_err(delivery_error)
    }
}

async fn run_telegram_request_with_retry<T, F, Fut>(
    chat_id: ChatId,
    operation: &'static str,
    mut request: F,
) -> Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                #[cfg(feature = "metrics")]
                counter!(tg_metrics::RATE_LIMITED_TOTAL).increment(1);

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id = chat_id.0,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id = chat_id.0,
                    operation,
                    retries,
                    max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn parse_mode(format: TextFormat) -> Option<ParseMode> {
    match format {
        TextFormat::Html => Some(ParseMode::Html),
        TextFormat::Plain => None,
    }
}

fn link_previews_disabled() -> LinkPreviewOptions {
    LinkPreviewOptions {
        is_disabled: true,
        url: None,
        prefer_small_media: false,
        prefer_large_media: false,
        show_above_text: false,
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}

/// Errors meaning the chat is gone for good: the user blocked the bot,
/// removed it, or deleted their account.
fn is_recipient_gone(error: &ApiError) -> bool {
    match error {
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::UserDeactivated
        | ApiError::ChatNotFound
        | ApiError::CantInitiateConversation => true,
        ApiError::Unknown(description) => {
            let description = description.to_lowercase();
            ["bot was blocked", "bot was kicked", "user is deactivated"]
                .iter()
                .any(|needle| description.contains(needle))
        },
        _ => false,
    }
}

fn delivery_error(error: RequestError) -> DeliveryError {
    match &error {
        RequestError::Api(api) if is_recipient_gone(api) => DeliveryError::unreachable(api.to_string()),
        _ => DeliveryError::failed_external(error.to_string(), error),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        mockito::Matcher,
        serde_json::json,
        std::sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    fn bot_for(server: &mockito::ServerGuard) -> Bot {
        let url = url::Url::parse(&server.url()).unwrap();
        Bot::new("test-token").set_api_url(url)
    }

    fn sent_message_body() -> String {
        json!({
            "ok": true,
            "result": {
                "message_id": 1,
                "date": 0,
                "chat": { "id": 42, "type": "private" },
                "text": "ok"
            }
        })
        .to_string()
    }

    fn rate_limited() -> RequestError {
        RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(3))
    }

    #[test]
    fn retry_after_duration_extracts_wait() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(retry_after_duration(&err), Some(Duration::from_secs(42)));
    }

    #[test]
    fn retry_after_duration_ignores_other_errors() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert_eq!(retry_after_duration(&err), None);
    }

    #[rstest::rstest]
    #[case(ApiError::BotBlocked, true)]
    #[case(ApiError::BotKicked, true)]
    #[case(ApiError::UserDeactivated, true)]
    #[case(ApiError::ChatNotFound, true)]
    #[case(ApiError::Unknown("Forbidden: bot was blocked by the user".into()), true)]
    #[case(ApiError::MessageNotModified, false)]
    #[case(ApiError::Unknown("Bad Request: message is too long".into()), false)]
    fn classifies_gone_recipients(#[case] error: ApiError, #[case] gone: bool) {
        assert_eq!(delivery_error(RequestError::Api(error)).is_unreachable(), gone);
    }

    #[test]
    fn transport_errors_are_transient() {
        let err = delivery_error(RequestError::Io(std::io::Error::other("reset")));
        assert!(!err.is_unreachable());
        assert!(err.to_string().contains("reset"));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_is_retried_after_the_requested_wait() {
        let calls = Arc::new(AtomicUsize::new(0));
        let started = tokio::time::Instant::now();

        let result = run_telegram_request_with_retry(ChatId(1), "test", || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(rate_limited())
                } else {
                    Ok("sent")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "sent");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(started.elapsed() >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limit_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> = run_telegram_request_with_retry(ChatId(1), "test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            }
        })
        .await;

        assert!(matches!(result, Err(RequestError::RetryAfter(_))));
        assert_eq!(
            calls.load(Ordering::SeqCst),
            TELEGRAM_RETRY_AFTER_MAX_RETRIES + 1
        );
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));

        let result: Result<(), _> = run_telegram_request_with_retry(ChatId(1), "test", || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RequestError::Api(ApiError::BotBlocked))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn send_uses_html_without_link_previews() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/bottest-token/SendMessage")
            .match_body(Matcher::PartialJson(json!({
                "chat_id": 42,
                "text": "<b>hi</b>",
                "parse_mode": "HTML",
                "link_preview_options": { "is_disabled": true }
            })))
            .with_header("content-type", "application/json")
            .with_body(sent_message_body())
            .create_async()
            .await;

        let outbound = TelegramOutbound::new(bot_for(&server));
        outbound
            .send(RecipientId(42), "<b>hi</b>", TextFormat::Html)
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn blocked_bot_maps_to_unreachable() {
        let mut server = mockito::Server::new_async().await;
        let _blocked = server
            .mock("POST", "/bottest-token/SendMessage")
            .with_status(403)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "ok": false,
                    "error_code": 403,
                    "description": "Forbidden: bot was blocked by the user"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let outbound = TelegramOutbound::new(bot_for(&server));
        let err = outbound
            .send(RecipientId(42), "hi", TextFormat::Html)
            .await
            .unwrap_err();

        assert!(err.is_unreachable());
    }
}
