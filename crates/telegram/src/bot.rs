use std::{sync::Arc, time::Duration};

use {
    teloxide::{
        ApiError, RequestError,
        payloads::DeleteWebhookSetters,
        prelude::*,
        types::{AllowedUpdate, BotCommand, UpdateKind},
    },
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{debug, error, info, warn},
};

use {streamwatch_common::retry::retry, streamwatch_monitor::MonitorService};

use crate::{
    config::TelegramConfig,
    handlers::{self, HandlerContext},
    outbound::TelegramOutbound,
};

const GET_UPDATES_ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// A connected bot, ready to poll for updates.
pub struct TelegramBot {
    bot: Bot,
    bot_username: Option<String>,
    long_poll_timeout: Duration,
    outbound: TelegramOutbound,
}

/// Verify the token, clear any webhook and register the command list.
///
/// `getMe` is retried per the config's connect policy; running out of
/// attempts is returned as an error.
pub async fn connect(config: &TelegramConfig) -> crate::Result<TelegramBot> {
    let bot = config.build_bot()?;

    let me = retry(&config.connect_policy, "telegram getMe", || {
        let req = bot.get_me();
        async move { req.await }
    })
    .await?;
    let bot_username = me.username.clone();

    // Long polling does not work while a webhook is set. Updates queued
    // while the bot was down are dropped.
    bot.delete_webhook().drop_pending_updates(true).await?;

    let commands = vec![
        BotCommand::new("start", "Subscribe to stream notifications"),
        BotCommand::new("unsubscribe", "Stop notifications"),
        BotCommand::new("status", "Show which channels are live now"),
        BotCommand::new("help", "Show available commands"),
    ];
    if let Err(e) = bot.set_my_commands(commands).await {
        warn!("failed to register bot commands: {e}");
    }

    info!(username = ?bot_username, "telegram bot connected (webhook cleared)");

    let outbound = TelegramOutbound::new(bot.clone());
    Ok(TelegramBot {
        bot,
        bot_username,
        long_poll_timeout: config.long_poll_timeout,
        outbound,
    })
}

impl TelegramBot {
    /// Sender sharing this bot's connection, for subscriber announcements.
    #[must_use]
    pub fn outbound(&self) -> TelegramOutbound {
        self.outbound.clone()
    }

    pub fn spawn(self, service: Arc<MonitorService>, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(service, cancel))
    }

    /// Long-poll for updates until `cancel` fires.
    ///
    /// If another process starts polling with the same token, the loop
    /// cancels `cancel` and exits.
    pub async fn run(self, service: Arc<MonitorService>, cancel: CancellationToken) {
        info!("starting telegram polling loop");
        let ctx = HandlerContext {
            service,
            outbound: self.outbound.clone(),
            bot_username: self.bot_username.clone(),
        };
        let timeout = u32::try_from(self.long_poll_timeout.as_secs()).unwrap_or(30);
        let mut offset: i32 = 0;

        loop {
            let request = self
                .bot
                .get_updates()
                .offset(offset)
                .timeout(timeout)
                .allowed_updates(vec![AllowedUpdate::Message]);

            let result = tokio::select! {
                () = cancel.cancelled() => break,
                result = request.send() => result,
            };

            match result {
                Ok(updates) => {
                    debug!(count = updates.len(), "got telegram updates");
                    for update in updates {
                        offset = update.id.as_offset();
                        match update.kind {
                            UpdateKind::Message(msg) => {
                                if let Err(e) = handlers::handle_message(&msg, &ctx).await {
                                    error!(
                                        chat_id = msg.chat.id.0,
                                        error = %e,
                                        "error handling telegram message"
                                    );
                                }
                            },
                            other => {
                                debug!("ignoring non-message update: {other:?}");
                            },
                        }
                    }
                },
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    error!("another bot instance is already polling with this token, shutting down");
                    cancel.cancel();
                    break;
                },
                Err(e) => {
                    warn!(error = %e, "telegram getUpdates failed");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = tokio::time::sleep(GET_UPDATES_ERROR_BACKOFF) => {},
                    }
                },
            }
        }

        info!("telegram polling stopped");
    }
}
