use std::sync::Arc;

use {
    teloxide::{prelude::*, types::ChatId},
    tracing::{debug, info, warn},
};

use streamwatch_monitor::{MonitorService, RecipientId, TextFormat, format};

#[cfg(feature = "metrics")]
use streamwatch_metrics::{counter, labels, telegram as tg_metrics};

use crate::outbound::TelegramOutbound;

const WELCOME: &str = "You are subscribed. I will message you when a tracked channel \
                       starts or finishes streaming.\n\n/status shows who is live right \
                       now, /unsubscribe stops the notifications.";
const ALREADY_SUBSCRIBED: &str = "You are already subscribed. /unsubscribe stops the notifications.";
const UNSUBSCRIBED: &str = "You will no longer receive notifications. Send /start to subscribe again.";
const NOT_SUBSCRIBED: &str = "You were not subscribed. Send /start to subscribe.";
const HELP: &str = "/start - subscribe to stream notifications\n\
                    /unsubscribe - stop notifications\n\
                    /status - show which channels are live now\n\
                    /help - show this message";

/// Commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Unsubscribe,
    Status,
    Help,
}

impl Command {
    /// Parse a slash command, accepting a `@botname` suffix only when it
    /// names this bot. Anything else yields `None`.
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let body = text.trim_start();
        let cmd_text = body.strip_prefix('/')?;
        let token = cmd_text.split_whitespace().next().unwrap_or("");
        let (name, mention) = match token.split_once('@') {
            Some((name, mention)) => (name, Some(mention)),
            None => (token, None),
        };
        if let (Some(mention), Some(me)) = (mention, bot_username)
            && !mention.eq_ignore_ascii_case(me)
        {
            return None;
        }
        match name.to_ascii_lowercase().as_str() {
            "start" => Some(Self::Start),
            "unsubscribe" | "stop" => Some(Self::Unsubscribe),
            "status" | "piv_lobby" => Some(Self::Status),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Unsubscribe => "unsubscribe",
            Self::Status => "status",
            Self::Help => "help",
        }
    }
}

/// Everything a command handler needs.
#[derive(Clone)]
pub struct HandlerContext {
    pub service: Arc<MonitorService>,
    pub outbound: TelegramOutbound,
    pub bot_username: Option<String>,
}

/// Handle one incoming message. Non-command messages are ignored.
pub async fn handle_message(msg: &Message, ctx: &HandlerContext) -> crate::Result<()> {
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let Some(command) = Command::parse(text, ctx.bot_username.as_deref()) else {
        debug!(chat_id = msg.chat.id.0, "ignoring non-command message");
        return Ok(());
    };

    #[cfg(feature = "metrics")]
    counter!(tg_metrics::COMMANDS_RECEIVED_TOTAL, labels::COMMAND => command.name()).increment(1);

    let chat_id = msg.chat.id;
    debug!(chat_id = chat_id.0, command = command.name(), "handling command");

    match command {
        Command::Start => {
            let added = ctx.service.subscribers().add(RecipientId(chat_id.0));
            if added {
                info!(chat_id = chat_id.0, "subscriber added");
            }
            let reply = if added { WELCOME } else { ALREADY_SUBSCRIBED };
            reply_plain(ctx, chat_id, reply).await
        },
        Command::Unsubscribe => {
            let removed = ctx.service.subscribers().remove(RecipientId(chat_id.0));
            if removed {
                info!(chat_id = chat_id.0, "subscriber removed on request");
            }
            let reply = if removed { UNSUBSCRIBED } else { NOT_SUBSCRIBED };
            reply_plain(ctx, chat_id, reply).await
        },
        Command::Status => {
            ctx.outbound.send_typing(chat_id).await;
            let reply = match ctx.service.status_report(TextFormat::Html).await {
                Ok(report) => report,
                Err(e) => {
                    warn!(chat_id = chat_id.0, error = %e, "status report failed");
                    format!("❌ Error: {}", format::escape_html(&e.to_string()))
                },
            };
            ctx.outbound
                .send_text(chat_id, &reply, TextFormat::Html)
                .await?;
            Ok(())
        },
        Command::Help => reply_plain(ctx, chat_id, HELP).await,
    }
}

async fn reply_plain(ctx: &HandlerContext, chat_id: ChatId, text: &str) -> crate::Result<()> {
    ctx.outbound
        .send_text(chat_id, text, TextFormat::Plain)
        .await?;
    Ok(())
}
