//! # Chat Client
//!
//! Line-oriented chat client. Reads commands from stdin:
//!
//! - `/chats` - list marketplace chats
//! - `/join <chat-id> <recipient-id>` - open a marketplace chat
//! - `/support <chat-id>` - open a support chat
//! - `/accept <chat-id>` - take a waiting support chat (agents)
//! - `/resolve` - mark the open support chat as resolved
//! - `/pending` - show the offline outbox
//! - `/quit` - disconnect and exit
//!
//! Any other line is sent to the open chat.

use anyhow::Context;
use chat_client::{logging, ChatRuntime};
use lib_realtime::{listener, ChatEvent, Credentials};
use shared::dto::chat::SenderType;
use shared::dto::realtime::events;
use shared::utils::{preview, short_id};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

enum Target {
    Chat { chat_id: String, recipient_id: String },
    Support { chat_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = lib_core::config::init_config().map_err(anyhow::Error::msg)?;
    logging::init();

    let token = lib_utils::get_env("CHAT_TOKEN").context("CHAT_TOKEN must be set")?;
    let user_id = lib_utils::get_env("CHAT_USER_ID").context("CHAT_USER_ID must be set")?;
    let role: SenderType = lib_utils::get_env_or("CHAT_ROLE", "user")
        .parse()
        .map_err(anyhow::Error::msg)?;

    let runtime = ChatRuntime::start(config, Credentials::new(token, role, user_id)).await?;
    let connection = runtime.connection();
    connection.on(
        events::CONNECTION_STATE_CHANGED,
        listener(|event| {
            if let ChatEvent::StateChanged(state) = event {
                println!("* connection {}", state);
            }
        }),
    );
    for event in [events::MESSAGE_RECEIVED, events::SUPPORT_MESSAGE] {
        connection.on(
            event,
            listener(|event| {
                if let ChatEvent::Remote { data, .. } = event {
                    let chat = data["chatId"].as_str().unwrap_or("?");
                    let content = data["content"].as_str().unwrap_or("");
                    println!("[{}] {}", short_id(chat, 8), preview(content, 200));
                }
            }),
        );
    }
    connection.on(
        events::PENDING_MESSAGE_DROPPED,
        listener(|event| {
            if let ChatEvent::PendingDropped(message) = event {
                println!(
                    "* gave up delivering to {}: {}",
                    short_id(&message.chat_id, 8),
                    preview(&message.content, 40)
                );
            }
        }),
    );

    runtime.connect().await;

    let chats = runtime.chat_session();
    let support = runtime.support_session();
    let mut target: Option<Target> = None;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let mut words = line.split_whitespace();

        let result = match words.next() {
            Some("/quit") => break,
            Some("/chats") => chats.load_chats().await.map(|()| {
                for chat in chats.view().chats {
                    let last = chat.last_message.map(|m| preview(&m.content, 40));
                    println!("{}  {}", chat.id, last.unwrap_or_default());
                }
            }),
            Some("/join") => match (words.next(), words.next()) {
                (Some(chat_id), Some(recipient_id)) => {
                    let result = chats.set_active_chat(chat_id).await;
                    for message in chats.view().messages {
                        println!("[{}] {}", message.chat_id, message.content);
                    }
                    target = Some(Target::Chat {
                        chat_id: chat_id.to_string(),
                        recipient_id: recipient_id.to_string(),
                    });
                    result
                }
                _ => {
                    println!("usage: /join <chat-id> <recipient-id>");
                    Ok(())
                }
            },
            Some("/support") => match words.next() {
                Some(chat_id) => {
                    let result = support.set_active_chat(chat_id).await;
                    for message in support.view().messages {
                        println!("[{}] {}: {}", message.chat_id, message.sender_type, message.content);
                    }
                    target = Some(Target::Support {
                        chat_id: chat_id.to_string(),
                    });
                    result
                }
                None => {
                    println!("usage: /support <chat-id>");
                    Ok(())
                }
            },
            Some("/accept") => match words.next() {
                Some(chat_id) => support.accept_chat(chat_id),
                None => {
                    println!("usage: /accept <chat-id>");
                    Ok(())
                }
            },
            Some("/resolve") => match &target {
                Some(Target::Support { chat_id }) => support.mark_as_resolved(chat_id).await,
                _ => {
                    println!("no support chat open");
                    Ok(())
                }
            },
            Some("/pending") => {
                for message in runtime.cache().get_pending_messages().await {
                    println!(
                        "{}  {}  retries={}  {}",
                        message.id,
                        message.chat_id,
                        message.retry_count,
                        preview(&message.content, 40)
                    );
                }
                Ok(())
            }
            _ => match &target {
                Some(Target::Chat {
                    chat_id,
                    recipient_id,
                }) => chats.send_message(chat_id, line, recipient_id).await.map(|_| ()),
                Some(Target::Support { chat_id }) => {
                    support.send_message(chat_id, line).await.map(|_| ())
                }
                None => {
                    println!("join a chat first");
                    Ok(())
                }
            },
        };

        if let Err(e) = result {
            error!(error = %e, command = line, "Command failed");
            println!("! {}", e);
        }
    }

    chats.close();
    support.close();
    runtime.shutdown().await;
    info!("Chat client exited");
    Ok(())
}
