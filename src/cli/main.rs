/**
 * SustainaFood Chat Entry Point
 *
 * Terminal front-end for the messaging client. Reads commands from stdin and
 * prints session updates as they arrive.
 */
use std::path::PathBuf;
use std::sync::Arc;

use sustainafood_chat::client::messaging::total_unread;
use sustainafood_chat::client::{
    Config, HttpChatApi, MessagingClient, PollingTransport, SessionUpdate,
};
use sustainafood_chat::shared::error::ChatError;
use sustainafood_chat::shared::messaging::{ChatMessage, UserId};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /list            show conversations
  /search <text>   filter conversations by name
  /open <user-id>  open the conversation with a user
  /close           close the open conversation
  /collapse        collapse the chat
  /expand          expand the chat
  /read            print the conversation as text
  /quit            exit
Anything else is sent to the open conversation.";

type Client = MessagingClient<HttpChatApi, PollingTransport>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::from_env(config_path.as_deref())?;
    tracing::info!("[STARTUP] Backend at {}", config.server_url());

    let api = Arc::new(HttpChatApi::new(config.clone()));
    let transport = Arc::new(PollingTransport::new(config.clone()));
    let mut client = match MessagingClient::new(config, api, transport) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    println!("{}", HELP);
    client.refresh_conversations();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle_command(&mut client, line.trim()) {
                    break;
                }
            }
            update = client.next_event() => render(&client, update),
        }
    }

    client.close_conversation();
    Ok(())
}

/// Apply one input line; false to quit
fn handle_command(client: &mut Client, line: &str) -> bool {
    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "" => {}
        "/quit" => return false,
        "/help" => println!("{}", HELP),
        "/list" => {
            client.refresh_conversations();
        }
        "/search" => {
            client.set_search_query(arg);
            print_conversations(client);
        }
        "/open" => match parse_recipient(arg, client.current_user()) {
            Ok(recipient) => client.select_recipient(recipient),
            Err(e) => println!("{}", e),
        },
        "/close" => client.close_conversation(),
        "/collapse" => client.set_collapsed(true),
        "/expand" => client.set_collapsed(false),
        "/read" => println!("{}", client.state().transcript(client.current_user())),
        _ if command.starts_with('/') => println!("unknown command {}", command),
        _ => {
            if !client.state().has_open_conversation() {
                println!("open a conversation first (/open <user-id>)");
            } else {
                client.update_draft(line);
                client.send_draft();
            }
        }
    }
    true
}

/// Recipient argument of `/open`
fn parse_recipient(arg: &str, me: &UserId) -> Result<UserId, ChatError> {
    if arg.is_empty() {
        return Err(ChatError::validation("recipient", "usage: /open <user-id>"));
    }
    let recipient = UserId::from(arg);
    if &recipient == me {
        return Err(ChatError::validation("recipient", "cannot open a chat with yourself"));
    }
    Ok(recipient)
}

fn print_message(message: &ChatMessage) {
    println!(
        "[{}] {}: {}",
        message.timestamp.format("%H:%M"),
        message.sender.name,
        message.content
    );
}

fn print_conversations(client: &Client) {
    let state = client.state();
    let me = client.current_user();
    println!(
        "{} conversations, {} unread",
        state.filtered_conversations.len(),
        total_unread(&state.conversations)
    );
    for conv in &state.filtered_conversations {
        let (id, name) = conv
            .other_participant(me)
            .map(|p| (p.id.to_string(), p.name.clone()))
            .unwrap_or_default();
        let badge = if conv.unread_count > 0 {
            format!(" ({})", conv.unread_count)
        } else {
            String::new()
        };
        println!("  {} [{}]{}: {}", name, id, badge, conv.preview());
    }
}

fn render(client: &Client, update: SessionUpdate) {
    let state = client.state();
    match update {
        SessionUpdate::ConversationsLoaded { .. } => print_conversations(client),
        SessionUpdate::RecipientLoaded(user) => {
            println!("-- chat with {}", user.name);
            if let Some(url) = user.photo_url(client.config().server_url()) {
                println!("   photo: {}", url);
            }
        }
        SessionUpdate::Connected => println!("-- connected"),
        SessionUpdate::HistoryLoaded { count: 0 } => println!("-- no messages yet"),
        SessionUpdate::HistoryLoaded { .. } => {
            state.messages.iter().for_each(print_message);
        }
        SessionUpdate::MessageReceived(id) => {
            if state.is_chat_collapsed {
                if state.has_new_message {
                    println!("-- new message");
                }
            } else if let Some(message) = state.messages.iter().find(|m| m.id == id) {
                print_message(message);
            }
        }
        SessionUpdate::MessagesRead { .. } | SessionUpdate::MessageSent(_) => {}
        SessionUpdate::TypingChanged(true) => {
            let name = state.recipient.as_ref().map(|r| r.name.as_str()).unwrap_or("recipient");
            println!("-- {} is typing...", name);
        }
        SessionUpdate::TypingChanged(false) => {}
        SessionUpdate::ConversationClosed => println!("-- conversation closed"),
        SessionUpdate::Disconnected { .. } => println!("-- disconnected, /open again to reconnect"),
        SessionUpdate::Error(message) => eprintln!("error: {}", message),
    }
}
