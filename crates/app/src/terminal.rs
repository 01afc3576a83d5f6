use std::path::PathBuf;

use farm_helper_chat::{ChatEvent, Command, NoticeLevel};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;

pub const HELP_TEXT: &str = "Type a farming question and press Enter.
  /image <path>   attach a photo (max 5MB)
  /clear-image    remove the attached photo
  /voice          dictate into the current question
  /quit           leave the chat
An empty line sends the attached photo on its own.";

/// What one input line asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Commands(Vec<Command>),
    Help,
    Unknown(String),
}

pub fn parse_line(line: &str) -> LineAction {
    let trimmed = line.trim();
    let Some(slash_command) = trimmed.strip_prefix('/') else {
        return LineAction::Commands(vec![Command::SetText(trimmed.to_string()), Command::Submit]);
    };

    let (name, argument) = match slash_command.split_once(char::is_whitespace) {
        Some((name, argument)) => (name, argument.trim()),
        None => (slash_command, ""),
    };

    match name {
        "image" if !argument.is_empty() => {
            LineAction::Commands(vec![Command::AttachImage(PathBuf::from(argument))])
        }
        "clear-image" => LineAction::Commands(vec![Command::ClearImage]),
        "voice" => LineAction::Commands(vec![Command::Dictate]),
        "quit" | "exit" => LineAction::Commands(vec![Command::Shutdown]),
        "help" => LineAction::Help,
        _ => LineAction::Unknown(trimmed.to_string()),
    }
}

/// Forwards parsed input lines until `/quit` or EOF, then asks the chat to shut down.
///
/// No further line is read once a shutdown has been forwarded.
pub async fn read_commands<R>(input: R, commands: mpsc::UnboundedSender<Command>)
where
    R: AsyncRead + Unpin,
{
    println!("{HELP_TEXT}");
    let mut lines = BufReader::new(input).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read terminal input");
                break;
            }
        };

        match parse_line(&line) {
            LineAction::Commands(parsed) => {
                for command in parsed {
                    let shutdown = command == Command::Shutdown;
                    if commands.send(command).is_err() || shutdown {
                        // Another read would park a blocking stdin call the runtime waits on.
                        return;
                    }
                }
            }
            LineAction::Help => println!("{HELP_TEXT}"),
            LineAction::Unknown(input) => println!("! Unknown command {input}. Try /help."),
        }
    }

    let _ = commands.send(Command::Shutdown);
}

pub fn render_event(event: &ChatEvent) -> Option<String> {
    match event {
        ChatEvent::MessageAppended(message) => {
            let speaker = if message.is_user { "You" } else { "Farm Helper" };
            let attachment = if message.has_image() {
                " [image attached]"
            } else {
                ""
            };
            Some(format!(
                "[{}] {speaker}: {}{attachment}",
                message.timestamp.format("%H:%M"),
                message.text
            ))
        }
        ChatEvent::WaitingChanged(true) => Some("Analyzing your query...".to_string()),
        ChatEvent::ListeningChanged(true) => Some("Listening...".to_string()),
        ChatEvent::Notice { level, text } => Some(match level {
            NoticeLevel::Success => format!("✓ {text}"),
            NoticeLevel::Error => format!("! {text}"),
        }),
        // Terminal output always follows the tail.
        ChatEvent::ScrollToLatest
        | ChatEvent::WaitingChanged(false)
        | ChatEvent::ListeningChanged(false)
        | ChatEvent::ComposerCleared => None,
    }
}

pub async fn print_events(mut events: mpsc::UnboundedReceiver<ChatEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = render_event(&event) {
            println!("{line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use farm_helper_chat::Message;

    use super::*;

    #[test]
    fn plain_text_sets_and_submits() {
        assert_eq!(
            parse_line("  My wheat leaves are turning yellow \n"),
            LineAction::Commands(vec![
                Command::SetText("My wheat leaves are turning yellow".to_string()),
                Command::Submit,
            ])
        );
        assert_eq!(
            parse_line(""),
            LineAction::Commands(vec![Command::SetText(String::new()), Command::Submit])
        );
    }

    #[test]
    fn slash_commands_map_to_chat_commands() {
        assert_eq!(
            parse_line("/image  photos/leaf spot.jpg "),
            LineAction::Commands(vec![Command::AttachImage(PathBuf::from(
                "photos/leaf spot.jpg"
            ))])
        );
        assert_eq!(
            parse_line("/clear-image"),
            LineAction::Commands(vec![Command::ClearImage])
        );
        assert_eq!(parse_line("/voice"), LineAction::Commands(vec![Command::Dictate]));
        assert_eq!(parse_line("/quit"), LineAction::Commands(vec![Command::Shutdown]));
        assert_eq!(parse_line("/help"), LineAction::Help);
        assert_eq!(parse_line("/image"), LineAction::Unknown("/image".to_string()));
        assert_eq!(parse_line("/dance"), LineAction::Unknown("/dance".to_string()));
    }

    #[test]
    fn renders_messages_and_notices() {
        let user = Message::user("Is my soil too acidic?", Some("data:image/png;base64,AA".into()));
        let rendered = render_event(&ChatEvent::MessageAppended(user)).unwrap();
        assert!(rendered.ends_with("You: Is my soil too acidic? [image attached]"));

        let reply = Message::assistant("Test the pH first.");
        let rendered = render_event(&ChatEvent::MessageAppended(reply)).unwrap();
        assert!(rendered.ends_with("Farm Helper: Test the pH first."));

        assert_eq!(
            render_event(&ChatEvent::Notice {
                level: NoticeLevel::Error,
                text: "Image size should be less than 5MB".to_string(),
            }),
            Some("! Image size should be less than 5MB".to_string())
        );
        assert_eq!(render_event(&ChatEvent::ScrollToLatest), None);
        assert_eq!(
            render_event(&ChatEvent::WaitingChanged(true)),
            Some("Analyzing your query...".to_string())
        );
    }

    #[tokio::test]
    async fn reader_forwards_lines_then_shuts_down_at_eof() {
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"How do I store onions?\n/voice\n";

        read_commands(input, commands_tx).await;

        let mut received = Vec::new();
        while let Ok(command) = commands_rx.try_recv() {
            received.push(command);
        }
        assert_eq!(
            received,
            vec![
                Command::SetText("How do I store onions?".to_string()),
                Command::Submit,
                Command::Dictate,
                Command::Shutdown,
            ]
        );
    }

    #[tokio::test]
    async fn reader_stops_after_quit() {
        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel();
        let input: &[u8] = b"/quit\nignored\n";

        read_commands(input, commands_tx).await;

        let mut received = Vec::new();
        while let Ok(command) = commands_rx.try_recv() {
            received.push(command);
        }
        assert_eq!(received, vec![Command::Shutdown]);
    }
}
