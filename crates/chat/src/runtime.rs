use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use farm_helper_advice::AdviceClient;
use tokio::sync::mpsc;

use crate::composer::{DictationError, SpeechRecognizer, StagedImage, load_image};
use crate::error::ChatResult;
use crate::events::ChatEvent;
use crate::ids::MessageId;
use crate::inbound::InboundNotification;
use crate::pending::SendOutcome;
use crate::session::{ChatSession, Submission};

/// Input from the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetText(String),
    AttachImage(PathBuf),
    StageImage(StagedImage),
    ClearImage,
    Dictate,
    Submit,
    Shutdown,
}

/// Completions reported back by tasks the loop spawned.
#[derive(Debug)]
enum LoopEvent {
    SendFinished {
        message_id: MessageId,
        outcome: SendOutcome,
    },
    TimeoutElapsed(MessageId),
    ImageLoaded(ChatResult<StagedImage>),
    TranscriptReady(Result<String, DictationError>),
}

/// Single-task driver that owns the [`ChatSession`].
///
/// Sends, timers, file reads and recognition run in spawned tasks and report
/// back through an internal channel; only [`ChatRuntime::run`] mutates state.
/// While an attached image is still loading, later commands are held and
/// replayed in order once it settles.
pub struct ChatRuntime {
    session: ChatSession,
    client: Arc<dyn AdviceClient>,
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
    loop_tx: mpsc::UnboundedSender<LoopEvent>,
    loop_rx: mpsc::UnboundedReceiver<LoopEvent>,
    image_loading: bool,
    held: VecDeque<Command>,
    closing: bool,
}

impl ChatRuntime {
    pub fn new(
        session: ChatSession,
        client: Arc<dyn AdviceClient>,
        events_tx: mpsc::UnboundedSender<ChatEvent>,
    ) -> Self {
        let (loop_tx, loop_rx) = mpsc::unbounded_channel();
        Self {
            session,
            client,
            recognizer: None,
            events_tx,
            loop_tx,
            loop_rx,
            image_loading: false,
            held: VecDeque::new(),
            closing: false,
        }
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn SpeechRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    /// Runs until `Shutdown` arrives or the command channel closes, after any
    /// image load in flight and the commands held behind it have been applied.
    ///
    /// A closed inbound channel only disables answer delivery; timeouts still
    /// settle every submission.
    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut inbound: mpsc::UnboundedReceiver<InboundNotification>,
    ) -> ChatSession {
        tracing::info!(session_id = %self.session.session_id(), "chat runtime started");
        self.flush_events();

        loop {
            tokio::select! {
                biased;

                Some(event) = self.loop_rx.recv() => self.handle_loop_event(event),
                Some(notification) = inbound.recv() => {
                    self.session.accept_notification(&notification);
                }
                command = commands.recv(), if !self.closing => {
                    self.handle_command(command.unwrap_or(Command::Shutdown));
                }
            }
            self.flush_events();

            if self.closing && !self.image_loading {
                break;
            }
        }

        tracing::info!(
            session_id = %self.session.session_id(),
            pending = self.session.pending_count(),
            "chat runtime stopped"
        );
        self.session
    }

    fn handle_command(&mut self, command: Command) {
        if command == Command::Shutdown {
            self.closing = true;
        } else if self.image_loading {
            tracing::debug!(held = self.held.len() + 1, "image still loading; command held");
            self.held.push_back(command);
        } else {
            self.apply_command(command);
        }
    }

    fn apply_command(&mut self, command: Command) {
        match command {
            Command::SetText(text) => self.session.set_text(text),
            Command::AttachImage(path) => self.spawn_image_load(path),
            Command::StageImage(image) => {
                self.session.stage_image(Ok(image));
            }
            Command::ClearImage => self.session.clear_image(),
            Command::Dictate => self.start_dictation(),
            Command::Submit => {
                if let Some(submission) = self.session.submit() {
                    self.spawn_send(submission);
                }
            }
            Command::Shutdown => {}
        }
    }

    fn handle_loop_event(&mut self, event: LoopEvent) {
        match event {
            LoopEvent::SendFinished {
                message_id,
                outcome,
            } => {
                if let Some(window) = self.session.record_send_outcome(message_id, outcome) {
                    self.spawn_timeout(message_id, window);
                }
            }
            LoopEvent::TimeoutElapsed(message_id) => {
                self.session.expire(message_id);
            }
            LoopEvent::ImageLoaded(loaded) => {
                self.image_loading = false;
                self.session.stage_image(loaded);
                self.replay_held();
            }
            LoopEvent::TranscriptReady(result) => self.session.finish_dictation(result),
        }
    }

    fn spawn_send(&self, submission: Submission) {
        let client = Arc::clone(&self.client);
        let loop_tx = self.loop_tx.clone();
        let Submission {
            message_id,
            request,
        } = submission;

        // Never cancelled: once issued, the send runs to completion on its own.
        tokio::spawn(async move {
            let outcome = SendOutcome::from_result(client.send(request).await);
            let _ = loop_tx.send(LoopEvent::SendFinished {
                message_id,
                outcome,
            });
        });
    }

    fn spawn_timeout(&self, message_id: MessageId, window: Duration) {
        let loop_tx = self.loop_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let _ = loop_tx.send(LoopEvent::TimeoutElapsed(message_id));
        });
    }

    /// Stops early when a replayed `AttachImage` starts another load.
    fn replay_held(&mut self) {
        while !self.image_loading {
            let Some(command) = self.held.pop_front() else {
                break;
            };
            self.apply_command(command);
        }
    }

    fn spawn_image_load(&mut self, path: PathBuf) {
        self.image_loading = true;
        let loop_tx = self.loop_tx.clone();
        tokio::spawn(async move {
            let loaded = load_image(&path).await;
            let _ = loop_tx.send(LoopEvent::ImageLoaded(loaded));
        });
    }

    fn start_dictation(&mut self) {
        let available = self.recognizer.is_some();
        if !self.session.begin_dictation(available) {
            return;
        }
        let Some(recognizer) = self.recognizer.as_ref() else {
            return;
        };

        let recognition = recognizer.recognize();
        let loop_tx = self.loop_tx.clone();
        tokio::spawn(async move {
            let result = recognition.await;
            let _ = loop_tx.send(LoopEvent::TranscriptReady(result));
        });
    }

    fn flush_events(&mut self) {
        for event in self.session.drain_events() {
            // A detached presentation layer does not stop the chat.
            let _ = self.events_tx.send(event);
        }
    }
}
