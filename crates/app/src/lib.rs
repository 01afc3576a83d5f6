#![deny(unsafe_code)]

//! Terminal front end for the farm advice chat.

/// HTTP endpoint feeding answer notifications into the chat.
pub mod callback;
pub mod error;
pub mod settings;
/// Line-oriented stdin/stdout presentation layer.
pub mod terminal;

use std::net::SocketAddr;
use std::sync::Arc;

use farm_helper_advice::WebhookClient;
use farm_helper_chat::{CannedResponses, ChatRuntime, ChatSession, SessionId};
use snafu::ResultExt;
use tokio::sync::mpsc;

use crate::error::{
    AdviceClientSnafu, AppResult, BindCallbackSnafu, CallbackAddrSnafu, SaveSettingsSnafu,
};
use crate::settings::{ChatSettings, SettingsStore};

/// Writes the effective settings back to the store's file.
pub fn init_config(store: &SettingsStore) -> AppResult<()> {
    store
        .update((*store.settings()).clone())
        .context(SaveSettingsSnafu {
            stage: "write-initial-settings",
        })
}

/// Runs one chat session until stdin closes or `/quit` is entered.
pub async fn run(settings: Arc<ChatSettings>) -> AppResult<()> {
    let client = WebhookClient::new(settings.webhook_config()).context(AdviceClientSnafu {
        stage: "create-webhook-client",
    })?;

    let callback_addr: SocketAddr =
        settings
            .callback_addr
            .parse()
            .context(CallbackAddrSnafu {
                stage: "parse-callback-addr",
                addr: settings.callback_addr.clone(),
            })?;
    let listener = tokio::net::TcpListener::bind(callback_addr)
        .await
        .context(BindCallbackSnafu {
            stage: "bind-callback-listener",
            addr: callback_addr,
        })?;

    let session_id = SessionId::generate();
    let session = ChatSession::new(
        session_id,
        settings.session_config(),
        Box::new(CannedResponses::from_entropy()),
    );

    tracing::info!(
        session_id = %session_id,
        webhook = %client.endpoint(),
        callback = %callback_addr,
        "starting farm helper chat"
    );

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        if let Err(error) = callback::serve(listener, inbound_tx).await {
            tracing::error!(error = %error, "callback endpoint stopped");
        }
    });
    tokio::spawn(terminal::read_commands(tokio::io::stdin(), commands_tx));
    let printer = tokio::spawn(terminal::print_events(events_rx));

    let runtime = ChatRuntime::new(session, Arc::new(client), events_tx);
    let session = runtime.run(commands_rx, inbound_rx).await;

    // The runtime dropped its event sender, so the printer drains and exits.
    if let Err(error) = printer.await {
        tracing::warn!(error = %error, "event printer task failed");
    }

    tracing::info!(
        session_id = %session.session_id(),
        messages = session.messages().len(),
        unanswered = session.pending_count(),
        "farm helper chat ended"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::SETTINGS_FILE_NAME;

    #[test]
    fn init_config_writes_effective_settings() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join(SETTINGS_FILE_NAME);
        let store = SettingsStore::new(path.clone());

        init_config(&store).unwrap();

        let written: ChatSettings =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, *store.settings());
    }
}
