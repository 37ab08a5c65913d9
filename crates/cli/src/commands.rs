//! Non-wizard subcommands and shared session setup.

use std::sync::{Arc, Mutex};

use {
    anyhow::bail,
    telefwd_client::{GrammersGateway, NonInteractive, Session},
    telefwd_config::{ConfigStore, env_credentials, session_path},
    telefwd_forwarder::clear_chat,
};

use crate::prompt;

/// Load the config, resolve API credentials (environment first, then the
/// stored record, then — when allowed — an interactive prompt), connect,
/// and wrap everything in the session context object.
pub(crate) async fn open_session(interactive: bool) -> anyhow::Result<Session> {
    let mut store = ConfigStore::load_default()?;

    let credentials = match env_credentials()? {
        Some(creds) => Some(creds),
        None => store.config().credentials(),
    };
    let (api_id, api_hash) = match credentials {
        Some(creds) => creds,
        None if interactive => {
            println!("You can find your API credentials at my.telegram.org (App API ID and Hash).");
            let api_id: i32 = prompt::prompt_line("Enter your API ID")?
                .parse()
                .map_err(|_| anyhow::anyhow!("API ID must be an integer"))?;
            let api_hash = prompt::prompt_line("Enter your API Hash")?;
            store.set_credentials(api_id, api_hash.clone())?;
            (api_id, api_hash)
        },
        None => bail!("no API credentials configured; run `telefwd` to log in"),
    };

    let session_file = session_path();
    let gateway = GrammersGateway::connect(api_id, &api_hash, session_file.clone()).await?;
    Ok(Session::new(
        Arc::new(gateway),
        Arc::new(Mutex::new(store)),
        session_file,
    ))
}

async fn open_logged_in() -> anyhow::Result<Session> {
    let session = open_session(false).await?;
    if session.login(&NonInteractive).await.is_err() {
        bail!("not logged in; run `telefwd` to log in first");
    }
    Ok(session)
}

pub(crate) async fn handle_chats() -> anyhow::Result<()> {
    let session = open_logged_in().await?;
    let chats = session.list_chats().await?;
    println!("--- Your Accessible Chats ---");
    for chat in chats {
        println!("  - {} ({})", chat.display_name, chat.kind);
        println!("    ID: {}", chat.id);
    }
    Ok(())
}

pub(crate) async fn handle_clear(chat: i64, yes: bool) -> anyhow::Result<()> {
    let session = open_logged_in().await?;
    if !yes {
        println!("WARNING: this permanently deletes every message in chat {chat}.");
        if !prompt::confirm("This action is IRREVERSIBLE. Continue?")? {
            println!("Cancelled.");
            return Ok(());
        }
    }
    let gateway = session.gateway();
    let deleted = clear_chat(gateway.as_ref(), chat).await?;
    println!("Deleted {deleted} messages.");
    Ok(())
}

pub(crate) async fn handle_logout() -> anyhow::Result<()> {
    match open_session(false).await {
        Ok(session) => {
            session.logout().await?;
            println!("Logged out; session artifact and credentials cleared.");
        },
        Err(_) => {
            // No usable credentials to connect with; clear local state only.
            let mut store = ConfigStore::load_default()?;
            store.clear_credentials()?;
            match std::fs::remove_file(session_path()) {
                Ok(()) => {},
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
                Err(e) => return Err(e.into()),
            }
            println!("Cleared local session state.");
        },
    }
    Ok(())
}
