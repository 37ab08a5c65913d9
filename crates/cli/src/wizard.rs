//! The sequential console wizard: welcome → environment check → login →
//! mode → captions → chat selection → summary → live status → post-run
//! cleanup → exit. Mirrors the numbered-step flow of the console front-end.

use {
    anyhow::bail,
    telefwd_client::Session,
    telefwd_common::ChatDescriptor,
    telefwd_forwarder::{ForwardEngine, ForwardEvent, ForwardMode, ForwardOptions, clear_chat},
};

use crate::{
    commands,
    prompt::{ConsolePrompter, confirm, print_header, prompt_line, wait_enter},
    steps,
};

pub(crate) async fn run_wizard() -> anyhow::Result<()> {
    // Step 1: welcome
    print_header(&format!(
        "Telegram Auto Forwarder v{}",
        env!("CARGO_PKG_VERSION")
    ));
    println!("Automatically forward Telegram messages from one chat to another.");
    println!("\nPrerequisites:");
    println!("  - A Telegram account");
    println!("  - Your Telegram API ID and API Hash (from my.telegram.org)");
    wait_enter()?;

    // Step 2: environment check
    print_header("Step 2: Environment Check");
    std::fs::create_dir_all(telefwd_config::paths::config_dir())?;
    println!("Config file: {}", telefwd_config::config_path().display());
    if telefwd_config::session_path().exists() {
        println!("Existing session found. Login will be skipped if it is still valid.");
    } else {
        println!("No stored session. A first-time login is required.");
    }
    wait_enter()?;

    // Step 3: login
    print_header("Step 3: Telegram Login");
    let session = commands::open_session(true).await?;
    session.login(&ConsolePrompter).await?;
    println!("Successfully connected to Telegram.");
    wait_enter()?;

    // Step 4: forwarding mode
    print_header("Step 4: Forwarding Mode Selection");
    println!("1. Original Caption Mode");
    println!("   - Forwards all message types, keeping original text and captions.");
    println!("   - Best for chat backups or mirroring content.\n");
    println!("2. Custom Caption Mode");
    println!("   - Forwards only media, with a generated '<PREFIX> <COUNTER>' caption.");
    println!("   - Skips text-only messages.");
    println!("   - Best for structured content like study materials.\n");
    let mode = loop {
        let input = prompt_line("Select your desired mode [1/2]")?;
        match steps::parse_mode(&input) {
            Some(mode) => break mode,
            None => println!("Invalid selection. Please enter 1 or 2."),
        }
    };

    let store = session.store();

    // Step 5: custom caption setup
    if mode == ForwardMode::Custom {
        print_header("Step 5: Custom Caption Configuration");
        let current_prefix = store.lock().unwrap_or_else(|e| e.into_inner()).config().caption_prefix.clone();
        if confirm(&format!(
            "Current prefix is '{current_prefix}'. Do you want to change it?"
        ))? {
            let prefix = prompt_line("Enter new caption prefix")?;
            if !prefix.is_empty() {
                store.lock().unwrap_or_else(|e| e.into_inner()).set_caption_prefix(prefix)?;
            }
        }
        let counter = store.lock().unwrap_or_else(|e| e.into_inner()).config().counter;
        if confirm(&format!(
            "Current counter is {counter}. Do you want to reset it to 1?"
        ))? {
            store.lock().unwrap_or_else(|e| e.into_inner()).reset_counter()?;
        }
        println!(
            "\nLive preview: {}",
            store.lock().unwrap_or_else(|e| e.into_inner()).next_caption()
        );
        wait_enter()?;
    }

    // Step 6: chat selection
    print_header("Step 6: Source & Destination Chat Selection");
    let (source, destination) = select_chats(&session).await?;

    // Step 7: summary
    print_header("Step 7: Configuration Summary");
    {
        let guard = store.lock().unwrap_or_else(|e| e.into_inner());
        let cfg = guard.config();
        let mode_label = match mode {
            ForwardMode::Original => "Original Caption",
            ForwardMode::Custom => "Custom Caption",
        };
        println!("  - Forwarding Mode:   {mode_label}");
        println!("  - Source Chat:       {} ({source})", cfg.source_name);
        println!("  - Destination Chat:  {} ({destination})", cfg.destination_name);
        if mode == ForwardMode::Custom {
            println!("  - Caption Prefix:    '{}'", cfg.caption_prefix);
            println!("  - Next Counter:      {}", cfg.counter);
        }
    }
    if !confirm("Start forwarding with these settings?")? {
        println!("Operation cancelled by user.");
        return Ok(());
    }

    // Step 8: live status
    print_header("Step 8: Live Forwarding Status");
    println!("Press Ctrl+C to stop forwarding at any time.");
    let opts = ForwardOptions::new(mode, source, destination);
    let (handle, mut events) = ForwardEngine::spawn(session.gateway(), store.clone(), opts)?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nStopping after the current message...");
                handle.stop();
            },
            event = events.recv() => match event {
                Some(event) => print_event(&event),
                None => break,
            },
        }
    }
    let report = handle.join().await?;
    println!(
        "Session totals — forwarded: {}, skipped: {}.",
        report.forwarded, report.skipped
    );

    // Step 9: post-run cleanup
    print_header("Step 9: Post-Forwarding Actions");
    let (source_name, destination_name) = {
        let guard = store.lock().unwrap_or_else(|e| e.into_inner());
        (
            guard.config().source_name.clone(),
            guard.config().destination_name.clone(),
        )
    };
    offer_clear(&session, source, &source_name).await?;
    offer_clear(&session, destination, &destination_name).await?;

    // Step 10: exit
    print_header("Step 10: Exit");
    println!(
        "Configuration saved to {}.",
        store.lock().unwrap_or_else(|e| e.into_inner()).path().display()
    );
    println!("Counter state and chat settings are preserved for the next run.");
    Ok(())
}

async fn select_chats(session: &Session) -> anyhow::Result<(i64, i64)> {
    let store = session.store();
    let configured = {
        let guard = store.lock().unwrap_or_else(|e| e.into_inner());
        (
            guard.config().source_chat_id,
            guard.config().destination_chat_id,
        )
    };
    let must_select = configured.0.is_none() || configured.1.is_none();
    let question = if must_select {
        "You must set the source and destination chats. Continue?"
    } else {
        "Do you want to change the source and destination chats?"
    };

    if !confirm(question)? {
        return match configured {
            (Some(source), Some(destination)) => Ok((source, destination)),
            _ => bail!("source and destination must be set before proceeding"),
        };
    }

    println!("Fetching your chats... This may take a moment.");
    let chats = session.list_chats().await?;
    println!("\n--- Your Accessible Chats ---");
    for chat in &chats {
        println!("  - {} ({})", chat.display_name, chat.kind);
        println!("    ID: {}", chat.id);
    }
    println!("-----------------------------\n");

    let source = pick_chat(&chats, "Enter the SOURCE chat ID", None)?;
    let destination = pick_chat(&chats, "Enter the DESTINATION chat ID", Some(source.id))?;
    store.lock().unwrap_or_else(|e| e.into_inner()).set_chats(source, destination)?;
    println!("Chats selected.");
    println!("  - Source: {} ({})", source.display_name, source.id);
    println!(
        "  - Destination: {} ({})",
        destination.display_name, destination.id
    );
    Ok((source.id, destination.id))
}

fn pick_chat<'a>(
    chats: &'a [ChatDescriptor],
    message: &str,
    exclude: Option<i64>,
) -> anyhow::Result<&'a ChatDescriptor> {
    loop {
        let input = prompt_line(message)?;
        match steps::choose_chat(chats, &input, exclude) {
            Ok(chat) => return Ok(chat),
            Err(e) => println!("{e}"),
        }
    }
}

async fn offer_clear(session: &Session, chat: i64, name: &str) -> anyhow::Result<()> {
    println!("\nWARNING: clearing permanently deletes messages. This is IRREVERSIBLE.");
    if confirm(&format!("Clear the chat history of '{name}'?"))? {
        let gateway = session.gateway();
        match clear_chat(gateway.as_ref(), chat).await {
            Ok(deleted) => println!("Successfully deleted {deleted} messages."),
            Err(e) => println!("Failed to clear chat: {e}"),
        }
    }
    Ok(())
}

fn print_event(event: &ForwardEvent) {
    match event {
        ForwardEvent::BackfillStarted => println!("Backfilling existing messages..."),
        ForwardEvent::Forwarded { message } => println!("  [+] Forwarded message {message}"),
        ForwardEvent::CaptionSent { message, caption } => {
            println!("  [+] Sent media {message} with caption '{caption}'");
        },
        ForwardEvent::Skipped { message } => {
            println!("  [-] Skipped text-only message {message}");
        },
        ForwardEvent::Failed { message, error } => {
            println!("  [!] Message {message} failed: {error}");
        },
        ForwardEvent::BackfillComplete { forwarded, skipped } => {
            println!("Backfill complete. Forwarded: {forwarded}, skipped: {skipped}.");
        },
        ForwardEvent::Listening => println!("Listening for new messages..."),
        ForwardEvent::Stopped => println!("Forwarding stopped."),
    }
}
