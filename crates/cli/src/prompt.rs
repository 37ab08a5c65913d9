//! Line-based console prompts and the console login prompter.

use std::io::Write;

use {
    async_trait::async_trait,
    telefwd_client::LoginPrompter,
    telefwd_common::Result,
};

pub fn print_header(title: &str) {
    println!("\n{}", "=".repeat(50));
    println!(" {title}");
    println!("{}", "=".repeat(50));
}

/// Print `message: ` and read one trimmed line.
pub fn prompt_line(message: &str) -> std::io::Result<String> {
    print!("{message}: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

/// Ask a yes/no question until the answer is unambiguous.
pub fn confirm(message: &str) -> std::io::Result<bool> {
    loop {
        let answer = prompt_line(&format!("{message} (y/n)"))?;
        match crate::steps::parse_yes_no(&answer) {
            Some(choice) => return Ok(choice),
            None => println!("Please answer y or n."),
        }
    }
}

pub fn wait_enter() -> std::io::Result<()> {
    print!("\nPress Enter to continue...");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(())
}

/// Interactive login over stdin. The GUI equivalent would raise dialogs.
pub struct ConsolePrompter;

#[async_trait]
impl LoginPrompter for ConsolePrompter {
    async fn request_phone(&self) -> Result<String> {
        Ok(prompt_line("Enter your phone number (e.g. +1234567890)")?)
    }

    async fn request_code(&self) -> Result<String> {
        Ok(prompt_line("Enter the code you received")?)
    }

    async fn request_password(&self) -> Result<String> {
        Ok(prompt_line(
            "Two-step verification is enabled. Enter your password",
        )?)
    }
}
