//! REPL shell: Reedline-based interactive send form.
use crate::{App, Cli};
use anyhow::Result;
use reedline::{DefaultCompleter, DefaultPrompt, DefaultPromptSegment, Reedline, Signal};
use tezsend_core::address::short_address;
use tezsend_core::amount::format_balance;
use tezsend_core::commands::Command;
use tezsend_core::{Account, ChainClient, SendSession};
use tracing::warn;

pub async fn run_repl(cli: &Cli, app: &App) -> Result<()> {
    let context = app.chain.context();
    println!("tezsend v{}", env!("CARGO_PKG_VERSION"));
    println!("Network: {} ({})", context.network, context.rpc_url);
    println!();

    println!("Accounts:");
    for acc in app.accounts.all() {
        println!("  - {} ({}, {})", acc.name, short_address(&acc.pkh), acc.kind);
    }
    println!();

    let account = app.initial_account(cli)?;
    let mut session = app.session(&account);
    let mut prompt = make_prompt(&account);
    announce(&account, &session).await;
    println!("Type 'help' for a list of commands.");
    println!();

    let commands: Vec<String> = vec![
        "balance".into(),
        "bal".into(),
        "accounts".into(),
        "acc".into(),
        "to".into(),
        "recipient".into(),
        "clear".into(),
        "amount".into(),
        "amt".into(),
        "fee".into(),
        "max".into(),
        "recommended".into(),
        "rec".into(),
        "estimate".into(),
        "est".into(),
        "focus".into(),
        "form".into(),
        "show".into(),
        "send".into(),
        "pending".into(),
        "ops".into(),
        "use".into(),
        "switch".into(),
        "help".into(),
        "exit".into(),
        "quit".into(),
        "q".into(),
    ];
    let completer = Box::new(DefaultCompleter::new(commands));
    let mut line_editor = Reedline::create().with_completer(completer);

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match Command::parse(line) {
                    Ok(Command::Exit) => {
                        println!("Goodbye.");
                        break;
                    }
                    Ok(Command::Use { account: input }) => match app.accounts.lookup(&input) {
                        Some(acc) if acc.pkh == session.account() => {
                            println!("Already using {}.", acc.name);
                        }
                        Some(acc) => {
                            // A fresh session starts with an empty form; caches carry over.
                            session = app.session(acc);
                            prompt = make_prompt(acc);
                            println!("Switched to {}.", acc.name);
                            announce(acc, &session).await;
                        }
                        None => eprintln!("Error: Unknown account '{input}'."),
                    },
                    Ok(cmd) => {
                        if let Some(prompt_msg) = cmd.confirmation_prompt(&session.form(), &app.accounts) {
                            if !prompt_confirm(&prompt_msg) {
                                println!("Cancelled.");
                                continue;
                            }
                        }
                        match cmd.execute(&session, &app.accounts, &app.store, false).await {
                            Ok(output) => {
                                if !output.is_empty() {
                                    println!("{output}");
                                }
                            }
                            Err(e) => {
                                eprintln!("Error: {e}");
                            }
                        }
                    }
                    Err(e) => {
                        eprintln!("{e}");
                    }
                }
            }
            Ok(Signal::CtrlD) | Ok(Signal::CtrlC) => {
                println!("Goodbye.");
                break;
            }
            Err(e) => {
                eprintln!("Input error: {e}");
                break;
            }
        }
    }

    Ok(())
}

fn make_prompt(account: &Account) -> DefaultPrompt {
    let prompt_str = format!("[tezsend {} {}]", account.name, short_address(&account.pkh));
    DefaultPrompt::new(
        DefaultPromptSegment::Basic(prompt_str),
        DefaultPromptSegment::Empty,
    )
}

async fn announce(account: &Account, session: &SendSession) {
    println!("Sending from {} ({})", account.name, account.pkh);
    match session.balance().await {
        Ok(balance) => println!("Balance: {}", format_balance(balance)),
        Err(e) => warn!(error = %e, "could not load balance"),
    }
}

fn prompt_confirm(prompt: &str) -> bool {
    use std::io::Write;
    print!("{prompt} [y/N]: ");
    std::io::stdout().flush().ok();
    let mut input = String::new();
    std::io::stdin().read_line(&mut input).is_ok() && input.trim().eq_ignore_ascii_case("y")
}
