use anyhow::{bail, Context, Result};

use super::Command;
use crate::amount::parse_tez_amount;

impl Command {
    /// Parse a command from a raw input string.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();
        if input.is_empty() {
            bail!("No command entered. Type 'help' for a list of commands.");
        }

        let (cmd, rest) = match input.split_once(char::is_whitespace) {
            Some((cmd, rest)) => (cmd.to_lowercase(), Some(rest.trim()).filter(|s| !s.is_empty())),
            None => (input.to_lowercase(), None),
        };

        match cmd.as_str() {
            "balance" | "bal" => Ok(Command::Balance),

            "accounts" | "acc" => Ok(Command::Accounts),

            "to" | "recipient" => {
                let recipient = rest.ok_or_else(|| {
                    anyhow::anyhow!("Missing recipient. Usage: to <address|account name>")
                })?;
                Ok(Command::To {
                    recipient: recipient.to_string(),
                })
            }

            "clear" => Ok(Command::Clear),

            "amount" | "amt" => {
                let amount_str = rest
                    .ok_or_else(|| anyhow::anyhow!("Missing amount. Usage: amount <tez|max>"))?;
                if amount_str.eq_ignore_ascii_case("max") {
                    return Ok(Command::Max);
                }
                let amount = parse_tez_amount(amount_str)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid amount '{amount_str}'"))?;
                if amount.is_zero() {
                    bail!("Cannot send 0 XTZ.");
                }
                Ok(Command::Amount { amount })
            }

            "fee" => {
                let fee_str =
                    rest.ok_or_else(|| anyhow::anyhow!("Missing fee. Usage: fee <tez>"))?;
                let fee = parse_tez_amount(fee_str)
                    .map_err(anyhow::Error::msg)
                    .with_context(|| format!("Invalid fee '{fee_str}'"))?;
                Ok(Command::Fee { fee })
            }

            "max" => Ok(Command::Max),

            "recommended" | "rec" => Ok(Command::Recommended),

            "estimate" | "est" => Ok(Command::Estimate),

            "focus" => Ok(Command::Focus),

            "form" | "show" => Ok(Command::Form),

            "send" => {
                if rest.is_some() {
                    bail!("'send' takes no arguments. Fill the form with 'to' and 'amount' first.");
                }
                Ok(Command::Send)
            }

            "pending" | "ops" => match rest.map(|r| r.split_whitespace().collect::<Vec<_>>()) {
                None => Ok(Command::Pending),
                Some(args) => match args.as_slice() {
                    [sub, hash] if sub.eq_ignore_ascii_case("clear") => Ok(Command::ClearPending {
                        hash: hash.to_string(),
                    }),
                    _ => bail!("Usage: pending [clear <operation hash>]"),
                },
            },

            "use" | "switch" => {
                let account = rest
                    .ok_or_else(|| anyhow::anyhow!("Missing account. Usage: use <name|address>"))?;
                Ok(Command::Use {
                    account: account.to_string(),
                })
            }

            "help" | "?" => Ok(Command::Help {
                command: rest.map(|s| s.to_lowercase()),
            }),

            "exit" | "quit" | "q" => Ok(Command::Exit),

            other => bail!("Unknown command: '{other}'. Type 'help' for a list of commands."),
        }
    }
}
