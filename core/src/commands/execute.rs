use anyhow::{Result, bail};
use tracing::warn;

use super::Command;
use super::help::help_text;
use crate::account::AccountDirectory;
use crate::amount::format_balance_json;
use crate::display;
use crate::pending::PendingOperationStore;
use crate::session::{SendSession, SubmitResult};

impl Command {
    /// Execute a command against the session and return the output string.
    /// `use` and `exit` are handled by the caller.
    pub async fn execute(
        &self,
        session: &SendSession,
        accounts: &AccountDirectory,
        pending: &PendingOperationStore,
        json_output: bool,
    ) -> Result<String> {
        match self {
            Command::Balance => {
                let balance = session.balance().await?;
                if json_output {
                    Ok(format_balance_json(session.account(), balance))
                } else {
                    Ok(crate::amount::format_balance(balance))
                }
            }

            Command::Accounts => {
                let mut listed = Vec::with_capacity(accounts.len());
                for account in accounts.all() {
                    let balance = session.balance_of(&account.pkh).await.ok();
                    listed.push((account, balance));
                }
                if json_output {
                    Ok(display::format_accounts_json(session.account(), &listed))
                } else {
                    Ok(display::format_accounts(session.account(), &listed))
                }
            }

            Command::To { recipient } => {
                let address = accounts.resolve(recipient);
                session.set_recipient(&address).await;
                Ok(show_form(session, accounts, json_output))
            }

            Command::Clear => {
                session.clean_recipient();
                Ok(show_form(session, accounts, json_output))
            }

            Command::Amount { amount } => {
                session.set_amount(Some(*amount));
                Ok(show_form(session, accounts, json_output))
            }

            Command::Fee { fee } => {
                let stored = session.set_fee(*fee);
                let form = show_form(session, accounts, json_output);
                if stored != *fee && !json_output {
                    Ok(format!("Fee capped at {stored} XTZ.\n{form}"))
                } else {
                    Ok(form)
                }
            }

            Command::Max => {
                if session.set_max_amount().is_none() {
                    bail!("No fee estimate yet. Set a valid recipient first.");
                }
                Ok(show_form(session, accounts, json_output))
            }

            Command::Recommended => {
                session.set_recommended_fee();
                Ok(show_form(session, accounts, json_output))
            }

            Command::Estimate => {
                if session.refresh_estimate().await.is_none() {
                    bail!("Set a valid recipient first.");
                }
                Ok(show_form(session, accounts, json_output))
            }

            Command::Focus => {
                let revalidated = session.on_focus().await;
                let form = show_form(session, accounts, json_output);
                if !revalidated && !json_output {
                    Ok(format!("Estimate is recent, nothing to revalidate.\n{form}"))
                } else {
                    Ok(form)
                }
            }

            Command::Form => {
                // The form still renders with the last known balance.
                if let Err(e) = session.balance().await {
                    warn!(account = session.account(), error = %e, "could not refresh balance");
                }
                Ok(show_form(session, accounts, json_output))
            }

            Command::Send => match session.submit().await {
                Ok(SubmitResult::Sent(event)) => {
                    if json_output {
                        Ok(display::format_sent_json(&event))
                    } else {
                        Ok(display::format_sent(&event))
                    }
                }
                Ok(SubmitResult::Cancelled) => Ok("Transfer cancelled.".to_string()),
                Ok(SubmitResult::Ignored) => bail!("A transfer is already being submitted."),
                Err(e) if !e.is_validation() => match session.form().alert() {
                    Some(alert) => bail!("{}", display::format_alert(&alert)),
                    None => Err(e.into()),
                },
                Err(e) => Err(e.into()),
            },

            Command::Pending => {
                let network = session.context().network.to_string();
                let entries = pending.list(&network, session.account())?;
                if json_output {
                    Ok(display::format_pending_json(&entries))
                } else {
                    Ok(display::format_pending(&entries))
                }
            }

            Command::ClearPending { hash } => {
                let removed = pending.remove(hash)?;
                if removed == 0 {
                    bail!("No pending operation {hash}.");
                }
                if json_output {
                    Ok(serde_json::json!({ "hash": hash, "removed": removed }).to_string())
                } else {
                    Ok(format!("Forgot pending operation {hash}."))
                }
            }

            Command::Help { command } => Ok(help_text(command.as_deref())),

            Command::Use { .. } | Command::Exit => Ok(String::new()),
        }
    }
}

fn show_form(session: &SendSession, accounts: &AccountDirectory, json_output: bool) -> String {
    let form = session.form();
    if json_output {
        display::format_form_json(&form)
    } else {
        display::format_form(&form, accounts)
    }
}
