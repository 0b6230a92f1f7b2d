/// Command definitions and parsing for the send REPL and one-shot mode.
mod execute;
mod help;
mod parse;

pub use help::help_text;

use crate::account::AccountDirectory;
use crate::amount::format_balance;
use crate::form::SendForm;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Show the sender balance
    Balance,
    /// List own accounts with balances
    Accounts,
    /// Set the recipient: to <address|account name>
    To { recipient: String },
    /// Clear the recipient
    Clear,
    /// Set the amount: amount <tez>
    Amount { amount: crate::amount::Mutez },
    /// Set the additional fee: fee <tez>
    Fee { fee: crate::amount::Mutez },
    /// Fill in the maximal amount
    Max,
    /// Reset the additional fee to the recommended value
    Recommended,
    /// Estimate the base fee for the current recipient
    Estimate,
    /// Revalidate the estimate as if the form regained focus
    Focus,
    /// Show the form
    Form,
    /// Submit the transfer
    Send,
    /// Show pending operations of this account
    Pending,
    /// Forget a pending operation: pending clear <hash>
    ClearPending { hash: String },
    /// Switch to another own account: use <name|address>
    Use { account: String },
    /// Print help
    Help { command: Option<String> },
    /// Exit
    Exit,
}

impl Command {
    /// Returns a confirmation prompt if this command should ask before executing.
    /// `None` for `send` when the form does not validate; execution reports why.
    pub fn confirmation_prompt(&self, form: &SendForm, accounts: &AccountDirectory) -> Option<String> {
        match self {
            Command::Send => {
                let request = form.validate().ok()?;
                let base_fee = form.estimate().map(|e| e.base_fee).unwrap_or_default();
                let to = match accounts.find(&request.recipient) {
                    Some(acc) => format!("{} ({})", acc.name, request.recipient),
                    None => request.recipient.clone(),
                };
                Some(format!(
                    "Send {} to {}? Fee: {} base + {} additional",
                    format_balance(request.amount),
                    to,
                    base_fee,
                    request.additional_fee,
                ))
            }
            _ => None,
        }
    }
}
