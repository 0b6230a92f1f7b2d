#[must_use]
pub fn help_text(command: Option<&str>) -> String {
    match command {
        Some("balance") | Some("bal") => {
            "balance\n  Refresh and show the balance of the current account.\n  Alias: bal".to_string()
        }
        Some("accounts") | Some("acc") => {
            "accounts\n  List your accounts with their balances.\n  The current account is marked with '*'.\n  Alias: acc".to_string()
        }
        Some("to") | Some("recipient") => {
            "to <address|account name>\n  Set the recipient and estimate the base fee.\n  An account name is replaced by its address.\n  Examples: to tz1VSUr8wwNhLAzempoch5d6hLRiTh8Cjcjb\n           to Bob\n  Alias: recipient".to_string()
        }
        Some("clear") => "clear\n  Clear the recipient and the fee estimate.".to_string(),
        Some("amount") | Some("amt") => {
            "amount <tez|max>\n  Set the amount to send, in XTZ (up to 6 decimals).\n  'amount max' fills in the maximal amount.\n  Example: amount 1.5\n  Alias: amt".to_string()
        }
        Some("fee") => {
            "fee <tez>\n  Set the additional fee paid on top of the base fee.\n  Values above the maximal additional fee are capped.\n  Example: fee 0.0001".to_string()
        }
        Some("max") => {
            "max\n  Fill in the maximal amount: balance minus fees.\n  Needs a fee estimate (set a recipient first).".to_string()
        }
        Some("recommended") | Some("rec") => {
            "recommended\n  Reset the additional fee to the recommended value.\n  Alias: rec".to_string()
        }
        Some("estimate") | Some("est") => {
            "estimate\n  Estimate the base fee for the current recipient.\n  Results are shared for a short while; see 'focus' to force a refresh.\n  Alias: est".to_string()
        }
        Some("focus") => {
            "focus\n  Revalidate the estimate, as when the form regains focus.\n  Skipped when the last revalidation was too recent.".to_string()
        }
        Some("form") | Some("show") => {
            "form\n  Show the send form: balance, recipient, amount, fees, errors.\n  Alias: show".to_string()
        }
        Some("send") => {
            "send\n  Submit the transfer described by the form.\n  Asks for confirmation first. Successful operations are\n  recorded as pending until the chain confirms them.".to_string()
        }
        Some("pending") | Some("ops") => {
            "pending [clear <hash>]\n  Show pending operations of the current account.\n  'pending clear <hash>' forgets an operation once it is confirmed.\n  Alias: ops".to_string()
        }
        Some("use") | Some("switch") => {
            "use <name|address>\n  Switch to another of your accounts. The form starts empty.\n  Example: use Bob\n  Alias: switch".to_string()
        }
        Some("exit") | Some("quit") | Some("q") => {
            "exit\n  Exit.\n  Aliases: quit, q".to_string()
        }
        Some(other) => format!("Unknown command: '{other}'. Type 'help' for a list."),
        None => {
            "Available commands:\n\
             \n\
             \x20 balance          Show account balance\n\
             \x20 accounts         List your accounts\n\
             \x20 to               Set the recipient\n\
             \x20 clear            Clear the recipient\n\
             \x20 amount           Set the amount\n\
             \x20 fee              Set the additional fee\n\
             \x20 max              Fill in the maximal amount\n\
             \x20 recommended      Use the recommended fee\n\
             \x20 estimate         Estimate the base fee\n\
             \x20 focus            Revalidate the estimate\n\
             \x20 form             Show the send form\n\
             \x20 send             Submit the transfer\n\
             \x20 pending          Show pending operations\n\
             \x20 use              Switch account\n\
             \x20 help [cmd]       Show help for a command\n\
             \x20 exit             Exit\n\
             \n\
             Type 'help <command>' for detailed help on a specific command."
                .to_string()
        }
    }
}
