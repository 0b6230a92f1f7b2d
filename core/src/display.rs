/// Output formatting for the REPL: form state, accounts and pending operations.
use crate::account::{Account, AccountDirectory, AccountType};
use crate::address::short_address;
use crate::amount::{format_balance, mutez_to_tez, Mutez};
use crate::form::{AlertKind, ErrorAlert, EstimationState, SendForm, SubmissionState};
use crate::operation::{PendingOperationEntry, TransferEvent};

/// Render the send form as text.
#[must_use]
pub fn format_form(form: &SendForm, accounts: &AccountDirectory) -> String {
    let mut lines = Vec::new();
    let balance = form
        .balance()
        .map(format_balance)
        .unwrap_or_else(|| "-".to_string());
    lines.push(format!("  Balance:     {balance}"));

    let recipient = if form.recipient().is_empty() {
        "(empty)".to_string()
    } else if let Some(acc) = form.filled_account(accounts) {
        format!("{} ({})", form.recipient(), acc.name)
    } else if form.recipient_filled() {
        form.recipient().to_string()
    } else {
        format!("{} (Invalid address)", form.recipient())
    };
    lines.push(format!("  Recipient:   {recipient}"));

    if form.estimating_displayed() {
        lines.push("  Estimating fee...".to_string());
    } else if form.rest_displayed() {
        if let Some(alert) = form.alert() {
            lines.push(String::new());
            lines.push(format_alert(&alert));
            lines.push(String::new());
        }

        let amount = match form.amount() {
            Some(a) => format_balance(a),
            None => "-".to_string(),
        };
        match form.amount_error() {
            Some(err) => lines.push(format!("  Amount:      {amount}  [{err}]")),
            None => lines.push(format!("  Amount:      {amount}")),
        }
        if let Some(bounds) = form.bounds() {
            lines.push(format!("  Max amount:  {}", format_balance(bounds.max_amount)));
        }
        if let EstimationState::Ready(est) = form.estimation() {
            lines.push(format!("  Base fee:    {}", format_balance(est.base_fee)));
        }
        lines.push(format!(
            "  Add. fee:    {}  (recommended {})",
            format_balance(form.fee()),
            form.recommended_fee(),
        ));
    } else {
        let others = form.other_accounts(accounts);
        if !others.is_empty() && !form.recipient_filled() {
            lines.push(String::new());
            lines.push("  Send to My Accounts:".to_string());
            for acc in others {
                lines.push(format!("    {}", format_account_line(acc, None)));
            }
        }
    }

    match form.submission() {
        SubmissionState::Submitting => lines.push("  Submitting...".to_string()),
        SubmissionState::Succeeded(op) => lines.push(format!("  Last operation: {}", op.hash)),
        SubmissionState::Failed(_) if !form.rest_displayed() => {
            if let Some(alert) = form.alert() {
                lines.push(format_alert(&alert));
            }
        }
        _ => {}
    }

    lines.join("\n")
}

/// Render an error alert: title, then one indented line per description line.
#[must_use]
pub fn format_alert(alert: &ErrorAlert) -> String {
    let tag = match alert.kind {
        AlertKind::Warning => "warning",
        AlertKind::Error => "error",
    };
    let mut lines = vec![format!("  [{tag}] {}", alert.title)];
    for line in &alert.description {
        lines.push(format!("    {line}"));
    }
    if let Some(detail) = &alert.detail {
        lines.push(format!("    ({detail})"));
    }
    lines.join("\n")
}

#[must_use]
pub fn format_form_json(form: &SendForm) -> String {
    let estimation = match form.estimation() {
        EstimationState::Idle => serde_json::json!({ "state": "idle" }),
        EstimationState::Loading => serde_json::json!({ "state": "loading" }),
        EstimationState::Ready(est) => serde_json::json!({
            "state": "ready",
            "base_fee_mutez": est.base_fee.as_u64(),
            "revealed": est.revealed,
        }),
        EstimationState::Failed(err) => serde_json::json!({
            "state": "failed",
            "error": err.to_string(),
        }),
    };
    let submission = match form.submission() {
        SubmissionState::Idle => serde_json::json!({ "state": "idle" }),
        SubmissionState::Submitting => serde_json::json!({ "state": "submitting" }),
        SubmissionState::Succeeded(op) => serde_json::json!({
            "state": "succeeded",
            "hash": op.hash,
        }),
        SubmissionState::Failed(err) => serde_json::json!({
            "state": "failed",
            "error": err.to_string(),
        }),
    };
    let bounds = form.bounds().map(|b| {
        serde_json::json!({
            "max_amount_mutez": b.max_amount.as_u64(),
            "max_additional_fee_mutez": b.max_additional_fee.as_u64(),
        })
    });
    let alert = form.alert().map(|a| {
        serde_json::json!({
            "title": a.title,
            "description": a.description,
            "detail": a.detail,
        })
    });

    serde_json::json!({
        "account": form.account(),
        "balance_mutez": form.balance().map(Mutez::as_u64),
        "recipient": form.recipient(),
        "recipient_valid": form.recipient_filled(),
        "amount_mutez": form.amount().map(Mutez::as_u64),
        "amount_error": form.amount_error(),
        "additional_fee_mutez": form.fee().as_u64(),
        "estimation": estimation,
        "submission": submission,
        "bounds": bounds,
        "alert": alert,
    })
    .to_string()
}

fn format_account_line(acc: &Account, balance: Option<Mutez>) -> String {
    let mut line = format!("{:<12} {}", acc.name, short_address(&acc.pkh));
    if let Some(bal) = balance {
        line.push_str(&format!("  {}", format_balance(bal)));
    }
    if acc.kind == AccountType::Imported {
        line.push_str("  [imported]");
    }
    line
}

/// List accounts with their balances, marking the current one.
#[must_use]
pub fn format_accounts(current: &str, accounts: &[(&Account, Option<Mutez>)]) -> String {
    if accounts.is_empty() {
        return "No accounts configured.".to_string();
    }
    accounts
        .iter()
        .map(|(acc, bal)| {
            let marker = if acc.pkh == current { "*" } else { " " };
            format!("{marker} {}", format_account_line(acc, *bal))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn format_accounts_json(current: &str, accounts: &[(&Account, Option<Mutez>)]) -> String {
    let list: Vec<serde_json::Value> = accounts
        .iter()
        .map(|(acc, bal)| {
            serde_json::json!({
                "name": acc.name,
                "pkh": acc.pkh,
                "type": acc.kind.to_string(),
                "balance_mutez": bal.map(Mutez::as_u64),
                "current": acc.pkh == current,
            })
        })
        .collect();
    serde_json::json!({ "accounts": list }).to_string()
}

#[must_use]
pub fn format_pending(entries: &[PendingOperationEntry]) -> String {
    if entries.is_empty() {
        return "No pending operations.".to_string();
    }
    entries
        .iter()
        .map(|e| {
            let amount = e
                .amount
                .map(mutez_to_tez)
                .unwrap_or_else(|| "-".to_string());
            let dest = e
                .destination
                .as_deref()
                .map(short_address)
                .unwrap_or_else(|| "-".to_string());
            format!("{:<12} {amount:>16}  {dest:<16} {}", e.kind.to_string(), short_address(&e.hash))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[must_use]
pub fn format_pending_json(entries: &[PendingOperationEntry]) -> String {
    serde_json::json!({ "pending": entries }).to_string()
}

/// Summary printed after a successful send.
#[must_use]
pub fn format_sent(event: &TransferEvent) -> String {
    let mut lines = vec!["Transaction sent!".to_string()];
    if let Some(first) = event.entries().first() {
        lines.push(format!("  Hash:   {}", first.hash));
    }
    for e in event.entries() {
        if let (Some(amount), Some(dest)) = (e.amount, e.destination.as_deref()) {
            lines.push(format!("  Amount: {} -> {}", format_balance(amount), dest));
        } else {
            lines.push(format!("  {}", e.kind));
        }
    }
    lines.join("\n")
}

#[must_use]
pub fn format_sent_json(event: &TransferEvent) -> String {
    match event {
        TransferEvent::Succeeded {
            network,
            account,
            entries,
        } => serde_json::json!({
            "status": "sent",
            "network": network,
            "account": account,
            "hash": entries.first().map(|e| e.hash.as_str()),
            "pending": entries,
        })
        .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Base58CheckValidator;
    use crate::chain::SandboxChain;
    use crate::config::SendConfig;
    use crate::error::SendError;
    use crate::estimate::FeeEstimate;
    use crate::operation::OperationKind;
    use std::sync::Arc;

    fn directory() -> AccountDirectory {
        AccountDirectory::new(vec![
            Account::new(SandboxChain::derive_address("alice"), "Alice", AccountType::Generated),
            Account::new(SandboxChain::derive_address("bob"), "Bob", AccountType::Imported),
        ])
        .unwrap()
    }

    fn form() -> SendForm {
        SendForm::new(
            SandboxChain::derive_address("alice"),
            "ctx",
            &SendConfig::default(),
            Arc::new(Base58CheckValidator),
        )
    }

    #[test]
    fn empty_form_lists_own_accounts() {
        let text = format_form(&form(), &directory());
        assert!(text.contains("(empty)"));
        assert!(text.contains("Send to My Accounts"));
        assert!(text.contains("Bob"));
        assert!(text.contains("[imported]"));
        assert!(!text.contains("Alice "));
    }

    #[test]
    fn ready_form_shows_fees() {
        let mut f = form();
        f.set_recipient(&SandboxChain::derive_address("bob"));
        let ticket = f.begin_estimation().unwrap();
        f.finish_estimation(
            &ticket,
            Ok(FeeEstimate {
                base_fee: Mutez(1_420),
                balance: Mutez(10_000_000),
                revealed: true,
            }),
        );
        f.set_amount(Some(Mutez(20_000_000)));

        let text = format_form(&f, &directory());
        assert!(text.contains("(Bob)"));
        assert!(text.contains("Base fee:    0.00142 XTZ"));
        assert!(text.contains("Maximal: 9.99848"));
        assert!(text.contains("recommended 0.0001"));
    }

    #[test]
    fn failed_estimate_shows_alert() {
        let mut f = form();
        f.set_recipient(&SandboxChain::derive_address("bob"));
        let ticket = f.begin_estimation().unwrap();
        f.finish_estimation(&ticket, Err(SendError::NotEnoughFunds));

        let text = format_form(&f, &directory());
        assert!(text.contains("[warning] Not enough funds"));
    }

    #[test]
    fn form_json_has_states() {
        let json = format_form_json(&form());
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["estimation"]["state"], "idle");
        assert_eq!(v["additional_fee_mutez"], 100);
        assert_eq!(v["recipient_valid"], false);
    }

    #[test]
    fn accounts_mark_current() {
        let dir = directory();
        let alice = SandboxChain::derive_address("alice");
        let rows: Vec<_> = dir.all().iter().map(|a| (a, Some(Mutez(1_000_000)))).collect();
        let text = format_accounts(&alice, &rows);
        let first = text.lines().next().unwrap();
        assert!(first.starts_with("* Alice"));
        assert!(first.contains("1 XTZ"));

        let v: serde_json::Value = serde_json::from_str(&format_accounts_json(&alice, &rows)).unwrap();
        assert_eq!(v["accounts"][0]["current"], true);
        assert_eq!(v["accounts"][1]["type"], "imported");
    }

    #[test]
    fn pending_list() {
        assert_eq!(format_pending(&[]), "No pending operations.");
        let entries = vec![PendingOperationEntry {
            hash: "ooSomeLongOperationHash".into(),
            kind: OperationKind::Transaction,
            amount: Some(Mutez(2_500_000)),
            destination: Some(SandboxChain::derive_address("bob")),
            added_at: 0,
        }];
        let text = format_pending(&entries);
        assert!(text.contains("transaction"));
        assert!(text.contains("2.500000"));

        let v: serde_json::Value = serde_json::from_str(&format_pending_json(&entries)).unwrap();
        assert_eq!(v["pending"][0]["kind"], "transaction");
        assert_eq!(v["pending"][0]["amount"], 2_500_000);
    }

    #[test]
    fn sent_summary() {
        let event = TransferEvent::Succeeded {
            network: "sandbox".into(),
            account: "tz1me".into(),
            entries: vec![PendingOperationEntry {
                hash: "ooHash".into(),
                kind: OperationKind::Transaction,
                amount: Some(Mutez(1)),
                destination: Some("tz1dest".into()),
                added_at: 0,
            }],
        };
        let text = format_sent(&event);
        assert!(text.contains("ooHash"));
        assert!(text.contains("0.000001 XTZ -> tz1dest"));

        let v: serde_json::Value = serde_json::from_str(&format_sent_json(&event)).unwrap();
        assert_eq!(v["hash"], "ooHash");
    }
}
