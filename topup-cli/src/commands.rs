//! Terminal commands standing in for the screen's widgets.

use serde_json::Value;
use thiserror::Error;
use topup_core::events::{PaymentSubmission, SessionEvent};
use url::Url;

pub const HELP: &str = "\
commands:
  amount <text>              type into the amount field (empty clears it)
  switch                     swap the typed side between fiat and APPC
  method <id>                select a payment method
  pay [payload json]         submit the top-up
  redirect <uid> [json]      finish a redirect or 3DS challenge
  help                       show this message
  quit                       tear down the session and exit";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),

    #[error("missing {0}")]
    MissingArgument(&'static str),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug)]
pub enum Command {
    Event(SessionEvent),
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse_command(line: &str, return_url: &Url) -> Result<Option<Command>, CommandError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Ok(None);
    }
    let (name, rest) = match line.trim_start().split_once(' ') {
        Some((name, rest)) => (name, rest),
        None => (line.trim(), ""),
    };

    let command = match name {
        "amount" => Command::Event(SessionEvent::AmountChanged(rest.to_string())),
        "switch" => Command::Event(SessionEvent::ChangeCurrencyClicked),
        "method" => {
            let id = rest.trim();
            if id.is_empty() {
                return Err(CommandError::MissingArgument("payment method id"));
            }
            Command::Event(SessionEvent::PaymentMethodSelected(id.into()))
        }
        "pay" => Command::Event(SessionEvent::NextClicked(PaymentSubmission {
            payment: json_or_empty(rest)?,
            return_url: return_url.to_string(),
        })),
        "redirect" => {
            let rest = rest.trim();
            let (uid, details) = rest.split_once(' ').unwrap_or((rest, ""));
            if uid.is_empty() {
                return Err(CommandError::MissingArgument("transaction uid"));
            }
            Command::Event(SessionEvent::RedirectReturned {
                uid: uid.to_string(),
                details: json_or_empty(details)?,
                payment_data: None,
            })
        }
        "help" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn json_or_empty(raw: &str) -> Result<Value, CommandError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Value::Object(Default::default()));
    }
    Ok(serde_json::from_str(raw)?)
}
