use std::io::Write;

use crate::{
    account::AccountId,
    error::ErrorKind,
    request::{CorrelationId, Outcome, Response},
    store::AccountSnapshot,
};
use csv::Writer;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ResponseRecord {
    pub correlation_id: CorrelationId,
    pub status: &'static str,
    pub kind: Option<ErrorKind>,
    pub account: Option<AccountId>,
    pub balance: Option<i64>,
    pub message: String,
}

impl ResponseRecord {
    pub fn new(correlation_id: CorrelationId, response: Response) -> Self {
        let (account, balance, message) = match response {
            Response::Err { kind, message } => {
                return Self {
                    correlation_id,
                    status: "error",
                    kind: Some(kind),
                    account: None,
                    balance: None,
                    message,
                };
            }
            Response::Ok(Outcome::Created { id }) => (id, None, "account created".to_string()),
            Response::Ok(Outcome::Balance { id, balance }) => (id, Some(balance), String::new()),
            Response::Ok(Outcome::Transferred {
                from,
                to,
                from_balance,
                to_balance,
            }) => (
                from,
                Some(from_balance),
                format!("transferred to account {to} (balance {to_balance})"),
            ),
            Response::Ok(Outcome::Deleted { id }) => (id, None, "account closed".to_string()),
            Response::Ok(Outcome::PinChanged { id }) => (id, None, "pin changed".to_string()),
        };
        Self {
            correlation_id,
            status: "ok",
            kind: None,
            account: Some(account),
            balance,
            message,
        }
    }
}

fn write_records<W, T>(output: &mut W, records: impl Iterator<Item = T>) -> anyhow::Result<()>
where
    W: Write + ?Sized,
    T: Serialize,
{
    let mut writer = Writer::from_writer(output);
    for record in records {
        if let Err(err) = writer.serialize(record) {
            anyhow::bail!("Failed to write to CSV: {err}")
        }
    }
    // Ensure all data is flushed to the output
    if let Err(err) = writer.flush() {
        anyhow::bail!("Failed to flush CSV writer: {err}")
    }
    Ok(())
}

pub fn print_responses<W>(
    output: &mut W,
    responses: impl Iterator<Item = (CorrelationId, Response)>,
) -> anyhow::Result<()>
where
    W: Write + ?Sized,
{
    write_records(
        output,
        responses.map(|(correlation_id, response)| ResponseRecord::new(correlation_id, response)),
    )
}

pub fn print_accounts<W>(
    output: &mut W,
    accounts: impl Iterator<Item = AccountSnapshot>,
) -> anyhow::Result<()>
where
    W: Write + ?Sized,
{
    write_records(output, accounts)
}
