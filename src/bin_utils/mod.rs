//! Text transport around the ledger: reads legacy protocol lines, feeds the
//! dispatcher, and writes one CSV row per request. Kept in the library so
//! integration tests can drive it.

use std::{
    io::{Read, Write},
    sync::{Arc, mpsc},
};

use crate::{
    config::LedgerConfig,
    dispatcher::Dispatcher,
    error::ErrorKind,
    processor::in_memory_ledger::InMemoryLedger,
    request::{CorrelationId, Request, Response},
};
use anyhow::{Context, Result};
use csv_printer::{print_accounts, print_responses};
use line_parser::{Command, LineRequestParser, RequestParseError};
use tracing::info;
pub mod csv_printer;
pub mod line_parser;

pub struct Service<'w, R, W: 'w> {
    pub input: R,
    pub output: &'w mut W,
    /// Receives the final account table, if set.
    pub accounts_output: Option<&'w mut dyn Write>,
    pub config: LedgerConfig,
}

impl<'w, R, W> Service<'w, R, W>
where
    R: Read,
    W: Write + 'w,
{
    pub fn run(self) -> Result<()> {
        let config = self.config.validate()?;
        let ledger = Arc::new(InMemoryLedger::with_capacity(config.capacity));
        let (responses_tx, responses_rx) = mpsc::channel::<(CorrelationId, Response)>();
        let dispatcher = Dispatcher::start(ledger.clone(), Arc::new(responses_tx), config.workers)
            .context("Failed to start worker pool")?;

        // lines rejected by the parser never reach the ledger
        let mut responses = Vec::new();
        let mut read_error = None;
        for (line, parsed) in LineRequestParser::new(self.input) {
            match parsed {
                Ok(Command::Submit(operation)) => dispatcher.submit(Request {
                    correlation_id: line,
                    operation,
                }),
                Ok(Command::Exit) => {
                    info!(line, "exit requested, ignoring remaining input");
                    break;
                }
                Err(RequestParseError::Io(err)) => {
                    read_error = Some((line, err));
                    break;
                }
                Err(err) => responses.push((
                    line,
                    Response::Err {
                        kind: ErrorKind::Validation,
                        message: err.to_string(),
                    },
                )),
            }
        }
        dispatcher.close();

        responses.extend(responses_rx.try_iter());
        // completion order across workers is arbitrary
        responses.sort_by_key(|(correlation_id, _)| *correlation_id);
        print_responses(self.output, responses.into_iter())?;

        if let Some(accounts_output) = self.accounts_output {
            print_accounts(accounts_output, ledger.snapshot().into_iter())?;
        }
        // submitted requests were answered above, the read failure is still fatal
        match read_error {
            Some((line, err)) => Err(err).with_context(|| format!("Failed to read line {line}")),
            None => Ok(()),
        }
    }
}
