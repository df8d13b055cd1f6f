use std::io::{self, BufRead, BufReader, Read, Split};

use thiserror::Error;

use crate::{
    account::{AccountId, Pin},
    request::Operation,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Submit(Operation),
    /// Stop reading input. Requests already submitted still complete.
    Exit,
}

#[derive(Debug, Error)]
pub enum RequestParseError {
    #[error("Unknown command `{0}`")]
    UnknownCommand(String),
    #[error("`{verb}` expects {expected} argument(s), got {got}")]
    Arity {
        verb: String,
        expected: usize,
        got: usize,
    },
    #[error("Invalid {field} `{value}`")]
    InvalidNumber { field: &'static str, value: String },
    #[error("Pin must be exactly 4 digits")]
    MalformedPin,
    #[error("Line is not valid UTF-8")]
    InvalidEncoding,
    #[error("Failed to read input")]
    Io(#[from] io::Error),
}

fn arity(verb: &str, args: &[&str], expected: usize) -> Result<(), RequestParseError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(RequestParseError::Arity {
            verb: verb.to_string(),
            expected,
            got: args.len(),
        })
    }
}

fn number<T: std::str::FromStr>(field: &'static str, raw: &str) -> Result<T, RequestParseError> {
    raw.parse().map_err(|_| RequestParseError::InvalidNumber {
        field,
        value: raw.to_string(),
    })
}

fn pin(raw: &str) -> Result<String, RequestParseError> {
    if Pin::is_well_formed(raw) {
        Ok(raw.to_string())
    } else {
        Err(RequestParseError::MalformedPin)
    }
}

/// Parses one line of the legacy text protocol:
///
/// ```text
/// create <pin>
/// <id> deposit <amount> <pin>
/// <id> withdraw <amount> <pin>
/// <id> view <pin>
/// <id> transfer <amount> <to> <pin>
/// <id> delete <pin>
/// <id> changepin <pin> <new_pin>
/// exit
/// ```
///
/// Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> Result<Option<Command>, RequestParseError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let (head, rest) = (tokens[0], &tokens[1..]);

    match head {
        "exit" => {
            arity(head, rest, 0)?;
            return Ok(Some(Command::Exit));
        }
        "create" => {
            arity(head, rest, 1)?;
            return Ok(Some(Command::Submit(Operation::Create { pin: pin(rest[0])? })));
        }
        _ => {}
    }

    let id: AccountId = match head.parse() {
        Ok(id) => id,
        Err(_) if head.bytes().all(|b| b.is_ascii_digit() || b == b'-') => {
            return Err(RequestParseError::InvalidNumber {
                field: "account id",
                value: head.to_string(),
            });
        }
        Err(_) => return Err(RequestParseError::UnknownCommand(head.to_string())),
    };
    let Some((&verb, args)) = rest.split_first() else {
        return Err(RequestParseError::Arity {
            verb: head.to_string(),
            expected: 1,
            got: 0,
        });
    };

    let operation = match verb {
        "deposit" => {
            arity(verb, args, 2)?;
            Operation::Deposit {
                id,
                amount: number("amount", args[0])?,
                pin: pin(args[1])?,
            }
        }
        "withdraw" => {
            arity(verb, args, 2)?;
            Operation::Withdraw {
                id,
                amount: number("amount", args[0])?,
                pin: pin(args[1])?,
            }
        }
        "view" => {
            arity(verb, args, 1)?;
            Operation::View {
                id,
                pin: pin(args[0])?,
            }
        }
        "transfer" => {
            arity(verb, args, 3)?;
            Operation::Transfer {
                from: id,
                amount: number("amount", args[0])?,
                to: number("target account id", args[1])?,
                pin: pin(args[2])?,
            }
        }
        "delete" => {
            arity(verb, args, 1)?;
            Operation::Delete {
                id,
                pin: pin(args[0])?,
            }
        }
        "changepin" => {
            arity(verb, args, 2)?;
            Operation::ChangePin {
                id,
                pin: pin(args[0])?,
                new_pin: pin(args[1])?,
            }
        }
        other => return Err(RequestParseError::UnknownCommand(other.to_string())),
    };
    Ok(Some(Command::Submit(operation)))
}

/// Reads requests line by line. Line numbers start at 1 and are used as
/// correlation ids. Lines are split on raw bytes, so one undecodable line
/// does not end the stream.
pub struct LineRequestParser<R> {
    lines: Split<BufReader<R>>,
    line: u64,
}

impl<R> LineRequestParser<R>
where
    R: Read,
{
    pub fn new(source: R) -> Self {
        Self {
            lines: BufReader::new(source).split(b'\n'),
            line: 0,
        }
    }
}

impl<R> Iterator for LineRequestParser<R>
where
    R: Read,
{
    type Item = (u64, Result<Command, RequestParseError>);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let raw = self.lines.next()?;
            self.line += 1;
            let parsed = match raw {
                Ok(mut raw) => {
                    if raw.last() == Some(&b'\r') {
                        raw.pop();
                    }
                    match String::from_utf8(raw) {
                        Ok(raw) => parse_line(&raw).transpose(),
                        Err(_) => Some(Err(RequestParseError::InvalidEncoding)),
                    }
                }
                Err(err) => Some(Err(err.into())),
            };
            if let Some(parsed) = parsed {
                return Some((self.line, parsed));
            }
        }
    }
}
