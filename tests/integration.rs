use std::{
    io::{self, Read},
    str::from_utf8,
};

use bank_ledger::{bin_utils::Service, config::LedgerConfig};

const TEST_FILE: &str = include_str!("requests.txt");

fn run(input: &str, config: LedgerConfig) -> (String, String) {
    let mut output = Vec::new();
    let mut accounts = Vec::new();
    let service = Service {
        input: input.as_bytes(),
        output: &mut output,
        accounts_output: Some(&mut accounts),
        config,
    };
    service.run().unwrap();
    (
        from_utf8(&output).unwrap().to_owned(),
        from_utf8(&accounts).unwrap().to_owned(),
    )
}

#[test]
fn process_request_script() {
    // a single worker applies requests in submission order
    let (output, accounts) = run(
        TEST_FILE,
        LedgerConfig {
            capacity: 2,
            workers: 1,
        },
    );
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(
        lines,
        vec![
            "correlation_id,status,kind,account,balance,message",
            "2,ok,,0,,account created",
            "3,ok,,1,,account created",
            "4,ok,,0,500,",
            "5,error,validation,,,Pin must be exactly 4 digits",
            "6,ok,,0,300,transferred to account 1 (balance 200)",
            "7,error,validation,,,Cannot transfer from account 0 to itself",
            "8,error,capacity_exceeded,,,Account table is full (2 accounts)",
            "9,ok,,0,270,",
            "10,error,auth,,,Pin does not match account 0",
            "11,ok,,1,200,",
            "12,error,validation,,,Unknown command `frobnicate`",
            "13,ok,,1,,account closed",
            "14,error,inactive_account,,,Account 1 is closed",
            "15,ok,,0,,pin changed",
            "16,ok,,0,270,",
        ]
    );
    assert_eq!(accounts, "id,balance,active\n0,270,true\n1,0,false\n");
}

#[test]
fn undecodable_line_is_answered_and_the_rest_still_runs() {
    let mut output = Vec::new();
    let service = Service {
        input: &b"create 1111\n0 deposit 100 1111\n0 view \xff\xfe\n0 view 1111\n"[..],
        output: &mut output,
        accounts_output: None,
        config: LedgerConfig {
            capacity: 2,
            workers: 1,
        },
    };
    service.run().unwrap();
    let lines: Vec<&str> = from_utf8(&output).unwrap().lines().collect();
    assert_eq!(
        lines,
        vec![
            "correlation_id,status,kind,account,balance,message",
            "1,ok,,0,,account created",
            "2,ok,,0,100,",
            "3,error,validation,,,Line is not valid UTF-8",
            "4,ok,,0,100,",
        ]
    );
}

/// Hands out its content once, then fails every read.
struct BrokenReader {
    content: Option<&'static [u8]>,
}

impl Read for BrokenReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.content.take() {
            Some(content) => {
                buf[..content.len()].copy_from_slice(content);
                Ok(content.len())
            }
            None => Err(io::Error::other("device unplugged")),
        }
    }
}

#[test]
fn read_failure_still_reports_submitted_requests() {
    let mut output = Vec::new();
    let mut accounts = Vec::new();
    let service = Service {
        input: BrokenReader {
            content: Some(&b"create 1111\n0 deposit 40 1111\n"[..]),
        },
        output: &mut output,
        accounts_output: Some(&mut accounts),
        config: LedgerConfig {
            capacity: 2,
            workers: 1,
        },
    };
    let err = service.run().unwrap_err();
    assert_eq!(err.to_string(), "Failed to read line 3");
    assert_eq!(
        from_utf8(&output).unwrap(),
        "correlation_id,status,kind,account,balance,message\n\
         1,ok,,0,,account created\n\
         2,ok,,0,40,\n"
    );
    assert_eq!(from_utf8(&accounts).unwrap(), "id,balance,active\n0,40,true\n");
}

#[test]
fn parallel_workers_answer_every_line() {
    let mut script = String::from("create 1111\ncreate 2222\n");
    for i in 0..200 {
        if i % 2 == 0 {
            script.push_str("0 transfer 1 1 1111\n");
        } else {
            script.push_str("1 deposit 3 2222\n");
        }
    }
    // transfers race with the initial creates and deposits, so only count rows
    let (output, accounts) = run(
        &script,
        LedgerConfig {
            capacity: 2,
            workers: 8,
        },
    );
    assert_eq!(output.lines().count(), 1 + 202);
    assert!(accounts.starts_with("id,balance,active\n"));
}

#[test]
fn invalid_config_is_rejected() {
    let mut output = Vec::new();
    let service = Service {
        input: "create 1111\n".as_bytes(),
        output: &mut output,
        accounts_output: None,
        config: LedgerConfig {
            capacity: 4,
            workers: 0,
        },
    };
    let err = service.run().unwrap_err();
    assert_eq!(err.to_string(), "Worker pool needs at least one worker");
}
