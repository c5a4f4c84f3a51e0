//! Trace line parsing.
//!
//! Each line of DUT output is one event, first token the response letter.
//! Lines whose letter the component does not report on (echoed delays,
//! blank lines) are skipped. A known letter with the wrong number of fields,
//! a non-numeric field or an out-of-range thread/queue index is a protocol
//! mismatch between generator and DUT and fails with
//! [`HarnessError::Protocol`].

use std::str::FromStr;

use crate::error::{HarnessError, HarnessResult};

/// An event with its 1-based line number in the trace file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceLine<E> {
    pub number: usize,
    pub event: E,
}

/// Event reported by the mailbox DUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxEvent {
    /// `S <src> <dst>`
    Send { src: u32, dst: u32 },
    /// `W <thread> <word1> <word2>`
    Write { thread: u32, word1: u64, word2: u64 },
    /// `R <thread> <word1> <word2>`
    Receive { thread: u32, word1: u64, word2: u64 },
}

/// Event reported by the array-of-queue DUT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueEvent {
    /// `I <index> <item>`
    Insert { index: u32, item: u64 },
    /// `R <index> <item>`
    Remove { index: u32, item: u64 },
}

/// Parse a mailbox trace.
pub fn parse_mailbox(text: &str, num_threads: u32) -> HarnessResult<Vec<TraceLine<MailboxEvent>>> {
    let mut events = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let fields = Fields::new(index + 1, raw);
        let event = match fields.letter() {
            Some("S") => {
                fields.expect_len(3)?;
                MailboxEvent::Send {
                    src: fields.bounded(1, "thread", num_threads)?,
                    dst: fields.bounded(2, "thread", num_threads)?,
                }
            }
            Some("W") => {
                fields.expect_len(4)?;
                MailboxEvent::Write {
                    thread: fields.bounded(1, "thread", num_threads)?,
                    word1: fields.number(2, "word")?,
                    word2: fields.number(3, "word")?,
                }
            }
            Some("R") => {
                fields.expect_len(4)?;
                MailboxEvent::Receive {
                    thread: fields.bounded(1, "thread", num_threads)?,
                    word1: fields.number(2, "word")?,
                    word2: fields.number(3, "word")?,
                }
            }
            _ => continue,
        };
        events.push(TraceLine {
            number: fields.line,
            event,
        });
    }
    Ok(events)
}

/// Parse an array-of-queue trace.
pub fn parse_queue(text: &str, num_queues: u32) -> HarnessResult<Vec<TraceLine<QueueEvent>>> {
    let mut events = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let fields = Fields::new(index + 1, raw);
        let event = match fields.letter() {
            Some("I") => {
                fields.expect_len(3)?;
                QueueEvent::Insert {
                    index: fields.bounded(1, "queue", num_queues)?,
                    item: fields.number(2, "item")?,
                }
            }
            Some("R") => {
                fields.expect_len(3)?;
                QueueEvent::Remove {
                    index: fields.bounded(1, "queue", num_queues)?,
                    item: fields.number(2, "item")?,
                }
            }
            _ => continue,
        };
        events.push(TraceLine {
            number: fields.line,
            event,
        });
    }
    Ok(events)
}

struct Fields<'a> {
    line: usize,
    tokens: Vec<&'a str>,
}

impl<'a> Fields<'a> {
    fn new(line: usize, raw: &'a str) -> Self {
        Self {
            line,
            tokens: raw.split_whitespace().collect(),
        }
    }

    fn letter(&self) -> Option<&'a str> {
        self.tokens.first().copied()
    }

    fn expect_len(&self, len: usize) -> HarnessResult<()> {
        if self.tokens.len() == len {
            Ok(())
        } else {
            Err(HarnessError::protocol(
                self.line,
                format!(
                    "'{}' event has {} fields, expected {}",
                    self.tokens[0],
                    self.tokens.len(),
                    len
                ),
            ))
        }
    }

    fn number<T: FromStr>(&self, position: usize, what: &str) -> HarnessResult<T> {
        let token = self.tokens[position];
        token.parse().map_err(|_| {
            HarnessError::protocol(self.line, format!("{what} '{token}' is not a number"))
        })
    }

    fn bounded(&self, position: usize, what: &str, limit: u32) -> HarnessResult<u32> {
        let value: u32 = self.number(position, what)?;
        if value < limit {
            Ok(value)
        } else {
            Err(HarnessError::protocol(
                self.line,
                format!("{what} {value} out of range (limit {limit})"),
            ))
        }
    }
}
