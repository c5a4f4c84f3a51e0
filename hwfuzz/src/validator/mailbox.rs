//! Mailbox reference model.
//!
//! Message content is fixed when the message is sent: a send copies the
//! sender's scratchpad at that moment into the receiver's inbox, and later
//! writes to the scratchpad do not affect it. A receive must consume exactly
//! one matching inbox entry. Entries left unread at the end are allowed.

use std::collections::BTreeMap;

use crate::trace::{MailboxEvent, TraceLine};

use super::{Verdict, Violation};

/// Two-word message payload.
pub type Message = (u64, u64);

/// Scratchpads and pending inboxes of every thread, keyed by thread id.
#[derive(Debug, Clone, Default)]
pub struct MailboxRefModel {
    scratchpad: BTreeMap<u32, Message>,
    inbox: BTreeMap<u32, BTreeMap<Message, usize>>,
}

impl MailboxRefModel {
    /// Thread `t` starts with scratchpad `(t, 100 + t)`.
    pub fn new(num_threads: u32) -> Self {
        let scratchpad = (0..num_threads)
            .map(|t| (t, (u64::from(t), 100 + u64::from(t))))
            .collect();
        Self {
            scratchpad,
            inbox: BTreeMap::new(),
        }
    }

    pub fn record_write(&mut self, thread: u32, message: Message) {
        self.scratchpad.insert(thread, message);
    }

    /// Snapshot `src`'s scratchpad into `dst`'s inbox.
    pub fn record_send(&mut self, src: u32, dst: u32) {
        let message = self.scratchpad.get(&src).copied().unwrap_or_default();
        *self
            .inbox
            .entry(dst)
            .or_default()
            .entry(message)
            .or_insert(0) += 1;
    }

    /// Consume one pending copy of `message` for `thread`.
    ///
    /// Returns false if no such message is pending.
    pub fn take_receive(&mut self, thread: u32, message: Message) -> bool {
        let Some(pending) = self.inbox.get_mut(&thread) else {
            return false;
        };
        match pending.get_mut(&message) {
            Some(count) if *count > 1 => {
                *count -= 1;
                true
            }
            Some(_) => {
                pending.remove(&message);
                true
            }
            None => false,
        }
    }

    /// Number of messages still waiting for `thread`.
    #[cfg(test)]
    fn pending(&self, thread: u32) -> usize {
        self.inbox
            .get(&thread)
            .map(|pending| pending.values().sum())
            .unwrap_or(0)
    }
}

/// Replay mailbox events in line order.
pub fn check(events: &[TraceLine<MailboxEvent>], num_threads: u32) -> Verdict {
    let mut model = MailboxRefModel::new(num_threads);
    for line in events {
        match line.event {
            MailboxEvent::Write {
                thread,
                word1,
                word2,
            } => model.record_write(thread, (word1, word2)),
            MailboxEvent::Send { src, dst } => model.record_send(src, dst),
            MailboxEvent::Receive {
                thread,
                word1,
                word2,
            } => {
                if !model.take_receive(thread, (word1, word2)) {
                    return Verdict::Fail(Violation::at(
                        line.number,
                        format!(
                            "bad receive: thread {thread} got ({word1}, {word2}) \
                             which was never sent to it"
                        ),
                    ));
                }
            }
        }
    }
    Verdict::Pass
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::parse_mailbox;

    fn check_text(text: &str) -> Verdict {
        check(&parse_mailbox(text, 4).expect("parse"), 4)
    }

    #[test]
    fn test_receive_sees_send_time_snapshot() {
        let verdict = check_text("W 0 100 200\nS 0 1\nW 0 300 400\nR 1 100 200\n");
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_receive_of_later_write_fails() {
        let verdict = check_text("W 0 100 200\nS 0 1\nW 0 300 400\nR 1 300 400\n");
        assert_eq!(
            verdict.violation().and_then(|v| v.line),
            Some(4),
            "{verdict:?}"
        );
    }

    #[test]
    fn test_initial_scratchpad() {
        assert_eq!(check_text("S 2 3\nR 3 2 102\n"), Verdict::Pass);
    }

    #[test]
    fn test_each_send_consumed_once() {
        let verdict = check_text("S 2 1\nR 1 2 102\nR 1 2 102\n");
        assert_eq!(verdict.violation().and_then(|v| v.line), Some(3));

        let verdict = check_text("S 2 1\nS 2 1\nR 1 2 102\nR 1 2 102\n");
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_receive_before_send_fails() {
        let verdict = check_text("R 1 0 100\nS 0 1\n");
        assert_eq!(verdict.violation().and_then(|v| v.line), Some(1));
    }

    #[test]
    fn test_receive_goes_to_destination_only() {
        let verdict = check_text("S 0 1\nR 2 0 100\n");
        assert!(verdict.is_fail());
    }

    #[test]
    fn test_receive_order_is_free() {
        let verdict = check_text("S 2 1\nS 3 1\nR 1 3 103\nR 1 2 102\n");
        assert_eq!(verdict, Verdict::Pass);
    }

    #[test]
    fn test_unread_messages_allowed() {
        let mut model = MailboxRefModel::new(4);
        model.record_send(0, 1);
        assert_eq!(model.pending(1), 1);
        assert_eq!(check_text("S 0 1\nS 0 2\n"), Verdict::Pass);
    }
}
