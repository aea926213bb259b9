//! Incremental parser for the autofill action stream.
//!
//! The backend answers with free text interleaved with records of the form
//!
//! ```text
//! <action> type( {"id": "email"}, "jane@example.com" ) </action>
//! ```
//!
//! Chunks arrive in arbitrary slices, so the parser is an explicit state
//! machine that resumes exactly where the previous chunk stopped. Completed
//! records and text that can no longer start a record are drained from the
//! buffer, which keeps the buffer no larger than one pending record.

use tracing::{debug, warn};

use crate::types::{Action, Selector};

const OPEN_TAG: &str = "<action>";
const TYPE_CALL: &str = "type(";
const CLOSE_TAG: &str = "</action>";

/// Longest record the parser will hold on to before giving up on it
pub const MAX_RECORD_LEN: usize = 64 * 1024;

/// Position inside the action record grammar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    /// Scanning free text for `<action>`
    AwaitingTag,
    /// After `<action>`, expecting `type(`
    AwaitingType,
    /// After `type(`, expecting `{`
    AwaitingSelector,
    /// Inside the selector object, up to the first `}`
    InSelector,
    /// Expecting the `,` between selector and value
    AwaitingComma,
    /// Expecting the opening `"` of the value
    AwaitingValue,
    /// Inside the quoted value; `escaped` is set right after a backslash
    InValue { escaped: bool },
    /// Expecting `)`
    AwaitingClose,
    /// Expecting `</action>`
    AwaitingEndTag,
}

/// Counters reported when a stream ends
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct StreamSummary {
    /// Actions handed to the caller
    pub emitted: usize,
    /// Complete records dropped because of an unparseable selector
    pub malformed: usize,
    /// Bytes still buffered when the stream ended
    pub discarded_bytes: usize,
}

enum Step {
    Continue,
    NeedMore,
    Complete,
    Mismatch,
}

/// Stateful parser fed with successive chunks of one response body
#[derive(Debug)]
pub struct ActionStreamParser {
    /// Undecoded tail of a UTF-8 sequence split across chunks
    pending: Vec<u8>,
    /// Unconsumed text; starts with `<action>` whenever a record is open
    buffer: String,
    /// Byte offset in `buffer` where the machine resumes
    cursor: usize,
    state: ParseState,
    selector_start: usize,
    selector_end: usize,
    value: String,
    summary: StreamSummary,
}

impl Default for ActionStreamParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionStreamParser {
    pub fn new() -> Self {
        ActionStreamParser {
            pending: Vec::new(),
            buffer: String::new(),
            cursor: 0,
            state: ParseState::AwaitingTag,
            selector_start: 0,
            selector_end: 0,
            value: String::new(),
            summary: StreamSummary::default(),
        }
    }

    /// Current grammar position
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Text received but not yet consumed
    pub fn pending_text(&self) -> &str {
        &self.buffer
    }

    /// Append a chunk and return every action it completes, in stream order
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Action> {
        self.decode(chunk);

        let mut actions = Vec::new();
        loop {
            match self.step() {
                Step::Continue => {}
                Step::NeedMore => break,
                Step::Complete => {
                    if let Some(action) = self.complete_record() {
                        actions.push(action);
                    }
                }
                Step::Mismatch => self.abandon_record(),
            }
        }

        self.summary.emitted += actions.len();
        actions
    }

    /// Signal the end of the stream; anything still buffered is dropped
    pub fn finish(mut self) -> StreamSummary {
        if !self.pending.is_empty() {
            self.buffer
                .push_str(&String::from_utf8_lossy(&std::mem::take(&mut self.pending)));
        }

        let discarded = self.buffer.len();
        if discarded > 0 {
            debug!(
                "Discarding {} unmatched bytes at end of stream (state {:?})",
                discarded, self.state
            );
        }
        self.summary.discarded_bytes = discarded;
        self.summary
    }

    fn decode(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        loop {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    start = self.pending.len();
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    self.buffer
                        .push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(bad) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + bad;
                        }
                        None => {
                            // Incomplete sequence at the end; wait for the next chunk
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }
        self.pending.drain(..start);
    }

    /// Advance the machine, abandoning any record that has grown past
    /// `MAX_RECORD_LEN`. The cursor never runs ahead of the record, so the
    /// outcome is the same however the stream was chunked.
    fn step(&mut self) -> Step {
        let step = self.advance();
        let in_record = self.state != ParseState::AwaitingTag || matches!(step, Step::Complete);
        if in_record && !matches!(step, Step::Mismatch) && self.cursor > MAX_RECORD_LEN {
            warn!("Abandoning action record longer than {} bytes", MAX_RECORD_LEN);
            return Step::Mismatch;
        }
        step
    }

    fn advance(&mut self) -> Step {
        match self.state {
            ParseState::AwaitingTag => self.seek_open_tag(),
            ParseState::AwaitingType => {
                if !self.skip_whitespace() {
                    return Step::NeedMore;
                }
                self.expect_literal(TYPE_CALL, ParseState::AwaitingSelector)
            }
            ParseState::AwaitingSelector => {
                if !self.skip_whitespace() {
                    return Step::NeedMore;
                }
                if self.buffer[self.cursor..].starts_with('{') {
                    self.selector_start = self.cursor;
                    self.cursor += 1;
                    self.state = ParseState::InSelector;
                    Step::Continue
                } else {
                    Step::Mismatch
                }
            }
            ParseState::InSelector => match self.buffer[self.cursor..].find('}') {
                Some(offset) => {
                    self.cursor += offset + 1;
                    self.selector_end = self.cursor;
                    self.state = ParseState::AwaitingComma;
                    Step::Continue
                }
                None => {
                    self.cursor = self.buffer.len();
                    Step::NeedMore
                }
            },
            ParseState::AwaitingComma => self.expect_char(',', ParseState::AwaitingValue),
            ParseState::AwaitingValue => {
                let step = self.expect_char('"', ParseState::InValue { escaped: false });
                if matches!(step, Step::Continue) {
                    self.value.clear();
                }
                step
            }
            ParseState::InValue { escaped } => self.scan_value(escaped),
            ParseState::AwaitingClose => self.expect_char(')', ParseState::AwaitingEndTag),
            ParseState::AwaitingEndTag => {
                if !self.skip_whitespace() {
                    return Step::NeedMore;
                }
                match self.expect_literal(CLOSE_TAG, ParseState::AwaitingTag) {
                    Step::Continue => Step::Complete,
                    other => other,
                }
            }
        }
    }

    fn seek_open_tag(&mut self) -> Step {
        if let Some(offset) = self.buffer[self.cursor..].find(OPEN_TAG) {
            let start = self.cursor + offset;
            self.buffer.drain(..start);
            self.cursor = OPEN_TAG.len();
            self.state = ParseState::AwaitingType;
            return Step::Continue;
        }

        // Keep only a tail that could still grow into `<action>`
        let scanned = &self.buffer[self.cursor..];
        let keep = (1..OPEN_TAG.len())
            .rev()
            .find(|&n| n <= scanned.len() && scanned.ends_with(&OPEN_TAG[..n]))
            .unwrap_or(0);
        let cut = self.buffer.len() - keep;
        self.buffer.drain(..cut);
        self.cursor = 0;
        Step::NeedMore
    }

    /// Advance past whitespace; false when the buffer ran out
    fn skip_whitespace(&mut self) -> bool {
        let rest = &self.buffer[self.cursor..];
        let trimmed = rest.trim_start();
        self.cursor += rest.len() - trimmed.len();
        self.cursor < self.buffer.len()
    }

    fn expect_literal(&mut self, literal: &str, next: ParseState) -> Step {
        let rest = &self.buffer[self.cursor..];
        if rest.starts_with(literal) {
            self.cursor += literal.len();
            self.state = next;
            Step::Continue
        } else if literal.starts_with(rest) {
            Step::NeedMore
        } else {
            Step::Mismatch
        }
    }

    fn expect_char(&mut self, expected: char, next: ParseState) -> Step {
        if !self.skip_whitespace() {
            return Step::NeedMore;
        }
        if self.buffer[self.cursor..].starts_with(expected) {
            self.cursor += expected.len_utf8();
            self.state = next;
            Step::Continue
        } else {
            Step::Mismatch
        }
    }

    fn scan_value(&mut self, mut escaped: bool) -> Step {
        let rest = &self.buffer[self.cursor..];
        for (offset, c) in rest.char_indices() {
            if escaped {
                // Only `\"` is unescaped here; `\n` and friends stay verbatim
                if c != '"' {
                    self.value.push('\\');
                }
                self.value.push(c);
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                self.cursor += offset + 1;
                self.state = ParseState::AwaitingClose;
                return Step::Continue;
            } else {
                self.value.push(c);
            }
        }

        self.cursor = self.buffer.len();
        self.state = ParseState::InValue { escaped };
        Step::NeedMore
    }

    fn complete_record(&mut self) -> Option<Action> {
        let raw = self.buffer[self.selector_start..self.selector_end].to_string();
        let value = std::mem::take(&mut self.value);

        self.buffer.drain(..self.cursor);
        self.cursor = 0;
        self.state = ParseState::AwaitingTag;

        match Selector::from_json(&raw) {
            Ok(selector) => {
                debug!("Parsed action for selector {}", selector);
                Some(Action { selector, value })
            }
            Err(e) => {
                warn!("Skipping action record: {}", e);
                self.summary.malformed += 1;
                None
            }
        }
    }

    /// Drop the open record and rescan from the character after its `<`
    fn abandon_record(&mut self) {
        debug!("Abandoning action record in state {:?}", self.state);
        self.cursor = 1;
        self.state = ParseState::AwaitingTag;
        self.value.clear();
    }
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod parser_test;
