//! # Pagination
//!
//! Backwards cursor paging through one conversation.
//!
//! A page is the `first` newest messages strictly older than the `before`
//! cursor. Cursors are the messages' epoch-millisecond timestamps written as
//! decimal strings. Edges come back oldest first so the client can prepend a
//! whole page to what it already shows.

use crate::Message;
use crate::error::ValidationError;
use crate::primitives::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::{Deserialize, Serialize};

// =============================================================================
// REQUEST
// =============================================================================

/// A validated page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// Number of messages to return, in `1..=MAX_PAGE_SIZE`.
    pub first: usize,
    /// Exclusive upper bound on message time. `None` means "now".
    pub before: Option<i64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            first: DEFAULT_PAGE_SIZE,
            before: None,
        }
    }
}

impl PageRequest {
    /// Build a request from raw client arguments.
    ///
    /// Page sizes above [`MAX_PAGE_SIZE`] are clamped; sizes below 1 are
    /// rejected. A missing or empty `before` starts from the newest message.
    pub fn from_args(first: Option<i64>, before: Option<&str>) -> Result<Self, ValidationError> {
        let first = match first {
            None => DEFAULT_PAGE_SIZE,
            Some(n) if n < 1 => return Err(ValidationError::InvalidPageSize(n)),
            Some(n) => usize::try_from(n).unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE),
        };
        let before = match before.map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(parse_cursor(raw)?),
        };
        Ok(Self { first, before })
    }

    /// Exclusive upper bound on message time, `now` when no cursor was given.
    #[must_use]
    pub fn upper_bound(&self, now: i64) -> i64 {
        self.before.unwrap_or(now)
    }
}

/// Parse a cursor emitted by [`Message::cursor`].
pub fn parse_cursor(raw: &str) -> Result<i64, ValidationError> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| ValidationError::InvalidCursor(raw.to_string()))
}

// =============================================================================
// RESPONSE
// =============================================================================

/// Relay-style page metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    /// Older messages exist before `end_cursor`.
    pub has_previous_page: bool,
    /// Newer messages exist at or after the request's upper bound.
    pub has_next_page: bool,
    /// Cursor of the newest message in the page.
    pub start_cursor: Option<String>,
    /// Cursor of the oldest message in the page; pass it as `before` to
    /// fetch the next older page.
    pub end_cursor: Option<String>,
}

/// A message with its cursor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEdge {
    pub cursor: String,
    pub node: Message,
}

/// One page of a conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePage {
    /// Messages in the whole conversation, not just this page.
    pub total_count: usize,
    pub page_info: PageInfo,
    /// Oldest first.
    pub edges: Vec<MessageEdge>,
}

impl MessagePage {
    /// Assemble a page from messages fetched newest first.
    #[must_use]
    pub fn assemble(
        newest_first: Vec<Message>,
        has_previous_page: bool,
        has_next_page: bool,
        total_count: usize,
    ) -> Self {
        let start_cursor = newest_first.first().map(Message::cursor);
        let end_cursor = newest_first.last().map(Message::cursor);

        let edges = newest_first
            .into_iter()
            .rev()
            .map(|node| MessageEdge {
                cursor: node.cursor(),
                node,
            })
            .collect();

        Self {
            total_count,
            page_info: PageInfo {
                has_previous_page,
                has_next_page,
                start_cursor,
                end_cursor,
            },
            edges,
        }
    }

    /// Messages of this page, oldest first.
    pub fn messages(&self) -> impl Iterator<Item = &Message> {
        self.edges.iter().map(|e| &e.node)
    }
}
