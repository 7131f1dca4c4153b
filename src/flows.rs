//! Conversation flows and the state they carry between messages.
//!
//! Each flow is a small state machine: an entry point builds the first
//! prompt, then `on_text`/`on_select` steps consume one user input and
//! return a [`FlowOutcome`] describing the next state (or completion)
//! plus the replies to deliver. Flow steps never perform I/O beyond the
//! database handle they are given, which keeps every step testable
//! against an in-memory store.

pub mod add_exercise;
pub mod add_set;
pub mod create_exercise;
pub mod history;

use crate::telegram::ReplyMarkup;
use chrono::NaiveDate;

// ==================== Flow State ====================

/// Where a user currently is in a multi-step conversation.
///
/// A user holds at most one of these at a time; starting any flow
/// replaces whatever was in progress.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    AddExercise(AddExerciseState),
    AddSet(AddSetState),
    CreateExercise(CreateExerciseState),
    History(HistoryState),
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddExerciseState {
    /// Catalog keyboard shown, waiting for a button press
    SelectingExercise,
    AwaitingWeight { exercise_id: i64 },
    AwaitingReps { exercise_id: i64, weight: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum AddSetState {
    /// Today's exercises shown, waiting for a button press
    SelectingExercise,
    AwaitingWeight { exercise_id: i64 },
    AwaitingReps { exercise_id: i64, weight: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CreateExerciseState {
    AwaitingName,
    AwaitingCategory { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum HistoryState {
    AwaitingDate,
    AwaitingRangeStart,
    AwaitingRangeEnd { start: NaiveDate },
}

impl FlowState {
    /// Whether the next plain text message belongs to this flow.
    ///
    /// Selection states wait for a button press, so free text typed
    /// while one is active falls through to the generic hint instead
    /// of being swallowed.
    pub fn awaits_text(&self) -> bool {
        !matches!(
            self,
            FlowState::AddExercise(AddExerciseState::SelectingExercise)
                | FlowState::AddSet(AddSetState::SelectingExercise)
        )
    }

    /// Short flow label for log lines
    pub fn name(&self) -> &'static str {
        match self {
            FlowState::AddExercise(_) => "add_exercise",
            FlowState::AddSet(_) => "add_set",
            FlowState::CreateExercise(_) => "create_exercise",
            FlowState::History(_) => "history",
        }
    }
}

// ==================== Replies ====================

/// One outbound action produced by a flow step
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// New message to the chat, optionally with a keyboard
    Send {
        text: String,
        markup: Option<ReplyMarkup>,
    },
    /// Rewrite the message whose button was pressed
    Edit { text: String },
    /// Acknowledge a callback query, optionally with a toast
    AckCallback { text: Option<String> },
}

impl Reply {
    pub fn send(text: impl Into<String>) -> Self {
        Reply::Send {
            text: text.into(),
            markup: None,
        }
    }

    pub fn send_with_markup(text: impl Into<String>, markup: impl Into<ReplyMarkup>) -> Self {
        Reply::Send {
            text: text.into(),
            markup: Some(markup.into()),
        }
    }

    pub fn edit(text: impl Into<String>) -> Self {
        Reply::Edit { text: text.into() }
    }

    pub fn ack() -> Self {
        Reply::AckCallback { text: None }
    }

    pub fn ack_with_text(text: impl Into<String>) -> Self {
        Reply::AckCallback {
            text: Some(text.into()),
        }
    }
}

// ==================== Flow Outcome ====================

/// Result of one flow step: the state to keep (or `None` when the flow
/// is over) and the replies to deliver, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowOutcome {
    pub state: Option<FlowState>,
    pub replies: Vec<Reply>,
}

impl FlowOutcome {
    /// Continue the conversation in `state`
    pub fn advance(state: FlowState) -> Self {
        Self {
            state: Some(state),
            replies: Vec::new(),
        }
    }

    /// The flow is complete; release the user's slot
    pub fn finish() -> Self {
        Self {
            state: None,
            replies: Vec::new(),
        }
    }

    pub fn with_reply(mut self, reply: Reply) -> Self {
        self.replies.push(reply);
        self
    }

    pub fn with_replies(mut self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.replies.extend(replies);
        self
    }
}

// ==================== Input Parsing ====================

/// Parse a weight entry. The whole trimmed input must be a finite
/// number greater than zero; trailing garbage like "80abc" is rejected.
pub(crate) fn parse_weight(input: &str) -> Option<f64> {
    let value: f64 = input.trim().parse().ok()?;
    if value.is_finite() && value > 0.0 {
        Some(value)
    } else {
        None
    }
}

/// Parse a repetition count: a whole number greater than zero.
pub(crate) fn parse_reps(input: &str) -> Option<i64> {
    let value: i64 = input.trim().parse().ok()?;
    if value > 0 {
        Some(value)
    } else {
        None
    }
}
