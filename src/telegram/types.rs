//! Serde types for the slice of the Bot API the bot touches

use serde::{Deserialize, Serialize};

/// One long-poll update. Only message and callback-query updates are
/// requested, everything else is absent.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

/// Inline keyboard attached to a message; buttons carry callback tokens.
/// Built in chained style: `text` appends to the current row, `row`
/// starts a new one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

impl InlineKeyboardMarkup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        let button = InlineKeyboardButton {
            text: label.into(),
            callback_data: callback_data.into(),
        };
        match self.inline_keyboard.last_mut() {
            Some(row) => row.push(button),
            None => self.inline_keyboard.push(vec![button]),
        }
        self
    }

    pub fn row(mut self) -> Self {
        self.inline_keyboard.push(Vec::new());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

/// Persistent reply keyboard shown under the input field
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReplyKeyboardMarkup {
    pub keyboard: Vec<Vec<KeyboardButton>>,
    pub resize_keyboard: bool,
}

impl ReplyKeyboardMarkup {
    pub fn new() -> Self {
        Self {
            resize_keyboard: true,
            ..Self::default()
        }
    }

    pub fn text(mut self, label: impl Into<String>) -> Self {
        let button = KeyboardButton { text: label.into() };
        match self.keyboard.last_mut() {
            Some(row) => row.push(button),
            None => self.keyboard.push(vec![button]),
        }
        self
    }

    pub fn row(mut self) -> Self {
        self.keyboard.push(Vec::new());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyboardButton {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReplyMarkup {
    Inline(InlineKeyboardMarkup),
    Keyboard(ReplyKeyboardMarkup),
}

impl From<InlineKeyboardMarkup> for ReplyMarkup {
    fn from(markup: InlineKeyboardMarkup) -> Self {
        ReplyMarkup::Inline(markup)
    }
}

impl From<ReplyKeyboardMarkup> for ReplyMarkup {
    fn from(markup: ReplyKeyboardMarkup) -> Self {
        ReplyMarkup::Keyboard(markup)
    }
}

/// Command registration entry for setMyCommands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BotCommand {
    pub command: &'static str,
    pub description: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_message_update() {
        let json = r#"{
            "update_id": 10001,
            "message": {
                "message_id": 1365,
                "from": {"id": 1111, "is_bot": false, "first_name": "Анна", "username": "anna"},
                "chat": {"id": 1111, "first_name": "Анна", "type": "private"},
                "date": 1721640000,
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 10001);
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 1111);
        assert_eq!(message.text.as_deref(), Some("/start"));
        assert_eq!(message.from.unwrap().username.as_deref(), Some("anna"));
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn test_deserialize_callback_update() {
        let json = r#"{
            "update_id": 10002,
            "callback_query": {
                "id": "4382abc",
                "from": {"id": 1111, "is_bot": false, "first_name": "Анна"},
                "message": {
                    "message_id": 1365,
                    "chat": {"id": 1111, "type": "private"},
                    "date": 1721640000
                },
                "data": "exercise_3"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.id, "4382abc");
        assert_eq!(query.data.as_deref(), Some("exercise_3"));
        assert_eq!(query.message.unwrap().message_id, 1365);
    }

    #[test]
    fn test_inline_keyboard_rows() {
        let keyboard = InlineKeyboardMarkup::new()
            .text("A", "a")
            .text("B", "b")
            .row()
            .text("C", "c");

        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 2);
        assert_eq!(keyboard.inline_keyboard[1].len(), 1);
        assert_eq!(keyboard.inline_keyboard[1][0].callback_data, "c");
    }

    #[test]
    fn test_reply_markup_serializes_flat() {
        let markup = ReplyMarkup::from(ReplyKeyboardMarkup::new().text("ℹ️ Помощь"));
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(json["resize_keyboard"], true);
        assert_eq!(json["keyboard"][0][0]["text"], "ℹ️ Помощь");
    }
}
