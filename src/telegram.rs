//! Telegram Bot API surface: wire types and the HTTP client

mod client;
mod types;

pub use client::{BotApi, TelegramError};
pub use types::{
    BotCommand, CallbackQuery, Chat, InlineKeyboardMarkup, Message, ReplyKeyboardMarkup,
    ReplyMarkup, Update, User,
};
