//! /history flow: render past workouts for a day or a date range.

use super::{FlowOutcome, FlowState, HistoryState, Reply};
use crate::db::{Database, DbResult, SetRecord};
use crate::dispatch::{CallbackAction, HistoryAction};
use crate::telegram::InlineKeyboardMarkup;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Telegram caps messages at 4096 characters; keep headroom.
const MAX_MESSAGE_LEN: usize = 4000;

static DATE_SHAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}\.\d{2}\.\d{4}$").unwrap());

/// Show the period menu. The menu itself holds no conversation state;
/// only the custom-date and range choices start one.
pub fn enter() -> FlowOutcome {
    let keyboard = InlineKeyboardMarkup::new()
        .text(
            "Сегодня",
            CallbackAction::History(HistoryAction::Today).encode(),
        )
        .text(
            "Вчера",
            CallbackAction::History(HistoryAction::Yesterday).encode(),
        )
        .row()
        .text(
            "Неделя назад",
            CallbackAction::History(HistoryAction::WeekAgo).encode(),
        )
        .row()
        .text(
            "Выбрать дату",
            CallbackAction::History(HistoryAction::CustomDate).encode(),
        )
        .text(
            "За период",
            CallbackAction::History(HistoryAction::Period).encode(),
        );

    FlowOutcome::finish().with_reply(Reply::send_with_markup(
        "Выберите период для просмотра истории:",
        keyboard,
    ))
}

/// Period menu button pressed
pub fn on_menu_choice(
    db: &Database,
    telegram_id: i64,
    action: HistoryAction,
) -> DbResult<FlowOutcome> {
    let Some(user_id) = db.lookup_user_id(telegram_id)? else {
        return Ok(
            FlowOutcome::finish().with_reply(Reply::ack_with_text("Пользователь не найден"))
        );
    };

    let today = Utc::now().date_naive();
    let (day, title) = match action {
        HistoryAction::Today => (today, "Тренировки за сегодня"),
        HistoryAction::Yesterday => (today - Duration::days(1), "Тренировки за вчера"),
        HistoryAction::WeekAgo => (today - Duration::days(7), "Тренировки неделю назад"),
        HistoryAction::CustomDate => {
            return Ok(
                FlowOutcome::advance(FlowState::History(HistoryState::AwaitingDate))
                    .with_reply(Reply::ack())
                    .with_reply(Reply::edit(
                        "Введите дату в формате ДД.ММ.ГГГГ (например: 22.07.2024):",
                    )),
            );
        }
        HistoryAction::Period => {
            return Ok(
                FlowOutcome::advance(FlowState::History(HistoryState::AwaitingRangeStart))
                    .with_reply(Reply::ack())
                    .with_reply(Reply::edit(
                        "Введите начальную дату периода в формате ДД.ММ.ГГГГ:",
                    )),
            );
        }
    };

    let sets = db.sets_on_date(user_id, day)?;
    Ok(FlowOutcome::finish()
        .with_reply(Reply::ack())
        .with_replies(report_edits(title, &sets)))
}

/// Text message while a date prompt is active
pub fn on_text(
    db: &Database,
    telegram_id: i64,
    state: HistoryState,
    text: &str,
) -> DbResult<FlowOutcome> {
    let Some(date) = parse_date(text) else {
        return Ok(FlowOutcome::advance(FlowState::History(state)).with_reply(Reply::send(
            "Неверный формат даты. Используйте формат ДД.ММ.ГГГГ (например: 22.07.2024):",
        )));
    };
    let Some(user_id) = db.lookup_user_id(telegram_id)? else {
        return Ok(FlowOutcome::finish().with_reply(Reply::send("Ошибка: пользователь не найден")));
    };

    match state {
        HistoryState::AwaitingDate => {
            let sets = db.sets_on_date(user_id, date)?;
            let title = format!("Тренировки за {}", format_date_ru(date));
            Ok(FlowOutcome::finish().with_replies(report_sends(&title, &sets)))
        }
        HistoryState::AwaitingRangeStart => Ok(FlowOutcome::advance(FlowState::History(
            HistoryState::AwaitingRangeEnd { start: date },
        ))
        .with_reply(Reply::send(
            "Введите конечную дату периода в формате ДД.ММ.ГГГГ:",
        ))),
        HistoryState::AwaitingRangeEnd { start } => {
            if date < start {
                return Ok(FlowOutcome::advance(FlowState::History(
                    HistoryState::AwaitingRangeEnd { start },
                ))
                .with_reply(Reply::send(
                    "Конечная дата не может быть раньше начальной. Введите корректную конечную дату:",
                )));
            }
            let sets = db.sets_in_range(user_id, start, date)?;
            let title = format!(
                "Тренировки с {} по {}",
                format_date_ru(start),
                format_date_ru(date)
            );
            Ok(FlowOutcome::finish().with_replies(report_sends(&title, &sets)))
        }
    }
}

// ==================== Date parsing ====================

/// Strict `ДД.ММ.ГГГГ`: zero-padded shape first, then calendar
/// validity (31.02.2024 is rejected, 29.02.2024 passes).
pub(crate) fn parse_date(input: &str) -> Option<NaiveDate> {
    let trimmed = input.trim();
    if !DATE_SHAPE.is_match(trimmed) {
        return None;
    }
    let mut parts = trimmed.split('.');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

// ==================== Rendering ====================

const MONTHS_RU: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

/// "22 июля 2024 г.": unpadded day, genitive month
pub(crate) fn format_date_ru(date: NaiveDate) -> String {
    format!(
        "{} {} {} г.",
        date.day(),
        MONTHS_RU[date.month0() as usize],
        date.year()
    )
}

/// Report as callback replies: first chunk rewrites the menu message,
/// overflow goes as follow-up messages.
fn report_edits(title: &str, sets: &[SetRecord]) -> Vec<Reply> {
    let mut chunks = chunk_message(&render_report(title, sets), MAX_MESSAGE_LEN).into_iter();
    let mut replies = Vec::new();
    if let Some(first) = chunks.next() {
        replies.push(Reply::edit(first));
    }
    replies.extend(chunks.map(Reply::send));
    replies
}

/// Report as plain messages, for text-triggered renders
fn report_sends(title: &str, sets: &[SetRecord]) -> Vec<Reply> {
    chunk_message(&render_report(title, sets), MAX_MESSAGE_LEN)
        .into_iter()
        .map(Reply::send)
        .collect()
}

/// Sets arrive newest-first; grouping preserves that for days and
/// exercises, while sets within an exercise run in workout order.
fn render_report(title: &str, sets: &[SetRecord]) -> String {
    if sets.is_empty() {
        return format!("{title}:\n\nТренировок не найдено.");
    }

    let mut message = format!("{title}:\n\n");
    for (day, day_sets) in group_by_day(sets) {
        message.push_str(&format!("📅 {}:\n", format_date_ru(day)));
        for (name, mut exercise_sets) in group_by_exercise(&day_sets) {
            message.push_str(&format!("• {name}:\n"));
            exercise_sets.sort_by_key(|s| s.set_number);
            for set in exercise_sets {
                message.push_str(&format!(
                    "  • Подход {}: {}кг × {} повторений ({})\n",
                    set.set_number,
                    set.weight,
                    set.reps,
                    set.created_at.format("%H:%M"),
                ));
            }
        }
        message.push('\n');
    }
    message
}

fn group_by_day(sets: &[SetRecord]) -> Vec<(NaiveDate, Vec<&SetRecord>)> {
    let mut days: Vec<(NaiveDate, Vec<&SetRecord>)> = Vec::new();
    for set in sets {
        let day = set.created_at.date_naive();
        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, group)) => group.push(set),
            None => days.push((day, vec![set])),
        }
    }
    days
}

fn group_by_exercise<'a>(sets: &[&'a SetRecord]) -> Vec<(&'a str, Vec<&'a SetRecord>)> {
    let mut exercises: Vec<(&str, Vec<&SetRecord>)> = Vec::new();
    for &set in sets {
        match exercises
            .iter_mut()
            .find(|(name, _)| *name == set.exercise_name)
        {
            Some((_, group)) => group.push(set),
            None => exercises.push((set.exercise_name.as_str(), vec![set])),
        }
    }
    exercises
}

/// Split into chunks of at most `limit` characters, preserving content
pub(crate) fn chunk_message(message: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for ch in message.chars() {
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(ch);
        count += 1;
    }
    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}
