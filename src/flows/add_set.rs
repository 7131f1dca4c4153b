//! /addset flow: repeat an exercise already logged today with a new set.

use super::{parse_reps, parse_weight, AddSetState, FlowOutcome, FlowState, Reply};
use crate::db::{Database, DbResult};
use crate::dispatch::CallbackAction;
use crate::telegram::InlineKeyboardMarkup;
use chrono::Utc;

/// Show today's exercises with their set counts
pub fn enter(db: &Database, telegram_id: i64) -> DbResult<FlowOutcome> {
    let Some(user_id) = db.lookup_user_id(telegram_id)? else {
        return Ok(FlowOutcome::finish().with_reply(Reply::send(
            "Ошибка: пользователь не найден. Попробуйте команду /start",
        )));
    };

    let logged = db.exercises_logged_today(user_id, Utc::now().date_naive())?;
    if logged.is_empty() {
        return Ok(FlowOutcome::finish().with_reply(Reply::send(
            "У вас пока нет упражнений за сегодня. Сначала добавьте упражнение командой /add",
        )));
    }

    let mut keyboard = InlineKeyboardMarkup::new();
    for (i, entry) in logged.iter().enumerate() {
        if i > 0 && i % 2 == 0 {
            keyboard = keyboard.row();
        }
        keyboard = keyboard.text(
            format!("{} ({} подх.)", entry.name, entry.set_count),
            CallbackAction::AddSet(entry.exercise_id).encode(),
        );
    }
    keyboard = keyboard.row().text(
        "➕ Добавить новое упражнение",
        CallbackAction::AddSetNew.encode(),
    );

    Ok(
        FlowOutcome::advance(FlowState::AddSet(AddSetState::SelectingExercise)).with_reply(
            Reply::send_with_markup("Выберите упражнение для добавления подхода:", keyboard),
        ),
    )
}

/// One of today's exercises picked from the keyboard
pub fn on_select(db: &Database, telegram_id: i64, exercise_id: i64) -> DbResult<FlowOutcome> {
    let Some(exercise) = db.get_exercise(exercise_id)? else {
        return Ok(
            FlowOutcome::advance(FlowState::AddSet(AddSetState::SelectingExercise))
                .with_reply(Reply::ack_with_text("Упражнение не найдено")),
        );
    };
    let Some(user_id) = db.lookup_user_id(telegram_id)? else {
        return Ok(
            FlowOutcome::advance(FlowState::AddSet(AddSetState::SelectingExercise))
                .with_reply(Reply::ack_with_text("Пользователь не найден")),
        );
    };

    let logged = db.exercises_logged_today(user_id, Utc::now().date_naive())?;
    let last_info = logged
        .iter()
        .find(|entry| entry.exercise_id == exercise_id)
        .map(|entry| {
            format!(
                "\nПоследний подход: {}кг × {} повторений",
                entry.last_weight, entry.last_reps
            )
        })
        .unwrap_or_default();

    Ok(FlowOutcome::advance(FlowState::AddSet(
        AddSetState::AwaitingWeight { exercise_id },
    ))
    .with_reply(Reply::ack())
    .with_reply(Reply::edit(format!(
        "Выбрано: {}{last_info}\n\nВведите вес (в кг):",
        exercise.name
    ))))
}

/// Escape hatch button at the bottom of the keyboard
pub fn on_new_exercise() -> FlowOutcome {
    FlowOutcome::finish()
        .with_reply(Reply::ack())
        .with_reply(Reply::edit(
            "Используйте команду /add для добавления нового упражнения",
        ))
}

/// Text message while the flow is active
pub fn on_text(
    db: &Database,
    telegram_id: i64,
    state: AddSetState,
    text: &str,
) -> DbResult<FlowOutcome> {
    match state {
        AddSetState::SelectingExercise => Ok(FlowOutcome::advance(FlowState::AddSet(state))),
        AddSetState::AwaitingWeight { exercise_id } => match parse_weight(text) {
            Some(weight) => Ok(FlowOutcome::advance(FlowState::AddSet(
                AddSetState::AwaitingReps {
                    exercise_id,
                    weight,
                },
            ))
            .with_reply(Reply::send("Введите количество повторений:"))),
            None => Ok(FlowOutcome::advance(FlowState::AddSet(
                AddSetState::AwaitingWeight { exercise_id },
            ))
            .with_reply(Reply::send(
                "Пожалуйста, введите корректный вес (число больше 0):",
            ))),
        },
        AddSetState::AwaitingReps {
            exercise_id,
            weight,
        } => {
            let Some(reps) = parse_reps(text) else {
                return Ok(FlowOutcome::advance(FlowState::AddSet(
                    AddSetState::AwaitingReps {
                        exercise_id,
                        weight,
                    },
                ))
                .with_reply(Reply::send(
                    "Пожалуйста, введите корректное количество повторений (целое число больше 0):",
                )));
            };

            let Some(user_id) = db.lookup_user_id(telegram_id)? else {
                return Ok(FlowOutcome::finish().with_reply(Reply::send(
                    "Ошибка: пользователь не найден. Попробуйте команду /start",
                )));
            };

            let set_number = db.next_set_number(user_id, exercise_id, Utc::now().date_naive())?;
            db.record_set(user_id, exercise_id, weight, reps, set_number)?;
            let name = db
                .get_exercise(exercise_id)?
                .map(|e| e.name)
                .unwrap_or_default();

            Ok(FlowOutcome::finish().with_reply(Reply::send(format!(
                "✅ Подход добавлен!\n\n{name} - Подход {set_number}: {weight}кг × {reps} повторений"
            ))))
        }
    }
}
