//! /add flow: pick an exercise from the catalog, then enter weight and reps.

use super::{parse_reps, parse_weight, AddExerciseState, FlowOutcome, FlowState, Reply};
use crate::db::{Database, DbResult};
use crate::dispatch::CallbackAction;
use crate::telegram::InlineKeyboardMarkup;

/// Show the catalog keyboard, two exercises per row
pub fn enter(db: &Database) -> DbResult<FlowOutcome> {
    let exercises = db.list_exercises()?;
    let mut keyboard = InlineKeyboardMarkup::new();
    for (i, exercise) in exercises.iter().enumerate() {
        if i > 0 && i % 2 == 0 {
            keyboard = keyboard.row();
        }
        keyboard = keyboard.text(&exercise.name, CallbackAction::Exercise(exercise.id).encode());
    }

    Ok(
        FlowOutcome::advance(FlowState::AddExercise(AddExerciseState::SelectingExercise))
            .with_reply(Reply::send_with_markup("Выберите упражнение:", keyboard)),
    )
}

/// Catalog button pressed
pub fn on_select(db: &Database, exercise_id: i64) -> DbResult<FlowOutcome> {
    let Some(exercise) = db.get_exercise(exercise_id)? else {
        // Stale keyboard; keep waiting for a valid pick
        return Ok(FlowOutcome::advance(FlowState::AddExercise(
            AddExerciseState::SelectingExercise,
        ))
        .with_reply(Reply::ack_with_text("Упражнение не найдено")));
    };

    Ok(FlowOutcome::advance(FlowState::AddExercise(
        AddExerciseState::AwaitingWeight { exercise_id },
    ))
    .with_reply(Reply::ack())
    .with_reply(Reply::edit(format!(
        "Выбрано: {}\n\nВведите вес (в кг):",
        exercise.name
    ))))
}

/// Text message while the flow is active
pub fn on_text(
    db: &Database,
    telegram_id: i64,
    state: AddExerciseState,
    text: &str,
) -> DbResult<FlowOutcome> {
    match state {
        AddExerciseState::SelectingExercise => {
            // Free text is not for us while the keyboard is up
            Ok(FlowOutcome::advance(FlowState::AddExercise(state)))
        }
        AddExerciseState::AwaitingWeight { exercise_id } => match parse_weight(text) {
            Some(weight) => Ok(FlowOutcome::advance(FlowState::AddExercise(
                AddExerciseState::AwaitingReps {
                    exercise_id,
                    weight,
                },
            ))
            .with_reply(Reply::send("Введите количество повторений:"))),
            None => Ok(FlowOutcome::advance(FlowState::AddExercise(
                AddExerciseState::AwaitingWeight { exercise_id },
            ))
            .with_reply(Reply::send(
                "Пожалуйста, введите корректный вес (число больше 0):",
            ))),
        },
        AddExerciseState::AwaitingReps {
            exercise_id,
            weight,
        } => {
            let Some(reps) = parse_reps(text) else {
                return Ok(FlowOutcome::advance(FlowState::AddExercise(
                    AddExerciseState::AwaitingReps {
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

            db.record_set(user_id, exercise_id, weight, reps, 1)?;
            let name = db
                .get_exercise(exercise_id)?
                .map(|e| e.name)
                .unwrap_or_default();

            Ok(FlowOutcome::finish().with_reply(Reply::send(format!(
                "✅ Упражнение записано!\n\n{name}: {weight}кг × {reps} повторений"
            ))))
        }
    }
}
