//! /create flow: add a user-defined exercise to the catalog.

use super::{CreateExerciseState, FlowOutcome, FlowState, Reply};
use crate::db::{Database, DbError, DbResult};

/// Lengths are counted in characters, not bytes, so two-letter
/// Cyrillic names pass.
const MIN_NAME_CHARS: usize = 2;

pub fn enter() -> FlowOutcome {
    FlowOutcome::advance(FlowState::CreateExercise(CreateExerciseState::AwaitingName))
        .with_reply(Reply::send("Введите название нового упражнения:"))
}

/// Text message while the flow is active
pub fn on_text(db: &Database, state: CreateExerciseState, text: &str) -> DbResult<FlowOutcome> {
    match state {
        CreateExerciseState::AwaitingName => {
            let name = text.trim();
            if name.chars().count() < MIN_NAME_CHARS {
                return Ok(FlowOutcome::advance(FlowState::CreateExercise(
                    CreateExerciseState::AwaitingName,
                ))
                .with_reply(Reply::send(
                    "Название упражнения должно содержать минимум 2 символа. Попробуйте еще раз:",
                )));
            }
            if db.exercise_exists(name)? {
                return Ok(FlowOutcome::advance(FlowState::CreateExercise(
                    CreateExerciseState::AwaitingName,
                ))
                .with_reply(Reply::send(
                    "Упражнение с таким названием уже существует. Введите другое название:",
                )));
            }

            Ok(FlowOutcome::advance(FlowState::CreateExercise(
                CreateExerciseState::AwaitingCategory {
                    name: name.to_string(),
                },
            ))
            .with_reply(Reply::send(
                "Введите категорию упражнения (например: Грудь, Спина, Ноги, Руки):",
            )))
        }
        CreateExerciseState::AwaitingCategory { name } => {
            let category = text.trim();
            if category.chars().count() < MIN_NAME_CHARS {
                return Ok(FlowOutcome::advance(FlowState::CreateExercise(
                    CreateExerciseState::AwaitingCategory { name },
                ))
                .with_reply(Reply::send(
                    "Категория должна содержать минимум 2 символа. Попробуйте еще раз:",
                )));
            }

            match db.create_exercise(&name, category) {
                Ok(_) => Ok(FlowOutcome::finish().with_reply(Reply::send(format!(
                    "✅ Упражнение \"{name}\" (категория: {category}) успешно создано!"
                )))),
                // Name taken between the pre-check and the insert
                Err(DbError::DuplicateName(_)) => Ok(FlowOutcome::advance(
                    FlowState::CreateExercise(CreateExerciseState::AwaitingName),
                )
                .with_reply(Reply::send(
                    "Упражнение с таким названием уже существует. Введите другое название:",
                ))),
                Err(other) => Err(other),
            }
        }
    }
}
