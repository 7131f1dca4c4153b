//! Inbound event routing.
//!
//! Routing order for a text message: slash command, then reply-keyboard
//! label, then the active flow's free-text handler, then a generic hint.
//! Callback queries route purely by their token. Persistence errors
//! escaping a flow are caught here: logged, the session dropped, and the
//! user told to retry.

mod action;

pub use action::{CallbackAction, Command, HistoryAction, MenuAction};

use crate::db::{Database, DbResult};
use crate::flows::{self, FlowOutcome, FlowState, Reply};
use crate::session::SessionManager;
use crate::telegram::{BotCommand, ReplyKeyboardMarkup};

/// Command menu registered with Telegram at startup
pub const BOT_COMMANDS: [BotCommand; 6] = [
    BotCommand {
        command: "start",
        description: "Начать работу с ботом",
    },
    BotCommand {
        command: "add",
        description: "Добавить упражнение",
    },
    BotCommand {
        command: "addset",
        description: "Добавить подход к упражнению",
    },
    BotCommand {
        command: "history",
        description: "История тренировок",
    },
    BotCommand {
        command: "create",
        description: "Создать новое упражнение",
    },
    BotCommand {
        command: "help",
        description: "Помощь и инструкции",
    },
];

const WELCOME_TEXT: &str = "🏋️‍♂️ Добро пожаловать в дневник тренировок!

Используйте кнопки меню ниже или команды:
/add - Добавить упражнение
/addset - Добавить подход к упражнению
/history - Посмотреть историю тренировок

Начните с добавления упражнения!";

const HELP_TEXT: &str = "📖 Помощь

Команды:
/start - Начать работу с ботом
/add - Добавить упражнение
/addset - Добавить подход к упражнению
/history - История тренировок
/create - Создать новое упражнение
/help - Помощь и инструкции

Как записать тренировку:
1. Выберите упражнение командой /add
2. Введите вес (в кг) и количество повторений
3. Следующие подходы добавляйте командой /addset

Даты в истории вводите в формате ДД.ММ.ГГГГ (например: 22.07.2024).";

const FALLBACK_HINT: &str = "Используйте кнопки меню или команды:
/add - добавить упражнение
/addset - добавить подход
/history - посмотреть историю
/create - создать новое упражнение
/help - помощь";

const ERROR_TEXT: &str = "Произошла ошибка. Попробуйте еще раз.";

/// One routable user event, already stripped of transport details
#[derive(Debug, Clone, PartialEq)]
pub struct Inbound {
    pub telegram_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub kind: InboundKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InboundKind {
    /// Plain message text
    Text(String),
    /// Inline keyboard callback data
    Callback(String),
}

pub struct Dispatcher {
    db: Database,
    sessions: SessionManager,
}

impl Dispatcher {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            sessions: SessionManager::new(),
        }
    }

    /// Route one event to its replies. Never returns an error: failures
    /// become the generic retry message.
    pub fn handle(&mut self, inbound: &Inbound) -> Vec<Reply> {
        let result = match &inbound.kind {
            InboundKind::Text(text) => self.handle_text(inbound, text),
            InboundKind::Callback(data) => self.handle_callback(inbound, data),
        };

        match result {
            Ok(replies) => replies,
            Err(e) => {
                tracing::error!(
                    user_id = inbound.telegram_id,
                    error = %e,
                    "failed to handle update"
                );
                self.sessions.clear(inbound.telegram_id);
                let mut replies = Vec::new();
                if matches!(inbound.kind, InboundKind::Callback(_)) {
                    // Stop the button spinner before apologizing
                    replies.push(Reply::ack());
                }
                replies.push(Reply::send(ERROR_TEXT));
                replies
            }
        }
    }

    /// Called between polls to drop abandoned conversations
    pub fn evict_idle_sessions(&mut self, max_idle: chrono::Duration) -> usize {
        self.sessions.evict_idle(max_idle)
    }

    fn handle_text(&mut self, inbound: &Inbound, text: &str) -> DbResult<Vec<Reply>> {
        if let Some(command) = Command::parse(text) {
            return self.handle_command(inbound, command);
        }
        if let Some(action) = MenuAction::from_label(text) {
            return self.handle_menu(inbound, action);
        }
        if self.sessions.is_active(inbound.telegram_id) {
            if let Some(state) = self.sessions.get(inbound.telegram_id).cloned() {
                return self.continue_flow(inbound.telegram_id, state, text);
            }
        }
        Ok(vec![Reply::send(FALLBACK_HINT)])
    }

    fn handle_command(&mut self, inbound: &Inbound, command: Command) -> DbResult<Vec<Reply>> {
        let telegram_id = inbound.telegram_id;
        tracing::debug!(user_id = telegram_id, ?command, "command");

        match command {
            Command::Start => {
                self.sessions.clear(telegram_id);
                self.db.create_user(
                    telegram_id,
                    inbound.username.as_deref(),
                    inbound.first_name.as_deref(),
                )?;
                tracing::info!(user_id = telegram_id, "user registered");
                Ok(vec![Reply::send_with_markup(
                    WELCOME_TEXT,
                    main_menu_keyboard(),
                )])
            }
            Command::Help => {
                self.sessions.clear(telegram_id);
                Ok(vec![Reply::send(HELP_TEXT)])
            }
            Command::Add => {
                let outcome = flows::add_exercise::enter(&self.db)?;
                Ok(self.enter_flow(telegram_id, outcome))
            }
            Command::AddSet => {
                let outcome = flows::add_set::enter(&self.db, telegram_id)?;
                Ok(self.enter_flow(telegram_id, outcome))
            }
            Command::Create => Ok(self.enter_flow(telegram_id, flows::create_exercise::enter())),
            Command::History => Ok(self.enter_flow(telegram_id, flows::history::enter())),
        }
    }

    /// Reply-keyboard buttons behave exactly like their commands
    fn handle_menu(&mut self, inbound: &Inbound, action: MenuAction) -> DbResult<Vec<Reply>> {
        let command = match action {
            MenuAction::LogExercise => Command::Add,
            MenuAction::LogSet => Command::AddSet,
            MenuAction::History => Command::History,
            MenuAction::Help => Command::Help,
        };
        self.handle_command(inbound, command)
    }

    fn handle_callback(&mut self, inbound: &Inbound, data: &str) -> DbResult<Vec<Reply>> {
        let telegram_id = inbound.telegram_id;
        let Some(action) = CallbackAction::parse(data) else {
            tracing::debug!(user_id = telegram_id, data, "unrecognized callback token");
            return Ok(vec![Reply::ack()]);
        };
        tracing::debug!(user_id = telegram_id, ?action, "callback");

        let outcome = match action {
            CallbackAction::Exercise(exercise_id) => {
                flows::add_exercise::on_select(&self.db, exercise_id)?
            }
            CallbackAction::AddSet(exercise_id) => {
                flows::add_set::on_select(&self.db, telegram_id, exercise_id)?
            }
            CallbackAction::AddSetNew => flows::add_set::on_new_exercise(),
            CallbackAction::History(choice) => {
                flows::history::on_menu_choice(&self.db, telegram_id, choice)?
            }
        };
        Ok(self.advance_flow(telegram_id, outcome))
    }

    fn continue_flow(
        &mut self,
        telegram_id: i64,
        state: FlowState,
        text: &str,
    ) -> DbResult<Vec<Reply>> {
        let outcome = match state {
            FlowState::AddExercise(s) => {
                flows::add_exercise::on_text(&self.db, telegram_id, s, text)?
            }
            FlowState::AddSet(s) => flows::add_set::on_text(&self.db, telegram_id, s, text)?,
            FlowState::CreateExercise(s) => flows::create_exercise::on_text(&self.db, s, text)?,
            FlowState::History(s) => flows::history::on_text(&self.db, telegram_id, s, text)?,
        };
        Ok(self.advance_flow(telegram_id, outcome))
    }

    /// Apply a flow-entry outcome; claiming the slot cancels whatever
    /// flow occupied it.
    fn enter_flow(&mut self, telegram_id: i64, outcome: FlowOutcome) -> Vec<Reply> {
        match outcome.state {
            Some(state) => self.sessions.start(telegram_id, state),
            None => self.sessions.clear(telegram_id),
        }
        outcome.replies
    }

    /// Apply a mid-flow outcome
    fn advance_flow(&mut self, telegram_id: i64, outcome: FlowOutcome) -> Vec<Reply> {
        match outcome.state {
            Some(state) => self.sessions.update(telegram_id, state),
            None => self.sessions.clear(telegram_id),
        }
        outcome.replies
    }
}

fn main_menu_keyboard() -> ReplyKeyboardMarkup {
    ReplyKeyboardMarkup::new()
        .text(MenuAction::LogExercise.label())
        .row()
        .text(MenuAction::LogSet.label())
        .row()
        .text(MenuAction::History.label())
        .row()
        .text(MenuAction::Help.label())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telegram::ReplyMarkup;
    use chrono::Utc;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Database::open_in_memory().unwrap())
    }

    fn message(telegram_id: i64, text: &str) -> Inbound {
        Inbound {
            telegram_id,
            username: Some("anna".to_string()),
            first_name: Some("Анна".to_string()),
            kind: InboundKind::Text(text.to_string()),
        }
    }

    fn callback(telegram_id: i64, data: &str) -> Inbound {
        Inbound {
            telegram_id,
            username: Some("anna".to_string()),
            first_name: Some("Анна".to_string()),
            kind: InboundKind::Callback(data.to_string()),
        }
    }

    fn sent_text(reply: &Reply) -> &str {
        match reply {
            Reply::Send { text, .. } => text,
            Reply::Edit { text } => text,
            Reply::AckCallback { .. } => panic!("expected message text, got an ack"),
        }
    }

    fn squat_id(dispatcher: &Dispatcher) -> i64 {
        dispatcher
            .db
            .list_exercises()
            .unwrap()
            .into_iter()
            .find(|e| e.name == "Присед")
            .unwrap()
            .id
    }

    #[test]
    fn test_start_registers_and_shows_menu() {
        let mut d = dispatcher();
        let replies = d.handle(&message(42, "/start"));

        assert_eq!(replies.len(), 1);
        let Reply::Send { text, markup } = &replies[0] else {
            panic!("expected a send reply");
        };
        assert!(text.starts_with("🏋️‍♂️ Добро пожаловать в дневник тренировок!"));
        let Some(ReplyMarkup::Keyboard(keyboard)) = markup else {
            panic!("expected a reply keyboard");
        };
        assert_eq!(keyboard.keyboard.len(), 4);
        assert_eq!(keyboard.keyboard[0][0].text, "📝 Добавить упражнение");

        let user = d.db.lookup_user_id(42).unwrap().unwrap();
        // Registering twice keeps the same row
        d.handle(&message(42, "/start"));
        assert_eq!(d.db.lookup_user_id(42).unwrap(), Some(user));
    }

    #[test]
    fn test_free_text_without_session_gets_hint() {
        let mut d = dispatcher();
        let replies = d.handle(&message(42, "привет"));
        assert!(sent_text(&replies[0]).starts_with("Используйте кнопки меню или команды:"));
    }

    #[test]
    fn test_unknown_command_gets_hint() {
        let mut d = dispatcher();
        let replies = d.handle(&message(42, "/unknown"));
        assert!(sent_text(&replies[0]).starts_with("Используйте кнопки меню или команды:"));
    }

    #[test]
    fn test_menu_label_routes_like_command() {
        let mut d = dispatcher();
        let by_label = d.handle(&message(42, "📊 История тренировок"));
        let by_command = d.handle(&message(42, "/history"));
        assert_eq!(by_label, by_command);
        assert_eq!(
            sent_text(&by_label[0]),
            "Выберите период для просмотра истории:"
        );
    }

    #[test]
    fn test_full_logging_scenario() {
        let mut d = dispatcher();
        let squat = squat_id(&d);

        d.handle(&message(42, "/start"));
        let replies = d.handle(&message(42, "/add"));
        assert_eq!(sent_text(&replies[0]), "Выберите упражнение:");

        let replies = d.handle(&callback(42, &format!("exercise_{squat}")));
        assert_eq!(replies[0], Reply::ack());
        assert_eq!(
            replies[1],
            Reply::edit("Выбрано: Присед\n\nВведите вес (в кг):")
        );

        let replies = d.handle(&message(42, "abc"));
        assert_eq!(
            replies,
            vec![Reply::send(
                "Пожалуйста, введите корректный вес (число больше 0):"
            )]
        );

        let replies = d.handle(&message(42, "80"));
        assert_eq!(replies, vec![Reply::send("Введите количество повторений:")]);

        let replies = d.handle(&message(42, "10"));
        assert_eq!(
            replies,
            vec![Reply::send(
                "✅ Упражнение записано!\n\nПрисед: 80кг × 10 повторений"
            )]
        );

        let user = d.db.lookup_user_id(42).unwrap().unwrap();
        let sets = d.db.sets_on_date(user, Utc::now().date_naive()).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].set_number, 1);

        // The flow is over; more text falls back to the hint
        let replies = d.handle(&message(42, "еще 80"));
        assert!(sent_text(&replies[0]).starts_with("Используйте кнопки меню"));
    }

    #[test]
    fn test_command_cancels_active_flow() {
        let mut d = dispatcher();
        d.handle(&message(42, "/start"));

        let replies = d.handle(&message(42, "/create"));
        assert_eq!(
            replies,
            vec![Reply::send("Введите название нового упражнения:")]
        );

        // Starting another flow abandons the name prompt
        d.handle(&message(42, "/add"));
        let replies = d.handle(&message(42, "Моя тяга"));
        assert!(
            sent_text(&replies[0]).starts_with("Используйте кнопки меню"),
            "create flow should be dead after /add"
        );
    }

    #[test]
    fn test_text_during_selection_falls_through() {
        let mut d = dispatcher();
        d.handle(&message(42, "/start"));
        d.handle(&message(42, "/add"));

        // The catalog keyboard awaits a button press, not text
        let replies = d.handle(&message(42, "Присед"));
        assert!(sent_text(&replies[0]).starts_with("Используйте кнопки меню"));
    }

    #[test]
    fn test_addset_scenario_numbers_sets() {
        let mut d = dispatcher();
        let squat = squat_id(&d);
        d.handle(&message(42, "/start"));

        // First set through /add
        d.handle(&message(42, "/add"));
        d.handle(&callback(42, &format!("exercise_{squat}")));
        d.handle(&message(42, "100"));
        d.handle(&message(42, "5"));

        // Second set through /addset
        let replies = d.handle(&message(42, "/addset"));
        let Reply::Send { text: prompt, markup } = &replies[0] else {
            panic!("expected a send reply");
        };
        assert_eq!(prompt, "Выберите упражнение для добавления подхода:");
        let Some(ReplyMarkup::Inline(keyboard)) = markup else {
            panic!("expected an inline keyboard");
        };
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Присед (1 подх.)");

        d.handle(&callback(42, &format!("addset_{squat}")));
        d.handle(&message(42, "102.5"));
        let replies = d.handle(&message(42, "3"));
        assert_eq!(
            replies,
            vec![Reply::send(
                "✅ Подход добавлен!\n\nПрисед - Подход 2: 102.5кг × 3 повторений"
            )]
        );
    }

    #[test]
    fn test_addset_new_exercise_escape() {
        let mut d = dispatcher();
        let squat = squat_id(&d);
        d.handle(&message(42, "/start"));
        d.handle(&message(42, "/add"));
        d.handle(&callback(42, &format!("exercise_{squat}")));
        d.handle(&message(42, "100"));
        d.handle(&message(42, "5"));

        d.handle(&message(42, "/addset"));
        let replies = d.handle(&callback(42, "addset_new"));
        assert_eq!(
            replies,
            vec![
                Reply::ack(),
                Reply::edit("Используйте команду /add для добавления нового упражнения"),
            ]
        );
        // The slot is free again
        let replies = d.handle(&message(42, "80"));
        assert!(sent_text(&replies[0]).starts_with("Используйте кнопки меню"));
    }

    #[test]
    fn test_history_custom_date_scenario() {
        let mut d = dispatcher();
        d.handle(&message(42, "/start"));
        d.handle(&message(42, "/history"));

        let replies = d.handle(&callback(42, "history_custom_date"));
        assert_eq!(replies[0], Reply::ack());
        assert_eq!(
            replies[1],
            Reply::edit("Введите дату в формате ДД.ММ.ГГГГ (например: 22.07.2024):")
        );

        let replies = d.handle(&message(42, "31.02.2024"));
        assert_eq!(
            replies,
            vec![Reply::send(
                "Неверный формат даты. Используйте формат ДД.ММ.ГГГГ (например: 22.07.2024):"
            )]
        );

        let replies = d.handle(&message(42, "22.07.2024"));
        assert_eq!(
            replies,
            vec![Reply::send(
                "Тренировки за 22 июля 2024 г.:\n\nТренировок не найдено."
            )]
        );
    }

    #[test]
    fn test_unknown_callback_is_acked() {
        let mut d = dispatcher();
        let replies = d.handle(&callback(42, "bogus_token"));
        assert_eq!(replies, vec![Reply::ack()]);
    }

    #[test]
    fn test_help_via_command_and_label() {
        let mut d = dispatcher();
        let by_command = d.handle(&message(42, "/help"));
        let by_label = d.handle(&message(42, "ℹ️ Помощь"));
        assert_eq!(by_command, by_label);
        assert!(sent_text(&by_command[0]).contains("/create - Создать новое упражнение"));
    }
}
