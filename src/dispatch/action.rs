//! Enumerated user actions: slash commands, reply-keyboard labels and
//! inline-keyboard callback tokens. All parsing and encoding of these
//! lives here so the wire strings appear exactly once.

// ==================== Commands ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Add,
    AddSet,
    History,
    Create,
    Help,
}

impl Command {
    /// Parse the leading token of a message. Accepts the `@botname`
    /// suffix Telegram appends in group chats. Unknown commands return
    /// `None` and fall through to text handling.
    pub fn parse(text: &str) -> Option<Command> {
        let first = text.split_whitespace().next()?;
        let bare = first.split('@').next().unwrap_or(first);
        match bare {
            "/start" => Some(Command::Start),
            "/add" => Some(Command::Add),
            "/addset" => Some(Command::AddSet),
            "/history" => Some(Command::History),
            "/create" => Some(Command::Create),
            "/help" => Some(Command::Help),
            _ => None,
        }
    }
}

// ==================== Menu labels ====================

/// Buttons on the persistent reply keyboard. Each maps onto the same
/// handler as the corresponding command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    LogExercise,
    LogSet,
    History,
    Help,
}

impl MenuAction {
    const ALL: [MenuAction; 4] = [
        MenuAction::LogExercise,
        MenuAction::LogSet,
        MenuAction::History,
        MenuAction::Help,
    ];

    pub fn label(self) -> &'static str {
        match self {
            MenuAction::LogExercise => "📝 Добавить упражнение",
            MenuAction::LogSet => "🔄 Добавить подход",
            MenuAction::History => "📊 История тренировок",
            MenuAction::Help => "ℹ️ Помощь",
        }
    }

    pub fn from_label(text: &str) -> Option<MenuAction> {
        Self::ALL.into_iter().find(|action| action.label() == text)
    }
}

// ==================== Callback tokens ====================

/// Decoded `callback_data` of an inline keyboard button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Catalog pick in the add-exercise flow
    Exercise(i64),
    /// Today's-exercise pick in the add-set flow
    AddSet(i64),
    /// "New exercise" escape at the bottom of the add-set keyboard
    AddSetNew,
    /// History menu choice
    History(HistoryAction),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<CallbackAction> {
        if let Some(rest) = data.strip_prefix("exercise_") {
            return rest.parse().ok().map(CallbackAction::Exercise);
        }
        if data == "addset_new" {
            return Some(CallbackAction::AddSetNew);
        }
        if let Some(rest) = data.strip_prefix("addset_") {
            return rest.parse().ok().map(CallbackAction::AddSet);
        }
        HistoryAction::parse(data).map(CallbackAction::History)
    }

    pub fn encode(self) -> String {
        match self {
            CallbackAction::Exercise(id) => format!("exercise_{id}"),
            CallbackAction::AddSet(id) => format!("addset_{id}"),
            CallbackAction::AddSetNew => "addset_new".to_string(),
            CallbackAction::History(action) => action.token().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Today,
    Yesterday,
    WeekAgo,
    CustomDate,
    Period,
}

impl HistoryAction {
    pub fn token(self) -> &'static str {
        match self {
            HistoryAction::Today => "history_today",
            HistoryAction::Yesterday => "history_yesterday",
            HistoryAction::WeekAgo => "history_week_ago",
            HistoryAction::CustomDate => "history_custom_date",
            HistoryAction::Period => "history_period",
        }
    }

    fn parse(token: &str) -> Option<HistoryAction> {
        match token {
            "history_today" => Some(HistoryAction::Today),
            "history_yesterday" => Some(HistoryAction::Yesterday),
            "history_week_ago" => Some(HistoryAction::WeekAgo),
            "history_custom_date" => Some(HistoryAction::CustomDate),
            "history_period" => Some(HistoryAction::Period),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_parse() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/addset"), Some(Command::AddSet));
        assert_eq!(Command::parse("/add@WorkoutBot"), Some(Command::Add));
        assert_eq!(Command::parse("/history что-нибудь"), Some(Command::History));
        assert_eq!(Command::parse("/unknown"), None);
        assert_eq!(Command::parse("привет"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_menu_label_round_trip() {
        for action in MenuAction::ALL {
            assert_eq!(MenuAction::from_label(action.label()), Some(action));
        }
        assert_eq!(MenuAction::from_label("Помощь"), None);
    }

    #[test]
    fn test_callback_round_trip() {
        let actions = [
            CallbackAction::Exercise(7),
            CallbackAction::AddSet(12),
            CallbackAction::AddSetNew,
            CallbackAction::History(HistoryAction::Today),
            CallbackAction::History(HistoryAction::WeekAgo),
            CallbackAction::History(HistoryAction::Period),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.encode()), Some(action));
        }
    }

    #[test]
    fn test_callback_wire_format() {
        assert_eq!(CallbackAction::Exercise(3).encode(), "exercise_3");
        assert_eq!(CallbackAction::AddSet(5).encode(), "addset_5");
        assert_eq!(CallbackAction::AddSetNew.encode(), "addset_new");
        assert_eq!(
            CallbackAction::History(HistoryAction::CustomDate).encode(),
            "history_custom_date"
        );
    }

    #[test]
    fn test_callback_rejects_garbage() {
        assert_eq!(CallbackAction::parse("exercise_abc"), None);
        assert_eq!(CallbackAction::parse("addset_"), None);
        assert_eq!(CallbackAction::parse("history_tomorrow"), None);
        assert_eq!(CallbackAction::parse(""), None);
        assert_eq!(CallbackAction::parse("something_else"), None);
    }
}
