//! Operator command parsing and dispatch for terminal front ends.

use qaboard_sync::QuestionId;

use crate::board_session::BoardSession;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardCommand {
    Help,
    List,
    Page(usize),
    Next,
    Previous,
    Ask(String),
    Draft {
        question_id: QuestionId,
        text: String,
    },
    Answer {
        question_id: QuestionId,
        text: Option<String>,
    },
    Resolve(QuestionId),
    Escalate(QuestionId),
    Name(String),
    Login {
        email: String,
        password: String,
    },
    Register {
        username: String,
        email: String,
        password: String,
        confirm_password: String,
    },
    Logout,
    Dismiss,
    Status,
    Quit,
    Invalid {
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// What the front end should do after a command ran.
pub enum CommandEffect {
    Render,
    Message(String),
    Quit,
}

pub fn board_command_usage() -> String {
    [
        "Commands:",
        "  help                                   show this help",
        "  list                                   redraw the current page",
        "  page <n> | next | prev                 move between pages",
        "  ask <text>                             submit a question",
        "  draft <id> <text>                      edit the answer draft for a question",
        "  answer <id> [text]                     submit an answer (uses the draft when text is omitted)",
        "  resolve <id>                           mark a question answered (admin)",
        "  escalate <id>                          escalate a question (admin)",
        "  name <name>                            set your display name",
        "  login <email> <password>               sign in as admin",
        "  register <username> <email> <password> <confirm>",
        "  logout                                 leave admin mode",
        "  dismiss                                dismiss the admin notification",
        "  status                                 show connection and session status",
        "  quit                                   exit",
    ]
    .join("\n")
}

/// Parses one input line. Blank lines yield `None`.
pub fn parse_board_command(line: &str) -> Option<BoardCommand> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default().to_ascii_lowercase();
    let remainder = parts.next().unwrap_or_default().trim();
    let parsed = match command.as_str() {
        "help" | "?" => no_args(remainder, BoardCommand::Help, "help"),
        "list" | "ls" => no_args(remainder, BoardCommand::List, "list"),
        "next" => no_args(remainder, BoardCommand::Next, "next"),
        "prev" | "previous" => no_args(remainder, BoardCommand::Previous, "prev"),
        "logout" => no_args(remainder, BoardCommand::Logout, "logout"),
        "dismiss" => no_args(remainder, BoardCommand::Dismiss, "dismiss"),
        "status" => no_args(remainder, BoardCommand::Status, "status"),
        "quit" | "exit" => no_args(remainder, BoardCommand::Quit, "quit"),
        "page" => match remainder.parse::<usize>() {
            Ok(page) => BoardCommand::Page(page),
            Err(_) => invalid("page <n>"),
        },
        "ask" => {
            if remainder.is_empty() {
                invalid("ask <text>")
            } else {
                BoardCommand::Ask(remainder.to_string())
            }
        }
        "draft" => match split_id_and_text(remainder) {
            Some((question_id, text)) => BoardCommand::Draft {
                question_id,
                text: text.to_string(),
            },
            None => invalid("draft <id> <text>"),
        },
        "answer" => match split_id_and_text(remainder) {
            Some((question_id, text)) => BoardCommand::Answer {
                question_id,
                text: (!text.is_empty()).then(|| text.to_string()),
            },
            None => invalid("answer <id> [text]"),
        },
        "resolve" => match parse_question_id(remainder) {
            Some(question_id) => BoardCommand::Resolve(question_id),
            None => invalid("resolve <id>"),
        },
        "escalate" => match parse_question_id(remainder) {
            Some(question_id) => BoardCommand::Escalate(question_id),
            None => invalid("escalate <id>"),
        },
        "name" => {
            if remainder.is_empty() {
                invalid("name <name>")
            } else {
                BoardCommand::Name(remainder.to_string())
            }
        }
        "login" => {
            let args = remainder.split_whitespace().collect::<Vec<_>>();
            match args.as_slice() {
                [email, password] => BoardCommand::Login {
                    email: email.to_string(),
                    password: password.to_string(),
                },
                _ => invalid("login <email> <password>"),
            }
        }
        "register" => {
            let args = remainder.split_whitespace().collect::<Vec<_>>();
            match args.as_slice() {
                [username, email, password, confirm_password] => BoardCommand::Register {
                    username: username.to_string(),
                    email: email.to_string(),
                    password: password.to_string(),
                    confirm_password: confirm_password.to_string(),
                },
                _ => invalid("register <username> <email> <password> <confirm>"),
            }
        }
        other => BoardCommand::Invalid {
            message: format!("Unknown command '{other}'. Type 'help' for commands."),
        },
    };
    Some(parsed)
}

fn no_args(remainder: &str, command: BoardCommand, usage: &str) -> BoardCommand {
    if remainder.is_empty() {
        command
    } else {
        invalid(usage)
    }
}

fn invalid(usage: &str) -> BoardCommand {
    BoardCommand::Invalid {
        message: format!("Usage: {usage}"),
    }
}

fn parse_question_id(raw: &str) -> Option<QuestionId> {
    raw.trim().trim_start_matches('#').parse::<QuestionId>().ok()
}

fn split_id_and_text(remainder: &str) -> Option<(QuestionId, &str)> {
    let mut parts = remainder.splitn(2, char::is_whitespace);
    let question_id = parse_question_id(parts.next()?)?;
    Some((question_id, parts.next().unwrap_or_default().trim()))
}

/// Runs a parsed command against the session. Validation failures come
/// back as messages; network results arrive later as session inputs.
pub fn execute_board_command(session: &mut BoardSession, command: BoardCommand) -> CommandEffect {
    match command {
        BoardCommand::Help => CommandEffect::Message(board_command_usage()),
        BoardCommand::List | BoardCommand::Status => CommandEffect::Render,
        BoardCommand::Page(page) => {
            session.set_page(page);
            CommandEffect::Render
        }
        BoardCommand::Next => {
            session.next_page();
            CommandEffect::Render
        }
        BoardCommand::Previous => {
            session.previous_page();
            CommandEffect::Render
        }
        BoardCommand::Ask(text) => {
            session.set_question_draft(&text);
            match session.submit_question() {
                Ok(()) => CommandEffect::Message("Sending question...".to_string()),
                Err(error) => CommandEffect::Message(error.to_string()),
            }
        }
        BoardCommand::Draft { question_id, text } => {
            session.set_answer_draft(question_id, &text);
            CommandEffect::Render
        }
        BoardCommand::Answer { question_id, text } => {
            if let Some(text) = text {
                session.set_answer_draft(question_id, &text);
            }
            match session.submit_answer(question_id) {
                Ok(()) => CommandEffect::Message(format!("Sending answer to #{question_id}...")),
                Err(_) => CommandEffect::Render,
            }
        }
        BoardCommand::Resolve(question_id) => match session.mark_answered(question_id) {
            Ok(()) => CommandEffect::Message(format!("Marking #{question_id} as answered...")),
            Err(_) => CommandEffect::Render,
        },
        BoardCommand::Escalate(question_id) => match session.escalate(question_id) {
            Ok(()) => CommandEffect::Message(format!("Escalating #{question_id}...")),
            Err(_) => CommandEffect::Render,
        },
        BoardCommand::Name(name) => {
            session.set_user_name(&name);
            CommandEffect::Message(format!("Display name set to '{}'.", session.user_name()))
        }
        BoardCommand::Login { email, password } => match session.login(&email, &password) {
            Ok(()) => CommandEffect::Message("Signing in...".to_string()),
            Err(_) => CommandEffect::Render,
        },
        BoardCommand::Register {
            username,
            email,
            password,
            confirm_password,
        } => match session.register(&username, &email, &password, &confirm_password) {
            Ok(()) => CommandEffect::Message("Registering...".to_string()),
            Err(_) => CommandEffect::Render,
        },
        BoardCommand::Logout => {
            session.logout();
            CommandEffect::Render
        }
        BoardCommand::Dismiss => {
            session.dismiss_notification();
            CommandEffect::Render
        }
        BoardCommand::Quit => CommandEffect::Quit,
        BoardCommand::Invalid { message } => CommandEffect::Message(message),
    }
}
