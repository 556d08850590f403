mod view;

use std::borrow::Cow::{self, Borrowed, Owned};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use colored::Colorize;
use rustyline::Editor;
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};
use tracing_subscriber::EnvFilter;

use lumunus_core::LumunusConfig;
use lumunus_core::session::Outcome;
use lumunus_execution::{PrepEngine, Scheduler, TokioScheduler, TurnEngine};
use view::{PrepView, TurnView};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Chat,
    Prep,
}

impl Mode {
    fn prompt(&self) -> &'static str {
        match self {
            Mode::Chat => "chat> ",
            Mode::Prep => "prep> ",
        }
    }
}

/// A slash command: its name, the argument placeholder shown as a hint, and
/// the mode it belongs to (`None` for both).
struct Command {
    name: &'static str,
    args: &'static str,
    mode: Option<Mode>,
}

impl Command {
    fn available_in(&self, mode: Mode) -> bool {
        self.mode.is_none_or(|only| only == mode)
    }
}

const COMMANDS: &[Command] = &[
    Command { name: "/chat", args: "", mode: None },
    Command { name: "/prep", args: "", mode: None },
    Command { name: "/pass", args: "", mode: Some(Mode::Chat) },
    Command { name: "/revise", args: "", mode: Some(Mode::Prep) },
    Command { name: "/accept", args: "", mode: Some(Mode::Prep) },
    Command { name: "/reset", args: "", mode: None },
    Command { name: "/session", args: "<id>", mode: None },
];

/// Completes, hints and highlights the slash commands of the active mode.
struct CommandHelper {
    mode: Mode,
}

impl CommandHelper {
    fn new(mode: Mode) -> Self {
        Self { mode }
    }

    fn commands(&self) -> impl Iterator<Item = &'static Command> + '_ {
        COMMANDS.iter().filter(|cmd| cmd.available_in(self.mode))
    }

    fn lookup(&self, name: &str) -> Option<&'static Command> {
        self.commands().find(|cmd| cmd.name == name)
    }

    /// Rest of the command name while typing it, then its argument placeholder.
    fn hint_for(&self, line: &str) -> Option<String> {
        if !line.starts_with('/') {
            return None;
        }
        match line.split_once(' ') {
            None => {
                if let Some(cmd) = self.lookup(line) {
                    return (!cmd.args.is_empty()).then(|| format!(" {}", cmd.args));
                }
                self.commands()
                    .find(|cmd| cmd.name.starts_with(line))
                    .map(|cmd| cmd.name[line.len()..].to_string())
            }
            Some((name, rest)) if rest.is_empty() => self
                .lookup(name)
                .filter(|cmd| !cmd.args.is_empty())
                .map(|cmd| cmd.args.to_string()),
            Some(_) => None,
        }
    }

    fn completions(&self, line: &str) -> Vec<Pair> {
        if !line.starts_with('/') || line.contains(' ') {
            return Vec::new();
        }
        self.commands()
            .filter(|cmd| cmd.name.starts_with(line))
            .map(|cmd| Pair {
                display: cmd.name.to_string(),
                replacement: if cmd.args.is_empty() {
                    cmd.name.to_string()
                } else {
                    format!("{} ", cmd.name)
                },
            })
            .collect()
    }
}

impl Helper for CommandHelper {}

impl Completer for CommandHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        Ok((0, self.completions(&line[..pos])))
    }
}

impl Highlighter for CommandHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        let (name, rest) = line.split_at(line.find(' ').unwrap_or(line.len()));
        let name = if self.lookup(name).is_some() {
            name.bright_cyan()
        } else {
            name.yellow()
        };
        Owned(format!("{name}{rest}"))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CommandHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.hint_for(line)
    }
}

impl Validator for CommandHelper {}

/// Both engines and their views.
struct App {
    turn: TurnEngine,
    prep: PrepEngine,
    turn_view: Arc<Mutex<TurnView>>,
    prep_view: Arc<Mutex<PrepView>>,
    mode: Mode,
}

impl App {
    fn new(config: LumunusConfig, scheduler: Arc<dyn Scheduler>) -> Result<Self> {
        let participants = config.turn.participants.clone();
        let turn = TurnEngine::new(config.turn, Arc::clone(&scheduler))?;
        let prep = PrepEngine::new(config.prep, scheduler)?;

        let turn_view = Arc::new(Mutex::new(TurnView::new(
            participants.clone(),
            turn.snapshot(),
        )));
        let prep_view = Arc::new(Mutex::new(PrepView::new(participants, prep.snapshot())));

        let sink = Arc::clone(&turn_view);
        let _ = turn.subscribe(move |snapshot| {
            if let Ok(mut view) = sink.lock() {
                view.render(snapshot);
            }
        });
        let sink = Arc::clone(&prep_view);
        let _ = prep.subscribe(move |snapshot| {
            if let Ok(mut view) = sink.lock() {
                view.render(snapshot);
            }
        });

        tracing::debug!(
            turn_session = %turn.session_id(),
            prep_session = %prep.session_id(),
            "Engines ready"
        );
        Ok(Self {
            turn,
            prep,
            turn_view,
            prep_view,
            mode: Mode::Chat,
        })
    }

    /// Activates `mode`. Its view prints whatever it has not shown yet.
    fn switch(&mut self, mode: Mode) {
        self.mode = mode;
        if let Ok(mut view) = self.turn_view.lock() {
            view.set_active(mode == Mode::Chat);
        }
        if let Ok(mut view) = self.prep_view.lock() {
            view.set_active(mode == Mode::Prep);
        }
    }

    fn reset(&self) {
        match self.mode {
            Mode::Chat => self.turn.reset_session(),
            Mode::Prep => self.prep.reset_session(),
        }
    }

    fn bind(&self, session_id: &str) {
        let rebound_turn = self.turn.bind_session(session_id);
        let rebound_prep = self.prep.bind_session(session_id);
        if !rebound_turn && !rebound_prep {
            println!("{}", format!("Already on session {session_id}").bright_black());
        }
    }

    /// Routes input to the active engine. `None` for commands the mode does not know.
    fn handle(&self, input: &str) -> Option<Outcome> {
        let outcome = match (self.mode, input) {
            (Mode::Chat, "/pass") => self.turn.pass_turn(),
            (Mode::Prep, "/revise") => self.prep.revise_invitation(),
            (Mode::Prep, "/accept") => self.prep.accept_invitation(),
            (_, command) if command.starts_with('/') => return None,
            (Mode::Chat, text) => self.turn.send_message(text),
            (Mode::Prep, text) => self.prep.send_message(text),
        };
        Some(outcome)
    }

    fn rejection_hint(&self, input: &str) -> &'static str {
        match (self.mode, input) {
            (Mode::Chat, _) => "Not your turn yet.",
            (Mode::Prep, "/revise" | "/accept") => "No invitation preview to act on.",
            (Mode::Prep, _) => "Wait for the reply before sending more.",
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// The main entry point for the Lumunus REPL.
///
/// Chat mode drives the three-party conversation, prep mode the private
/// preparation dialogue. Replies arrive asynchronously on the tokio runtime
/// and are printed by the snapshot listeners.
#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = LumunusConfig::load_or_default()?;
    let scheduler: Arc<dyn Scheduler> = Arc::new(TokioScheduler::current()?);
    let mut app = App::new(config, scheduler)?;

    // ===== REPL Setup =====
    let helper = CommandHelper::new(Mode::Chat);
    let mut rl = Editor::new()?;
    rl.set_helper(Some(helper));

    println!("{}", "=== Lumunus ===".bright_magenta().bold());
    println!(
        "{}",
        "Type to speak. /pass yields your turn, /prep and /chat switch dialogues, /reset starts over, 'quit' exits."
            .bright_black()
    );
    println!();
    app.switch(Mode::Chat);

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(app.mode.prompt()) {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match trimmed {
                    "/chat" | "/prep" => {
                        let mode = if trimmed == "/chat" {
                            Mode::Chat
                        } else {
                            Mode::Prep
                        };
                        app.switch(mode);
                        if let Some(helper) = rl.helper_mut() {
                            helper.mode = mode;
                        }
                    }
                    "/reset" => app.reset(),
                    "/session" => println!("{}", "Usage: /session <id>".bright_black()),
                    _ => {
                        if let Some(session_id) = trimmed.strip_prefix("/session ") {
                            app.bind(session_id.trim());
                            continue;
                        }
                        match app.handle(trimmed) {
                            Some(Outcome::Rejected) => {
                                println!("{}", app.rejection_hint(trimmed).yellow());
                            }
                            Some(_) => {}
                            None => println!("{}", "Unknown command".bright_black()),
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_completes_name_then_shows_arguments() {
        let helper = CommandHelper::new(Mode::Chat);
        assert_eq!(helper.hint_for("/ses"), Some("sion".to_string()));
        assert_eq!(helper.hint_for("/session"), Some(" <id>".to_string()));
        assert_eq!(helper.hint_for("/session "), Some("<id>".to_string()));
        assert_eq!(helper.hint_for("/session abc"), None);
        assert_eq!(helper.hint_for("/pass"), None);
        assert_eq!(helper.hint_for("hello"), None);
    }

    #[test]
    fn test_commands_follow_mode() {
        let chat = CommandHelper::new(Mode::Chat);
        let prep = CommandHelper::new(Mode::Prep);

        assert_eq!(chat.hint_for("/pa"), Some("ss".to_string()));
        assert_eq!(prep.hint_for("/pa"), None);
        assert!(chat.completions("/ac").is_empty());
        assert_eq!(prep.completions("/ac")[0].replacement, "/accept");
    }

    #[test]
    fn test_argument_commands_complete_with_space() {
        let helper = CommandHelper::new(Mode::Prep);
        let candidates = helper.completions("/s");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].display, "/session");
        assert_eq!(candidates[0].replacement, "/session ");
        assert!(helper.completions("/session x").is_empty());
    }
}
