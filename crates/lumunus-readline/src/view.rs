//! Snapshot renderers.
//!
//! Each view remembers how much of the transcript it has printed and only
//! prints the difference. Views only ever draw snapshots in the order the
//! engine delivered them: an inactive view keeps the latest one and draws it
//! when it is activated again.

use colored::{ColoredString, Colorize};
use lumunus_core::participant::{Participant, ParticipantTable};
use lumunus_core::session::{
    ConversationSnapshot, InvitationState, PrepPhase, PrepSnapshot, Role, StepStatus,
};
use strum::IntoEnumIterator;

fn paint(text: &str, participant: &Participant) -> ColoredString {
    match participant.rgb() {
        Some((r, g, b)) => text.truecolor(r, g, b),
        None => text.normal(),
    }
}

fn print_message(participant: &Participant, content: &str) {
    println!("{}", paint(&format!("[{}]", participant.name), participant).bold());
    for line in content.lines() {
        println!("{}", paint(line, participant));
    }
    println!();
}

fn thinking_line(participant: &Participant) {
    println!(
        "{}",
        paint(&format!("{} is thinking...", participant.name), participant).italic()
    );
}

pub struct TurnView {
    participants: ParticipantTable,
    latest: ConversationSnapshot,
    active: bool,
    session_id: Option<String>,
    shown: usize,
    thinking: Option<Role>,
    ai_takeover: bool,
}

impl TurnView {
    pub fn new(participants: ParticipantTable, initial: ConversationSnapshot) -> Self {
        Self {
            participants,
            latest: initial,
            active: false,
            session_id: None,
            shown: 0,
            thinking: None,
            ai_takeover: false,
        }
    }

    /// Activates or deactivates the view. Activation draws the latest snapshot.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            let latest = self.latest.clone();
            self.draw(&latest);
        }
    }

    pub fn render(&mut self, snapshot: &ConversationSnapshot) {
        self.latest = snapshot.clone();
        if self.active {
            self.draw(snapshot);
        }
    }

    fn draw(&mut self, snapshot: &ConversationSnapshot) {
        let rebound = self.session_id.as_deref() != Some(snapshot.session_id.as_str());
        if rebound || snapshot.messages.len() < self.shown {
            println!(
                "{}",
                format!("-- conversation {} --", snapshot.session_id).bright_black()
            );
            self.session_id = Some(snapshot.session_id.clone());
            self.shown = 0;
            self.thinking = None;
            self.ai_takeover = false;
        }

        for message in &snapshot.messages[self.shown..] {
            print_message(self.participants.get(message.sender), &message.content);
        }
        self.shown = snapshot.messages.len();

        if snapshot.ai_takeover && !self.ai_takeover {
            println!("{}", "The facilitator has the floor.".bright_black());
        }
        self.ai_takeover = snapshot.ai_takeover;

        if snapshot.thinking != self.thinking {
            if let Some(role) = snapshot.thinking {
                thinking_line(self.participants.get(role));
            }
            self.thinking = snapshot.thinking;
        }
    }
}

pub struct PrepView {
    participants: ParticipantTable,
    latest: PrepSnapshot,
    active: bool,
    session_id: Option<String>,
    shown: usize,
    phase: Option<PrepPhase>,
    invitation: InvitationState,
    thinking: bool,
}

impl PrepView {
    pub fn new(participants: ParticipantTable, initial: PrepSnapshot) -> Self {
        Self {
            participants,
            latest: initial,
            active: false,
            session_id: None,
            shown: 0,
            phase: None,
            invitation: InvitationState::NotReady,
            thinking: false,
        }
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        if active {
            let latest = self.latest.clone();
            self.draw(&latest);
        }
    }

    pub fn render(&mut self, snapshot: &PrepSnapshot) {
        self.latest = snapshot.clone();
        if self.active {
            self.draw(snapshot);
        }
    }

    fn draw(&mut self, snapshot: &PrepSnapshot) {
        let rebound = self.session_id.as_deref() != Some(snapshot.session_id.as_str());
        if rebound || snapshot.messages.len() < self.shown {
            println!(
                "{}",
                format!("-- prep session {} --", snapshot.session_id).bright_black()
            );
            self.session_id = Some(snapshot.session_id.clone());
            self.shown = 0;
            self.phase = None;
            self.invitation = InvitationState::NotReady;
            self.thinking = false;
        }

        if self.phase != Some(snapshot.phase) {
            println!("{}", progress(snapshot.phase));
            self.phase = Some(snapshot.phase);
        }

        for message in &snapshot.messages[self.shown..] {
            let participant = self.participants.get(Role::from(message.sender));
            print_message(participant, &message.content);
        }
        self.shown = snapshot.messages.len();

        if snapshot.thinking && !self.thinking {
            thinking_line(&self.participants.ai);
        }
        self.thinking = snapshot.thinking;

        if snapshot.invitation != self.invitation {
            self.render_invitation(snapshot);
            self.invitation = snapshot.invitation;
        }
    }

    fn render_invitation(&self, snapshot: &PrepSnapshot) {
        match snapshot.invitation {
            InvitationState::Previewing => {
                println!("{}", "Invitation preview".bright_yellow().bold());
                if let Some(summary) = &snapshot.summary {
                    for line in summary.lines() {
                        println!("  {}", line.yellow());
                    }
                }
                println!("{}", "Type /accept to use it or /revise to keep refining.".bright_black());
            }
            InvitationState::Revising => {
                println!("{}", "Preview hidden. Add more detail and it will return.".bright_black());
            }
            InvitationState::Accepted => {
                println!("{}", "Invitation accepted.".bright_green());
            }
            InvitationState::NotReady => {}
        }
    }
}

/// One-line progress indicator, e.g. `[x] Understanding  [>] Framing  [ ] Ready to Invite`.
fn progress(current: PrepPhase) -> String {
    PrepPhase::iter()
        .map(|step| {
            let label = step.label();
            match current.step_status(step) {
                StepStatus::Completed => format!("[x] {label}").green().to_string(),
                StepStatus::Active => format!("[>] {label}").bright_cyan().bold().to_string(),
                StepStatus::Upcoming => format!("[ ] {label}").bright_black().to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("  ")
}
