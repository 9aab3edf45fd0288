//! Implements InputPort. Inquire-based interactive prompts.
//!
//! Main menu for expenses; travelers live in their own sub-menu (the
//! "travelers dialog") that is opened from and closed back to the main menu.
//! Prompts block, so the loop runs on the blocking pool and hands intents to
//! the ledger through the channel. Queued ledger output is printed before
//! each menu, never while a prompt is on screen.

use crate::adapters::ui::presenter::ConsoleFeed;
use crate::domain::{DomainError, Intent, LedgerView, RecordId};
use crate::ports::InputPort;
use async_trait::async_trait;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{CustomType, InquireError, Select, Text};
use std::fmt;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::debug;

/// Applies the prompt theme for all subsequent inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("$").with_fg(Color::LightYellow))
        .with_highlighted_option_prefix(Styled::new(">").with_fg(Color::LightMagenta));
    inquire::set_global_render_config(config);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MainAction {
    AddExpense,
    DeleteExpense,
    Travelers,
    Quit,
}

impl MainAction {
    const ALL: [MainAction; 4] = [
        MainAction::AddExpense,
        MainAction::DeleteExpense,
        MainAction::Travelers,
        MainAction::Quit,
    ];
}

impl fmt::Display for MainAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MainAction::AddExpense => "Add expense",
            MainAction::DeleteExpense => "Delete expense",
            MainAction::Travelers => "Travelers...",
            MainAction::Quit => "Quit",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TravelerAction {
    Add,
    Remove,
    Close,
}

impl TravelerAction {
    const ALL: [TravelerAction; 3] = [
        TravelerAction::Add,
        TravelerAction::Remove,
        TravelerAction::Close,
    ];
}

impl fmt::Display for TravelerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TravelerAction::Add => "Add traveler",
            TravelerAction::Remove => "Remove traveler",
            TravelerAction::Close => "Close",
        })
    }
}

/// A record offered for deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
struct RecordChoice {
    id: RecordId,
    label: String,
}

impl fmt::Display for RecordChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

fn expense_choices(view: &LedgerView) -> Vec<RecordChoice> {
    view.expenses
        .iter()
        .map(|e| RecordChoice {
            id: e.id.clone(),
            label: format!("{}: ${}", e.category, e.amount),
        })
        .collect()
}

fn traveler_choices(view: &LedgerView) -> Vec<RecordChoice> {
    view.travelers
        .iter()
        .map(|t| RecordChoice {
            id: t.id.clone(),
            label: match t.amount_owed {
                Some(owed) => format!("{}: ${}", t.name, owed),
                None => t.name.clone(),
            },
        })
        .collect()
}

/// Esc / Ctrl-C become `None`; other prompt failures are errors.
fn answered<T>(res: Result<T, InquireError>) -> Result<Option<T>, DomainError> {
    match res {
        Ok(v) => Ok(Some(v)),
        Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => Ok(None),
        Err(e) => Err(DomainError::Input(e.to_string())),
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    feed: Arc<Mutex<ConsoleFeed>>,
}

impl TuiInputPort {
    pub fn new(feed: Arc<Mutex<ConsoleFeed>>) -> Self {
        Self { feed }
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self, intents: mpsc::Sender<Intent>) -> Result<(), DomainError> {
        let feed = Arc::clone(&self.feed);
        tokio::task::spawn_blocking(move || {
            let mut feed = feed
                .lock()
                .map_err(|_| DomainError::Input("console feed lock poisoned".into()))?;
            prompt_loop(&mut feed, &intents)
        })
        .await
        .map_err(|e| DomainError::Input(format!("prompt task failed: {}", e)))?
    }
}

/// Returns when the user quits or the ledger stops listening.
fn prompt_loop(feed: &mut ConsoleFeed, intents: &mpsc::Sender<Intent>) -> Result<(), DomainError> {
    loop {
        feed.flush();
        let action = answered(Select::new("What next?", MainAction::ALL.to_vec()).prompt())?
            .unwrap_or(MainAction::Quit);
        let intent = match action {
            MainAction::AddExpense => prompt_expense()?,
            MainAction::DeleteExpense => {
                let choices = expense_choices(&feed.current());
                pick_record("Delete which expense?", choices)?.map(Intent::DeleteExpense)
            }
            MainAction::Travelers => {
                if !travelers_dialog(feed, intents)? {
                    return Ok(());
                }
                continue;
            }
            MainAction::Quit => Some(Intent::Quit),
        };
        let Some(intent) = intent else {
            continue;
        };
        let quitting = intent == Intent::Quit;
        if !send(intents, intent) || quitting {
            return Ok(());
        }
    }
}

/// Travelers sub-menu. Returns false if the ledger stopped listening.
fn travelers_dialog(
    feed: &mut ConsoleFeed,
    intents: &mpsc::Sender<Intent>,
) -> Result<bool, DomainError> {
    debug!("travelers dialog opened");
    loop {
        feed.flush();
        let action = answered(Select::new("Travelers", TravelerAction::ALL.to_vec()).prompt())?
            .unwrap_or(TravelerAction::Close);
        let intent = match action {
            TravelerAction::Add => answered(Text::new("Traveler name:").prompt())?
                .map(|name| Intent::SubmitTraveler { name }),
            TravelerAction::Remove => {
                let choices = traveler_choices(&feed.current());
                pick_record("Remove which traveler?", choices)?.map(Intent::RemoveTraveler)
            }
            TravelerAction::Close => {
                debug!("travelers dialog closed");
                return Ok(true);
            }
        };
        if let Some(intent) = intent {
            if !send(intents, intent) {
                return Ok(false);
            }
        }
    }
}

fn prompt_expense() -> Result<Option<Intent>, DomainError> {
    let Some(category) = answered(Text::new("Category:").prompt())? else {
        return Ok(None);
    };
    let amount = answered(
        CustomType::<u64>::new("Amount ($):")
            .with_error_message("Enter a whole, non-negative amount")
            .prompt(),
    )?;
    Ok(amount.map(|amount| Intent::SubmitExpense { category, amount }))
}

fn pick_record(prompt: &str, choices: Vec<RecordChoice>) -> Result<Option<RecordId>, DomainError> {
    if choices.is_empty() {
        println!("Nothing to pick.");
        return Ok(None);
    }
    Ok(answered(Select::new(prompt, choices).prompt())?.map(|choice| choice.id))
}

/// False once the ledger loop has gone away.
fn send(intents: &mpsc::Sender<Intent>, intent: Intent) -> bool {
    intents.blocking_send(intent).is_ok()
}
