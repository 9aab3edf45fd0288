//! Implements PresenterPort on the terminal.
//!
//! The ledger task never writes to the terminal itself: a prompt may be on
//! screen. Renders and notices are queued instead and the prompt thread
//! prints them through `ConsoleFeed::flush` between prompts. Only the latest
//! render is kept; notices are kept in order.

use crate::domain::{LedgerView, Notice};
use crate::ports::PresenterPort;
use crossterm::ExecutableCommand;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use std::io::{Write, stdout};
use tokio::sync::{mpsc, watch};

/// Terminal presenter. Hands views and notices over to a `ConsoleFeed`.
pub struct ConsolePresenter {
    latest: watch::Sender<LedgerView>,
    notices: mpsc::UnboundedSender<Notice>,
}

impl ConsolePresenter {
    pub fn new() -> (Self, ConsoleFeed) {
        let (latest, views) = watch::channel(LedgerView::default());
        let (notices, notice_rx) = mpsc::unbounded_channel();
        (
            Self { latest, notices },
            ConsoleFeed {
                views,
                notices: notice_rx,
            },
        )
    }
}

impl PresenterPort for ConsolePresenter {
    fn render(&self, view: &LedgerView) {
        self.latest.send_replace(view.clone());
    }

    fn notify(&self, notice: &Notice) {
        // Feed dropped means nobody is left to read it.
        let _ = self.notices.send(notice.clone());
    }
}

/// Output queued since the last flush.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PendingOutput {
    pub view: Option<LedgerView>,
    pub notices: Vec<Notice>,
}

impl PendingOutput {
    pub fn is_empty(&self) -> bool {
        self.view.is_none() && self.notices.is_empty()
    }
}

/// Reading side of the presenter, owned by whoever controls the terminal.
pub struct ConsoleFeed {
    views: watch::Receiver<LedgerView>,
    notices: mpsc::UnboundedReceiver<Notice>,
}

impl ConsoleFeed {
    /// A receiver of rendered views, e.g. for the startup spinner.
    pub fn views(&self) -> watch::Receiver<LedgerView> {
        self.views.clone()
    }

    /// Last rendered view, whether or not it was printed yet.
    pub fn current(&self) -> LedgerView {
        self.views.borrow().clone()
    }

    /// Drain everything queued: the newest unseen render and all notices.
    pub fn take_pending(&mut self) -> PendingOutput {
        let view = match self.views.has_changed() {
            Ok(true) => Some(self.views.borrow_and_update().clone()),
            _ => None,
        };
        let mut notices = Vec::new();
        while let Ok(notice) = self.notices.try_recv() {
            notices.push(notice);
        }
        PendingOutput { view, notices }
    }

    /// Print whatever is queued. Call only while no prompt is active.
    pub fn flush(&mut self) {
        let pending = self.take_pending();
        if !pending.is_empty() {
            print_output(&pending);
        }
    }
}

fn print_output(pending: &PendingOutput) {
    let mut out = stdout();
    if let Some(view) = &pending.view {
        let _ = out.execute(Print("\r\n"));
        for (i, line) in render_lines(view).iter().enumerate() {
            if i == 0 {
                let _ = out.execute(SetForegroundColor(Color::Yellow));
            }
            let _ = out.execute(Print(line));
            let _ = out.execute(Print("\r\n"));
            if i == 0 {
                let _ = out.execute(ResetColor);
            }
        }
    }
    for notice in &pending.notices {
        let _ = out.execute(SetForegroundColor(Color::Red));
        let _ = out.execute(Print(format!("! {}\r\n", notice)));
        let _ = out.execute(ResetColor);
    }
    let _ = out.flush();
}

/// Plain-text layout of one render pass.
pub fn render_lines(view: &LedgerView) -> Vec<String> {
    let mut lines = vec![format!("Total expenses: ${}", view.total)];

    lines.push("Expenses:".to_string());
    if view.expenses.is_empty() {
        lines.push("  (none)".to_string());
    }
    for expense in &view.expenses {
        lines.push(format!("  {}: ${}", expense.category, expense.amount));
    }

    lines.push("Travelers:".to_string());
    if view.travelers.is_empty() {
        lines.push("  (none)".to_string());
    }
    for traveler in &view.travelers {
        match traveler.amount_owed {
            Some(owed) => lines.push(format!("  {}: ${}", traveler.name, owed)),
            None => lines.push(format!("  {}", traveler.name)),
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Expense, Owed, RecordId, TravelerView};

    #[test]
    fn test_render_lines_with_split() {
        let view = LedgerView {
            expenses: vec![
                Expense {
                    id: RecordId::new("k1"),
                    category: "Food".into(),
                    amount: 30,
                },
                Expense {
                    id: RecordId::new("k2"),
                    category: "Gas".into(),
                    amount: 20,
                },
            ],
            travelers: vec![TravelerView {
                id: RecordId::new("t1"),
                name: "A".into(),
                amount_owed: Some(Owed::from_cents(5000)),
            }],
            total: 50,
        };
        assert_eq!(
            render_lines(&view),
            vec![
                "Total expenses: $50",
                "Expenses:",
                "  Food: $30",
                "  Gas: $20",
                "Travelers:",
                "  A: $50.00",
            ]
        );
    }

    #[test]
    fn test_render_lines_empty() {
        assert_eq!(
            render_lines(&LedgerView::default()),
            vec!["Total expenses: $0", "Expenses:", "  (none)", "Travelers:", "  (none)"]
        );
    }

    fn total(total: u64) -> LedgerView {
        LedgerView {
            total,
            ..Default::default()
        }
    }

    #[test]
    fn test_only_latest_render_is_queued() {
        let (presenter, mut feed) = ConsolePresenter::new();
        presenter.render(&total(7));
        presenter.render(&total(9));

        let pending = feed.take_pending();
        assert_eq!(pending.view, Some(total(9)));
        assert!(pending.notices.is_empty());
        assert!(feed.take_pending().is_empty());
        assert_eq!(feed.current().total, 9);
    }

    #[test]
    fn test_notices_are_queued_in_order() {
        let (presenter, mut feed) = ConsolePresenter::new();
        presenter.notify(&Notice::new("first"));
        presenter.render(&total(3));
        presenter.notify(&Notice::new("second"));

        let pending = feed.take_pending();
        assert_eq!(pending.view, Some(total(3)));
        assert_eq!(
            pending.notices,
            vec![Notice::new("first"), Notice::new("second")]
        );
        assert!(feed.take_pending().is_empty());
    }

    #[test]
    fn test_nothing_pending_before_first_render() {
        let (_presenter, mut feed) = ConsolePresenter::new();
        assert!(feed.take_pending().is_empty());
    }

    #[tokio::test]
    async fn test_views_receiver_sees_renders() {
        let (presenter, feed) = ConsolePresenter::new();
        let mut views = feed.views();
        presenter.render(&total(4));
        views.changed().await.unwrap();
        assert_eq!(views.borrow().total, 4);
    }
}
