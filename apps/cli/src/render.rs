//! Terminal rendering of controller views.

use client_core::{Presenter, ViewState};
use shared::domain::{InteractionState, StatusMode, Verdict};

pub struct TerminalPresenter;

impl Presenter for TerminalPresenter {
    fn render(&mut self, view: &ViewState) {
        for line in render_lines(view) {
            if view.state == InteractionState::Error {
                eprintln!("{line}");
            } else {
                println!("{line}");
            }
        }
    }
}

pub fn render_lines(view: &ViewState) -> Vec<String> {
    match view.state {
        InteractionState::LoadingDataset => vec![format!("[..] {}", view.status.message)],
        InteractionState::Idle => vec![status_line(view)],
        InteractionState::Analyzing => vec![
            format!("Review: {}", view.review.as_deref().unwrap_or_default()),
            "[..] Analyzing".to_string(),
        ],
        InteractionState::ResultShown => vec![match &view.result {
            Some(result) => format!(
                "{} {} ({:.1}%)",
                verdict_icon(result.verdict),
                result.label,
                result.score * 100.0
            ),
            None => "(?) No result".to_string(),
        }],
        InteractionState::Error => vec![format!(
            "[!!] {}",
            view.error.as_deref().unwrap_or(&view.status.message)
        )],
    }
}

fn status_line(view: &ViewState) -> String {
    let marker = match view.status.mode {
        StatusMode::Neutral => "[--]",
        StatusMode::Ready => "[ok]",
        StatusMode::Error => "[!!]",
    };
    format!("{marker} {}", view.status.message)
}

fn verdict_icon(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Positive => "(+)",
        Verdict::Negative => "(-)",
        Verdict::Neutral => "(~)",
    }
}
