use std::fmt::Write as _;

use super::{BadgeScheme, PopupView, RenderBackend, SummaryIcon};

/// Line-oriented rendering for terminals and assertions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextRenderer;

impl RenderBackend for TextRenderer {
    fn render_popup(&self, view: &PopupView) -> String {
        let mut output = String::new();
        match view {
            PopupView::Anonymous { actions } => {
                output.push_str("Welcome, Visitor!\n");
                output.push_str("Please choose how to log in:\n");
                for action in actions {
                    let _ = writeln!(output, "[{}] {}", action.element_id, action.label);
                }
            }
            PopupView::Authenticated(card) => {
                let scheme = match card.scheme {
                    BadgeScheme::Green => "green",
                    BadgeScheme::Warning => "warning",
                };
                let _ = writeln!(output, "Status ({scheme}): {}", card.status);
                let _ = writeln!(output, "Photo: {}", card.photo);
                let _ = writeln!(output, "Name: {}", card.name);
                let _ = writeln!(output, "{} ID: {}", card.role_label, card.id);
                let _ = writeln!(output, "Address: {}", card.address);
                let _ = writeln!(output, "Date of Birth: {}", card.dob);
                let _ = writeln!(
                    output,
                    "[{}] {}",
                    card.logout.element_id, card.logout.label
                );
            }
        }
        output
    }

    fn render_summary(&self, icon: &SummaryIcon) -> String {
        match icon {
            SummaryIcon::Avatar { photo } => format!("Avatar: {photo}\n"),
            SummaryIcon::Placeholder { icon } => format!("Placeholder: {icon}\n"),
        }
    }
}
