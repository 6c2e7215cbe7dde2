use maud::{Markup, html};

use super::{BadgeScheme, PopupView, ProfileCard, RenderBackend, RoleAction, SummaryIcon};

const PRIMARY_LOGIN_CLASS: &str =
    "w-full py-2 rounded-lg bg-red-800 text-white font-semibold hover:bg-red-700";
const SECONDARY_LOGIN_CLASS: &str =
    "w-full py-2 rounded-lg border border-red-800 text-red-800 font-semibold hover:bg-red-50";
const LOGOUT_CLASS: &str = "mt-3 sm:mt-4 w-full py-2 rounded-lg border border-neutral-300 text-neutral-700 font-semibold hover:bg-neutral-100";
const AVATAR_CLASS: &str = "h-9 w-9 rounded-full";
const PLACEHOLDER_CLASS: &str = "h-9 w-9 rounded-full filter invert";

/// Tailwind markup matching the host page's header styles. Every
/// interpolated value is escaped.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlRenderer;

impl RenderBackend for HtmlRenderer {
    fn render_popup(&self, view: &PopupView) -> String {
        let markup = match view {
            PopupView::Anonymous { actions } => login_chooser(actions),
            PopupView::Authenticated(card) => profile_card(card),
        };
        markup.into_string()
    }

    fn render_summary(&self, icon: &SummaryIcon) -> String {
        let markup = match icon {
            SummaryIcon::Avatar { photo } => html! {
                img src=(photo) alt="Profile" class=(AVATAR_CLASS);
            },
            SummaryIcon::Placeholder { icon } => html! {
                img src=(icon) alt="Profile" class=(PLACEHOLDER_CLASS);
            },
        };
        markup.into_string()
    }
}

fn login_chooser(actions: &[RoleAction]) -> Markup {
    html! {
        div class="px-4 py-3 border-b border-neutral-200" {
            p class="font-semibold text-lg" { "Welcome, Visitor!" }
            p class="text-sm text-neutral-500" { "Please choose how to log in:" }
        }
        div class="p-4 space-y-3" {
            @for (index, action) in actions.iter().enumerate() {
                button id=(action.element_id)
                    class=(if index == 0 { PRIMARY_LOGIN_CLASS } else { SECONDARY_LOGIN_CLASS }) {
                    (action.label)
                }
            }
        }
    }
}

fn profile_card(card: &ProfileCard) -> Markup {
    let (strip_class, dot_class) = match card.scheme {
        BadgeScheme::Green => ("bg-green-100 text-green-800", "bg-green-500"),
        BadgeScheme::Warning => ("bg-yellow-100 text-yellow-800", "bg-yellow-500"),
    };

    html! {
        div class={ "flex flex-col sm:flex-row justify-between items-start sm:items-center px-3 sm:px-4 py-2 text-xs sm:text-sm font-semibold " (strip_class) } {
            span { (card.status) }
            span class={ "h-2 w-2 sm:h-2.5 sm:w-2.5 rounded-full " (dot_class) } {}
        }
        div class="p-3 sm:p-4 space-y-2 sm:space-y-3 text-xs sm:text-sm" {
            div class="flex items-center gap-2 sm:gap-3" {
                img src=(card.photo) alt="Mock ID"
                    class="w-12 h-12 sm:w-16 sm:h-16 rounded-full border border-neutral-300";
                div {
                    p class="font-semibold" { (card.name) }
                    p class="text-neutral-500" { (card.role_label) " ID: " (card.id) }
                }
            }
            div {
                p { span class="font-semibold" { "Address:" } " " (card.address) }
                p { span class="font-semibold" { "Date of Birth:" } " " (card.dob) }
            }
            button id=(card.logout.element_id) class=(LOGOUT_CLASS) { (card.logout.label) }
        }
    }
}
