//! Pure derivation of the widget's view model from the current role and
//! profile store, plus the backends that turn it into markup.

use crate::profile::{ProfileRecord, ProfileStore};
use crate::role::RoleKey;

pub mod html;
pub mod text;

pub use self::html::HtmlRenderer;
pub use self::text::TextRenderer;

pub const LOGOUT_ELEMENT_ID: &str = "logout-btn";
pub const LOGIN_ELEMENT_ID_PREFIX: &str = "login-";
pub const DEFAULT_PLACEHOLDER_ICON: &str = "/src/assets/icons/icon-user.png";
pub const DEFAULT_EXPOSED_ROLES: [&str; 2] = ["citizen", "resident"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopupState {
    Anonymous,
    Authenticated,
}

impl PopupState {
    /// Keyed solely off the visitor sentinel; a role without a record is still authenticated.
    pub fn of(role: &RoleKey) -> Self {
        if role.is_visitor() {
            Self::Anonymous
        } else {
            Self::Authenticated
        }
    }
}

/// A button in the popup that switches to `target` when activated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAction {
    pub element_id: String,
    pub label: String,
    pub target: RoleKey,
}

impl RoleAction {
    pub fn login(role: &RoleKey) -> Self {
        Self {
            element_id: format!("{LOGIN_ELEMENT_ID_PREFIX}{role}"),
            label: format!("Log in as {}", capitalize(role.as_str())),
            target: role.clone(),
        }
    }

    pub fn logout() -> Self {
        Self {
            element_id: LOGOUT_ELEMENT_ID.to_owned(),
            label: "Log out".to_owned(),
            target: RoleKey::visitor(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeScheme {
    Green,
    Warning,
}

/// Authenticated profile fields with absent values already resolved to "".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileCard {
    pub scheme: BadgeScheme,
    pub status: String,
    pub photo: String,
    pub name: String,
    pub role_label: String,
    pub id: String,
    pub address: String,
    pub dob: String,
    pub logout: RoleAction,
}

impl ProfileCard {
    pub fn from_record(record: Option<&ProfileRecord>) -> Self {
        Self {
            scheme: if record.is_some_and(ProfileRecord::has_green_badge) {
                BadgeScheme::Green
            } else {
                BadgeScheme::Warning
            },
            status: or_empty(record.and_then(|record| record.status.as_ref())),
            photo: or_empty(record.and_then(|record| record.photo.as_ref())),
            name: or_empty(record.and_then(|record| record.name.as_ref())),
            role_label: or_empty(record.and_then(|record| record.role.as_ref())),
            id: or_empty(record.and_then(|record| record.id.as_ref())),
            address: or_empty(record.and_then(|record| record.address.as_ref())),
            dob: or_empty(record.and_then(|record| record.dob.as_ref())),
            logout: RoleAction::logout(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PopupView {
    Anonymous { actions: Vec<RoleAction> },
    Authenticated(ProfileCard),
}

impl PopupView {
    pub fn state(&self) -> PopupState {
        match self {
            Self::Anonymous { .. } => PopupState::Anonymous,
            Self::Authenticated(_) => PopupState::Authenticated,
        }
    }

    /// Every action the view exposes, in markup order.
    pub fn actions(&self) -> Vec<&RoleAction> {
        match self {
            Self::Anonymous { actions } => actions.iter().collect(),
            Self::Authenticated(card) => vec![&card.logout],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryIcon {
    Avatar { photo: String },
    Placeholder { icon: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetView {
    pub popup: PopupView,
    pub summary: SummaryIcon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewOptions {
    /// Roles offered by the login chooser, in display order.
    pub exposed_roles: Vec<RoleKey>,
    pub placeholder_icon: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            exposed_roles: DEFAULT_EXPOSED_ROLES
                .iter()
                .copied()
                .map(RoleKey::from)
                .collect(),
            placeholder_icon: DEFAULT_PLACEHOLDER_ICON.to_owned(),
        }
    }
}

/// Derives the full view for `role`. Total over every role and store.
pub fn derive_view(role: &RoleKey, store: &ProfileStore, options: &ViewOptions) -> WidgetView {
    let record = store.record_for(role);
    let popup = match PopupState::of(role) {
        PopupState::Anonymous => PopupView::Anonymous {
            actions: options
                .exposed_roles
                .iter()
                .map(RoleAction::login)
                .collect(),
        },
        PopupState::Authenticated => PopupView::Authenticated(ProfileCard::from_record(record)),
    };

    let summary = match (popup.state(), record.and_then(ProfileRecord::photo)) {
        (PopupState::Authenticated, Some(photo)) => SummaryIcon::Avatar {
            photo: photo.to_owned(),
        },
        _ => SummaryIcon::Placeholder {
            icon: options.placeholder_icon.clone(),
        },
    };

    WidgetView { popup, summary }
}

/// Turns a view model into markup for one rendering target.
pub trait RenderBackend {
    fn render_popup(&self, view: &PopupView) -> String;
    fn render_summary(&self, icon: &SummaryIcon) -> String;
}

fn or_empty(value: Option<&String>) -> String {
    value.cloned().unwrap_or_default()
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
