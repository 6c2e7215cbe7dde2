use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::dom::Document;
use crate::profile::{LoadOutcome, ProfileLoader, ProfileStore};
use crate::render::{RenderBackend, ViewOptions, WidgetView, derive_view};
use crate::role::{DEFAULT_ROLE_STORAGE_KEY, KeyValueStorage, RoleKey, RoleState};

pub const CONTAINER_ELEMENT_ID: &str = "profile-container";
pub const SUMMARY_ELEMENT_ID: &str = "profile-summary";
pub const POPUP_ELEMENT_ID: &str = "profile-popup";
pub const HIDDEN_CLASS: &str = "hidden";
pub const OPEN_ICON_CLASS: &str = "open-icon";

/// Everything the widget knows, owned by one instance.
#[derive(Debug)]
pub struct WidgetState<S> {
    role: RoleState<S>,
    profiles: ProfileStore,
    popup_open: bool,
    view_options: ViewOptions,
}

impl<S: KeyValueStorage> WidgetState<S> {
    pub fn new(role: RoleState<S>, view_options: ViewOptions) -> Self {
        Self {
            role,
            profiles: ProfileStore::new(),
            popup_open: false,
            view_options,
        }
    }

    pub fn current_role(&self) -> &RoleKey {
        self.role.current()
    }

    pub fn profiles(&self) -> &ProfileStore {
        &self.profiles
    }

    pub fn view_options(&self) -> &ViewOptions {
        &self.view_options
    }

    pub fn is_popup_open(&self) -> bool {
        self.popup_open
    }

    pub fn set_popup_open(&mut self, open: bool) {
        self.popup_open = open;
    }

    /// Flips the popup and returns whether it is now open.
    pub fn toggle_popup(&mut self) -> bool {
        self.popup_open = !self.popup_open;
        self.popup_open
    }

    /// Returns the previous role.
    pub fn switch_role(&mut self, role: RoleKey) -> RoleKey {
        self.role.set_role(role)
    }

    pub fn replace_profiles(&mut self, profiles: ProfileStore) {
        self.profiles = profiles;
    }

    pub fn view(&self) -> WidgetView {
        derive_view(self.role.current(), &self.profiles, &self.view_options)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetOptions {
    pub storage_key: String,
    pub view: ViewOptions,
}

impl Default for WidgetOptions {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_ROLE_STORAGE_KEY.to_owned(),
            view: ViewOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetEvent {
    SummaryActivated,
    ActionActivated { element_id: String },
}

impl WidgetEvent {
    pub fn activate(element_id: impl Into<String>) -> Self {
        Self::ActionActivated {
            element_id: element_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Toggled { open: bool },
    RoleSwitched { from: RoleKey, to: RoleKey },
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileRefresh {
    Replaced { roles: usize },
    Kept { error: String },
}

/// Binds widget state to a document: renders into the anchors and turns
/// activation events into role transitions.
#[derive(Debug)]
pub struct EventController<D, S, R> {
    document: D,
    state: WidgetState<S>,
    renderer: R,
    listeners: BTreeMap<String, RoleKey>,
}

impl<D, S, R> EventController<D, S, R>
where
    D: Document,
    S: KeyValueStorage,
    R: RenderBackend,
{
    /// Returns `None`, leaving the document untouched, when the summary
    /// trigger or the popup panel is missing.
    pub fn mount(document: D, storage: S, renderer: R, options: WidgetOptions) -> Option<Self> {
        if !document.contains(SUMMARY_ELEMENT_ID) || !document.contains(POPUP_ELEMENT_ID) {
            debug!(
                summary_present = document.contains(SUMMARY_ELEMENT_ID),
                popup_present = document.contains(POPUP_ELEMENT_ID),
                "profile widget anchors missing; widget stays inert"
            );
            return None;
        }
        if !document.contains(CONTAINER_ELEMENT_ID) {
            debug!("profile container missing; mounting on trigger and popup only");
        }

        let role = RoleState::load(storage, options.storage_key);
        let mut state = WidgetState::new(role, options.view);
        state.set_popup_open(!document.has_class(POPUP_ELEMENT_ID, HIDDEN_CLASS));

        let mut controller = Self {
            document,
            state,
            renderer,
            listeners: BTreeMap::new(),
        };
        info!(role = %controller.state.current_role(), "profile widget mounted");
        controller.render();
        Some(controller)
    }

    pub fn document(&self) -> &D {
        &self.document
    }

    pub fn state(&self) -> &WidgetState<S> {
        &self.state
    }

    /// Element ids that currently have a role-switch listener.
    pub fn bound_actions(&self) -> impl Iterator<Item = (&str, &RoleKey)> {
        self.listeners
            .iter()
            .map(|(element_id, target)| (element_id.as_str(), target))
    }

    pub fn handle(&mut self, event: WidgetEvent) -> EventOutcome {
        match event {
            WidgetEvent::SummaryActivated => {
                let Some(hidden) = self.document.toggle_class(POPUP_ELEMENT_ID, HIDDEN_CLASS, None)
                else {
                    return EventOutcome::Ignored;
                };
                let open = !hidden;
                self.document
                    .toggle_class(SUMMARY_ELEMENT_ID, OPEN_ICON_CLASS, Some(open));
                self.state.set_popup_open(open);
                self.render();
                EventOutcome::Toggled { open }
            }
            WidgetEvent::ActionActivated { element_id } => {
                let Some(target) = self.listeners.get(&element_id).cloned() else {
                    debug!(element_id = %element_id, "activation without a bound listener");
                    return EventOutcome::Ignored;
                };
                let from = self.state.switch_role(target.clone());
                self.render();
                EventOutcome::RoleSwitched { from, to: target }
            }
        }
    }

    /// Applies a finished profile fetch. A failed fetch keeps the current
    /// store and skips the re-render.
    pub fn apply_load_outcome(&mut self, outcome: LoadOutcome) -> ProfileRefresh {
        match outcome {
            LoadOutcome::Loaded(profiles) => {
                let roles = profiles.len();
                self.state.replace_profiles(profiles);
                self.render();
                ProfileRefresh::Replaced { roles }
            }
            LoadOutcome::Failed(error) => {
                warn!(error = %error, "keeping previous profiles after failed load");
                ProfileRefresh::Kept {
                    error: error.to_string(),
                }
            }
        }
    }

    /// Awaits one fetch from `loader` and applies it.
    ///
    /// The controller stays mutably borrowed until the fetch resolves, so no
    /// event can be handled meanwhile. Interactive hosts spawn
    /// [`ProfileLoader::load`] instead and pass the outcome to
    /// [`Self::apply_load_outcome`] when it arrives.
    pub async fn run_profile_load(&mut self, loader: &ProfileLoader) -> ProfileRefresh {
        let outcome = loader.load().await;
        self.apply_load_outcome(outcome)
    }

    /// Re-renders popup and summary from scratch and rebinds every action.
    pub fn render(&mut self) {
        let view = self.state.view();
        let popup_markup = self.renderer.render_popup(&view.popup);
        let summary_markup = self.renderer.render_summary(&view.summary);
        self.document.set_inner_html(POPUP_ELEMENT_ID, &popup_markup);
        self.document
            .set_inner_html(SUMMARY_ELEMENT_ID, &summary_markup);

        self.listeners.clear();
        for action in view.popup.actions() {
            if !self.document.contains(&action.element_id) {
                debug!(element_id = %action.element_id, "rendered action not found in document");
                continue;
            }
            self.listeners
                .insert(action.element_id.clone(), action.target.clone());
        }
        debug!(
            role = %self.state.current_role(),
            open = self.state.is_popup_open(),
            listeners = self.listeners.len(),
            "profile widget rendered"
        );
    }
}
