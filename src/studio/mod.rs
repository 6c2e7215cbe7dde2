use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui;
use tokio::runtime::Handle;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tracing::{info, warn};

use crate::config::WidgetSettings;
use crate::profile::{LoadOutcome, ProfileLoader};
use crate::render::{BadgeScheme, PopupView, ProfileCard, RoleAction, SummaryIcon};
use crate::role::{FileStorage, RoleKey, RoleState};
use crate::widget::WidgetState;

const APP_TITLE: &str = "civic_profile preview";

/// Native preview of the widget, driven by the same state machine as the
/// document controller.
pub fn run_studio(settings: &WidgetSettings) -> Result<()> {
    let runtime_handle = Handle::try_current().context("studio requires a tokio runtime")?;

    let (outcome_tx, outcome_rx) = unbounded_channel::<LoadOutcome>();
    spawn_profile_fetch(
        &runtime_handle,
        ProfileLoader::new(settings.profile_source.clone()),
        outcome_tx,
    );

    let role = RoleState::load(
        FileStorage::new(&settings.role_storage_path),
        settings.role_storage_key.clone(),
    );
    let state = WidgetState::new(role, settings.view_options());
    info!(
        profile_source = %settings.profile_source,
        storage = %settings.role_storage_path.display(),
        role = %state.current_role(),
        "starting widget preview"
    );

    eframe::run_native(
        APP_TITLE,
        eframe::NativeOptions::default(),
        Box::new(move |_creation_context| Ok(Box::new(StudioApp::new(state, outcome_rx)))),
    )
    .map_err(|error| anyhow::anyhow!("studio UI exited with error: {error}"))
}

fn spawn_profile_fetch(
    handle: &Handle,
    loader: ProfileLoader,
    outcome_tx: UnboundedSender<LoadOutcome>,
) {
    let _task = handle.spawn(async move {
        let outcome = loader.load().await;
        // The window may already be closed; nobody is left to render.
        let _ = outcome_tx.send(outcome);
    });
}

struct StudioApp {
    state: WidgetState<FileStorage>,
    outcome_rx: UnboundedReceiver<LoadOutcome>,
    load_status: String,
}

impl StudioApp {
    fn new(state: WidgetState<FileStorage>, outcome_rx: UnboundedReceiver<LoadOutcome>) -> Self {
        Self {
            state,
            outcome_rx,
            load_status: "Loading profiles...".to_owned(),
        }
    }

    fn drain_outcomes(&mut self) {
        match self.outcome_rx.try_recv() {
            Ok(LoadOutcome::Loaded(store)) => {
                self.load_status = format!("Profiles loaded ({} roles)", store.len());
                self.state.replace_profiles(store);
            }
            Ok(LoadOutcome::Failed(error)) => {
                warn!(error = %error, "preview continues without profiles");
                self.load_status = format!("Profiles unavailable: {error}");
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => {}
        }
    }

    fn render_header(&mut self, ui: &mut egui::Ui) {
        let view = self.state.view();
        ui.horizontal(|ui| {
            ui.heading("Profile");
            let summary_label = match &view.summary {
                SummaryIcon::Avatar { photo } => format!("Avatar ({photo})"),
                SummaryIcon::Placeholder { .. } => "Anonymous".to_owned(),
            };
            let open = self.state.is_popup_open();
            let trigger = egui::Button::new(summary_label).selected(open);
            if ui.add(trigger).clicked() {
                self.state.toggle_popup();
            }
        });
        ui.label(format!("Current role: {}", self.state.current_role()));
        ui.label(&self.load_status);
    }

    fn render_popup(&mut self, ui: &mut egui::Ui) {
        if !self.state.is_popup_open() {
            return;
        }

        let view = self.state.view();
        let selected = ui
            .group(|ui| match &view.popup {
                PopupView::Anonymous { actions } => render_login_chooser(ui, actions),
                PopupView::Authenticated(card) => render_profile_card(ui, card),
            })
            .inner;

        if let Some(target) = selected {
            self.state.switch_role(target);
        }
    }
}

fn render_login_chooser(ui: &mut egui::Ui, actions: &[RoleAction]) -> Option<RoleKey> {
    ui.label(egui::RichText::new("Welcome, Visitor!").strong());
    ui.label("Please choose how to log in:");
    let mut selected = None;
    for action in actions {
        if ui.button(&action.label).clicked() {
            selected = Some(action.target.clone());
        }
    }
    selected
}

fn render_profile_card(ui: &mut egui::Ui, card: &ProfileCard) -> Option<RoleKey> {
    let (fill, text) = match card.scheme {
        BadgeScheme::Green => (
            egui::Color32::from_rgb(220, 252, 231),
            egui::Color32::from_rgb(22, 101, 52),
        ),
        BadgeScheme::Warning => (
            egui::Color32::from_rgb(254, 249, 195),
            egui::Color32::from_rgb(133, 77, 14),
        ),
    };
    egui::Frame::group(ui.style()).fill(fill).show(ui, |ui| {
        ui.colored_label(text, &card.status);
    });

    ui.label(format!("Photo: {}", card.photo));
    ui.label(egui::RichText::new(&card.name).strong());
    ui.label(format!("{} ID: {}", card.role_label, card.id));
    ui.label(format!("Address: {}", card.address));
    ui.label(format!("Date of Birth: {}", card.dob));

    if ui.button(&card.logout.label).clicked() {
        return Some(card.logout.target.clone());
    }
    None
}

impl eframe::App for StudioApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_outcomes();

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_header(ui);
            ui.separator();
            self.render_popup(ui);
        });

        ctx.request_repaint_after(Duration::from_millis(120));
    }
}
