use civic_profile::dom::{Document, MemoryDocument};
use civic_profile::profile::{Badge, LoadOutcome, ProfileRecord, ProfileStore};
use civic_profile::render::HtmlRenderer;
use civic_profile::role::{DEFAULT_ROLE_STORAGE_KEY, KeyValueStorage, MemoryStorage, RoleKey};
use civic_profile::test_support::{SAMPLE_PROFILES_JSON, anchored_document, sample_store};
use civic_profile::widget::{
    EventController, EventOutcome, HIDDEN_CLASS, OPEN_ICON_CLASS, POPUP_ELEMENT_ID,
    ProfileRefresh, SUMMARY_ELEMENT_ID, WidgetEvent, WidgetOptions,
};

type HtmlWidget = EventController<MemoryDocument, MemoryStorage, HtmlRenderer>;

fn mount(storage: MemoryStorage) -> HtmlWidget {
    EventController::mount(
        anchored_document(),
        storage,
        HtmlRenderer,
        WidgetOptions::default(),
    )
    .expect("anchored document should mount")
}

fn summary(widget: &HtmlWidget) -> String {
    widget
        .document()
        .inner_html(SUMMARY_ELEMENT_ID)
        .unwrap_or_default()
        .to_owned()
}

fn popup(widget: &HtmlWidget) -> String {
    widget
        .document()
        .inner_html(POPUP_ELEMENT_ID)
        .unwrap_or_default()
        .to_owned()
}

#[test]
fn fresh_load_shows_placeholder_and_login_chooser() {
    let mut widget = mount(MemoryStorage::new());
    assert!(summary(&widget).contains("icon-user.png"));

    assert_eq!(
        widget.handle(WidgetEvent::SummaryActivated),
        EventOutcome::Toggled { open: true }
    );
    let popup = popup(&widget);
    assert!(popup.contains("Welcome, Visitor!"));
    assert_eq!(popup.matches("<button").count(), 2);
    let document = widget.document();
    assert!(document.contains("login-citizen"));
    assert!(document.contains("login-resident"));
    assert!(document.has_class(SUMMARY_ELEMENT_ID, OPEN_ICON_CLASS));
}

#[test]
fn persisted_citizen_shows_avatar_and_green_card_once_loaded() {
    let storage = MemoryStorage::with_item(DEFAULT_ROLE_STORAGE_KEY, "citizen");
    let mut widget = mount(storage);

    // Before the fetch resolves the citizen is shown as a blank profile.
    assert!(summary(&widget).contains("icon-user.png"));
    assert!(popup(&widget).contains("bg-yellow-100"));

    let refresh = widget.apply_load_outcome(LoadOutcome::from_payload(SAMPLE_PROFILES_JSON));
    assert_eq!(refresh, ProfileRefresh::Replaced { roles: 2 });
    widget.handle(WidgetEvent::SummaryActivated);

    assert!(summary(&widget).contains(r#"src="/a.png""#));
    let popup = popup(&widget);
    assert!(popup.contains("bg-green-100 text-green-800"));
    assert_eq!(popup.matches(r#"id="logout-btn""#).count(), 1);
    assert!(popup.contains("Alex"));
}

#[test]
fn persisted_resident_with_failed_fetch_shows_blank_warning_card() {
    let storage = MemoryStorage::with_item(DEFAULT_ROLE_STORAGE_KEY, "resident");
    let mut widget = mount(storage);

    let refresh = widget.apply_load_outcome(LoadOutcome::from_payload("<html>404</html>"));
    assert!(matches!(refresh, ProfileRefresh::Kept { .. }));
    widget.handle(WidgetEvent::SummaryActivated);

    let popup = popup(&widget);
    assert!(popup.contains("bg-yellow-100 text-yellow-800"));
    assert!(!popup.contains("bg-green-100"));
    assert!(popup.contains("logout-btn"));
    assert!(!popup.contains("undefined"));
    assert!(!popup.contains("null"));
    assert!(summary(&widget).contains("icon-user.png"));
}

#[test]
fn logging_in_from_chooser_persists_and_rerenders_without_reload() {
    let storage = MemoryStorage::new();
    let mut widget = mount(storage.clone());
    widget.apply_load_outcome(LoadOutcome::Loaded(sample_store()));
    widget.handle(WidgetEvent::SummaryActivated);

    let outcome = widget.handle(WidgetEvent::activate("login-resident"));
    assert_eq!(
        outcome,
        EventOutcome::RoleSwitched {
            from: RoleKey::visitor(),
            to: RoleKey::from("resident"),
        }
    );
    assert_eq!(
        storage
            .get_item(DEFAULT_ROLE_STORAGE_KEY)
            .expect("memory storage should be readable")
            .as_deref(),
        Some("resident")
    );
    assert!(!widget.document().has_class(POPUP_ELEMENT_ID, HIDDEN_CLASS));
    assert!(popup(&widget).contains("Sam"));
    assert!(summary(&widget).contains(r#"src="/r.png""#));

    // A reload against the same storage comes back as the resident.
    let reloaded = mount(storage);
    assert_eq!(reloaded.state().current_role().as_str(), "resident");
}

#[test]
fn every_role_and_partial_record_renders_without_placeholder_text() {
    let partials = [
        ProfileRecord::default(),
        ProfileRecord {
            badge: Some(Badge::Green),
            ..ProfileRecord::default()
        },
        ProfileRecord {
            name: Some("Only Name".to_owned()),
            ..ProfileRecord::default()
        },
        ProfileRecord {
            photo: Some("/p.png".to_owned()),
            badge: Some(Badge::Other("red".to_owned())),
            ..ProfileRecord::default()
        },
    ];

    for record in partials {
        let store = ProfileStore::new().with_record("citizen", record);
        for role in ["visitor", "citizen", "resident", ""] {
            let storage = MemoryStorage::with_item(DEFAULT_ROLE_STORAGE_KEY, role);
            let mut widget = mount(storage);
            widget.apply_load_outcome(LoadOutcome::Loaded(store.clone()));

            let popup = popup(&widget);
            let summary = summary(&widget);
            assert!(!popup.is_empty() && !summary.is_empty());
            for forbidden in ["undefined", "null"] {
                assert!(!popup.contains(forbidden), "role `{role}` leaked `{forbidden}`");
            }

            let logout_count = popup.matches(r#"id="logout-btn""#).count();
            let login_count = popup.matches(r#"id="login-"#).count();
            if role == "visitor" {
                assert_eq!((login_count, logout_count), (2, 0));
            } else {
                assert_eq!((login_count, logout_count), (0, 1));
            }
        }
    }
}

#[test]
fn widget_instances_do_not_share_state() {
    let mut first = mount(MemoryStorage::new());
    let second = mount(MemoryStorage::new());

    first.handle(WidgetEvent::activate("login-citizen"));
    assert_eq!(first.state().current_role().as_str(), "citizen");
    assert!(second.state().current_role().is_visitor());
}
