//! Scripted widget sessions loaded from YAML.
//!
//! Each case mounts a fresh widget on an in-memory document, replays a list
//! of user events and fetch completions, and checks the resulting state and
//! markup.

use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, ensure};
use serde::Deserialize;

use crate::dom::{Document, MemoryDocument};
use crate::profile::{LoadOutcome, ProfileLoadError, ProfileStore};
use crate::render::HtmlRenderer;
use crate::role::{MemoryStorage, RoleState};
use crate::widget::{
    CONTAINER_ELEMENT_ID, EventController, HIDDEN_CLASS, POPUP_ELEMENT_ID, SUMMARY_ELEMENT_ID,
    WidgetEvent, WidgetOptions,
};

pub const DEFAULT_SCENARIO_PATH: &str = "scenarios/widget.yaml";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioSuite {
    pub cases: Vec<ScenarioCase>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioCase {
    pub id: String,
    #[serde(default)]
    pub persisted_role: Option<String>,
    /// Document served by the simulated fetch.
    #[serde(default)]
    pub profiles: Option<ProfileStore>,
    /// Raw response body, for malformed payloads. Takes precedence over `profiles`.
    #[serde(default)]
    pub payload: Option<String>,
    /// The simulated fetch fails without a response body.
    #[serde(default)]
    pub profiles_fail: bool,
    #[serde(default = "default_anchors_present")]
    pub anchors_present: bool,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    #[serde(default)]
    pub expect: ScenarioExpectations,
}

/// `toggle`, `load`, or `{activate: <element id>}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScenarioEvent {
    Named(NamedEvent),
    Activate { activate: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedEvent {
    /// Activates the summary trigger.
    Toggle,
    /// Completes the profile fetch with the case's document.
    Load,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioExpectations {
    #[serde(default)]
    pub mounted: Option<bool>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub persisted_role: Option<String>,
    #[serde(default)]
    pub open: Option<bool>,
    #[serde(default)]
    pub summary_contains: Vec<String>,
    #[serde(default)]
    pub popup_contains: Vec<String>,
    #[serde(default)]
    pub popup_must_not_contain: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCheckResult {
    pub name: &'static str,
    pub passed: bool,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioCaseResult {
    pub case_id: String,
    pub passed: bool,
    pub checks: Vec<ScenarioCheckResult>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioRunReport {
    pub suite_path: PathBuf,
    pub total_cases: usize,
    pub passed_cases: usize,
    pub failed_cases: usize,
    pub case_results: Vec<ScenarioCaseResult>,
}

fn default_anchors_present() -> bool {
    true
}

pub fn load_scenario_suite(path: &Path) -> Result<ScenarioSuite> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read scenario file `{}`", path.display()))?;
    parse_scenario_suite(&raw)
        .with_context(|| format!("failed to parse scenario file `{}`", path.display()))
}

pub fn parse_scenario_suite(raw: &str) -> Result<ScenarioSuite> {
    let mut suite = serde_yaml::from_str::<ScenarioSuite>(raw)?;
    normalize_and_validate_suite(&mut suite)?;
    Ok(suite)
}

pub fn run_scenario_suite(path: &Path, options: &WidgetOptions) -> Result<ScenarioRunReport> {
    let suite = load_scenario_suite(path)?;
    let case_results = suite
        .cases
        .iter()
        .map(|case| run_scenario_case(case, options))
        .collect::<Vec<_>>();

    let passed_cases = case_results.iter().filter(|result| result.passed).count();
    let total_cases = case_results.len();

    Ok(ScenarioRunReport {
        suite_path: path.to_path_buf(),
        total_cases,
        passed_cases,
        failed_cases: total_cases.saturating_sub(passed_cases),
        case_results,
    })
}

pub fn run_scenario_command(path: &Path, options: &WidgetOptions) -> Result<()> {
    let report = run_scenario_suite(path, options)?;

    println!(
        "Running {} widget scenarios from {}",
        report.total_cases,
        report.suite_path.display()
    );
    for case in &report.case_results {
        if case.passed {
            println!("[PASS] {}", case.case_id);
            continue;
        }

        println!("[FAIL] {}", case.case_id);
        for check in case.checks.iter().filter(|check| !check.passed) {
            println!("  check `{}`: {}", check.name, check.detail);
        }
    }
    println!(
        "Summary: {} passed, {} failed",
        report.passed_cases, report.failed_cases
    );

    if report.failed_cases > 0 {
        return Err(anyhow!(
            "{} of {} widget scenarios failed",
            report.failed_cases,
            report.total_cases
        ));
    }

    Ok(())
}

pub fn run_scenario_case(case: &ScenarioCase, options: &WidgetOptions) -> ScenarioCaseResult {
    let storage = match &case.persisted_role {
        Some(role) => MemoryStorage::with_item(&options.storage_key, role),
        None => MemoryStorage::new(),
    };
    let document = if case.anchors_present {
        MemoryDocument::new()
            .with_element(CONTAINER_ELEMENT_ID, None, &[])
            .with_element(SUMMARY_ELEMENT_ID, Some(CONTAINER_ELEMENT_ID), &[])
            .with_element(
                POPUP_ELEMENT_ID,
                Some(CONTAINER_ELEMENT_ID),
                &[HIDDEN_CLASS],
            )
    } else {
        MemoryDocument::new().with_element(CONTAINER_ELEMENT_ID, None, &[])
    };

    let mut checks = Vec::new();
    let controller =
        EventController::mount(document, storage.clone(), HtmlRenderer, options.clone());

    if let Some(expected) = case.expect.mounted {
        checks.push(check_equal("mounted", expected, controller.is_some()));
    }

    let Some(mut controller) = controller else {
        if case.expect.mounted.is_none() {
            checks.push(ScenarioCheckResult {
                name: "mounted",
                passed: false,
                detail: "widget did not mount; document anchors missing".to_owned(),
            });
        }
        return finish_case(case, checks);
    };

    for event in &case.events {
        match event {
            ScenarioEvent::Named(NamedEvent::Toggle) => {
                controller.handle(WidgetEvent::SummaryActivated);
            }
            ScenarioEvent::Activate { activate } => {
                controller.handle(WidgetEvent::activate(activate.clone()));
            }
            ScenarioEvent::Named(NamedEvent::Load) => {
                controller.apply_load_outcome(simulated_fetch(case));
            }
        }
    }

    let expect = &case.expect;
    if let Some(role) = &expect.role {
        checks.push(check_equal(
            "role",
            role.as_str(),
            controller.state().current_role().as_str(),
        ));
    }
    if let Some(persisted) = &expect.persisted_role {
        let reloaded = RoleState::load(storage.clone(), options.storage_key.clone());
        checks.push(check_equal(
            "persisted_role",
            persisted.as_str(),
            reloaded.current().as_str(),
        ));
    }
    if let Some(open) = expect.open {
        checks.push(check_equal("open", open, controller.state().is_popup_open()));
    }

    let document = controller.document();
    let summary = document.inner_html(SUMMARY_ELEMENT_ID).unwrap_or_default();
    let popup = document.inner_html(POPUP_ELEMENT_ID).unwrap_or_default();
    checks.push(check_contains("summary_contains", summary, &expect.summary_contains));
    checks.push(check_contains("popup_contains", popup, &expect.popup_contains));
    checks.push(check_not_contains(
        "popup_must_not_contain",
        popup,
        &expect.popup_must_not_contain,
    ));

    finish_case(case, checks)
}

fn simulated_fetch(case: &ScenarioCase) -> LoadOutcome {
    if case.profiles_fail {
        return LoadOutcome::Failed(ProfileLoadError::Read {
            path: PathBuf::from(format!("scenario/{}/profiles.json", case.id)),
            source: io::Error::from(io::ErrorKind::NotFound),
        });
    }
    match (&case.payload, &case.profiles) {
        (Some(payload), _) => LoadOutcome::from_payload(payload),
        (None, Some(profiles)) => LoadOutcome::Loaded(profiles.clone()),
        (None, None) => LoadOutcome::from_payload(""),
    }
}

fn finish_case(case: &ScenarioCase, checks: Vec<ScenarioCheckResult>) -> ScenarioCaseResult {
    ScenarioCaseResult {
        case_id: case.id.clone(),
        passed: checks.iter().all(|check| check.passed),
        checks,
    }
}

fn check_equal<T: PartialEq + std::fmt::Debug>(
    name: &'static str,
    expected: T,
    actual: T,
) -> ScenarioCheckResult {
    let passed = expected == actual;
    ScenarioCheckResult {
        name,
        passed,
        detail: if passed {
            "matched".to_owned()
        } else {
            format!("expected {expected:?}, got {actual:?}")
        },
    }
}

fn check_contains(name: &'static str, haystack: &str, needles: &[String]) -> ScenarioCheckResult {
    let missing = needles
        .iter()
        .filter(|needle| !haystack.contains(needle.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    ScenarioCheckResult {
        name,
        passed: missing.is_empty(),
        detail: if missing.is_empty() {
            "all snippets present".to_owned()
        } else {
            format!("missing snippets: {}", missing.join(", "))
        },
    }
}

fn check_not_contains(
    name: &'static str,
    haystack: &str,
    needles: &[String],
) -> ScenarioCheckResult {
    let present = needles
        .iter()
        .filter(|needle| haystack.contains(needle.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    ScenarioCheckResult {
        name,
        passed: present.is_empty(),
        detail: if present.is_empty() {
            "no forbidden snippets".to_owned()
        } else {
            format!("forbidden snippets present: {}", present.join(", "))
        },
    }
}

fn normalize_and_validate_suite(suite: &mut ScenarioSuite) -> Result<()> {
    ensure!(
        !suite.cases.is_empty(),
        "scenario suite must contain at least one case"
    );

    let mut seen_ids = BTreeSet::new();
    for case in &mut suite.cases {
        case.id = case.id.trim().to_owned();
        ensure!(!case.id.is_empty(), "scenario case id cannot be empty");
        ensure!(
            seen_ids.insert(case.id.clone()),
            "duplicate scenario case id `{}`",
            case.id
        );
        ensure!(
            !(case.profiles_fail && (case.profiles.is_some() || case.payload.is_some())),
            "case `{}` sets profiles_fail together with profiles or payload",
            case.id
        );
        for event in &mut case.events {
            if let ScenarioEvent::Activate {
                activate: element_id,
            } = event
            {
                *element_id = element_id.trim().to_owned();
                ensure!(
                    !element_id.is_empty(),
                    "case `{}` activates an empty element id",
                    case.id
                );
            }
        }
    }

    Ok(())
}
