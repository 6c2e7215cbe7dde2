use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, ensure};

use crate::profile::ProfileSource;
use crate::render::{DEFAULT_EXPOSED_ROLES, DEFAULT_PLACEHOLDER_ICON, ViewOptions};
use crate::role::{DEFAULT_ROLE_STORAGE_KEY, RoleKey, VISITOR_ROLE};
use crate::widget::WidgetOptions;

pub const DEFAULT_PROFILE_DATA_SOURCE: &str = "data/profiles.json";
pub const DEFAULT_ROLE_STORAGE_PATH: &str = ".civic_profile/local_storage.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WidgetSettings {
    pub profile_source: ProfileSource,
    pub role_storage_path: PathBuf,
    pub role_storage_key: String,
    pub exposed_roles: Vec<RoleKey>,
    pub placeholder_icon: String,
}

impl WidgetSettings {
    pub fn from_env() -> Result<Self> {
        // Load .env if present, but do not fail if file does not exist.
        let _ = dotenvy::dotenv();

        let profile_source = read_optional_env("PROFILE_DATA_SOURCE")
            .unwrap_or_else(|| DEFAULT_PROFILE_DATA_SOURCE.to_owned())
            .parse::<ProfileSource>()
            .context("failed to parse PROFILE_DATA_SOURCE")?;

        let role_storage_path = read_optional_env("ROLE_STORAGE_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_ROLE_STORAGE_PATH));

        let role_storage_key = env::var("ROLE_STORAGE_KEY")
            .unwrap_or_else(|_| DEFAULT_ROLE_STORAGE_KEY.to_owned());
        ensure!(
            !role_storage_key.trim().is_empty(),
            "ROLE_STORAGE_KEY cannot be empty"
        );

        let exposed_roles = match env::var("EXPOSED_ROLES") {
            Ok(raw) => parse_exposed_roles(&raw).context("failed to parse EXPOSED_ROLES")?,
            Err(_) => DEFAULT_EXPOSED_ROLES
                .iter()
                .copied()
                .map(RoleKey::from)
                .collect(),
        };

        let placeholder_icon = read_optional_env("PLACEHOLDER_ICON_URL")
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER_ICON.to_owned());

        Ok(Self {
            profile_source,
            role_storage_path,
            role_storage_key,
            exposed_roles,
            placeholder_icon,
        })
    }

    pub fn view_options(&self) -> ViewOptions {
        ViewOptions {
            exposed_roles: self.exposed_roles.clone(),
            placeholder_icon: self.placeholder_icon.clone(),
        }
    }

    pub fn widget_options(&self) -> WidgetOptions {
        WidgetOptions {
            storage_key: self.role_storage_key.clone(),
            view: self.view_options(),
        }
    }
}

/// Comma separated role keys, trimmed and de-duplicated in order.
pub fn parse_exposed_roles(raw: &str) -> Result<Vec<RoleKey>> {
    let mut seen = BTreeSet::new();
    let mut roles = Vec::new();
    for entry in raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
    {
        if entry == VISITOR_ROLE {
            return Err(anyhow!(
                "`{VISITOR_ROLE}` is the anonymous role and cannot be offered as a login"
            ));
        }
        if seen.insert(entry) {
            roles.push(RoleKey::from(entry));
        }
    }

    ensure!(!roles.is_empty(), "at least one role must be exposed");
    Ok(roles)
}

fn read_optional_env(name: &str) -> Option<String> {
    env::var(name).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_owned())
        }
    })
}
