use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::dom::MemoryDocument;
use crate::profile::{Badge, ProfileRecord, ProfileStore};
use crate::widget::{CONTAINER_ELEMENT_ID, HIDDEN_CLASS, POPUP_ELEMENT_ID, SUMMARY_ELEMENT_ID};

pub const SAMPLE_PROFILES_JSON: &str = r#"{
  "citizen": {
    "badge": "green",
    "status": "Verified",
    "photo": "/a.png",
    "name": "Alex",
    "id": "C-001",
    "address": "1 Harbour Road",
    "dob": "1990-04-12",
    "role": "Citizen"
  },
  "resident": {
    "badge": "yellow",
    "status": "Pending renewal",
    "photo": "/r.png",
    "name": "Sam",
    "id": "R-042",
    "address": "7 Hill Street",
    "dob": "12 March 1985",
    "role": "Resident"
  }
}"#;

pub fn temp_path(prefix: &str) -> PathBuf {
    let now_ns = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "civic_profile_{prefix}_{}_{}",
        std::process::id(),
        now_ns
    ))
}

pub fn remove_dir_if_exists(path: &Path) {
    let _ = std::fs::remove_dir_all(path);
}

/// The store described by [`SAMPLE_PROFILES_JSON`].
pub fn sample_store() -> ProfileStore {
    ProfileStore::new()
        .with_record(
            "citizen",
            ProfileRecord {
                badge: Some(Badge::Green),
                status: Some("Verified".to_owned()),
                photo: Some("/a.png".to_owned()),
                name: Some("Alex".to_owned()),
                id: Some("C-001".to_owned()),
                address: Some("1 Harbour Road".to_owned()),
                dob: Some("1990-04-12".to_owned()),
                role: Some("Citizen".to_owned()),
            },
        )
        .with_record(
            "resident",
            ProfileRecord {
                badge: Some(Badge::Other("yellow".to_owned())),
                status: Some("Pending renewal".to_owned()),
                photo: Some("/r.png".to_owned()),
                name: Some("Sam".to_owned()),
                id: Some("R-042".to_owned()),
                address: Some("7 Hill Street".to_owned()),
                dob: Some("12 March 1985".to_owned()),
                role: Some("Resident".to_owned()),
            },
        )
}

/// Container, summary trigger and a hidden popup, as the host page ships them.
pub fn anchored_document() -> MemoryDocument {
    MemoryDocument::new()
        .with_element(CONTAINER_ELEMENT_ID, None, &[])
        .with_element(SUMMARY_ELEMENT_ID, Some(CONTAINER_ELEMENT_ID), &[])
        .with_element(
            POPUP_ELEMENT_ID,
            Some(CONTAINER_ELEMENT_ID),
            &[HIDDEN_CLASS],
        )
}
