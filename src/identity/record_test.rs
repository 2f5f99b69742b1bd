use super::*;

const USER_ID: &str = "6f1c2a9e-5b1d-4c1e-9a43-2f7d8e0b1c11";

fn complete_record() -> ProfileRecord {
    ProfileRecord {
        id: Some(USER_ID.into()),
        email: Some("awa@g3a.ci".into()),
        first_name: Some("Awa".into()),
        last_name: Some("Kone".into()),
        display_name: None,
        phone: Some("+2250758337279".into()),
        status: Some("active".into()),
        role: Some("agent".into()),
        permissions: Some(vec!["manage_clients".into(), "manage_contracts".into()]),
        ..ProfileRecord::default()
    }
}

// =============================================================================
// validate: success paths
// =============================================================================

#[test]
fn validate_complete_record() {
    let identity = complete_record().validate().unwrap();
    assert_eq!(identity.id.to_string(), USER_ID);
    assert_eq!(identity.status, AccountStatus::Active);
    assert!(identity.has_permission(Permission::ManageContracts));
    assert_eq!(identity.role(), Role::Agent);
}

#[test]
fn validate_derives_display_name_when_missing() {
    let identity = complete_record().validate().unwrap();
    assert_eq!(identity.display_name, "Awa Kone");
}

#[test]
fn validate_keeps_explicit_display_name() {
    let mut record = complete_record();
    record.display_name = Some("Awa K.".into());
    assert_eq!(record.validate().unwrap().display_name, "Awa K.");
}

#[test]
fn validate_legacy_row_uses_role_default_permissions() {
    let mut record = complete_record();
    record.permissions = None;
    record.role = Some("admin".into());
    let identity = record.validate().unwrap();
    assert!(identity.has_permission(Permission::ManageSystem));
    assert_eq!(identity.role(), Role::Admin);
}

#[test]
fn validate_empty_avatar_url_becomes_none() {
    let mut record = complete_record();
    record.avatar_url = Some(String::new());
    assert!(record.validate().unwrap().avatar_url.is_none());
}

// =============================================================================
// validate: rejection paths
// =============================================================================

#[test]
fn validate_rejects_missing_email() {
    let mut record = complete_record();
    record.email = None;
    assert_eq!(record.validate(), Err(InvalidProfile::MissingField("email")));
}

#[test]
fn validate_rejects_blank_first_name() {
    let mut record = complete_record();
    record.first_name = Some("   ".into());
    assert_eq!(record.validate(), Err(InvalidProfile::MissingField("first_name")));
}

#[test]
fn validate_rejects_non_uuid_id() {
    let mut record = complete_record();
    record.id = Some("42".into());
    assert_eq!(record.validate(), Err(InvalidProfile::InvalidId("42".into())));
}

#[test]
fn validate_rejects_unknown_status() {
    let mut record = complete_record();
    record.status = Some("superuser".into());
    assert_eq!(record.validate(), Err(InvalidProfile::UnknownStatus("superuser".into())));
}

#[test]
fn validate_rejects_unknown_role_label() {
    let mut record = complete_record();
    record.role = Some("agent_senior".into());
    assert_eq!(record.validate(), Err(InvalidProfile::UnknownRole("agent_senior".into())));
}

#[test]
fn validate_rejects_unknown_permission_tag() {
    let mut record = complete_record();
    record.permissions = Some(vec!["manage_clients".into(), "root".into()]);
    assert_eq!(record.validate(), Err(InvalidProfile::UnknownPermission("root".into())));
}

#[test]
fn validate_for_rejects_foreign_row() {
    let other = Uuid::new_v4();
    let err = complete_record().validate_for(other).unwrap_err();
    assert!(matches!(err, InvalidProfile::IdMismatch { expected, .. } if expected == other));
}

// =============================================================================
// serde shape
// =============================================================================

#[test]
fn patch_serializes_only_present_fields() {
    let patch = ProfileRecord { avatar_url: Some("https://cdn/x.png".into()), ..ProfileRecord::default() };
    let json = serde_json::to_value(&patch).unwrap();
    assert_eq!(json, serde_json::json!({ "avatar_url": "https://cdn/x.png" }));
}

#[test]
fn deserializes_row_with_nulls() {
    let row = serde_json::json!({
        "id": USER_ID,
        "email": "awa@g3a.ci",
        "first_name": "Awa",
        "last_name": "Kone",
        "phone": "+2250758337279",
        "status": "pending",
        "role": "agent",
        "permissions": null,
        "avatar_url": null
    });
    let record: ProfileRecord = serde_json::from_value(row).unwrap();
    let identity = record.validate().unwrap();
    assert_eq!(identity.status, AccountStatus::Pending);
    assert!(identity.has_permission(Permission::ManageClients));
}

#[test]
fn identity_round_trips_into_record() {
    let identity = complete_record().validate().unwrap();
    let record = ProfileRecord::from(&identity);
    assert_eq!(record.role.as_deref(), Some("agent"));
    assert_eq!(record.validate().unwrap(), identity);
}
