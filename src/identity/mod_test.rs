use super::*;

fn perms(tags: &[Permission]) -> BTreeSet<Permission> {
    tags.iter().copied().collect()
}

// =============================================================================
// AccountStatus
// =============================================================================

#[test]
fn status_parses_closed_set() {
    for status in AccountStatus::ALL {
        assert_eq!(status.as_str().parse::<AccountStatus>().unwrap(), status);
    }
}

#[test]
fn status_rejects_unknown_value() {
    assert!("deleted".parse::<AccountStatus>().is_err());
}

#[test]
fn locked_statuses() {
    assert!(AccountStatus::Suspended.is_locked());
    assert!(AccountStatus::Blocked.is_locked());
    assert!(!AccountStatus::Pending.is_locked());
    assert!(!AccountStatus::Active.is_locked());
}

#[test]
fn status_serializes_snake_case() {
    assert_eq!(serde_json::to_string(&AccountStatus::Suspended).unwrap(), "\"suspended\"");
}

// =============================================================================
// Role derivation
// =============================================================================

#[test]
fn manage_system_derives_admin() {
    let set = perms(&[Permission::ManageSystem, Permission::ManageClients]);
    assert_eq!(Role::from_permissions(&set), Role::Admin);
}

#[test]
fn manage_clients_derives_agent() {
    assert_eq!(Role::from_permissions(&perms(&[Permission::ManageClients])), Role::Agent);
}

#[test]
fn view_only_derives_user() {
    assert_eq!(Role::from_permissions(&perms(&[Permission::ViewContracts])), Role::User);
    assert_eq!(Role::from_permissions(&BTreeSet::new()), Role::User);
}

#[test]
fn default_permissions_round_trip_to_same_role() {
    for role in Role::ALL {
        assert_eq!(Role::from_permissions(&role.default_permissions()), role);
    }
}

// =============================================================================
// Names
// =============================================================================

#[test]
fn full_name_trims_missing_half() {
    assert_eq!(full_name("Awa", ""), "Awa");
    assert_eq!(full_name(" Awa ", " Kone "), "Awa Kone");
}

#[test]
fn initials_take_first_letters() {
    let identity = ProfileRecord {
        id: Some(Uuid::new_v4().to_string()),
        email: Some("awa@g3a.ci".into()),
        first_name: Some("awa".into()),
        last_name: Some("kone".into()),
        phone: Some("+2250758337279".into()),
        status: Some("active".into()),
        ..ProfileRecord::default()
    }
    .validate()
    .unwrap();
    assert_eq!(identity.initials(), "AK");
}
