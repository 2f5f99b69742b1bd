use super::*;

#[test]
fn accepts_known_restricted_paths() {
    let routes = RouteTable::agency();
    assert_eq!(sanitize_return_to("/contracts", &routes).as_deref(), Some("/contracts"));
    assert_eq!(sanitize_return_to("/clients?page=2", &routes).as_deref(), Some("/clients?page=2"));
    assert_eq!(sanitize_return_to("/", &routes).as_deref(), Some("/"));
}

#[test]
fn rejects_external_and_malformed_locations() {
    let routes = RouteTable::agency();
    for candidate in [
        "",
        " /contracts",
        "contracts",
        "https://evil.example/",
        "//evil.example/contracts",
        "/\\evil.example",
        "/contracts?next=https://evil.example",
        "/contracts\n",
        "/con\ttracts",
        "javascript:alert(1)",
    ] {
        assert_eq!(sanitize_return_to(candidate, &routes), None, "{candidate:?}");
    }
}

#[test]
fn rejects_unknown_routes() {
    let routes = RouteTable::agency();
    assert_eq!(sanitize_return_to("/admin", &routes), None);
    assert_eq!(sanitize_return_to("/contracts/12", &routes), None);
}

#[test]
fn rejects_public_and_informational_pages() {
    let routes = RouteTable::agency();
    for candidate in ["/login", "/register", "/verify-email", "/unauthorized", "/account-restricted"] {
        assert_eq!(sanitize_return_to(candidate, &routes), None, "{candidate}");
    }
}
