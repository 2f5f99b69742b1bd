use super::*;

#[test]
fn default_filter_parses() {
    assert!(EnvFilter::try_new(default_filter()).is_ok());
}
