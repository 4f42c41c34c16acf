use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        MapflowError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        MapflowError::projection("x")
            .to_string()
            .contains("projection error:")
    );
    assert!(
        MapflowError::direction("x")
            .to_string()
            .contains("direction error:")
    );
    assert!(
        MapflowError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
    assert!(
        MapflowError::node_construction("n", "boom")
            .to_string()
            .contains("cannot construct node 'n'")
    );
}

#[test]
fn fetch_status_is_distinguishable() {
    let err: MapflowError = FetchError::Status {
        url: "http://t/0/0/0.png".to_string(),
        status: 404,
    }
    .into();
    assert!(matches!(
        err,
        MapflowError::Fetch(FetchError::Status { status: 404, .. })
    ));
    assert!(err.to_string().contains("404"));
}

#[test]
fn recoverable_classification() {
    assert!(MapflowError::projection("pole").is_recoverable());
    assert!(MapflowError::decode("bad png").is_recoverable());
    assert!(
        MapflowError::from(FetchError::Transport {
            url: "u".to_string(),
            message: "timeout".to_string(),
        })
        .is_recoverable()
    );
    assert!(!MapflowError::direction("in->in").is_recoverable());
    assert!(!MapflowError::MissingNode("a".to_string()).is_recoverable());
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = MapflowError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
