//! Tests for container identifier parsing.

use grace::{Error, Platform, Target};

#[test]
fn test_bare_name_defaults_to_docker() {
    let target = Target::parse("web").unwrap();
    assert_eq!(target, Target::new(Platform::Docker, "web"));
}

#[test]
fn test_docker_prefix() {
    let target: Target = "docker/4f1c2a9e0b7d".parse().unwrap();
    assert_eq!(target.platform, Platform::Docker);
    assert_eq!(target.name, "4f1c2a9e0b7d");
}

#[test]
fn test_pod_prefix() {
    let target = Target::parse("pod/api-7c9d").unwrap();
    assert_eq!(target.platform, Platform::Pod);
    assert_eq!(target.name, "api-7c9d");
    assert_eq!(target.to_string(), "pod/api-7c9d");
}

#[test]
fn test_only_first_slash_separates_prefix() {
    let target = Target::parse("docker/registry/web").unwrap();
    assert_eq!(target.name, "registry/web");
}

#[test]
fn test_unknown_prefix() {
    let err = Target::parse("podman/web").unwrap_err();
    assert!(matches!(err, Error::InvalidPlatformPrefix { ref prefix } if prefix == "podman"));
    assert!(err.to_string().contains("podman"));
}

#[test]
fn test_empty_identifier() {
    assert!(matches!(
        Target::parse("pod/"),
        Err(Error::InvalidTarget { .. })
    ));
    assert!(matches!(Target::parse(""), Err(Error::InvalidTarget { .. })));
}
