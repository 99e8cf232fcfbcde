//! Integration tests for semver parsing, precedence and proxy version strings

use lip_pm::Version;

#[test]
fn test_version_parsing() {
    let v = Version::parse("1.2.3").unwrap();
    assert_eq!(v.major(), 1);
    assert_eq!(v.minor(), 2);
    assert_eq!(v.patch(), 3);
    assert_eq!(v.to_string(), "1.2.3");
}

#[test]
fn test_version_with_prerelease() {
    let v = Version::parse("1.2.3-alpha.1").unwrap();
    assert_eq!(v.prerelease(), Some("alpha.1"));
    assert!(v.is_prerelease());
    assert_eq!(v.to_string(), "1.2.3-alpha.1");
}

#[test]
fn test_version_with_build() {
    let v = Version::parse("1.2.3+build.456").unwrap();
    assert_eq!(v.build(), Some("build.456"));
    assert!(!v.is_prerelease());
}

#[test]
fn test_complex_versions() {
    let v1 = Version::parse("v1.2.3-alpha.1+build.123").unwrap();
    assert_eq!(v1.major(), 1);
    assert_eq!(v1.prerelease(), Some("alpha.1"));
    assert_eq!(v1.build(), Some("build.123"));

    let v2: Version = "2.0.0-beta-2".parse().unwrap();
    assert_eq!(v2.prerelease(), Some("beta-2"));
    assert!(v2.build().is_none());
}

#[test]
fn test_version_ordering() {
    let v1 = Version::new(1, 0, 0);
    let v2 = Version::new(1, 1, 0);
    let v3 = Version::new(2, 0, 0);

    assert!(v1 < v2);
    assert!(v2 < v3);
    assert!(v1 < v3);
}

#[test]
fn test_prerelease_ordering() {
    let ordered = [
        "1.0.0-alpha",
        "1.0.0-alpha.1",
        "1.0.0-alpha.beta",
        "1.0.0-beta",
        "1.0.0-beta.2",
        "1.0.0-beta.11",
        "1.0.0-rc.1",
        "1.0.0",
    ];
    let versions: Vec<Version> = ordered.iter().map(|s| s.parse().unwrap()).collect();
    for pair in versions.windows(2) {
        assert!(pair[0] < pair[1], "{} < {}", pair[0], pair[1]);
    }
}

#[test]
fn test_build_metadata_does_not_affect_identity() {
    let plain = Version::parse("1.2.3").unwrap();
    let built = Version::parse("1.2.3+20240101").unwrap();
    assert_eq!(plain, built);
    assert_eq!(plain.cmp(&built), std::cmp::Ordering::Equal);
}

#[test]
fn test_go_module_version() {
    assert_eq!(Version::new(0, 4, 1).to_go_module_version(), "v0.4.1");
    assert_eq!(Version::new(1, 2, 3).to_go_module_version(), "v1.2.3");
    assert_eq!(
        Version::new(2, 0, 0).to_go_module_version(),
        "v2.0.0+incompatible"
    );
    assert_eq!(
        Version::parse("3.1.0-rc.1").unwrap().to_go_module_version(),
        "v3.1.0-rc.1+incompatible"
    );
}

#[test]
fn test_invalid_version() {
    assert!(Version::parse("1.2").is_err());
    assert!(Version::parse("1").is_err());
    assert!(Version::parse("a.b.c").is_err());
    assert!(Version::parse("").is_err());
    assert!(Version::parse("01.2.3").is_err());
}

#[test]
fn test_invalid_prerelease_and_build() {
    for bad in ["1.2.3-", "1.2.3-alpha..1", "1.2.3+", "1.2.3-alpha_1"] {
        let err = Version::parse(bad).unwrap_err();
        assert_eq!(err.input(), bad);
        assert!(err.to_string().contains(bad));
    }
}

#[test]
fn test_leading_zero_prerelease_is_not_a_version() {
    assert!(Version::parse("1.0.0-alpha.01").is_err());
    assert!(Version::parse("1.0.0-rc.00").is_err());
}

#[test]
fn test_distinct_prereleases_are_distinct_identities() {
    let a = Version::parse("1.0.0-alpha.1").unwrap();
    let b = Version::parse("1.0.0-alpha.10").unwrap();
    let c = Version::parse("1.0.0-alpha.1a").unwrap();
    assert_ne!(a, b);
    assert_ne!(a, c);
    assert_ne!(b, c);
}
