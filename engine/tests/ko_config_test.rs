use courtkeeper_engine::services::ko_config::{GroupDef, KoConfig, KoStartLevel};
use courtkeeper_engine::Error;

// ============================================================================
// Parsing and serialisation
// ============================================================================

#[test]
fn test_parse_simple_config() {
    let cfg = KoConfig::parse("S;1;2;4;").expect("valid config");
    assert_eq!(cfg.start_level, KoStartLevel::Semi);
    assert!(cfg.second_survives);
    assert_eq!(cfg.group_defs, vec![GroupDef::new(2, 4).unwrap()]);
}

#[test]
fn test_parse_multiple_group_blocks() {
    let cfg = KoConfig::parse("Q;0;4;4;4;5;").expect("valid config");
    assert_eq!(cfg.start_level, KoStartLevel::Quarter);
    assert!(!cfg.second_survives);
    assert_eq!(cfg.group_defs.len(), 2);
    assert_eq!(cfg.num_groups(), 8);
    assert_eq!(cfg.capacity(), 16 + 20);
}

#[test]
fn test_to_string_round_trip() {
    for raw in ["S;1;2;4;", "Q;0;8;3;", "L16;1;4;4;4;3;"] {
        let cfg = KoConfig::parse(raw).expect("valid config");
        let reparsed = KoConfig::parse(&cfg.to_config_string()).expect("round trip");
        assert_eq!(cfg, reparsed, "round trip changed {raw}");
    }
}

#[test]
fn test_parse_rejects_garbage() {
    for raw in [
        "",
        "S",
        "S;1",          // odd separator count
        "X;1;2;4;",     // unknown start level
        "S;2;2;4;",     // bad second-survives flag
        "S;1;2;two;",   // non-numeric group size
        "S;1;2;2;",     // group size below three
    ] {
        assert!(
            matches!(KoConfig::parse(raw), Err(Error::InvalidKoConfig)),
            "{raw:?} should be rejected"
        );
    }
}

// ============================================================================
// Validity and counting
// ============================================================================

#[test]
fn test_required_groups_per_start_level() {
    let semi = KoConfig::parse("S;0;4;4;").unwrap();
    assert_eq!(semi.required_groups(), 4);

    let semi_seconds = KoConfig::parse("S;1;2;4;").unwrap();
    assert_eq!(semi_seconds.required_groups(), 2);

    let quarter_seconds = KoConfig::parse("Q;1;4;4;").unwrap();
    assert_eq!(quarter_seconds.required_groups(), 4);

    let l16 = KoConfig::parse("L16;0;16;3;").unwrap();
    assert_eq!(l16.required_groups(), 16);
}

#[test]
fn test_is_valid_checks_groups_and_capacity() {
    let cfg = KoConfig::parse("S;1;2;4;").unwrap();
    assert!(cfg.is_valid(8));
    assert!(!cfg.is_valid(7), "capacity mismatch");

    // two groups cannot feed quarter finals even with seconds surviving
    let cfg = KoConfig::parse("Q;1;2;4;").unwrap();
    assert!(!cfg.is_valid(8));
}

#[test]
fn test_match_counts() {
    // 2 groups of 4: 6 round-robin matches each, semis + final + 3rd place
    let cfg = KoConfig::parse("S;1;2;4;").unwrap();
    assert_eq!(cfg.num_group_matches(), 12);
    assert_eq!(cfg.num_matches(), 12 + 4);

    // quarter finals add four more KO matches
    let cfg = KoConfig::parse("Q;1;4;4;").unwrap();
    assert_eq!(cfg.num_group_matches(), 24);
    assert_eq!(cfg.num_matches(), 24 + 8);
}

#[test]
fn test_round_counts() {
    let cfg = KoConfig::parse("S;1;2;4;").unwrap();
    assert_eq!(cfg.num_group_rounds(), 3, "groups of four play three rounds");
    assert_eq!(cfg.start_level.num_rounds(), 2, "semis and final");

    let cfg = KoConfig::parse("Q;0;8;5;").unwrap();
    assert_eq!(cfg.num_group_rounds(), 5, "odd group sizes need a bye round");
    assert_eq!(cfg.start_level.num_rounds(), 3);
}
