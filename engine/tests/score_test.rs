use courtkeeper_engine::score::MatchScore;
use courtkeeper_engine::Error;

// ============================================================================
// Parsing and display
// ============================================================================

#[test]
fn test_parse_and_display_round_trip() {
    let score = MatchScore::parse("21:15,19:21,21:8").expect("valid score");
    assert_eq!(score, MatchScore::Games(vec![(21, 15), (19, 21), (21, 8)]));
    assert_eq!(score.to_string(), "21:15,19:21,21:8");
}

#[test]
fn test_parse_rejects_malformed_input() {
    assert!(MatchScore::parse("21-15").is_err());
    assert!(MatchScore::parse("21:").is_err());
    assert!(MatchScore::parse("a:b").is_err());
}

// ============================================================================
// Winner determination
// ============================================================================

#[test]
fn test_winner_slot() {
    let score = MatchScore::Games(vec![(21, 15), (21, 12)]);
    assert_eq!(score.winner_slot(), Some(1));
    assert!(!score.is_draw());

    let score = MatchScore::Games(vec![(15, 21), (21, 12), (9, 21)]);
    assert_eq!(score.winner_slot(), Some(2));

    let score = MatchScore::Games(vec![(21, 15), (12, 21)]);
    assert_eq!(score.winner_slot(), None, "one game each is a draw");
    assert!(score.is_draw());
}

#[test]
fn test_walkover_carries_only_the_winner() {
    let score = MatchScore::Walkover { winner_slot: 2 };
    assert_eq!(score.winner_slot(), Some(2));
    assert_eq!(score.point_sums(), (0, 0));
    assert!(score.validate(2, false).is_ok());
}

#[test]
fn test_point_sums() {
    let score = MatchScore::Games(vec![(21, 15), (19, 21), (21, 8)]);
    assert_eq!(score.point_sums(), (61, 44));
}

// ============================================================================
// Validation against the category's scoring rules
// ============================================================================

#[test]
fn test_best_of_three_accepts_two_and_three_games() {
    let two_games = MatchScore::Games(vec![(21, 15), (21, 12)]);
    assert!(two_games.validate(2, false).is_ok());

    let three_games = MatchScore::Games(vec![(21, 15), (12, 21), (21, 19)]);
    assert!(three_games.validate(2, false).is_ok());
}

#[test]
fn test_winner_must_take_exactly_win_score_games() {
    // only one game played, nobody reached two
    let short = MatchScore::Games(vec![(21, 15)]);
    assert!(matches!(short.validate(2, false), Err(Error::InvalidScore(_))));

    // four games cannot happen in a best-of-three
    let long = MatchScore::Games(vec![(21, 15), (12, 21), (21, 19), (21, 1)]);
    assert!(matches!(long.validate(2, false), Err(Error::InvalidScore(_))));
}

#[test]
fn test_games_after_the_decision_are_rejected() {
    // slot 1 already won after two games, the third may not exist
    let padded = MatchScore::Games(vec![(21, 15), (21, 12), (12, 21)]);
    assert!(matches!(padded.validate(2, false), Err(Error::InvalidScore(_))));
}

#[test]
fn test_level_games_are_impossible() {
    let level = MatchScore::Games(vec![(21, 21), (21, 12)]);
    assert!(matches!(level.validate(2, false), Err(Error::InvalidScore(_))));
}

#[test]
fn test_draw_mode_plays_a_fixed_game_count() {
    // win score 2 with draws: exactly two games, a split is a draw
    let split = MatchScore::Games(vec![(21, 15), (12, 21)]);
    assert!(split.validate(2, true).is_ok());
    assert!(split.is_draw());

    let sweep = MatchScore::Games(vec![(21, 15), (21, 12)]);
    assert!(sweep.validate(2, true).is_ok());
    assert_eq!(sweep.winner_slot(), Some(1));

    let three = MatchScore::Games(vec![(21, 15), (12, 21), (21, 19)]);
    assert!(matches!(three.validate(2, true), Err(Error::InvalidScore(_))));
}

#[test]
fn test_negative_points_are_rejected() {
    let negative = MatchScore::Games(vec![(21, -3), (21, 12)]);
    assert!(matches!(negative.validate(2, false), Err(Error::InvalidScore(_))));
}
