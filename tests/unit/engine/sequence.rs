use super::*;

fn seq(start: i64, end: i64, before: OutOfRangeMode, after: OutOfRangeMode) -> Sequence {
    Sequence {
        start,
        end,
        before,
        after,
    }
}

fn mapped(s: &Sequence, frames: std::ops::RangeInclusive<i64>) -> Vec<SourceFrame> {
    frames.map(|f| s.map(f).unwrap()).collect()
}

#[test]
fn hash_runs_are_zero_padded() {
    assert_eq!(frame_path("plate.####.png", 7), "plate.0007.png");
    assert_eq!(frame_path("plate.#.png", 7), "plate.7.png");
    assert_eq!(frame_path("plate.##.png", 1234), "plate.1234.png");
    assert_eq!(frame_path("a_##/b.###.exr", 5), "a_05/b.005.exr");
}

#[test]
fn negative_frames_keep_their_sign() {
    assert_eq!(frame_path("f.####.png", -12), "f.-0012.png");
}

#[test]
fn paths_without_hashes_are_unchanged() {
    assert_eq!(frame_path("/plates/still.png", 42), "/plates/still.png");
}

#[test]
fn frames_inside_the_sequence_map_to_themselves() {
    let s = seq(10, 12, OutOfRangeMode::Error, OutOfRangeMode::Error);
    use SourceFrame::File;
    assert_eq!(mapped(&s, 10..=12), vec![File(10), File(11), File(12)]);
}

#[test]
fn hold_repeats_the_nearest_end() {
    let s = seq(10, 12, OutOfRangeMode::Hold, OutOfRangeMode::Hold);
    assert_eq!(s.map(3).unwrap(), SourceFrame::File(10));
    assert_eq!(s.map(99).unwrap(), SourceFrame::File(12));
}

#[test]
fn loop_wraps_in_both_directions() {
    let s = seq(1, 3, OutOfRangeMode::Loop, OutOfRangeMode::Loop);
    use SourceFrame::File;
    assert_eq!(mapped(&s, 4..=7), vec![File(1), File(2), File(3), File(1)]);
    assert_eq!(mapped(&s, -2..=0), vec![File(1), File(2), File(3)]);
}

#[test]
fn bounce_ping_pongs() {
    let s = seq(1, 3, OutOfRangeMode::Bounce, OutOfRangeMode::Bounce);
    use SourceFrame::File;
    assert_eq!(
        mapped(&s, 3..=8),
        vec![File(3), File(2), File(1), File(2), File(3), File(2)]
    );
    assert_eq!(mapped(&s, -1..=0), vec![File(3), File(2)]);

    let one = seq(5, 5, OutOfRangeMode::Bounce, OutOfRangeMode::Bounce);
    assert_eq!(one.map(9).unwrap(), File(5));
}

#[test]
fn black_and_error_modes() {
    let s = seq(1, 3, OutOfRangeMode::Black, OutOfRangeMode::Error);
    assert_eq!(s.map(0).unwrap(), SourceFrame::Black);
    let err = s.map(4).unwrap_err();
    assert!(matches!(err, EngineError::BadParameter { ref param, .. } if param == "after_frame"));
}

#[test]
fn inverted_sequence_is_a_bad_parameter() {
    let s = seq(5, 1, OutOfRangeMode::Hold, OutOfRangeMode::Hold);
    assert!(matches!(
        s.map(3),
        Err(EngineError::BadParameter { ref param, .. }) if param == "start_frame"
    ));
}

#[test]
fn mode_parameter_values() {
    assert_eq!(OutOfRangeMode::from_param("before_frame", 2).unwrap(), OutOfRangeMode::Bounce);
    assert!(OutOfRangeMode::from_param("before_frame", 5).is_err());
}

#[test]
fn loop_over_an_extreme_range_does_not_overflow() {
    let s = seq(-1, i64::MAX, OutOfRangeMode::Loop, OutOfRangeMode::Hold);
    assert_eq!(s.map(-2).unwrap(), SourceFrame::File(i64::MAX));
    assert_eq!(s.map(-5).unwrap(), SourceFrame::File(i64::MAX - 3));

    let full = seq(i64::MIN + 1, i64::MAX, OutOfRangeMode::Loop, OutOfRangeMode::Loop);
    assert_eq!(full.map(i64::MIN).unwrap(), SourceFrame::File(i64::MAX));
}

#[test]
fn bounce_over_an_extreme_range_does_not_overflow() {
    let s = seq(0, i64::MAX / 2 + 10, OutOfRangeMode::Bounce, OutOfRangeMode::Hold);
    assert_eq!(s.map(-1).unwrap(), SourceFrame::File(1));
    assert_eq!(s.map(-3).unwrap(), SourceFrame::File(3));

    let wide = seq(-1, i64::MAX, OutOfRangeMode::Bounce, OutOfRangeMode::Hold);
    assert_eq!(wide.map(i64::MIN).unwrap(), SourceFrame::File(i64::MAX - 1));
}
