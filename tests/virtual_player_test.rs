use ostinato::model::{Chart, HitObject};
use ostinato::play::Judgement;
use ostinato::replay::{JudgementStat, KeyPressState, Replay, ReplayFrame, VirtualReplayPlayer};
use proptest::prelude::*;

fn frames(edges: &[(f64, u32)]) -> Vec<ReplayFrame> {
    edges
        .iter()
        .map(|&(time_ms, bits)| ReplayFrame::new(time_ms, KeyPressState::from_bits(bits)))
        .collect()
}

fn play(chart: &Chart, replay: &Replay) -> Vec<JudgementStat> {
    let mut player = VirtualReplayPlayer::new(chart, replay).unwrap();
    player.play_all_frames();
    player.stats().to_vec()
}

fn mixed_chart() -> Chart {
    let mut chart = Chart::new(4);
    chart.objects.push(HitObject::tap(0, 500.0));
    chart.objects.push(HitObject::tap(1, 750.0));
    chart.objects.push(HitObject::hold(2, 1_000.0, 1_800.0));
    chart.objects.push(HitObject::tap(3, 1_250.0));
    chart.objects.push(HitObject::tap(0, 1_500.0));
    chart.objects.push(HitObject::hold(1, 2_000.0, 2_600.0));
    chart
}

#[test]
fn mixed_chart_full_playthrough() {
    let chart = mixed_chart();
    let replay = Replay::new(
        4,
        frames(&[
            (0.0, 0b0000),
            (500.0, 0b0001),   // tap 0: exact
            (550.0, 0b0000),
            (790.0, 0b0010),   // tap 1: 40ms late
            (840.0, 0b0000),
            (1_000.0, 0b0100), // hold head: exact
            (1_250.0, 0b1100), // tap 3 while holding
            (1_300.0, 0b0100),
            (1_795.0, 0b0000), // hold tail: 5ms early
            // tap 0 at 1500 is never pressed
            (2_020.0, 0b0010), // hold head: 20ms late
            (2_590.0, 0b0000), // hold tail: 10ms early
            (5_000.0, 0b0000),
        ]),
    );

    let stats = play(&chart, &replay);
    assert_eq!(stats.len(), chart.judgement_count());

    // Ordered by song position throughout.
    for pair in stats.windows(2) {
        assert!(pair[0].song_position_ms <= pair[1].song_position_ms);
    }

    // Every object resolves exactly once per part.
    let mut head_seen = vec![0u32; chart.object_count()];
    let mut tail_seen = vec![0u32; chart.object_count()];
    for stat in &stats {
        if stat.release {
            tail_seen[stat.object_index] += 1;
        } else {
            head_seen[stat.object_index] += 1;
        }
    }
    assert_eq!(head_seen, vec![1; chart.object_count()]);
    for (index, obj) in chart.objects.iter().enumerate() {
        assert_eq!(tail_seen[index], u32::from(obj.is_hold()));
    }

    let miss_count = stats
        .iter()
        .filter(|s| s.judgement == Judgement::Miss)
        .count();
    assert_eq!(miss_count, 1); // only the unpressed tap at 1500
}

#[test]
fn flawless_synthetic_replay_scores_all_marvelous() {
    let chart = mixed_chart();
    let replay = Replay::perfect(&chart);
    let mut player = VirtualReplayPlayer::new(&chart, &replay).unwrap();
    player.play_all_frames();

    assert_eq!(
        player.score().count(Judgement::Marvelous) as usize,
        chart.judgement_count()
    );
    assert_eq!(player.score().accuracy(), 100.0);
    assert_eq!(player.score().max_combo() as usize, chart.judgement_count());
}

#[test]
fn two_players_agree_on_the_same_inputs() {
    let chart = mixed_chart();
    let replay = Replay::new(
        4,
        frames(&[
            (0.0, 0b0000),
            (505.0, 0b0001),
            (560.0, 0b0000),
            (770.0, 0b0010),
            (900.0, 0b0000),
            (1_040.0, 0b0100),
            (1_900.0, 0b0000),
            (3_000.0, 0b0000),
        ]),
    );

    let first = play(&chart, &replay);
    let second = play(&chart, &replay);
    assert_eq!(first, second);
}

prop_compose! {
    /// Arbitrary ordered frame sequence over 4 lanes.
    fn arb_frames()(
        times in prop::collection::vec(0.0f64..4_000.0, 0..48),
        bits in prop::collection::vec(0u32..16, 0..48),
    ) -> Vec<ReplayFrame> {
        let mut times = times;
        times.sort_by(f64::total_cmp);
        times
            .iter()
            .zip(bits.iter().cycle())
            .map(|(&time_ms, &bits)| {
                ReplayFrame::new(time_ms, KeyPressState::from_bits(bits))
            })
            .collect()
    }
}

proptest! {
    #[test]
    fn playback_is_deterministic_for_any_replay(frames in arb_frames()) {
        let chart = mixed_chart();
        let replay = Replay::new(4, frames);

        let first = play(&chart, &replay);
        let second = play(&chart, &replay);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn stream_is_always_ordered_and_complete(frames in arb_frames()) {
        let chart = mixed_chart();
        let replay = Replay::new(4, frames);
        let stats = play(&chart, &replay);

        if replay.is_empty() {
            prop_assert!(stats.is_empty());
        } else {
            prop_assert_eq!(stats.len(), chart.judgement_count());
            for pair in stats.windows(2) {
                prop_assert!(pair[0].song_position_ms <= pair[1].song_position_ms);
            }
        }
    }

    #[test]
    fn every_object_resolves_at_most_once_per_part(frames in arb_frames()) {
        let chart = mixed_chart();
        let replay = Replay::new(4, frames);
        let stats = play(&chart, &replay);

        let mut head_seen = vec![0u32; chart.object_count()];
        let mut tail_seen = vec![0u32; chart.object_count()];
        for stat in &stats {
            if stat.release {
                tail_seen[stat.object_index] += 1;
            } else {
                head_seen[stat.object_index] += 1;
            }
        }
        for count in head_seen.iter().chain(tail_seen.iter()) {
            prop_assert!(*count <= 1);
        }
    }
}
