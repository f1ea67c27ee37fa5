use nexus_engine::opponent::{base_stat_bounds, synthesize_character, synthesize_opponent, target_rating};
use nexus_engine::{Dice, GameData, Rank};
use proptest::prelude::*;

#[test]
fn target_rating_tracks_rank_threshold() {
    let mut dice = Dice::from_scripted(vec![0.0]);
    assert_eq!(target_rating(Rank::C, &mut dice), 50.0);

    let mut dice = Dice::from_scripted(vec![0.999]);
    assert_eq!(target_rating(Rank::C, &mut dice), 65.0);
    assert_eq!(target_rating(Rank::SsPlus, &mut dice), 100.0);

    let mut dice = Dice::from_scripted(vec![0.0]);
    assert_eq!(target_rating(Rank::F, &mut dice), 0.0);
}

#[test]
fn stat_bounds_stay_ordered() {
    assert_eq!(base_stat_bounds(0.0), (20, 20));
    assert_eq!(base_stat_bounds(100.0), (45, 75));
    for t in 0..=100 {
        let (lo, hi) = base_stat_bounds(t as f64);
        assert!(lo <= hi);
        assert!(lo >= 20 && hi <= 100);
    }
}

#[test]
fn opponent_is_a_ready_participant() {
    let data = GameData::builtin();
    let mut dice = Dice::from_seed(11);
    let foe = synthesize_opponent(Rank::B, &mut dice, data).expect("participant");
    assert_eq!(foe.health.hp, foe.health.max_hp);
    assert!(foe.buffs.is_empty());
    assert!(foe.name().starts_with("AI - "));
}

proptest! {
    #[test]
    fn low_rank_opponents_come_from_common_races(seed in any::<u64>()) {
        let data = GameData::builtin();
        let mut dice = Dice::from_seed(seed);
        let foe = synthesize_character(Rank::F, &mut dice, data);
        let race = data.race(&foe.sheet().race).expect("catalog race");
        prop_assert!(race.rarity < 30.0);
    }

    #[test]
    fn opponents_respect_stat_rules(seed in any::<u64>(), rank_idx in 0usize..8) {
        let data = GameData::builtin();
        let rank = Rank::ASCENDING[rank_idx];
        let mut dice = Dice::from_seed(seed);
        let foe = synthesize_character(rank, &mut dice, data);

        prop_assert!(foe.stats().count_exceptional() <= 1);
        for (_, v) in foe.stats().iter() {
            prop_assert!((20..=85).contains(&v));
        }
        let number: i32 = foe
            .name()
            .rsplit(' ')
            .next()
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);
        prop_assert!((100..=999).contains(&number));
        prop_assert_eq!(foe.level, 1);
        prop_assert_eq!(foe.nexus_rank(), Rank::for_rating(foe.nexus_rating()));
    }
}
