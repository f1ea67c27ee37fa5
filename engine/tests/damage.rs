use nexus_engine::combat::damage::{Defense, dodge_chance, final_damage, magical_base, physical_base, roll_dodge};
use nexus_engine::content::FlawEffect;
use nexus_engine::{Dice, GameData, Stats};
use proptest::prelude::*;

fn open(stats: &Stats) -> Defense<'_> {
    Defense { stats, defending: false, reduction_factor: 1.0, flaw: None }
}

#[test]
fn unarmored_target_takes_full_base() {
    let stats = Stats::uniform(0);
    assert_eq!(final_damage(10.0, "physical", &open(&stats), 1.0), 10);
}

#[test]
fn durability_halves_at_100() {
    let stats = Stats::new(0, 0, 0, 100, 0);
    assert_eq!(final_damage(10.0, "physical", &open(&stats), 1.0), 5);
}

#[test]
fn defending_stacks_with_durability_and_floors_at_one() {
    let stats = Stats::new(0, 0, 100, 100, 100);
    let guard = Defense { defending: true, ..open(&stats) };
    assert_eq!(final_damage(10.0, "physical", &guard, 1.0), 1);
    assert_eq!(final_damage(0.0, "physical", &open(&stats), 1.0), 1);
}

#[test]
fn flaw_boost_applies_to_its_type_only() {
    let stats = Stats::uniform(0);
    let flaw = FlawEffect {
        opponent_damage_boost: Some(0.1),
        applies_to_type: Some("water".into()),
        ..Default::default()
    };
    let weak = Defense { flaw: Some(&flaw), ..open(&stats) };
    assert_eq!(final_damage(100.0, "water", &weak, 1.0), 110);
    assert_eq!(final_damage(100.0, "fire", &weak, 1.0), 100);
}

#[test]
fn buff_factors_scale_damage() {
    let stats = Stats::uniform(0);
    let shielded = Defense { reduction_factor: 0.5, ..open(&stats) };
    assert_eq!(final_damage(20.0, "physical", &shielded, 1.0), 10);
    assert_eq!(final_damage(20.0, "physical", &open(&stats), 1.5), 30);
}

#[test]
fn base_damage_formulas() {
    let data = GameData::builtin();
    let stats = Stats::new(50, 40, 0, 0, 0);
    assert_eq!(physical_base(&stats, None, None, 0), 10.0);
    let sword = data.weapon_type("Sword");
    let master = data.mastery("Master");
    assert_eq!(physical_base(&stats, sword, master, 5), 10.0 + 10.0 + 10.0 + 5.0);
    assert_eq!(magical_base(&stats, 20), 28.0);
}

#[test]
fn dodge_chance_formula_and_clamp() {
    let data = GameData::builtin();
    let slow = Stats::new(0, 0, 20, 0, 0);
    let fast = Stats::new(0, 0, 70, 0, 0);
    assert_eq!(dodge_chance(&slow, &fast, None, 0.0), 10.0);
    assert_eq!(dodge_chance(&fast, &slow, None, 0.0), 5.0);
    assert_eq!(dodge_chance(&slow, &fast, data.mastery("Grandmaster"), 0.0), 3.0);
    assert_eq!(dodge_chance(&fast, &slow, data.mastery("Grandmaster"), 0.0), 0.0);
    assert_eq!(dodge_chance(&slow, &fast, None, 0.9), 100.0);
    assert_eq!(dodge_chance(&slow, &slow, None, f64::NAN), 0.0);
}

#[test]
fn dodge_roll_is_d100_at_or_under() {
    let mut dice = Dice::from_scripted(vec![0.0]);
    assert!(roll_dodge(&mut dice, 5.0));
    let mut dice = Dice::from_scripted(vec![0.999]);
    assert!(!roll_dodge(&mut dice, 99.0));
    assert!(roll_dodge(&mut dice, 100.0));
}

proptest! {
    #[test]
    fn damage_is_at_least_one(
        base in 0.0f64..200.0,
        dur in 0i32..=100,
        spd in 0i32..=100,
        cs in 0i32..=100,
        defending in any::<bool>(),
        reduction in 0.0f64..=1.0,
    ) {
        let stats = Stats::new(50, 50, spd, dur, cs);
        let defense = Defense { stats: &stats, defending, reduction_factor: reduction, flaw: None };
        prop_assert!(final_damage(base, "physical", &defense, 1.0) >= 1);
    }

    #[test]
    fn dodge_chance_is_a_percentage(a in 0i32..=100, d in 0i32..=100, bonus in 0.0f64..3.0) {
        let c = dodge_chance(&Stats::uniform(a), &Stats::uniform(d), None, bonus);
        prop_assert!((0.0..=100.0).contains(&c));
    }
}
