use nexus_engine::{Dice, WeightedOption, random_int, weighted_choice, weighted_choice_name};
use proptest::prelude::*;

#[test]
fn dominant_weight_always_wins() {
    let options = vec![
        WeightedOption::new("A", 10.0),
        WeightedOption::new("B", 0.0),
        WeightedOption::new("C", 0.0),
    ];
    for draw in [0.0, 0.25, 0.5, 0.999] {
        let mut dice = Dice::from_scripted(vec![draw]);
        assert_eq!(weighted_choice_name(&mut dice, &options).as_deref(), Some("A"));
    }
}

#[test]
fn empty_options_yield_nothing() {
    let mut dice = Dice::from_seed(1);
    let options: Vec<WeightedOption> = Vec::new();
    assert!(weighted_choice(&mut dice, &options).is_none());
}

#[test]
fn zero_total_falls_back_to_first() {
    let options = vec![WeightedOption::new("first", 0.0), WeightedOption::new("second", 0.0)];
    let mut dice = Dice::from_scripted(vec![0.7]);
    assert_eq!(weighted_choice_name(&mut dice, &options).as_deref(), Some("first"));
}

#[test]
fn cumulative_scan_follows_list_order() {
    let options = WeightedOption::uniform(&["A", "B", "C"]);
    let mut dice = Dice::from_scripted(vec![0.5]);
    // 0.5 * 3 = 1.5 lands in the second bucket
    assert_eq!(weighted_choice_name(&mut dice, &options).as_deref(), Some("B"));
}

#[test]
fn inverted_range_returns_min() {
    let mut dice = Dice::from_seed(9);
    assert_eq!(random_int(&mut dice, 5, 3), 5);
    assert_eq!(dice.int(7, 7), 7);
}

#[test]
fn scripted_unit_hits_the_requested_integer() {
    for value in 1..=10 {
        let mut dice = Dice::from_scripted(vec![Dice::unit_for_int(value, 1, 10)]);
        assert_eq!(dice.int(1, 10), value);
    }
}

#[test]
fn same_seed_same_rolls() {
    let mut a = Dice::from_seed(2025);
    let mut b = Dice::from_seed(2025);
    let xs: Vec<i32> = (0..20).map(|_| a.int(1, 100)).collect();
    let ys: Vec<i32> = (0..20).map(|_| b.int(1, 100)).collect();
    assert_eq!(xs, ys);
}

proptest! {
    #[test]
    fn int_stays_in_bounds(seed in any::<u64>(), min in -50i32..50, span in 0i32..200) {
        let max = min + span;
        let mut dice = Dice::from_seed(seed);
        for _ in 0..16 {
            let v = dice.int(min, max);
            prop_assert!(v >= min && v <= max);
        }
    }

    #[test]
    fn weighted_choice_returns_a_member(seed in any::<u64>(), weights in proptest::collection::vec(0.0f64..10.0, 1..8)) {
        let options: Vec<WeightedOption> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| WeightedOption::new(format!("opt{}", i), *w))
            .collect();
        let mut dice = Dice::from_seed(seed);
        let picked = weighted_choice(&mut dice, &options).map(|o| o.name.clone());
        prop_assert!(picked.is_some());
        prop_assert!(options.iter().any(|o| Some(&o.name) == picked.as_ref()));
    }
}
