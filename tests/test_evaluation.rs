use ziffers::{zparse, Binding, Event, Item, Options, ZiffersError, Ziffers};

fn eval(pattern: &str) -> Ziffers {
    zparse(pattern, Options::default().with_seed(42))
        .unwrap_or_else(|e| panic!("Failed to evaluate '{}': {}", pattern, e))
}

fn pitch_classes(root: &Ziffers) -> Vec<i32> {
    root.evaluated_values()
        .iter()
        .filter_map(|e| e.as_pitch().map(|p| p.pitch_class))
        .collect()
}

fn notes(root: &Ziffers) -> Vec<i32> {
    root.evaluated_values()
        .iter()
        .filter_map(|e| e.as_pitch().and_then(|p| p.note))
        .collect()
}

fn octaves(root: &Ziffers) -> Vec<i32> {
    root.evaluated_values()
        .iter()
        .filter_map(|e| e.as_pitch().and_then(|p| p.octave))
        .collect()
}

#[test]
fn test_plain_degrees() {
    let root = eval("1 2 3");
    assert_eq!(pitch_classes(&root), vec![1, 2, 3]);
    assert_eq!(root.durations(), vec![0.25, 0.25, 0.25]);
    assert_eq!(notes(&root), vec![62, 64, 65]);
}

#[test]
fn test_duration_prefixes() {
    let root = eval("q2 eq3 e.4");
    assert_eq!(pitch_classes(&root), vec![2, 3, 4]);
    assert_eq!(root.durations(), vec![0.25, 0.375, 0.1875]);
}

#[test]
fn test_duration_changes_persist() {
    let root = eval("h 1 2 e 3 0.75 4");
    assert_eq!(root.durations(), vec![0.5, 0.5, 0.125, 0.75]);
}

#[test]
fn test_nested_subdivision() {
    let root = eval("w [1 [2 3]]");
    assert_eq!(pitch_classes(&root), vec![1, 2, 3]);
    assert_eq!(root.durations(), vec![0.5, 0.25, 0.25]);
}

#[test]
fn test_subdivision_with_prefix() {
    let root = eval("h[1 2 3 4] 5");
    assert_eq!(root.durations(), vec![0.125, 0.125, 0.125, 0.125, 0.25]);
}

#[test]
fn test_empty_subdivision_is_an_error() {
    let result = zparse("1 []", Options::default());
    assert!(matches!(result, Err(ZiffersError::EmptySequence(_))));
}

#[test]
fn test_nested_repeats() {
    let root = eval("[: 1 [: 2 :] 3 :]");
    assert_eq!(pitch_classes(&root), vec![1, 2, 2, 3, 1, 2, 2, 3]);
}

#[test]
fn test_repeat_count() {
    let root = eval("[: 1 2 :3] 4");
    assert_eq!(pitch_classes(&root), vec![1, 2, 1, 2, 1, 2, 4]);
}

#[test]
fn test_repeated_sequence_replays_random_values() {
    let root = eval("[: 1 (0,1000) 3 :20]");
    let pcs = pitch_classes(&root);
    assert_eq!(pcs.len(), 60);

    let middles: Vec<i32> = pcs.chunks(3).map(|c| c[1]).collect();
    assert!(
        middles.iter().all(|m| *m == middles[0]),
        "Replays should repeat the first draw: {:?}",
        middles
    );
    assert!(pcs.chunks(3).all(|c| c[0] == 1 && c[2] == 3));
}

#[test]
fn test_repeated_list_redraws_random_values() {
    let root = eval("(: 1 (0,1000) 3 :20)");
    let middles: Vec<i32> = pitch_classes(&root).chunks(3).map(|c| c[1]).collect();
    assert_eq!(middles.len(), 20);
    assert!(
        middles.iter().any(|m| *m != middles[0]),
        "Each repeat should draw again: {:?}",
        middles
    );
}

#[test]
fn test_measures_reset_octave() {
    let root = eval("^ 1 | _ 3 | ^3 | 3 | _4");
    assert_eq!(octaves(&root), vec![1, -1, 1, 0, -1]);
}

#[test]
fn test_octave_prefixes() {
    let root = eval("^0 _0 <1>0 <-1>^0 __0");
    assert_eq!(notes(&root), vec![72, 48, 72, 60, 36]);
}

#[test]
fn test_accidentals() {
    let root = eval("#0 b2 ##4");
    assert_eq!(notes(&root), vec![61, 63, 69]);
}

#[test]
fn test_degrees_fold_into_octaves() {
    let root = eval("-1 7 -8");
    assert_eq!(notes(&root), vec![59, 72, 47]);
}

#[test]
fn test_ten_and_eleven() {
    let root = zparse("T E", Options::default().with_scale("Chromatic")).unwrap();
    assert_eq!(pitch_classes(&root), vec![10, 11]);
    assert_eq!(notes(&root), vec![70, 71]);
}

#[test]
fn test_rests() {
    let root = eval("q r e r 1");
    let events = root.evaluated_values();
    assert!(events[0].is_rest() && events[1].is_rest());
    assert_eq!(root.durations(), vec![0.25, 0.125, 0.125]);
}

#[test]
fn test_range_doubles_ambient_octave() {
    let root = eval("1..3 ^ 1..2");
    assert_eq!(pitch_classes(&root), vec![1, 2, 3, 1, 2]);
    assert_eq!(notes(&root), vec![62, 64, 65, 86, 88]);
}

#[test]
fn test_descending_range() {
    let root = eval("3..1");
    assert_eq!(pitch_classes(&root), vec![3, 2, 1]);
}

#[test]
fn test_list_scope_does_not_leak() {
    let root = eval("(^ 1 e 2) 1");
    assert_eq!(octaves(&root), vec![1, 1, 0]);
    assert_eq!(root.durations(), vec![0.25, 0.125, 0.25]);
}

#[test]
fn test_list_prefix_applies_to_children() {
    let root = eval("e(1 2) ^(3)");
    assert_eq!(root.durations(), vec![0.125, 0.125, 0.25]);
    assert_eq!(octaves(&root), vec![0, 0, 1]);
}

#[test]
fn test_random_pitch_within_scale() {
    let root = eval("? ? ? ? ? ? ? ? ? ?");
    assert!(pitch_classes(&root).iter().all(|pc| (0..7).contains(pc)));
}

#[test]
fn test_random_integer_bounds_swapped() {
    let root = eval("(5,1) (5,1) (5,1) (5,1) (5,1)");
    assert!(pitch_classes(&root).iter().all(|pc| (1..=5).contains(pc)));
}

#[test]
fn test_seed_is_reproducible() {
    let pattern = "(0,100) ? (0,100) [? ?]";
    let a = zparse(pattern, Options::default().with_seed(5)).unwrap();
    let b = zparse(pattern, Options::default().with_seed(5)).unwrap();
    assert_eq!(pitch_classes(&a), pitch_classes(&b));
}

#[test]
fn test_euclid_with_rests() {
    let root = eval("(1 2)<3,8>");
    let events = root.evaluated_values();
    assert_eq!(events.len(), 8);
    assert_eq!(pitch_classes(&root), vec![1, 2, 1]);
    let hits: Vec<bool> = events.iter().map(|e| !e.is_rest()).collect();
    assert_eq!(hits, vec![true, false, false, true, false, false, true, false]);
}

#[test]
fn test_euclid_with_offset() {
    let root = eval("(1)<3,8>(5 6)");
    assert_eq!(pitch_classes(&root), vec![1, 5, 6, 1, 5, 6, 1, 5]);
}

#[test]
fn test_euclid_rotation() {
    let root = eval("(1)<3,8,1>");
    let hits: Vec<bool> = root.evaluated_values().iter().map(|e| !e.is_rest()).collect();
    assert_eq!(hits, vec![false, true, false, false, true, false, false, true]);
}

#[test]
fn test_lazy_variable() {
    let root = eval("A=(1 2) A 3 A");
    assert_eq!(pitch_classes(&root), vec![1, 2, 3, 1, 2]);
}

#[test]
fn test_variable_list_layers_its_variables() {
    let root = eval("A=(1) B=(2 3) BA 4");
    let events = root.evaluated_values();
    assert_eq!(events.len(), 2);

    let layered = events[0].as_polyphony().expect("BA should sound as one layered event");
    assert_eq!(layered.text, "BA");
    let layers: Vec<Vec<i32>> = layered
        .layers
        .iter()
        .map(|layer| layer.iter().filter_map(|e| e.as_pitch().map(|p| p.pitch_class)).collect())
        .collect();
    assert_eq!(layers, vec![vec![2, 3], vec![1]]);
    assert_eq!(root.durations(), vec![0.5, 0.25]);
}

#[test]
fn test_variable_list_in_subdivision_scales_every_layer() {
    let root = eval("A=(1 2) B=(3) h [AB 1]");
    let events = root.evaluated_values();
    let layered = events[0].as_polyphony().unwrap();
    let durations: Vec<Vec<f64>> = layered
        .layers
        .iter()
        .map(|layer| layer.iter().filter_map(Event::duration).collect())
        .collect();
    assert_eq!(durations, vec![vec![0.125, 0.125], vec![0.125]]);
    assert_eq!(root.durations(), vec![0.25, 0.25]);
}

#[test]
fn test_pre_evaluated_variable_keeps_draws() {
    let root = eval("B~(0,1000) B B B");
    let pcs = pitch_classes(&root);
    assert_eq!(pcs.len(), 3);
    assert!(pcs.iter().all(|pc| *pc == pcs[0]));
}

#[test]
fn test_unknown_variable() {
    let result = zparse("1 Q", Options::default());
    assert!(matches!(result, Err(ZiffersError::UnknownVariable(name)) if name == "Q"));
}

#[test]
fn test_sample_binding() {
    let options = Options::default().with_binding(
        "K",
        Binding::Sample {
            name: "kick".to_string(),
        },
    );
    let root = zparse("e K 1", options).unwrap();
    match &root.evaluated_values()[0] {
        Event::Sample(sample) => {
            assert_eq!(sample.name, "kick");
            assert_eq!(sample.duration, Some(0.125));
        }
        other => panic!("Expected a sample, got {:?}", other),
    }
}

#[test]
fn test_expression_block() {
    let root = eval("{3+1*2 10%4 q2**2}");
    assert_eq!(pitch_classes(&root), vec![5, 2, 4]);
    assert_eq!(root.durations(), vec![0.25, 0.25, 0.25]);
}

#[test]
fn test_unresolved_without_key() {
    let root = zparse("1 2", Options::bare()).unwrap();
    assert_eq!(pitch_classes(&root), vec![1, 2]);
    assert!(notes(&root).is_empty());
    let first = root.evaluated_values()[0].as_pitch().unwrap();
    assert!(matches!(first.try_note(), Err(ZiffersError::Unresolved(_))));
}

#[test]
fn test_text_round_trip() {
    for pattern in [
        "q 0 2 e 4 [5 6] | h r",
        "[: 1 (0,3) :2] <1 2 3> (1 2)+(3)",
        "A=(0 2) A (0 1)<3,8>(r) {2*3}",
    ] {
        let root = eval(pattern);
        let text: String = root.values().iter().map(|n| n.text()).collect();
        assert_eq!(text, pattern);
        assert_eq!(root.text(), pattern);
    }
}
