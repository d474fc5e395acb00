use ziffers::{zparse, Event, Options, ZiffersError, Ziffers};

fn eval(pattern: &str) -> Ziffers {
    zparse(pattern, Options::default().with_seed(1))
        .unwrap_or_else(|e| panic!("Failed to evaluate '{}': {}", pattern, e))
}

fn pitch_classes(root: &Ziffers) -> Vec<i32> {
    root.evaluated_values()
        .iter()
        .filter_map(|e| e.as_pitch().map(|p| p.pitch_class))
        .collect()
}

fn chord_pitch_classes(event: &Event) -> Vec<i32> {
    event
        .as_chord()
        .map(|c| c.pitch_classes.iter().map(|p| p.pitch_class).collect())
        .unwrap_or_default()
}

#[test]
fn test_addition_is_cartesian() {
    let root = eval("(1 2)+(3 5)");
    assert_eq!(pitch_classes(&root), vec![4, 5, 6, 7]);
}

#[test]
fn test_subtract_scalar() {
    let root = eval("(3 4)-1");
    assert_eq!(pitch_classes(&root), vec![2, 3]);
}

#[test]
fn test_multiply_divide_modulo() {
    assert_eq!(pitch_classes(&eval("(1 2 3)*(2)")), vec![2, 4, 6]);
    assert_eq!(pitch_classes(&eval("(7 8)/(2)")), vec![3, 4]);
    assert_eq!(pitch_classes(&eval("(7 8)%(3)")), vec![1, 2]);
    assert_eq!(pitch_classes(&eval("(-3)/(2)")), vec![-2]);
}

#[test]
fn test_division_by_zero() {
    let result = zparse("(1 2)/(0)", Options::default());
    assert!(matches!(result, Err(ZiffersError::DivisionByZero)));
}

#[test]
fn test_overflowing_product_is_an_error() {
    let result = zparse("(1)*(100000,100000)*(100000,100000)", Options::default());
    assert!(matches!(result, Err(ZiffersError::ArithmeticOverflow(_))));
}

#[test]
fn test_subdivision_operand() {
    let root = eval("(1 2)+[3 4]");
    assert_eq!(pitch_classes(&root), vec![4, 5, 5, 6]);
    assert_eq!(root.durations(), vec![0.25, 0.25, 0.25, 0.25]);
}

#[test]
fn test_result_keeps_left_duration() {
    let root = eval("(q1 e2)+(1)");
    assert_eq!(pitch_classes(&root), vec![2, 3]);
    assert_eq!(root.durations(), vec![0.25, 0.125]);
    let notes: Vec<Option<i32>> = root
        .evaluated_values()
        .iter()
        .map(|e| e.as_pitch().and_then(|p| p.note))
        .collect();
    assert_eq!(notes, vec![Some(64), Some(65)]);
}

#[test]
fn test_operations_chain_left_to_right() {
    let root = eval("(1 2)+(1)*(2)");
    assert_eq!(pitch_classes(&root), vec![4, 6]);
}

#[test]
fn test_rests_are_dropped() {
    let root = eval("(1 r 2)+(1)");
    assert_eq!(pitch_classes(&root), vec![2, 3]);
    assert!(root.evaluated_values().iter().all(|e| !e.is_rest()));
}

#[test]
fn test_chord_plus_scalar() {
    let root = eval("(024)+(1)");
    let events = root.evaluated_values();
    assert_eq!(events.len(), 1);
    assert_eq!(chord_pitch_classes(&events[0]), vec![1, 3, 5]);
    let chord = events[0].as_chord().unwrap();
    assert_eq!(chord.notes(), vec![Some(62), Some(65), Some(69)]);
}

#[test]
fn test_cyclic_zip() {
    let root = eval("(0 1)<>(4 5 6)");
    assert_eq!(pitch_classes(&root), vec![0, 4, 1, 5, 0, 6]);
}

#[test]
fn test_cyclic_zip_with_durations() {
    let root = eval("(q e)<>(1 2 3)");
    assert_eq!(pitch_classes(&root), vec![1, 2, 3]);
    assert_eq!(root.durations(), vec![0.25, 0.125, 0.25]);
}

#[test]
fn test_vertical_arpeggio() {
    let root = eval("(024)@(0 2 1)");
    assert_eq!(pitch_classes(&root), vec![0, 4, 2]);
}

#[test]
fn test_vertical_arpeggio_takes_index_duration() {
    let root = eval("(024)@(q0 e1 h5)");
    assert_eq!(pitch_classes(&root), vec![0, 2, 4]);
    assert_eq!(root.durations(), vec![0.25, 0.125, 0.5]);
}

#[test]
fn test_vertical_arpeggio_chord_index() {
    let root = eval("(0246)@(03)");
    let events = root.evaluated_values();
    assert_eq!(events.len(), 1);
    assert_eq!(chord_pitch_classes(&events[0]), vec![0, 6]);
}

#[test]
fn test_horizontal_arpeggio() {
    let root = eval("(5 6 7)#(0 2 4)");
    assert_eq!(pitch_classes(&root), vec![5, 7, 6]);
}

#[test]
fn test_map_expression() {
    let root = eval("(0 1 2 3){x%3==0?x-2:x+2}");
    assert_eq!(pitch_classes(&root), vec![-2, 3, 4, 1]);
}

#[test]
fn test_map_over_chord() {
    let root = eval("(024){x+1}");
    assert_eq!(chord_pitch_classes(&root.evaluated_values()[0]), vec![1, 3, 5]);
}

#[test]
fn test_operand_cycles_across_cycles() {
    let mut root = eval("(0 1)+<1 2>");
    let pcs: Vec<i32> = root
        .take(4)
        .unwrap()
        .iter()
        .filter_map(|e| e.as_pitch().map(|p| p.pitch_class))
        .collect();
    assert_eq!(pcs, vec![1, 2, 2, 3]);
}
