mod common;

use common::ElectrodeBuilder;
use microdrop::channels::MAX_CHANNEL;
use microdrop::geometry::{DeviceGeometry, Electrode};
use rstest::rstest;

fn overlapping() -> DeviceGeometry {
    // 1 sits on top of 0's right half; definition order decides.
    DeviceGeometry::from_electrodes(vec![
        ElectrodeBuilder::new(0, 0.0, 0.0).build(),
        ElectrodeBuilder::new(1, 5.0, 0.0).build(),
    ])
    .unwrap()
}

// --- HIT TESTS ---
#[rstest]
#[case(1.0, 1.0, Some(0))]
#[case(7.0, 5.0, Some(0))] // overlap resolves to the first defined
#[case(12.0, 5.0, Some(1))]
#[case(0.0, 5.0, None)] // left edge is outside
#[case(10.0, 5.0, Some(1))] // 0's right edge, inside 1
#[case(15.0, 5.0, None)] // 1's right edge
#[case(5.0, 10.0, None)] // bottom edge
#[case(-1.0, -1.0, None)]
fn test_hit_test_unit_scale(#[case] x: f32, #[case] y: f32, #[case] expected: Option<usize>) {
    let geom = overlapping();
    assert_eq!(
        geom.hit_test(x, y, 1.0).map(|e| e.id),
        expected,
        "hit test at ({}, {})",
        x,
        y
    );
}

#[rstest]
#[case(10.0, 55.0, 55.0, Some(0))]
#[case(10.0, 100.0, 50.0, Some(1))]
#[case(2.0, 25.0, 10.0, Some(1))]
#[case(2.0, 31.0, 10.0, None)]
fn test_hit_test_scaled(
    #[case] scale: f32,
    #[case] x: f32,
    #[case] y: f32,
    #[case] expected: Option<usize>,
) {
    let geom = overlapping();
    assert_eq!(geom.hit_test(x, y, scale).map(|e| e.id), expected);
}

#[test]
fn test_hit_test_empty_layout() {
    assert!(DeviceGeometry::new().hit_test(1.0, 1.0, 1.0).is_none());
}

// --- CONSTRUCTION ---
#[test]
fn test_push_assigns_sequential_ids() {
    let mut geom = DeviceGeometry::new();
    assert_eq!(geom.push(0.0, 0.0, 1.9, None).unwrap(), 0);
    assert_eq!(geom.push(2.0, 0.0, 1.9, Some(0.9)).unwrap(), 1);
    assert_eq!(geom.push(4.0, 0.0, 5.9, None).unwrap(), 2);

    let e1 = geom.electrode(1).unwrap();
    assert_eq!(e1.height, 0.9);
    assert_eq!(geom.electrode(2).unwrap().height, 5.9);
}

#[test]
fn test_push_rejects_bad_size_without_consuming_id() {
    let mut geom = DeviceGeometry::new();
    assert!(geom.push(0.0, 0.0, -1.0, None).is_err());
    assert!(geom.is_empty());
    assert_eq!(geom.push(0.0, 0.0, 1.0, None).unwrap(), 0);
}

#[test]
fn test_duplicate_ids_rejected() {
    let result = DeviceGeometry::from_electrodes(vec![
        ElectrodeBuilder::new(3, 0.0, 0.0).build(),
        ElectrodeBuilder::new(3, 20.0, 0.0).build(),
    ]);
    assert!(result.is_err());
}

#[test]
fn test_max_channel_and_bounds() {
    let geom = DeviceGeometry::from_electrodes(vec![
        ElectrodeBuilder::new(0, 2.0, 3.0).channels(&[4, 1]).build(),
        ElectrodeBuilder::new(1, 20.0, 30.0).size(5.0, 2.0).channels(&[9]).build(),
        ElectrodeBuilder::new(2, 0.0, 0.0).size(1.0, 1.0).build(),
    ])
    .unwrap();

    assert_eq!(geom.max_channel(), Some(9));
    let b = geom.bounds().unwrap();
    assert_eq!((b.x, b.y, b.right(), b.bottom()), (0.0, 0.0, 25.0, 32.0));
}

#[test]
fn test_channel_past_the_limit_rejected() {
    let result = DeviceGeometry::from_electrodes(vec![ElectrodeBuilder::new(0, 0.0, 0.0)
        .channels(&[MAX_CHANNEL + 1])
        .build()]);
    assert!(result.is_err());
}

#[rstest]
#[case(10.0, 15.0, 25.0)]
#[case(1.9, 29.5, 21.5)]
#[case(3.0, 6.0, 9.0)] // top-left corner
#[case(3.0, 18.0, 24.0)] // bottom-right corner
fn test_hit_agrees_with_drawn_rect(#[case] scale: f32, #[case] px: f32, #[case] py: f32) {
    let e = Electrode::new(0, 2.0, 3.0, 4.0, Some(5.0)).unwrap();
    assert_eq!(e.contains(px, py, scale), e.rect(scale).contains(px, py));
}

#[test]
fn test_electrode_rect_scales_position_and_size() {
    let e = Electrode::new(0, 2.0, 3.0, 4.0, Some(5.0)).unwrap();
    let r = e.rect(10.0);
    assert_eq!((r.x, r.y, r.width, r.height), (20.0, 30.0, 40.0, 50.0));
}

#[test]
fn test_prototype_hit_at_scale_ten() {
    let geom = DeviceGeometry::prototype();
    // Electrode 0: (29, 21) size 1.9 -> pixels 290..309 x 210..229.
    assert_eq!(geom.hit_test(300.0, 220.0, 10.0).map(|e| e.id), Some(0));
    // Left edge of electrode 0; electrode 5 ends at 289.
    assert!(geom.hit_test(290.0, 220.0, 10.0).is_none());
}
