mod common;

use common::{grid_device, test_context, ElectrodeBuilder};
use microdrop::canvas::{Canvas, PixelBuffer};
use microdrop::channels::ChannelStates;
use microdrop::device::DmfDevice;
use microdrop::events::{AppEvent, EventBus};
use microdrop::geometry::DeviceGeometry;
use microdrop::view::{reconcile, DeviceView, ElectrodeState, OFF_COLOR, ON_COLOR};
use rstest::rstest;
use tempfile::tempdir;

const BLUE: [u8; 3] = [0, 0, 255];
const WHITE: [u8; 3] = [255, 255, 255];
const RED: [u8; 3] = [255, 0, 0];
const BLACK: [u8; 3] = [0, 0, 0];

fn two_channel_device() -> DmfDevice {
    let e = ElectrodeBuilder::new(0, 0.0, 0.0).channels(&[3, 4]).build();
    DmfDevice::new(DeviceGeometry::from_electrodes(vec![e]).unwrap())
}

// --- RECONCILIATION ---

#[rstest]
#[case(&[0, 0, 0, 0, 0], ElectrodeState::AllOff)]
#[case(&[0, 0, 0, 1, 0], ElectrodeState::Mixed)]
#[case(&[0, 0, 0, 1, 1], ElectrodeState::AllOn)]
#[case(&[1, 1, 1, 0, 3], ElectrodeState::Mixed)]
fn test_two_channel_electrode(#[case] levels: &[u8], #[case] expected: ElectrodeState) {
    let device = two_channel_device();
    let plan = reconcile(&device, &ChannelStates::from_levels(levels.to_vec()));
    assert_eq!(plan.state_of(0), Some(expected));
    assert_eq!(plan.total(), 1);
}

#[test]
fn test_states_shorter_than_channels_count_as_off() {
    let device = two_channel_device();
    let plan = reconcile(&device, &ChannelStates::zeros(2));
    assert_eq!(plan.off, vec![0]);
}

#[test]
fn test_every_electrode_in_exactly_one_set() {
    let device = grid_device();
    let plan = reconcile(&device, &ChannelStates::from_levels(vec![1, 1, 0]));
    assert_eq!(plan.on, vec![0]);
    assert_eq!(plan.mixed, vec![1]);
    assert_eq!(plan.unassigned, vec![2]);
    assert_eq!(plan.off, vec![3]);
    assert_eq!(plan.total(), device.geometry.len());
}

// --- DRAWING ---

#[test]
fn test_update_paints_each_state() {
    let device = grid_device();
    let mut view = DeviceView::new(10.0);
    let mut canvas = PixelBuffer::new(200, 200);
    let mut bus = EventBus::new();

    let plan = view.update(
        &device,
        &ChannelStates::from_levels(vec![1, 0, 0]),
        &mut canvas,
        &mut bus,
    );

    assert_eq!(plan.on, vec![0]);
    assert_eq!(canvas.pixel(0, 0), Some(WHITE));
    assert_eq!(canvas.pixel(99, 99), Some(WHITE));
    assert_eq!(canvas.pixel(100, 0), Some(BLUE));
    assert_eq!(canvas.pixel(0, 100), Some(RED));
    assert_eq!(canvas.pixel(199, 199), Some(BLUE));
    assert_eq!(view.electrode_color.get(&0), Some(&ON_COLOR));
    assert_eq!(view.electrode_color.get(&3), Some(&OFF_COLOR));
    assert_eq!(bus.pending(), 0);
}

#[test]
fn test_mixed_electrode_is_reported_not_drawn() {
    let device = grid_device();
    let mut view = DeviceView::new(10.0);
    let mut canvas = PixelBuffer::new(200, 200);
    let mut bus = EventBus::new();

    let plan = view.update(
        &device,
        &ChannelStates::from_levels(vec![0, 1, 0]),
        &mut canvas,
        &mut bus,
    );

    assert_eq!(plan.mixed, vec![1]);
    assert_eq!(canvas.pixel(150, 50), Some(BLACK));
    assert!(!view.electrode_color.contains_key(&1));
    assert!(matches!(
        bus.drain().as_slice(),
        [AppEvent::ValidationError { .. }]
    ));
}

#[test]
fn test_update_is_idempotent() {
    let device = grid_device();
    let states = ChannelStates::from_levels(vec![0, 1, 1]);
    let mut view = DeviceView::new(10.0);
    let mut bus = EventBus::new();

    let mut first = PixelBuffer::new(200, 200);
    let plan_a = view.update(&device, &states, &mut first, &mut bus);
    let mut second = first.clone();
    let plan_b = view.update(&device, &states, &mut second, &mut bus);

    assert_eq!(plan_a, plan_b);
    assert_eq!(first, second);
}

#[test]
fn test_fit_device_uses_smaller_axis() {
    let device = DmfDevice::new(
        DeviceGeometry::from_electrodes(vec![
            ElectrodeBuilder::new(0, 5.0, 5.0).size(40.0, 10.0).build(),
        ])
        .unwrap(),
    );
    let mut view = DeviceView::default();
    view.fit_device((200, 200), &device);
    assert_eq!(view.scale, 5.0);
    assert_eq!(view.offset, (-5.0, -5.0));

    // (5,5) in device space lands on the widget origin.
    assert_eq!(view.find_electrode(&device, 1.0, 1.0).map(|e| e.id), Some(0));
    assert_eq!(view.translate_coords(0.0, 0.0), (5.0, 5.0));
}

#[test]
fn test_ppm_header_and_size() {
    let mut canvas = PixelBuffer::new(3, 2);
    canvas.clear(ON_COLOR);
    let mut out = Vec::new();
    canvas.write_ppm(&mut out).unwrap();
    let header = b"P6\n3 2\n255\n";
    assert!(out.starts_with(header));
    assert_eq!(out.len(), header.len() + 3 * 2 * 3);
    assert!(out[header.len()..].iter().all(|&b| b == 255));
}

// --- CONTEXT REACTIONS ---

#[test]
fn test_step_run_redraws_new_step() {
    let dir = tempdir().unwrap();
    let mut ctx = test_context(dir.path());
    let mut canvas = PixelBuffer::new(200, 200);

    ctx.protocol.add_step();
    ctx.protocol
        .current_step_mut()
        .device_options
        .as_mut()
        .unwrap()
        .state_of_channels
        .set(2, 1);
    ctx.protocol.goto_step(0).unwrap();

    ctx.bus.emit(AppEvent::StepRun);
    ctx.process_events(&mut canvas);
    assert_eq!(canvas.pixel(150, 150), Some(BLUE));

    ctx.protocol.goto_step(1).unwrap();
    ctx.bus.emit(AppEvent::StepRun);
    let handled = ctx.process_events(&mut canvas);
    assert_eq!(handled.first(), Some(&AppEvent::StepRun));
    assert_eq!(canvas.pixel(150, 150), Some(WHITE));
}

#[test]
fn test_device_change_refits_and_starts_new_log() {
    let dir = tempdir().unwrap();
    let mut ctx = test_context(dir.path());
    let mut canvas = PixelBuffer::new(200, 200);

    ctx.device = DmfDevice::new(DeviceGeometry::prototype()).named("proto");
    ctx.bus.emit(AppEvent::DeviceChanged {
        name: Some("proto".into()),
    });
    let handled = ctx.process_events(&mut canvas);

    assert!(handled
        .iter()
        .any(|e| matches!(e, AppEvent::ExperimentLogChanged { .. })));
    assert_eq!(
        ctx.experiment_log.directory(),
        Some(dir.path().join("proto").join("logs").as_path())
    );
    assert_ne!(ctx.view.scale, 10.0);
    assert_eq!(ctx.view.electrode_color.len(), ctx.device.geometry.len());
}
