use std::sync::Arc;

use image::{Rgba, RgbaImage};
use image_selector::{
    Point, ProcessingMode, ProcessingStatus, Progress, SelectionEvent, SelectionModel, SelectionState,
    SelectorConfig, ShapeKind, VariantKind,
};
use parking_lot::Mutex;

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 255, 255]);
const CLEAR: Rgba<u8> = Rgba([0, 0, 0, 0]);

const UNIT_SQUARE: [(i32, i32); 4] = [(0, 0), (10, 0), (10, 10), (0, 10)];

fn create_model(mode: ProcessingMode, width: u32, height: u32) -> SelectionModel {
    let config = SelectorConfig {
        variant: VariantKind::FourCorner,
        processing: mode,
        ..SelectorConfig::default()
    };
    let mut model = SelectionModel::new(config);
    model.set_image(RgbaImage::from_pixel(width, height, WHITE)).unwrap();
    model
}

fn select(model: &mut SelectionModel, corners: &[(i32, i32)]) {
    for &(x, y) in corners {
        model.add_point(Point::new(x, y)).unwrap();
    }
}

fn solid(width: u32, height: u32, color: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_pixel(width, height, color)
}

fn snapshot(model: &SelectionModel) -> RgbaImage {
    model.image().unwrap().clone()
}

#[test]
fn test_red_square_fills_enclosed_region() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    model.add_perspective_image(solid(10, 10, RED)).unwrap();
    assert_eq!(model.state(), SelectionState::Selected);

    let image = model.image().unwrap();
    for (x, y, pixel) in image.enumerate_pixels() {
        let expected = if x < 10 && y < 10 { RED } else { WHITE };
        assert_eq!(*pixel, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn test_identity_paste_reproduces_source_pixels() {
    let mut model = create_model(ProcessingMode::Inline, 8, 8);
    select(&mut model, &[(3, 2), (5, 2), (5, 4), (3, 4)]);

    let mut content = RgbaImage::new(2, 2);
    content.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
    content.put_pixel(1, 0, Rgba([40, 50, 60, 255]));
    content.put_pixel(0, 1, Rgba([70, 80, 90, 255]));
    content.put_pixel(1, 1, Rgba([100, 110, 120, 255]));
    model.add_perspective_image(content.clone()).unwrap();

    let image = model.image().unwrap();
    for (x, y, pixel) in image.enumerate_pixels() {
        let expected = if (3..5).contains(&x) && (2..4).contains(&y) {
            *content.get_pixel(x - 3, y - 2)
        } else {
            WHITE
        };
        assert_eq!(*pixel, expected, "pixel ({x}, {y})");
    }
}

#[test]
fn test_transparent_source_leaves_raster_unchanged() {
    let mut model = create_model(ProcessingMode::Inline, 30, 30);
    select(&mut model, &[(2, 3), (25, 1), (28, 27), (4, 20)]);
    let before = snapshot(&model);

    model.add_perspective_image(solid(16, 9, Rgba([255, 0, 0, 0]))).unwrap();
    assert_eq!(model.image().unwrap(), &before);
}

#[test]
fn test_repeated_pastes_do_not_compound() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);
    let half_red = solid(10, 10, Rgba([255, 0, 0, 128]));

    model.add_perspective_image(half_red.clone()).unwrap();
    let once = snapshot(&model);
    model.add_perspective_image(half_red).unwrap();

    assert_eq!(model.image().unwrap(), &once);
    // Half red over opaque white
    let blended = once.get_pixel(5, 5);
    assert_eq!(blended.0[3], 255);
    assert_eq!(blended.0[0], 255);
    assert!((i32::from(blended.0[1]) - 127).abs() <= 1);
    assert_eq!(model.original_image().unwrap(), &solid(20, 20, WHITE));
}

#[test]
fn test_perspective_quad_covers_interior() {
    let mut model = create_model(ProcessingMode::Inline, 64, 64);
    select(&mut model, &[(8, 4), (56, 12), (60, 60), (4, 50)]);

    model.add_perspective_image(solid(40, 20, RED)).unwrap();
    let image = model.image().unwrap();

    assert_eq!(*image.get_pixel(30, 30), RED);
    assert_eq!(*image.get_pixel(1, 1), WHITE);
    assert_eq!(*image.get_pixel(62, 2), WHITE);
}

#[test]
fn test_shape_paste_renders_onto_corners() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    model.add_perspective_shape(ShapeKind::Square, 10, BLUE).unwrap();
    assert_eq!(*model.image().unwrap().get_pixel(4, 4), BLUE);
    assert_eq!(*model.image().unwrap().get_pixel(15, 15), WHITE);
    assert!(model.last_paste().is_some());

    let err = model.add_perspective_shape(ShapeKind::Circle, 0, BLUE).unwrap_err();
    assert!(err.is_invalid_argument());
}

#[test]
fn test_paste_requires_four_corner_selection() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    assert!(model.add_perspective_image(solid(2, 2, RED)).unwrap_err().is_illegal_state());

    select(&mut model, &UNIT_SQUARE[..3]);
    assert!(model.add_perspective_text(solid(2, 2, RED)).unwrap_err().is_illegal_state());

    // Closed early with three corners
    model.finish_selection().unwrap();
    assert!(model.add_perspective_image(solid(2, 2, RED)).unwrap_err().is_illegal_state());

    let mut polygon = SelectionModel::with_variant(VariantKind::PointToPoint);
    polygon.set_image(solid(20, 20, WHITE)).unwrap();
    select(&mut polygon, &UNIT_SQUARE);
    polygon.finish_selection().unwrap();
    assert!(polygon.add_perspective_image(solid(2, 2, RED)).unwrap_err().is_illegal_state());
}

#[test]
fn test_empty_content_is_invalid_argument() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    let err = model.add_perspective_image(RgbaImage::new(0, 5)).unwrap_err();
    assert!(err.is_invalid_argument());
    assert_eq!(model.state(), SelectionState::Selected);
}

#[test]
fn test_collinear_corners_are_numerical_failure() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &[(0, 0), (5, 5), (10, 10), (0, 10)]);
    let before = snapshot(&model);

    let err = model.add_perspective_image(solid(10, 10, RED)).unwrap_err();
    assert!(err.is_numerical_failure());
    assert_eq!(model.state(), SelectionState::Selected);
    assert_eq!(model.image().unwrap(), &before);
    assert!(model.current_job().is_none());
}

#[test]
fn test_background_pass_applies_on_wait() {
    let mut model = create_model(ProcessingMode::Background, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    let job = model.add_perspective_image(solid(10, 10, RED)).unwrap();
    assert_eq!(model.state(), SelectionState::Processing);
    assert_eq!(model.current_job(), Some(job));
    // Nothing is visible until the result is taken on this thread
    assert_eq!(*model.image().unwrap().get_pixel(5, 5), WHITE);

    assert_eq!(model.wait_for_processing(), ProcessingStatus::Applied(job));
    assert_eq!(model.state(), SelectionState::Selected);
    assert_eq!(*model.image().unwrap().get_pixel(5, 5), RED);
    assert_eq!(model.wait_for_processing(), ProcessingStatus::Idle);
}

#[test]
fn test_background_pass_applies_on_poll() {
    let mut model = create_model(ProcessingMode::Background, 20, 20);
    select(&mut model, &UNIT_SQUARE);
    let job = model.add_perspective_image(solid(10, 10, RED)).unwrap();

    let status = loop {
        match model.poll_processing() {
            ProcessingStatus::Running(_) => std::thread::yield_now(),
            status => break status,
        }
    };
    assert_eq!(status, ProcessingStatus::Applied(job));
    assert_eq!(*model.image().unwrap().get_pixel(9, 9), RED);
}

#[test]
fn test_cancel_restores_pre_paste_raster() {
    let mut model = create_model(ProcessingMode::Background, 400, 400);
    select(&mut model, &[(0, 0), (400, 0), (400, 400), (0, 400)]);
    let before = snapshot(&model);

    model.add_perspective_image(solid(400, 400, RED)).unwrap();
    assert_eq!(model.state(), SelectionState::Processing);

    assert!(model.cancel_processing());
    assert_eq!(model.state(), SelectionState::Selected);
    assert_eq!(model.image().unwrap().as_raw(), before.as_raw());
    assert!(model.last_paste().is_none());

    // Idempotent, and the dropped pass never surfaces
    assert!(!model.cancel_processing());
    assert_eq!(model.poll_processing(), ProcessingStatus::Idle);
    assert_eq!(model.image().unwrap().as_raw(), before.as_raw());
}

#[test]
fn test_cancel_after_applied_paste_restores_original() {
    let mut model = create_model(ProcessingMode::Background, 20, 20);
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();
    model.wait_for_processing();

    // A second paste is cancelled; the raster returns to the untouched original
    model.add_perspective_image(solid(10, 10, BLUE)).unwrap();
    model.cancel_processing();
    assert_eq!(model.image().unwrap(), &solid(20, 20, WHITE));
}

#[test]
fn test_operations_rejected_while_processing() {
    let mut model = create_model(ProcessingMode::Background, 50, 50);
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();

    assert!(model.add_point(Point::new(1, 1)).unwrap_err().is_illegal_state());
    assert!(model.move_point(0, Point::new(1, 1)).unwrap_err().is_illegal_state());
    assert!(model.undo().unwrap_err().is_illegal_state());
    assert!(model.finish_selection().unwrap_err().is_illegal_state());
    assert!(model.fill_selection(BLUE).unwrap_err().is_illegal_state());
    assert!(model.set_image(solid(5, 5, RED)).unwrap_err().is_illegal_state());
    assert!(model.switch_variant(VariantKind::PointToPoint).unwrap_err().is_illegal_state());
    assert!(model.add_perspective_image(solid(10, 10, RED)).unwrap_err().is_illegal_state());
    assert_eq!(model.state(), SelectionState::Processing);

    model.cancel_processing();
}

#[test]
fn test_reset_while_processing_cancels_first() {
    let mut model = create_model(ProcessingMode::Background, 50, 50);
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();

    model.reset();
    assert_eq!(model.state(), SelectionState::NoSelection);
    assert!(model.current_job().is_none());
    assert_eq!(model.image().unwrap(), &solid(50, 50, WHITE));
}

#[test]
fn test_paste_events_and_progress() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    model.subscribe(Box::new(move |e: &SelectionEvent| sink.lock().push(e.clone())));

    model.add_perspective_image(solid(10, 10, RED)).unwrap();

    let events = events.lock();
    let progress: Vec<Progress> = events
        .iter()
        .filter_map(|e| match e {
            SelectionEvent::ProgressChanged(p) => Some(*p),
            _ => None,
        })
        .collect();
    assert_eq!(progress.first(), Some(&Progress::Percent(0)));
    assert_eq!(progress.last(), Some(&Progress::Percent(100)));

    assert!(events.iter().any(|e| matches!(
        e,
        SelectionEvent::StateChanged { old: SelectionState::Selected, new: SelectionState::Processing }
    )));
    assert!(matches!(
        events.last(),
        Some(SelectionEvent::RasterChanged)
    ));
    assert!(!events.iter().any(|e| matches!(e, SelectionEvent::ProcessingFailed { .. })));
}

#[test]
fn test_move_point_rewarps_last_paste() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();
    assert_eq!(*model.image().unwrap().get_pixel(12, 12), WHITE);

    model.move_point(2, Point::new(20, 20)).unwrap();
    assert_eq!(model.state(), SelectionState::Selected);
    assert_eq!(*model.image().unwrap().get_pixel(12, 12), RED);
    assert_eq!(*model.image().unwrap().get_pixel(19, 1), WHITE);

    model.undo().unwrap();
    assert_eq!(*model.image().unwrap().get_pixel(12, 12), WHITE);
    assert_eq!(*model.image().unwrap().get_pixel(5, 5), RED);
}

#[test]
fn test_move_point_without_rewarp_keeps_raster() {
    let config = SelectorConfig {
        processing: ProcessingMode::Inline,
        rewarp_on_corner_move: false,
        ..SelectorConfig::default()
    };
    let mut model = SelectionModel::new(config);
    model.set_image(solid(20, 20, WHITE)).unwrap();
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();
    let pasted = snapshot(&model);

    model.move_point(2, Point::new(20, 20)).unwrap();
    assert_eq!(model.image().unwrap(), &pasted);
}

#[test]
fn test_move_to_degenerate_quad_is_rejected_with_paste() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);
    model.add_perspective_image(solid(10, 10, RED)).unwrap();
    let before = model.segments().to_vec();

    // Corner 1 onto the diagonal from corner 0 to corner 2
    let err = model.move_point(1, Point::new(5, 5)).unwrap_err();
    assert!(err.is_numerical_failure());
    assert_eq!(model.segments(), &before[..]);
}

#[test]
fn test_fill_and_delete_selection() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE);

    model.fill_selection(BLUE).unwrap();
    let image = model.image().unwrap();
    assert_eq!(image.pixels().filter(|p| **p == BLUE).count(), 100);
    assert_eq!(*image.get_pixel(10, 10), WHITE);
    assert_eq!(model.original_image().unwrap().get_pixel(3, 3), &BLUE);

    model.delete_selection().unwrap();
    let image = model.image().unwrap();
    assert_eq!(image.pixels().filter(|p| **p == CLEAR).count(), 100);
    assert_eq!(*image.get_pixel(0, 10), WHITE);
}

#[test]
fn test_region_operations_require_selected() {
    let mut model = create_model(ProcessingMode::Inline, 20, 20);
    select(&mut model, &UNIT_SQUARE[..2]);

    assert!(model.fill_selection(BLUE).unwrap_err().is_illegal_state());
    assert!(model.delete_selection().unwrap_err().is_illegal_state());
    assert!(model.save_selection(Vec::new()).unwrap_err().is_illegal_state());
    assert!(model.selection_mask().unwrap_err().is_illegal_state());
}

#[test]
fn test_save_selection_writes_masked_png() {
    let mut model = SelectionModel::with_variant(VariantKind::PointToPoint);
    model.set_image(solid(30, 30, RED)).unwrap();
    select(&mut model, &[(5, 5), (15, 5), (5, 15)]);
    model.finish_selection().unwrap();

    let mut png = Vec::new();
    model.save_selection(&mut png).unwrap();

    let saved = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(saved.dimensions(), (10, 10));
    assert_eq!(*saved.get_pixel(1, 1), RED);
    assert_eq!(*saved.get_pixel(9, 9), CLEAR);

    let mask = model.selection_mask().unwrap();
    assert_eq!(mask.dimensions(), (30, 30));
    assert_eq!(mask.get_pixel(6, 6).0, [255]);
    assert_eq!(mask.get_pixel(14, 14).0, [0]);
}

#[test]
fn test_save_selection_without_covered_pixels_is_rejected() {
    let mut model = SelectionModel::with_variant(VariantKind::PointToPoint);
    model.set_image(solid(30, 30, RED)).unwrap();
    select(&mut model, &[(0, 0), (5, 5)]);
    model.finish_selection().unwrap();
    assert_eq!(model.state(), SelectionState::Selected);

    let mut png = Vec::new();
    let err = model.save_selection(&mut png).unwrap_err();
    assert!(err.is_invalid_argument());
    assert!(png.is_empty());
}
