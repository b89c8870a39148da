use std::io::Cursor;
use std::sync::Arc;

use egui::{Pos2, pos2};
use layer_canvas::image_loader::decode_in_background;
use layer_canvas::{
    BrushKind, CanvasError, CanvasSession, CanvasSettings, ContentType, ImageCrateDecoder, ImageHandle, LayerManager,
    PointerEvent, ToolMode,
};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn setup() -> (LayerManager, CanvasSession) {
    init_logger();
    let settings = CanvasSettings::new(200.0, 200.0);
    let mut manager = LayerManager::with_settings(&settings);
    let pixels = image::RgbaImage::from_pixel(20, 10, image::Rgba([255, 0, 0, 255]));
    manager.add_image_layer("Photo", ImageHandle::from_rgba(&pixels).unwrap());
    let mut session = CanvasSession::new(&settings);
    session.set_mode(&mut manager, ToolMode::SelectImage).unwrap();
    (manager, session)
}

fn image_state(manager: &LayerManager) -> (Pos2, bool) {
    let image = manager.layer(1).unwrap().content.image().unwrap();
    (image.position, image.is_selected)
}

fn down(pos: Pos2) -> PointerEvent {
    PointerEvent::Down { pos, pressure: 1.0 }
}

fn drag_to(pos: Pos2) -> PointerEvent {
    PointerEvent::Move { pos, pressure: 1.0 }
}

#[test]
fn test_drag_moves_selected_image() {
    let (mut manager, mut session) = setup();
    let history_before = manager.history().undo_len();

    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    session.handle(&mut manager, drag_to(pos2(10.0, 6.0))).unwrap();
    session.handle(&mut manager, drag_to(pos2(15.0, 8.0))).unwrap();
    session.handle(&mut manager, PointerEvent::Up { pos: pos2(15.0, 8.0) }).unwrap();

    assert_eq!(image_state(&manager), (pos2(10.0, 3.0), true));
    assert_eq!(session.mode(), ToolMode::MoveImage);
    assert!(session.images().drag().is_none());
    assert_eq!(manager.history().undo_len(), history_before + 1);

    manager.undo().unwrap();
    assert_eq!(image_state(&manager).0, Pos2::ZERO);
}

#[test]
fn test_second_tap_deselects_and_returns_to_draw() {
    let (mut manager, mut session) = setup();
    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    session.handle(&mut manager, PointerEvent::Up { pos: pos2(5.0, 5.0) }).unwrap();
    assert!(image_state(&manager).1);

    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    session.handle(&mut manager, PointerEvent::Up { pos: pos2(5.0, 5.0) }).unwrap();
    assert!(!image_state(&manager).1);
    assert_eq!(session.mode(), ToolMode::Draw);
}

#[test]
fn test_choosing_a_brush_deselects() {
    let (mut manager, mut session) = setup();
    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    session.handle(&mut manager, PointerEvent::Up { pos: pos2(5.0, 5.0) }).unwrap();

    session.choose_brush(&mut manager, BrushKind::Pen).unwrap();
    assert!(!image_state(&manager).1);
    assert_eq!(session.mode(), ToolMode::Draw);
    assert!(session.images().selected().is_none());
}

#[test]
fn test_move_mode_without_selection_falls_back() {
    let (mut manager, mut session) = setup();
    let mode = session.set_mode(&mut manager, ToolMode::MoveImage).unwrap();
    assert_eq!(mode, ToolMode::SelectImage);
}

#[test]
fn test_locked_image_cannot_be_dragged() {
    let (mut manager, mut session) = setup();
    manager.set_locked(1, true).unwrap();
    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    let result = session.handle(&mut manager, drag_to(pos2(50.0, 50.0)));
    assert!(matches!(result, Err(CanvasError::LayerLocked(1))));
    assert_eq!(image_state(&manager).0, Pos2::ZERO);
}

#[test]
fn test_drag_onto_retyped_layer_keeps_history() {
    let (mut manager, mut session) = setup();
    manager.add_layer(Some("Ink"));
    manager.undo().unwrap();
    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    manager.set_content_type(1, ContentType::Drawing).unwrap();
    let undo_len = manager.history().undo_len();
    let before = manager.stack().clone();

    let result = session.handle(&mut manager, drag_to(pos2(30.0, 30.0)));
    assert!(matches!(result, Err(CanvasError::PayloadTypeMismatch { .. })));
    assert_eq!(manager.history().undo_len(), undo_len);
    assert!(manager.can_redo());
    assert_eq!(manager.stack(), &before);
    assert!(session.images().drag().is_none());

    // The abandoned gesture does not retry on later samples.
    assert!(!session.handle(&mut manager, drag_to(pos2(40.0, 40.0))).unwrap());
    assert_eq!(manager.history().undo_len(), undo_len);
}

#[test]
fn test_hidden_image_is_not_hit() {
    let (mut manager, mut session) = setup();
    manager.toggle_visibility(1).unwrap();
    session.handle(&mut manager, down(pos2(5.0, 5.0))).unwrap();
    assert!(!image_state(&manager).1);
    assert_eq!(session.mode(), ToolMode::Draw);
}

fn png_bytes() -> Vec<u8> {
    let pixels = image::RgbaImage::from_pixel(8, 6, image::Rgba([0, 255, 0, 255]));
    let mut bytes = Cursor::new(Vec::new());
    pixels.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
    bytes.into_inner()
}

#[test]
fn test_background_decode_attaches_to_target_layer() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    manager.add_layer(Some("Photo"));
    manager.set_content_type(1, ContentType::Image).unwrap();
    let pending = manager.begin_image_load(1).unwrap();

    // The stack changes while decoding runs; the target is tracked by id.
    manager.move_layer(1, 0).unwrap();
    let handle = futures::executor::block_on(decode_in_background(Arc::new(ImageCrateDecoder), png_bytes())).unwrap();
    manager.finish_image_load(pending, handle).unwrap();

    let image = manager.layer(0).unwrap().content.image().unwrap();
    assert_eq!(image.handle.as_ref().map(|h| (h.width(), h.height())), Some((8, 6)));
    assert!(manager.layer(1).unwrap().content.drawing().is_ok());
}

#[test]
fn test_decode_for_deleted_layer_is_dropped() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    manager.add_layer(Some("Photo"));
    manager.set_content_type(1, ContentType::Image).unwrap();
    let pending = manager.begin_image_load(1).unwrap();

    manager.delete_layer(1).unwrap();
    manager.add_layer(Some("Reused index"));
    manager.set_content_type(1, ContentType::Image).unwrap();
    let before = manager.stack().clone();

    let handle = futures::executor::block_on(decode_in_background(Arc::new(ImageCrateDecoder), png_bytes())).unwrap();
    assert!(matches!(
        manager.finish_image_load(pending, handle),
        Err(CanvasError::StaleImageTarget)
    ));
    assert_eq!(manager.stack(), &before);
}

#[test]
fn test_decode_for_retyped_layer_is_dropped() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    manager.set_content_type(0, ContentType::Image).unwrap();
    let pending = manager.begin_image_load(0).unwrap();
    manager.set_content_type(0, ContentType::Drawing).unwrap();

    let handle = futures::executor::block_on(decode_in_background(Arc::new(ImageCrateDecoder), png_bytes())).unwrap();
    assert!(manager.finish_image_load(pending, handle).is_err());
    assert_eq!(manager.current_layer().content_type(), ContentType::Drawing);
}
