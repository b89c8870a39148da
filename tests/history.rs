use layer_canvas::{CanvasError, HistoryManager, LayerManager, LayerStack};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn test_undo_then_redo_restores_identical_stack() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    let empty = manager.stack().clone();
    manager.add_layer(Some("Ink"));
    manager.add_layer(Some("Color"));
    let full = manager.stack().clone();

    manager.undo().unwrap();
    manager.undo().unwrap();
    assert_eq!(manager.stack(), &empty);
    assert!(!manager.can_undo());
    assert!(manager.can_redo());

    manager.redo().unwrap();
    manager.redo().unwrap();
    assert_eq!(manager.stack(), &full);
    assert!(!manager.can_redo());
}

#[test]
fn test_undo_and_redo_past_the_ends() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    assert!(matches!(manager.undo(), Err(CanvasError::HistoryUnderflow)));
    assert!(matches!(manager.redo(), Err(CanvasError::HistoryOverflow)));
    assert_eq!(manager.len(), 1);
}

#[test]
fn test_new_action_discards_redo() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    manager.add_layer(Some("Ink"));
    manager.undo().unwrap();
    assert!(manager.can_redo());

    manager.add_layer(Some("Other"));
    assert!(!manager.can_redo());
    assert_eq!(manager.current_layer().name, "Other");
}

#[test]
fn test_history_limit_drops_oldest() {
    init_logger();
    let mut history = HistoryManager::new(3);
    let mut live = LayerStack::new("Background");
    for i in 0..5 {
        history.save_state(&live);
        live.push(layer_canvas::Layer::new(&format!("L{i}")));
    }
    assert_eq!(history.undo_len(), 3);

    for _ in 0..3 {
        history.undo(&mut live).unwrap();
    }
    assert_eq!(live.len(), 3);
    assert!(history.undo(&mut live).is_err());
}

#[test]
fn test_snapshots_share_untouched_layers() {
    init_logger();
    let mut manager = LayerManager::new("Background");
    manager.add_layer(Some("Ink"));
    manager.rename_layer(1, "Renamed").unwrap();

    let entry = manager.history().last_entry().unwrap();
    assert!(manager.stack().shares_layer_with(entry.stack(), 0));
    assert!(!manager.stack().shares_layer_with(entry.stack(), 1));
}
