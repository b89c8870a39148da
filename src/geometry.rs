use egui::{Pos2, Rect};

use crate::layer::{LayerContent, LayerId};
use crate::stack::LayerStack;

/// Radius of the corner handles drawn around a selected image, in screen pixels
pub const HANDLE_RADIUS: f32 = 8.0;

/// The four corners of a rectangle, in handle drawing order
pub fn corners(rect: Rect) -> [Pos2; 4] {
    [
        rect.left_top(),
        rect.right_top(),
        rect.left_bottom(),
        rect.right_bottom(),
    ]
}

/// Calculate the bounding box for a set of points, grown by `padding`
pub fn calculate_bounds(points: impl IntoIterator<Item = Pos2>, padding: f32) -> Option<Rect> {
    let mut points = points.into_iter();
    let first = points.next()?;
    let rect = points.fold(Rect::from_min_max(first, first), |rect, point| {
        rect.union(Rect::from_min_max(point, point))
    });
    Some(rect.expand(padding))
}

/// Topmost visible image layer whose bounds contain `pos`
pub fn image_at(stack: &LayerStack, pos: Pos2) -> Option<(usize, LayerId)> {
    stack
        .layers()
        .enumerate()
        .rev()
        .filter(|(_, layer)| layer.visible)
        .find_map(|(index, layer)| match &layer.content {
            LayerContent::Image(image) => image
                .rect()
                .filter(|rect| rect.contains(pos))
                .map(|_| (index, layer.id)),
            LayerContent::Drawing(_) => None,
        })
}
