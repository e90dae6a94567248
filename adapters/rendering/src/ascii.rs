//! Text rasterisation of a scene for headless inspection.

use bike_swarm_core::{Bounds, VisualRole};

use crate::SceneSink;

const EMPTY_CELL: char = ' ';
const TRAIL_CELL: char = '.';
const HEADING_RIGHT: char = '>';
const HEADING_LEFT: char = '<';

/// Draws every placed visual of `sink` onto a `columns` x `rows` character grid.
///
/// Sprites are drawn as arrows pointing along their heading and override
/// trails sharing the same cell. Visuals outside `bounds` are skipped.
#[must_use]
pub fn render_ascii(sink: &SceneSink, bounds: Bounds, columns: usize, rows: usize) -> String {
    if columns == 0 || rows == 0 || bounds.width() <= 0.0 || bounds.height() <= 0.0 {
        return String::new();
    }

    let mut grid = vec![vec![EMPTY_CELL; columns]; rows];
    let mut visuals: Vec<_> = sink
        .iter()
        .filter_map(|(_, visual)| visual.transform().map(|transform| (visual.role(), transform)))
        .collect();
    // Trails first so sprites land on top.
    visuals.sort_by_key(|(role, _)| *role == VisualRole::Sprite);

    for (role, transform) in visuals {
        let position = transform.position;
        if position.x < 0.0
            || position.y < 0.0
            || position.x >= bounds.width()
            || position.y >= bounds.height()
        {
            continue;
        }
        let column = ((position.x / bounds.width()) * columns as f32) as usize;
        let row = ((position.y / bounds.height()) * rows as f32) as usize;
        let symbol = match (role, transform.mirrored) {
            (VisualRole::Trail, _) => TRAIL_CELL,
            (VisualRole::Sprite, false) => HEADING_RIGHT,
            (VisualRole::Sprite, true) => HEADING_LEFT,
        };
        grid[row.min(rows - 1)][column.min(columns - 1)] = symbol;
    }

    grid.into_iter()
        .map(|line| line.into_iter().collect::<String>())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bike_swarm_core::{RenderSink, Transform};
    use glam::Vec2;

    fn place(sink: &mut SceneSink, role: VisualRole, position: Vec2, mirrored: bool) {
        let handle = sink.create_handle(role, "b");
        sink.set_transform(handle, Transform::at(position, mirrored))
            .expect("fresh handle is live");
    }

    #[test]
    fn sprites_override_trails_in_the_same_cell() {
        let mut sink = SceneSink::new();
        place(&mut sink, VisualRole::Sprite, Vec2::new(10.0, 10.0), false);
        place(&mut sink, VisualRole::Trail, Vec2::new(12.0, 12.0), false);
        place(&mut sink, VisualRole::Sprite, Vec2::new(75.0, 0.0), true);
        place(&mut sink, VisualRole::Trail, Vec2::new(50.0, 75.0), false);

        let frame = render_ascii(&sink, Bounds::new(100.0, 100.0), 4, 4);

        assert_eq!(frame, ">  <\n    \n    \n  . ");
    }

    #[test]
    fn offscreen_and_unplaced_visuals_are_skipped() {
        let mut sink = SceneSink::new();
        place(&mut sink, VisualRole::Sprite, Vec2::new(10.0, -32.0), false);
        place(&mut sink, VisualRole::Sprite, Vec2::new(10.0, 140.0), false);
        let _ = sink.create_handle(VisualRole::Sprite, "b");

        let frame = render_ascii(&sink, Bounds::new(100.0, 100.0), 2, 1);

        assert_eq!(frame, "  ");
    }

    #[test]
    fn degenerate_grids_render_nothing() {
        let sink = SceneSink::new();
        assert!(render_ascii(&sink, Bounds::new(100.0, 100.0), 0, 3).is_empty());
        assert!(render_ascii(&sink, Bounds::new(0.0, 100.0), 3, 3).is_empty());
    }
}
