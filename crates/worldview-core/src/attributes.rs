//! Per-vertex attribute builders.
//!
//! These flatten marker arrays into the buffers a single batched draw call
//! consumes. Output order always follows input order; blending of
//! overlapping translucent markers depends on it.

use std::ops::Range;

use glam::Vec3;

use crate::color::Color;
use crate::marker::{HasColors, PointsMarker, TextMarker};

/// Flattened attributes of a list of point markers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAttributes {
    pub positions: Vec<Vec3>,
    pub colors: Vec<Color>,
    /// Range of `positions` contributed by each input marker.
    pub marker_ranges: Vec<Range<usize>>,
}

impl PointAttributes {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Expands `count` vertex colors from a marker's color list.
///
/// When fewer colors than vertices are supplied, the last one repeats. With
/// no colors at all, `fallback` (or white) fills every vertex.
pub fn vertex_colors(
    colors: &[Color],
    fallback: Option<Color>,
    count: usize,
) -> impl Iterator<Item = Color> + '_ {
    let fill = colors
        .last()
        .copied()
        .or(fallback)
        .unwrap_or(Color::WHITE);
    colors
        .iter()
        .copied()
        .chain(std::iter::repeat(fill))
        .take(count)
}

/// Emits every point of every marker once, with its resolved color.
pub fn build_point_attributes<'a, I>(markers: I) -> PointAttributes
where
    I: IntoIterator<Item = &'a PointsMarker>,
{
    let mut out = PointAttributes::default();
    for marker in markers {
        let start = out.positions.len();
        out.positions.extend_from_slice(&marker.points);
        out.colors.extend(vertex_colors(
            marker.colors(),
            marker.color(),
            marker.points.len(),
        ));
        out.marker_ranges.push(start..out.positions.len());
    }
    debug_assert_eq!(out.positions.len(), out.colors.len());
    out
}

/// Single color of a marker drawn with one color per instance.
pub fn primary_color<M: HasColors + ?Sized>(marker: &M) -> Color {
    marker
        .colors()
        .first()
        .copied()
        .or_else(|| marker.color())
        .unwrap_or(Color::WHITE)
}

/// Foreground and background of a text label.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextColors {
    pub foreground: Color,
    pub background: Color,
}

/// Resolves the colors of a text marker.
///
/// Normally `colors[0]` is the foreground and `colors[1]` the background.
/// With `auto_background` the background is derived from the foreground
/// alone and any second color is ignored.
pub fn text_colors(marker: &TextMarker, auto_background: bool) -> TextColors {
    let foreground = marker.colors.first().copied().unwrap_or(Color::WHITE);
    let background = if auto_background {
        foreground.contrasting_background()
    } else {
        marker
            .colors
            .get(1)
            .copied()
            .unwrap_or(Color::TRANSPARENT)
    };
    TextColors {
        foreground,
        background,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::Pose;

    fn points(n: usize, colors: Vec<Color>) -> PointsMarker {
        PointsMarker {
            points: (0..n).map(|i| Vec3::new(i as f32, 0.0, 0.0)).collect(),
            colors,
            ..Default::default()
        }
    }

    #[test]
    fn test_last_color_repeats() {
        let marker = points(5, vec![Color::RED, Color::GREEN]);
        let attrs = build_point_attributes([&marker]);
        assert_eq!(
            attrs.colors,
            vec![
                Color::RED,
                Color::GREEN,
                Color::GREEN,
                Color::GREEN,
                Color::GREEN
            ]
        );
    }

    #[test]
    fn test_extra_colors_are_dropped() {
        let marker = points(1, vec![Color::RED, Color::GREEN, Color::BLUE]);
        let attrs = build_point_attributes([&marker]);
        assert_eq!(attrs.colors, vec![Color::RED]);
    }

    #[test]
    fn test_single_color_fallback() {
        let marker = PointsMarker {
            color: Some(Color::BLUE),
            ..points(3, Vec::new())
        };
        let attrs = build_point_attributes([&marker]);
        assert_eq!(attrs.colors, vec![Color::BLUE; 3]);

        let bare = points(2, Vec::new());
        assert_eq!(build_point_attributes([&bare]).colors, vec![Color::WHITE; 2]);
    }

    #[test]
    fn test_length_matches_total_vertex_count_and_order() {
        let a = points(3, vec![Color::RED]);
        let b = points(0, vec![Color::GREEN]);
        let c = PointsMarker {
            pose: Pose::from_position(Vec3::Z),
            ..points(2, vec![Color::BLUE])
        };
        let attrs = build_point_attributes([&a, &b, &c]);
        assert_eq!(attrs.len(), 5);
        assert_eq!(attrs.colors.len(), 5);
        assert_eq!(attrs.marker_ranges, vec![0..3, 3..3, 3..5]);
        assert_eq!(&attrs.colors[..3], &[Color::RED; 3]);
        assert_eq!(&attrs.colors[3..], &[Color::BLUE; 2]);
    }

    #[test]
    fn test_primary_color() {
        let cube = crate::marker::CubeMarker {
            color: Some(Color::GREEN),
            ..Default::default()
        };
        assert_eq!(primary_color(&cube), Color::GREEN);
        let cube = crate::marker::CubeMarker {
            colors: vec![Color::RED],
            ..cube
        };
        assert_eq!(primary_color(&cube), Color::RED);
    }

    #[test]
    fn test_text_colors() {
        let mut marker = TextMarker::new("x", Pose::IDENTITY);
        marker.colors = vec![Color::rgb(0.5, 0.5, 0.5), Color::RED];

        let plain = text_colors(&marker, false);
        assert_eq!(plain.background, Color::RED);

        let auto = text_colors(&marker, true);
        assert_eq!(auto.foreground, Color::rgb(0.5, 0.5, 0.5));
        assert_eq!(auto.background, auto.foreground.contrasting_background());
    }

    #[test]
    fn test_auto_background_ignores_second_color() {
        let mut a = TextMarker::new("x", Pose::IDENTITY);
        a.colors = vec![Color::rgb(0.2, 0.3, 0.4), Color::RED];
        let mut b = a.clone();
        b.colors[1] = Color::BLUE;
        let mut c = a.clone();
        c.colors.truncate(1);

        let expected = text_colors(&a, true).background;
        assert_eq!(text_colors(&b, true).background, expected);
        assert_eq!(text_colors(&c, true).background, expected);
    }
}
