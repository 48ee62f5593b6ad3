//! Marker definitions
//!
//! Markers are the per-frame input of draw commands. They are owned by the
//! caller; commands only borrow them for the draw call that consumes them.

use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::error::MalformedMarkerError;
use crate::pose::Pose;

/// Discriminant of [`Marker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Points,
    Cube,
    Arrow,
    Axes,
    Text,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 5] = [
        MarkerKind::Points,
        MarkerKind::Cube,
        MarkerKind::Arrow,
        MarkerKind::Axes,
        MarkerKind::Text,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MarkerKind::Points => "points",
            MarkerKind::Cube => "cube",
            MarkerKind::Arrow => "arrow",
            MarkerKind::Axes => "axes",
            MarkerKind::Text => "text",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Markers that carry a pose.
pub trait HasPose {
    fn pose(&self) -> &Pose;
}

/// Markers that carry a per-axis scale.
pub trait HasScale {
    fn scale(&self) -> Vec3;
}

/// Markers that carry colors.
///
/// `colors` is the per-vertex (or per-role) list; `color` is the single
/// fallback used when `colors` is empty.
pub trait HasColors {
    fn colors(&self) -> &[Color];

    fn color(&self) -> Option<Color> {
        None
    }
}

fn unit_scale() -> Vec3 {
    Vec3::ONE
}

/// A cloud of points sharing one pose. `scale.x` is the point size in pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointsMarker {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub points: Vec<Vec3>,
}

impl Default for PointsMarker {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            scale: Vec3::ONE,
            color: None,
            colors: Vec::new(),
            points: Vec::new(),
        }
    }
}

/// An axis-aligned (in marker space) box of size `scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CubeMarker {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub colors: Vec<Color>,
}

impl Default for CubeMarker {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            scale: Vec3::ONE,
            color: None,
            colors: Vec::new(),
        }
    }
}

/// An arrow along the marker's +X axis.
///
/// `scale.x` is the total length, `scale.y` the shaft diameter and
/// `scale.z` the head diameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrowMarker {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "ArrowMarker::default_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub color: Option<Color>,
    #[serde(default)]
    pub colors: Vec<Color>,
    /// Length of the head along X. Unset means [`ArrowMarker::HEAD_RATIO`]
    /// of the total length.
    #[serde(default)]
    pub head_length: Option<f32>,
}

impl ArrowMarker {
    /// Share of the total length taken by the head when `head_length` is unset.
    pub const HEAD_RATIO: f32 = 0.23;

    fn default_scale() -> Vec3 {
        Vec3::new(1.0, 0.05, 0.1)
    }

    /// Head length clamped into `[0, scale.x]`. Non-finite values fall back
    /// to the default ratio.
    pub fn effective_head_length(&self) -> f32 {
        let length = self.scale.x.max(0.0);
        match self.head_length {
            Some(head) if head.is_finite() => head.clamp(0.0, length),
            _ => length * Self::HEAD_RATIO,
        }
    }
}

impl Default for ArrowMarker {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            scale: Self::default_scale(),
            color: None,
            colors: Vec::new(),
            head_length: None,
        }
    }
}

/// A coordinate frame: red X, green Y, blue Z, each `scale` long.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxesMarker {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
}

impl Default for AxesMarker {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// A text label.
///
/// `colors[0]` is the foreground and `colors[1]` the background. `text` is
/// optional because source messages may omit it; such markers are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextMarker {
    #[serde(default)]
    pub pose: Pose,
    #[serde(default = "unit_scale")]
    pub scale: Vec3,
    #[serde(default)]
    pub colors: Vec<Color>,
    #[serde(default)]
    pub text: Option<String>,
    /// Keep the label facing the camera.
    #[serde(default)]
    pub billboard: bool,
}

impl Default for TextMarker {
    fn default() -> Self {
        Self {
            pose: Pose::IDENTITY,
            scale: Vec3::ONE,
            colors: Vec::new(),
            text: None,
            billboard: false,
        }
    }
}

impl TextMarker {
    pub fn new(text: impl Into<String>, pose: Pose) -> Self {
        Self {
            pose,
            text: Some(text.into()),
            ..Default::default()
        }
    }
}

macro_rules! impl_base_traits {
    ($ty:ty) => {
        impl HasPose for $ty {
            fn pose(&self) -> &Pose {
                &self.pose
            }
        }

        impl HasScale for $ty {
            fn scale(&self) -> Vec3 {
                self.scale
            }
        }
    };
}

impl_base_traits!(PointsMarker);
impl_base_traits!(CubeMarker);
impl_base_traits!(ArrowMarker);
impl_base_traits!(AxesMarker);
impl_base_traits!(TextMarker);

macro_rules! impl_has_colors {
    ($ty:ty) => {
        impl HasColors for $ty {
            fn colors(&self) -> &[Color] {
                &self.colors
            }

            fn color(&self) -> Option<Color> {
                self.color
            }
        }
    };
}

impl_has_colors!(PointsMarker);
impl_has_colors!(CubeMarker);
impl_has_colors!(ArrowMarker);

impl HasColors for TextMarker {
    fn colors(&self) -> &[Color] {
        &self.colors
    }
}

/// Any marker, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Marker {
    Points(PointsMarker),
    Cube(CubeMarker),
    Arrow(ArrowMarker),
    Axes(AxesMarker),
    Text(TextMarker),
}

impl Marker {
    pub fn kind(&self) -> MarkerKind {
        match self {
            Marker::Points(_) => MarkerKind::Points,
            Marker::Cube(_) => MarkerKind::Cube,
            Marker::Arrow(_) => MarkerKind::Arrow,
            Marker::Axes(_) => MarkerKind::Axes,
            Marker::Text(_) => MarkerKind::Text,
        }
    }

    pub fn pose(&self) -> &Pose {
        match self {
            Marker::Points(m) => m.pose(),
            Marker::Cube(m) => m.pose(),
            Marker::Arrow(m) => m.pose(),
            Marker::Axes(m) => m.pose(),
            Marker::Text(m) => m.pose(),
        }
    }

    pub fn scale(&self) -> Vec3 {
        match self {
            Marker::Points(m) => m.scale(),
            Marker::Cube(m) => m.scale(),
            Marker::Arrow(m) => m.scale(),
            Marker::Axes(m) => m.scale(),
            Marker::Text(m) => m.scale(),
        }
    }
}

/// A concrete marker struct that a command can select out of a `&[Marker]`.
pub trait MarkerType: HasPose + HasScale + Send + Sync + 'static {
    const KIND: MarkerKind;

    fn from_marker(marker: &Marker) -> Option<&Self>;

    /// Checks the fields this marker kind needs to be drawn.
    fn validate(&self) -> Result<(), MalformedMarkerError> {
        validate_base(Self::KIND, self)
    }

    /// Like [`MarkerType::from_marker`], reporting a mismatch as an error.
    fn select(marker: &Marker) -> Result<&Self, MalformedMarkerError> {
        Self::from_marker(marker).ok_or(MalformedMarkerError::WrongKind {
            expected: Self::KIND,
            found: marker.kind(),
        })
    }
}

fn validate_base<M: HasPose + HasScale + ?Sized>(
    kind: MarkerKind,
    marker: &M,
) -> Result<(), MalformedMarkerError> {
    if !marker.pose().is_finite() {
        return Err(MalformedMarkerError::NonFinite {
            kind,
            field: "pose",
        });
    }
    if !marker.scale().is_finite() {
        return Err(MalformedMarkerError::NonFinite {
            kind,
            field: "scale",
        });
    }
    Ok(())
}

impl MarkerType for PointsMarker {
    const KIND: MarkerKind = MarkerKind::Points;

    fn from_marker(marker: &Marker) -> Option<&Self> {
        match marker {
            Marker::Points(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), MalformedMarkerError> {
        validate_base(Self::KIND, self)?;
        if self.points.iter().any(|p| !p.is_finite()) {
            return Err(MalformedMarkerError::NonFinite {
                kind: Self::KIND,
                field: "points",
            });
        }
        Ok(())
    }
}

impl MarkerType for CubeMarker {
    const KIND: MarkerKind = MarkerKind::Cube;

    fn from_marker(marker: &Marker) -> Option<&Self> {
        match marker {
            Marker::Cube(m) => Some(m),
            _ => None,
        }
    }
}

impl MarkerType for ArrowMarker {
    const KIND: MarkerKind = MarkerKind::Arrow;

    fn from_marker(marker: &Marker) -> Option<&Self> {
        match marker {
            Marker::Arrow(m) => Some(m),
            _ => None,
        }
    }
}

impl MarkerType for AxesMarker {
    const KIND: MarkerKind = MarkerKind::Axes;

    fn from_marker(marker: &Marker) -> Option<&Self> {
        match marker {
            Marker::Axes(m) => Some(m),
            _ => None,
        }
    }
}

impl MarkerType for TextMarker {
    const KIND: MarkerKind = MarkerKind::Text;

    fn from_marker(marker: &Marker) -> Option<&Self> {
        match marker {
            Marker::Text(m) => Some(m),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), MalformedMarkerError> {
        validate_base(Self::KIND, self)?;
        if self.text.is_none() {
            return Err(MalformedMarkerError::MissingField {
                kind: Self::KIND,
                field: "text",
            });
        }
        Ok(())
    }
}

impl From<PointsMarker> for Marker {
    fn from(m: PointsMarker) -> Self {
        Marker::Points(m)
    }
}

impl From<CubeMarker> for Marker {
    fn from(m: CubeMarker) -> Self {
        Marker::Cube(m)
    }
}

impl From<ArrowMarker> for Marker {
    fn from(m: ArrowMarker) -> Self {
        Marker::Arrow(m)
    }
}

impl From<AxesMarker> for Marker {
    fn from(m: AxesMarker) -> Self {
        Marker::Axes(m)
    }
}

impl From<TextMarker> for Marker {
    fn from(m: TextMarker) -> Self {
        Marker::Text(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_kind() {
        let marker: Marker = TextMarker::new("hi", Pose::IDENTITY).into();
        assert_eq!(marker.kind(), MarkerKind::Text);
        assert_eq!(marker.kind().to_string(), "text");
        assert!(TextMarker::from_marker(&marker).is_some());
        assert!(PointsMarker::from_marker(&marker).is_none());
    }

    #[test]
    fn test_select_wrong_kind() {
        let marker: Marker = CubeMarker::default().into();
        assert_eq!(
            PointsMarker::select(&marker),
            Err(MalformedMarkerError::WrongKind {
                expected: MarkerKind::Points,
                found: MarkerKind::Cube,
            })
        );
    }

    #[test]
    fn test_text_without_text_is_malformed() {
        let marker = TextMarker::default();
        assert_eq!(
            marker.validate(),
            Err(MalformedMarkerError::MissingField {
                kind: MarkerKind::Text,
                field: "text",
            })
        );
        assert!(TextMarker::new("ok", Pose::IDENTITY).validate().is_ok());
    }

    #[test]
    fn test_non_finite_fields_are_malformed() {
        let cube = CubeMarker {
            scale: Vec3::new(1.0, f32::INFINITY, 1.0),
            ..Default::default()
        };
        assert!(matches!(
            cube.validate(),
            Err(MalformedMarkerError::NonFinite { field: "scale", .. })
        ));

        let points = PointsMarker {
            points: vec![Vec3::ZERO, Vec3::new(f32::NAN, 0.0, 0.0)],
            ..Default::default()
        };
        assert!(matches!(
            points.validate(),
            Err(MalformedMarkerError::NonFinite { field: "points", .. })
        ));
    }

    #[test]
    fn test_arrow_head_length() {
        let mut arrow = ArrowMarker {
            scale: Vec3::new(2.0, 0.1, 0.2),
            ..Default::default()
        };
        approx::assert_abs_diff_eq!(arrow.effective_head_length(), 0.46, epsilon = 1e-6);

        arrow.head_length = Some(0.5);
        assert_eq!(arrow.effective_head_length(), 0.5);
        arrow.head_length = Some(5.0);
        assert_eq!(arrow.effective_head_length(), 2.0);
        arrow.head_length = Some(-1.0);
        assert_eq!(arrow.effective_head_length(), 0.0);
        arrow.head_length = Some(f32::NAN);
        approx::assert_abs_diff_eq!(arrow.effective_head_length(), 0.46, epsilon = 1e-6);
    }

    #[test]
    fn test_deserialize_tagged_marker() {
        let json = r#"{
            "kind": "text",
            "text": "42",
            "pose": {"position": [1, 2, 3], "orientation": [0, 0, 0, 1]},
            "colors": [{"r": 0.5, "g": 0.5, "b": 0.5, "a": 1}, {"r": 1, "g": 1, "b": 1}]
        }"#;
        let marker: Marker = serde_json::from_str(json).unwrap();
        let Marker::Text(text) = &marker else {
            panic!("expected a text marker, got {:?}", marker.kind());
        };
        assert_eq!(text.text.as_deref(), Some("42"));
        assert_eq!(text.scale, Vec3::ONE);
        assert_eq!(text.colors.len(), 2);
        assert_eq!(marker.pose().position(), Vec3::new(1.0, 2.0, 3.0));
    }
}
