//! Pose display settings.
//!
//! Settings editors live outside the rendering core and hand over plain,
//! immutable snapshots. [`PoseSettings::sanitized`] clamps every field into
//! its documented range; out-of-range input is never an error.

use serde::{Deserialize, Serialize};

use crate::color::Color;

/// How a pose is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PoseModelType {
    #[default]
    Arrow,
    Model,
    Outline,
}

impl PoseModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PoseModelType::Arrow => "arrow",
            PoseModelType::Model => "model",
            PoseModelType::Outline => "outline",
        }
    }
}

/// Unknown model names fall back to the arrow.
impl From<String> for PoseModelType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "model" => PoseModelType::Model,
            "outline" => PoseModelType::Outline,
            _ => PoseModelType::Arrow,
        }
    }
}

impl From<PoseModelType> for String {
    fn from(value: PoseModelType) -> Self {
        value.as_str().to_string()
    }
}

/// Arrow dimensions along the pose's X axis, in marker units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArrowSize {
    pub shaft_width: f32,
    pub head_width: f32,
    pub head_length: f32,
    pub tip_point: f32,
    pub tail_point: f32,
}

impl Default for ArrowSize {
    fn default() -> Self {
        Self {
            shaft_width: 2.0,
            head_width: 2.0,
            head_length: 0.1,
            tip_point: 3.82,
            tail_point: -0.88,
        }
    }
}

impl ArrowSize {
    /// Distance from tail to tip.
    pub fn length(&self) -> f32 {
        self.tip_point - self.tail_point
    }

    fn sanitized(&self) -> ArrowSize {
        let defaults = ArrowSize::default();
        let non_negative = |v: f32, fallback: f32| if v.is_finite() { v.max(0.0) } else { fallback };
        let mut size = ArrowSize {
            shaft_width: non_negative(self.shaft_width, defaults.shaft_width),
            head_width: non_negative(self.head_width, defaults.head_width),
            head_length: non_negative(self.head_length, defaults.head_length),
            tip_point: self.tip_point,
            tail_point: self.tail_point,
        };
        if !(size.tip_point.is_finite() && size.tail_point.is_finite())
            || size.tip_point <= size.tail_point
        {
            size.tip_point = defaults.tip_point;
            size.tail_point = defaults.tail_point;
        }
        size
    }
}

/// Per-topic settings for pose markers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseSettings {
    pub override_color: Option<Color>,
    pub alpha: Option<f32>,
    pub size: ArrowSize,
    pub model_type: PoseModelType,
}

impl PoseSettings {
    pub fn sanitized(&self) -> PoseSettings {
        PoseSettings {
            override_color: self.override_color.map(Color::clamped),
            alpha: self
                .alpha
                .map(|a| if a.is_finite() { a.clamp(0.0, 1.0) } else { 1.0 }),
            size: self.size.sanitized(),
            model_type: self.model_type,
        }
    }

    /// Effective alpha; 1 when unset.
    pub fn alpha(&self) -> f32 {
        self.alpha.unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitized_clamps_alpha() {
        let settings = PoseSettings {
            alpha: Some(3.0),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.alpha(), 1.0);

        let settings = PoseSettings {
            alpha: Some(-1.0),
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.alpha(), 0.0);
    }

    #[test]
    fn test_sanitized_arrow_size() {
        let settings = PoseSettings {
            size: ArrowSize {
                shaft_width: -4.0,
                head_width: f32::NAN,
                tip_point: -2.0,
                tail_point: 1.0,
                ..Default::default()
            },
            ..Default::default()
        }
        .sanitized();
        assert_eq!(settings.size.shaft_width, 0.0);
        assert_eq!(settings.size.head_width, 2.0);
        assert_eq!(settings.size.tip_point, 3.82);
        assert_eq!(settings.size.tail_point, -0.88);
        approx::assert_abs_diff_eq!(settings.size.length(), 4.7, epsilon = 1e-5);
    }

    #[test]
    fn test_unknown_model_type_falls_back_to_arrow() {
        let settings: PoseSettings =
            serde_json::from_str(r#"{"model_type": "freight-9000"}"#).unwrap();
        assert_eq!(settings.model_type, PoseModelType::Arrow);

        let settings: PoseSettings = serde_json::from_str(r#"{"model_type": "outline"}"#).unwrap();
        assert_eq!(settings.model_type, PoseModelType::Outline);
    }
}
