//! Marker validation errors

use thiserror::Error;

use crate::marker::MarkerKind;

/// A marker that cannot be drawn.
///
/// Commands skip the offending marker and keep drawing the rest of the batch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedMarkerError {
    #[error("{kind} marker is missing required field `{field}`")]
    MissingField {
        kind: MarkerKind,
        field: &'static str,
    },

    #[error("orientation quaternion has zero length or non-finite components")]
    DegenerateOrientation,

    #[error("{kind} marker has a non-finite {field}")]
    NonFinite {
        kind: MarkerKind,
        field: &'static str,
    },

    #[error("expected a {expected} marker, got {found}")]
    WrongKind {
        expected: MarkerKind,
        found: MarkerKind,
    },
}
