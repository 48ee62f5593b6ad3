//! Vertex and instance layouts shared by the built-in commands.
//!
//! Static geometry uses shader locations 0 and 1. Instance data starts at
//! location 2 with the pose (position, orientation, scale), followed by
//! command-specific attributes.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use worldview_core::Pose;

/// Stride and attributes of one vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexLayout {
    pub stride: u64,
    pub attributes: &'static [wgpu::VertexAttribute],
}

impl VertexLayout {
    pub fn buffer_layout(&self, step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode,
            attributes: self.attributes,
        }
    }
}

/// Pose fields of an instance (48 bytes, locations 2..=4).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PoseInstance {
    pub position: [f32; 3],
    /// Command-specific flag; text uses it for billboarding.
    pub flag: f32,
    pub orientation: [f32; 4],
    pub scale: [f32; 3],
    pub _pad: f32,
}

impl PoseInstance {
    pub fn new(pose: &Pose, scale: Vec3) -> Self {
        Self {
            position: pose.position().to_array(),
            flag: 0.0,
            orientation: pose.orientation().to_array(),
            scale: scale.to_array(),
            _pad: 0.0,
        }
    }

    pub fn with_flag(mut self, flag: bool) -> Self {
        self.flag = if flag { 1.0 } else { 0.0 };
        self
    }
}

/// Corner of a unit quad, (0, 0) to (1, 1).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub corner: [f32; 2],
}

impl QuadVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Two triangles covering the unit square.
pub fn unit_quad() -> Vec<QuadVertex> {
    [[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 1.0]]
        .into_iter()
        .map(|corner| QuadVertex { corner })
        .collect()
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PositionNormalVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl PositionNormalVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Unit cube centered on the origin, 36 vertices with face normals.
pub fn unit_cube() -> Vec<PositionNormalVertex> {
    let faces: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
        // normal, u axis, v axis
        ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
    ];

    let mut vertices = Vec::with_capacity(36);
    for (normal, u, v) in faces {
        let n = Vec3::from(normal);
        let (u, v) = (Vec3::from(u), Vec3::from(v));
        let corner = |su: f32, sv: f32| PositionNormalVertex {
            position: (n * 0.5 + u * su * 0.5 + v * sv * 0.5).to_array(),
            normal,
        };
        let quad = [
            corner(-1.0, -1.0),
            corner(1.0, -1.0),
            corner(1.0, 1.0),
            corner(-1.0, 1.0),
        ];
        vertices.extend_from_slice(&[quad[0], quad[1], quad[2], quad[0], quad[2], quad[3]]);
    }
    vertices
}

/// Arrow geometry vertex. `position.w` is 0 on the shaft and 1 on the head.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ArrowVertex {
    pub position: [f32; 4],
    pub normal: [f32; 3],
}

impl ArrowVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x4, 1 => Float32x3];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Unit arrow along +X: a cylinder of diameter 1 from x = 0 to 1, then a
/// cone of base diameter 1 from x = 0 to 1. The shader stretches each part.
pub fn unit_arrow(segments: u32) -> Vec<ArrowVertex> {
    let segments = segments.max(3);
    let ring = |i: u32| {
        let angle = TAU * i as f32 / segments as f32;
        (angle.cos(), angle.sin())
    };
    let vertex = |x: f32, r: f32, (c, s): (f32, f32), normal: [f32; 3], part: f32| ArrowVertex {
        position: [x, c * r, s * r, part],
        normal,
    };

    let mut vertices = Vec::with_capacity(segments as usize * 15);
    for i in 0..segments {
        let (a, b) = (ring(i), ring(i + 1));
        let na = [0.0, a.0, a.1];
        let nb = [0.0, b.0, b.1];

        // Shaft side
        vertices.extend_from_slice(&[
            vertex(0.0, 0.5, a, na, 0.0),
            vertex(1.0, 0.5, a, na, 0.0),
            vertex(1.0, 0.5, b, nb, 0.0),
            vertex(0.0, 0.5, a, na, 0.0),
            vertex(1.0, 0.5, b, nb, 0.0),
            vertex(0.0, 0.5, b, nb, 0.0),
        ]);
        // Shaft tail cap
        vertices.extend_from_slice(&[
            vertex(0.0, 0.0, a, [-1.0, 0.0, 0.0], 0.0),
            vertex(0.0, 0.5, b, [-1.0, 0.0, 0.0], 0.0),
            vertex(0.0, 0.5, a, [-1.0, 0.0, 0.0], 0.0),
        ]);
        // Head base
        vertices.extend_from_slice(&[
            vertex(0.0, 0.0, a, [-1.0, 0.0, 0.0], 1.0),
            vertex(0.0, 0.5, b, [-1.0, 0.0, 0.0], 1.0),
            vertex(0.0, 0.5, a, [-1.0, 0.0, 0.0], 1.0),
        ]);
        // Head cone
        let slope = |(c, s): (f32, f32)| Vec3::new(0.5, c, s).normalize().to_array();
        vertices.extend_from_slice(&[
            vertex(0.0, 0.5, a, slope(a), 1.0),
            vertex(0.0, 0.5, b, slope(b), 1.0),
            vertex(1.0, 0.0, a, [1.0, 0.0, 0.0], 1.0),
        ]);
    }
    vertices
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PositionColorVertex {
    pub position: [f32; 3],
    pub color: [f32; 3],
}

impl PositionColorVertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Three unit lines from the origin (X = red, Y = green, Z = blue).
pub fn axis_lines() -> Vec<PositionColorVertex> {
    let axes = [
        ([1.0, 0.0, 0.0], [1.0, 0.0, 0.0]),
        ([0.0, 1.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, 1.0], [0.0, 0.0, 1.0]),
    ];
    axes.into_iter()
        .flat_map(|(end, color)| {
            [
                PositionColorVertex {
                    position: [0.0; 3],
                    color,
                },
                PositionColorVertex {
                    position: end,
                    color,
                },
            ]
        })
        .collect()
}
