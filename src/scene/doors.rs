use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use serde::Deserialize;

use super::geometry::{Geometry, Material};
use super::{NodeKind, SceneNode, Vec3};
use crate::error::AssetError;

const HANDLE_SEGMENTS: u32 = 16;

/// The three procedural door styles.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum DoorStyle {
    Classic,
    Modern,
    Glass,
}

impl DoorStyle {
    pub const ALL: [DoorStyle; 3] = [DoorStyle::Classic, DoorStyle::Modern, DoorStyle::Glass];

    pub fn id(self) -> &'static str {
        match self {
            DoorStyle::Classic => "door_classic",
            DoorStyle::Modern => "door_modern",
            DoorStyle::Glass => "door_glass",
        }
    }
}

impl fmt::Display for DoorStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for DoorStyle {
    type Err = AssetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DoorStyle::ALL
            .into_iter()
            .find(|style| style.id() == s.trim())
            .ok_or_else(|| AssetError::UnknownStyle(s.to_string()))
    }
}

impl TryFrom<String> for DoorStyle {
    type Error = AssetError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// A renderable door: a group node holding the meshes of one style.
#[derive(Clone, Debug, PartialEq)]
pub struct DoorAsset {
    pub style: DoorStyle,
    pub root: SceneNode,
}

/// Produces a door scene node for a style.
pub trait DoorGenerator: Send {
    fn generate(&mut self, style: DoorStyle) -> Result<SceneNode>;
}

/// Built-in box/cylinder doors.
#[derive(Debug, Default)]
pub struct ProceduralDoors;

impl DoorGenerator for ProceduralDoors {
    fn generate(&mut self, style: DoorStyle) -> Result<SceneNode> {
        let mut root = SceneNode::group(style.id());
        match style {
            DoorStyle::Classic => classic(&mut root),
            DoorStyle::Modern => modern(&mut root),
            DoorStyle::Glass => glass(&mut root),
        }
        Ok(root)
    }
}

fn frame(color: u32, metalness: f32, roughness: f32) -> SceneNode {
    SceneNode::mesh(
        "frame",
        Geometry::cuboid(1.0, 2.2, 0.1),
        Material::standard(color, metalness, roughness),
    )
    .with_position(Vec3::new(0.0, 0.0, -0.05))
}

fn classic(root: &mut SceneNode) {
    root.add(frame(0x8B4513, 0.3, 0.7));
    root.add(
        SceneNode::mesh(
            "leaf",
            Geometry::cuboid(0.9, 2.0, 0.05),
            Material::standard(0xD2691E, 0.2, 0.6),
        )
        .with_position(Vec3::new(0.0, 0.0, 0.05)),
    );
    root.add(
        SceneNode::mesh(
            "handle",
            Geometry::cylinder(0.05, 0.05, 0.15, HANDLE_SEGMENTS),
            Material::standard(0xFFD700, 0.8, 0.2),
        )
        .with_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2))
        .with_position(Vec3::new(0.3, 0.0, 0.1)),
    );
    for i in 0..2 {
        root.add(
            SceneNode::mesh(
                format!("panel_{}", i),
                Geometry::cuboid(0.7, 0.8, 0.02),
                Material::standard(0xA0522D, 0.1, 0.8),
            )
            .with_position(Vec3::new(0.0, 0.5 - i as f32, 0.08)),
        );
    }
}

fn modern(root: &mut SceneNode) {
    root.add(frame(0x333333, 0.5, 0.5));
    root.add(
        SceneNode::mesh(
            "leaf",
            Geometry::cuboid(0.9, 2.0, 0.04),
            Material::standard(0xF5F5F5, 0.3, 0.4),
        )
        .with_position(Vec3::new(0.0, 0.0, 0.05)),
    );
    root.add(
        SceneNode::mesh(
            "handle",
            Geometry::cuboid(0.08, 0.08, 0.2),
            Material::standard(0xC0C0C0, 0.9, 0.1),
        )
        .with_position(Vec3::new(0.35, 0.0, 0.12)),
    );
    for i in 0..3 {
        root.add(
            SceneNode::mesh(
                format!("line_{}", i),
                Geometry::cuboid(0.8, 0.02, 0.01),
                Material::standard(0xE0E0E0, 0.3, 0.4),
            )
            .with_position(Vec3::new(0.0, -0.6 + i as f32 * 0.6, 0.06)),
        );
    }
}

fn glass(root: &mut SceneNode) {
    root.add(frame(0x444444, 0.6, 0.4));
    root.add(
        SceneNode::mesh(
            "pane",
            Geometry::cuboid(0.85, 1.95, 0.03),
            Material::standard(0xB0E0E6, 0.1, 0.1).with_opacity(0.7),
        )
        .with_position(Vec3::new(0.0, 0.0, 0.05)),
    );
    root.add(
        SceneNode::mesh(
            "handle",
            Geometry::cylinder(0.04, 0.04, 0.2, HANDLE_SEGMENTS),
            Material::standard(0x888888, 0.95, 0.05),
        )
        .with_rotation(Vec3::new(0.0, 0.0, FRAC_PI_2))
        .with_position(Vec3::new(0.35, 0.0, 0.1)),
    );
    for i in 0..2 {
        root.add(
            SceneNode::mesh(
                format!("divider_{}", i),
                Geometry::cuboid(0.85, 0.02, 0.02),
                Material::standard(0x666666, 0.7, 0.3),
            )
            .with_position(Vec3::new(0.0, -0.5 + i as f32, 0.06)),
        );
    }
}

/// Post-process a generated door: bounds, normals, two-sided materials and
/// shadow flags on every mesh.
pub fn optimize_asset(node: &mut SceneNode, shadows: bool) {
    node.traverse_mut(&mut |n: &mut SceneNode| {
        if let NodeKind::Mesh(mesh) = &mut n.kind {
            mesh.geometry.compute_bounding_box();
            mesh.geometry.compute_vertex_normals();
            mesh.material.double_sided = true;
            n.cast_shadow = shadows;
            n.receive_shadow = shadows;
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn style_ids_round_trip() {
        for style in DoorStyle::ALL {
            assert_eq!(style.id().parse::<DoorStyle>().unwrap(), style);
        }
        assert_eq!(
            "door_barn".parse::<DoorStyle>().unwrap_err(),
            AssetError::UnknownStyle("door_barn".into())
        );
    }

    #[test]
    fn styles_have_expected_parts() {
        let mut doors = ProceduralDoors;
        assert_eq!(doors.generate(DoorStyle::Classic).unwrap().mesh_count(), 5);
        assert_eq!(doors.generate(DoorStyle::Modern).unwrap().mesh_count(), 6);
        let glass = doors.generate(DoorStyle::Glass).unwrap();
        assert_eq!(glass.mesh_count(), 5);
        match &glass.find("pane").unwrap().kind {
            NodeKind::Mesh(mesh) => assert!(mesh.material.transparent),
            other => panic!("unexpected node {:?}", other),
        }
    }

    #[test]
    fn optimize_prepares_every_mesh() {
        let mut door = ProceduralDoors.generate(DoorStyle::Classic).unwrap();
        optimize_asset(&mut door, true);
        door.traverse(&mut |n: &SceneNode| {
            if let NodeKind::Mesh(mesh) = &n.kind {
                assert!(mesh.geometry.bounding_box.is_some());
                assert_eq!(mesh.geometry.normals.len(), mesh.geometry.vertex_count());
                assert!(mesh.material.double_sided);
                assert!(n.cast_shadow && n.receive_shadow);
            }
        });
    }
}
