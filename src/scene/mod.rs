//! Minimal scene graph for the door overlay.
//!
//! Nodes are tagged by capability (`Group`, `Mesh`, `Light`) and walked with
//! explicit traversal. Renderers visit meshes and lights through
//! `SceneVisitor` instead of inspecting node types.

mod cache;
mod doors;
mod geometry;

pub use cache::AssetCache;
pub use doors::{optimize_asset, DoorAsset, DoorGenerator, DoorStyle, ProceduralDoors};
pub use geometry::{Aabb, Geometry, Material};

use std::ops::{Add, Mul, Sub};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    pub fn from_array(a: [f32; 3]) -> Self {
        Self::new(a[0], a[1], a[2])
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }

    /// Move `t` of the way toward `target`.
    pub fn lerp(self, target: Vec3, t: f32) -> Vec3 {
        self + (target - self) * t
    }

    pub fn dot(self, o: Vec3) -> f32 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    pub fn cross(self, o: Vec3) -> Vec3 {
        Vec3::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }

    pub fn length(self) -> f32 {
        self.dot(self).sqrt()
    }

    /// Unit vector, or zero for a zero-length input.
    pub fn normalize(self) -> Vec3 {
        let len = self.length();
        if len > f32::EPSILON {
            self * (1.0 / len)
        } else {
            Vec3::ZERO
        }
    }

    pub fn min(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x.min(o.x), self.y.min(o.y), self.z.min(o.z))
    }

    pub fn max(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x.max(o.x), self.y.max(o.y), self.z.max(o.z))
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

/// Local transform: scale, then XYZ Euler rotation (radians), then translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn matrix(&self) -> Affine {
        let (sx, cx) = self.rotation.x.sin_cos();
        let (sy, cy) = self.rotation.y.sin_cos();
        let (sz, cz) = self.rotation.z.sin_cos();
        // R = Rz * Ry * Rx
        let r = [
            [cy * cz, sx * sy * cz - cx * sz, cx * sy * cz + sx * sz],
            [cy * sz, sx * sy * sz + cx * cz, cx * sy * sz - sx * cz],
            [-sy, sx * cy, cx * cy],
        ];
        let s = self.scale;
        Affine {
            m: [
                [r[0][0] * s.x, r[0][1] * s.y, r[0][2] * s.z],
                [r[1][0] * s.x, r[1][1] * s.y, r[1][2] * s.z],
                [r[2][0] * s.x, r[2][1] * s.y, r[2][2] * s.z],
            ],
            t: self.position,
        }
    }
}

/// 3x3 linear part plus translation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Affine {
    m: [[f32; 3]; 3],
    t: Vec3,
}

impl Affine {
    pub const IDENTITY: Affine = Affine {
        m: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        t: Vec3::ZERO,
    };

    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let m = &self.m;
        Vec3::new(
            m[0][0] * p.x + m[0][1] * p.y + m[0][2] * p.z,
            m[1][0] * p.x + m[1][1] * p.y + m[1][2] * p.z,
            m[2][0] * p.x + m[2][1] * p.y + m[2][2] * p.z,
        ) + self.t
    }

    /// `self * child`: apply `child` first.
    pub fn then(&self, child: &Affine) -> Affine {
        let mut m = [[0.0f32; 3]; 3];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..3).map(|k| self.m[i][k] * child.m[k][j]).sum();
            }
        }
        Affine {
            m,
            t: self.transform_point(child.t),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    Directional,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    pub color: u32,
    pub intensity: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Mesh {
    pub geometry: Geometry,
    pub material: Material,
}

#[derive(Clone, Debug, PartialEq)]
pub enum NodeKind {
    Group,
    Mesh(Mesh),
    Light(Light),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneNode {
    pub name: String,
    pub kind: NodeKind,
    pub transform: Transform,
    pub cast_shadow: bool,
    pub receive_shadow: bool,
    pub children: Vec<SceneNode>,
}

/// Callbacks for a depth-first walk. `world` is the accumulated transform.
pub trait SceneVisitor {
    fn visit_group(&mut self, _node: &SceneNode, _world: &Affine) {}
    fn visit_mesh(&mut self, _node: &SceneNode, _mesh: &Mesh, _world: &Affine) {}
    fn visit_light(&mut self, _node: &SceneNode, _light: &Light, _world: &Affine) {}
}

impl SceneNode {
    fn with_kind(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            transform: Transform::default(),
            cast_shadow: false,
            receive_shadow: false,
            children: Vec::new(),
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::with_kind(name, NodeKind::Group)
    }

    pub fn mesh(name: impl Into<String>, geometry: Geometry, material: Material) -> Self {
        Self::with_kind(name, NodeKind::Mesh(Mesh { geometry, material }))
    }

    pub fn light(name: impl Into<String>, kind: LightKind, color: u32, intensity: f32) -> Self {
        Self::with_kind(
            name,
            NodeKind::Light(Light {
                kind,
                color,
                intensity,
            }),
        )
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.transform.rotation = rotation;
        self
    }

    pub fn add(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    /// Detach the first direct child called `name`.
    pub fn remove_child(&mut self, name: &str) -> Option<SceneNode> {
        let idx = self.children.iter().position(|c| c.name == name)?;
        Some(self.children.remove(idx))
    }

    pub fn clear_children(&mut self) {
        self.children.clear();
    }

    /// Pre-order walk over this node and all descendants.
    pub fn traverse<F: FnMut(&SceneNode)>(&self, f: &mut F) {
        f(self);
        for child in &self.children {
            child.traverse(f);
        }
    }

    pub fn traverse_mut<F: FnMut(&mut SceneNode)>(&mut self, f: &mut F) {
        f(self);
        for child in &mut self.children {
            child.traverse_mut(f);
        }
    }

    pub fn accept<V: SceneVisitor + ?Sized>(&self, visitor: &mut V, parent: &Affine) {
        let world = parent.then(&self.transform.matrix());
        match &self.kind {
            NodeKind::Group => visitor.visit_group(self, &world),
            NodeKind::Mesh(mesh) => visitor.visit_mesh(self, mesh, &world),
            NodeKind::Light(light) => visitor.visit_light(self, light, &world),
        }
        for child in &self.children {
            child.accept(visitor, &world);
        }
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    pub fn mesh_count(&self) -> usize {
        let mut count = 0;
        self.traverse(&mut |n: &SceneNode| {
            if matches!(n.kind, NodeKind::Mesh(_)) {
                count += 1;
            }
        });
        count
    }
}

/// Counts reported by `Scene::info`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SceneCounts {
    pub nodes: usize,
    pub meshes: usize,
    pub lights: usize,
}

/// Root container.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    pub root: SceneNode,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    pub fn new() -> Self {
        Self {
            root: SceneNode::group("scene"),
        }
    }

    pub fn add(&mut self, node: SceneNode) {
        self.root.add(node);
    }

    pub fn clear(&mut self) {
        self.root.clear_children();
    }

    pub fn find(&self, name: &str) -> Option<&SceneNode> {
        self.root.find(name)
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut SceneNode> {
        self.root.find_mut(name)
    }

    pub fn accept<V: SceneVisitor + ?Sized>(&self, visitor: &mut V) {
        self.root.accept(visitor, &Affine::IDENTITY);
    }

    pub fn counts(&self) -> SceneCounts {
        let mut counts = SceneCounts::default();
        self.root.traverse(&mut |n: &SceneNode| {
            counts.nodes += 1;
            match n.kind {
                NodeKind::Mesh(_) => counts.meshes += 1,
                NodeKind::Light(_) => counts.lights += 1,
                NodeKind::Group => {}
            }
        });
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn lerp_moves_fraction_of_distance() {
        let v = Vec3::ZERO.lerp(Vec3::new(10.0, -10.0, 4.0), 0.1);
        assert!(approx(v, Vec3::new(1.0, -1.0, 0.4)));
    }

    #[test]
    fn transforms_compose_parent_then_child() {
        let parent = Transform {
            position: Vec3::new(1.0, 0.0, 0.0),
            rotation: Vec3::ZERO,
            scale: Vec3::splat(2.0),
        };
        let child = Transform {
            position: Vec3::new(0.0, 1.0, 0.0),
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            scale: Vec3::ONE,
        };
        let world = parent.matrix().then(&child.matrix());
        // (1,0,0) rotated 90deg about z is (0,1,0); +child offset (0,2,0); *2; +(1,0,0)
        assert!(approx(
            world.transform_point(Vec3::new(1.0, 0.0, 0.0)),
            Vec3::new(1.0, 4.0, 0.0)
        ));
    }

    #[derive(Default)]
    struct Tally {
        groups: Vec<String>,
        meshes: Vec<String>,
        lights: usize,
    }

    impl SceneVisitor for Tally {
        fn visit_group(&mut self, node: &SceneNode, _world: &Affine) {
            self.groups.push(node.name.clone());
        }
        fn visit_mesh(&mut self, node: &SceneNode, _mesh: &Mesh, _world: &Affine) {
            self.meshes.push(node.name.clone());
        }
        fn visit_light(&mut self, _node: &SceneNode, _light: &Light, _world: &Affine) {
            self.lights += 1;
        }
    }

    #[test]
    fn visitor_dispatches_by_kind() {
        let mut scene = Scene::new();
        scene.add(SceneNode::light("ambient", LightKind::Ambient, 0xffffff, 0.6));
        let mut anchor = SceneNode::group("anchor");
        anchor.add(SceneNode::mesh(
            "panel",
            Geometry::cuboid(1.0, 1.0, 1.0),
            Material::standard(0x808080, 0.5, 0.5),
        ));
        scene.add(anchor);

        let mut tally = Tally::default();
        scene.accept(&mut tally);
        assert_eq!(tally.groups, vec!["scene", "anchor"]);
        assert_eq!(tally.meshes, vec!["panel"]);
        assert_eq!(tally.lights, 1);
        assert_eq!(
            scene.counts(),
            SceneCounts {
                nodes: 4,
                meshes: 1,
                lights: 1
            }
        );
    }

    #[test]
    fn find_and_remove_by_name() {
        let mut root = SceneNode::group("root");
        let mut inner = SceneNode::group("inner");
        inner.add(SceneNode::group("leaf"));
        root.add(inner);
        assert!(root.find("leaf").is_some());
        root.find_mut("leaf").unwrap().transform.position = Vec3::ONE;
        assert_eq!(root.find("leaf").unwrap().transform.position, Vec3::ONE);
        assert!(root.remove_child("leaf").is_none());
        assert!(root.remove_child("inner").is_some());
        assert!(root.find("leaf").is_none());
    }
}
