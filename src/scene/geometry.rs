use super::Vec3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn corners(&self) -> [Vec3; 8] {
        let (a, b) = (self.min, self.max);
        [
            Vec3::new(a.x, a.y, a.z),
            Vec3::new(b.x, a.y, a.z),
            Vec3::new(a.x, b.y, a.z),
            Vec3::new(b.x, b.y, a.z),
            Vec3::new(a.x, a.y, b.z),
            Vec3::new(b.x, a.y, b.z),
            Vec3::new(a.x, b.y, b.z),
            Vec3::new(b.x, b.y, b.z),
        ]
    }
}

/// Indexed triangle mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounding_box: Option<Aabb>,
}

impl Geometry {
    /// Box centered on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width / 2.0, height / 2.0, depth / 2.0);
        let positions = vec![
            Vec3::new(-hx, -hy, -hz),
            Vec3::new(hx, -hy, -hz),
            Vec3::new(hx, hy, -hz),
            Vec3::new(-hx, hy, -hz),
            Vec3::new(-hx, -hy, hz),
            Vec3::new(hx, -hy, hz),
            Vec3::new(hx, hy, hz),
            Vec3::new(-hx, hy, hz),
        ];
        let triangles = vec![
            [4, 5, 6],
            [4, 6, 7], // front
            [1, 0, 3],
            [1, 3, 2], // back
            [0, 4, 7],
            [0, 7, 3], // left
            [5, 1, 2],
            [5, 2, 6], // right
            [7, 6, 2],
            [7, 2, 3], // top
            [0, 1, 5],
            [0, 5, 4], // bottom
        ];
        Self {
            positions,
            normals: Vec::new(),
            triangles,
            bounding_box: None,
        }
    }

    /// Capped cylinder along the Y axis, centered on the origin.
    pub fn cylinder(radius_top: f32, radius_bottom: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let hy = height / 2.0;
        let mut positions = Vec::with_capacity(2 * segments as usize + 2);
        for i in 0..segments {
            let theta = i as f32 / segments as f32 * std::f32::consts::TAU;
            let (s, c) = theta.sin_cos();
            positions.push(Vec3::new(radius_top * s, hy, radius_top * c));
            positions.push(Vec3::new(radius_bottom * s, -hy, radius_bottom * c));
        }
        let top_center = positions.len() as u32;
        positions.push(Vec3::new(0.0, hy, 0.0));
        let bottom_center = top_center + 1;
        positions.push(Vec3::new(0.0, -hy, 0.0));

        let mut triangles = Vec::with_capacity(4 * segments as usize);
        for i in 0..segments {
            let next = (i + 1) % segments;
            let (t0, b0, t1, b1) = (2 * i, 2 * i + 1, 2 * next, 2 * next + 1);
            triangles.push([t0, b0, b1]);
            triangles.push([t0, b1, t1]);
            triangles.push([top_center, t0, t1]);
            triangles.push([bottom_center, b1, b0]);
        }

        Self {
            positions,
            normals: Vec::new(),
            triangles,
            bounding_box: None,
        }
    }

    pub fn compute_bounding_box(&mut self) {
        self.bounding_box = self.positions.iter().copied().fold(None, |acc, p| {
            Some(match acc {
                None => Aabb { min: p, max: p },
                Some(b) => Aabb {
                    min: b.min.min(p),
                    max: b.max.max(p),
                },
            })
        });
    }

    /// Area-weighted average of adjacent face normals.
    pub fn compute_vertex_normals(&mut self) {
        let mut normals = vec![Vec3::ZERO; self.positions.len()];
        for tri in &self.triangles {
            let [a, b, c] = tri.map(|i| i as usize);
            let (Some(&pa), Some(&pb), Some(&pc)) =
                (self.positions.get(a), self.positions.get(b), self.positions.get(c))
            else {
                continue;
            };
            let face = (pb - pa).cross(pc - pa);
            for idx in [a, b, c] {
                normals[idx] = normals[idx] + face;
            }
        }
        self.normals = normals.into_iter().map(Vec3::normalize).collect();
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }
}

/// Physically based surface parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Material {
    /// `0xRRGGBB`.
    pub color: u32,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub double_sided: bool,
}

impl Material {
    pub fn standard(color: u32, metalness: f32, roughness: f32) -> Self {
        Self {
            color,
            metalness,
            roughness,
            opacity: 1.0,
            transparent: false,
            double_sided: false,
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self.transparent = self.opacity < 1.0;
        self
    }

    pub fn rgb(&self) -> [u8; 3] {
        [
            ((self.color >> 16) & 0xff) as u8,
            ((self.color >> 8) & 0xff) as u8,
            (self.color & 0xff) as u8,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_bounds_match_dimensions() {
        let mut g = Geometry::cuboid(1.0, 2.2, 0.1);
        g.compute_bounding_box();
        let size = g.bounding_box.unwrap().size();
        assert!((size.x - 1.0).abs() < 1e-6);
        assert!((size.y - 2.2).abs() < 1e-6);
        assert!((size.z - 0.1).abs() < 1e-6);
    }

    #[test]
    fn cuboid_normals_point_outward() {
        let mut g = Geometry::cuboid(2.0, 2.0, 2.0);
        g.compute_vertex_normals();
        assert_eq!(g.normals.len(), 8);
        for (p, n) in g.positions.iter().zip(&g.normals) {
            assert!(p.dot(*n) > 0.0, "normal {:?} at {:?}", n, p);
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn cylinder_has_caps_and_sides() {
        let mut g = Geometry::cylinder(0.05, 0.05, 0.15, 16);
        assert_eq!(g.vertex_count(), 34);
        assert_eq!(g.triangles.len(), 64);
        g.compute_bounding_box();
        let b = g.bounding_box.unwrap();
        assert!((b.size().y - 0.15).abs() < 1e-6);
        assert!(b.size().x <= 0.1 + 1e-6);
    }

    #[test]
    fn opacity_marks_transparency() {
        let m = Material::standard(0xB0E0E6, 0.1, 0.1).with_opacity(0.7);
        assert!(m.transparent);
        assert_eq!(m.rgb(), [0xB0, 0xE0, 0xE6]);
    }
}
