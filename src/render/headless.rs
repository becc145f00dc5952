use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use image::{Rgba, RgbaImage};

use super::{GraphicsBackend, PerspectiveCamera};
use crate::scene::{Affine, Light, LightKind, Mesh, Scene, SceneNode, SceneVisitor, Vec3};

/// Counters shared with whoever created the renderer.
#[derive(Debug, Default)]
pub struct HeadlessStats {
    frames: AtomicU64,
    meshes_released: AtomicU64,
    disposed: AtomicBool,
}

impl HeadlessStats {
    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn meshes_released(&self) -> u64 {
        self.meshes_released.load(Ordering::SeqCst)
    }

    pub fn disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }
}

/// Software backend: fills each mesh's projected bounds with its lit color.
///
/// The canvas is transparent where nothing is drawn so it can be composited
/// over the camera feed.
pub struct HeadlessRenderer {
    canvas: Option<RgbaImage>,
    painted: bool,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    shadows: bool,
    fail_init: Option<String>,
    stats: Arc<HeadlessStats>,
}

impl Default for HeadlessRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self {
            canvas: None,
            painted: false,
            width: 0,
            height: 0,
            pixel_ratio: 1.0,
            shadows: false,
            fail_init: None,
            stats: Arc::new(HeadlessStats::default()),
        }
    }

    /// A renderer whose context creation always fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            fail_init: Some(reason.into()),
            ..Self::new()
        }
    }

    pub fn stats(&self) -> Arc<HeadlessStats> {
        Arc::clone(&self.stats)
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadows
    }

    fn physical_size(&self) -> (u32, u32) {
        let scale = |v: u32| ((v as f32 * self.pixel_ratio).round() as u32).max(1);
        (scale(self.width), scale(self.height))
    }

    fn reallocate(&mut self) {
        let (w, h) = self.physical_size();
        self.canvas = Some(RgbaImage::new(w, h));
        self.painted = false;
    }
}

struct Quad {
    depth: f32,
    min: (f32, f32),
    max: (f32, f32),
    color: Rgba<u8>,
}

#[derive(Default)]
struct Collector<'a> {
    camera: Option<&'a PerspectiveCamera>,
    ambient: f32,
    directional: f32,
    meshes: Vec<(Vec3, Vec3, [u8; 3], f32, f32)>,
}

impl SceneVisitor for Collector<'_> {
    fn visit_mesh(&mut self, _node: &SceneNode, mesh: &Mesh, world: &Affine) {
        let Some(camera) = self.camera else {
            return;
        };
        let Some(bounds) = mesh.geometry.bounding_box.or_else(|| {
            let mut g = mesh.geometry.clone();
            g.compute_bounding_box();
            g.bounding_box
        }) else {
            return;
        };
        let projected: Vec<Vec3> = bounds
            .corners()
            .iter()
            .filter_map(|c| camera.project(world.transform_point(*c)))
            .collect();
        if projected.is_empty() {
            return;
        }
        let min = projected.iter().copied().fold(Vec3::splat(f32::INFINITY), Vec3::min);
        let max = projected.iter().copied().fold(Vec3::splat(f32::NEG_INFINITY), Vec3::max);
        self.meshes.push((
            min,
            max,
            mesh.material.rgb(),
            mesh.material.opacity,
            (min.z + max.z) / 2.0,
        ));
    }

    fn visit_light(&mut self, _node: &SceneNode, light: &Light, _world: &Affine) {
        match light.kind {
            LightKind::Ambient => self.ambient += light.intensity,
            LightKind::Directional => self.directional += light.intensity,
        }
    }
}

impl GraphicsBackend for HeadlessRenderer {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn init(&mut self, width: u32, height: u32, pixel_ratio: f32) -> Result<()> {
        if let Some(reason) = &self.fail_init {
            return Err(anyhow!("graphics context unavailable: {}", reason));
        }
        if width == 0 || height == 0 {
            return Err(anyhow!("cannot create a {}x{} canvas", width, height));
        }
        self.width = width;
        self.height = height;
        self.pixel_ratio = pixel_ratio;
        self.reallocate();
        log::debug!(
            "HeadlessRenderer: canvas {}x{} @ {}",
            width,
            height,
            pixel_ratio
        );
        Ok(())
    }

    fn set_size(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.reallocate();
    }

    fn set_pixel_ratio(&mut self, ratio: f32) {
        if ratio > 0.0 && (ratio - self.pixel_ratio).abs() > f32::EPSILON {
            self.pixel_ratio = ratio;
            self.reallocate();
        }
    }

    fn set_shadows(&mut self, enabled: bool, _map_size: u32) {
        self.shadows = enabled;
    }

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()> {
        let canvas = self
            .canvas
            .as_mut()
            .ok_or_else(|| anyhow!("render called before init"))?;
        let mut collector = Collector {
            camera: Some(camera),
            ..Collector::default()
        };
        scene.accept(&mut collector);

        let light = (collector.ambient + 0.5 * collector.directional).clamp(0.0, 1.0);
        let mut quads: Vec<Quad> = collector
            .meshes
            .into_iter()
            .map(|(min, max, rgb, opacity, depth)| Quad {
                depth,
                min: (min.x, min.y),
                max: (max.x, max.y),
                color: Rgba([
                    (rgb[0] as f32 * light) as u8,
                    (rgb[1] as f32 * light) as u8,
                    (rgb[2] as f32 * light) as u8,
                    (opacity.clamp(0.0, 1.0) * 255.0) as u8,
                ]),
            })
            .collect();
        // Far to near.
        quads.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        for px in canvas.pixels_mut() {
            *px = Rgba([0, 0, 0, 0]);
        }
        let (w, h) = canvas.dimensions();
        let to_px = |ndc: f32, extent: u32| {
            ((ndc + 1.0) / 2.0 * extent as f32).clamp(0.0, extent as f32) as u32
        };
        for quad in &quads {
            let (x0, x1) = (to_px(quad.min.0, w), to_px(quad.max.0, w));
            // NDC y points up, image rows go down.
            let (y0, y1) = (h - to_px(quad.max.1, h), h - to_px(quad.min.1, h));
            for y in y0..y1 {
                for x in x0..x1 {
                    canvas.put_pixel(x, y, quad.color);
                }
            }
        }

        self.painted = true;
        self.stats.frames.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read_pixels(&self) -> Option<RgbaImage> {
        if !self.painted {
            return None;
        }
        self.canvas.clone()
    }

    fn release_mesh(&mut self, _mesh: &Mesh) {
        self.stats.meshes_released.fetch_add(1, Ordering::SeqCst);
    }

    fn dispose(&mut self) {
        self.canvas = None;
        self.painted = false;
        self.stats.disposed.store(true, Ordering::SeqCst);
        log::debug!("HeadlessRenderer: disposed");
    }
}
