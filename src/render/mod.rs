//! Render surface for the door overlay.
//!
//! `RenderSurface` owns the scene, camera and asset cache and drives a
//! `GraphicsBackend`. The backend is the only part that touches a graphics
//! context; `HeadlessRenderer` is a software backend that paints mesh bounds
//! into an RGBA buffer.

mod fps;
mod headless;
mod placement;
mod surface;

pub use fps::FpsMeter;
pub use headless::{HeadlessRenderer, HeadlessStats};
pub use placement::{placement_target, Placement};
pub use surface::{RenderSurface, SceneInfo};

use anyhow::Result;
use image::RgbaImage;

use crate::config::RenderSettings;
use crate::scene::{Mesh, Scene, Vec3};

/// Perspective camera looking down -Z from `position`.
#[derive(Clone, Debug, PartialEq)]
pub struct PerspectiveCamera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

impl PerspectiveCamera {
    pub fn from_settings(settings: &RenderSettings) -> Self {
        Self {
            fov: settings.fov,
            aspect: settings.width as f32 / settings.height.max(1) as f32,
            near: settings.near,
            far: settings.far,
            position: Vec3::from_array(settings.camera_position),
        }
    }

    /// Normalized device coordinates `(x, y, depth)` of a world point, or
    /// `None` when it lies outside the near/far range.
    pub fn project(&self, point: Vec3) -> Option<Vec3> {
        let v = point - self.position;
        let depth = -v.z;
        if depth < self.near || depth > self.far {
            return None;
        }
        let f = 1.0 / (self.fov.to_radians() / 2.0).tan();
        Some(Vec3::new(f / self.aspect * v.x / depth, f * v.y / depth, depth))
    }
}

/// Graphics context capability.
pub trait GraphicsBackend: Send {
    fn name(&self) -> &'static str;

    /// Create the drawing context. Failure here is fatal for the surface.
    fn init(&mut self, width: u32, height: u32, pixel_ratio: f32) -> Result<()>;

    fn set_size(&mut self, width: u32, height: u32);

    fn set_pixel_ratio(&mut self, ratio: f32);

    fn set_shadows(&mut self, enabled: bool, map_size: u32);

    fn render(&mut self, scene: &Scene, camera: &PerspectiveCamera) -> Result<()>;

    /// Last painted frame, `None` before the first paint.
    fn read_pixels(&self) -> Option<RgbaImage>;

    /// Free GPU-side resources held for `mesh`.
    fn release_mesh(&mut self, _mesh: &Mesh) {}

    /// Release the context. The backend is not used afterwards.
    fn dispose(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ArConfig;

    #[test]
    fn projects_points_in_front_of_camera() {
        let camera = PerspectiveCamera::from_settings(&ArConfig::default().render);
        let center = camera.project(Vec3::ZERO).unwrap();
        assert_eq!((center.x, center.y), (0.0, 0.0));
        assert_eq!(center.z, 8.0);

        let up = camera.project(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        assert!(up.y > 0.0);
        assert!(camera.project(Vec3::new(0.0, 0.0, 9.0)).is_none());
    }
}
