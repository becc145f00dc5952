use std::io::Cursor;
use std::time::Instant;

use anyhow::{anyhow, Result};
use image::ImageFormat;

use super::fps::FpsMeter;
use super::placement::{placement_target, Placement};
use super::{GraphicsBackend, PerspectiveCamera};
use crate::config::{ArConfig, PlacementSettings};
use crate::detect::Detection;
use crate::engine::QualitySettings;
use crate::error::{AssetError, EngineError, EngineResult};
use crate::scene::{
    optimize_asset, AssetCache, DoorAsset, DoorGenerator, DoorStyle, LightKind, NodeKind, Scene,
    SceneNode, Vec3,
};

const ANCHOR: &str = "door_anchor";
const DOOR: &str = "door";
const AMBIENT: &str = "ambient_light";
const DIRECTIONAL: &str = "directional_light";
/// Directional light follows brightness at this fraction.
const DIRECTIONAL_SHARE: f32 = 0.8;

/// Diagnostics snapshot of the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct SceneInfo {
    pub initialized: bool,
    pub fps: u32,
    pub cached_models: usize,
    pub door_loaded: bool,
    pub door_style: Option<DoorStyle>,
    /// Canvas size in physical pixels.
    pub renderer_size: (u32, u32),
    pub meshes: usize,
}

/// Scene, camera, renderer and door asset cache.
///
/// The placement transform lives on the door anchor group and persists
/// across frames and model swaps.
pub struct RenderSurface {
    backend: Option<Box<dyn GraphicsBackend>>,
    doors: Box<dyn DoorGenerator>,
    scene: Scene,
    camera: PerspectiveCamera,
    cache: AssetCache<DoorStyle, DoorAsset>,
    cache_enabled: bool,
    generated: u64,
    attached: Option<DoorStyle>,
    placement: PlacementSettings,
    fps: FpsMeter,
    painted: bool,
    width: u32,
    height: u32,
    pixel_ratio: f32,
    shadows: bool,
    shadow_map_size: u32,
}

impl RenderSurface {
    /// Create the graphics context and the base scene (lights and an empty
    /// door anchor). Fails with `RenderInit` when the context cannot be made.
    pub fn init(
        config: &ArConfig,
        mut backend: Box<dyn GraphicsBackend>,
        doors: Box<dyn DoorGenerator>,
    ) -> EngineResult<Self> {
        let render = &config.render;
        backend
            .init(render.width, render.height, render.pixel_ratio)
            .map_err(|e| EngineError::RenderInit(format!("{:#}", e)))?;
        backend.set_shadows(render.shadows, render.shadow_map_size);

        let lighting = &config.lighting;
        let mut scene = Scene::new();
        scene.add(SceneNode::light(
            AMBIENT,
            LightKind::Ambient,
            lighting.ambient_color,
            lighting.ambient_intensity,
        ));
        let mut directional = SceneNode::light(
            DIRECTIONAL,
            LightKind::Directional,
            lighting.directional_color,
            lighting.directional_intensity,
        )
        .with_position(Vec3::from_array(lighting.directional_position));
        directional.cast_shadow = render.shadows;
        scene.add(directional);
        scene.add(SceneNode::group(ANCHOR));

        log::info!(
            "RenderSurface: {} backend at {}x{} (ratio {}, shadows {})",
            backend.name(),
            render.width,
            render.height,
            render.pixel_ratio,
            render.shadows
        );

        Ok(Self {
            backend: Some(backend),
            doors,
            scene,
            camera: PerspectiveCamera::from_settings(render),
            cache: AssetCache::new(config.models.max_cached_models),
            cache_enabled: config.models.cache_models,
            generated: 0,
            attached: None,
            placement: config.placement.clone(),
            fps: FpsMeter::new(),
            painted: false,
            width: render.width,
            height: render.height,
            pixel_ratio: render.pixel_ratio,
            shadows: render.shadows,
            shadow_map_size: render.shadow_map_size,
        })
    }

    pub fn is_ready(&self) -> bool {
        self.backend.is_some()
    }

    /// Cached asset for `style`, or a freshly generated one.
    pub fn load_door_model(&mut self, style: DoorStyle) -> Result<DoorAsset, AssetError> {
        if self.cache_enabled {
            if let Some(asset) = self.cache.get(&style) {
                log::debug!("RenderSurface: {} served from cache", style);
                return Ok(asset.clone());
            }
        }

        let mut root = self
            .doors
            .generate(style)
            .map_err(|e| AssetError::generation(style.id(), format!("{:#}", e)))?;
        optimize_asset(&mut root, self.shadows);
        self.generated += 1;
        let asset = DoorAsset { style, root };
        log::info!("RenderSurface: generated {}", style);

        if self.cache_enabled {
            if let Some((evicted, old)) = self.cache.insert(style, asset.clone()) {
                log::debug!("RenderSurface: evicted {} from cache", evicted);
                self.release_node(&old.root);
            }
        }
        Ok(asset)
    }

    /// Replace the attached door with a clone of `asset`.
    pub fn set_door_model(&mut self, asset: &DoorAsset) {
        if self.scene.find(ANCHOR).is_none() {
            self.scene.add(SceneNode::group(ANCHOR));
        }
        let Some(anchor) = self.scene.find_mut(ANCHOR) else {
            return;
        };
        anchor.remove_child(DOOR);
        let mut door = asset.root.clone();
        door.name = DOOR.to_string();
        anchor.add(door);
        self.attached = Some(asset.style);
        log::info!("RenderSurface: attached {}", asset.style);
    }

    pub fn attached_style(&self) -> Option<DoorStyle> {
        self.attached
    }

    /// Ease the door anchor toward the placement derived from `detection`.
    ///
    /// No-op without an attached door or without a detection.
    pub fn position_door(&mut self, detection: Option<&Detection>, frame_w: u32, frame_h: u32) {
        if self.attached.is_none() {
            return;
        }
        let Some(detection) = detection else {
            return;
        };
        let Some(target) = placement_target(detection, frame_w as f32, frame_h as f32) else {
            return;
        };
        let (pos_alpha, scale_alpha) = (self.placement.position_alpha, self.placement.scale_alpha);
        if let Some(anchor) = self.scene.find_mut(ANCHOR) {
            let t = &mut anchor.transform;
            t.position = t.position.lerp(target.position, pos_alpha);
            t.scale = t.scale.lerp(Vec3::splat(target.scale), scale_alpha);
        }
    }

    /// Current anchor placement, `None` when no door is attached.
    pub fn placement(&self) -> Option<Placement> {
        self.attached?;
        let anchor = self.scene.find(ANCHOR)?;
        Some(Placement {
            position: anchor.transform.position,
            scale: anchor.transform.scale.x,
        })
    }

    /// Draw one frame and count it towards the FPS reading.
    pub fn render_at(&mut self, now: Instant) -> Result<()> {
        let backend = self
            .backend
            .as_mut()
            .ok_or_else(|| anyhow!("render surface is disposed"))?;
        backend.render(&self.scene, &self.camera)?;
        self.painted = true;
        self.fps.tick(now);
        Ok(())
    }

    pub fn render(&mut self) -> Result<()> {
        self.render_at(Instant::now())
    }

    pub fn fps(&self) -> u32 {
        self.fps.fps()
    }

    /// PNG encoding of the last painted frame.
    pub fn take_screenshot(&self) -> EngineResult<Vec<u8>> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| EngineError::Screenshot("render surface is disposed".to_string()))?;
        let image = backend
            .read_pixels()
            .filter(|_| self.painted)
            .ok_or_else(|| EngineError::Screenshot("nothing has been rendered yet".to_string()))?;
        let mut png = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| EngineError::Screenshot(e.to_string()))?;
        Ok(png)
    }

    /// Match camera aspect and canvas to a new drawing-surface size.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.width = width;
        self.height = height;
        self.camera.aspect = width as f32 / height as f32;
        if let Some(backend) = self.backend.as_mut() {
            backend.set_size(width, height);
        }
        self.painted = false;
        log::debug!("RenderSurface: resized to {}x{}", width, height);
    }

    /// Absolute anchor rotation in radians.
    pub fn rotate_door(&mut self, x: f32, y: f32, z: f32) {
        if let Some(anchor) = self.scene.find_mut(ANCHOR) {
            anchor.transform.rotation = Vec3::new(x, y, z);
        }
    }

    /// Absolute uniform anchor scale.
    pub fn scale_door(&mut self, scale: f32) {
        if let Some(anchor) = self.scene.find_mut(ANCHOR) {
            anchor.transform.scale = Vec3::splat(scale);
        }
    }

    pub fn set_brightness(&mut self, brightness: f32) {
        for (name, intensity) in [
            (AMBIENT, brightness),
            (DIRECTIONAL, brightness * DIRECTIONAL_SHARE),
        ] {
            if let Some(node) = self.scene.find_mut(name) {
                if let NodeKind::Light(light) = &mut node.kind {
                    light.intensity = intensity;
                }
            }
        }
    }

    /// Switch pixel ratio and shadow maps for a quality tier.
    pub fn apply_quality(&mut self, settings: &QualitySettings) {
        self.pixel_ratio = settings.pixel_ratio;
        self.shadows = settings.shadows;
        if let Some(backend) = self.backend.as_mut() {
            backend.set_pixel_ratio(settings.pixel_ratio);
            backend.set_shadows(settings.shadows, self.shadow_map_size);
        }
        self.painted = false;
    }

    /// Remove the door and every other node from the scene.
    pub fn clear(&mut self) {
        if let Some(anchor) = self.scene.find_mut(ANCHOR) {
            anchor.clear_children();
        }
        self.scene.clear();
        self.attached = None;
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn scene_info(&self) -> SceneInfo {
        let scale = |v: u32| (v as f32 * self.pixel_ratio).round() as u32;
        SceneInfo {
            initialized: self.is_ready(),
            fps: self.fps(),
            cached_models: self.cache.len(),
            door_loaded: self.attached.is_some(),
            door_style: self.attached,
            renderer_size: (scale(self.width), scale(self.height)),
            meshes: self.scene.counts().meshes,
        }
    }

    pub fn cached_styles(&self) -> Vec<DoorStyle> {
        self.cache.keys().copied().collect()
    }

    /// Number of doors generated since init; cache hits do not count.
    pub fn generated_count(&self) -> u64 {
        self.generated
    }

    fn release_node(&mut self, node: &SceneNode) {
        let Some(backend) = self.backend.as_mut() else {
            return;
        };
        node.traverse(&mut |n: &SceneNode| {
            if let NodeKind::Mesh(mesh) = &n.kind {
                backend.release_mesh(mesh);
            }
        });
    }

    /// Free cached assets, clear the scene and release the context.
    /// Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.backend.is_none() {
            return;
        }
        for (_, asset) in self.cache.drain() {
            self.release_node(&asset.root);
        }
        if let Some(door) = self
            .scene
            .find_mut(ANCHOR)
            .and_then(|anchor| anchor.remove_child(DOOR))
        {
            self.release_node(&door);
        }
        self.clear();
        if let Some(mut backend) = self.backend.take() {
            backend.dispose();
        }
        self.painted = false;
        self.fps.reset();
        log::info!("RenderSurface: disposed");
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;
    use crate::render::HeadlessRenderer;
    use crate::scene::ProceduralDoors;

    fn surface() -> RenderSurface {
        let mut config = ArConfig::default();
        config.render.width = 64;
        config.render.height = 48;
        RenderSurface::init(
            &config,
            Box::new(HeadlessRenderer::new()),
            Box::new(ProceduralDoors),
        )
        .unwrap()
    }

    fn full_frame() -> Detection {
        Detection::new(
            "door",
            0.9,
            BoundingBox {
                x: 0.0,
                y: 0.0,
                width: 1280.0,
                height: 720.0,
            },
        )
    }

    #[test]
    fn init_failure_is_render_init() {
        let err = RenderSurface::init(
            &ArConfig::default(),
            Box::new(HeadlessRenderer::unavailable("no context")),
            Box::new(ProceduralDoors),
        )
        .err()
        .unwrap();
        assert!(matches!(err, EngineError::RenderInit(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn positioning_without_door_is_noop() {
        let mut surface = surface();
        surface.position_door(Some(&full_frame()), 1280, 720);
        assert!(surface.placement().is_none());
    }

    #[test]
    fn positioning_eases_toward_target() {
        let mut surface = surface();
        let asset = surface.load_door_model(DoorStyle::Classic).unwrap();
        surface.set_door_model(&asset);

        surface.position_door(None, 1280, 720);
        assert_eq!(surface.placement().unwrap().scale, 1.0);

        surface.position_door(Some(&full_frame()), 1280, 720);
        let p = surface.placement().unwrap();
        // one step of alpha 0.1 from scale 1 toward 2, z from 0 toward 2
        assert!((p.scale - 1.1).abs() < 1e-5);
        assert!((p.position.z - 0.2).abs() < 1e-5);

        for _ in 0..300 {
            surface.position_door(Some(&full_frame()), 1280, 720);
        }
        let p = surface.placement().unwrap();
        assert!((p.scale - 2.0).abs() < 1e-3);
        assert!(p.scale <= 2.0);
    }

    #[test]
    fn swapping_models_keeps_single_door() {
        let mut surface = surface();
        for style in DoorStyle::ALL {
            let asset = surface.load_door_model(style).unwrap();
            surface.set_door_model(&asset);
        }
        let anchor = surface.scene().find(ANCHOR).unwrap();
        assert_eq!(anchor.children.len(), 1);
        assert_eq!(surface.attached_style(), Some(DoorStyle::Glass));
    }

    #[test]
    fn cache_hits_skip_generation() {
        let mut surface = surface();
        surface.load_door_model(DoorStyle::Modern).unwrap();
        surface.load_door_model(DoorStyle::Modern).unwrap();
        assert_eq!(surface.generated_count(), 1);
        assert_eq!(surface.scene_info().cached_models, 1);
    }

    #[test]
    fn screenshot_requires_a_painted_frame() {
        let mut surface = surface();
        assert!(matches!(
            surface.take_screenshot(),
            Err(EngineError::Screenshot(_))
        ));
        surface.render().unwrap();
        let png = surface.take_screenshot().unwrap();
        assert_eq!(&png[1..4], b"PNG");
    }

    #[test]
    fn brightness_drives_both_lights() {
        let mut surface = surface();
        surface.set_brightness(0.5);
        let intensity = |name: &str| match &surface.scene().find(name).unwrap().kind {
            NodeKind::Light(light) => light.intensity,
            _ => panic!("not a light"),
        };
        assert_eq!(intensity(AMBIENT), 0.5);
        assert!((intensity(DIRECTIONAL) - 0.4).abs() < 1e-6);
    }

    #[test]
    fn dispose_is_idempotent_and_releases_assets() {
        let renderer = HeadlessRenderer::new();
        let stats = renderer.stats();
        let mut config = ArConfig::default();
        config.render.width = 32;
        config.render.height = 32;
        let mut surface =
            RenderSurface::init(&config, Box::new(renderer), Box::new(ProceduralDoors)).unwrap();
        let asset = surface.load_door_model(DoorStyle::Classic).unwrap();
        surface.set_door_model(&asset);
        surface.render().unwrap();

        surface.dispose();
        surface.dispose();
        assert!(stats.disposed());
        // cached classic (5 meshes) plus the attached clone (5 meshes)
        assert_eq!(stats.meshes_released(), 10);
        assert!(!surface.is_ready());
        assert!(surface.render().is_err());
        assert!(surface.take_screenshot().is_err());
    }
}
