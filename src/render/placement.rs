use crate::detect::Detection;
use crate::scene::Vec3;

const MIN_SCALE: f32 = 0.5;
const MAX_SCALE: f32 = 2.0;
const SCALE_GAIN: f32 = 3.0;
const X_SPAN: f32 = 3.0;
const Y_SPAN: f32 = 2.0;
const BASE_DEPTH: f32 = 5.0;
const DEPTH_GAIN: f32 = 3.0;
const MIN_DEPTH: f32 = 1.0;

/// Position and uniform scale of the door anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
    pub position: Vec3,
    pub scale: f32,
}

/// Where the door should sit for `det` in a `frame_w` x `frame_h` frame.
///
/// The box center maps to `[-1, 1]` on both axes (y up), larger boxes come
/// closer to the camera, and scale follows box width within `[0.5, 2]`.
/// Returns `None` for an empty frame.
pub fn placement_target(det: &Detection, frame_w: f32, frame_h: f32) -> Option<Placement> {
    if frame_w <= 0.0 || frame_h <= 0.0 {
        return None;
    }
    let nx = det.center.x / frame_w * 2.0 - 1.0;
    let ny = -det.center.y / frame_h * 2.0 + 1.0;
    let size_ratio = (det.bbox.width + det.bbox.height) / (frame_w + frame_h);
    let depth = (BASE_DEPTH - DEPTH_GAIN * size_ratio).max(MIN_DEPTH);
    let scale = (SCALE_GAIN * det.bbox.width / frame_w).clamp(MIN_SCALE, MAX_SCALE);
    Some(Placement {
        position: Vec3::new(X_SPAN * nx, Y_SPAN * ny, depth),
        scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    fn det(x: f32, y: f32, w: f32, h: f32) -> Detection {
        Detection::new(
            "door",
            0.9,
            BoundingBox {
                x,
                y,
                width: w,
                height: h,
            },
        )
    }

    #[test]
    fn full_frame_box_clamps_to_max_scale() {
        let target = placement_target(&det(0.0, 0.0, 1280.0, 720.0), 1280.0, 720.0).unwrap();
        assert_eq!(target.scale, 2.0);
        assert_eq!(target.position, Vec3::new(0.0, 0.0, 2.0));
    }

    #[test]
    fn small_box_clamps_to_min_scale() {
        let target = placement_target(&det(0.0, 0.0, 64.0, 160.0), 1280.0, 720.0).unwrap();
        assert_eq!(target.scale, 0.5);
    }

    #[test]
    fn corner_box_maps_to_upper_left() {
        let target = placement_target(&det(0.0, 0.0, 128.0, 288.0), 1280.0, 720.0).unwrap();
        // center (64, 144): x' = -0.9, y' = 0.6
        assert!((target.position.x + 2.7).abs() < 1e-5);
        assert!((target.position.y - 1.2).abs() < 1e-5);
        assert!((target.scale - 0.5).abs() < 1e-6);
        // size ratio 416 / 2000 = 0.208
        assert!((target.position.z - (5.0 - 0.624)).abs() < 1e-5);
    }

    #[test]
    fn depth_never_below_one() {
        let target = placement_target(&det(0.0, 0.0, 4000.0, 4000.0), 1280.0, 720.0).unwrap();
        assert_eq!(target.position.z, 1.0);
    }

    #[test]
    fn empty_frame_yields_nothing() {
        assert!(placement_target(&det(0.0, 0.0, 10.0, 20.0), 0.0, 720.0).is_none());
    }
}
