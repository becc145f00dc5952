/// Raw detector output before filtering.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub class: String,
    pub score: f32,
    /// `[x, y, width, height]` in frame pixels.
    pub bbox: [f32; 4],
}

impl Prediction {
    pub fn new(class: impl Into<String>, score: f32, bbox: [f32; 4]) -> Self {
        Self {
            class: class.into(),
            score,
            bbox,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x + self.width / 2.0,
            y: self.y + self.height / 2.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

/// A doorway candidate from one frame. Replaced wholesale on the next sampling tick.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub class: String,
    pub score: f32,
    pub bbox: BoundingBox,
    pub center: Point,
    /// Height over width.
    pub aspect_ratio: f32,
}

impl Detection {
    pub fn new(class: impl Into<String>, score: f32, bbox: BoundingBox) -> Self {
        Self {
            class: class.into(),
            score,
            center: bbox.center(),
            aspect_ratio: bbox.height / bbox.width,
            bbox,
        }
    }
}

impl From<&Prediction> for Detection {
    fn from(pred: &Prediction) -> Self {
        let [x, y, width, height] = pred.bbox;
        Self::new(
            pred.class.clone(),
            pred.score,
            BoundingBox {
                x,
                y,
                width,
                height,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detection_derives_center_and_aspect() {
        let det = Detection::from(&Prediction::new("door", 0.9, [100.0, 50.0, 200.0, 400.0]));
        assert_eq!(det.center, Point { x: 200.0, y: 250.0 });
        assert_eq!(det.aspect_ratio, 2.0);
        assert_eq!(det.bbox.area(), 80_000.0);
    }
}
