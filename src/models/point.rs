/// 2D point with floating point coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    /// X coordinate
    pub x: f32,
    /// Y coordinate
    pub y: f32,
}

impl Point {
    /// Create a new point
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point
    pub fn distance(&self, other: &Point) -> f32 {
        self.distance_squared(other).sqrt()
    }

    /// Calculate squared distance (faster, no sqrt)
    pub fn distance_squared(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Translate point by (dx, dy)
    pub fn translate(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Linear interpolation towards `other` by factor `t`
    pub fn lerp(&self, other: &Point, t: f32) -> Self {
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

/// Axis-aligned bounding box in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    /// Left edge
    pub left: f32,
    /// Top edge
    pub top: f32,
    /// Right edge
    pub right: f32,
    /// Bottom edge
    pub bottom: f32,
}

impl BoundingBox {
    /// Box width
    pub fn width(&self) -> f32 {
        (self.right - self.left).max(0.0)
    }

    /// Box height
    pub fn height(&self) -> f32 {
        (self.bottom - self.top).max(0.0)
    }

    /// Box area
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// Intersection-over-union with another box, 0 when either is empty
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = BoundingBox {
            left: self.left.max(other.left),
            top: self.top.max(other.top),
            right: self.right.min(other.right),
            bottom: self.bottom.min(other.bottom),
        }
        .area();
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// Four corners of a symbol, ordered top-left, top-right, bottom-right,
/// bottom-left in the symbol's own reading orientation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Quad {
    /// Corner points
    pub corners: [Point; 4],
}

impl Quad {
    /// Create a quad from its four corners
    pub fn new(top_left: Point, top_right: Point, bottom_right: Point, bottom_left: Point) -> Self {
        Self {
            corners: [top_left, top_right, bottom_right, bottom_left],
        }
    }

    /// Axis-aligned rectangle quad
    pub fn from_rect(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self::new(
            Point::new(left, top),
            Point::new(right, top),
            Point::new(right, bottom),
            Point::new(left, bottom),
        )
    }

    /// Top-left corner
    pub fn top_left(&self) -> Point {
        self.corners[0]
    }

    /// Top-right corner
    pub fn top_right(&self) -> Point {
        self.corners[1]
    }

    /// Bottom-right corner
    pub fn bottom_right(&self) -> Point {
        self.corners[2]
    }

    /// Bottom-left corner
    pub fn bottom_left(&self) -> Point {
        self.corners[3]
    }

    /// Centroid of the corners
    pub fn center(&self) -> Point {
        let (sx, sy) = self
            .corners
            .iter()
            .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
        Point::new(sx / 4.0, sy / 4.0)
    }

    /// Axis-aligned bounds of the corners
    pub fn bounding_box(&self) -> BoundingBox {
        let mut bbox = BoundingBox {
            left: f32::INFINITY,
            top: f32::INFINITY,
            right: f32::NEG_INFINITY,
            bottom: f32::NEG_INFINITY,
        };
        for p in &self.corners {
            bbox.left = bbox.left.min(p.x);
            bbox.top = bbox.top.min(p.y);
            bbox.right = bbox.right.max(p.x);
            bbox.bottom = bbox.bottom.max(p.y);
        }
        bbox
    }

    /// Reading direction angle in radians (top-left to top-right edge)
    pub fn angle(&self) -> f32 {
        let (tl, tr) = (self.top_left(), self.top_right());
        (tr.y - tl.y).atan2(tr.x - tl.x)
    }

    /// Whether all corners lie within a `width` x `height` image
    pub fn within(&self, width: usize, height: usize) -> bool {
        self.corners.iter().all(|p| {
            p.x >= -0.5 && p.y >= -0.5 && p.x <= width as f32 + 0.5 && p.y <= height as f32 + 0.5
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_distance() {
        let a = Point::new(0.0, 0.0);
        let b = Point::new(3.0, 4.0);
        assert!((a.distance(&b) - 5.0).abs() < 1e-6);
        assert_eq!(a.lerp(&b, 0.5), Point::new(1.5, 2.0));
    }

    #[test]
    fn test_iou() {
        let a = Quad::from_rect(0.0, 0.0, 10.0, 10.0).bounding_box();
        let b = Quad::from_rect(5.0, 0.0, 15.0, 10.0).bounding_box();
        assert!((a.iou(&b) - 50.0 / 150.0).abs() < 1e-6);
        assert!((a.iou(&a) - 1.0).abs() < 1e-6);

        let far = Quad::from_rect(100.0, 100.0, 110.0, 110.0).bounding_box();
        assert_eq!(a.iou(&far), 0.0);
    }

    #[test]
    fn test_quad_geometry() {
        let quad = Quad::new(
            Point::new(10.0, 0.0),
            Point::new(20.0, 10.0),
            Point::new(10.0, 20.0),
            Point::new(0.0, 10.0),
        );
        let bbox = quad.bounding_box();
        assert_eq!((bbox.left, bbox.top, bbox.right, bbox.bottom), (0.0, 0.0, 20.0, 20.0));
        assert_eq!(quad.center(), Point::new(10.0, 10.0));
        assert!((quad.angle() - std::f32::consts::FRAC_PI_4).abs() < 1e-6);
        assert!(quad.within(20, 20));
        assert!(!quad.within(15, 20));
    }
}
