/// Geometry utilities for perspective transformations and grid sampling
use crate::models::{BitMatrix, Point, Quad};

/// Perspective transformation matrix (3x3, a33 fixed at 1)
#[derive(Debug, Clone, Copy)]
pub struct PerspectiveTransform {
    a11: f64,
    a12: f64,
    a13: f64,
    a21: f64,
    a22: f64,
    a23: f64,
    a31: f64,
    a32: f64,
}

impl PerspectiveTransform {
    /// Create transform mapping 4 source points onto 4 destination points
    pub fn from_points(src: &[Point; 4], dst: &[Point; 4]) -> Option<Self> {
        let mut a = [[0.0f64; 8]; 8];
        let mut b = [0.0f64; 8];

        for i in 0..4 {
            let (sx, sy) = (src[i].x as f64, src[i].y as f64);
            let (dx, dy) = (dst[i].x as f64, dst[i].y as f64);

            let row = i * 2;
            a[row] = [sx, sy, 1.0, 0.0, 0.0, 0.0, -dx * sx, -dx * sy];
            b[row] = dx;
            a[row + 1] = [0.0, 0.0, 0.0, sx, sy, 1.0, -dy * sx, -dy * sy];
            b[row + 1] = dy;
        }

        solve_linear_system(&a, &b).map(|s| Self {
            a11: s[0],
            a12: s[1],
            a13: s[2],
            a21: s[3],
            a22: s[4],
            a23: s[5],
            a31: s[6],
            a32: s[7],
        })
    }

    /// Map module-space rectangle `[0, cols] x [0, rows]` onto a quad
    pub fn grid_to_quad(cols: f32, rows: f32, quad: &Quad) -> Option<Self> {
        let src = [
            Point::new(0.0, 0.0),
            Point::new(cols, 0.0),
            Point::new(cols, rows),
            Point::new(0.0, rows),
        ];
        Self::from_points(&src, &quad.corners)
    }

    /// Transform a point using this perspective matrix
    pub fn transform(&self, p: &Point) -> Point {
        let (x, y) = (p.x as f64, p.y as f64);
        let denominator = self.a31 * x + self.a32 * y + 1.0;
        if denominator.abs() < 1e-10 {
            return Point::new(f32::NAN, f32::NAN);
        }
        Point::new(
            ((self.a11 * x + self.a12 * y + self.a13) / denominator) as f32,
            ((self.a21 * x + self.a22 * y + self.a23) / denominator) as f32,
        )
    }
}

/// Solve 8x8 linear system using Gaussian elimination with partial pivoting
#[allow(clippy::needless_range_loop)]
fn solve_linear_system(a: &[[f64; 8]; 8], b: &[f64; 8]) -> Option<[f64; 8]> {
    let mut a = *a;
    let mut b = *b;
    let n = 8;

    for i in 0..n {
        let mut max_val = a[i][i].abs();
        let mut max_row = i;
        for k in (i + 1)..n {
            if a[k][i].abs() > max_val {
                max_val = a[k][i].abs();
                max_row = k;
            }
        }
        if max_val < 1e-12 {
            return None;
        }
        if max_row != i {
            a.swap(i, max_row);
            b.swap(i, max_row);
        }
        for k in (i + 1)..n {
            let factor = a[k][i] / a[i][i];
            b[k] -= factor * b[i];
            for j in i..n {
                a[k][j] -= factor * a[i][j];
            }
        }
    }

    let mut x = [0.0f64; 8];
    for i in (0..n).rev() {
        let mut sum = b[i];
        for j in (i + 1)..n {
            sum -= a[i][j] * x[j];
        }
        x[i] = sum / a[i][i];
    }

    Some(x)
}

/// Sample a `cols` x `rows` module grid through `transform`
///
/// Module (c, r) is read at its center (c + 0.5, r + 0.5). With modules of
/// at least three pixels a 3x3 majority vote around the center is used.
/// Returns `None` if any sample point falls outside the image.
pub fn sample_grid(
    image: &BitMatrix,
    transform: &PerspectiveTransform,
    cols: usize,
    rows: usize,
    module_size: f32,
) -> Option<BitMatrix> {
    let mut grid = BitMatrix::new(cols, rows);
    let offset = if module_size >= 3.0 { (module_size / 4.0).max(1.0) } else { 0.0 };
    for r in 0..rows {
        for c in 0..cols {
            let p = transform.transform(&Point::new(c as f32 + 0.5, r as f32 + 0.5));
            let (x, y) = (p.x.floor() as i32, p.y.floor() as i32);
            if !p.x.is_finite() || !p.y.is_finite() || !image.contains(x, y) {
                return None;
            }
            let dark = if offset > 0.0 {
                let d = offset.round() as i32;
                let mut votes = 0;
                for dy in [-d, 0, d] {
                    for dx in [-d, 0, d] {
                        if image.get_signed(x + dx, y + dy) {
                            votes += 1;
                        }
                    }
                }
                votes >= 5
            } else {
                image.get(x as usize, y as usize)
            };
            grid.set(c, r, dark);
        }
    }
    Some(grid)
}
