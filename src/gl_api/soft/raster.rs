/// An RGBA color target. Row 0 is the bottom row, like GL window coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Framebuffer {
    width: usize,
    height: usize,
    pixels: Vec<[f32; 4]>,
}

/// `(x, y, width, height)` in window coordinates.
pub type Viewport = (i32, i32, i32, i32);

impl Framebuffer {
    pub fn new(width: usize, height: usize) -> Self {
        Framebuffer {
            width,
            height,
            pixels: vec![[0.0, 0.0, 0.0, 0.0]; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel(&self, x: usize, y: usize) -> [f32; 4] {
        self.pixels[y * self.width + x]
    }

    pub fn pixels(&self) -> &[[f32; 4]] {
        &self.pixels
    }

    pub fn clear(&mut self, color: [f32; 4]) {
        for pixel in &mut self.pixels {
            *pixel = color;
        }
    }

    /// Fills the triangle given in normalized device coordinates. A pixel is
    /// covered when its center lies inside or on an edge. Returns the number
    /// of pixels written.
    pub fn fill_triangle(&mut self, viewport: Viewport, ndc: [[f32; 3]; 3], color: [f32; 4]) -> usize {
        let (vx, vy, vw, vh) = viewport;
        let to_window = |p: [f32; 3]| {
            [
                vx as f32 + (p[0] + 1.0) * 0.5 * vw as f32,
                vy as f32 + (p[1] + 1.0) * 0.5 * vh as f32,
            ]
        };
        let a = to_window(ndc[0]);
        let b = to_window(ndc[1]);
        let c = to_window(ndc[2]);

        let area = edge(a, b, c);
        if area == 0.0 {
            return 0;
        }

        let min_x = a[0].min(b[0]).min(c[0]).floor().max(vx.max(0) as f32) as usize;
        let min_y = a[1].min(b[1]).min(c[1]).floor().max(vy.max(0) as f32) as usize;
        let max_x = a[0].max(b[0]).max(c[0]).ceil().min((vx + vw) as f32).min(self.width as f32);
        let max_y = a[1].max(b[1]).max(c[1]).ceil().min((vy + vh) as f32).min(self.height as f32);
        if max_x <= 0.0 || max_y <= 0.0 {
            return 0;
        }
        let (max_x, max_y) = (max_x as usize, max_y as usize);

        let mut written = 0;
        for y in min_y..max_y {
            for x in min_x..max_x {
                let p = [x as f32 + 0.5, y as f32 + 0.5];
                let w0 = edge(b, c, p);
                let w1 = edge(c, a, p);
                let w2 = edge(a, b, p);
                let inside = if area > 0.0 {
                    w0 >= 0.0 && w1 >= 0.0 && w2 >= 0.0
                } else {
                    w0 <= 0.0 && w1 <= 0.0 && w2 <= 0.0
                };
                if inside {
                    self.pixels[y * self.width + x] = color;
                    written += 1;
                }
            }
        }
        written
    }
}

fn edge(a: [f32; 2], b: [f32; 2], p: [f32; 2]) -> f32 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
    const BLACK: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

    #[test]
    fn fills_either_winding() {
        let mut ccw = Framebuffer::new(16, 16);
        let mut cw = Framebuffer::new(16, 16);
        let tri = [[-1.0, -1.0, 0.0], [1.0, -1.0, 0.0], [-1.0, 1.0, 0.0]];
        let rev = [tri[0], tri[2], tri[1]];
        let a = ccw.fill_triangle((0, 0, 16, 16), tri, RED);
        let b = cw.fill_triangle((0, 0, 16, 16), rev, RED);
        assert_eq!(a, b);
        assert_eq!(ccw, cw);
        assert_eq!(ccw.pixel(0, 0), RED);
        assert_eq!(ccw.pixel(15, 15), [0.0; 4]);
    }

    #[test]
    fn degenerate_triangles_write_nothing() {
        let mut fb = Framebuffer::new(8, 8);
        fb.clear(BLACK);
        let line = [[-1.0, -1.0, 0.0], [0.0, 0.0, 0.0], [1.0, 1.0, 0.0]];
        assert_eq!(fb.fill_triangle((0, 0, 8, 8), line, RED), 0);
        assert!(fb.pixels().iter().all(|p| *p == BLACK));
    }

    #[test]
    fn respects_the_viewport() {
        let mut fb = Framebuffer::new(8, 8);
        let full = [[-1.0, -1.0, 0.0], [3.0, -1.0, 0.0], [-1.0, 3.0, 0.0]];
        let written = fb.fill_triangle((0, 0, 4, 4), full, RED);
        assert_eq!(written, 16);
        assert_eq!(fb.pixel(3, 3), RED);
        assert_eq!(fb.pixel(4, 4), [0.0; 4]);
    }
}
