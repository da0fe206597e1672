use glam::Vec3;
use rayon::iter::ParallelIterator;
use rayon::slice::ParallelSliceMut;

use super::rasterizer::{bresenham, clip_to_rect};

/// `0RGB` colour buffer plus depth, the layout minifb presents.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u32>,
    pub depth: Vec<f32>,
}

impl FrameBuffer {
    pub fn new(width: usize, height: usize) -> Self {
        FrameBuffer {
            width,
            height,
            data: vec![0; width * height],
            depth: vec![f32::INFINITY; width * height],
        }
    }

    pub fn clear(&mut self, color: u32) {
        self.data.par_chunks_mut(1024).for_each(|chunk| chunk.fill(color));
        self.depth
            .par_chunks_mut(1024)
            .for_each(|chunk| chunk.fill(f32::INFINITY));
    }

    pub fn resize(&mut self, width: usize, height: usize) {
        if width == self.width && height == self.height {
            return;
        }
        *self = FrameBuffer::new(width, height);
    }

    /// Depth tested write, smaller depth wins.
    pub fn set_pixel(&mut self, x: i32, y: i32, depth: f32, color: u32) {
        if x < 0 || y < 0 {
            return;
        }
        let (x, y) = (x as usize, y as usize);
        if x < self.width && y < self.height {
            let index = x + y * self.width;
            if depth < self.depth[index] {
                self.data[index] = color;
                self.depth[index] = depth;
            }
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> Option<u32> {
        (x < self.width && y < self.height).then(|| self.data[x + y * self.width])
    }

    /// Endpoints are window coordinates with depth in `z`. Anything off screen is cut away
    /// before rasterizing.
    pub fn draw_line(&mut self, start: Vec3, end: Vec3, color: u32) {
        let Some((start, end)) = clip_to_rect(start, end, self.width, self.height) else {
            return;
        };
        bresenham(start.truncate(), start.z, end.truncate(), end.z, |x, y, depth| {
            self.set_pixel(x, y, depth, color)
        });
    }

    pub fn covered_pixels(&self, background: u32) -> usize {
        self.data.iter().filter(|&&px| px != background).count()
    }
}
