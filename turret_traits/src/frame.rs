/// Column count of the MLX90640 array used on the reference turret.
pub const MLX90640_WIDTH: usize = 32;
/// Row count of the MLX90640 array used on the reference turret.
pub const MLX90640_HEIGHT: usize = 24;

/// A fixed-size thermal image, row-major, one intensity value per pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermalFrame {
    width: usize,
    height: usize,
    pixels: Vec<f32>,
}

impl ThermalFrame {
    /// Build a frame from row-major pixels. Returns `None` when the pixel
    /// count does not match `width * height` or either dimension is zero.
    pub fn from_pixels(width: usize, height: usize, pixels: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || pixels.len() != width.checked_mul(height)? {
            return None;
        }
        Some(Self {
            width,
            height,
            pixels,
        })
    }

    /// A frame filled with one value.
    pub fn uniform(width: usize, height: usize, value: f32) -> Option<Self> {
        Self::from_pixels(width, height, vec![value; width.checked_mul(height)?])
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    /// Pixel at (`col`, `row`), if in bounds.
    pub fn get(&self, col: usize, row: usize) -> Option<f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.pixels.get(row * self.width + col).copied()
    }

    /// Mutable pixel at (`col`, `row`), if in bounds.
    pub fn get_mut(&mut self, col: usize, row: usize) -> Option<&mut f32> {
        if col >= self.width || row >= self.height {
            return None;
        }
        self.pixels.get_mut(row * self.width + col)
    }

    /// Aggregate intensity of one column (sum over all rows).
    pub fn column_sum(&self, col: usize) -> Option<f32> {
        if col >= self.width {
            return None;
        }
        Some(
            (0..self.height)
                .map(|row| self.pixels[row * self.width + col])
                .sum(),
        )
    }
}
