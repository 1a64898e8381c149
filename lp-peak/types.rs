/// One interrogation window: the half-open rectangle `[x0, x1) x [y0, y1)`.
///
/// Boundary tiles are clipped to the image and may be smaller than `L x L`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    pub x0: usize,
    pub y0: usize,
    pub x1: usize,
    pub y1: usize,
}

impl Tile {
    pub fn width(&self) -> usize {
        self.x1 - self.x0
    }

    pub fn height(&self) -> usize {
        self.y1 - self.y0
    }

    pub fn area(&self) -> usize {
        self.width() * self.height()
    }

    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// Location and value of a tile extremum on the ramped image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub x: usize,
    pub y: usize,
    pub value: f64,
}

/// Working copy of an image with the tie-breaking ramp applied.
///
/// Values are kept in `f64`: a ramp step of 1e-6 is below the `f32`
/// resolution at intensity 255.
#[derive(Debug, Clone, PartialEq)]
pub struct RampedImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f64>,
}

impl RampedImage {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.data[y * self.width + x]
    }
}
