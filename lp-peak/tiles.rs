use crate::types::{Extremum, RampedImage, Tile};

/// Row-major grid of `window x window` tiles starting at `(0, 0)`.
///
/// The last row and column are clipped to the image rather than dropped or
/// padded, so the tiles cover every pixel exactly once. Yields nothing for a
/// zero window or an empty image.
pub fn tile_grid(width: usize, height: usize, window: usize) -> impl Iterator<Item = Tile> {
    let step = window.max(1);
    let (rows, cols) = if window == 0 || width == 0 || height == 0 {
        (0, 0)
    } else {
        (height.div_ceil(step), width.div_ceil(step))
    };

    (0..rows).flat_map(move |row| {
        (0..cols).map(move |col| {
            let x0 = col * step;
            let y0 = row * step;
            Tile {
                x0,
                y0,
                x1: (x0 + step).min(width),
                y1: (y0 + step).min(height),
            }
        })
    })
}

/// Tile of the `window` grid containing pixel `(x, y)`.
pub fn tile_containing(width: usize, height: usize, window: usize, x: usize, y: usize) -> Option<Tile> {
    if window == 0 || x >= width || y >= height {
        return None;
    }
    let x0 = (x / window) * window;
    let y0 = (y / window) * window;
    Some(Tile {
        x0,
        y0,
        x1: (x0 + window).min(width),
        y1: (y0 + window).min(height),
    })
}

/// Maximum and minimum of a tile. Ties resolve to the first pixel in raster order.
pub fn tile_extrema(img: &RampedImage, tile: &Tile) -> (Extremum, Extremum) {
    let first = img.get(tile.x0, tile.y0);
    let mut max = Extremum { x: tile.x0, y: tile.y0, value: first };
    let mut min = max;

    for y in tile.y0..tile.y1 {
        let row = &img.data[y * img.width + tile.x0..y * img.width + tile.x1];
        for (dx, &value) in row.iter().enumerate() {
            if value > max.value {
                max = Extremum { x: tile.x0 + dx, y, value };
            }
            if value < min.value {
                min = Extremum { x: tile.x0 + dx, y, value };
            }
        }
    }

    (max, min)
}
