use std::path::Path;

use anyhow::{Context, Result};

/// Tightly packed, top-row-first RGBA8 image.
pub struct Pixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Checkerboard of `cells × cells` squares alternating `a` and `b`.
pub fn checker(size: u32, cells: u32, a: [u8; 4], b: [u8; 4]) -> Pixels {
    let cell = (size / cells.max(1)).max(1);
    let rgba = (0..size)
        .flat_map(|y| (0..size).map(move |x| (x, y)))
        .flat_map(|(x, y)| if (x / cell + y / cell) % 2 == 0 { a } else { b })
        .collect();
    Pixels {
        width: size,
        height: size,
        rgba,
    }
}

/// Distinct checker tile for texture `index`; hue walks around the wheel.
pub fn tile(index: usize) -> Pixels {
    let hue = (index as f32 * 0.618_034).fract();
    let bright = hue_to_rgb(hue, 255);
    let dark = hue_to_rgb(hue, 96);
    checker(32, 2 + (index % 4) as u32, bright, dark)
}

fn hue_to_rgb(hue: f32, value: u8) -> [u8; 4] {
    let h = hue * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    let (r, g, b) = match h as u32 {
        0 => (1.0, x, 0.0),
        1 => (x, 1.0, 0.0),
        2 => (0.0, 1.0, x),
        3 => (0.0, x, 1.0),
        4 => (x, 0.0, 1.0),
        _ => (1.0, 0.0, x),
    };
    let v = value as f32;
    [(r * v) as u8, (g * v) as u8, (b * v) as u8, 255]
}

/// Decodes any supported image file into RGBA8.
pub fn load(path: &Path) -> Result<Pixels> {
    let image = image::open(path)
        .with_context(|| format!("failed to decode {}", path.display()))?
        .to_rgba8();
    Ok(Pixels {
        width: image.width(),
        height: image.height(),
        rgba: image.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: [u8; 4] = [255, 255, 255, 255];
    const B: [u8; 4] = [0, 0, 0, 255];

    #[test]
    fn checker_alternates_cells() {
        let p = checker(4, 2, A, B);
        assert_eq!(p.rgba.len(), 4 * 4 * 4);
        let px = |x: usize, y: usize| &p.rgba[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(px(0, 0), &A);
        assert_eq!(px(1, 1), &A);
        assert_eq!(px(2, 0), &B);
        assert_eq!(px(0, 2), &B);
        assert_eq!(px(3, 3), &A);
    }

    #[test]
    fn tiles_differ() {
        assert_ne!(tile(0).rgba, tile(1).rgba);
        assert!(tile(7).rgba.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load(Path::new("does/not/exist.png")).is_err());
    }
}
