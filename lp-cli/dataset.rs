use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageFormat, RgbImage};
use lp_core::Image;

use crate::error::{CliError, CliResult};

pub const REFERENCE_STEM: &str = "reference";
pub const REGISTERED_STEM: &str = "registered";

/// One benchmark pair: colour images for stitching, luminance for detection.
#[derive(Debug, Clone)]
pub struct ImageSet {
    pub name: String,
    pub path: PathBuf,
    pub reference: RgbImage,
    pub registered: RgbImage,
    pub reference_gray: Image,
    pub registered_gray: Image,
}

impl ImageSet {
    pub fn from_images(name: &str, reference: DynamicImage, registered: DynamicImage) -> Self {
        Self {
            name: name.to_string(),
            path: PathBuf::new(),
            reference_gray: to_luma(&reference),
            registered_gray: to_luma(&registered),
            reference: reference.to_rgb8(),
            registered: registered.to_rgb8(),
        }
    }
}

/// Luminance copy of a decoded image.
pub fn to_luma(img: &DynamicImage) -> Image {
    let gray = img.to_luma8();
    let (w, h) = gray.dimensions();
    Image::from_fn(w as usize, h as usize, |x, y| gray.get_pixel(x as u32, y as u32)[0])
}

/// Subdirectories of `dir`, sorted by path.
pub fn list_image_sets(dir: impl AsRef<Path>) -> CliResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CliError::MissingDirectory(dir.to_path_buf()));
    }

    let mut sets = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            sets.push(path);
        }
    }
    sets.sort();
    Ok(sets)
}

/// First file (by name) in `dir` whose stem is `stem` and whose extension is a
/// format the `image` crate can decode.
pub fn find_image(dir: &Path, stem: &str) -> CliResult<Option<PathBuf>> {
    let mut candidates = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let stem_matches = path
            .file_stem()
            .and_then(|s| s.to_str())
            .is_some_and(|s| s.eq_ignore_ascii_case(stem));
        if path.is_file() && stem_matches && ImageFormat::from_path(&path).is_ok() {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates.into_iter().next())
}

pub fn load_image_set(path: impl AsRef<Path>) -> CliResult<ImageSet> {
    let path = path.as_ref();
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let reference_path = find_image(path, REFERENCE_STEM)?.ok_or_else(|| CliError::MissingImage {
        role: REFERENCE_STEM,
        dir: path.to_path_buf(),
    })?;
    let registered_path = find_image(path, REGISTERED_STEM)?.ok_or_else(|| CliError::MissingImage {
        role: REGISTERED_STEM,
        dir: path.to_path_buf(),
    })?;

    let reference = image::open(&reference_path)?;
    let registered = image::open(&registered_path)?;

    let mut set = ImageSet::from_images(&name, reference, registered);
    set.path = path.to_path_buf();
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn write_gray(path: &Path, w: u32, h: u32) {
        GrayImage::from_fn(w, h, |x, y| Luma([((x + y) % 256) as u8])).save(path).unwrap();
    }

    #[test]
    fn test_list_image_sets_sorted_dirs_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("zeta")).unwrap();
        std::fs::create_dir(dir.path().join("alpha")).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let sets = list_image_sets(dir.path()).unwrap();
        let names: Vec<_> = sets.iter().map(|p| p.file_name().unwrap().to_str().unwrap()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);
    }

    #[test]
    fn test_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let err = list_image_sets(dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, CliError::MissingDirectory(_)));
    }

    #[test]
    fn test_load_image_set() {
        let dir = tempfile::tempdir().unwrap();
        let set_dir = dir.path().join("boat");
        std::fs::create_dir(&set_dir).unwrap();
        write_gray(&set_dir.join("reference.png"), 20, 10);
        write_gray(&set_dir.join("registered.png"), 16, 12);
        std::fs::write(set_dir.join("reference.txt"), "not an image").unwrap();

        let set = load_image_set(&set_dir).unwrap();
        assert_eq!(set.name, "boat");
        assert_eq!(set.reference.dimensions(), (20, 10));
        assert_eq!(set.registered.dimensions(), (16, 12));
        assert_eq!((set.reference_gray.width(), set.reference_gray.height()), (20, 10));
        assert_eq!(set.reference_gray.get(3, 4), 7);
    }

    #[test]
    fn test_missing_registered_image() {
        let dir = tempfile::tempdir().unwrap();
        write_gray(&dir.path().join("reference.png"), 8, 8);
        let err = load_image_set(dir.path()).unwrap_err();
        assert!(matches!(err, CliError::MissingImage { role: "registered", .. }));
    }
}
