use lp_core::{Image, Keypoint};

/// True when `(x, y)` is the only pixel of its border-clipped 3x3 neighbourhood
/// holding its value in the unramped image.
///
/// Plateau pixels in the source data fail this test even though the ramp made
/// them win their tile search.
pub fn is_unique_in_neighbourhood(img: &Image, x: usize, y: usize) -> bool {
    let center = img.get(x, y);
    let x0 = x.saturating_sub(1);
    let y0 = y.saturating_sub(1);
    let x1 = (x + 1).min(img.width() - 1);
    let y1 = (y + 1).min(img.height() - 1);

    let mut count = 0;
    for yy in y0..=y1 {
        for xx in x0..=x1 {
            if img.get(xx, yy) == center {
                count += 1;
            }
        }
    }
    count == 1
}

/// Stable sort by descending response.
pub fn sort_by_response(keypoints: &mut [Keypoint]) {
    keypoints.sort_by(|a, b| b.response.partial_cmp(&a.response).unwrap_or(std::cmp::Ordering::Equal));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_isolated_peak_is_unique() {
        let mut img = Image::filled(5, 5, 10);
        img.set(2, 2, 200);
        assert!(is_unique_in_neighbourhood(&img, 2, 2));
        assert!(!is_unique_in_neighbourhood(&img, 0, 0));
    }

    #[test]
    fn test_plateau_is_rejected() {
        let mut img = Image::filled(5, 5, 10);
        img.set(2, 2, 200);
        img.set(3, 2, 200);
        assert!(!is_unique_in_neighbourhood(&img, 2, 2));
        assert!(!is_unique_in_neighbourhood(&img, 3, 2));
    }

    #[test]
    fn test_corner_neighbourhood_is_clipped() {
        let img = Image::from_fn(3, 3, |x, y| (y * 3 + x) as u8);
        assert!(is_unique_in_neighbourhood(&img, 0, 0));
        assert!(is_unique_in_neighbourhood(&img, 2, 2));
    }

    #[test]
    fn test_single_pixel_image() {
        let img = Image::filled(1, 1, 7);
        assert!(is_unique_in_neighbourhood(&img, 0, 0));
    }

    #[test]
    fn test_sort_by_response_is_descending_and_stable() {
        let mut kps: Vec<Keypoint> = [3.0, 9.0, 3.0, 1.0]
            .iter()
            .enumerate()
            .map(|(i, &r)| {
                let mut kp = Keypoint::new(i as f32, 0.0, 1.0);
                kp.response = r;
                kp
            })
            .collect();
        sort_by_response(&mut kps);
        let order: Vec<f32> = kps.iter().map(|k| k.x).collect();
        assert_eq!(order, vec![1.0, 0.0, 2.0, 3.0]);
    }
}
