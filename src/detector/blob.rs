use image::GrayImage;
use imageproc::contours::{find_contours, Contour};
use imageproc::geometry::convex_hull;
use imageproc::point::Point;
use tracing::debug;

/// Largest foreground region found in one mask
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    /// Ordered boundary points
    pub contour: Vec<Point<i32>>,
    /// Convex hull of the boundary, ordered
    pub hull: Vec<Point<i32>>,
    /// Enclosed polygon area in px^2
    pub area: f64,
}

/// Finds the dominant connected region of a binary mask
#[derive(Debug, Clone)]
pub struct BlobDetector {
    area_threshold: f64,
}

impl BlobDetector {
    pub fn new(area_threshold: f64) -> Self {
        Self { area_threshold }
    }

    pub fn area_threshold(&self) -> f64 {
        self.area_threshold
    }

    /// Return the largest contour of the mask if its area exceeds the threshold
    pub fn detect(&self, mask: &GrayImage) -> Option<Blob> {
        let contours: Vec<Contour<i32>> = find_contours(mask);
        let candidates = contours.into_iter().map(|c| c.points);

        let (contour, area) = largest_by_area(candidates)?;

        if area <= self.area_threshold {
            debug!(
                "Largest contour area {:.1} not above threshold {:.1}",
                area, self.area_threshold
            );
            return None;
        }

        let hull = convex_hull(&contour);
        Some(Blob {
            contour,
            hull,
            area,
        })
    }
}

/// Max-by-area reduction over candidate contours. Ties keep the earlier one.
pub fn largest_by_area<I>(contours: I) -> Option<(Vec<Point<i32>>, f64)>
where
    I: IntoIterator<Item = Vec<Point<i32>>>,
{
    contours.into_iter().fold(None, |best, contour| {
        let area = polygon_area(&contour);
        match best {
            Some((_, best_area)) if best_area >= area => best,
            _ => Some((contour, area)),
        }
    })
}

/// Shoelace area of a closed polygon given by its ordered vertices
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let twice_area: i64 = points
        .iter()
        .zip(points.iter().cycle().skip(1))
        .map(|(a, b)| a.x as i64 * b.y as i64 - b.x as i64 * a.y as i64)
        .sum();

    twice_area.abs() as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill_rect(mask: &mut GrayImage, x0: u32, y0: u32, width: u32, height: u32) {
        for y in y0..y0 + height {
            for x in x0..x0 + width {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
    }

    fn rect(x0: i32, y0: i32, x1: i32, y1: i32) -> Vec<Point<i32>> {
        vec![
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ]
    }

    #[test]
    fn test_polygon_area() {
        assert_eq!(polygon_area(&rect(0, 0, 10, 5)), 50.0);
        assert_eq!(polygon_area(&rect(0, 0, 10, 5).into_iter().rev().collect::<Vec<_>>()), 50.0);
        assert_eq!(polygon_area(&[Point::new(0, 0), Point::new(4, 4)]), 0.0);
    }

    #[test]
    fn test_largest_by_area_prefers_first_on_ties() {
        let first = rect(0, 0, 10, 10);
        let second = rect(20, 20, 30, 30);
        let small = rect(0, 0, 2, 2);

        let (winner, area) =
            largest_by_area(vec![small, first.clone(), second]).unwrap();

        assert_eq!(winner, first);
        assert_eq!(area, 100.0);
        assert!(largest_by_area(Vec::<Vec<Point<i32>>>::new()).is_none());
    }

    #[test]
    fn test_empty_mask_has_no_blob() {
        let detector = BlobDetector::new(1500.0);
        assert!(detector.detect(&GrayImage::new(120, 120)).is_none());
    }

    #[test]
    fn test_small_region_does_not_qualify() {
        let detector = BlobDetector::new(1500.0);
        let mut mask = GrayImage::new(120, 120);
        // 30x30 pixels trace a 29x29 boundary polygon
        fill_rect(&mut mask, 10, 10, 30, 30);

        assert!(detector.detect(&mask).is_none());
    }

    #[test]
    fn test_largest_region_is_selected() {
        let detector = BlobDetector::new(1500.0);
        let mut mask = GrayImage::new(200, 200);
        fill_rect(&mut mask, 10, 10, 45, 45);
        fill_rect(&mut mask, 100, 100, 61, 61);

        let blob = detector.detect(&mask).unwrap();

        assert_eq!(blob.area, 3600.0);
        assert!(blob.contour.iter().all(|p| p.x >= 100 && p.y >= 100));
        assert!(blob.area > detector.area_threshold());
    }

    #[test]
    fn test_hull_encloses_concave_region() {
        let detector = BlobDetector::new(100.0);
        let mut mask = GrayImage::new(120, 120);
        // L shape: hull area exceeds contour area
        fill_rect(&mut mask, 10, 10, 20, 80);
        fill_rect(&mut mask, 10, 70, 80, 20);

        let blob = detector.detect(&mask).unwrap();

        assert!(blob.hull.len() >= 3);
        assert!(polygon_area(&blob.hull) > blob.area);
    }
}
