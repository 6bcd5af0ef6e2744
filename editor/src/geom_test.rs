#![allow(clippy::float_cmp)]

use super::*;

#[test]
fn from_corners_normalizes_any_order() {
    let b = Bounds::from_corners(Point::new(30.0, 10.0), Point::new(10.0, 40.0));
    assert_eq!(b, Bounds::new(10.0, 10.0, 20.0, 30.0));
}

#[test]
fn new_clamps_negative_size() {
    let b = Bounds::new(0.0, 0.0, -5.0, 3.0);
    assert_eq!(b.width, 0.0);
    assert_eq!(b.height, 3.0);
}

#[test]
fn of_points_offsets_by_origin() {
    let b = Bounds::of_points(Point::new(100.0, 50.0), &[0.0, 0.0, -10.0, 20.0, 30.0, 5.0]);
    assert_eq!(b, Bounds::new(90.0, 50.0, 40.0, 20.0));
}

#[test]
fn of_points_empty_is_zero_box() {
    let b = Bounds::of_points(Point::new(4.0, 5.0), &[]);
    assert_eq!(b, Bounds::new(4.0, 5.0, 0.0, 0.0));
}

#[test]
fn contains_is_inclusive() {
    let b = Bounds::new(0.0, 0.0, 10.0, 10.0);
    assert!(b.contains(Point::new(10.0, 10.0)));
    assert!(b.contains(Point::new(0.0, 5.0)));
    assert!(!b.contains(Point::new(10.1, 5.0)));
}

#[test]
fn expand_grows_every_side() {
    let b = Bounds::new(10.0, 10.0, 10.0, 10.0).expand(2.0);
    assert_eq!(b, Bounds::new(8.0, 8.0, 14.0, 14.0));
}

#[test]
fn extent_is_larger_side() {
    assert_eq!(Bounds::new(0.0, 0.0, 3.0, 9.0).extent(), 9.0);
}

#[test]
fn pixel_rect_rounds_and_clips() {
    let b = Bounds::new(-4.6, 10.4, 30.0, 200.0);
    let r = b.to_pixel_rect(20, 100).unwrap();
    assert_eq!(r, PixelRect { x: 0, y: 10, width: 20, height: 90 });
}

#[test]
fn pixel_rect_outside_surface_is_none() {
    assert!(Bounds::new(50.0, 50.0, 10.0, 10.0).to_pixel_rect(20, 20).is_none());
    assert!(Bounds::new(5.0, 5.0, 0.2, 0.2).to_pixel_rect(20, 20).is_none());
}

#[test]
fn segment_distance_perpendicular_and_endpoint() {
    let a = Point::new(0.0, 0.0);
    let b = Point::new(10.0, 0.0);
    assert_eq!(distance_to_segment(Point::new(5.0, 3.0), a, b), 3.0);
    assert_eq!(distance_to_segment(Point::new(13.0, 4.0), a, b), 5.0);
}

#[test]
fn segment_distance_degenerate_segment() {
    let a = Point::new(1.0, 1.0);
    assert_eq!(distance_to_segment(Point::new(4.0, 5.0), a, a), 5.0);
}

#[test]
fn polyline_distance_uses_nearest_segment() {
    let pts = [0.0, 0.0, 10.0, 0.0, 10.0, 10.0];
    let d = distance_to_polyline(Point::new(12.0, 5.0), Point::new(0.0, 0.0), &pts);
    assert_eq!(d, 2.0);
}

#[test]
fn polyline_distance_empty_is_infinite() {
    assert!(distance_to_polyline(Point::new(0.0, 0.0), Point::new(0.0, 0.0), &[]).is_infinite());
}
