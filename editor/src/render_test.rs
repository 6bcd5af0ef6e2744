use image::Rgba as Px;

use super::*;
use crate::doc::ElementStyle;

const BLUE: Px<u8> = Px([0, 0, 255, 255]);

fn gradient(w: u32, h: u32) -> RgbaImage {
    RgbaImage::from_fn(w, h, |x, y| Px([(x * 5 % 256) as u8, (y * 5 % 256) as u8, 40, 255]))
}

fn styled(color: &str, width: f64) -> ElementStyle {
    ElementStyle { stroke_color: color.into(), stroke_width: width, ..ElementStyle::default() }
}

fn rect_el(x: f64, y: f64, w: f64, h: f64, filled: bool) -> DrawingElement {
    DrawingElement::new(x, y, styled("#0000ff", 2.0), Shape::Rect(BoxShape { width: w, height: h, filled }))
}

fn blur_el(x: f64, y: f64, w: f64, h: f64) -> DrawingElement {
    DrawingElement::new(x, y, styled("#000000", 1.0), Shape::Blur(BoxShape { width: w, height: h, filled: false }))
}

fn render(renderer: &mut CompositeRenderer, base: &RgbaImage, doc: &ElementDocument) -> RgbaImage {
    renderer.render(base, doc, None, 1.0).unwrap()
}

// =============================================================
// Surface
// =============================================================

#[test]
fn empty_document_reproduces_base() {
    let base = gradient(40, 30);
    let out = render(&mut CompositeRenderer::default(), &base, &ElementDocument::new());
    assert_eq!(out, base);
}

#[test]
fn scale_sizes_output() {
    let base = gradient(40, 30);
    let out = CompositeRenderer::default().render(&base, &ElementDocument::new(), None, 2.0).unwrap();
    assert_eq!(out.dimensions(), (80, 60));
}

#[test]
fn oversized_surface_is_an_error_not_a_crash() {
    let base = RgbaImage::new(20_000, 2);
    let err = CompositeRenderer::default().render(&base, &ElementDocument::new(), None, 2.0).unwrap_err();
    assert!(matches!(err, RenderError::CanvasTooLarge { width: 40_000, height: 4 }));
}

#[test]
fn pixmap_conversion_round_trips_opaque_pixels() {
    let base = gradient(7, 5);
    let back = from_pixmap(&to_pixmap(&base).unwrap()).unwrap();
    assert_eq!(back, base);
}

// =============================================================
// Shapes
// =============================================================

#[test]
fn filled_rect_paints_interior() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    doc.add(rect_el(5.0, 5.0, 10.0, 10.0, true));
    let out = render(&mut CompositeRenderer::default(), &base, &doc);
    assert_eq!(*out.get_pixel(10, 10), BLUE);
    assert_eq!(out.get_pixel(30, 30), base.get_pixel(30, 30));
}

#[test]
fn hollow_rect_paints_border_only() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    doc.add(rect_el(5.0, 5.0, 20.0, 20.0, false));
    let out = render(&mut CompositeRenderer::default(), &base, &doc);
    assert_eq!(*out.get_pixel(5, 15), BLUE);
    assert_eq!(out.get_pixel(15, 15), base.get_pixel(15, 15));
}

#[test]
fn hidden_elements_are_not_drawn() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    let id = doc.add(rect_el(5.0, 5.0, 10.0, 10.0, true));
    doc.set_visible(&id, false);
    assert_eq!(render(&mut CompositeRenderer::default(), &base, &doc), base);
}

#[test]
fn transparent_element_leaves_base() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    let mut el = rect_el(5.0, 5.0, 10.0, 10.0, true);
    el.style.opacity = 0.0;
    doc.add(el);
    assert_eq!(render(&mut CompositeRenderer::default(), &base, &doc), base);
}

#[test]
fn pending_element_drawn_on_top() {
    let base = gradient(40, 40);
    let pending = rect_el(20.0, 20.0, 10.0, 10.0, true);
    let out = CompositeRenderer::default().render(&base, &ElementDocument::new(), Some(&pending), 1.0).unwrap();
    assert_eq!(*out.get_pixel(25, 25), BLUE);
}

#[test]
fn arrow_draws_head_at_tip() {
    let base = RgbaImage::from_pixel(60, 60, Px([255, 255, 255, 255]));
    let mut doc = ElementDocument::new();
    doc.add(DrawingElement::new(5.0, 30.0, styled("#0000ff", 2.0), Shape::Arrow { points: vec![0.0, 0.0, 50.0, 0.0] }));
    let out = render(&mut CompositeRenderer::default(), &base, &doc);
    // The head is wider than the 2 px shaft near the tip.
    assert_eq!(*out.get_pixel(47, 32), BLUE);
    assert_ne!(*out.get_pixel(20, 32), BLUE);
}

#[test]
fn text_without_font_draws_background_box() {
    let base = RgbaImage::from_pixel(60, 60, Px([255, 255, 255, 255]));
    let body = TextBody {
        content: "hi".into(),
        background: Some("#0000ff".into()),
        width: 30.0,
        height: 20.0,
        ..TextBody::default()
    };
    let mut doc = ElementDocument::new();
    doc.add(DrawingElement::new(10.0, 10.0, styled("#000000", 1.0), Shape::Text(body)));
    let out = render(&mut CompositeRenderer::new(None), &base, &doc);
    assert_eq!(*out.get_pixel(20, 20), BLUE);
    assert_eq!(*out.get_pixel(50, 50), Px([255, 255, 255, 255]));
}

// =============================================================
// Blur
// =============================================================

#[test]
fn pixelate_produces_uniform_cells() {
    let base = gradient(40, 40);
    let rect = PixelRect { x: 0, y: 0, width: 20, height: 20 };
    let out = pixelate(&base, rect, 10);
    assert_eq!(out.dimensions(), (20, 20));
    for (x, y) in [(0, 0), (9, 0), (0, 9), (9, 9)] {
        assert_eq!(out.get_pixel(x, y), out.get_pixel(0, 0));
    }
    assert_ne!(out.get_pixel(10, 10), out.get_pixel(0, 0));
}

#[test]
fn blur_region_matches_pixelated_original() {
    let base = gradient(60, 60);
    let mut doc = ElementDocument::new();
    doc.add(blur_el(10.0, 10.0, 20.0, 20.0));
    let out = render(&mut CompositeRenderer::default(), &base, &doc);
    let expected = pixelate(&base, PixelRect { x: 10, y: 10, width: 20, height: 20 }, PIXELATE_CELL_PX);
    assert_eq!(out.get_pixel(15, 15), expected.get_pixel(5, 5));
    assert_eq!(out.get_pixel(40, 40), base.get_pixel(40, 40));
}

#[test]
fn overlapping_blurs_never_compound() {
    let base = gradient(60, 60);
    let mut doc = ElementDocument::new();
    doc.add(blur_el(0.0, 0.0, 40.0, 40.0));
    doc.add(blur_el(20.0, 20.0, 30.0, 30.0));
    let out = render(&mut CompositeRenderer::default(), &base, &doc);
    let top = pixelate(&base, PixelRect { x: 20, y: 20, width: 30, height: 30 }, PIXELATE_CELL_PX);
    assert_eq!(out.get_pixel(25, 25), top.get_pixel(5, 5));
}

#[test]
fn moved_blur_is_recomputed_from_original() {
    let base = gradient(80, 80);
    let mut doc = ElementDocument::new();
    let id = doc.add(blur_el(0.0, 0.0, 20.0, 20.0));
    let mut renderer = CompositeRenderer::default();
    render(&mut renderer, &base, &doc);

    doc.get_mut(&id).unwrap().translate(40.0, 40.0);
    let out = render(&mut renderer, &base, &doc);
    let expected = pixelate(&base, PixelRect { x: 40, y: 40, width: 20, height: 20 }, PIXELATE_CELL_PX);
    assert_eq!(out.get_pixel(45, 45), expected.get_pixel(5, 5));
    assert_eq!(out.get_pixel(5, 5), base.get_pixel(5, 5));
    assert_eq!(renderer.cached_blurs(), 1);
}

#[test]
fn removed_blur_is_evicted_from_cache() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    let id = doc.add(blur_el(0.0, 0.0, 20.0, 20.0));
    let mut renderer = CompositeRenderer::default();
    render(&mut renderer, &base, &doc);
    assert_eq!(renderer.cached_blurs(), 1);

    doc.remove(&id);
    render(&mut renderer, &base, &doc);
    assert_eq!(renderer.cached_blurs(), 0);
}

#[test]
fn blur_outside_base_is_skipped() {
    let base = gradient(40, 40);
    let mut doc = ElementDocument::new();
    doc.add(blur_el(100.0, 100.0, 20.0, 20.0));
    let mut renderer = CompositeRenderer::default();
    assert_eq!(render(&mut renderer, &base, &doc), base);
    assert_eq!(renderer.cached_blurs(), 0);
}
