use doc_geometry::{Point, Quad};
use doc_types::OwnedLumaFrame;
use doc_tracker::TemporalTracker;
use eyre::Result;

fn frame_with_document(w: u32, h: u32) -> OwnedLumaFrame {
    let mut data = vec![20u8; (w * h) as usize];
    for y in (h / 8)..(h - h / 8) {
        for x in (w / 8)..(w - w / 8) {
            data[(y * w + x) as usize] = 230;
        }
    }
    OwnedLumaFrame { width: w, height: h, luma: data }
}

fn quad_at(w: u32, h: u32, offset: f64) -> Result<Quad> {
    Ok(Quad::new(
        Point::new((w / 8) as f64 + offset, (h / 8) as f64),
        Point::new((w - w / 8) as f64 + offset, (h / 8) as f64),
        Point::new((w - w / 8) as f64 + offset, (h - h / 8) as f64),
        Point::new((w / 8) as f64 + offset, (h - h / 8) as f64),
        w.min(h) as f64,
    )?)
}

#[test]
fn stable_document_followed_by_sudden_pan_drops_stability() -> Result<()> {
    let mut tracker = TemporalTracker::new();
    let frame = frame_with_document(640, 480);
    let quad = quad_at(640, 480, 0.0)?;

    for _ in 0..25 {
        tracker.observe(&frame, Some((quad, 0.75)));
    }
    assert!(tracker.is_stable());

    let diagonal = quad.bounding_box_diagonal();
    let panned = quad_at(640, 480, diagonal * 0.3)?;
    tracker.observe(&frame, Some((panned, 0.75)));

    assert!(tracker.stability_progress() <= 0.1);
    Ok(())
}

#[test]
fn prolonged_misses_eventually_clear_tracking() -> Result<()> {
    let mut tracker = TemporalTracker::new();
    let frame = frame_with_document(640, 480);
    let quad = quad_at(640, 480, 0.0)?;
    tracker.observe(&frame, Some((quad, 0.75)));

    for _ in 0..12 {
        tracker.observe(&frame, None);
    }
    assert!(!tracker.is_stable());
    Ok(())
}
