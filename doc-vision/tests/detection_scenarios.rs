use doc_types::{Frame, Rotation};
use doc_vision::DetectionPipeline;
use eyre::Result;

fn high_contrast_a4_frame() -> Vec<u8> {
    // 800x600, white rectangle roughly matching an A4 sheet on a dark
    // background, corners (150,50)-(650,550).
    let (w, h) = (800usize, 600usize);
    let mut data = vec![20u8; w * h];
    for y in 50..550 {
        for x in 150..650 {
            data[y * w + x] = 235;
        }
    }
    data
}

#[test]
fn high_contrast_document_is_detected_with_reasonable_confidence() -> Result<()> {
    let luma = high_contrast_a4_frame();
    let frame = Frame::new(800, 600, &luma, None, Rotation::Deg0, 0)?;
    let mut pipeline = DetectionPipeline::new(25);
    let detection = pipeline.detect(&frame, 1);
    assert!(detection.is_some());
    let detection = detection.unwrap();
    assert!(detection.confidence >= 0.35);
    Ok(())
}

#[test]
fn uniform_gray_scene_has_no_document() -> Result<()> {
    let luma = vec![128u8; 800 * 600];
    let frame = Frame::new(800, 600, &luma, None, Rotation::Deg0, 0)?;
    let mut pipeline = DetectionPipeline::new(25);
    for frame_no in 0..10 {
        let detection = pipeline.detect(&frame, frame_no);
        assert!(detection.is_none());
    }
    Ok(())
}
