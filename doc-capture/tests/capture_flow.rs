use doc_capture::camera_control::RegionOfInterest;
use doc_capture::{AnalyzerContext, CameraControl, CaptureState, Result};
use doc_types::{Config, Frame, Rotation};
use eyre::Result as EyreResult;
use image::RgbImage;

struct StubCamera;

impl CameraControl for StubCamera {
    fn request_af_lock(&mut self, _roi: RegionOfInterest) -> Result<()> {
        Ok(())
    }
    fn cancel_af_lock(&mut self) -> Result<()> {
        Ok(())
    }
    fn request_capture(&mut self) -> Result<RgbImage> {
        let mut img = RgbImage::from_pixel(800, 600, image::Rgb([20, 20, 20]));
        for y in 50..550 {
            for x in 150..650 {
                img.put_pixel(x, y, image::Rgb([230, 230, 230]));
            }
        }
        Ok(img)
    }
}

fn high_contrast_a4_luma() -> Vec<u8> {
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
fn processing_frames_eventually_reports_a_detection() -> EyreResult<()> {
    let config = Config { warmup_ms: 0, ..Config::default() };
    let mut ctx = AnalyzerContext::new(config, StubCamera);
    let luma = high_contrast_a4_luma();

    for frame_no in 0..5u64 {
        let frame = Frame::new(800, 600, &luma, None, Rotation::Deg0, frame_no)?;
        ctx.process_frame(&frame)?;
    }

    let entry = ctx.detection_store().read().as_ref().clone();
    assert!(entry.normalized_corners.is_some());
    Ok(())
}

#[test]
fn capture_state_starts_idle() -> EyreResult<()> {
    let ctx = AnalyzerContext::new(Config::default(), StubCamera);
    assert!(matches!(ctx.capture_store().read().as_ref(), CaptureState::Idle));
    Ok(())
}
