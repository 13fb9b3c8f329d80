use crate::errors::Result;

/// Normalized region of interest, `(x, y, width, height)` each in `[0,1]`.
pub type RegionOfInterest = (f64, f64, f64, f64);

/// Outbound boundary: the three camera operations the core can issue.
/// All are asynchronous from the camera's point of view; implementors
/// report completion through their own channel and the core polls or
/// awaits it outside this trait.
pub trait CameraControl {
    /// Request an autofocus lock on `roi`. Issued once
    /// `stabilityProgress >= 0.5`.
    fn request_af_lock(&mut self, roi: RegionOfInterest) -> Result<()>;

    /// Return the camera to continuous autofocus. Issued when detection
    /// is lost.
    fn cancel_af_lock(&mut self) -> Result<()>;

    /// Request one full-resolution frame (raw or JPEG-compressed,
    /// decoded by the caller). Issued when the auto-capture predicate
    /// holds.
    fn request_capture(&mut self) -> Result<image::RgbImage>;
}
