/// Sensor-to-display rotation, always clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 90,
            Rotation::Deg180 => 180,
            Rotation::Deg270 => 270,
        }
    }

    /// Compose two successive rotations, used by orientation recovery to
    /// fold an automatic rotation onto a prior manual one.
    pub fn compose(self, other: Rotation) -> Rotation {
        let steps = (self.degrees() / 90 + other.degrees() / 90) % 4;
        match steps {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }
}

/// One delivered camera frame, borrowed by the analyzer for the duration
/// of a single analysis call.
///
/// `luma` is a row-major 8-bit luminance plane of length `width * height`.
/// `chroma` carries optional interleaved U/V (or equivalent) planes for
/// color-aware strategies; its absence simply disables those strategies.
#[derive(Debug, Clone)]
pub struct Frame<'a> {
    pub width: u32,
    pub height: u32,
    pub luma: &'a [u8],
    pub chroma: Option<Chroma<'a>>,
    pub rotation: Rotation,
    pub timestamp_ms: u64,
}

/// Interleaved chroma planes at the same resolution as the luma plane,
/// two bytes per pixel (e.g. U, V or Cb, Cr).
#[derive(Debug, Clone, Copy)]
pub struct Chroma<'a> {
    pub data: &'a [u8],
}

impl<'a> Frame<'a> {
    pub fn new(
        width: u32,
        height: u32,
        luma: &'a [u8],
        chroma: Option<Chroma<'a>>,
        rotation: Rotation,
        timestamp_ms: u64,
    ) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(crate::Error::ZeroDimensionFrame);
        }
        if luma.len() != (width as usize) * (height as usize) {
            return Err(crate::Error::UnsupportedFrameFormat(format!(
                "luma plane length {} does not match {}x{}",
                luma.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            luma,
            chroma,
            rotation,
            timestamp_ms,
        })
    }

    pub fn shorter_side(&self) -> f64 {
        self.width.min(self.height) as f64
    }

    pub fn has_chroma(&self) -> bool {
        self.chroma.is_some()
    }
}

/// An owned copy of a frame's luminance plane, used by the tracker to hold
/// the previous frame across analysis calls without borrowing from the
/// caller.
#[derive(Debug, Clone)]
pub struct OwnedLumaFrame {
    pub width: u32,
    pub height: u32,
    pub luma: Vec<u8>,
}

impl OwnedLumaFrame {
    pub fn from_frame(frame: &Frame<'_>) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            luma: frame.luma.to_vec(),
        }
    }

    pub fn same_dimensions(&self, frame: &Frame<'_>) -> bool {
        self.width == frame.width && self.height == frame.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_dimensions() {
        let luma = [0u8; 0];
        let err = Frame::new(0, 10, &luma, None, Rotation::Deg0, 0).unwrap_err();
        assert!(matches!(err, crate::Error::ZeroDimensionFrame));
    }

    #[test]
    fn rejects_mismatched_luma_length() {
        let luma = [0u8; 4];
        let err = Frame::new(3, 3, &luma, None, Rotation::Deg0, 0).unwrap_err();
        assert!(matches!(err, crate::Error::UnsupportedFrameFormat(_)));
    }

    #[test]
    fn rotation_compose_wraps_at_360() {
        assert_eq!(Rotation::Deg270.compose(Rotation::Deg180), Rotation::Deg90);
        assert_eq!(Rotation::Deg0.compose(Rotation::Deg0), Rotation::Deg0);
    }
}
