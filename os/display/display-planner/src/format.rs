/// Pixel formats the fetch channels understand.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum PixelFormat {
    Argb8888,
    Xrgb8888,
    Rgb888,
    Rgb565,
    /// Y plane plus interleaved CbCr plane.
    Nv12,
    /// Y plane plus interleaved CrCb plane.
    Nv21,
    /// Three separate Y, Cb and Cr planes.
    Yuv420,
}

impl PixelFormat {
    /// Six-bit hardware format code.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Argb8888 => 0x00,
            Self::Xrgb8888 => 0x01,
            Self::Rgb888 => 0x02,
            Self::Rgb565 => 0x03,
            Self::Nv12 => 0x20,
            Self::Nv21 => 0x21,
            Self::Yuv420 => 0x22,
        }
    }

    #[must_use]
    pub const fn is_yuv(self) -> bool {
        self.code() & 0x20 != 0
    }

    /// Bytes per pixel of each memory plane.
    #[must_use]
    pub const fn bytes_per_pixel(self) -> &'static [u8] {
        match self {
            Self::Argb8888 | Self::Xrgb8888 => &[4],
            Self::Rgb888 => &[3],
            Self::Rgb565 => &[2],
            Self::Nv12 | Self::Nv21 => &[1, 2],
            Self::Yuv420 => &[1, 1, 1],
        }
    }

    /// Horizontal subsampling divisor of each memory plane.
    #[must_use]
    pub const fn subsampling(self) -> &'static [u8] {
        match self {
            Self::Argb8888 | Self::Xrgb8888 | Self::Rgb888 | Self::Rgb565 => &[1],
            Self::Nv12 | Self::Nv21 => &[1, 2],
            Self::Yuv420 => &[1, 2, 2],
        }
    }

    #[must_use]
    pub const fn planes(self) -> u8 {
        match self {
            Self::Argb8888 | Self::Xrgb8888 | Self::Rgb888 | Self::Rgb565 => 1,
            Self::Nv12 | Self::Nv21 => 2,
            Self::Yuv420 => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yuv_formats_are_multi_planar() {
        for f in [PixelFormat::Nv12, PixelFormat::Nv21, PixelFormat::Yuv420] {
            assert!(f.is_yuv());
            assert!(f.planes() > 1);
            assert!(f.code() < 1 << 6);
            assert_eq!(usize::from(f.planes()), f.bytes_per_pixel().len());
            assert_eq!(f.bytes_per_pixel().len(), f.subsampling().len());
        }
        assert!(!PixelFormat::Rgb565.is_yuv());
        assert_eq!(PixelFormat::Argb8888.planes(), 1);
    }
}
