use crate::format::PixelFormat;
use crate::plane::PlaneId;
use alloc::vec::Vec;
use display_fbc::{FbcRequest, FbcSurface, WorkMode};
use display_info::hw::MAX_PLANES;
use display_info::surface::{BlockSize, Compression, Rect, Rotation};
use display_mmu::SurfaceLayout;
use display_registers::layout::{ChannelCtrl, pack_xy};
use display_registers::map::{CHAN, chan};
use display_registers::{RegisterError, RegisterSink};

/// A pixel buffer as described by the compositor.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Surface {
    pub format: PixelFormat,
    pub compression: Compression,
    pub rotation: Rotation,
    /// Source rectangle to fetch.
    pub crop: Rect,
    /// Bytes of the backing buffer.
    pub size: u64,
    /// Byte offset of each memory plane; unused planes are ignored.
    pub offsets: [u64; MAX_PLANES],
    /// Line stride in bytes of each memory plane.
    pub strides: [u32; MAX_PLANES],
}

impl Surface {
    /// A single-plane, uncompressed surface of `width` × `height` pixels,
    /// cropped to its full size.
    #[must_use]
    pub const fn linear(format: PixelFormat, width: u16, height: u16) -> Self {
        let stride = width as u32 * format.bytes_per_pixel()[0] as u32;
        Self {
            format,
            compression: Compression::None,
            rotation: Rotation::Deg0,
            crop: Rect::new(0, 0, width, height),
            size: stride as u64 * height as u64,
            offsets: [0; MAX_PLANES],
            strides: [stride, 0, 0],
        }
    }

    /// Layout handed to the page-table binder.
    #[must_use]
    pub const fn layout(&self) -> SurfaceLayout {
        SurfaceLayout {
            size: self.size,
            planes: self.format.planes(),
            offsets: self.offsets,
            compression: self.compression,
        }
    }

    #[must_use]
    pub const fn fbc_surface(&self) -> FbcSurface<'static> {
        FbcSurface {
            compression: self.compression,
            rotation: self.rotation,
            crop_width: self.crop.width,
            crop_height: self.crop.height,
            bytes_per_pixel: self.format.bytes_per_pixel(),
            subsampling: self.format.subsampling(),
        }
    }
}

/// One plane of a frame: a surface scanned out by a channel.
#[derive(Debug)]
pub struct PlaneRequest<'a, S: ?Sized> {
    pub plane: PlaneId,
    pub channel: u8,
    /// Scaler to route the channel through, if any.
    pub scaler: Option<u8>,
    /// Destination position on the output. `dst_y` orders the plane's
    /// command list within its channel.
    pub dst_x: u16,
    pub dst_y: u16,
    pub surface: Surface,
    /// Pages backing the surface.
    pub memory: &'a S,
    pub work_mode: WorkMode,
}

impl<S: ?Sized> PlaneRequest<'_, S> {
    #[must_use]
    pub fn fbc_request(&self) -> FbcRequest {
        FbcRequest::for_surface(self.channel, &self.surface.fbc_surface(), self.work_mode)
    }

    /// Stage the channel's fetch programming: control word, crop, position
    /// and strides.
    pub(crate) fn register_writes<K: RegisterSink + ?Sized>(
        &self,
        sink: &mut K,
        translated: bool,
        fbc: bool,
    ) -> Result<(), RegisterError> {
        let ch = self.channel;
        let s = &self.surface;
        let ctrl = ChannelCtrl::new()
            .with_enable(true)
            .with_format(s.format.code())
            .with_rotation(s.rotation.bits())
            .with_compressed(s.compression.is_compressed())
            .with_block_32x8(s.compression.block() == Some(BlockSize::B32x8))
            .with_translated(translated)
            .with_planes(s.format.planes())
            .with_fbc(fbc);
        sink.stage(CHAN.at(ch, chan::CTRL)?, ctrl.into_bits());
        sink.stage(CHAN.at(ch, chan::CROP_POS)?, pack_xy(s.crop.x, s.crop.y));
        sink.stage(CHAN.at(ch, chan::CROP_SIZE)?, pack_xy(s.crop.width, s.crop.height));
        sink.stage(CHAN.at(ch, chan::DST_POS)?, pack_xy(self.dst_x, self.dst_y));
        for (i, &stride) in s.strides.iter().enumerate().take(usize::from(s.format.planes())) {
            sink.stage(CHAN.at(ch, chan::stride(i))?, stride);
        }
        Ok(())
    }
}

/// Everything the compositor wants on screen for one frame.
#[derive(Debug)]
pub struct FrameRequest<'a, S: ?Sized> {
    planes: Vec<PlaneRequest<'a, S>>,
}

impl<S: ?Sized> Default for FrameRequest<'_, S> {
    fn default() -> Self {
        Self { planes: Vec::new() }
    }
}

impl<'a, S: ?Sized> FrameRequest<'a, S> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, plane: PlaneRequest<'a, S>) {
        self.planes.push(plane);
    }

    #[must_use]
    pub fn with(mut self, plane: PlaneRequest<'a, S>) -> Self {
        self.push(plane);
        self
    }

    #[must_use]
    pub fn planes(&self) -> &[PlaneRequest<'a, S>] {
        &self.planes
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.planes.is_empty()
    }
}
