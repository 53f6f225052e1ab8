use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use bytemuck::Pod;

use crate::registry::{BufferDesc, ImageDesc, ImageFormat, RegistryError, SamplerDesc};
use crate::stage::{check_local_size, DrawCall};

use super::{Backend, BoundResource, ComputeBuild, FrameStart, RenderBuild};

/// Host-side compute program run by the software backend.
///
/// Called once per dispatch; the kernel walks `ctx.invocations()` itself and
/// must ignore invocations past its problem size, like the GPU shader does.
pub type HostKernel = fn(&mut KernelCtx<'_>);

// ── objects ───────────────────────────────────────────────────────────────

/// Buffer storage, word-backed so record slices are 4-byte aligned.
#[derive(Debug, Clone)]
pub struct SoftBuffer {
    label: String,
    len: usize,
    words: Rc<RefCell<Vec<u32>>>,
}

impl SoftBuffer {
    fn new(desc: &BufferDesc) -> Self {
        let len = desc.size as usize;
        let mut words = vec![0u32; len.div_ceil(4)];
        if let Some(bytes) = &desc.contents {
            let dst: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
            dst[..bytes.len()].copy_from_slice(bytes);
        }

        Self {
            label: desc.label.clone(),
            len,
            words: Rc::new(RefCell::new(words)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn read_bytes(&self) -> Vec<u8> {
        let words = self.words.borrow();
        let bytes: &[u8] = bytemuck::cast_slice(&words);
        bytes[..self.len].to_vec()
    }

    /// Copies the contents out as records of `T`; a trailing partial record is dropped.
    pub fn read_as<T: Pod>(&self) -> Vec<T> {
        self.read_bytes()
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct SoftImage {
    label: String,
    width: u32,
    height: u32,
    format: ImageFormat,
    texels: Rc<RefCell<Vec<u8>>>,
}

impl SoftImage {
    fn new(desc: &ImageDesc) -> Self {
        let len = desc.width as usize * desc.height as usize * desc.format.bytes_per_texel() as usize;
        Self {
            label: desc.label.clone(),
            width: desc.width,
            height: desc.height,
            format: desc.format,
            texels: Rc::new(RefCell::new(vec![0; len])),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn read_texels(&self) -> Vec<u8> {
        self.texels.borrow().clone()
    }
}

pub struct SoftCompute {
    label: String,
    kernel: HostKernel,
    buffers: Vec<(u32, SoftBuffer)>,
    images: Vec<(u32, SoftImage)>,
    local_size: [u32; 3],
}

enum Source {
    Buffer(SoftBuffer),
    Image(SoftImage),
}

pub struct SoftRender {
    label: String,
    sources: Vec<Source>,
}

// ── kernel context ────────────────────────────────────────────────────────

/// Mutable view of one storage image inside a kernel.
pub struct ImageTexels<'b> {
    pub width: u32,
    pub height: u32,
    pub bytes_per_texel: u32,
    pub texels: &'b mut [u8],
}

impl ImageTexels<'_> {
    /// Writes one RGBA8 texel; out-of-range coordinates are ignored.
    pub fn put_rgba8(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        if x >= self.width || y >= self.height || self.bytes_per_texel != 4 {
            return;
        }
        let at = (y as usize * self.width as usize + x as usize) * 4;
        self.texels[at..at + 4].copy_from_slice(&rgba);
    }
}

/// Everything a host kernel can see during one dispatch.
pub struct KernelCtx<'a> {
    params: Option<&'a [u8]>,
    grid: [u32; 3],
    local_size: [u32; 3],
    buffers: Vec<(u32, RefMut<'a, Vec<u32>>, usize)>,
    images: Vec<(u32, u32, u32, u32, RefMut<'a, Vec<u8>>)>,
}

impl KernelCtx<'_> {
    pub fn params(&self) -> Option<&[u8]> {
        self.params
    }

    /// Decodes the parameter block as its `#[repr(C)]` mirror.
    pub fn params_as<T: Pod>(&self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        self.params
            .filter(|p| p.len() >= size)
            .map(|p| bytemuck::pod_read_unaligned(&p[..size]))
    }

    pub fn grid(&self) -> [u32; 3] {
        self.grid
    }

    pub fn local_size(&self) -> [u32; 3] {
        self.local_size
    }

    /// Total invocations per axis (`grid * local_size`).
    pub fn extent(&self) -> [u32; 3] {
        std::array::from_fn(|i| self.grid[i] * self.local_size[i])
    }

    /// Global invocation ids, x fastest.
    pub fn invocations(&self) -> impl Iterator<Item = [u32; 3]> + use<> {
        let [ex, ey, ez] = self.extent();
        (0..ez).flat_map(move |z| (0..ey).flat_map(move |y| (0..ex).map(move |x| [x, y, z])))
    }

    pub fn storage_buffer(&mut self, slot: u32) -> Option<&mut [u8]> {
        let (_, words, len) = self.buffers.iter_mut().find(|(s, _, _)| *s == slot)?;
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(words.as_mut_slice());
        Some(&mut bytes[..*len])
    }

    /// The storage buffer at `slot` viewed as records of `T`.
    pub fn storage_records<T: Pod>(&mut self, slot: u32) -> Option<&mut [T]> {
        let bytes = self.storage_buffer(slot)?;
        bytemuck::try_cast_slice_mut(bytes).ok()
    }

    pub fn storage_image(&mut self, slot: u32) -> Option<ImageTexels<'_>> {
        let (_, width, height, bpt, texels) = self.images.iter_mut().find(|(s, ..)| *s == slot)?;
        Some(ImageTexels {
            width: *width,
            height: *height,
            bytes_per_texel: *bpt,
            texels: texels.as_mut_slice(),
        })
    }
}

// ── backend ───────────────────────────────────────────────────────────────

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    BeginFrame { frame: u64 },
    SkippedFrame,
    Dispatch { label: String, grid: [u32; 3] },
    Draw { label: String, call: DrawCall },
    Present { frame: u64 },
}

/// Commands kept by [`SoftwareBackend::log`]; the oldest half is dropped when full.
pub const LOG_CAPACITY: usize = 4096;

/// What the render stage read for one presented frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub label: String,
    pub call: DrawCall,
    pub params: Option<Vec<u8>>,
    /// Contents of every resource the draw reads, in binding order.
    pub bytes: Vec<u8>,
}

/// Deterministic host backend.
///
/// Compute stages run their host kernel synchronously. Render stages capture a
/// snapshot of the resources they read, published on `present`.
pub struct SoftwareBackend {
    surface: (u32, u32),
    frame: u64,
    frame_open: bool,
    skip_frames: u32,
    log: Vec<Command>,
    pending: Option<FrameSnapshot>,
    last_frame: Option<FrameSnapshot>,
}

impl SoftwareBackend {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            surface: (width, height),
            frame: 0,
            frame_open: false,
            skip_frames: 0,
            log: Vec::new(),
            pending: None,
            last_frame: None,
        }
    }

    /// Makes the next `n` `begin_frame` calls report `FrameStart::Skip`.
    pub fn skip_next_frames(&mut self, n: u32) {
        self.skip_frames = n;
    }

    /// Recent commands, oldest first. At most [`LOG_CAPACITY`] are kept.
    pub fn log(&self) -> &[Command] {
        &self.log
    }

    pub fn take_log(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.log)
    }

    /// Snapshot of the most recently presented frame.
    pub fn last_frame(&self) -> Option<&FrameSnapshot> {
        self.last_frame.as_ref()
    }

    /// Number of presented frames.
    pub fn presented(&self) -> u64 {
        self.frame
    }

    fn record(&mut self, cmd: Command) {
        if self.log.len() >= LOG_CAPACITY {
            self.log.drain(..LOG_CAPACITY / 2);
        }
        self.log.push(cmd);
    }
}

impl Backend for SoftwareBackend {
    type Buffer = SoftBuffer;
    type Image = SoftImage;
    type Sampler = SamplerDesc;
    type Attachments = Vec<(u32, SoftImage)>;
    type ComputePipeline = SoftCompute;
    type RenderPipeline = SoftRender;

    fn name(&self) -> &'static str {
        "software"
    }

    fn create_buffer(&mut self, desc: &BufferDesc) -> Result<SoftBuffer, RegistryError> {
        Ok(SoftBuffer::new(desc))
    }

    fn create_image(&mut self, desc: &ImageDesc) -> Result<SoftImage, RegistryError> {
        Ok(SoftImage::new(desc))
    }

    fn create_sampler(&mut self, desc: &SamplerDesc) -> Result<SamplerDesc, RegistryError> {
        Ok(desc.clone())
    }

    fn create_attachments(
        &mut self,
        _label: &str,
        targets: &[(u32, &SoftImage)],
    ) -> Result<Self::Attachments, RegistryError> {
        Ok(targets.iter().map(|&(slot, img)| (slot, img.clone())).collect())
    }

    fn create_compute_pipeline(&mut self, build: ComputeBuild<'_, Self>) -> Result<SoftCompute, RegistryError> {
        // The WGSL is not run here, but it must exist and agree with the host on
        // the local size, as on the GPU.
        if let Some(code) = &build.shader.wgsl {
            let source = code.load()?;
            check_local_size(build.label, &source, build.entry_point, build.local_size)?;
        }
        let kernel = build.shader.host.ok_or_else(|| RegistryError::MissingShader {
            stage: build.label.to_string(),
            backend: "software",
        })?;

        let mut buffers = Vec::new();
        let mut images = Vec::new();
        for b in &build.bindings {
            match b.resource {
                BoundResource::StorageBuffer { buffer, .. } => buffers.push((b.slot, buffer.clone())),
                BoundResource::SampledImage(image) => images.push((b.slot, image.clone())),
                BoundResource::Sampler(_) => {}
            }
        }
        if let Some(targets) = build.attachments {
            images.extend(targets.iter().cloned());
        }

        // A kernel borrows every resource mutably; the same storage twice would alias.
        for (i, (slot, img)) in images.iter().enumerate() {
            if let Some((other, _)) = images[..i].iter().find(|(_, o)| Rc::ptr_eq(&o.texels, &img.texels)) {
                return Err(RegistryError::AliasedBinding {
                    stage: build.label.to_string(),
                    kind: "image",
                    first: *other,
                    second: *slot,
                });
            }
        }

        Ok(SoftCompute {
            label: build.label.to_string(),
            kernel,
            buffers,
            images,
            local_size: build.local_size,
        })
    }

    fn create_render_pipeline(&mut self, build: RenderBuild<'_, Self>) -> Result<SoftRender, RegistryError> {
        if let Some(code) = &build.shader.wgsl {
            code.load()?;
        }

        let mut bindings: Vec<_> = build.bindings.iter().collect();
        bindings.sort_by_key(|b| b.slot);

        let mut sources = Vec::new();
        for b in bindings {
            match b.resource {
                BoundResource::StorageBuffer { buffer, .. } => sources.push(Source::Buffer(buffer.clone())),
                BoundResource::SampledImage(image) => sources.push(Source::Image(image.clone())),
                BoundResource::Sampler(_) => {}
            }
        }
        for (buffer, _) in &build.vertex_buffers {
            sources.push(Source::Buffer((*buffer).clone()));
        }
        if let Some(index) = &build.index_buffer {
            sources.push(Source::Buffer(index.buffer.clone()));
        }

        Ok(SoftRender {
            label: build.label.to_string(),
            sources,
        })
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn begin_frame(&mut self) -> FrameStart {
        if self.skip_frames > 0 {
            self.skip_frames -= 1;
            self.record(Command::SkippedFrame);
            return FrameStart::Skip;
        }
        if self.frame_open {
            log::warn!("software backend: frame {} was never presented", self.frame);
        }

        self.frame_open = true;
        self.pending = None;
        self.record(Command::BeginFrame { frame: self.frame });
        FrameStart::Ready
    }

    fn dispatch(&mut self, pipeline: &SoftCompute, params: Option<&[u8]>, grid: [u32; 3]) {
        debug_assert!(self.frame_open, "dispatch outside a frame");
        self.record(Command::Dispatch {
            label: pipeline.label.clone(),
            grid,
        });

        let buffers = pipeline
            .buffers
            .iter()
            .map(|(slot, b)| (*slot, b.words.borrow_mut(), b.len))
            .collect();
        let images = pipeline
            .images
            .iter()
            .map(|(slot, img)| {
                (*slot, img.width, img.height, img.format.bytes_per_texel(), img.texels.borrow_mut())
            })
            .collect();

        let mut ctx = KernelCtx {
            params,
            grid,
            local_size: pipeline.local_size,
            buffers,
            images,
        };
        (pipeline.kernel)(&mut ctx);
    }

    fn draw(&mut self, pipeline: &SoftRender, params: Option<&[u8]>, call: DrawCall) {
        debug_assert!(self.frame_open, "draw outside a frame");
        self.record(Command::Draw {
            label: pipeline.label.clone(),
            call,
        });

        let mut bytes = Vec::new();
        for source in &pipeline.sources {
            match source {
                Source::Buffer(b) => bytes.extend(b.read_bytes()),
                Source::Image(img) => bytes.extend_from_slice(&img.texels.borrow()),
            }
        }

        self.pending = Some(FrameSnapshot {
            frame: self.frame,
            label: pipeline.label.clone(),
            call,
            params: params.map(<[u8]>::to_vec),
            bytes,
        });
    }

    fn present(&mut self) {
        if !self.frame_open {
            log::warn!("software backend: present without an open frame");
            return;
        }

        self.record(Command::Present { frame: self.frame });
        if let Some(snapshot) = self.pending.take() {
            self.last_frame = Some(snapshot);
        }
        self.frame_open = false;
        self.frame += 1;
    }
}
