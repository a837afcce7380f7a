//! wgpu execution context. Every stage is its own compute pipeline; each
//! dispatch is recorded into its own command buffer and submitted at once, so
//! queue order is the order the integrator issued them in.

mod shader_source;

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wgpu::util::DeviceExt;

use self::shader_source::{build_kernel_wgsl, WORKGROUP_SIZE};
use super::{Element, ExecutionContext, Launch};
use crate::error::{RenderError, RenderResult, ResourceAllocationError};
use crate::kernels::{
    ClearCounterArgs, IncrementCounterArgs, IntersectArgs, Kernel, RaygenArgs, ResetRadianceArgs,
    ResolveArgs, ShadeHitArgs, ShadeMissArgs,
};

/// Hit shading binds twelve storage buffers.
const REQUIRED_STORAGE_BUFFERS: u32 = 12;
const SURFACE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba32Float;
const SURFACE_BYTES_PER_PIXEL: u32 = 16;

pub struct GpuBuffer<T> {
    buffer: Arc<wgpu::Buffer>,
    len: usize,
    _element: PhantomData<T>,
}

impl<T> Clone for GpuBuffer<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            len: self.len,
            _element: PhantomData,
        }
    }
}

impl<T> GpuBuffer<T> {
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }

    fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

/// 4-byte storage buffer, `atomic<u32>` on the device side.
#[derive(Clone)]
pub struct GpuCounter {
    buffer: Arc<wgpu::Buffer>,
}

impl GpuCounter {
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.buffer, &other.buffer)
    }
}

#[derive(Clone)]
pub struct GpuSurface {
    texture: Arc<wgpu::Texture>,
    view: Arc<wgpu::TextureView>,
    width: u32,
    height: u32,
    acquired: Arc<AtomicBool>,
}

impl GpuSurface {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_acquired(&self) -> bool {
        self.acquired.load(Ordering::Acquire)
    }
}

#[derive(Clone, Copy)]
enum Slot {
    Uniform,
    Read,
    ReadWrite,
    SurfaceWrite,
}

fn kernel_slots(kernel: Kernel) -> &'static [Slot] {
    use Slot::*;
    match kernel {
        Kernel::ResetRadiance | Kernel::ClearCounter | Kernel::IncrementCounter => {
            &[Uniform, ReadWrite]
        }
        Kernel::RayGeneration => &[Uniform, Read, ReadWrite, ReadWrite, ReadWrite, ReadWrite],
        Kernel::Intersect => &[Uniform, Read, Read, Read, ReadWrite],
        Kernel::ShadeMiss => &[Uniform, Read, Read, Read, Read, Read, Read, ReadWrite],
        Kernel::ShadeHit => &[
            Uniform, Read, Read, Read, Read, Read, Read, Read, ReadWrite, ReadWrite, ReadWrite,
            ReadWrite, ReadWrite,
        ],
        Kernel::Resolve => &[Uniform, Read, Read, SurfaceWrite],
    }
}

fn layout_entry(binding: u32, slot: Slot) -> wgpu::BindGroupLayoutEntry {
    let ty = match slot {
        Slot::Uniform => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        Slot::Read => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: true },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        Slot::ReadWrite => wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Storage { read_only: false },
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        Slot::SurfaceWrite => wgpu::BindingType::StorageTexture {
            access: wgpu::StorageTextureAccess::WriteOnly,
            format: SURFACE_FORMAT,
            view_dimension: wgpu::TextureViewDimension::D2,
        },
    };
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty,
        count: None,
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct KernelParams {
    work_items: u32,
    a: u32,
    b: u32,
    c: u32,
}

impl KernelParams {
    fn new(work_items: u32, a: u32, b: u32, c: u32) -> Self {
        Self {
            work_items,
            a,
            b,
            c,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct RaygenParams {
    work_items: u32,
    width: u32,
    height: u32,
    frame_seed: u32,
    frame_count: u32,
    _padding: [u32; 3],
    origin_aperture: [f32; 4],
    front_focus: [f32; 4],
    up_tan_half_fov: [f32; 4],
    right_aspect: [f32; 4],
}

struct KernelPipeline {
    pipeline: wgpu::ComputePipeline,
    layout: wgpu::BindGroupLayout,
    params: wgpu::Buffer,
}

pub struct GpuContext {
    device: wgpu::Device,
    queue: wgpu::Queue,
    kernels: HashMap<Kernel, KernelPipeline>,
    max_workgroups_per_dimension: u32,
    adapter_name: String,
    undrained: u32,
}

impl GpuContext {
    pub async fn new() -> RenderResult<Self> {
        let instance = wgpu::Instance::default();
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| RenderError::device("No compatible GPU adapter available"))?;

        let limits = adapter.limits();
        if limits.max_storage_buffers_per_shader_stage < REQUIRED_STORAGE_BUFFERS {
            return Err(RenderError::device(format!(
                "adapter supports {} storage buffers per stage, {} required",
                limits.max_storage_buffers_per_shader_stage, REQUIRED_STORAGE_BUFFERS
            )));
        }

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("cobaia-wavefront-device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits.clone(),
                },
                None,
            )
            .await
            .map_err(|error| RenderError::device(format!("request_device failed: {error}")))?;
        device.on_uncaptured_error(Box::new(|error| {
            log::error!("uncaptured wgpu error: {error}");
        }));

        let mut kernels = HashMap::new();
        for kernel in [
            Kernel::ResetRadiance,
            Kernel::ClearCounter,
            Kernel::IncrementCounter,
            Kernel::RayGeneration,
            Kernel::Intersect,
            Kernel::ShadeMiss,
            Kernel::ShadeHit,
            Kernel::Resolve,
        ] {
            kernels.insert(kernel, create_kernel_pipeline(&device, kernel).await?);
        }

        let adapter_name = adapter.get_info().name;
        log::info!("GPU context on '{adapter_name}'");

        Ok(Self {
            device,
            queue,
            kernels,
            max_workgroups_per_dimension: limits.max_compute_workgroups_per_dimension,
            adapter_name,
            undrained: 0,
        })
    }

    pub fn adapter_name(&self) -> &str {
        &self.adapter_name
    }

    fn allocate_buffer(
        &self,
        label: &str,
        size: u64,
        contents: Option<&[u8]>,
    ) -> Result<wgpu::Buffer, ResourceAllocationError> {
        let usage =
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST;
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = match contents {
            Some(contents) => self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents,
                usage,
            }),
            None => self.device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(label),
                size,
                usage,
                mapped_at_creation: false,
            }),
        };
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = out_of_memory.or(validation) {
            return Err(ResourceAllocationError::new(label, error));
        }
        Ok(buffer)
    }

    /// Copies `size` bytes of `source` into a mappable buffer and waits for
    /// the copy. Drains everything submitted before it.
    fn read_bytes(&mut self, source: &wgpu::Buffer, size: u64) -> RenderResult<Vec<u8>> {
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cobaia-readback-buffer"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cobaia-readback-encoder"),
            });
        encoder.copy_buffer_to_buffer(source, 0, &staging, 0, size);
        self.queue.submit(Some(encoder.finish()));

        self.map_staging(&staging)
    }

    fn map_staging(&mut self, staging: &wgpu::Buffer) -> RenderResult<Vec<u8>> {
        let slice = staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);
        self.undrained = 0;
        receiver
            .recv()
            .map_err(|_| RenderError::readback("Failed to receive GPU readback status"))?
            .map_err(|error| RenderError::readback(format!("GPU readback map failed: {error}")))?;

        let bytes = slice.get_mapped_range().to_vec();
        staging.unmap();
        Ok(bytes)
    }

    fn run_kernel(
        &mut self,
        kernel: Kernel,
        params: &[u8],
        resources: &[wgpu::BindingResource<'_>],
        work_items: u32,
    ) -> RenderResult<()> {
        let pipeline = self
            .kernels
            .get(&kernel)
            .ok_or_else(|| RenderError::device(format!("kernel {} not built", kernel.as_str())))?;
        let slots = kernel_slots(kernel);
        if resources.len() + 1 != slots.len() {
            return Err(RenderError::contract(format!(
                "{}: {} resources bound, {} expected",
                kernel.as_str(),
                resources.len(),
                slots.len() - 1
            )));
        }

        self.queue.write_buffer(&pipeline.params, 0, params);

        let mut entries = Vec::with_capacity(slots.len());
        entries.push(wgpu::BindGroupEntry {
            binding: 0,
            resource: pipeline.params.as_entire_binding(),
        });
        for (index, resource) in resources.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: index as u32 + 1,
                resource: resource.clone(),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(kernel.as_str()),
            layout: &pipeline.layout,
            entries: &entries,
        });
        let (groups_x, groups_y) = workgroup_grid(work_items, self.max_workgroups_per_dimension);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(kernel.as_str()),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(kernel.as_str()),
                timestamp_writes: None,
            });
            pass.set_pipeline(&pipeline.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(groups_x, groups_y, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::contract(format!("{}: {error}", kernel.as_str())));
        }

        self.undrained += 1;
        Ok(())
    }
}

/// Splits a 1D workload into a grid that respects the per-dimension
/// workgroup limit. Kernels flatten it back with `invocation_index`.
fn workgroup_grid(work_items: u32, max_per_dimension: u32) -> (u32, u32) {
    let groups = work_items.div_ceil(WORKGROUP_SIZE).max(1);
    let max_per_dimension = max_per_dimension.max(1);
    if groups <= max_per_dimension {
        (groups, 1)
    } else {
        (max_per_dimension, groups.div_ceil(max_per_dimension))
    }
}

async fn create_kernel_pipeline(
    device: &wgpu::Device,
    kernel: Kernel,
) -> RenderResult<KernelPipeline> {
    device.push_error_scope(wgpu::ErrorFilter::Validation);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(kernel.as_str()),
        source: wgpu::ShaderSource::Wgsl(build_kernel_wgsl(kernel).into()),
    });
    let entries: Vec<_> = kernel_slots(kernel)
        .iter()
        .enumerate()
        .map(|(binding, slot)| layout_entry(binding as u32, *slot))
        .collect();
    let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(kernel.as_str()),
        entries: &entries,
    });
    let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(kernel.as_str()),
        bind_group_layouts: &[&layout],
        push_constant_ranges: &[],
    });
    let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
        label: Some(kernel.as_str()),
        layout: Some(&pipeline_layout),
        module: &shader,
        entry_point: "main",
        compilation_options: wgpu::PipelineCompilationOptions::default(),
    });
    let params_size = match kernel {
        Kernel::RayGeneration => std::mem::size_of::<RaygenParams>(),
        _ => std::mem::size_of::<KernelParams>(),
    };
    let params = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("cobaia-params-buffer"),
        size: params_size as u64,
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    });

    if let Some(error) = device.pop_error_scope().await {
        return Err(RenderError::device(format!(
            "failed to build kernel {}: {error}",
            kernel.as_str()
        )));
    }
    Ok(KernelPipeline {
        pipeline,
        layout,
        params,
    })
}

impl ExecutionContext for GpuContext {
    type Buffer<T: Element> = GpuBuffer<T>;
    type Counter = GpuCounter;
    type Surface = GpuSurface;

    fn backend_name(&self) -> &'static str {
        "gpu"
    }

    fn create_buffer<T: Element>(
        &mut self,
        label: &str,
        len: usize,
    ) -> Result<GpuBuffer<T>, ResourceAllocationError> {
        // Empty bindings are invalid; keep at least one element of storage.
        let size = (len.max(1) * std::mem::size_of::<T>()) as u64;
        let buffer = self.allocate_buffer(label, size, None)?;
        Ok(GpuBuffer {
            buffer: Arc::new(buffer),
            len,
            _element: PhantomData,
        })
    }

    fn upload_buffer<T: Element>(
        &mut self,
        label: &str,
        data: &[T],
    ) -> Result<GpuBuffer<T>, ResourceAllocationError> {
        if data.is_empty() {
            return self.create_buffer(label, 0);
        }
        let buffer = self.allocate_buffer(label, 0, Some(bytemuck::cast_slice(data)))?;
        Ok(GpuBuffer {
            buffer: Arc::new(buffer),
            len: data.len(),
            _element: PhantomData,
        })
    }

    fn create_counter(&mut self, label: &str) -> Result<GpuCounter, ResourceAllocationError> {
        let buffer = self.allocate_buffer(label, 4, Some(bytemuck::bytes_of(&0u32)))?;
        Ok(GpuCounter {
            buffer: Arc::new(buffer),
        })
    }

    fn create_surface(
        &mut self,
        label: &str,
        width: u32,
        height: u32,
    ) -> Result<GpuSurface, ResourceAllocationError> {
        if width == 0 || height == 0 {
            return Err(ResourceAllocationError::new(label, "surface must not be empty"));
        }
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: SURFACE_FORMAT,
            usage: wgpu::TextureUsages::STORAGE_BINDING | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = out_of_memory.or(validation) {
            return Err(ResourceAllocationError::new(label, error));
        }
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(GpuSurface {
            texture: Arc::new(texture),
            view: Arc::new(view),
            width,
            height,
            acquired: Arc::new(AtomicBool::new(false)),
        })
    }

    fn acquire_foreign(&mut self, surface: &GpuSurface) -> RenderResult<()> {
        if surface.acquired.swap(true, Ordering::AcqRel) {
            return Err(RenderError::foreign("surface is already acquired"));
        }
        Ok(())
    }

    fn release_foreign(&mut self, surface: &GpuSurface) -> RenderResult<()> {
        if !surface.is_acquired() {
            return Err(RenderError::foreign("surface released without being acquired"));
        }
        if self.undrained > 0 {
            return Err(RenderError::foreign(format!(
                "surface released with {} undrained submissions",
                self.undrained
            )));
        }
        surface.acquired.store(false, Ordering::Release);
        Ok(())
    }

    fn drain(&mut self) -> RenderResult<()> {
        self.device.poll(wgpu::Maintain::Wait);
        self.undrained = 0;
        Ok(())
    }

    fn read_counter(&mut self, counter: &GpuCounter) -> RenderResult<u32> {
        let bytes = self.read_bytes(&counter.buffer, 4)?;
        let mut value = [0u32; 1];
        bytemuck::cast_slice_mut::<u32, u8>(&mut value).copy_from_slice(&bytes[..4]);
        Ok(value[0])
    }

    fn read_buffer<T: Element>(&mut self, buffer: &GpuBuffer<T>) -> RenderResult<Vec<T>> {
        if buffer.len == 0 {
            return Ok(Vec::new());
        }
        let size = buffer.len * std::mem::size_of::<T>();
        let bytes = self.read_bytes(&buffer.buffer, size as u64)?;
        let mut values = vec![T::zeroed(); buffer.len];
        bytemuck::cast_slice_mut::<T, u8>(&mut values).copy_from_slice(&bytes[..size]);
        Ok(values)
    }

    fn read_surface(&mut self, surface: &GpuSurface) -> RenderResult<Vec<[f32; 4]>> {
        let unpadded_bytes_per_row = surface.width * SURFACE_BYTES_PER_PIXEL;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(256) * 256;
        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("cobaia-readback-buffer"),
            size: (padded_bytes_per_row * surface.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("cobaia-surface-readback"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &surface.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(surface.height),
                },
            },
            wgpu::Extent3d {
                width: surface.width,
                height: surface.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(Some(encoder.finish()));

        let bytes = self.map_staging(&staging)?;
        let width = surface.width as usize;
        let mut texels = vec![[0.0f32; 4]; width * surface.height as usize];
        for (y, row) in texels.chunks_exact_mut(width).enumerate() {
            let row_start = y * padded_bytes_per_row as usize;
            let row_bytes = &bytes[row_start..row_start + unpadded_bytes_per_row as usize];
            bytemuck::cast_slice_mut::<[f32; 4], u8>(row).copy_from_slice(row_bytes);
        }
        Ok(texels)
    }
}

impl Launch<ResetRadianceArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &ResetRadianceArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let params = KernelParams::new(work_items, args.pixel_count, 0, 0);
        self.run_kernel(
            Kernel::ResetRadiance,
            bytemuck::bytes_of(&params),
            &[args.radiance.binding()],
            work_items,
        )
    }
}

impl Launch<ClearCounterArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &ClearCounterArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let params = KernelParams::new(work_items, 0, 0, 0);
        self.run_kernel(
            Kernel::ClearCounter,
            bytemuck::bytes_of(&params),
            &[args.counter.buffer.as_entire_binding()],
            work_items,
        )
    }
}

impl Launch<IncrementCounterArgs<GpuContext>> for GpuContext {
    fn launch(
        &mut self,
        args: &IncrementCounterArgs<GpuContext>,
        work_items: u32,
    ) -> RenderResult<()> {
        let params = KernelParams::new(work_items, 0, 0, 0);
        self.run_kernel(
            Kernel::IncrementCounter,
            bytemuck::bytes_of(&params),
            &[args.counter.buffer.as_entire_binding()],
            work_items,
        )
    }
}

impl Launch<RaygenArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &RaygenArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let work_items = work_items.min(args.width * args.height);
        let camera = &args.camera;
        let params = RaygenParams {
            work_items,
            width: args.width,
            height: args.height,
            frame_seed: args.frame_seed,
            frame_count: camera.frame_count,
            _padding: [0; 3],
            origin_aperture: camera.origin.extend(camera.aperture).to_array(),
            front_focus: camera.front.extend(camera.focus_distance).to_array(),
            up_tan_half_fov: camera.up.extend(camera.tan_half_fov).to_array(),
            right_aspect: camera.right.extend(camera.aspect).to_array(),
        };
        self.run_kernel(
            Kernel::RayGeneration,
            bytemuck::bytes_of(&params),
            &[
                args.sample_counter.buffer.as_entire_binding(),
                args.rays.binding(),
                args.ray_counter.buffer.as_entire_binding(),
                args.pixel_indices.binding(),
                args.throughputs.binding(),
            ],
            work_items,
        )
    }
}

impl Launch<IntersectArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &IntersectArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let params = KernelParams::new(work_items, args.triangle_count, 0, 0);
        self.run_kernel(
            Kernel::Intersect,
            bytemuck::bytes_of(&params),
            &[
                args.rays.binding(),
                args.ray_counter.buffer.as_entire_binding(),
                args.triangles.binding(),
                args.hits.binding(),
            ],
            work_items,
        )
    }
}

impl Launch<ShadeMissArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &ShadeMissArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let environment = args
            .environment
            .as_ref()
            .ok_or_else(|| RenderError::contract("shade_miss: slot 'environment' is not bound"))?;
        let [env_width, env_height] = args.environment_size;
        let params = KernelParams::new(work_items, env_width, env_height, 0);
        self.run_kernel(
            Kernel::ShadeMiss,
            bytemuck::bytes_of(&params),
            &[
                args.rays.binding(),
                args.ray_counter.buffer.as_entire_binding(),
                args.pixel_indices.binding(),
                args.hits.binding(),
                args.throughputs.binding(),
                environment.binding(),
                args.radiance.binding(),
            ],
            work_items,
        )
    }
}

impl Launch<ShadeHitArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &ShadeHitArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        let triangles = args
            .triangles
            .as_ref()
            .ok_or_else(|| RenderError::contract("shade_hit: slot 'triangles' is not bound"))?;
        let materials = args
            .materials
            .as_ref()
            .ok_or_else(|| RenderError::contract("shade_hit: slot 'materials' is not bound"))?;
        let params = KernelParams::new(work_items, args.bounce, args.frame_seed, 0);
        self.run_kernel(
            Kernel::ShadeHit,
            bytemuck::bytes_of(&params),
            &[
                args.incoming_rays.binding(),
                args.incoming_ray_counter.buffer.as_entire_binding(),
                args.incoming_pixel_indices.binding(),
                args.hits.binding(),
                triangles.binding(),
                materials.binding(),
                args.sample_counter.buffer.as_entire_binding(),
                args.throughputs.binding(),
                args.outgoing_rays.binding(),
                args.outgoing_ray_counter.buffer.as_entire_binding(),
                args.outgoing_pixel_indices.binding(),
                args.radiance.binding(),
            ],
            work_items,
        )
    }
}

impl Launch<ResolveArgs<GpuContext>> for GpuContext {
    fn launch(&mut self, args: &ResolveArgs<GpuContext>, work_items: u32) -> RenderResult<()> {
        if !args.surface.is_acquired() {
            return Err(RenderError::foreign("resolve target surface is not acquired"));
        }
        let params = KernelParams::new(work_items, args.width, args.height, 0);
        self.run_kernel(
            Kernel::Resolve,
            bytemuck::bytes_of(&params),
            &[
                args.radiance.binding(),
                args.sample_counter.buffer.as_entire_binding(),
                wgpu::BindingResource::TextureView(&args.surface.view),
            ],
            work_items,
        )
    }
}
