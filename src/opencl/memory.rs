//! Буферы, изображения и сэмплеры на стороне устройства

use super::bindings::{api, OpenCl};
use super::resource::{native, Managed, Shared};
use super::types::*;
use crate::cl_create;
use anyhow::{Context as _, Result};
use std::ffi::c_void;
use std::ptr;

fn wrap_mem(api: &OpenCl, mem: cl_mem) -> Result<Shared<cl_mem>> {
    Managed::wrap(mem, native(api.clReleaseMemObject)).context("null memory object")
}

/// Буфер на `len` элементов `T`; `host` копируется в буфер при создании
/// (к `flags` добавляется CL_MEM_COPY_HOST_PTR)
pub fn create_buffer<T: bytemuck::Pod>(
    context: &Managed<cl_context>,
    flags: cl_mem_flags,
    len: usize,
    host: Option<&[T]>,
) -> Option<Shared<cl_mem>> {
    let create = |api: &OpenCl| -> Result<Shared<cl_mem>> {
        let size = len * std::mem::size_of::<T>();
        let (flags, host_ptr) = match host {
            Some(data) => {
                anyhow::ensure!(
                    data.len() >= len,
                    "host data has {} elements, buffer needs {}",
                    data.len(),
                    len
                );
                // драйвер только читает host_ptr при COPY_HOST_PTR
                (flags | CL_MEM_COPY_HOST_PTR, data.as_ptr() as *mut c_void)
            }
            None => (flags, ptr::null_mut()),
        };
        let mem = cl_create!(api.clCreateBuffer(context.raw(), flags, size, host_ptr))?;
        wrap_mem(api, mem)
    };
    match api().and_then(create) {
        Ok(mem) => Some(mem),
        Err(e) => {
            log::error!("error creating device-side buffer: {:#}", e);
            None
        }
    }
}

/// 2D изображение по формату и описанию; `host` (если есть) копируется
pub(crate) fn create_image(
    api: &OpenCl,
    context: &Managed<cl_context>,
    flags: cl_mem_flags,
    format: &cl_image_format,
    desc: &cl_image_desc,
    host: Option<&[u8]>,
) -> Result<Shared<cl_mem>> {
    let (flags, host_ptr) = match host {
        Some(data) => (flags | CL_MEM_COPY_HOST_PTR, data.as_ptr() as *mut c_void),
        None => (flags, ptr::null_mut()),
    };
    let image = cl_create!(api.clCreateImage(context.raw(), flags, format, desc, host_ptr))?;
    wrap_mem(api, image)
}

/// Сэмплер с ненормализованными координатами
pub fn create_sampler(
    context: &Managed<cl_context>,
    addressing: cl_addressing_mode,
    filter: cl_filter_mode,
) -> Option<Shared<cl_sampler>> {
    let create = |api: &OpenCl| -> Result<Shared<cl_sampler>> {
        let sampler = cl_create!(api.clCreateSampler(context.raw(), CL_FALSE, addressing, filter))?;
        Managed::wrap(sampler, native(api.clReleaseSampler)).context("null sampler")
    };
    match api().and_then(create) {
        Ok(sampler) => Some(sampler),
        Err(e) => {
            log::error!("error creating sampler: {:#}", e);
            None
        }
    }
}
