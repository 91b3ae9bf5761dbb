//! Аргументы ядер, запуск и обмен данными через очередь команд
//!
//! Все вызовы блокирующие либо возвращают событие, которое следующий вызов
//! ждет через список ожидания.

use super::bindings::{api, OpenCl};
use super::resource::{native, Managed, Shared};
use super::types::*;
use crate::cl_check;
use anyhow::{ensure, Context as _, Result};
use std::ffi::c_void;
use std::ptr;

/// Событие завершения команды
pub type Event = Shared<cl_event>;

fn wait_list(events: &[&Event]) -> Vec<cl_event> {
    events.iter().map(|event| event.raw()).collect()
}

fn wait_ptr(list: &[cl_event]) -> *const cl_event {
    if list.is_empty() {
        ptr::null()
    } else {
        list.as_ptr()
    }
}

/// Скалярный аргумент ядра (`int`, `float`, ...)
pub fn set_arg<T: bytemuck::Pod>(kernel: &Managed<cl_kernel>, index: u32, value: &T) -> Result<()> {
    let api = api()?;
    cl_check!(api.clSetKernelArg(
        kernel.raw(),
        index,
        std::mem::size_of::<T>(),
        value as *const T as *const c_void
    ))
    .with_context(|| format!("kernel argument {}", index))
}

/// Аргумент-объект: буфер, изображение (`cl_mem`) или сэмплер (`cl_sampler`)
pub fn set_arg_object(kernel: &Managed<cl_kernel>, index: u32, object: &Managed<*mut c_void>) -> Result<()> {
    let api = api()?;
    let raw = object.raw();
    cl_check!(api.clSetKernelArg(
        kernel.raw(),
        index,
        std::mem::size_of::<*mut c_void>(),
        &raw as *const *mut c_void as *const c_void
    ))
    .with_context(|| format!("kernel argument {}", index))
}

/// `__local` аргумент размером `bytes`
pub fn set_arg_local(kernel: &Managed<cl_kernel>, index: u32, bytes: usize) -> Result<()> {
    let api = api()?;
    cl_check!(api.clSetKernelArg(kernel.raw(), index, bytes, ptr::null()))
        .with_context(|| format!("kernel argument {}", index))
}

fn wrap_event(api: &OpenCl, event: cl_event) -> Result<Event> {
    Managed::wrap(event, native(api.clReleaseEvent)).context("null event")
}

/// Ставит ядро в очередь; `local = None` оставляет выбор размера группы драйверу
pub fn enqueue_kernel(
    queue: &Managed<cl_command_queue>,
    kernel: &Managed<cl_kernel>,
    global: &[usize],
    local: Option<&[usize]>,
    wait_for: &[&Event],
) -> Result<Event> {
    let api = api()?;
    if let Some(local) = local {
        ensure!(
            local.len() == global.len(),
            "local size has {} dimensions, global size {}",
            local.len(),
            global.len()
        );
    }
    let waits = wait_list(wait_for);
    let mut event: cl_event = ptr::null_mut();
    cl_check!(api.clEnqueueNDRangeKernel(
        queue.raw(),
        kernel.raw(),
        global.len() as cl_uint,
        ptr::null(),
        global.as_ptr(),
        local.map_or(ptr::null(), |local| local.as_ptr()),
        waits.len() as cl_uint,
        wait_ptr(&waits),
        &mut event
    ))?;
    wrap_event(api, event)
}

/// Блокирующее чтение буфера в `host`
pub fn read_buffer<T: bytemuck::Pod>(
    queue: &Managed<cl_command_queue>,
    buffer: &Managed<cl_mem>,
    host: &mut [T],
    wait_for: &[&Event],
) -> Result<()> {
    let api = api()?;
    let waits = wait_list(wait_for);
    cl_check!(api.clEnqueueReadBuffer(
        queue.raw(),
        buffer.raw(),
        CL_TRUE,
        0,
        std::mem::size_of_val(host),
        host.as_mut_ptr() as *mut c_void,
        waits.len() as cl_uint,
        wait_ptr(&waits),
        ptr::null_mut()
    ))?;
    Ok(())
}

/// Блокирующая запись `host` в буфер
pub fn write_buffer<T: bytemuck::Pod>(
    queue: &Managed<cl_command_queue>,
    buffer: &Managed<cl_mem>,
    host: &[T],
) -> Result<()> {
    let api = api()?;
    cl_check!(api.clEnqueueWriteBuffer(
        queue.raw(),
        buffer.raw(),
        CL_TRUE,
        0,
        std::mem::size_of_val(host),
        host.as_ptr() as *const c_void,
        0,
        ptr::null(),
        ptr::null_mut()
    ))?;
    Ok(())
}

/// Заполняет буфер повторением `pattern`
pub fn fill_buffer<T: bytemuck::Pod>(
    queue: &Managed<cl_command_queue>,
    buffer: &Managed<cl_mem>,
    pattern: &T,
    len: usize,
) -> Result<Event> {
    let api = api()?;
    let mut event: cl_event = ptr::null_mut();
    cl_check!(api.clEnqueueFillBuffer(
        queue.raw(),
        buffer.raw(),
        pattern as *const T as *const c_void,
        std::mem::size_of::<T>(),
        0,
        len * std::mem::size_of::<T>(),
        0,
        ptr::null(),
        &mut event
    ))?;
    wrap_event(api, event)
}

/// Блокирующее чтение 2D изображения `width` x `height` с шагом строки
/// `row_pitch` байт
pub fn read_image(
    queue: &Managed<cl_command_queue>,
    image: &Managed<cl_mem>,
    (width, height): (usize, usize),
    row_pitch: usize,
    host: &mut [u8],
    wait_for: &[&Event],
) -> Result<()> {
    let api = api()?;
    ensure!(
        host.len() >= row_pitch * height,
        "host buffer of {} bytes is too small for {} rows of {} bytes",
        host.len(),
        height,
        row_pitch
    );
    let origin = [0usize; 3];
    let region = [width, height, 1];
    let waits = wait_list(wait_for);
    cl_check!(api.clEnqueueReadImage(
        queue.raw(),
        image.raw(),
        CL_TRUE,
        origin.as_ptr(),
        region.as_ptr(),
        row_pitch,
        0,
        host.as_mut_ptr() as *mut c_void,
        waits.len() as cl_uint,
        wait_ptr(&waits),
        ptr::null_mut()
    ))?;
    Ok(())
}

/// Ждет завершения событий
pub fn wait(events: &[&Event]) -> Result<()> {
    if events.is_empty() {
        return Ok(());
    }
    let api = api()?;
    let waits = wait_list(events);
    cl_check!(api.clWaitForEvents(waits.len() as cl_uint, waits.as_ptr()))?;
    Ok(())
}

/// Ждет выполнения всех команд очереди
pub fn finish(queue: &Managed<cl_command_queue>) -> Result<()> {
    let api = api()?;
    cl_check!(api.clFinish(queue.raw()))?;
    Ok(())
}
