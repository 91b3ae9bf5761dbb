//! Низкоуровневые привязки к OpenCL API
//!
//! Библиотека драйвера загружается во время выполнения, один раз на процесс.
//! Отсутствие драйвера не является ошибкой сборки: обнаружение устройств
//! просто возвращает пустой результат.

use super::types::*;
use anyhow::{anyhow, Result};
use libloading::{Library, Symbol};
use std::ffi::{c_char, c_void};
use std::sync::OnceLock;

/// Переменная окружения с явным путем к библиотеке драйвера
pub const LIBRARY_ENV: &str = "OPENCL_LIBRARY";

#[cfg(target_os = "windows")]
const LIBRARY_NAMES: &[&str] = &["OpenCL.dll"];
#[cfg(target_os = "macos")]
const LIBRARY_NAMES: &[&str] = &["/System/Library/Frameworks/OpenCL.framework/OpenCL"];
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const LIBRARY_NAMES: &[&str] = &["libOpenCL.so.1", "libOpenCL.so"];

/// Тип callback-функции для ошибок контекста
pub type ContextNotify =
    Option<unsafe extern "C" fn(*const c_char, *const c_void, usize, *mut c_void)>;
/// Тип callback-функции для сборки программы
pub type BuildNotify = Option<unsafe extern "C" fn(cl_program, *mut c_void)>;

/// Таблица функций OpenCL, разрешенных из библиотеки драйвера
#[allow(non_snake_case)]
pub struct OpenCl {
    _library: Library,

    pub clGetPlatformIDs:
        unsafe extern "C" fn(cl_uint, *mut cl_platform_id, *mut cl_uint) -> cl_int,
    pub clGetPlatformInfo: unsafe extern "C" fn(
        cl_platform_id,
        cl_platform_info,
        usize,
        *mut c_void,
        *mut usize,
    ) -> cl_int,
    pub clGetDeviceIDs: unsafe extern "C" fn(
        cl_platform_id,
        cl_device_type,
        cl_uint,
        *mut cl_device_id,
        *mut cl_uint,
    ) -> cl_int,
    pub clGetDeviceInfo:
        unsafe extern "C" fn(cl_device_id, cl_device_info, usize, *mut c_void, *mut usize) -> cl_int,

    pub clCreateContext: unsafe extern "C" fn(
        *const cl_context_properties,
        cl_uint,
        *const cl_device_id,
        ContextNotify,
        *mut c_void,
        *mut cl_int,
    ) -> cl_context,
    pub clGetContextInfo:
        unsafe extern "C" fn(cl_context, cl_context_info, usize, *mut c_void, *mut usize) -> cl_int,
    pub clCreateCommandQueue: unsafe extern "C" fn(
        cl_context,
        cl_device_id,
        cl_command_queue_properties,
        *mut cl_int,
    ) -> cl_command_queue,

    pub clCreateProgramWithSource: unsafe extern "C" fn(
        cl_context,
        cl_uint,
        *const *const c_char,
        *const usize,
        *mut cl_int,
    ) -> cl_program,
    pub clBuildProgram: unsafe extern "C" fn(
        cl_program,
        cl_uint,
        *const cl_device_id,
        *const c_char,
        BuildNotify,
        *mut c_void,
    ) -> cl_int,
    pub clGetProgramBuildInfo: unsafe extern "C" fn(
        cl_program,
        cl_device_id,
        cl_program_build_info,
        usize,
        *mut c_void,
        *mut usize,
    ) -> cl_int,
    pub clCreateKernel: unsafe extern "C" fn(cl_program, *const c_char, *mut cl_int) -> cl_kernel,
    pub clSetKernelArg: unsafe extern "C" fn(cl_kernel, cl_uint, usize, *const c_void) -> cl_int,

    pub clCreateBuffer:
        unsafe extern "C" fn(cl_context, cl_mem_flags, usize, *mut c_void, *mut cl_int) -> cl_mem,
    pub clCreateImage: unsafe extern "C" fn(
        cl_context,
        cl_mem_flags,
        *const cl_image_format,
        *const cl_image_desc,
        *mut c_void,
        *mut cl_int,
    ) -> cl_mem,
    pub clCreateSampler: unsafe extern "C" fn(
        cl_context,
        cl_bool,
        cl_addressing_mode,
        cl_filter_mode,
        *mut cl_int,
    ) -> cl_sampler,

    pub clEnqueueNDRangeKernel: unsafe extern "C" fn(
        cl_command_queue,
        cl_kernel,
        cl_uint,
        *const usize,
        *const usize,
        *const usize,
        cl_uint,
        *const cl_event,
        *mut cl_event,
    ) -> cl_int,
    pub clEnqueueReadBuffer: unsafe extern "C" fn(
        cl_command_queue,
        cl_mem,
        cl_bool,
        usize,
        usize,
        *mut c_void,
        cl_uint,
        *const cl_event,
        *mut cl_event,
    ) -> cl_int,
    pub clEnqueueWriteBuffer: unsafe extern "C" fn(
        cl_command_queue,
        cl_mem,
        cl_bool,
        usize,
        usize,
        *const c_void,
        cl_uint,
        *const cl_event,
        *mut cl_event,
    ) -> cl_int,
    pub clEnqueueReadImage: unsafe extern "C" fn(
        cl_command_queue,
        cl_mem,
        cl_bool,
        *const usize,
        *const usize,
        usize,
        usize,
        *mut c_void,
        cl_uint,
        *const cl_event,
        *mut cl_event,
    ) -> cl_int,
    pub clEnqueueFillBuffer: unsafe extern "C" fn(
        cl_command_queue,
        cl_mem,
        *const c_void,
        usize,
        usize,
        usize,
        cl_uint,
        *const cl_event,
        *mut cl_event,
    ) -> cl_int,
    pub clWaitForEvents: unsafe extern "C" fn(cl_uint, *const cl_event) -> cl_int,
    pub clFinish: unsafe extern "C" fn(cl_command_queue) -> cl_int,

    pub clReleaseEvent: unsafe extern "C" fn(cl_event) -> cl_int,
    pub clReleaseSampler: unsafe extern "C" fn(cl_sampler) -> cl_int,
    pub clReleaseMemObject: unsafe extern "C" fn(cl_mem) -> cl_int,
    pub clReleaseKernel: unsafe extern "C" fn(cl_kernel) -> cl_int,
    pub clReleaseProgram: unsafe extern "C" fn(cl_program) -> cl_int,
    pub clReleaseCommandQueue: unsafe extern "C" fn(cl_command_queue) -> cl_int,
    pub clReleaseContext: unsafe extern "C" fn(cl_context) -> cl_int,
}

/// Копирует указатель на функцию из библиотеки
///
/// # Safety
/// `T` должен совпадать с сигнатурой символа, а библиотека должна
/// пережить все копии указателя.
unsafe fn symbol<T: Copy>(lib: &Library, name: &str) -> Result<T> {
    let sym: Symbol<T> = unsafe { lib.get(name.as_bytes()) }
        .map_err(|e| anyhow!("missing OpenCL symbol {}: {}", name.trim_end_matches('\0'), e))?;
    Ok(*sym)
}

macro_rules! resolve {
    ($lib:ident, $name:ident) => {
        unsafe { symbol(&$lib, concat!(stringify!($name), "\0"))? }
    };
}

impl OpenCl {
    /// Загружает библиотеку драйвера по первому подходящему имени
    pub fn load() -> Result<Self> {
        let mut candidates: Vec<String> = Vec::new();
        if let Ok(path) = std::env::var(LIBRARY_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                candidates.push(trimmed.to_string());
            }
        }
        candidates.extend(LIBRARY_NAMES.iter().map(|name| name.to_string()));

        let mut last_error = None;
        for candidate in &candidates {
            match unsafe { Library::new(candidate) } {
                Ok(library) => {
                    log::debug!("loaded OpenCL driver library {}", candidate);
                    return Self::from_library(library);
                }
                Err(e) => last_error = Some(e),
            }
        }

        Err(match last_error {
            Some(e) => anyhow!("no OpenCL driver library found (tried {:?}): {}", candidates, e),
            None => anyhow!("no OpenCL driver library candidates"),
        })
    }

    fn from_library(lib: Library) -> Result<Self> {
        Ok(Self {
            clGetPlatformIDs: resolve!(lib, clGetPlatformIDs),
            clGetPlatformInfo: resolve!(lib, clGetPlatformInfo),
            clGetDeviceIDs: resolve!(lib, clGetDeviceIDs),
            clGetDeviceInfo: resolve!(lib, clGetDeviceInfo),
            clCreateContext: resolve!(lib, clCreateContext),
            clGetContextInfo: resolve!(lib, clGetContextInfo),
            clCreateCommandQueue: resolve!(lib, clCreateCommandQueue),
            clCreateProgramWithSource: resolve!(lib, clCreateProgramWithSource),
            clBuildProgram: resolve!(lib, clBuildProgram),
            clGetProgramBuildInfo: resolve!(lib, clGetProgramBuildInfo),
            clCreateKernel: resolve!(lib, clCreateKernel),
            clSetKernelArg: resolve!(lib, clSetKernelArg),
            clCreateBuffer: resolve!(lib, clCreateBuffer),
            clCreateImage: resolve!(lib, clCreateImage),
            clCreateSampler: resolve!(lib, clCreateSampler),
            clEnqueueNDRangeKernel: resolve!(lib, clEnqueueNDRangeKernel),
            clEnqueueReadBuffer: resolve!(lib, clEnqueueReadBuffer),
            clEnqueueWriteBuffer: resolve!(lib, clEnqueueWriteBuffer),
            clEnqueueReadImage: resolve!(lib, clEnqueueReadImage),
            clEnqueueFillBuffer: resolve!(lib, clEnqueueFillBuffer),
            clWaitForEvents: resolve!(lib, clWaitForEvents),
            clFinish: resolve!(lib, clFinish),
            clReleaseEvent: resolve!(lib, clReleaseEvent),
            clReleaseSampler: resolve!(lib, clReleaseSampler),
            clReleaseMemObject: resolve!(lib, clReleaseMemObject),
            clReleaseKernel: resolve!(lib, clReleaseKernel),
            clReleaseProgram: resolve!(lib, clReleaseProgram),
            clReleaseCommandQueue: resolve!(lib, clReleaseCommandQueue),
            clReleaseContext: resolve!(lib, clReleaseContext),
            _library: lib,
        })
    }
}

static API: OnceLock<Result<OpenCl, String>> = OnceLock::new();

/// Таблица функций драйвера; загружается при первом обращении
pub fn api() -> Result<&'static OpenCl> {
    API.get_or_init(|| OpenCl::load().map_err(|e| format!("{:#}", e)))
        .as_ref()
        .map_err(|e| anyhow!("{}", e))
}
