//! OpenCL типы данных

use std::ffi::c_void;

#[allow(non_camel_case_types)]
pub type cl_platform_id = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_device_id = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_context = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_command_queue = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_program = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_kernel = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_mem = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_sampler = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_event = *mut c_void;
#[allow(non_camel_case_types)]
pub type cl_int = i32;
#[allow(non_camel_case_types)]
pub type cl_uint = u32;
#[allow(non_camel_case_types)]
pub type cl_ulong = u64;
#[allow(non_camel_case_types)]
pub type cl_bool = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_platform_info = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_device_info = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_context_info = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_device_type = cl_ulong;
#[allow(non_camel_case_types)]
pub type cl_context_properties = isize;
#[allow(non_camel_case_types)]
pub type cl_command_queue_properties = cl_ulong;
#[allow(non_camel_case_types)]
pub type cl_mem_flags = cl_ulong;
#[allow(non_camel_case_types)]
pub type cl_mem_object_type = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_program_build_info = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_channel_order = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_channel_type = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_addressing_mode = cl_uint;
#[allow(non_camel_case_types)]
pub type cl_filter_mode = cl_uint;

/// Формат пикселя device-side изображения
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct cl_image_format {
    pub image_channel_order: cl_channel_order,
    pub image_channel_data_type: cl_channel_type,
}

/// Геометрия device-side изображения
#[allow(non_camel_case_types)]
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct cl_image_desc {
    pub image_type: cl_mem_object_type,
    pub image_width: usize,
    pub image_height: usize,
    pub image_depth: usize,
    pub image_array_size: usize,
    pub image_row_pitch: usize,
    pub image_slice_pitch: usize,
    pub num_mip_levels: cl_uint,
    pub num_samples: cl_uint,
    pub buffer: cl_mem,
}

impl Default for cl_image_desc {
    fn default() -> Self {
        Self {
            image_type: 0,
            image_width: 0,
            image_height: 0,
            image_depth: 0,
            image_array_size: 0,
            image_row_pitch: 0,
            image_slice_pitch: 0,
            num_mip_levels: 0,
            num_samples: 0,
            buffer: std::ptr::null_mut(),
        }
    }
}

// Константы OpenCL
pub const CL_SUCCESS: cl_int = 0;
pub const CL_FALSE: cl_bool = 0;
pub const CL_TRUE: cl_bool = 1;

pub const CL_PLATFORM_VERSION: cl_platform_info = 0x0901;
pub const CL_PLATFORM_NAME: cl_platform_info = 0x0902;
pub const CL_PLATFORM_VENDOR: cl_platform_info = 0x0903;

pub const CL_DEVICE_TYPE_CPU: cl_device_type = 1 << 1;
pub const CL_DEVICE_TYPE_GPU: cl_device_type = 1 << 2;

pub const CL_DEVICE_MAX_COMPUTE_UNITS: cl_device_info = 0x1002;
pub const CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS: cl_device_info = 0x1003;
pub const CL_DEVICE_MAX_WORK_GROUP_SIZE: cl_device_info = 0x1004;
pub const CL_DEVICE_MAX_WORK_ITEM_SIZES: cl_device_info = 0x1005;
pub const CL_DEVICE_IMAGE2D_MAX_WIDTH: cl_device_info = 0x1011;
pub const CL_DEVICE_IMAGE2D_MAX_HEIGHT: cl_device_info = 0x1012;
pub const CL_DEVICE_IMAGE_SUPPORT: cl_device_info = 0x1016;
pub const CL_DEVICE_NAME: cl_device_info = 0x102B;
pub const CL_DEVICE_VENDOR: cl_device_info = 0x102C;
pub const CL_DEVICE_VERSION: cl_device_info = 0x102F;

pub const CL_CONTEXT_DEVICES: cl_context_info = 0x1081;
pub const CL_CONTEXT_PLATFORM: cl_context_properties = 0x1084;

pub const CL_MEM_READ_WRITE: cl_mem_flags = 1 << 0;
pub const CL_MEM_WRITE_ONLY: cl_mem_flags = 1 << 1;
pub const CL_MEM_READ_ONLY: cl_mem_flags = 1 << 2;
pub const CL_MEM_USE_HOST_PTR: cl_mem_flags = 1 << 3;
pub const CL_MEM_ALLOC_HOST_PTR: cl_mem_flags = 1 << 4;
pub const CL_MEM_COPY_HOST_PTR: cl_mem_flags = 1 << 5;
pub const CL_MEM_HOST_WRITE_ONLY: cl_mem_flags = 1 << 7;
pub const CL_MEM_HOST_READ_ONLY: cl_mem_flags = 1 << 8;
pub const CL_MEM_HOST_NO_ACCESS: cl_mem_flags = 1 << 9;

pub const CL_MEM_OBJECT_IMAGE2D: cl_mem_object_type = 0x10F1;

pub const CL_R: cl_channel_order = 0x10B0;
pub const CL_RGB: cl_channel_order = 0x10B4;
pub const CL_RGBA: cl_channel_order = 0x10B5;

pub const CL_SIGNED_INT8: cl_channel_type = 0x10D7;
pub const CL_SIGNED_INT16: cl_channel_type = 0x10D8;
pub const CL_SIGNED_INT32: cl_channel_type = 0x10D9;
pub const CL_UNSIGNED_INT8: cl_channel_type = 0x10DA;
pub const CL_UNSIGNED_INT16: cl_channel_type = 0x10DB;
pub const CL_HALF_FLOAT: cl_channel_type = 0x10DD;
pub const CL_FLOAT: cl_channel_type = 0x10DE;

pub const CL_ADDRESS_CLAMP_TO_EDGE: cl_addressing_mode = 0x1131;
pub const CL_FILTER_NEAREST: cl_filter_mode = 0x1140;

pub const CL_PROGRAM_BUILD_LOG: cl_program_build_info = 0x1183;
