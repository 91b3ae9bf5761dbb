//! Запросы clGetDeviceInfo / clGetPlatformInfo / clGetContextInfo
//! и человекочитаемое описание устройства

use super::bindings::{api, OpenCl};
use super::discovery::{DeviceId, PlatformId};
use super::resource::Managed;
use super::types::*;
use crate::cl_check;
use anyhow::Result;
use serde::Serialize;
use std::ffi::c_void;
use std::fmt;
use std::ptr;

fn trim_c_string(mut bytes: Vec<u8>) -> String {
    while bytes.last() == Some(&0) {
        bytes.pop();
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn query_device_bytes(api: &OpenCl, device: DeviceId, param: cl_device_info) -> Result<Vec<u8>> {
    // сначала размер значения, затем само значение
    let mut size = 0usize;
    cl_check!(api.clGetDeviceInfo(device.0, param, 0, ptr::null_mut(), &mut size))?;
    let mut value = vec![0u8; size];
    if size > 0 {
        cl_check!(api.clGetDeviceInfo(
            device.0,
            param,
            size,
            value.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        ))?;
    }
    Ok(value)
}

/// Текстовый параметр устройства (имя, вендор, версия)
pub fn device_info_string(device: DeviceId, param: cl_device_info) -> Option<String> {
    match api().and_then(|api| query_device_bytes(api, device, param)) {
        Ok(bytes) => Some(trim_c_string(bytes)),
        Err(e) => {
            log::error!("device info {:#x}: {:#}", param, e);
            None
        }
    }
}

/// Числовой параметр устройства: скаляр или массив (`cl_uint`, `size_t`, `cl_ulong`)
pub fn device_info_values<T: bytemuck::Pod>(device: DeviceId, param: cl_device_info) -> Option<Vec<T>> {
    match api().and_then(|api| query_device_bytes(api, device, param)) {
        Ok(bytes) => {
            let whole = bytes.len() - bytes.len() % std::mem::size_of::<T>();
            Some(bytemuck::pod_collect_to_vec(&bytes[..whole]))
        }
        Err(e) => {
            log::error!("device info {:#x}: {:#}", param, e);
            None
        }
    }
}

fn device_info_scalar<T: bytemuck::Pod>(device: DeviceId, param: cl_device_info) -> Option<T> {
    device_info_values::<T>(device, param).and_then(|values| values.first().copied())
}

/// Максимальное число вычислительных блоков (= рабочих групп одновременно);
/// 0 при ошибке
pub fn max_compute_units(device: DeviceId) -> u32 {
    device_info_scalar::<cl_uint>(device, CL_DEVICE_MAX_COMPUTE_UNITS).unwrap_or(0)
}

/// Максимальное число work-item в рабочей группе (по всем измерениям); 0 при ошибке
pub fn max_work_group_size(device: DeviceId) -> usize {
    device_info_scalar::<usize>(device, CL_DEVICE_MAX_WORK_GROUP_SIZE).unwrap_or(0)
}

/// Максимальное число work-item в рабочей группе по каждому измерению;
/// пустой список при ошибке
pub fn max_work_item_sizes(device: DeviceId) -> Vec<usize> {
    device_info_values::<usize>(device, CL_DEVICE_MAX_WORK_ITEM_SIZES).unwrap_or_default()
}

/// Имя платформы
pub fn platform_name(platform: PlatformId) -> Option<String> {
    let query = |api: &OpenCl| -> Result<Vec<u8>> {
        let mut size = 0usize;
        cl_check!(api.clGetPlatformInfo(platform.0, CL_PLATFORM_NAME, 0, ptr::null_mut(), &mut size))?;
        let mut value = vec![0u8; size];
        cl_check!(api.clGetPlatformInfo(
            platform.0,
            CL_PLATFORM_NAME,
            size,
            value.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok(value)
    };
    match api().and_then(query) {
        Ok(bytes) => Some(trim_c_string(bytes)),
        Err(e) => {
            log::error!("platform name: {:#}", e);
            None
        }
    }
}

/// Устройства, для которых создан контекст
pub fn context_devices(context: &Managed<cl_context>) -> Vec<DeviceId> {
    let query = |api: &OpenCl| -> Result<Vec<DeviceId>> {
        let mut size = 0usize;
        cl_check!(api.clGetContextInfo(
            context.raw(),
            CL_CONTEXT_DEVICES,
            0,
            ptr::null_mut(),
            &mut size
        ))?;
        let mut devices: Vec<cl_device_id> =
            vec![ptr::null_mut(); size / std::mem::size_of::<cl_device_id>()];
        cl_check!(api.clGetContextInfo(
            context.raw(),
            CL_CONTEXT_DEVICES,
            size,
            devices.as_mut_ptr() as *mut c_void,
            ptr::null_mut()
        ))?;
        Ok(devices.into_iter().map(DeviceId).collect())
    };
    match api().and_then(query) {
        Ok(devices) => devices,
        Err(e) => {
            log::error!("context devices: {:#}", e);
            Vec::new()
        }
    }
}

/// Описание устройства: по строке "ПАРАМЕТР: значение(я)" на параметр
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceReport {
    pub name: Option<String>,
    pub vendor: Option<String>,
    pub version: Option<String>,
    pub max_compute_units: Option<u32>,
    pub max_work_group_size: Option<usize>,
    pub max_work_item_dimensions: Option<u32>,
    pub max_work_item_sizes: Option<Vec<usize>>,
}

impl DeviceReport {
    /// Пары "метка" -> "значение(я)"; значения массивов через пробел
    pub fn lines(&self) -> Vec<(&'static str, String)> {
        fn text<T: ToString>(value: &Option<T>) -> String {
            value.as_ref().map(ToString::to_string).unwrap_or_default()
        }

        vec![
            ("CL_DEVICE_NAME", text(&self.name)),
            ("CL_DEVICE_VENDOR", text(&self.vendor)),
            ("CL_DEVICE_VERSION", text(&self.version)),
            ("CL_DEVICE_MAX_COMPUTE_UNITS", text(&self.max_compute_units)),
            ("CL_DEVICE_MAX_WORK_GROUP_SIZE", text(&self.max_work_group_size)),
            ("CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS", text(&self.max_work_item_dimensions)),
            (
                "CL_DEVICE_MAX_WORK_ITEM_SIZES",
                self.max_work_item_sizes
                    .as_ref()
                    .map(|sizes| {
                        sizes
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(" ")
                    })
                    .unwrap_or_default(),
            ),
        ]
    }
}

impl fmt::Display for DeviceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (label, value) in self.lines() {
            writeln!(f, "{}: {}", label, value)?;
        }
        Ok(())
    }
}

/// Собирает описание устройства; недоступные параметры остаются пустыми
pub fn describe(device: DeviceId) -> DeviceReport {
    DeviceReport {
        name: device_info_string(device, CL_DEVICE_NAME),
        vendor: device_info_string(device, CL_DEVICE_VENDOR),
        version: device_info_string(device, CL_DEVICE_VERSION),
        max_compute_units: device_info_scalar(device, CL_DEVICE_MAX_COMPUTE_UNITS),
        max_work_group_size: device_info_scalar(device, CL_DEVICE_MAX_WORK_GROUP_SIZE),
        max_work_item_dimensions: device_info_scalar(device, CL_DEVICE_MAX_WORK_ITEM_DIMENSIONS),
        max_work_item_sizes: device_info_values(device, CL_DEVICE_MAX_WORK_ITEM_SIZES),
    }
}

/// Максимальные размеры 2D изображения, сообщаемые устройством
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageLimits {
    pub max_width: usize,
    pub max_height: usize,
}

impl ImageLimits {
    pub fn for_device(device: DeviceId) -> Option<Self> {
        Some(Self {
            max_width: device_info_scalar(device, CL_DEVICE_IMAGE2D_MAX_WIDTH)?,
            max_height: device_info_scalar(device, CL_DEVICE_IMAGE2D_MAX_HEIGHT)?,
        })
    }

    /// Наименьшие пределы среди всех устройств контекста
    pub fn for_context(context: &Managed<cl_context>) -> Option<Self> {
        context_devices(context)
            .into_iter()
            .map(Self::for_device)
            .collect::<Option<Vec<_>>>()?
            .into_iter()
            .reduce(|a, b| Self {
                max_width: a.max_width.min(b.max_width),
                max_height: a.max_height.min(b.max_height),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_renders_one_line_per_parameter() {
        let report = DeviceReport {
            name: Some("Test GPU".into()),
            vendor: Some("Vendor".into()),
            version: Some("OpenCL 3.0".into()),
            max_compute_units: Some(16),
            max_work_group_size: Some(256),
            max_work_item_dimensions: Some(3),
            max_work_item_sizes: Some(vec![256, 256, 64]),
        };

        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 7);
        assert_eq!(lines[0], "CL_DEVICE_NAME: Test GPU");
        assert_eq!(lines[3], "CL_DEVICE_MAX_COMPUTE_UNITS: 16");
        assert_eq!(lines[6], "CL_DEVICE_MAX_WORK_ITEM_SIZES: 256 256 64");
    }

    #[test]
    fn missing_values_render_empty() {
        let text = DeviceReport::default().to_string();
        assert!(text.lines().all(|line| line.ends_with(": ")));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = DeviceReport {
            name: Some("Test GPU".into()),
            max_work_item_sizes: Some(vec![1024, 1024, 64]),
            ..DeviceReport::default()
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["name"], "Test GPU");
        assert_eq!(json["max_work_item_sizes"][2], 64);
        assert!(json["vendor"].is_null());
    }

    #[test]
    fn c_strings_lose_terminator() {
        assert_eq!(trim_c_string(b"Radeon\0".to_vec()), "Radeon");
        assert_eq!(trim_c_string(Vec::new()), "");
    }
}
