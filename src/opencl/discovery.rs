//! Обнаружение платформ и GPU устройств
//!
//! Отсутствие платформ или устройств не является ошибкой: это нормальное
//! состояние окружения, о котором вызывающая сторона узнает по пустому
//! результату.

use super::bindings::{api, OpenCl};
use super::types::*;
use crate::cl_check;
use anyhow::Result;
use std::collections::HashMap;
use std::ptr;

/// Платформа (драйвер конкретного вендора); не принадлежит нам
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlatformId(pub cl_platform_id);

/// Устройство внутри платформы; не принадлежит нам
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeviceId(pub cl_device_id);

// Идентификаторы платформ и устройств неизменяемы и глобальны для процесса
unsafe impl Send for PlatformId {}
unsafe impl Sync for PlatformId {}
unsafe impl Send for DeviceId {}
unsafe impl Sync for DeviceId {}

/// Платформа -> непустой список GPU устройств в порядке драйвера
pub type PlatformDevices = HashMap<PlatformId, Vec<DeviceId>>;

/// Источник платформ и устройств
pub trait PlatformSource {
    fn platforms(&self) -> Vec<PlatformId>;
    fn gpu_devices(&self, platform: PlatformId) -> Vec<DeviceId>;
}

/// Установленный драйвер OpenCL
#[derive(Debug, Default, Clone, Copy)]
pub struct Driver;

impl PlatformSource for Driver {
    fn platforms(&self) -> Vec<PlatformId> {
        list_platforms()
    }

    fn gpu_devices(&self, platform: PlatformId) -> Vec<DeviceId> {
        list_gpu_devices(platform)
    }
}

fn query_platforms(api: &OpenCl) -> Result<Vec<PlatformId>> {
    // сначала количество, затем сами идентификаторы
    let mut count: cl_uint = 0;
    cl_check!(api.clGetPlatformIDs(0, ptr::null_mut(), &mut count))?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut platforms: Vec<cl_platform_id> = vec![ptr::null_mut(); count as usize];
    cl_check!(api.clGetPlatformIDs(count, platforms.as_mut_ptr(), ptr::null_mut()))?;
    Ok(platforms.into_iter().map(PlatformId).collect())
}

fn query_gpu_devices(api: &OpenCl, platform: PlatformId) -> Result<Vec<DeviceId>> {
    let mut count: cl_uint = 0;
    cl_check!(api.clGetDeviceIDs(
        platform.0,
        CL_DEVICE_TYPE_GPU,
        0,
        ptr::null_mut(),
        &mut count
    ))?;
    if count == 0 {
        return Ok(Vec::new());
    }

    let mut devices: Vec<cl_device_id> = vec![ptr::null_mut(); count as usize];
    cl_check!(api.clGetDeviceIDs(
        platform.0,
        CL_DEVICE_TYPE_GPU,
        count,
        devices.as_mut_ptr(),
        ptr::null_mut()
    ))?;
    Ok(devices.into_iter().map(DeviceId).collect())
}

/// Все платформы; пустой список при любой ошибке драйвера
pub fn list_platforms() -> Vec<PlatformId> {
    match api().and_then(query_platforms) {
        Ok(platforms) => platforms,
        Err(e) => {
            log::debug!("platform query failed: {:#}", e);
            Vec::new()
        }
    }
}

/// GPU устройства платформы; пустой список при любой ошибке драйвера
pub fn list_gpu_devices(platform: PlatformId) -> Vec<DeviceId> {
    match api().and_then(|api| query_gpu_devices(api, platform)) {
        Ok(devices) => devices,
        Err(e) => {
            // платформа без GPU отвечает CL_DEVICE_NOT_FOUND
            log::debug!("gpu device query for {:?} failed: {:#}", platform, e);
            Vec::new()
        }
    }
}

/// Карта платформ с их GPU устройствами; платформы без устройств исключены
pub fn discover_with<S: PlatformSource + ?Sized>(source: &S) -> PlatformDevices {
    let mut platform_devices = PlatformDevices::new();
    for platform in source.platforms() {
        let devices = source.gpu_devices(platform);
        if devices.is_empty() {
            continue;
        }
        platform_devices.insert(platform, devices);
    }
    log::debug!(
        "discovered {} gpu platform(s), {} device(s)",
        platform_devices.len(),
        platform_devices.values().map(Vec::len).sum::<usize>()
    );
    platform_devices
}

/// Обнаружение через установленный драйвер
pub fn discover_all() -> PlatformDevices {
    discover_with(&Driver)
}
