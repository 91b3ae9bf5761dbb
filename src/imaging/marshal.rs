//! Создание 2D изображений OpenCL из буферов хоста

use super::convert::Conversion;
use super::types::{Depth, HostImage};
use crate::opencl::bindings::api;
use crate::opencl::info::ImageLimits;
use crate::opencl::memory::create_image;
use crate::opencl::resource::{Managed, Shared};
use crate::opencl::types::*;
use anyhow::Result;
use std::path::Path;

/// Формат пикселя для глубины и числа каналов буфера
pub fn describe_format(image: &HostImage) -> Option<cl_image_format> {
    let data_type = match image.depth {
        Depth::I8 => CL_SIGNED_INT8,
        Depth::U8 => CL_UNSIGNED_INT8,
        Depth::I16 => CL_SIGNED_INT16,
        Depth::U16 => CL_UNSIGNED_INT16,
        Depth::F16 => CL_HALF_FLOAT,
        Depth::I32 => CL_SIGNED_INT32,
        Depth::F32 => CL_FLOAT,
        other => {
            log::error!("unsupported image depth {:?}", other);
            return None;
        }
    };
    let order = match image.channels {
        1 => CL_R,
        3 => CL_RGB,
        4 => CL_RGBA,
        other => {
            log::error!("unsupported image channel count {}", other);
            return None;
        }
    };
    Some(cl_image_format {
        image_channel_order: order,
        image_channel_data_type: data_type,
    })
}

/// Геометрия 2D изображения; размеры не больше пределов устройства
pub fn describe_geometry(image: &HostImage, limits: &ImageLimits) -> Option<cl_image_desc> {
    if image.width == 0 || image.width > limits.max_width {
        log::error!(
            "image width {} is out of range 1..={}",
            image.width,
            limits.max_width
        );
        return None;
    }
    if image.height == 0 || image.height > limits.max_height {
        log::error!(
            "image height {} is out of range 1..={}",
            image.height,
            limits.max_height
        );
        return None;
    }
    if let Err(e) = image.check_layout() {
        log::error!("inconsistent image buffer: {:#}", e);
        return None;
    }
    Some(cl_image_desc {
        image_type: CL_MEM_OBJECT_IMAGE2D,
        image_width: image.width,
        image_height: image.height,
        image_row_pitch: image.stride,
        ..Default::default()
    })
}

fn describe(context: &Managed<cl_context>, image: &HostImage) -> Option<(cl_image_format, cl_image_desc)> {
    let format = describe_format(image)?;
    let Some(limits) = ImageLimits::for_context(context) else {
        log::error!("cannot query image limits of the context devices");
        return None;
    };
    let desc = describe_geometry(image, &limits)?;
    Some((format, desc))
}

/// Изображение на устройстве вместе с буфером хоста, из которого оно создано
#[derive(Debug, Clone)]
pub struct InputImage {
    pub memory: Shared<cl_mem>,
    pub host: HostImage,
}

fn convert(image: HostImage, conversions: &[Conversion]) -> Result<HostImage> {
    conversions.iter().try_fold(image, |image, conversion| conversion(image))
}

/// Декодирует файл, применяет преобразования по порядку и создает
/// изображение, заполненное преобразованными пикселями
pub fn load_input_image(
    context: &Managed<cl_context>,
    flags: cl_mem_flags,
    path: impl AsRef<Path>,
    conversions: &[Conversion],
) -> Option<InputImage> {
    let path = path.as_ref();
    let host = match HostImage::decode(path).and_then(|image| convert(image, conversions)) {
        Ok(host) => host,
        Err(e) => {
            log::error!("error loading image: {:#}", e);
            return None;
        }
    };
    let (format, desc) = describe(context, &host)?;

    match api().and_then(|api| create_image(api, context, flags, &format, &desc, Some(&host.data))) {
        Ok(memory) => {
            log::debug!(
                "loaded {} as {}x{} image, {} channel(s) of {:?}",
                path.display(),
                host.width,
                host.height,
                host.channels,
                host.depth
            );
            Some(InputImage { memory, host })
        }
        Err(e) => {
            log::error!("error creating device-side image: {:#}", e);
            None
        }
    }
}

/// Неинициализированное изображение того же формата и размера, что и
/// `reference`, для результата ядра
pub fn create_output_image(
    context: &Managed<cl_context>,
    flags: cl_mem_flags,
    reference: &HostImage,
) -> Option<Shared<cl_mem>> {
    let (format, mut desc) = describe(context, reference)?;
    // без данных хоста шаг строки должен быть нулевым
    desc.image_row_pitch = 0;

    match api().and_then(|api| create_image(api, context, flags, &format, &desc, None)) {
        Ok(memory) => Some(memory),
        Err(e) => {
            log::error!("error creating device-side image: {:#}", e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::convert::{to_float, to_rgba};
    use half::f16;
    use std::ffi::c_void;

    const LIMITS: ImageLimits = ImageLimits {
        max_width: 16,
        max_height: 8,
    };

    fn blank(width: usize, height: usize) -> HostImage {
        HostImage::from_samples(width, height, 1, &vec![0u8; width * height]).unwrap()
    }

    #[test]
    fn supported_depths_map_to_channel_types() {
        let cases = [
            (HostImage::from_samples(1, 1, 1, &[0i8]).unwrap(), CL_SIGNED_INT8),
            (HostImage::from_samples(1, 1, 1, &[0u8]).unwrap(), CL_UNSIGNED_INT8),
            (HostImage::from_samples(1, 1, 1, &[0i16]).unwrap(), CL_SIGNED_INT16),
            (HostImage::from_samples(1, 1, 1, &[0u16]).unwrap(), CL_UNSIGNED_INT16),
            (HostImage::from_samples(1, 1, 1, &[0i32]).unwrap(), CL_SIGNED_INT32),
            (HostImage::from_samples(1, 1, 1, &[f16::ZERO]).unwrap(), CL_HALF_FLOAT),
            (HostImage::from_samples(1, 1, 1, &[0f32]).unwrap(), CL_FLOAT),
        ];
        for (image, data_type) in cases {
            let format = describe_format(&image).unwrap();
            assert_eq!(format.image_channel_data_type, data_type, "{:?}", image.depth);
            assert_eq!(format.image_channel_order, CL_R);
        }
    }

    #[test]
    fn unsupported_depths_are_rejected() {
        assert!(describe_format(&HostImage::from_samples(1, 1, 1, &[0u32]).unwrap()).is_none());
        assert!(describe_format(&HostImage::from_samples(1, 1, 1, &[0f64]).unwrap()).is_none());
    }

    #[test]
    fn channel_counts_map_to_orders() {
        let rgb = HostImage::from_samples(1, 1, 3, &[0u8; 3]).unwrap();
        let rgba = HostImage::from_samples(1, 1, 4, &[0u8; 4]).unwrap();
        assert_eq!(describe_format(&rgb).unwrap().image_channel_order, CL_RGB);
        assert_eq!(describe_format(&rgba).unwrap().image_channel_order, CL_RGBA);

        for channels in [2, 5] {
            let image = HostImage::from_samples(1, 1, channels, &vec![0u8; channels]).unwrap();
            assert!(describe_format(&image).is_none());
        }
    }

    #[test]
    fn geometry_uses_row_stride() {
        let mut image = blank(3, 2);
        image.stride = 4;
        image.data = vec![0; 8];
        let desc = describe_geometry(&image, &LIMITS).unwrap();
        assert_eq!(desc.image_type, CL_MEM_OBJECT_IMAGE2D);
        assert_eq!((desc.image_width, desc.image_height), (3, 2));
        assert_eq!(desc.image_row_pitch, 4);
    }

    #[test]
    fn geometry_accepts_exact_maximum() {
        assert!(describe_geometry(&blank(16, 8), &LIMITS).is_some());
        assert!(describe_geometry(&blank(1, 1), &LIMITS).is_some());
    }

    #[test]
    fn geometry_rejects_empty_and_oversized() {
        assert!(describe_geometry(&blank(0, 4), &LIMITS).is_none());
        assert!(describe_geometry(&blank(4, 0), &LIMITS).is_none());
        assert!(describe_geometry(&blank(17, 8), &LIMITS).is_none());
        assert!(describe_geometry(&blank(16, 9), &LIMITS).is_none());
    }

    #[test]
    fn geometry_rejects_short_buffer() {
        let mut image = HostImage::from_samples(4, 4, 4, &[0u8; 64]).unwrap();
        image.data.truncate(3);
        assert!(describe_format(&image).is_some());
        assert!(describe_geometry(&image, &LIMITS).is_none());
    }

    #[test]
    fn geometry_rejects_stride_shorter_than_row() {
        let mut image = blank(4, 2);
        image.stride = 2;
        assert!(describe_geometry(&image, &LIMITS).is_none());
    }

    #[test]
    fn conversions_apply_in_order() {
        let image = HostImage::from_samples(1, 1, 3, &[0u8, 255, 51]).unwrap();
        let converted = convert(image, &[to_rgba, to_float]).unwrap();
        assert_eq!(converted.channels, 4);
        assert_eq!(converted.depth, Depth::F32);
        assert_eq!(converted.samples::<f32>().unwrap(), vec![0.0, 1.0, 0.2, 1.0]);
    }

    #[test]
    fn failed_conversion_stops_the_chain() {
        let image = HostImage::from_samples(1, 1, 1, &[1u32]).unwrap();
        assert!(convert(image, &[to_float, to_rgba]).is_err());
    }

    #[test]
    fn undecodable_file_gives_no_image() {
        // декодирование идет раньше любого вызова драйвера
        let context = Managed::wrap(1usize as *mut c_void, |_| CL_SUCCESS).unwrap();
        assert!(load_input_image(&context, CL_MEM_READ_ONLY, "/nonexistent/input.bmp", &[]).is_none());
    }
}
