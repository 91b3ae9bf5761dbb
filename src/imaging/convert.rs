//! Чистые преобразования пиксельного буфера
//!
//! Каждое преобразование забирает буфер и возвращает новый; цепочка
//! применяется по порядку в `load_input_image`.

use super::types::{ComponentOrder, Depth, HostImage};
use anyhow::{bail, Result};
use half::f16;

/// Одно звено цепочки преобразований
pub type Conversion = fn(HostImage) -> Result<HostImage>;

/// Приводит порядок компонент к RGBA
///
/// BGR(A) переставляется в RGB(A), к 3 каналам добавляется непрозрачная
/// альфа. Буферы с 1, 2 и 4 каналами сохраняют число каналов.
pub fn to_rgba(image: HostImage) -> Result<HostImage> {
    image.check_layout()?;
    let swap = image.order == ComponentOrder::Bgra && image.channels >= 3;
    if !swap && image.channels != 3 {
        return Ok(HostImage {
            order: ComponentOrder::Rgba,
            ..image
        });
    }

    let size = image.depth.bytes();
    let channels = if image.channels == 3 { 4 } else { image.channels };
    let alpha = image.depth.opaque();
    let stride = image.width * channels * size;
    let mut data = Vec::with_capacity(stride * image.height);

    for y in 0..image.height {
        for pixel in image.row(y).chunks_exact(image.pixel_bytes()) {
            let mut out = pixel.to_vec();
            if swap {
                // B и R поканально, каждый канал по `size` байт
                for i in 0..size {
                    out.swap(i, 2 * size + i);
                }
            }
            if image.channels == 3 {
                out.extend_from_slice(&alpha);
            }
            data.extend_from_slice(&out);
        }
    }

    Ok(HostImage {
        channels,
        order: ComponentOrder::Rgba,
        stride,
        data,
        ..image
    })
}

/// Делитель и смещение для перевода отсчета в float: `v / divisor + offset`
fn scale(depth: Depth) -> Option<(f64, f64)> {
    match depth {
        Depth::U8 => Some((255.0, 0.0)),
        Depth::I8 => Some((256.0, 0.5)),
        Depth::U16 => Some((65535.0, 0.0)),
        Depth::I16 => Some((65536.0, 0.5)),
        Depth::I32 => Some((4294967296.0, 0.5)),
        Depth::F16 | Depth::F32 | Depth::F64 => Some((1.0, 0.0)),
        Depth::U32 => None,
    }
}

fn sample_at(depth: Depth, bytes: &[u8]) -> f64 {
    match depth {
        Depth::U8 => bytes[0] as f64,
        Depth::I8 => bytes[0] as i8 as f64,
        Depth::U16 => u16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        Depth::I16 => i16::from_ne_bytes([bytes[0], bytes[1]]) as f64,
        Depth::F16 => f16::from_ne_bytes([bytes[0], bytes[1]]).to_f64(),
        Depth::I32 => i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        Depth::U32 => u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        Depth::F32 => f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f64,
        Depth::F64 => f64::from_ne_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]),
    }
}

/// Переводит отсчеты в 32-битный float
///
/// Беззнаковые целые масштабируются в [0, 1], знаковые сдвигаются на +0.5
/// к тому же диапазону. Буфер f32 возвращается без изменений.
pub fn to_float(image: HostImage) -> Result<HostImage> {
    image.check_layout()?;
    if image.depth == Depth::F32 {
        return Ok(image);
    }
    let Some((divisor, offset)) = scale(image.depth) else {
        bail!("cannot normalize {:?} samples to float", image.depth);
    };

    let size = image.depth.bytes();
    let stride = image.width * image.channels * std::mem::size_of::<f32>();
    let mut samples: Vec<f32> = Vec::with_capacity(image.width * image.channels * image.height);
    for y in 0..image.height {
        for bytes in image.row(y).chunks_exact(size) {
            samples.push((sample_at(image.depth, bytes) / divisor + offset) as f32);
        }
    }

    Ok(HostImage {
        depth: Depth::F32,
        stride,
        data: bytemuck::cast_slice(&samples).to_vec(),
        ..image
    })
}
