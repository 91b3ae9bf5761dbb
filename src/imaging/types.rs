//! Пиксельный буфер на стороне хоста

use anyhow::{bail, ensure, Context as _, Result};
use half::f16;
use std::path::Path;

/// Тип одного канала пикселя
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Depth {
    U8,
    I8,
    U16,
    I16,
    F16,
    I32,
    U32,
    F32,
    F64,
}

impl Depth {
    /// Размер одного канала в байтах
    pub fn bytes(self) -> usize {
        match self {
            Depth::U8 | Depth::I8 => 1,
            Depth::U16 | Depth::I16 | Depth::F16 => 2,
            Depth::I32 | Depth::U32 | Depth::F32 => 4,
            Depth::F64 => 8,
        }
    }

    /// Значение полностью непрозрачного альфа-канала в байтах
    pub fn opaque(self) -> Vec<u8> {
        match self {
            Depth::U8 => u8::MAX.to_ne_bytes().to_vec(),
            Depth::I8 => i8::MAX.to_ne_bytes().to_vec(),
            Depth::U16 => u16::MAX.to_ne_bytes().to_vec(),
            Depth::I16 => i16::MAX.to_ne_bytes().to_vec(),
            Depth::F16 => f16::ONE.to_ne_bytes().to_vec(),
            Depth::I32 => i32::MAX.to_ne_bytes().to_vec(),
            Depth::U32 => u32::MAX.to_ne_bytes().to_vec(),
            Depth::F32 => 1.0f32.to_ne_bytes().to_vec(),
            Depth::F64 => 1.0f64.to_ne_bytes().to_vec(),
        }
    }
}

/// Тип, которым может быть представлен канал пикселя
pub trait Sample: bytemuck::Pod {
    const DEPTH: Depth;
}

impl Sample for u8 {
    const DEPTH: Depth = Depth::U8;
}
impl Sample for i8 {
    const DEPTH: Depth = Depth::I8;
}
impl Sample for u16 {
    const DEPTH: Depth = Depth::U16;
}
impl Sample for i16 {
    const DEPTH: Depth = Depth::I16;
}
impl Sample for f16 {
    const DEPTH: Depth = Depth::F16;
}
impl Sample for i32 {
    const DEPTH: Depth = Depth::I32;
}
impl Sample for u32 {
    const DEPTH: Depth = Depth::U32;
}
impl Sample for f32 {
    const DEPTH: Depth = Depth::F32;
}
impl Sample for f64 {
    const DEPTH: Depth = Depth::F64;
}

/// Порядок компонент в пикселе
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentOrder {
    /// R, G, B, A (декодер изображений отдает этот порядок)
    Rgba,
    /// B, G, R, A
    Bgra,
}

/// Изображение в памяти хоста: строки по `stride` байт, каналы чередуются
#[derive(Debug, Clone, PartialEq)]
pub struct HostImage {
    pub width: usize,
    pub height: usize,
    pub channels: usize,
    pub depth: Depth,
    pub order: ComponentOrder,
    /// Байт на строку, включая выравнивание
    pub stride: usize,
    pub data: Vec<u8>,
}

impl HostImage {
    /// Плотно упакованное изображение из отсчетов
    pub fn from_samples<S: Sample>(width: usize, height: usize, channels: usize, samples: &[S]) -> Result<Self> {
        ensure!(
            samples.len() == width * height * channels,
            "{}x{}x{} image needs {} samples, got {}",
            width,
            height,
            channels,
            width * height * channels,
            samples.len()
        );
        Ok(Self {
            width,
            height,
            channels,
            depth: S::DEPTH,
            order: ComponentOrder::Rgba,
            stride: width * channels * S::DEPTH.bytes(),
            data: bytemuck::cast_slice(samples).to_vec(),
        })
    }

    /// Байт на пиксель
    pub fn pixel_bytes(&self) -> usize {
        self.channels * self.depth.bytes()
    }

    /// Проверяет согласованность `stride` и `data` с размерами
    ///
    /// Строка не короче `width` пикселей, в буфере не меньше `stride * height`
    /// байт (столько читает драйвер при копировании изображения).
    pub fn check_layout(&self) -> Result<()> {
        let row_bytes = self.width * self.pixel_bytes();
        ensure!(
            self.stride >= row_bytes,
            "row stride {} is shorter than {} bytes of a {}-pixel row",
            self.stride,
            row_bytes,
            self.width
        );
        let needed = self.stride * self.height;
        ensure!(
            self.data.len() >= needed,
            "{}x{} image with stride {} needs {} bytes, buffer has {}",
            self.width,
            self.height,
            self.stride,
            needed,
            self.data.len()
        );
        Ok(())
    }

    /// Значимые байты строки без выравнивания; раскладка должна пройти
    /// `check_layout`
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width * self.pixel_bytes()]
    }

    /// Все отсчеты подряд, без выравнивания строк
    pub fn samples<S: Sample>(&self) -> Result<Vec<S>> {
        ensure!(
            S::DEPTH == self.depth,
            "image depth is {:?}, requested {:?}",
            self.depth,
            S::DEPTH
        );
        self.check_layout()?;
        let mut packed = Vec::with_capacity(self.height * self.width * self.pixel_bytes());
        for y in 0..self.height {
            packed.extend_from_slice(self.row(y));
        }
        Ok(bytemuck::pod_collect_to_vec(&packed))
    }

    /// Декодирует файл изображения (BMP, PNG, TIFF, ...)
    ///
    /// Формат пикселя сохраняется: 8/16-битные целые или 32-битные float,
    /// 1, 3 или 4 канала. Серое с альфой расширяется до RGBA.
    pub fn decode(path: impl AsRef<Path>) -> Result<Self> {
        use ::image::DynamicImage;

        let path = path.as_ref();
        let decoded = ::image::open(path).with_context(|| format!("cannot decode {}", path.display()))?;
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);
        match decoded {
            DynamicImage::ImageLuma8(buffer) => Self::from_samples(width, height, 1, buffer.as_raw()),
            DynamicImage::ImageRgb8(buffer) => Self::from_samples(width, height, 3, buffer.as_raw()),
            DynamicImage::ImageRgba8(buffer) => Self::from_samples(width, height, 4, buffer.as_raw()),
            DynamicImage::ImageLuma16(buffer) => Self::from_samples(width, height, 1, buffer.as_raw()),
            DynamicImage::ImageRgb16(buffer) => Self::from_samples(width, height, 3, buffer.as_raw()),
            DynamicImage::ImageRgba16(buffer) => Self::from_samples(width, height, 4, buffer.as_raw()),
            DynamicImage::ImageRgb32F(buffer) => Self::from_samples(width, height, 3, buffer.as_raw()),
            DynamicImage::ImageRgba32F(buffer) => Self::from_samples(width, height, 4, buffer.as_raw()),
            DynamicImage::ImageLumaA8(_) => {
                let buffer = decoded.to_rgba8();
                Self::from_samples(width, height, 4, buffer.as_raw())
            }
            DynamicImage::ImageLumaA16(_) => {
                let buffer = decoded.to_rgba16();
                Self::from_samples(width, height, 4, buffer.as_raw())
            }
            other => bail!("unsupported pixel layout {:?} in {}", other.color(), path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_skip_row_padding() {
        let mut image = HostImage::from_samples(2, 2, 1, &[1u8, 2, 3, 4]).unwrap();
        // искусственно выровненные строки по 4 байта
        image.stride = 4;
        image.data = vec![1, 2, 0xAA, 0xAA, 3, 4, 0xAA, 0xAA];
        assert_eq!(image.samples::<u8>().unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn samples_require_matching_depth() {
        let image = HostImage::from_samples(1, 1, 1, &[0.5f32]).unwrap();
        assert!(image.samples::<u8>().is_err());
        assert_eq!(image.samples::<f32>().unwrap(), vec![0.5]);
    }

    #[test]
    fn short_buffer_fails_layout_check() {
        let mut image = HostImage::from_samples(2, 2, 3, &[0u8; 12]).unwrap();
        assert!(image.check_layout().is_ok());
        image.data.truncate(5);
        assert!(image.check_layout().is_err());
        assert!(image.samples::<u8>().is_err());
    }

    #[test]
    fn stride_shorter_than_row_fails_layout_check() {
        let mut image = HostImage::from_samples(4, 1, 4, &[0u8; 16]).unwrap();
        image.stride = 8;
        assert!(image.check_layout().is_err());
    }

    #[test]
    fn sample_count_must_match_geometry() {
        assert!(HostImage::from_samples(2, 2, 3, &[0u8; 11]).is_err());
    }

    #[test]
    fn decode_keeps_channel_layout() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pixels.png");
        let source = ::image::RgbImage::from_fn(3, 2, |x, y| ::image::Rgb([x as u8, y as u8, 7]));
        source.save(&path).unwrap();

        let image = HostImage::decode(&path).unwrap();
        assert_eq!((image.width, image.height, image.channels), (3, 2, 3));
        assert_eq!(image.depth, Depth::U8);
        assert_eq!(image.stride, 9);
        assert_eq!(image.row(1)[..3], [0, 1, 7]);
    }

    #[test]
    fn decode_of_missing_file_fails() {
        assert!(HostImage::decode("/nonexistent/picture.bmp").is_err());
    }
}
