//! Подготовка изображений хоста для устройства
//!
//! Декодирование файла, цепочка преобразований (порядок каналов,
//! нормализация глубины) и создание 2D изображений OpenCL.

pub mod convert;
pub mod marshal;
pub mod types;

pub use convert::{to_float, to_rgba, Conversion};
pub use marshal::{create_output_image, describe_format, describe_geometry, load_input_image, InputImage};
pub use types::{ComponentOrder, Depth, HostImage, Sample};
