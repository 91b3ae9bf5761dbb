//! Сборка программ OpenCL из файлов с исходным кодом ядер

use super::bindings::{api, OpenCl};
use super::discovery::DeviceId;
use super::info::context_devices;
use super::resource::{native, Managed, Shared};
use super::types::*;
use crate::{cl_check, cl_create};
use anyhow::{bail, Context as _, Result};
use std::ffi::{c_char, c_void, CString};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::ptr;

/// Расширение файлов с исходным кодом ядер
pub const KERNEL_EXTENSION: &str = "cl";

/// Предел размера одного файла с исходным кодом (8 MiB)
pub const SOURCE_CAPACITY: usize = 1 << 23;

/// Исходный код, разложенный по строкам для clCreateProgramWithSource
///
/// Каждая строка заканчивается '\n' и нулевым байтом; длина строки нулевой
/// байт не включает.
#[derive(Debug, Default)]
pub struct SourceLines {
    buffer: Vec<u8>,
    spans: Vec<(usize, usize)>,
}

impl SourceLines {
    /// Читает файл построчно в собственный буфер вызова
    pub fn read(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        Self::from_reader(BufReader::new(file), path)
    }

    fn from_reader<R: BufRead>(mut reader: R, path: &Path) -> Result<Self> {
        let mut lines = Self::default();
        let mut line = Vec::new();
        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .with_context(|| format!("cannot read {}", path.display()))?;
            if read == 0 {
                break;
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }

            // строка + '\n' + '\0'
            if lines.buffer.len() + line.len() + 2 > SOURCE_CAPACITY {
                bail!("{} is more than {} bytes", path.display(), SOURCE_CAPACITY);
            }
            let start = lines.buffer.len();
            lines.buffer.extend_from_slice(&line);
            lines.buffer.push(b'\n');
            lines.spans.push((start, line.len() + 1));
            lines.buffer.push(0);
        }
        Ok(lines)
    }

    pub fn len(&self) -> usize {
        self.spans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Строка с завершающим '\n', без нулевого байта
    pub fn line(&self, index: usize) -> &[u8] {
        let (start, length) = self.spans[index];
        &self.buffer[start..start + length]
    }

    fn pointers(&self) -> (Vec<*const c_char>, Vec<usize>) {
        self.spans
            .iter()
            .map(|&(start, length)| (self.buffer[start..].as_ptr() as *const c_char, length))
            .unzip()
    }
}

fn query_build_log(api: &OpenCl, program: cl_program, device: DeviceId) -> Result<String> {
    let mut size = 0usize;
    cl_check!(api.clGetProgramBuildInfo(
        program,
        device.0,
        CL_PROGRAM_BUILD_LOG,
        0,
        ptr::null_mut(),
        &mut size
    ))?;
    let mut log = vec![0u8; size];
    cl_check!(api.clGetProgramBuildInfo(
        program,
        device.0,
        CL_PROGRAM_BUILD_LOG,
        size,
        log.as_mut_ptr() as *mut c_void,
        ptr::null_mut()
    ))?;
    while log.last() == Some(&0) {
        log.pop();
    }
    Ok(String::from_utf8_lossy(&log).into_owned())
}

/// Лог сборки программы для устройства
pub fn build_log(program: &Managed<cl_program>, device: DeviceId) -> Option<String> {
    match api().and_then(|api| query_build_log(api, program.raw(), device)) {
        Ok(log) => Some(log),
        Err(e) => {
            log::error!("build log: {:#}", e);
            None
        }
    }
}

fn create_program(api: &OpenCl, context: &Managed<cl_context>, path: &Path) -> Result<Shared<cl_program>> {
    let source = SourceLines::read(path)?;
    let (lines, lengths) = source.pointers();

    let program = cl_create!(api.clCreateProgramWithSource(
        context.raw(),
        lines.len() as cl_uint,
        lines.as_ptr(),
        lengths.as_ptr()
    ))?;
    let program = Managed::wrap(program, native(api.clReleaseProgram)).context("null program")?;

    // компиляция и линковка для всех устройств контекста, без опций
    if let Err(e) = cl_check!(api.clBuildProgram(
        program.raw(),
        0,
        ptr::null(),
        ptr::null(),
        None,
        ptr::null_mut()
    )) {
        for device in context_devices(context) {
            if let Ok(log) = query_build_log(api, program.raw(), device) {
                if !log.trim().is_empty() {
                    log::error!("{} build log:\n{}", path.display(), log);
                }
            }
        }
        // программа освобождается вместе с `program`
        return Err(e.into());
    }
    Ok(program)
}

/// Читает исходный код ядра из файла, компилирует и линкует программу
///
/// `None` при ошибке чтения, превышении предела размера или ошибке сборки;
/// несобранная программа не возвращается никогда.
pub fn build_program(context: &Managed<cl_context>, path: impl AsRef<Path>) -> Option<Shared<cl_program>> {
    let path = path.as_ref();
    match api().and_then(|api| create_program(api, context, path)) {
        Ok(program) => {
            log::debug!("built program from {}", path.display());
            Some(program)
        }
        Err(e) => {
            log::error!("program from {} failed: {:#}", path.display(), e);
            None
        }
    }
}

/// Ядро программы по имени функции `__kernel`
pub fn create_kernel(program: &Managed<cl_program>, name: &str) -> Option<Shared<cl_kernel>> {
    let create = |api: &OpenCl| -> Result<Shared<cl_kernel>> {
        let name = CString::new(name)?;
        let kernel = cl_create!(api.clCreateKernel(program.raw(), name.as_ptr()))?;
        Managed::wrap(kernel, native(api.clReleaseKernel)).context("null kernel")
    };
    match api().and_then(create) {
        Ok(kernel) => Some(kernel),
        Err(e) => {
            log::error!("kernel {}: {:#}", name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    fn lines_of(text: &str) -> SourceLines {
        SourceLines::from_reader(Cursor::new(text.as_bytes()), Path::new("test.cl")).unwrap()
    }

    #[test]
    fn every_line_is_newline_and_nul_terminated() {
        let source = lines_of("__kernel\nvoid f() {}");
        assert_eq!(source.len(), 2);
        assert_eq!(source.line(0), b"__kernel\n");
        // последняя строка без '\n' в файле тоже его получает
        assert_eq!(source.line(1), b"void f() {}\n");

        let (pointers, lengths) = source.pointers();
        assert_eq!(lengths, vec![9, 12]);
        for (pointer, length) in pointers.iter().zip(&lengths) {
            let terminator = unsafe { *pointer.add(*length) };
            assert_eq!(terminator, 0);
        }
    }

    #[test]
    fn empty_lines_are_kept() {
        let source = lines_of("a\n\nb\n");
        assert_eq!(source.len(), 3);
        assert_eq!(source.line(1), b"\n");
    }

    #[test]
    fn empty_file_has_no_lines() {
        assert!(lines_of("").is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = SourceLines::read(Path::new("/nonexistent/kernel.cl")).unwrap_err();
        assert!(format!("{:#}", err).contains("cannot open"));
    }

    #[test]
    fn oversized_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let line = vec![b'x'; 1023];
        for _ in 0..(SOURCE_CAPACITY / 1024 + 1) {
            file.write_all(&line).unwrap();
            file.write_all(b"\n").unwrap();
        }
        file.flush().unwrap();

        let err = SourceLines::read(file.path()).unwrap_err();
        assert!(err.to_string().contains("is more than"));
    }

    #[test]
    fn file_just_under_capacity_is_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        // каждая строка занимает 1024 байта в буфере (1022 + '\n' + '\0')
        let line = vec![b'y'; 1022];
        for _ in 0..(SOURCE_CAPACITY / 1024) {
            file.write_all(&line).unwrap();
            file.write_all(b"\n").unwrap();
        }
        file.flush().unwrap();

        let source = SourceLines::read(file.path()).unwrap();
        assert_eq!(source.len(), SOURCE_CAPACITY / 1024);
    }
}
