//! Владение нативными объектами OpenCL
//!
//! `Managed` связывает хендл с функцией освобождения. Объект разделяется
//! через `Arc`, функция освобождения вызывается ровно один раз, когда
//! исчезает последний владелец. Нулевой хендл никогда не оборачивается.

use super::types::*;
use std::ffi::c_void;
use std::fmt;
use std::sync::Arc;

/// Нативный хендл, который может быть нулевым
pub trait NativeHandle: Copy + 'static {
    fn is_null_handle(self) -> bool;
}

impl NativeHandle for *mut c_void {
    fn is_null_handle(self) -> bool {
        self.is_null()
    }
}

type ReleaseFn<T> = Box<dyn Fn(T) -> cl_int + Send + Sync>;

/// Владелец одного нативного объекта (контекст, очередь, программа, ядро,
/// объект памяти, сэмплер, событие)
pub struct Managed<T: NativeHandle> {
    raw: T,
    release: ReleaseFn<T>,
}

/// Разделяемый объект OpenCL
pub type Shared<T> = Arc<Managed<T>>;

// Объекты OpenCL потокобезопасны; сериализация изменяющих вызовов
// (например clSetKernelArg) остается на вызывающей стороне.
unsafe impl<T: NativeHandle> Send for Managed<T> {}
unsafe impl<T: NativeHandle> Sync for Managed<T> {}

impl<T: NativeHandle> Managed<T> {
    /// Оборачивает хендл; для нулевого хендла возвращает `None`
    pub fn wrap<F>(raw: T, release: F) -> Option<Shared<T>>
    where
        F: Fn(T) -> cl_int + Send + Sync + 'static,
    {
        if raw.is_null_handle() {
            return None;
        }
        Some(Arc::new(Self {
            raw,
            release: Box::new(release),
        }))
    }

    pub fn raw(&self) -> T {
        self.raw
    }
}

impl<T: NativeHandle> Drop for Managed<T> {
    fn drop(&mut self) {
        let code = (self.release)(self.raw);
        if code != CL_SUCCESS {
            log::warn!(
                "release of OpenCL object failed: {}({})",
                super::utils::error_string(code),
                code
            );
        }
    }
}

impl<T: NativeHandle + fmt::Debug> fmt::Debug for Managed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Managed").field("raw", &self.raw).finish()
    }
}

/// Функция освобождения из таблицы драйвера
pub fn native<T: NativeHandle>(
    release: unsafe extern "C" fn(T) -> cl_int,
) -> impl Fn(T) -> cl_int + Send + Sync {
    move |raw| unsafe { release(raw) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(counter: &Arc<AtomicUsize>) -> impl Fn(*mut c_void) -> cl_int + Send + Sync {
        let counter = Arc::clone(counter);
        move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            CL_SUCCESS
        }
    }

    fn fake_handle(value: usize) -> *mut c_void {
        value as *mut c_void
    }

    #[test]
    fn null_handle_yields_no_resource() {
        let released = Arc::new(AtomicUsize::new(0));
        let managed = Managed::wrap(std::ptr::null_mut::<c_void>(), counting(&released));
        assert!(managed.is_none());
        assert_eq!(released.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let managed = Managed::wrap(fake_handle(0x10), counting(&released)).unwrap();
        assert_eq!(managed.raw(), fake_handle(0x10));
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(managed);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_waits_for_last_owner() {
        let released = Arc::new(AtomicUsize::new(0));
        let first = Managed::wrap(fake_handle(0x20), counting(&released)).unwrap();
        let second = Arc::clone(&first);
        let third = Arc::clone(&second);

        drop(first);
        drop(third);
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(second);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn release_receives_wrapped_handle() {
        let seen = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&seen);
        let managed = Managed::wrap(fake_handle(0x30), move |raw| {
            sink.store(raw as usize, Ordering::SeqCst);
            CL_SUCCESS
        });
        drop(managed);
        assert_eq!(seen.load(Ordering::SeqCst), 0x30);
    }

    #[test]
    fn shared_across_threads() {
        let released = Arc::new(AtomicUsize::new(0));
        let managed = Managed::wrap(fake_handle(0x40), counting(&released)).unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let owner = Arc::clone(&managed);
                std::thread::spawn(move || owner.raw() as usize)
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), 0x40);
        }

        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(managed);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
