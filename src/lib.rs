//! OpenCL convenience layer: device discovery, contexts, programs and
//! host image marshaling

#[macro_use]
mod macros {
    /// Макрос для вызовов OpenCL, возвращающих код (cl_int)
    ///
    /// `cl_check!(api.clFinish(queue))` -> `Result<(), ClError>`
    #[macro_export]
    macro_rules! cl_check {
        ($api:ident . $func:ident ( $($arg:expr),* $(,)? )) => {{
            let code = unsafe { ($api.$func)($($arg),*) };
            $crate::opencl::utils::check(stringify!($func), code)
        }};
    }

    /// Макрос для вызовов OpenCL, создающих объект
    ///
    /// Последний аргумент `errcode_ret` подставляется сам; нулевой объект
    /// считается ошибкой.
    #[macro_export]
    macro_rules! cl_create {
        ($api:ident . $func:ident ( $($arg:expr),* $(,)? )) => {{
            let mut status: $crate::opencl::types::cl_int = $crate::opencl::types::CL_SUCCESS;
            let obj = unsafe { ($api.$func)($($arg,)* &mut status) };
            if status != $crate::opencl::types::CL_SUCCESS {
                Err($crate::opencl::utils::ClError::Status {
                    call: stringify!($func),
                    code: status,
                })
            } else if obj.is_null() {
                Err($crate::opencl::utils::ClError::Null {
                    call: stringify!($func),
                })
            } else {
                Ok(obj)
            }
        }};
    }
}

pub mod imaging;
pub mod opencl;
pub mod utils;

// Реэкспорт основных типов для удобства
pub use imaging::{Depth, HostImage};
pub use opencl::context::{build_default_context_set, ContextSet};
pub use opencl::discovery::{discover_all, DeviceId, PlatformDevices, PlatformId};
pub use opencl::resource::{Managed, Shared};
pub use opencl::types::*;
