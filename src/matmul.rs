//! Small GEMM wrapper used by the batched dense kernels.
//!
//! `C = alpha * A * B + beta * C` with arbitrary row/column strides, dispatched on a
//! [`Device`]:
//! - `Device::Cpu`: a simple, safe triple loop
//! - `Device::Simd`: `matrixmultiply::sgemm` (feature `matrixmultiply`)

use crate::Device;

#[allow(clippy::too_many_arguments)]
#[inline]
pub(crate) fn gemm_f32(
    device: Device,
    m: usize,
    n: usize,
    k: usize,
    alpha: f32,
    a: &[f32],
    rsa: usize,
    csa: usize,
    b: &[f32],
    rsb: usize,
    csb: usize,
    beta: f32,
    c: &mut [f32],
    rsc: usize,
    csc: usize,
) {
    debug_assert!(m > 0 && n > 0 && k > 0);
    debug_assert!(a.len() >= (m - 1) * rsa + (k - 1) * csa + 1);
    debug_assert!(b.len() >= (k - 1) * rsb + (n - 1) * csb + 1);
    debug_assert!(c.len() >= (m - 1) * rsc + (n - 1) * csc + 1);

    #[cfg(feature = "matrixmultiply")]
    if device == Device::Simd {
        // SAFETY: the debug assertions above describe the extents callers guarantee;
        // every strided access stays inside the three slices.
        unsafe {
            matrixmultiply::sgemm(
                m,
                k,
                n,
                alpha,
                a.as_ptr(),
                rsa as isize,
                csa as isize,
                b.as_ptr(),
                rsb as isize,
                csb as isize,
                beta,
                c.as_mut_ptr(),
                rsc as isize,
                csc as isize,
            );
        }
        return;
    }

    #[cfg(not(feature = "matrixmultiply"))]
    let _ = device;

    for i in 0..m {
        for j in 0..n {
            let mut acc = 0.0_f32;
            let a0 = i * rsa;
            let b0 = j * csb;

            for p in 0..k {
                acc = a[a0 + p * csa].mul_add(b[p * rsb + b0], acc);
            }

            let idx = i * rsc + j * csc;
            // beta == 0 must not read C: it may hold stale non-finite values.
            c[idx] = if beta == 0.0 {
                alpha * acc
            } else {
                alpha * acc + beta * c[idx]
            };
        }
    }
}
