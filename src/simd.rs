//! Shared SIMD primitives for the LDPC/polar back-ends (C3, C5, C6).
//!
//! Back-ends are a closed set of concrete kernels chosen once at
//! construction time (spec.md §9 redesign flag: no `void*` + function-pointer
//! dispatch). Each kernel here realises the same operation -- XOR a cyclic
//! left-rotation of a byte-per-bit "lifted node" into an accumulator -- at
//! increasing vector width. Rotation is realised via an unaligned load from
//! a doubled (2*Z) buffer rather than the reference implementation's
//! front/back-padded single buffer; both give a trap-free unaligned load for
//! any rotation amount, see `DESIGN.md`.

/// Runtime capability probe, cached once (immutable for the process lifetime
/// per spec.md §5).
pub fn avx2_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("avx2")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

pub fn avx512_available() -> bool {
    #[cfg(target_arch = "x86_64")]
    {
        is_x86_feature_detected!("avx512f")
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        false
    }
}

/// Back-end kernel selected once per encoder/decoder instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kernel {
    Scalar,
    Avx2,
    Avx512,
}

impl Kernel {
    /// Picks the best kernel available on this host.
    pub fn best_available() -> Self {
        if avx512_available() {
            Kernel::Avx512
        } else if avx2_available() {
            Kernel::Avx2
        } else {
            Kernel::Scalar
        }
    }
}

/// `acc[i] ^= src_doubled[(shift + i) mod z]` for `i in 0..z`, where
/// `src_doubled` is `src` concatenated with itself (length `2*z`).
///
/// Dispatches to the kernel selected at encoder/decoder construction; all
/// three variants must (and do) produce byte-identical output (spec.md §6).
pub fn xor_rotate(kernel: Kernel, acc: &mut [u8], src_doubled: &[u8], shift: usize, z: usize) {
    debug_assert_eq!(acc.len(), z);
    debug_assert_eq!(src_doubled.len(), 2 * z);
    match kernel {
        Kernel::Scalar => xor_rotate_scalar(acc, src_doubled, shift, z),
        Kernel::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { xor_rotate_avx2(acc, src_doubled, shift, z) };
                    return;
                }
            }
            xor_rotate_scalar(acc, src_doubled, shift, z)
        }
        Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx512_available() {
                    unsafe { xor_rotate_avx512(acc, src_doubled, shift, z) };
                    return;
                }
            }
            xor_rotate_scalar(acc, src_doubled, shift, z)
        }
    }
}

fn xor_rotate_scalar(acc: &mut [u8], src_doubled: &[u8], shift: usize, z: usize) {
    for i in 0..z {
        acc[i] ^= src_doubled[shift + i];
    }
}

/// Small-Z kernel: Z <= 32, one lifted node fits in a single `__m256i`.
/// Large-Z kernel: chunks of 32 bytes, tail handled by the scalar path.
#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn xor_rotate_avx2(acc: &mut [u8], src_doubled: &[u8], shift: usize, z: usize) {
    use core::arch::x86_64::*;
    let mut i = 0usize;
    while i + 32 <= z {
        let a = _mm256_loadu_si256(acc.as_ptr().add(i) as *const __m256i);
        let b = _mm256_loadu_si256(src_doubled.as_ptr().add(shift + i) as *const __m256i);
        let r = _mm256_xor_si256(a, b);
        _mm256_storeu_si256(acc.as_mut_ptr().add(i) as *mut __m256i, r);
        i += 32;
    }
    xor_rotate_scalar(&mut acc[i..], &src_doubled[shift + i..2 * z], 0, z - i);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
unsafe fn xor_rotate_avx512(acc: &mut [u8], src_doubled: &[u8], shift: usize, z: usize) {
    use core::arch::x86_64::*;
    let mut i = 0usize;
    while i + 64 <= z {
        let a = _mm512_loadu_si512(acc.as_ptr().add(i) as *const i32);
        let b = _mm512_loadu_si512(src_doubled.as_ptr().add(shift + i) as *const i32);
        let r = _mm512_xor_si512(a, b);
        _mm512_storeu_si512(acc.as_mut_ptr().add(i) as *mut i32, r);
        i += 64;
    }
    xor_rotate_scalar(&mut acc[i..], &src_doubled[shift + i..2 * z], 0, z - i);
}

/// Builds the doubled buffer used by [`xor_rotate`] for a node of length `z`.
pub fn doubled(node: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(node.len() * 2);
    out.extend_from_slice(node);
    out.extend_from_slice(node);
    out
}

/// `dst[i] ^= src[i]` for `i in 0..dst.len()`: the polar butterfly transform's
/// inner stage (spec.md §4.6, "pairwise XOR of 256-bit chunks" for stages
/// `0..n-5`) is a plain elementwise XOR of two equal-length contiguous runs,
/// no rotation needed, so it shares none of [`xor_rotate`]'s doubled-buffer
/// machinery.
pub fn xor_into(kernel: Kernel, dst: &mut [u8], src: &[u8]) {
    debug_assert_eq!(dst.len(), src.len());
    match kernel {
        Kernel::Scalar => xor_into_scalar(dst, src),
        Kernel::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { xor_into_avx2(dst, src) };
                    return;
                }
            }
            xor_into_scalar(dst, src)
        }
        Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx512_available() {
                    unsafe { xor_into_avx512(dst, src) };
                    return;
                }
            }
            xor_into_scalar(dst, src)
        }
    }
}

fn xor_into_scalar(dst: &mut [u8], src: &[u8]) {
    for (d, &s) in dst.iter_mut().zip(src.iter()) {
        *d ^= s;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn xor_into_avx2(dst: &mut [u8], src: &[u8]) {
    use core::arch::x86_64::*;
    let len = dst.len();
    let mut i = 0usize;
    while i + 32 <= len {
        let a = _mm256_loadu_si256(dst.as_ptr().add(i) as *const __m256i);
        let b = _mm256_loadu_si256(src.as_ptr().add(i) as *const __m256i);
        let r = _mm256_xor_si256(a, b);
        _mm256_storeu_si256(dst.as_mut_ptr().add(i) as *mut __m256i, r);
        i += 32;
    }
    xor_into_scalar(&mut dst[i..], &src[i..]);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
unsafe fn xor_into_avx512(dst: &mut [u8], src: &[u8]) {
    use core::arch::x86_64::*;
    let len = dst.len();
    let mut i = 0usize;
    while i + 64 <= len {
        let a = _mm512_loadu_si512(dst.as_ptr().add(i) as *const i32);
        let b = _mm512_loadu_si512(src.as_ptr().add(i) as *const i32);
        let r = _mm512_xor_si512(a, b);
        _mm512_storeu_si512(dst.as_mut_ptr().add(i) as *mut i32, r);
        i += 64;
    }
    xor_into_scalar(&mut dst[i..], &src[i..]);
}

/// Builds the doubled `f32` buffer used by [`rotate_gather_f32`] for a
/// variable node's lifted belief vector of length `z`.
pub fn doubled_f32(node: &[f32]) -> Vec<f32> {
    let mut out = Vec::with_capacity(node.len() * 2);
    out.extend_from_slice(node);
    out.extend_from_slice(node);
    out
}

/// `out[i] = src_doubled[(shift + i)]` for `i in 0..z`: the LDPC decoder's
/// rotate-gather (extracting a lifted node's beliefs in a check row's local
/// order) and rotate-scatter (writing updated beliefs back, using the
/// complement shift) both reduce to this same unaligned windowed copy over
/// the doubled buffer -- no XOR, the decoder combines values itself once
/// they're gathered into contiguous lane order.
pub fn rotate_gather_f32(kernel: Kernel, out: &mut [f32], src_doubled: &[f32], shift: usize, z: usize) {
    debug_assert_eq!(out.len(), z);
    debug_assert_eq!(src_doubled.len(), 2 * z);
    match kernel {
        Kernel::Scalar => rotate_gather_f32_scalar(out, src_doubled, shift, z),
        Kernel::Avx2 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { rotate_gather_f32_avx2(out, src_doubled, shift, z) };
                    return;
                }
            }
            rotate_gather_f32_scalar(out, src_doubled, shift, z)
        }
        Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx512_available() {
                    unsafe { rotate_gather_f32_avx512(out, src_doubled, shift, z) };
                    return;
                }
            }
            rotate_gather_f32_scalar(out, src_doubled, shift, z)
        }
    }
}

fn rotate_gather_f32_scalar(out: &mut [f32], src_doubled: &[f32], shift: usize, z: usize) {
    out.copy_from_slice(&src_doubled[shift..shift + z]);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn rotate_gather_f32_avx2(out: &mut [f32], src_doubled: &[f32], shift: usize, z: usize) {
    use core::arch::x86_64::*;
    let mut i = 0usize;
    while i + 8 <= z {
        let v = _mm256_loadu_ps(src_doubled.as_ptr().add(shift + i));
        _mm256_storeu_ps(out.as_mut_ptr().add(i), v);
        i += 8;
    }
    rotate_gather_f32_scalar(&mut out[i..], &src_doubled[shift + i..2 * z], 0, z - i);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx512f")]
unsafe fn rotate_gather_f32_avx512(out: &mut [f32], src_doubled: &[f32], shift: usize, z: usize) {
    use core::arch::x86_64::*;
    let mut i = 0usize;
    while i + 16 <= z {
        let v = _mm512_loadu_ps(src_doubled.as_ptr().add(shift + i));
        _mm512_storeu_ps(out.as_mut_ptr().add(i), v);
        i += 16;
    }
    rotate_gather_f32_scalar(&mut out[i..], &src_doubled[shift + i..2 * z], 0, z - i);
}

/// `out[i] = sign(a[i]) * sign(b[i]) * min(|a[i]|, |b[i]|)`, the polar SSC
/// decoder's `f`-combine at int8 precision, over 32-lane `i8` vectors
/// (spec.md §4.6: "the AVX2 int8 variant vectorises f, g, XOR, and
/// hard-decision over 32-lane vectors").
pub fn f_op_i8(kernel: Kernel, out: &mut [i8], a: &[i8], b: &[i8]) {
    debug_assert_eq!(out.len(), a.len());
    debug_assert_eq!(a.len(), b.len());
    match kernel {
        Kernel::Avx2 | Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { f_op_i8_avx2(out, a, b) };
                    return;
                }
            }
            f_op_i8_scalar(out, a, b)
        }
        Kernel::Scalar => f_op_i8_scalar(out, a, b),
    }
}

fn f_op_i8_scalar(out: &mut [i8], a: &[i8], b: &[i8]) {
    for i in 0..out.len() {
        let sign = a[i].signum() as i32 * b[i].signum() as i32;
        let mag = a[i].unsigned_abs().min(b[i].unsigned_abs()) as i32;
        out[i] = (sign * mag) as i8;
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn f_op_i8_avx2(out: &mut [i8], a: &[i8], b: &[i8]) {
    use core::arch::x86_64::*;
    let len = out.len();
    let mut i = 0usize;
    while i + 32 <= len {
        let va = _mm256_loadu_si256(a.as_ptr().add(i) as *const __m256i);
        let vb = _mm256_loadu_si256(b.as_ptr().add(i) as *const __m256i);
        let abs_a = _mm256_abs_epi8(va);
        let abs_b = _mm256_abs_epi8(vb);
        let min_mag = _mm256_min_epi8(abs_a, abs_b);
        // Apply sign(a) then sign(b) to the magnitude; _mm256_sign_epi8
        // zeroes its first operand when the second is zero, matching
        // `i8::signum() == 0` for a zero LLR.
        let with_sign_a = _mm256_sign_epi8(min_mag, va);
        let result = _mm256_sign_epi8(with_sign_a, vb);
        _mm256_storeu_si256(out.as_mut_ptr().add(i) as *mut __m256i, result);
        i += 32;
    }
    f_op_i8_scalar(&mut out[i..], &a[i..], &b[i..]);
}

/// `out[i] = if u[i] == 0 { b[i] + a[i] } else { b[i] - a[i] }`, saturating,
/// the SSC decoder's `g`-combine at int8 precision.
pub fn g_op_i8(kernel: Kernel, out: &mut [i8], a: &[i8], b: &[i8], u: &[u8]) {
    debug_assert_eq!(out.len(), a.len());
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), u.len());
    match kernel {
        Kernel::Avx2 | Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { g_op_i8_avx2(out, a, b, u) };
                    return;
                }
            }
            g_op_i8_scalar(out, a, b, u)
        }
        Kernel::Scalar => g_op_i8_scalar(out, a, b, u),
    }
}

fn g_op_i8_scalar(out: &mut [i8], a: &[i8], b: &[i8], u: &[u8]) {
    for i in 0..out.len() {
        out[i] = if u[i] == 0 {
            b[i].saturating_add(a[i])
        } else {
            b[i].saturating_sub(a[i])
        };
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn g_op_i8_avx2(out: &mut [i8], a: &[i8], b: &[i8], u: &[u8]) {
    use core::arch::x86_64::*;
    let len = out.len();
    let mut i = 0usize;
    while i + 32 <= len {
        let va = _mm256_loadu_si256(a.as_ptr().add(i) as *const __m256i);
        let vb = _mm256_loadu_si256(b.as_ptr().add(i) as *const __m256i);
        let add = _mm256_adds_epi8(vb, va);
        let sub = _mm256_subs_epi8(vb, va);
        let mut mask_bytes = [0u8; 32];
        for (k, byte) in mask_bytes.iter_mut().enumerate() {
            *byte = if u[i + k] != 0 { 0xFF } else { 0x00 };
        }
        let mask = _mm256_loadu_si256(mask_bytes.as_ptr() as *const __m256i);
        let result = _mm256_blendv_epi8(add, sub, mask);
        _mm256_storeu_si256(out.as_mut_ptr().add(i) as *mut __m256i, result);
        i += 32;
    }
    g_op_i8_scalar(&mut out[i..], &a[i..], &b[i..], &u[i..]);
}

/// Hard-decides a sign-byte buffer into `{0,1}` bits: `out[i] = (v[i] < 0)`.
pub fn hard_decide_i8(kernel: Kernel, out: &mut [u8], v: &[i8]) {
    debug_assert_eq!(out.len(), v.len());
    match kernel {
        Kernel::Avx2 | Kernel::Avx512 => {
            #[cfg(target_arch = "x86_64")]
            {
                if avx2_available() {
                    unsafe { hard_decide_i8_avx2(out, v) };
                    return;
                }
            }
            hard_decide_i8_scalar(out, v)
        }
        Kernel::Scalar => hard_decide_i8_scalar(out, v),
    }
}

fn hard_decide_i8_scalar(out: &mut [u8], v: &[i8]) {
    for (o, &x) in out.iter_mut().zip(v.iter()) {
        *o = u8::from(x < 0);
    }
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2")]
unsafe fn hard_decide_i8_avx2(out: &mut [u8], v: &[i8]) {
    use core::arch::x86_64::*;
    let len = out.len();
    let zero = _mm256_setzero_si256();
    let one = _mm256_set1_epi8(1);
    let mut i = 0usize;
    while i + 32 <= len {
        let vv = _mm256_loadu_si256(v.as_ptr().add(i) as *const __m256i);
        let neg_mask = _mm256_cmpgt_epi8(zero, vv);
        let bits = _mm256_and_si256(neg_mask, one);
        _mm256_storeu_si256(out.as_mut_ptr().add(i) as *mut __m256i, bits);
        i += 32;
    }
    hard_decide_i8_scalar(&mut out[i..], &v[i..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_matches_manual_rotation() {
        let z = 11;
        let src: Vec<u8> = (0..z as u8).collect();
        let dbl = doubled(&src);
        for shift in 0..z {
            let mut acc = vec![0u8; z];
            xor_rotate(Kernel::Scalar, &mut acc, &dbl, shift, z);
            let expected: Vec<u8> = (0..z).map(|i| src[(shift + i) % z]).collect();
            assert_eq!(acc, expected);
        }
    }

    #[test]
    fn all_kernels_agree() {
        let z = 208;
        let src: Vec<u8> = (0..z).map(|i| (i % 2) as u8).collect();
        let dbl = doubled(&src);
        for shift in [0usize, 1, 37, 207] {
            let mut scalar_acc = vec![0u8; z];
            xor_rotate(Kernel::Scalar, &mut scalar_acc, &dbl, shift, z);

            let mut avx2_acc = vec![0u8; z];
            xor_rotate(Kernel::Avx2, &mut avx2_acc, &dbl, shift, z);
            assert_eq!(scalar_acc, avx2_acc);

            let mut avx512_acc = vec![0u8; z];
            xor_rotate(Kernel::Avx512, &mut avx512_acc, &dbl, shift, z);
            assert_eq!(scalar_acc, avx512_acc);
        }
    }
}
