//! Vectorized bulk kernels for the built-in converters.
//!
//! Each kernel transforms whole 128-bit lanes from `src` to `dst` and returns how many
//! elements it handled; the caller finishes the tail with the scalar formula. `src` and
//! `dst` may be the same pointer. SSE2 is part of the x86_64 baseline, so no runtime
//! feature detection is needed. Other targets handle nothing here.

#[cfg(target_arch = "x86_64")]
mod sse2 {
    use std::arch::x86_64::*;

    macro_rules! kernel {
        ($name:ident, $t:ty, |$v:ident| $body:expr) => {
            #[inline]
            pub(crate) unsafe fn $name(src: *const $t, dst: *mut $t, len: usize) -> usize {
                const LANES: usize = 16 / std::mem::size_of::<$t>();
                let mut i = 0;
                while i + LANES <= len {
                    let $v = _mm_loadu_si128(src.add(i) as *const __m128i);
                    _mm_storeu_si128(dst.add(i) as *mut __m128i, $body);
                    i += LANES;
                }
                i
            }
        };
    }

    // v - MIN == v ^ MIN in twos-complement
    kernel!(flip_sign_u8, u8, |v| _mm_xor_si128(v, _mm_set1_epi8(i8::MIN)));
    kernel!(flip_sign_u16, u16, |v| _mm_xor_si128(v, _mm_set1_epi16(i16::MIN)));
    kernel!(flip_sign_u32, u32, |v| _mm_xor_si128(v, _mm_set1_epi32(i32::MIN)));
    kernel!(flip_sign_u64, u64, |v| _mm_xor_si128(v, _mm_set1_epi64x(i64::MIN)));

    // negative lanes get every bit except the sign flipped: v ^ (neg_mask & !SIGN)
    kernel!(sign_magnitude_u8, u8, |v| _mm_xor_si128(
        v,
        _mm_andnot_si128(_mm_set1_epi8(i8::MIN), _mm_cmplt_epi8(v, _mm_setzero_si128()))
    ));
    kernel!(sign_magnitude_u16, u16, |v| _mm_xor_si128(
        v,
        _mm_andnot_si128(_mm_set1_epi16(i16::MIN), _mm_srai_epi16::<15>(v))
    ));
    kernel!(sign_magnitude_u32, u32, |v| _mm_xor_si128(
        v,
        _mm_andnot_si128(_mm_set1_epi32(i32::MIN), _mm_srai_epi32::<31>(v))
    ));
    // no 64-bit arithmetic shift in SSE2: broadcast the sign of each high dword instead
    kernel!(sign_magnitude_u64, u64, |v| _mm_xor_si128(
        v,
        _mm_andnot_si128(
            _mm_set1_epi64x(i64::MIN),
            _mm_shuffle_epi32::<0xF5>(_mm_srai_epi32::<31>(v))
        )
    ));
}

#[cfg(not(target_arch = "x86_64"))]
mod portable {
    macro_rules! kernel {
        ($($name:ident: $t:ty),*) => {
            $(
                #[inline(always)]
                pub(crate) unsafe fn $name(_src: *const $t, _dst: *mut $t, _len: usize) -> usize {
                    0
                }
            )*
        };
    }

    kernel!(
        flip_sign_u8: u8,
        flip_sign_u16: u16,
        flip_sign_u32: u32,
        flip_sign_u64: u64,
        sign_magnitude_u8: u8,
        sign_magnitude_u16: u16,
        sign_magnitude_u32: u32,
        sign_magnitude_u64: u64
    );
}

#[cfg(not(target_arch = "x86_64"))]
pub(crate) use portable::*;
#[cfg(target_arch = "x86_64")]
pub(crate) use sse2::*;
