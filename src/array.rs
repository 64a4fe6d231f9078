// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Typed, dynamically-shaped arrays shared by the table readers, the column
//! materializer and the store.

use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::{c32, c64};

/// A value that stands in for an unobserved grid cell.
pub trait Missing: Clone {
    fn missing() -> Self;
}

impl Missing for f32 {
    fn missing() -> Self {
        f32::NAN
    }
}

impl Missing for f64 {
    fn missing() -> Self {
        f64::NAN
    }
}

impl Missing for c32 {
    fn missing() -> Self {
        c32::new(f32::NAN, f32::NAN)
    }
}

impl Missing for c64 {
    fn missing() -> Self {
        c64::new(f64::NAN, f64::NAN)
    }
}

/// Unobserved data are flagged.
impl Missing for bool {
    fn missing() -> Self {
        true
    }
}

impl Missing for i32 {
    fn missing() -> Self {
        i32::MIN
    }
}

impl Missing for i64 {
    fn missing() -> Self {
        i64::MIN
    }
}

impl Missing for String {
    fn missing() -> Self {
        String::new()
    }
}

/// The element type of an [`ArrayData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DType {
    Bool,
    Int32,
    Int64,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Str,
}

/// An n-dimensional array of one of the element types found in measurement
/// sets.
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    Bool(ArrayD<bool>),
    Int32(ArrayD<i32>),
    Int64(ArrayD<i64>),
    Float32(ArrayD<f32>),
    Float64(ArrayD<f64>),
    Complex64(ArrayD<c32>),
    Complex128(ArrayD<c64>),
    Str(ArrayD<String>),
}

/// Apply `$body` to the inner array of every variant, rewrapping the result
/// in the same variant.
macro_rules! map_array {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($a) => ArrayData::Bool($body),
            ArrayData::Int32($a) => ArrayData::Int32($body),
            ArrayData::Int64($a) => ArrayData::Int64($body),
            ArrayData::Float32($a) => ArrayData::Float32($body),
            ArrayData::Float64($a) => ArrayData::Float64($body),
            ArrayData::Complex64($a) => ArrayData::Complex64($body),
            ArrayData::Complex128($a) => ArrayData::Complex128($body),
            ArrayData::Str($a) => ArrayData::Str($body),
        }
    };
}

/// Apply `$body` to the inner array of every variant.
macro_rules! with_array {
    ($data:expr, $a:ident => $body:expr) => {
        match $data {
            ArrayData::Bool($a) => $body,
            ArrayData::Int32($a) => $body,
            ArrayData::Int64($a) => $body,
            ArrayData::Float32($a) => $body,
            ArrayData::Float64($a) => $body,
            ArrayData::Complex64($a) => $body,
            ArrayData::Complex128($a) => $body,
            ArrayData::Str($a) => $body,
        }
    };
}

pub(crate) use map_array;
pub(crate) use with_array;

impl ArrayData {
    pub fn dtype(&self) -> DType {
        match self {
            ArrayData::Bool(_) => DType::Bool,
            ArrayData::Int32(_) => DType::Int32,
            ArrayData::Int64(_) => DType::Int64,
            ArrayData::Float32(_) => DType::Float32,
            ArrayData::Float64(_) => DType::Float64,
            ArrayData::Complex64(_) => DType::Complex64,
            ArrayData::Complex128(_) => DType::Complex128,
            ArrayData::Str(_) => DType::Str,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// The length along `axis`, or `None` if the array has fewer axes.
    pub fn len_of(&self, axis: usize) -> Option<usize> {
        self.shape().get(axis).copied()
    }

    /// Select the given indices along the first axis (rows).
    pub fn select_rows(&self, rows: &[usize]) -> ArrayData {
        map_array!(self, a => a.select(Axis(0), rows))
    }

    /// Reverse the order of elements along `axis`.
    pub fn reversed(&self, axis: usize) -> ArrayData {
        map_array!(self, a => {
            let mut v = a.view();
            v.invert_axis(Axis(axis));
            v.to_owned()
        })
    }

    /// The values of a one-dimensional floating-point array as `f64`.
    pub fn to_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            ArrayData::Float64(a) if a.ndim() == 1 => Some(a.iter().copied().collect()),
            ArrayData::Float32(a) if a.ndim() == 1 => Some(a.iter().map(|&v| v as f64).collect()),
            _ => None,
        }
    }

    /// The values of a one-dimensional integer array as `i32`.
    pub fn to_i32_vec(&self) -> Option<Vec<i32>> {
        match self {
            ArrayData::Int32(a) if a.ndim() == 1 => Some(a.iter().copied().collect()),
            ArrayData::Int64(a) if a.ndim() == 1 => {
                a.iter().map(|&v| i32::try_from(v).ok()).collect()
            }
            _ => None,
        }
    }

    /// Build a one-dimensional array of strings.
    pub fn from_strs<S: AsRef<str>>(values: &[S]) -> ArrayData {
        ArrayData::Str(ArrayD::from_shape_fn(IxDyn(&[values.len()]), |i| {
            values[i[0]].as_ref().to_string()
        }))
    }
}

macro_rules! impl_from_vec {
    ($t:ty, $variant:ident) => {
        impl From<Vec<$t>> for ArrayData {
            fn from(v: Vec<$t>) -> Self {
                ArrayData::$variant(Array1::from(v).into_dyn())
            }
        }

        impl From<ArrayD<$t>> for ArrayData {
            fn from(a: ArrayD<$t>) -> Self {
                ArrayData::$variant(a)
            }
        }
    };
}

impl_from_vec!(bool, Bool);
impl_from_vec!(i32, Int32);
impl_from_vec!(i64, Int64);
impl_from_vec!(f32, Float32);
impl_from_vec!(f64, Float64);
impl_from_vec!(c32, Complex64);
impl_from_vec!(c64, Complex128);
impl_from_vec!(String, Str);

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_missing_sentinels() {
        assert!(f32::missing().is_nan());
        assert!(f64::missing().is_nan());
        assert!(c32::missing().re.is_nan() && c32::missing().im.is_nan());
        assert!(bool::missing());
        assert_eq!(i32::missing(), i32::MIN);
    }

    #[test]
    fn test_select_rows_and_reverse() {
        let data = ArrayData::from(array![[1.0f64, 2.0], [3.0, 4.0], [5.0, 6.0]].into_dyn());
        let selected = data.select_rows(&[2, 0]);
        assert_eq!(
            selected,
            ArrayData::Float64(array![[5.0, 6.0], [1.0, 2.0]].into_dyn())
        );
        let reversed = data.reversed(1);
        assert_eq!(
            reversed,
            ArrayData::Float64(array![[2.0, 1.0], [4.0, 3.0], [6.0, 5.0]].into_dyn())
        );
    }

    #[test]
    fn test_conversions() {
        let times = ArrayData::from(vec![1.0f32, 2.0]);
        assert_eq!(times.to_f64_vec(), Some(vec![1.0, 2.0]));
        assert_eq!(times.to_i32_vec(), None);
        let ants = ArrayData::from(vec![0i64, 7]);
        assert_eq!(ants.to_i32_vec(), Some(vec![0, 7]));
        assert_eq!(ArrayData::from_strs(&["XX", "YY"]).shape(), &[2]);
    }
}
