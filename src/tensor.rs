//! Tensor codec
//!
//! A [`Tensor`] is one contiguous numeric array laid out as fixed-width
//! elements in native byte order, with no header, padding or length prefix.
//! The element count is implied by the byte length. Peers must share the byte
//! order; nothing here negotiates or converts it.

use byte_slice_cast::{AsByteSlice, ToByteSlice};
use byteorder::{ByteOrder, NativeEndian};
use bytes::Bytes;

use crate::error::{Error, Result};

/// Opaque byte buffer holding one encoded array.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Tensor(Bytes);

impl Tensor {
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    /// Length in bytes, not elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Tensor {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for Tensor {
    fn from(value: Vec<u8>) -> Self {
        Self(value.into())
    }
}

impl AsRef<[u8]> for Tensor {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// A numeric kind that can be carried in a [`Tensor`].
pub trait TensorElement: ToByteSlice + Copy + Default {
    /// Size of one element in bytes.
    const WIDTH: usize;

    /// Fills `dst` from `src`, which must be exactly `dst.len() * WIDTH` bytes.
    fn read_into(src: &[u8], dst: &mut [Self]);
}

impl TensorElement for f64 {
    const WIDTH: usize = 8;

    fn read_into(src: &[u8], dst: &mut [Self]) {
        NativeEndian::read_f64_into(src, dst)
    }
}

impl TensorElement for f32 {
    const WIDTH: usize = 4;

    fn read_into(src: &[u8], dst: &mut [Self]) {
        NativeEndian::read_f32_into(src, dst)
    }
}

impl TensorElement for i64 {
    const WIDTH: usize = 8;

    fn read_into(src: &[u8], dst: &mut [Self]) {
        NativeEndian::read_i64_into(src, dst)
    }
}

impl TensorElement for i32 {
    const WIDTH: usize = 4;

    fn read_into(src: &[u8], dst: &mut [Self]) {
        NativeEndian::read_i32_into(src, dst)
    }
}

/// Encodes the elements back to back in array order. Never fails, an empty
/// slice gives an empty tensor.
pub fn encode_array<T: TensorElement>(values: &[T]) -> Tensor {
    Tensor(Bytes::copy_from_slice(values.as_byte_slice()))
}

/// Same layout as a one-element array.
pub fn encode_scalar<T: TensorElement>(value: T) -> Tensor {
    encode_array(std::slice::from_ref(&value))
}

/// Reads the whole tensor as a flat array.
///
/// Fails with [`Error::MalformedTensor`] unless the byte length is a whole
/// multiple of `T::WIDTH`.
pub fn decode_array<T: TensorElement>(tensor: &Tensor) -> Result<Vec<T>> {
    let bytes = tensor.as_bytes();
    if bytes.len() % T::WIDTH != 0 {
        return Err(Error::MalformedTensor {
            len: bytes.len(),
            width: T::WIDTH,
        });
    }
    let mut values = vec![T::default(); bytes.len() / T::WIDTH];
    T::read_into(bytes, &mut values);
    Ok(values)
}

/// Reads the first element of the tensor.
///
/// Bytes past the first element are ignored. Fails with
/// [`Error::MalformedTensor`] if the tensor is shorter than one element.
pub fn decode_scalar<T: TensorElement>(tensor: &Tensor) -> Result<T> {
    let bytes = tensor.as_bytes();
    if bytes.len() < T::WIDTH {
        return Err(Error::MalformedTensor {
            len: bytes.len(),
            width: T::WIDTH,
        });
    }
    let mut value = [T::default()];
    T::read_into(&bytes[..T::WIDTH], &mut value);
    Ok(value[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(values: &[f64]) -> Vec<u64> {
        values.iter().map(|x| x.to_bits()).collect()
    }

    #[test]
    fn array_survives_bit_for_bit() {
        let values = [
            0.0,
            -0.0,
            1.5,
            -2.25e-300,
            f64::MAX,
            f64::MIN_POSITIVE,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NAN,
        ];
        let tensor = encode_array(&values);
        assert_eq!(tensor.len(), values.len() * 8);

        let decoded: Vec<f64> = decode_array(&tensor).unwrap();
        assert_eq!(bits(&decoded), bits(&values));
    }

    #[test]
    fn layout_is_native_order_without_prefix() {
        let tensor = encode_array(&[1.0f64, 2.0]);
        let mut expected = 1.0f64.to_ne_bytes().to_vec();
        expected.extend_from_slice(&2.0f64.to_ne_bytes());
        assert_eq!(tensor.as_bytes(), expected.as_slice());
    }

    #[test]
    fn empty_array_is_empty_tensor() {
        let tensor = encode_array::<f64>(&[]);
        assert!(tensor.is_empty());
        assert!(decode_array::<f64>(&tensor).unwrap().is_empty());
    }

    #[test]
    fn scalar_matches_single_element_array() {
        let x = -7.125f64;
        assert_eq!(encode_scalar(x), encode_array(&[x]));
        assert_eq!(decode_scalar::<f64>(&encode_scalar(x)).unwrap().to_bits(), x.to_bits());
        let nan = decode_scalar::<f64>(&encode_scalar(f64::NAN)).unwrap();
        assert_eq!(nan.to_bits(), f64::NAN.to_bits());
    }

    #[test]
    fn rejects_partial_elements() {
        let err = decode_array::<f64>(&Tensor::from(vec![0u8; 7])).unwrap_err();
        assert!(matches!(err, Error::MalformedTensor { len: 7, width: 8 }));

        let err = decode_scalar::<f64>(&Tensor::from(vec![0u8; 3])).unwrap_err();
        assert!(err.is_malformed_tensor());

        assert!(decode_scalar::<f64>(&Tensor::default()).is_err());
    }

    #[test]
    fn scalar_ignores_trailing_bytes() {
        let tensor = encode_array(&[0.5f64, 9.0, 10.0]);
        assert_eq!(decode_scalar::<f64>(&tensor).unwrap(), 0.5);

        let mut ragged = encode_scalar(4.0f64).into_bytes().to_vec();
        ragged.push(0xff);
        assert_eq!(decode_scalar::<f64>(&Tensor::from(ragged)).unwrap(), 4.0);
    }

    #[test]
    fn decodes_unaligned_buffers() {
        let mut raw = vec![0u8];
        raw.extend_from_slice(encode_array(&[3.0f64, 4.0]).as_bytes());
        let unaligned = Tensor::from(Bytes::from(raw).slice(1..));
        assert_eq!(decode_array::<f64>(&unaligned).unwrap(), vec![3.0, 4.0]);
    }

    #[test]
    fn width_follows_element_kind() {
        let tensor = encode_array(&[1.0f32, -1.0, 0.25]);
        assert_eq!(tensor.len(), 12);
        assert_eq!(decode_array::<f32>(&tensor).unwrap(), vec![1.0, -1.0, 0.25]);
        // 12 bytes is not a whole number of doubles
        assert!(decode_array::<f64>(&tensor).is_err());

        let ints = encode_array(&[i64::MIN, 0, i64::MAX]);
        assert_eq!(decode_array::<i64>(&ints).unwrap(), vec![i64::MIN, 0, i64::MAX]);
        assert_eq!(decode_scalar::<i32>(&encode_scalar(-5i32)).unwrap(), -5);
    }
}
