//! Encodes and decodes a [`Value`] to/from a self-describing raw byte
//! buffer.
//!
//! The exact wire layout is a local implementation choice — it is not part
//! of HELICS wire compatibility, which this crate does not implement (see
//! Non-goals). The only contract that matters is §8 property 1:
//! `decode(encode(v)) == v` for every value, and the first byte of the
//! buffer always identifies the encoded [`PrimaryType`].

use crate::value::{Complex, NamedPoint, PrimaryType, Value};

/// Encode a value to its raw wire form. The first byte is always the
/// [`PrimaryType`] discriminant.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = vec![value.primary_type() as u8];
    match value {
        Value::Double(d) => buf.extend_from_slice(&d.to_le_bytes()),
        Value::Int(i) => buf.extend_from_slice(&i.to_le_bytes()),
        Value::String(s) => buf.extend_from_slice(s.as_bytes()),
        Value::Complex(c) => {
            buf.extend_from_slice(&c.re.to_le_bytes());
            buf.extend_from_slice(&c.im.to_le_bytes());
        }
        Value::Vector(v) => {
            buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
            for d in v {
                buf.extend_from_slice(&d.to_le_bytes());
            }
        }
        Value::ComplexVector(v) => {
            buf.extend_from_slice(&(v.len() as u32).to_le_bytes());
            for c in v {
                buf.extend_from_slice(&c.re.to_le_bytes());
                buf.extend_from_slice(&c.im.to_le_bytes());
            }
        }
        Value::NamedPoint(p) => {
            let name_bytes = p.name.as_bytes();
            buf.extend_from_slice(&(name_bytes.len() as u32).to_le_bytes());
            buf.extend_from_slice(name_bytes);
            buf.extend_from_slice(&p.value.to_le_bytes());
        }
        Value::Boolean(b) => buf.push(u8::from(*b)),
        Value::Time(t) => buf.extend_from_slice(&t.as_seconds().to_le_bytes()),
    }
    buf
}

/// Decode a raw buffer produced by [`encode`]. Returns `None` if the buffer
/// is too short or otherwise malformed for the type its prefix claims.
pub fn decode(bytes: &[u8]) -> Option<Value> {
    let (&tag, rest) = bytes.split_first()?;
    let primary = PrimaryType::ALL.get(tag as usize).copied()?;
    match primary {
        PrimaryType::Double => Some(Value::Double(read_f64(rest)?)),
        PrimaryType::Int => Some(Value::Int(read_i64(rest)?)),
        PrimaryType::String => Some(Value::String(String::from_utf8(rest.to_vec()).ok()?)),
        PrimaryType::Complex => {
            let re = read_f64(rest.get(0..8)?)?;
            let im = read_f64(rest.get(8..16)?)?;
            Some(Value::Complex(Complex::new(re, im)))
        }
        PrimaryType::Vector => {
            let count = read_u32(rest.get(0..4)?)? as usize;
            let mut out = Vec::with_capacity(count);
            let mut offset = 4;
            for _ in 0..count {
                out.push(read_f64(rest.get(offset..offset + 8)?)?);
                offset += 8;
            }
            Some(Value::Vector(out))
        }
        PrimaryType::ComplexVector => {
            let count = read_u32(rest.get(0..4)?)? as usize;
            let mut out = Vec::with_capacity(count);
            let mut offset = 4;
            for _ in 0..count {
                let re = read_f64(rest.get(offset..offset + 8)?)?;
                let im = read_f64(rest.get(offset + 8..offset + 16)?)?;
                out.push(Complex::new(re, im));
                offset += 16;
            }
            Some(Value::ComplexVector(out))
        }
        PrimaryType::NamedPoint => {
            let name_len = read_u32(rest.get(0..4)?)? as usize;
            let name = String::from_utf8(rest.get(4..4 + name_len)?.to_vec()).ok()?;
            let value = read_f64(rest.get(4 + name_len..12 + name_len)?)?;
            Some(Value::NamedPoint(NamedPoint { name, value }))
        }
        PrimaryType::Boolean => Some(Value::Boolean(*rest.first()? != 0)),
        PrimaryType::Time => Some(Value::Time(crate::time::SimTime::from_seconds(read_f64(
            rest,
        )?))),
    }
}

fn read_f64(bytes: &[u8]) -> Option<f64> {
    Some(f64::from_le_bytes(bytes.try_into().ok()?))
}

fn read_i64(bytes: &[u8]) -> Option<i64> {
    Some(i64::from_le_bytes(bytes.try_into().ok()?))
}

fn read_u32(bytes: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(v: Value) {
        let encoded = encode(&v);
        assert_eq!(decode(&encoded), Some(v));
    }

    #[test]
    fn roundtrips_every_primary_type() {
        roundtrip(Value::Double(3.5));
        roundtrip(Value::Int(-42));
        roundtrip(Value::String("hello co-sim".into()));
        roundtrip(Value::Complex(Complex::new(1.0, -2.0)));
        roundtrip(Value::Vector(vec![1.0, 2.0, 3.0]));
        roundtrip(Value::Vector(vec![]));
        roundtrip(Value::ComplexVector(vec![Complex::new(1.0, 2.0)]));
        roundtrip(Value::NamedPoint(NamedPoint {
            name: "sensor-7".into(),
            value: 12.5,
        }));
        roundtrip(Value::Boolean(true));
        roundtrip(Value::Boolean(false));
        roundtrip(Value::Time(crate::time::SimTime::from_seconds(86400.0)));
    }

    #[test]
    fn decode_identifies_type_from_prefix_alone() {
        let encoded = encode(&Value::Double(1.0));
        assert_eq!(encoded[0], PrimaryType::Double as u8);
    }

    #[test]
    fn decode_rejects_truncated_buffer() {
        let mut encoded = encode(&Value::Double(1.0));
        encoded.truncate(3);
        assert!(decode(&encoded).is_none());
    }

    #[test]
    fn decode_rejects_empty_buffer() {
        assert!(decode(&[]).is_none());
    }

    #[test]
    fn decode_rejects_invalid_utf8_string() {
        let mut bytes = vec![PrimaryType::String as u8];
        bytes.extend_from_slice(&[0xff, 0xfe]);
        assert!(decode(&bytes).is_none());
    }
}
