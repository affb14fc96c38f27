use bytes::{BufMut, BytesMut};

use super::Value;

/// Encode a value into its canonical bencoded form.
///
/// Dictionary keys are emitted in ascending byte order, so two equal
/// values always produce the same bytes, no matter in which order their
/// keys were decoded.
pub fn encode(value: &Value) -> Vec<u8> {
    let mut buf = BytesMut::new();
    encode_value(value, &mut buf);
    buf.to_vec()
}

fn encode_value(value: &Value, buf: &mut BytesMut) {
    match value {
        Value::Integer(n) => {
            buf.put_u8(b'i');
            buf.extend_from_slice(n.to_string().as_bytes());
            buf.put_u8(b'e');
        }
        Value::Bytes(b) => encode_bytes(b, buf),
        Value::List(list) => {
            buf.put_u8(b'l');
            for v in list {
                encode_value(v, buf);
            }
            buf.put_u8(b'e');
        }
        Value::Dict(dict) => {
            buf.put_u8(b'd');
            // BTreeMap iterates in ascending key order
            for (k, v) in dict {
                encode_bytes(k, buf);
                encode_value(v, buf);
            }
            buf.put_u8(b'e');
        }
    }
}

fn encode_bytes(b: &[u8], buf: &mut BytesMut) {
    buf.extend_from_slice(b.len().to_string().as_bytes());
    buf.put_u8(b':');
    buf.extend_from_slice(b);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bencode::{decode, decode_exact, Dict};

    #[test]
    fn known_vectors() {
        assert_eq!(encode(&Value::Integer(52)), b"i52e");
        assert_eq!(encode(&Value::Integer(-3)), b"i-3e");
        assert_eq!(encode(&Value::from("hello")), b"5:hello");
        assert_eq!(encode(&Value::List(vec![])), b"le");
        assert_eq!(encode(&Value::Dict(Dict::new())), b"de");
        assert_eq!(
            encode(&Value::List(vec![Value::from("hello"), Value::Integer(52)])),
            b"l5:helloi52ee"
        );
    }

    #[test]
    fn sorts_keys() {
        let unsorted = b"d5:helloi52e3:foo3:bare";
        let sorted = b"d3:foo3:bar5:helloi52ee";

        let a = decode_exact(unsorted).unwrap();
        let b = decode_exact(sorted).unwrap();

        assert_eq!(encode(&a), sorted);
        assert_eq!(encode(&a), encode(&b));
    }

    #[test]
    fn round_trip() {
        let mut inner = Dict::new();
        inner.insert(b"length".to_vec(), Value::Integer(92063));
        inner.insert(b"name".to_vec(), Value::from("sample.txt"));
        inner.insert(b"pieces".to_vec(), Value::Bytes(vec![0, 255, 7, 128]));

        let mut outer = Dict::new();
        outer.insert(b"info".to_vec(), Value::Dict(inner));
        outer.insert(
            b"list".to_vec(),
            Value::List(vec![
                Value::Integer(0),
                Value::Integer(i64::MIN),
                Value::Integer(i64::MAX),
                Value::List(vec![]),
                Value::Bytes(vec![]),
            ]),
        );

        let value = Value::Dict(outer);
        let buf = encode(&value);
        let (decoded, read) = decode(&buf).unwrap();

        assert_eq!(read, buf.len());
        assert_eq!(decoded, value);
    }
}
