use std::collections::BTreeMap;

/// A bencoded dictionary. Keys are raw byte strings, kept sorted so that
/// encoding is canonical.
pub type Dict = BTreeMap<Vec<u8>, Value>;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Integer(i64),
    /// A byte string, which may or may not be valid UTF-8.
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Dict(Dict),
}

impl Value {
    /// Create a byte string from UTF-8 text.
    pub fn string(s: &str) -> Self {
        Value::Bytes(s.as_bytes().to_vec())
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// The byte string as text, if it is one and it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        self.as_bytes().and_then(|b| std::str::from_utf8(b).ok())
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Value::Dict(d) => Some(d),
            _ => None,
        }
    }

    /// Lookup a key of a dictionary. Returns `None` for any other type.
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        self.as_dict().and_then(|d| d.get(key))
    }

    /// Render the value as JSON, for inspection.
    ///
    /// Byte strings become JSON strings, invalid UTF-8 sequences are
    /// replaced with U+FFFD. Dictionary keys keep their sorted order.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Integer(n) => Json::from(*n),
            Value::Bytes(b) => {
                Json::String(String::from_utf8_lossy(b).into_owned())
            }
            Value::List(l) => Json::Array(l.iter().map(Value::to_json).collect()),
            Value::Dict(d) => Json::Object(
                d.iter()
                    .map(|(k, v)| {
                        (String::from_utf8_lossy(k).into_owned(), v.to_json())
                    })
                    .collect(),
            ),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::string(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Dict> for Value {
    fn from(value: Dict) -> Self {
        Value::Dict(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors() {
        let v = Value::Integer(52);
        assert_eq!(v.as_integer(), Some(52));
        assert_eq!(v.as_bytes(), None);

        let v = Value::from("hello");
        assert_eq!(v.as_str(), Some("hello"));
        assert_eq!(v.as_list(), None);

        let v = Value::Bytes(vec![0xff, 0xfe]);
        assert_eq!(v.as_str(), None);
        assert_eq!(v.as_bytes(), Some(&[0xff, 0xfe][..]));

        let mut d = Dict::new();
        d.insert(b"foo".to_vec(), Value::from("bar"));
        let v = Value::from(d);
        assert_eq!(v.get(b"foo").and_then(Value::as_str), Some("bar"));
        assert_eq!(v.get(b"baz"), None);
    }

    #[test]
    fn json() {
        let mut d = Dict::new();
        d.insert(b"hello".to_vec(), Value::Integer(52));
        d.insert(b"foo".to_vec(), Value::from("bar"));
        d.insert(b"list".to_vec(), Value::List(vec![]));

        let json = Value::from(d).to_json();
        assert_eq!(
            json.to_string(),
            r#"{"foo":"bar","hello":52,"list":[]}"#
        );

        let json = Value::List(vec![]).to_json();
        assert_eq!(json.to_string(), "[]");
    }
}
