use super::{Dict, Error, Kind, Value};

/// Maximum nesting of lists and dictionaries.
pub const MAX_DEPTH: usize = 64;

/// Decode the first value of `buf`.
///
/// Returns the value and how many bytes of `buf` it used, bytes after the
/// value are left untouched.
///
/// Lists and dictionaries nested deeper than [`MAX_DEPTH`] are rejected
/// with [`Error::InvalidFormat`].
pub fn decode(buf: &[u8]) -> Result<(Value, usize), Error> {
    let mut parser = Parser { buf, pos: 0 };
    let value = parser.value(0)?;
    Ok((value, parser.pos))
}

/// Decode a buffer that must contain exactly one value.
pub fn decode_exact(buf: &[u8]) -> Result<Value, Error> {
    let (value, read) = decode(buf)?;
    if read != buf.len() {
        return Err(Error::TrailingData(buf.len() - read));
    }
    Ok(value)
}

struct Parser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<u8> {
        self.buf.get(self.pos).copied()
    }

    fn has_more(&self) -> bool {
        self.pos < self.buf.len()
    }

    /// Advance until `byte` is found, returning the bytes skipped. The
    /// cursor stops on `byte`, or at the end of the buffer if it is absent.
    fn take_until(&mut self, byte: u8) -> Option<&'a [u8]> {
        let buf = self.buf;
        let start = self.pos;
        let offset = buf[start..].iter().position(|b| *b == byte)?;
        self.pos = start + offset;
        Some(&buf[start..self.pos])
    }

    fn value(&mut self, depth: usize) -> Result<Value, Error> {
        match self.peek() {
            None => Err(Error::UnexpectedEndOfInput),
            Some(b'i') => self.integer(),
            Some(b'l') => self.list(depth),
            Some(b'd') => self.dict(depth),
            Some(b'0'..=b'9') => self.bytes().map(Value::Bytes),
            Some(b) => Err(Error::MalformedInput(b)),
        }
    }

    // i<number>e
    fn integer(&mut self) -> Result<Value, Error> {
        if self.peek() != Some(Kind::Integer.prefix()) {
            return Err(Error::MissingPrefix(Kind::Integer));
        }
        self.pos += 1;

        let digits = self
            .take_until(Kind::Integer.suffix())
            .ok_or(Error::MissingSuffix(Kind::Integer))?;

        let n = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(Error::InvalidFormat(Kind::Integer))?;

        // skip 'e'
        self.pos += 1;
        Ok(Value::Integer(n))
    }

    // <len>:<bytes>
    fn bytes(&mut self) -> Result<Vec<u8>, Error> {
        if !matches!(self.peek(), Some(b'0'..=b'9')) {
            return Err(Error::MissingPrefix(Kind::ByteString));
        }

        let digits = self
            .take_until(Kind::ByteString.suffix())
            .ok_or(Error::MissingSuffix(Kind::ByteString))?;

        let len = std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(Error::InvalidFormat(Kind::ByteString))?;

        // skip ':'
        self.pos += 1;

        let available = self.buf.len() - self.pos;
        if len > available {
            return Err(Error::OutOfBounds { declared: len, available });
        }

        let bytes = self.buf[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(bytes)
    }

    // l<values>e
    fn list(&mut self, depth: usize) -> Result<Value, Error> {
        if depth >= MAX_DEPTH {
            return Err(Error::InvalidFormat(Kind::List));
        }
        self.pos += 1;

        let mut list = Vec::new();
        while self.has_more() && self.peek() != Some(Kind::List.suffix()) {
            list.push(self.value(depth + 1)?);
        }

        if !self.has_more() {
            return Err(Error::MissingSuffix(Kind::List));
        }

        self.pos += 1;
        Ok(Value::List(list))
    }

    // d<key><value>...e
    //
    // Keys are not required to be sorted. If a key repeats, the last
    // occurrence wins.
    fn dict(&mut self, depth: usize) -> Result<Value, Error> {
        if depth >= MAX_DEPTH {
            return Err(Error::InvalidFormat(Kind::Dictionary));
        }
        self.pos += 1;

        let mut dict = Dict::new();
        while self.has_more() && self.peek() != Some(Kind::Dictionary.suffix())
        {
            if !matches!(self.peek(), Some(b'0'..=b'9')) {
                return Err(Error::InvalidFormat(Kind::Dictionary));
            }
            let key = self.bytes()?;
            if !self.has_more() {
                return Err(Error::MissingSuffix(Kind::Dictionary));
            }
            let value = self.value(depth + 1)?;
            dict.insert(key, value);
        }

        if !self.has_more() {
            return Err(Error::MissingSuffix(Kind::Dictionary));
        }

        self.pos += 1;
        Ok(Value::Dict(dict))
    }
}
