//! S-expression reader: a byte cursor over program text, turned directly
//! into cells with no intermediate AST.
//!
//! A list missing its closing paren is tolerated: end-of-input simply
//! terminates the list with NIL, the same leniency the retrieved original
//! reader showed. Everything else malformed (an unterminated string, a
//! dangling quote, an unrecognized `#\` name) is fatal through
//! `PlatformPort::panic`, consistent with spec.md's "malformed input halts
//! the reader" stance for those cases.

use crate::platform::PlatformPort;
use crate::{CellRef, Runtime};

/// A cursor over the bytes of one source buffer. Carries no heap
/// reference; all allocation happens on the [`Runtime`] that drives it.
pub struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\n' | b'\r') => {
                    self.pos += 1;
                }
                Some(b';') => {
                    while !matches!(self.peek(), None | Some(b'\n')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }
}

const fn is_delimiter(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\n' | b'\r' | b'(' | b')' | b'"' | b'\'' | b';')
}

impl<P: PlatformPort, const HEAP: usize, const ROOTS: usize, const SYMBUF: usize, const STRBUF: usize>
    Runtime<P, HEAP, ROOTS, SYMBUF, STRBUF>
{
    /// Read one top-level form. `None` means clean end of input with no
    /// pending token (stray `)` at top level is skipped, not an error).
    pub fn read_expr(&mut self, reader: &mut Reader<'_>) -> Option<CellRef> {
        loop {
            reader.skip_whitespace_and_comments();
            match reader.peek() {
                None => return None,
                Some(b')') => {
                    reader.advance();
                    continue;
                }
                _ => return Some(self.read_one(reader)),
            }
        }
    }

    /// Read one form, assuming the caller has confirmed a token is present.
    /// Diverges if the token turns out to be malformed partway through.
    fn read_one(&mut self, reader: &mut Reader<'_>) -> CellRef {
        reader.skip_whitespace_and_comments();
        match reader.peek() {
            None => self.platform.panic("unexpected end of input"),
            Some(b'(') => {
                reader.advance();
                self.read_list(reader)
            }
            Some(b'\'') => {
                reader.advance();
                let inner = self.read_one(reader);
                self.heap.push_root(inner);
                let quote_sym = self.intern(b"quote");
                self.heap.push_root(quote_sym);
                let tail = self.cons(inner, CellRef::NIL);
                self.heap.push_root(tail);
                let result = self.cons(quote_sym, tail);
                self.heap.pop_roots(3);
                result
            }
            Some(b'#') => self.read_hash(reader),
            Some(b'"') => self.read_string(reader),
            Some(b'-') if matches!(reader.peek_at(1), Some(b'0'..=b'9')) => {
                reader.advance();
                let v = self.read_digits(reader);
                self.make_int(-v)
            }
            Some(b'0'..=b'9') => {
                let v = self.read_digits(reader);
                self.make_int(v)
            }
            _ => self.read_symbol(reader),
        }
    }

    fn read_list(&mut self, reader: &mut Reader<'_>) -> CellRef {
        reader.skip_whitespace_and_comments();
        match reader.peek() {
            None => CellRef::NIL, // unterminated list: EOF ends it, tolerated
            Some(b')') => {
                reader.advance();
                CellRef::NIL
            }
            _ => {
                let car = self.read_one(reader);
                self.heap.push_root(car);
                let cdr = self.read_list(reader);
                self.heap.push_root(cdr);
                let pair = self.cons(car, cdr);
                self.heap.pop_roots(2);
                pair
            }
        }
    }

    fn read_hash(&mut self, reader: &mut Reader<'_>) -> CellRef {
        reader.advance(); // '#'
        match reader.advance() {
            Some(b't') => CellRef::TRUE,
            Some(b'f') => CellRef::FALSE,
            Some(b'\\') => self.read_char_literal(reader),
            _ => self.platform.panic("malformed # literal"),
        }
    }

    fn read_char_literal(&mut self, reader: &mut Reader<'_>) -> CellRef {
        let start = reader.pos;
        // A literal's name runs at least one character, even if that
        // character is itself a delimiter (e.g. `#\(`).
        reader.advance();
        while let Some(b) = reader.peek() {
            if is_delimiter(b) {
                break;
            }
            reader.pos += 1;
        }
        let name = &reader.bytes[start..reader.pos];
        let c = match name {
            [only] => *only,
            b"newline" => b'\n',
            b"return" => b'\r',
            _ => self.platform.panic("unrecognized character literal"),
        };
        self.make_char(c)
    }

    fn read_string(&mut self, reader: &mut Reader<'_>) -> CellRef {
        reader.advance(); // opening quote
        let start = reader.pos;
        loop {
            match reader.advance() {
                None => self.platform.panic("unterminated string literal"),
                Some(b'"') => break,
                Some(_) => {}
            }
        }
        let bytes = &reader.bytes[start..reader.pos - 1];
        self.make_string(bytes)
    }

    fn read_digits(&mut self, reader: &mut Reader<'_>) -> i32 {
        let mut v: i64 = 0;
        while let Some(b @ b'0'..=b'9') = reader.peek() {
            reader.advance();
            v = v * 10 + i64::from(b - b'0');
        }
        v as i32
    }

    fn read_symbol(&mut self, reader: &mut Reader<'_>) -> CellRef {
        let start = reader.pos;
        while let Some(b) = reader.peek() {
            if is_delimiter(b) {
                break;
            }
            reader.pos += 1;
        }
        if reader.pos == start {
            // nothing recognizable under the cursor at all
            self.platform.panic("unrecognized token");
        }
        let name = &reader.bytes[start..reader.pos];
        self.intern(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::cell::CellData;
    use crate::platform::mock::MockPlatform;
    use crate::reader::Reader;
    use crate::{CellRef, Runtime};

    fn new_rt<'a>(disk: &'a mut [u8]) -> Runtime<MockPlatform<'a>, 256, 256, 512, 512> {
        Runtime::new(MockPlatform::new(b"", disk))
    }

    #[test]
    fn reads_integer() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"42");
        let v = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(v), CellData::Int(42)));
    }

    #[test]
    fn reads_negative_integer() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"-7");
        let v = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(v), CellData::Int(-7)));
    }

    #[test]
    fn reads_booleans() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"#t #f");
        assert_eq!(rt.read_expr(&mut reader).unwrap(), CellRef::TRUE);
        assert_eq!(rt.read_expr(&mut reader).unwrap(), CellRef::FALSE);
    }

    #[test]
    fn reads_char_literals() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"#\\a #\\newline #\\return");
        let a = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(a), CellData::Char(b'a')));
        let nl = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(nl), CellData::Char(b'\n')));
        let cr = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(cr), CellData::Char(b'\r')));
    }

    #[test]
    fn reads_string_without_escape_processing() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"\"hello world\"");
        let s = rt.read_expr(&mut reader).unwrap();
        assert_eq!(rt.string_bytes(s), b"hello world");
    }

    #[test]
    fn reads_symbol() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"foo-bar!");
        let s = rt.read_expr(&mut reader).unwrap();
        assert_eq!(rt.symbol_bytes(s), b"foo-bar!");
    }

    #[test]
    fn reads_nested_list() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"(+ 1 (* 2 3))");
        let expr = rt.read_expr(&mut reader).unwrap();
        match *rt.get(expr) {
            CellData::Pair { car, cdr } => {
                assert_eq!(rt.symbol_bytes(car), b"+");
                match *rt.get(cdr) {
                    CellData::Pair { car: one, cdr: rest } => {
                        assert!(matches!(rt.get(one), CellData::Int(1)));
                        match *rt.get(rest) {
                            CellData::Pair { car: inner, cdr: tail } => {
                                assert!(matches!(rt.get(tail), CellData::Nil));
                                match *rt.get(inner) {
                                    CellData::Pair { car: star, .. } => {
                                        assert_eq!(rt.symbol_bytes(star), b"*");
                                    }
                                    _ => panic!("expected inner list"),
                                }
                            }
                            _ => panic!("expected pair"),
                        }
                    }
                    _ => panic!("expected pair"),
                }
            }
            _ => panic!("expected pair"),
        }
    }

    #[test]
    fn unterminated_list_ends_at_eof() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"(1 2");
        let expr = rt.read_expr(&mut reader).unwrap();
        match *rt.get(expr) {
            CellData::Pair { car: first, cdr } => {
                assert!(matches!(rt.get(first), CellData::Int(1)));
                match *rt.get(cdr) {
                    CellData::Pair { car: second, cdr: tail } => {
                        assert!(matches!(rt.get(second), CellData::Int(2)));
                        assert!(matches!(rt.get(tail), CellData::Nil));
                    }
                    _ => panic!("expected pair"),
                }
            }
            _ => panic!("expected pair"),
        }
    }

    #[test]
    fn quote_shorthand_expands() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"'foo");
        let expr = rt.read_expr(&mut reader).unwrap();
        match *rt.get(expr) {
            CellData::Pair { car: quote_sym, cdr } => {
                assert_eq!(rt.symbol_bytes(quote_sym), b"quote");
                match *rt.get(cdr) {
                    CellData::Pair { car: sym, cdr: tail } => {
                        assert_eq!(rt.symbol_bytes(sym), b"foo");
                        assert!(matches!(rt.get(tail), CellData::Nil));
                    }
                    _ => panic!("expected pair"),
                }
            }
            _ => panic!("expected pair"),
        }
    }

    #[test]
    fn reads_multiple_top_level_forms_in_sequence() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"1 2 3");
        assert!(matches!(rt.get(rt.read_expr(&mut reader).unwrap()), CellData::Int(1)));
        assert!(matches!(rt.get(rt.read_expr(&mut reader).unwrap()), CellData::Int(2)));
        assert!(matches!(rt.get(rt.read_expr(&mut reader).unwrap()), CellData::Int(3)));
        assert!(rt.read_expr(&mut reader).is_none());
    }

    #[test]
    fn skips_line_comments() {
        let mut disk = [0u8; 16];
        let mut rt = new_rt(&mut disk);
        let mut reader = Reader::new(b"; a comment\n42");
        let v = rt.read_expr(&mut reader).unwrap();
        assert!(matches!(rt.get(v), CellData::Int(42)));
    }
}
