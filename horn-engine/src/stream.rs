//! Alias-keyed stream registry backing the I/O built-ins.
//!
//! A stream carries a source and/or a sink plus a pushback text
//! buffer.  `read_term/2` parses out of the buffer and refills it one
//! line at a time, so a clause spanning several lines is assembled
//! through the same insufficient-input protocol the parser uses
//! everywhere else.

use indexmap::IndexMap;
use smartstring::alias::String;
use std::io::{self, BufRead, Write};

/// The direction a stream was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamMode {
    Read,
    Write,
}

/// A named stream.
pub struct Stream {
    pub alias: String,
    pub mode: StreamMode,
    source: Option<Box<dyn BufRead>>,
    sink: Option<Box<dyn Write>>,
    /// Text read from the source but not yet consumed.
    pub pending: std::string::String,
    eof: bool,
}

impl Stream {
    pub fn reader(alias: &str, source: impl BufRead + 'static) -> Self {
        Self {
            alias: String::from(alias),
            mode: StreamMode::Read,
            source: Some(Box::new(source)),
            sink: None,
            pending: Default::default(),
            eof: false,
        }
    }

    pub fn writer(alias: &str, sink: impl Write + 'static) -> Self {
        Self {
            alias: String::from(alias),
            mode: StreamMode::Write,
            source: None,
            sink: Some(Box::new(sink)),
            pending: Default::default(),
            eof: false,
        }
    }

    /// Reads one more line from the source into the pushback buffer.
    /// Returns the number of bytes read; 0 means end of input.
    pub fn fill_line(&mut self) -> io::Result<usize> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        if self.eof {
            return Ok(0);
        }
        let mut line = Default::default();
        let n = source.read_line(&mut line)?;
        if n == 0 {
            self.eof = true;
        }
        self.pending.push_str(&line);
        Ok(n)
    }

    /// The next character, refilling from the source as needed.
    /// `None` at end of input.
    pub fn read_char(&mut self) -> io::Result<Option<char>> {
        while self.pending.is_empty() {
            if self.fill_line()? == 0 {
                return Ok(None);
            }
        }
        Ok(Some(self.pending.remove(0)))
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.write_all(s.as_bytes()),
            None => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match self.sink.as_mut() {
            Some(sink) => sink.flush(),
            None => Ok(()),
        }
    }

    pub fn can_read(&self) -> bool {
        self.source.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.sink.is_some()
    }
}

pub const USER_INPUT: &str = "user_input";
pub const USER_OUTPUT: &str = "user_output";

/// The registry of named streams plus the current input and output
/// aliases.
#[derive(Default)]
pub struct StreamTable {
    streams: IndexMap<String, Stream>,
    pub input_alias: String,
    pub output_alias: String,
}

impl StreamTable {
    pub fn new() -> Self {
        Self {
            streams: IndexMap::new(),
            input_alias: String::from(USER_INPUT),
            output_alias: String::from(USER_OUTPUT),
        }
    }

    /// Installs `r` as the stream aliased `user_input` and makes it
    /// the current input.
    pub fn set_user_input(&mut self, r: impl BufRead + 'static) {
        self.streams
            .insert(String::from(USER_INPUT), Stream::reader(USER_INPUT, r));
        self.input_alias = String::from(USER_INPUT);
    }

    /// Installs `w` as the stream aliased `user_output` and makes it
    /// the current output.
    pub fn set_user_output(&mut self, w: impl Write + 'static) {
        self.streams
            .insert(String::from(USER_OUTPUT), Stream::writer(USER_OUTPUT, w));
        self.output_alias = String::from(USER_OUTPUT);
    }

    pub fn insert(&mut self, stream: Stream) {
        self.streams.insert(stream.alias.clone(), stream);
    }

    pub fn get_mut(&mut self, alias: &str) -> Option<&mut Stream> {
        self.streams.get_mut(alias)
    }

    pub fn input_mut(&mut self) -> Option<&mut Stream> {
        let alias = self.input_alias.clone();
        self.streams.get_mut(&alias)
    }

    pub fn output_mut(&mut self) -> Option<&mut Stream> {
        let alias = self.output_alias.clone();
        self.streams.get_mut(&alias)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    #[test]
    fn read_char_walks_the_source() {
        let mut s = Stream::reader("test", BufReader::new(&b"ab\nc"[..]));
        assert_eq!(s.read_char().unwrap(), Some('a'));
        assert_eq!(s.read_char().unwrap(), Some('b'));
        assert_eq!(s.read_char().unwrap(), Some('\n'));
        assert_eq!(s.read_char().unwrap(), Some('c'));
        assert_eq!(s.read_char().unwrap(), None);
    }

    #[test]
    fn writers_collect_output() {
        let mut table = StreamTable::new();
        table.set_user_output(Vec::new());
        table.output_mut().unwrap().write_str("hello").unwrap();
        // The sink is type-erased; observable behavior is exercised
        // through the interpreter tests.
    }

    #[test]
    fn fill_line_reports_eof_once() {
        let mut s = Stream::reader("test", BufReader::new(&b"x"[..]));
        assert!(s.fill_line().unwrap() > 0);
        assert_eq!(s.fill_line().unwrap(), 0);
        assert_eq!(s.pending, "x");
    }
}
