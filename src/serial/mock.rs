//! Scripted in-memory channel for tests
//!
//! Replays a fixed sequence of device output. When it has nothing to hand
//! out it sleeps for the current read timeout and reports `TimedOut`, the
//! same way a real serial port behaves while the board is busy.

use crate::serial::Channel;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::rc::Rc;
use std::thread;
use std::time::Duration;

enum Step {
    Bytes(Vec<u8>),
    Quiet,
    AwaitWrite,
    ReadError(ErrorKind),
    Eof,
}

pub struct ScriptedChannel {
    steps: VecDeque<Step>,
    pending: VecDeque<u8>,
    timeout: Duration,
    repeat: Option<Vec<u8>>,
    repeat_quiet: bool,
    write_error: Option<ErrorKind>,
    written: Rc<RefCell<Vec<u8>>>,
    write_calls: Rc<RefCell<usize>>,
}

impl ScriptedChannel {
    pub fn new() -> Self {
        Self {
            steps: VecDeque::new(),
            pending: VecDeque::new(),
            timeout: Duration::from_millis(10),
            repeat: None,
            repeat_quiet: false,
            write_error: None,
            written: Rc::new(RefCell::new(Vec::new())),
            write_calls: Rc::new(RefCell::new(0)),
        }
    }

    /// Queue a newline-terminated line
    pub fn line(self, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(b'\n');
        self.raw(&bytes)
    }

    /// Queue raw bytes
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.steps.push_back(Step::Bytes(bytes.to_vec()));
        self
    }

    /// Queue one read that times out
    pub fn quiet(mut self) -> Self {
        self.steps.push_back(Step::Quiet);
        self
    }

    /// Hold everything after this point until the host writes something
    pub fn await_write(mut self) -> Self {
        self.steps.push_back(Step::AwaitWrite);
        self
    }

    /// Queue a read that fails with `kind`
    pub fn read_error(mut self, kind: ErrorKind) -> Self {
        self.steps.push_back(Step::ReadError(kind));
        self
    }

    /// Close the channel: every later read returns zero bytes
    pub fn eof(mut self) -> Self {
        self.steps.push_back(Step::Eof);
        self
    }

    /// Once the script runs out, keep sending `text` followed by a quiet read
    pub fn repeating(mut self, text: &str) -> Self {
        let mut bytes = text.as_bytes().to_vec();
        bytes.push(b'\n');
        self.repeat = Some(bytes);
        self
    }

    /// Make every write fail with `kind`
    pub fn failing_writes(mut self, kind: ErrorKind) -> Self {
        self.write_error = Some(kind);
        self
    }

    /// Shared view of every byte written so far
    pub fn written(&self) -> Rc<RefCell<Vec<u8>>> {
        Rc::clone(&self.written)
    }

    /// Shared count of successful `write` calls
    pub fn write_calls(&self) -> Rc<RefCell<usize>> {
        Rc::clone(&self.write_calls)
    }

    fn idle(&self) -> io::Result<usize> {
        thread::sleep(self.timeout);
        Err(io::Error::new(ErrorKind::TimedOut, "Operation timed out"))
    }

    /// Move the next step's bytes into `pending`, or report why there are none
    fn refill(&mut self) -> Option<io::Result<usize>> {
        loop {
            match self.steps.pop_front() {
                Some(Step::AwaitWrite) => {
                    if *self.write_calls.borrow() == 0 {
                        self.steps.push_front(Step::AwaitWrite);
                        return Some(self.idle());
                    }
                }
                Some(Step::Bytes(bytes)) => {
                    self.pending.extend(bytes);
                    return None;
                }
                Some(Step::ReadError(kind)) => {
                    return Some(Err(io::Error::new(kind, "scripted read failure")));
                }
                Some(Step::Eof) => {
                    self.steps.push_front(Step::Eof);
                    return Some(Ok(0));
                }
                Some(Step::Quiet) => return Some(self.idle()),
                None => {
                    let Some(bytes) = self.repeat.clone() else {
                        return Some(self.idle());
                    };
                    self.repeat_quiet = !self.repeat_quiet;
                    if self.repeat_quiet {
                        self.pending.extend(bytes);
                        return None;
                    }
                    return Some(self.idle());
                }
            }
        }
    }
}

impl Channel for ScriptedChannel {
    fn set_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.timeout = timeout;
        Ok(())
    }
}

impl Read for ScriptedChannel {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.pending.is_empty() {
            if let Some(result) = self.refill() {
                return result;
            }
        }
        let mut n = 0;
        while n < buf.len() {
            match self.pending.pop_front() {
                Some(b) => {
                    buf[n] = b;
                    n += 1;
                }
                None => break,
            }
        }
        Ok(n)
    }
}

impl Write for ScriptedChannel {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if let Some(kind) = self.write_error {
            return Err(io::Error::new(kind, "scripted write failure"));
        }
        self.written.borrow_mut().extend_from_slice(buf);
        *self.write_calls.borrow_mut() += 1;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
