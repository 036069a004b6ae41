use std::cell::RefCell;
use std::io::{Result as IoResult, Write};
use std::process::Stdio;
use std::rc::Rc;

/// Output sink that keeps everything written to it in memory.
///
/// Clones share the same buffer, so one clone can be handed to a command while the
/// other is kept to read the result afterwards. External processes spawned with it
/// get a null stdout.
#[derive(Clone, Default)]
pub struct CapturedOutput {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded as UTF-8.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}

impl crate::command::Stdout for CapturedOutput {
    fn stdio(self: Box<Self>) -> Stdio {
        Stdio::null()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_buffer() {
        let out = CapturedOutput::new();
        let mut writer = out.clone();
        write!(writer, "hello ").unwrap();
        writeln!(writer, "world").unwrap();
        assert_eq!(out.contents(), "hello world\n");
    }
}
