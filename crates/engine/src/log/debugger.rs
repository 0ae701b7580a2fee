//! Debugger output for engine logs.
//!
//! Injected hosts rarely have a console, so debug builds also send every
//! formatted log line to the attached debugger. Lines are tagged with the
//! host module of the engine, since every engine in the process shares the
//! same debugger output.
#![cfg_attr(not(all(windows, debug_assertions)), allow(dead_code))]

use std::{io, sync::Arc};

use tracing_subscriber::fmt::MakeWriter;

use crate::registry::HostModule;

/// Debugger string for one formatted line, nul terminated.
pub(super) fn encode_line(tag: &str, line: &[u8]) -> Vec<u16> {
    let line = String::from_utf8_lossy(line);
    let mut out = Vec::with_capacity(tag.len() + line.len() + 1);
    out.extend(tag.encode_utf16());
    out.extend(line.encode_utf16());
    out.push(0);

    out
}

/// Writer factory producing one debugger message per log line.
#[derive(Debug, Clone)]
pub(super) struct DebuggerMakeWriter {
    tag: Arc<str>,
}

impl DebuggerMakeWriter {
    pub fn new(module: HostModule) -> Self {
        Self {
            tag: Arc::from(format!("[indicium {module}] ")),
        }
    }
}

impl<'a> MakeWriter<'a> for DebuggerMakeWriter {
    type Writer = DebuggerLine;

    fn make_writer(&'a self) -> Self::Writer {
        DebuggerLine {
            tag: self.tag.clone(),
            line: Vec::new(),
        }
    }
}

/// A line collected until the writer is dropped.
pub(super) struct DebuggerLine {
    tag: Arc<str>,
    line: Vec<u8>,
}

impl io::Write for DebuggerLine {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.line.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for DebuggerLine {
    fn drop(&mut self) {
        if self.line.is_empty() {
            return;
        }

        #[cfg(windows)]
        {
            use windows::{Win32::System::Diagnostics::Debug::OutputDebugStringW, core::PCWSTR};

            let message = encode_line(&self.tag, &self.line);
            unsafe {
                OutputDebugStringW(PCWSTR(message.as_ptr()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn line_is_tagged_and_terminated() {
        let encoded = encode_line("[indicium 0x1000] ", b"hooked\n");
        assert_eq!(encoded.last(), Some(&0));
        assert_eq!(
            String::from_utf16(&encoded[..encoded.len() - 1]).unwrap(),
            "[indicium 0x1000] hooked\n"
        );
    }

    #[test]
    fn invalid_utf8_is_replaced() {
        let encoded = encode_line("", &[b'a', 0xff]);
        assert_eq!(
            String::from_utf16(&encoded[..encoded.len() - 1]).unwrap(),
            "a\u{fffd}"
        );
    }

    #[test]
    fn writers_do_not_share_lines() {
        let make = DebuggerMakeWriter::new(HostModule::new(0x2000));
        let mut first = make.make_writer();
        let mut second = make.make_writer();
        first.write_all(b"one").unwrap();
        second.write_all(b"two").unwrap();

        assert_eq!(first.line, b"one");
        assert_eq!(second.line, b"two");
        assert_eq!(&*first.tag, "[indicium 0x2000] ");
    }
}
