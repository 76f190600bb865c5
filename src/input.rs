use std::{
    io::{stdin, BufRead, ErrorKind},
    sync::mpsc,
};

use crate::prelude::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMessage {
    /// A line including its trailing newline, if any.
    Line(String),
    Eof,
    Error(String),
}

pub type InputReceiver = Receiver<InputMessage>;
pub type InputSender = Sender<InputMessage>;

/// Reads stdin on a blocking thread, one line per [`LineReader::request`].
///
/// The thread only touches stdin while a request is outstanding, so a
/// foreground child started in between owns the terminal's input.
pub struct LineReader {
    requests: mpsc::Sender<()>,
    receiver: InputReceiver,
}

impl LineReader {
    /// Must be called from within a tokio runtime.
    pub fn spawn() -> Self {
        let (sender, receiver) = unbounded_channel();
        let (requests, pending) = mpsc::channel::<()>();

        tokio::task::spawn_blocking(move || read_lines(pending, sender));

        Self { requests, receiver }
    }

    /// Asks for the next line.
    pub fn request(&self) {
        if self.requests.send(()).is_err() {
            warn!("input thread is gone");
        }
    }

    pub async fn recv(&mut self) -> Option<InputMessage> {
        self.receiver.recv().await
    }
}

fn read_lines(pending: mpsc::Receiver<()>, sender: InputSender) {
    let stdin = stdin();

    for () in pending {
        let message = next_line(&mut stdin.lock());

        let last = !matches!(message, InputMessage::Line(_));
        if sender.send(message).is_err() || last {
            break;
        }
    }

    trace!("input thread finished");
}

/// Reads one line. Bytes that are not UTF-8 are replaced rather than
/// rejected, so only a failing read ends the input.
pub fn next_line<R: BufRead>(reader: &mut R) -> InputMessage {
    let mut line = Vec::new();

    loop {
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => return InputMessage::Eof,
            Ok(_) => return InputMessage::Line(String::from_utf8_lossy(&line).into_owned()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return InputMessage::Error(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn lines_keep_their_newline_until_eof() {
        let mut input = Cursor::new(b"echo a\necho b".to_vec());
        assert_eq!(next_line(&mut input), InputMessage::Line("echo a\n".into()));
        assert_eq!(next_line(&mut input), InputMessage::Line("echo b".into()));
        assert_eq!(next_line(&mut input), InputMessage::Eof);
    }

    #[test]
    fn invalid_utf8_does_not_end_input() {
        let mut input = Cursor::new(b"echo before\n\xff\xfe\necho after\n".to_vec());

        assert_eq!(
            next_line(&mut input),
            InputMessage::Line("echo before\n".into())
        );
        assert_eq!(
            next_line(&mut input),
            InputMessage::Line("\u{fffd}\u{fffd}\n".into())
        );
        assert_eq!(
            next_line(&mut input),
            InputMessage::Line("echo after\n".into())
        );
        assert_eq!(next_line(&mut input), InputMessage::Eof);
    }
}
