use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::deadline::Deadline;
use crate::mx::MxHost;

use super::error::SessionError;
use super::options::SmtpSettings;
use super::types::{AttemptStage as Stage, SessionState as State, SmtpReply, parse_code};

const MAX_LINE: usize = 4096;

/// Byte stream a session talks over. Implemented for [`TcpStream`]; tests
/// plug in scripted in-memory streams.
pub trait Transport: Read + Write {
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()>;

    fn shutdown(&mut self) {}
}

impl Transport for TcpStream {
    fn set_io_timeout(&mut self, timeout: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(timeout))?;
        self.set_write_timeout(Some(timeout))
    }

    fn shutdown(&mut self) {
        let _ = TcpStream::shutdown(self, Shutdown::Both);
    }
}

/// One connection to one mail exchanger, driven through
/// `Connected -> Greeted -> SenderSet -> Completed` (or `Failed`).
///
/// Several `RCPT TO` may be issued while in `SenderSet`. Dropping the session
/// sends `QUIT` when the connection is still usable, then closes it.
pub struct SmtpSession<T: Transport = TcpStream> {
    host: String,
    stream: T,
    buffer: Vec<u8>,
    state: State,
    alive: bool,
    closed: bool,
    response_timeout: Duration,
    deadline: Deadline,
    transcript: Vec<String>,
}

impl SmtpSession<TcpStream> {
    /// Opens a TCP connection to `mx`, trying each resolved address in turn.
    pub fn connect(
        mx: &MxHost,
        settings: &SmtpSettings,
        deadline: Deadline,
    ) -> Result<Self, SessionError> {
        let addrs: Vec<SocketAddr> = (mx.host.as_str(), settings.port)
            .to_socket_addrs()
            .map_err(|source| SessionError::Resolve {
                host: mx.host.clone(),
                source,
            })?
            .collect();

        let mut last_err = None;
        for addr in &addrs {
            let timeout = deadline
                .bound(settings.connect_timeout)
                .ok_or(SessionError::DeadlineExceeded)?;
            match TcpStream::connect_timeout(addr, timeout) {
                Ok(stream) => {
                    tracing::debug!(host = %mx.host, %addr, "connected");
                    return Ok(Self::from_transport(
                        mx.host.clone(),
                        stream,
                        settings.response_timeout,
                    )
                    .with_deadline(deadline));
                }
                Err(err) => {
                    tracing::debug!(host = %mx.host, %addr, error = %err, "connect attempt failed");
                    last_err = Some(err);
                }
            }
        }

        Err(SessionError::Connect {
            host: mx.host.clone(),
            source: last_err.unwrap_or_else(|| {
                io::Error::new(io::ErrorKind::AddrNotAvailable, "no socket address available")
            }),
        })
    }
}

impl<T: Transport> SmtpSession<T> {
    /// Wraps an already connected stream; the session starts in `Connected`.
    pub fn from_transport(host: impl Into<String>, stream: T, response_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            stream,
            buffer: Vec::new(),
            state: State::Connected,
            alive: true,
            closed: false,
            response_timeout,
            deadline: Deadline::none(),
            transcript: Vec::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Deadline) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Greeting, EHLO (HELO fallback) and MAIL FROM in one go.
    pub fn handshake(&mut self, helo: &str, sender: &str) -> Result<(), SessionError> {
        self.greet(helo)?;
        self.set_sender(sender)
    }

    pub fn greet(&mut self, helo: &str) -> Result<(), SessionError> {
        self.require(Stage::Greeting, State::Connected)?;

        let banner = self.exchange(Stage::Greeting, None)?;
        if banner.code != 220 {
            return Err(self.refused(Stage::Greeting, banner.code));
        }

        let ehlo = self.exchange(Stage::Ehlo, Some(&format!("EHLO {helo}")))?;
        if ehlo.code != 250 {
            tracing::debug!(host = %self.host, code = ehlo.code, "EHLO refused, retrying with HELO");
            let reply = self.exchange(Stage::Helo, Some(&format!("HELO {helo}")))?;
            if reply.code != 250 {
                return Err(self.refused(Stage::Helo, reply.code));
            }
        }

        self.state = State::Greeted;
        Ok(())
    }

    pub fn set_sender(&mut self, sender: &str) -> Result<(), SessionError> {
        self.require(Stage::MailFrom, State::Greeted)?;
        self.single_line(sender)?;
        let reply = self.exchange(Stage::MailFrom, Some(&format!("MAIL FROM:<{sender}>")))?;
        if reply.code != 250 {
            return Err(self.refused(Stage::MailFrom, reply.code));
        }
        self.state = State::SenderSet;
        Ok(())
    }

    /// Proposes `address` as a recipient and returns the raw reply. The
    /// session stays in `SenderSet` whatever the server answers.
    pub fn rcpt_to(&mut self, address: &str) -> Result<SmtpReply, SessionError> {
        self.require(Stage::RcptTo, State::SenderSet)?;
        self.single_line(address)?;
        self.exchange(Stage::RcptTo, Some(&format!("RCPT TO:<{address}>")))
    }

    /// Best-effort `QUIT`, then closes the socket. Idempotent.
    pub fn quit(&mut self) {
        if self.closed {
            return;
        }
        let failed = self.state == State::Failed;
        if self.alive {
            if let Err(err) = self.exchange(Stage::Quit, Some("QUIT")) {
                tracing::debug!(host = %self.host, error = %err, "QUIT not acknowledged");
            }
        }
        self.close_stream();
        self.state = if failed { State::Failed } else { State::Completed };
    }

    /// Closes the socket without QUIT.
    pub fn abort(&mut self) {
        if self.closed {
            return;
        }
        tracing::debug!(host = %self.host, "aborting session");
        self.close_stream();
        self.state = State::Failed;
    }

    fn close_stream(&mut self) {
        self.stream.shutdown();
        self.alive = false;
        self.closed = true;
    }

    fn require(&mut self, stage: Stage, expected: State) -> Result<(), SessionError> {
        if self.state == expected && !self.closed {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                stage,
                state: self.state,
            })
        }
    }

    /// Command arguments must not smuggle extra lines onto the wire.
    fn single_line(&self, argument: &str) -> Result<(), SessionError> {
        if argument.contains(|c| c == '\r' || c == '\n') {
            return Err(SessionError::protocol(
                &self.host,
                format!("line break in argument {argument:?}"),
            ));
        }
        Ok(())
    }

    fn refused(&mut self, stage: Stage, code: u16) -> SessionError {
        tracing::warn!(host = %self.host, %stage, code, "command refused");
        self.state = State::Failed;
        SessionError::Refused {
            host: self.host.clone(),
            stage,
            code,
        }
    }

    /// Sends `command` (if any) and reads one complete reply. Any failure
    /// moves the session to `Failed`.
    fn exchange(&mut self, stage: Stage, command: Option<&str>) -> Result<SmtpReply, SessionError> {
        let result = self.try_exchange(stage, command);
        if let Err(err) = &result {
            if !err.leaves_connection_usable() {
                self.alive = false;
            }
            self.state = State::Failed;
        }
        result
    }

    fn try_exchange(&mut self, stage: Stage, command: Option<&str>) -> Result<SmtpReply, SessionError> {
        let timeout = self
            .deadline
            .bound(self.response_timeout)
            .ok_or(SessionError::DeadlineExceeded)?;
        self.stream
            .set_io_timeout(timeout)
            .map_err(|err| SessionError::io(&self.host, stage, err))?;

        if let Some(command) = command {
            self.record("C", command);
            tracing::debug!(host = %self.host, %stage, command, "smtp >");
            let mut line = command.as_bytes().to_vec();
            line.extend_from_slice(b"\r\n");
            self.stream
                .write_all(&line)
                .and_then(|()| self.stream.flush())
                .map_err(|err| SessionError::io(&self.host, stage, err))?;
        }

        let reply = self.read_reply(stage)?;
        tracing::debug!(host = %self.host, %stage, code = reply.code, "smtp <");
        Ok(reply)
    }

    /// Accumulates lines until one whose fourth byte is not `-`.
    fn read_reply(&mut self, stage: Stage) -> Result<SmtpReply, SessionError> {
        let mut code = None;
        let mut lines = Vec::new();
        loop {
            let line = self.read_line(stage)?;
            self.record("S", &line);
            let parsed = parse_code(&line)
                .ok_or_else(|| SessionError::protocol(&self.host, format!("invalid reply: {line}")))?;
            match code {
                None => code = Some(parsed),
                Some(existing) if existing != parsed => {
                    return Err(SessionError::protocol(
                        &self.host,
                        format!("inconsistent reply codes: {existing} vs {parsed}"),
                    ));
                }
                Some(_) => {}
            }
            let continuation = line.as_bytes().get(3) == Some(&b'-');
            lines.push(line.get(4..).unwrap_or_default().to_string());
            if !continuation {
                break;
            }
        }
        Ok(SmtpReply {
            code: code.unwrap_or_default(),
            lines,
        })
    }

    fn read_line(&mut self, stage: Stage) -> Result<String, SessionError> {
        loop {
            if let Some(pos) = self.buffer.iter().position(|byte| *byte == b'\n') {
                let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
                line.pop();
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                return String::from_utf8(line)
                    .map_err(|err| SessionError::protocol(&self.host, format!("utf8 error: {err}")));
            }
            if self.buffer.len() > MAX_LINE {
                return Err(SessionError::protocol(&self.host, "reply line too long"));
            }

            let mut chunk = [0u8; 512];
            let read = self
                .stream
                .read(&mut chunk)
                .map_err(|err| SessionError::io(&self.host, stage, err))?;
            if read == 0 {
                return Err(SessionError::Closed {
                    host: self.host.clone(),
                    stage,
                });
            }
            self.buffer.extend_from_slice(&chunk[..read]);
        }
    }

    fn record(&mut self, direction: &str, message: &str) {
        self.transcript
            .push(format!("[{}] {direction}: {message}", self.host));
    }
}

impl<T: Transport> Drop for SmtpSession<T> {
    fn drop(&mut self) {
        self.quit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::mock::ScriptedStream;

    const GREETING_OK: &[&str] = &[
        "220 mx.example.com ESMTP ready\r\n",
        "250-mx.example.com\r\n250-PIPELINING\r\n250 8BITMIME\r\n",
        "250 2.1.0 Ok\r\n",
    ];

    fn session(replies: &[&str]) -> (SmtpSession<ScriptedStream>, ScriptedStream) {
        let stream = ScriptedStream::new(replies);
        let handle = stream.clone();
        (
            SmtpSession::from_transport("mx.example.com", stream, Duration::from_secs(5)),
            handle,
        )
    }

    #[test]
    fn handshake_reaches_sender_set() {
        let (mut s, wire) = session(GREETING_OK);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        assert_eq!(s.state(), State::SenderSet);
        assert_eq!(
            wire.commands(),
            ["EHLO probe.local", "MAIL FROM:<verifier@probe.local>"]
        );
    }

    #[test]
    fn multiline_reply_is_accumulated() {
        let (mut s, _) = session(&[
            "220-mx.example.com first\r\n220 second\r\n",
            "250 ok\r\n",
        ]);
        s.greet("probe.local").expect("greet");
        assert_eq!(s.state(), State::Greeted);
        assert!(s.transcript().iter().any(|l| l.ends_with("S: 220 second")));
    }

    #[test]
    fn ehlo_refusal_falls_back_to_helo() {
        let (mut s, wire) = session(&[
            "220 ready\r\n",
            "502 5.5.1 command not implemented\r\n",
            "250 hello\r\n",
        ]);
        s.greet("probe.local").expect("HELO fallback");
        assert_eq!(wire.commands(), ["EHLO probe.local", "HELO probe.local"]);
    }

    #[test]
    fn helo_refusal_fails_host() {
        let (mut s, _) = session(&["220 ready\r\n", "500 no\r\n", "501 still no\r\n"]);
        let err = s.greet("probe.local").expect_err("both refused");
        assert!(matches!(
            err,
            SessionError::Refused {
                stage: Stage::Helo,
                code: 501,
                ..
            }
        ));
        assert_eq!(s.state(), State::Failed);
    }

    #[test]
    fn non_220_greeting_fails() {
        let (mut s, _) = session(&["554 go away\r\n"]);
        assert!(s.greet("probe.local").is_err());
        assert_eq!(s.state(), State::Failed);
    }

    #[test]
    fn rejected_sender_fails_host() {
        let (mut s, _) = session(&["220 ready\r\n", "250 hi\r\n", "550 sender denied\r\n"]);
        let err = s
            .handshake("probe.local", "verifier@probe.local")
            .expect_err("sender refused");
        assert!(matches!(err, SessionError::Refused { stage: Stage::MailFrom, .. }));
    }

    #[test]
    fn rcpt_requires_sender() {
        let (mut s, wire) = session(&[]);
        let err = s.rcpt_to("user@example.com").expect_err("no MAIL FROM yet");
        assert!(matches!(err, SessionError::InvalidState { .. }));
        assert!(wire.commands().is_empty());
    }

    #[test]
    fn stream_end_mid_reply_is_an_error() {
        let mut replies = GREETING_OK.to_vec();
        replies.push("250-partial\r\n");
        let (mut s, _) = session(&replies);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        let err = s.rcpt_to("user@example.com").expect_err("truncated");
        assert!(matches!(err, SessionError::Closed { .. }));
        assert_eq!(s.state(), State::Failed);
    }

    #[test]
    fn garbage_reply_is_protocol_error() {
        let (mut s, _) = session(&["hello there\r\n"]);
        let err = s.greet("probe.local").expect_err("garbage");
        assert!(matches!(err, SessionError::Protocol { .. }));
    }

    #[test]
    fn recipient_with_line_break_is_not_sent() {
        let mut replies = GREETING_OK.to_vec();
        replies.push("550 5.1.1 unknown\r\n");
        let (mut s, wire) = session(&replies);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        let err = s.rcpt_to("a@example.com\r\nRSET").expect_err("refused locally");
        assert!(matches!(err, SessionError::Protocol { .. }));
        assert_eq!(s.state(), State::SenderSet);

        let reply = s.rcpt_to("b@example.com").expect("reply");
        assert_eq!(reply.code, 550);
        assert_eq!(
            &wire.commands()[2..],
            ["RCPT TO:<b@example.com>"]
        );
    }

    #[test]
    fn garbage_rcpt_reply_still_gets_quit() {
        let mut replies = GREETING_OK.to_vec();
        replies.extend(["what?\r\n", "221 bye\r\n"]);
        let (mut s, wire) = session(&replies);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        let err = s.rcpt_to("user@example.com").expect_err("garbage");
        assert!(matches!(err, SessionError::Protocol { .. }));
        drop(s);
        assert_eq!(wire.commands().last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn drop_sends_quit_after_rcpt() {
        let mut replies = GREETING_OK.to_vec();
        replies.extend(["550 5.1.1 unknown\r\n", "221 bye\r\n"]);
        let (mut s, wire) = session(&replies);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        let reply = s.rcpt_to("nobody@example.com").expect("reply");
        assert_eq!(reply.code, 550);
        drop(s);
        assert_eq!(wire.commands().last().map(String::as_str), Some("QUIT"));
        assert!(wire.is_shut_down());
    }

    #[test]
    fn quit_is_idempotent() {
        let mut replies = GREETING_OK.to_vec();
        replies.push("221 bye\r\n");
        let (mut s, wire) = session(&replies);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        s.quit();
        s.quit();
        assert_eq!(s.state(), State::Completed);
        drop(s);
        let quits = wire.commands().iter().filter(|c| *c == "QUIT").count();
        assert_eq!(quits, 1);
    }

    #[test]
    fn refused_host_still_gets_quit() {
        let (s, wire) = {
            let (mut s, wire) = session(&["220 ready\r\n", "500 no\r\n", "501 no\r\n", "221 bye\r\n"]);
            let _ = s.greet("probe.local");
            (s, wire)
        };
        drop(s);
        assert_eq!(wire.commands().last().map(String::as_str), Some("QUIT"));
    }

    #[test]
    fn abort_skips_quit() {
        let (mut s, wire) = session(GREETING_OK);
        s.handshake("probe.local", "verifier@probe.local")
            .expect("handshake");
        s.abort();
        drop(s);
        assert!(!wire.commands().iter().any(|c| c == "QUIT"));
        assert!(wire.is_shut_down());
    }

    #[test]
    fn expired_deadline_blocks_commands() {
        let (s, _) = session(GREETING_OK);
        let mut s = s.with_deadline(Deadline::at(
            std::time::Instant::now() - Duration::from_millis(1),
        ));
        let err = s.greet("probe.local").expect_err("deadline");
        assert!(matches!(err, SessionError::DeadlineExceeded));
        assert_eq!(s.state(), State::Failed);
    }
}
