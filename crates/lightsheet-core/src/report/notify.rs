use std::io::{BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::debug;

use crate::error::{PipelineError, Result};

use super::{JobOutcome, Report};

/// A plain-text message for the job owner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub sender: String,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl Notification {
    /// Build the end-of-job message for `report`.
    pub fn for_report(report: &Report, sender: &str, recipient: &str) -> Self {
        let minutes = report.total_minutes();
        let (subject, detail) = match &report.outcome {
            JobOutcome::Succeeded => (
                "Your Lightsheet processing job finished successfully".to_string(),
                format!(
                    "Your file {} has been successfully processed ({minutes} min).",
                    report.name
                ),
            ),
            JobOutcome::Failed { stage, message } => (
                "Your Lightsheet processing job failed".to_string(),
                format!(
                    "Processing of your file {} stopped at stage \"{stage}\" after {minutes} min:\n{message}",
                    report.name
                ),
            ),
        };
        Self {
            sender: sender.to_string(),
            recipient: recipient.to_string(),
            subject,
            body: format!(
                "Dear recipient,\n\nThis is an automated message from the lightsheet stitching pipeline.\n{detail}\n\nKind regards"
            ),
        }
    }

    /// RFC 5322 message with CRLF line endings and dot-stuffed body lines.
    pub fn to_wire(&self) -> String {
        let mut out = format!(
            "From: {}\r\nTo: {}\r\nSubject: {}\r\n\r\n",
            self.sender, self.recipient, self.subject
        );
        for line in self.body.lines() {
            if line.starts_with('.') {
                out.push('.');
            }
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// Outbound message transport.
pub trait Notifier {
    fn send(&self, message: &Notification) -> Result<()>;
}

/// Minimal SMTP submission to a fixed relay, no authentication.
pub struct SmtpNotifier {
    relay: String,
    timeout: Duration,
}

impl SmtpNotifier {
    pub fn new(relay: impl Into<String>) -> Self {
        Self {
            relay: relay.into(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn connect(&self) -> Result<TcpStream> {
        let addr = self
            .relay
            .to_socket_addrs()
            .map_err(|e| smtp_error(format!("cannot resolve {}: {e}", self.relay)))?
            .next()
            .ok_or_else(|| smtp_error(format!("{} has no address", self.relay)))?;
        let stream = TcpStream::connect_timeout(&addr, self.timeout)
            .map_err(|e| smtp_error(format!("cannot connect to {}: {e}", self.relay)))?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;
        Ok(stream)
    }
}

fn smtp_error(message: String) -> PipelineError {
    PipelineError::Notification(message)
}

struct Session {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Session {
    /// Read one (possibly multi-line) reply and check its code.
    fn expect(&mut self, accepted: &[u16]) -> Result<()> {
        loop {
            let mut line = String::new();
            let read = self
                .reader
                .read_line(&mut line)
                .map_err(|e| smtp_error(format!("read failed: {e}")))?;
            if read == 0 {
                return Err(smtp_error("relay closed the connection".into()));
            }
            let code: u16 = line
                .get(..3)
                .and_then(|c| c.parse().ok())
                .ok_or_else(|| smtp_error(format!("malformed reply {:?}", line.trim_end())))?;
            // "250-..." continues a multi-line reply, "250 ..." ends it.
            if line.as_bytes().get(3) == Some(&b'-') {
                continue;
            }
            debug!(code, reply = line.trim_end(), "SMTP reply");
            return if accepted.contains(&code) {
                Ok(())
            } else {
                Err(smtp_error(format!("unexpected reply {}", line.trim_end())))
            };
        }
    }

    fn command(&mut self, line: &str, accepted: &[u16]) -> Result<()> {
        self.writer
            .write_all(format!("{line}\r\n").as_bytes())
            .map_err(|e| smtp_error(format!("write failed: {e}")))?;
        self.expect(accepted)
    }
}

impl Notifier for SmtpNotifier {
    fn send(&self, message: &Notification) -> Result<()> {
        let stream = self.connect()?;
        let mut session = Session {
            reader: BufReader::new(stream.try_clone()?),
            writer: stream,
        };

        session.expect(&[220])?;
        session.command("HELO localhost", &[250])?;
        session.command(&format!("MAIL FROM:<{}>", message.sender), &[250])?;
        session.command(&format!("RCPT TO:<{}>", message.recipient), &[250, 251])?;
        session.command("DATA", &[354])?;
        session.command(&format!("{}.", message.to_wire()), &[250])?;
        // The message is accepted at this point; a failed QUIT changes nothing.
        let _ = session.command("QUIT", &[221]);
        Ok(())
    }
}
