use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use lightsheet_core::error::PipelineError;
use lightsheet_core::report::{Notification, Notifier, SmtpNotifier};

fn message() -> Notification {
    Notification {
        sender: "lightsheet@example.org".into(),
        recipient: "owner@example.org".into(),
        subject: "Your Lightsheet processing job finished successfully".into(),
        body: "Dear recipient,\n.\nKind regards".into(),
    }
}

/// Serve one SMTP session, replying with `rcpt_reply` to RCPT, and return
/// every line the client sent.
fn fake_relay(rcpt_reply: &'static str) -> (String, thread::JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut writer = stream.try_clone().unwrap();
        let mut reader = BufReader::new(stream);
        let mut received = Vec::new();
        let mut in_data = false;

        writer.write_all(b"220 relay ready\r\n").unwrap();
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).unwrap() == 0 {
                break;
            }
            let line = line.trim_end_matches("\r\n").to_string();
            received.push(line.clone());
            if in_data {
                if line == "." {
                    in_data = false;
                    writer.write_all(b"250 queued\r\n").unwrap();
                }
                continue;
            }
            let reply: &str = if line.starts_with("HELO") {
                "250-relay\r\n250 hello\r\n"
            } else if line.starts_with("MAIL FROM") {
                "250 ok\r\n"
            } else if line.starts_with("RCPT TO") {
                rcpt_reply
            } else if line == "DATA" {
                in_data = true;
                "354 go ahead\r\n"
            } else if line == "QUIT" {
                writer.write_all(b"221 bye\r\n").unwrap();
                break;
            } else {
                "500 unknown\r\n"
            };
            writer.write_all(reply.as_bytes()).unwrap();
        }
        received
    });
    (addr, handle)
}

#[test]
fn test_smtp_session_delivers_message() {
    let (addr, relay) = fake_relay("250 ok\r\n");
    SmtpNotifier::new(addr)
        .with_timeout(Duration::from_secs(5))
        .send(&message())
        .unwrap();

    let received = relay.join().unwrap();
    assert_eq!(received[0], "HELO localhost");
    assert_eq!(received[1], "MAIL FROM:<lightsheet@example.org>");
    assert_eq!(received[2], "RCPT TO:<owner@example.org>");
    assert_eq!(received[3], "DATA");
    assert!(received.contains(&"Subject: Your Lightsheet processing job finished successfully".to_string()));
    // The lone dot in the body is stuffed so it does not end the message.
    assert!(received.contains(&"..".to_string()));
    assert_eq!(received.last().map(String::as_str), Some("QUIT"));
}

#[test]
fn test_rejected_recipient_is_an_error() {
    let (addr, relay) = fake_relay("550 no such user\r\n");
    let err = SmtpNotifier::new(addr)
        .with_timeout(Duration::from_secs(5))
        .send(&message())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Notification(ref m) if m.contains("550")));
    drop(relay);
}

#[test]
fn test_unreachable_relay_is_an_error() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = SmtpNotifier::new(addr)
        .with_timeout(Duration::from_secs(2))
        .send(&message())
        .unwrap_err();
    assert!(matches!(err, PipelineError::Notification(_)));
}
