//! User controls, one command per line.
//!
//! ```text
//! start            resume processing
//! stop             stop processing and blank the output
//! device <id>      switch to another capture device
//! devices          list capture devices
//! quit             leave the viewer
//! ```

use anyhow::{anyhow, Result};
use std::io::BufRead;
use std::sync::mpsc::Sender;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Start,
    Stop,
    SelectDevice(String),
    ListDevices,
    Quit,
}

impl Control {
    /// Parse one line. Blank lines and `#` comments yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };
        let control = match command.to_lowercase().as_str() {
            "start" => Control::Start,
            "stop" => Control::Stop,
            "device" | "select" => {
                if rest.is_empty() {
                    return Err(anyhow!("'{}' needs a device id", command));
                }
                Control::SelectDevice(rest.to_string())
            }
            "devices" | "list" => Control::ListDevices,
            "quit" | "exit" | "q" => Control::Quit,
            other => return Err(anyhow!("unknown command '{}'", other)),
        };
        Ok(Some(control))
    }
}

/// Forward parsed controls from `reader` until EOF or the receiver hangs up.
///
/// Unparseable lines are logged and skipped. EOF sends nothing; the viewer
/// keeps running until it is told to quit or interrupted.
pub fn forward_controls<R: BufRead>(reader: R, tx: Sender<Control>) {
    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            Err(err) => {
                log::warn!("control input closed: {}", err);
                return;
            }
        };
        match Control::parse(&line) {
            Ok(Some(control)) => {
                if tx.send(control).is_err() {
                    return;
                }
            }
            Ok(None) => {}
            Err(err) => log::warn!("{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn parses_commands() {
        assert_eq!(Control::parse("start").unwrap(), Some(Control::Start));
        assert_eq!(Control::parse("  STOP ").unwrap(), Some(Control::Stop));
        assert_eq!(
            Control::parse("device /dev/video2").unwrap(),
            Some(Control::SelectDevice("/dev/video2".to_string()))
        );
        assert_eq!(
            Control::parse("device   stub://front ").unwrap(),
            Some(Control::SelectDevice("stub://front".to_string()))
        );
        assert_eq!(Control::parse("devices").unwrap(), Some(Control::ListDevices));
        assert_eq!(Control::parse("q").unwrap(), Some(Control::Quit));
        assert_eq!(Control::parse("# note").unwrap(), None);
        assert_eq!(Control::parse("").unwrap(), None);
    }

    #[test]
    fn rejects_bad_commands() {
        assert!(Control::parse("device").is_err());
        assert!(Control::parse("zoom 2").is_err());
    }

    #[test]
    fn forwards_until_eof_skipping_garbage() {
        let input = "start\nbogus\ndevice stub://front\n\nquit\n";
        let (tx, rx) = mpsc::channel();
        forward_controls(input.as_bytes(), tx);
        let received: Vec<Control> = rx.iter().collect();
        assert_eq!(
            received,
            vec![
                Control::Start,
                Control::SelectDevice("stub://front".to_string()),
                Control::Quit
            ]
        );
    }
}
