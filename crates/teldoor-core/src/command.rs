// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Line framing and command parsing for the teldoor wire protocol.
// Author: Lukas Bower

//! Line framing and command parsing for the teldoor wire protocol.

use heapless::Vec as HeaplessVec;
use thiserror::Error;

use crate::verb::ShellVerb;

/// Maximum length accepted for a single command line.
pub const MAX_LINE_LEN: usize = 512;

/// Shell command variants produced by the parser.
#[derive(Clone, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum Command {
    Help,
    Ls,
    Touch { name: String },
    Mkdir { name: String },
    Cd { target: String },
    Rm { name: String },
    Copy { src: String, dst: String },
    Cat { name: String },
    Nick { name: String },
    Exit,
}

impl Command {
    /// Return the verb associated with the command.
    #[must_use]
    pub fn verb(&self) -> ShellVerb {
        match self {
            Self::Help => ShellVerb::Help,
            Self::Ls => ShellVerb::Ls,
            Self::Touch { .. } => ShellVerb::Touch,
            Self::Mkdir { .. } => ShellVerb::Mkdir,
            Self::Cd { .. } => ShellVerb::Cd,
            Self::Rm { .. } => ShellVerb::Rm,
            Self::Copy { .. } => ShellVerb::Copy,
            Self::Cat { .. } => ShellVerb::Cat,
            Self::Nick { .. } => ShellVerb::Nick,
            Self::Exit => ShellVerb::Exit,
        }
    }

    /// Parse a full command line into a command value.
    ///
    /// Tokens beyond a verb's arity are ignored, matching the wire
    /// behaviour clients already rely on.
    pub fn parse_line(line: &str) -> Result<Self, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }
        let mut parts = line.split_whitespace();
        let token = parts.next().unwrap();
        let verb = ShellVerb::from_token(token).ok_or(ParseError::UnknownVerb)?;

        match verb {
            ShellVerb::Help => Ok(Self::Help),
            ShellVerb::Ls => Ok(Self::Ls),
            ShellVerb::Exit => Ok(Self::Exit),
            ShellVerb::Touch => Ok(Self::Touch {
                name: required(parts.next(), "filename")?,
            }),
            ShellVerb::Mkdir => Ok(Self::Mkdir {
                name: required(parts.next(), "dirname")?,
            }),
            ShellVerb::Cd => Ok(Self::Cd {
                target: required(parts.next(), "path")?,
            }),
            ShellVerb::Rm => Ok(Self::Rm {
                name: required(parts.next(), "name")?,
            }),
            ShellVerb::Copy => Ok(Self::Copy {
                src: required(parts.next(), "src")?,
                dst: required(parts.next(), "target")?,
            }),
            ShellVerb::Cat => Ok(Self::Cat {
                name: required(parts.next(), "filename")?,
            }),
            ShellVerb::Nick => Ok(Self::Nick {
                name: required(parts.next(), "nickname")?,
            }),
        }
    }
}

fn required(token: Option<&str>, argument: &'static str) -> Result<String, ParseError> {
    token
        .map(str::to_owned)
        .ok_or(ParseError::MissingArgument(argument))
}

/// Errors surfaced by the line framer and command parser.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    /// A line exceeded the framer's buffer capacity.
    #[error("command line exceeded {MAX_LINE_LEN} bytes")]
    LineTooLong,
    /// The line held no tokens at all.
    #[error("empty command")]
    EmptyLine,
    /// The first token matched no known verb.
    #[error("unrecognized verb")]
    UnknownVerb,
    /// A required positional argument was absent.
    #[error("missing required argument: {0}")]
    MissingArgument(&'static str),
}

/// Per-connection accumulator reassembling newline-delimited commands
/// from arbitrarily fragmented reads.
///
/// Bytes are buffered until a `\n` arrives; `\r` is ignored so both
/// `\n` and `\r\n` terminators work, and backspace (0x08/0x7f) erases
/// the previous byte for interactive telnet clients.
#[derive(Debug, Default)]
pub struct LineFramer {
    buffer: HeaplessVec<u8, MAX_LINE_LEN>,
}

impl LineFramer {
    /// Create a new framer instance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear any partially buffered line bytes.
    pub fn clear(&mut self) -> bool {
        let had_data = !self.buffer.is_empty();
        self.buffer.clear();
        had_data
    }

    /// Consume a single input byte, returning a complete line once the
    /// terminator arrives. Overflow discards the buffered line.
    pub fn push_byte(&mut self, byte: u8) -> Result<Option<String>, ParseError> {
        match byte {
            b'\r' => Ok(None),
            b'\n' => {
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                Ok(Some(line))
            }
            0x08 | 0x7f => {
                self.buffer.pop();
                Ok(None)
            }
            _ => {
                if byte.is_ascii_control() {
                    return Ok(None);
                }
                if self.buffer.push(byte).is_err() {
                    self.buffer.clear();
                    return Err(ParseError::LineTooLong);
                }
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(framer: &mut LineFramer, input: &str) -> Vec<String> {
        let mut lines = Vec::new();
        for byte in input.as_bytes() {
            if let Some(line) = framer.push_byte(*byte).expect("framer accepts input") {
                lines.push(line);
            }
        }
        lines
    }

    fn parse(input: &str) -> Result<Command, ParseError> {
        Command::parse_line(input)
    }

    #[test]
    fn help_command_parses() {
        assert_eq!(parse("--help").unwrap(), Command::Help);
    }

    #[test]
    fn touch_requires_filename() {
        assert_eq!(
            parse("touch").unwrap_err(),
            ParseError::MissingArgument("filename")
        );
    }

    #[test]
    fn copy_requires_both_arguments() {
        assert_eq!(
            parse("copy only-src").unwrap_err(),
            ParseError::MissingArgument("target")
        );
        let cmd = parse("copy a b").unwrap();
        assert_eq!(
            cmd,
            Command::Copy {
                src: "a".to_owned(),
                dst: "b".to_owned()
            }
        );
    }

    #[test]
    fn extra_tokens_are_ignored()  {
        let cmd = parse("touch notes.txt trailing junk").unwrap();
        assert_eq!(
            cmd,
            Command::Touch {
                name: "notes.txt".to_owned()
            }
        );
    }

    #[test]
    fn unknown_verb_is_reported() {
        assert_eq!(parse("frobnicate now").unwrap_err(), ParseError::UnknownVerb);
    }

    #[test]
    fn blank_line_is_empty() {
        assert_eq!(parse("   ").unwrap_err(), ParseError::EmptyLine);
    }

    #[test]
    fn framer_reassembles_fragmented_command() {
        let mut framer = LineFramer::new();
        assert!(frame(&mut framer, "to").is_empty());
        let lines = frame(&mut framer, "uch x\n");
        assert_eq!(lines, vec!["touch x".to_owned()]);
    }

    #[test]
    fn framer_handles_crlf_terminators() {
        let mut framer = LineFramer::new();
        let lines = frame(&mut framer, "ls\r\nmkdir a\r\n");
        assert_eq!(lines, vec!["ls".to_owned(), "mkdir a".to_owned()]);
    }

    #[test]
    fn framer_yields_empty_line_for_bare_newline() {
        let mut framer = LineFramer::new();
        assert_eq!(frame(&mut framer, "\n"), vec![String::new()]);
    }

    #[test]
    fn framer_backspace_erases() {
        let mut framer = LineFramer::new();
        let lines = frame(&mut framer, "lz\x08s\n");
        assert_eq!(lines, vec!["ls".to_owned()]);
    }

    #[test]
    fn framer_recovers_after_overflow() {
        let mut framer = LineFramer::new();
        let mut overflowed = false;
        for byte in std::iter::repeat(b'a').take(MAX_LINE_LEN + 1) {
            if framer.push_byte(byte) == Err(ParseError::LineTooLong) {
                overflowed = true;
                break;
            }
        }
        assert!(overflowed);
        let lines = frame(&mut framer, "ls\n");
        assert_eq!(lines, vec!["ls".to_owned()]);
    }

    #[test]
    fn framer_preserves_utf8_arguments() {
        let mut framer = LineFramer::new();
        let lines = frame(&mut framer, "touch файл.txt\n");
        assert_eq!(lines, vec!["touch файл.txt".to_owned()]);
    }
}
