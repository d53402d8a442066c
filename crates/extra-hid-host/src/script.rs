use extra_hid_core::timing::BASE_CLOCK_RATE_ARM11;
use thiserror::Error;

/// Input slot targeted by a `bind` command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindTarget {
    Zl,
    Zr,
    CStick,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Deliver a request frame to the device.
    Send(Vec<u8>),
    /// Run the clock forward by this many milliseconds.
    Advance(u64),
    /// Point an input slot at a new param package and request a reload.
    Bind { target: BindTarget, params: String },
    /// Request a reload without changing settings.
    Reload,
    Disconnect,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command '{name}'")]
    UnknownCommand { line: usize, name: String },

    #[error("line {line}: '{command}' expects {expected}")]
    MissingArgument {
        line: usize,
        command: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: invalid byte '{token}'")]
    InvalidByte { line: usize, token: String },

    #[error("line {line}: invalid duration '{token}'")]
    InvalidDuration { line: usize, token: String },

    #[error("line {line}: unknown input '{token}' (expected zl, zr or c_stick)")]
    InvalidTarget { line: usize, token: String },
}

/// Parse a command script. Blank lines and `#` comments are ignored.
///
/// ```text
/// send 01 08 00      # status every 8 ms
/// advance 100
/// bind zl engine:fixed,pressed:1
/// ```
pub fn parse_script(text: &str) -> Result<Vec<Command>, ScriptError> {
    let mut commands = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };

        let command = match name {
            "send" => Command::Send(parse_bytes(line_no, rest)?),
            "advance" => Command::Advance(parse_duration(line_no, rest)?),
            "bind" => {
                let Some((target, params)) = rest.split_once(char::is_whitespace) else {
                    return Err(ScriptError::MissingArgument {
                        line: line_no,
                        command: "bind",
                        expected: "an input and a param package",
                    });
                };
                Command::Bind {
                    target: parse_target(line_no, target)?,
                    params: params.trim().to_string(),
                }
            }
            "reload" => Command::Reload,
            "disconnect" => Command::Disconnect,
            other => {
                return Err(ScriptError::UnknownCommand {
                    line: line_no,
                    name: other.to_string(),
                });
            }
        };
        commands.push(command);
    }

    Ok(commands)
}

fn parse_bytes(line: usize, rest: &str) -> Result<Vec<u8>, ScriptError> {
    rest.split_whitespace()
        .map(|token| {
            let digits = token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token);
            u8::from_str_radix(digits, 16).map_err(|_| ScriptError::InvalidByte {
                line,
                token: token.to_string(),
            })
        })
        .collect()
}

fn parse_duration(line: usize, rest: &str) -> Result<u64, ScriptError> {
    if rest.is_empty() {
        return Err(ScriptError::MissingArgument {
            line,
            command: "advance",
            expected: "a duration in milliseconds",
        });
    }
    let digits = rest.strip_suffix("ms").unwrap_or(rest).trim();
    // Durations must stay representable in clock cycles.
    digits
        .parse::<u64>()
        .ok()
        .filter(|ms| ms.checked_mul(BASE_CLOCK_RATE_ARM11).is_some())
        .ok_or_else(|| ScriptError::InvalidDuration {
            line,
            token: rest.to_string(),
        })
}

fn parse_target(line: usize, token: &str) -> Result<BindTarget, ScriptError> {
    match token.to_ascii_lowercase().as_str() {
        "zl" => Ok(BindTarget::Zl),
        "zr" => Ok(BindTarget::Zr),
        "c_stick" | "cstick" | "c-stick" => Ok(BindTarget::CStick),
        _ => Err(ScriptError::InvalidTarget {
            line,
            token: token.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::{BindTarget, Command, ScriptError, parse_script};

    #[test]
    fn parses_all_commands() {
        let script = "\
            # poll every 8 ms\n\
            send 01 08 00\n\
            \n\
            advance 20ms\n\
            send 0x02 0x00 0x00 0x00 0x10 0x00  # first page\n\
            bind C-Stick engine:fixed,x:1,y:-1\n\
            reload\n\
            disconnect\n";

        assert_eq!(
            parse_script(script).unwrap(),
            vec![
                Command::Send(vec![0x01, 0x08, 0x00]),
                Command::Advance(20),
                Command::Send(vec![0x02, 0x00, 0x00, 0x00, 0x10, 0x00]),
                Command::Bind {
                    target: BindTarget::CStick,
                    params: "engine:fixed,x:1,y:-1".to_string()
                },
                Command::Reload,
                Command::Disconnect,
            ]
        );
    }

    #[test]
    fn empty_send_is_an_empty_frame() {
        assert_eq!(parse_script("send").unwrap(), vec![Command::Send(vec![])]);
    }

    #[test]
    fn reports_line_numbers() {
        assert_eq!(
            parse_script("reload\nsend 01 zz"),
            Err(ScriptError::InvalidByte {
                line: 2,
                token: "zz".to_string()
            })
        );
        assert_eq!(
            parse_script("\n\nwait 5"),
            Err(ScriptError::UnknownCommand {
                line: 3,
                name: "wait".to_string()
            })
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(matches!(
            parse_script("advance"),
            Err(ScriptError::MissingArgument { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("advance soon"),
            Err(ScriptError::InvalidDuration { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("send 01 08 00\nadvance 100000000000"),
            Err(ScriptError::InvalidDuration { line: 2, .. })
        ));
        assert!(matches!(
            parse_script("bind zl"),
            Err(ScriptError::MissingArgument { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("bind l engine:fixed"),
            Err(ScriptError::InvalidTarget { line: 1, .. })
        ));
        assert!(matches!(
            parse_script("send 100"),
            Err(ScriptError::InvalidByte { line: 1, .. })
        ));
    }
}
