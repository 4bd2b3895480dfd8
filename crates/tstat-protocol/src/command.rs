//! Command grammar and tokenizer.
//!
//! A command line is split on the delimiter set space/tab/CR/LF/comma/
//! equals, and each token is dispatched on its **first character** only.
//! That keeps the grammar byte-compatible with clients that send
//! `setpoint 70`, `s=70`, or `s,70`; all three reach the store as the same
//! write. Unrecognized tokens are skipped without consuming anything after
//! them, and parsing is total: there is no error case, only commands that
//! never materialize.

use tstat_core::Parameter;

/// Token delimiters accepted between commands and arguments.
pub const DELIMITERS: &[char] = &[' ', '\t', '\r', '\n', ',', '='];

/// One value the query form (`? x`) can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryTarget {
    /// `? s`
    Setpoint,
    /// `? l`
    Limit,
    /// `? d`
    Deadband,
    /// `? t` reports the most recent control-loop sample.
    Temperature,
}

impl QueryTarget {
    /// Lower-case target name, used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Setpoint => "setpoint",
            Self::Limit => "limit",
            Self::Deadband => "deadband",
            Self::Temperature => "temperature",
        }
    }
}

/// A parsed client command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// `s <n>` / `l <n>` / `d <n>`: write one parameter.
    Set(Parameter, i64),

    /// `? s` / `? l` / `? d` / `? t`: read one value.
    Query(QueryTarget),

    /// `q`: end the session.
    Quit,
}

/// Parses every command on one line, left to right.
///
/// A set command always consumes the following token as its argument (a
/// missing or non-numeric argument stores 0). A query consumes the
/// following token as its target and drops the pair when the target is
/// unrecognized or absent. Tokens after a quit command are not examined.
pub fn parse_line(line: &str) -> Vec<Command> {
    let mut commands = Vec::new();
    let mut tokens = line
        .split(DELIMITERS)
        .filter(|token| !token.is_empty());

    while let Some(token) = tokens.next() {
        let Some(lead) = token.chars().next() else {
            continue;
        };

        match lead {
            's' => commands.push(Command::Set(
                Parameter::Setpoint,
                parse_value(tokens.next()),
            )),
            'l' => commands.push(Command::Set(Parameter::Limit, parse_value(tokens.next()))),
            'd' => commands.push(Command::Set(
                Parameter::Deadband,
                parse_value(tokens.next()),
            )),
            '?' => {
                if let Some(target) = tokens.next().and_then(query_target) {
                    commands.push(Command::Query(target));
                }
            }
            'q' => {
                commands.push(Command::Quit);
                break;
            }
            _ => {
                // Unknown lead: skip this token only.
            }
        }
    }

    commands
}

/// Argument parsing with atoi-style forgiveness: anything that is not a
/// whole integer stores 0.
fn parse_value(token: Option<&str>) -> i64 {
    token.and_then(|t| t.parse().ok()).unwrap_or(0)
}

/// Maps a query target token (again by first character) to its value.
fn query_target(token: &str) -> Option<QueryTarget> {
    match token.chars().next() {
        Some('s') => Some(QueryTarget::Setpoint),
        Some('l') => Some(QueryTarget::Limit),
        Some('d') => Some(QueryTarget::Deadband),
        Some('t') => Some(QueryTarget::Temperature),
        _ => None,
    }
}
