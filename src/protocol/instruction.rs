//! Parsed instructions and argument splitting.

/// One parsed invocation: a command name plus its ordered arguments.
///
/// Instructions are ephemeral — created from a decoded message or a script
/// line, consumed by the dispatcher, and discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub command: String,
    pub args: Vec<String>,
    /// The text the instruction was parsed from, kept for error reporting.
    pub raw: String,
}

impl Instruction {
    /// Parse an instruction line. Returns `None` for blank input.
    pub fn parse(raw: &str) -> Option<Instruction> {
        let mut tokens = split_quoted(raw);
        if tokens.is_empty() {
            return None;
        }
        let command = tokens.remove(0);
        Some(Instruction {
            command,
            args: tokens,
            raw: raw.trim().to_string(),
        })
    }
}

/// Split a line on whitespace, keeping a double-quoted span as one token.
///
/// Quotes are preserved in the token; consumers that want the bare value
/// strip them (`trim_matches('"')`). This lets a vehicle name carry spaces
/// through the single-line instruction form.
pub fn split_quoted(input: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                current.push('"');
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_whitespace() {
        assert_eq!(split_quoted("remove_key 5"), vec!["remove_key", "5"]);
    }

    #[test]
    fn quoted_spans_stay_together() {
        let tokens = split_quoted("insert \"red car\" 3.0 4.0");
        assert_eq!(tokens, vec!["insert", "\"red car\"", "3.0", "4.0"]);
    }

    #[test]
    fn blank_lines_parse_to_none() {
        assert!(Instruction::parse("   ").is_none());
    }

    #[test]
    fn parse_separates_command_and_args() {
        let instr = Instruction::parse("update 3 \"car one\" 1 2 3 4 CAR ALCOHOL").expect("parses");
        assert_eq!(instr.command, "update");
        assert_eq!(instr.args.len(), 8);
        assert_eq!(instr.args[1], "\"car one\"");
    }
}
