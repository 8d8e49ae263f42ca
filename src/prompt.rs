use std::io::{BufRead, Write};
use anyhow::Result;

pub const BANNER: &str = concat!(
    "SynapseInstaller ", env!("CARGO_PKG_VERSION"), "\n",
    "============================\n",
    "Running in interactive mode.\n",
    "\n",
    "Welcome to the interactive SynapseSL installer.",
);

/// Asks a yes/no question until the answer is understood.
///
/// An empty line or end of input picks `default`.
pub fn ask_yes_no<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    question: &str,
    default: bool,
) -> Result<bool> {
    let hint = if default { "[Y/n]" } else { "[y/N]" };
    loop {
        write!(output, "{question} {hint} ")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            writeln!(output)?;
            return Ok(default);
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "" => return Ok(default),
            "y" | "yes" => return Ok(true),
            "n" | "no" => return Ok(false),
            other => writeln!(output, "Please answer 'y' or 'n' (got '{other}').")?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn ask(answers: &str, default: bool) -> (bool, String) {
        let mut input = Cursor::new(answers.as_bytes().to_vec());
        let mut output = Vec::new();
        let answer = ask_yes_no(&mut input, &mut output, "Install?", default).unwrap();
        (answer, String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_plain_answers() {
        assert!(ask("y\n", false).0);
        assert!(ask("YES\n", false).0);
        assert!(!ask("n\n", true).0);
    }

    #[test]
    fn test_empty_and_eof_use_default() {
        assert!(ask("\n", true).0);
        assert!(!ask("", false).0);
    }

    #[test]
    fn test_reprompts_on_garbage() {
        let (answer, output) = ask("maybe\ny\n", false);
        assert!(answer);
        assert!(output.contains("got 'maybe'"));
        assert_eq!(output.matches("Install? [y/N]").count(), 2);
    }
}
