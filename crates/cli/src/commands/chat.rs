use std::io::{self, BufRead, Write};

use sommelier_core::session::SessionId;

use crate::commands::ask::new_session_id;
use crate::commands::{build_runtime, build_session_runtime, load_config, open_database, CommandResult};

const EXIT_WORDS: &[&str] = &["sair", "exit", "quit", "tchau"];

/// Interactive conversation over stdin/stdout. Replies go to stdout, one
/// block per message; logs stay on stderr.
pub fn run(session: Option<String>) -> CommandResult {
    let config = match load_config("chat") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    crate::logging::init(&config.logging);

    let runtime = match build_runtime("chat") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let opened = runtime.block_on(async {
        let pool = open_database(&config).await?;
        build_session_runtime(&config, pool)
    });
    let sessions = match opened {
        Ok(sessions) => sessions,
        Err((error_class, message, exit_code)) => {
            return CommandResult::failure("chat", error_class, message, exit_code);
        }
    };

    let session_id = SessionId(session.unwrap_or_else(new_session_id));
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let turns = converse(stdin.lock(), &mut stdout, |message| {
        runtime.block_on(sessions.handle(&session_id, message))
    });

    match turns {
        Ok(turns) => CommandResult::reply("chat", &session_id.0, format!("chat ended after {turns} messages")),
        Err(error) => CommandResult::failure("chat", "io", error.to_string(), 7),
    }
}

/// Feeds each non-blank line to `respond` until EOF or an exit word.
/// Returns how many messages were answered.
pub fn converse<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    mut respond: impl FnMut(&str) -> String,
) -> io::Result<usize> {
    let mut turns = 0;
    for line in input.lines() {
        let line = line?;
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if EXIT_WORDS.contains(&message.to_lowercase().as_str()) {
            break;
        }
        let reply = respond(message);
        writeln!(output, "{reply}\n")?;
        output.flush()?;
        turns += 1;
    }
    Ok(turns)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::converse;

    #[test]
    fn answers_each_message_until_an_exit_word() {
        let input = Cursor::new("oi\n\n  vinho tinto  \nSair\nnunca respondido\n");
        let mut output = Vec::new();
        let mut seen = Vec::new();

        let turns = converse(input, &mut output, |message| {
            seen.push(message.to_string());
            format!("eco: {message}")
        })
        .expect("converse");

        assert_eq!(turns, 2);
        assert_eq!(seen, vec!["oi", "vinho tinto"]);
        assert_eq!(String::from_utf8(output).expect("utf8"), "eco: oi\n\neco: vinho tinto\n\n");
    }

    #[test]
    fn stops_quietly_at_end_of_input() {
        let mut output = Vec::new();
        let turns = converse(Cursor::new(""), &mut output, |_| unreachable!()).expect("converse");
        assert_eq!(turns, 0);
        assert!(output.is_empty());
    }
}
