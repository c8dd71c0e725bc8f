use sommelier_core::session::SessionId;

use crate::commands::{build_runtime, build_session_runtime, load_config, open_database, CommandResult};

/// Answers one message. Passing the same `session` again continues the
/// conversation with its remembered context.
pub fn run(message: &str, session: Option<String>) -> CommandResult {
    let config = match load_config("ask") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    crate::logging::init(&config.logging);

    let runtime = match build_runtime("ask") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let session_id = SessionId(session.unwrap_or_else(new_session_id));
    let result = runtime.block_on(async {
        let pool = open_database(&config).await?;
        let sessions = build_session_runtime(&config, pool.clone())?;
        let reply = sessions.handle(&session_id, message).await;
        pool.close().await;
        Ok::<String, crate::commands::Failure>(reply)
    });

    match result {
        Ok(reply) => CommandResult::reply("ask", &session_id.0, reply),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("ask", error_class, message, exit_code)
        }
    }
}

pub(crate) fn new_session_id() -> String {
    format!("cli-{}", uuid::Uuid::new_v4())
}
