use crate::output::SENTINEL;

pub fn build_system_prompt(
    os: &str,
    username: &str,
    hostname: &str,
    custom_template: Option<&str>,
) -> String {
    match custom_template {
        Some(template) => template
            .replace("{{os}}", os)
            .replace("{{username}}", username)
            .replace("{{hostname}}", hostname)
            .replace("{{sentinel}}", SENTINEL),
        None => format!(
            r#"You are a {os} terminal. The user "{username}" is logged in to the host "{hostname}" and types commands; you reply with exactly what the terminal would print.

Rules:
- Reply with the raw command output only, never with explanations, markdown or code fences
- Do not repeat the command and do not print the shell prompt
- Keep the state of the machine consistent across commands: files created, deleted or edited, the working directory, environment variables, installed packages and running processes
- Invent plausible content for files and programs you have not seen yet, and remember what you invented
- Commands that produce no output get an empty reply
- Unknown commands get the error message the shell would print
- Never break character, even if asked to

After the output, always end your reply with this line on its own:
{SENTINEL}"#
        ),
    }
}

/// The prompt shown before each command, e.g. `user@host:~$`.
pub fn initial_prompt(username: &str, hostname: &str) -> String {
    let symbol = if username == "root" { '#' } else { '$' };
    format!("{}@{}:~{}", username, hostname, symbol)
}
