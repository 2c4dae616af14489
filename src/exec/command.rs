// src/exec/command.rs

//! Command-line construction for node invocations.

use std::path::Path;

use tracing::warn;

/// Build the command line for a node.
///
/// - With a script, relative script paths are resolved against `script_dir`
///   and the interpreter is picked by extension (`.sh` -> `sh`,
///   `.py` -> `python3`, anything else runs directly).
/// - Without a script, the first resolved argument is the command text and
///   is used verbatim, so `"args": "ls -la"` works as written.
///
/// Every other argument is single-quoted for a POSIX shell.
pub fn build_command_line(
    node_id: &str,
    script: Option<&str>,
    args: &[String],
    script_dir: &Path,
) -> String {
    if args.iter().all(|a| a.trim().is_empty()) {
        warn!(node = %node_id, "node is executing with no arguments; check inputs and args mapping");
    }

    let Some(script) = script else {
        let mut parts = Vec::with_capacity(args.len());
        if let Some((command, rest)) = args.split_first() {
            parts.push(command.clone());
            parts.extend(rest.iter().map(|a| shell_quote(a)));
        }
        return parts.join(" ");
    };

    let quoted_args: Vec<String> = args.iter().map(|a| shell_quote(a)).collect();

    let script_path = resolve_script_path(script, script_dir);
    let script_path = shell_quote(&script_path);

    let mut parts = Vec::with_capacity(quoted_args.len() + 2);
    match interpreter_for(script) {
        Some(interpreter) => {
            parts.push(interpreter.to_string());
            parts.push(script_path);
        }
        None => parts.push(script_path),
    }
    parts.extend(quoted_args);
    parts.join(" ")
}

fn interpreter_for(script: &str) -> Option<&'static str> {
    if script.ends_with(".sh") {
        Some("sh")
    } else if script.ends_with(".py") {
        Some("python3")
    } else {
        None
    }
}

fn resolve_script_path(script: &str, script_dir: &Path) -> String {
    let path = Path::new(script);
    if path.is_absolute() || script_dir.as_os_str().is_empty() {
        script.to_string()
    } else {
        script_dir.join(path).to_string_lossy().into_owned()
    }
}

/// Quote a single argument for a POSIX shell.
pub fn shell_quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}
