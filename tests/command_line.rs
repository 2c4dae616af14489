// tests/command_line.rs

use std::path::Path;

use nodeflow::dag::ErrorKind;
use nodeflow::exec::ssh::classify_failure;
use nodeflow::exec::{ExecError, build_command_line, shell_quote};

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn quoting_escapes_single_quotes() {
    assert_eq!(shell_quote("plain"), "'plain'");
    assert_eq!(shell_quote(""), "''");
    assert_eq!(shell_quote("it's"), r"'it'\''s'");
    assert_eq!(shell_quote("$HOME; rm -rf /"), "'$HOME; rm -rf /'");
}

#[test]
fn bare_command_keeps_first_argument_verbatim() {
    let line = build_command_line("A", None, &args(&["ls -la", "my dir"]), Path::new("/s"));
    assert_eq!(line, "ls -la 'my dir'");

    let line = build_command_line("A", None, &args(&["echo hi"]), Path::new("/s"));
    assert_eq!(line, "echo hi");
}

#[cfg(unix)]
#[test]
fn shell_script_runs_under_sh_from_script_dir() {
    let line = build_command_line(
        "A",
        Some("prepare.sh"),
        &args(&["x", "y z"]),
        Path::new("/opt/scripts"),
    );
    assert_eq!(line, "sh '/opt/scripts/prepare.sh' 'x' 'y z'");
}

#[cfg(unix)]
#[test]
fn python_script_runs_under_python3() {
    let line = build_command_line("A", Some("tools/report.py"), &args(&["1"]), Path::new("base"));
    assert_eq!(line, "python3 'base/tools/report.py' '1'");
}

#[test]
fn absolute_and_extensionless_scripts_run_directly() {
    let line = build_command_line("A", Some("/usr/local/bin/job"), &args(&["a"]), Path::new("/s"));
    assert_eq!(line, "'/usr/local/bin/job' 'a'");
}

#[test]
fn empty_arguments_still_build_a_line() {
    assert_eq!(build_command_line("A", None, &[], Path::new("/s")), "");
    assert_eq!(
        build_command_line("A", Some("run.sh"), &args(&[""]), Path::new("")),
        "sh 'run.sh' ''"
    );
}

#[test]
fn ssh_exit_codes_are_classified() {
    assert_eq!(
        classify_failure(Some(5), "bad password\n".into()).kind(),
        ErrorKind::Authentication
    );
    assert_eq!(
        classify_failure(Some(6), "host key".into()).kind(),
        ErrorKind::Connection
    );
    assert_eq!(
        classify_failure(Some(255), "user@h: Permission denied (publickey,password).".into())
            .kind(),
        ErrorKind::Authentication
    );
    assert_eq!(
        classify_failure(Some(255), "ssh: connect to host h port 22: Connection refused".into()),
        ExecError::Connection("ssh: connect to host h port 22: Connection refused".into())
    );
    assert_eq!(
        classify_failure(Some(2), "no such file\n".into()),
        ExecError::NonZeroExit {
            code: 2,
            output: "no such file\n".into()
        }
    );
    assert_eq!(classify_failure(None, String::new()).kind(), ErrorKind::Internal);
}

#[test]
fn exec_errors_become_node_errors() {
    let err = ExecError::Timeout(std::time::Duration::from_secs(30)).to_node_error();
    assert_eq!(err.kind, ErrorKind::Timeout);
    assert_eq!(err.message, "timed out after 30s");
}
