use std::path::Path;
use std::process::Output;

use assert_cmd::Command;
use pretty_assertions::assert_eq;

include!(concat!(env!("OUT_DIR"), "/test_files.rs"));

/// Run a script through the binary and check it against the markers in its
/// comments: every `/* expect: text */` is one line of stdout, and a
/// `/* expect error: text */` must appear in stderr with a failing exit code.
fn do_test(filename: &Path) {
    let content = std::fs::read_to_string(filename)
        .unwrap_or_else(|_| panic!("failed to read {}", filename.display()));

    let expected = find_markers(&content, "/* expect: ").join("\n");
    let expected_errors = find_markers(&content, "/* expect error: ");

    let output = run_file(filename);

    let stdout = String::from_utf8(output.stdout).unwrap();
    let stdout = stdout.trim_end();

    let stderr = String::from_utf8(output.stderr).unwrap();
    let stderr = stderr.trim_end();

    assert_eq!(expected, stdout, "stderr={}", stderr);

    if expected_errors.is_empty() {
        assert!(output.status.success(), "unexpected failure: {}", stderr);
    } else {
        assert_eq!(output.status.code(), Some(1));
        for error in expected_errors {
            assert!(stderr.contains(&error), "missing {:?} in stderr:\n{}", error, stderr);
        }
    }
}

fn run_file(filename: &Path) -> Output {
    let mut cmd = Command::cargo_bin("skink").unwrap();
    cmd.env_remove("RUST_LOG").arg(filename).output().unwrap()
}

fn find_markers(content: &str, marker: &str) -> Vec<String> {
    let mut result = vec![];
    for line in content.lines() {
        let Some(idx) = line.rfind(marker) else {
            continue;
        };

        let rest = &line[idx + marker.len()..];
        let target = rest.rfind(" */").map_or(rest, |end| &rest[..end]);
        result.push(target.to_owned());
    }

    result
}
