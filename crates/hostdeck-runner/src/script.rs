//! Labelled multi-command scripts.
//!
//! [`compile`] turns a list of shell commands into one `bash` script that
//! echoes a label before each command's output. [`segments`] and [`decode`]
//! split such an output stream back into plain text and labels.
//!
//! Wire format:
//!
//! ```text
//! echo "[label{{{<command with \" escaped>}}}label]"
//! <command>
//!
//! ```
//!
//! A start delimiter with no matching end delimiter turns the whole rest of
//! the stream into label text.

/// Marks the start of a label in script output.
pub const LABEL_START: &str = "[label{{{";

/// Marks the end of a label in script output.
pub const LABEL_END: &str = "}}}label]";

/// Build a script running each command after echoing its label.
pub fn compile<S: AsRef<str>>(commands: &[S]) -> String {
    let mut script = String::new();

    for cmd in commands {
        let cmd = cmd.as_ref();
        script.push_str("echo \"");
        script.push_str(LABEL_START);
        script.push_str(&escape(cmd));
        script.push_str(LABEL_END);
        script.push_str("\"\n");
        script.push_str(cmd);
        script.push_str("\n\n");
    }

    script
}

fn escape(cmd: &str) -> String {
    cmd.replace('"', "\\\"")
}

/// A piece of decoded script output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment<'a> {
    /// Command output.
    Text(&'a str),
    /// The command that produced the text that follows.
    Label(&'a str),
}

/// Iterator over the segments of a labelled stream.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
    rest: &'a str,
    pending_label: Option<&'a str>,
}

/// Split `stream` into text and label segments, left to right.
///
/// Empty text runs are skipped; empty labels are yielded.
pub fn segments(stream: &str) -> Segments<'_> {
    Segments {
        rest: stream,
        pending_label: None,
    }
}

impl<'a> Iterator for Segments<'a> {
    type Item = Segment<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(label) = self.pending_label.take() {
            return Some(Segment::Label(label));
        }

        if self.rest.is_empty() {
            return None;
        }

        let Some(start) = self.rest.find(LABEL_START) else {
            let text = self.rest;
            self.rest = "";
            return Some(Segment::Text(text));
        };

        let text = &self.rest[..start];
        let after = &self.rest[start + LABEL_START.len()..];

        let label = match after.find(LABEL_END) {
            Some(end) => {
                self.rest = &after[end + LABEL_END.len()..];
                &after[..end]
            }
            None => {
                self.rest = "";
                after
            }
        };

        if text.is_empty() {
            Some(Segment::Label(label))
        } else {
            self.pending_label = Some(label);
            Some(Segment::Text(text))
        }
    }
}

/// Rebuild `stream` with every label passed through `render`.
pub fn decode<F>(stream: &str, mut render: F) -> String
where
    F: FnMut(&str) -> String,
{
    let mut out = String::with_capacity(stream.len());

    for segment in segments(stream) {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Label(label) => out.push_str(&render(label)),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(s: &str) -> String {
        format!("|:{}:|", s)
    }

    #[test]
    fn test_decode_cases() {
        let cases = [
            ("empty str", "", ""),
            ("plain str", "hello world", "hello world"),
            ("naked", "[label{{{naked}}}label]", "|:naked:|"),
            ("empty", "[label{{{}}}label]", "|::|"),
            ("simple", "abc[label{{{naked}}}label]def", "abc|:naked:|def"),
            ("spaces", "abc [label{{{two words}}}label] def", "abc |:two words:| def"),
            ("nlsuffix", "abc[label{{{naked}}}label]\ndef", "abc|:naked:|\ndef"),
            ("nllabel", "abc[label{{{new\nline}}}label]def", "abc|:new\nline:|def"),
            ("unterminated", "abc [label{{{no term!", "abc |:no term!:|"),
        ];

        for (name, input, want) in cases {
            assert_eq!(decode(input, render), want, "case {name}");
        }
    }

    #[test]
    fn test_second_start_inside_label_is_label_text() {
        let got = decode("a[label{{{x [label{{{y}}}label] z", render);
        assert_eq!(got, "a|:x [label{{{y:| z");
    }

    #[test]
    fn test_compile_shape() {
        let script = compile(&["uptime"]);
        assert_eq!(script, "echo \"[label{{{uptime}}}label]\"\nuptime\n\n");
    }

    #[test]
    fn test_compile_escapes_quotes() {
        let script = compile(&[r#"echo "hi""#]);
        assert_eq!(
            script,
            "echo \"[label{{{echo \\\"hi\\\"}}}label]\"\necho \"hi\"\n\n"
        );
    }

    #[test]
    fn test_compile_empty() {
        let cmds: [&str; 0] = [];
        assert_eq!(compile(&cmds), "");
    }

    #[test]
    fn test_segments() {
        let got: Vec<_> = segments("x[label{{{a}}}label]1\n[label{{{b}}}label]2").collect();
        assert_eq!(
            got,
            vec![
                Segment::Text("x"),
                Segment::Label("a"),
                Segment::Text("1\n"),
                Segment::Label("b"),
                Segment::Text("2"),
            ]
        );
    }

    #[test]
    fn test_decode_simulated_script_output() {
        // What bash prints for compile(["uname", "uptime"]) when the labels
        // are echoed and each command prints one line.
        let stream = "[label{{{uname}}}label]\nLinux\n[label{{{uptime}}}label]\n up 3 days\n";
        let got = decode(stream, |s| format!("<{}>", s));
        assert_eq!(got, "<uname>\nLinux\n<uptime>\n up 3 days\n");
    }
}
