//! In-place config-file patching.
//!
//! Replaces the single line matching a pattern with a rendered template. The
//! match must be unique: zero or multiple matching lines means the rewritten
//! constant would not (or not unambiguously) take the intended value, so the
//! patch fails instead of silently proceeding.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::SweepError;

/// What a successful patch did, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchOutcome {
    /// 1-based line number of the rewritten line.
    pub line_number: usize,
    pub old_line: String,
    pub new_line: String,
}

/// Substitute `{v}` in `template` with the sweep value.
pub fn render_template(template: &str, value: u64) -> String {
    template.replace("{v}", &value.to_string())
}

/// Rewrite the one line of `path` matching `pattern` with `template`
/// instantiated with `value`. Only the matched line's content is spliced, so
/// every line terminator in the file (LF or CRLF, trailing or absent) stays
/// as it was.
pub fn patch_line(
    path: &Path,
    pattern: &Regex,
    template: &str,
    value: u64,
) -> Result<PatchOutcome, SweepError> {
    let io_err = |source| SweepError::Io {
        value: Some(value),
        source,
    };
    let contents = fs::read_to_string(path).map_err(io_err)?;

    // Line content spans, with terminators stripped the way `str::lines`
    // strips them: (line index, byte offset, content length).
    let mut matches: Vec<(usize, usize, usize)> = Vec::new();
    let mut offset = 0;
    for (index, segment) in contents.split_inclusive('\n').enumerate() {
        let content = segment
            .strip_suffix('\n')
            .map(|s| s.strip_suffix('\r').unwrap_or(s))
            .unwrap_or(segment);
        if pattern.is_match(content) {
            matches.push((index, offset, content.len()));
        }
        offset += segment.len();
    }

    if matches.len() != 1 {
        return Err(SweepError::ConfigPatch {
            path: path.to_path_buf(),
            pattern: pattern.as_str().to_string(),
            matches: matches.len(),
            value,
        });
    }

    let (index, start, content_len) = matches[0];
    let old_line = contents[start..start + content_len].to_string();
    let new_line = render_template(template, value);

    let mut rewritten = String::with_capacity(contents.len() + new_line.len());
    rewritten.push_str(&contents[..start]);
    rewritten.push_str(&new_line);
    rewritten.push_str(&contents[start + content_len..]);
    fs::write(path, rewritten).map_err(io_err)?;

    Ok(PatchOutcome {
        line_number: index + 1,
        old_line,
        new_line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn render_template_substitutes_value() {
        assert_eq!(
            render_template("pub const SECTORS: usize = {v};", 8),
            "pub const SECTORS: usize = 8;"
        );
    }

    #[test]
    fn patches_unique_matching_line() {
        let file = config_with("a = 1\npub const SECTORS: usize = 2;\nb = 3\n");
        let pattern = Regex::new(r"^pub const SECTORS: usize = .*$").unwrap();

        let outcome =
            patch_line(file.path(), &pattern, "pub const SECTORS: usize = {v};", 16).unwrap();

        assert_eq!(outcome.line_number, 2);
        assert_eq!(outcome.old_line, "pub const SECTORS: usize = 2;");
        assert_eq!(outcome.new_line, "pub const SECTORS: usize = 16;");
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "a = 1\npub const SECTORS: usize = 16;\nb = 3\n"
        );
    }

    #[test]
    fn preserves_crlf_line_endings() {
        let file = config_with("a = 1\r\nX=1\r\nb = 3\r\n");
        let pattern = Regex::new(r"^X=.*$").unwrap();

        let outcome = patch_line(file.path(), &pattern, "X={v}", 4).unwrap();

        assert_eq!(outcome.old_line, "X=1");
        assert_eq!(
            fs::read_to_string(file.path()).unwrap(),
            "a = 1\r\nX=4\r\nb = 3\r\n"
        );
    }

    #[test]
    fn preserves_missing_trailing_newline() {
        let file = config_with("X=1");
        let pattern = Regex::new(r"^X=.*$").unwrap();

        patch_line(file.path(), &pattern, "X={v}", 4).unwrap();
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "X=4");
    }

    #[test]
    fn zero_matches_is_an_error() {
        let file = config_with("a = 1\nb = 2\n");
        let pattern = Regex::new(r"^X=.*$").unwrap();

        let err = patch_line(file.path(), &pattern, "X={v}", 4).unwrap_err();
        assert!(matches!(
            err,
            SweepError::ConfigPatch {
                matches: 0,
                value: 4,
                ..
            }
        ));
        // File untouched.
        assert_eq!(fs::read_to_string(file.path()).unwrap(), "a = 1\nb = 2\n");
    }

    #[test]
    fn multiple_matches_is_an_error() {
        let file = config_with("X=1\nX=2\n");
        let pattern = Regex::new(r"^X=.*$").unwrap();

        let err = patch_line(file.path(), &pattern, "X={v}", 4).unwrap_err();
        assert!(matches!(err, SweepError::ConfigPatch { matches: 2, .. }));
    }

    #[test]
    fn missing_file_is_an_io_error_naming_the_value() {
        let pattern = Regex::new(r"^X=.*$").unwrap();
        let err = patch_line(Path::new("/nonexistent/params.rs"), &pattern, "X={v}", 4)
            .unwrap_err();
        assert!(matches!(err, SweepError::Io { value: Some(4), .. }));
        assert!(err.to_string().starts_with("value=4: "));
    }
}
