//! `${NAME}` expansion for credentials kept out of rule files.

use crate::traits::NotifyError;

/// Replace every `${NAME}` in `input` with the value of environment variable `NAME`.
///
/// Unset variables, empty names and unterminated references are config errors.
pub fn expand(input: &str) -> Result<String, NotifyError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            NotifyError::Config(format!("unterminated ${{...}} reference in '{input}'"))
        })?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(NotifyError::Config(format!("empty ${{}} reference in '{input}'")));
        }
        let value = std::env::var(name)
            .map_err(|_| NotifyError::Config(format!("environment variable {name} is not set")))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}
