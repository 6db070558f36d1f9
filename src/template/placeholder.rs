// ABOUTME: Placeholder token scanning and single-pass substitution.
// ABOUTME: Tokens are `$$` followed by an identifier, matched with maximal munch.

use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Prefix shared by every platform variable; unknown tokens with it are errors.
pub const PLATFORM_PREFIX: &str = "$$cap_";

static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$[A-Za-z_][A-Za-z0-9_]*").expect("placeholder token pattern is valid")
});

/// Whether `id` is exactly one well-formed token.
pub fn is_token(id: &str) -> bool {
    TOKEN
        .find(id)
        .is_some_and(|m| m.start() == 0 && m.end() == id.len())
}

/// All tokens appearing in `input`, in order.
pub fn tokens(input: &str) -> impl Iterator<Item = &str> {
    TOKEN.find_iter(input).map(|m| m.as_str())
}

/// Replace every known token in `input` with its value.
///
/// Inserted values are never substituted again. Returns the first unknown
/// token carrying the platform prefix as the error, including one that only
/// appears in the output because a value contained it; other unknown `$$`
/// text is kept.
pub fn substitute(input: &str, values: &BTreeMap<String, String>) -> Result<String, String> {
    let mut output = String::with_capacity(input.len());
    let mut last = 0;

    for m in TOKEN.find_iter(input) {
        output.push_str(&input[last..m.start()]);
        match values.get(m.as_str()) {
            Some(value) => output.push_str(value),
            None if m.as_str().starts_with(PLATFORM_PREFIX) => {
                return Err(m.as_str().to_string());
            }
            None => output.push_str(m.as_str()),
        }
        last = m.end();
    }

    output.push_str(&input[last..]);

    let leftover = tokens(&output)
        .find(|token| token.starts_with(PLATFORM_PREFIX))
        .map(str::to_string);
    match leftover {
        Some(token) => Err(token),
        None => Ok(output),
    }
}
