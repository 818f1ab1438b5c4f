use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::Error;

static INPUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<input\b[^>]*>").unwrap());
static NAME: Lazy<Regex> = Lazy::new(|| attr_regex("name"));
static TYPE: Lazy<Regex> = Lazy::new(|| attr_regex("type"));
static VALUE: Lazy<Regex> = Lazy::new(|| attr_regex("value"));

fn attr_regex(attr: &str) -> Regex {
    Regex::new(&format!(r#"(?is)\b{attr}\s*=\s*(?:"([^"]*)"|'([^']*)')"#)).unwrap()
}

fn attr(tag: &str, re: &Regex) -> Option<String> {
    re.captures(tag).and_then(|c| {
        c.get(1)
            .or_else(|| c.get(2))
            .map(|m| m.as_str().to_string())
    })
}

/// Fills the hosted login form on the user's behalf.
///
/// `login` and `user_pwd` inputs receive the credentials; every other visible
/// `checkbox`/`hidden`/`text` input is copied through verbatim so session and
/// anti-CSRF fields round-trip. Fields may repeat, so the result is an
/// ordered list rather than a map.
pub(crate) fn autofill(html: &str, user: &str, password: &str) -> Result<Vec<(String, String)>, Error> {
    let mut fields: Vec<(String, String)> = Vec::new();

    for tag in INPUT.find_iter(html) {
        let tag = tag.as_str();
        let name = attr(tag, &NAME);

        match name.as_deref() {
            Some("login") => {
                fields.push(("login".to_string(), user.to_string()));
                continue;
            }
            Some("user_pwd") => {
                fields.push(("user_pwd".to_string(), password.to_string()));
                continue;
            }
            _ => {}
        }

        if matches!(attr(tag, &TYPE).as_deref(), Some("checkbox" | "hidden" | "text")) {
            if let Some(name) = name {
                fields.push((name, attr(tag, &VALUE).unwrap_or_default()));
            }
        }
    }

    if fields.is_empty() {
        return Err(Error::UnrecognizedLoginForm);
    }
    Ok(fields)
}
