use std::env;

pub trait ReadEnv {
    fn var(&self, key: &str) -> Result<String, env::VarError>;

    /// Reads a variable and parses it, returning `None` when it is unset or
    /// does not parse.
    fn parsed<T: std::str::FromStr>(&self, key: &str) -> Option<T> {
        self.var(key).ok().and_then(|v| v.trim().parse().ok())
    }

    /// Reads a boolean flag. Accepts `1`/`true`/`yes`/`on` (any case) as true
    /// and `0`/`false`/`no`/`off` as false; anything else yields `None`.
    fn flag(&self, key: &str) -> Option<bool> {
        let value = self.var(key).ok()?;
        match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        }
    }
}
