//! Macro substitution for item keys and credential fields
//!
//! Raw item fields may reference built-in host macros (`{HOST.NAME}`,
//! `{HOST.IP}`, `{HOST.PORT}`, `{HOST.CONN}`) and user macros (`{$NAME}`)
//! defined per host. Substitution happens once per poll iteration into a
//! cloned working copy of the item; the authoritative record in the config
//! cache keeps the raw text.
//!
//! Full expression-macro evaluation lives outside this crate; embedders
//! plug in their own [`MacroResolver`].

use std::fmt;

use crate::item::Host;

pub type MacroResult<T> = Result<T, MacroError>;

/// Substitution failure; surfaces as a config-error on the item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MacroError {
    /// A `{$NAME}` user macro has no value on the host
    UnknownUserMacro(String),
    /// Unterminated `{...}` reference
    Unterminated(String),
}

impl fmt::Display for MacroError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroError::UnknownUserMacro(name) => {
                write!(f, "unknown user macro \"{{{name}}}\"")
            }
            MacroError::Unterminated(raw) => {
                write!(f, "unterminated macro reference in \"{raw}\"")
            }
        }
    }
}

impl std::error::Error for MacroError {}

/// Resolves macros in one raw field against a host's context.
///
/// Implementations must be non-blocking: substitution runs inline in the
/// poll loop between queue pull and dispatch.
pub trait MacroResolver: Send + Sync {
    fn substitute(&self, host: &Host, raw: &str) -> MacroResult<String>;
}

/// Map-backed resolver covering the built-in host macros and per-host
/// user macros. Unknown non-user `{...}` references are left verbatim so
/// keys containing literal braces keep working.
#[derive(Debug, Default)]
pub struct StaticResolver;

impl StaticResolver {
    pub fn new() -> Self {
        Self
    }

    fn builtin(host: &Host, name: &str) -> Option<String> {
        match name {
            "HOST.NAME" | "HOST.HOST" => Some(host.name.clone()),
            "HOST.IP" | "HOST.CONN" => Some(host.addr.clone()),
            "HOST.PORT" => Some(host.port.to_string()),
            _ => None,
        }
    }
}

impl MacroResolver for StaticResolver {
    fn substitute(&self, host: &Host, raw: &str) -> MacroResult<String> {
        if !raw.contains('{') {
            return Ok(raw.to_string());
        }

        let mut out = String::with_capacity(raw.len());
        let mut rest = raw;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            let Some(close) = tail.find('}') else {
                return Err(MacroError::Unterminated(raw.to_string()));
            };
            let name = &tail[1..close];

            if let Some(user) = name.strip_prefix('$') {
                match host.macros.get(user) {
                    Some(value) => out.push_str(value),
                    None => return Err(MacroError::UnknownUserMacro(name.to_string())),
                }
            } else if let Some(value) = Self::builtin(host, name) {
                out.push_str(&value);
            } else {
                // not a macro we know - keep the literal text
                out.push_str(&tail[..=close]);
            }

            rest = &tail[close + 1..];
        }
        out.push_str(rest);

        Ok(out)
    }
}
