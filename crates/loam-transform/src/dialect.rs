//! Source dialect selection from explicit options or filename extensions.

use std::fmt;
use std::path::Path;

/// The language dialect a file is transformed as.
///
/// Unrecognized extensions pass through verbatim as [`Dialect::Other`]; the
/// transform engine judges those itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Dialect {
    Js,
    Jsx,
    Ts,
    Tsx,
    Other(String),
}

impl Dialect {
    /// Map a dialect tag to its variant; unknown tags carry through.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "js" => Dialect::Js,
            "jsx" => Dialect::Jsx,
            "ts" => Dialect::Ts,
            "tsx" => Dialect::Tsx,
            other => Dialect::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Dialect::Js => "js",
            Dialect::Jsx => "jsx",
            Dialect::Ts => "ts",
            Dialect::Tsx => "tsx",
            Dialect::Other(tag) => tag,
        }
    }

    /// Typed-script, plain or JSX variant.
    pub fn is_typescript(&self) -> bool {
        matches!(self, Dialect::Ts | Dialect::Tsx)
    }

    pub fn is_jsx(&self) -> bool {
        matches!(self, Dialect::Jsx | Dialect::Tsx)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Select the dialect for `filename` from its extension.
///
/// A query-like suffix (`?raw`, `#frag`) is stripped first, unless the raw
/// filename already ends in a recognized `.word` extension — `a.ts?x.mts`
/// keeps its literal tail.
pub fn dialect_of(filename: &str) -> Dialect {
    let name = if ends_in_extension(filename) {
        filename
    } else {
        clean_specifier(filename)
    };

    let ext = Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match ext {
        "cjs" | "mjs" => Dialect::Js,
        "cts" | "mts" => Dialect::Ts,
        other => Dialect::from_tag(other),
    }
}

fn clean_specifier(filename: &str) -> &str {
    filename
        .split(['?', '#'])
        .next()
        .unwrap_or(filename)
}

fn ends_in_extension(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, tail)) => {
            !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
        }
        None => false,
    }
}
