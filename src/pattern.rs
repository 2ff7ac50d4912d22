use regex::Regex;

/// A compiled match target for pattern-keyed handler registration. Literal
/// registration is anchored (`^literal$` semantics, implemented as a plain
/// string comparison); pre-compiled `Regex` registration is used verbatim.
#[derive(Clone)]
pub enum Pattern {
    Literal(String),
    Regex(Regex),
}

impl Pattern {
    pub fn literal(s: impl Into<String>) -> Self {
        Pattern::Literal(s.into())
    }

    pub fn regex(re: Regex) -> Self {
        Pattern::Regex(re)
    }

    pub fn matches(&self, key: &str) -> bool {
        match self {
            Pattern::Literal(literal) => literal == key,
            Pattern::Regex(re) => re.is_match(key),
        }
    }
}

impl std::fmt::Debug for Pattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Pattern::Literal(s) => write!(f, "Literal({:?})", s),
            Pattern::Regex(re) => write!(f, "Regex({})", re.as_str()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Pattern::literal(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Pattern::literal(s)
    }
}

impl From<Regex> for Pattern {
    fn from(re: Regex) -> Self {
        Pattern::regex(re)
    }
}
