//! Logical service name resolution from orchestrator-native names.
//!
//! Compose and Swarm name workloads as `stack_service_N` or `stack-service-N`
//! depending on the separator in use. These functions strip the stack prefix
//! and the replica suffix to recover the logical service name shared by all
//! replicas of one workload. They are pure and never fail: when no pattern
//! matches, the input is returned unchanged.

/// Naming dialect used by the orchestrator for a given name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameDialect {
    /// `stack_service_N` or `stack_service` (Swarm services, classic Compose).
    Underscore,
    /// `stack-service-N` (Compose with hyphen separators).
    Hyphen,
}

/// A parsed orchestrator-native name.
///
/// The ordinal is only what the name itself carried; replica backend ids are
/// assigned from stable sort order during discovery, not from this field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub logical: String,
    pub ordinal: Option<u32>,
}

/// Leading segments recognized as stack markers in the hyphen dialect.
const STACK_MARKERS: [&str; 2] = ["local", "docker"];

/// Resolves a name under an explicit dialect.
pub fn resolve(name: &str, dialect: NameDialect) -> ParsedName {
    match dialect {
        NameDialect::Underscore => resolve_underscore(name),
        NameDialect::Hyphen => resolve_hyphen(name),
    }
}

/// Resolves a name, inferring the dialect from its separators.
///
/// Names containing an underscore use the underscore dialect; everything else
/// falls through to the hyphen dialect.
pub fn resolve_auto(name: &str) -> ParsedName {
    resolve(name, infer_dialect(name))
}

/// Infers the naming dialect from the separators present in a name.
pub fn infer_dialect(name: &str) -> NameDialect {
    if name.contains('_') {
        NameDialect::Underscore
    } else {
        NameDialect::Hyphen
    }
}

fn resolve_underscore(name: &str) -> ParsedName {
    let mut logical = name;
    let mut ordinal = None;

    // Trailing `_N` is the replica number.
    if let Some((head, tail)) = logical.rsplit_once('_') {
        if let Ok(n) = tail.parse::<u32>() {
            ordinal = Some(n);
            logical = head;
        }
    }

    // Leading segment up to the first `_` is the stack name.
    if let Some((_, rest)) = logical.split_once('_') {
        logical = rest;
    }

    if logical.is_empty() {
        return unmodified(name);
    }
    ParsedName {
        logical: logical.to_string(),
        ordinal,
    }
}

fn resolve_hyphen(name: &str) -> ParsedName {
    let mut logical = name;
    let mut ordinal = None;

    // Trailing `-N` is the replica number.
    if let Some((head, tail)) = logical.rsplit_once('-') {
        if !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()) {
            ordinal = tail.parse().ok();
            logical = head;
        }
    }

    // Only strip the leading segment when it is a known stack marker; unlike
    // the underscore dialect, hyphens also appear inside service names.
    if let Some((stack, rest)) = logical.split_once('-') {
        if STACK_MARKERS.contains(&stack) {
            logical = rest;
        }
    }

    if logical.is_empty() {
        return unmodified(name);
    }
    ParsedName {
        logical: logical.to_string(),
        ordinal,
    }
}

fn unmodified(name: &str) -> ParsedName {
    ParsedName {
        logical: name.to_string(),
        ordinal: None,
    }
}
