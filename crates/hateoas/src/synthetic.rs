//! Synthetic type identities.
//!
//! `_links`, `_embedded` and each individual link are serialized as virtual
//! types that exist only by name. A name is `<owner><marker><kind>`, e.g.
//! `app::User#hateoas#Link:self`. The registry mints these names and is the
//! only place that turns them back into an owner class and a kind.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use hateoas_core::{ClassInfo, ConfigError, HateoasError, Result};

pub const DEFAULT_MARKER: &str = "#hateoas#";

const LINK_PREFIX: &str = "Link:";

/// What a synthetic type stands for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SyntheticKind {
    /// The `_links` map of the owner.
    Links,
    /// The `_embedded` map of the owner.
    Embedded,
    /// One link object (`href` plus attributes) of the named relation.
    Link(String),
}

impl SyntheticKind {
    fn parse(encoded: &str) -> Option<Self> {
        match encoded {
            "Links" => Some(Self::Links),
            "Embedded" => Some(Self::Embedded),
            _ => encoded
                .strip_prefix(LINK_PREFIX)
                .map(|name| Self::Link(name.to_string())),
        }
    }
}

impl fmt::Display for SyntheticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Links => f.write_str("Links"),
            Self::Embedded => f.write_str("Embedded"),
            Self::Link(name) => write!(f, "{LINK_PREFIX}{name}"),
        }
    }
}

/// A minted synthetic type. Equality and hashing use the encoded name.
#[derive(Clone)]
pub struct SyntheticTypeIdentity {
    owner: &'static ClassInfo,
    kind: SyntheticKind,
    encoded: Arc<str>,
}

impl SyntheticTypeIdentity {
    #[must_use]
    pub fn owner(&self) -> &'static ClassInfo {
        self.owner
    }

    #[must_use]
    pub fn kind(&self) -> &SyntheticKind {
        &self.kind
    }

    /// The type name handed to the host serializer.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.encoded
    }
}

impl PartialEq for SyntheticTypeIdentity {
    fn eq(&self, other: &Self) -> bool {
        self.encoded == other.encoded
    }
}

impl Eq for SyntheticTypeIdentity {}

impl std::hash::Hash for SyntheticTypeIdentity {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.encoded.hash(state);
    }
}

impl fmt::Debug for SyntheticTypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SyntheticTypeIdentity")
            .field(&self.encoded)
            .finish()
    }
}

impl fmt::Display for SyntheticTypeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

#[derive(Default)]
struct Minted {
    arena: Vec<SyntheticTypeIdentity>,
    index: HashMap<Arc<str>, usize>,
    owners: HashMap<&'static str, &'static ClassInfo>,
}

/// Process-wide, append-only table of synthetic types.
pub struct SyntheticTypeRegistry {
    marker: String,
    minted: RwLock<Minted>,
}

impl SyntheticTypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            minted: RwLock::new(Minted::default()),
        }
    }

    /// Use a custom marker.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMarker`] unless the marker contains a
    /// character that cannot appear in a type path.
    pub fn with_marker(marker: impl Into<String>) -> std::result::Result<Self, ConfigError> {
        let marker = marker.into();
        if !marker.chars().any(|c| !is_type_path_char(c)) {
            return Err(ConfigError::InvalidMarker(marker));
        }
        Ok(Self {
            marker,
            minted: RwLock::new(Minted::default()),
        })
    }

    #[must_use]
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// The identity of `kind` for `owner`. Minting the same pair again
    /// returns an equal identity.
    pub fn mint(&self, owner: &'static ClassInfo, kind: SyntheticKind) -> SyntheticTypeIdentity {
        let encoded = format!("{}{}{}", owner.name, self.marker, kind);

        {
            let minted = self.minted.read();
            if let Some(&i) = minted.index.get(encoded.as_str()) {
                return minted.arena[i].clone();
            }
        }

        let mut minted = self.minted.write();
        if let Some(&i) = minted.index.get(encoded.as_str()) {
            return minted.arena[i].clone();
        }

        let identity = SyntheticTypeIdentity {
            owner,
            kind,
            encoded: Arc::from(encoded),
        };
        tracing::debug!(identity = %identity, "minted synthetic type");
        let i = minted.arena.len();
        minted.index.insert(Arc::clone(&identity.encoded), i);
        minted.owners.entry(owner.name).or_insert(owner);
        minted.arena.push(identity.clone());
        identity
    }

    /// Split a synthetic type name into its owner class and kind.
    ///
    /// # Errors
    ///
    /// Returns [`HateoasError::MalformedSyntheticIdentity`] when the marker
    /// is missing, the kind is unknown, or no identity was ever minted for
    /// the owner.
    pub fn decode(&self, identity: &str) -> Result<(&'static ClassInfo, SyntheticKind)> {
        let malformed = |reason: &str| HateoasError::MalformedSyntheticIdentity {
            identity: identity.to_string(),
            reason: reason.to_string(),
        };

        let (owner, kind) = identity
            .split_once(self.marker.as_str())
            .ok_or_else(|| malformed("missing marker"))?;
        let kind = SyntheticKind::parse(kind).ok_or_else(|| malformed("unknown kind"))?;
        let owner = self
            .minted
            .read()
            .owners
            .get(owner)
            .copied()
            .ok_or_else(|| malformed("owner was never minted"))?;
        Ok((owner, kind))
    }

    /// Marker test only; does not consult the table.
    #[must_use]
    pub fn is_synthetic(&self, type_name: &str) -> bool {
        type_name.contains(self.marker.as_str())
    }

    /// Number of minted identities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.minted.read().arena.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SyntheticTypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SyntheticTypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyntheticTypeRegistry")
            .field("marker", &self.marker)
            .field("minted", &self.len())
            .finish()
    }
}

fn is_type_path_char(c: char) -> bool {
    c.is_alphanumeric()
        || matches!(
            c,
            '_' | ':' | '<' | '>' | ',' | ' ' | '&' | '\'' | '[' | ']' | ';' | '(' | ')' | '*'
        )
}
