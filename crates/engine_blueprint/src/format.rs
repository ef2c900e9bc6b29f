//! Wire format of the tree-structured blueprint (`BLPT`).
//!
//! A blueprint binary is a 4-byte [`FileIdentifier`] followed by a
//! MessagePack-encoded [`BlueprintDef`]. Each node carries its own ordered
//! component list and its ordered children:
//!
//! ```text
//! BlueprintDef = [ components: [ComponentDef], children: [BlueprintDef] ]
//! ComponentDef = [ def_type: u64, def: bin ]
//! ```
//!
//! `def` is an already-serialised component record written as MessagePack
//! `bin`, so [`BlueprintDef`] can borrow it straight out of the asset bytes.
//! [`OwnedBlueprintDef`] is the writer-side mirror with the same layout.

use serde::{Deserialize, Serialize, Serializer};

/// A 4-byte tag at the start of a serialised entity that names its wire
/// format, so several formats can be registered side by side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentifier(pub [u8; 4]);

impl FileIdentifier {
    /// Length of an identifier in bytes.
    pub const LEN: usize = 4;

    /// The tree-structured blueprint format.
    pub const BLUEPRINT: FileIdentifier = FileIdentifier(*b"BLPT");

    /// The flat legacy entity format.
    pub const LEGACY: FileIdentifier = FileIdentifier(*b"ENTS");

    /// Read the identifier at the start of `bytes`, if there is room for one.
    #[must_use]
    pub fn from_prefix(bytes: &[u8]) -> Option<Self> {
        let prefix: [u8; 4] = bytes.get(..Self::LEN)?.try_into().ok()?;
        Some(Self(prefix))
    }

    /// Returns the raw tag bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl std::fmt::Display for FileIdentifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

/// Serialise a byte buffer as MessagePack `bin` rather than an array of
/// integers, so it can be deserialised into a borrowed `&[u8]`.
pub(crate) fn serialize_raw<T, S>(bytes: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: AsRef<[u8]>,
    S: Serializer,
{
    serializer.serialize_bytes(bytes.as_ref())
}

/// One component of an entity node, borrowed from the wire buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ComponentDef<'a> {
    /// Def-type hash of the record.
    pub def_type: u64,
    /// The serialised record.
    pub def: &'a [u8],
}

/// One entity node, borrowed from the wire buffer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlueprintDef<'a> {
    #[serde(borrow)]
    pub components: Vec<ComponentDef<'a>>,
    #[serde(borrow)]
    pub children: Vec<BlueprintDef<'a>>,
}

/// Writer-side component entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnedComponentDef {
    pub def_type: u64,
    #[serde(serialize_with = "serialize_raw")]
    pub def: Vec<u8>,
}

/// Writer-side entity node. Immutable once pushed into its parent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnedBlueprintDef {
    pub components: Vec<OwnedComponentDef>,
    pub children: Vec<OwnedBlueprintDef>,
}
