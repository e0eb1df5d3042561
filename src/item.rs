//! Legacy item stacks and their compound tag attachment.
//!
//! The legacy item layout is:
//!
//! | Field  | Encoding                                   |
//! |--------|--------------------------------------------|
//! | id     | `i16`, `-1` marks an empty slot            |
//! | amount | `i8`                                       |
//! | damage | `i16`                                      |
//! | tag    | `0` when absent, otherwise a root compound |
//!
//! An absent tag and an empty compound produce different bytes, so the
//! distinction survives a trip over the wire.

use std::collections::BTreeMap;

use bytes::{Buf, BufMut, BytesMut};

use crate::wire::{self, WireError};

const TAG_END: u8 = 0;
const TAG_BYTE: u8 = 1;
const TAG_SHORT: u8 = 2;
const TAG_INT: u8 = 3;
const TAG_STRING: u8 = 8;
const TAG_COMPOUND: u8 = 10;

/// Nesting limit for compound tags read off the wire.
pub const MAX_TAG_DEPTH: usize = 64;

/// Value stored in a [`CompoundTag`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    /// Signed byte.
    Byte(i8),
    /// Signed 16-bit integer.
    Short(i16),
    /// Signed 32-bit integer.
    Int(i32),
    /// UTF-8 string.
    String(String),
    /// Nested compound.
    Compound(CompoundTag),
}

impl Tag {
    fn type_id(&self) -> u8 {
        match self {
            Self::Byte(_) => TAG_BYTE,
            Self::Short(_) => TAG_SHORT,
            Self::Int(_) => TAG_INT,
            Self::String(_) => TAG_STRING,
            Self::Compound(_) => TAG_COMPOUND,
        }
    }

    /// The byte payload, if this is a [`Tag::Byte`].
    #[must_use]
    pub fn as_byte(&self) -> Option<i8> {
        match self {
            Self::Byte(value) => Some(*value),
            _ => None,
        }
    }
}

/// String-keyed map of tags attached to an item.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundTag {
    entries: BTreeMap<String, Tag>,
}

impl CompoundTag {
    /// Create an empty compound.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Insert `value` under `key`, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: Tag) -> Option<Tag> {
        self.entries.insert(key.into(), value)
    }

    /// Value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Tag> { self.entries.get(key) }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool { self.entries.contains_key(key) }

    /// Remove and return the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<Tag> { self.entries.remove(key) }

    /// Whether the compound has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    /// Iterate over entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Tag)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    fn write_body(&self, dst: &mut BytesMut) -> Result<(), WireError> {
        for (key, value) in &self.entries {
            dst.put_u8(value.type_id());
            wire::write_short_string(key, dst)?;
            write_payload(value, dst)?;
        }
        dst.put_u8(TAG_END);
        Ok(())
    }

    fn read_body(src: &mut impl Buf, depth: usize) -> Result<Self, WireError> {
        if depth > MAX_TAG_DEPTH {
            return Err(WireError::TagTooDeep(MAX_TAG_DEPTH));
        }
        let mut compound = Self::new();
        loop {
            let type_id = wire::read_u8(src)?;
            if type_id == TAG_END {
                return Ok(compound);
            }
            let key = wire::read_short_string(src)?;
            let value = read_payload(type_id, src, depth)?;
            compound.entries.insert(key, value);
        }
    }
}

fn write_payload(value: &Tag, dst: &mut BytesMut) -> Result<(), WireError> {
    match value {
        Tag::Byte(v) => dst.put_i8(*v),
        Tag::Short(v) => dst.put_i16(*v),
        Tag::Int(v) => dst.put_i32(*v),
        Tag::String(v) => wire::write_short_string(v, dst)?,
        Tag::Compound(v) => v.write_body(dst)?,
    }
    Ok(())
}

fn read_payload(type_id: u8, src: &mut impl Buf, depth: usize) -> Result<Tag, WireError> {
    Ok(match type_id {
        TAG_BYTE => Tag::Byte(wire::read_i8(src)?),
        TAG_SHORT => Tag::Short(wire::read_i16(src)?),
        TAG_INT => Tag::Int(wire::read_i32(src)?),
        TAG_STRING => Tag::String(wire::read_short_string(src)?),
        TAG_COMPOUND => Tag::Compound(CompoundTag::read_body(src, depth + 1)?),
        other => return Err(WireError::UnknownTagType(other)),
    })
}

/// Item stack in the legacy layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Item {
    /// Item identifier.
    pub id: i16,
    /// Stack size as carried by the protocol. Older servers send zero or
    /// negative counts.
    pub amount: i8,
    /// Damage or metadata value.
    pub damage: i16,
    /// Optional compound tag.
    pub tag: Option<CompoundTag>,
}

impl Item {
    /// Create an untagged stack.
    #[must_use]
    pub fn new(id: i16, amount: i8, damage: i16) -> Self {
        Self {
            id,
            amount,
            damage,
            tag: None,
        }
    }

    /// Attach `tag` to the stack.
    #[must_use]
    pub fn with_tag(mut self, tag: CompoundTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Write an optional stack. `None` is written as an empty slot.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::StringTooLong`] if a tag key or string does not fit
    /// its length prefix.
    pub fn write(item: Option<&Self>, dst: &mut BytesMut) -> Result<(), WireError> {
        let Some(item) = item else {
            dst.put_i16(-1);
            return Ok(());
        };
        dst.put_i16(item.id);
        dst.put_i8(item.amount);
        dst.put_i16(item.damage);
        match &item.tag {
            None => dst.put_u8(TAG_END),
            Some(tag) => {
                dst.put_u8(TAG_COMPOUND);
                wire::write_short_string("", dst)?;
                tag.write_body(dst)?;
            }
        }
        Ok(())
    }

    /// Read an optional stack.
    ///
    /// # Errors
    ///
    /// Fails on truncated input or an unknown tag type.
    pub fn read(src: &mut impl Buf) -> Result<Option<Self>, WireError> {
        let id = wire::read_i16(src)?;
        if id < 0 {
            return Ok(None);
        }
        let amount = wire::read_i8(src)?;
        let damage = wire::read_i16(src)?;
        let tag = match wire::read_u8(src)? {
            TAG_END => None,
            TAG_COMPOUND => {
                let _root_name = wire::read_short_string(src)?;
                Some(CompoundTag::read_body(src, 0)?)
            }
            other => return Err(WireError::UnknownTagType(other)),
        };
        Ok(Some(Self {
            id,
            amount,
            damage,
            tag,
        }))
    }
}
