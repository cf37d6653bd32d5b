//! Conversion of render data into a Tera execution context.
//!
//! Render data comes in three shapes, modelled by [`ContextData`]:
//!
//! - an existing [`tera::Context`], passed through untouched
//! - a record (any `Serialize` struct), one entry per field
//! - a string-keyed map, one entry per key
//!
//! [`ContextData::from_serialize`] decides between the last two by driving the
//! value's `Serialize` impl into a classifying serializer that only accepts those
//! shapes at the top level. Maps whose keys are not strings are rejected
//! instead of having their keys stringified. Field and entry values are
//! stored as JSON values, so a nested struct stays a nested object and
//! templates reach into it with `{{ outer.inner }}`.

use serde::Serialize;
use serde::ser::{self, Impossible, Serializer};
use serde_json::{Map, Value};
use tera::Context;

use crate::error::ContextError;

/// Render data in one of the shapes a template context can be built from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextData {
    /// Already a template context.
    Context(Context),
    /// Fields of a struct, keyed by their serialized names.
    Record(Map<String, Value>),
    /// Entries of a map with string keys.
    StringMap(Map<String, Value>),
}

impl ContextData {
    /// Classify and copy an arbitrary serializable value.
    ///
    /// One newtype wrapper (or `Some`) around a struct or map is looked
    /// through, so `struct Vars(HashMap<String, i32>)` is accepted.
    ///
    /// # Errors
    ///
    /// [`ContextError::UnsupportedContextType`] for anything that is not a
    /// struct or a map keyed by strings, naming the Rust type that was passed.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, ContextError> {
        value.serialize(ShapeCheck {
            type_name: std::any::type_name::<T>(),
            unwrapped: false,
        })
    }

    /// Short name of the shape, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ContextData::Context(_) => "context",
            ContextData::Record(_) => "record",
            ContextData::StringMap(_) => "string-map",
        }
    }

    /// Build the template context.
    pub fn into_context(self) -> Context {
        match self {
            ContextData::Context(context) => context,
            ContextData::Record(entries) | ContextData::StringMap(entries) => {
                let mut context = Context::new();
                for (key, value) in entries {
                    context.insert(key, &value);
                }
                context
            }
        }
    }
}

impl From<Context> for ContextData {
    fn from(context: Context) -> Self {
        ContextData::Context(context)
    }
}

/// Convert a serializable value straight into a template context.
pub fn to_context<T: Serialize + ?Sized>(value: &T) -> Result<Context, ContextError> {
    ContextData::from_serialize(value).map(ContextData::into_context)
}

impl ser::Error for ContextError {
    fn custom<T: std::fmt::Display>(msg: T) -> Self {
        ContextError::ValueSerialization {
            key: "<root>".to_string(),
            message: msg.to_string(),
        }
    }
}

fn to_entry_value<T: Serialize + ?Sized>(key: &str, value: &T) -> Result<Value, ContextError> {
    serde_json::to_value(value).map_err(|e| ContextError::ValueSerialization {
        key: key.to_string(),
        message: e.to_string(),
    })
}

/// Top-level shape detector. Only structs and maps produce a value.
struct ShapeCheck {
    type_name: &'static str,
    unwrapped: bool,
}

impl ShapeCheck {
    fn unsupported(&self) -> ContextError {
        ContextError::UnsupportedContextType {
            type_name: self.type_name.to_string(),
        }
    }

    fn unwrap_once<T: Serialize + ?Sized>(self, value: &T) -> Result<ContextData, ContextError> {
        if self.unwrapped {
            return Err(self.unsupported());
        }
        value.serialize(ShapeCheck {
            type_name: self.type_name,
            unwrapped: true,
        })
    }
}

macro_rules! reject_scalars {
    ($($method:ident($($arg:ty),*);)*) => {
        $(
            fn $method(self, $(_: $arg),*) -> Result<Self::Ok, Self::Error> {
                Err(self.unsupported())
            }
        )*
    };
}

impl Serializer for ShapeCheck {
    type Ok = ContextData;
    type Error = ContextError;
    type SerializeSeq = Impossible<ContextData, ContextError>;
    type SerializeTuple = Impossible<ContextData, ContextError>;
    type SerializeTupleStruct = Impossible<ContextData, ContextError>;
    type SerializeTupleVariant = Impossible<ContextData, ContextError>;
    type SerializeMap = MapCheck;
    type SerializeStruct = RecordCheck;
    type SerializeStructVariant = Impossible<ContextData, ContextError>;

    reject_scalars! {
        serialize_bool(bool);
        serialize_i8(i8);
        serialize_i16(i16);
        serialize_i32(i32);
        serialize_i64(i64);
        serialize_u8(u8);
        serialize_u16(u16);
        serialize_u32(u32);
        serialize_u64(u64);
        serialize_f32(f32);
        serialize_f64(f64);
        serialize_char(char);
        serialize_str(&str);
        serialize_bytes(&[u8]);
        serialize_none();
        serialize_unit();
        serialize_unit_variant(&'static str, u32, &'static str);
    }

    fn serialize_unit_struct(self, _name: &'static str) -> Result<Self::Ok, Self::Error> {
        Ok(ContextData::Record(Map::new()))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<Self::Ok, Self::Error> {
        self.unwrap_once(value)
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        self.unwrap_once(value)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Ok(MapCheck {
            type_name: self.type_name,
            entries: Map::new(),
            pending_key: None,
        })
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Ok(RecordCheck {
            fields: Map::new(),
        })
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(self.unsupported())
    }
}

struct RecordCheck {
    fields: Map<String, Value>,
}

impl ser::SerializeStruct for RecordCheck {
    type Ok = ContextData;
    type Error = ContextError;

    fn serialize_field<T: Serialize + ?Sized>(
        &mut self,
        key: &'static str,
        value: &T,
    ) -> Result<(), Self::Error> {
        let value = to_entry_value(key, value)?;
        self.fields.insert(key.to_string(), value);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(ContextData::Record(self.fields))
    }
}

struct MapCheck {
    type_name: &'static str,
    entries: Map<String, Value>,
    pending_key: Option<String>,
}

impl ser::SerializeMap for MapCheck {
    type Ok = ContextData;
    type Error = ContextError;

    fn serialize_key<T: Serialize + ?Sized>(&mut self, key: &T) -> Result<(), Self::Error> {
        let key = key.serialize(KeyCheck {
            type_name: self.type_name,
        })?;
        self.pending_key = Some(key);
        Ok(())
    }

    fn serialize_value<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), Self::Error> {
        let key = self.pending_key.take().ok_or_else(|| ContextError::ValueSerialization {
            key: "<unknown>".to_string(),
            message: "map value serialized before its key".to_string(),
        })?;
        let value = to_entry_value(&key, value)?;
        self.entries.insert(key, value);
        Ok(())
    }

    fn end(self) -> Result<Self::Ok, Self::Error> {
        Ok(ContextData::StringMap(self.entries))
    }
}

/// Accepts only string-like map keys: `str`, `char`, or a newtype around one.
struct KeyCheck {
    type_name: &'static str,
}

impl KeyCheck {
    fn unsupported(&self) -> ContextError {
        ContextError::UnsupportedContextType {
            type_name: self.type_name.to_string(),
        }
    }
}

impl Serializer for KeyCheck {
    type Ok = String;
    type Error = ContextError;
    type SerializeSeq = Impossible<String, ContextError>;
    type SerializeTuple = Impossible<String, ContextError>;
    type SerializeTupleStruct = Impossible<String, ContextError>;
    type SerializeTupleVariant = Impossible<String, ContextError>;
    type SerializeMap = Impossible<String, ContextError>;
    type SerializeStruct = Impossible<String, ContextError>;
    type SerializeStructVariant = Impossible<String, ContextError>;

    reject_scalars! {
        serialize_bool(bool);
        serialize_i8(i8);
        serialize_i16(i16);
        serialize_i32(i32);
        serialize_i64(i64);
        serialize_u8(u8);
        serialize_u16(u16);
        serialize_u32(u32);
        serialize_u64(u64);
        serialize_f32(f32);
        serialize_f64(f64);
        serialize_bytes(&[u8]);
        serialize_none();
        serialize_unit();
        serialize_unit_struct(&'static str);
        serialize_unit_variant(&'static str, u32, &'static str);
    }

    fn serialize_char(self, v: char) -> Result<Self::Ok, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_str(self, v: &str) -> Result<Self::Ok, Self::Error> {
        Ok(v.to_string())
    }

    fn serialize_some<T: Serialize + ?Sized>(self, _value: &T) -> Result<Self::Ok, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _value: &T,
    ) -> Result<Self::Ok, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_seq(self, _len: Option<usize>) -> Result<Self::SerializeSeq, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple(self, _len: usize) -> Result<Self::SerializeTuple, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleStruct, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_tuple_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeTupleVariant, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_map(self, _len: Option<usize>) -> Result<Self::SerializeMap, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_struct(
        self,
        _name: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStruct, Self::Error> {
        Err(self.unsupported())
    }

    fn serialize_struct_variant(
        self,
        _name: &'static str,
        _variant_index: u32,
        _variant: &'static str,
        _len: usize,
    ) -> Result<Self::SerializeStructVariant, Self::Error> {
        Err(self.unsupported())
    }
}
