//! Marshal/unmarshal pairs and the built-in codecs.
//!
//! The built-in JSON, YAML and plain-text codecs work on the caller's type
//! directly through serde, so every value reaches the wire exactly as the
//! format library would write it (`u128`, YAML's `.inf`, and so on).
//! Codecs built with [`Codec::new`] receive a [`serde_json::Value`] tree
//! instead, because a boxed closure cannot be generic over the value type.

use std::fmt;
use std::sync::Arc;

use serde::de::{DeserializeOwned, IntoDeserializer};
use serde::de::value::StrDeserializer;
use serde::ser::{self, Impossible};
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::error::Error;

type MarshalFn = dyn Fn(&Value) -> Result<Vec<u8>, Error> + Send + Sync + 'static;
type UnmarshalFn = dyn Fn(&[u8]) -> Result<Value, Error> + Send + Sync + 'static;

/// A marshal/unmarshal pair registered under one media type.
///
/// Cloning is cheap, so the same codec can be registered under several
/// media types.
#[derive(Clone)]
pub struct Codec(Kind);

#[derive(Clone)]
enum Kind {
    Json,
    Yaml,
    Text,
    Custom { marshal: Arc<MarshalFn>, unmarshal: Arc<UnmarshalFn> },
}

impl Codec {
    /// Builds a codec from two closures over [`serde_json::Value`].
    ///
    /// ```rust
    /// use conneg::{Codec, Error};
    ///
    /// let csv_ish = Codec::new(
    ///     |v| Ok(v.to_string().into_bytes()),
    ///     |_| Err(Error::UnsupportedMediaType("text/csv".into())),
    /// );
    /// # let _ = csv_ish;
    /// ```
    pub fn new<M, U>(marshal: M, unmarshal: U) -> Self
    where
        M: Fn(&Value) -> Result<Vec<u8>, Error> + Send + Sync + 'static,
        U: Fn(&[u8]) -> Result<Value, Error> + Send + Sync + 'static,
    {
        Self(Kind::Custom { marshal: Arc::new(marshal), unmarshal: Arc::new(unmarshal) })
    }

    /// `application/json` via serde_json.
    ///
    /// JSON has no literal for NaN or infinity; serde_json writes them as
    /// `null`.
    pub fn json() -> Self { Self(Kind::Json) }

    /// `text/yaml` and `application/x-yaml` via serde_yaml.
    pub fn yaml() -> Self { Self(Kind::Yaml) }

    /// `text/plain`. See [`text_marshal`] for what it accepts.
    pub fn text() -> Self { Self(Kind::Text) }

    pub fn marshal<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, Error> {
        match &self.0 {
            Kind::Json => serde_json::to_vec(value).map_err(Error::marshal),
            Kind::Yaml => serde_yaml::to_string(value).map(String::into_bytes).map_err(Error::marshal),
            Kind::Text => text_marshal(value),
            Kind::Custom { marshal, .. } => {
                let value = serde_json::to_value(value).map_err(Error::marshal)?;
                marshal(&value)
            }
        }
    }

    pub fn unmarshal<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, Error> {
        match &self.0 {
            Kind::Json => serde_json::from_slice(body).map_err(Error::decode),
            Kind::Yaml => serde_yaml::from_slice(body).map_err(Error::decode),
            Kind::Text => text_unmarshal(body),
            Kind::Custom { unmarshal, .. } => serde_json::from_value(unmarshal(body)?).map_err(Error::decode),
        }
    }
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.0 {
            Kind::Json => "json",
            Kind::Yaml => "yaml",
            Kind::Text => "text",
            Kind::Custom { .. } => "custom",
        };
        f.debug_tuple("Codec").field(&name).finish()
    }
}

// ── Plain text ────────────────────────────────────────────────────────────────

/// Renders scalars as text.
///
/// Strings are written as-is, numbers in their canonical decimal form
/// (`NaN` and `inf` included), booleans as `true`/`false` and unit enum
/// variants by name. Null, bytes, sequences, maps and structs have no
/// faithful textual form and fail with [`Error::UnsupportedKind`].
pub fn text_marshal<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, Error> {
    match value.serialize(TextSerializer) {
        Ok(s) => Ok(s.into_bytes()),
        Err(TextError::Unsupported(kind)) => Err(Error::UnsupportedKind(kind)),
        Err(TextError::Custom(msg)) => Err(Error::marshal(msg)),
    }
}

/// Takes the body verbatim as a string.
pub fn text_unmarshal<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    let text = std::str::from_utf8(body).map_err(Error::decode)?;
    let de: StrDeserializer<'_, serde::de::value::Error> = text.into_deserializer();
    T::deserialize(de).map_err(Error::decode)
}

#[derive(Debug)]
enum TextError {
    Unsupported(&'static str),
    Custom(String),
}

impl fmt::Display for TextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unsupported(kind) => write!(f, "cannot render {kind} as text"),
            Self::Custom(msg) => f.write_str(msg),
        }
    }
}

impl std::error::Error for TextError {}

impl ser::Error for TextError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        Self::Custom(msg.to_string())
    }
}

/// Accepts exactly the scalar kinds; compound kinds are refused up front.
struct TextSerializer;

impl Serializer for TextSerializer {
    type Ok = String;
    type Error = TextError;

    type SerializeSeq = Impossible<String, TextError>;
    type SerializeTuple = Impossible<String, TextError>;
    type SerializeTupleStruct = Impossible<String, TextError>;
    type SerializeTupleVariant = Impossible<String, TextError>;
    type SerializeMap = Impossible<String, TextError>;
    type SerializeStruct = Impossible<String, TextError>;
    type SerializeStructVariant = Impossible<String, TextError>;

    fn serialize_bool(self, v: bool) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_i8(self, v: i8) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_i16(self, v: i16) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_i32(self, v: i32) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_i64(self, v: i64) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_i128(self, v: i128) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_u8(self, v: u8) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_u16(self, v: u16) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_u32(self, v: u32) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_u64(self, v: u64) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_u128(self, v: u128) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_f32(self, v: f32) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_f64(self, v: f64) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_char(self, v: char) -> Result<String, TextError> { Ok(v.to_string()) }
    fn serialize_str(self, v: &str) -> Result<String, TextError> { Ok(v.to_owned()) }

    fn serialize_bytes(self, _: &[u8]) -> Result<String, TextError> {
        Err(TextError::Unsupported("bytes"))
    }

    fn serialize_none(self) -> Result<String, TextError> {
        Err(TextError::Unsupported("null"))
    }

    fn serialize_some<T: Serialize + ?Sized>(self, value: &T) -> Result<String, TextError> {
        value.serialize(self)
    }

    fn serialize_unit(self) -> Result<String, TextError> {
        Err(TextError::Unsupported("null"))
    }

    fn serialize_unit_struct(self, _: &'static str) -> Result<String, TextError> {
        Err(TextError::Unsupported("unit struct"))
    }

    fn serialize_unit_variant(self, _: &'static str, _: u32, variant: &'static str) -> Result<String, TextError> {
        Ok(variant.to_owned())
    }

    fn serialize_newtype_struct<T: Serialize + ?Sized>(self, _: &'static str, value: &T) -> Result<String, TextError> {
        value.serialize(self)
    }

    fn serialize_newtype_variant<T: Serialize + ?Sized>(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: &T,
    ) -> Result<String, TextError> {
        Err(TextError::Unsupported("enum"))
    }

    fn serialize_seq(self, _: Option<usize>) -> Result<Self::SerializeSeq, TextError> {
        Err(TextError::Unsupported("sequence"))
    }

    fn serialize_tuple(self, _: usize) -> Result<Self::SerializeTuple, TextError> {
        Err(TextError::Unsupported("sequence"))
    }

    fn serialize_tuple_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeTupleStruct, TextError> {
        Err(TextError::Unsupported("sequence"))
    }

    fn serialize_tuple_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeTupleVariant, TextError> {
        Err(TextError::Unsupported("enum"))
    }

    fn serialize_map(self, _: Option<usize>) -> Result<Self::SerializeMap, TextError> {
        Err(TextError::Unsupported("map"))
    }

    fn serialize_struct(self, _: &'static str, _: usize) -> Result<Self::SerializeStruct, TextError> {
        Err(TextError::Unsupported("struct"))
    }

    fn serialize_struct_variant(
        self,
        _: &'static str,
        _: u32,
        _: &'static str,
        _: usize,
    ) -> Result<Self::SerializeStructVariant, TextError> {
        Err(TextError::Unsupported("enum"))
    }
}

/// Serializes any displayable value as its string form.
///
/// This is how error values (or anything else with a textual representation)
/// reach a codec: the text codec writes the message, JSON writes it as a
/// string literal.
///
/// ```rust
/// use conneg::{Negotiator, Request, Textual};
/// use http::StatusCode;
///
/// let negotiator = Negotiator::default();
/// let req = Request::from(http::Request::builder()
///     .header("accept", "text/plain")
///     .body(bytes::Bytes::new())
///     .unwrap());
/// let err = std::io::Error::other("stinky cheese");
/// let res = negotiator.encode(&req, &Textual(err), StatusCode::OK).unwrap();
/// assert_eq!(res.body(), b"stinky cheese");
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Textual<T>(pub T);

impl<T: fmt::Display> Serialize for Textual<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    fn text<T: Serialize + ?Sized>(v: &T) -> Result<String, Error> {
        text_marshal(v).map(|b| String::from_utf8(b).unwrap())
    }

    #[test]
    fn text_renders_scalars() {
        assert_eq!(text("foo").unwrap(), "foo");
        assert_eq!(text(&5).unwrap(), "5");
        assert_eq!(text(&-12i64).unwrap(), "-12");
        assert_eq!(text(&2.5).unwrap(), "2.5");
        assert_eq!(text(&true).unwrap(), "true");
        assert_eq!(text(&'x').unwrap(), "x");
        assert_eq!(text(&Some(7u8)).unwrap(), "7");
        assert_eq!(text(&json!("from a value")).unwrap(), "from a value");
    }

    #[test]
    fn text_renders_wide_and_non_finite_numbers() {
        assert_eq!(text(&f64::NAN).unwrap(), "NaN");
        assert_eq!(text(&f64::INFINITY).unwrap(), "inf");
        assert_eq!(text(&u128::MAX).unwrap(), u128::MAX.to_string());
        assert_eq!(text(&i128::MIN).unwrap(), i128::MIN.to_string());
    }

    #[test]
    fn text_renders_error_values() {
        assert_eq!(text(&Textual(std::io::Error::other("stinky cheese"))).unwrap(), "stinky cheese");
    }

    #[test]
    fn text_renders_unit_variants_by_name() {
        #[derive(Serialize)]
        enum Phase {
            Ready,
        }
        assert_eq!(text(&Phase::Ready).unwrap(), "Ready");
    }

    #[test]
    fn text_rejects_structured_values() {
        #[derive(Serialize)]
        struct Foo {
            foo: i32,
        }
        assert!(matches!(text(&Foo { foo: 5 }), Err(Error::UnsupportedKind("struct"))));
        assert!(matches!(text(&json!({"foo": 5})), Err(Error::UnsupportedKind("map"))));
        assert!(matches!(text(&["a"]), Err(Error::UnsupportedKind("sequence"))));
        assert!(matches!(text(&json!(["a"])), Err(Error::UnsupportedKind("sequence"))));
        assert!(matches!(text(&Value::Null), Err(Error::UnsupportedKind("null"))));
        assert!(matches!(text(&None::<u8>), Err(Error::UnsupportedKind("null"))));
    }

    #[test]
    fn text_unmarshal_is_opaque() {
        assert_eq!(text_unmarshal::<String>(b"{not json").unwrap(), "{not json");
        assert_eq!(text_unmarshal::<Value>(b"added").unwrap(), json!("added"));
        assert!(matches!(text_unmarshal::<String>(&[0xff, 0xfe]), Err(Error::DecodeFailure(_))));
    }

    #[derive(Debug, Deserialize, PartialEq, Serialize)]
    struct Doc {
        name: String,
        tags: Vec<String>,
        count: u32,
        ok: bool,
    }

    #[test]
    fn round_trips() {
        let doc = Doc { name: "Foo".into(), tags: vec!["a".into(), "b".into()], count: 3, ok: true };
        for codec in [Codec::json(), Codec::yaml()] {
            let bytes = codec.marshal(&doc).unwrap();
            assert_eq!(codec.unmarshal::<Doc>(&bytes).unwrap(), doc, "{codec:?}");
        }
        let text = Codec::text();
        let bytes = text.marshal("hello").unwrap();
        assert_eq!(text.unmarshal::<String>(&bytes).unwrap(), "hello");
    }

    #[test]
    fn yaml_round_trips_non_finite_floats() {
        let yaml = Codec::yaml();
        let inf = yaml.marshal(&f64::INFINITY).unwrap();
        assert_eq!(yaml.unmarshal::<f64>(&inf).unwrap(), f64::INFINITY);
        let nan = yaml.marshal(&f64::NAN).unwrap();
        assert!(yaml.unmarshal::<f64>(&nan).unwrap().is_nan());
    }

    #[test]
    fn json_round_trips_u128() {
        let json = Codec::json();
        let bytes = json.marshal(&u128::MAX).unwrap();
        assert_eq!(bytes, u128::MAX.to_string().into_bytes());
        assert_eq!(json.unmarshal::<u128>(&bytes).unwrap(), u128::MAX);
    }

    #[test]
    fn text_round_trips_scalars() {
        let text = Codec::text();
        for n in [u128::MAX.to_string(), f64::INFINITY.to_string(), "-3".to_owned()] {
            let bytes = text.marshal(&n).unwrap();
            assert_eq!(text.unmarshal::<String>(&bytes).unwrap(), n);
        }
    }

    #[test]
    fn custom_codec_sees_a_value_tree() {
        let codec = Codec::new(
            |v| Ok(format!("<{}>", v["name"].as_str().unwrap_or_default()).into_bytes()),
            |body| Ok(json!({ "name": String::from_utf8_lossy(body).trim_matches(['<', '>']) })),
        );
        let doc = Doc { name: "Foo".into(), tags: vec![], count: 0, ok: false };
        assert_eq!(codec.marshal(&doc).unwrap(), b"<Foo>");
        let back: Value = codec.unmarshal(b"<Bar>").unwrap();
        assert_eq!(back, json!({"name": "Bar"}));
    }

    #[test]
    fn malformed_bodies_fail_to_decode() {
        assert!(matches!(Codec::json().unmarshal::<Doc>(b"{\"name\":"), Err(Error::DecodeFailure(_))));
        assert!(matches!(Codec::yaml().unmarshal::<Value>(b"a: [unclosed"), Err(Error::DecodeFailure(_))));
    }

    #[test]
    fn json_output_keeps_field_order() {
        let bytes = Codec::json().marshal(&json!({"b": 1, "a": 2})).unwrap();
        assert_eq!(bytes, br#"{"b":1,"a":2}"#);
    }
}
