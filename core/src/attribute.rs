// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use super::*;

use serde::Deserializer;
use serde::de::DeserializeOwned;
use serde::de::IntoDeserializer;
use serde::de::Visitor;
use serde::de::value::MapDeserializer;
use std::collections::BTreeMap;
use unicase::UniCase;

/// The default, untyped bag of custom user attributes.
pub type Properties = BTreeMap<String, String>;

pub const EMAIL_ATTRIBUTE: &str = "email";
pub const EMAIL_VERIFIED_ATTRIBUTE: &str = "email_verified";

/// Cognito's internal subject identifier. It is never surfaced in a
/// [`UserRecord`].
pub const SUB_ATTRIBUTE: &str = "sub";

/// Keys that are fields of [`UserRecord`] and so cannot be supplied as custom
/// attributes.
pub const RESERVED_ATTRIBUTES: [&str; 3] =
    ["id", EMAIL_ATTRIBUTE, EMAIL_VERIFIED_ATTRIBUTE];

/// A single name/value pair stored against a user in the pool.
#[derive(Serialize, Deserialize, JsonSchema, Clone, Debug, PartialEq)]
pub struct Attribute {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Value", default)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self { name: name.into(), value: Some(value.into()) }
    }
}

/// A user as the identity provider describes it.
///
/// Cognito uses `Attributes` in `UserType` (AdminCreateUser, ListUsers) and
/// `UserAttributes` in the AdminGetUser response; both deserialize here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct RawUser {
    #[serde(rename = "Username")]
    pub username: String,

    #[serde(rename = "Attributes", alias = "UserAttributes", default)]
    pub attributes: Vec<Attribute>,
}

impl RawUser {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .and_then(|attribute| attribute.value.as_deref())
    }
}

/// `password` is never sent as an attribute, whatever its case.
pub fn is_password_key(name: &str) -> bool {
    UniCase::new(name) == UniCase::new("password")
}

/// Turn a caller supplied attribute bag into the attribute list sent to the
/// identity provider.
///
/// Strings pass through, numbers and booleans are stringified, and `null`
/// (an unset optional field) is skipped. Reserved keys are rejected, and any
/// `password` key is dropped.
pub fn encode_attributes<T>(attributes: &T) -> Result<Vec<Attribute>, Error>
where
    T: Serialize,
{
    let value = serde_json::to_value(attributes).map_err(|e| {
        Error::invalid_parameter(format!(
            "failed to serialize user attributes: {e}"
        ))
    })?;

    let serde_json::Value::Object(map) = value else {
        return Err(Error::invalid_parameter(
            "user attributes must serialize to an object",
        ));
    };

    let mut encoded = Vec::with_capacity(map.len());

    for (name, value) in map {
        if RESERVED_ATTRIBUTES.contains(&name.as_str()) {
            return Err(Error::invalid_parameter(format!(
                "attribute {name} is reserved and cannot be set directly"
            )));
        }

        if is_password_key(&name) {
            continue;
        }

        let value = match value {
            serde_json::Value::Null => continue,
            serde_json::Value::String(s) => s,
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(Error::invalid_parameter(format!(
                    "attribute {name} must be a string, number, or boolean"
                )));
            }
        };

        encoded.push(Attribute::new(name, value));
    }

    Ok(encoded)
}

/// Read a normalized attribute map back into the caller's attribute type.
///
/// Every stored value is a string. Fields typed as numbers or booleans are
/// parsed from that string, mirroring [`encode_attributes`].
pub fn decode_attributes<T>(properties: Properties) -> Result<T, Error>
where
    T: DeserializeOwned,
{
    let deserializer = MapDeserializer::<_, serde_json::Error>::new(
        properties
            .into_iter()
            .map(|(name, value)| (name, AttributeValue(value))),
    );

    T::deserialize(deserializer).map_err(|e| {
        Error::internal_error(format!(
            "failed to decode user attributes: {e}"
        ))
    })
}

/// A stored attribute value, deserialized as whatever scalar the target
/// field asks for.
struct AttributeValue(String);

macro_rules! parse_scalar {
    ($($method:ident => $ty:ty, $visit:ident;)*) => {
        $(
            fn $method<V>(self, visitor: V) -> Result<V::Value, Self::Error>
            where
                V: Visitor<'de>,
            {
                match self.0.parse::<$ty>() {
                    Ok(value) => visitor.$visit(value),
                    // Let the visitor report the type mismatch
                    Err(_) => visitor.visit_string(self.0),
                }
            }
        )*
    };
}

impl<'de> IntoDeserializer<'de, serde_json::Error> for AttributeValue {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

impl<'de> Deserializer<'de> for AttributeValue {
    type Error = serde_json::Error;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_string(self.0)
    }

    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Self::Error>
    where
        V: Visitor<'de>,
    {
        visitor.visit_enum(self.0.into_deserializer())
    }

    parse_scalar! {
        deserialize_bool => bool, visit_bool;
        deserialize_i8 => i8, visit_i8;
        deserialize_i16 => i16, visit_i16;
        deserialize_i32 => i32, visit_i32;
        deserialize_i64 => i64, visit_i64;
        deserialize_u8 => u8, visit_u8;
        deserialize_u16 => u16, visit_u16;
        deserialize_u32 => u32, visit_u32;
        deserialize_u64 => u64, visit_u64;
        deserialize_f32 => f32, visit_f32;
        deserialize_f64 => f64, visit_f64;
    }

    serde::forward_to_deserialize_any! {
        i128 u128 char str string bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}
