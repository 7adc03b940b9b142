//! Lenient deserializers for the directory's loosely-typed JSON.
//!
//! The directory serialises most numbers and flags as strings (`"42"`, `"0"`)
//! but not consistently, and uses `""` and `null` interchangeably for missing
//! values. These helpers accept every form seen in practice.

use serde::{Deserialize, Deserializer, de::Error as _};

/// Any JSON scalar.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum Scalar {
  Bool(bool),
  UInt(u64),
  Int(i64),
  Float(f64),
  Str(String),
}

impl Scalar {
  fn into_text(self) -> String {
    match self {
      Scalar::Bool(b) => b.to_string(),
      Scalar::UInt(n) => n.to_string(),
      Scalar::Int(n) => n.to_string(),
      Scalar::Float(n) => n.to_string(),
      Scalar::Str(s) => s,
    }
  }

  /// Returns the raw text on failure so callers can report it.
  pub(crate) fn into_u64(self) -> Result<u64, String> {
    match self {
      Scalar::UInt(n) => Ok(n),
      Scalar::Str(s) => s.trim().parse().map_err(|_| s),
      other => Err(other.into_text()),
    }
  }
}

/// Defines a `u64` identifier newtype that deserializes from either a JSON
/// number or a numeric string.
macro_rules! numeric_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub u64);

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
      }
    }

    impl From<u64> for $name {
      fn from(value: u64) -> Self { Self(value) }
    }

    impl std::str::FromStr for $name {
      type Err = $crate::Error;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
          .parse()
          .map(Self)
          .map_err(|_| $crate::Error::InvalidId(s.to_owned()))
      }
    }

    impl<'de> serde::Deserialize<'de> for $name {
      fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        <$crate::de::Scalar as serde::Deserialize>::deserialize(d)?
          .into_u64()
          .map(Self)
          .map_err(|raw| {
            <D::Error as serde::de::Error>::custom(format!(
              "invalid identifier: {raw:?}"
            ))
          })
      }
    }
  };
}

pub(crate) use numeric_id;

/// A required scalar rendered as text: `"12"` and `12` both become `"12"`.
pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
  Ok(Scalar::deserialize(d)?.into_text())
}

/// A nullable scalar rendered as text; `null` becomes the empty string.
pub fn text_or_empty<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<String, D::Error> {
  Ok(
    Option::<Scalar>::deserialize(d)?
      .map(Scalar::into_text)
      .unwrap_or_default(),
  )
}

/// A nullable scalar where blank strings count as absent.
pub fn non_blank<'de, D: Deserializer<'de>>(
  d: D,
) -> Result<Option<String>, D::Error> {
  Ok(
    Option::<Scalar>::deserialize(d)?
      .map(Scalar::into_text)
      .filter(|s| !s.trim().is_empty()),
  )
}

/// A boolean flag: `true`, `1` and `"1"` are set; `false`, `0`, `"0"`, `""`
/// and `null` are not.
pub fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
  match Option::<Scalar>::deserialize(d)? {
    None => Ok(false),
    Some(Scalar::Bool(b)) => Ok(b),
    Some(Scalar::UInt(n)) => Ok(n != 0),
    Some(Scalar::Int(n)) => Ok(n != 0),
    Some(Scalar::Float(n)) => Ok(n != 0.0),
    Some(Scalar::Str(s)) => match s.trim() {
      "" | "0" | "false" => Ok(false),
      "1" | "true" => Ok(true),
      other => Err(D::Error::custom(format!("invalid flag: {other:?}"))),
    },
  }
}

/// A nullable identifier; `null` and `""` are absent.
pub fn optional_id<'de, D, T>(d: D) -> Result<Option<T>, D::Error>
where
  D: Deserializer<'de>,
  T: From<u64>,
{
  match Option::<Scalar>::deserialize(d)? {
    None => Ok(None),
    Some(Scalar::Str(s)) if s.trim().is_empty() => Ok(None),
    Some(raw) => raw.into_u64().map(|n| Some(T::from(n))).map_err(|raw| {
      D::Error::custom(format!("invalid identifier: {raw:?}"))
    }),
  }
}
