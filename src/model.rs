// ABOUTME: Card catalog entities and their flat-file document shape
// ABOUTME: Enumerated columns map 1:1 onto the labels allowed by the schema check constraints

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Declares a closed set of labels stored as TEXT
macro_rules! labelled_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $label)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok($name::$variant),)+
                    other => Err(format!(
                        "'{}' is not a valid {} label",
                        other,
                        stringify!($name)
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|e: String| FromSqlError::Other(e.into()))
            }
        }
    };
}

labelled_enum!(
    /// Card category
    CardType {
        Leader => "LEADER",
        Battle => "BATTLE",
        Extra => "EXTRA",
    }
);

labelled_enum!(Color {
    Red => "Red",
    Blue => "Blue",
    Green => "Green",
    Yellow => "Yellow",
    Black => "Black",
});

labelled_enum!(Rarity {
    L => "L",
    C => "C",
    R => "R",
    SR => "SR",
    SCR => "SCR",
    PR => "PR",
});

labelled_enum!(
    /// Face of a double-sided card; single-sided cards store no side
    Side {
        Front => "FRONT",
        Back => "BACK",
    }
);

labelled_enum!(Language {
    EN => "EN",
    JP => "JP",
});

/// One exported card: the `card` row plus every child row that hangs off it
///
/// Child collections are `None` when the card has no rows of that kind, which
/// serializes as JSON `null` rather than an empty array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardDocument {
    pub cardid: String,
    #[serde(rename = "type")]
    pub card_type: CardType,
    pub color: Color,
    pub rarity: Rarity,
    pub detail: Option<Vec<DetailDocument>>,
    pub faq: Option<Vec<FaqDocument>>,
    pub image: Option<Vec<ImageDocument>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailDocument {
    pub side: Option<Side>,
    pub language: Language,
    pub name: String,
    pub cost: Option<i64>,
    pub specifiedcost: Option<String>,
    pub power: Option<i64>,
    pub combopower: Option<i64>,
    pub traits: Option<String>,
    pub effect: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqDocument {
    pub faqid: String,
    pub language: Language,
    pub question: String,
    pub answer: Option<String>,
    pub related: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageDocument {
    pub side: Option<Side>,
    pub language: Language,
    pub format: String,
    #[serde(with = "base64_payload")]
    pub image: Vec<u8>,
}

impl CardDocument {
    /// A card with no child rows
    pub fn new(cardid: impl Into<String>, card_type: CardType, color: Color, rarity: Rarity) -> Self {
        Self {
            cardid: cardid.into(),
            card_type,
            color,
            rarity,
            detail: None,
            faq: None,
            image: None,
        }
    }

    pub fn details(&self) -> &[DetailDocument] {
        self.detail.as_deref().unwrap_or_default()
    }

    pub fn faqs(&self) -> &[FaqDocument] {
        self.faq.as_deref().unwrap_or_default()
    }

    pub fn images(&self) -> &[ImageDocument] {
        self.image.as_deref().unwrap_or_default()
    }
}

impl FaqDocument {
    pub fn related_ids(&self) -> &[String] {
        self.related.as_deref().unwrap_or_default()
    }
}

mod base64_payload {
    use crate::sqlite::converter::{decode_blob, encode_blob};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&encode_blob(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        decode_blob(&encoded).map_err(serde::de::Error::custom)
    }
}
