use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Deserialize, Debug)]
pub struct DatabaseProperty {
    pub id: String,
    #[serde(rename = "type")]
    pub typ: String,
}

#[derive(Deserialize, Debug)]
pub struct RetrieveDatabaseResp {
    pub id: String,
    #[serde(default)]
    pub title: Vec<RichText>,
    pub properties: std::collections::HashMap<String, DatabaseProperty>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct QueryResponse {
    #[serde(default)]
    pub results: Vec<Page>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Page {
    pub id: String,
    #[serde(default)]
    pub cover: Option<FileObject>,
    /// Raw property values in document order; decode with [`Page::property`].
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl Page {
    /// Decode the named property. Unknown shapes decode as [`PropertyValue::Other`].
    pub fn property(&self, name: &str) -> Option<PropertyValue> {
        self.properties.get(name).map(PropertyValue::decode)
    }

    /// Every property in document order.
    pub fn iter_properties(&self) -> impl Iterator<Item = (&str, PropertyValue)> + '_ {
        self.properties
            .iter()
            .map(|(name, raw)| (name.as_str(), PropertyValue::decode(raw)))
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropertyValue {
    Title {
        #[serde(default)]
        title: Vec<RichText>,
    },
    RichText {
        #[serde(default)]
        rich_text: Vec<RichText>,
    },
    Formula {
        formula: Formula,
    },
    Select {
        #[serde(default)]
        select: Option<SelectOption>,
    },
    Number {
        #[serde(default)]
        number: Option<f64>,
    },
    Checkbox {
        #[serde(default)]
        checkbox: bool,
    },
    Files {
        #[serde(default)]
        files: Vec<FileObject>,
    },
    Url {
        #[serde(default)]
        url: Option<String>,
    },
    Date {
        #[serde(default)]
        date: Option<DateValue>,
    },
    #[serde(other)]
    Other,
}

impl PropertyValue {
    fn decode(raw: &Value) -> Self {
        serde_json::from_value(raw.clone()).unwrap_or(PropertyValue::Other)
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RichText {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct Formula {
    #[serde(default)]
    pub string: Option<String>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SelectOption {
    #[serde(default)]
    pub name: String,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DateValue {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
}

/// A cover image or an entry of a files property.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct FileObject {
    #[serde(default)]
    pub external: Option<FileUrl>,
    #[serde(default)]
    pub file: Option<FileUrl>,
}

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FileUrl {
    pub url: String,
}
