use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

pub const BLOCK_SIGNED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Envelope returned by Covalent `transactions_v2`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsResponse {
    #[serde(default)]
    pub data: Option<TransactionsData>,
    #[serde(default)]
    pub error: Option<bool>,
    #[serde(default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionsData {
    pub address: Option<String>,
    #[serde(default)]
    pub items: Vec<ApiTransaction>,
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub has_more: Option<bool>,
    pub page_number: Option<u32>,
    pub page_size: Option<u32>,
}

/// One transaction item as the indexer returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiTransaction {
    pub block_signed_at: Option<String>,
    pub block_height: Option<u64>,
    pub tx_hash: Option<String>,
    pub successful: Option<bool>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    #[serde(deserialize_with = "de_opt_string_any", default)]
    pub value: Option<String>,
}

/// A single page of transactions after decoding.
#[derive(Debug, Clone, Default)]
pub struct TransactionsPage {
    pub items: Vec<ApiTransaction>,
    pub has_more: bool,
}

impl TransactionsResponse {
    pub fn into_page(self) -> TransactionsPage {
        let Some(data) = self.data else {
            return TransactionsPage::default();
        };
        let has_more = data
            .pagination
            .and_then(|p| p.has_more)
            .unwrap_or(false);
        TransactionsPage {
            items: data.items,
            has_more,
        }
    }
}

/// A transaction row tagged with the wallet it was fetched for.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub wallet: String,
    /// Signed amount; positive is a supply, negative a withdrawal. `None` when
    /// the wire value was missing or not a number.
    pub value: Option<f64>,
    /// `None` when `block_signed_at` was missing or malformed.
    pub timestamp: Option<DateTime<Utc>>,
    pub tx_hash: Option<String>,
}

impl TransactionRecord {
    pub fn from_api(wallet: &str, tx: ApiTransaction) -> Self {
        Self {
            wallet: wallet.to_string(),
            value: tx.value.as_deref().and_then(parse_value),
            timestamp: tx.block_signed_at.as_deref().and_then(parse_block_signed_at),
            tx_hash: tx.tx_hash,
        }
    }
}

fn parse_value(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

pub fn parse_block_signed_at(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, BLOCK_SIGNED_AT_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Deserialize a field that can be either a string or a number into Option<String>.
fn de_opt_string_any<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de;

    struct StringOrNumber;

    impl de::Visitor<'_> for StringOrNumber {
        type Value = Option<String>;

        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a string or number")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }
    }

    deserializer.deserialize_any(StringOrNumber)
}
