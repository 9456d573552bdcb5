use serde::{Deserialize, Deserializer, Serialize};

/// A business record that can appear in a report
pub trait ReportItem {
    fn id(&self) -> &str;
    /// Raw timestamp as received
    fn timestamp(&self) -> &str;
    /// Primary amount, summed into the report total
    fn amount(&self) -> f64;
}

/// Accept numbers, numeric strings, or anything else (as `NaN`).
///
/// The backend sends decimals as strings; malformed values are kept and
/// rendered as `NaN` instead of rejecting the whole report.
pub fn lenient_number<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                0.0
            } else {
                trimmed.parse().unwrap_or(f64::NAN)
            }
        }
        serde_json::Value::Bool(b) => f64::from(u8::from(b)),
        serde_json::Value::Null => 0.0,
        _ => f64::NAN,
    })
}

/// One expense line, already enriched with its category name
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ExpenseItem {
    pub expense_id: String,
    #[serde(default)]
    pub expense_category_id: String,
    #[serde(default)]
    pub category_name: Option<String>,
    #[serde(deserialize_with = "lenient_number")]
    pub amount: f64,
    #[serde(default)]
    pub description: Option<String>,
    pub date: String,
}

impl ReportItem for ExpenseItem {
    fn id(&self) -> &str {
        &self.expense_id
    }

    fn timestamp(&self) -> &str {
        &self.date
    }

    fn amount(&self) -> f64 {
        self.amount
    }
}

/// One played game session
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct GameSessionItem {
    pub session_id: String,
    #[serde(default)]
    pub game_id: String,
    #[serde(default)]
    pub game_name: Option<String>,
    #[serde(default)]
    pub pricing_id: String,
    #[serde(default)]
    pub pricing_description: String,
    #[serde(default)]
    pub mode: String,
    #[serde(deserialize_with = "lenient_number", default)]
    pub player_count: f64,
    #[serde(deserialize_with = "lenient_number")]
    pub total_price: f64,
    #[serde(default)]
    pub cashier_username: Option<String>,
    pub created_at: String,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub status: String,
}

impl ReportItem for GameSessionItem {
    fn id(&self) -> &str {
        &self.session_id
    }

    fn timestamp(&self) -> &str {
        &self.created_at
    }

    fn amount(&self) -> f64 {
        self.total_price
    }
}
