//! Per-kind report descriptions.
//!
//! Expense and game-session reports share one assembler; everything that
//! differs between them (labels, field order, statistics, defaults) lives in
//! a [`ReportLayout`].

use serde::{Deserialize, Serialize};

use super::format::format_number;
use super::item::{ExpenseItem, GameSessionItem};

pub const DEFAULT_STORE_NAME: &str = "Restaurant chez Mamoune";
pub const DEFAULT_STORE_PHONE: &str = "99 83 77 77";
pub const DEFAULT_DATE_RANGE: &str = "Non spécifiée";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportKind {
    Expenses,
    Sessions,
}

impl ReportKind {
    /// Used in default file names
    pub fn file_stem(self) -> &'static str {
        match self {
            ReportKind::Expenses => "depenses",
            ReportKind::Sessions => "sessions_jeu",
        }
    }

    pub fn default_title(self) -> &'static str {
        match self {
            ReportKind::Expenses => "RAPPORT DES DÉPENSES",
            ReportKind::Sessions => "RAPPORT DES SESSIONS DE JEU",
        }
    }

    pub fn default_filter(self) -> &'static str {
        match self {
            ReportKind::Expenses => "Toutes les dépenses",
            ReportKind::Sessions => "Toutes les sessions",
        }
    }
}

/// Header labels of one report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub title: String,
    pub store_name: String,
    pub store_phone: String,
    pub date_range: String,
    pub filter_type: String,
}

/// Caller-supplied header labels; unset fields take the kind's defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialReportConfig {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub store_phone: Option<String>,
    #[serde(default)]
    pub date_range: Option<String>,
    #[serde(default)]
    pub filter_type: Option<String>,
}

impl PartialReportConfig {
    pub fn resolve(self, kind: ReportKind) -> ReportConfig {
        ReportConfig {
            title: self.title.unwrap_or_else(|| kind.default_title().to_string()),
            store_name: self
                .store_name
                .unwrap_or_else(|| DEFAULT_STORE_NAME.to_string()),
            store_phone: self
                .store_phone
                .unwrap_or_else(|| DEFAULT_STORE_PHONE.to_string()),
            date_range: self
                .date_range
                .unwrap_or_else(|| DEFAULT_DATE_RANGE.to_string()),
            filter_type: self
                .filter_type
                .unwrap_or_else(|| kind.default_filter().to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateStyle {
    Date,
    DateTime,
}

/// One `Label: value` line of a detail block. A `None` value drops the line.
pub struct Field<T> {
    pub label: &'static str,
    pub value: fn(&T) -> Option<String>,
}

/// Bucketing of items for a statistics breakdown
pub struct Grouping<T> {
    pub heading: &'static str,
    pub key: fn(&T) -> Option<&str>,
    /// Noun after the count, e.g. `3 sessions`
    pub count_noun: &'static str,
    /// When set, the secondary sum is printed with this suffix
    pub secondary_suffix: Option<&'static str>,
}

/// How the general summary block is printed
pub enum Summary {
    /// Two bold lines: count and total
    Compact {
        count_label: &'static str,
        total_label: &'static str,
    },
    /// Sub-headed block with averages and the secondary measure
    Detailed {
        heading: &'static str,
        count_label: &'static str,
        total_label: &'static str,
        secondary_total_label: &'static str,
        average_label: &'static str,
        secondary_average_label: &'static str,
    },
}

pub struct ReportLayout<T> {
    pub kind: ReportKind,
    /// Prefix of each numbered detail block, e.g. `Dépense #3`
    pub item_label: &'static str,
    pub details_heading: &'static str,
    /// Line estimate used for the page-break check before each block
    pub block_lines: usize,
    pub date_style: DateStyle,
    pub fields: Vec<Field<T>>,
    pub amount_label: &'static str,
    pub summary: Summary,
    /// Second quantity summed alongside the amount (players, units)
    pub secondary: Option<fn(&T) -> f64>,
    pub groupings: Vec<Grouping<T>>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl ReportLayout<ExpenseItem> {
    pub fn expenses() -> Self {
        Self {
            kind: ReportKind::Expenses,
            item_label: "Dépense",
            details_heading: "DÉTAIL DES DÉPENSES",
            block_lines: 8,
            date_style: DateStyle::Date,
            fields: vec![
                Field {
                    label: "Catégorie",
                    value: |e| e.category_name.clone(),
                },
                Field {
                    label: "Description",
                    value: |e| non_empty(&e.description).map(str::to_string),
                },
            ],
            amount_label: "Montant",
            summary: Summary::Compact {
                count_label: "Nombre total de dépenses",
                total_label: "Montant total",
            },
            secondary: None,
            groupings: Vec::new(),
        }
    }
}

impl ReportLayout<GameSessionItem> {
    pub fn sessions() -> Self {
        Self {
            kind: ReportKind::Sessions,
            item_label: "Session",
            details_heading: "DÉTAIL DES SESSIONS DE JEU",
            block_lines: 10,
            date_style: DateStyle::DateTime,
            fields: vec![
                Field {
                    label: "Jeu",
                    value: |s| s.game_name.clone(),
                },
                Field {
                    label: "Modalité",
                    value: |s| Some(s.pricing_description.clone()),
                },
                Field {
                    label: "Mode",
                    value: |s| Some(s.mode.clone()),
                },
                Field {
                    label: "Nombre de joueurs",
                    value: |s| Some(format_number(s.player_count)),
                },
                Field {
                    label: "Statut",
                    value: |s| Some(s.status.clone()),
                },
                Field {
                    label: "Caissier",
                    value: |s| non_empty(&s.cashier_username).map(str::to_string),
                },
                Field {
                    label: "Notes",
                    value: |s| non_empty(&s.notes).map(str::to_string),
                },
            ],
            amount_label: "Total",
            summary: Summary::Detailed {
                heading: "STATISTIQUES GÉNÉRALES",
                count_label: "Nombre total de sessions",
                total_label: "Chiffre d'affaires total",
                secondary_total_label: "Nombre total de joueurs",
                average_label: "Montant moyen par session",
                secondary_average_label: "Moyenne de joueurs par session",
            },
            secondary: Some(|s| s.player_count),
            groupings: vec![
                Grouping {
                    heading: "STATISTIQUES PAR JEU",
                    key: |s| non_empty(&s.game_name),
                    count_noun: "sessions",
                    secondary_suffix: Some("joueurs"),
                },
                Grouping {
                    heading: "STATISTIQUES PAR CAISSIER",
                    key: |s| non_empty(&s.cashier_username),
                    count_noun: "sessions",
                    secondary_suffix: None,
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_falls_back_to_kind_defaults() {
        let config = PartialReportConfig {
            date_range: Some("Du 01/03/2024 au 31/03/2024".to_string()),
            ..Default::default()
        }
        .resolve(ReportKind::Sessions);

        assert_eq!(config.title, "RAPPORT DES SESSIONS DE JEU");
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.store_phone, DEFAULT_STORE_PHONE);
        assert_eq!(config.date_range, "Du 01/03/2024 au 31/03/2024");
        assert_eq!(config.filter_type, "Toutes les sessions");
    }

    #[test]
    fn empty_partial_config_uses_expense_defaults() {
        let config = PartialReportConfig::default().resolve(ReportKind::Expenses);
        assert_eq!(config.title, "RAPPORT DES DÉPENSES");
        assert_eq!(config.date_range, DEFAULT_DATE_RANGE);
        assert_eq!(config.filter_type, "Toutes les dépenses");
    }
}
