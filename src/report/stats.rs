use serde::Serialize;

use super::item::ReportItem;
use super::kind::Grouping;

/// Group key for items whose classification field is missing
pub const UNKNOWN_GROUP: &str = "Inconnu";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupStats {
    pub key: String,
    pub count: usize,
    pub total: f64,
    pub secondary: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Breakdown {
    pub heading: String,
    /// In order of first appearance in the input
    pub groups: Vec<GroupStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statistics {
    pub count: usize,
    pub total: f64,
    pub secondary_total: f64,
    pub breakdowns: Vec<Breakdown>,
}

impl Statistics {
    /// Total per item, 0 for an empty report
    pub fn average(&self) -> f64 {
        ratio(self.total, self.count)
    }

    pub fn secondary_average(&self) -> f64 {
        ratio(self.secondary_total, self.count)
    }
}

fn ratio(sum: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

fn breakdown<T: ReportItem>(
    items: &[T],
    grouping: &Grouping<T>,
    secondary: Option<fn(&T) -> f64>,
) -> Breakdown {
    let mut groups: Vec<GroupStats> = Vec::new();

    for item in items {
        let key = (grouping.key)(item).unwrap_or(UNKNOWN_GROUP);
        let idx = match groups.iter().position(|g| g.key == key) {
            Some(idx) => idx,
            None => {
                groups.push(GroupStats {
                    key: key.to_string(),
                    count: 0,
                    total: 0.0,
                    secondary: 0.0,
                });
                groups.len() - 1
            }
        };

        let group = &mut groups[idx];
        group.count += 1;
        group.total += item.amount();
        if let Some(measure) = secondary {
            group.secondary += measure(item);
        }
    }

    Breakdown {
        heading: grouping.heading.to_string(),
        groups,
    }
}

/// Summarize `items`; recomputed from scratch on every call.
pub fn compute<T: ReportItem>(
    items: &[T],
    secondary: Option<fn(&T) -> f64>,
    groupings: &[Grouping<T>],
) -> Statistics {
    let total: f64 = items.iter().map(ReportItem::amount).sum();
    let secondary_total: f64 = match secondary {
        Some(measure) => items.iter().map(measure).sum(),
        None => 0.0,
    };

    Statistics {
        count: items.len(),
        total,
        secondary_total,
        breakdowns: groupings
            .iter()
            .map(|g| breakdown(items, g, secondary))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::item::{ExpenseItem, GameSessionItem};
    use crate::report::kind::ReportLayout;

    fn expense(id: &str, amount: f64, category: Option<&str>) -> ExpenseItem {
        ExpenseItem {
            expense_id: id.to_string(),
            expense_category_id: String::new(),
            category_name: category.map(str::to_string),
            amount,
            description: None,
            date: "2024-03-01".to_string(),
        }
    }

    fn session(game: Option<&str>, cashier: Option<&str>, price: f64, players: f64) -> GameSessionItem {
        GameSessionItem {
            session_id: "s".to_string(),
            game_id: String::new(),
            game_name: game.map(str::to_string),
            pricing_id: String::new(),
            pricing_description: String::new(),
            mode: String::new(),
            player_count: players,
            total_price: price,
            cashier_username: cashier.map(str::to_string),
            created_at: "2024-03-01T10:00:00".to_string(),
            notes: None,
            status: String::new(),
        }
    }

    fn by_category() -> Grouping<ExpenseItem> {
        Grouping {
            heading: "PAR CATÉGORIE",
            key: |e| e.category_name.as_deref(),
            count_noun: "dépenses",
            secondary_suffix: None,
        }
    }

    #[test]
    fn count_and_total_match_input() {
        let items = vec![
            expense("a", 0.1, None),
            expense("b", 0.2, None),
            expense("c", 1500.0, None),
        ];
        let stats = compute(&items, None, &[]);
        assert_eq!(stats.count, 3);
        assert!((stats.total - 1500.3).abs() < 1e-6);
    }

    #[test]
    fn empty_input_has_zero_averages() {
        let items: Vec<GameSessionItem> = Vec::new();
        let layout = ReportLayout::sessions();
        let stats = compute(&items, layout.secondary, &layout.groupings);
        assert_eq!(stats.count, 0);
        assert_eq!(stats.average(), 0.0);
        assert_eq!(stats.secondary_average(), 0.0);
        assert!(stats.breakdowns.iter().all(|b| b.groups.is_empty()));
    }

    #[test]
    fn groups_partition_input_in_first_seen_order() {
        let items = vec![
            expense("a", 100.0, Some("Transport")),
            expense("b", 200.0, None),
            expense("c", 300.0, Some("Fournitures")),
            expense("d", 400.0, Some("Transport")),
        ];
        let stats = compute(&items, None, &[by_category()]);
        let groups = &stats.breakdowns[0].groups;

        let keys: Vec<&str> = groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["Transport", UNKNOWN_GROUP, "Fournitures"]);
        assert_eq!(groups.iter().map(|g| g.count).sum::<usize>(), items.len());
        assert_eq!(groups[0].count, 2);
        assert_eq!(groups[0].total, 500.0);
    }

    #[test]
    fn session_breakdowns_sum_players_per_game() {
        let items = vec![
            session(Some("FIFA"), Some("awa"), 1000.0, 2.0),
            session(Some("PES"), None, 500.0, 1.0),
            session(Some("FIFA"), Some("awa"), 2000.0, 4.0),
            session(Some(""), Some("koffi"), 700.0, 3.0),
        ];
        let layout = ReportLayout::sessions();
        let stats = compute(&items, layout.secondary, &layout.groupings);

        assert_eq!(stats.secondary_total, 10.0);
        assert_eq!(stats.average(), 1050.0);
        assert_eq!(stats.secondary_average(), 2.5);

        let games = &stats.breakdowns[0];
        assert_eq!(games.heading, "STATISTIQUES PAR JEU");
        assert_eq!(games.groups[0].key, "FIFA");
        assert_eq!(games.groups[0].secondary, 6.0);
        assert_eq!(games.groups[2].key, UNKNOWN_GROUP);

        let cashiers = &stats.breakdowns[1];
        let keys: Vec<&str> = cashiers.groups.iter().map(|g| g.key.as_str()).collect();
        assert_eq!(keys, vec!["awa", UNKNOWN_GROUP, "koffi"]);
    }

    #[test]
    fn nan_amount_propagates_to_total() {
        let items = vec![expense("a", 100.0, None), expense("b", f64::NAN, None)];
        assert!(compute(&items, None, &[]).total.is_nan());
    }
}
