use chrono::{Local, NaiveDateTime};
use tracing::debug;

use super::format::{
    format_currency, format_date, format_date_time, format_local_date_time, format_number,
};
use super::item::{ExpenseItem, GameSessionItem, ReportItem};
use super::kind::{DateStyle, PartialReportConfig, ReportConfig, ReportKind, ReportLayout, Summary};
use super::layout::{Align, Canvas, Document, PAGE_HEIGHT};
use super::stats::{self, Statistics};

/// Length of the id prefix shown in each detail block
const ID_PREFIX_LEN: usize = 8;

pub const END_MARKER: &str = "--- Fin du rapport ---";

/// Lays out one kind of report: header, statistics, then one block per item.
///
/// Every call to [`generate`](Self::generate) starts from a fresh cursor, so
/// a generator can be reused for several reports one after the other.
pub struct ReportGenerator<T> {
    layout: ReportLayout<T>,
    config: ReportConfig,
    generated_at: Option<NaiveDateTime>,
}

impl ReportGenerator<ExpenseItem> {
    pub fn expenses(config: PartialReportConfig) -> Self {
        Self::new(ReportLayout::expenses(), config)
    }
}

impl ReportGenerator<GameSessionItem> {
    pub fn sessions(config: PartialReportConfig) -> Self {
        Self::new(ReportLayout::sessions(), config)
    }
}

impl<T: ReportItem> ReportGenerator<T> {
    pub fn new(layout: ReportLayout<T>, config: PartialReportConfig) -> Self {
        let config = config.resolve(layout.kind);
        Self {
            layout,
            config,
            generated_at: None,
        }
    }

    /// Pin the `Généré le` timestamp instead of reading the clock
    pub fn with_generated_at(mut self, at: NaiveDateTime) -> Self {
        self.generated_at = Some(at);
        self
    }

    pub fn kind(&self) -> ReportKind {
        self.layout.kind
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Statistics for `items`, as printed in the summary block
    pub fn statistics(&self, items: &[T]) -> Statistics {
        stats::compute(items, self.layout.secondary, &self.layout.groupings)
    }

    /// Lay out the full report; item order is kept as given.
    pub fn generate(&self, items: &[T]) -> Document {
        let mut canvas = Canvas::new();

        self.add_header(&mut canvas);
        self.add_statistics(&mut canvas, &self.statistics(items));
        self.add_details(&mut canvas, items);

        canvas.move_to(PAGE_HEIGHT - 15.0);
        canvas.add_line(END_MARKER, 10.0, Align::Center, true);

        debug!(
            kind = ?self.layout.kind,
            items = items.len(),
            pages = canvas.page_count(),
            "report laid out"
        );
        canvas.finish()
    }

    fn add_header(&self, canvas: &mut Canvas) {
        let generated_at = self
            .generated_at
            .unwrap_or_else(|| Local::now().naive_local());

        canvas.add_title(&self.config.store_name, 18.0, true);
        canvas.add_line(
            &format!("Tel: {}", self.config.store_phone),
            12.0,
            Align::Center,
            false,
        );
        canvas.add_space(10.0);
        canvas.add_title(&self.config.title, 16.0, true);
        canvas.add_line(
            &format!("Période: {}", self.config.date_range),
            12.0,
            Align::Center,
            false,
        );
        canvas.add_line(
            &format!("Type de filtre: {}", self.config.filter_type),
            10.0,
            Align::Center,
            false,
        );
        canvas.add_line(
            &format!("Généré le: {}", format_local_date_time(&generated_at)),
            10.0,
            Align::Center,
            false,
        );
        canvas.add_separator(1.0);
        canvas.add_space(5.0);
    }

    fn add_statistics(&self, canvas: &mut Canvas, stats: &Statistics) {
        canvas.add_line("RÉSUMÉ STATISTIQUES", 14.0, Align::Center, true);
        canvas.add_space(5.0);

        match &self.layout.summary {
            Summary::Compact {
                count_label,
                total_label,
            } => {
                canvas.add_line(
                    &format!("{count_label}: {}", stats.count),
                    12.0,
                    Align::Left,
                    true,
                );
                canvas.add_line(
                    &format!("{total_label}: {}", format_currency(stats.total)),
                    12.0,
                    Align::Left,
                    true,
                );
                canvas.add_space(5.0);
            }
            Summary::Detailed {
                heading,
                count_label,
                total_label,
                secondary_total_label,
                average_label,
                secondary_average_label,
            } => {
                canvas.add_line(heading, 12.0, Align::Left, true);
                let lines = [
                    format!("{count_label}: {}", stats.count),
                    format!("{total_label}: {}", format_currency(stats.total)),
                    format!(
                        "{secondary_total_label}: {}",
                        format_number(stats.secondary_total)
                    ),
                    format!("{average_label}: {}", format_currency(stats.average())),
                    format!(
                        "{secondary_average_label}: {}",
                        format_one_decimal(stats.secondary_average())
                    ),
                ];
                for line in &lines {
                    canvas.add_line(line, 10.0, Align::Left, false);
                }
                canvas.add_space(5.0);
            }
        }

        for (grouping, breakdown) in self.layout.groupings.iter().zip(&stats.breakdowns) {
            if breakdown.groups.is_empty() {
                continue;
            }
            canvas.add_line(&breakdown.heading, 12.0, Align::Left, true);
            for group in &breakdown.groups {
                let mut line = format!(
                    "{}: {} {}, {}",
                    group.key,
                    group.count,
                    grouping.count_noun,
                    format_currency(group.total)
                );
                if let Some(suffix) = grouping.secondary_suffix {
                    line.push_str(&format!(", {} {suffix}", format_number(group.secondary)));
                }
                canvas.add_line(&line, 9.0, Align::Left, false);
            }
            canvas.add_space(5.0);
        }

        canvas.add_separator(0.5);
    }

    fn add_details(&self, canvas: &mut Canvas, items: &[T]) {
        canvas.check_page_break(1);
        canvas.add_line(self.layout.details_heading, 14.0, Align::Center, true);
        canvas.add_space(5.0);

        for (index, item) in items.iter().enumerate() {
            canvas.check_page_break(self.layout.block_lines);

            canvas.add_line(
                &format!(
                    "{} #{} - {}",
                    self.layout.item_label,
                    index + 1,
                    id_prefix(item.id())
                ),
                11.0,
                Align::Left,
                true,
            );

            let date = match self.layout.date_style {
                DateStyle::Date => format_date(item.timestamp()),
                DateStyle::DateTime => format_date_time(item.timestamp()),
            };
            canvas.add_line(&format!("Date: {date}"), 9.0, Align::Left, false);

            for field in &self.layout.fields {
                let Some(value) = (field.value)(item) else {
                    continue;
                };
                canvas.add_line(&format!("{}: {value}", field.label), 9.0, Align::Left, false);
            }

            canvas.add_line(
                &format!(
                    "{}: {}",
                    self.layout.amount_label,
                    format_currency(item.amount())
                ),
                9.0,
                Align::Left,
                true,
            );

            canvas.add_space(3.0);
            canvas.add_separator(0.3);
        }
    }
}

fn id_prefix(id: &str) -> &str {
    match id.char_indices().nth(ID_PREFIX_LEN) {
        Some((end, _)) => &id[..end],
        None => id,
    }
}

/// One decimal with a dot, as used for the players-per-session average
fn format_one_decimal(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1}")
    } else {
        format_number(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::layout::{DrawOp, LINE_HEIGHT};
    use chrono::NaiveDate;

    fn fixed_time() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn expense(id: &str, amount: f64, date: &str, category: &str) -> ExpenseItem {
        ExpenseItem {
            expense_id: id.to_string(),
            expense_category_id: String::new(),
            category_name: Some(category.to_string()),
            amount,
            description: None,
            date: date.to_string(),
        }
    }

    fn session(id: &str, game: &str, cashier: Option<&str>, price: f64, players: f64) -> GameSessionItem {
        GameSessionItem {
            session_id: id.to_string(),
            game_id: "g".to_string(),
            game_name: Some(game.to_string()),
            pricing_id: "p".to_string(),
            pricing_description: "30 minutes".to_string(),
            mode: "solo".to_string(),
            player_count: players,
            total_price: price,
            cashier_username: cashier.map(str::to_string),
            created_at: "2024-03-02T18:45:00".to_string(),
            notes: None,
            status: "terminée".to_string(),
        }
    }

    fn expense_generator() -> ReportGenerator<ExpenseItem> {
        ReportGenerator::expenses(PartialReportConfig::default()).with_generated_at(fixed_time())
    }

    #[test]
    fn expense_report_end_to_end() {
        let items = vec![
            expense("abc12345", 1500.0, "2024-03-01", "Fournitures"),
            expense("def67890", 2500.0, "2024-03-02", "Transport"),
        ];
        let doc = expense_generator().generate(&items);
        let lines = doc.lines();

        assert_eq!(
            &lines[..8],
            &[
                "Restaurant chez Mamoune",
                "Tel: 99 83 77 77",
                "RAPPORT DES DÉPENSES",
                "Période: Non spécifiée",
                "Type de filtre: Toutes les dépenses",
                "Généré le: 05/03/2024 09:30:00",
                "RÉSUMÉ STATISTIQUES",
                "Nombre total de dépenses: 2",
            ]
        );
        assert!(lines.contains(&"Montant total: 4 000,00 FCFA"));

        let first = lines.iter().position(|l| *l == "Dépense #1 - abc12345").unwrap();
        assert_eq!(
            &lines[first..first + 4],
            &[
                "Dépense #1 - abc12345",
                "Date: 01/03/2024",
                "Catégorie: Fournitures",
                "Montant: 1 500,00 FCFA",
            ]
        );
        let second = lines.iter().position(|l| *l == "Dépense #2 - def67890").unwrap();
        assert!(second > first);
        assert_eq!(lines.last(), Some(&END_MARKER));
    }

    #[test]
    fn detail_blocks_keep_input_order() {
        let items = vec![
            expense("c", 1.0, "2024-01-03", "A"),
            expense("a", 1.0, "2024-01-01", "A"),
            expense("b", 1.0, "2024-01-02", "A"),
        ];
        let doc = expense_generator().generate(&items);
        let dates: Vec<&str> = doc
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("Date: "))
            .collect();
        assert_eq!(
            dates,
            vec!["Date: 03/01/2024", "Date: 01/01/2024", "Date: 02/01/2024"]
        );
    }

    #[test]
    fn long_ids_are_cut_to_eight_characters() {
        let items = vec![expense(
            "0f8fad5b-d9cb-469f-a165-70867728950e",
            10.0,
            "2024-01-01",
            "A",
        )];
        let doc = expense_generator().generate(&items);
        assert!(doc.lines().contains(&"Dépense #1 - 0f8fad5b"));
    }

    #[test]
    fn optional_description_is_omitted_or_printed() {
        let mut with_text = expense("a", 10.0, "2024-01-01", "Gaz");
        with_text.description = Some("Bouteille 12kg".to_string());
        let without = expense("b", 10.0, "2024-01-01", "Gaz");

        let doc = expense_generator().generate(&[with_text, without]);
        let descriptions: Vec<&str> = doc
            .lines()
            .into_iter()
            .filter(|l| l.starts_with("Description"))
            .collect();
        assert_eq!(descriptions, vec!["Description: Bouteille 12kg"]);
    }

    #[test]
    fn long_free_text_is_printed_in_full() {
        let text = "Achat de fournitures de cuisine pour la semaine: huile, riz, oignons, \
                    tomates, piment, poisson fumé et charbon, livrés au restaurant chez Mamoune";
        let mut item = expense("a", 10.0, "2024-01-01", "Cuisine");
        item.description = Some(text.to_string());

        let doc = expense_generator().generate(&[item]);
        let expected = format!("Description: {text}");
        assert!(doc.lines().contains(&expected.as_str()));
        assert!(!doc.lines().iter().any(|l| l.contains('…')));
    }

    #[test]
    fn malformed_values_render_literally() {
        let items = vec![expense("a", f64::NAN, "pas une date", "Divers")];
        let lines = expense_generator().generate(&items);
        let lines = lines.lines();
        assert!(lines.contains(&"Date: Invalid Date"));
        assert!(lines.contains(&"Montant: NaN FCFA"));
        assert!(lines.contains(&"Montant total: NaN FCFA"));
    }

    #[test]
    fn session_report_statistics_block() {
        let items = vec![
            session("s1", "FIFA", Some("awa"), 1000.0, 2.0),
            session("s2", "PES", None, 500.0, 1.0),
        ];
        let generator =
            ReportGenerator::sessions(PartialReportConfig::default()).with_generated_at(fixed_time());
        let doc = generator.generate(&items);
        let lines = doc.lines();

        let start = lines.iter().position(|l| *l == "STATISTIQUES GÉNÉRALES").unwrap();
        assert_eq!(
            &lines[start..start + 14],
            &[
                "STATISTIQUES GÉNÉRALES",
                "Nombre total de sessions: 2",
                "Chiffre d'affaires total: 1 500,00 FCFA",
                "Nombre total de joueurs: 3",
                "Montant moyen par session: 750,00 FCFA",
                "Moyenne de joueurs par session: 1.5",
                "STATISTIQUES PAR JEU",
                "FIFA: 1 sessions, 1 000,00 FCFA, 2 joueurs",
                "PES: 1 sessions, 500,00 FCFA, 1 joueurs",
                "STATISTIQUES PAR CAISSIER",
                "awa: 1 sessions, 1 000,00 FCFA",
                "Inconnu: 1 sessions, 500,00 FCFA",
                "DÉTAIL DES SESSIONS DE JEU",
                "Session #1 - s1",
            ]
        );

        let block = lines.iter().position(|l| *l == "Session #2 - s2").unwrap();
        assert_eq!(
            &lines[block..block + 8],
            &[
                "Session #2 - s2",
                "Date: 02/03/2024 18:45:00",
                "Jeu: PES",
                "Modalité: 30 minutes",
                "Mode: solo",
                "Nombre de joueurs: 1",
                "Statut: terminée",
                "Total: 500,00 FCFA",
            ]
        );
    }

    #[test]
    fn empty_session_report_skips_breakdowns() {
        let generator =
            ReportGenerator::sessions(PartialReportConfig::default()).with_generated_at(fixed_time());
        let doc = generator.generate(&[]);
        let lines = doc.lines();
        assert!(lines.contains(&"Montant moyen par session: 0,00 FCFA"));
        assert!(lines.contains(&"Moyenne de joueurs par session: 0.0"));
        assert!(!lines.contains(&"STATISTIQUES PAR JEU"));
        assert_eq!(doc.page_count(), 1);
    }

    #[test]
    fn many_items_spill_onto_new_pages_without_splitting_blocks() {
        let items: Vec<ExpenseItem> = (0..40)
            .map(|i| expense(&format!("id{i:06}"), 100.0, "2024-01-01", "A"))
            .collect();
        let doc = expense_generator().generate(&items);
        assert!(doc.page_count() > 1);

        // every block header starts with room for the whole block below it
        for page in &doc.pages {
            for op in &page.ops {
                if let DrawOp::Text { y, text, .. } = op {
                    if text.starts_with("Dépense #") {
                        assert!(y + 8.0 * LINE_HEIGHT <= PAGE_HEIGHT - 30.0 + LINE_HEIGHT);
                    }
                }
            }
        }
    }

    #[test]
    fn end_marker_sits_near_bottom_of_last_page() {
        let doc = expense_generator().generate(&[]);
        let last = doc.pages.last().unwrap();
        match last.ops.last().unwrap() {
            DrawOp::Text { y, text, bold, .. } => {
                assert_eq!(text, END_MARKER);
                assert_eq!(*y, PAGE_HEIGHT - 15.0);
                assert!(*bold);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn same_input_same_document() {
        let items = vec![expense("abc12345", 1500.0, "2024-03-01", "Fournitures")];
        let generator = expense_generator();
        assert_eq!(generator.generate(&items), generator.generate(&items));
    }
}
