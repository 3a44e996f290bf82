use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Row, Table};

use crate::employee::FieldError;
use crate::metrics::labels::Tone;
use crate::metrics::summary::format_timestamp;
use crate::metrics::{
    format_percentage, status_label, DashboardSummary, FeatureImportanceRow, PredictionSummary,
    RiskBucket,
};
use crate::types::{GeneratedDataset, ModelStatus, TrainingAcknowledgment, TrainingStatus};
use crate::view::Failure;

const EMPTY: &str = "-";

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn tone_color(tone: Tone) -> Option<Color> {
    match tone {
        Tone::Danger => Some(Color::Red),
        Tone::Warning => Some(Color::Yellow),
        Tone::Success => Some(Color::Green),
        Tone::Neutral => None,
    }
}

fn status_cell(status: &ModelStatus) -> Cell {
    let cell = Cell::new(status_label(status));
    match status {
        ModelStatus::Trained => cell.fg(Color::Green),
        ModelStatus::Training => cell.fg(Color::Yellow),
        ModelStatus::Error => cell.fg(Color::Red),
        _ => cell,
    }
}

pub fn render_dashboard_table(summary: &DashboardSummary) -> String {
    let mut table = new_table();
    table.set_header(vec!["Métrica", "Valor"]);
    table.add_row(Row::from(vec![
        Cell::new("Status do Modelo"),
        status_cell(&summary.status),
    ]));
    table.add_row(vec![
        "Total de Funcionários".to_string(),
        summary.total_employees.to_string(),
    ]);
    table.add_row(vec!["Risco Médio".to_string(), summary.avg_risk.clone()]);
    for share in &summary.buckets {
        let label = match share.bucket {
            RiskBucket::High => "Alto Risco",
            RiskBucket::Medium => "Médio Risco",
            RiskBucket::Low => "Baixo Risco",
        };
        table.add_row(vec![
            label.to_string(),
            format!("{} ({})", share.count, share.display),
        ]);
    }
    table.add_row(vec![
        "Último Treino".to_string(),
        summary.last_trained.clone().unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "AUC (teste)".to_string(),
        summary.test_auc.clone().unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Taxa de Desligamento".to_string(),
        summary.turnover_rate.clone().unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Estados HMM".to_string(),
        summary
            .state_count
            .map(|v| v.to_string())
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.to_string()
}

pub fn render_predictions_table(predictions: &[PredictionSummary]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Funcionário", "Categoria", "Risco", "Confiança"]);
    for p in predictions {
        let mut category = Cell::new(p.presentation.label);
        if let Some(color) = tone_color(p.presentation.tone) {
            category = category.fg(color);
        }
        table.add_row(Row::from(vec![
            Cell::new(p.employee_id),
            category,
            Cell::new(&p.risk),
            Cell::new(&p.confidence),
        ]));
    }
    table.to_string()
}

pub fn render_features_table(rows: &[FeatureImportanceRow]) -> String {
    let mut table = new_table();
    table.set_header(vec!["#", "Feature", "Importância", "Relativa"]);
    for row in rows {
        table.add_row(vec![
            row.rank.to_string(),
            row.label.clone(),
            format!("{:.4}", row.importance),
            format_percentage(row.relative, 1),
        ]);
    }
    table.to_string()
}

pub fn render_training_status_table(status: &TrainingStatus) -> String {
    let mut table = new_table();
    table.set_header(vec!["Campo", "Valor"]);
    table.add_row(Row::from(vec![
        Cell::new("Status"),
        status_cell(&status.status),
    ]));
    table.add_row(vec![
        "Progresso".to_string(),
        status
            .progress
            .map(|p| format_percentage(p, 0))
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Último Treino".to_string(),
        status
            .last_trained
            .as_ref()
            .map(format_timestamp)
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    if let Some(metrics) = &status.metrics {
        table.add_row(vec!["AUC (teste)".to_string(), format!("{:.3}", metrics.test_auc)]);
        table.add_row(vec![
            "Taxa de Desligamento".to_string(),
            format_percentage(metrics.turnover_rate, 1),
        ]);
    }
    table.to_string()
}

pub fn render_training_ack_table(ack: &TrainingAcknowledgment) -> String {
    let mut table = new_table();
    table.set_header(vec!["Campo", "Valor"]);
    table.add_row(vec!["Status".to_string(), ack.status.clone()]);
    table.add_row(vec![
        "AUC (teste)".to_string(),
        ack.test_auc
            .map(|v| format!("{v:.3}"))
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Funcionários".to_string(),
        ack.employee_count
            .map(|v| v.to_string())
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Taxa de Desligamento".to_string(),
        ack.turnover_rate
            .map(|v| format_percentage(v, 1))
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Tempo de Treino".to_string(),
        ack.training_time.clone().unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.to_string()
}

pub fn render_dataset_table(dataset: &GeneratedDataset) -> String {
    let mut table = new_table();
    table.set_header(vec!["Campo", "Valor"]);
    table.add_row(vec!["Status".to_string(), dataset.status.clone()]);
    table.add_row(vec![
        "Arquivo".to_string(),
        dataset.filepath.clone().unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Funcionários".to_string(),
        dataset
            .employee_count
            .map(|v| v.to_string())
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec![
        "Taxa de Desligamento".to_string(),
        dataset
            .turnover_rate
            .map(|v| format_percentage(v, 1))
            .unwrap_or_else(|| EMPTY.to_string()),
    ]);
    table.add_row(vec!["Colunas".to_string(), dataset.columns.len().to_string()]);
    table.to_string()
}

pub fn render_field_errors_table(errors: &[FieldError]) -> String {
    let mut table = new_table();
    table.set_header(vec!["Campo", "Motivo"]);
    for err in errors {
        table.add_row(Row::from(vec![
            Cell::new(&err.field),
            Cell::new(err.reason.to_string()).fg(Color::Red),
        ]));
    }
    table.to_string()
}

/// Message line, followed by per-field detail for validation failures.
pub fn render_failure(failure: &Failure) -> String {
    if failure.fields.is_empty() {
        return failure.message.clone();
    }
    format!(
        "{}\n{}",
        failure.message,
        render_field_errors_table(&failure.fields)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::employee::{FieldError, Reason};
    use crate::types::{DashboardMetrics, RiskCategory, TurnoverPrediction};
    use crate::view::FailureKind;

    #[test]
    fn dashboard_table_shows_bucket_shares() {
        let summary = DashboardSummary::from_metrics(&DashboardMetrics {
            model_status: ModelStatus::Trained,
            total_employees: 10,
            avg_risk: 0.25,
            high_risk_count: 1,
            medium_risk_count: 1,
            low_risk_count: 2,
            last_trained_at: None,
            model_performance: None,
        });
        let rendered = render_dashboard_table(&summary);
        assert!(rendered.contains("Treinado"));
        assert!(rendered.contains("2 (50.0%)"));
        assert!(rendered.contains("25.0%"));
    }

    #[test]
    fn prediction_table_uses_localized_category() {
        let summary = PredictionSummary::from_prediction(&TurnoverPrediction {
            employee_id: 42,
            risk: 0.73,
            risk_category: RiskCategory::High,
            confidence: 0.88,
        });
        let rendered = render_predictions_table(&[summary]);
        assert!(rendered.contains("Alto"));
        assert!(rendered.contains("73.0%"));
    }

    #[test]
    fn failure_lists_invalid_fields() {
        let failure = Failure {
            kind: FailureKind::Validation,
            message: "campos inválidos".to_string(),
            retryable: false,
            fields: vec![FieldError::new("idade", Reason::OutOfRange)],
        };
        let rendered = render_failure(&failure);
        assert!(rendered.starts_with("campos inválidos"));
        assert!(rendered.contains("idade"));
    }
}
