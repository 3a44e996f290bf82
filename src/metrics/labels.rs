use serde::Serialize;

use crate::types::{ModelStatus, RiskCategory};

const UNKNOWN_LABEL: &str = "Desconhecido";

const FEATURE_LABELS: &[(&str, &str)] = &[
    ("idade", "Idade"),
    ("tempo_empresa", "Tempo na Empresa"),
    ("promovido", "Promovido"),
    ("aumento_salarial", "Aumento Salarial"),
    ("manager_change", "Mudança de Gestor"),
    ("treinamentos", "Treinamentos"),
    ("avaliacao_performance", "Avaliação de Performance"),
    ("avg_engajamento", "Engajamento Médio"),
    ("satisfacao_media", "Satisfação Média"),
    ("reconhecimento_medio", "Reconhecimento Médio"),
    ("crescimento_medio", "Crescimento Médio"),
    ("avg_manager_rel", "Relacionamento com Gestor"),
    ("equilibrio_vida_trabalho_medio", "Equilíbrio Vida-Trabalho"),
    ("current_hmm_state", "Estado HMM Atual"),
];

pub fn status_label(status: &ModelStatus) -> &'static str {
    match status {
        ModelStatus::Trained => "Treinado",
        ModelStatus::Training => "Treinando",
        ModelStatus::Error => "Erro",
        ModelStatus::NotTrained => "Não Treinado",
        ModelStatus::Unknown(_) => UNKNOWN_LABEL,
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Neutral,
    Success,
    Warning,
    Danger,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct RiskPresentation {
    pub label: &'static str,
    /// Higher sorts first; unrecognized categories get 0.
    pub severity_rank: u8,
    pub tone: Tone,
}

pub fn risk_category_presentation(category: &RiskCategory) -> RiskPresentation {
    match category {
        RiskCategory::High => RiskPresentation {
            label: "Alto",
            severity_rank: 3,
            tone: Tone::Danger,
        },
        RiskCategory::Medium => RiskPresentation {
            label: "Médio",
            severity_rank: 2,
            tone: Tone::Warning,
        },
        RiskCategory::Low => RiskPresentation {
            label: "Baixo",
            severity_rank: 1,
            tone: Tone::Success,
        },
        RiskCategory::Unrecognized(_) => RiskPresentation {
            label: UNKNOWN_LABEL,
            severity_rank: 0,
            tone: Tone::Neutral,
        },
    }
}

pub fn translate_feature_label(key: &str) -> &str {
    FEATURE_LABELS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, label)| *label)
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_labels_are_total() {
        assert_eq!(status_label(&ModelStatus::Trained), "Treinado");
        assert_eq!(status_label(&ModelStatus::NotTrained), "Não Treinado");
        assert_eq!(
            status_label(&ModelStatus::Unknown("retraining".to_string())),
            "Desconhecido"
        );
    }

    #[test]
    fn high_is_the_most_severe() {
        let high = risk_category_presentation(&RiskCategory::from("HIGH"));
        for other in [RiskCategory::Medium, RiskCategory::Low] {
            assert!(high.severity_rank > risk_category_presentation(&other).severity_rank);
        }
        assert!(
            risk_category_presentation(&RiskCategory::Medium).severity_rank
                > risk_category_presentation(&RiskCategory::Low).severity_rank
        );
    }

    #[test]
    fn unrecognized_category_is_neutral_and_last() {
        let odd = risk_category_presentation(&RiskCategory::from("???"));
        assert_eq!(odd.severity_rank, 0);
        assert_eq!(odd.tone, Tone::Neutral);
        for known in RiskCategory::KNOWN {
            assert!(risk_category_presentation(&known).severity_rank > odd.severity_rank);
        }
    }

    #[test]
    fn translates_known_feature_keys() {
        assert_eq!(translate_feature_label("idade"), "Idade");
        assert_eq!(translate_feature_label("current_hmm_state"), "Estado HMM Atual");
        assert_eq!(
            translate_feature_label("unknown_feature_x"),
            "unknown_feature_x"
        );
    }
}
